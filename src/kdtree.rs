//! # K-d tree
//!
//! A balanced, array-backed 3-axis tree over a catalog's objects, built
//! once from presorted per-axis index arrays (so the whole build is
//! `O(n log n)`, not `O(n log^2 n)` from re-sorting at every level), and
//! queried with great-circle distance rather than a naive per-axis metric.
//!
//! Nearest-neighbour search treats squared Cartesian (chord) distance as
//! the working metric during descent: both points lie on the unit
//! sphere, so chord distance is a monotonic function of
//! [crate::geometry::equ_distance] and orders candidates identically,
//! while avoiding the right-ascension wraparound a naive `(ra, dec)`
//! metric would need to special-case.

use crate::CatalogObject;

//tp KdNode
#[derive(Debug, Clone)]
struct KdNode {
    object_index: usize,
    axis: usize,
    left: Option<usize>,
    right: Option<usize>,
}

//tp KdTree
/// A k-d tree over a fixed slice of catalog objects, identified by index
/// into that slice
#[derive(Debug, Clone, Default)]
pub struct KdTree {
    nodes: Vec<KdNode>,
    root: Option<usize>,
}

impl KdTree {
    //cp build
    /// Build a tree over `objects`; the tree stores indices into this
    /// slice and must be queried against the same slice
    pub fn build(objects: &[CatalogObject]) -> Self {
        let n = objects.len();
        if n == 0 {
            return Self::default();
        }
        let mut sorted: [Vec<usize>; 3] = [
            Self::sorted_by_axis(objects, 0),
            Self::sorted_by_axis(objects, 1),
            Self::sorted_by_axis(objects, 2),
        ];
        let mut nodes = Vec::with_capacity(n);
        let root = Self::build_range(objects, &mut sorted, 0, n, 0, &mut nodes);
        Self { nodes, root }
    }

    fn sorted_by_axis(objects: &[CatalogObject], axis: usize) -> Vec<usize> {
        let mut idx: Vec<usize> = (0..objects.len()).collect();
        idx.sort_by(|&a, &b| {
            objects[a].vector()[axis]
                .partial_cmp(&objects[b].vector()[axis])
                .unwrap()
        });
        idx
    }

    /// Build the subtree spanning `sorted[*][lo..hi]`, which is an
    /// invariant: all three axis arrays hold exactly the same index set in
    /// that range, each sorted along its own axis
    fn build_range(
        objects: &[CatalogObject],
        sorted: &mut [Vec<usize>; 3],
        lo: usize,
        hi: usize,
        depth: usize,
        nodes: &mut Vec<KdNode>,
    ) -> Option<usize> {
        if lo >= hi {
            return None;
        }
        let axis = depth % 3;
        let mid = lo + (hi - lo) / 2;
        let median_obj = sorted[axis][mid];

        let left_set: std::collections::HashSet<usize> = sorted[axis][lo..mid].iter().copied().collect();

        for other in 0..3 {
            if other == axis {
                continue;
            }
            let slice = &sorted[other][lo..hi];
            let mut left_part = Vec::with_capacity(mid - lo);
            let mut right_part = Vec::with_capacity(hi - mid - 1);
            for &o in slice {
                if o == median_obj {
                    continue;
                }
                if left_set.contains(&o) {
                    left_part.push(o);
                } else {
                    right_part.push(o);
                }
            }
            sorted[other][lo..lo + left_part.len()].copy_from_slice(&left_part);
            sorted[other][lo + left_part.len() + 1..hi].copy_from_slice(&right_part);
        }

        let node_idx = nodes.len();
        nodes.push(KdNode {
            object_index: median_obj,
            axis,
            left: None,
            right: None,
        });

        let left = Self::build_range(objects, sorted, lo, mid, depth + 1, nodes);
        let right = Self::build_range(objects, sorted, mid + 1, hi, depth + 1, nodes);
        nodes[node_idx].left = left;
        nodes[node_idx].right = right;
        Some(node_idx)
    }

    //mp nearest
    /// The index (into the slice the tree was built from) of the object
    /// nearest `target`, or `None` for an empty tree
    pub fn nearest(&self, objects: &[CatalogObject], target: &crate::Vec3) -> Option<usize> {
        self.nearest_excluding(objects, target, None)
    }

    //mp nearest_excluding
    /// As [Self::nearest], but never returns `exclude` - used by
    /// `nearest_on_object` to find the closest *other* object
    pub fn nearest_excluding(
        &self,
        objects: &[CatalogObject],
        target: &crate::Vec3,
        exclude: Option<usize>,
    ) -> Option<usize> {
        let root = self.root?;
        let mut best: Option<(f64, usize)> = None;
        self.search(objects, root, target, exclude, &mut best);
        best.map(|(_, i)| i)
    }

    fn search(
        &self,
        objects: &[CatalogObject],
        node_idx: usize,
        target: &crate::Vec3,
        exclude: Option<usize>,
        best: &mut Option<(f64, usize)>,
    ) {
        let node = &self.nodes[node_idx];
        let obj = objects[node.object_index].vector();
        if Some(node.object_index) != exclude {
            let d = chord_sq(target, obj);
            let better = match best {
                Some((bd, _)) => d < *bd,
                None => true,
            };
            if better {
                *best = Some((d, node.object_index));
            }
        }
        let diff = target[node.axis] - obj[node.axis];
        let (near, far) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };
        if let Some(n) = near {
            self.search(objects, n, target, exclude, best);
        }
        let plane_dist_sq = diff * diff;
        let should_check_far = match best {
            Some((bd, _)) => plane_dist_sq < *bd,
            None => true,
        };
        if should_check_far {
            if let Some(f) = far {
                self.search(objects, f, target, exclude, best);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }
}

fn chord_sq(a: &crate::Vec3, b: &crate::Vec3) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    dx * dx + dy * dy + dz * dz
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(id: u64, ra: f64, dec: f64) -> CatalogObject {
        CatalogObject::new(id, ra, dec, 1.0).unwrap()
    }

    #[test]
    fn empty_tree_returns_none() {
        let objects: Vec<CatalogObject> = vec![];
        let tree = KdTree::build(&objects);
        assert!(tree.is_empty());
        assert!(tree.nearest(&objects, &crate::geometry::unit_vector(0.0, 0.0)).is_none());
    }

    #[test]
    fn finds_exact_match() {
        let objects = vec![
            obj(1, 0.0, 0.0),
            obj(2, 1.0, 0.5),
            obj(3, 3.0, -0.5),
            obj(4, 5.0, 1.0),
        ];
        let tree = KdTree::build(&objects);
        let idx = tree.nearest(&objects, objects[2].vector()).unwrap();
        assert_eq!(objects[idx].id(), 3);
    }

    #[test]
    fn nearest_excluding_skips_self() {
        let objects = vec![obj(1, 0.0, 0.0), obj(2, 0.001, 0.0), obj(3, 3.0, 1.0)];
        let tree = KdTree::build(&objects);
        let idx = tree
            .nearest_excluding(&objects, objects[0].vector(), Some(0))
            .unwrap();
        assert_eq!(objects[idx].id(), 2);
    }

    #[test]
    fn finds_true_nearest_over_many_points() {
        let mut objects = vec![];
        for i in 0..200u64 {
            let ra = (i as f64) * 0.031;
            let dec = -1.0 + (i as f64) * 0.01;
            objects.push(obj(i, ra % std::f64::consts::TAU, dec.clamp(-1.5, 1.5)));
        }
        let tree = KdTree::build(&objects);
        let target = crate::geometry::unit_vector(1.0, 0.2);
        let found = tree.nearest(&objects, &target).unwrap();

        let mut best_i = 0;
        let mut best_d = f64::MAX;
        for (i, o) in objects.iter().enumerate() {
            let d = crate::geometry::equ_distance(o.vector(), &target);
            if d < best_d {
                best_d = d;
                best_i = i;
            }
        }
        assert_eq!(found, best_i);
    }
}
