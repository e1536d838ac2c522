//! # Hierarchical Triangular Mesh
//!
//! Recursive subdivision of the celestial sphere, folded onto an
//! octahedron so containment tests reduce to planar cross products
//! (see [crate::geometry::octahedron_fold]).
//!
//! The mesh is built eagerly, every trixel down to its maximum depth, the
//! way the construction in this module describes it; callers choosing a
//! deep mesh (more than eight or nine levels) should expect the `8 *
//! 4^depth` trixel count that implies.

use std::collections::HashMap;
use std::f64::consts::PI;

mod declstrip;
mod id;
mod trixel;
mod vertex;

pub use id::{Hemisphere, TrixelId, MAX_DEPTH};
pub use trixel::{Orientation, Trixel, TrixelIndex};
pub use vertex::{Vertex, VertexIndex};

use declstrip::DeclStrip;

use crate::error::{Error, Result};
use crate::geometry;
use crate::Vec3;

/// A hard cap on the number of trixels a single clip can return, matching
/// the fixed-size clipped-trixel buffer of spec.md section 6
const MAX_CLIPPED_TRIXELS: usize = 4096;

//tp Htm
/// The spatial index: an arena of vertices and trixels, built once to a
/// fixed maximum depth
pub struct Htm {
    depth: u8,
    vertices: Vec<Vertex>,
    trixels: Vec<Trixel>,
    roots: [TrixelIndex; 8],
    by_id: HashMap<u32, TrixelIndex>,
}

impl Htm {
    //cp build
    /// Build a mesh to `max_depth` (0-[MAX_DEPTH])
    pub fn build(max_depth: u8) -> Result<Self> {
        if max_depth > MAX_DEPTH {
            return Err(Error::AllocationFailed("htm depth exceeds MAX_DEPTH"));
        }
        let mut htm = Self {
            depth: max_depth,
            vertices: Vec::new(),
            trixels: Vec::new(),
            roots: [TrixelIndex(0); 8],
            by_id: HashMap::new(),
        };
        htm.build_base_octahedron();
        let mut decl = DeclStrip::new(max_depth);
        for i in 0..8 {
            htm.subdivide(htm.roots[i], &mut decl);
        }
        Ok(htm)
    }

    //ip accessors
    pub fn depth(&self) -> u8 {
        self.depth
    }
    pub fn trixel(&self, idx: TrixelIndex) -> &Trixel {
        &self.trixels[idx.0]
    }
    pub fn trixel_mut(&mut self, idx: TrixelIndex) -> &mut Trixel {
        &mut self.trixels[idx.0]
    }
    pub fn vertex(&self, idx: VertexIndex) -> &Vertex {
        &self.vertices[idx.0]
    }
    pub fn num_trixels(&self) -> usize {
        self.trixels.len()
    }

    //mp index_of
    /// Resolve a packed [TrixelId] to an arena index
    pub fn index_of(&self, id: TrixelId) -> Result<TrixelIndex> {
        self.by_id
            .get(&id.bits())
            .copied()
            .ok_or(Error::InvalidTrixelId(id.bits()))
    }

    //a Construction
    fn push_vertex(&mut self, ra: f64, dec: f64, creation_depth: u8) -> VertexIndex {
        let vector = geometry::unit_vector(ra, dec);
        let folded = geometry::fold_unit_vector(ra, dec);
        let idx = VertexIndex(self.vertices.len());
        self.vertices
            .push(Vertex::new(ra, dec, vector, folded, creation_depth));
        idx
    }

    fn push_trixel(&mut self, t: Trixel) -> TrixelIndex {
        let idx = TrixelIndex(self.trixels.len());
        self.by_id.insert(t.id().bits(), idx);
        self.trixels.push(t);
        idx
    }

    fn build_base_octahedron(&mut self) {
        let north = self.push_vertex(0.0, PI / 2.0, 0);
        let south = self.push_vertex(0.0, -PI / 2.0, 0);
        let eq: [VertexIndex; 4] = [
            self.push_vertex(0.0, 0.0, 0),
            self.push_vertex(PI / 2.0, 0.0, 0),
            self.push_vertex(PI, 0.0, 0),
            self.push_vertex(3.0 * PI / 2.0, 0.0, 0),
        ];
        for q in 0..4u8 {
            let b = eq[q as usize];
            let c = eq[(q as usize + 1) % 4];
            let n_idx = self.push_trixel(Trixel {
                hemisphere: Hemisphere::North,
                quadrant: q,
                depth: 0,
                position: 0,
                orientation: Orientation::Up,
                vertices: [north, b, c],
                parent: None,
                children: [None; 4],
                objects_head: 0,
                objects_count: 0,
            });
            for v in [north, b, c] {
                self.vertices[v.0].register(0, n_idx);
            }
            self.roots[q as usize] = n_idx;

            let s_idx = self.push_trixel(Trixel {
                hemisphere: Hemisphere::South,
                quadrant: q,
                depth: 0,
                position: 0,
                orientation: Orientation::Down,
                vertices: [south, b, c],
                parent: None,
                children: [None; 4],
                objects_head: 0,
                objects_count: 0,
            });
            for v in [south, b, c] {
                self.vertices[v.0].register(0, s_idx);
            }
            self.roots[4 + q as usize] = s_idx;
        }
    }

    fn midpoint_vertex(
        &mut self,
        a: Vec3,
        b: Vec3,
        creation_depth: u8,
        decl: &mut DeclStrip,
    ) -> VertexIndex {
        let folded_mid = geometry::midpoint(&a, &b);
        let (ra, dec) = geometry::spherical_from_octahedron(&folded_mid);
        let vertices = &mut self.vertices;
        decl.find_or_insert(ra, dec, || {
            let vector = geometry::unit_vector(ra, dec);
            let folded = geometry::fold_unit_vector(ra, dec);
            let idx = VertexIndex(vertices.len());
            vertices.push(Vertex::new(ra, dec, vector, folded, creation_depth));
            idx
        })
    }

    fn subdivide(&mut self, idx: TrixelIndex, decl: &mut DeclStrip) {
        let t = self.trixels[idx.0].clone();
        if t.depth >= self.depth {
            return;
        }
        let [a, b, c] = t.vertices;
        let va = self.vertices[a.0].folded;
        let vb = self.vertices[b.0].folded;
        let vc = self.vertices[c.0].folded;

        let child_depth = t.depth + 1;
        let m_ab = self.midpoint_vertex(va, vb, child_depth, decl);
        let m_bc = self.midpoint_vertex(vb, vc, child_depth, decl);
        let m_ca = self.midpoint_vertex(vc, va, child_depth, decl);

        let (triples, orientations) = match t.orientation {
            Orientation::Up => (
                [
                    [m_ab, m_bc, m_ca],
                    [a, m_ab, m_ca],
                    [b, m_bc, m_ab],
                    [c, m_ca, m_bc],
                ],
                [
                    Orientation::Down,
                    Orientation::Up,
                    Orientation::Up,
                    Orientation::Up,
                ],
            ),
            Orientation::Down => (
                [
                    [m_ab, m_bc, m_ca],
                    [a, m_ca, m_ab],
                    [b, m_ab, m_bc],
                    [c, m_bc, m_ca],
                ],
                [
                    Orientation::Up,
                    Orientation::Down,
                    Orientation::Down,
                    Orientation::Down,
                ],
            ),
        };

        let mut children = [None; 4];
        for i in 0..4u8 {
            let position = t.position | ((i as u32) << (2 * t.depth as u32));
            let new_idx = self.push_trixel(Trixel {
                hemisphere: t.hemisphere,
                quadrant: t.quadrant,
                depth: child_depth,
                position,
                orientation: orientations[i as usize],
                vertices: triples[i as usize],
                parent: Some(idx),
                children: [None; 4],
                objects_head: 0,
                objects_count: 0,
            });
            for v in triples[i as usize] {
                self.vertices[v.0].register(child_depth, new_idx);
            }
            children[i as usize] = Some(new_idx);
        }
        self.trixels[idx.0].children = children;
        for child in children.into_iter().flatten() {
            self.subdivide(child, decl);
        }
    }

    //a Point location
    //mp point_location
    /// Find the trixel at `depth` containing `(ra, dec)`
    pub fn point_location(&self, ra: f64, dec: f64, depth: u8) -> Result<TrixelIndex> {
        let folded = geometry::fold_unit_vector(ra, dec);
        for root in self.roots {
            if let Some(found) = self.locate_within(root, &folded, depth.min(self.depth)) {
                return Ok(found);
            }
        }
        Err(Error::InvalidCoordinate { ra, dec })
    }

    fn locate_within(&self, idx: TrixelIndex, folded: &Vec3, target_depth: u8) -> Option<TrixelIndex> {
        let t = &self.trixels[idx.0];
        if !self.contains(t, folded) {
            return None;
        }
        if t.depth >= target_depth {
            return Some(idx);
        }
        for child in t.children.into_iter().flatten() {
            if let Some(found) = self.locate_within(child, folded, target_depth) {
                return Some(found);
            }
        }
        Some(idx)
    }

    fn contains(&self, t: &Trixel, folded: &Vec3) -> bool {
        let a = self.vertices[t.vertices[0].0].folded;
        let b = self.vertices[t.vertices[1].0].folded;
        let c = self.vertices[t.vertices[2].0].folded;
        let (p, q, r) = match t.orientation {
            Orientation::Up => (a, b, c),
            Orientation::Down => (a, c, b),
        };
        let e1 = geometry::cross(&p, &q);
        let e2 = geometry::cross(&q, &r);
        let e3 = geometry::cross(&r, &p);
        geometry::dot(&e1, folded) >= -1e-5
            && geometry::dot(&e2, folded) >= -1e-5
            && geometry::dot(&e3, folded) >= -1e-5
    }

    //a Region clipping
    //mp clip
    /// Return every trixel with a depth in `[min_depth, max_depth]` that
    /// intersects a field of view of angular radius `fov` centred on
    /// `(ra, dec)`
    pub fn clip(
        &self,
        ra: f64,
        dec: f64,
        fov: f64,
        min_depth: u8,
        max_depth: u8,
    ) -> Result<Vec<TrixelIndex>> {
        let max_depth = max_depth.min(self.depth);
        let min_depth = min_depth.min(max_depth);
        let mut out = Vec::new();
        if fov >= PI {
            for root in self.roots {
                self.collect_subtree(root, min_depth, max_depth, &mut out)?;
            }
            return Ok(out);
        }

        let fov_depth = self.fov_depth(fov).clamp(min_depth, max_depth);
        let home = self.point_location(ra, dec, fov_depth)?;

        let mut neighbours = vec![home];
        for v in self.trixels[home.0].vertices {
            for &n in self.vertices[v.0].trixels_at_depth(fov_depth) {
                if !neighbours.contains(&n) {
                    neighbours.push(n);
                }
            }
        }

        let mut seen: std::collections::HashSet<TrixelIndex> = std::collections::HashSet::new();
        for &n in &neighbours {
            let mut cur = Some(n);
            while let Some(ci) = cur {
                let d = self.trixels[ci.0].depth;
                if d < min_depth {
                    break;
                }
                if seen.insert(ci) {
                    out.push(ci);
                    if out.len() > MAX_CLIPPED_TRIXELS {
                        return Err(Error::ClippedBufferFull);
                    }
                }
                if d == min_depth {
                    break;
                }
                cur = self.trixels[ci.0].parent;
            }
        }
        for &n in &neighbours {
            self.collect_subtree_seen(n, max_depth, &mut out, &mut seen)?;
        }
        Ok(out)
    }

    fn collect_subtree(
        &self,
        idx: TrixelIndex,
        min_depth: u8,
        max_depth: u8,
        out: &mut Vec<TrixelIndex>,
    ) -> Result<()> {
        let t = &self.trixels[idx.0];
        if t.depth >= min_depth {
            out.push(idx);
            if out.len() > MAX_CLIPPED_TRIXELS {
                return Err(Error::ClippedBufferFull);
            }
        }
        if t.depth < max_depth {
            for child in t.children.into_iter().flatten() {
                self.collect_subtree(child, min_depth, max_depth, out)?;
            }
        }
        Ok(())
    }

    fn collect_subtree_seen(
        &self,
        idx: TrixelIndex,
        max_depth: u8,
        out: &mut Vec<TrixelIndex>,
        seen: &mut std::collections::HashSet<TrixelIndex>,
    ) -> Result<()> {
        let t = &self.trixels[idx.0];
        if seen.insert(idx) {
            out.push(idx);
            if out.len() > MAX_CLIPPED_TRIXELS {
                return Err(Error::ClippedBufferFull);
            }
        }
        if t.depth < max_depth {
            for child in t.children.into_iter().flatten() {
                self.collect_subtree_seen(child, max_depth, out, seen)?;
            }
        }
        Ok(())
    }

    fn fov_depth(&self, fov: f64) -> u8 {
        let mut best = 0u8;
        for d in 0..=self.depth {
            let resolution = (PI / 2.0) / (1u64 << d) as f64;
            if resolution >= fov {
                best = d;
            } else {
                break;
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_eight_roots() {
        let htm = Htm::build(2).unwrap();
        assert_eq!(htm.depth(), 2);
        for r in htm.roots {
            assert_eq!(htm.trixel(r).depth, 0);
        }
    }

    #[test]
    fn point_location_finds_leaf_at_requested_depth() {
        let htm = Htm::build(4).unwrap();
        let idx = htm.point_location(0.1, 0.2, 4).unwrap();
        assert_eq!(htm.trixel(idx).depth, 4);
    }

    #[test]
    fn point_location_is_consistent_across_the_sphere() {
        let htm = Htm::build(3).unwrap();
        for &(ra, dec) in &[
            (0.0, 0.0),
            (1.0, 0.5),
            (3.0, -0.5),
            (5.5, 1.0),
            (2.0, -1.4),
        ] {
            let idx = htm.point_location(ra, dec, 3).unwrap();
            assert_eq!(htm.trixel(idx).depth, 3);
        }
    }

    #[test]
    fn clip_includes_home_trixel() {
        let htm = Htm::build(3).unwrap();
        let home = htm.point_location(0.1, 0.1, 3).unwrap();
        let clipped = htm.clip(0.1, 0.1, 0.1, 0, 3).unwrap();
        assert!(clipped.contains(&home));
    }

    #[test]
    fn clip_whole_sphere_covers_every_root() {
        let htm = Htm::build(2).unwrap();
        let clipped = htm.clip(0.0, 0.0, PI, 0, 0).unwrap();
        assert_eq!(clipped.len(), 8);
    }

    #[test]
    fn id_round_trips_through_index_of() {
        let htm = Htm::build(3).unwrap();
        let idx = htm.point_location(0.3, 0.2, 3).unwrap();
        let id = htm.trixel(idx).id();
        assert_eq!(htm.index_of(id).unwrap(), idx);
    }
}
