//! # Catalog
//!
//! A built, queryable catalog: a mesh, a schema, and a contiguous array of
//! objects sorted so that every trixel's members occupy consecutive
//! positions (the `(head, count)` pairs the mesh's trixels carry).

use crate::error::Result;
use crate::htm::{Htm, TrixelId};
use crate::kdtree::KdTree;
use crate::objectset::ObjectSet;
use crate::schema::Schema;
use crate::CatalogObject;

#[cfg(feature = "postcard")]
use serde::{Deserialize, Serialize};

//tp Catalog
/// A built catalog, ready for region clipping, predicate search, nearest-
/// neighbour queries and plate solving
pub struct Catalog {
    htm: Htm,
    schema: Schema,
    objects: Vec<CatalogObject>,
    kdtree: KdTree,
}

impl Catalog {
    pub fn htm(&self) -> &Htm {
        &self.htm
    }
    pub fn schema(&self) -> &Schema {
        &self.schema
    }
    pub fn objects(&self) -> &[CatalogObject] {
        &self.objects
    }
    pub fn len(&self) -> usize {
        self.objects.len()
    }
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    //mp clip
    /// Clip a region of the sky out of this catalog
    pub fn clip(
        &self,
        center_ra: f64,
        center_dec: f64,
        fov: f64,
        min_depth: u8,
        max_depth: u8,
    ) -> Result<ObjectSet<'_>> {
        ObjectSet::new(self, center_ra, center_dec, fov, min_depth, max_depth)
    }

    //mp nearest_on_pos
    /// The catalog object nearest an arbitrary `(ra, dec)`
    pub fn nearest_on_pos(&self, ra: f64, dec: f64) -> Option<&CatalogObject> {
        let target = crate::geometry::unit_vector(ra, dec);
        self.kdtree
            .nearest(&self.objects, &target)
            .map(|i| &self.objects[i])
    }

    //mp nearest_on_object
    /// The catalog object nearest `object`, excluding `object` itself (by
    /// identity, not position, so two coincident objects are distinct)
    pub fn nearest_on_object(&self, object: &CatalogObject) -> Option<&CatalogObject> {
        let self_index = self.objects.iter().position(|o| o.id() == object.id());
        self.kdtree
            .nearest_excluding(&self.objects, object.vector(), self_index)
            .map(|i| &self.objects[i])
    }

    //mp to_postcard
    /// Pack this catalog's mesh depth, schema and objects into a compact
    /// binary snapshot; the mesh and k-d tree are rebuilt on load rather
    /// than serialized, since both are cheaply rederived from the objects
    #[cfg(feature = "postcard")]
    pub fn to_postcard(&self) -> Result<Vec<u8>> {
        let snapshot = CatalogSnapshot {
            depth: self.htm.depth(),
            schema: self.schema.clone(),
            objects: self.objects.clone(),
        };
        postcard::to_stdvec(&snapshot)
            .map_err(|e| crate::error::Error::ImportFailed(e.to_string()))
    }

    //mp from_postcard
    #[cfg(feature = "postcard")]
    pub fn from_postcard(bytes: &[u8]) -> Result<Catalog> {
        let snapshot: CatalogSnapshot =
            postcard::from_bytes(bytes).map_err(|e| crate::error::Error::ImportFailed(e.to_string()))?;
        let htm = Htm::build(snapshot.depth)?;
        let mut builder = CatalogBuilder::new(htm, snapshot.schema);
        for object in snapshot.objects {
            builder.insert_located(object)?;
        }
        builder.build()
    }
}

#[cfg(feature = "postcard")]
#[derive(Serialize, Deserialize)]
struct CatalogSnapshot {
    depth: u8,
    schema: Schema,
    objects: Vec<CatalogObject>,
}

//tp CatalogBuilder
/// Accumulates objects tagged with a trixel id, then sorts and packs them
/// into a [Catalog]'s contiguous object array
pub struct CatalogBuilder {
    htm: Htm,
    schema: Schema,
    pending: Vec<(CatalogObject, TrixelId)>,
}

impl CatalogBuilder {
    //cp new
    pub fn new(htm: Htm, schema: Schema) -> Self {
        Self {
            htm,
            schema,
            pending: Vec::new(),
        }
    }

    //mp insert
    /// Tag an object with the trixel it belongs in
    pub fn insert(&mut self, object: CatalogObject, trixel_id: TrixelId) -> Result<()> {
        self.htm.index_of(trixel_id)?;
        self.pending.push((object, trixel_id));
        Ok(())
    }

    //mp insert_located
    /// Insert an object, locating its trixel from its own position at the
    /// mesh's maximum depth
    pub fn insert_located(&mut self, object: CatalogObject) -> Result<()> {
        let idx = self
            .htm
            .point_location(object.ra(), object.dec(), self.htm.depth())?;
        let id = self.htm.trixel(idx).id();
        self.pending.push((object, id));
        Ok(())
    }

    //cp build
    /// Group pending objects by trixel, pack them into a single contiguous
    /// array, and record each trixel's `(head, count)` span
    ///
    /// Sorts (stably) by trixel id only: within a trixel, objects keep the
    /// order the importer inserted them in, since it is the importer's job
    /// to decide ascending-brightness vs. descending-size convention, not
    /// the mesh's
    pub fn build(mut self) -> Result<Catalog> {
        self.pending.sort_by_key(|(_, trixel_id)| trixel_id.bits());

        let mut objects = Vec::with_capacity(self.pending.len());
        let mut i = 0;
        while i < self.pending.len() {
            let trixel_id = self.pending[i].1;
            let head = objects.len();
            let mut j = i;
            while j < self.pending.len() && self.pending[j].1 == trixel_id {
                j += 1;
            }
            for (obj, _) in self.pending.drain(i..j) {
                objects.push(obj);
            }
            let count = objects.len() - head;
            let idx = self.htm.index_of(trixel_id)?;
            let t = self.htm.trixel_mut(idx);
            t.objects_head = head;
            t.objects_count = count;
            // drain already shifted the remaining pending entries down to
            // index i, so the loop re-examines i rather than advancing by
            // (j - i)
        }

        let kdtree = KdTree::build(&objects);
        Ok(Catalog {
            htm: self.htm,
            schema: self.schema,
            objects,
            kdtree,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::CType;

    fn small_catalog() -> Catalog {
        let htm = Htm::build(3).unwrap();
        let mut schema = Schema::new();
        schema.add_field("Vmag", "V", CType::Float, "mag");
        let mut builder = CatalogBuilder::new(htm, schema);
        for (i, (ra, dec, mag)) in [
            (0.0, 0.0, 1.0),
            (1.0, 0.5, 3.0),
            (3.0, -0.5, 5.0),
            (5.5, 1.0, 2.0),
        ]
        .into_iter()
        .enumerate()
        {
            let obj = CatalogObject::new(i as u64, ra, dec, mag).unwrap();
            builder.insert_located(obj).unwrap();
        }
        builder.build().unwrap()
    }

    #[test]
    fn build_packs_every_object() {
        let cat = small_catalog();
        assert_eq!(cat.len(), 4);
    }

    #[test]
    fn trixel_spans_partition_the_object_array() {
        let cat = small_catalog();
        let mut covered = vec![false; cat.len()];
        for idx in 0..cat.htm().num_trixels() {
            let t = cat.htm().trixel(crate::htm::TrixelIndex(idx));
            for k in t.objects_head..t.objects_head + t.objects_count {
                assert!(!covered[k], "object {k} claimed by more than one trixel");
                covered[k] = true;
            }
        }
        assert!(covered.iter().all(|&c| c));
    }

    #[test]
    fn nearest_on_pos_finds_closest() {
        let cat = small_catalog();
        let nearest = cat.nearest_on_pos(0.05, 0.02).unwrap();
        assert_eq!(nearest.id(), 0);
    }

    #[test]
    fn clip_whole_sky_returns_everything() {
        let cat = small_catalog();
        let set = cat.clip(0.0, 0.0, std::f64::consts::PI, 0, 0).unwrap();
        assert_eq!(set.object_count(), 4);
    }
}
