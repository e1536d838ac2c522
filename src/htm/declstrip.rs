//! Declination-strip vertex deduplication
//!
//! Mesh subdivision materializes an edge midpoint twice, once from each of
//! the two trixels that share the edge. This structure buckets vertices by
//! declination strip so a newly computed midpoint can be matched against
//! one already created by the neighbouring trixel, rather than allocating
//! a duplicate.

use std::f64::consts::PI;

use super::vertex::VertexIndex;

const MATCH_EPSILON: f64 = 1e-9;

//tp DeclStrip
pub struct DeclStrip {
    num_strips: usize,
    strips: Vec<Vec<(f64, f64, VertexIndex)>>,
}

impl DeclStrip {
    //cp new
    /// Allocate strips for a mesh built to `max_depth`
    pub fn new(max_depth: u8) -> Self {
        let num_strips = (1usize << (max_depth as u32 + 1)) + 1;
        Self {
            num_strips,
            strips: vec![Vec::new(); num_strips],
        }
    }

    fn strip_index(&self, dec: f64) -> usize {
        let t = (dec + PI / 2.0) / PI;
        let i = (t * (self.num_strips - 1) as f64).round();
        (i as isize).clamp(0, self.num_strips as isize - 1) as usize
    }

    //mp find_or_insert
    /// Return the existing vertex at (ra, dec) if one has already been
    /// recorded in the neighbouring strip cell, or call `create` and
    /// record the result
    pub fn find_or_insert(
        &mut self,
        ra: f64,
        dec: f64,
        create: impl FnOnce() -> VertexIndex,
    ) -> VertexIndex {
        let si = self.strip_index(dec);
        for &(r, d, vi) in &self.strips[si] {
            if (r - ra).abs() < MATCH_EPSILON && (d - dec).abs() < MATCH_EPSILON {
                return vi;
            }
        }
        let vi = create();
        self.strips[si].push((ra, dec, vi));
        vi
    }
}
