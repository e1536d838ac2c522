//! Mesh vertices

use crate::Vec3;

use super::trixel::TrixelIndex;

//tp VertexIndex
/// An index into [super::Htm]'s vertex arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexIndex(pub usize);

//tp Vertex
/// A mesh vertex: the position, both plain and octahedron-folded, and a
/// back-list of the trixels that use this vertex as a corner, grouped by
/// depth from the depth at which the vertex was created through the mesh's
/// maximum depth
///
/// Up to six trixels can share a vertex; the clipping walk uses this list
/// to find a home trixel's neighbours without re-deriving geometry
#[derive(Debug, Clone)]
pub struct Vertex {
    pub ra: f64,
    pub dec: f64,
    pub vector: Vec3,
    pub folded: Vec3,
    pub creation_depth: u8,
    /// `trixels_by_depth[d - creation_depth]` lists the (up to six) trixels
    /// at depth `d` with this vertex as a corner
    trixels_by_depth: Vec<Vec<TrixelIndex>>,
}

impl Vertex {
    pub fn new(ra: f64, dec: f64, vector: Vec3, folded: Vec3, creation_depth: u8) -> Self {
        Self {
            ra,
            dec,
            vector,
            folded,
            creation_depth,
            trixels_by_depth: vec![],
        }
    }

    //mp register
    /// Record that the trixel at `depth` (which must be `>= creation_depth`)
    /// has this vertex as a corner
    pub fn register(&mut self, depth: u8, trixel: TrixelIndex) {
        let slot = (depth - self.creation_depth) as usize;
        if self.trixels_by_depth.len() <= slot {
            self.trixels_by_depth.resize(slot + 1, Vec::new());
        }
        self.trixels_by_depth[slot].push(trixel);
    }

    //mp trixels_at_depth
    pub fn trixels_at_depth(&self, depth: u8) -> &[TrixelIndex] {
        if depth < self.creation_depth {
            return &[];
        }
        let slot = (depth - self.creation_depth) as usize;
        self.trixels_by_depth
            .get(slot)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}
