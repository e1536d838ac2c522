//! Mesh trixels (the mesh's triangular faces)

use super::id::{Hemisphere, TrixelId};
use super::vertex::VertexIndex;

//tp TrixelIndex
/// An index into [super::Htm]'s trixel arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrixelIndex(pub usize);

//tp Orientation
/// Whether a trixel's winding runs the same way as its parent (`Up`) or the
/// mirror way (`Down`); subdivision always flips the centre child's
/// orientation and preserves it for the three corner children
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Up,
    Down,
}

impl Orientation {
    pub fn flipped(self) -> Self {
        match self {
            Orientation::Up => Orientation::Down,
            Orientation::Down => Orientation::Up,
        }
    }
}

//tp Trixel
/// A single node of the mesh: three corner vertices, up to four children,
/// and (once a catalog is built over the mesh) a contiguous run of objects
#[derive(Debug, Clone)]
pub struct Trixel {
    pub hemisphere: Hemisphere,
    pub quadrant: u8,
    pub depth: u8,
    pub position: u32,
    pub orientation: Orientation,
    pub vertices: [VertexIndex; 3],
    pub parent: Option<TrixelIndex>,
    pub children: [Option<TrixelIndex>; 4],
    /// `(head, count)` into the catalog's contiguous object array; `count`
    /// is zero until a catalog is built over this mesh
    pub objects_head: usize,
    pub objects_count: usize,
}

impl Trixel {
    pub fn id(&self) -> TrixelId {
        if self.depth == 0 {
            TrixelId::new(self.hemisphere, self.quadrant, 0, 0)
        } else {
            TrixelId::new(self.hemisphere, self.quadrant, self.depth, self.position)
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.iter().all(|c| c.is_none())
    }
}
