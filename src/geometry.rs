//! World/tile coordinate types and the four-step isometric rotation.
//!
//! Minecraft's horizontal axes are x/z, y is vertical. `north = -z`,
//! `south = +z`, `east = +x`, `west = -x`.

use std::fmt::{self, Display};
use std::ops::{Add, AddAssign, Sub, SubAssign};

use enum_iterator::Sequence;

/// Absolute block position in world space.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Chunk-local xz position; `y` is carried through unchanged since it
    /// is already an absolute world coordinate (see [`LocalPos`]).
    pub fn local(self) -> LocalPos {
        LocalPos {
            x: self.x.rem_euclid(16),
            y: self.y,
            z: self.z.rem_euclid(16),
        }
    }
}

impl Add for BlockPos {
    type Output = BlockPos;
    fn add(self, rhs: BlockPos) -> BlockPos {
        BlockPos::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for BlockPos {
    fn add_assign(&mut self, rhs: BlockPos) {
        *self = *self + rhs;
    }
}

impl Sub for BlockPos {
    type Output = BlockPos;
    fn sub(self, rhs: BlockPos) -> BlockPos {
        BlockPos::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl SubAssign for BlockPos {
    fn sub_assign(&mut self, rhs: BlockPos) {
        *self = *self - rhs;
    }
}

impl Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

impl From<BlockPos> for ChunkPos {
    fn from(pos: BlockPos) -> Self {
        ChunkPos {
            x: pos.x.div_euclid(16),
            z: pos.z.div_euclid(16),
        }
    }
}

/// Chunk-local xz position (`x`/`z` in `0..16`) paired with an absolute
/// world `y`; chunks are not delimited in height so `y` is never reduced
/// to a section-local offset here (the decoder masks it internally, e.g.
/// `ChunkSection::block_index`).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct LocalPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl LocalPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn to_global(self, chunk: ChunkPos) -> BlockPos {
        BlockPos::new(chunk.x * 16 + self.x, self.y, chunk.z * 16 + self.z)
    }
}

/// Chunk-local xz position; `y` of any contained block is an absolute world y.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }
}

impl Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Output tile position in the rotation-dependent tile grid.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TilePos {
    pub x: i32,
    pub y: i32,
}

impl TilePos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

pub const DIR_NORTH: BlockPos = BlockPos::new(0, 0, -1);
pub const DIR_SOUTH: BlockPos = BlockPos::new(0, 0, 1);
pub const DIR_EAST: BlockPos = BlockPos::new(1, 0, 0);
pub const DIR_WEST: BlockPos = BlockPos::new(-1, 0, 0);
pub const DIR_TOP: BlockPos = BlockPos::new(0, 1, 0);
pub const DIR_BOTTOM: BlockPos = BlockPos::new(0, -1, 0);

/// One of the four 90-degree isometric viewing rotations, plus the `All`
/// sentinel used only when referring to "every rotation" (e.g. when
/// rendering all four at once); it is never passed to the renderer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Sequence)]
pub enum Rotation {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
    All,
}

/// The four rotations actually used by the renderer, in clockwise order.
pub const RENDER_ROTATIONS: [Rotation; 4] = [
    Rotation::TopLeft,
    Rotation::TopRight,
    Rotation::BottomRight,
    Rotation::BottomLeft,
];

impl Rotation {
    /// Number of 90-degree steps clockwise from `TopLeft`.
    fn steps(self) -> u32 {
        match self {
            Rotation::TopLeft => 0,
            Rotation::TopRight => 1,
            Rotation::BottomRight => 2,
            Rotation::BottomLeft => 3,
            Rotation::All => 0,
        }
    }

    fn rotate_xz(self, x: i32, z: i32) -> (i32, i32) {
        let (mut x, mut z) = (x, z);
        for _ in 0..self.steps() {
            let (nx, nz) = (-z, x);
            x = nx;
            z = nz;
        }
        (x, z)
    }

    /// Rewrites an xz vector by this rotation's 90-degree step; y is invariant.
    pub fn rotate(self, v: BlockPos) -> BlockPos {
        let (x, z) = self.rotate_xz(v.x, v.z);
        BlockPos::new(x, v.y, z)
    }

    pub fn south(self) -> BlockPos {
        self.rotate(DIR_SOUTH)
    }

    pub fn north(self) -> BlockPos {
        self.rotate(DIR_NORTH)
    }

    pub fn east(self) -> BlockPos {
        self.rotate(DIR_EAST)
    }

    pub fn west(self) -> BlockPos {
        self.rotate(DIR_WEST)
    }

    /// Row in the tile's projected grid; each tile is `4*16*tile_width` rows high.
    pub fn pos2_row(self, pos: BlockPos) -> i32 {
        match self {
            Rotation::TopLeft => -pos.x + pos.z,
            Rotation::TopRight => pos.x + pos.z,
            Rotation::BottomRight => pos.x - pos.z,
            Rotation::BottomLeft | Rotation::All => -pos.x - pos.z,
        }
    }

    /// Column in the tile's projected grid; each tile is `2*16*tile_width` cols wide.
    pub fn pos2_col(self, pos: BlockPos) -> i32 {
        match self {
            Rotation::TopLeft => pos.x + pos.z,
            Rotation::TopRight => pos.x - pos.z,
            Rotation::BottomRight => -pos.x - pos.z,
            Rotation::BottomLeft | Rotation::All => -pos.x + pos.z,
        }
    }

    /// Inverse of [`pos2_row`]/[`pos2_col`]: the chunk whose projection covers
    /// `(row, col)`. Two tile columns span one chunk width.
    pub fn tile2_pos(self, row: i32, col: i32) -> ChunkPos {
        match self {
            Rotation::TopLeft => ChunkPos::new((col - row) / 2, (col + row) / 2),
            Rotation::TopRight => ChunkPos::new((col + row) / 2, (row - col) / 2),
            Rotation::BottomRight => ChunkPos::new((row - col) / 2, (-col - row) / 2),
            Rotation::BottomLeft | Rotation::All => ChunkPos::new((-col - row) / 2, (col - row) / 2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotate_four_times_is_identity() {
        let dirs = [DIR_NORTH, DIR_SOUTH, DIR_EAST, DIR_WEST, DIR_TOP, DIR_BOTTOM];
        for rotation in RENDER_ROTATIONS {
            for dir in dirs {
                let mut v = dir;
                for _ in 0..4 {
                    v = rotation.rotate(v);
                }
                assert_eq!(v, dir, "rotation {:?} did not cycle back for {:?}", rotation, dir);
            }
        }
    }

    #[test]
    fn chunk_pos_from_negative_block_pos_floors() {
        let pos = BlockPos::new(-1, 64, -17);
        let chunk: ChunkPos = pos.into();
        assert_eq!(chunk, ChunkPos::new(-1, -2));
    }

    #[test]
    fn tile2pos_inverts_pos2_row_col_for_chunk_origins() {
        for rotation in RENDER_ROTATIONS {
            for x in -3..3 {
                for z in -3..3 {
                    let pos = BlockPos::new(x * 16, 64, z * 16);
                    let row = rotation.pos2_row(pos);
                    let col = rotation.pos2_col(pos);
                    assert_eq!(rotation.tile2_pos(row, col), ChunkPos::new(x, z));
                }
            }
        }
    }
}
