//! Top-block iterator (spec.md §4.4): walks a tile's projected voxel grid
//! in scan order, yielding each column's draw offset and the world position
//! of its top block.

use crate::config::CHUNK_HIGHEST;
use crate::geometry::{BlockPos, LocalPos, Rotation, TilePos, DIR_NORTH, DIR_SOUTH, DIR_WEST};

/// Yields `(draw_x, draw_y, top_of_column)` triples for one tile under one
/// rotation, in the scan order the column renderer expects (spec.md §4.4).
///
/// Ported from `mapcraftercore::renderer::old::TileTopBlockIterator`
/// (`examples/original_source/.../isometricnew/tilerenderer.cpp`); "old" in
/// the original names the *iterator*, not the chunk layout it targets.
pub struct TopBlockIter {
    rotation: Rotation,
    block_size: i32,
    tile_dir: BlockPos,
    tile_rewind: BlockPos,
    top: BlockPos,
    current: BlockPos,
    min_col: i32,
    max_col: i32,
    min_row: i32,
    max_row: i32,
    draw_x: i32,
    draw_y: i32,
    started: bool,
    done: bool,
}

impl TopBlockIter {
    pub fn new(tile_pos: TilePos, block_size: u32, tile_width: u32, rotation: Rotation) -> Self {
        let block_size = block_size as i32;
        let tile_width = tile_width as i32;

        let tile_dir = rotation.rotate(DIR_SOUTH);
        let tile_rewind = rotation.rotate(DIR_NORTH + DIR_WEST);

        // Row/col 0,0 are the top-left chunk of tile 0,0; each tile is four
        // rows high, two columns wide. Start at the chunk whose row/col is
        // the tile's top right (the top-left chunk of tile x+1,y).
        let topright_chunk = rotation.tile2_pos(4 * tile_width * tile_pos.y, 2 * tile_width * (tile_pos.x + 1));
        let top = LocalPos::new(8, CHUNK_HIGHEST * 16 - 1, 8).to_global(topright_chunk);

        // Render a bit earlier on the top right so the bottom left of the
        // tile also gets rendered.
        let relcol = 2 * (16 * tile_width - 1);
        let relrow = -1;

        let max_col = rotation.pos2_col(top) + 2 * 16 - relcol;
        let min_col = max_col - 2 * 16 * tile_width;
        let min_row = rotation.pos2_row(top) - relrow;
        let max_row = min_row + 4 * 16 * tile_width + 4;

        let draw_x = relcol * block_size / 2;
        let draw_y = relrow * block_size / 4 - block_size / 2;

        TopBlockIter {
            rotation,
            block_size,
            tile_dir,
            tile_rewind,
            top,
            current: top,
            min_col,
            max_col,
            min_row,
            max_row,
            draw_x,
            draw_y,
            started: false,
            done: false,
        }
    }
}

impl Iterator for TopBlockIter {
    type Item = (i32, i32, BlockPos);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if !self.started {
            self.started = true;
            return Some((self.draw_x, self.draw_y, self.current));
        }

        self.current += self.tile_dir;
        let mut row = self.rotation.pos2_row(self.current);
        let mut col = self.rotation.pos2_col(self.current);

        if col >= self.max_col || row >= self.max_row {
            self.top += self.tile_rewind;
            self.current = self.top;
            let col_now = self.rotation.pos2_col(self.current);
            if col_now < self.min_col {
                let shift = self.min_col - col_now - 1;
                self.current += self.rotation.rotate(BlockPos::new(0, 0, shift));
            }
            row = self.rotation.pos2_row(self.current);
            col = self.rotation.pos2_col(self.current);
        }

        // A for-loop in the source checks `!end()` before rendering each
        // position, so the position that first satisfies the end condition
        // is computed here but never yielded.
        if row >= self.max_row && col <= self.min_col + 1 {
            self.done = true;
            return None;
        }

        self.draw_x = (col - self.min_col) * self.block_size / 2;
        self.draw_y = (row - self.min_row) * self.block_size / 4 - self.block_size / 2;
        Some((self.draw_x, self.draw_y, self.current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::RENDER_ROTATIONS;

    #[test]
    fn every_yielded_position_projects_inside_tile_bounds() {
        for rotation in RENDER_ROTATIONS {
            let mut iter = TopBlockIter::new(TilePos::new(0, 0), 16, 1, rotation);
            // Bounds are fixed once at construction; recompute them the same way.
            let probe = TopBlockIter::new(TilePos::new(0, 0), 16, 1, rotation);
            let (min_col, max_col, min_row, max_row) =
                (probe.min_col, probe.max_col, probe.min_row, probe.max_row);
            let mut count = 0;
            while let Some((_, _, pos)) = iter.next() {
                let row = rotation.pos2_row(pos);
                let col = rotation.pos2_col(pos);
                assert!(col >= min_col && col < max_col, "col {col} outside [{min_col},{max_col})");
                // The very first position intentionally starts one row early
                // ("render a bit earlier on the top right", relrow = -1).
                assert!(row >= min_row - 1 && row < max_row, "row {row} outside [{min_row}-1,{max_row})");
                count += 1;
                assert!(count < 100_000, "iterator did not terminate");
            }
            assert!(count > 0);
        }
    }

    #[test]
    fn iterator_terminates_for_every_rotation() {
        for rotation in RENDER_ROTATIONS {
            let iter = TopBlockIter::new(TilePos::new(3, -2), 16, 2, rotation);
            let count = iter.take(1_000_000).count();
            assert!(count < 1_000_000, "iterator ran away for {rotation:?}");
        }
    }
}
