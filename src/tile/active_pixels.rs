//! Per-pixel "has data" bitmask for one image, stored as a grid of 8x8 tiles.
//!
//! Used as the cumulative mask of an accumulator buffer, as the per-call change mask produced
//! by a merge, and as the input of tile extrapolation.

use std::fmt::Write as _;

use crate::foundation::core::{TILE_PIXELS, TileGeometry};
use crate::tile::bit_tile;

/// Tiled active-pixel mask of one image.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActivePixels {
    geometry: TileGeometry,
    tiles: Vec<u64>,
}

impl ActivePixels {
    /// Allocated and cleared mask for a `width` x `height` image.
    pub fn new(width: u32, height: u32) -> Self {
        let mut out = Self::default();
        out.init(width, height);
        out
    }

    /// Resize to `width` x `height` and clear. Keeps the current contents when the size is
    /// unchanged.
    pub fn init(&mut self, width: u32, height: u32) {
        if self.geometry.width == width && self.geometry.height == height {
            return;
        }
        self.geometry = TileGeometry::new(width, height);
        self.tiles.clear();
        self.tiles.resize(self.geometry.tile_total(), 0);
    }

    /// Drop all storage and return to the zero-sized state.
    pub fn clean_up(&mut self) {
        self.geometry = TileGeometry::default();
        self.tiles = Vec::new();
    }

    /// `true` once sized to a non-empty image.
    pub fn is_active(&self) -> bool {
        !self.geometry.is_empty()
    }

    /// `true` if both masks cover the same image size.
    pub fn is_same_size(&self, other: &ActivePixels) -> bool {
        self.geometry.width == other.geometry.width
            && self.geometry.height == other.geometry.height
    }

    /// Clear every tile.
    pub fn reset(&mut self) {
        self.tiles.fill(0);
    }

    /// Clear only the tiles flagged in `subset`.
    pub fn reset_tiles(&mut self, subset: &[bool]) {
        debug_assert_eq!(subset.len(), self.tiles.len());
        for (tile, &flag) in self.tiles.iter_mut().zip(subset) {
            if flag {
                *tile = 0;
            }
        }
    }

    /// `true` if every tile flagged in `subset` is clear.
    pub fn verify_reset(&self, subset: &[bool]) -> bool {
        if subset.len() != self.tiles.len() {
            return false;
        }
        self.tiles
            .iter()
            .zip(subset)
            .all(|(&tile, &flag)| !flag || tile == 0)
    }

    /// Image geometry.
    pub fn geometry(&self) -> TileGeometry {
        self.geometry
    }

    /// Original width.
    pub fn width(&self) -> u32 {
        self.geometry.width
    }

    /// Original height.
    pub fn height(&self) -> u32 {
        self.geometry.height
    }

    /// Number of tiles.
    pub fn num_tiles(&self) -> usize {
        self.tiles.len()
    }

    /// Mask of tile `tile_id`.
    pub fn tile_mask(&self, tile_id: usize) -> u64 {
        self.tiles[tile_id]
    }

    /// Overwrite the mask of tile `tile_id`.
    pub fn set_tile_mask(&mut self, tile_id: usize, mask: u64) {
        self.tiles[tile_id] = mask;
    }

    /// OR `mask` into tile `tile_id`.
    pub fn or_tile(&mut self, tile_id: usize, mask: u64) {
        self.tiles[tile_id] = bit_tile::or_mask(self.tiles[tile_id], mask);
    }

    /// Pixels of tile `tile_id` inside the unpadded image.
    pub fn tile_valid_mask(&self, tile_id: usize) -> u64 {
        self.geometry.tile_valid_mask(tile_id)
    }

    /// All tile masks in tile id order.
    pub fn tiles(&self) -> &[u64] {
        &self.tiles
    }

    /// Mutable tile masks; the tile count is fixed by [`ActivePixels::init`].
    pub fn tiles_mut(&mut self) -> &mut [u64] {
        &mut self.tiles
    }

    /// Bounds-checked test of image pixel `(x, y)`. `false` outside the unpadded image.
    pub fn is_active_pixel(&self, x: u32, y: u32) -> bool {
        match self.geometry.locate(x, y) {
            Some((tile_id, pix)) => (self.tiles[tile_id] >> pix) & 1 != 0,
            None => false,
        }
    }

    /// Set image pixel `(x, y)`. Returns `false` outside the unpadded image.
    pub fn set_active_pixel(&mut self, x: u32, y: u32) -> bool {
        match self.geometry.locate(x, y) {
            Some((tile_id, pix)) => {
                self.tiles[tile_id] |= 1u64 << pix;
                true
            }
            None => false,
        }
    }

    /// Tile-wise OR with `other`. Returns `false` and leaves `self` untouched if the sizes
    /// differ.
    pub fn or_op(&mut self, other: &ActivePixels) -> bool {
        if self.geometry != other.geometry || self.tiles.len() != other.tiles.len() {
            return false;
        }
        for (dst, &src) in self.tiles.iter_mut().zip(&other.tiles) {
            *dst |= src;
        }
        true
    }

    /// Become an exact copy of `src`, reusing storage.
    pub fn copy_from(&mut self, src: &ActivePixels) {
        self.init(src.geometry.width, src.geometry.height);
        self.tiles.copy_from_slice(&src.tiles);
    }

    /// Count of tiles with at least one active pixel.
    pub fn active_tile_total(&self) -> usize {
        self.tiles.iter().filter(|&&t| t != 0).count()
    }

    /// Count of active pixels.
    pub fn active_pixel_total(&self) -> usize {
        self.tiles
            .iter()
            .map(|&t| bit_tile::popcount(t) as usize)
            .sum()
    }

    /// Call `f` with the tiled array offset of every active pixel. Returns the count.
    pub fn for_each_active_pixel(&self, mut f: impl FnMut(usize)) -> usize {
        let mut total = 0;
        for (tile_id, &mask) in self.tiles.iter().enumerate() {
            for pix in bit_tile::iter_set_bits(mask) {
                f(tile_id * TILE_PIXELS + pix as usize);
                total += 1;
            }
        }
        total
    }

    /// One-line size and population summary.
    pub fn show(&self) -> String {
        format!(
            "ActivePixels {{ w:{} h:{} alignedW:{} alignedH:{} tilesX:{} tilesY:{} tiles:{} activeTiles:{} activePixels:{} }}",
            self.geometry.width,
            self.geometry.height,
            self.geometry.aligned_width,
            self.geometry.aligned_height,
            self.geometry.num_tiles_x,
            self.geometry.num_tiles_y,
            self.tiles.len(),
            self.active_tile_total(),
            self.active_pixel_total(),
        )
    }

    /// Tile map with `*` for active tiles, top tile row first.
    pub fn show_tiles(&self) -> String {
        let g = self.geometry;
        let mut out = String::new();
        for ty in (0..g.num_tiles_y).rev() {
            for tx in 0..g.num_tiles_x {
                let active = self.tiles[g.tile_id(tx, ty)] != 0;
                let _ = write!(out, "{} ", if active { '*' } else { '.' });
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/tile/active_pixels.rs"]
mod tests;
