/// Tile edge length in pixels.
pub const TILE_SIZE: u32 = 8;
/// Pixels per tile; also the bit width of a tile mask.
pub const TILE_PIXELS: usize = 64;

/// Tile-local pixel id in `0..64`, laid out as `y * 8 + x`.
pub type PixelId = u8;

/// Tile grid derived from an image size.
///
/// The image is padded up to a multiple of [`TILE_SIZE`] on both axes. Pixel storage is tiled:
/// pixel `(x, y)` of the image lives at `tile_id * 64 + (y % 8) * 8 + (x % 8)`.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct TileGeometry {
    /// Original image width.
    pub width: u32,
    /// Original image height.
    pub height: u32,
    /// Width rounded up to a multiple of 8. Wider than `u32` so the largest sides still pad.
    pub aligned_width: u64,
    /// Height rounded up to a multiple of 8.
    pub aligned_height: u64,
    /// Tile columns.
    pub num_tiles_x: u32,
    /// Tile rows.
    pub num_tiles_y: u32,
}

impl TileGeometry {
    /// Geometry for a `width` x `height` image.
    pub fn new(width: u32, height: u32) -> Self {
        let num_tiles_x = width.div_ceil(TILE_SIZE);
        let num_tiles_y = height.div_ceil(TILE_SIZE);
        Self {
            width,
            height,
            aligned_width: tile_span(num_tiles_x),
            aligned_height: tile_span(num_tiles_y),
            num_tiles_x,
            num_tiles_y,
        }
    }

    /// `true` when either side is zero.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of tiles covering the padded image.
    pub fn tile_total(self) -> usize {
        self.num_tiles_x as usize * self.num_tiles_y as usize
    }

    /// Number of elements in a tiled per-pixel array for this geometry.
    pub fn pixel_total(self) -> usize {
        self.tile_total() * TILE_PIXELS
    }

    /// Row-major tile id.
    pub fn tile_id(self, tile_x: u32, tile_y: u32) -> usize {
        tile_y as usize * self.num_tiles_x as usize + tile_x as usize
    }

    /// Tile id and in-tile pixel id for image coordinate `(x, y)`, or `None` outside the
    /// unpadded image.
    pub fn locate(self, x: u32, y: u32) -> Option<(usize, PixelId)> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let tile_id = self.tile_id(x / TILE_SIZE, y / TILE_SIZE);
        Some((tile_id, pixel_id(x % TILE_SIZE, y % TILE_SIZE)))
    }

    /// Offset into a tiled per-pixel array, or `None` outside the unpadded image.
    pub fn tiled_offset(self, x: u32, y: u32) -> Option<usize> {
        self.locate(x, y)
            .map(|(tile_id, pix)| tile_id * TILE_PIXELS + pix as usize)
    }

    /// Pixels of tile `tile_id` that fall inside the unpadded image, as a tile mask.
    pub fn tile_valid_mask(self, tile_id: usize) -> u64 {
        if self.num_tiles_x == 0 {
            return 0;
        }
        let tile_x = (tile_id % self.num_tiles_x as usize) as u32;
        let tile_y = (tile_id / self.num_tiles_x as usize) as u32;
        let cols = self.width.saturating_sub(tile_x * TILE_SIZE).min(TILE_SIZE);
        let rows = self.height.saturating_sub(tile_y * TILE_SIZE).min(TILE_SIZE);
        crate::tile::bit_tile::valid_mask(cols, rows)
    }
}

/// Tile-local pixel id for `(x, y)` with both in `0..8`.
pub fn pixel_id(x: u32, y: u32) -> PixelId {
    debug_assert!(x < TILE_SIZE && y < TILE_SIZE);
    ((y << 3) + x) as PixelId
}

fn tile_span(tiles: u32) -> u64 {
    u64::from(tiles) * u64::from(TILE_SIZE)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
