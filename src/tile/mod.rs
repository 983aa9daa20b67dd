/// Tiled per-pixel mask of one image.
pub mod active_pixels;
/// 8x8 bitmask primitives.
pub mod bit_tile;
