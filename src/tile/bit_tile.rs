//! 8x8 pixel bitmask primitives.
//!
//! One tile is a `u64`; bit `y * 8 + x` is pixel `(x, y)` of the tile, bit 0 is `(0, 0)`.

use std::fmt::Write as _;

use crate::foundation::core::{TILE_SIZE, pixel_id};

/// Mask with every pixel of a tile set.
pub const FULL_MASK: u64 = u64::MAX;

/// `true` if pixel `(x, y)` is set in `tile`.
#[inline]
pub fn is_set(tile: u64, x: u32, y: u32) -> bool {
    (tile >> pixel_id(x, y)) & 1 != 0
}

/// `tile` with pixel `(x, y)` set.
#[inline]
pub fn set_mask(tile: u64, x: u32, y: u32) -> u64 {
    tile | (1u64 << pixel_id(x, y))
}

/// Bitwise union of two tiles.
#[inline]
pub fn or_mask(a: u64, b: u64) -> u64 {
    a | b
}

/// Number of set pixels.
#[inline]
pub fn popcount(tile: u64) -> u32 {
    tile.count_ones()
}

/// Mask of the first `cols` columns of the first `rows` rows.
pub fn valid_mask(cols: u32, rows: u32) -> u64 {
    let cols = cols.min(TILE_SIZE);
    let rows = rows.min(TILE_SIZE);
    if cols == 0 || rows == 0 {
        return 0;
    }
    let row = if cols == TILE_SIZE { 0xff } else { (1u64 << cols) - 1 };
    let mut mask = 0u64;
    for y in 0..rows {
        mask |= row << (y * TILE_SIZE);
    }
    mask
}

/// Iterate set pixel ids in ascending order.
pub fn iter_set_bits(mut tile: u64) -> impl Iterator<Item = u32> {
    std::iter::from_fn(move || {
        if tile == 0 {
            return None;
        }
        let bit = tile.trailing_zeros();
        tile &= tile - 1;
        Some(bit)
    })
}

/// Human-readable 8x8 dump, top row (`y = 7`) first, set pixels shown by their octal id.
pub fn show_mask(tile: u64) -> String {
    let mut out = format!("mask 0x{tile:016x} {{\n");
    for y in (0..TILE_SIZE).rev() {
        out.push_str("  ");
        for x in 0..TILE_SIZE {
            if is_set(tile, x, y) {
                let _ = write!(out, "{:>2o} ", pixel_id(x, y));
            } else {
                out.push_str(" . ");
            }
        }
        out.push('\n');
    }
    out.push('}');
    out
}

#[cfg(test)]
#[path = "../../tests/unit/tile/bit_tile.rs"]
mod tests;
