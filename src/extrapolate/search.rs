use std::fmt::Write as _;
use std::ops::Range;

use crate::extrapolate::tables::{MAX_BUNDLE, SearchTables, tables};
use crate::foundation::core::{PixelId, TILE_PIXELS, TILE_SIZE, pixel_id};
use crate::tile::bit_tile;

/// For every position of a tile, the id of the nearest pixel set in `mask`.
///
/// Distance is Euclidean inside the tile; among equally near pixels the lowest id wins. A set
/// pixel maps to itself. `mask` must not be zero.
pub fn search_active_nearest_pixel(mask: u64) -> [PixelId; TILE_PIXELS] {
    search_with_bundle(mask, bundle_for(mask))
}

/// Same as [`search_active_nearest_pixel`] but only fills positions inside `xs` x `ys`;
/// other entries of `out` are left as they were.
pub fn search_active_nearest_pixel_in(
    mask: u64,
    out: &mut [PixelId; TILE_PIXELS],
    xs: Range<u32>,
    ys: Range<u32>,
) {
    debug_assert!(mask != 0, "nearest-pixel search needs at least one active pixel");
    let t = tables();
    let bundle = bundle_for(mask);
    for y in ys.start..ys.end.min(TILE_SIZE) {
        for x in xs.start..xs.end.min(TILE_SIZE) {
            let p = pixel_id(x, y) as usize;
            out[p] = nearest(t, mask, p, bundle);
        }
    }
}

/// Search with a fixed number of rings per phase. Every bundle size gives the same answer;
/// they differ only in speed for a given mask density.
pub fn search_with_bundle(mask: u64, bundle: usize) -> [PixelId; TILE_PIXELS] {
    debug_assert!(mask != 0, "nearest-pixel search needs at least one active pixel");
    let t = tables();
    let bundle = bundle.clamp(1, MAX_BUNDLE);
    let mut out = [0; TILE_PIXELS];
    for (p, slot) in out.iter_mut().enumerate() {
        *slot = nearest(t, mask, p, bundle);
    }
    out
}

/// Bundle size used for `mask`: sparse masks skip more rings per test.
pub fn bundle_for(mask: u64) -> usize {
    match bit_tile::popcount(mask) {
        0..=1 => 3,
        2..=18 => 2,
        _ => 1,
    }
}

fn nearest(t: &SearchTables, mask: u64, pix: usize, bundle: usize) -> PixelId {
    let rings = t.rings(pix);
    for (phase, &union) in t.phases(bundle, pix).iter().enumerate() {
        if union & mask == 0 {
            continue;
        }
        for &ring in &rings[phase * bundle..] {
            let hit = ring & mask;
            if hit != 0 {
                return hit.trailing_zeros() as PixelId;
            }
        }
    }
    pix as PixelId
}

/// 8x8 grid of ids, top row first.
pub fn show_pix_id_array(ids: &[PixelId; TILE_PIXELS]) -> String {
    let mut out = String::from("pixIdArray {\n");
    for y in (0..TILE_SIZE).rev() {
        out.push_str("  ");
        for x in 0..TILE_SIZE {
            let _ = write!(out, "{:>2o} ", ids[pixel_id(x, y) as usize]);
        }
        out.push('\n');
    }
    out.push('}');
    out
}

#[cfg(test)]
#[path = "../../tests/unit/extrapolate/search.rs"]
mod tests;
