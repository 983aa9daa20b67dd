//! Snapshot-delta merge of one buffer kind across all tiles.

use rayon::prelude::*;

use crate::foundation::core::TILE_PIXELS;
use crate::foundation::error::{MergeError, MergeResult};
use crate::merge::opts::MergeOpts;
use crate::merge::rule::{MergeValue, PixelBuffer, merge_tile, merge_tile_uncounted};
use crate::tile::active_pixels::ActivePixels;
use crate::tile::bit_tile;

/// Read side of a merge: tiled values, optional per-pixel counts and the active mask.
#[derive(Debug)]
pub struct SrcLayer<'a, V: ?Sized> {
    /// Tiled values.
    pub values: &'a V,
    /// Tiled sample counts; `None` for uncounted kinds.
    pub counts: Option<&'a [u32]>,
    /// Pixels holding data.
    pub mask: &'a ActivePixels,
}

impl<V: ?Sized> Clone for SrcLayer<'_, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V: ?Sized> Copy for SrcLayer<'_, V> {}

/// Write side of a merge. `mask` is the cumulative mask of everything merged so far.
#[derive(Debug)]
pub struct DstLayer<'a, V: ?Sized> {
    /// Tiled values.
    pub values: &'a mut V,
    /// Tiled sample counts; `None` for uncounted kinds.
    pub counts: Option<&'a mut [u32]>,
    /// Cumulative mask.
    pub mask: &'a mut ActivePixels,
}

/// Merge `src` into `dst` and write this call's changed pixels to `out`.
///
/// Every tile of `out` is overwritten. Source pixels in the padding area are ignored. Fails
/// before touching anything if the two layers disagree on size or layout. Returns the number
/// of changed pixels.
pub fn snapshot_delta<T: MergeValue>(
    dst: DstLayer<'_, [T]>,
    src: SrcLayer<'_, [T]>,
    out: &mut ActivePixels,
    opts: &MergeOpts,
) -> MergeResult<usize> {
    if !dst.mask.is_same_size(src.mask) {
        return Err(MergeError::dimension_mismatch(
            (src.mask.width(), src.mask.height()),
            (dst.mask.width(), dst.mask.height()),
        ));
    }
    let pixel_total = dst.mask.num_tiles() * TILE_PIXELS;
    check_len("dst values", dst.values.len(), pixel_total)?;
    check_len("src values", src.values.len(), pixel_total)?;

    let counts = match (dst.counts, src.counts) {
        (Some(dst_counts), Some(src_counts)) => {
            check_len("dst counts", dst_counts.len(), pixel_total)?;
            check_len("src counts", src_counts.len(), pixel_total)?;
            Some((dst_counts, src_counts))
        }
        (None, None) => None,
        _ => {
            return Err(MergeError::unsupported(
                "source and destination disagree on sample counts",
            ));
        }
    };

    let geometry = dst.mask.geometry();
    out.init(geometry.width, geometry.height);

    Ok(match counts {
        Some((dst_counts, src_counts)) => run_counted(
            dst.values,
            dst_counts,
            dst.mask,
            src.values,
            src_counts,
            src.mask,
            out,
            opts,
        ),
        None => run_uncounted(dst.values, dst.mask, src.values, src.mask, out, opts),
    })
}

/// [`snapshot_delta`] over runtime-typed values. Both sides must hold the same element kind.
pub fn snapshot_delta_buffer(
    dst: DstLayer<'_, PixelBuffer>,
    src: SrcLayer<'_, PixelBuffer>,
    out: &mut ActivePixels,
    opts: &MergeOpts,
) -> MergeResult<usize> {
    let DstLayer {
        values,
        counts,
        mask,
    } = dst;

    macro_rules! typed {
        ($d:expr, $s:expr) => {
            snapshot_delta(
                DstLayer {
                    values: $d.as_mut_slice(),
                    counts,
                    mask,
                },
                SrcLayer {
                    values: $s.as_slice(),
                    counts: src.counts,
                    mask: src.mask,
                },
                out,
                opts,
            )
        };
    }

    match (values, src.values) {
        (PixelBuffer::Float(d), PixelBuffer::Float(s)) => typed!(d, s),
        (PixelBuffer::Float2(d), PixelBuffer::Float2(s)) => typed!(d, s),
        (PixelBuffer::Float3(d), PixelBuffer::Float3(s)) => typed!(d, s),
        (PixelBuffer::Float4(d), PixelBuffer::Float4(s)) => typed!(d, s),
        (d, s) => Err(MergeError::unsupported(format!(
            "element kind mismatch: dst {:?}, src {:?}",
            d.kind(),
            s.kind()
        ))),
    }
}

fn check_len(what: &str, got: usize, want: usize) -> MergeResult<()> {
    if got != want {
        return Err(MergeError::validation(format!(
            "{what} hold {got} pixels, tile grid needs {want}"
        )));
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_counted<T: MergeValue>(
    dst_values: &mut [T],
    dst_counts: &mut [u32],
    dst_mask: &mut ActivePixels,
    src_values: &[T],
    src_counts: &[u32],
    src_mask: &ActivePixels,
    out: &mut ActivePixels,
    opts: &MergeOpts,
) -> usize {
    let geometry = dst_mask.geometry();
    let src_tiles = src_mask.tiles();
    let dst_tiles = dst_mask.tiles_mut();
    let out_tiles = out.tiles_mut();

    if opts.parallel {
        (
            dst_values.par_chunks_mut(TILE_PIXELS),
            dst_counts.par_chunks_mut(TILE_PIXELS),
            dst_tiles.par_iter_mut(),
            out_tiles.par_iter_mut(),
            src_values.par_chunks(TILE_PIXELS),
            src_counts.par_chunks(TILE_PIXELS),
            src_tiles.par_iter(),
        )
            .into_par_iter()
            .enumerate()
            .with_min_len(opts.grain())
            .map(|(tile_id, (dv, dc, dm, om, sv, sc, &sm))| {
                let sm = sm & geometry.tile_valid_mask(tile_id);
                counted_tile(dv, dc, dm, om, sv, sc, sm)
            })
            .sum()
    } else {
        let mut total = 0;
        for (tile_id, (dm, om)) in dst_tiles.iter_mut().zip(out_tiles.iter_mut()).enumerate() {
            let px = tile_id * TILE_PIXELS..(tile_id + 1) * TILE_PIXELS;
            let sm = src_tiles[tile_id] & geometry.tile_valid_mask(tile_id);
            total += counted_tile(
                &mut dst_values[px.clone()],
                &mut dst_counts[px.clone()],
                dm,
                om,
                &src_values[px.clone()],
                &src_counts[px],
                sm,
            );
        }
        total
    }
}

fn counted_tile<T: MergeValue>(
    dst_values: &mut [T],
    dst_counts: &mut [u32],
    dst_mask: &mut u64,
    out_mask: &mut u64,
    src_values: &[T],
    src_counts: &[u32],
    src_mask: u64,
) -> usize {
    if src_mask == 0 {
        *out_mask = 0;
        return 0;
    }
    let changed = merge_tile(dst_values, dst_counts, src_values, src_counts, src_mask);
    *dst_mask = bit_tile::or_mask(*dst_mask, changed);
    *out_mask = changed;
    bit_tile::popcount(changed) as usize
}

fn run_uncounted<T: MergeValue>(
    dst_values: &mut [T],
    dst_mask: &mut ActivePixels,
    src_values: &[T],
    src_mask: &ActivePixels,
    out: &mut ActivePixels,
    opts: &MergeOpts,
) -> usize {
    let geometry = dst_mask.geometry();
    let src_tiles = src_mask.tiles();
    let dst_tiles = dst_mask.tiles_mut();
    let out_tiles = out.tiles_mut();

    if opts.parallel {
        (
            dst_values.par_chunks_mut(TILE_PIXELS),
            dst_tiles.par_iter_mut(),
            out_tiles.par_iter_mut(),
            src_values.par_chunks(TILE_PIXELS),
            src_tiles.par_iter(),
        )
            .into_par_iter()
            .enumerate()
            .with_min_len(opts.grain())
            .map(|(tile_id, (dv, dm, om, sv, &sm))| {
                let sm = sm & geometry.tile_valid_mask(tile_id);
                uncounted_tile(dv, dm, om, sv, sm)
            })
            .sum()
    } else {
        let mut total = 0;
        for (tile_id, (dm, om)) in dst_tiles.iter_mut().zip(out_tiles.iter_mut()).enumerate() {
            let px = tile_id * TILE_PIXELS..(tile_id + 1) * TILE_PIXELS;
            let sm = src_tiles[tile_id] & geometry.tile_valid_mask(tile_id);
            total += uncounted_tile(&mut dst_values[px.clone()], dm, om, &src_values[px], sm);
        }
        total
    }
}

fn uncounted_tile<T: MergeValue>(
    dst_values: &mut [T],
    dst_mask: &mut u64,
    out_mask: &mut u64,
    src_values: &[T],
    src_mask: u64,
) -> usize {
    if src_mask == 0 {
        *out_mask = 0;
        return 0;
    }
    let changed = merge_tile_uncounted(dst_values, *dst_mask, src_values, src_mask);
    *dst_mask |= changed;
    *out_mask = changed;
    bit_tile::popcount(changed) as usize
}

#[cfg(test)]
#[path = "../../tests/unit/merge/engine.rs"]
mod tests;
