//! Per-tile merge kernels and the element-type dispatch around them.

use crate::foundation::core::TILE_PIXELS;
use crate::foundation::error::{MergeError, MergeResult};
use crate::tile::bit_tile;

/// Pixel element a merge kernel can operate on.
///
/// Equality is bit-pattern equality of every channel, so `-0.0` differs from `0.0` and
/// identical NaN payloads compare equal.
pub trait MergeValue: Copy + Default + Send + Sync + 'static {
    /// Number of `f32` channels.
    const CHANNELS: usize;

    /// `true` if both values have identical bit patterns.
    fn same_bits(&self, other: &Self) -> bool;

    /// Value built from the first [`MergeValue::CHANNELS`] entries of `rgba`.
    fn from_rgba(rgba: [f32; 4]) -> Self;
}

impl MergeValue for f32 {
    const CHANNELS: usize = 1;

    #[inline]
    fn same_bits(&self, other: &Self) -> bool {
        self.to_bits() == other.to_bits()
    }

    fn from_rgba(rgba: [f32; 4]) -> Self {
        rgba[0]
    }
}

macro_rules! impl_merge_value_array {
    ($n:literal) => {
        impl MergeValue for [f32; $n] {
            const CHANNELS: usize = $n;

            #[inline]
            fn same_bits(&self, other: &Self) -> bool {
                self.iter()
                    .zip(other)
                    .all(|(a, b)| a.to_bits() == b.to_bits())
            }

            fn from_rgba(rgba: [f32; 4]) -> Self {
                let mut out = [0.0; $n];
                out.copy_from_slice(&rgba[..$n]);
                out
            }
        }
    };
}

impl_merge_value_array!(2);
impl_merge_value_array!(3);
impl_merge_value_array!(4);

/// Merge one tile of a counted buffer and return the mask of pixels that changed.
///
/// For every pixel set in `src_mask` with a non-zero source count whose value or count differs
/// from the destination, value and count are copied over. Pixels with a zero source count are
/// never touched. All slices hold exactly one tile (64 entries).
pub fn merge_tile<T: MergeValue>(
    dst_values: &mut [T],
    dst_counts: &mut [u32],
    src_values: &[T],
    src_counts: &[u32],
    src_mask: u64,
) -> u64 {
    debug_assert_eq!(dst_values.len(), TILE_PIXELS);
    debug_assert_eq!(dst_counts.len(), TILE_PIXELS);
    debug_assert_eq!(src_values.len(), TILE_PIXELS);
    debug_assert_eq!(src_counts.len(), TILE_PIXELS);

    let mut changed = 0u64;
    for pix in bit_tile::iter_set_bits(src_mask) {
        let p = pix as usize;
        let count = src_counts[p];
        if count == 0 {
            continue;
        }
        if !dst_values[p].same_bits(&src_values[p]) || dst_counts[p] != count {
            dst_values[p] = src_values[p];
            dst_counts[p] = count;
            changed |= 1u64 << pix;
        }
    }
    changed
}

/// Merge one tile of a buffer without sample counts.
///
/// A destination pixel whose bit is clear in `dst_mask` holds no value yet and always takes
/// the source value.
pub fn merge_tile_uncounted<T: MergeValue>(
    dst_values: &mut [T],
    dst_mask: u64,
    src_values: &[T],
    src_mask: u64,
) -> u64 {
    debug_assert_eq!(dst_values.len(), TILE_PIXELS);
    debug_assert_eq!(src_values.len(), TILE_PIXELS);

    let mut changed = 0u64;
    for pix in bit_tile::iter_set_bits(src_mask) {
        let p = pix as usize;
        let fresh = (dst_mask >> pix) & 1 == 0;
        if fresh || !dst_values[p].same_bits(&src_values[p]) {
            dst_values[p] = src_values[p];
            changed |= 1u64 << pix;
        }
    }
    changed
}

/// Channel layout of a [`PixelBuffer`].
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    /// One channel.
    #[default]
    Float,
    /// Two channels.
    Float2,
    /// Three channels.
    Float3,
    /// Four channels.
    Float4,
}

impl ElementKind {
    /// Number of `f32` channels.
    pub fn channels(self) -> usize {
        match self {
            Self::Float => 1,
            Self::Float2 => 2,
            Self::Float3 => 3,
            Self::Float4 => 4,
        }
    }

    /// Layout with `channels` floats per pixel.
    pub fn from_channels(channels: usize) -> MergeResult<Self> {
        match channels {
            1 => Ok(Self::Float),
            2 => Ok(Self::Float2),
            3 => Ok(Self::Float3),
            4 => Ok(Self::Float4),
            n => Err(MergeError::unsupported(format!(
                "no merge rule for {n} channels per pixel"
            ))),
        }
    }
}

/// Tiled pixel values of one of the supported element kinds.
#[derive(Clone, Debug, PartialEq)]
pub enum PixelBuffer {
    /// One channel per pixel.
    Float(Vec<f32>),
    /// Two channels per pixel.
    Float2(Vec<[f32; 2]>),
    /// Three channels per pixel.
    Float3(Vec<[f32; 3]>),
    /// Four channels per pixel.
    Float4(Vec<[f32; 4]>),
}

impl Default for PixelBuffer {
    fn default() -> Self {
        Self::Float(Vec::new())
    }
}

impl PixelBuffer {
    /// `len` pixels of `kind`, each set to the leading channels of `fill`.
    pub fn filled(kind: ElementKind, len: usize, fill: [f32; 4]) -> Self {
        match kind {
            ElementKind::Float => Self::Float(vec![f32::from_rgba(fill); len]),
            ElementKind::Float2 => Self::Float2(vec![<[f32; 2]>::from_rgba(fill); len]),
            ElementKind::Float3 => Self::Float3(vec![<[f32; 3]>::from_rgba(fill); len]),
            ElementKind::Float4 => Self::Float4(vec![<[f32; 4]>::from_rgba(fill); len]),
        }
    }

    /// Element kind of the stored values.
    pub fn kind(&self) -> ElementKind {
        match self {
            Self::Float(_) => ElementKind::Float,
            Self::Float2(_) => ElementKind::Float2,
            Self::Float3(_) => ElementKind::Float3,
            Self::Float4(_) => ElementKind::Float4,
        }
    }

    /// Number of pixels.
    pub fn len(&self) -> usize {
        match self {
            Self::Float(v) => v.len(),
            Self::Float2(v) => v.len(),
            Self::Float3(v) => v.len(),
            Self::Float4(v) => v.len(),
        }
    }

    /// `true` when no pixels are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Overwrite every pixel with the leading channels of `fill`.
    pub fn fill(&mut self, fill: [f32; 4]) {
        match self {
            Self::Float(v) => v.fill(f32::from_rgba(fill)),
            Self::Float2(v) => v.fill(<[f32; 2]>::from_rgba(fill)),
            Self::Float3(v) => v.fill(<[f32; 3]>::from_rgba(fill)),
            Self::Float4(v) => v.fill(<[f32; 4]>::from_rgba(fill)),
        }
    }

    /// Pixel at `offset` widened to four channels; missing channels read as zero.
    pub fn get_rgba(&self, offset: usize) -> Option<[f32; 4]> {
        fn widen<const N: usize>(v: &[f32; N]) -> [f32; 4] {
            let mut out = [0.0; 4];
            out[..N].copy_from_slice(v);
            out
        }
        match self {
            Self::Float(v) => v.get(offset).map(|&x| [x, 0.0, 0.0, 0.0]),
            Self::Float2(v) => v.get(offset).map(widen),
            Self::Float3(v) => v.get(offset).map(widen),
            Self::Float4(v) => v.get(offset).copied(),
        }
    }

    /// Write the leading channels of `value` at `offset`. Returns `false` when out of range.
    pub fn set_rgba(&mut self, offset: usize, value: [f32; 4]) -> bool {
        fn put<T: MergeValue>(v: &mut [T], offset: usize, value: [f32; 4]) -> bool {
            match v.get_mut(offset) {
                Some(slot) => {
                    *slot = T::from_rgba(value);
                    true
                }
                None => false,
            }
        }
        match self {
            Self::Float(v) => put(v, offset, value),
            Self::Float2(v) => put(v, offset, value),
            Self::Float3(v) => put(v, offset, value),
            Self::Float4(v) => put(v, offset, value),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/merge/rule.rs"]
mod tests;
