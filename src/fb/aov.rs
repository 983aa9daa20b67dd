//! Arbitrary output variable (AOV) accumulators of a frame buffer.

use crate::foundation::core::TileGeometry;
use crate::merge::engine::{DstLayer, SrcLayer};
use crate::merge::rule::{ElementKind, PixelBuffer};
use crate::tile::active_pixels::ActivePixels;

/// Intrinsic buffer an AOV can alias instead of owning pixels.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// Beauty RGB.
    Beauty,
    /// Beauty alpha.
    Alpha,
    /// Per-pixel render time.
    HeatMap,
    /// Pixel filter weight.
    Weight,
    /// Odd-sample beauty RGB.
    BeautyAux,
    /// Odd-sample beauty alpha.
    AlphaAux,
}

/// Owned pixels of an AOV.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AovBuffer {
    values: PixelBuffer,
    counts: Vec<u32>,
    active: ActivePixels,
}

impl AovBuffer {
    /// Buffer for a `width` x `height` image with every value set to `fill`.
    pub fn new(kind: ElementKind, width: u32, height: u32, fill: [f32; 4]) -> Self {
        let active = ActivePixels::new(width, height);
        let len = active.geometry().pixel_total();
        Self {
            values: PixelBuffer::filled(kind, len, fill),
            counts: vec![0; len],
            active,
        }
    }

    /// Element kind of the values.
    pub fn kind(&self) -> ElementKind {
        self.values.kind()
    }

    /// Image geometry.
    pub fn geometry(&self) -> TileGeometry {
        self.active.geometry()
    }

    /// Tiled values.
    pub fn values(&self) -> &PixelBuffer {
        &self.values
    }

    /// Tiled sample counts.
    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    /// Pixels holding data.
    pub fn active(&self) -> &ActivePixels {
        &self.active
    }

    /// Store a sample for pixel `(x, y)`. Returns `false` outside the image.
    pub fn set_pixel(&mut self, x: u32, y: u32, value: [f32; 4], count: u32) -> bool {
        let Some(offset) = self.active.geometry().tiled_offset(x, y) else {
            return false;
        };
        self.values.set_rgba(offset, value);
        self.counts[offset] = count;
        self.active.set_active_pixel(x, y)
    }

    /// Value and count of pixel `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<([f32; 4], u32)> {
        let offset = self.active.geometry().tiled_offset(x, y)?;
        Some((self.values.get_rgba(offset)?, self.counts[offset]))
    }

    /// Reset every value to `fill`, counts to zero and the mask to empty.
    pub fn clear(&mut self, fill: [f32; 4]) {
        self.values.fill(fill);
        self.counts.fill(0);
        self.active.reset();
    }

    pub(crate) fn src_layer(&self) -> SrcLayer<'_, PixelBuffer> {
        SrcLayer {
            values: &self.values,
            counts: Some(&self.counts),
            mask: &self.active,
        }
    }

    pub(crate) fn dst_layer(&mut self) -> DstLayer<'_, PixelBuffer> {
        DstLayer {
            values: &mut self.values,
            counts: Some(&mut self.counts),
            mask: &mut self.active,
        }
    }
}

/// Pixel storage of an AOV.
#[derive(Clone, Debug, PartialEq)]
pub enum AovStorage {
    /// Pixels owned by the AOV.
    Owned(AovBuffer),
    /// Alias of an intrinsic buffer; no pixels of its own.
    Reference(ReferenceKind),
}

impl Default for AovStorage {
    fn default() -> Self {
        Self::Owned(AovBuffer::default())
    }
}

/// One named AOV of a frame buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct FbAov {
    name: String,
    storage: AovStorage,
    status: bool,
    default_value: [f32; 4],
    closest_filter: bool,
}

impl FbAov {
    /// Inactive, empty AOV.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            storage: AovStorage::default(),
            status: false,
            default_value: [0.0; 4],
            closest_filter: false,
        }
    }

    /// Activate with owned pixels of `kind`.
    ///
    /// Reallocates when the kind or size changed, clears when the AOV was inactive, keeps the
    /// accumulated pixels otherwise.
    pub fn setup(
        &mut self,
        kind: ElementKind,
        width: u32,
        height: u32,
        default_value: [f32; 4],
        closest_filter: bool,
    ) {
        let reuse = match &self.storage {
            AovStorage::Owned(buf) => {
                let g = buf.geometry();
                buf.kind() == kind && g.width == width && g.height == height
            }
            AovStorage::Reference(_) => false,
        };
        match &mut self.storage {
            AovStorage::Owned(buf) if reuse => {
                if !self.status {
                    buf.clear(default_value);
                }
            }
            storage => {
                *storage = AovStorage::Owned(AovBuffer::new(kind, width, height, default_value));
            }
        }
        self.default_value = default_value;
        self.closest_filter = closest_filter;
        self.status = true;
    }

    /// Activate as an alias of `kind`, freeing owned pixels.
    pub fn setup_reference(&mut self, kind: ReferenceKind) {
        self.storage = AovStorage::Reference(kind);
        self.status = true;
    }

    /// Mark inactive. Storage is kept for reuse.
    pub fn reset(&mut self) {
        self.status = false;
    }

    /// Free the storage of an inactive AOV.
    pub fn garbage_collect_unused(&mut self) {
        if !self.status {
            self.storage = AovStorage::default();
        }
    }

    /// AOV name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `true` while the AOV takes part in merges.
    pub fn is_active(&self) -> bool {
        self.status
    }

    /// Pixel storage.
    pub fn storage(&self) -> &AovStorage {
        &self.storage
    }

    /// Owned pixels, `None` for reference AOVs.
    pub fn buffer(&self) -> Option<&AovBuffer> {
        match &self.storage {
            AovStorage::Owned(buf) => Some(buf),
            AovStorage::Reference(_) => None,
        }
    }

    /// Mutable owned pixels, `None` for reference AOVs.
    pub fn buffer_mut(&mut self) -> Option<&mut AovBuffer> {
        match &mut self.storage {
            AovStorage::Owned(buf) => Some(buf),
            AovStorage::Reference(_) => None,
        }
    }

    /// Aliased intrinsic buffer, `None` for owned AOVs.
    pub fn reference(&self) -> Option<ReferenceKind> {
        match self.storage {
            AovStorage::Reference(kind) => Some(kind),
            AovStorage::Owned(_) => None,
        }
    }

    /// Value of pixels with no samples.
    pub fn default_value(&self) -> [f32; 4] {
        self.default_value
    }

    /// `true` if the AOV is reconstructed with a closest-sample filter.
    pub fn closest_filter(&self) -> bool {
        self.closest_filter
    }
}

#[cfg(test)]
#[path = "../../tests/unit/fb/aov.rs"]
mod tests;
