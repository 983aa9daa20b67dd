//! Accumulator frame buffer: intrinsic buffer kinds plus named AOVs.

use crate::fb::aov::FbAov;
use crate::fb::aov_table::{AovHandle, AovTable};
use crate::foundation::core::TileGeometry;
use crate::foundation::error::{MergeError, MergeResult};
use crate::merge::engine::{DstLayer, SrcLayer};
use crate::merge::rule::MergeValue;
use crate::tile::active_pixels::ActivePixels;

/// Tiled values of one buffer kind, with optional per-pixel sample counts.
#[derive(Clone, Debug, PartialEq)]
pub struct TiledBuffer<T> {
    values: Vec<T>,
    counts: Option<Vec<u32>>,
    active: ActivePixels,
}

impl<T: MergeValue> TiledBuffer<T> {
    /// Empty buffer that tracks sample counts.
    pub fn counted() -> Self {
        Self {
            values: Vec::new(),
            counts: Some(Vec::new()),
            active: ActivePixels::default(),
        }
    }

    /// Empty buffer without sample counts.
    pub fn uncounted() -> Self {
        Self {
            values: Vec::new(),
            counts: None,
            active: ActivePixels::default(),
        }
    }

    /// Size for a `width` x `height` image. Returns `true` if storage was reallocated (and
    /// zeroed); same-size calls keep the contents.
    pub fn init(&mut self, width: u32, height: u32) -> bool {
        if self.active.width() == width
            && self.active.height() == height
            && self.values.len() == self.active.geometry().pixel_total()
        {
            return false;
        }
        self.active = ActivePixels::new(width, height);
        let len = self.active.geometry().pixel_total();
        self.values = vec![T::default(); len];
        if let Some(counts) = &mut self.counts {
            *counts = vec![0; len];
        }
        true
    }

    /// Zero values, counts and mask.
    pub fn clear(&mut self) {
        self.values.fill(T::default());
        if let Some(counts) = &mut self.counts {
            counts.fill(0);
        }
        self.active.reset();
    }

    /// `true` if this kind tracks sample counts.
    pub fn is_counted(&self) -> bool {
        self.counts.is_some()
    }

    /// Image geometry.
    pub fn geometry(&self) -> TileGeometry {
        self.active.geometry()
    }

    /// Tiled values.
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Tiled sample counts, `None` for uncounted kinds.
    pub fn counts(&self) -> Option<&[u32]> {
        self.counts.as_deref()
    }

    /// Pixels holding data.
    pub fn active(&self) -> &ActivePixels {
        &self.active
    }

    /// Store a sample for pixel `(x, y)`; `count` is ignored by uncounted kinds. Returns
    /// `false` outside the image.
    pub fn set_pixel(&mut self, x: u32, y: u32, value: T, count: u32) -> bool {
        let Some(offset) = self.active.geometry().tiled_offset(x, y) else {
            return false;
        };
        self.values[offset] = value;
        if let Some(counts) = &mut self.counts {
            counts[offset] = count;
        }
        self.active.set_active_pixel(x, y)
    }

    /// Value and count (zero for uncounted kinds) of pixel `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<(T, u32)> {
        let offset = self.active.geometry().tiled_offset(x, y)?;
        let count = self.counts.as_ref().map_or(0, |c| c[offset]);
        Some((self.values[offset], count))
    }

    pub(crate) fn src_layer(&self) -> SrcLayer<'_, [T]> {
        SrcLayer {
            values: &self.values,
            counts: self.counts.as_deref(),
            mask: &self.active,
        }
    }

    pub(crate) fn dst_layer(&mut self) -> DstLayer<'_, [T]> {
        DstLayer {
            values: &mut self.values,
            counts: self.counts.as_deref_mut(),
            mask: &mut self.active,
        }
    }
}

/// Buffer kind that can be switched off without freeing its storage.
#[derive(Clone, Debug, PartialEq)]
pub struct OptionalBuffer<T> {
    enabled: bool,
    buffer: TiledBuffer<T>,
}

impl<T: MergeValue> OptionalBuffer<T> {
    fn new(buffer: TiledBuffer<T>) -> Self {
        Self {
            enabled: false,
            buffer,
        }
    }

    /// Enable for a `width` x `height` image. Allocates when the size changed, clears when
    /// the kind was disabled.
    pub fn setup(&mut self, width: u32, height: u32) {
        let reallocated = self.buffer.init(width, height);
        if !reallocated && !self.enabled {
            self.buffer.clear();
        }
        self.enabled = true;
    }

    /// Disable, keeping storage.
    pub fn reset(&mut self) {
        self.enabled = false;
    }

    /// `true` while enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Buffer if enabled.
    pub fn get(&self) -> Option<&TiledBuffer<T>> {
        self.enabled.then_some(&self.buffer)
    }

    /// Mutable buffer if enabled.
    pub fn get_mut(&mut self) -> Option<&mut TiledBuffer<T>> {
        if self.enabled {
            Some(&mut self.buffer)
        } else {
            None
        }
    }
}

/// Render accumulator for one image.
///
/// Beauty is always present. Pixel info, heat map, weight and the odd-sample beauty are
/// optional and enabled by their `setup_*` calls. AOVs are created on demand by name.
#[derive(Debug)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    pub(crate) beauty: TiledBuffer<[f32; 4]>,
    pub(crate) pixel_info: OptionalBuffer<f32>,
    pub(crate) heat_map: OptionalBuffer<f32>,
    pub(crate) weight: OptionalBuffer<f32>,
    pub(crate) beauty_odd: OptionalBuffer<[f32; 4]>,
    aovs: AovTable<FbAov>,
    render_output_status: bool,
}

impl FrameBuffer {
    /// Cleared frame buffer for a `width` x `height` image with only beauty enabled.
    pub fn new(width: u32, height: u32) -> Self {
        let mut fb = Self {
            width: 0,
            height: 0,
            beauty: TiledBuffer::counted(),
            pixel_info: OptionalBuffer::new(TiledBuffer::uncounted()),
            heat_map: OptionalBuffer::new(TiledBuffer::counted()),
            weight: OptionalBuffer::new(TiledBuffer::uncounted()),
            beauty_odd: OptionalBuffer::new(TiledBuffer::counted()),
            aovs: AovTable::default(),
            render_output_status: false,
        };
        fb.init(width, height);
        fb
    }

    /// Resize, clear beauty, disable optional kinds and deactivate every AOV.
    pub fn init(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        if !self.beauty.init(width, height) {
            self.beauty.clear();
        }
        self.pixel_info.reset();
        self.heat_map.reset();
        self.weight.reset();
        self.beauty_odd.reset();
        for (_, aov) in self.aovs.entries() {
            aov.lock().reset();
        }
        self.render_output_status = false;
    }

    /// Image width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `true` if both buffers cover the same image size.
    pub fn is_same_size(&self, other: &FrameBuffer) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Beauty RGBA with sample counts.
    pub fn beauty(&self) -> &TiledBuffer<[f32; 4]> {
        &self.beauty
    }

    /// Mutable beauty.
    pub fn beauty_mut(&mut self) -> &mut TiledBuffer<[f32; 4]> {
        &mut self.beauty
    }

    /// Depth per pixel, if enabled.
    pub fn pixel_info(&self) -> Option<&TiledBuffer<f32>> {
        self.pixel_info.get()
    }

    /// Mutable pixel info, if enabled.
    pub fn pixel_info_mut(&mut self) -> Option<&mut TiledBuffer<f32>> {
        self.pixel_info.get_mut()
    }

    /// Enable pixel info.
    pub fn setup_pixel_info(&mut self) {
        self.pixel_info.setup(self.width, self.height);
    }

    /// Disable pixel info.
    pub fn reset_pixel_info(&mut self) {
        self.pixel_info.reset();
    }

    /// Render time per pixel with sample counts, if enabled.
    pub fn heat_map(&self) -> Option<&TiledBuffer<f32>> {
        self.heat_map.get()
    }

    /// Mutable heat map, if enabled.
    pub fn heat_map_mut(&mut self) -> Option<&mut TiledBuffer<f32>> {
        self.heat_map.get_mut()
    }

    /// Enable the heat map.
    pub fn setup_heat_map(&mut self) {
        self.heat_map.setup(self.width, self.height);
    }

    /// Disable the heat map.
    pub fn reset_heat_map(&mut self) {
        self.heat_map.reset();
    }

    /// Filter weight per pixel, if enabled.
    pub fn weight(&self) -> Option<&TiledBuffer<f32>> {
        self.weight.get()
    }

    /// Mutable weight buffer, if enabled.
    pub fn weight_mut(&mut self) -> Option<&mut TiledBuffer<f32>> {
        self.weight.get_mut()
    }

    /// Enable the weight buffer.
    pub fn setup_weight_buffer(&mut self) {
        self.weight.setup(self.width, self.height);
    }

    /// Disable the weight buffer.
    pub fn reset_weight_buffer(&mut self) {
        self.weight.reset();
    }

    /// Odd-sample beauty with sample counts, if enabled.
    pub fn render_buffer_odd(&self) -> Option<&TiledBuffer<[f32; 4]>> {
        self.beauty_odd.get()
    }

    /// Mutable odd-sample beauty, if enabled.
    pub fn render_buffer_odd_mut(&mut self) -> Option<&mut TiledBuffer<[f32; 4]>> {
        self.beauty_odd.get_mut()
    }

    /// Enable the odd-sample beauty.
    pub fn setup_render_buffer_odd(&mut self) {
        self.beauty_odd.setup(self.width, self.height);
    }

    /// Disable the odd-sample beauty.
    pub fn reset_render_buffer_odd(&mut self) {
        self.beauty_odd.reset();
    }

    /// AOV `name`, created inactive if absent. Activate it with [`FbAov::setup`] or
    /// [`FbAov::setup_reference`].
    pub fn get_aov(&self, name: &str) -> AovHandle<FbAov> {
        self.aovs.get_or_insert_with(name, || FbAov::new(name))
    }

    /// AOV `name` if it was ever requested.
    pub fn find_aov(&self, name: &str) -> Option<AovHandle<FbAov>> {
        self.aovs.get(name)
    }

    /// All AOVs sorted by name, active or not.
    pub fn aovs(&self) -> Vec<(String, AovHandle<FbAov>)> {
        self.aovs.entries()
    }

    /// Names of active AOVs, sorted.
    pub fn active_aov_names(&self) -> Vec<String> {
        self.aovs
            .entries()
            .into_iter()
            .filter(|(_, aov)| aov.lock().is_active())
            .map(|(name, _)| name)
            .collect()
    }

    /// Recompute and return whether any AOV is active.
    pub fn update_render_output_status(&mut self) -> bool {
        self.render_output_status = self
            .aovs
            .entries()
            .iter()
            .any(|(_, aov)| aov.lock().is_active());
        self.render_output_status
    }

    /// Whether any AOV was active at the last [`FrameBuffer::update_render_output_status`].
    pub fn render_output_status(&self) -> bool {
        self.render_output_status
    }

    /// Free the storage of inactive AOVs.
    pub fn garbage_collect_unused_aovs(&self) {
        for (_, aov) in self.aovs.entries() {
            aov.lock().garbage_collect_unused();
        }
    }

    /// Check that every enabled buffer and active owned AOV matches the image size.
    pub fn validate(&self) -> MergeResult<()> {
        let size = (self.width, self.height);
        let check = |what: &str, g: TileGeometry| -> MergeResult<()> {
            if (g.width, g.height) != size {
                return Err(MergeError::validation(format!(
                    "{what} is {}x{}, frame buffer is {}x{}",
                    g.width, g.height, size.0, size.1
                )));
            }
            Ok(())
        };
        check("beauty", self.beauty.geometry())?;
        if let Some(b) = self.pixel_info() {
            check("pixel info", b.geometry())?;
        }
        if let Some(b) = self.heat_map() {
            check("heat map", b.geometry())?;
        }
        if let Some(b) = self.weight() {
            check("weight", b.geometry())?;
        }
        if let Some(b) = self.render_buffer_odd() {
            check("odd beauty", b.geometry())?;
        }
        for (name, aov) in self.aovs.entries() {
            let aov = aov.lock();
            if let (true, Some(buf)) = (aov.is_active(), aov.buffer()) {
                check(&format!("aov '{name}'"), buf.geometry())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/fb/frame_buffer.rs"]
mod tests;
