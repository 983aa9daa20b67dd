//! Per-call change masks for every buffer kind and AOV of a frame buffer.

use std::fmt::Write as _;

use crate::fb::aov::ReferenceKind;
use crate::fb::aov_table::{AovHandle, AovTable};
use crate::tile::active_pixels::ActivePixels;

/// Change mask of an optional buffer kind.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OptionalPixels {
    enabled: bool,
    pixels: ActivePixels,
}

impl OptionalPixels {
    fn enable(&mut self, width: u32, height: u32) {
        self.enabled = true;
        self.pixels.init(width, height);
        self.pixels.reset();
    }

    /// Mask if the kind is enabled.
    pub fn get(&self) -> Option<&ActivePixels> {
        self.enabled.then_some(&self.pixels)
    }

    /// `true` while enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn pixels_mut(&mut self) -> &mut ActivePixels {
        &mut self.pixels
    }
}

/// Pixel storage of an AOV change mask.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AovPixels {
    /// Mask owned by the entry.
    Owned(ActivePixels),
    /// The AOV aliases an intrinsic buffer; its changes live in that buffer's mask.
    Reference(ReferenceKind),
}

/// Change mask of one named AOV.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FbActivePixelsAov {
    name: String,
    pixels: AovPixels,
    status: bool,
}

impl FbActivePixelsAov {
    /// Inactive entry with no storage.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pixels: AovPixels::Owned(ActivePixels::default()),
            status: false,
        }
    }

    /// Activate with an owned mask sized for `width` x `height`.
    pub fn init(&mut self, width: u32, height: u32) {
        match &mut self.pixels {
            AovPixels::Owned(pixels) => pixels.init(width, height),
            other => *other = AovPixels::Owned(ActivePixels::new(width, height)),
        }
        self.status = true;
    }

    /// Activate as an alias of `kind`, freeing any owned mask.
    pub fn init_reference(&mut self, kind: ReferenceKind) {
        self.pixels = AovPixels::Reference(kind);
        self.status = true;
    }

    /// Mark inactive, keeping storage.
    pub fn reset(&mut self) {
        self.status = false;
    }

    /// Free the mask of an inactive entry.
    pub fn garbage_collect_unused(&mut self) {
        if !self.status {
            self.pixels = AovPixels::Owned(ActivePixels::default());
        }
    }

    /// AOV name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `true` while the entry is in use.
    pub fn is_active(&self) -> bool {
        self.status
    }

    /// Pixel storage.
    pub fn pixels(&self) -> &AovPixels {
        &self.pixels
    }

    /// Owned mask, `None` for references.
    pub fn active_pixels(&self) -> Option<&ActivePixels> {
        match &self.pixels {
            AovPixels::Owned(p) => Some(p),
            AovPixels::Reference(_) => None,
        }
    }

    /// Mutable owned mask, `None` for references.
    pub fn active_pixels_mut(&mut self) -> Option<&mut ActivePixels> {
        match &mut self.pixels {
            AovPixels::Owned(p) => Some(p),
            AovPixels::Reference(_) => None,
        }
    }

    /// Aliased kind, `None` for owned masks.
    pub fn reference(&self) -> Option<ReferenceKind> {
        match self.pixels {
            AovPixels::Reference(kind) => Some(kind),
            AovPixels::Owned(_) => None,
        }
    }

    /// One-line description.
    pub fn show(&self) -> String {
        let state = if self.status { "active" } else { "inactive" };
        match &self.pixels {
            AovPixels::Owned(p) => format!("aov '{}' {state} {}", self.name, p.show()),
            AovPixels::Reference(kind) => format!("aov '{}' {state} reference {kind:?}", self.name),
        }
    }
}

/// Change masks produced by one merge call.
#[derive(Debug, Default)]
pub struct FbActivePixels {
    initialized: bool,
    width: u32,
    height: u32,
    pub(crate) beauty: ActivePixels,
    pub(crate) pixel_info: OptionalPixels,
    pub(crate) heat_map: OptionalPixels,
    pub(crate) weight: OptionalPixels,
    pub(crate) beauty_odd: OptionalPixels,
    aovs: AovTable<FbActivePixelsAov>,
}

impl FbActivePixels {
    /// Empty set; call [`FbActivePixels::init`] before use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Size and clear beauty, disable optional kinds and deactivate every AOV entry.
    pub fn init(&mut self, width: u32, height: u32) {
        self.initialized = true;
        self.width = width;
        self.height = height;
        self.beauty.init(width, height);
        self.beauty.reset();
        self.pixel_info.enabled = false;
        self.heat_map.enabled = false;
        self.weight.enabled = false;
        self.beauty_odd.enabled = false;
        for (_, aov) in self.aovs.entries() {
            aov.lock().reset();
        }
    }

    /// Image width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Beauty change mask.
    pub fn beauty(&self) -> &ActivePixels {
        &self.beauty
    }

    /// Enable and clear the pixel-info mask.
    pub fn init_pixel_info(&mut self) {
        debug_assert!(self.initialized, "init before enabling kinds");
        self.pixel_info.enable(self.width, self.height);
    }

    /// Enable and clear the heat-map mask.
    pub fn init_heat_map(&mut self) {
        debug_assert!(self.initialized, "init before enabling kinds");
        self.heat_map.enable(self.width, self.height);
    }

    /// Enable and clear the weight mask.
    pub fn init_weight_buffer(&mut self) {
        debug_assert!(self.initialized, "init before enabling kinds");
        self.weight.enable(self.width, self.height);
    }

    /// Enable and clear the odd-sample beauty mask.
    pub fn init_render_buffer_odd(&mut self) {
        debug_assert!(self.initialized, "init before enabling kinds");
        self.beauty_odd.enable(self.width, self.height);
    }

    /// Pixel-info mask if enabled.
    pub fn pixel_info(&self) -> Option<&ActivePixels> {
        self.pixel_info.get()
    }

    /// Heat-map mask if enabled.
    pub fn heat_map(&self) -> Option<&ActivePixels> {
        self.heat_map.get()
    }

    /// Weight mask if enabled.
    pub fn weight(&self) -> Option<&ActivePixels> {
        self.weight.get()
    }

    /// Odd-sample beauty mask if enabled.
    pub fn render_buffer_odd(&self) -> Option<&ActivePixels> {
        self.beauty_odd.get()
    }

    /// `true` if pixel info is enabled.
    pub fn is_pixel_info_enabled(&self) -> bool {
        self.pixel_info.is_enabled()
    }

    /// `true` if the heat map is enabled.
    pub fn is_heat_map_enabled(&self) -> bool {
        self.heat_map.is_enabled()
    }

    /// `true` if the weight buffer is enabled.
    pub fn is_weight_buffer_enabled(&self) -> bool {
        self.weight.is_enabled()
    }

    /// `true` if the odd-sample beauty is enabled.
    pub fn is_render_buffer_odd_enabled(&self) -> bool {
        self.beauty_odd.is_enabled()
    }

    /// Entry for `name`, created on first request and marked active. Safe to call from many
    /// threads at once; a new name is allocated exactly once.
    pub fn get_aov(&self, name: &str) -> AovHandle<FbActivePixelsAov> {
        let aov = self
            .aovs
            .get_or_insert_with(name, || FbActivePixelsAov::new(name));
        aov.lock().status = true;
        aov
    }

    /// Entry for `name` if it was ever requested.
    pub fn find_aov(&self, name: &str) -> Option<AovHandle<FbActivePixelsAov>> {
        self.aovs.get(name)
    }

    /// All entry names, sorted.
    pub fn aov_names(&self) -> Vec<String> {
        self.aovs.names()
    }

    /// Deactivate every entry for which `keep(name, is_active)` is false.
    pub fn update_render_output_status(&self, keep: impl Fn(&str, bool) -> bool) {
        for (name, aov) in self.aovs.entries() {
            let mut aov = aov.lock();
            if !keep(&name, aov.status) {
                aov.reset();
            }
        }
    }

    /// `true` if any entry is active.
    pub fn render_output_status(&self) -> bool {
        self.aovs
            .entries()
            .iter()
            .any(|(_, aov)| aov.lock().is_active())
    }

    /// Call `f` for every active entry in name order. Returns the number visited.
    pub fn active_render_output_crawler(&self, mut f: impl FnMut(&FbActivePixelsAov)) -> usize {
        let mut visited = 0;
        for (_, aov) in self.aovs.entries() {
            let aov = aov.lock();
            if aov.is_active() {
                f(&aov);
                visited += 1;
            }
        }
        visited
    }

    /// Free the masks of inactive entries.
    pub fn garbage_collect_unused_aovs(&self) {
        for (_, aov) in self.aovs.entries() {
            aov.lock().garbage_collect_unused();
        }
    }

    /// Multi-line dump of every entry.
    pub fn show_all_aov(&self) -> String {
        let entries = self.aovs.entries();
        let mut out = format!("FbActivePixels aovs:{} {{\n", entries.len());
        for (_, aov) in entries {
            let _ = writeln!(out, "  {}", aov.lock().show());
        }
        out.push('}');
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/fb/active_set.rs"]
mod tests;
