/// Whole-frame-buffer merge across buffer kinds and AOVs.
pub mod coordinator;
/// Parallel tile loop for one buffer kind.
pub mod engine;
/// Threading options.
pub mod opts;
/// Diagnostic recording of change masks.
pub mod record;
/// Per-tile merge kernels.
pub mod rule;
