//! fbmerge is the frame-buffer merge engine of a distributed progressive renderer.
//!
//! Render workers each hold a partial render of the same image and send incremental updates to
//! a merge process. fbmerge folds every update into an accumulator [`FrameBuffer`] and reports,
//! per call, exactly which pixels changed ([`FbActivePixels`]), so downstream code can forward
//! minimal updates and extrapolate over regions that have not converged yet.
//!
//! # Building blocks
//!
//! 1. **Tiles**: images are split into 8x8 tiles; one `u64` per tile marks pixels holding data
//!    ([`ActivePixels`]).
//! 2. **Merge rule**: per tile and element type, copy source pixels whose value or sample count
//!    differs and return the changed mask ([`merge_tile`]).
//! 3. **Snapshot delta**: run the rule over every tile of one buffer kind in parallel
//!    ([`snapshot_delta`]), then over every kind and AOV of a frame buffer
//!    ([`FrameMerger::snapshot_delta`]).
//! 4. **Extrapolation**: for every position of a tile, the nearest active pixel
//!    ([`search_active_nearest_pixel`]).
//!
//! The crate contains no `unsafe`; tile workers own disjoint slices of every buffer.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Nearest-active-pixel search inside a tile.
pub mod extrapolate;
/// Accumulator frame buffer and per-call change masks.
pub mod fb;
/// Merge rules, engine, coordinator and recorder.
pub mod merge;
/// Tile bitmasks.
pub mod tile;

pub use crate::extrapolate::search::{
    bundle_for, search_active_nearest_pixel, search_active_nearest_pixel_in, search_with_bundle,
    show_pix_id_array,
};
pub use crate::extrapolate::tables::{MAX_BUNDLE, SearchTables, tables};
pub use crate::fb::active_set::{AovPixels, FbActivePixels, FbActivePixelsAov, OptionalPixels};
pub use crate::fb::aov::{AovBuffer, AovStorage, FbAov, ReferenceKind};
pub use crate::fb::aov_table::{AovHandle, AovTable};
pub use crate::fb::frame_buffer::{FrameBuffer, OptionalBuffer, TiledBuffer};
pub use crate::foundation::core::{PixelId, TILE_PIXELS, TILE_SIZE, TileGeometry, pixel_id};
pub use crate::foundation::error::{MergeError, MergeResult};
pub use crate::merge::coordinator::{FrameMerger, MergeStats};
pub use crate::merge::engine::{DstLayer, SrcLayer, snapshot_delta, snapshot_delta_buffer};
pub use crate::merge::opts::MergeOpts;
pub use crate::merge::record::{ActivePixelsRecord, RECORD_SUFFIX, RecordEntry};
pub use crate::merge::rule::{
    ElementKind, MergeValue, PixelBuffer, merge_tile, merge_tile_uncounted,
};
pub use crate::tile::active_pixels::ActivePixels;
