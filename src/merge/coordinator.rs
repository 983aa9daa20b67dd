//! Merge of a whole frame buffer: every enabled buffer kind and every active AOV.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use rayon::prelude::*;

use crate::fb::active_set::{FbActivePixels, FbActivePixelsAov, OptionalPixels};
use crate::fb::aov::{AovStorage, FbAov};
use crate::fb::aov_table::AovHandle;
use crate::fb::frame_buffer::{FrameBuffer, OptionalBuffer, TiledBuffer};
use crate::foundation::error::{MergeError, MergeResult};
use crate::merge::engine::{snapshot_delta as merge_layer, snapshot_delta_buffer};
use crate::merge::opts::{MergeOpts, build_thread_pool};
use crate::merge::record::ActivePixelsRecord;
use crate::merge::rule::MergeValue;
use crate::tile::active_pixels::ActivePixels;

/// Changed pixel totals of one [`FrameMerger::snapshot_delta`] call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Beauty.
    pub beauty: usize,
    /// Pixel info, zero when disabled.
    pub pixel_info: usize,
    /// Heat map, zero when disabled.
    pub heat_map: usize,
    /// Weight, zero when disabled.
    pub weight: usize,
    /// Odd-sample beauty, zero when disabled.
    pub beauty_odd: usize,
    /// Owned AOVs by name. Reference AOVs are not listed.
    pub aovs: BTreeMap<String, usize>,
}

impl MergeStats {
    /// Sum over all kinds and AOVs.
    pub fn total(&self) -> usize {
        self.beauty
            + self.pixel_info
            + self.heat_map
            + self.weight
            + self.beauty_odd
            + self.aovs.values().sum::<usize>()
    }
}

/// Merges partial frame buffers into an accumulator and reports what changed.
#[derive(Debug)]
pub struct FrameMerger {
    opts: MergeOpts,
    pool: Option<rayon::ThreadPool>,
    record: Mutex<ActivePixelsRecord>,
}

struct AovJob {
    name: String,
    src: AovHandle<FbAov>,
    dst: AovHandle<FbAov>,
    out: AovHandle<FbActivePixelsAov>,
}

impl AovJob {
    fn run(&self, opts: &MergeOpts) -> MergeResult<(String, usize)> {
        let src = self.src.lock();
        let mut dst = self.dst.lock();
        let mut out = self.out.lock();
        let (Some(s), Some(d), Some(o)) =
            (src.buffer(), dst.buffer_mut(), out.active_pixels_mut())
        else {
            return Err(MergeError::unsupported(format!(
                "aov '{}' lost its owned storage during merge",
                self.name
            )));
        };
        let changed = snapshot_delta_buffer(d.dst_layer(), s.src_layer(), o, opts)?;
        Ok((self.name.clone(), changed))
    }
}

type Task<'a> = Box<dyn FnOnce() + Send + 'a>;

impl FrameMerger {
    /// Merger with its own rayon pool when `opts.parallel` is set.
    pub fn new(opts: MergeOpts) -> MergeResult<Self> {
        opts.validate()?;
        let pool = if opts.parallel {
            Some(build_thread_pool(opts.threads)?)
        } else {
            None
        };
        Ok(Self {
            opts,
            pool,
            record: Mutex::new(ActivePixelsRecord::new()),
        })
    }

    /// Options the merger was built with.
    pub fn opts(&self) -> &MergeOpts {
        &self.opts
    }

    /// Diagnostic recorder. While it is started, every successful merge appends its beauty
    /// change mask.
    pub fn record(&self) -> MutexGuard<'_, ActivePixelsRecord> {
        self.record.lock()
    }

    /// Merge `src` into `dst`, writing this call's changed pixels into `out`.
    ///
    /// Kinds enabled on `src` are enabled on `dst` and `out`; kinds disabled on `src` are
    /// disabled on `dst`. Active owned AOVs of `src` are merged into same-named AOVs of `dst`,
    /// reference AOVs only carry their tag, and `dst`/`out` AOVs missing from `src` are
    /// deactivated. Nothing is modified when the sizes differ or either side is inconsistent.
    #[tracing::instrument(
        skip(self, src, dst, out),
        fields(width = src.width(), height = src.height())
    )]
    pub fn snapshot_delta(
        &self,
        src: &FrameBuffer,
        dst: &mut FrameBuffer,
        out: &mut FbActivePixels,
        coarse_pass: bool,
    ) -> MergeResult<MergeStats> {
        if !src.is_same_size(dst) {
            tracing::warn!(
                src_width = src.width(),
                src_height = src.height(),
                dst_width = dst.width(),
                dst_height = dst.height(),
                "merge rejected: frame buffer size mismatch"
            );
            return Err(MergeError::dimension_mismatch(
                (src.width(), src.height()),
                (dst.width(), dst.height()),
            ));
        }
        if let Err(err) = src.validate() {
            tracing::warn!(error = %err, "merge rejected: inconsistent source");
            return Err(err);
        }
        if let Err(err) = dst.validate() {
            tracing::warn!(error = %err, "merge rejected: inconsistent destination");
            return Err(err);
        }

        let (width, height) = (src.width(), src.height());
        out.init(width, height);

        let merge_pixel_info = setup_optional(&src.pixel_info, &mut dst.pixel_info, width, height);
        let merge_heat_map = setup_optional(&src.heat_map, &mut dst.heat_map, width, height);
        let merge_weight = setup_optional(&src.weight, &mut dst.weight, width, height);
        let merge_beauty_odd = setup_optional(&src.beauty_odd, &mut dst.beauty_odd, width, height);
        if merge_pixel_info {
            out.init_pixel_info();
        }
        if merge_heat_map {
            out.init_heat_map();
        }
        if merge_weight {
            out.init_weight_buffer();
        }
        if merge_beauty_odd {
            out.init_render_buffer_odd();
        }

        let (jobs, src_active) = setup_aovs(src, dst, out, width, height);

        let opts = &self.opts;
        let mut stats = MergeStats::default();
        let mut results: [MergeResult<usize>; 5] = [Ok(0), Ok(0), Ok(0), Ok(0), Ok(0)];
        let mut aov_result: MergeResult<Vec<(String, usize)>> = Ok(Vec::new());
        {
            let [beauty, pixel_info, heat_map, weight, beauty_odd] = &mut results;
            let mut tasks: Vec<Task<'_>> = Vec::with_capacity(6);
            tasks.push(Box::new(|| {
                *beauty = merge_tiled(&src.beauty, &mut dst.beauty, &mut out.beauty, opts);
            }));
            if merge_pixel_info {
                tasks.push(Box::new(|| {
                    *pixel_info = merge_optional(
                        &src.pixel_info,
                        &mut dst.pixel_info,
                        &mut out.pixel_info,
                        opts,
                    );
                }));
            }
            if merge_heat_map {
                tasks.push(Box::new(|| {
                    *heat_map =
                        merge_optional(&src.heat_map, &mut dst.heat_map, &mut out.heat_map, opts);
                }));
            }
            if merge_weight {
                tasks.push(Box::new(|| {
                    *weight = merge_optional(&src.weight, &mut dst.weight, &mut out.weight, opts);
                }));
            }
            if merge_beauty_odd {
                tasks.push(Box::new(|| {
                    *beauty_odd = merge_optional(
                        &src.beauty_odd,
                        &mut dst.beauty_odd,
                        &mut out.beauty_odd,
                        opts,
                    );
                }));
            }
            if !jobs.is_empty() {
                let aov_result = &mut aov_result;
                let jobs = &jobs;
                tasks.push(Box::new(move || {
                    *aov_result = if opts.parallel {
                        jobs.par_iter().map(|job| job.run(opts)).collect()
                    } else {
                        jobs.iter().map(|job| job.run(opts)).collect()
                    };
                }));
            }
            self.run_tasks(tasks);
        }

        let [beauty, pixel_info, heat_map, weight, beauty_odd] = results;
        stats.beauty = beauty?;
        stats.pixel_info = pixel_info?;
        stats.heat_map = heat_map?;
        stats.weight = weight?;
        stats.beauty_odd = beauty_odd?;
        stats.aovs = aov_result?.into_iter().collect();

        out.update_render_output_status(|name, _| src_active.contains(name));

        {
            let mut record = self.record.lock();
            if record.is_active() {
                record.set(out.beauty.clone(), coarse_pass);
            }
        }

        tracing::debug!(
            beauty = stats.beauty,
            pixel_info = stats.pixel_info,
            heat_map = stats.heat_map,
            weight = stats.weight,
            beauty_odd = stats.beauty_odd,
            aovs = stats.aovs.len(),
            total = stats.total(),
            coarse_pass,
            "snapshot delta merged"
        );
        Ok(stats)
    }

    fn run_tasks(&self, tasks: Vec<Task<'_>>) {
        match &self.pool {
            Some(pool) if self.opts.parallel => pool.install(|| {
                rayon::scope(|s| {
                    for task in tasks {
                        s.spawn(move |_| task());
                    }
                })
            }),
            _ => {
                for task in tasks {
                    task();
                }
            }
        }
    }
}

/// Stage A and B of the AOV pass: set up every source-active AOV on `dst` and `out`,
/// deactivate the `dst` AOVs the source no longer has. Returns the per-pixel merges still
/// to run and the names active on the source.
fn setup_aovs(
    src: &FrameBuffer,
    dst: &mut FrameBuffer,
    out: &FbActivePixels,
    width: u32,
    height: u32,
) -> (Vec<AovJob>, HashSet<String>) {
    let mut jobs = Vec::new();
    let mut src_active = HashSet::new();

    for (name, src_aov) in src.aovs() {
        let aov = src_aov.lock();
        if !aov.is_active() {
            continue;
        }
        src_active.insert(name.clone());
        let dst_aov = dst.get_aov(&name);
        let out_aov = out.get_aov(&name);
        match aov.storage() {
            AovStorage::Reference(kind) => {
                dst_aov.lock().setup_reference(*kind);
                out_aov.lock().init_reference(*kind);
            }
            AovStorage::Owned(buf) => {
                dst_aov.lock().setup(
                    buf.kind(),
                    width,
                    height,
                    aov.default_value(),
                    aov.closest_filter(),
                );
                out_aov.lock().init(width, height);
                jobs.push(AovJob {
                    name,
                    src: Arc::clone(&src_aov),
                    dst: dst_aov,
                    out: out_aov,
                });
            }
        }
    }

    for (name, dst_aov) in dst.aovs() {
        if !src_active.contains(&name) {
            dst_aov.lock().reset();
        }
    }
    dst.update_render_output_status();

    (jobs, src_active)
}

fn setup_optional<T: MergeValue>(
    src: &OptionalBuffer<T>,
    dst: &mut OptionalBuffer<T>,
    width: u32,
    height: u32,
) -> bool {
    if src.is_enabled() {
        dst.setup(width, height);
        true
    } else {
        dst.reset();
        false
    }
}

fn merge_tiled<T: MergeValue>(
    src: &TiledBuffer<T>,
    dst: &mut TiledBuffer<T>,
    out: &mut ActivePixels,
    opts: &MergeOpts,
) -> MergeResult<usize> {
    merge_layer(dst.dst_layer(), src.src_layer(), out, opts)
}

fn merge_optional<T: MergeValue>(
    src: &OptionalBuffer<T>,
    dst: &mut OptionalBuffer<T>,
    out: &mut OptionalPixels,
    opts: &MergeOpts,
) -> MergeResult<usize> {
    match (src.get(), dst.get_mut()) {
        (Some(s), Some(d)) => merge_tiled(s, d, out.pixels_mut(), opts),
        _ => Ok(0),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/merge/coordinator.rs"]
mod tests;
