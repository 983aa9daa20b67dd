/// Per-call change masks.
pub mod active_set;
/// AOV accumulators.
pub mod aov;
/// Thread-safe name to AOV map.
pub mod aov_table;
/// The accumulator frame buffer.
pub mod frame_buffer;
