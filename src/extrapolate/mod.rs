//! Tile extrapolation: fill every position of a partially rendered tile with its nearest
//! rendered pixel.

/// Table-driven nearest-pixel search.
pub mod search;
/// Precomputed search tables.
pub mod tables;
