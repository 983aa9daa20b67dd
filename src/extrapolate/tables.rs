use std::sync::LazyLock;

use crate::foundation::core::{TILE_PIXELS, TILE_SIZE};

/// Largest number of rings grouped into one search phase.
pub const MAX_BUNDLE: usize = 8;

static TABLES: LazyLock<SearchTables> = LazyLock::new(SearchTables::build);

/// Process-wide search tables, built on first use.
pub fn tables() -> &'static SearchTables {
    &TABLES
}

/// Precomputed nearest-pixel search order for every position of an 8x8 tile.
///
/// For pixel `p`, `rings(p)[k]` is the mask of all pixels at the `k`-th smallest squared
/// distance from `p`; ring 0 is `p` itself. A phase of bundle size `n` is the union of `n`
/// consecutive rings, so a whole group of rings can be rejected with one test.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchTables {
    rings: Vec<Vec<u64>>,
    phases: Vec<Vec<Vec<u64>>>,
}

impl SearchTables {
    /// Build the tables.
    pub fn build() -> Self {
        let rings: Vec<Vec<u64>> = (0..TILE_PIXELS as u32).map(rings_for).collect();
        let phases = (1..=MAX_BUNDLE)
            .map(|bundle| {
                rings
                    .iter()
                    .map(|r| {
                        r.chunks(bundle)
                            .map(|group| group.iter().fold(0, |acc, &m| acc | m))
                            .collect()
                    })
                    .collect()
            })
            .collect();
        Self { rings, phases }
    }

    /// Equal-distance rings around `pix`, nearest first.
    pub fn rings(&self, pix: usize) -> &[u64] {
        &self.rings[pix]
    }

    /// Phase masks around `pix` for `bundle` rings per phase, `bundle` in `1..=MAX_BUNDLE`.
    pub fn phases(&self, bundle: usize, pix: usize) -> &[u64] {
        &self.phases[bundle - 1][pix]
    }
}

fn rings_for(pix: u32) -> Vec<u64> {
    let (px, py) = ((pix % TILE_SIZE) as i32, (pix / TILE_SIZE) as i32);
    let mut candidates: Vec<(i32, u32)> = (0..TILE_PIXELS as u32)
        .map(|q| {
            let dx = (q % TILE_SIZE) as i32 - px;
            let dy = (q / TILE_SIZE) as i32 - py;
            (dx * dx + dy * dy, q)
        })
        .collect();
    candidates.sort_unstable();

    let mut rings: Vec<u64> = Vec::new();
    let mut last = None;
    for (dist, q) in candidates {
        if last != Some(dist) {
            rings.push(0);
            last = Some(dist);
        }
        if let Some(ring) = rings.last_mut() {
            *ring |= 1u64 << q;
        }
    }
    rings
}
