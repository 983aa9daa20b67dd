use crate::foundation::error::{MergeError, MergeResult};

/// Threading options of a merge.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MergeOpts {
    /// Run buffer kinds and tiles on a rayon pool. When `false` every loop runs on the caller
    /// thread.
    pub parallel: bool,
    /// Pool size; `None` uses rayon's default.
    pub threads: Option<usize>,
    /// Minimum number of tiles handed to one rayon task.
    pub tile_grain: usize,
}

impl Default for MergeOpts {
    fn default() -> Self {
        Self {
            parallel: true,
            threads: None,
            tile_grain: 64,
        }
    }
}

impl MergeOpts {
    /// Options for single-threaded merging.
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Self::default()
        }
    }

    /// Parse options from JSON. Missing fields take their defaults.
    pub fn from_json_str(s: &str) -> MergeResult<Self> {
        let opts: Self = serde_json::from_str(s)
            .map_err(|e| MergeError::validation(format!("invalid merge options: {e}")))?;
        opts.validate()?;
        Ok(opts)
    }

    /// Reject option combinations no pool can honor.
    pub fn validate(&self) -> MergeResult<()> {
        if self.threads == Some(0) {
            return Err(MergeError::validation(
                "merge threading 'threads' must be >= 1 when set",
            ));
        }
        Ok(())
    }

    pub(crate) fn grain(&self) -> usize {
        self.tile_grain.max(1)
    }
}

pub(crate) fn build_thread_pool(threads: Option<usize>) -> MergeResult<rayon::ThreadPool> {
    if threads == Some(0) {
        return Err(MergeError::validation(
            "merge threading 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("fbmerge-{i}"));
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| MergeError::Other(anyhow::anyhow!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/merge/opts.rs"]
mod tests;
