/// Convenience result type used across fbmerge.
pub type MergeResult<T> = Result<T, MergeError>;

/// Top-level error taxonomy used by merge engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum MergeError {
    /// Source and destination image sizes differ. The merge call made no changes.
    #[error(
        "dimension mismatch: src {src_width}x{src_height} vs dst {dst_width}x{dst_height}"
    )]
    DimensionMismatch {
        /// Source width in pixels.
        src_width: u32,
        /// Source height in pixels.
        src_height: u32,
        /// Destination width in pixels.
        dst_width: u32,
        /// Destination height in pixels.
        dst_height: u32,
    },

    /// No merge rule exists for the requested element type or channel layout.
    #[error("unsupported element kind: {0}")]
    UnsupportedElementKind(String),

    /// Invalid options or caller-provided data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Malformed diagnostic record data.
    #[error("decode error: {0}")]
    Decode(String),

    /// Filesystem errors while dumping or loading records.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Wrapped lower-level error from dependencies.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MergeError {
    /// Build a [`MergeError::DimensionMismatch`] value from `(width, height)` pairs.
    pub fn dimension_mismatch(src: (u32, u32), dst: (u32, u32)) -> Self {
        Self::DimensionMismatch {
            src_width: src.0,
            src_height: src.1,
            dst_width: dst.0,
            dst_height: dst.1,
        }
    }

    /// Build a [`MergeError::UnsupportedElementKind`] value.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedElementKind(msg.into())
    }

    /// Build a [`MergeError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`MergeError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// `true` for errors a caller can recover from by skipping this merge cycle.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::DimensionMismatch { .. })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
