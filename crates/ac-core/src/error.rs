use thiserror::Error;

/// Errors originating from the core module.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Invalid configuration value or structure.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Referenced file does not exist.
    #[error("File not found: {path}")]
    FileNotFound {
        /// Path that was not found.
        path: String,
    },

    /// A manifest lacks one of the configured columns.
    #[error("Column '{column}' missing from manifest {path}")]
    MissingColumn {
        /// Manifest path.
        path: String,
        /// Column name looked up.
        column: String,
    },

    /// A manifest has a header but no rows.
    #[error("Manifest has no rows: {path}")]
    EmptyManifest {
        /// Manifest path.
        path: String,
    },

    /// Feature buffer length does not match its declared shape.
    #[error("Invalid dimensions: {bins}×{frames} does not hold {len} values")]
    InvalidDimensions {
        /// Frequency bins.
        bins: usize,
        /// Time frames.
        frames: usize,
        /// Actual buffer length.
        len: usize,
    },
}
