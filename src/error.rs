use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for flatex operations
#[derive(Error, Debug)]
pub enum FlattenError {
    /// An inclusion target could not be found, even after extension fallback
    #[error("Cannot resolve '{target}' relative to {base}")]
    Unresolved { target: String, base: PathBuf },

    /// A source file could not be opened or read
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A source file is not valid in the configured encoding
    #[error("Failed to decode {path} as {encoding}")]
    Decode { path: PathBuf, encoding: String },

    /// The flattened output could not be written
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The flattened output contains characters the configured encoding cannot represent
    #[error("Cannot encode output for {path} as {encoding}")]
    Encode { path: PathBuf, encoding: String },

    /// A located graphics file could not be copied into the output directory
    #[error("Failed to copy graphics {source_path} to {destination}: {source}")]
    GraphicsCopy {
        source_path: PathBuf,
        destination: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Configuration names an encoding label that does not exist
    #[error("Unknown encoding: {label}")]
    UnknownEncoding { label: String },

    /// Output directory already exists and overwriting was not requested
    #[error("Output directory already exists: {path} (use --force to overwrite)")]
    OutputDirExists { path: PathBuf },

    /// The output file would overwrite one of the sources that were flattened
    #[error("Output file {path} is one of the input sources")]
    OutputIsSource { path: PathBuf },

    /// IO error not tied to a specific source file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Regex compilation error
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// JSON configuration error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FlattenError {
    /// Whether this error is an I/O failure (reading, decoding, writing, encoding
    /// or copying). Resolution and configuration errors return `false`.
    #[must_use]
    pub const fn is_io_failure(&self) -> bool {
        matches!(
            self,
            Self::Read { .. }
                | Self::Decode { .. }
                | Self::Write { .. }
                | Self::Encode { .. }
                | Self::GraphicsCopy { .. }
                | Self::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, FlattenError>;
