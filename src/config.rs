use crate::error::{FlattenError, Result};
use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Extensions tried, in order, when locating a graphics file
pub const DEFAULT_GRAPHIC_EXTENSIONS: [&str; 5] = [".pdf", ".png", ".jpg", ".jpeg", ".eps"];

/// Extension appended to inclusion targets that do not exist as given
pub const DEFAULT_SOURCE_EXTENSION: &str = ".tex";

/// Configuration for flattening
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlattenConfig {
    /// Candidate suffixes for graphics lookup, tried in order
    pub graphic_extensions: Vec<String>,
    /// Drop lines whose first non-whitespace character is `%`
    pub ignore_commented_lines: bool,
    /// Last entry of every graphics search path list
    pub root_directory: PathBuf,
    /// Encoding label used for reading sources and writing the output
    pub output_encoding: String,
}

impl Default for FlattenConfig {
    fn default() -> Self {
        Self {
            graphic_extensions: DEFAULT_GRAPHIC_EXTENSIONS
                .iter()
                .map(ToString::to_string)
                .collect(),
            ignore_commented_lines: true,
            root_directory: PathBuf::from("."),
            output_encoding: "utf-8".to_string(),
        }
    }
}

impl FlattenConfig {
    /// Loads a configuration from a JSON file. Missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// - `FlattenError::Read` if the file cannot be read.
    /// - `FlattenError::Json` if the contents are not a valid configuration.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|source| FlattenError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Looks up the configured encoding by its WHATWG label
    ///
    /// # Errors
    ///
    /// Returns `FlattenError::UnknownEncoding` if the label is not recognized.
    pub fn encoding(&self) -> Result<&'static Encoding> {
        Encoding::for_label(self.output_encoding.trim().as_bytes()).ok_or_else(|| {
            FlattenError::UnknownEncoding {
                label: self.output_encoding.clone(),
            }
        })
    }
}
