use crate::error::{FlattenError, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Finds the first existing graphics file for a bare name.
///
/// Directories are tried in order; within each directory the name is tried as
/// given when it already has an extension, then with every extension in order.
/// Absence is not an error.
#[must_use]
pub fn locate_graphic<P: AsRef<Path>>(
    name: &str,
    search_paths: &[P],
    extensions: &[String],
) -> Option<PathBuf> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let has_extension = Path::new(name).extension().is_some();

    for dir in search_paths {
        let dir = dir.as_ref();
        if has_extension {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        for extension in extensions {
            let candidate = dir.join(format!("{name}{extension}"));
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }

    None
}

/// Copies located graphics into the output directory, once per source file
#[derive(Debug, Default)]
pub struct GraphicsCollector {
    /// Canonical source path -> base name in the output directory
    collected: HashMap<PathBuf, String>,
    /// Base name in the output directory -> source it was copied from
    destinations: HashMap<String, PathBuf>,
}

impl GraphicsCollector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies `source` into `output_dir` under its base name and returns that name.
    /// A source already collected in this session is not copied again.
    ///
    /// # Errors
    ///
    /// Returns `FlattenError::GraphicsCopy` if the source cannot be canonicalized
    /// or copied.
    pub fn collect(&mut self, source: &Path, output_dir: &Path) -> Result<String> {
        let file_name = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let destination = output_dir.join(&file_name);
        let copy_error = |err| FlattenError::GraphicsCopy {
            source_path: source.to_path_buf(),
            destination: destination.clone(),
            source: err,
        };

        let canonical = source.canonicalize().map_err(copy_error)?;
        if let Some(name) = self.collected.get(&canonical) {
            tracing::debug!("graphics {} already collected", canonical.display());
            return Ok(name.clone());
        }

        if let Some(previous) = self.destinations.get(&file_name)
            && previous != &canonical
        {
            tracing::warn!(
                "graphics {} overwrites {} in the output directory (both named {file_name})",
                canonical.display(),
                previous.display()
            );
        }

        if destination
            .canonicalize()
            .is_ok_and(|existing| existing == canonical)
        {
            tracing::debug!("graphics {} already in the output directory", canonical.display());
        } else {
            fs::copy(&canonical, &destination).map_err(copy_error)?;
            tracing::info!(
                "copied graphics {} -> {}",
                canonical.display(),
                destination.display()
            );
        }

        self.destinations.insert(file_name.clone(), canonical.clone());
        self.collected.insert(canonical, file_name.clone());
        Ok(file_name)
    }

    /// Number of distinct source files copied so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.collected.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.collected.is_empty()
    }

    /// Whether `source` has already been copied in this session
    #[must_use]
    pub fn contains(&self, source: &Path) -> bool {
        source
            .canonicalize()
            .is_ok_and(|canonical| self.collected.contains_key(&canonical))
    }
}
