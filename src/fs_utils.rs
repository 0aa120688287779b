use crate::config::DEFAULT_SOURCE_EXTENSION;
use crate::error::{FlattenError, Result};
use encoding_rs::Encoding;
use std::fs;
use std::path::{Path, PathBuf};

/// Resolves an inclusion target relative to a base directory
///
/// The target is tried as given first, then with the default `.tex` extension
/// appended. An absolute target ignores `base_dir`.
///
/// # Errors
///
/// Returns `FlattenError::Unresolved` if neither candidate is an existing file.
pub fn resolve_include_path(target: &str, base_dir: &Path) -> Result<PathBuf> {
    resolve_source_path(Path::new(target.trim()), base_dir)
}

/// Same as [`resolve_include_path`], for targets that are already paths and
/// may not be valid UTF-8
///
/// # Errors
///
/// Returns `FlattenError::Unresolved` if neither candidate is an existing file.
pub fn resolve_source_path(target: &Path, base_dir: &Path) -> Result<PathBuf> {
    let as_given = base_dir.join(target);
    if as_given.is_file() {
        return Ok(as_given);
    }

    let mut with_extension = as_given.into_os_string();
    with_extension.push(DEFAULT_SOURCE_EXTENSION);
    let with_extension = PathBuf::from(with_extension);
    if with_extension.is_file() {
        return Ok(with_extension);
    }

    Err(FlattenError::Unresolved {
        target: target.display().to_string(),
        base: base_dir.to_path_buf(),
    })
}

/// Reads a source file and decodes it with the given encoding.
/// A leading byte order mark is stripped.
///
/// # Errors
///
/// - `FlattenError::Read` if the file cannot be opened or read.
/// - `FlattenError::Decode` if the bytes are malformed for `encoding`.
pub fn read_source(path: &Path, encoding: &'static Encoding) -> Result<String> {
    let bytes = fs::read(path).map_err(|source| FlattenError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let (text, had_errors) = encoding.decode_with_bom_removal(&bytes);
    if had_errors {
        return Err(FlattenError::Decode {
            path: path.to_path_buf(),
            encoding: encoding.name().to_string(),
        });
    }

    Ok(text.into_owned())
}

/// Encodes `contents` with the given encoding and writes it to `path`
///
/// # Errors
///
/// - `FlattenError::Encode` if `contents` has characters `encoding` cannot represent.
/// - `FlattenError::Write` if the file cannot be written.
pub fn write_output(path: &Path, contents: &str, encoding: &'static Encoding) -> Result<()> {
    let bytes = encode_text(contents, encoding).ok_or_else(|| FlattenError::Encode {
        path: path.to_path_buf(),
        encoding: encoding.name().to_string(),
    })?;

    fs::write(path, bytes).map_err(|source| FlattenError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Encodes `contents`, or `None` if some character is unmappable.
/// encoding_rs only encodes UTF-16 as UTF-8, so both byte orders are done here.
fn encode_text(contents: &str, encoding: &'static Encoding) -> Option<Vec<u8>> {
    if encoding == encoding_rs::UTF_16LE {
        return Some(contents.encode_utf16().flat_map(u16::to_le_bytes).collect());
    }
    if encoding == encoding_rs::UTF_16BE {
        return Some(contents.encode_utf16().flat_map(u16::to_be_bytes).collect());
    }

    let (bytes, _, had_errors) = encoding.encode(contents);
    (!had_errors).then(|| bytes.into_owned())
}

/// Makes sure the output directory exists before flattening into it
///
/// # Errors
///
/// - `FlattenError::OutputDirExists` if `dir` exists and `overwrite` is false.
/// - `FlattenError::Io` if the directory cannot be created.
pub fn prepare_output_dir(dir: &Path, overwrite: bool) -> Result<()> {
    if dir.exists() {
        if !overwrite {
            return Err(FlattenError::OutputDirExists {
                path: dir.to_path_buf(),
            });
        }
        if !dir.is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("{} exists and is not a directory", dir.display()),
            )
            .into());
        }
        return Ok(());
    }

    fs::create_dir_all(dir)?;
    Ok(())
}
