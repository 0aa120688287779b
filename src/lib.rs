//! # flatex
//!
//! A library and CLI tool for flattening multi-file LaTeX sources into a single
//! self-contained `.tex` file, ready for journal or preprint submission.
//!
//! ## Features
//!
//! - Recursively inline `\input{..}` and `\include{..}`, with `.tex` fallback
//! - Bracket every inlined region with `% >>> input{name} >>>` / `% <<< input{name} <<<` markers
//! - Copy graphics referenced by `\includegraphics` next to the output, once each,
//!   and rewrite the references to the copied names
//! - Honor `\graphicspath` declarations when locating graphics
//! - Drop commented lines (optional)
//! - Files included more than once, or in a cycle, are inlined only the first time
//!
//! ## Usage
//!
//! ### As a Library
//!
//! ```no_run
//! use flatex::{FlattenConfig, Flattener};
//! use std::path::Path;
//!
//! let mut flattener = Flattener::new(FlattenConfig::default())?;
//! let text = flattener.flatten_document(Path::new("paper/main.tex"), Path::new("flat/main.tex"))?;
//! println!("{text}");
//! # Ok::<(), flatex::FlattenError>(())
//! ```
//!
//! ### As a CLI Tool
//!
//! ```bash
//! # Flatten into ./flat/main.tex
//! flatex main.tex
//!
//! # Custom output directory, overwriting it if present
//! flatex main.tex -o submission -f
//! ```

pub mod config;
pub mod directive;
pub mod error;
pub mod flatten;
pub mod fs_utils;
pub mod graphics;

// Re-export main types and functions for convenience
pub use config::FlattenConfig;
pub use error::{FlattenError, Result};
pub use flatten::{Flattener, flatten_file};
pub use fs_utils::prepare_output_dir;
