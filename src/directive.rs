use crate::error::Result;
use regex::Regex;

/// A file inclusion directive found on a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inclusion<'a> {
    /// Command name without the backslash (`input` or `include`)
    pub command: &'a str,
    /// The braced argument, e.g. `chapter1`
    pub target: &'a str,
    /// Byte offset of the backslash
    pub start: usize,
    /// Byte offset just past the closing brace
    pub end: usize,
}

impl Inclusion<'_> {
    /// The directive as echoed in provenance markers, e.g. `input{chapter1}`
    #[must_use]
    pub fn marker_text(&self) -> String {
        format!("{}{{{}}}", self.command, self.target)
    }
}

/// A graphics reference; `start..end` spans the braced name only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphicsReference<'a> {
    pub name: &'a str,
    pub start: usize,
    pub end: usize,
}

/// What a single line is, as far as flattening cares
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// First non-whitespace character is `%`
    Comment,
    /// `\graphicspath{{a/}{b/}}`, with trailing separators stripped
    GraphicsPath(Vec<String>),
    /// One or more `\includegraphics` directives
    Graphics(Vec<GraphicsReference<'a>>),
    /// `\input{..}` or `\include{..}`
    FileInclusion(Inclusion<'a>),
    PlainText,
}

/// Compiled directive patterns
#[derive(Debug, Clone)]
pub struct Directives {
    graphics_path: Regex,
    graphics_path_entry: Regex,
    graphics: Regex,
    inclusion: Regex,
}

impl Directives {
    /// Compiles the directive patterns
    ///
    /// # Errors
    ///
    /// Returns `FlattenError::Regex` if a pattern fails to compile.
    pub fn new() -> Result<Self> {
        Ok(Self {
            graphics_path: Regex::new(r"\\graphicspath\s*\{((?:\s*\{[^{}]*\})+)\s*\}")?,
            graphics_path_entry: Regex::new(r"\{([^{}]*)\}")?,
            graphics: Regex::new(r"\\includegraphics\*?\s*(?:\[[^\]]*\]\s*)*\{([^{}]+)\}")?,
            inclusion: Regex::new(r"\\(input|include)\s*\{([^{}]+)\}")?,
        })
    }

    /// Classifies a line (without its terminator). Matchers are tried in a fixed
    /// order and the first hit wins: comment, graphics path, graphics, inclusion.
    #[must_use]
    pub fn classify<'a>(&self, line: &'a str, ignore_comments: bool) -> LineKind<'a> {
        if ignore_comments && is_comment(line) {
            return LineKind::Comment;
        }
        if let Some(paths) = self.graphics_paths(line) {
            return LineKind::GraphicsPath(paths);
        }
        let graphics = self.graphics_references(line);
        if !graphics.is_empty() {
            return LineKind::Graphics(graphics);
        }
        if let Some(inclusion) = self.inclusion(line) {
            return LineKind::FileInclusion(inclusion);
        }
        LineKind::PlainText
    }

    /// Directories declared by a `\graphicspath` directive, if the line has one
    #[must_use]
    pub fn graphics_paths(&self, line: &str) -> Option<Vec<String>> {
        let captures = self.graphics_path.captures(line)?;
        let entries = captures.get(1)?.as_str();
        let paths = self
            .graphics_path_entry
            .captures_iter(entries)
            .filter_map(|entry| entry.get(1))
            .map(|entry| entry.as_str().trim().trim_end_matches(['/', '\\']))
            .filter(|entry| !entry.is_empty())
            .map(ToString::to_string)
            .collect();
        Some(paths)
    }

    /// All `\includegraphics` references on the line, in order
    #[must_use]
    pub fn graphics_references<'a>(&self, line: &'a str) -> Vec<GraphicsReference<'a>> {
        self.graphics
            .captures_iter(line)
            .filter_map(|capture| capture.get(1))
            .map(|name| GraphicsReference {
                name: name.as_str(),
                start: name.start(),
                end: name.end(),
            })
            .collect()
    }

    /// The first `\input` or `\include` directive on the line
    #[must_use]
    pub fn inclusion<'a>(&self, line: &'a str) -> Option<Inclusion<'a>> {
        let capture = self.inclusion.captures(line)?;
        let full = capture.get(0)?;
        Some(Inclusion {
            command: capture.get(1)?.as_str(),
            target: capture.get(2)?.as_str().trim(),
            start: full.start(),
            end: full.end(),
        })
    }
}

/// Whether the first non-whitespace character of `line` is `%`
#[must_use]
pub fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with('%')
}
