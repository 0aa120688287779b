use crate::config::FlattenConfig;
use crate::directive::{Directives, LineKind};
use crate::error::{FlattenError, Result};
use crate::fs_utils::{read_source, resolve_include_path, resolve_source_path, write_output};
use crate::graphics::{GraphicsCollector, locate_graphic};
use encoding_rs::Encoding;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Flattens a LaTeX document into a single file.
///
/// A `Flattener` remembers which files it has inlined and which graphics it has
/// copied for as long as it lives. Use a fresh instance for every independent run;
/// a second run on the same instance skips everything the first one visited.
#[derive(Debug)]
pub struct Flattener {
    config: FlattenConfig,
    encoding: &'static Encoding,
    directives: Directives,
    visited: HashSet<PathBuf>,
    graphics: GraphicsCollector,
}

/// The directive line an included file replaces
#[derive(Debug)]
struct Splice {
    marker: String,
    trailing: String,
    terminator: String,
}

/// One file on the inlining stack
#[derive(Debug)]
struct Frame {
    text: String,
    cursor: usize,
    dir: PathBuf,
    /// Declared `\graphicspath` entries first, then the file's directory and the root
    search_paths: Vec<PathBuf>,
    declared: usize,
    out: String,
    splice: Option<Splice>,
}

impl Frame {
    /// Next line, split into content and terminator (`\n`, `\r\n` or empty)
    fn next_line(&mut self) -> Option<(String, String)> {
        let rest = &self.text[self.cursor..];
        if rest.is_empty() {
            return None;
        }
        let raw = rest.find('\n').map_or(rest, |idx| &rest[..=idx]);
        self.cursor += raw.len();

        let content = raw
            .strip_suffix("\r\n")
            .or_else(|| raw.strip_suffix('\n'))
            .unwrap_or(raw);
        Some((content.to_string(), raw[content.len()..].to_string()))
    }

    fn declare_graphics_paths(&mut self, paths: Vec<String>) {
        for path in paths {
            let resolved = self.dir.join(path);
            self.search_paths.insert(self.declared, resolved);
            self.declared += 1;
        }
    }
}

enum Step {
    Emit(String),
    Descend { path: PathBuf, splice: Splice },
}

impl Flattener {
    /// Creates a flattener with empty session state
    ///
    /// # Errors
    ///
    /// - `FlattenError::UnknownEncoding` if the configured encoding does not exist.
    /// - `FlattenError::Regex` if a directive pattern fails to compile.
    pub fn new(config: FlattenConfig) -> Result<Self> {
        Ok(Self {
            encoding: config.encoding()?,
            directives: Directives::new()?,
            config,
            visited: HashSet::new(),
            graphics: GraphicsCollector::new(),
        })
    }

    #[must_use]
    pub const fn config(&self) -> &FlattenConfig {
        &self.config
    }

    /// Whether the file at `path` has been inlined by this flattener
    #[must_use]
    pub fn has_visited(&self, path: &Path) -> bool {
        path.canonicalize()
            .is_ok_and(|canonical| self.visited.contains(&canonical))
    }

    /// Number of graphics files copied by this flattener
    #[must_use]
    pub fn collected_graphics(&self) -> usize {
        self.graphics.len()
    }

    /// Flattens `input` and writes the result to `output_file`, copying graphics
    /// next to it. The output directory must already exist.
    ///
    /// # Errors
    ///
    /// - `FlattenError::Unresolved` if `input` cannot be found.
    /// - `FlattenError::OutputIsSource` if `output_file` is one of the flattened sources.
    /// - Any I/O failure from reading sources, copying graphics or writing the output.
    pub fn flatten_document(&mut self, input: &Path, output_file: &Path) -> Result<String> {
        let root = resolve_source_path(input, Path::new(""))?;
        let output_dir = match output_file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let flattened = self.flatten(&root, &output_dir)?;
        if output_file
            .canonicalize()
            .is_ok_and(|existing| self.visited.contains(&existing))
        {
            return Err(FlattenError::OutputIsSource {
                path: output_file.to_path_buf(),
            });
        }
        write_output(output_file, &flattened, self.encoding)?;
        tracing::info!(
            "wrote {} ({} bytes)",
            output_file.display(),
            flattened.len()
        );
        Ok(flattened)
    }

    /// Inlines `file_path` and everything it includes, copying graphics into
    /// `output_dir`. Returns an empty string if the file was already visited.
    ///
    /// A relative `file_path` resolves against the current working directory;
    /// inclusions inside it resolve against the including file's directory.
    ///
    /// # Errors
    ///
    /// - `FlattenError::Read` or `FlattenError::Decode` if a resolved source
    ///   cannot be read. Included files that cannot be resolved are left as is.
    /// - `FlattenError::GraphicsCopy` if a located graphic cannot be copied.
    pub fn flatten(&mut self, file_path: &Path, output_dir: &Path) -> Result<String> {
        let Some(root) = self.open(file_path)? else {
            return Ok(String::new());
        };
        let mut stack = vec![root];

        loop {
            let step = {
                let Some(frame) = stack.last_mut() else {
                    return Ok(String::new());
                };
                match frame.next_line() {
                    Some((content, terminator)) => {
                        Some(self.process_line(frame, &content, &terminator, output_dir)?)
                    }
                    None => None,
                }
            };

            match step {
                Some(Step::Emit(text)) => {
                    if let Some(frame) = stack.last_mut() {
                        frame.out.push_str(&text);
                    }
                }
                Some(Step::Descend { path, splice }) => match self.open(&path)? {
                    Some(mut child) => {
                        child.splice = Some(splice);
                        stack.push(child);
                    }
                    None => {
                        if let Some(parent) = stack.last_mut() {
                            close_splice(parent, "", &splice);
                        }
                    }
                },
                None => {
                    let Some(done) = stack.pop() else {
                        return Ok(String::new());
                    };
                    match (done.splice, stack.last_mut()) {
                        (Some(splice), Some(parent)) => close_splice(parent, &done.out, &splice),
                        _ => return Ok(done.out),
                    }
                }
            }
        }
    }

    /// Reads a file into a new frame, or `None` if it was already visited
    fn open(&mut self, path: &Path) -> Result<Option<Frame>> {
        let canonical = path.canonicalize().map_err(|source| FlattenError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if !self.visited.insert(canonical.clone()) {
            tracing::debug!("skipping already inlined {}", canonical.display());
            return Ok(None);
        }

        let text = match read_source(&canonical, self.encoding) {
            Ok(text) => text,
            Err(err) => {
                self.visited.remove(&canonical);
                return Err(err);
            }
        };
        tracing::debug!("inlining {}", canonical.display());

        let dir = canonical
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        Ok(Some(Frame {
            text,
            cursor: 0,
            search_paths: vec![dir.clone(), self.config.root_directory.clone()],
            dir,
            declared: 0,
            out: String::new(),
            splice: None,
        }))
    }

    fn process_line(
        &mut self,
        frame: &mut Frame,
        line: &str,
        terminator: &str,
        output_dir: &Path,
    ) -> Result<Step> {
        let kind = self
            .directives
            .classify(line, self.config.ignore_commented_lines);
        match kind {
            LineKind::Comment => Ok(Step::Emit(String::new())),
            LineKind::GraphicsPath(paths) => {
                tracing::debug!("graphics search paths extended with {paths:?}");
                frame.declare_graphics_paths(paths);
                Ok(Step::Emit(String::new()))
            }
            LineKind::Graphics(references) => {
                let mut rewritten = String::with_capacity(line.len());
                let mut last = 0;
                for reference in references {
                    rewritten.push_str(&line[last..reference.start]);
                    match locate_graphic(
                        reference.name,
                        &frame.search_paths,
                        &self.config.graphic_extensions,
                    ) {
                        Some(source) => {
                            let name = self.graphics.collect(&source, output_dir)?;
                            rewritten.push_str(&name);
                        }
                        None => {
                            tracing::debug!("graphics '{}' not found", reference.name);
                            rewritten.push_str(reference.name);
                        }
                    }
                    last = reference.end;
                }
                rewritten.push_str(&line[last..]);
                rewritten.push_str(terminator);
                Ok(Step::Emit(rewritten))
            }
            LineKind::FileInclusion(inclusion) => {
                let path = match resolve_include_path(inclusion.target, &frame.dir) {
                    Ok(path) => path,
                    Err(err) => {
                        tracing::warn!("leaving \\{} unexpanded: {err}", inclusion.marker_text());
                        return Ok(Step::Emit(format!("{line}{terminator}")));
                    }
                };

                let leading = &line[..inclusion.start];
                if !leading.trim().is_empty() {
                    frame.out.push_str(leading);
                    frame.out.push('\n');
                }
                let marker = inclusion.marker_text();
                frame.out.push_str(&format!("% >>> {marker} >>>\n"));

                Ok(Step::Descend {
                    path,
                    splice: Splice {
                        marker,
                        trailing: line[inclusion.end..].to_string(),
                        terminator: terminator.to_string(),
                    },
                })
            }
            LineKind::PlainText => Ok(Step::Emit(format!("{line}{terminator}"))),
        }
    }
}

/// Appends included content and the end marker to the including frame
fn close_splice(parent: &mut Frame, content: &str, splice: &Splice) {
    parent.out.push_str(content);
    if !content.is_empty() && !content.ends_with('\n') {
        parent.out.push('\n');
    }
    parent.out.push_str(&format!("% <<< {} <<<", splice.marker));
    if splice.trailing.trim().is_empty() {
        parent.out.push_str(&splice.terminator);
    } else {
        parent.out.push('\n');
        parent.out.push_str(&splice.trailing);
        parent.out.push_str(&splice.terminator);
    }
}

/// Flattens `input` into `output_file` with a fresh [`Flattener`]
///
/// # Errors
///
/// See [`Flattener::new`] and [`Flattener::flatten_document`].
pub fn flatten_file(input: &Path, output_file: &Path, config: &FlattenConfig) -> Result<String> {
    Flattener::new(config.clone())?.flatten_document(input, output_file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_env() -> (TempDir, PathBuf, FlattenConfig) {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("output");
        fs::create_dir(&output).unwrap();
        let config = FlattenConfig {
            root_directory: temp_dir.path().to_path_buf(),
            ..FlattenConfig::default()
        };
        (temp_dir, output, config)
    }

    fn flattener(config: &FlattenConfig) -> Flattener {
        Flattener::new(config.clone()).unwrap()
    }

    #[test]
    fn test_flatten_plain_file() {
        let (temp_dir, output, config) = create_test_env();
        let main = temp_dir.path().join("main.tex");
        fs::write(&main, "Line 1\nLine 2\n").unwrap();

        let result = flattener(&config).flatten(&main, &output).unwrap();
        assert_eq!(result, "Line 1\nLine 2\n");
    }

    #[test]
    fn test_flatten_preserves_terminators() {
        let (temp_dir, output, config) = create_test_env();
        let main = temp_dir.path().join("main.tex");
        fs::write(&main, "one\r\ntwo\nthree").unwrap();

        let result = flattener(&config).flatten(&main, &output).unwrap();
        assert_eq!(result, "one\r\ntwo\nthree");
    }

    #[test]
    fn test_flatten_input_with_markers() {
        let (temp_dir, output, config) = create_test_env();
        let main = temp_dir.path().join("main.tex");
        fs::write(
            &main,
            "\\documentclass{article}\n\\begin{document}\n\\input{chapter1}\n\\end{document}\n",
        )
        .unwrap();
        fs::write(temp_dir.path().join("chapter1.tex"), "Chapter 1 content\n").unwrap();

        let result = flattener(&config).flatten(&main, &output).unwrap();
        assert_eq!(
            result,
            "\\documentclass{article}\n\\begin{document}\n\
             % >>> input{chapter1} >>>\nChapter 1 content\n% <<< input{chapter1} <<<\n\
             \\end{document}\n"
        );
    }

    #[test]
    fn test_flatten_nested_includes_and_marker_pairing() {
        let (temp_dir, output, config) = create_test_env();
        let main = temp_dir.path().join("main.tex");
        fs::create_dir(temp_dir.path().join("parts")).unwrap();
        fs::write(&main, "\\include{parts/a}\n\\input{parts/b.tex}\n").unwrap();
        fs::write(temp_dir.path().join("parts/a.tex"), "A\n\\input{inner}\n").unwrap();
        fs::write(temp_dir.path().join("parts/inner.tex"), "inner").unwrap();
        fs::write(temp_dir.path().join("parts/b.tex"), "B\n").unwrap();

        let result = flattener(&config).flatten(&main, &output).unwrap();
        assert_eq!(
            result,
            "% >>> include{parts/a} >>>\nA\n\
             % >>> input{inner} >>>\ninner\n% <<< input{inner} <<<\n\
             % <<< include{parts/a} <<<\n\
             % >>> input{parts/b.tex} >>>\nB\n% <<< input{parts/b.tex} <<<\n"
        );

        for marker in ["include{parts/a}", "input{inner}", "input{parts/b.tex}"] {
            assert_eq!(result.matches(&format!("% >>> {marker} >>>")).count(), 1);
            assert_eq!(result.matches(&format!("% <<< {marker} <<<")).count(), 1);
        }
    }

    #[test]
    fn test_flatten_keeps_text_around_directive() {
        let (temp_dir, output, config) = create_test_env();
        let main = temp_dir.path().join("main.tex");
        fs::write(&main, "See: \\input{part} % note\n").unwrap();
        fs::write(temp_dir.path().join("part.tex"), "P\n").unwrap();

        let result = flattener(&config).flatten(&main, &output).unwrap();
        assert_eq!(
            result,
            "See: \n% >>> input{part} >>>\nP\n% <<< input{part} <<<\n % note\n"
        );
    }

    #[test]
    fn test_flatten_unresolved_inclusion_passes_through() {
        let (temp_dir, output, config) = create_test_env();
        let main = temp_dir.path().join("main.tex");
        fs::write(&main, "before\n\\input{missing}\nafter\n").unwrap();

        let result = flattener(&config).flatten(&main, &output).unwrap();
        assert_eq!(result, "before\n\\input{missing}\nafter\n");
    }

    #[test]
    fn test_flatten_self_inclusion_terminates() {
        let (temp_dir, output, config) = create_test_env();
        let main = temp_dir.path().join("self.tex");
        fs::write(&main, "top\n\\input{self}\nbottom\n").unwrap();

        let result = flattener(&config).flatten(&main, &output).unwrap();
        assert_eq!(
            result,
            "top\n% >>> input{self} >>>\n% <<< input{self} <<<\nbottom\n"
        );
    }

    #[test]
    fn test_flatten_mutual_inclusion_terminates() {
        let (temp_dir, output, config) = create_test_env();
        let a = temp_dir.path().join("a.tex");
        fs::write(&a, "A start\n\\input{b}\nA end\n").unwrap();
        fs::write(temp_dir.path().join("b.tex"), "B\n\\input{a}\n").unwrap();

        let result = flattener(&config).flatten(&a, &output).unwrap();
        assert_eq!(
            result,
            "A start\n% >>> input{b} >>>\nB\n\
             % >>> input{a} >>>\n% <<< input{a} <<<\n\
             % <<< input{b} <<<\nA end\n"
        );
        assert_eq!(result.matches("A start").count(), 1);
    }

    #[test]
    fn test_flatten_duplicate_inclusion_inlined_once() {
        let (temp_dir, output, config) = create_test_env();
        let main = temp_dir.path().join("main.tex");
        fs::write(&main, "\\input{common}\n\\input{common.tex}\n").unwrap();
        fs::write(temp_dir.path().join("common.tex"), "shared\n").unwrap();

        let result = flattener(&config).flatten(&main, &output).unwrap();
        assert_eq!(result.matches("shared").count(), 1);
    }

    #[test]
    fn test_flatten_deep_nesting_does_not_overflow() {
        let (temp_dir, output, config) = create_test_env();
        let depth = 2_000;
        for i in 0..depth {
            fs::write(
                temp_dir.path().join(format!("f{i}.tex")),
                format!("level {i}\n\\input{{f{}}}\n", i + 1),
            )
            .unwrap();
        }
        fs::write(temp_dir.path().join(format!("f{depth}.tex")), "bottom\n").unwrap();

        let result = flattener(&config)
            .flatten(&temp_dir.path().join("f0.tex"), &output)
            .unwrap();
        assert!(result.contains("bottom"));
        assert_eq!(result.matches(">>> input{").count(), depth);
        assert_eq!(result.matches("<<< input{").count(), depth);
    }

    #[test]
    fn test_flatten_comment_suppression() {
        let (temp_dir, output, mut config) = create_test_env();
        let main = temp_dir.path().join("main.tex");
        fs::write(&main, "keep\n  % drop me\nvalue % inline stays\n").unwrap();

        let result = flattener(&config).flatten(&main, &output).unwrap();
        assert_eq!(result, "keep\nvalue % inline stays\n");

        config.ignore_commented_lines = false;
        let result = flattener(&config).flatten(&main, &output).unwrap();
        assert_eq!(result, "keep\n  % drop me\nvalue % inline stays\n");
    }

    #[test]
    fn test_flatten_commented_inclusion_not_followed() {
        let (temp_dir, output, config) = create_test_env();
        let main = temp_dir.path().join("main.tex");
        fs::write(&main, "% \\input{chapter}\n").unwrap();
        fs::write(temp_dir.path().join("chapter.tex"), "chapter\n").unwrap();

        let mut flattener = flattener(&config);
        let result = flattener.flatten(&main, &output).unwrap();
        assert_eq!(result, "");
        assert!(!flattener.has_visited(&temp_dir.path().join("chapter.tex")));
    }

    #[test]
    fn test_flatten_graphics_copied_and_rewritten() {
        let (temp_dir, output, config) = create_test_env();
        let main = temp_dir.path().join("main.tex");
        fs::write(&main, "\\includegraphics[width=3cm]{test_image}\n").unwrap();
        fs::write(temp_dir.path().join("test_image.png"), b"fake image data").unwrap();

        let result = flattener(&config).flatten(&main, &output).unwrap();
        assert_eq!(result, "\\includegraphics[width=3cm]{test_image.png}\n");
        assert_eq!(
            fs::read(output.join("test_image.png")).unwrap(),
            b"fake image data"
        );
    }

    #[test]
    fn test_flatten_missing_graphics_unchanged() {
        let (temp_dir, output, config) = create_test_env();
        let main = temp_dir.path().join("main.tex");
        let line = "\\includegraphics{missing}\n";
        fs::write(&main, line).unwrap();

        let result = flattener(&config).flatten(&main, &output).unwrap();
        assert_eq!(result, line);
        assert_eq!(fs::read_dir(&output).unwrap().count(), 0);
    }

    #[test]
    fn test_flatten_same_graphic_twice_copied_once() {
        let (temp_dir, output, config) = create_test_env();
        let main = temp_dir.path().join("main.tex");
        fs::write(
            &main,
            "\\includegraphics{logo}\n\\input{appendix}\n",
        )
        .unwrap();
        fs::write(temp_dir.path().join("appendix.tex"), "\\includegraphics{logo.pdf}\n").unwrap();
        fs::write(temp_dir.path().join("logo.pdf"), b"pdf").unwrap();

        let mut flattener = flattener(&config);
        let result = flattener.flatten(&main, &output).unwrap();
        assert_eq!(result.matches("\\includegraphics{logo.pdf}").count(), 2);
        assert_eq!(flattener.collected_graphics(), 1);
    }

    #[test]
    fn test_flatten_graphicspath_precedence() {
        let (temp_dir, output, config) = create_test_env();
        let figures = temp_dir.path().join("figures");
        fs::create_dir(&figures).unwrap();
        fs::write(figures.join("plot.png"), b"from figures").unwrap();
        fs::write(temp_dir.path().join("plot.png"), b"from root").unwrap();

        let main = temp_dir.path().join("main.tex");
        fs::write(
            &main,
            "\\graphicspath{{figures/}}\n\\includegraphics{plot}\n",
        )
        .unwrap();

        let result = flattener(&config).flatten(&main, &output).unwrap();
        assert_eq!(result, "\\includegraphics{plot.png}\n");
        assert_eq!(fs::read(output.join("plot.png")).unwrap(), b"from figures");
    }

    #[test]
    fn test_flatten_graphics_from_root_directory() {
        let (temp_dir, output, config) = create_test_env();
        let chapters = temp_dir.path().join("chapters");
        fs::create_dir(&chapters).unwrap();
        fs::write(temp_dir.path().join("diagram.eps"), b"eps").unwrap();
        let chapter = chapters.join("one.tex");
        fs::write(&chapter, "\\includegraphics{diagram}\n").unwrap();

        let result = flattener(&config).flatten(&chapter, &output).unwrap();
        assert_eq!(result, "\\includegraphics{diagram.eps}\n");
        assert!(output.join("diagram.eps").exists());
    }

    #[test]
    fn test_flatten_graphics_copy_failure_is_fatal() {
        let (temp_dir, _output, config) = create_test_env();
        let main = temp_dir.path().join("main.tex");
        fs::write(&main, "\\includegraphics{image}\n").unwrap();
        fs::write(temp_dir.path().join("image.png"), b"png").unwrap();

        let result = flattener(&config).flatten(&main, &temp_dir.path().join("no/such/dir"));
        assert!(matches!(result, Err(FlattenError::GraphicsCopy { .. })));
    }

    #[test]
    fn test_flatten_read_failure_is_fatal() {
        let (temp_dir, output, config) = create_test_env();

        let result = flattener(&config).flatten(&temp_dir.path().join("missing.tex"), &output);
        assert!(matches!(result, Err(FlattenError::Read { .. })));
    }

    #[test]
    fn test_flatten_decode_failure_in_included_file_is_fatal() {
        let (temp_dir, output, config) = create_test_env();
        let main = temp_dir.path().join("main.tex");
        fs::write(&main, "\\input{broken}\n").unwrap();
        fs::write(temp_dir.path().join("broken.tex"), [0xC3, 0x28, 0x0A]).unwrap();

        let result = flattener(&config).flatten(&main, &output);
        assert!(matches!(result, Err(FlattenError::Decode { .. })));
    }

    #[test]
    fn test_failed_file_is_not_left_visited() {
        let (temp_dir, output, config) = create_test_env();
        let main = temp_dir.path().join("main.tex");
        let broken = temp_dir.path().join("broken.tex");
        fs::write(&main, "\\input{broken}\n").unwrap();
        fs::write(&broken, [0xFF, 0x0A]).unwrap();

        let mut flattener = flattener(&config);
        assert!(flattener.flatten(&main, &output).is_err());
        assert!(!flattener.has_visited(&broken));

        // Once fixed, the same instance can still inline it
        fs::write(&broken, "fixed\n").unwrap();
        let result = flattener.flatten(&broken, &output).unwrap();
        assert_eq!(result, "fixed\n");
    }

    #[test]
    fn test_second_run_on_same_instance_inherits_state() {
        let (temp_dir, output, config) = create_test_env();
        let main = temp_dir.path().join("main.tex");
        fs::write(&main, "content\n").unwrap();

        let mut flattener = flattener(&config);
        assert_eq!(flattener.flatten(&main, &output).unwrap(), "content\n");
        assert_eq!(flattener.flatten(&main, &output).unwrap(), "");
    }

    #[test]
    fn test_flatten_document_writes_output() {
        let (temp_dir, output, config) = create_test_env();
        let main = temp_dir.path().join("main.tex");
        fs::write(
            &main,
            "\\documentclass{article}\n\\begin{document}\nHello World\n\\end{document}\n",
        )
        .unwrap();

        let output_file = output.join("main_flat.tex");
        let result = flatten_file(&main, &output_file, &config).unwrap();
        assert!(result.contains("Hello World"));
        assert_eq!(fs::read_to_string(&output_file).unwrap(), result);
    }

    #[test]
    fn test_flatten_document_root_extension_fallback() {
        let (temp_dir, output, config) = create_test_env();
        fs::write(temp_dir.path().join("paper.tex"), "paper\n").unwrap();

        let output_file = output.join("paper.tex");
        let result = flatten_file(&temp_dir.path().join("paper"), &output_file, &config).unwrap();
        assert_eq!(result, "paper\n");
    }

    #[test]
    fn test_flatten_document_unresolved_root_is_fatal() {
        let (temp_dir, output, config) = create_test_env();

        let result = flatten_file(
            &temp_dir.path().join("nothing"),
            &output.join("nothing.tex"),
            &config,
        );
        assert!(matches!(result, Err(FlattenError::Unresolved { .. })));
    }

    #[test]
    fn test_flatten_document_latin1_round_trip() {
        let (temp_dir, output, mut config) = create_test_env();
        config.output_encoding = "latin1".to_string();
        let main = temp_dir.path().join("main.tex");
        fs::write(&main, b"caf\xE9\n").unwrap();

        let output_file = output.join("main.tex");
        let result = flatten_file(&main, &output_file, &config).unwrap();
        assert_eq!(result, "café\n");
        assert_eq!(fs::read(&output_file).unwrap(), b"caf\xE9\n");
    }

    #[test]
    fn test_flatten_graphics_into_own_directory_keeps_bytes() {
        let (temp_dir, _output, config) = create_test_env();
        let main = temp_dir.path().join("main.tex");
        fs::write(&main, "\\includegraphics{fig}\n").unwrap();
        fs::write(temp_dir.path().join("fig.png"), b"real image bytes").unwrap();

        let result = flattener(&config).flatten(&main, temp_dir.path()).unwrap();
        assert_eq!(result, "\\includegraphics{fig.png}\n");
        assert_eq!(
            fs::read(temp_dir.path().join("fig.png")).unwrap(),
            b"real image bytes"
        );
    }

    #[test]
    fn test_flatten_document_refuses_to_overwrite_source() {
        let (temp_dir, _output, config) = create_test_env();
        let main = temp_dir.path().join("main.tex");
        fs::write(&main, "\\input{chapter}\n").unwrap();
        fs::write(temp_dir.path().join("chapter.tex"), "chapter\n").unwrap();

        let result = flatten_file(&main, &main, &config);
        assert!(matches!(result, Err(FlattenError::OutputIsSource { .. })));
        assert_eq!(fs::read_to_string(&main).unwrap(), "\\input{chapter}\n");

        let chapter = temp_dir.path().join("chapter.tex");
        let result = flatten_file(&main, &chapter, &config);
        assert!(matches!(result, Err(FlattenError::OutputIsSource { .. })));
        assert_eq!(fs::read_to_string(&chapter).unwrap(), "chapter\n");
    }

    #[test]
    fn test_flatten_document_utf16_output() {
        let (temp_dir, output, mut config) = create_test_env();
        config.output_encoding = "utf-16le".to_string();
        let main = temp_dir.path().join("main.tex");
        fs::write(&main, [b'h', 0, b'i', 0, b'\n', 0]).unwrap();

        let output_file = output.join("main.tex");
        let result = flatten_file(&main, &output_file, &config).unwrap();
        assert_eq!(result, "hi\n");
        assert_eq!(
            fs::read(&output_file).unwrap(),
            [b'h', 0, b'i', 0, b'\n', 0]
        );
    }

    #[test]
    fn test_flatten_graphics_line_does_not_expand_inclusion() {
        let (temp_dir, output, config) = create_test_env();
        let main = temp_dir.path().join("main.tex");
        fs::write(&main, "\\includegraphics{logo} \\input{chapter}\n").unwrap();
        fs::write(temp_dir.path().join("logo.png"), b"png").unwrap();
        fs::write(temp_dir.path().join("chapter.tex"), "chapter\n").unwrap();

        let mut flattener = flattener(&config);
        let result = flattener.flatten(&main, &output).unwrap();
        assert_eq!(result, "\\includegraphics{logo.png} \\input{chapter}\n");
        assert!(!flattener.has_visited(&temp_dir.path().join("chapter.tex")));
    }

    #[test]
    fn test_unknown_encoding_rejected_at_construction() {
        let config = FlattenConfig {
            output_encoding: "bogus".to_string(),
            ..FlattenConfig::default()
        };
        assert!(matches!(
            Flattener::new(config),
            Err(FlattenError::UnknownEncoding { .. })
        ));
    }
}
