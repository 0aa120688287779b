use clap::Parser;
use flatex::{FlattenConfig, Flattener, Result, prepare_output_dir};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::EnvFilter;

const LONG_HELP: &str = r#"
Directives:
  \input{file} / \include{file}  - Inlined recursively (.tex is appended if needed)
  \includegraphics{name}         - Graphic copied to the output directory, reference rewritten
  \graphicspath{{dir/}}          - Extra directories searched for graphics
  % comment lines                - Dropped unless --keep-comments

Examples:
  # Flatten main.tex into flat/main.tex
  flatex main.tex
  # Write into an existing directory
  flatex main.tex -o submission --force
  # Only look for PNG and PDF graphics
  flatex main.tex -e .png -e .pdf
  # Load options from a JSON file
  flatex main.tex --config flatex.json

Configuration file example:
  {
    "graphic_extensions": [".pdf", ".png"],
    "ignore_commented_lines": true,
    "root_directory": ".",
    "output_encoding": "utf-8"
  }
"#;

/// Flatten multi-file LaTeX sources into a single file.
#[derive(Parser, Debug)]
#[command(
    name = "flatex",
    version,
    about = "Flatten multi-file LaTeX sources into a single file.",
    after_long_help = LONG_HELP
)]
struct Cli {
    /// Root LaTeX file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output directory for the flattened file and copied graphics
    #[arg(short, long, value_name = "DIR", default_value = "flat")]
    output: PathBuf,

    /// Write into the output directory even if it already exists
    #[arg(short, long)]
    force: bool,

    /// JSON configuration file; flags below override its values
    #[arg(short, long, value_name = "FILE", env = "FLATEX_CONFIG")]
    config: Option<PathBuf>,

    /// Keep lines that start with a % comment
    #[arg(long)]
    keep_comments: bool,

    /// Graphics extension to try, in order (repeatable)
    #[arg(short = 'e', long = "graphic-ext", value_name = "EXT", action = clap::ArgAction::Append)]
    graphic_extensions: Vec<String>,

    /// Directory searched last for graphics
    #[arg(long, value_name = "DIR")]
    root_dir: Option<PathBuf>,

    /// Encoding for reading sources and writing the output
    #[arg(long, value_name = "LABEL")]
    encoding: Option<String>,

    /// Increase verbosity (can be used multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    match run(&cli) {
        Ok(output_file) => {
            if !cli.quiet {
                println!(
                    "Flattened {} -> {}",
                    cli.input.display(),
                    output_file.display()
                );
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn init_logging(quiet: bool, verbose: u8) {
    let level = match (quiet, verbose) {
        (true, _) => Level::ERROR,
        (false, 0) => Level::WARN,
        (false, 1) => Level::INFO,
        (false, 2) => Level::DEBUG,
        (false, _) => Level::TRACE,
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> Result<PathBuf> {
    let config = build_config(cli)?;
    let output_file = output_file_path(&cli.input, &cli.output);

    prepare_output_dir(&cli.output, cli.force)?;
    tracing::info!(
        "flattening {} into {}",
        cli.input.display(),
        output_file.display()
    );

    let mut flattener = Flattener::new(config)?;
    flattener.flatten_document(&cli.input, &output_file)?;
    tracing::info!(
        "{} graphics file(s) collected",
        flattener.collected_graphics()
    );

    Ok(output_file)
}

fn build_config(cli: &Cli) -> Result<FlattenConfig> {
    let mut config = match &cli.config {
        Some(path) => FlattenConfig::from_json_file(path)?,
        None => FlattenConfig::default(),
    };

    if cli.keep_comments {
        config.ignore_commented_lines = false;
    }
    if !cli.graphic_extensions.is_empty() {
        config.graphic_extensions = cli
            .graphic_extensions
            .iter()
            .map(|ext| normalize_extension(ext))
            .collect();
    }
    if let Some(dir) = &cli.root_dir {
        config.root_directory.clone_from(dir);
    }
    if let Some(label) = &cli.encoding {
        config.output_encoding.clone_from(label);
    }

    Ok(config)
}

/// `png` and `.png` both mean `.png`
fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim();
    if ext.starts_with('.') {
        ext.to_string()
    } else {
        format!(".{ext}")
    }
}

/// The flattened file keeps the input's file name, with `.tex` added when the
/// input was given without an extension
fn output_file_path(input: &Path, output_dir: &Path) -> PathBuf {
    let mut name = input
        .file_name()
        .map_or_else(|| "main".into(), |name| name.to_os_string());
    if input.extension().is_none() {
        name.push(".tex");
    }
    output_dir.join(name)
}
