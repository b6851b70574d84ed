//! gfmark CLI
//!
//! Converts CommonMark and GitHub Flavored Markdown to HTML, XML, plain
//! text or a JSON syntax tree.

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use gfmark_core::{Engine, EngineConfig, ExtensionEntry};
use gfmark_extensions::CORE_EXTENSIONS;
use miette::{Context, IntoDiagnostic, Result};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// gfmark - CommonMark and GitHub Flavored Markdown converter
#[derive(Parser)]
#[command(name = "gfmark")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Files to convert, concatenated in order (standard input when empty)
    files: Vec<PathBuf>,

    /// Output format
    #[arg(short = 't', long = "to", value_enum, default_value_t = Format::Html)]
    to: Format,

    /// Enable an extension (repeatable)
    #[arg(short = 'e', long = "extension", value_name = "EXT")]
    extensions: Vec<String>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Use smart punctuation
    #[arg(long)]
    smart: bool,

    /// Parse footnotes
    #[arg(long)]
    footnotes: bool,

    /// Render raw HTML and dangerous URLs
    #[arg(long = "unsafe")]
    unsafe_html: bool,

    /// Include source positions in the output
    #[arg(long)]
    sourcepos: bool,

    /// Render soft breaks as hard breaks
    #[arg(long)]
    hardbreaks: bool,

    /// Render soft breaks as spaces
    #[arg(long, conflicts_with = "hardbreaks")]
    nobreaks: bool,

    /// Enable every GitHub Flavored Markdown extension
    #[arg(long)]
    gfm: bool,

    /// Fail when an extension render callback fails
    #[arg(long)]
    strict: bool,

    /// Write output to a file instead of standard output
    #[arg(short, long, value_name = "OUT")]
    output: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Html,
    Xml,
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(has_errors) => {
            if has_errors {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            error!("{:?}", e);
            ExitCode::from(2)
        }
    }
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    if let Some(path) = &cli.config {
        return EngineConfig::from_file(path).into_diagnostic();
    }
    if let Some(path) = EngineConfig::find(".") {
        info!("Using config: {}", path.display());
        return EngineConfig::from_file(&path).into_diagnostic();
    }
    debug!("No config file found, using defaults");
    Ok(EngineConfig::new())
}

/// Applies command-line flags on top of the loaded configuration.
fn apply_flags(cli: &Cli, config: &mut EngineConfig) {
    config.parse.smart |= cli.smart;
    config.parse.footnotes |= cli.footnotes;
    config.render.unsafe_html |= cli.unsafe_html;
    config.render.sourcepos |= cli.sourcepos;
    config.render.hardbreaks |= cli.hardbreaks;
    config.render.nobreaks |= cli.nobreaks;
    config.strict |= cli.strict;

    let gfm: &[&str] = if cli.gfm { CORE_EXTENSIONS } else { &[] };
    let requested = gfm.iter().copied().chain(cli.extensions.iter().map(String::as_str));
    for name in requested {
        if config.extensions.iter().any(|entry| entry.name() == name) {
            debug!("Extension '{}' already enabled", name);
            continue;
        }
        config.extensions.push(ExtensionEntry::from(name));
    }
}

fn read_input(files: &[PathBuf]) -> Result<Vec<u8>> {
    let mut input = Vec::new();
    if files.is_empty() {
        io::stdin().read_to_end(&mut input).into_diagnostic()?;
        return Ok(input);
    }
    for path in files {
        let content = fs::read(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
        input.extend_from_slice(&content);
    }
    Ok(input)
}

/// Converts the input. Returns true when extension callbacks failed.
fn run(cli: &Cli) -> Result<bool> {
    let mut config = load_config(cli)?;
    apply_flags(cli, &mut config);
    let engine = Engine::new(config).into_diagnostic()?;

    let input = read_input(&cli.files)?;
    let doc = engine.parse_bytes(&input).into_diagnostic()?;

    let mut has_errors = false;
    let output = match cli.to {
        Format::Html => {
            let report = engine.render_report(&doc).into_diagnostic()?;
            for failure in &report.errors {
                warn!("{}", failure);
            }
            if !report.is_clean() {
                if engine.config().strict {
                    miette::bail!("{} extension callback(s) failed", report.errors.len());
                }
                has_errors = true;
            }
            report.html
        }
        Format::Xml => engine.render_xml(&doc).into_diagnostic()?,
        Format::Text => engine.render_plaintext(&doc),
        Format::Json => {
            let mut json = engine.to_json(&doc).into_diagnostic()?;
            json.push('\n');
            json
        }
    };

    match &cli.output {
        Some(path) => fs::write(path, output)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to write {}", path.display()))?,
        None => io::stdout()
            .write_all(output.as_bytes())
            .into_diagnostic()?,
    }
    Ok(has_errors)
}
