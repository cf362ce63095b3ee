//! Phrase replacement CLI application.
//!
//! This binary provides a command-line interface for the phraseswap library:
//! one dictionary of replacements applied to any number of input/output
//! file pairs.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use phraseswap::{
    BatchMode, Dictionary, ReplaceOptions, ReplaceService, ReplacementStatus, SourceFile,
    StyleSpec,
};

/// Phrase Replacement Tool
///
/// Replace phrases in text, Word (.docx) and Excel (.xlsx) files while
/// keeping their formatting. Inputs and outputs pair up in the order given.
#[derive(Parser)]
#[command(name = "phraseswap")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Replacement as FIND=REPLACEMENT (can be specified multiple times)
    #[arg(short, long = "replace", value_name = "FIND=REPLACEMENT", required = true)]
    replacements: Vec<String>,

    /// Input file path (can be specified multiple times)
    #[arg(short, long, value_name = "FILE", required = true)]
    input: Vec<PathBuf>,

    /// Output file path, one per input
    #[arg(short, long, value_name = "FILE", required = true)]
    output: Vec<PathBuf>,

    /// Only replace whole words
    #[arg(long)]
    whole_word: bool,

    /// Match case exactly
    #[arg(long)]
    case_sensitive: bool,

    /// Capitalize replacements like the text they replace
    #[arg(long)]
    preserve_case: bool,

    /// Make replacements bold
    #[arg(long)]
    bold: bool,

    /// Make replacements italic
    #[arg(long)]
    italics: bool,

    /// Underline replacements
    #[arg(long)]
    underline: bool,

    /// Strike replacements through
    #[arg(long)]
    strikethrough: bool,

    /// Highlight color as 6-digit hex, e.g. #FFFF00
    #[arg(long, value_name = "HEX")]
    highlight: Option<String>,

    /// Text color as 6-digit hex
    #[arg(long, value_name = "HEX")]
    text_color: Option<String>,

    /// Keep processing remaining files when one fails
    #[arg(long)]
    keep_going: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn style(&self) -> StyleSpec {
        let mut style = StyleSpec::new()
            .bold(self.bold)
            .italics(self.italics)
            .underline(self.underline)
            .strikethrough(self.strikethrough);

        if let Some(color) = &self.highlight {
            style = style.highlight(color);
            if style.highlight.is_none() {
                println!("⚠ Ignoring invalid highlight color '{}'", color);
            }
        }
        if let Some(color) = &self.text_color {
            style = style.text_color(color);
            if style.text_color.is_none() {
                println!("⚠ Ignoring invalid text color '{}'", color);
            }
        }
        style
    }

    fn options(&self) -> ReplaceOptions {
        ReplaceOptions::new()
            .with_whole_word(self.whole_word)
            .with_case_sensitive(self.case_sensitive)
            .with_preserve_case(self.preserve_case)
            .with_style(self.style())
    }
}

/// Replacement command handler.
struct ReplaceHandler {
    service: ReplaceService,
    verbose: bool,
}

impl ReplaceHandler {
    fn new(dictionary: Dictionary, options: &ReplaceOptions, verbose: bool) -> Result<Self> {
        let service = ReplaceService::from_dictionary(dictionary, options)
            .with_context(|| "Failed to build the phrase matcher")?;
        Ok(Self { service, verbose })
    }

    /// Runs the batch and reports each file.
    fn run(&self, files: &mut [SourceFile], mode: BatchMode) -> Result<()> {
        if self.verbose {
            println!("Phrases: {}", self.service.replacer().dictionary().len());
            println!("Files:   {}", files.len());
        }

        let outcome = self.service.replace_all(files, mode);

        for file in files.iter() {
            match file.status {
                ReplacementStatus::Completed(0) => {
                    println!("⚠ No phrases found in {}", file.source.display())
                }
                ReplacementStatus::Completed(count) => println!(
                    "✓ Replaced {} phrase(s): {} → {}",
                    count,
                    file.source.display(),
                    file.destination.display()
                ),
                ReplacementStatus::Failed => println!("✗ Failed: {}", file.source.display()),
                ReplacementStatus::Pending => {
                    if self.verbose {
                        println!("- Skipped: {}", file.source.display());
                    }
                }
            }
        }

        let all_completed = outcome.with_context(|| "Replacement failed")?;
        if !all_completed {
            let failed = files
                .iter()
                .filter(|f| f.status == ReplacementStatus::Failed)
                .count();
            anyhow::bail!("{} of {} file(s) failed", failed, files.len());
        }
        Ok(())
    }
}

/// Splits a `FIND=REPLACEMENT` argument at the first `=`.
fn parse_replacement(arg: &str) -> Result<(String, String)> {
    let Some((find, replacement)) = arg.split_once('=') else {
        anyhow::bail!("Invalid replacement '{}': expected FIND=REPLACEMENT", arg);
    };
    if find.is_empty() {
        anyhow::bail!("Invalid replacement '{}': the phrase to find is empty", arg);
    }
    Ok((find.to_string(), replacement.to_string()))
}

/// Builds the dictionary from command-line replacements.
fn build_dictionary(args: &[String]) -> Result<Dictionary> {
    let pairs = args
        .iter()
        .map(|arg| parse_replacement(arg))
        .collect::<Result<Vec<_>>>()?;
    Ok(Dictionary::from_pairs(pairs)?)
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("warn,phraseswap=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.input.len() != cli.output.len() {
        anyhow::bail!(
            "Got {} input file(s) but {} output file(s); each input needs an output",
            cli.input.len(),
            cli.output.len()
        );
    }

    let dictionary = build_dictionary(&cli.replacements)?;
    let handler = ReplaceHandler::new(dictionary, &cli.options(), cli.verbose)?;

    let mut files: Vec<SourceFile> = cli
        .input
        .iter()
        .zip(&cli.output)
        .map(|(input, output)| SourceFile::new(input, output))
        .collect();

    let mode = if cli.keep_going {
        BatchMode::Tolerant
    } else {
        BatchMode::Strict
    };
    handler.run(&mut files, mode)
}
