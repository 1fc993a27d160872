//! lapse - keyframed effect pipeline for photographic time-lapse sequences.
//!
//! Processes ranges of numbered JPEG frames through a keyframe program of
//! effects (exposure, white balance, crop-resize, pad), writing one output
//! frame per input with every effect property linearly interpolated
//! between its keyframes.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use lapse_io::{expand_pair, OutputTemplate};

mod processor;
mod program;

use processor::Processor;
use program::EffectProgram;

#[derive(Parser)]
#[command(name = "lapse")]
#[command(version, about = "Keyframed effect pipeline for photographic time-lapse sequences")]
#[command(long_about = "
Processes JPEG files for creating timelapses. Input files come in pairs of
<first_file> <last_file> with names of the form <prefix>XX..XX.<extension>,
where X is a digit; all files in between are processed and the ranges of
several pairs concatenate. With --single, one file is processed, which is
useful for testing the timelapse parameters.

An effects program assigns property values at keyframes, for example:

    0: exposure.evrel=0 48: exposure.evrel=1.5

Between keyframes, property values are interpolated linearly.
")]
struct Cli {
    /// Select verbosity level
    #[arg(short, long, default_value_t = 1)]
    verbosity: i32,

    /// Set verbosity to 0
    #[arg(short, long)]
    quiet: bool,

    /// Single file processing
    #[arg(short, long)]
    single: bool,

    /// List of keyframed effects to be executed
    #[arg(short, long)]
    effects: Option<String>,

    /// Get list of effects from file
    #[arg(short = 'f', long = "effects-file", conflicts_with = "effects")]
    effects_file: Option<PathBuf>,

    /// Format for output files, in the form [path/]nameXXXX.ext; the X's
    /// will be replaced with the frame number
    #[arg(short, long)]
    output: String,

    /// Input files: <first> <last> pairs, or one file with --single
    #[arg(value_name = "FILE", required = true)]
    files: Vec<String>,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // help and version exit cleanly; anything else is a usage error
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
            let _ = err.print();
            return code;
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let verbosity = if cli.quiet { 0 } else { cli.verbosity };
    init_tracing(verbosity);

    let files = gather_files(&cli)?;
    check_files_exist(&files)?;

    let effects_text = match (&cli.effects, &cli.effects_file) {
        (Some(text), None) => text.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("reading effects file {}", path.display()))?,
        (None, None) => String::new(),
        (Some(_), Some(_)) => unreachable!("clap rejects the combination"),
    };
    let program = EffectProgram::parse(&effects_text)?;

    let template = OutputTemplate::parse(&cli.output)?;

    Processor::new(files, program, template, verbosity).run()
}

/// Maps the verbosity flag to a tracing level and installs the subscriber.
fn init_tracing(verbosity: i32) {
    let level = match verbosity {
        i32::MIN..=0 => tracing::Level::ERROR,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .without_time()
        .try_init();
}

/// Expands the positional arguments into the frame file list.
fn gather_files(cli: &Cli) -> Result<Vec<String>> {
    if cli.single {
        if cli.files.len() != 1 {
            bail!("in single operation mode, a single input file is expected");
        }
        return Ok(vec![cli.files[0].clone()]);
    }

    if cli.files.len() % 2 != 0 {
        bail!("files should come in pairs of first_file, last_file");
    }

    let mut files = Vec::new();
    for pair in cli.files.chunks(2) {
        files.extend(expand_pair(&pair[0], &pair[1])?);
    }
    Ok(files)
}

/// Verifies that the input files are readable before any work starts.
///
/// At most five missing names are listed, followed by `, ...` when more
/// are missing.
fn check_files_exist(files: &[String]) -> Result<()> {
    const MAX_MISSING: usize = 5;

    let mut missing = Vec::new();
    for name in files {
        if std::fs::File::open(name).is_err() {
            missing.push(name.clone());
            if missing.len() > MAX_MISSING {
                break;
            }
        }
    }
    if missing.is_empty() {
        return Ok(());
    }

    let shown = missing
        .iter()
        .take(MAX_MISSING)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    let ellipsis = if missing.len() > MAX_MISSING { ", ..." } else { "" };
    bail!("some files are missing or unreadable ({shown}{ellipsis})");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> std::result::Result<Cli, clap::Error> {
        Cli::try_parse_from(args)
    }

    #[test]
    fn test_cli_requires_output_and_files() {
        assert!(parse(&["lapse"]).is_err());
        assert!(parse(&["lapse", "-o", "outXX.jpg"]).is_err());
        assert!(parse(&["lapse", "-o", "outXX.jpg", "a00.jpg", "a03.jpg"]).is_ok());
    }

    #[test]
    fn test_cli_effects_exclusive() {
        assert!(parse(&[
            "lapse",
            "-o",
            "outXX.jpg",
            "-e",
            "exposure.evrel=1",
            "-f",
            "program.fx",
            "a00.jpg",
            "a01.jpg"
        ])
        .is_err());
    }

    #[test]
    fn test_gather_files_pairs() {
        let cli = parse(&["lapse", "-o", "oXX.jpg", "a01.jpg", "a03.jpg"]).unwrap();
        let files = gather_files(&cli).unwrap();
        assert_eq!(files, ["a01.jpg", "a02.jpg", "a03.jpg"]);
    }

    #[test]
    fn test_gather_files_multiple_ranges_concatenate() {
        let cli = parse(&[
            "lapse", "-o", "oXX.jpg", "a01.jpg", "a02.jpg", "b07.jpg", "b08.jpg",
        ])
        .unwrap();
        let files = gather_files(&cli).unwrap();
        assert_eq!(files, ["a01.jpg", "a02.jpg", "b07.jpg", "b08.jpg"]);
    }

    #[test]
    fn test_gather_files_odd_count() {
        let cli = parse(&["lapse", "-o", "oXX.jpg", "a01.jpg", "a02.jpg", "a03.jpg"]).unwrap();
        assert!(gather_files(&cli).is_err());
    }

    #[test]
    fn test_gather_files_single() {
        let cli = parse(&["lapse", "-s", "-o", "oXX.jpg", "a01.jpg"]).unwrap();
        assert_eq!(gather_files(&cli).unwrap(), ["a01.jpg"]);

        let cli = parse(&["lapse", "-s", "-o", "oXX.jpg", "a01.jpg", "a02.jpg"]).unwrap();
        assert!(gather_files(&cli).is_err());
    }

    #[test]
    fn test_missing_files_report_caps_at_five() {
        let files: Vec<String> = (0..10)
            .map(|i| format!("/nonexistent/lapse_missing_{i}.jpg"))
            .collect();
        let err = check_files_exist(&files).unwrap_err();
        let message = err.to_string();
        assert!(message.ends_with(", ...)"), "{message}");
        // exactly five names are listed
        assert_eq!(message.matches("lapse_missing_").count(), 5);
    }

    #[test]
    fn test_missing_files_few_listed_fully() {
        let files = vec!["/nonexistent/only_one.jpg".to_string()];
        let err = check_files_exist(&files).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("only_one.jpg"));
        assert!(!message.contains("..."));
    }
}
