//! linepipe CLI entry point.
//!
//! Usage:
//!   linepipe 'grep -i error | sort | uniq'      # one argument, split on `|`
//!   linepipe grep error '|' sort                # separator as its own argument
//!   linepipe '{grep error}, {sort}'             # brace syntax
//!   linepipe --list 'sort -rn | head 3'         # show the parsed stages

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use linepipe_kernel::{split_commands, stage_help, Pipeline, PipelineConfig, StageContext};
use tokio::io::BufWriter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Exit code for bad options and descriptors that fail to parse.
const USAGE_ERROR: u8 = 2;

fn main() -> ExitCode {
    // Initialize tracing (respects RUST_LOG env var); stdout carries pipeline output.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Options {
    separator: Option<String>,
    timeout_ms: Option<u64>,
    config: Option<PathBuf>,
    list: bool,
    help: bool,
    version: bool,
    commands: Vec<String>,
}

/// Leading `--` options, then stage arguments. `--` ends option parsing.
fn parse_options(args: &[String]) -> Result<Options> {
    let mut opts = Options::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--" => break,
            "-h" | "--help" => opts.help = true,
            "-V" | "--version" => opts.version = true,
            "--list" => opts.list = true,
            other => {
                if let Some(sep) = other.strip_prefix("--sep=") {
                    opts.separator = Some(sep.to_string());
                } else if let Some(ms) = other.strip_prefix("--timeout=") {
                    let ms = ms
                        .parse::<u64>()
                        .with_context(|| format!("--timeout expects milliseconds, got {ms:?}"))?;
                    opts.timeout_ms = Some(ms);
                } else if let Some(path) = other.strip_prefix("--config=") {
                    opts.config = Some(PathBuf::from(path));
                } else if other.starts_with("--") {
                    anyhow::bail!("unknown option: {other}");
                } else {
                    opts.commands.push(other.to_string());
                    break;
                }
            }
        }
    }
    opts.commands.extend(iter.cloned());
    Ok(opts)
}

fn run() -> Result<ExitCode> {
    let args: Vec<String> = env::args().skip(1).collect();

    let opts = match parse_options(&args) {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("{e}");
            eprintln!("Run 'linepipe --help' for usage.");
            return Ok(ExitCode::from(USAGE_ERROR));
        }
    };

    if opts.help {
        print_help();
        return Ok(ExitCode::SUCCESS);
    }
    if opts.version {
        println!("linepipe {}", env!("CARGO_PKG_VERSION"));
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = match &opts.config {
        Some(path) => PipelineConfig::load_from(path)?,
        None => PipelineConfig::load()?,
    };
    if let Some(sep) = opts.separator {
        config.separator = sep;
    }
    if let Some(ms) = opts.timeout_ms {
        config.timeout_ms = Some(ms);
    }

    let descriptors = split_commands(&opts.commands, config.separator());
    let pipeline = match Pipeline::from_descriptors(&descriptors) {
        Ok(pipeline) => pipeline.with_config(&config),
        Err(e) => {
            eprintln!("linepipe: {e}");
            return Ok(ExitCode::from(USAGE_ERROR));
        }
    };

    if opts.list {
        for (i, name) in pipeline.names().iter().enumerate() {
            println!("{}\t{name}", i + 1);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let rt = tokio::runtime::Runtime::new()?;
    let code = rt.block_on(execute(&pipeline, config.timeout()));
    // A stdin read may still be parked on a blocking thread after an interrupt.
    rt.shutdown_background();
    code
}

async fn execute(pipeline: &Pipeline, timeout: Option<Duration>) -> Result<ExitCode> {
    let ctx = StageContext::new();

    let interrupt = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling pipeline");
            interrupt.cancel();
        }
    });

    let mut stdin = tokio::io::stdin();
    let mut stdout = BufWriter::new(tokio::io::stdout());

    let result = match timeout {
        Some(timeout) => {
            pipeline
                .run_with_timeout(&ctx, timeout, &mut stdin, &mut stdout)
                .await
        }
        None => pipeline.run(&ctx, &mut stdin, &mut stdout).await,
    };

    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("linepipe: {e}");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_help() {
    println!(
        r#"linepipe v{}

Usage:
  linepipe [OPTIONS] STAGE...

Stages are separated by the separator (default "|"), given either inside
one argument, as their own argument, or as {{stage}}, {{stage}}.

Options:
  --sep=<S>            Stage separator
  --timeout=<MS>       Abort the run after MS milliseconds
  --config=<PATH>      Config file (default: platform config dir)
  --list               Print the parsed stages and exit
  -h, --help           Show this help
  -V, --version        Show version

Stages:
{}
Examples:
  linepipe 'grep -i error | sort | uniq' < app.log
  linepipe 'cut -d, -f2 | sort -rn | head 5' < data.csv
  linepipe --sep=';' 'sed s/foo/bar/g ; nl' < notes.txt
"#,
        env!("CARGO_PKG_VERSION"),
        stage_help()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_options_then_commands() {
        let opts = parse_options(&args(&["--sep=;", "--list", "grep x ; sort"])).unwrap();
        assert_eq!(opts.separator.as_deref(), Some(";"));
        assert!(opts.list);
        assert_eq!(opts.commands, vec!["grep x ; sort"]);
    }

    #[test]
    fn test_stage_flags_are_not_options() {
        let opts = parse_options(&args(&["grep", "-i", "x", "|", "head", "--help"])).unwrap();
        assert!(!opts.help);
        assert_eq!(opts.commands, args(&["grep", "-i", "x", "|", "head", "--help"]));
    }

    #[test]
    fn test_double_dash() {
        let opts = parse_options(&args(&["--", "--list"])).unwrap();
        assert!(!opts.list);
        assert_eq!(opts.commands, vec!["--list"]);
    }

    #[test]
    fn test_timeout() {
        let opts = parse_options(&args(&["--timeout=250", "sort"])).unwrap();
        assert_eq!(opts.timeout_ms, Some(250));
        assert!(parse_options(&args(&["--timeout=soon"])).is_err());
    }

    #[test]
    fn test_unknown_option() {
        assert!(parse_options(&args(&["--frobnicate"])).is_err());
    }
}
