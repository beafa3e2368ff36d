#![forbid(unsafe_code)]

//! compat-session — legacy session loader.
//!
//! CLI entry point: parses arguments, dispatches subcommands, renders output.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use compat_session::chain::LoaderChain;
use compat_session::discovery::{DEFAULT_MAX_DEPTH, ScanOutcome, scan_sessions};
use compat_session::error::CompatError;
use compat_session::loaders::LegacyVersion;
use compat_session::model::{CanonicalSession, display_value};
use compat_session::raw::TextDecoding;

/// Load session files written by older tool versions into the current
/// session schema.
#[derive(Parser, Debug)]
#[command(name = "compat-session", version, about, long_about = None)]
struct Cli {
    /// Show detailed loading progress.
    #[arg(long, global = true)]
    verbose: bool,

    /// Show everything including per-rule mapping details.
    #[arg(long, global = true)]
    trace: bool,

    /// Output as JSON for machine consumption.
    #[arg(long, global = true)]
    json: bool,

    /// How undecodable bytes in legacy files are handled.
    #[arg(
        long,
        global = true,
        value_enum,
        env = "COMPAT_SESSION_DECODING",
        default_value = "replace"
    )]
    decoding: TextDecoding,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Convert a legacy session file and print the canonical session as JSON.
    Convert {
        /// Legacy session file.
        path: String,

        /// Write the canonical session to this file instead of stdout.
        #[arg(long, short)]
        output: Option<String>,

        /// Emit single-line JSON.
        #[arg(long)]
        compact: bool,
    },

    /// Print one environment variable of a converted session (e.g. PWD).
    Env {
        /// Legacy session file.
        path: String,
        /// Variable name.
        name: String,
    },

    /// Report which files under a directory are recognizable legacy sessions.
    Scan {
        /// Directory to walk.
        dir: String,

        /// Maximum recursion depth.
        #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
        max_depth: usize,
    },

    /// List supported legacy formats, newest first.
    Formats,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: clap_complete::Shell,
    },
}

/// Initialize the tracing subscriber based on CLI flags.
///
/// Priority: `--trace` > `--verbose` > `RUST_LOG` env var > default (warn).
fn init_tracing(cli: &Cli) {
    let filter = if cli.trace {
        EnvFilter::new("compat_session=trace")
    } else if cli.verbose {
        EnvFilter::new("compat_session=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Expand a leading `~/` to the user's home directory.
fn expand_path(value: &str) -> PathBuf {
    if let Some(rest) = value.strip_prefix("~/") {
        dirs::home_dir()
            .map(|h| h.join(rest))
            .unwrap_or_else(|| PathBuf::from(value))
    } else {
        PathBuf::from(value)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(&cli) {
        Ok(code) => code,
        Err(e) => report_error(&e, cli.json),
    }
}

fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    let chain = LoaderChain::default_chain(cli.decoding);

    match &cli.command {
        Command::Convert {
            path,
            output,
            compact,
        } => {
            let session = chain.load(&expand_path(path))?;
            let rendered = render_session(&session, *compact)?;
            match output {
                Some(out) => {
                    let out = expand_path(out);
                    std::fs::write(&out, rendered + "\n")
                        .with_context(|| format!("failed to write {}", out.display()))?;
                    if !cli.json {
                        eprintln!(
                            "{} {} ({})",
                            "Converted".green().bold(),
                            out.display(),
                            session.compat_id().unwrap_or("unknown")
                        );
                    }
                }
                None => println!("{rendered}"),
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Env { path, name } => {
            let session = chain.load(&expand_path(path))?;
            match session.env_var(name) {
                Some(value) if cli.json => {
                    println!("{}", serde_json::json!({ "name": name, "value": value }));
                    Ok(ExitCode::SUCCESS)
                }
                Some(value) => {
                    println!("{}", display_value(value));
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    eprintln!("{} ${name} is not set", "error:".red().bold());
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Scan { dir, max_depth } => {
            let root = expand_path(dir);
            anyhow::ensure!(root.is_dir(), "{} is not a directory", root.display());
            let entries = scan_sessions(&root, *max_depth, &chain);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for entry in &entries {
                    let shown = display_relative(&entry.path, &root);
                    match &entry.outcome {
                        ScanOutcome::Recognized { version } => {
                            println!("{:<8} {shown}", version.green())
                        }
                        ScanOutcome::Unrecognized { .. } => {
                            println!("{:<8} {shown}", "-".dimmed())
                        }
                    }
                }
                let recognized = entries.iter().filter(|e| e.is_recognized()).count();
                eprintln!("{recognized} of {} file(s) recognized", entries.len());
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Formats => {
            if cli.json {
                let formats: Vec<_> = LegacyVersion::NEWEST_FIRST
                    .iter()
                    .map(|v| {
                        serde_json::json!({
                            "id": v.label(),
                            "marker": v.marker().map(|m| serde_json::json!({
                                "field": m.field,
                                "expected": m.expected,
                            })),
                            "layout_keys": v.layout_keys(),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&formats)?);
            } else {
                for v in LegacyVersion::NEWEST_FIRST {
                    let marker = v
                        .marker()
                        .map(|m| format!("{} = {}", m.field, m.expected))
                        .unwrap_or_else(|| "no marker".to_string());
                    println!(
                        "{:<8} {} [{}]",
                        v.label().bold(),
                        marker.dimmed(),
                        v.layout_keys().join(", ")
                    );
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(*shell, &mut cmd, "compat-session", &mut std::io::stdout());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn render_session(session: &CanonicalSession, compact: bool) -> anyhow::Result<String> {
    let rendered = if compact {
        serde_json::to_string(session)?
    } else {
        serde_json::to_string_pretty(session)?
    };
    Ok(rendered)
}

fn display_relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

/// Print one error line (or a JSON error object) and pick the exit code.
///
/// An unrecognized session format exits with 2; everything else with 1.
fn report_error(err: &anyhow::Error, json: bool) -> ExitCode {
    let compat = err.downcast_ref::<CompatError>();
    if json {
        let mut body = serde_json::json!({
            "error_type": compat.map(CompatError::kind).unwrap_or("other"),
            "message": err.to_string(),
        });
        if let Some(CompatError::NoMatch { attempts, .. }) = compat {
            body["attempts"] = serde_json::json!(attempts);
        }
        println!("{body}");
    } else {
        eprintln!("{} {err:#}", "error:".red().bold());
    }

    match compat {
        Some(CompatError::NoMatch { .. }) => ExitCode::from(2),
        _ => ExitCode::FAILURE,
    }
}
