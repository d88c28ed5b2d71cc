mod export;
mod list;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pox_assets::{Manifest, Source};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "pox-assets")]
#[command(about = "Collect assets into a read-only virtual filesystem")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Manifest file (default: assets.toml searched upward from the working directory)
    #[arg(short, long, global = true, value_name = "FILE")]
    manifest: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the collected assets
    List(list::ListArgs),

    /// Write the collected assets into a directory
    Export(export::ExportArgs),
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Resolve the manifest named on the command line, or the closest assets.toml
fn load_sources(manifest: Option<PathBuf>) -> Result<Vec<Source>> {
    let manifest = match manifest {
        Some(path) => Manifest::from_path(&path)
            .with_context(|| format!("Failed to load manifest {}", path.display()))?,
        None => {
            let cwd = std::env::current_dir().context("Failed to get current directory")?;
            Manifest::load(&cwd)?
        }
    };

    Ok(manifest.sources()?)
}

fn run() -> Result<i32> {
    let args = Args::parse();
    init_logger(args.verbose);

    let sources = load_sources(args.manifest)?;

    match args.command {
        Commands::List(list_args) => list::execute(list_args, &sources),
        Commands::Export(export_args) => export::execute(export_args, &sources),
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            eprintln!("Error: {}", e);
            for cause in e.chain().skip(1) {
                eprintln!("  Caused by: {}", cause);
            }
            ExitCode::FAILURE
        }
    }
}
