use anyhow::Result;
use chrono::SecondsFormat;
use clap::Args;
use console::style;
use pox_assets::{Source, VirtualFileSet};

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only print paths
    #[arg(long)]
    pub name_only: bool,
}

pub fn execute(args: ListArgs, sources: &[Source]) -> Result<i32> {
    let files = pox_assets::retrieve(sources)?;

    for line in format_listing(&files, args.name_only) {
        println!("{}", line);
    }

    if !args.name_only {
        eprintln!(
            "{} {} assets from {} sources",
            style("Collected").green().bold(),
            files.len(),
            sources.len()
        );
    }

    Ok(0)
}

/// One line per asset: path, size, RFC 3339 modification time
fn format_listing(files: &VirtualFileSet, name_only: bool) -> Vec<String> {
    let width = files.paths().map(str::len).max().unwrap_or(0);

    files
        .iter()
        .map(|(path, file)| {
            if name_only {
                path.to_string()
            } else {
                format!(
                    "{:<width$}  {:>10}  {}",
                    path,
                    file.data.len(),
                    file.mod_time.to_rfc3339_opts(SecondsFormat::Secs, true),
                    width = width
                )
            }
        })
        .collect()
}
