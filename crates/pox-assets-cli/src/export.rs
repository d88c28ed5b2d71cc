use anyhow::Result;
use clap::Args;
use console::style;
use pox_assets::{CompileOptions, Generator, Source, VirtualFileSet};
use std::fs;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Directory the assets are written to
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,
}

/// Writes every asset as a regular file below `options.file_path`
pub struct DirectoryGenerator;

impl Generator for DirectoryGenerator {
    fn generate(&self, files: &VirtualFileSet, options: &CompileOptions) -> pox_assets::Result<()> {
        for (path, file) in files.iter() {
            let target = options.file_path.join(path);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, &file.data)?;
            log::debug!("Wrote {}", target.display());
        }
        Ok(())
    }
}

pub fn execute(args: ExportArgs, sources: &[Source]) -> Result<i32> {
    let options = CompileOptions::new(&args.dir, "assets", "Assets");
    pox_assets::compile(sources, &DirectoryGenerator, &options)?;

    eprintln!(
        "{} assets to {}",
        style("Exported").green().bold(),
        args.dir.display()
    );

    Ok(0)
}
