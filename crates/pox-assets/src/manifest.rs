//! Asset manifest (assets.toml) loading.
//!
//! A manifest lists sources in the order they are processed:
//!
//! ```toml
//! [[source]]
//! path = "static/app.js"
//! location = "https://example.com/app.js"
//! checksum = { algorithm = "sha256", value = "..." }
//!
//! [[source]]
//! location = "https://example.com/bundle.tar.gz"
//! archive = { format = "tar.gz", pattern = "^dist/(.*)$", replacement = "static/$1" }
//! ```
//!
//! Relative file and glob locations are resolved against the directory the
//! manifest was loaded from.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::archive::{Archive, ArchiveFormat};
use crate::checksum::Checksum;
use crate::error::{AssetError, Result};
use crate::mapper::PathMapper;
use crate::retrieve::LocationKind;
use crate::source::Source;

/// The manifest file structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default, rename = "source", alias = "sources")]
    pub sources: Vec<SourceEntry>,

    /// Directory relative locations are resolved against
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

/// A declared source as written in the manifest
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceEntry {
    #[serde(default)]
    pub path: String,
    pub location: String,
    #[serde(default)]
    pub checksum: Option<ChecksumEntry>,
    #[serde(default)]
    pub archive: Option<ArchiveEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChecksumEntry {
    pub algorithm: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArchiveEntry {
    pub format: String,
    /// Entries not matching the pattern are dropped
    #[serde(default)]
    pub pattern: Option<String>,
    /// Rewrite template for matching entries, defaults to `$0`
    #[serde(default)]
    pub replacement: Option<String>,
}

impl Manifest {
    pub const FILE_NAME: &'static str = "assets.toml";

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load a manifest file; `.json` files are parsed as JSON, anything
    /// else as TOML.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let mut manifest = if is_json {
            Self::from_json_str(&content)?
        } else {
            Self::from_toml_str(&content)?
        };

        manifest.base_dir = path.parent().map(Path::to_path_buf);
        log::debug!(
            "Loaded manifest {} with {} sources",
            path.display(),
            manifest.sources.len()
        );
        Ok(manifest)
    }

    /// Find assets.toml searching upward from the given directory
    pub fn discover(start_dir: &Path) -> Option<PathBuf> {
        let mut current = start_dir.to_path_buf();

        loop {
            let manifest_path = current.join(Self::FILE_NAME);
            if manifest_path.is_file() {
                return Some(manifest_path);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Discover and load the manifest closest to the given directory
    pub fn load(start_dir: &Path) -> Result<Self> {
        match Self::discover(start_dir) {
            Some(path) => Self::from_path(&path),
            None => Err(AssetError::Manifest(format!(
                "no {} found in {} or any parent directory",
                Self::FILE_NAME,
                start_dir.display()
            ))),
        }
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    /// Resolve every entry into a source, in declaration order.
    ///
    /// Unknown checksum algorithms and archive formats are reported here,
    /// before anything is retrieved.
    pub fn sources(&self) -> Result<Vec<Source>> {
        self.sources
            .iter()
            .map(|entry| entry.to_source(self.base_dir.as_deref()))
            .collect()
    }
}

impl SourceEntry {
    pub fn to_source(&self, base_dir: Option<&Path>) -> Result<Source> {
        let location = resolve_location(&self.location, base_dir);
        let mut source = Source::new(self.path.clone(), location.clone());

        if let Some(checksum) = &self.checksum {
            let checksum = Checksum::parse(&checksum.algorithm, checksum.value.clone())
                .map_err(|e| AssetError::UnknownAlgorithm {
                    location: location.clone(),
                    algorithm: e.0,
                })?;
            source = source.with_checksum(checksum);
        }

        if let Some(archive) = &self.archive {
            source = source.with_archive(archive.to_archive(&location)?);
        }

        Ok(source)
    }
}

impl ArchiveEntry {
    fn to_archive(&self, location: &str) -> Result<Archive> {
        let format = self.format.parse::<ArchiveFormat>().map_err(|e| {
            AssetError::UnknownArchiveFormat {
                location: location.to_string(),
                format: e.0,
            }
        })?;

        let mapper = match (&self.pattern, &self.replacement) {
            (Some(pattern), replacement) => {
                PathMapper::regex(pattern, replacement.as_deref().unwrap_or("$0")).map_err(|e| {
                    AssetError::InvalidPattern {
                        location: location.to_string(),
                        source: e,
                    }
                })?
            }
            (None, Some(_)) => {
                return Err(AssetError::InvalidSource {
                    location: location.to_string(),
                    reason: "archive replacement requires a pattern".to_string(),
                });
            }
            (None, None) => PathMapper::identity(),
        };

        Ok(Archive::new(format).with_mapper(mapper))
    }
}

/// Make relative filesystem locations relative to the manifest directory
fn resolve_location(location: &str, base_dir: Option<&Path>) -> String {
    let Some(base_dir) = base_dir else {
        return location.to_string();
    };

    if LocationKind::classify(location) == LocationKind::Http
        || location.is_empty()
        || location.starts_with('~')
        || Path::new(location).is_absolute()
    {
        return location.to_string();
    }

    let base = base_dir.to_string_lossy().replace('\\', "/");
    if base.is_empty() {
        return location.to_string();
    }

    format!("{}/{}", base.trim_end_matches('/'), location.trim_start_matches("./"))
}
