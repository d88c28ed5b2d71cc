//! Ingestion pipeline: retrieve, verify and unpack sources into one file set.

use crate::archive::ArchiveExtractor;
use crate::checksum::verify_checksum;
use crate::error::{AssetError, Result};
use crate::retrieve::{LocationKind, RetrievedFile, Retriever};
use crate::source::Source;
use crate::vfs::VirtualFileSet;

/// Processes asset sources in declaration order.
///
/// Later sources overwrite earlier ones at colliding paths, as do later
/// entries of the same archive. Any failure aborts the whole run.
pub struct Pipeline {
    retriever: Retriever,
}

impl Pipeline {
    pub fn new() -> Result<Self> {
        Ok(Self::with_retriever(Retriever::new()?))
    }

    pub fn with_retriever(retriever: Retriever) -> Self {
        Self { retriever }
    }

    /// Run every source and return the merged file set
    pub fn run(&self, sources: &[Source]) -> Result<VirtualFileSet> {
        for source in sources {
            source.validate()?;
        }

        let mut files = VirtualFileSet::new();

        for (i, source) in sources.iter().enumerate() {
            log::info!(
                "Processing asset source ({}/{}): {}",
                i + 1,
                sources.len(),
                source.location
            );
            self.process(source, &mut files)?;
        }

        log::info!("Collected {} assets from {} sources", files.len(), sources.len());
        Ok(files)
    }

    fn process(&self, source: &Source, files: &mut VirtualFileSet) -> Result<()> {
        let retrieval = self
            .retriever
            .retrieve(&source.location)
            .map_err(|e| AssetError::Retrieve {
                location: source.location.clone(),
                source: e,
            })?;

        // Several matches are stored below the source path; checksum and
        // archive declarations on globs were rejected by validation.
        if retrieval.files.len() > 1 {
            let prefix = source.path.trim_end_matches('/');
            for file in retrieval.files {
                let path = format!("{}/{}", prefix, file.path);
                store(files, &path, file);
            }
            return Ok(());
        }

        let kind = retrieval.kind;
        let Some(file) = retrieval.files.into_iter().next() else {
            return Ok(());
        };

        verify_checksum(source.checksum.as_ref(), &file.data).map_err(|e| {
            AssetError::ChecksumMismatch {
                location: source.location.clone(),
                expected: e.expected,
                actual: e.actual,
            }
        })?;

        let Some(archive) = &source.archive else {
            // A lone glob match with no destination keeps its relative path
            let path = if kind == LocationKind::Glob && source.path.trim_matches('/').is_empty() {
                file.path.clone()
            } else {
                source.path.clone()
            };
            store(files, &path, file);
            return Ok(());
        };

        let entries = ArchiveExtractor::extract(archive, &file.data).map_err(|e| {
            AssetError::Archive {
                location: source.location.clone(),
                source: e,
            }
        })?;

        log::debug!(
            "Extracted {} entries from {} archive {}",
            entries.len(),
            archive.format,
            source.location
        );

        for entry in entries {
            let path = entry.path.clone();
            store(files, &path, entry);
        }

        Ok(())
    }
}

fn store(files: &mut VirtualFileSet, path: &str, file: RetrievedFile) {
    if files.insert(path, file.data, file.mod_time).is_some() {
        log::debug!("Replacing asset: {}", path);
    } else {
        log::debug!("Created asset: {}", path);
    }
}

/// Retrieve and process sources with a default retriever
pub fn retrieve(sources: &[Source]) -> Result<VirtualFileSet> {
    Pipeline::new()?.run(sources)
}
