//! Asset source declarations.

use crate::archive::Archive;
use crate::checksum::Checksum;
use crate::error::{AssetError, Result};
use crate::retrieve::LocationKind;

/// One unit of asset acquisition
#[derive(Debug, Clone)]
pub struct Source {
    /// Destination path of a single file, or the prefix for glob matches.
    /// Ignored for archives, whose entries carry their own paths.
    pub path: String,
    /// URL, file path or glob pattern to fetch from
    pub location: String,
    pub checksum: Option<Checksum>,
    pub archive: Option<Archive>,
}

impl Source {
    pub fn new(path: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            location: location.into(),
            checksum: None,
            archive: None,
        }
    }

    pub fn with_checksum(mut self, checksum: Checksum) -> Self {
        self.checksum = Some(checksum);
        self
    }

    pub fn with_archive(mut self, archive: Archive) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn kind(&self) -> LocationKind {
        LocationKind::classify(&self.location)
    }

    /// Reject declarations that cannot be processed.
    ///
    /// Glob sources expand to several files, so a checksum or an archive
    /// declaration on them is refused rather than applied to one match.
    pub fn validate(&self) -> Result<()> {
        if self.location.is_empty() {
            return Err(self.invalid("location is empty"));
        }

        if self.kind() == LocationKind::Glob {
            if self.checksum.is_some() {
                return Err(self.invalid("glob sources cannot declare a checksum"));
            }
            if self.archive.is_some() {
                return Err(self.invalid("glob sources cannot declare an archive"));
            }
        }

        // Archive entries carry their own paths and glob matches may sit at the root
        if self.archive.is_none()
            && self.kind() != LocationKind::Glob
            && self.path.trim_matches('/').is_empty()
        {
            return Err(self.invalid("path is empty"));
        }

        Ok(())
    }

    fn invalid(&self, reason: &str) -> AssetError {
        AssetError::InvalidSource {
            location: self.location.clone(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveFormat;
    use crate::checksum::ChecksumAlgorithm;

    #[test]
    fn test_validate_plain_file() {
        assert!(Source::new("out.txt", "assets/out.txt").validate().is_ok());
    }

    #[test]
    fn test_validate_glob_with_checksum() {
        let source = Source::new("static", "assets/*.css")
            .with_checksum(Checksum::new(ChecksumAlgorithm::Md5, "00"));

        let err = source.validate().unwrap_err();
        assert!(matches!(err, AssetError::InvalidSource { .. }));
        assert_eq!(err.location(), Some("assets/*.css"));
    }

    #[test]
    fn test_validate_glob_with_archive() {
        let source =
            Source::new("static", "assets/*.zip").with_archive(Archive::new(ArchiveFormat::Zip));
        assert!(matches!(source.validate(), Err(AssetError::InvalidSource { .. })));
    }

    #[test]
    fn test_validate_empty_path() {
        assert!(Source::new("", "assets/out.txt").validate().is_err());
        assert!(Source::new("/", "assets/out.txt").validate().is_err());
    }

    #[test]
    fn test_validate_glob_without_path() {
        assert!(Source::new("", "assets/t*/*.txt").validate().is_ok());
        assert!(Source::new("/", "assets/*.css").validate().is_ok());
    }

    #[test]
    fn test_validate_archive_without_path() {
        let source = Source::new("", "bundle.zip").with_archive(Archive::new(ArchiveFormat::Zip));
        assert!(source.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_location() {
        assert!(Source::new("out.txt", "").validate().is_err());
    }
}
