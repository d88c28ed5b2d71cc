//! Archive extraction (zip, tar.gz) into in-memory files.

use chrono::{DateTime, NaiveDate, Utc};
use flate2::read::GzDecoder;
use std::fmt;
use std::io::{self, Cursor, Read};
use std::str::FromStr;
use thiserror::Error;
use zip::extra_fields::ExtraField;

use crate::mapper::PathMapper;
use crate::retrieve::RetrievedFile;

/// Supported archive types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
}

impl ArchiveFormat {
    /// Canonical tag used in manifests
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::TarGz => "tar.gz",
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a tag does not name a supported archive format
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown archive format '{0}'")]
pub struct UnknownArchiveFormat(pub String);

impl FromStr for ArchiveFormat {
    type Err = UnknownArchiveFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "zip" => Ok(ArchiveFormat::Zip),
            "tar.gz" | "tgz" | "targz" | "tar+gzip" => Ok(ArchiveFormat::TarGz),
            _ => Err(UnknownArchiveFormat(s.to_string())),
        }
    }
}

/// Archive declaration of a source: how to unpack it and how to name entries
#[derive(Debug, Clone)]
pub struct Archive {
    pub format: ArchiveFormat,
    pub mapper: PathMapper,
}

impl Archive {
    pub fn new(format: ArchiveFormat) -> Self {
        Self {
            format,
            mapper: PathMapper::default(),
        }
    }

    pub fn with_mapper(mut self, mapper: PathMapper) -> Self {
        self.mapper = mapper;
        self
    }
}

/// Errors raised while decoding archive bytes
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("archive read error: {0}")]
    Io(#[from] io::Error),
}

/// Archive extractor
pub struct ArchiveExtractor;

impl ArchiveExtractor {
    /// Extract every regular file of an archive held in memory.
    ///
    /// Entries are returned in archive order with paths rewritten by the
    /// archive's mapper. Directories and entries the mapper drops are skipped.
    pub fn extract(archive: &Archive, data: &[u8]) -> Result<Vec<RetrievedFile>, ArchiveError> {
        match archive.format {
            ArchiveFormat::Zip => Self::extract_zip(data, &archive.mapper),
            ArchiveFormat::TarGz => Self::extract_tar_gz(data, &archive.mapper),
        }
    }

    /// Extract a zip archive
    fn extract_zip(data: &[u8], mapper: &PathMapper) -> Result<Vec<RetrievedFile>, ArchiveError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(data))?;
        let mut files = Vec::new();

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;

            if file.is_dir() || file.unix_mode().is_some_and(is_dir_mode) {
                continue;
            }

            let Some(path) = mapper.map(file.name()) else {
                log::trace!("Skipping archive entry: {}", file.name());
                continue;
            };

            let extended = file.extra_data_fields().find_map(|field| match field {
                ExtraField::ExtendedTimestamp(ts) => ts.mod_time(),
                _ => None,
            });
            let mod_time = zip_mod_time(extended, file.last_modified());
            let mut content = Vec::new();
            file.read_to_end(&mut content)?;

            files.push(RetrievedFile::new(path, content, mod_time));
        }

        Ok(files)
    }

    /// Extract a gzipped tar archive
    fn extract_tar_gz(
        data: &[u8],
        mapper: &PathMapper,
    ) -> Result<Vec<RetrievedFile>, ArchiveError> {
        let decoder = GzDecoder::new(data);
        let mut archive = tar::Archive::new(decoder);
        let mut files = Vec::new();

        for entry in archive.entries()? {
            let mut entry = entry?;

            if !entry.header().entry_type().is_file() {
                continue;
            }

            let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
            let Some(path) = mapper.map(&name) else {
                log::trace!("Skipping archive entry: {}", name);
                continue;
            };

            let size = entry.size();
            let mut content = Vec::new();
            entry.read_to_end(&mut content)?;

            // The entry reader stops quietly at the end of a short stream
            if (content.len() as u64) < size {
                return Err(ArchiveError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "unexpected end of data in entry {} ({} of {} bytes)",
                        name,
                        content.len(),
                        size
                    ),
                )));
            }

            let mod_time = entry
                .header()
                .mtime()
                .ok()
                .and_then(|secs| i64::try_from(secs).ok())
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .unwrap_or_else(Utc::now);

            files.push(RetrievedFile::new(path, content, mod_time));
        }

        Ok(files)
    }
}

fn is_dir_mode(mode: u32) -> bool {
    mode & 0o170000 == 0o040000
}

/// Modification time of a zip entry.
///
/// Prefers the extended timestamp field (UTC seconds). The MS-DOS date and
/// time carry no zone and are read as UTC.
fn zip_mod_time(extended: Option<u32>, dos: Option<zip::DateTime>) -> DateTime<Utc> {
    if let Some(time) = extended.and_then(|secs| DateTime::from_timestamp(i64::from(secs), 0)) {
        return time;
    }

    dos.and_then(|dt| {
        NaiveDate::from_ymd_opt(i32::from(dt.year()), u32::from(dt.month()), u32::from(dt.day()))?
            .and_hms_opt(u32::from(dt.hour()), u32::from(dt.minute()), u32::from(dt.second()))
    })
    .map(|naive| naive.and_utc())
    .unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn zip_options(year: u16, month: u8, day: u8) -> SimpleFileOptions {
        let time = zip::DateTime::from_date_and_time(year, month, day, 7, 6, 40).unwrap();
        SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored)
            .last_modified_time(time)
    }

    fn build_zip() -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));

        zip.start_file("a.txt", zip_options(2011, 3, 13)).unwrap();
        zip.write_all(b"X").unwrap();
        zip.add_directory("dir/", zip_options(2012, 1, 1)).unwrap();
        zip.start_file("b.txt", zip_options(2014, 5, 13)).unwrap();
        zip.write_all(b"Y").unwrap();

        zip.finish().unwrap().into_inner()
    }

    fn tar_header(size: u64, mtime: u64, entry_type: tar::EntryType) -> tar::Header {
        let mut header = tar::Header::new_gnu();
        header.set_size(size);
        header.set_mtime(mtime);
        header.set_mode(0o644);
        header.set_entry_type(entry_type);
        header
    }

    fn build_tar() -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());

        let mut dir = tar_header(0, 1_300_000_000, tar::EntryType::Directory);
        builder.append_data(&mut dir, "test/", io::empty()).unwrap();

        let mut file1 = tar_header(6, 1_300_000_000, tar::EntryType::Regular);
        builder.append_data(&mut file1, "test/file1.txt", &b"File 1"[..]).unwrap();

        let mut link = tar_header(0, 1_300_000_000, tar::EntryType::Symlink);
        builder
            .append_link(&mut link, "test/link.txt", "file1.txt")
            .unwrap();

        let mut file2 = tar_header(6, 1_400_000_000, tar::EntryType::Regular);
        builder.append_data(&mut file2, "test/file2.txt", &b"File 2"[..]).unwrap();

        builder.into_inner().unwrap()
    }

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_archive_format_from_str() {
        assert_eq!("zip".parse::<ArchiveFormat>(), Ok(ArchiveFormat::Zip));
        assert_eq!("ZIP".parse::<ArchiveFormat>(), Ok(ArchiveFormat::Zip));
        assert_eq!("tar.gz".parse::<ArchiveFormat>(), Ok(ArchiveFormat::TarGz));
        assert_eq!("tgz".parse::<ArchiveFormat>(), Ok(ArchiveFormat::TarGz));
        assert_eq!(
            "rar".parse::<ArchiveFormat>(),
            Err(UnknownArchiveFormat("rar".to_string()))
        );
    }

    #[test]
    fn test_extract_zip_skips_directories() {
        let archive = Archive::new(ArchiveFormat::Zip);
        let files = ArchiveExtractor::extract(&archive, &build_zip()).unwrap();

        let paths: Vec<_> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["a.txt", "b.txt"]);
        assert_eq!(files[0].data, b"X");
        assert_eq!(files[1].data, b"Y");
        assert_eq!(files[0].mod_time, Utc.with_ymd_and_hms(2011, 3, 13, 7, 6, 40).unwrap());
        assert_eq!(files[1].mod_time, Utc.with_ymd_and_hms(2014, 5, 13, 7, 6, 40).unwrap());
    }

    #[test]
    fn test_zip_mod_time_prefers_extended_timestamp() {
        let dos = zip::DateTime::from_date_and_time(2011, 3, 13, 7, 6, 40).unwrap();

        assert_eq!(
            zip_mod_time(Some(1_500_000_000), Some(dos)),
            Utc.timestamp_opt(1_500_000_000, 0).unwrap()
        );
        assert_eq!(
            zip_mod_time(None, Some(dos)),
            Utc.with_ymd_and_hms(2011, 3, 13, 7, 6, 40).unwrap()
        );
    }

    #[test]
    fn test_extract_zip_with_mapper() {
        let archive = Archive::new(ArchiveFormat::Zip)
            .with_mapper(PathMapper::regex(r"^a\.(txt)$", "renamed.$1").unwrap());
        let files = ArchiveExtractor::extract(&archive, &build_zip()).unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "renamed.txt");
        assert_eq!(files[0].data, b"X");
    }

    #[test]
    fn test_extract_zip_everything_filtered() {
        let archive =
            Archive::new(ArchiveFormat::Zip).with_mapper(PathMapper::custom(|_| String::new()));
        let files = ArchiveExtractor::extract(&archive, &build_zip()).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_extract_zip_malformed() {
        let archive = Archive::new(ArchiveFormat::Zip);
        let result = ArchiveExtractor::extract(&archive, b"not a zip file");
        assert!(matches!(result, Err(ArchiveError::Zip(_))));
    }

    #[test]
    fn test_extract_tar_gz_regular_files_only() {
        let data = gzip(&build_tar());
        let files = ArchiveExtractor::extract(&Archive::new(ArchiveFormat::TarGz), &data).unwrap();

        let paths: Vec<_> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["test/file1.txt", "test/file2.txt"]);
        assert_eq!(files[0].data, b"File 1");
        assert_eq!(files[1].data, b"File 2");
        assert_eq!(files[0].mod_time, Utc.timestamp_opt(1_300_000_000, 0).unwrap());
        assert_eq!(files[1].mod_time, Utc.timestamp_opt(1_400_000_000, 0).unwrap());
    }

    #[test]
    fn test_extract_tar_gz_with_mapper() {
        let archive = Archive::new(ArchiveFormat::TarGz)
            .with_mapper(PathMapper::regex(r"^test/file2\.txt$", "file2.txt").unwrap());
        let files = ArchiveExtractor::extract(&archive, &gzip(&build_tar())).unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "file2.txt");
        assert_eq!(files[0].data, b"File 2");
    }

    #[test]
    fn test_extract_tar_gz_truncated_entry() {
        let mut builder = tar::Builder::new(Vec::new());
        let mut header = tar_header(10, 1_300_000_000, tar::EntryType::Regular);
        builder.append_data(&mut header, "ten.txt", &b"0123456789"[..]).unwrap();
        let mut tar = builder.into_inner().unwrap();

        // Keep the header block and half of the content
        tar.truncate(512 + 5);

        let result = ArchiveExtractor::extract(&Archive::new(ArchiveFormat::TarGz), &gzip(&tar));
        match result {
            Err(ArchiveError::Io(err)) => assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("expected unexpected end of data, got {:?}", other.map(|f| f.len())),
        }
    }

    #[test]
    fn test_extract_tar_gz_truncated_stream() {
        let data = gzip(&build_tar());
        let truncated = &data[..data.len() / 2];

        let result = ArchiveExtractor::extract(&Archive::new(ArchiveFormat::TarGz), truncated);
        assert!(result.is_err());
    }

    #[test]
    fn test_extract_tar_gz_not_gzip() {
        let result = ArchiveExtractor::extract(&Archive::new(ArchiveFormat::TarGz), b"plain bytes");
        assert!(matches!(result, Err(ArchiveError::Io(_))));
    }
}
