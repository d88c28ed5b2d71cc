//! Retrieval of asset sources from HTTP URLs, local files and glob patterns.
//!
//! A location is classified before it is fetched:
//! - `http://` / `https://` prefixes are fetched with a blocking GET,
//! - anything containing `*`, `?` or `[` is expanded as a glob pattern,
//! - everything else is read as a plain file.
//!
//! # Examples
//!
//! ```no_run
//! use pox_assets::retrieve::{LocationKind, Retriever};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let retriever = Retriever::new()?;
//!
//! let retrieval = retriever.retrieve("static/*.css")?;
//! assert_eq!(retrieval.kind, LocationKind::Glob);
//! for file in &retrieval.files {
//!     println!("{} ({} bytes)", file.path, file.data.len());
//! }
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::blocking::Client;
use reqwest::header::LAST_MODIFIED;
use reqwest::StatusCode;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_USER_AGENT: &str = concat!("pox-assets/", env!("CARGO_PKG_VERSION"));

/// A single file produced by retrieval or archive extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievedFile {
    /// Path as seen at the origin (URL, filesystem path, glob-relative path
    /// or archive entry path)
    pub path: String,
    pub data: Vec<u8>,
    pub mod_time: DateTime<Utc>,
}

impl RetrievedFile {
    pub fn new(path: impl Into<String>, data: Vec<u8>, mod_time: DateTime<Utc>) -> Self {
        Self {
            path: path.into(),
            data,
            mod_time,
        }
    }
}

/// How a location string is fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationKind {
    Http,
    Glob,
    File,
}

impl LocationKind {
    pub fn classify(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            LocationKind::Http
        } else if has_glob_meta(location) {
            LocationKind::Glob
        } else {
            LocationKind::File
        }
    }
}

/// Check whether a path contains glob metacharacters
pub fn has_glob_meta(path: &str) -> bool {
    path.contains(['*', '?', '['])
}

/// Files fetched for one location
#[derive(Debug, Clone)]
pub struct Retrieval {
    pub kind: LocationKind,
    pub files: Vec<RetrievedFile>,
}

#[derive(Debug, Error)]
pub enum RetrieveError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status}: {url}")]
    HttpStatus { status: u16, url: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Glob error: {0}")]
    Glob(#[from] glob::GlobError),

    #[error("No match for pattern {pattern}")]
    NoMatch { pattern: String },
}

/// Retriever configuration
#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    pub user_agent: String,
    /// Total request timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: None,
        }
    }
}

impl RetrieverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Fetches the content of asset locations
pub struct Retriever {
    client: Client,
}

impl Retriever {
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_config(RetrieverConfig::default())
    }

    pub fn with_config(config: RetrieverConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .build()?;

        Ok(Self { client })
    }

    /// Retrieve every file a location refers to
    pub fn retrieve(&self, location: &str) -> Result<Retrieval, RetrieveError> {
        let kind = LocationKind::classify(location);
        let files = match kind {
            LocationKind::Http => vec![self.retrieve_http(location)?],
            LocationKind::Glob => retrieve_glob(location)?,
            LocationKind::File => vec![retrieve_file(location)?],
        };

        Ok(Retrieval { kind, files })
    }

    fn retrieve_http(&self, url: &str) -> Result<RetrievedFile, RetrieveError> {
        let response = self.client.get(url).send()?;

        let status = response.status();
        log::debug!("HTTP {}: {}", status.as_u16(), url);
        if status != StatusCode::OK {
            return Err(RetrieveError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let mod_time = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_http_date)
            .unwrap_or_else(Utc::now);

        let data = response.bytes()?.to_vec();

        Ok(RetrievedFile::new(url, data, mod_time))
    }
}

/// Parse an HTTP-date (IMF-fixdate, RFC 850 or asctime format)
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(date) = DateTime::parse_from_rfc2822(value) {
        return Some(date.with_timezone(&Utc));
    }

    ["%A, %d-%b-%y %H:%M:%S GMT", "%a %b %e %H:%M:%S %Y"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}

fn retrieve_file(location: &str) -> Result<RetrievedFile, RetrieveError> {
    let expanded = shellexpand::tilde(location);
    let (data, mod_time) = read_file(Path::new(expanded.as_ref()))?;

    Ok(RetrievedFile::new(location, data, mod_time))
}

fn retrieve_glob(pattern: &str) -> Result<Vec<RetrievedFile>, RetrieveError> {
    let expanded = collapse_slashes(&shellexpand::tilde(pattern));
    let root = glob_root(&expanded);
    log::trace!("Glob root for {}: {}", pattern, root);

    let mut matches: Vec<PathBuf> = Vec::new();
    for entry in glob::glob(&expanded)? {
        let path = entry?;
        if path.is_file() {
            matches.push(path);
        }
    }

    if matches.is_empty() {
        return Err(RetrieveError::NoMatch {
            pattern: pattern.to_string(),
        });
    }

    matches.sort();
    log::debug!("Glob {} matched {} files", pattern, matches.len());

    matches
        .iter()
        .map(|path| {
            let (data, mod_time) = read_file(path)?;
            Ok(RetrievedFile::new(relative_to_root(path, &root), data, mod_time))
        })
        .collect()
}

/// Collapse runs of `/` so the pattern root stays a prefix of every match
fn collapse_slashes(pattern: &str) -> String {
    let mut collapsed = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if c == '/' && collapsed.ends_with('/') {
            continue;
        }
        collapsed.push(c);
    }
    collapsed
}

/// Literal directory prefix of a glob pattern, with a trailing slash.
///
/// The prefix ends before the first path segment containing a metacharacter.
fn glob_root(pattern: &str) -> String {
    let segments: Vec<&str> = pattern.split('/').collect();
    let literal = segments
        .iter()
        .take_while(|segment| !has_glob_meta(segment))
        .count();

    let mut root = segments[..literal].join("/");
    root.push('/');
    root
}

fn relative_to_root(path: &Path, root: &str) -> String {
    let path = path.to_string_lossy().replace('\\', "/");

    if let Some(relative) = path.strip_prefix(root) {
        return relative.to_string();
    }

    // glob may drop a leading "./" that the pattern spelled out
    let trimmed_root = root.trim_start_matches("./");
    let trimmed_path = path.trim_start_matches("./");
    trimmed_path
        .strip_prefix(trimmed_root)
        .unwrap_or(trimmed_path)
        .to_string()
}

/// Read a whole file and its modification time, falling back to now
fn read_file(path: &Path) -> io::Result<(Vec<u8>, DateTime<Utc>)> {
    let mut file = File::open(path)?;

    let mut data = Vec::new();
    file.read_to_end(&mut data)?;

    let mod_time = file
        .metadata()
        .and_then(|meta| meta.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());

    Ok((data, mod_time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_classify_location() {
        assert_eq!(LocationKind::classify("http://example.com/a.js"), LocationKind::Http);
        assert_eq!(LocationKind::classify("https://example.com/a.js"), LocationKind::Http);
        assert_eq!(LocationKind::classify("static/*.css"), LocationKind::Glob);
        assert_eq!(LocationKind::classify("static/file?.css"), LocationKind::Glob);
        assert_eq!(LocationKind::classify("static/t[12]/a.css"), LocationKind::Glob);
        assert_eq!(LocationKind::classify("static/app.css"), LocationKind::File);
        assert_eq!(LocationKind::classify("ftp://example.com/a.js"), LocationKind::File);
    }

    #[test]
    fn test_glob_root() {
        assert_eq!(glob_root("/tmp/x/test/t[12]/file[123].txt"), "/tmp/x/test/");
        assert_eq!(glob_root("dir/*.txt"), "dir/");
        assert_eq!(glob_root("*.txt"), "/");
    }

    #[test]
    fn test_collapse_slashes() {
        assert_eq!(collapse_slashes("/tmp//x///t*/a.txt"), "/tmp/x/t*/a.txt");
        assert_eq!(glob_root(&collapse_slashes("a//b/*")), "a/b/");
        assert_eq!(collapse_slashes("dir/*.txt"), "dir/*.txt");
    }

    #[test]
    fn test_relative_to_root() {
        assert_eq!(
            relative_to_root(Path::new("/tmp/x/test/t1/file1.txt"), "/tmp/x/test/"),
            "t1/file1.txt"
        );
        assert_eq!(relative_to_root(Path::new("dir/a.txt"), "./dir/"), "a.txt");
        assert_eq!(relative_to_root(Path::new("a.txt"), "/"), "a.txt");
    }

    #[test]
    fn test_parse_http_date() {
        let expected = Utc.with_ymd_and_hms(1994, 11, 6, 8, 49, 37).unwrap();
        assert_eq!(parse_http_date("Sun, 06 Nov 1994 08:49:37 GMT"), Some(expected));
        assert_eq!(parse_http_date("Sunday, 06-Nov-94 08:49:37 GMT"), Some(expected));
        assert_eq!(parse_http_date("yesterday"), None);
        assert_eq!(parse_http_date(""), None);
    }

    #[test]
    fn test_retrieve_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("asset.txt");
        fs::write(&path, b"Asset content").unwrap();
        let location = path.to_string_lossy().to_string();

        let retrieval = Retriever::new().unwrap().retrieve(&location).unwrap();

        assert_eq!(retrieval.kind, LocationKind::File);
        assert_eq!(retrieval.files.len(), 1);
        assert_eq!(retrieval.files[0].path, location);
        assert_eq!(retrieval.files[0].data, b"Asset content");

        let modified = DateTime::<Utc>::from(fs::metadata(&path).unwrap().modified().unwrap());
        assert_eq!(retrieval.files[0].mod_time, modified);
    }

    #[test]
    fn test_retrieve_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let location = temp_dir.path().join("missing.txt").to_string_lossy().to_string();

        let result = Retriever::new().unwrap().retrieve(&location);
        assert!(matches!(result, Err(RetrieveError::Io(_))));
    }

    #[test]
    fn test_retrieve_glob() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().join("test");
        fs::create_dir_all(base.join("t1")).unwrap();
        fs::create_dir_all(base.join("t2")).unwrap();
        fs::write(base.join("t1/file1.txt"), b"File 1").unwrap();
        fs::write(base.join("t1/file2.txt"), b"File 2").unwrap();
        fs::write(base.join("t2/file3.txt"), b"File 3").unwrap();
        fs::write(base.join("t2/file4.txt"), b"File 4").unwrap();

        let pattern = format!("{}/t[12]/file[123].txt", base.to_string_lossy().replace('\\', "/"));
        let retrieval = Retriever::new().unwrap().retrieve(&pattern).unwrap();

        assert_eq!(retrieval.kind, LocationKind::Glob);
        let paths: Vec<_> = retrieval.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["t1/file1.txt", "t1/file2.txt", "t2/file3.txt"]);
        assert_eq!(retrieval.files[2].data, b"File 3");
    }

    #[test]
    fn test_retrieve_glob_with_doubled_slashes() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("a/b")).unwrap();
        fs::write(temp_dir.path().join("a/b/x.txt"), b"x").unwrap();
        fs::write(temp_dir.path().join("a/b/y.txt"), b"y").unwrap();

        let base = temp_dir.path().to_string_lossy().replace('\\', "/");
        let pattern = format!("{}/a//b/*.txt", base);
        let retrieval = Retriever::new().unwrap().retrieve(&pattern).unwrap();

        let paths: Vec<_> = retrieval.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["x.txt", "y.txt"]);
    }

    #[test]
    fn test_retrieve_glob_skips_directories() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("sub")).unwrap();
        fs::write(temp_dir.path().join("only.txt"), b"only").unwrap();

        let pattern = format!("{}/*", temp_dir.path().to_string_lossy().replace('\\', "/"));
        let retrieval = Retriever::new().unwrap().retrieve(&pattern).unwrap();

        assert_eq!(retrieval.files.len(), 1);
        assert_eq!(retrieval.files[0].path, "only.txt");
    }

    #[test]
    fn test_retrieve_glob_no_match() {
        let temp_dir = TempDir::new().unwrap();
        let pattern = format!("{}/*.none", temp_dir.path().to_string_lossy().replace('\\', "/"));

        let result = Retriever::new().unwrap().retrieve(&pattern);
        assert!(matches!(result, Err(RetrieveError::NoMatch { .. })));
    }
}
