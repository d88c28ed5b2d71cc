//! Read-only virtual filesystem holding the merged assets.
//!
//! Files are keyed by their final path using forward slashes and no leading
//! slash. Directories are not stored; they exist implicitly for every prefix
//! of a file path and can be opened and listed like real directories.
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use pox_assets::vfs::VirtualFileSet;
//! use std::io::Read;
//!
//! let mut fs = VirtualFileSet::new();
//! fs.insert("static/app.js", b"console.log(1)".to_vec(), Utc::now());
//!
//! let mut file = fs.open("/static/app.js").unwrap();
//! let mut content = String::new();
//! file.read_to_string(&mut content).unwrap();
//! assert_eq!(content, "console.log(1)");
//!
//! let root = fs.read_dir("/").unwrap();
//! assert_eq!(root[0].name, "static");
//! assert!(root[0].is_dir);
//! ```

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::io::{self, Cursor, Read, Seek, SeekFrom};

/// Content and timestamp of one stored file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualFile {
    pub data: Vec<u8>,
    pub mod_time: DateTime<Utc>,
}

/// Metadata of a file or synthesised directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    /// Last path segment, empty for the root
    pub name: String,
    /// Normalised full path, empty for the root
    pub path: String,
    pub len: u64,
    pub mod_time: DateTime<Utc>,
    pub is_dir: bool,
}

/// An opened file or directory
#[derive(Debug)]
pub struct OpenFile<'a> {
    cursor: Cursor<&'a [u8]>,
    stat: FileStat,
}

impl OpenFile<'_> {
    pub fn stat(&self) -> &FileStat {
        &self.stat
    }
}

impl Read for OpenFile<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl Seek for OpenFile<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.cursor.seek(pos)
    }
}

/// Mapping from final path to file content, last write wins
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VirtualFileSet {
    files: BTreeMap<String, VirtualFile>,
}

/// Normalise a path to the form used as key: forward slashes, no leading
/// or trailing slash.
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/").trim_matches('/').to_string()
}

impl VirtualFileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a file, returning the entry it replaced
    pub fn insert(
        &mut self,
        path: &str,
        data: Vec<u8>,
        mod_time: DateTime<Utc>,
    ) -> Option<VirtualFile> {
        self.files
            .insert(normalize_path(path), VirtualFile { data, mod_time })
    }

    pub fn get(&self, path: &str) -> Option<&VirtualFile> {
        self.files.get(&normalize_path(path))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(&normalize_path(path))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterate over stored files in path order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &VirtualFile)> {
        self.files.iter().map(|(path, file)| (path.as_str(), file))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Open a file or directory for reading.
    ///
    /// Directories read as empty; use [`VirtualFileSet::read_dir`] to list them.
    pub fn open(&self, path: &str) -> io::Result<OpenFile<'_>> {
        let path = normalize_path(path);

        if let Some(file) = self.files.get(&path) {
            let stat = FileStat {
                name: base_name(&path).to_string(),
                len: file.data.len() as u64,
                mod_time: file.mod_time,
                is_dir: false,
                path,
            };
            return Ok(OpenFile {
                cursor: Cursor::new(file.data.as_slice()),
                stat,
            });
        }

        match self.dir_stat(&path) {
            Some(stat) => Ok(OpenFile {
                cursor: Cursor::new(&[] as &[u8]),
                stat,
            }),
            None => Err(not_found(&path)),
        }
    }

    /// Metadata of a path without opening it
    pub fn stat(&self, path: &str) -> io::Result<FileStat> {
        self.open(path).map(|file| file.stat)
    }

    /// List the immediate children of a directory, sorted by name
    pub fn read_dir(&self, path: &str) -> io::Result<Vec<FileStat>> {
        let dir = normalize_path(path);

        if self.files.contains_key(&dir) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a directory: {}", dir),
            ));
        }

        let prefix = dir_prefix(&dir);
        let mut children: BTreeMap<String, FileStat> = BTreeMap::new();

        for (key, file) in self.descendants(&prefix) {
            let rest = &key[prefix.len()..];
            match rest.split_once('/') {
                Some((name, _)) => {
                    let child = children.entry(name.to_string()).or_insert_with(|| FileStat {
                        name: name.to_string(),
                        path: format!("{}{}", prefix, name),
                        len: 0,
                        mod_time: file.mod_time,
                        is_dir: true,
                    });
                    child.mod_time = child.mod_time.max(file.mod_time);
                }
                None => {
                    children.insert(
                        rest.to_string(),
                        FileStat {
                            name: rest.to_string(),
                            path: key.clone(),
                            len: file.data.len() as u64,
                            mod_time: file.mod_time,
                            is_dir: false,
                        },
                    );
                }
            }
        }

        if children.is_empty() && !dir.is_empty() {
            return Err(not_found(&dir));
        }

        Ok(children.into_values().collect())
    }

    fn descendants<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a VirtualFile)> {
        self.files
            .range(prefix.to_string()..)
            .take_while(move |(key, _)| key.starts_with(prefix))
    }

    fn dir_stat(&self, dir: &str) -> Option<FileStat> {
        let prefix = dir_prefix(dir);
        let mod_time = self.descendants(&prefix).map(|(_, file)| file.mod_time).max();

        if mod_time.is_none() && !dir.is_empty() {
            return None;
        }

        Some(FileStat {
            name: base_name(dir).to_string(),
            path: dir.to_string(),
            len: 0,
            mod_time: mod_time.unwrap_or_default(),
            is_dir: true,
        })
    }
}

fn dir_prefix(dir: &str) -> String {
    if dir.is_empty() {
        String::new()
    } else {
        format!("{}/", dir)
    }
}

fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn not_found(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("file not found: {}", path))
}
