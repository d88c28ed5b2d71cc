pub mod archive;
pub mod checksum;
pub mod compile;
pub mod error;
pub mod manifest;
pub mod mapper;
pub mod pipeline;
pub mod retrieve;
pub mod source;
pub mod vfs;

pub use archive::{Archive, ArchiveError, ArchiveExtractor, ArchiveFormat};
pub use checksum::{Checksum, ChecksumAlgorithm};
pub use compile::{compile, compile_with, CompileOptions, Generator};
pub use error::{AssetError, Result};
pub use manifest::Manifest;
pub use mapper::PathMapper;
pub use pipeline::{retrieve, Pipeline};
pub use retrieve::{LocationKind, RetrieveError, RetrievedFile, Retriever, RetrieverConfig};
pub use source::Source;
pub use vfs::{FileStat, VirtualFile, VirtualFileSet};
