//! Checksum verification for retrieved asset content.

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Supported checksum algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChecksumAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl ChecksumAlgorithm {
    /// Canonical lowercase tag used in manifests
    pub fn as_str(&self) -> &'static str {
        match self {
            ChecksumAlgorithm::Md5 => "md5",
            ChecksumAlgorithm::Sha1 => "sha1",
            ChecksumAlgorithm::Sha256 => "sha256",
            ChecksumAlgorithm::Sha512 => "sha512",
        }
    }

    /// Compute the lowercase hex digest of `data`
    pub fn digest_hex(&self, data: &[u8]) -> String {
        match self {
            ChecksumAlgorithm::Md5 => format!("{:x}", Md5::digest(data)),
            ChecksumAlgorithm::Sha1 => format!("{:x}", Sha1::digest(data)),
            ChecksumAlgorithm::Sha256 => format!("{:x}", Sha256::digest(data)),
            ChecksumAlgorithm::Sha512 => format!("{:x}", Sha512::digest(data)),
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a tag does not name a supported algorithm
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown checksum algorithm '{0}'")]
pub struct UnknownAlgorithm(pub String);

impl FromStr for ChecksumAlgorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(ChecksumAlgorithm::Md5),
            "sha1" | "sha-1" => Ok(ChecksumAlgorithm::Sha1),
            "sha256" | "sha-256" => Ok(ChecksumAlgorithm::Sha256),
            "sha512" | "sha-512" => Ok(ChecksumAlgorithm::Sha512),
            _ => Err(UnknownAlgorithm(s.to_string())),
        }
    }
}

/// Expected digest of a source's content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checksum {
    pub algorithm: ChecksumAlgorithm,
    /// Lowercase hex encoded digest
    pub value: String,
}

impl Checksum {
    pub fn new(algorithm: ChecksumAlgorithm, value: impl Into<String>) -> Self {
        Self {
            algorithm,
            value: value.into(),
        }
    }

    /// Build a checksum from a textual algorithm tag
    pub fn parse(algorithm: &str, value: impl Into<String>) -> Result<Self, UnknownAlgorithm> {
        Ok(Self::new(algorithm.parse()?, value))
    }
}

/// Computed digest differs from the declared one
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("checksum mismatch (expected {expected}, got {actual})")]
pub struct ChecksumMismatch {
    pub expected: String,
    pub actual: String,
}

/// Verify `data` against an optional checksum.
///
/// A missing checksum always succeeds. The comparison is an exact match on
/// the lowercase hex encoding of the digest.
pub fn verify_checksum(checksum: Option<&Checksum>, data: &[u8]) -> Result<(), ChecksumMismatch> {
    let Some(checksum) = checksum else {
        return Ok(());
    };

    let actual = checksum.algorithm.digest_hex(data);
    if actual != checksum.value {
        return Err(ChecksumMismatch {
            expected: checksum.value.clone(),
            actual,
        });
    }

    Ok(())
}
