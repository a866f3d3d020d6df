//! Persistent record types for the backup repository
//!
//! Defines the content hash used to key objects plus the three on-disk
//! record shapes: snapshot records, directory manifests, and directory
//! entries. Field names and ordering are the on-disk format and must
//! not change.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A SHA-256 content hash (32 bytes)
///
/// Rendered as 64 lowercase hex characters; the rendering is the
/// object's filename under `hashes/`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Create a ContentHash from raw digest bytes
    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw digest bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self)
    }
}

impl FromStr for ContentHash {
    type Err = ContentHashParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.len() != 64 {
            return Err(ContentHashParseError::InvalidLength(s.len()));
        }
        let mut bytes = [0u8; 32];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            let hex_str =
                std::str::from_utf8(chunk).map_err(|_| ContentHashParseError::InvalidHex)?;
            bytes[i] =
                u8::from_str_radix(hex_str, 16).map_err(|_| ContentHashParseError::InvalidHex)?;
        }
        Ok(Self(bytes))
    }
}

/// Error parsing a ContentHash from a hex string
#[derive(Debug, Clone)]
pub enum ContentHashParseError {
    /// Hex string was not 64 characters
    InvalidLength(usize),
    /// Hex string contained invalid characters
    InvalidHex,
}

impl fmt::Display for ContentHashParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLength(len) => {
                write!(f, "expected 64 hex characters, got {len}")
            }
            Self::InvalidHex => write!(f, "invalid hex character"),
        }
    }
}

impl std::error::Error for ContentHashParseError {}

impl Serialize for ContentHash {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// One child of a directory at snapshot time
///
/// `hash` points at a manifest when `isdir` is set, at a blob
/// otherwise. `created` mirrors `modified` because the portable stat
/// surface exposes no birth time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirEntry {
    /// Final path component
    pub name: String,
    /// Content hash of the child's blob or manifest
    pub hash: ContentHash,
    /// Whether the child is a directory
    #[serde(rename = "isdir")]
    pub is_dir: bool,
    /// Creation timestamp (mtime, see module docs)
    pub created: DateTime<Local>,
    /// Modification timestamp
    pub modified: DateTime<Local>,
}

/// The contents of one directory at one point in time
///
/// Children are kept sorted ascending by name; the sort happens before
/// hashing, never relying on OS enumeration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirManifest {
    pub children: Vec<DirEntry>,
}

/// The root record of a backup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Human-readable backup name
    pub name: String,
    /// Wall-clock creation time
    pub date: DateTime<Local>,
    /// Top-level manifest, held inline
    pub content: DirManifest,
    /// `<name>.<unix-seconds>`, the record's filename under `backups/`
    pub id: String,
}
