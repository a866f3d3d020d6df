//! Snapshot builder: bottom-up capture of source trees
//!
//! Walks each source path depth-first in sorted-name order, storing
//! blobs and manifests as it unwinds so every directory hash already
//! incorporates the hashes of its descendants. An unchanged subtree
//! therefore deduplicates as a single manifest object no matter how
//! deep it is.

use crate::error::{HbackError, Result};
use crate::hash;
use crate::repo::Repository;
use crate::types::{ContentHash, DirEntry, DirManifest, Snapshot};
use chrono::{DateTime, Local};
use std::fs;
use std::io::{self, Seek, SeekFrom};
use std::path::Path;
use tracing::debug;

/// Builds one snapshot into a repository.
///
/// Owns the deduplication set for the duration of the save: seeded
/// once from the object directory, then updated as objects are
/// written, so nothing is hashed to disk twice.
pub struct SnapshotBuilder<'a> {
    repo: &'a Repository,
    known: std::collections::HashSet<ContentHash>,
}

impl<'a> SnapshotBuilder<'a> {
    /// Create a builder, seeding the known-hash set from the object
    /// directory.
    pub fn new(repo: &'a Repository) -> Result<Self> {
        let known = repo.known_hashes()?;
        Ok(Self { repo, known })
    }

    /// Snapshot the given source paths under `name`.
    ///
    /// Each path becomes one child of the snapshot's inline top-level
    /// manifest, in argument order. The record is written last, so a
    /// failed save never becomes visible to readers.
    pub fn save(mut self, paths: &[impl AsRef<Path>], name: &str) -> Result<Snapshot> {
        let mut children = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            let abs = fs::canonicalize(path).map_err(|e| HbackError::SourceRead {
                path: path.to_path_buf(),
                source: e,
            })?;
            children.push(self.snapshot_one(&abs)?);
        }

        let date = Local::now();
        let snapshot = Snapshot {
            name: name.to_string(),
            id: format!("{}.{}", name, date.timestamp()),
            date,
            content: DirManifest { children },
        };

        let json = serde_json::to_vec(&snapshot)?;
        self.repo.write_snapshot_record(&snapshot.id, &json)?;

        debug!("Successfully saved backup {}", snapshot.name);
        Ok(snapshot)
    }

    /// Snapshot one path, returning the child entry describing it.
    ///
    /// Directories recurse over their entries in sorted-name order
    /// before the enclosing manifest is hashed; the hash must be a
    /// function of content, not of OS enumeration order.
    fn snapshot_one(&mut self, path: &Path) -> Result<DirEntry> {
        let metadata = fs::metadata(path).map_err(|e| HbackError::SourceRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let modified: DateTime<Local> = metadata
            .modified()
            .map_err(|e| HbackError::SourceRead {
                path: path.to_path_buf(),
                source: e,
            })?
            .into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let (hash, is_dir) = if metadata.is_dir() {
            let mut entries = fs::read_dir(path)
                .and_then(|iter| iter.collect::<io::Result<Vec<_>>>())
                .map_err(|e| HbackError::SourceRead {
                    path: path.to_path_buf(),
                    source: e,
                })?;
            entries.sort_by_key(|e| e.file_name());

            let mut children = Vec::with_capacity(entries.len());
            for entry in &entries {
                children.push(self.snapshot_one(&entry.path())?);
            }

            (self.store_manifest(&DirManifest { children })?, true)
        } else {
            (self.store_file(path)?, false)
        };

        Ok(DirEntry {
            name,
            hash,
            is_dir,
            created: modified, // birth time is not portably available
            modified,
        })
    }

    /// Hash a regular file and store its bytes if the hash is new.
    ///
    /// One open, one hash pass; when a copy is needed the same handle
    /// is rewound and streamed into the object path. A file whose hash
    /// is already known is never read a second time.
    fn store_file(&mut self, path: &Path) -> Result<ContentHash> {
        let mut file = fs::File::open(path).map_err(|e| HbackError::SourceRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let hash = hash::blob_hash(&mut file)?;

        if self.known.contains(&hash) {
            debug!("Skipping already backed up {} with hash {}", path.display(), hash);
            return Ok(hash);
        }

        debug!("Backing up {} with hash {}", path.display(), hash);
        file.seek(SeekFrom::Start(0))?;
        self.repo
            .write_atomic(&self.repo.object_path(&hash), |out| {
                io::copy(&mut file, out).map(|_| ())
            })?;
        self.known.insert(hash);

        Ok(hash)
    }

    /// Hash a directory manifest and store its serialized form if the
    /// hash is new.
    fn store_manifest(&mut self, manifest: &DirManifest) -> Result<ContentHash> {
        let hash = hash::manifest_hash(&manifest.children);

        if self.known.contains(&hash) {
            debug!("Skipping already backed up directory with hash {}", hash);
            return Ok(hash);
        }

        debug!("Backing up directory with hash {}", hash);
        let json = serde_json::to_vec(manifest)?;
        self.repo.write_object(&hash, &json)?;
        self.known.insert(hash);

        Ok(hash)
    }
}
