//! Repository layout and content-addressed object storage
//!
//! A repository is a directory with two flat subdirectories:
//! `backups/` holds snapshot records keyed by id, `hashes/` holds
//! content-addressed objects keyed by lowercase hex SHA-256. Blobs and
//! manifests share `hashes/` and are told apart only by how a
//! reference is flagged.

use crate::error::{HbackError, Result};
use crate::types::ContentHash;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Subdirectory holding snapshot records
const BACKUPS_DIR: &str = "backups";
/// Subdirectory holding content-addressed objects
const HASHES_DIR: &str = "hashes";

/// Handle to an hback repository rooted at a directory.
///
/// Opening is lazy: the directories are only touched when an operation
/// needs them, and every operation reports the path it failed on.
#[derive(Debug, Clone)]
pub struct Repository {
    root: PathBuf,
}

impl Repository {
    /// Open a repository at the given root without touching the disk.
    #[must_use]
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create a new repository: the root plus empty `backups/` and
    /// `hashes/` directories. Fails if the root already exists.
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let repo = Self::open(root);

        fs::create_dir(&repo.root).map_err(|e| HbackError::RepoCreate {
            path: repo.root.clone(),
            source: e,
        })?;
        for dir in [repo.backups_dir(), repo.hashes_dir()] {
            fs::create_dir(&dir).map_err(|e| HbackError::RepoCreate {
                path: dir.clone(),
                source: e,
            })?;
        }

        Ok(repo)
    }

    /// The repository root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding snapshot records.
    #[must_use]
    pub fn backups_dir(&self) -> PathBuf {
        self.root.join(BACKUPS_DIR)
    }

    /// Directory holding content-addressed objects.
    #[must_use]
    pub fn hashes_dir(&self) -> PathBuf {
        self.root.join(HASHES_DIR)
    }

    /// On-disk path of the object with the given hash.
    #[must_use]
    pub fn object_path(&self, hash: &ContentHash) -> PathBuf {
        self.hashes_dir().join(hash.to_string())
    }

    /// On-disk path of the snapshot record with the given id.
    #[must_use]
    pub fn snapshot_path(&self, id: &str) -> PathBuf {
        self.backups_dir().join(id)
    }

    /// Enumerate the hashes present in the object directory.
    ///
    /// Filenames that are not 64 hex characters are skipped; nothing
    /// references them, so they cannot be reachable objects.
    pub fn known_hashes(&self) -> Result<HashSet<ContentHash>> {
        let dir = self.hashes_dir();
        let entries = fs::read_dir(&dir).map_err(|e| HbackError::RepoOpen {
            path: dir.clone(),
            source: e,
        })?;

        let mut hashes = HashSet::new();
        for entry in entries {
            let entry = entry.map_err(|e| HbackError::RepoOpen {
                path: dir.clone(),
                source: e,
            })?;
            if let Ok(hash) = entry.file_name().to_string_lossy().parse::<ContentHash>() {
                hashes.insert(hash);
            }
        }

        Ok(hashes)
    }

    /// Check whether an object with the given hash is stored.
    #[must_use]
    pub fn has_object(&self, hash: &ContentHash) -> bool {
        self.object_path(hash).exists()
    }

    /// Store serialized content under its hash.
    ///
    /// A no-op when the object already exists: equal hashes guarantee
    /// equal content. Otherwise written via temp file + rename so a
    /// crash never leaves a partial object under a valid hash name.
    pub fn write_object(&self, hash: &ContentHash, content: &[u8]) -> Result<()> {
        let obj_path = self.object_path(hash);
        if obj_path.exists() {
            return Ok(());
        }
        self.write_atomic(&obj_path, |file| file.write_all(content))
    }

    /// Store a snapshot record under its id, recreating `backups/` if
    /// it has gone missing.
    pub fn write_snapshot_record(&self, id: &str, content: &[u8]) -> Result<()> {
        let dir = self.backups_dir();
        fs::create_dir_all(&dir).map_err(|e| HbackError::RepoCreate {
            path: dir,
            source: e,
        })?;
        let path = self.snapshot_path(id);
        self.write_atomic(&path, |file| file.write_all(content))
    }

    /// Write a file atomically: temp file beside the target, fsync,
    /// rename over the final name.
    pub(crate) fn write_atomic<F>(&self, path: &Path, fill: F) -> Result<()>
    where
        F: FnOnce(&mut fs::File) -> std::io::Result<()>,
    {
        let parent = path.parent().unwrap_or(&self.root);
        let temp_path = parent.join(format!(".tmp-{}", std::process::id()));

        let write_result = (|| -> std::io::Result<()> {
            let mut file = fs::File::create(&temp_path)?;
            fill(&mut file)?;
            file.sync_all()
        })();

        if let Err(e) = write_result {
            let _ = fs::remove_file(&temp_path);
            return Err(HbackError::ObjectWrite {
                path: path.to_path_buf(),
                source: e,
            });
        }

        fs::rename(&temp_path, path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            HbackError::ObjectWrite {
                path: path.to_path_buf(),
                source: e,
            }
        })
    }

    /// Read and deserialize a JSON file, reporting the offending path.
    pub fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let bytes = fs::read(path).map_err(|e| HbackError::ObjectRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_slice(&bytes).map_err(|e| HbackError::ObjectParse {
            path: path.to_path_buf(),
            source: e,
        })
    }
}
