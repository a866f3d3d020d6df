//! Restore walker: re-materialize a snapshot into a directory
//!
//! Walks a snapshot record top-down, dereferencing manifest hashes
//! back into directories and blob hashes back into file bytes. The
//! destination must not exist beforehand. Timestamps and permissions
//! are not restored; files are written with default permissions.

use crate::error::{HbackError, Result};
use crate::index;
use crate::repo::Repository;
use crate::types::DirEntry;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Restore the snapshot with the given id into `destination`.
pub fn restore(repo: &Repository, id: &str, destination: &Path) -> Result<()> {
    let snapshot = index::load_snapshot(repo, id)?;

    if destination.exists() {
        return Err(HbackError::DestinationExists(destination.to_path_buf()));
    }
    fs::create_dir(destination).map_err(|e| HbackError::DestinationWrite {
        path: destination.to_path_buf(),
        source: e,
    })?;

    for entry in &snapshot.content.children {
        restore_entry(repo, entry, destination)?;
    }

    debug!("Restored backup {} to {}", id, destination.display());
    Ok(())
}

/// Restore one entry under `parent`, recursing through manifests.
fn restore_entry(repo: &Repository, entry: &DirEntry, parent: &Path) -> Result<()> {
    let target = parent.join(&entry.name);

    if !entry.is_dir {
        fs::copy(repo.object_path(&entry.hash), &target).map_err(|e| {
            HbackError::DestinationWrite {
                path: target,
                source: e,
            }
        })?;
        return Ok(());
    }

    let manifest: crate::types::DirManifest = repo.read_json(&repo.object_path(&entry.hash))?;

    if let Err(e) = fs::create_dir(&target) {
        if e.kind() != std::io::ErrorKind::AlreadyExists {
            return Err(HbackError::DestinationWrite {
                path: target,
                source: e,
            });
        }
    }

    for child in &manifest.children {
        restore_entry(repo, child, &target)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SnapshotBuilder;
    use tempfile::TempDir;

    fn save_tree(repo: &Repository, src: &Path, name: &str) -> String {
        SnapshotBuilder::new(repo)
            .expect("builder")
            .save(&[src.to_path_buf()], name)
            .expect("save")
            .id
    }

    #[test]
    fn roundtrip_restores_bytes_and_layout() {
        let dir = TempDir::new().expect("tempdir");
        let repo = Repository::init(dir.path().join("repo")).expect("init");

        let src = dir.path().join("src");
        fs::create_dir_all(src.join("sub/deeper")).expect("mkdir");
        fs::write(src.join("a.txt"), b"hello").expect("write");
        fs::write(src.join("sub/b.txt"), b"world").expect("write");
        fs::write(src.join("sub/deeper/c.bin"), [0u8, 1, 2, 255]).expect("write");

        let id = save_tree(&repo, &src, "t");
        let out = dir.path().join("out");
        restore(&repo, &id, &out).expect("restore");

        assert_eq!(fs::read(out.join("src/a.txt")).unwrap(), b"hello");
        assert_eq!(fs::read(out.join("src/sub/b.txt")).unwrap(), b"world");
        assert_eq!(
            fs::read(out.join("src/sub/deeper/c.bin")).unwrap(),
            [0u8, 1, 2, 255]
        );
        assert!(out.join("src/sub/deeper").is_dir());
    }

    #[test]
    fn restore_into_existing_destination_fails() {
        let dir = TempDir::new().expect("tempdir");
        let repo = Repository::init(dir.path().join("repo")).expect("init");

        let src = dir.path().join("src");
        fs::create_dir(&src).expect("mkdir");
        fs::write(src.join("a.txt"), b"hello").expect("write");
        let id = save_tree(&repo, &src, "t");

        let out = dir.path().join("out");
        fs::create_dir(&out).expect("mkdir out");

        match restore(&repo, &id, &out) {
            Err(HbackError::DestinationExists(path)) => assert_eq!(path, out),
            other => panic!("expected DestinationExists, got {other:?}"),
        }
    }

    #[test]
    fn restore_unknown_id_fails_not_found() {
        let dir = TempDir::new().expect("tempdir");
        let repo = Repository::init(dir.path().join("repo")).expect("init");

        let out = dir.path().join("out");
        match restore(&repo, "ghost.0", &out) {
            Err(HbackError::SnapshotNotFound(id)) => assert_eq!(id, "ghost.0"),
            other => panic!("expected SnapshotNotFound, got {other:?}"),
        }
        assert!(!out.exists());
    }

    #[test]
    fn restore_does_not_write_to_repo() {
        let dir = TempDir::new().expect("tempdir");
        let repo = Repository::init(dir.path().join("repo")).expect("init");

        let src = dir.path().join("src");
        fs::create_dir(&src).expect("mkdir");
        fs::write(src.join("a.txt"), b"hello").expect("write");
        let id = save_tree(&repo, &src, "t");

        let objects_before = fs::read_dir(repo.hashes_dir()).unwrap().count();
        let records_before = fs::read_dir(repo.backups_dir()).unwrap().count();

        restore(&repo, &id, &dir.path().join("out")).expect("restore");

        assert_eq!(fs::read_dir(repo.hashes_dir()).unwrap().count(), objects_before);
        assert_eq!(fs::read_dir(repo.backups_dir()).unwrap().count(), records_before);
    }

    #[test]
    fn empty_directories_are_restored() {
        let dir = TempDir::new().expect("tempdir");
        let repo = Repository::init(dir.path().join("repo")).expect("init");

        let src = dir.path().join("src");
        fs::create_dir_all(src.join("empty")).expect("mkdir");
        let id = save_tree(&repo, &src, "t");

        let out = dir.path().join("out");
        restore(&repo, &id, &out).expect("restore");
        assert!(out.join("src/empty").is_dir());
    }
}
