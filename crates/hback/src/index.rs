//! Snapshot index: enumerate and order stored snapshot records

use crate::error::{HbackError, Result};
use crate::repo::Repository;
use crate::types::Snapshot;
use std::fs;

/// List every snapshot in the repository, newest first.
///
/// A record that cannot be read or parsed aborts the listing with an
/// error naming the file.
pub fn list_snapshots(repo: &Repository) -> Result<Vec<Snapshot>> {
    let dir = repo.backups_dir();
    let entries = fs::read_dir(&dir).map_err(|e| HbackError::RepoOpen {
        path: dir.clone(),
        source: e,
    })?;

    let mut snapshots = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| HbackError::RepoOpen {
            path: dir.clone(),
            source: e,
        })?;
        let snapshot: Snapshot = repo.read_json(&entry.path())?;
        snapshots.push(snapshot);
    }

    snapshots.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(snapshots)
}

/// Load one snapshot record by id.
///
/// A missing record maps to [`HbackError::SnapshotNotFound`]; any
/// other failure is surfaced as-is.
pub fn load_snapshot(repo: &Repository, id: &str) -> Result<Snapshot> {
    let path = repo.snapshot_path(id);
    if !path.exists() {
        return Err(HbackError::SnapshotNotFound(id.to_string()));
    }
    repo.read_json(&path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DirManifest;
    use chrono::{Duration, Local};
    use tempfile::TempDir;

    fn write_record(repo: &Repository, name: &str, offset_secs: i64) -> Snapshot {
        let date = Local::now() + Duration::seconds(offset_secs);
        let snapshot = Snapshot {
            name: name.to_string(),
            id: format!("{}.{}", name, date.timestamp()),
            date,
            content: DirManifest { children: vec![] },
        };
        let json = serde_json::to_vec(&snapshot).expect("serialize");
        repo.write_snapshot_record(&snapshot.id, &json)
            .expect("write record");
        snapshot
    }

    #[test]
    fn lists_newest_first() {
        let dir = TempDir::new().expect("tempdir");
        let repo = Repository::init(dir.path().join("repo")).expect("init");

        write_record(&repo, "old", -120);
        write_record(&repo, "new", 0);
        write_record(&repo, "mid", -60);

        let snapshots = list_snapshots(&repo).expect("list");
        let names: Vec<_> = snapshots.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["new", "mid", "old"]);
    }

    #[test]
    fn empty_repo_lists_nothing() {
        let dir = TempDir::new().expect("tempdir");
        let repo = Repository::init(dir.path().join("repo")).expect("init");
        assert!(list_snapshots(&repo).expect("list").is_empty());
    }

    #[test]
    fn unparseable_record_aborts_listing() {
        let dir = TempDir::new().expect("tempdir");
        let repo = Repository::init(dir.path().join("repo")).expect("init");

        write_record(&repo, "good", 0);
        fs::write(repo.backups_dir().join("bad.123"), b"not json").expect("write bad");

        assert!(list_snapshots(&repo).is_err());
    }

    #[test]
    fn missing_repo_fails() {
        let dir = TempDir::new().expect("tempdir");
        let repo = Repository::open(dir.path().join("missing"));
        assert!(list_snapshots(&repo).is_err());
    }

    #[test]
    fn load_snapshot_roundtrip() {
        let dir = TempDir::new().expect("tempdir");
        let repo = Repository::init(dir.path().join("repo")).expect("init");

        let written = write_record(&repo, "docs", 0);
        let loaded = load_snapshot(&repo, &written.id).expect("load");
        assert_eq!(loaded.id, written.id);
        assert_eq!(loaded.name, "docs");
    }

    #[test]
    fn load_missing_snapshot_is_not_found() {
        let dir = TempDir::new().expect("tempdir");
        let repo = Repository::init(dir.path().join("repo")).expect("init");

        match load_snapshot(&repo, "ghost.0") {
            Err(HbackError::SnapshotNotFound(id)) => assert_eq!(id, "ghost.0"),
            other => panic!("expected SnapshotNotFound, got {other:?}"),
        }
    }
}
