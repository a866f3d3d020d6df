//! Subcommand implementations
//!
//! One function per subcommand; all semantics live in the hback
//! library, this module only wires arguments to it and formats output.

use crate::cli::{ListArgs, MountArgs, NewArgs, RestoreArgs, SaveArgs};
use crate::output;
use hback::{index, restore, Repository, Result, SnapshotBuilder};
use tracing::debug;

pub fn cmd_new(args: NewArgs) -> Result<()> {
    Repository::init(args.name)?;
    Ok(())
}

pub fn cmd_save(args: SaveArgs) -> Result<()> {
    let repo = Repository::open(args.repo);
    let snapshot = SnapshotBuilder::new(&repo)?.save(&args.files, &args.name)?;
    debug!("Saved backup {} as {}", snapshot.name, snapshot.id);
    Ok(())
}

pub fn cmd_restore(args: RestoreArgs) -> Result<()> {
    let repo = Repository::open(args.repo);
    restore::restore(&repo, &args.id, &args.destination)
}

pub fn cmd_list(args: ListArgs) -> Result<()> {
    let repo = Repository::open(args.repo);
    let snapshots = index::list_snapshots(&repo)?;

    let headers = ["NAME", "DATE", "TIME", "ID"];
    let rows: Vec<Vec<String>> = snapshots
        .iter()
        .map(|s| {
            vec![
                s.name.clone(),
                s.date.format("%b %-d, %Y").to_string(),
                s.date.format("%H:%M").to_string(),
                s.id.clone(),
            ]
        })
        .collect();

    output::print_table(&headers, &rows);
    Ok(())
}

#[cfg(unix)]
pub fn cmd_mount(args: MountArgs) -> Result<()> {
    use hback::error::HbackError;

    let repo = Repository::open(args.repo);

    let (tx, rx) = std::sync::mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .map_err(|e| HbackError::Mount(format!("could not install signal handler: {e}")))?;

    let guard = hback::mount::spawn(repo, &args.destination)?;
    debug!("Mounted at {}, waiting for SIGINT/SIGTERM", args.destination.display());

    // Block until SIGINT or SIGTERM; dropping the guard unmounts.
    let _ = rx.recv();
    drop(guard);

    Ok(())
}

#[cfg(not(unix))]
pub fn cmd_mount(_args: MountArgs) -> Result<()> {
    Err(hback::error::HbackError::Mount(
        "mounting is only supported on unix platforms".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};

    #[test]
    fn list_date_formats() {
        // Jan 2, 2006 15:04 local time
        let date = Local.with_ymd_and_hms(2006, 1, 2, 15, 4, 5).unwrap();
        assert_eq!(date.format("%b %-d, %Y").to_string(), "Jan 2, 2006");
        assert_eq!(date.format("%H:%M").to_string(), "15:04");
    }

    #[test]
    fn new_then_save_then_list() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let root = dir.path().join("repo");

        cmd_new(NewArgs { name: root.clone() }).expect("new");

        let src = dir.path().join("src");
        std::fs::create_dir(&src).expect("mkdir");
        std::fs::write(src.join("a.txt"), b"hello").expect("write");

        cmd_save(SaveArgs {
            files: vec![src],
            name: "t".to_string(),
            repo: root.clone(),
        })
        .expect("save");

        let repo = Repository::open(&root);
        let snapshots = index::list_snapshots(&repo).expect("list");
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].name, "t");
    }

    #[test]
    fn restore_command_roundtrip() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let root = dir.path().join("repo");
        cmd_new(NewArgs { name: root.clone() }).expect("new");

        let src = dir.path().join("src");
        std::fs::create_dir(&src).expect("mkdir");
        std::fs::write(src.join("a.txt"), b"hello").expect("write");

        cmd_save(SaveArgs {
            files: vec![src],
            name: "t".to_string(),
            repo: root.clone(),
        })
        .expect("save");

        let repo = Repository::open(&root);
        let id = index::list_snapshots(&repo).expect("list")[0].id.clone();

        let out = dir.path().join("out");
        cmd_restore(RestoreArgs {
            id,
            destination: out.clone(),
            repo: root,
        })
        .expect("restore");

        assert_eq!(std::fs::read(out.join("src/a.txt")).unwrap(), b"hello");
    }
}
