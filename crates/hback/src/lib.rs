//! hback - content-addressed deduplicating backup library
//!
//! A repository stores each unique file blob and directory manifest
//! exactly once under its SHA-256 hash. Snapshots are named records
//! pointing into that store; they can be listed, restored, or mounted
//! read-only as a FUSE filesystem.

pub mod error;
pub mod hash;
pub mod index;
#[cfg(unix)]
pub mod mount;
pub mod repo;
pub mod restore;
pub mod snapshot;
pub mod types;

pub use error::{HbackError, Result};
pub use repo::Repository;
pub use snapshot::SnapshotBuilder;
pub use types::{ContentHash, DirEntry, DirManifest, Snapshot};
