//! CLI argument definitions for hback
//!
//! Uses clap for argument parsing. This module defines all subcommands
//! and their options. The repository path may come from the
//! `HBACK_REPO` environment variable instead of `-r`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// hback - content-addressed deduplicating backups
///
/// Saves named snapshots of files and directory trees into a local
/// repository, storing every unique blob and directory manifest once.
#[derive(Parser, Debug)]
#[command(name = "hback")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Be verbose
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new hback repo
    #[command(after_help = "EXAMPLES:
    # Create an empty repository
    hback new my-repo
")]
    New(NewArgs),

    /// Save files or folders to a hback repo
    #[command(after_help = "EXAMPLES:
    # Snapshot two folders under the name 'docs'
    hback save ~/notes ~/papers -b docs -r my-repo

    # Repository from the environment
    HBACK_REPO=my-repo hback save ~/notes -b docs
")]
    Save(SaveArgs),

    /// Restore a backup into a new destination folder
    #[command(after_help = "EXAMPLES:
    # Restore by id (see `hback list`)
    hback restore docs.1700000000 restored/ -r my-repo
")]
    Restore(RestoreArgs),

    /// List the backups in a repo, newest first
    List(ListArgs),

    /// Mount a repo as a read-only filesystem until interrupted
    #[command(after_help = "EXAMPLES:
    # Browse every snapshot under ./backups-view
    hback mount backups-view -r my-repo
")]
    Mount(MountArgs),
}

#[derive(Parser, Debug)]
pub struct NewArgs {
    /// Name for the new hback repo
    pub name: PathBuf,
}

#[derive(Parser, Debug)]
pub struct SaveArgs {
    /// Files or folders to be backed up
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Name of the backup
    #[arg(short = 'b', long = "backup")]
    pub name: String,

    /// Path to the hback repo
    #[arg(short = 'r', long, env = "HBACK_REPO")]
    pub repo: PathBuf,
}

#[derive(Parser, Debug)]
pub struct RestoreArgs {
    /// ID of the backup
    pub id: String,

    /// Destination folder
    pub destination: PathBuf,

    /// Path to the hback repo
    #[arg(short = 'r', long, env = "HBACK_REPO")]
    pub repo: PathBuf,
}

#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Path to the hback repo
    #[arg(short = 'r', long, env = "HBACK_REPO")]
    pub repo: PathBuf,
}

#[derive(Parser, Debug)]
pub struct MountArgs {
    /// Mount point
    pub destination: PathBuf,

    /// Path to the hback repo
    #[arg(short = 'r', long, env = "HBACK_REPO")]
    pub repo: PathBuf,
}
