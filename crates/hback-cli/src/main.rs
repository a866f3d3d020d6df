//! hback CLI - content-addressed deduplicating backups
//!
//! This is the CLI binary over the hback library: save, list, restore,
//! and mount snapshots of local directory trees.

mod cli;
mod commands;
mod output;

use clap::Parser;
use cli::{Cli, Commands};
use hback::Result;
use tracing_subscriber::EnvFilter;

fn main() {
    let args = Cli::parse();

    // -v raises our own crates to debug; RUST_LOG still wins when set
    let default_filter = if args.verbose {
        "hback=debug,hback_cli=debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(args) {
        eprintln!("hback: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Cli) -> Result<()> {
    match args.command {
        Commands::New(args) => commands::cmd_new(args),
        Commands::Save(args) => commands::cmd_save(args),
        Commands::Restore(args) => commands::cmd_restore(args),
        Commands::List(args) => commands::cmd_list(args),
        Commands::Mount(args) => commands::cmd_mount(args),
    }
}
