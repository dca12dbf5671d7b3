//! Memory command CLI definitions

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum MemoryAction {
    /// Show info about the attached process and its located pools
    Info,

    /// List assets in the process's pools
    List {
        /// Whitespace separated search terms matched against asset paths
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Export assets from the process's pools
    Export {
        /// Output directory (uses configured export_dir if not provided)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Whitespace separated search terms matched against asset paths
        #[arg(short, long)]
        filter: Option<String>,

        /// Stop between assets once this many seconds have passed
        #[arg(long)]
        timeout: Option<u64>,
    },
}
