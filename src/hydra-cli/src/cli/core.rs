//! Core CLI definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::memory::MemoryAction;

#[derive(Parser)]
#[command(name = "hydra")]
#[command(about = "Fast file and game memory asset extractor", long_about = None)]
pub struct Cli {
    /// Log more detail (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Decode a fast file without listing or exporting anything
    #[command(visible_alias = "d")]
    Decode {
        /// Path to the .ff file
        input: PathBuf,

        /// Output path (defaults to <input>.decoded.dat)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the assets found in a fast file
    #[command(visible_alias = "l")]
    List {
        /// Path to the .ff file
        input: PathBuf,

        /// Whitespace separated search terms matched against asset paths
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Export assets from a fast file, or every .ff file in a directory
    #[command(visible_alias = "e")]
    Export {
        /// Path to a .ff file or a directory of them
        input: PathBuf,

        /// Output directory (uses configured export_dir if not provided)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Whitespace separated search terms matched against asset paths
        #[arg(short, long)]
        filter: Option<String>,

        /// Keep the decoded stream as <input>.decoded.dat
        #[arg(long)]
        keep_decoded: bool,

        /// Stop between assets once this many seconds have passed
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// List or export assets from a running game process
    #[command(visible_alias = "m")]
    Memory {
        /// Attach to this process ID instead of searching by name
        #[arg(long)]
        pid: Option<u32>,

        #[command(subcommand)]
        action: MemoryAction,
    },

    /// Configure default settings
    #[command(visible_alias = "c")]
    Configure {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Set the default export directory
        #[arg(long)]
        export_dir: Option<PathBuf>,

        /// Keep decoded streams next to their fast files by default
        #[arg(long)]
        keep_decoded: Option<bool>,

        /// Set the game process name to attach to
        #[arg(long)]
        process_name: Option<String>,

        /// Set the game profile (e.g. "t7-pc")
        #[arg(long)]
        profile: Option<String>,

        /// Enable an asset kind (may be repeated)
        #[arg(long, value_name = "KIND")]
        enable: Vec<String>,

        /// Disable an asset kind (may be repeated)
        #[arg(long, value_name = "KIND")]
        disable: Vec<String>,
    },
}
