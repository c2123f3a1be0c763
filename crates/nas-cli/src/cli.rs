//! CLI argument parsing for the NAS reader.
//!
//! Connection flags override every other configuration source.

use clap::{Parser, Subcommand};
use nas_types::DEFAULT_EMBEDDING_REPO;

/// NAS document reader
///
/// Lists, reads and bulk-loads files from SMB shares or mounted NFS exports.
#[derive(Parser, Debug)]
#[command(name = "nas-reader")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/nas-reader/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Access protocol (smb or nfs)
    #[arg(long, global = true)]
    pub protocol: Option<String>,

    /// NAS host name or IP address
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Base directory: mount point for NFS, path inside the share for SMB
    #[arg(long, global = true)]
    pub path: Option<String>,

    /// SMB port
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// SMB user name
    #[arg(short, long, global = true)]
    pub username: Option<String>,

    /// SMB share name
    #[arg(short, long, global = true)]
    pub share: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Reader commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List matching file paths, one per line
    List {
        /// Shell-style file name pattern
        #[arg(short, long, default_value = "*")]
        pattern: String,

        /// Only list the base directory itself
        #[arg(long)]
        no_recursive: bool,
    },

    /// Print the text of one file
    Read {
        /// Full path as printed by `list`
        path: String,
    },

    /// Load matching files as JSON-lines documents
    Load {
        #[arg(short, long, default_value = "*")]
        pattern: String,

        #[arg(long)]
        no_recursive: bool,

        /// Skip files that fail instead of aborting the whole load
        #[arg(long)]
        lenient: bool,
    },

    /// Embed a text and print the vector as JSON
    Embed {
        text: String,

        /// Model folder (overrides embedding.model_dir)
        #[arg(long)]
        model_dir: Option<String>,

        /// Apply the query instruction instead of the text instruction
        #[arg(long)]
        query: bool,
    },

    /// Download an embedding model into a folder for offline use
    SaveModel {
        /// HuggingFace repository ID
        #[arg(long, default_value = DEFAULT_EMBEDDING_REPO)]
        repo: String,

        output_dir: String,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
