//! NAS reader CLI library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (list, read, load, embed, save-model)

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands};
pub use commands::{
    embed_text, init_logging, list_files, load_documents, load_settings, read_file, save_model,
    ConnectionOverrides,
};
