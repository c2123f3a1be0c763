//! NAS document reader
//!
//! # Usage
//!
//! ```bash
//! nas-reader --protocol nfs --host 10.0.0.5 --path /mnt/nas list --pattern '*.md'
//! nas-reader --protocol smb --host nas.local --share docs -u alice load --lenient
//! nas-reader save-model ./models/bge
//! nas-reader embed "Hello World!" --model-dir ./models/bge
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/nas-reader/config.toml)
//! 3. Environment variables (NAS_*, e.g. NAS_PASSWORD)
//! 4. CLI flags

use std::io::{self, Write};

use anyhow::Result;

use nas_cli::{
    embed_text, init_logging, list_files, load_documents, load_settings, read_file, save_model,
    Cli, Commands, ConnectionOverrides,
};

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    let overrides = ConnectionOverrides {
        protocol: cli.protocol.clone(),
        host: cli.host.clone(),
        path: cli.path.clone(),
        port: cli.port,
        username: cli.username.clone(),
        share: cli.share.clone(),
        log_level: cli.log_level.clone(),
    };
    let settings = load_settings(cli.config.as_deref(), &overrides)?;
    init_logging(&settings.log_level)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::List {
            pattern,
            no_recursive,
        } => {
            list_files(&settings, &pattern, !no_recursive, &mut out)?;
        }
        Commands::Read { path } => {
            read_file(&settings, &path, &mut out)?;
        }
        Commands::Load {
            pattern,
            no_recursive,
            lenient,
        } => {
            load_documents(&settings, &pattern, !no_recursive, lenient, &mut out)?;
        }
        Commands::Embed {
            text,
            model_dir,
            query,
        } => {
            embed_text(&settings, &text, model_dir.as_deref(), query, &mut out)?;
        }
        Commands::SaveModel { repo, output_dir } => {
            save_model(&repo, &output_dir)?;
        }
    }

    out.flush()?;
    Ok(())
}
