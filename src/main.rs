//! # Source Uploader CLI (`srcup`)
//!
//! The `srcup` binary runs the upload HTTP server and offers the same
//! normalize/publish pipeline from the shell.
//!
//! ## Usage
//!
//! ```bash
//! srcup --config ./config/srcup.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `srcup serve` | Start the HTTP upload server |
//! | `srcup normalize <file>` | Print the canonical form and target path of a source file |
//! | `srcup upload <file> --token <t>` | Normalize and publish one file to GitHub |
//!
//! ## Examples
//!
//! ```bash
//! # Check what a file would be published as
//! srcup normalize ./my-source.json
//!
//! # Publish to the default repository
//! srcup upload ./my-source.json --token "$GITHUB_TOKEN"
//!
//! # Publish somewhere else
//! srcup upload ./feeds.json --token "$GITHUB_TOKEN" --repo me/sources --branch dev
//! ```

mod config;
mod error;
mod models;
mod normalize;
mod publish;
mod server;
mod store;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Source Uploader: normalize reader source JSON and publish it to GitHub.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing file means built-in defaults.
#[derive(Parser)]
#[command(
    name = "srcup",
    about = "Normalize book/subscription source JSON and publish it to a GitHub repository",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/srcup.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP upload server.
    ///
    /// Binds to `[server].bind` and serves `/upload` and `/upload-simple`.
    Serve,

    /// Normalize a source file without publishing it.
    ///
    /// Prints the detected kind, the repository path it would be written
    /// to, and the canonical JSON.
    Normalize {
        /// Path to the JSON source file.
        file: PathBuf,
    },

    /// Normalize a source file and publish it.
    Upload {
        /// Path to the JSON source file.
        file: PathBuf,

        /// GitHub access token with contents write permission.
        #[arg(long)]
        token: String,

        /// Target repository (`owner/name`). Defaults to `[defaults].repo_name`.
        #[arg(long)]
        repo: Option<String>,

        /// Target branch. Defaults to `[defaults].branch`.
        #[arg(long)]
        branch: Option<String>,

        /// Commit message. Defaults to `[defaults].commit_message`.
        #[arg(long)]
        message: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Normalize { file } => {
            let raw = std::fs::read(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let content = normalize::normalize(&raw)?;
            println!("kind: {}", content.kind);
            println!("path: {}", content.target_path());
            println!("{}", String::from_utf8_lossy(&content.canonical_bytes));
        }
        Commands::Upload {
            file,
            token,
            repo,
            branch,
            message,
        } => {
            let raw = std::fs::read(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let repo = repo.unwrap_or_else(|| cfg.defaults.repo_name.clone());
            let branch = branch.unwrap_or_else(|| cfg.defaults.branch.clone());
            let message = message.unwrap_or_else(|| cfg.defaults.commit_message.clone());

            let client = store::build_client(&cfg.github)?;
            let store = store::GitHubStore::new(client, &cfg.github, &repo, &branch, &token)?;
            let path = publish::upload(&store, &raw, &message).await?;
            println!("{}", path);
        }
    }

    Ok(())
}
