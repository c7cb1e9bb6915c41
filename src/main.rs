// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Calltree CLI.
//!
//! Starts a language server, asks it for the call hierarchy at a position
//! and prints the callers or callees as a tree.

#![allow(clippy::print_stdout, reason = "CLI tool needs to output to stdout")]
#![allow(clippy::print_stderr, reason = "CLI tool needs to output to stderr")]

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use calltree::cli::ColorConfig;
use calltree::config::{Config, ServerConfig};
use calltree::document::{self, language_id};
use calltree::hierarchy::{
    CallHierarchyAdapter, Direction, HierarchyResult, Point, SharedConnection,
};
use calltree::lsp::LspClient;
use calltree::render::{self, CallTree};

/// Command-line arguments for Calltree.
#[derive(Parser, Debug)]
#[command(name = "calltree")]
#[command(about = "Print the call hierarchy of a symbol using an LSP server")]
#[command(version)]
struct Args {
    /// Source file containing the symbol.
    file: PathBuf,

    /// Line of the symbol (1-based).
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    line: u32,

    /// Column of the symbol (1-based).
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    character: u32,

    /// Walk callers (incoming) or callees (outgoing).
    /// Overrides the config file (default: incoming).
    #[arg(short, long, value_enum)]
    direction: Option<Direction>,

    /// Levels to expand below the symbol.
    /// Overrides the config file (default: 3).
    #[arg(long)]
    depth: Option<usize>,

    /// Language server to run, as "command args...".
    /// Overrides the server configured for the file's language.
    #[arg(short, long)]
    server: Option<String>,

    /// Workspace root (default: the file's directory).
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Path to configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the tree as JSON.
    #[arg(long)]
    json: bool,

    /// Disable colored output.
    #[arg(long)]
    nocolor: bool,
}

/// Entry point for the calltree binary.
///
/// # Errors
///
/// Returns an error if the server cannot be started or the request fails.
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("calltree=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let mut config = Config::load(args.config.clone())?;

    // Override depth if provided on CLI
    if let Some(depth) = args.depth {
        config.max_depth = depth;
    }
    let direction = args.direction.unwrap_or(config.direction);

    let file = args
        .file
        .canonicalize()
        .with_context(|| format!("Cannot open {}", args.file.display()))?;
    let root = match &args.root {
        Some(root) => root
            .canonicalize()
            .with_context(|| format!("Invalid root {}", root.display()))?,
        None => file
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf),
    };
    let server = resolve_server(&config, args.server.as_deref(), &file)?;
    let position = Point::new(args.line - 1, args.character - 1);

    info!(
        "{} calls of {}:{}:{} via {}",
        direction,
        file.display(),
        args.line,
        args.character,
        server.command
    );

    let client = Arc::new(LspClient::spawn(
        &server.command,
        &server.args,
        config.request_timeout(),
    )?);
    let trees = query(&client, &root, &file, position, direction, config.max_depth).await;

    if let Err(e) = client.shutdown().await {
        warn!("Failed to shut down language server: {}", e);
    }

    let trees = trees?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&trees)?);
    } else if trees.is_empty() {
        eprintln!(
            "No call hierarchy item at {}:{}:{}",
            file.display(),
            args.line,
            args.character
        );
    } else {
        let colors = ColorConfig::new(args.nocolor);
        print!("{}", render::format_tree(&trees, direction, colors));
    }

    Ok(())
}

/// Picks the server from `--server` or the config entry for the file's language.
fn resolve_server(config: &Config, cli: Option<&str>, file: &Path) -> Result<ServerConfig> {
    if let Some(command_line) = cli {
        return ServerConfig::parse(command_line).context("--server cannot be empty");
    }

    let language = language_id(file);
    config.server_for(file).cloned().with_context(|| {
        format!(
            "No language server configured for '{language}'. \
             Pass --server or add a [server.{language}] section to the config file"
        )
    })
}

/// Initializes the server, opens `file` and collects the tree at `position`.
async fn query(
    client: &Arc<LspClient>,
    root: &Path,
    file: &Path,
    position: Point,
    direction: Direction,
    max_depth: usize,
) -> Result<Vec<CallTree>> {
    let init = client.initialize(root).await?;
    if !CallHierarchyAdapter::can_adapt(&init.capabilities) {
        let name = init
            .server_info
            .map_or_else(|| "language server".to_string(), |info| info.name);
        bail!("{name} does not support call hierarchy");
    }

    let params = document::open_params(file).await?;
    let uri = params.text_document.uri.clone();
    client.did_open(params).await?;

    let connection: SharedConnection = client.clone();
    let adapter = CallHierarchyAdapter::new();
    let trees: HierarchyResult<Vec<CallTree>> = async {
        let node = adapter
            .get_call_hierarchy(&connection, &uri, position, direction)
            .await?;
        debug!("Collecting {} root(s) to depth {}", node.len(), max_depth);
        render::collect_tree(&node, max_depth).await
    }
    .await;

    if let Err(e) = client.did_close(document::close_params(uri)).await {
        warn!("Failed to close document: {}", e);
    }
    Ok(trees?)
}
