// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Integration tests for the call hierarchy adapter over a real LSP connection.
//!
//! Every test spawns `mockls`, opens a small source file and walks the
//! call graph it derives.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use calltree::document;
use calltree::hierarchy::{
    CallHierarchyAdapter, Direction, HierarchyError, Point, ResultNode, SharedConnection,
};
use calltree::lsp::{DEFAULT_REQUEST_TIMEOUT, LspClient};
use calltree::render;

const SOURCE: &str = "\
fn main() {
    helper();
    helper();
    other();
}

#[deprecated]
fn helper() {
    other();
}

fn other() {}
";

/// Zero-based positions of the three definitions in `SOURCE`.
const MAIN: Point = Point::new(0, 3);
const HELPER: Point = Point::new(7, 3);
const OTHER: Point = Point::new(11, 3);

struct Fixture {
    _dir: TempDir,
    file: PathBuf,
    client: Arc<LspClient>,
    connection: SharedConnection,
    supports_call_hierarchy: bool,
}

impl Fixture {
    async fn start(args: &[&str]) -> Result<Self> {
        Self::start_with_timeout(args, DEFAULT_REQUEST_TIMEOUT).await
    }

    async fn start_with_timeout(args: &[&str], timeout: Duration) -> Result<Self> {
        let dir = tempfile::tempdir().context("Failed to create temp dir")?;
        let file = dir.path().join("main.rs");
        std::fs::write(&file, SOURCE).context("Failed to write fixture")?;

        let args: Vec<String> = args.iter().map(ToString::to_string).collect();
        let client = Arc::new(
            LspClient::spawn(env!("CARGO_BIN_EXE_mockls"), &args, timeout)
                .context("Failed to spawn mockls")?,
        );

        let init = client.initialize(dir.path()).await?;
        client.did_open(document::open_params(&file).await?).await?;

        let connection: SharedConnection = client.clone();
        Ok(Self {
            _dir: dir,
            file,
            client,
            connection,
            supports_call_hierarchy: CallHierarchyAdapter::can_adapt(&init.capabilities),
        })
    }

    async fn root(&self, position: Point, direction: Direction) -> Result<ResultNode> {
        let uri = document::path_to_uri(&self.file)?;
        Ok(CallHierarchyAdapter::new()
            .get_call_hierarchy(&self.connection, &uri, position, direction)
            .await?)
    }
}

fn names(node: &ResultNode) -> Vec<&str> {
    node.data().iter().map(|e| e.name.as_str()).collect()
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[tokio::test]
async fn test_capability_detection() -> Result<()> {
    let plain = Fixture::start(&[]).await?;
    assert!(plain.supports_call_hierarchy);

    let options = Fixture::start(&["--call-hierarchy-options"]).await?;
    assert!(options.supports_call_hierarchy);

    let without = Fixture::start(&["--no-call-hierarchy"]).await?;
    assert!(!without.supports_call_hierarchy);
    Ok(())
}

#[tokio::test]
async fn test_root_entry_is_converted() -> Result<()> {
    let fixture = Fixture::start(&[]).await?;

    let root = fixture.root(HELPER, Direction::Incoming).await?;

    assert_eq!(root.direction(), Direction::Incoming);
    let entry = root.data().first().context("expected one root")?;
    assert_eq!(entry.name, "helper");
    assert_eq!(entry.icon, "type-function");
    assert_eq!(entry.tags, ["deprecated"]);
    assert_eq!(entry.detail, "fn helper()");
    assert_eq!(entry.path, display_path(&fixture.file));
    assert_eq!(entry.selection_range.start, HELPER);
    assert_eq!(entry.range.end, Point::new(9, 1));
    assert_eq!(entry.raw_data.uri, document::path_to_uri(&fixture.file)?);
    Ok(())
}

#[tokio::test]
async fn test_outgoing_walk_stays_outgoing() -> Result<()> {
    let fixture = Fixture::start(&[]).await?;

    let root = fixture.root(MAIN, Direction::Outgoing).await?;
    assert_eq!(names(&root), ["main"]);

    let callees = root.item_at(0).await?;
    assert_eq!(callees.direction(), Direction::Outgoing);
    assert_eq!(names(&callees), ["helper", "other"]);
    assert!(callees.data()[0].is_deprecated());

    let helper_callees = callees.item_at(0).await?;
    assert_eq!(helper_callees.direction(), Direction::Outgoing);
    assert_eq!(names(&helper_callees), ["other"]);

    let leaf = helper_callees.item_at(0).await?;
    assert!(leaf.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_incoming_walk_stays_incoming() -> Result<()> {
    let fixture = Fixture::start(&[]).await?;

    let root = fixture.root(OTHER, Direction::Incoming).await?;
    let callers = root.item_at(0).await?;
    assert_eq!(callers.direction(), Direction::Incoming);
    assert_eq!(names(&callers), ["main", "helper"]);

    let helper_callers = callers.item_at(1).await?;
    assert_eq!(helper_callers.direction(), Direction::Incoming);
    assert_eq!(names(&helper_callers), ["main"]);
    Ok(())
}

#[tokio::test]
async fn test_direct_expansion_entry_points() -> Result<()> {
    let fixture = Fixture::start(&[]).await?;
    let root = fixture.root(OTHER, Direction::Incoming).await?;
    let other = root.data().first().context("expected one root")?.raw_data.clone();

    let adapter = CallHierarchyAdapter::new();
    let incoming = adapter.get_incoming(&fixture.connection, other.clone()).await?;
    let outgoing = adapter.get_outgoing(&fixture.connection, other).await?;

    assert_eq!(incoming.direction(), Direction::Incoming);
    assert_eq!(names(&incoming), ["main", "helper"]);
    assert_eq!(outgoing.direction(), Direction::Outgoing);
    assert!(outgoing.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_collect_tree_over_lsp() -> Result<()> {
    let fixture = Fixture::start(&[]).await?;
    let root = fixture.root(OTHER, Direction::Incoming).await?;

    let trees = render::collect_tree(&root, 3).await?;

    let other = trees.first().context("expected one root")?;
    let callers: Vec<&str> = other.children.iter().map(|t| t.entry.name.as_str()).collect();
    assert_eq!(callers, ["main", "helper"]);

    let main = &other.children[0];
    assert!(main.expanded);
    assert!(main.children.is_empty());

    let helper = &other.children[1];
    assert_eq!(helper.children.len(), 1);
    assert_eq!(helper.children[0].entry.name, "main");
    Ok(())
}

#[tokio::test]
async fn test_position_off_symbol_gives_empty_root() -> Result<()> {
    let fixture = Fixture::start(&[]).await?;

    let root = fixture.root(Point::new(5, 0), Direction::Incoming).await?;

    assert!(root.is_empty());
    assert!(matches!(
        root.item_at(0).await,
        Err(HierarchyError::IndexOutOfRange { index: 0, len: 0 })
    ));
    Ok(())
}

#[tokio::test]
async fn test_null_results_are_empty() -> Result<()> {
    let fixture = Fixture::start(&["--null-results"]).await?;

    let root = fixture.root(MAIN, Direction::Outgoing).await?;

    assert_eq!(root.direction(), Direction::Outgoing);
    assert!(root.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_server_error_is_propagated() -> Result<()> {
    let fixture =
        Fixture::start(&["--fail-on", "callHierarchy/incomingCalls"]).await?;
    let root = fixture.root(OTHER, Direction::Incoming).await?;

    let err = root
        .item_at(0)
        .await
        .err()
        .context("expected a server error")?;

    assert!(matches!(err, HierarchyError::Connection(_)));
    let message = err.to_string();
    assert!(message.starts_with("LSP error -32603"), "{message}");
    assert!(message.contains("configured to fail"), "{message}");
    Ok(())
}

#[tokio::test]
async fn test_request_timeout() -> Result<()> {
    let fixture = Fixture::start_with_timeout(
        &["--hang-on", "textDocument/prepareCallHierarchy"],
        Duration::from_millis(300),
    )
    .await?;

    let err = fixture
        .root(MAIN, Direction::Incoming)
        .await
        .err()
        .context("expected a timeout")?;

    assert!(err.to_string().contains("timed out"), "{err}");
    Ok(())
}

#[tokio::test]
async fn test_server_crash_fails_expansion() -> Result<()> {
    // initialize and prepare are answered, then the server exits.
    let fixture =
        Fixture::start_with_timeout(&["--drop-after", "2"], Duration::from_secs(5)).await?;
    let root = fixture.root(MAIN, Direction::Outgoing).await?;
    assert_eq!(names(&root), ["main"]);

    let result = root.item_at(0).await;

    assert!(matches!(result, Err(HierarchyError::Connection(_))));
    Ok(())
}

#[tokio::test]
async fn test_requests_after_crash_fail_fast() -> Result<()> {
    // Default timeout: a request left pending would hang for 30 seconds.
    let fixture = Fixture::start(&["--drop-after", "2"]).await?;
    let root = fixture.root(MAIN, Direction::Outgoing).await?;

    for attempt in 0..3 {
        let result = tokio::time::timeout(Duration::from_secs(5), root.item_at(0))
            .await
            .with_context(|| format!("expansion {attempt} waited for the request timeout"))?;
        assert!(matches!(result, Err(HierarchyError::Connection(_))));
    }

    assert!(!fixture.client.is_alive());
    Ok(())
}

#[tokio::test]
async fn test_server_requests_do_not_block_client() -> Result<()> {
    let fixture = Fixture::start(&["--send-configuration-request"]).await?;

    let root = fixture.root(MAIN, Direction::Outgoing).await?;

    assert_eq!(names(&root), ["main"]);
    assert!(fixture.client.is_alive());
    Ok(())
}

#[tokio::test]
async fn test_shutdown() -> Result<()> {
    let fixture = Fixture::start(&[]).await?;
    fixture
        .client
        .did_close(document::close_params(document::path_to_uri(&fixture.file)?))
        .await?;
    fixture.client.shutdown().await?;
    Ok(())
}
