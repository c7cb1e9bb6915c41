// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Lazy call hierarchy trees on top of a language server connection.
//!
//! A [`ResultNode`] holds the converted items at one level of the tree and
//! the connection needed to fetch the next level. Nothing below a node is
//! requested until [`ResultNode::item_at`] is awaited, and the walk never
//! changes direction: every node under an incoming root is incoming.

use lsp_types::{
    CallHierarchyIncomingCall, CallHierarchyIncomingCallsParams, CallHierarchyItem,
    CallHierarchyOutgoingCall, CallHierarchyOutgoingCallsParams, CallHierarchyPrepareParams,
    CallHierarchyServerCapability, PartialResultParams, ServerCapabilities,
    TextDocumentIdentifier, TextDocumentPositionParams, Uri, WorkDoneProgressParams,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, trace};

use super::convert::{ConvertedEntry, PathStyle, Point, convert_item};
use super::{CallHierarchyConnection, SharedConnection};

/// Which way the call graph is walked.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Callers of the symbol.
    #[default]
    Incoming,
    /// Callees of the symbol.
    Outgoing,
}

impl Direction {
    /// Lowercase name, as used on the wire and in configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Incoming => "incoming",
            Self::Outgoing => "outgoing",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced while building or expanding a call tree.
#[derive(Debug, Error)]
pub enum HierarchyError {
    /// The connection failed; the error is passed through untouched.
    #[error(transparent)]
    Connection(#[from] anyhow::Error),

    /// `item_at` was asked for an entry the node does not have.
    #[error("no call hierarchy item at index {index} (node has {len})")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of entries in the node.
        len: usize,
    },
}

/// Result alias for call tree operations.
pub type HierarchyResult<T> = std::result::Result<T, HierarchyError>;

/// One call record. Incoming calls carry the caller in `from`, outgoing
/// calls carry the callee in `to`.
enum HierarchyCall {
    Incoming(CallHierarchyIncomingCall),
    Outgoing(CallHierarchyOutgoingCall),
}

impl HierarchyCall {
    fn into_item(self) -> CallHierarchyItem {
        match self {
            Self::Incoming(call) => call.from,
            Self::Outgoing(call) => call.to,
        }
    }
}

/// Translates call hierarchy requests into lazily expanded trees.
///
/// The adapter keeps no state between calls; it only carries the path
/// style used to render item URIs.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallHierarchyAdapter {
    path_style: PathStyle,
}

impl CallHierarchyAdapter {
    /// Creates an adapter that renders paths for the current platform.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            path_style: PathStyle::Native,
        }
    }

    /// Creates an adapter that renders paths in the given style.
    #[must_use]
    pub const fn with_path_style(path_style: PathStyle) -> Self {
        Self { path_style }
    }

    /// Path style used for converted entries.
    #[must_use]
    pub const fn path_style(&self) -> PathStyle {
        self.path_style
    }

    /// Returns true if the server advertises call hierarchy support.
    #[must_use]
    pub fn can_adapt(capabilities: &ServerCapabilities) -> bool {
        match &capabilities.call_hierarchy_provider {
            Some(CallHierarchyServerCapability::Simple(enabled)) => *enabled,
            Some(_) => true,
            None => false,
        }
    }

    /// Resolves the symbols at `position` and returns them as the root of
    /// a tree walked in `direction`.
    ///
    /// A `null` answer from the server yields an empty root.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::Connection`] if the request fails.
    pub async fn get_call_hierarchy(
        &self,
        connection: &SharedConnection,
        document: &Uri,
        position: Point,
        direction: Direction,
    ) -> HierarchyResult<ResultNode> {
        debug!(
            "Call hierarchy request: {}:{}:{} direction={}",
            document.as_str(),
            position.row,
            position.column,
            direction
        );

        let params = CallHierarchyPrepareParams {
            text_document_position_params: TextDocumentPositionParams {
                text_document: TextDocumentIdentifier {
                    uri: document.clone(),
                },
                position: position.into(),
            },
            work_done_progress_params: WorkDoneProgressParams::default(),
        };

        let items = connection
            .prepare_call_hierarchy(params)
            .await?
            .unwrap_or_default();

        debug!("Resolved {} call hierarchy root(s)", items.len());
        Ok(self.node(connection, direction, items))
    }

    /// Fetches the callers of `item`.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::Connection`] if the request fails.
    pub async fn get_incoming(
        &self,
        connection: &SharedConnection,
        item: CallHierarchyItem,
    ) -> HierarchyResult<ResultNode> {
        self.expand(connection, Direction::Incoming, item).await
    }

    /// Fetches the callees of `item`.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::Connection`] if the request fails.
    pub async fn get_outgoing(
        &self,
        connection: &SharedConnection,
        item: CallHierarchyItem,
    ) -> HierarchyResult<ResultNode> {
        self.expand(connection, Direction::Outgoing, item).await
    }

    async fn expand(
        &self,
        connection: &SharedConnection,
        direction: Direction,
        item: CallHierarchyItem,
    ) -> HierarchyResult<ResultNode> {
        trace!("Expanding {} calls of {}", direction, item.name);

        let calls = fetch_calls(connection.as_ref(), direction, item).await?;
        let items = calls.into_iter().map(HierarchyCall::into_item).collect();

        Ok(self.node(connection, direction, items))
    }

    fn node(
        &self,
        connection: &SharedConnection,
        direction: Direction,
        items: Vec<CallHierarchyItem>,
    ) -> ResultNode {
        ResultNode {
            direction,
            data: items
                .into_iter()
                .map(|item| convert_item(item, self.path_style))
                .collect(),
            adapter: *self,
            connection: connection.clone(),
        }
    }
}

async fn fetch_calls(
    connection: &dyn CallHierarchyConnection,
    direction: Direction,
    item: CallHierarchyItem,
) -> anyhow::Result<Vec<HierarchyCall>> {
    let calls = match direction {
        Direction::Incoming => {
            let params = CallHierarchyIncomingCallsParams {
                item,
                work_done_progress_params: WorkDoneProgressParams::default(),
                partial_result_params: PartialResultParams::default(),
            };
            connection
                .incoming_calls(params)
                .await?
                .unwrap_or_default()
                .into_iter()
                .map(HierarchyCall::Incoming)
                .collect()
        }
        Direction::Outgoing => {
            let params = CallHierarchyOutgoingCallsParams {
                item,
                work_done_progress_params: WorkDoneProgressParams::default(),
                partial_result_params: PartialResultParams::default(),
            };
            connection
                .outgoing_calls(params)
                .await?
                .unwrap_or_default()
                .into_iter()
                .map(HierarchyCall::Outgoing)
                .collect()
        }
    };

    Ok(calls)
}

/// One level of a call tree.
#[derive(Clone)]
pub struct ResultNode {
    direction: Direction,
    data: Vec<ConvertedEntry>,
    adapter: CallHierarchyAdapter,
    connection: SharedConnection,
}

impl ResultNode {
    /// Direction of the whole tree this node belongs to.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Entries at this level.
    #[must_use]
    pub fn data(&self) -> &[ConvertedEntry] {
        &self.data
    }

    /// Consumes the node, returning its entries.
    #[must_use]
    pub fn into_data(self) -> Vec<ConvertedEntry> {
        self.data
    }

    /// Number of entries at this level.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if this level has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Fetches the next level below `data()[index]`.
    ///
    /// Every call sends a fresh request; results are not cached.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::IndexOutOfRange`] without contacting the
    /// server if `index` is past the end, or [`HierarchyError::Connection`]
    /// if the request fails.
    pub async fn item_at(&self, index: usize) -> HierarchyResult<Self> {
        let entry = self
            .data
            .get(index)
            .ok_or(HierarchyError::IndexOutOfRange {
                index,
                len: self.data.len(),
            })?;

        self.adapter
            .expand(&self.connection, self.direction, entry.raw_data.clone())
            .await
    }
}

impl fmt::Debug for ResultNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultNode")
            .field("direction", &self.direction)
            .field("data", &self.data)
            .finish_non_exhaustive()
    }
}
