// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

use anyhow::Result;
use async_trait::async_trait;
use lsp_types::{
    CallHierarchyIncomingCall, CallHierarchyIncomingCallsParams, CallHierarchyItem,
    CallHierarchyOutgoingCall, CallHierarchyOutgoingCallsParams, CallHierarchyPrepareParams,
};
use std::sync::Arc;

/// The call hierarchy requests a language server connection must answer.
///
/// A `None` result is the protocol's `null` and means "nothing here".
/// Transport and server failures are returned as errors.
#[async_trait]
pub trait CallHierarchyConnection: Send + Sync {
    /// `textDocument/prepareCallHierarchy`
    async fn prepare_call_hierarchy(
        &self,
        params: CallHierarchyPrepareParams,
    ) -> Result<Option<Vec<CallHierarchyItem>>>;

    /// `callHierarchy/incomingCalls`
    async fn incoming_calls(
        &self,
        params: CallHierarchyIncomingCallsParams,
    ) -> Result<Option<Vec<CallHierarchyIncomingCall>>>;

    /// `callHierarchy/outgoingCalls`
    async fn outgoing_calls(
        &self,
        params: CallHierarchyOutgoingCallsParams,
    ) -> Result<Option<Vec<CallHierarchyOutgoingCall>>>;
}

/// Shared handle to a connection, held by every node of a call tree.
pub type SharedConnection = Arc<dyn CallHierarchyConnection>;
