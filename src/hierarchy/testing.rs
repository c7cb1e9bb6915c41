// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Scripted connection used by the call tree tests.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use lsp_types::{
    CallHierarchyIncomingCall, CallHierarchyIncomingCallsParams, CallHierarchyItem,
    CallHierarchyOutgoingCall, CallHierarchyOutgoingCallsParams, CallHierarchyPrepareParams,
};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use super::CallHierarchyConnection;

/// Canned answer for one request kind.
#[derive(Debug, Clone)]
enum Reply<T> {
    Items(Option<Vec<T>>),
    Fail(String),
}

impl<T: Clone> Reply<T> {
    fn get(&self) -> Result<Option<Vec<T>>> {
        match self {
            Self::Items(items) => Ok(items.clone()),
            Self::Fail(message) => Err(anyhow!("{message}")),
        }
    }
}

/// Connection that answers every request from a fixed script and
/// remembers what it was asked.
#[derive(Debug)]
pub struct FakeConnection {
    prepare: Reply<CallHierarchyItem>,
    incoming: Reply<CallHierarchyIncomingCall>,
    outgoing: Reply<CallHierarchyOutgoingCall>,
    incoming_by_name: HashMap<String, Vec<CallHierarchyIncomingCall>>,
    outgoing_by_name: HashMap<String, Vec<CallHierarchyOutgoingCall>>,
    requests: Mutex<Vec<String>>,
}

impl FakeConnection {
    /// A connection that answers `null` to everything.
    pub fn new() -> Self {
        Self {
            prepare: Reply::Items(None),
            incoming: Reply::Items(None),
            outgoing: Reply::Items(None),
            incoming_by_name: HashMap::new(),
            outgoing_by_name: HashMap::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_prepare(mut self, items: Option<Vec<CallHierarchyItem>>) -> Self {
        self.prepare = Reply::Items(items);
        self
    }

    pub fn with_incoming(mut self, calls: Option<Vec<CallHierarchyIncomingCall>>) -> Self {
        self.incoming = Reply::Items(calls);
        self
    }

    pub fn with_outgoing(mut self, calls: Option<Vec<CallHierarchyOutgoingCall>>) -> Self {
        self.outgoing = Reply::Items(calls);
        self
    }

    /// Answers incoming calls for the item called `name` with `calls`,
    /// overriding the catch-all reply.
    pub fn with_incoming_for(mut self, name: &str, calls: Vec<CallHierarchyIncomingCall>) -> Self {
        self.incoming_by_name.insert(name.to_string(), calls);
        self
    }

    pub fn with_outgoing_for(mut self, name: &str, calls: Vec<CallHierarchyOutgoingCall>) -> Self {
        self.outgoing_by_name.insert(name.to_string(), calls);
        self
    }

    pub fn failing_prepare(mut self, message: &str) -> Self {
        self.prepare = Reply::Fail(message.to_string());
        self
    }

    pub fn failing_incoming(mut self, message: &str) -> Self {
        self.incoming = Reply::Fail(message.to_string());
        self
    }

    /// Requests seen so far, as `method:detail` strings.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, request: String) {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
    }
}

#[async_trait]
impl CallHierarchyConnection for FakeConnection {
    async fn prepare_call_hierarchy(
        &self,
        params: CallHierarchyPrepareParams,
    ) -> Result<Option<Vec<CallHierarchyItem>>> {
        let position = params.text_document_position_params.position;
        self.record(format!(
            "prepare:{}:{}:{}",
            params.text_document_position_params.text_document.uri.as_str(),
            position.line,
            position.character
        ));
        self.prepare.get()
    }

    async fn incoming_calls(
        &self,
        params: CallHierarchyIncomingCallsParams,
    ) -> Result<Option<Vec<CallHierarchyIncomingCall>>> {
        self.record(format!("incoming:{}", params.item.name));
        match self.incoming_by_name.get(&params.item.name) {
            Some(calls) => Ok(Some(calls.clone())),
            None => self.incoming.get(),
        }
    }

    async fn outgoing_calls(
        &self,
        params: CallHierarchyOutgoingCallsParams,
    ) -> Result<Option<Vec<CallHierarchyOutgoingCall>>> {
        self.record(format!("outgoing:{}", params.item.name));
        match self.outgoing_by_name.get(&params.item.name) {
            Some(calls) => Ok(Some(calls.clone())),
            None => self.outgoing.get(),
        }
    }
}
