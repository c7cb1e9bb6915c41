// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use bytes::BytesMut;
use lsp_types::{
    CallHierarchyClientCapabilities, CallHierarchyIncomingCall, CallHierarchyIncomingCallsParams,
    CallHierarchyItem, CallHierarchyOutgoingCall, CallHierarchyOutgoingCallsParams,
    CallHierarchyPrepareParams, ClientCapabilities, DidCloseTextDocumentParams,
    DidOpenTextDocumentParams, InitializeParams, InitializeResult, InitializedParams,
    TextDocumentClientCapabilities, WorkspaceFolder,
};
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, error, trace, warn};

use super::protocol::{
    self, NotificationMessage, RequestId, RequestMessage, ResponseMessage, ServerMessage,
};
use crate::document::path_to_uri;
use crate::hierarchy::CallHierarchyConnection;

/// Default timeout for LSP requests.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

type PendingRequests = Arc<Mutex<HashMap<RequestId, oneshot::Sender<ResponseMessage>>>>;

/// Manages communication with an LSP server process.
pub struct LspClient {
    next_id: AtomicI64,
    stdin: Arc<Mutex<ChildStdin>>,
    pending: PendingRequests,
    alive: Arc<AtomicBool>,
    request_timeout: Duration,
    _reader_handle: tokio::task::JoinHandle<()>,
    _child: Child,
}

impl LspClient {
    /// Spawns the LSP server process and starts the response reader task.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be started.
    pub fn spawn(program: &str, args: &[String], request_timeout: Duration) -> Result<Self> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn LSP server: {program}"))?;

        let stdin = child.stdin.take().context("LSP server stdin not captured")?;
        let stdout = child
            .stdout
            .take()
            .context("LSP server stdout not captured")?;

        let stdin = Arc::new(Mutex::new(stdin));
        let pending: PendingRequests = Arc::new(Mutex::new(HashMap::new()));
        let alive = Arc::new(AtomicBool::new(true));

        let reader_handle = tokio::spawn(Self::reader_task(
            stdin.clone(),
            stdout,
            pending.clone(),
            alive.clone(),
        ));

        debug!("Spawned LSP server: {} {}", program, args.join(" "));

        Ok(Self {
            next_id: AtomicI64::new(1),
            stdin,
            pending,
            alive,
            request_timeout,
            _reader_handle: reader_handle,
            _child: child,
        })
    }

    /// Background task that reads LSP messages and routes responses to pending requests.
    async fn reader_task(
        stdin: Arc<Mutex<ChildStdin>>,
        stdout: ChildStdout,
        pending: PendingRequests,
        alive: Arc<AtomicBool>,
    ) {
        let mut reader = BufReader::new(stdout);
        let mut buffer = BytesMut::with_capacity(8192);

        loop {
            let mut temp = [0u8; 4096];
            match reader.read(&mut temp).await {
                Ok(0) => {
                    debug!("LSP stdout closed");
                    break;
                }
                Ok(n) => buffer.extend_from_slice(&temp[..n]),
                Err(e) => {
                    error!("Error reading from LSP stdout: {}", e);
                    break;
                }
            }

            loop {
                let body = match protocol::try_parse_message(&mut buffer) {
                    Ok(Some(body)) => body,
                    Ok(None) => break,
                    Err(e) => {
                        error!("Dropping unreadable LSP output: {}", e);
                        buffer.clear();
                        break;
                    }
                };

                trace!("Received LSP message: {}", body);

                match ServerMessage::parse(&body) {
                    Ok(ServerMessage::Response(response)) => {
                        Self::route_response(response, &pending).await;
                    }
                    Ok(ServerMessage::Request(request)) => {
                        debug!(
                            "Received server request: {} (id: {:?})",
                            request.method, request.id
                        );
                        let reply = ResponseMessage::method_not_found(request.id, &request.method);
                        if let Err(e) = Self::write_message(&stdin, &reply).await {
                            warn!("Failed to answer server request: {}", e);
                        }
                    }
                    Ok(ServerMessage::Notification(notification)) => {
                        Self::handle_notification(&notification);
                    }
                    Err(e) => warn!("Failed to parse LSP message: {}", e),
                }
            }
        }

        alive.store(false, Ordering::SeqCst);
        // Dropping the senders wakes every waiter with a closed-channel error.
        pending.lock().await.clear();
        warn!("LSP reader task exiting - server connection lost");
    }

    async fn route_response(response: ResponseMessage, pending: &PendingRequests) {
        let Some(id) = response.id.clone() else {
            warn!("Received response without id");
            return;
        };

        let sender = pending.lock().await.remove(&id);
        match sender {
            Some(sender) => {
                let _ = sender.send(response);
            }
            None => warn!("Received response for unknown request id: {:?}", id),
        }
    }

    fn handle_notification(notification: &NotificationMessage) {
        match notification.method.as_str() {
            "window/logMessage" | "window/showMessage" => {
                if let Some(message) = notification.params.get("message").and_then(|m| m.as_str())
                {
                    debug!("LSP server message: {}", message);
                }
            }
            _ => trace!("Ignoring notification: {}", notification.method),
        }
    }

    /// Sends a request and waits for the response with timeout.
    async fn request<P: serde::Serialize, R: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<R> {
        if !self.is_alive() {
            return Err(anyhow!("LSP server is not running"));
        }

        let id = RequestId::Number(self.next_id.fetch_add(1, Ordering::SeqCst));
        let request = RequestMessage::new(id.clone(), method, serde_json::to_value(params)?);

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), tx);

        // The reader clears pending requests after marking the server dead.
        if !self.is_alive() {
            self.pending.lock().await.remove(&id);
            return Err(anyhow!("LSP server is not running"));
        }

        debug!("LSP request {:?}: {}", id, method);
        if let Err(e) = Self::write_message(&self.stdin, &request).await {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        let response = match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => return Err(anyhow!("LSP server closed connection")),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                return Err(anyhow!(
                    "LSP request '{}' timed out after {:?}",
                    method,
                    self.request_timeout
                ));
            }
        };

        if let Some(error) = response.error {
            return Err(anyhow!("LSP error {}: {}", error.code, error.message));
        }

        // A missing result is the same as null.
        let result = response.result.unwrap_or(serde_json::Value::Null);
        serde_json::from_value(result)
            .with_context(|| format!("Failed to parse LSP response to '{method}'"))
    }

    /// Sends a notification (no response expected).
    async fn notify<P: serde::Serialize>(&self, method: &str, params: P) -> Result<()> {
        let notification = NotificationMessage::new(method, serde_json::to_value(params)?);
        Self::write_message(&self.stdin, &notification).await
    }

    async fn write_message<T: serde::Serialize>(
        stdin: &Mutex<ChildStdin>,
        message: &T,
    ) -> Result<()> {
        let framed = protocol::encode_message(message)?;
        trace!("Sending LSP message: {}", String::from_utf8_lossy(&framed));

        let mut stdin = stdin.lock().await;
        stdin.write_all(&framed).await?;
        stdin.flush().await?;
        Ok(())
    }

    /// Performs the LSP initialize handshake rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects or never answers `initialize`.
    pub async fn initialize(&self, root: &Path) -> Result<InitializeResult> {
        let root_uri = path_to_uri(root)?;

        let params = InitializeParams {
            process_id: Some(std::process::id()),
            capabilities: ClientCapabilities {
                text_document: Some(TextDocumentClientCapabilities {
                    call_hierarchy: Some(CallHierarchyClientCapabilities {
                        dynamic_registration: Some(false),
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            },
            workspace_folders: Some(vec![WorkspaceFolder {
                uri: root_uri,
                name: root
                    .file_name()
                    .map_or_else(|| "workspace".to_string(), |s| s.to_string_lossy().to_string()),
            }]),
            ..Default::default()
        };

        let result: InitializeResult = self.request("initialize", params).await?;
        self.notify("initialized", InitializedParams {}).await?;

        Ok(result)
    }

    /// Sends shutdown request and exit notification.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot be reached.
    pub async fn shutdown(&self) -> Result<()> {
        // shutdown response varies by server (null, true, etc.) - ignore result
        let _: serde_json::Value = self.request("shutdown", serde_json::Value::Null).await?;
        self.notify("exit", serde_json::Value::Null).await
    }

    /// Notifies the LSP server that a document was opened.
    ///
    /// # Errors
    ///
    /// Returns an error if the notification cannot be written.
    pub async fn did_open(&self, params: DidOpenTextDocumentParams) -> Result<()> {
        self.notify("textDocument/didOpen", params).await
    }

    /// Notifies the LSP server that a document was closed.
    ///
    /// # Errors
    ///
    /// Returns an error if the notification cannot be written.
    pub async fn did_close(&self, params: DidCloseTextDocumentParams) -> Result<()> {
        self.notify("textDocument/didClose", params).await
    }

    /// Returns true if the LSP server connection is still alive.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CallHierarchyConnection for LspClient {
    async fn prepare_call_hierarchy(
        &self,
        params: CallHierarchyPrepareParams,
    ) -> Result<Option<Vec<CallHierarchyItem>>> {
        self.request("textDocument/prepareCallHierarchy", params)
            .await
    }

    async fn incoming_calls(
        &self,
        params: CallHierarchyIncomingCallsParams,
    ) -> Result<Option<Vec<CallHierarchyIncomingCall>>> {
        self.request("callHierarchy/incomingCalls", params).await
    }

    async fn outgoing_calls(
        &self,
        params: CallHierarchyOutgoingCallsParams,
    ) -> Result<Option<Vec<CallHierarchyOutgoingCall>>> {
        self.request("callHierarchy/outgoingCalls", params).await
    }
}
