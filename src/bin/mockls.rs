// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! A configurable mock LSP server for testing call hierarchy clients.
//!
//! Speaks the LSP protocol over stdin/stdout using Content-Length framed
//! JSON-RPC. Open documents are scanned for `fn`, `function` and `def`
//! definitions; a definition's body runs until the next definition, and
//! `name(` inside a body is a call. CLI flags control capabilities, timing,
//! and failure modes. No tokio.

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const SYMBOL_KIND_METHOD: u64 = 6;
const SYMBOL_KIND_FUNCTION: u64 = 12;
const SYMBOL_TAG_DEPRECATED: u64 = 1;

/// Mock LSP server for integration testing.
#[derive(Parser, Debug)]
#[command(name = "mockls")]
#[allow(
    clippy::struct_excessive_bools,
    reason = "CLI flags are inherently boolean"
)]
struct Args {
    /// Do not advertise `callHierarchyProvider`.
    #[arg(long)]
    no_call_hierarchy: bool,

    /// Advertise `callHierarchyProvider` as an options object instead of `true`.
    #[arg(long)]
    call_hierarchy_options: bool,

    /// Answer every call hierarchy request with `null`.
    #[arg(long)]
    null_results: bool,

    /// Sleep before every response (milliseconds).
    #[arg(long, default_value_t = 0)]
    response_delay: u64,

    /// Close stdout after n responses (simulate crash).
    #[arg(long)]
    drop_after: Option<u64>,

    /// Never respond to this method (repeatable).
    #[arg(long)]
    hang_on: Vec<String>,

    /// Return `InternalError` for this method (repeatable).
    #[arg(long)]
    fail_on: Vec<String>,

    /// Send workspace/configuration request after initialize.
    #[arg(long)]
    send_configuration_request: bool,
}

/// A JSON-RPC request.
#[derive(Debug, Deserialize)]
struct Request {
    #[allow(dead_code, reason = "Required by JSON-RPC protocol")]
    jsonrpc: String,
    id: Option<Value>,
    method: Option<String>,
    #[serde(default)]
    params: Value,
}

/// A JSON-RPC response.
#[derive(Debug, Serialize)]
struct Response {
    jsonrpc: String,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Serialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// Thread-safe writer handle. Wraps `std::io::Stdout` for production,
/// or a shared `Vec<u8>` for tests.
type Writer = Arc<Mutex<Box<dyn Write + Send>>>;

/// Create a writer that forwards to stdout.
fn stdout_writer() -> Writer {
    Arc::new(Mutex::new(Box::new(std::io::stdout())))
}

#[cfg(test)]
fn buffer_writer() -> (Writer, Arc<Mutex<Vec<u8>>>) {
    let buf = Arc::new(Mutex::new(Vec::<u8>::new()));
    let writer: Box<dyn Write + Send> = Box::new(SharedVecWriter(buf.clone()));
    (Arc::new(Mutex::new(writer)), buf)
}

/// Write adapter for `Arc<Mutex<Vec<u8>>>` used in tests.
#[cfg(test)]
struct SharedVecWriter(Arc<Mutex<Vec<u8>>>);

#[cfg(test)]
impl Write for SharedVecWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0
            .lock()
            .map_err(|e| std::io::Error::other(e.to_string()))?
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// A definition found in an open document.
#[derive(Debug, Clone)]
struct Function {
    uri: String,
    name: String,
    kind: u64,
    deprecated: bool,
    detail: String,
    line: usize,
    indent: usize,
    name_col: usize,
    /// Last line of the body, inclusive.
    end_line: usize,
    end_col: usize,
}

/// `caller` calls `callee` at `line:col`. Both index into the function list.
#[derive(Debug, Clone, Copy)]
struct CallSite {
    caller: usize,
    callee: usize,
    line: usize,
    col: usize,
}

/// Every function and call across the open documents.
#[derive(Debug, Default)]
struct CallGraph {
    functions: Vec<Function>,
    calls: Vec<CallSite>,
}

impl CallGraph {
    fn build(documents: &BTreeMap<String, String>) -> Self {
        let functions: Vec<Function> = documents
            .iter()
            .flat_map(|(uri, text)| extract_functions(uri, text))
            .collect();

        let mut calls = Vec::new();
        for (caller, function) in functions.iter().enumerate() {
            let Some(text) = documents.get(&function.uri) else {
                continue;
            };

            for (line_idx, line_text) in text
                .lines()
                .enumerate()
                .take(function.end_line + 1)
                .skip(function.line)
            {
                if is_comment(line_text) {
                    continue;
                }
                let from = if line_idx == function.line {
                    function.name_col + function.name.len()
                } else {
                    0
                };

                for (callee, target) in functions.iter().enumerate() {
                    for col in call_columns(line_text, &target.name, from) {
                        calls.push(CallSite {
                            caller,
                            callee,
                            line: line_idx,
                            col,
                        });
                    }
                }
            }
        }

        Self { functions, calls }
    }

    /// Finds the function a `CallHierarchyItem` refers to.
    fn find(&self, item: &Value) -> Option<usize> {
        let uri = item.get("uri").and_then(Value::as_str)?;
        let name = item.get("name").and_then(Value::as_str)?;
        let line = item
            .get("selectionRange")
            .and_then(|r| r.get("start"))
            .and_then(|s| s.get("line"))
            .and_then(Value::as_u64)?;

        self.functions.iter().position(|f| {
            f.uri == uri && f.name == name && u64::try_from(f.line).is_ok_and(|l| l == line)
        })
    }

    /// Function defined at, or called at, `line:col` of `uri`.
    fn at_position(&self, uri: &str, text: &str, line: usize, col: usize) -> Option<usize> {
        let word = extract_word(text, line, col)?;
        self.functions
            .iter()
            .position(|f| f.uri == uri && f.name == word && f.line == line)
            .or_else(|| self.functions.iter().position(|f| f.name == word))
    }

    /// Groups call sites by the function `select` picks, keeping first-seen order.
    fn group<F>(&self, select: F) -> Vec<(usize, Vec<Value>)>
    where
        F: Fn(&CallSite) -> Option<usize>,
    {
        let mut groups: Vec<(usize, Vec<Value>)> = Vec::new();
        for site in &self.calls {
            let Some(key) = select(site) else { continue };
            let name_len = self.functions[site.callee].name.len();
            let range = range_json(site.line, site.col, site.line, site.col + name_len);

            match groups.iter_mut().find(|(k, _)| *k == key) {
                Some((_, ranges)) => ranges.push(range),
                None => groups.push((key, vec![range])),
            }
        }
        groups
    }

    fn incoming(&self, target: usize) -> Value {
        let calls: Vec<Value> = self
            .group(|site| (site.callee == target).then_some(site.caller))
            .into_iter()
            .map(|(caller, ranges)| {
                serde_json::json!({
                    "from": item_json(&self.functions[caller]),
                    "fromRanges": ranges
                })
            })
            .collect();
        Value::Array(calls)
    }

    fn outgoing(&self, source: usize) -> Value {
        let calls: Vec<Value> = self
            .group(|site| (site.caller == source).then_some(site.callee))
            .into_iter()
            .map(|(callee, ranges)| {
                serde_json::json!({
                    "to": item_json(&self.functions[callee]),
                    "fromRanges": ranges
                })
            })
            .collect();
        Value::Array(calls)
    }
}

/// Shared state for the mock server.
struct MockServer {
    args: Args,
    documents: BTreeMap<String, String>,
    response_count: u64,
    writer: Writer,
    shutdown_flag: Arc<AtomicBool>,
    next_request_id: Arc<AtomicU64>,
}

impl MockServer {
    fn new(args: Args, writer: Writer) -> Self {
        Self {
            args,
            documents: BTreeMap::new(),
            response_count: 0,
            writer,
            shutdown_flag: Arc::new(AtomicBool::new(false)),
            next_request_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Run the server, reading from the given reader.
    fn run(&mut self, reader: &mut dyn Read) {
        let mut buffer = Vec::new();
        let mut temp = [0u8; 4096];

        loop {
            if self.shutdown_flag.load(Ordering::SeqCst) {
                break;
            }

            match reader.read(&mut temp) {
                Ok(0) | Err(_) => break,
                Ok(n) => buffer.extend_from_slice(&temp[..n]),
            }

            while let Some((message, consumed)) = try_parse_message(&buffer) {
                buffer.drain(..consumed);

                let Ok(request) = serde_json::from_str::<Request>(&message) else {
                    continue;
                };

                self.handle_message(request);
            }
        }
    }

    fn handle_message(&mut self, request: Request) {
        let Some(method) = request.method.clone() else {
            // Replies to our own requests (workspace/configuration).
            return;
        };

        if request.id.is_some() {
            self.handle_request(&method, request);
        } else {
            self.handle_notification(&method, &request.params);
        }
    }

    fn handle_request(&mut self, method: &str, request: Request) {
        let Some(id) = request.id else { return };

        // Check hang_on — never respond
        if self.args.hang_on.iter().any(|m| m == method) {
            return;
        }

        // Response delay
        if self.args.response_delay > 0 {
            std::thread::sleep(Duration::from_millis(self.args.response_delay));
        }

        // Check fail_on — return `InternalError`
        if self.args.fail_on.iter().any(|m| m == method) {
            self.send_error(id, -32603, format!("mockls: configured to fail on {method}"));
            return;
        }

        let result = match method {
            "initialize" => self.handle_initialize(),
            "shutdown" => Value::Null,
            "textDocument/prepareCallHierarchy" => self.handle_prepare(&request.params),
            "callHierarchy/incomingCalls" => self.handle_calls(&request.params, CallGraph::incoming),
            "callHierarchy/outgoingCalls" => self.handle_calls(&request.params, CallGraph::outgoing),
            _ => {
                self.send_error(id, -32601, format!("mockls: method not found: {method}"));
                return;
            }
        };

        self.send_response(&Response {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        });

        if method == "initialize" && self.args.send_configuration_request {
            self.send_configuration_request();
        }
    }

    fn handle_notification(&mut self, method: &str, params: &Value) {
        match method {
            "textDocument/didOpen" => {
                if let Some(td) = params.get("textDocument") {
                    let uri = td.get("uri").and_then(Value::as_str).unwrap_or_default();
                    let text = td.get("text").and_then(Value::as_str).unwrap_or_default();
                    self.documents.insert(uri.to_string(), text.to_string());
                }
            }
            "textDocument/didChange" => {
                if let Some(td) = params.get("textDocument") {
                    let uri = td.get("uri").and_then(Value::as_str).unwrap_or_default();
                    if let Some(text) = params
                        .get("contentChanges")
                        .and_then(Value::as_array)
                        .and_then(|arr| arr.last())
                        .and_then(|c| c.get("text"))
                        .and_then(Value::as_str)
                    {
                        self.documents.insert(uri.to_string(), text.to_string());
                    }
                }
            }
            "textDocument/didClose" => {
                if let Some(td) = params.get("textDocument") {
                    let uri = td.get("uri").and_then(Value::as_str).unwrap_or_default();
                    self.documents.remove(uri);
                }
            }
            "exit" => {
                self.shutdown_flag.store(true, Ordering::SeqCst);
                std::process::exit(0);
            }
            // initialized and all others are silently accepted
            _ => {}
        }
    }

    fn handle_initialize(&self) -> Value {
        let mut capabilities = serde_json::json!({
            "textDocumentSync": {
                "openClose": true,
                "change": 1
            }
        });

        if !self.args.no_call_hierarchy {
            capabilities["callHierarchyProvider"] = if self.args.call_hierarchy_options {
                serde_json::json!({ "workDoneProgress": false })
            } else {
                Value::Bool(true)
            };
        }

        serde_json::json!({
            "capabilities": capabilities,
            "serverInfo": {
                "name": "mockls",
                "version": env!("CARGO_PKG_VERSION")
            }
        })
    }

    fn handle_prepare(&self, params: &Value) -> Value {
        if self.args.null_results {
            return Value::Null;
        }

        let Some((uri, line, col)) = extract_position(params) else {
            return Value::Null;
        };
        let Some(text) = self.documents.get(uri) else {
            return Value::Null;
        };

        let graph = CallGraph::build(&self.documents);
        graph
            .at_position(uri, text, line, col)
            .map_or(Value::Null, |index| {
                Value::Array(vec![item_json(&graph.functions[index])])
            })
    }

    fn handle_calls(&self, params: &Value, calls: fn(&CallGraph, usize) -> Value) -> Value {
        if self.args.null_results {
            return Value::Null;
        }

        let graph = CallGraph::build(&self.documents);
        params
            .get("item")
            .and_then(|item| graph.find(item))
            .map_or(Value::Null, |index| calls(&graph, index))
    }

    fn send_configuration_request(&self) {
        let req_id = self.next_request_id.fetch_add(1, Ordering::SeqCst);
        send_message(
            &self.writer,
            &serde_json::json!({
                "jsonrpc": "2.0",
                "id": req_id,
                "method": "workspace/configuration",
                "params": { "items": [{ "section": "mockls" }] }
            }),
        );
    }

    fn send_error(&mut self, id: Value, code: i64, message: String) {
        self.send_response(&Response {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(RpcError { code, message }),
        });
    }

    fn send_response(&mut self, response: &Response) {
        let Ok(json) = serde_json::to_string(response) else {
            return;
        };

        write_framed(&self.writer, &json);

        self.response_count += 1;

        if let Some(max) = self.args.drop_after
            && self.response_count >= max
        {
            std::process::exit(1);
        }
    }
}

/// Extract `(uri, line, col)` from a `textDocument/position` params object.
fn extract_position(params: &Value) -> Option<(&str, usize, usize)> {
    let uri = params
        .get("textDocument")
        .and_then(|td| td.get("uri"))
        .and_then(Value::as_str)?;
    let line = usize::try_from(
        params
            .get("position")
            .and_then(|p| p.get("line"))
            .and_then(Value::as_u64)?,
    )
    .ok()?;
    let col = usize::try_from(
        params
            .get("position")
            .and_then(|p| p.get("character"))
            .and_then(Value::as_u64)?,
    )
    .ok()?;
    Some((uri, line, col))
}

/// Build a JSON `Range` object.
fn range_json(start_line: usize, start: usize, end_line: usize, end: usize) -> Value {
    serde_json::json!({
        "start": { "line": start_line, "character": start },
        "end": { "line": end_line, "character": end }
    })
}

/// Build a JSON `CallHierarchyItem` for a function.
fn item_json(function: &Function) -> Value {
    let mut item = serde_json::json!({
        "name": function.name,
        "kind": function.kind,
        "detail": function.detail,
        "uri": function.uri,
        "range": range_json(function.line, function.indent, function.end_line, function.end_col),
        "selectionRange": range_json(
            function.line,
            function.name_col,
            function.line,
            function.name_col + function.name.len()
        )
    });
    if function.deprecated {
        item["tags"] = serde_json::json!([SYMBOL_TAG_DEPRECATED]);
    }
    item
}

/// Write a Content-Length framed JSON string.
fn write_framed(writer: &Writer, json: &str) {
    let header = format!("Content-Length: {}\r\n\r\n", json.len());
    let Ok(mut w) = writer.lock() else { return };
    let _ = w.write_all(header.as_bytes());
    let _ = w.write_all(json.as_bytes());
    let _ = w.flush();
}

/// Send a JSON-RPC message to the client.
fn send_message(writer: &Writer, value: &Value) {
    let Ok(json) = serde_json::to_string(value) else {
        return;
    };
    write_framed(writer, &json);
}

/// Parse a Content-Length framed message from a buffer.
/// Returns the message string and the number of bytes consumed.
fn try_parse_message(buffer: &[u8]) -> Option<(String, usize)> {
    let header_end = buffer.windows(4).position(|w| w == b"\r\n\r\n")?;
    let headers = std::str::from_utf8(&buffer[..header_end]).ok()?;

    let mut content_length: Option<usize> = None;
    for line in headers.lines() {
        if line.to_ascii_lowercase().starts_with("content-length:") {
            content_length = line
                .split_once(':')
                .and_then(|(_, v)| v.trim().parse().ok());
        }
    }

    let content_length = content_length?;
    let total = header_end + 4 + content_length;

    if buffer.len() < total {
        return None;
    }

    let body = std::str::from_utf8(&buffer[header_end + 4..total]).ok()?;
    Some((body.to_string(), total))
}

/// Extract the word at a given line and column from content.
fn extract_word(content: &str, line: usize, col: usize) -> Option<String> {
    let line_text = content.lines().nth(line)?;

    if col >= line_text.len() {
        return None;
    }

    let bytes = line_text.as_bytes();

    let start = (0..=col)
        .rev()
        .find(|&i| !is_word_char(bytes[i]))
        .map_or(0, |i| i + 1);

    let end = (col..bytes.len())
        .find(|&i| !is_word_char(bytes[i]))
        .unwrap_or(bytes.len());

    if start >= end {
        return None;
    }

    Some(line_text[start..end].to_string())
}

const fn is_word_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn is_comment(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("//") || trimmed.starts_with('#')
}

fn is_deprecation_marker(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with("#[deprecated") || trimmed.starts_with("@deprecated")
}

/// Columns in `line` at or after `from` where `name(` starts a call.
fn call_columns(line: &str, name: &str, from: usize) -> Vec<usize> {
    let pattern = format!("{name}(");
    let bytes = line.as_bytes();
    line.match_indices(&pattern)
        .map(|(col, _)| col)
        .filter(|&col| col >= from && (col == 0 || !is_word_char(bytes[col - 1])))
        .collect()
}

/// Extract function definitions from content.
///
/// A top-level definition is a function, an indented one a method.
fn extract_functions(uri: &str, content: &str) -> Vec<Function> {
    let lines: Vec<&str> = content.lines().collect();
    let mut functions: Vec<Function> = Vec::new();

    for (line_idx, line_text) in lines.iter().enumerate() {
        let trimmed = line_text.trim_start();
        let unqualified = trimmed.strip_prefix("pub ").unwrap_or(trimmed);
        let prefix_len = if unqualified.starts_with("fn ") {
            3
        } else if unqualified.starts_with("function ") {
            9
        } else if unqualified.starts_with("def ") {
            4
        } else {
            continue;
        };

        let after_keyword = &unqualified[prefix_len..];
        let name: String = after_keyword
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect();

        if name.is_empty() {
            continue;
        }

        let indent = line_text.len() - trimmed.len();
        let name_col = indent + (trimmed.len() - unqualified.len()) + prefix_len;
        let deprecated = line_idx > 0
            && lines[..line_idx]
                .iter()
                .rev()
                .find(|l| !l.trim().is_empty())
                .is_some_and(|l| is_deprecation_marker(l));

        // The previous definition ends where this one starts.
        if let Some(previous) = functions.last_mut() {
            close_body(previous, &lines, line_idx);
        }

        functions.push(Function {
            uri: uri.to_string(),
            name,
            kind: if indent == 0 {
                SYMBOL_KIND_FUNCTION
            } else {
                SYMBOL_KIND_METHOD
            },
            deprecated,
            detail: trimmed
                .trim_end()
                .trim_end_matches(['{', ':'])
                .trim_end()
                .to_string(),
            line: line_idx,
            indent,
            name_col,
            end_line: line_idx,
            end_col: line_text.len(),
        });
    }

    if let Some(last) = functions.last_mut() {
        close_body(last, &lines, lines.len());
    }

    functions
}

/// Ends `function` on the last non-blank line before `next_start`.
fn close_body(function: &mut Function, lines: &[&str], next_start: usize) {
    let end = (function.line..next_start)
        .rev()
        .find(|&i| !lines[i].trim().is_empty() && !is_deprecation_marker(lines[i]))
        .unwrap_or(function.line);
    function.end_line = end;
    function.end_col = lines[end].len();
}

fn main() {
    let args = Args::parse();
    let writer = stdout_writer();
    let mut server = MockServer::new(args, writer);
    let mut stdin = std::io::stdin().lock();
    server.run(&mut stdin);
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    reason = "Tests use expect/unwrap for clear failure messages"
)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const URI: &str = "file:///tmp/main.rs";

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

    fn default_args() -> Args {
        Args {
            no_call_hierarchy: false,
            call_hierarchy_options: false,
            null_results: false,
            response_delay: 0,
            drop_after: None,
            hang_on: vec![],
            fail_on: vec![],
            send_configuration_request: false,
        }
    }

    fn frame(body: &str) -> Vec<u8> {
        format!("Content-Length: {}\r\n\r\n{}", body.len(), body).into_bytes()
    }

    fn extract_messages(data: &[u8]) -> Vec<Value> {
        let mut messages = Vec::new();
        let mut buf = data.to_vec();
        while let Some((msg, consumed)) = try_parse_message(&buf) {
            if let Ok(v) = serde_json::from_str::<Value>(&msg) {
                messages.push(v);
            }
            buf.drain(..consumed);
        }
        messages
    }

    fn run_server_with(args: Args, input: &[u8]) -> Vec<Value> {
        let (writer, buf) = buffer_writer();
        let mut server = MockServer::new(args, writer);
        let mut reader = Cursor::new(input.to_vec());
        server.run(&mut reader);
        let data = buf
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        extract_messages(&data)
    }

    fn response(messages: &[Value], id: u64) -> &Value {
        messages
            .iter()
            .find(|m| m.get("id").and_then(Value::as_u64) == Some(id) && m.get("method").is_none())
            .expect("response with matching id")
    }

    fn initialize_request(id: u64) -> String {
        serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "initialize",
            "params": {
                "processId": null,
                "capabilities": {},
                "rootUri": "file:///tmp"
            }
        })
        .to_string()
    }

    fn shutdown_request(id: u64) -> String {
        serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "shutdown",
            "params": null
        })
        .to_string()
    }

    fn did_open_notification(uri: &str, text: &str) -> String {
        serde_json::json!({
            "jsonrpc": "2.0",
            "method": "textDocument/didOpen",
            "params": {
                "textDocument": {
                    "uri": uri,
                    "languageId": "rust",
                    "version": 1,
                    "text": text
                }
            }
        })
        .to_string()
    }

    fn prepare_request(id: u64, uri: &str, line: u64, character: u64) -> String {
        serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "textDocument/prepareCallHierarchy",
            "params": {
                "textDocument": { "uri": uri },
                "position": { "line": line, "character": character }
            }
        })
        .to_string()
    }

    fn calls_request(id: u64, method: &str, item: &Value) -> String {
        serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": { "item": item }
        })
        .to_string()
    }

    /// Opens `SOURCE`, prepares at `line:character`, then runs `method` on
    /// the first prepared item.
    fn prepare_then(args: Args, line: u64, character: u64, method: &str) -> Vec<Value> {
        let mut input = frame(&did_open_notification(URI, SOURCE));
        input.extend(frame(&prepare_request(1, URI, line, character)));
        let prepared = run_server_with(default_args(), &input);
        let item = response(&prepared, 1)["result"][0].clone();

        let mut input = frame(&did_open_notification(URI, SOURCE));
        input.extend(frame(&calls_request(2, method, &item)));
        run_server_with(args, &input)
    }

    #[test]
    fn test_initialize_advertises_call_hierarchy() {
        let mut input = frame(&initialize_request(1));
        input.extend(frame(&shutdown_request(2)));

        let messages = run_server_with(default_args(), &input);

        let resp = response(&messages, 1);
        assert!(resp["error"].is_null(), "Expected no error");
        assert_eq!(resp["result"]["capabilities"]["callHierarchyProvider"], true);
        assert_eq!(resp["result"]["serverInfo"]["name"], "mockls");
    }

    #[test]
    fn test_initialize_capability_variants() {
        let mut args = default_args();
        args.no_call_hierarchy = true;
        let messages = run_server_with(args, &frame(&initialize_request(1)));
        let caps = &response(&messages, 1)["result"]["capabilities"];
        assert!(caps.get("callHierarchyProvider").is_none());

        let mut args = default_args();
        args.call_hierarchy_options = true;
        let messages = run_server_with(args, &frame(&initialize_request(1)));
        let caps = &response(&messages, 1)["result"]["capabilities"];
        assert!(caps["callHierarchyProvider"].is_object());
    }

    #[test]
    fn test_prepare_on_definition() {
        let mut input = frame(&did_open_notification(URI, SOURCE));
        input.extend(frame(&prepare_request(1, URI, 7, 4)));

        let messages = run_server_with(default_args(), &input);
        let items = response(&messages, 1)["result"]
            .as_array()
            .expect("item array");

        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item["name"], "helper");
        assert_eq!(item["kind"], SYMBOL_KIND_FUNCTION);
        assert_eq!(item["tags"], serde_json::json!([1]));
        assert_eq!(item["detail"], "fn helper()");
        assert_eq!(item["uri"], URI);
        assert_eq!(item["selectionRange"], range_json(7, 3, 7, 9));
        assert_eq!(item["range"], range_json(7, 0, 9, 1));
    }

    #[test]
    fn test_prepare_on_call_site() {
        let mut input = frame(&did_open_notification(URI, SOURCE));
        input.extend(frame(&prepare_request(1, URI, 3, 6)));

        let messages = run_server_with(default_args(), &input);
        let item = &response(&messages, 1)["result"][0];

        assert_eq!(item["name"], "other");
        assert_eq!(item["selectionRange"]["start"]["line"], 11);
        assert!(item.get("tags").is_none());
    }

    #[test]
    fn test_prepare_off_symbol_is_null() {
        let mut input = frame(&did_open_notification(URI, SOURCE));
        input.extend(frame(&prepare_request(1, URI, 5, 0)));
        input.extend(frame(&prepare_request(2, "file:///tmp/unopened.rs", 0, 0)));

        let messages = run_server_with(default_args(), &input);

        assert!(response(&messages, 1)["result"].is_null());
        assert!(response(&messages, 2)["result"].is_null());
    }

    #[test]
    fn test_outgoing_calls() {
        let messages = prepare_then(default_args(), 0, 3, "callHierarchy/outgoingCalls");
        let calls = response(&messages, 2)["result"]
            .as_array()
            .expect("call array");

        let names: Vec<&str> = calls
            .iter()
            .filter_map(|c| c["to"]["name"].as_str())
            .collect();
        assert_eq!(names, ["helper", "other"]);
        assert_eq!(
            calls[0]["fromRanges"],
            serde_json::json!([range_json(1, 4, 1, 10), range_json(2, 4, 2, 10)])
        );
    }

    #[test]
    fn test_incoming_calls() {
        let messages = prepare_then(default_args(), 11, 3, "callHierarchy/incomingCalls");
        let calls = response(&messages, 2)["result"]
            .as_array()
            .expect("call array");

        let names: Vec<&str> = calls
            .iter()
            .filter_map(|c| c["from"]["name"].as_str())
            .collect();
        assert_eq!(names, ["main", "helper"]);
        assert_eq!(calls[1]["from"]["tags"], serde_json::json!([1]));
        assert_eq!(calls[1]["fromRanges"], serde_json::json!([range_json(8, 4, 8, 9)]));
    }

    #[test]
    fn test_calls_of_leaf_are_empty() {
        let messages = prepare_then(default_args(), 11, 3, "callHierarchy/outgoingCalls");
        assert_eq!(response(&messages, 2)["result"], serde_json::json!([]));
    }

    #[test]
    fn test_null_results() {
        let mut args = default_args();
        args.null_results = true;
        let messages = prepare_then(args, 0, 3, "callHierarchy/incomingCalls");
        let resp = response(&messages, 2);

        assert!(resp["result"].is_null());
        assert!(resp.get("result").is_some(), "null result must be present");
    }

    #[test]
    fn test_fail_on() {
        let mut args = default_args();
        args.fail_on = vec!["callHierarchy/outgoingCalls".to_string()];
        let messages = prepare_then(args, 0, 3, "callHierarchy/outgoingCalls");
        let resp = response(&messages, 2);

        assert_eq!(resp["error"]["code"], -32603);
        assert!(resp.get("result").is_none());
    }

    #[test]
    fn test_methods_and_python_defs() {
        let text = "class Greeter:\n    def greet(self):\n        shout()\n\ndef shout():\n    pass\n";
        let functions = extract_functions("file:///tmp/greet.py", text);

        assert_eq!(functions.len(), 2);
        assert_eq!(functions[0].name, "greet");
        assert_eq!(functions[0].kind, SYMBOL_KIND_METHOD);
        assert_eq!(functions[0].detail, "def greet(self)");
        assert_eq!(functions[0].end_line, 2);
        assert_eq!(functions[1].name, "shout");
        assert_eq!(functions[1].kind, SYMBOL_KIND_FUNCTION);
    }

    #[test]
    fn test_call_columns_need_word_boundary() {
        assert_eq!(call_columns("    helper(); my_helper();", "helper", 0), [4]);
        assert_eq!(call_columns("fn helper() { helper() }", "helper", 9), [14]);
        assert!(call_columns("helper;", "helper", 0).is_empty());
    }

    #[test]
    fn test_unknown_method() {
        let input = frame(
            &serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "textDocument/hover",
                "params": {}
            })
            .to_string(),
        );

        let messages = run_server_with(default_args(), &input);
        assert_eq!(response(&messages, 1)["error"]["code"], -32601);
    }

    #[test]
    fn test_configuration_request_after_initialize() {
        let mut args = default_args();
        args.send_configuration_request = true;

        let messages = run_server_with(args, &frame(&initialize_request(1)));

        assert!(messages.iter().any(|m| {
            m.get("method").and_then(Value::as_str) == Some("workspace/configuration")
        }));
    }

    #[test]
    fn test_request_id_echo() {
        let init = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 42,
            "method": "initialize",
            "params": { "processId": null, "capabilities": {}, "rootUri": null }
        })
        .to_string();
        let shutdown = serde_json::json!({
            "jsonrpc": "2.0",
            "id": "string-id",
            "method": "shutdown",
            "params": null
        })
        .to_string();

        let mut input = frame(&init);
        input.extend(frame(&shutdown));

        let messages = run_server_with(default_args(), &input);

        assert_eq!(messages[0]["id"], 42, "Init should echo numeric id");

        let shutdown_resp = messages
            .iter()
            .find(|m| m.get("id").and_then(Value::as_str) == Some("string-id"));
        assert!(shutdown_resp.is_some(), "Shutdown should echo string id");
    }
}
