// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

/// Stdio LSP client that answers the call hierarchy requests.
pub mod client;
/// JSON-RPC message definitions and framing.
pub mod protocol;

pub use client::{DEFAULT_REQUEST_TIMEOUT, LspClient};
