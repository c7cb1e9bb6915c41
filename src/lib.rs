// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Calltree builds call hierarchy trees on top of any LSP language server.
//!
//! The [`hierarchy`] module turns `textDocument/prepareCallHierarchy` and the
//! `callHierarchy/*Calls` requests into lazily expanded trees of display
//! entries. The rest of the crate drives a real server over stdio and prints
//! the result.

/// Command-line output helpers.
pub mod cli;
/// Configuration handling for language servers and tree settings.
pub mod config;
/// Paths, URIs and document notifications.
pub mod document;
/// Call hierarchy adapter, entry conversion and the connection boundary.
pub mod hierarchy;
/// LSP client implementation and wire framing.
pub mod lsp;
/// Depth-limited tree collection and text rendering.
pub mod render;
