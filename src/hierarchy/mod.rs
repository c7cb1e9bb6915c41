// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

/// Lazy call trees and the adapter that builds them.
pub mod adapter;
/// The connection boundary the adapter talks to.
pub mod connection;
/// Protocol item to display entry conversion.
pub mod convert;

#[cfg(test)]
pub(crate) mod testing;

pub use adapter::{CallHierarchyAdapter, Direction, HierarchyError, HierarchyResult, ResultNode};
pub use connection::{CallHierarchyConnection, SharedConnection};
pub use convert::{ConvertedEntry, PathStyle, Point, Range, convert_item, uri_to_path};
