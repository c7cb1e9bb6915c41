// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Walks a lazy call tree to a fixed depth and renders it as text.

use serde::Serialize;
use std::fmt::Write;
use std::future::Future;
use std::pin::Pin;
use tracing::trace;

use crate::cli::{ColorConfig, tree_prefix, truncate};
use crate::hierarchy::{ConvertedEntry, Direction, HierarchyResult, ResultNode};

/// Longest detail text shown next to a symbol.
const DETAIL_WIDTH: usize = 60;

/// A fully expanded slice of a call tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallTree {
    /// The symbol at this position.
    #[serde(flatten)]
    pub entry: ConvertedEntry,
    /// Symbols one level further along the walk.
    pub children: Vec<Self>,
    /// False when the depth limit stopped the walk here.
    pub expanded: bool,
    /// True when the symbol already appears on the path from the root.
    pub recursive: bool,
}

type Level = Pin<Box<dyn Future<Output = HierarchyResult<Vec<CallTree>>> + Send>>;

/// Expands `node` up to `max_depth` levels below it.
///
/// A symbol that already appears between the root and itself is reported
/// as recursive and not expanded again.
///
/// # Errors
///
/// Returns the first error raised while expanding a node.
pub async fn collect_tree(node: &ResultNode, max_depth: usize) -> HierarchyResult<Vec<CallTree>> {
    collect_level(node.clone(), max_depth, Vec::new()).await
}

fn collect_level(node: ResultNode, remaining: usize, ancestors: Vec<ConvertedEntry>) -> Level {
    Box::pin(async move {
        let mut trees = Vec::with_capacity(node.len());

        for (index, entry) in node.data().iter().enumerate() {
            let recursive = ancestors.iter().any(|seen| same_symbol(seen, entry));
            let mut tree = CallTree {
                entry: entry.clone(),
                children: Vec::new(),
                expanded: false,
                recursive,
            };

            if remaining > 0 && !recursive {
                trace!("Expanding {} ({} levels left)", entry.name, remaining);
                let child = node.item_at(index).await?;
                let mut path = ancestors.clone();
                path.push(entry.clone());
                tree.children = collect_level(child, remaining - 1, path).await?;
                tree.expanded = true;
            }

            trees.push(tree);
        }

        Ok(trees)
    })
}

fn same_symbol(a: &ConvertedEntry, b: &ConvertedEntry) -> bool {
    a.name == b.name && a.path == b.path && a.selection_range == b.selection_range
}

/// Renders trees as indented text, one symbol per line.
#[must_use]
pub fn format_tree(trees: &[CallTree], direction: Direction, colors: ColorConfig) -> String {
    let mut out = String::new();
    for tree in trees {
        out.push_str(&format_entry(tree, direction, colors));
        out.push('\n');
        format_children(&mut out, &tree.children, &mut Vec::new(), direction, colors);
    }
    out
}

fn format_children(
    out: &mut String,
    children: &[CallTree],
    ancestors_last: &mut Vec<bool>,
    direction: Direction,
    colors: ColorConfig,
) {
    for (index, child) in children.iter().enumerate() {
        let is_last = index + 1 == children.len();
        let _ = writeln!(
            out,
            "{}{}",
            tree_prefix(ancestors_last, is_last),
            format_entry(child, direction, colors)
        );

        ancestors_last.push(is_last);
        format_children(out, &child.children, ancestors_last, direction, colors);
        ancestors_last.pop();
    }
}

fn format_entry(tree: &CallTree, direction: Direction, colors: ColorConfig) -> String {
    let entry = &tree.entry;
    let start = entry.selection_range.start;

    let mut line = colors.symbol(direction, &entry.name);
    let _ = write!(line, " {}", colors.dim(&format!("({})", entry.icon)));
    if entry.is_deprecated() {
        line.push(' ');
        line.push_str(&colors.red("[deprecated]"));
    }
    let location = format!(
        "{}:{}:{}",
        entry.path,
        start.row.saturating_add(1),
        start.column.saturating_add(1)
    );
    let _ = write!(line, "  {}", colors.dim(&location));
    if !entry.detail.is_empty() {
        let _ = write!(line, "  {}", colors.dim(&truncate(&entry.detail, DETAIL_WIDTH)));
    }
    if tree.recursive {
        let _ = write!(line, " {}", colors.dim("(recursive)"));
    }
    line
}
