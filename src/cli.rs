/*
 * Copyright (C) 2026 Mark Wells Dev
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

//! CLI utilities for terminal output formatting and colors.

use crossterm::tty::IsTty;
use std::io::stdout;

use crate::hierarchy::Direction;

/// Configuration for color output
#[derive(Debug, Clone, Copy)]
pub struct ColorConfig {
    /// Whether ANSI escapes are emitted.
    pub enabled: bool,
}

impl ColorConfig {
    /// Create a new `ColorConfig`, auto-detecting TTY unless nocolor is true
    #[must_use]
    pub fn new(nocolor: bool) -> Self {
        Self {
            enabled: !nocolor && stdout().is_tty(),
        }
    }

    fn paint(self, code: &str, s: &str) -> String {
        if self.enabled {
            format!("\x1b[{code}m{s}\x1b[0m")
        } else {
            s.to_string()
        }
    }

    /// ANSI escape code for green (callers)
    #[must_use]
    pub fn green(self, s: &str) -> String {
        self.paint("32", s)
    }

    /// ANSI escape code for blue (callees)
    #[must_use]
    pub fn blue(self, s: &str) -> String {
        self.paint("34", s)
    }

    /// ANSI escape code for red (deprecated symbols, errors)
    #[must_use]
    pub fn red(self, s: &str) -> String {
        self.paint("31", s)
    }

    /// ANSI escape code for dim text
    #[must_use]
    pub fn dim(self, s: &str) -> String {
        self.paint("2", s)
    }

    /// Colors a symbol name by the direction of the tree it sits in.
    #[must_use]
    pub fn symbol(self, direction: Direction, s: &str) -> String {
        match direction {
            Direction::Incoming => self.green(s),
            Direction::Outgoing => self.blue(s),
        }
    }
}

/// Truncate a string to `max_len` characters, adding "..." if truncated
#[must_use]
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    if max_len <= 3 {
        return ".".repeat(max_len);
    }
    let kept: String = s.chars().take(max_len - 3).collect();
    format!("{kept}...")
}

/// Box-drawing prefix for one line of a tree.
///
/// `ancestors_last[i]` says whether the ancestor at depth `i + 1` was the
/// last of its siblings; `is_last` is the same for the line itself.
#[must_use]
pub fn tree_prefix(ancestors_last: &[bool], is_last: bool) -> String {
    let mut prefix: String = ancestors_last
        .iter()
        .map(|&last| if last { "    " } else { "│   " })
        .collect();
    prefix.push_str(if is_last { "└── " } else { "├── " });
    prefix
}
