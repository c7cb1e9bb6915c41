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

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::document::language_id;
use crate::hierarchy::Direction;

/// Settings for the `calltree` command.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// How many levels below the root are expanded (default: 3)
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Per-request timeout in seconds (default: 30)
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Direction used when the command line does not give one
    #[serde(default)]
    pub direction: Direction,

    /// Server definitions keyed by language ID (e.g., "rust", "python")
    #[serde(default)]
    pub server: HashMap<String, ServerConfig>,
}

/// How to start one language server.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// The command to execute (e.g., "rust-analyzer")
    pub command: String,

    /// Arguments to pass to the command
    #[serde(default)]
    pub args: Vec<String>,
}

impl ServerConfig {
    /// Splits a shell-style `"program arg arg"` string on whitespace.
    ///
    /// Returns `None` if the string is blank.
    #[must_use]
    pub fn parse(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace();
        let command = parts.next()?.to_string();

        Some(Self {
            command,
            args: parts.map(ToString::to_string).collect(),
        })
    }
}

const fn default_max_depth() -> usize {
    3
}

const fn default_request_timeout() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            request_timeout: default_request_timeout(),
            direction: Direction::default(),
            server: HashMap::new(),
        }
    }
}

impl Config {
    /// Load configuration from standard paths or a specific file.
    ///
    /// Later sources win: defaults, then `~/.config/calltree/config.toml`,
    /// then `explicit_file`, then `CALLTREE_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be read or holds invalid values.
    pub fn load(explicit_file: Option<PathBuf>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // 1. Start with defaults
        builder = builder
            .set_default("max_depth", 3)?
            .set_default("request_timeout", 30)?
            .set_default("direction", Direction::default().as_str())?;

        // 2. Load from user config directory (~/.config/calltree/config.toml)
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("calltree").join("config.toml");
            if config_path.exists() {
                builder = builder.add_source(config::File::from(config_path));
            }
        }

        // 3. Load from explicit file if provided
        if let Some(path) = explicit_file {
            builder = builder.add_source(config::File::from(path));
        }

        // 4. Load from environment variables (CALLTREE_MAX_DEPTH, etc.)
        builder = builder.add_source(config::Environment::with_prefix("CALLTREE"));

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Request timeout as a [`Duration`].
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Server configured for the language of `path`, if any.
    #[must_use]
    pub fn server_for(&self, path: &Path) -> Option<&ServerConfig> {
        self.server.get(language_id(path))
    }
}
