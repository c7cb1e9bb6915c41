// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Document identity helpers: paths to URIs, language ids, open/close params.

use anyhow::{Context, Result, anyhow};
use lsp_types::{
    DidCloseTextDocumentParams, DidOpenTextDocumentParams, TextDocumentIdentifier,
    TextDocumentItem, Uri,
};
use std::path::Path;
use tokio::fs;
use tracing::debug;
use url::Url;

/// Builds a `file:` URI for `path`, resolving it against the working
/// directory first if it is relative.
///
/// # Errors
///
/// Returns an error if the path cannot be made absolute or expressed as a URI.
pub fn path_to_uri(path: &Path) -> Result<Uri> {
    let absolute = std::path::absolute(path)
        .with_context(|| format!("Cannot resolve path: {}", path.display()))?;
    let url = Url::from_file_path(&absolute)
        .map_err(|()| anyhow!("Invalid path for URI: {}", absolute.display()))?;

    url.as_str()
        .parse()
        .map_err(|e| anyhow!("Invalid path for URI: {}: {}", absolute.display(), e))
}

/// LSP language id for a file, by extension.
#[must_use]
pub fn language_id(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("rs") => "rust",
        Some("go") => "go",
        Some("py") => "python",
        Some("js" | "mjs" | "cjs") => "javascript",
        Some("ts" | "mts" | "cts") => "typescript",
        Some("tsx") => "typescriptreact",
        Some("jsx") => "javascriptreact",
        Some("c") => "c",
        Some("cpp" | "cc" | "cxx" | "h" | "hpp") => "cpp",
        Some("java") => "java",
        Some("kt" | "kts") => "kotlin",
        Some("cs") => "csharp",
        Some("rb") => "ruby",
        Some("php") => "php",
        Some("swift") => "swift",
        Some("lua") => "lua",
        Some("sh" | "bash" | "zsh") => "shellscript",
        _ => "plaintext",
    }
}

/// Reads `path` and builds the `didOpen` notification for it.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub async fn open_params(path: &Path) -> Result<DidOpenTextDocumentParams> {
    let text = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let language_id = language_id(path);

    debug!("Opening document: {} ({})", path.display(), language_id);

    Ok(DidOpenTextDocumentParams {
        text_document: TextDocumentItem {
            uri: path_to_uri(path)?,
            language_id: language_id.to_string(),
            version: 1,
            text,
        },
    })
}

/// Builds the `didClose` notification for `uri`.
#[must_use]
pub const fn close_params(uri: Uri) -> DidCloseTextDocumentParams {
    DidCloseTextDocumentParams {
        text_document: TextDocumentIdentifier { uri },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::{PathStyle, uri_to_path};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_open_params() -> Result<()> {
        let mut file = NamedTempFile::with_suffix(".rs")?;
        writeln!(file, "fn main() {{}}")?;

        let params = open_params(file.path()).await?;

        assert_eq!(params.text_document.language_id, "rust");
        assert_eq!(params.text_document.version, 1);
        assert!(params.text_document.text.contains("fn main()"));
        assert!(params.text_document.uri.as_str().starts_with("file:///"));
        Ok(())
    }

    #[tokio::test]
    async fn test_open_params_missing_file() {
        let result = open_params(Path::new("/definitely/not/here.rs")).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_language_id() {
        assert_eq!(language_id(Path::new("test.rs")), "rust");
        assert_eq!(language_id(Path::new("test.py")), "python");
        assert_eq!(language_id(Path::new("test.ts")), "typescript");
        assert_eq!(language_id(Path::new("test.hpp")), "cpp");
        assert_eq!(language_id(Path::new("test.bash")), "shellscript");
        assert_eq!(language_id(Path::new("test.unknown")), "plaintext");
        assert_eq!(language_id(Path::new("noextension")), "plaintext");
    }

    #[cfg(not(windows))]
    #[test]
    fn test_path_to_uri_round_trip() -> Result<()> {
        let uri = path_to_uri(Path::new("/home/user/my project/test.rs"))?;
        assert_eq!(uri.as_str(), "file:///home/user/my%20project/test.rs");
        assert_eq!(
            uri_to_path(uri.as_str(), PathStyle::Native),
            "/home/user/my project/test.rs"
        );
        Ok(())
    }

    #[test]
    fn test_path_to_uri_relative() -> Result<()> {
        let uri = path_to_uri(Path::new("src/lib.rs"))?;
        assert!(uri.as_str().starts_with("file:///"));
        assert!(uri.as_str().ends_with("/src/lib.rs"));
        Ok(())
    }
}
