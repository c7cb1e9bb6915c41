// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Conversion of protocol call hierarchy items into display entries.
//!
//! Every function here is total: unknown symbol kinds, unknown tags and
//! URIs that are not `file:` URIs all map to deterministic fallbacks.

use lsp_types::{CallHierarchyItem, Position, SymbolKind, SymbolTag};
use percent_encoding::percent_decode_str;
use serde::Serialize;
use url::Url;

/// Icon used for symbol kinds without an entry in the icon table.
pub const FALLBACK_ICON: &str = "type-symbol";

/// Label used for tag codes without an entry in the tag table.
pub const UNKNOWN_TAG: &str = "unknown";

/// Symbol kind to icon label.
const KIND_ICONS: &[(SymbolKind, &str)] = &[
    (SymbolKind::ARRAY, "type-array"),
    (SymbolKind::BOOLEAN, "type-boolean"),
    (SymbolKind::CLASS, "type-class"),
    (SymbolKind::CONSTANT, "type-constant"),
    (SymbolKind::CONSTRUCTOR, "type-constructor"),
    (SymbolKind::ENUM, "type-enum"),
    (SymbolKind::ENUM_MEMBER, "type-constant"),
    (SymbolKind::FIELD, "type-field"),
    (SymbolKind::FILE, "type-file"),
    (SymbolKind::FUNCTION, "type-function"),
    (SymbolKind::INTERFACE, "type-interface"),
    (SymbolKind::METHOD, "type-method"),
    (SymbolKind::MODULE, "type-module"),
    (SymbolKind::NAMESPACE, "type-namespace"),
    (SymbolKind::NUMBER, "type-number"),
    (SymbolKind::PACKAGE, "type-package"),
    (SymbolKind::PROPERTY, "type-property"),
    (SymbolKind::STRING, "type-string"),
    (SymbolKind::STRUCT, "type-class"),
    (SymbolKind::VARIABLE, "type-variable"),
];

/// Symbol tag to label.
const TAG_LABELS: &[(SymbolTag, &str)] = &[(SymbolTag::DEPRECATED, "deprecated")];

/// Zero-based row/column position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct Point {
    /// Zero-based line.
    pub row: u32,
    /// Zero-based character offset within the line.
    pub column: u32,
}

impl Point {
    /// Creates a point.
    #[must_use]
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }
}

impl From<Position> for Point {
    fn from(position: Position) -> Self {
        Self::new(position.line, position.character)
    }
}

impl From<Point> for Position {
    fn from(point: Point) -> Self {
        Self::new(point.row, point.column)
    }
}

/// Half-open span between two points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Range {
    /// Start of the span.
    pub start: Point,
    /// End of the span.
    pub end: Point,
}

impl Range {
    /// Creates a range from `(row, column)` pairs.
    #[must_use]
    pub const fn new(start: (u32, u32), end: (u32, u32)) -> Self {
        Self {
            start: Point::new(start.0, start.1),
            end: Point::new(end.0, end.1),
        }
    }
}

impl From<lsp_types::Range> for Range {
    fn from(range: lsp_types::Range) -> Self {
        Self {
            start: range.start.into(),
            end: range.end.into(),
        }
    }
}

/// Separator convention used when rendering file URIs as paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathStyle {
    /// `/`-separated paths.
    Posix,
    /// `\`-separated paths with drive letters and UNC hosts.
    Windows,
    /// Whichever of the two the current target uses.
    #[default]
    Native,
}

impl PathStyle {
    /// Resolves [`PathStyle::Native`] to a concrete style.
    #[must_use]
    pub const fn resolve(self) -> Self {
        match self {
            Self::Native if cfg!(windows) => Self::Windows,
            Self::Native => Self::Posix,
            style => style,
        }
    }
}

/// A call hierarchy item ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertedEntry {
    /// Absolute file-system path of the item's document.
    pub path: String,
    /// Symbol name.
    pub name: String,
    /// Icon label derived from the symbol kind.
    pub icon: String,
    /// Labels derived from the symbol tags.
    pub tags: Vec<String>,
    /// Server-provided detail, empty when absent.
    pub detail: String,
    /// Full extent of the symbol.
    pub range: Range,
    /// Extent of the symbol's name.
    pub selection_range: Range,
    /// The item as the server sent it.
    pub raw_data: CallHierarchyItem,
}

impl ConvertedEntry {
    /// Returns true if the item carries the deprecated tag.
    #[must_use]
    pub fn is_deprecated(&self) -> bool {
        self.tags.iter().any(|tag| tag == "deprecated")
    }
}

/// Converts a protocol item, keeping the original as `raw_data`.
#[must_use]
pub fn convert_item(item: CallHierarchyItem, style: PathStyle) -> ConvertedEntry {
    ConvertedEntry {
        path: uri_to_path(item.uri.as_str(), style),
        name: item.name.clone(),
        icon: symbol_kind_icon(item.kind).to_string(),
        tags: item
            .tags
            .iter()
            .flatten()
            .map(|tag| symbol_tag_label(tag).to_string())
            .collect(),
        detail: item.detail.clone().unwrap_or_default(),
        range: item.range.into(),
        selection_range: item.selection_range.into(),
        raw_data: item,
    }
}

/// Icon label for a symbol kind.
#[must_use]
pub fn symbol_kind_icon(kind: SymbolKind) -> &'static str {
    KIND_ICONS
        .iter()
        .find(|(known, _)| *known == kind)
        .map_or(FALLBACK_ICON, |&(_, icon)| icon)
}

/// Label for a symbol tag.
#[must_use]
pub fn symbol_tag_label(tag: &SymbolTag) -> &'static str {
    TAG_LABELS
        .iter()
        .find(|(known, _)| known == tag)
        .map_or(UNKNOWN_TAG, |&(_, label)| label)
}

/// Renders a `file:` URI as an absolute path in the given style.
///
/// Anything that does not parse as a `file:` URI is returned verbatim.
#[must_use]
pub fn uri_to_path(uri: &str, style: PathStyle) -> String {
    file_uri_to_path(uri, style.resolve()).unwrap_or_else(|| uri.to_string())
}

fn file_uri_to_path(uri: &str, style: PathStyle) -> Option<String> {
    let url = Url::parse(uri).ok()?;
    if url.scheme() != "file" {
        return None;
    }

    let path = percent_decode_str(url.path()).decode_utf8().ok()?;
    let host = url
        .host_str()
        .filter(|host| !host.is_empty() && *host != "localhost");

    if style == PathStyle::Windows {
        let path = path.replace('/', "\\");
        return Some(match host {
            Some(host) => format!("\\\\{host}{path}"),
            None => strip_drive_slash(&path).to_string(),
        });
    }

    Some(match host {
        Some(host) => format!("//{host}{path}"),
        None => path.into_owned(),
    })
}

/// `\C:\dir` -> `C:\dir`; anything else is unchanged.
fn strip_drive_slash(path: &str) -> &str {
    match path.strip_prefix('\\') {
        Some(rest) if starts_with_drive(rest) => rest,
        _ => path,
    }
}

fn starts_with_drive(path: &str) -> bool {
    let mut chars = path.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(letter), Some(':')) if letter.is_ascii_alphabetic()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use lsp_types::Uri;

    fn hello_item() -> Result<CallHierarchyItem> {
        Ok(CallHierarchyItem {
            name: "hello".to_string(),
            kind: SymbolKind::FUNCTION,
            tags: None,
            detail: Some(String::new()),
            uri: "file:///C:/path/to/file.ts".parse::<Uri>()?,
            range: lsp_types::Range::new(Position::new(0, 0), Position::new(1, 1)),
            selection_range: lsp_types::Range::new(Position::new(0, 24), Position::new(0, 29)),
            data: None,
        })
    }

    #[test]
    fn test_convert_item_copies_fields() -> Result<()> {
        let item = hello_item()?;
        let entry = convert_item(item.clone(), PathStyle::Windows);

        assert_eq!(entry.path, "C:\\path\\to\\file.ts");
        assert_eq!(entry.name, "hello");
        assert_eq!(entry.icon, "type-function");
        assert!(entry.tags.is_empty());
        assert_eq!(entry.detail, "");
        assert_eq!(entry.range, Range::new((0, 0), (1, 1)));
        assert_eq!(entry.selection_range, Range::new((0, 24), (0, 29)));
        assert_eq!(entry.raw_data, item);
        Ok(())
    }

    #[test]
    fn test_convert_item_native_path() -> Result<()> {
        let entry = convert_item(hello_item()?, PathStyle::Native);
        if cfg!(windows) {
            assert_eq!(entry.path, "C:\\path\\to\\file.ts");
        } else {
            assert_eq!(entry.path, "/C:/path/to/file.ts");
        }
        Ok(())
    }

    #[test]
    fn test_path_style_resolve() {
        assert_eq!(PathStyle::default(), PathStyle::Native);
        assert_eq!(PathStyle::Posix.resolve(), PathStyle::Posix);
        assert_eq!(PathStyle::Windows.resolve(), PathStyle::Windows);
        let native = if cfg!(windows) { PathStyle::Windows } else { PathStyle::Posix };
        assert_eq!(PathStyle::Native.resolve(), native);
    }

    #[test]
    fn test_convert_item_deprecated_tag() -> Result<()> {
        let mut item = hello_item()?;
        item.tags = Some(vec![SymbolTag::DEPRECATED]);

        let entry = convert_item(item, PathStyle::Posix);
        assert_eq!(entry.tags, vec!["deprecated".to_string()]);
        assert!(entry.is_deprecated());
        Ok(())
    }

    #[test]
    fn test_convert_item_missing_detail_is_empty() -> Result<()> {
        let mut item = hello_item()?;
        item.detail = None;
        assert_eq!(convert_item(item, PathStyle::Posix).detail, "");
        Ok(())
    }

    #[test]
    fn test_convert_item_unknown_codes_from_wire() -> Result<()> {
        let item: CallHierarchyItem = serde_json::from_value(serde_json::json!({
            "name": "mystery",
            "kind": 99,
            "tags": [1, 42],
            "uri": "file:///src/lib.rs",
            "range": { "start": { "line": 3, "character": 0 }, "end": { "line": 9, "character": 1 } },
            "selectionRange": { "start": { "line": 3, "character": 7 }, "end": { "line": 3, "character": 14 } }
        }))?;

        let entry = convert_item(item, PathStyle::Posix);
        assert_eq!(entry.icon, FALLBACK_ICON);
        assert_eq!(entry.tags, vec!["deprecated", UNKNOWN_TAG]);
        assert_eq!(entry.path, "/src/lib.rs");
        Ok(())
    }

    #[test]
    fn test_symbol_tag_labels_borrow_tags() -> Result<()> {
        let tags: Vec<SymbolTag> = serde_json::from_value(serde_json::json!([1, 7]))?;
        let labels: Vec<&str> = tags.iter().map(symbol_tag_label).collect();

        assert_eq!(labels, ["deprecated", UNKNOWN_TAG]);
        assert_eq!(tags.len(), 2, "tags are still owned by the caller");
        Ok(())
    }

    #[test]
    fn test_symbol_kind_icons() {
        assert_eq!(symbol_kind_icon(SymbolKind::FUNCTION), "type-function");
        assert_eq!(symbol_kind_icon(SymbolKind::METHOD), "type-method");
        assert_eq!(symbol_kind_icon(SymbolKind::STRUCT), "type-class");
        assert_eq!(symbol_kind_icon(SymbolKind::ENUM_MEMBER), "type-constant");
        assert_eq!(symbol_kind_icon(SymbolKind::OPERATOR), FALLBACK_ICON);
        assert_eq!(symbol_kind_icon(SymbolKind::TYPE_PARAMETER), FALLBACK_ICON);
    }

    #[test]
    fn test_uri_to_path_drive_letter() {
        let uri = "file:///C:/path/to/file.ts";
        assert_eq!(uri_to_path(uri, PathStyle::Windows), "C:\\path\\to\\file.ts");
        assert_eq!(uri_to_path(uri, PathStyle::Posix), "/C:/path/to/file.ts");
    }

    #[test]
    fn test_uri_to_path_posix() {
        let uri = "file:///home/user/project/src/main.rs";
        assert_eq!(
            uri_to_path(uri, PathStyle::Posix),
            "/home/user/project/src/main.rs"
        );
        assert_eq!(
            uri_to_path(uri, PathStyle::Windows),
            "\\home\\user\\project\\src\\main.rs"
        );
    }

    #[test]
    fn test_uri_to_path_decodes_percent_escapes() {
        let uri = "file:///home/user/my%20project/caf%C3%A9.rs";
        assert_eq!(
            uri_to_path(uri, PathStyle::Posix),
            "/home/user/my project/café.rs"
        );
        assert_eq!(
            uri_to_path("file:///c%3A/Program%20Files/a.ts", PathStyle::Windows),
            "c:\\Program Files\\a.ts"
        );
    }

    #[test]
    fn test_uri_to_path_unc_host() {
        let uri = "file://fileserver/share/src/a.ts";
        assert_eq!(
            uri_to_path(uri, PathStyle::Windows),
            "\\\\fileserver\\share\\src\\a.ts"
        );
        assert_eq!(
            uri_to_path(uri, PathStyle::Posix),
            "//fileserver/share/src/a.ts"
        );
        assert_eq!(
            uri_to_path("file://localhost/etc/hosts", PathStyle::Posix),
            "/etc/hosts"
        );
    }

    #[test]
    fn test_uri_to_path_non_file_uri_passes_through() {
        assert_eq!(
            uri_to_path("untitled:Untitled-1", PathStyle::Posix),
            "untitled:Untitled-1"
        );
        assert_eq!(
            uri_to_path("https://example.com/a.rs", PathStyle::Windows),
            "https://example.com/a.rs"
        );
        assert_eq!(uri_to_path("", PathStyle::Posix), "");
    }

    #[test]
    fn test_range_preserves_coordinates() {
        let range = lsp_types::Range::new(Position::new(7, 3), Position::new(12, 40));
        let converted = Range::from(range);
        assert_eq!(converted.start, Point::new(7, 3));
        assert_eq!(converted.end, Point::new(12, 40));
        assert_eq!(Position::from(converted.end), Position::new(12, 40));
    }

    #[test]
    fn test_entry_serializes_camel_case() -> Result<()> {
        let entry = convert_item(hello_item()?, PathStyle::Posix);
        let value = serde_json::to_value(&entry)?;
        assert_eq!(value["selectionRange"]["start"]["column"], 24);
        assert_eq!(value["rawData"]["name"], "hello");
        assert_eq!(value["rawData"]["selectionRange"]["start"]["character"], 24);
        Ok(())
    }
}
