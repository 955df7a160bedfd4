//! Portable schema shared by the extractors, the relational store and the
//! query engine.
//!
//! Conventions:
//! - `serde(rename_all = "snake_case")` for enums to keep serialized forms stable.
//! - Lines are 1-based; `line` points at the declaration itself, not a
//!   leading doc comment.

use serde::{Deserialize, Serialize};

/// Symbol kind taxonomy for top-level Go declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Func,
    Method,
    Type,
    Interface,
    Struct,
    Var,
    Const,
}

impl SymbolKind {
    /// Stable string form used in the relational store.
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Func => "func",
            SymbolKind::Method => "method",
            SymbolKind::Type => "type",
            SymbolKind::Interface => "interface",
            SymbolKind::Struct => "struct",
            SymbolKind::Var => "var",
            SymbolKind::Const => "const",
        }
    }

    /// Inverse of [`SymbolKind::as_str`]; unknown strings map to `Func`.
    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "method" => SymbolKind::Method,
            "type" => SymbolKind::Type,
            "interface" => SymbolKind::Interface,
            "struct" => SymbolKind::Struct,
            "var" => SymbolKind::Var,
            "const" => SymbolKind::Const,
            _ => SymbolKind::Func,
        }
    }
}

/// One extracted top-level symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    /// Repo-relative file path.
    pub file: String,
    /// 1-based declaration line.
    pub line: u32,
    /// Package name declared by the file.
    pub pkg: String,
    /// Receiver type text for methods (`*Server`), empty otherwise.
    pub recv: String,
    /// First non-empty line of the leading doc comment, if any.
    pub doc: String,
}

/// Relation kinds stored in the `relations` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Imports,
    DependsOn,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::Imports => "imports",
            RelationKind::DependsOn => "depends_on",
        }
    }
}

/// Where a relation edge came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationSource {
    Ast,
    PkgList,
}

impl RelationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationSource::Ast => "ast",
            RelationSource::PkgList => "pkg_list",
        }
    }
}

/// A directed edge between two code references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relation {
    pub from_ref: String,
    pub to_ref: String,
    pub kind: RelationKind,
    pub file: String,
    pub line: u32,
    pub source: RelationSource,
    pub confidence: f32,
}

/// A backtick-quoted identifier mentioned in prose, hinting which code
/// symbols a doc section discusses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocLink {
    pub symbol: String,
    pub file: String,
    pub line: u32,
    pub confidence: f32,
}

impl DocLink {
    pub const SOURCE: &'static str = "markdown";
    pub const CONFIDENCE: f32 = 0.6;
}
