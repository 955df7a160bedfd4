//! Go symbol and import extraction.
//!
//! Strategy:
//! - Walk the Tree-sitter parse tree over top-level declarations only, no
//!   `Query` API (version-agnostic across grammar releases).
//! - Emit one [`Symbol`] per top-level declaration: functions, methods (with
//!   the receiver type rendered to text), type/interface/struct, var, const.
//! - Emit one `imports` relation per import spec.
//! - Track leading comment blocks so symbols carry a one-line doc summary and
//!   function chunks can start at the doc comment.

use crate::errors::ExtractError;
use crate::types::{Relation, RelationKind, RelationSource, Symbol, SymbolKind};
use tracing::trace;
use tree_sitter::{Node, Parser};

/// One function or method declaration with enough span information for
/// text-index chunks and vector chunks.
#[derive(Debug, Clone)]
pub struct GoFunction {
    /// `Foo` for functions, `Server.Start` for methods.
    pub name: String,
    /// Receiver type text (`*Server`), empty for plain functions.
    pub recv: String,
    /// 1-based line of the declaration keyword.
    pub line: u32,
    /// 1-based line where the chunk starts: the doc comment when present,
    /// else the declaration.
    pub chunk_line: u32,
    /// 1-based inclusive last line of the declaration body.
    pub end_line: u32,
    /// Source text from `chunk_line` through `end_line`.
    pub text: String,
}

impl GoFunction {
    pub fn is_method(&self) -> bool {
        !self.recv.is_empty()
    }
}

/// Extraction result for one Go file.
#[derive(Debug, Clone, Default)]
pub struct GoFileIndex {
    /// Package name from the `package` clause.
    pub package: String,
    pub symbols: Vec<Symbol>,
    pub imports: Vec<Relation>,
    pub functions: Vec<GoFunction>,
}

/// Reusable Go extractor holding a configured parser.
pub struct GoExtractor {
    parser: Parser,
}

impl GoExtractor {
    /// Builds a parser bound to the Go grammar.
    ///
    /// # Errors
    /// Returns [`ExtractError::Grammar`] when the grammar version is
    /// incompatible with the linked tree-sitter runtime.
    pub fn new() -> Result<Self, ExtractError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_go::LANGUAGE.into())
            .map_err(|e| ExtractError::Grammar(e.to_string()))?;
        Ok(Self { parser })
    }

    /// Extracts symbols, imports and function spans from one file.
    ///
    /// `pkg_ref` is the importing package reference used as `from_ref` on
    /// import relations: the real import path when package metadata is
    /// available, else the file's directory.
    ///
    /// # Errors
    /// Returns [`ExtractError::Parse`] when the parser produces no tree.
    pub fn extract(
        &mut self,
        code: &str,
        rel_path: &str,
        pkg_ref: &str,
    ) -> Result<GoFileIndex, ExtractError> {
        let tree = self
            .parser
            .parse(code, None)
            .ok_or_else(|| ExtractError::Parse(format!("no parse tree for {rel_path}")))?;
        let root = tree.root_node();

        let mut out = GoFileIndex::default();
        let bytes = code.as_bytes();

        // Pending contiguous comment block directly above the next declaration.
        let mut pending_doc: Option<(u32, u32, String)> = None; // (start_line, end_line, summary)

        let mut cursor = root.walk();
        for node in root.children(&mut cursor) {
            match node.kind() {
                "comment" => {
                    let line = node.start_position().row as u32 + 1;
                    let end = node.end_position().row as u32 + 1;
                    let text = node_text(node, bytes);
                    pending_doc = match pending_doc.take() {
                        // Extend a block that ends on the previous line.
                        Some((s, e, summary)) if e + 1 == line => {
                            let summary = if summary.is_empty() {
                                comment_summary(&text)
                            } else {
                                summary
                            };
                            Some((s, end, summary))
                        }
                        _ => Some((line, end, comment_summary(&text))),
                    };
                    continue;
                }
                "package_clause" => {
                    if let Some(ident) = first_child_of_kind(node, "package_identifier") {
                        out.package = node_text(ident, bytes);
                    }
                }
                "import_declaration" => {
                    collect_imports(node, bytes, rel_path, pkg_ref, &mut out.imports);
                }
                "function_declaration" => {
                    let pkg = out.package.clone();
                    self.emit_function(node, bytes, code, rel_path, &pkg, None, &pending_doc, &mut out);
                }
                "method_declaration" => {
                    let pkg = out.package.clone();
                    let recv = receiver_type(node, bytes);
                    self.emit_function(node, bytes, code, rel_path, &pkg, Some(recv), &pending_doc, &mut out);
                }
                "type_declaration" => {
                    collect_type_specs(node, bytes, rel_path, &out.package, &pending_doc, &mut out.symbols);
                }
                "var_declaration" => {
                    collect_value_specs(node, bytes, "var_spec", SymbolKind::Var, rel_path, &out.package, &pending_doc, &mut out.symbols);
                }
                "const_declaration" => {
                    collect_value_specs(node, bytes, "const_spec", SymbolKind::Const, rel_path, &out.package, &pending_doc, &mut out.symbols);
                }
                _ => {}
            }
            // A non-comment node consumes the pending block either way: it no
            // longer documents what follows.
            pending_doc = None;
        }

        trace!(
            "GoExtractor::extract file={} symbols={} imports={} functions={}",
            rel_path,
            out.symbols.len(),
            out.imports.len(),
            out.functions.len()
        );
        Ok(out)
    }

    #[allow(clippy::too_many_arguments)]
    fn emit_function(
        &self,
        node: Node,
        bytes: &[u8],
        code: &str,
        rel_path: &str,
        pkg: &str,
        recv: Option<String>,
        pending_doc: &Option<(u32, u32, String)>,
        out: &mut GoFileIndex,
    ) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let ident = node_text(name_node, bytes);
        let line = node.start_position().row as u32 + 1;
        let end_line = node.end_position().row as u32 + 1;
        let recv = recv.unwrap_or_default();

        let (doc, doc_start) = doc_for(pending_doc, line);
        let kind = if recv.is_empty() {
            SymbolKind::Func
        } else {
            SymbolKind::Method
        };
        out.symbols.push(Symbol {
            name: ident.clone(),
            kind,
            file: rel_path.to_string(),
            line,
            pkg: pkg.to_string(),
            recv: recv.clone(),
            doc,
        });

        let chunk_line = doc_start.unwrap_or(line);
        let chunk_name = if recv.is_empty() {
            ident
        } else {
            format!("{}.{ident}", recv.trim_start_matches('*'))
        };
        let text = line_range_text(code, chunk_line, end_line);
        out.functions.push(GoFunction {
            name: chunk_name,
            recv,
            line,
            chunk_line,
            end_line,
            text,
        });
    }
}

/// Receiver type rendered to text, e.g. `*Server` from `(s *Server)`.
fn receiver_type(node: Node, bytes: &[u8]) -> String {
    let Some(recv) = node.child_by_field_name("receiver") else {
        return String::new();
    };
    let mut cursor = recv.walk();
    for param in recv.children(&mut cursor) {
        if param.kind() == "parameter_declaration" {
            if let Some(ty) = param.child_by_field_name("type") {
                return node_text(ty, bytes);
            }
            // Unnamed receiver: the whole declaration is the type.
            return node_text(param, bytes);
        }
    }
    String::new()
}

fn collect_imports(
    node: Node,
    bytes: &[u8],
    rel_path: &str,
    pkg_ref: &str,
    out: &mut Vec<Relation>,
) {
    let mut stack = vec![node];
    while let Some(n) = stack.pop() {
        if n.kind() == "import_spec" {
            if let Some(path) = n.child_by_field_name("path") {
                let raw = node_text(path, bytes);
                let to_ref = raw.trim_matches('"').trim_matches('`').to_string();
                out.push(Relation {
                    from_ref: pkg_ref.to_string(),
                    to_ref,
                    kind: RelationKind::Imports,
                    file: rel_path.to_string(),
                    line: n.start_position().row as u32 + 1,
                    source: RelationSource::Ast,
                    confidence: 1.0,
                });
            }
            continue;
        }
        let mut cursor = n.walk();
        let children: Vec<Node> = n.children(&mut cursor).collect();
        for c in children.into_iter().rev() {
            stack.push(c);
        }
    }
}

fn collect_type_specs(
    node: Node,
    bytes: &[u8],
    rel_path: &str,
    pkg: &str,
    pending_doc: &Option<(u32, u32, String)>,
    out: &mut Vec<Symbol>,
) {
    let decl_line = node.start_position().row as u32 + 1;
    let (doc, _) = doc_for(pending_doc, decl_line);
    let mut cursor = node.walk();
    for spec in node.children(&mut cursor) {
        if spec.kind() != "type_spec" && spec.kind() != "type_alias" {
            continue;
        }
        let Some(name_node) = spec.child_by_field_name("name") else {
            continue;
        };
        let kind = match spec.child_by_field_name("type").map(|t| t.kind()) {
            Some("struct_type") => SymbolKind::Struct,
            Some("interface_type") => SymbolKind::Interface,
            _ => SymbolKind::Type,
        };
        out.push(Symbol {
            name: node_text(name_node, bytes),
            kind,
            file: rel_path.to_string(),
            line: spec.start_position().row as u32 + 1,
            pkg: pkg.to_string(),
            recv: String::new(),
            doc: doc.clone(),
        });
    }
}

#[allow(clippy::too_many_arguments)]
fn collect_value_specs(
    node: Node,
    bytes: &[u8],
    spec_kind: &str,
    kind: SymbolKind,
    rel_path: &str,
    pkg: &str,
    pending_doc: &Option<(u32, u32, String)>,
    out: &mut Vec<Symbol>,
) {
    let decl_line = node.start_position().row as u32 + 1;
    let (doc, _) = doc_for(pending_doc, decl_line);
    let mut stack = vec![node];
    while let Some(n) = stack.pop() {
        if n.kind() == spec_kind {
            let mut cursor = n.walk();
            for name_node in n.children_by_field_name("name", &mut cursor) {
                out.push(Symbol {
                    name: node_text(name_node, bytes),
                    kind,
                    file: rel_path.to_string(),
                    line: n.start_position().row as u32 + 1,
                    pkg: pkg.to_string(),
                    recv: String::new(),
                    doc: doc.clone(),
                });
            }
            continue;
        }
        let mut cursor = n.walk();
        let children: Vec<Node> = n.children(&mut cursor).collect();
        for c in children.into_iter().rev() {
            stack.push(c);
        }
    }
}

/// Returns (doc summary, doc start line) when the pending comment block ends
/// on the line directly above `decl_line`.
fn doc_for(pending: &Option<(u32, u32, String)>, decl_line: u32) -> (String, Option<u32>) {
    match pending {
        Some((start, end, summary)) if *end + 1 == decl_line => {
            (summary.clone(), Some(*start))
        }
        _ => (String::new(), None),
    }
}

/// First non-empty line of a comment with markers stripped.
fn comment_summary(comment: &str) -> String {
    for line in comment.lines() {
        let line = line
            .trim()
            .trim_start_matches("//")
            .trim_start_matches("/*")
            .trim_end_matches("*/")
            .trim();
        if !line.is_empty() {
            return line.to_string();
        }
    }
    String::new()
}

fn first_child_of_kind<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).find(|c| c.kind() == kind)
}

fn node_text(node: Node, bytes: &[u8]) -> String {
    node.utf8_text(bytes).unwrap_or_default().to_string()
}

/// Inclusive 1-based line range slice of `code`.
fn line_range_text(code: &str, start: u32, end: u32) -> String {
    code.lines()
        .skip(start.saturating_sub(1) as usize)
        .take((end.saturating_sub(start) + 1) as usize)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"package indexer

import (
	"fmt"
	"strings"
)

// Server owns the index lifecycle.
// Second doc line.
type Server struct {
	name string
}

// Greeter is implemented by anything that greets.
type Greeter interface {
	Greet() string
}

type Alias = Server

// MaxRetries bounds reconnect attempts.
const MaxRetries = 3

var DefaultName, FallbackName = "a", "b"

// Start boots the server.
func Start() error {
	return fmt.Errorf("nope: %s", strings.ToUpper("x"))
}

func (s *Server) Stop() {
}
"#;

    fn extract(code: &str) -> GoFileIndex {
        GoExtractor::new()
            .unwrap()
            .extract(code, "pkg/indexer/server.go", "pkg/indexer")
            .unwrap()
    }

    #[test]
    fn package_and_symbols() {
        let idx = extract(SAMPLE);
        assert_eq!(idx.package, "indexer");

        let find = |name: &str| idx.symbols.iter().find(|s| s.name == name).unwrap();
        assert_eq!(find("Server").kind, SymbolKind::Struct);
        assert_eq!(find("Greeter").kind, SymbolKind::Interface);
        assert_eq!(find("Alias").kind, SymbolKind::Type);
        assert_eq!(find("MaxRetries").kind, SymbolKind::Const);
        assert_eq!(find("DefaultName").kind, SymbolKind::Var);
        assert_eq!(find("FallbackName").kind, SymbolKind::Var);
        assert_eq!(find("Start").kind, SymbolKind::Func);
        assert_eq!(find("Stop").kind, SymbolKind::Method);
        assert_eq!(find("Stop").recv, "*Server");
        for s in &idx.symbols {
            assert!(s.line >= 1, "line must be 1-based: {s:?}");
            assert_eq!(s.pkg, "indexer");
        }
    }

    #[test]
    fn doc_summaries_are_first_lines() {
        let idx = extract(SAMPLE);
        let server = idx.symbols.iter().find(|s| s.name == "Server").unwrap();
        assert_eq!(server.doc, "Server owns the index lifecycle.");
        let start = idx.symbols.iter().find(|s| s.name == "Start").unwrap();
        assert_eq!(start.doc, "Start boots the server.");
        let stop = idx.symbols.iter().find(|s| s.name == "Stop").unwrap();
        assert_eq!(stop.doc, "");
    }

    #[test]
    fn imports_carry_ast_provenance() {
        let idx = extract(SAMPLE);
        let paths: Vec<&str> = idx.imports.iter().map(|r| r.to_ref.as_str()).collect();
        assert_eq!(paths, vec!["fmt", "strings"]);
        for r in &idx.imports {
            assert_eq!(r.from_ref, "pkg/indexer");
            assert_eq!(r.kind, RelationKind::Imports);
            assert_eq!(r.source, RelationSource::Ast);
            assert_eq!(r.confidence, 1.0);
            assert_eq!(r.file, "pkg/indexer/server.go");
        }
    }

    #[test]
    fn function_chunks_include_doc_and_receiver_names() {
        let idx = extract(SAMPLE);
        let start = idx.functions.iter().find(|f| f.name == "Start").unwrap();
        assert!(start.chunk_line < start.line, "chunk starts at the doc comment");
        assert!(start.text.starts_with("// Start boots the server."));
        assert!(start.end_line > start.line);

        let stop = idx.functions.iter().find(|f| f.name == "Server.Stop").unwrap();
        assert!(stop.is_method());
        assert_eq!(stop.chunk_line, stop.line);
    }

    #[test]
    fn comment_only_file_has_no_symbols() {
        let idx = extract("package p\n\n// just a comment\n");
        assert_eq!(idx.package, "p");
        assert!(idx.symbols.is_empty());
        assert!(idx.functions.is_empty());
    }

    #[test]
    fn symbol_exact_match_scenario_lines() {
        let idx = extract("package p\nfunc Foo(){}\nfunc FooBar(){}\n");
        let foo = idx.symbols.iter().find(|s| s.name == "Foo").unwrap();
        let foobar = idx.symbols.iter().find(|s| s.name == "FooBar").unwrap();
        assert_eq!(foo.line, 2);
        assert_eq!(foobar.line, 3);
    }
}
