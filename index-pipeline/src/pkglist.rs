//! Package-list dependency pass (`go list -json ./...`).
//!
//! Enabled by the balanced/full tiers. Produces package→package
//! `depends_on` relations and a directory→import-path map so import
//! relations can carry the real package reference as `from_ref`.

use code_extract::{Relation, RelationKind, RelationSource};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::process::Command;
use tracing::{debug, warn};

/// One package from the listing.
#[derive(Debug, Clone)]
pub struct GoPackage {
    pub import_path: String,
    /// Repo-relative directory, `.` for the root package.
    pub dir: String,
    pub imports: Vec<String>,
}

/// Result of the package-list pass.
#[derive(Debug, Default)]
pub struct PackageIndex {
    pub packages: Vec<GoPackage>,
    /// Repo-relative directory → import path.
    pub dir_to_import: HashMap<String, String>,
}

impl PackageIndex {
    /// `depends_on` edges, one per (package, import).
    pub fn relations(&self) -> Vec<Relation> {
        let mut out = Vec::new();
        for pkg in &self.packages {
            for imp in &pkg.imports {
                out.push(Relation {
                    from_ref: pkg.import_path.clone(),
                    to_ref: imp.clone(),
                    kind: RelationKind::DependsOn,
                    file: String::new(),
                    line: 0,
                    source: RelationSource::PkgList,
                    confidence: 1.0,
                });
            }
        }
        out
    }

    /// Package reference for a file in `dir`: the import path when known,
    /// else the directory itself (fast-tier behavior).
    pub fn package_ref(&self, dir: &str) -> String {
        self.dir_to_import
            .get(dir)
            .cloned()
            .unwrap_or_else(|| dir.to_string())
    }
}

/// Runs the toolchain listing. Any failure degrades to an empty index: the
/// fast-tier directory references still apply.
pub fn collect_packages(root: &Path) -> PackageIndex {
    let output = match Command::new("go")
        .arg("list")
        .arg("-json")
        .arg("./...")
        .current_dir(root)
        .output()
    {
        Ok(out) if out.status.success() => out,
        Ok(out) => {
            warn!(
                "pkglist: go list exited with {}: {}",
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            );
            return PackageIndex::default();
        }
        Err(e) => {
            debug!("pkglist: go toolchain unavailable ({e})");
            return PackageIndex::default();
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_package_stream(&stdout, root)
}

/// Parses the concatenated JSON objects `go list -json` emits.
fn parse_package_stream(stdout: &str, root: &Path) -> PackageIndex {
    let mut idx = PackageIndex::default();
    let stream = serde_json::Deserializer::from_str(stdout).into_iter::<Value>();
    for item in stream {
        let Ok(v) = item else { break };
        let Some(import_path) = v.get("ImportPath").and_then(Value::as_str) else {
            continue;
        };
        let dir = v
            .get("Dir")
            .and_then(Value::as_str)
            .map(|d| relative_dir(d, root))
            .unwrap_or_default();
        let imports = v
            .get("Imports")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        if !dir.is_empty() {
            idx.dir_to_import.insert(dir.clone(), import_path.to_string());
        }
        idx.packages.push(GoPackage {
            import_path: import_path.to_string(),
            dir,
            imports,
        });
    }
    debug!("pkglist: {} packages", idx.packages.len());
    idx
}

fn relative_dir(dir: &str, root: &Path) -> String {
    let p = Path::new(dir);
    match p.strip_prefix(root) {
        Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
        Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
        Err(_) => dir.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_concatenated_json_objects() {
        let stdout = r#"
{
  "ImportPath": "example.com/mod/a",
  "Dir": "/repo/a",
  "Imports": ["fmt", "example.com/mod/b"]
}
{
  "ImportPath": "example.com/mod/b",
  "Dir": "/repo/b",
  "Imports": []
}
"#;
        let idx = parse_package_stream(stdout, Path::new("/repo"));
        assert_eq!(idx.packages.len(), 2);
        assert_eq!(idx.package_ref("a"), "example.com/mod/a");
        assert_eq!(idx.package_ref("unknown/dir"), "unknown/dir");

        let rels = idx.relations();
        assert_eq!(rels.len(), 2);
        assert_eq!(rels[0].kind, RelationKind::DependsOn);
        assert_eq!(rels[0].source, RelationSource::PkgList);
        assert_eq!(rels[0].from_ref, "example.com/mod/a");
        assert_eq!(rels[0].to_ref, "fmt");
    }

    #[test]
    fn missing_toolchain_degrades_to_empty() {
        let idx = parse_package_stream("", Path::new("/repo"));
        assert!(idx.packages.is_empty());
        assert_eq!(idx.package_ref("pkg"), "pkg");
    }
}
