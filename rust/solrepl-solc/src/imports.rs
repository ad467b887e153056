//! Import resolution: filesystem lookup over ordered roots, and transitive
//! collection of imported source units for a standard-JSON submission.

use once_cell::sync::Lazy;
use regex::Regex;
use solrepl_synth::{ImportError, ImportResolver};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

/// Resolves imports against ordered search roots: the project root first,
/// then dependency directories.
#[derive(Debug, Clone)]
pub struct FsImportResolver {
    roots: Vec<PathBuf>,
}

impl FsImportResolver {
    /// `<root>` then `<root>/node_modules`.
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        let root = project_root.into();
        let deps = root.join("node_modules");
        Self {
            roots: vec![root, deps],
        }
    }

    pub fn with_roots(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    pub fn add_root(&mut self, root: PathBuf) {
        if !self.roots.contains(&root) {
            self.roots.push(root);
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

impl ImportResolver for FsImportResolver {
    fn resolve(&self, path: &str) -> Result<String, ImportError> {
        let candidates: Vec<PathBuf> = self.roots.iter().map(|root| root.join(path)).collect();
        for candidate in &candidates {
            if candidate.is_file() {
                return std::fs::read_to_string(candidate).map_err(|source| ImportError::Io {
                    path: candidate.clone(),
                    source,
                });
            }
        }
        Err(ImportError::NotFound {
            path: path.to_string(),
            searched: candidates,
        })
    }
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

static IMPORT_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^\s*import\s+(?:[^'";]*?\bfrom\s+)?["'](?P<path>[^"']+)["']"#)
        .expect("valid import pattern")
});

/// Paths named by the import directives of `source`, in order.
pub fn import_paths(source: &str) -> Vec<&str> {
    IMPORT_PATH
        .captures_iter(source)
        .filter_map(|caps| caps.name("path"))
        .map(|m| m.as_str())
        .collect()
}

/// Unit name an import refers to, seen from the importing unit.
/// `./` and `../` paths are relative to the importer's directory.
pub fn unit_name(importer: &str, path: &str) -> String {
    if !(path.starts_with("./") || path.starts_with("../")) {
        return path.to_string();
    }
    let base = Path::new(importer).parent().unwrap_or_else(|| Path::new(""));
    let mut parts: Vec<String> = Vec::new();
    for component in base.join(path).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop();
            }
            other => parts.push(other.as_os_str().to_string_lossy().into_owned()),
        }
    }
    parts.join("/")
}

/// A unit that could not be loaded.
#[derive(Debug)]
pub struct Unresolved {
    pub unit: String,
    pub error: ImportError,
}

/// Load `root_source` and everything it imports, transitively.
pub fn collect_sources(
    root_name: &str,
    root_source: &str,
    resolver: &dyn ImportResolver,
) -> (BTreeMap<String, String>, Vec<Unresolved>) {
    let mut sources = BTreeMap::new();
    let mut unresolved = Vec::new();
    let mut pending = vec![(root_name.to_string(), root_source.to_string())];

    while let Some((name, content)) = pending.pop() {
        for path in import_paths(&content) {
            let unit = unit_name(&name, path);
            if unit == name
                || sources.contains_key(&unit)
                || pending.iter().any(|(n, _)| n == &unit)
                || unresolved.iter().any(|u: &Unresolved| u.unit == unit)
            {
                continue;
            }
            match resolver.resolve(&unit) {
                Ok(text) => pending.push((unit, text)),
                Err(error) => unresolved.push(Unresolved { unit, error }),
            }
        }
        sources.insert(name, content);
    }

    (sources, unresolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_import_paths() {
        let src = r#"
import "./A.sol";
import {B, C} from "lib/B.sol";
import * as D from './D.sol';
import "E.sol" as E;
contract X { string s = "import \"nope.sol\""; }
"#;
        assert_eq!(import_paths(src), vec!["./A.sol", "lib/B.sol", "./D.sol", "E.sol"]);
    }

    #[test]
    fn relative_unit_names() {
        assert_eq!(unit_name("main.sol", "./A.sol"), "A.sol");
        assert_eq!(unit_name("lib/x/B.sol", "../C.sol"), "lib/C.sol");
        assert_eq!(unit_name("lib/B.sol", "./sub/D.sol"), "lib/sub/D.sol");
        assert_eq!(unit_name("lib/B.sol", "@oz/E.sol"), "@oz/E.sol");
    }

    #[test]
    fn collects_transitively_and_reports_missing() {
        let files = |path: &str| match path {
            "A.sol" => Some("import \"./lib/B.sol\";\ncontract A {}".to_string()),
            "lib/B.sol" => Some("import \"../A.sol\";\nimport \"./Gone.sol\";\nlibrary B {}".to_string()),
            _ => None,
        };
        let (sources, unresolved) =
            collect_sources("main.sol", "import \"./A.sol\";\ncontract Main {}", &files);

        let names: Vec<&str> = sources.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["A.sol", "lib/B.sol", "main.sol"]);
        assert_eq!(unresolved.len(), 1);
        assert_eq!(unresolved[0].unit, "lib/Gone.sol");
    }
}
