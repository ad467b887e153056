//! Interfaces of the external collaborators: the compiler service that turns a
//! source document into diagnostics or artifacts, and the import resolver it
//! calls back into.

use crate::diagnostics::Diagnostic;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Imports
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("File not found in:\n{}", display_paths(.searched))]
    NotFound { path: String, searched: Vec<PathBuf> },
    #[error("cannot read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Resolves an import path to file contents.
pub trait ImportResolver {
    fn resolve(&self, path: &str) -> Result<String, ImportError>;
}

impl<F> ImportResolver for F
where
    F: Fn(&str) -> Option<String>,
{
    fn resolve(&self, path: &str) -> Result<String, ImportError> {
        self(path).ok_or_else(|| ImportError::NotFound {
            path: path.to_string(),
            searched: Vec::new(),
        })
    }
}

/// Resolver that knows no files.
pub struct NoImports;

impl ImportResolver for NoImports {
    fn resolve(&self, path: &str) -> Result<String, ImportError> {
        Err(ImportError::NotFound {
            path: path.to_string(),
            searched: Vec::new(),
        })
    }
}

// ---------------------------------------------------------------------------
// Artifacts
// ---------------------------------------------------------------------------

/// One parameter in an ABI entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiParam {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<AbiParam>,
    #[serde(default, rename = "internalType", skip_serializing_if = "Option::is_none")]
    pub internal_type: Option<String>,
}

/// One entry of a contract ABI (function, constructor, event, error, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiEntry {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub inputs: Vec<AbiParam>,
    #[serde(default)]
    pub outputs: Vec<AbiParam>,
    #[serde(default, rename = "stateMutability")]
    pub state_mutability: Option<String>,
}

/// A compiled contract: callable entry points and how to deploy it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledArtifact {
    pub name: String,
    pub abi: Vec<AbiEntry>,
    /// Creation bytecode, hex without `0x`.
    pub bytecode: String,
    /// Function signature -> 4-byte selector in hex.
    pub method_identifiers: BTreeMap<String, String>,
}

impl CompiledArtifact {
    pub fn function(&self, name: &str) -> Option<&AbiEntry> {
        self.abi
            .iter()
            .find(|e| e.kind == "function" && e.name.as_deref() == Some(name))
    }

    /// Selector of a zero-argument function.
    pub fn selector(&self, name: &str) -> Option<&str> {
        self.method_identifiers
            .get(&format!("{}()", name))
            .map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Compiler service
// ---------------------------------------------------------------------------

/// What one compiler invocation produced.
#[derive(Debug, Clone, Default)]
pub struct CompilerOutput {
    pub diagnostics: Vec<Diagnostic>,
    /// Contracts defined in the submitted source unit, by name.
    pub contracts: BTreeMap<String, CompiledArtifact>,
}

/// The compiler front end, consumed as a black box.
pub trait CompilerService {
    type Error: std::error::Error;

    /// Compile `source`, registered under `source_name`.
    fn compile(
        &self,
        source_name: &str,
        source: &str,
        imports: &dyn ImportResolver,
    ) -> Result<CompilerOutput, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_resolve_imports() {
        let resolver = |path: &str| (path == "lib.sol").then(|| "library L {}".to_string());
        assert_eq!(resolver.resolve("lib.sol").unwrap(), "library L {}");
        assert!(matches!(
            resolver.resolve("missing.sol"),
            Err(ImportError::NotFound { .. })
        ));
    }

    #[test]
    fn not_found_lists_searched_paths() {
        let err = ImportError::NotFound {
            path: "x.sol".into(),
            searched: vec![PathBuf::from("/p/x.sol"), PathBuf::from("/p/node_modules/x.sol")],
        };
        assert_eq!(
            err.to_string(),
            "File not found in:\n/p/x.sol\n/p/node_modules/x.sol"
        );
    }

    #[test]
    fn artifact_lookup() {
        let abi: Vec<AbiEntry> = serde_json::from_str(
            r#"[{"type":"function","name":"exec","inputs":[],"outputs":[{"name":"","type":"uint256","internalType":"uint256"}],"stateMutability":"view"}]"#,
        )
        .unwrap();
        let artifact = CompiledArtifact {
            name: "Main".into(),
            abi,
            bytecode: "6080".into(),
            method_identifiers: BTreeMap::from([("exec()".to_string(), "c0406226".to_string())]),
        };
        assert_eq!(artifact.selector("exec"), Some("c0406226"));
        let entry = artifact.function("exec").unwrap();
        assert_eq!(entry.outputs[0].ty, "uint256");
        assert_eq!(entry.state_mutability.as_deref(), Some("view"));
    }
}
