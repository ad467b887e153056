//! `solc --standard-json` input construction and output parsing.

use serde::Deserialize;
use serde_json::{json, Value};
use solrepl_synth::{AbiEntry, CompiledArtifact, CompilerOutput, Diagnostic, Severity};
use std::collections::BTreeMap;

/// Compiler settings that end up in the `settings` object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub optimize: bool,
    pub evm_version: Option<String>,
}

/// Build the standard-JSON input for a set of source units.
pub fn input(sources: &BTreeMap<String, String>, settings: &Settings) -> Value {
    let sources: serde_json::Map<String, Value> = sources
        .iter()
        .map(|(name, content)| (name.clone(), json!({ "content": content })))
        .collect();

    let mut compiler_settings = json!({
        "optimizer": { "enabled": settings.optimize },
        "outputSelection": {
            "*": { "*": ["abi", "evm.bytecode.object", "evm.methodIdentifiers"] }
        }
    });
    if let Some(ref version) = settings.evm_version {
        compiler_settings["evmVersion"] = json!(version);
    }

    json!({
        "language": "Solidity",
        "sources": sources,
        "settings": compiler_settings,
    })
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct StandardOutput {
    #[serde(default)]
    errors: Vec<StandardError>,
    #[serde(default)]
    contracts: BTreeMap<String, BTreeMap<String, StandardContract>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StandardError {
    severity: String,
    message: String,
    #[serde(default)]
    formatted_message: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StandardContract {
    #[serde(default)]
    abi: Vec<AbiEntry>,
    #[serde(default)]
    evm: StandardEvm,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StandardEvm {
    #[serde(default)]
    bytecode: StandardBytecode,
    #[serde(default)]
    method_identifiers: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
struct StandardBytecode {
    #[serde(default)]
    object: String,
}

impl From<StandardError> for Diagnostic {
    fn from(err: StandardError) -> Self {
        let severity = match err.severity.as_str() {
            "warning" => Severity::Warning,
            "info" => Severity::Info,
            _ => Severity::Error,
        };
        let rendered = err
            .formatted_message
            .unwrap_or_else(|| format!("{}: {}", err.kind.as_deref().unwrap_or("Error"), err.message));
        Diagnostic {
            severity,
            message: err.message,
            rendered,
            kind: err.kind,
            code: err.error_code,
        }
    }
}

/// Parse compiler output, keeping only the contracts of `source_name`.
pub fn parse_output(raw: &str, source_name: &str) -> Result<CompilerOutput, serde_json::Error> {
    let output: StandardOutput = serde_json::from_str(raw)?;
    let diagnostics = output.errors.into_iter().map(Diagnostic::from).collect();

    let contracts = output
        .contracts
        .into_iter()
        .filter(|(unit, _)| unit == source_name)
        .flat_map(|(_, contracts)| contracts)
        .map(|(name, contract)| {
            let artifact = CompiledArtifact {
                name: name.clone(),
                abi: contract.abi,
                bytecode: contract.evm.bytecode.object,
                method_identifiers: contract.evm.method_identifiers,
            };
            (name, artifact)
        })
        .collect();

    Ok(CompilerOutput {
        diagnostics,
        contracts,
    })
}
