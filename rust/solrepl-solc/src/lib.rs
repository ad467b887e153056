//! Compiler service backed by a `solc` binary in standard-JSON mode.
//!
//! The binary has no callback channel for imports, so imported units are
//! resolved up front through the [`ImportResolver`] and submitted alongside
//! the synthesized unit.

pub mod imports;
pub mod standard_json;

pub use imports::FsImportResolver;
pub use standard_json::Settings;

use solrepl_synth::{CompilerOutput, CompilerService, Diagnostic, ImportResolver};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum SolcError {
    #[error("failed to spawn {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("io error talking to solc: {0}")]
    Io(#[from] std::io::Error),
    #[error("solc exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("malformed solc output: {0}")]
    Json(#[from] serde_json::Error),
}

/// `solc --standard-json` as a [`CompilerService`].
#[derive(Debug, Clone)]
pub struct SolcCompiler {
    program: PathBuf,
    settings: Settings,
}

impl Default for SolcCompiler {
    fn default() -> Self {
        Self::new("solc")
    }
}

impl SolcCompiler {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            settings: Settings::default(),
        }
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn program(&self) -> &PathBuf {
        &self.program
    }

    /// Compiler version, e.g. `0.8.26+commit.8a97fa7a.Linux.g++`.
    pub fn version(&self) -> Result<String, SolcError> {
        let output = Command::new(&self.program)
            .arg("--version")
            .output()
            .map_err(|source| SolcError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_version(&stdout).ok_or_else(|| SolcError::Failed {
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn run(&self, input: &str) -> Result<String, SolcError> {
        let mut child = Command::new(&self.program)
            .arg("--standard-json")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| SolcError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(input.as_bytes())?;
        }
        let output = child.wait_with_output()?;

        // standard-json mode reports compile errors on stdout with status 0
        if output.stdout.is_empty() {
            return Err(SolcError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Pull the version out of `solc --version` output.
pub fn parse_version(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .find_map(|line| line.trim().strip_prefix("Version:"))
        .map(|v| v.trim().to_string())
}

impl CompilerService for SolcCompiler {
    type Error = SolcError;

    fn compile(
        &self,
        source_name: &str,
        source: &str,
        imports: &dyn ImportResolver,
    ) -> Result<CompilerOutput, SolcError> {
        let (sources, unresolved) = imports::collect_sources(source_name, source, imports);
        if !unresolved.is_empty() {
            let diagnostics = unresolved
                .into_iter()
                .map(|u| {
                    warn!(unit = %u.unit, "import not found");
                    Diagnostic::error(
                        "ImportError",
                        format!("Source \"{}\" not found: {}", u.unit, u.error),
                    )
                })
                .collect();
            return Ok(CompilerOutput {
                diagnostics,
                ..CompilerOutput::default()
            });
        }

        let input = standard_json::input(&sources, &self.settings).to_string();
        debug!(
            program = %self.program.display(),
            units = sources.len(),
            "invoking solc"
        );
        let raw = self.run(&input)?;
        let output = standard_json::parse_output(&raw, source_name)?;
        debug!(
            diagnostics = output.diagnostics.len(),
            contracts = output.contracts.len(),
            "solc finished"
        );
        Ok(output)
    }
}
