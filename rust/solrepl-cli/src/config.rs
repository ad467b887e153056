//! Configuration file parsing for `solrepl.toml`.
//!
//! Searches current directory then ancestors, falling back to
//! `~/.config/solrepl/solrepl.toml` if no project-level file is found.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE: &str = "solrepl.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid toml in '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct SolreplConfig {
    #[serde(default)]
    pub compiler: CompilerSection,
    #[serde(default)]
    pub imports: ImportsSection,
    #[serde(default)]
    pub node: NodeSection,
    #[serde(default)]
    pub repl: ReplSection,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct CompilerSection {
    /// Path to the `solc` binary.
    pub solc: PathBuf,
    pub pragma: String,
    pub evm_version: Option<String>,
    pub optimize: bool,
}

impl Default for CompilerSection {
    fn default() -> Self {
        Self {
            solc: PathBuf::from("solc"),
            pragma: "^0.8.0".to_string(),
            evm_version: None,
            optimize: false,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ImportsSection {
    /// Search roots, relative to the project directory. Tried in order.
    pub roots: Vec<PathBuf>,
}

impl Default for ImportsSection {
    fn default() -> Self {
        Self {
            roots: vec![PathBuf::from("."), PathBuf::from("node_modules")],
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct NodeSection {
    pub rpc_url: String,
    /// Sending account; the node's first account when unset.
    pub signer: Option<String>,
    pub gas: u64,
    pub timeout_secs: u64,
}

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            signer: None,
            gas: 6_000_000,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
#[serde(default)]
pub struct ReplSection {
    pub history_path: Option<String>,
}

impl SolreplConfig {
    /// Load config from `solrepl.toml`, searching current dir then parents.
    /// Returns `Default` with the current directory as project root when no
    /// file is found.
    pub fn load() -> Result<(PathBuf, Self), ConfigError> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::load_in(&cwd, home_dir().as_deref())
    }

    /// [`SolreplConfig::load`] starting at `cwd`. A project file makes its
    /// directory the project root; the global file and the defaults keep `cwd`.
    fn load_in(cwd: &Path, home: Option<&Path>) -> Result<(PathBuf, Self), ConfigError> {
        match find_in(cwd, home) {
            Some(Found::Project(path)) => Self::load_file(&path),
            Some(Found::Global(path)) => Ok((cwd.to_path_buf(), Self::load_from(&path)?)),
            None => Ok((cwd.to_path_buf(), Self::default())),
        }
    }

    /// Load an explicitly named config file, with its directory as project
    /// root.
    pub fn load_file(path: &Path) -> Result<(PathBuf, Self), ConfigError> {
        let cfg = Self::load_from(path)?;
        Ok((project_dir(path), cfg))
    }

    /// Load config from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Import search roots made absolute against `project_dir`.
    pub fn import_roots(&self, project_dir: &Path) -> Vec<PathBuf> {
        self.imports
            .roots
            .iter()
            .map(|root| {
                if root.is_absolute() {
                    root.clone()
                } else if root == Path::new(".") {
                    project_dir.to_path_buf()
                } else {
                    project_dir.join(root)
                }
            })
            .collect()
    }

    /// Generate a default `solrepl.toml` template.
    pub fn default_template() -> &'static str {
        r#"# solrepl configuration

[compiler]
solc = "solc"
pragma = "^0.8.0"
# evm_version = "paris"
optimize = false

[imports]
# Searched in order, relative to the project directory
roots = [".", "node_modules"]

[node]
rpc_url = "http://127.0.0.1:8545"
# signer = "0x..."
gas = 6000000
timeout_secs = 30

[repl]
# history_path = "~/.solrepl/history"
"#
    }
}

impl std::str::FromStr for SolreplConfig {
    type Err = toml::de::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        toml::from_str(s)
    }
}

/// Directory that holds `config_path`, which relative paths resolve against.
fn project_dir(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Where a config file was found.
#[derive(Debug, PartialEq)]
enum Found {
    /// In the start directory or one of its ancestors.
    Project(PathBuf),
    /// Under `~/.config/solrepl`.
    Global(PathBuf),
}

/// Search `start` and its ancestors, then the global location under `home`.
fn find_in(start: &Path, home: Option<&Path>) -> Option<Found> {
    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(CONFIG_FILE);
        if candidate.is_file() {
            return Some(Found::Project(candidate));
        }
        if !dir.pop() {
            break;
        }
    }
    let global = home?.join(".config").join("solrepl").join(CONFIG_FILE);
    global.is_file().then_some(Found::Global(global))
}

pub(crate) fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
