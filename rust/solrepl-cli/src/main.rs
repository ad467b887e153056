//! solrepl: a Solidity REPL that evaluates one statement at a time.

use clap::{Parser as ClapParser, Subcommand};
use solrepl_cli::colors::{red, status_label, yellow};
use solrepl_cli::config::{SolreplConfig, CONFIG_FILE};
use solrepl_cli::repl::{self, ReplOptions};
use solrepl_cli::shell::Shell;
use solrepl_evm::{RpcExecutor, RpcOptions};
use solrepl_solc::{FsImportResolver, Settings, SolcCompiler};
use solrepl_synth::{SynthOptions, Synthesizer};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "SOLREPL_LOG";

#[derive(ClapParser)]
#[command(name = "solrepl", version, about = "Evaluate Solidity one statement at a time")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to the solc binary
    #[arg(long, global = true)]
    solc: Option<PathBuf>,

    /// JSON-RPC endpoint of the node that runs compiled statements
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    /// Account that deploys and calls (default: the node's first account)
    #[arg(long, global = true)]
    signer: Option<String>,

    /// Config file to use instead of searching for solrepl.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Compile only; never contact a node
    #[arg(long, global = true)]
    no_exec: bool,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive REPL (default)
    Repl,
    /// Create a solrepl.toml config file in the current directory
    Init,
    /// Evaluate lines as one session and print the last value
    Eval {
        #[arg(required = true)]
        lines: Vec<String>,
    },
    /// Print the synthesized source for lines
    Source {
        #[arg(required = true)]
        lines: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        None | Some(Commands::Repl) => cmd_repl(&cli),
        Some(Commands::Init) => cmd_init(),
        Some(Commands::Eval { ref lines }) => cmd_eval(&cli, lines),
        Some(Commands::Source { ref lines }) => cmd_source(&cli, lines),
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("warn,solrepl=debug,solrepl_cli=debug,solrepl_synth=debug,solrepl_solc=debug,solrepl_evm=debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{} {}", red("error:"), message);
    std::process::exit(1);
}

/// Config file plus command-line overrides.
fn load_config(cli: &Cli) -> (PathBuf, SolreplConfig) {
    let loaded = match cli.config {
        Some(ref path) => SolreplConfig::load_file(path),
        None => SolreplConfig::load(),
    };
    let (project_dir, mut cfg) = loaded.unwrap_or_else(|e| fail(e));

    if let Some(ref solc) = cli.solc {
        cfg.compiler.solc = solc.clone();
    }
    if let Some(ref url) = cli.rpc_url {
        cfg.node.rpc_url = url.clone();
    }
    if let Some(ref signer) = cli.signer {
        cfg.node.signer = Some(signer.clone());
    }
    debug!(project = %project_dir.display(), ?cfg, "configuration loaded");
    (project_dir, cfg)
}

fn build_synthesizer(cfg: &SolreplConfig, project_dir: &Path) -> Synthesizer<SolcCompiler> {
    let compiler = SolcCompiler::new(cfg.compiler.solc.clone()).with_settings(Settings {
        optimize: cfg.compiler.optimize,
        evm_version: cfg.compiler.evm_version.clone(),
    });
    let options = SynthOptions {
        pragma: cfg.compiler.pragma.clone(),
        ..SynthOptions::default()
    };
    Synthesizer::new(compiler)
        .with_imports(FsImportResolver::with_roots(cfg.import_roots(project_dir)))
        .with_options(options)
}

fn build_shell(cli: &Cli) -> (Shell<SolcCompiler, RpcExecutor>, SolreplConfig) {
    let (project_dir, cfg) = load_config(cli);
    let synth = build_synthesizer(&cfg, &project_dir);

    let executor = if cli.no_exec {
        None
    } else {
        let timeout = Duration::from_secs(cfg.node.timeout_secs);
        let options = RpcOptions {
            signer: cfg.node.signer.clone(),
            gas: cfg.node.gas,
            receipt_timeout: timeout,
            ..RpcOptions::default()
        };
        Some(RpcExecutor::connect(&cfg.node.rpc_url, timeout, options).unwrap_or_else(|e| fail(e)))
    };
    (Shell::new(synth, executor), cfg)
}

fn cmd_repl(cli: &Cli) {
    let (mut shell, cfg) = build_shell(cli);
    let version = match shell.synthesizer().compiler().version() {
        Ok(version) => Some(version),
        Err(e) => {
            eprintln!("{} {}", yellow("Warning:"), e);
            None
        }
    };
    let options = ReplOptions {
        version,
        history_path: repl::history_path(cfg.repl.history_path.as_deref()),
    };
    if let Err(e) = repl::run_repl(&mut shell, &options) {
        fail(e);
    }
}

fn cmd_eval(cli: &Cli, lines: &[String]) {
    let (mut shell, _) = build_shell(cli);
    let mut last = None;
    for line in lines {
        let outcome = shell.eval(line);
        if outcome.is_failure() {
            repl::print_outcome(&outcome);
            std::process::exit(1);
        }
        last = Some(outcome);
    }
    if let Some(outcome) = last {
        repl::print_outcome(&outcome);
    }
}

fn cmd_source(cli: &Cli, lines: &[String]) {
    let (project_dir, cfg) = load_config(cli);
    let result = build_synthesizer(&cfg, &project_dir).compile(lines);
    print!("{}", result.source);
    if let Some(err) = result.error {
        eprintln!("{}", red(err.rendered.trim_end()));
        std::process::exit(1);
    }
}

fn cmd_init() {
    let path = PathBuf::from(CONFIG_FILE);
    if path.exists() {
        fail(format!("{} already exists, not overwriting", CONFIG_FILE));
    }
    if let Err(e) = std::fs::write(&path, SolreplConfig::default_template()) {
        fail(format!("writing {}: {}", CONFIG_FILE, e));
    }
    println!("{} {}", status_label("Created"), CONFIG_FILE);
}
