//! Interactive REPL for Solidity statements.

use std::fs;
use std::path::{Path, PathBuf};

use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use solrepl_evm::ExecutionService;
use solrepl_synth::{CompilerService, Role, Session};

use crate::colors::{bold, cyan, gray, red, yellow};
use crate::shell::{Outcome, Shell};

/// Environment variable used to override REPL history location.
pub const HISTORY_PATH_ENV: &str = "SOLREPL_HISTORY_PATH";

const PROMPT: &str = "> ";
const CONTINUATION: &str = "... ";

const COMMANDS: &[(&str, &str)] = &[
    (".exit", "Exit the REPL"),
    (".help", "Print this message"),
    (".session", "Print current session"),
    (".source", "Print the last synthesized source"),
    (".pop", "Drop the last accepted line"),
    (".reset", "Clear the session"),
];

const KEYWORDS: &[&str] = &[
    "address", "bool", "bytes", "bytes32", "calldata", "constant", "contract", "emit", "enum",
    "event", "external", "function", "import", "int256", "interface", "internal", "library",
    "mapping", "memory", "new", "payable", "private", "public", "pure", "return", "returns",
    "storage", "string", "struct", "type", "uint256", "using", "view",
];

struct SolCompleter;

impl Completer for SolCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let start = line[..pos]
            .rfind(|c: char| c.is_whitespace() || "([{,;=".contains(c))
            .map(|i| i + 1)
            .unwrap_or(0);
        let word = &line[start..pos];
        if word.is_empty() {
            return Ok((start, Vec::new()));
        }

        let pool: Vec<&str> = if start == 0 && word.starts_with('.') {
            COMMANDS.iter().map(|(cmd, _)| *cmd).collect()
        } else {
            KEYWORDS.to_vec()
        };
        let candidates = pool
            .into_iter()
            .filter(|candidate| candidate.starts_with(word))
            .map(|candidate| Pair {
                display: candidate.to_string(),
                replacement: candidate.to_string(),
            })
            .collect();
        Ok((start, candidates))
    }
}

impl Hinter for SolCompleter {
    type Hint = String;
}

impl Highlighter for SolCompleter {}

impl Validator for SolCompleter {}

impl Helper for SolCompleter {}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq)]
enum ReplCommand {
    Exit,
    Help,
    Session,
    Source,
    Pop,
    Reset,
}

#[derive(Debug, PartialEq, Eq)]
enum ParsedCommand {
    NotACommand,
    UnknownCommand,
    Command(ReplCommand),
}

fn parse_repl_command(line: &str) -> ParsedCommand {
    let trimmed = line.trim();
    if !trimmed.starts_with('.') {
        return ParsedCommand::NotACommand;
    }
    match trimmed.to_ascii_lowercase().as_str() {
        ".exit" => ParsedCommand::Command(ReplCommand::Exit),
        ".help" => ParsedCommand::Command(ReplCommand::Help),
        ".session" => ParsedCommand::Command(ReplCommand::Session),
        ".source" => ParsedCommand::Command(ReplCommand::Source),
        ".pop" => ParsedCommand::Command(ReplCommand::Pop),
        ".reset" => ParsedCommand::Command(ReplCommand::Reset),
        _ => ParsedCommand::UnknownCommand,
    }
}

/// One row per accepted line: its role, padded, then the line.
pub fn session_listing(session: &Session) -> Vec<String> {
    let width = Role::label_width();
    session
        .roles()
        .map(|(role, line)| format!("{} {}", gray(&format!("{:<width$}", role.to_string())), line))
        .collect()
}

/// Returns Some(true) to continue, Some(false) to quit, None if not a command.
fn handle_command<C: CompilerService, E: ExecutionService>(
    line: &str,
    shell: &mut Shell<C, E>,
) -> Option<bool> {
    match parse_repl_command(line) {
        ParsedCommand::NotACommand => None,
        ParsedCommand::UnknownCommand => {
            eprintln!("{}", red("Invalid REPL keyword"));
            Some(true)
        }
        ParsedCommand::Command(ReplCommand::Exit) => Some(false),
        ParsedCommand::Command(ReplCommand::Help) => {
            print_help();
            Some(true)
        }
        ParsedCommand::Command(ReplCommand::Session) => {
            for entry in session_listing(shell.session()) {
                println!("{}", entry);
            }
            Some(true)
        }
        ParsedCommand::Command(ReplCommand::Source) => {
            match shell.last_source() {
                Some(source) => println!("{}", source),
                None => println!("{}", gray("Nothing compiled yet.")),
            }
            Some(true)
        }
        ParsedCommand::Command(ReplCommand::Pop) => {
            match shell.pop() {
                Some(line) => println!("{} {}", gray("Dropped"), line),
                None => println!("{}", gray("Session is empty.")),
            }
            Some(true)
        }
        ParsedCommand::Command(ReplCommand::Reset) => {
            shell.reset();
            println!("{}", gray("Session cleared."));
            Some(true)
        }
    }
}

fn print_help() {
    for (cmd, description) in COMMANDS {
        println!("{}{}", cyan(&format!("{:<12}", cmd)), description);
    }
}

// ---------------------------------------------------------------------------
// Loop
// ---------------------------------------------------------------------------

/// Startup settings for [`run_repl`].
#[derive(Debug, Clone, Default)]
pub struct ReplOptions {
    /// Compiler version shown in the banner.
    pub version: Option<String>,
    pub history_path: Option<PathBuf>,
}

pub fn run_repl<C: CompilerService, E: ExecutionService>(
    shell: &mut Shell<C, E>,
    options: &ReplOptions,
) -> rustyline::Result<()> {
    match options.version {
        Some(ref version) => println!("{}", bold(&format!("Welcome to Solidity v{}!", version))),
        None => println!("{}", bold("Welcome to Solidity!")),
    }
    println!("{}", gray("Type \".help\" for more information."));

    let config = rustyline::Config::builder().auto_add_history(true).build();
    let mut rl = Editor::with_config(config)?;
    rl.set_helper(Some(SolCompleter));

    if let Some(ref path) = options.history_path {
        if path.exists() {
            if let Err(err) = rl.load_history(path) {
                eprintln!(
                    "{} failed to load history from {}: {}",
                    yellow("Warning:"),
                    path.display(),
                    err
                );
            }
        }
    }

    let mut buffer = String::new();
    loop {
        let prompt = if buffer.is_empty() { PROMPT } else { CONTINUATION };
        match rl.readline(prompt) {
            Ok(line) => {
                if line.trim().is_empty() {
                    if !buffer.is_empty() {
                        buffer.push('\n');
                    }
                    continue;
                }

                if buffer.is_empty() {
                    if let Some(keep_going) = handle_command(&line, shell) {
                        if !keep_going {
                            break;
                        }
                        continue;
                    }
                }

                if !buffer.is_empty() {
                    buffer.push('\n');
                }
                buffer.push_str(&line);
                if needs_more_input(&buffer) {
                    continue;
                }

                let input = buffer.trim().to_string();
                buffer.clear();
                print_outcome(&shell.eval(&input));
            }
            Err(ReadlineError::Interrupted) => {
                if buffer.is_empty() {
                    println!("{}", gray("(To exit, type .exit or press Ctrl-D)"));
                } else {
                    buffer.clear();
                }
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("{} {:?}", red("Error:"), err);
                break;
            }
        }
    }

    if let Some(ref path) = options.history_path {
        save_history(&mut rl, path);
    }
    Ok(())
}

fn save_history<H: Helper>(rl: &mut Editor<H, rustyline::history::DefaultHistory>, path: &Path) {
    if let Some(parent) = path.parent() {
        if let Err(err) = fs::create_dir_all(parent) {
            eprintln!(
                "{} failed to create history directory {}: {}",
                yellow("Warning:"),
                parent.display(),
                err
            );
            return;
        }
    }
    if let Err(err) = rl.save_history(path) {
        eprintln!(
            "{} failed to save history to {}: {}",
            yellow("Warning:"),
            path.display(),
            err
        );
    }
}

pub fn print_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Value(value) => println!("{}", value),
        Outcome::NoValue => {}
        Outcome::Compiled {
            return_type: Some(ty),
        } => println!("{}", gray(&format!("compiled, returns {}", ty))),
        Outcome::Compiled { return_type: None } => println!("{}", gray("compiled")),
        Outcome::CompileFailed(diag) => eprintln!("{}", red(diag.rendered.trim_end())),
        Outcome::ExecFailed(message) => eprintln!("{} {}", red("Error:"), message),
    }
}

/// Whether `input` has unclosed `(`, `[` or `{`. Brackets inside string
/// literals and `//` comments are ignored.
fn needs_more_input(input: &str) -> bool {
    let mut depth: i32 = 0;
    let mut quote: Option<char> = None;
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if let Some(q) = quote {
            match ch {
                '\\' => {
                    chars.next();
                }
                '\n' => quote = None,
                c if c == q => quote = None,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '/' if chars.peek() == Some(&'/') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            _ => {}
        }
    }
    depth > 0
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// Resolve the path to the history file.
///
/// An override (from `SOLREPL_HISTORY_PATH` or the config) may be absolute,
/// `~/...`, or relative to HOME. Otherwise `${HOME}/.solrepl/history`.
pub fn resolve_history_path(home: Option<&Path>, override_path: Option<&str>) -> Option<PathBuf> {
    let home_path = || home.map(Path::to_path_buf);

    if let Some(raw) = override_path.map(str::trim).filter(|value| !value.is_empty()) {
        if let Some(rest) = raw.strip_prefix("~/") {
            return home_path().map(|home| home.join(rest));
        }
        let configured = PathBuf::from(raw);
        if configured.is_relative() {
            return home_path().map(|home| home.join(configured));
        }
        return Some(configured);
    }

    home_path().map(|home| home.join(".solrepl").join("history"))
}

/// History path from the environment, then `configured`, then the default.
pub fn history_path(configured: Option<&str>) -> Option<PathBuf> {
    let home = crate::config::home_dir();
    let from_env = std::env::var(HISTORY_PATH_ENV).ok();
    resolve_history_path(home.as_deref(), from_env.as_deref().or(configured))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_more_input_brackets() {
        assert!(needs_more_input("contract A {"));
        assert!(needs_more_input("function f() public {\n    uint x = (1"));
        assert!(needs_more_input("uint[] memory xs = new uint[](3"));
        assert!(!needs_more_input("contract A { uint x; }"));
        assert!(!needs_more_input("f(1, [2, 3])"));
        assert!(!needs_more_input("1 + 2"));
    }

    #[test]
    fn test_needs_more_input_ignores_strings_and_comments() {
        assert!(!needs_more_input(r#"string memory s = "{(""#));
        assert!(!needs_more_input("bytes1 b = '['"));
        assert!(!needs_more_input(r#"string memory s = "a\"{""#));
        assert!(!needs_more_input("uint x = 1 // open {"));
        assert!(needs_more_input("contract A { // }"));
    }

    #[test]
    fn test_parse_repl_command() {
        assert_eq!(
            parse_repl_command(".exit"),
            ParsedCommand::Command(ReplCommand::Exit)
        );
        assert_eq!(
            parse_repl_command("  .HELP "),
            ParsedCommand::Command(ReplCommand::Help)
        );
        assert_eq!(
            parse_repl_command(".session"),
            ParsedCommand::Command(ReplCommand::Session)
        );
        assert_eq!(
            parse_repl_command(".pop"),
            ParsedCommand::Command(ReplCommand::Pop)
        );
        assert_eq!(parse_repl_command(".nope"), ParsedCommand::UnknownCommand);
        assert_eq!(parse_repl_command("x.length"), ParsedCommand::NotACommand);
        assert_eq!(parse_repl_command("1 + 1"), ParsedCommand::NotACommand);
    }

    #[test]
    fn test_resolve_history_path() {
        let home = Path::new("/home/tester");

        assert_eq!(
            resolve_history_path(Some(home), None),
            Some(PathBuf::from("/home/tester/.solrepl/history"))
        );
        assert_eq!(
            resolve_history_path(Some(home), Some("  ")),
            Some(PathBuf::from("/home/tester/.solrepl/history"))
        );
        assert_eq!(
            resolve_history_path(Some(home), Some("repl/history.log")),
            Some(PathBuf::from("/home/tester/repl/history.log"))
        );
        assert_eq!(
            resolve_history_path(Some(home), Some("~/logs/repl.log")),
            Some(PathBuf::from("/home/tester/logs/repl.log"))
        );
        assert_eq!(
            resolve_history_path(Some(home), Some("/tmp/repl.log")),
            Some(PathBuf::from("/tmp/repl.log"))
        );
        assert_eq!(resolve_history_path(None, Some("relative.log")), None);
        assert_eq!(resolve_history_path(None, None), None);
    }

    #[test]
    fn test_completion_pools() {
        let history = rustyline::history::DefaultHistory::new();
        let ctx = Context::new(&history);
        let (start, found) = SolCompleter.complete(".se", 3, &ctx).unwrap();
        assert_eq!(start, 0);
        let names: Vec<&str> = found.iter().map(|p| p.replacement.as_str()).collect();
        assert_eq!(names, vec![".session"]);

        let (start, found) = SolCompleter.complete("uint256 x = uin", 15, &ctx).unwrap();
        assert_eq!(start, 12);
        assert_eq!(found[0].replacement, "uint256");
    }
}
