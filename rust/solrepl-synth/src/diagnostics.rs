//! Compiler diagnostics and the interpreter that turns their wording back
//! into correction signals for the resolver.
//!
//! All knowledge of the compiler's exact message text lives in the pattern
//! tables of [`SolcDiagnostics`]. A new compiler wording only needs a new
//! table entry.

use crate::grammar;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Severity level reported by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// One diagnostic from the compiler service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Short message without location context.
    pub message: String,
    /// Full human-readable rendering including the source excerpt.
    pub rendered: String,
    /// Compiler error class such as `TypeError` or `ParserError`.
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

impl Diagnostic {
    pub fn error(kind: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        Diagnostic {
            severity: Severity::Error,
            rendered: format!("{}: {}", kind, message),
            message,
            kind: Some(kind.to_string()),
            code: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// First error-severity diagnostic in compiler order, skipping warnings.
pub fn first_error(diagnostics: &[Diagnostic]) -> Option<&Diagnostic> {
    diagnostics.iter().find(|d| d.is_error())
}

// ── Interpretation ──────────────────────────────────────────────────

/// What a return-type mismatch says the entry point should return instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnTypeFix {
    /// Return this type spelling.
    Type(String),
    /// The last statement has no value; drop the return clause.
    NoValue,
}

/// Reads correction signals out of compiler diagnostics.
pub trait DiagnosticInterpreter {
    /// The true return type, when `diag` is a return-type mismatch.
    fn return_type(&self, diag: &Diagnostic) -> Option<ReturnTypeFix>;

    /// Whether `diag` says the entry point cannot be non-mutating.
    fn requires_mutation(&self, diag: &Diagnostic) -> bool;
}

/// Pattern tables for `solc` 0.8.x wording.
#[derive(Debug, Default, Clone, Copy)]
pub struct SolcDiagnostics;

static RETURN_MISMATCH: &[&str] = &[
    r"^Return argument type (?P<ty>.+?) is not implicitly convertible to expected type",
];

static MUTATION_REQUIRED: &[&str] = &[
    r"^Function declared as view, but this expression \(potentially\) modifies the state",
    r"^Function declared as pure, but this expression \(potentially\) modifies the state",
];

fn compile_table(table: &[&str]) -> Vec<Regex> {
    table
        .iter()
        .map(|p| Regex::new(p).expect("diagnostic pattern must compile"))
        .collect()
}

static RETURN_MISMATCH_RE: Lazy<Vec<Regex>> = Lazy::new(|| compile_table(RETURN_MISMATCH));
static MUTATION_REQUIRED_RE: Lazy<Vec<Regex>> = Lazy::new(|| compile_table(MUTATION_REQUIRED));

impl DiagnosticInterpreter for SolcDiagnostics {
    fn return_type(&self, diag: &Diagnostic) -> Option<ReturnTypeFix> {
        let reported = RETURN_MISMATCH_RE
            .iter()
            .find_map(|re| re.captures(&diag.message))?
            .name("ty")?
            .as_str();
        recover_type(reported)
    }

    fn requires_mutation(&self, diag: &Diagnostic) -> bool {
        MUTATION_REQUIRED_RE
            .iter()
            .any(|re| re.is_match(&diag.message))
    }
}

/// Turn a type as the compiler spells it in a message into a type that can be
/// written in a `returns (...)` clause.
pub fn recover_type(reported: &str) -> Option<ReturnTypeFix> {
    let reported = grammar::strip_inner_locations(reported.trim());
    let reported = reported.as_ref();

    if reported == "tuple()" {
        return Some(ReturnTypeFix::NoValue);
    }
    if reported.starts_with("literal_string") {
        return Some(ReturnTypeFix::Type("string memory".to_string()));
    }

    let (qualifier, rest) = match reported.split_once(' ') {
        Some((head, rest)) if grammar::USER_TYPE_QUALIFIERS.contains(&head) => (Some(head), rest),
        _ => (None, reported),
    };

    let base = match qualifier {
        Some(_) => grammar::match_user_path(rest)?,
        None => match grammar::match_elementary(rest) {
            Some(base) => base,
            None => bare_user_type(rest)?,
        },
    };

    let mut ty = base.to_string();
    match grammar::trailing_location(reported) {
        Some(loc @ ("calldata" | "memory")) => {
            ty.push(' ');
            ty.push_str(loc);
        }
        _ => {
            if grammar::needs_memory_location(&ty) || qualifier == Some("struct") {
                ty.push_str(" memory");
            }
        }
    }

    Some(ReturnTypeFix::Type(ty))
}

/// A user-defined value type, which the compiler names without a qualifier.
/// Only a path followed by nothing but a data location qualifies, so
/// internal spellings like `int_const 5` are rejected.
fn bare_user_type(text: &str) -> Option<&str> {
    let path = grammar::match_user_path(text)?;
    match text[path.len()..].split_whitespace().next() {
        None | Some("memory" | "calldata" | "storage") => Some(path),
        Some(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mismatch(ty: &str) -> Diagnostic {
        Diagnostic::error(
            "TypeError",
            format!(
                "Return argument type {} is not implicitly convertible to expected type (type of first return variable) int256.",
                ty
            ),
        )
    }

    fn fixed(ty: &str) -> Option<ReturnTypeFix> {
        SolcDiagnostics.return_type(&mismatch(ty))
    }

    fn ty(s: &str) -> Option<ReturnTypeFix> {
        Some(ReturnTypeFix::Type(s.to_string()))
    }

    #[test]
    fn elementary_types() {
        assert_eq!(fixed("uint256"), ty("uint256"));
        assert_eq!(fixed("bool"), ty("bool"));
        assert_eq!(fixed("address payable"), ty("address payable"));
        assert_eq!(fixed("bytes32"), ty("bytes32"));
    }

    #[test]
    fn reference_types_get_memory() {
        assert_eq!(fixed("string memory"), ty("string memory"));
        assert_eq!(fixed("string storage ref"), ty("string memory"));
        assert_eq!(fixed("bytes memory"), ty("bytes memory"));
        assert_eq!(fixed("uint256[] memory"), ty("uint256[] memory"));
        assert_eq!(fixed("uint256[3] storage ref"), ty("uint256[3] memory"));
    }

    #[test]
    fn user_defined_types_keep_path() {
        assert_eq!(fixed("contract SomeContract"), ty("SomeContract"));
        assert_eq!(fixed("enum Main.Color"), ty("Main.Color"));
        assert_eq!(fixed("struct Point memory"), ty("Point memory"));
        assert_eq!(fixed("struct Main.Point storage ref"), ty("Main.Point memory"));
        assert_eq!(fixed("contract C[] memory"), ty("C[] memory"));
    }

    #[test]
    fn arrays_of_reference_types_keep_every_dimension() {
        assert_eq!(fixed("uint256[] memory[] memory"), ty("uint256[][] memory"));
        assert_eq!(fixed("string memory[] memory"), ty("string[] memory"));
        assert_eq!(fixed("struct Main.Point memory[] memory"), ty("Main.Point[] memory"));
        assert_eq!(fixed("bytes storage ref[3] storage ref"), ty("bytes[3] memory"));
    }

    #[test]
    fn user_value_types_are_unqualified() {
        assert_eq!(fixed("Price"), ty("Price"));
        assert_eq!(fixed("Main.Price"), ty("Main.Price"));
        assert_eq!(fixed("Price[] memory"), ty("Price[] memory"));
        assert_eq!(fixed("int_const 5"), None);
        assert_eq!(fixed("tuple(uint256,bool)"), None);
    }

    #[test]
    fn valueless_and_literal_returns() {
        assert_eq!(fixed("tuple()"), Some(ReturnTypeFix::NoValue));
        assert_eq!(fixed("literal_string \"hi\""), ty("string memory"));
    }

    #[test]
    fn unrelated_messages_do_not_match() {
        let d = Diagnostic::error("DeclarationError", "Undeclared identifier.");
        assert_eq!(SolcDiagnostics.return_type(&d), None);
        assert!(!SolcDiagnostics.requires_mutation(&d));
        assert_eq!(fixed("function () pure"), None);
    }

    #[test]
    fn mutation_signal() {
        let d = Diagnostic::error(
            "TypeError",
            "Function declared as view, but this expression (potentially) modifies the state and thus requires non-payable (the default) or payable.",
        );
        assert!(SolcDiagnostics.requires_mutation(&d));
    }

    #[test]
    fn first_error_skips_warnings() {
        let warning = Diagnostic {
            severity: Severity::Warning,
            message: "Unused local variable.".into(),
            rendered: "Warning: Unused local variable.".into(),
            kind: Some("Warning".into()),
            code: None,
        };
        let err = Diagnostic::error("TypeError", "boom");
        let diags = vec![warning, err.clone()];
        assert_eq!(first_error(&diags), Some(&err));
        assert_eq!(first_error(&diags[..1]), None);
    }
}
