//! Line classifier: decides which structural role one accepted line plays.
//!
//! Classification is a fixed, first-match-wins chain of predicates over the
//! line text. Each line is judged on its own; neighbours are never consulted,
//! so re-classifying an accepted line always yields the same answer.

use crate::grammar;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

// ── Statement lines ─────────────────────────────────────────────────

/// One accepted line of user input, trimmed and terminator-normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatementLine(String);

impl StatementLine {
    pub fn new(raw: &str) -> Self {
        StatementLine(normalize_terminator(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StatementLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StatementLine {
    fn from(raw: &str) -> Self {
        StatementLine::new(raw)
    }
}

/// Trim and append `;` unless the line already ends a statement or block.
/// Idempotent.
pub fn normalize_terminator(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.ends_with([';', '{', '}']) {
        trimmed.to_string()
    } else {
        format!("{};", trimmed)
    }
}

// ── Roles ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Import,
    TypeAlias,
    Enum,
    Constant,
    Struct,
    Interface,
    Library,
    Contract,
    UsingDirective,
    Declaration,
    Event,
    Function,
    Expression,
}

impl Role {
    /// Width of the longest role name, for aligned listings.
    pub fn label_width() -> usize {
        Role::iter().map(|role| role.to_string().len()).max().unwrap_or(0)
    }

    /// Roles rendered as free-standing declarations outside the container.
    pub fn is_top_level(self) -> bool {
        matches!(
            self,
            Role::Import
                | Role::TypeAlias
                | Role::Enum
                | Role::Constant
                | Role::Struct
                | Role::Interface
                | Role::Library
                | Role::Contract
        )
    }
}

/// A classified line together with whatever the classifier could extract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    Import,
    TypeAlias,
    Enum,
    Constant {
        ident: String,
        ty: String,
    },
    Struct,
    Interface,
    Library,
    Contract,
    UsingDirective,
    Declaration {
        ident: String,
        ty: String,
        value: Option<String>,
    },
    Event,
    Function,
    Expression {
        /// Target of an assignment, augmented assignment, or increment.
        ident: Option<String>,
    },
}

impl Classified {
    pub fn role(&self) -> Role {
        match self {
            Classified::Import => Role::Import,
            Classified::TypeAlias => Role::TypeAlias,
            Classified::Enum => Role::Enum,
            Classified::Constant { .. } => Role::Constant,
            Classified::Struct => Role::Struct,
            Classified::Interface => Role::Interface,
            Classified::Library => Role::Library,
            Classified::Contract => Role::Contract,
            Classified::UsingDirective => Role::UsingDirective,
            Classified::Declaration { .. } => Role::Declaration,
            Classified::Event => Role::Event,
            Classified::Function => Role::Function,
            Classified::Expression { .. } => Role::Expression,
        }
    }

    /// Identifier whose value is read back when this line ends the session.
    pub fn ident(&self) -> Option<&str> {
        match self {
            Classified::Constant { ident, .. } | Classified::Declaration { ident, .. } => {
                Some(ident)
            }
            Classified::Expression { ident } => ident.as_deref(),
            _ => None,
        }
    }

    /// Declarations carrying a data location can only live inside a function body.
    pub fn is_local_declaration(&self) -> bool {
        match self {
            Classified::Declaration { ty, .. } => grammar::trailing_location(ty).is_some(),
            _ => false,
        }
    }
}

// ── Patterns ────────────────────────────────────────────────────────

fn compile(pattern: &str) -> Regex {
    Regex::new(&format!("(?s){}", pattern)).expect("classifier pattern must compile")
}

static IMPORT: Lazy<Regex> = Lazy::new(|| compile(r"^import\b"));

static TYPE_ALIAS: Lazy<Regex> = Lazy::new(|| {
    compile(&format!(
        r"^type\s+{}\s+is\s+{}\s*;$",
        grammar::IDENT,
        grammar::elementary()
    ))
});

static ENUM: Lazy<Regex> = Lazy::new(|| compile(&format!(r"^enum\s+{}\s*\{{", grammar::IDENT)));

static STRUCT: Lazy<Regex> =
    Lazy::new(|| compile(&format!(r"^struct\s+{}\s*\{{", grammar::IDENT)));

static INTERFACE: Lazy<Regex> =
    Lazy::new(|| compile(&format!(r"^interface\s+{}\b", grammar::IDENT)));

static LIBRARY: Lazy<Regex> =
    Lazy::new(|| compile(&format!(r"^library\s+{}\b", grammar::IDENT)));

static CONTRACT: Lazy<Regex> = Lazy::new(|| {
    compile(&format!(
        r"^(?:abstract\s+)?contract\s+{}\b",
        grammar::IDENT
    ))
});

static CONSTANT: Lazy<Regex> = Lazy::new(|| {
    compile(&format!(
        r"^(?P<ty>{})\s+constant\s+(?P<ident>{})\s*=\s*(?P<val>.+);$",
        grammar::type_name(),
        grammar::IDENT
    ))
});

static USING: Lazy<Regex> = Lazy::new(|| compile(r"^using\s+\S.*\s+for\s+.+;$"));

static DECLARATION: Lazy<Regex> = Lazy::new(|| {
    compile(&format!(
        r"^(?P<ty>{})(?:\s+(?:public|private|internal|immutable|override))*\s+(?P<ident>{})(?:\s*=\s*(?P<val>.+))?;$",
        grammar::type_name_with_location(),
        grammar::IDENT
    ))
});

static FUNCTION: Lazy<Regex> = Lazy::new(|| {
    compile(&format!(
        r"^(?:(?:function|modifier)\s+{}\b|(?:constructor|receive|fallback)\s*\()",
        grammar::IDENT
    ))
});

static EVENT: Lazy<Regex> =
    Lazy::new(|| compile(&format!(r"^(?:event|error)\s+{}\s*\(", grammar::IDENT)));

fn lvalue() -> String {
    format!(
        r"{ident}(?:\.{ident}|\[[^\[\]]*\])*",
        ident = grammar::IDENT
    )
}

static ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    compile(&format!(
        r"^(?P<ident>{})\s*(?:[-+*/%|&^]|<<|>>)?=\s*(?P<val>[^=].*);$",
        lvalue()
    ))
});

static INCREMENT: Lazy<Regex> = Lazy::new(|| {
    compile(&format!(
        r"^(?:(?:\+\+|--)\s*(?P<pre>{lv})|(?P<post>{lv})\s*(?:\+\+|--))\s*;$",
        lv = lvalue()
    ))
});

// ── Classification ──────────────────────────────────────────────────

/// Classify one line. Falls back to `Expression` when no role matches.
pub fn classify(line: &StatementLine) -> Classified {
    let text = line.as_str();

    if IMPORT.is_match(text) {
        return Classified::Import;
    }
    if TYPE_ALIAS.is_match(text) {
        return Classified::TypeAlias;
    }
    if ENUM.is_match(text) {
        return Classified::Enum;
    }
    if STRUCT.is_match(text) {
        return Classified::Struct;
    }
    if INTERFACE.is_match(text) {
        return Classified::Interface;
    }
    if LIBRARY.is_match(text) {
        return Classified::Library;
    }
    if CONTRACT.is_match(text) {
        return Classified::Contract;
    }
    if let Some(caps) = CONSTANT.captures(text) {
        return Classified::Constant {
            ident: caps["ident"].to_string(),
            ty: caps["ty"].to_string(),
        };
    }
    if USING.is_match(text) {
        return Classified::UsingDirective;
    }
    if let Some(decl) = declaration(text) {
        return decl;
    }
    if FUNCTION.is_match(text) {
        return Classified::Function;
    }
    if EVENT.is_match(text) {
        return Classified::Event;
    }

    Classified::Expression {
        ident: assignment_target(text),
    }
}

fn declaration(text: &str) -> Option<Classified> {
    let caps = DECLARATION.captures(text)?;
    let ty = caps["ty"].to_string();
    let ident = caps["ident"].to_string();

    // `return x;` and friends have declaration shape
    let head = ty.split_whitespace().next().unwrap_or("");
    if grammar::is_statement_keyword(head) || grammar::is_statement_keyword(&ident) {
        return None;
    }

    Some(Classified::Declaration {
        ident,
        ty,
        value: caps.name("val").map(|m| m.as_str().trim().to_string()),
    })
}

fn assignment_target(text: &str) -> Option<String> {
    if let Some(caps) = ASSIGNMENT.captures(text) {
        return Some(caps["ident"].to_string());
    }
    let caps = INCREMENT.captures(text)?;
    caps.name("pre")
        .or_else(|| caps.name("post"))
        .map(|m| m.as_str().to_string())
}

/// Lexical detection of a right-hand side that constructs a new instance.
pub fn constructs_instance(line: &StatementLine) -> bool {
    static NEW_RHS: Lazy<Regex> = Lazy::new(|| compile(r"=\s*new\b"));
    NEW_RHS.is_match(line.as_str())
}
