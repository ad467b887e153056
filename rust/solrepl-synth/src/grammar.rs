//! Type grammar: pattern fragments for the Solidity type spellings the
//! synthesizer has to recognize.
//!
//! Everything here is pure data. The fragments are plain regex source strings
//! so that the classifier and the diagnostic interpreter can splice them into
//! larger patterns; the handful of compiled regexes exported at the bottom are
//! anchored at the start of the input.
//!
//! The patterns are conservative on purpose: a fragment only matches syntax
//! that is unambiguously of its category. Anything else falls through to the
//! next role in the classifier's priority chain.

use once_cell::sync::Lazy;
use regex::Regex;

// ── Elementary types ────────────────────────────────────────────────

/// Bit widths accepted by the `intN` / `uintN` families, widest first so that
/// alternation never stops at a shorter prefix (`uint8` vs `uint80`).
pub const INT_WIDTHS: &str =
    "256|248|240|232|224|216|208|200|192|184|176|168|160|152|144|136|128|120|112|104|96|88|80|72|64|56|48|40|32|24|16|8";

/// `bytes`, `bytes1` .. `bytes32`.
pub const BYTES: &str = r"bytes(?:3[0-2]|[12][0-9]|[1-9])?";

/// Fixed-point placeholders (`fixed`, `ufixed128x18`, ...).
pub const FIXED: &str = r"u?fixed(?:[0-9]+x[0-9]+)?";

/// Identifiers, including `$`.
pub const IDENT: &str = r"[a-zA-Z$_][a-zA-Z0-9$_]*";

pub const LOCATION: &str = "calldata|memory|storage";
pub const VISIBILITY: &str = "public|private|internal|external";
pub const MUTABILITY: &str = "pure|view|payable";

/// Array suffixes of any depth: `[]`, `[3]`, `[][N]`.
pub const ARRAY_SUFFIX: &str = r"(?:\[[^\[\]]*\])*";

pub fn uint() -> String {
    format!("uint(?:{INT_WIDTHS})?")
}

pub fn int() -> String {
    format!("int(?:{INT_WIDTHS})?")
}

/// Any elementary type name. Longer spellings come first in each
/// alternation; the trailing `\b` keeps `int` from matching `interface`.
pub fn elementary() -> String {
    format!(
        r"(?:address payable|address|bool|string|{}|{}|{}|{})\b",
        BYTES,
        uint(),
        int(),
        FIXED
    )
}

/// A dotted path naming a user-defined type: `Color`, `Lib.Point`.
pub fn user_path() -> String {
    format!(r"{IDENT}(?:\.{IDENT})*")
}

// ── Compound types ──────────────────────────────────────────────────

/// Function type: `function (uint256) external view returns (bool)`.
pub fn function_type() -> String {
    format!(
        r"function\s*\([^()]*\)(?:\s+(?:{VISIBILITY}|{MUTABILITY}))*(?:\s+returns\s*\([^()]*\))?"
    )
}

/// Key-value mapping, value side may nest further mappings.
pub const MAPPING: &str = r"mapping\s*\(.+=>.+\)";

/// Elementary type with optional array suffix.
pub fn elementary_array() -> String {
    format!("{}{}", elementary(), ARRAY_SUFFIX)
}

/// Any declarable type, without data location.
pub fn type_name() -> String {
    format!(
        "(?:{}|{}|{}|{}){}",
        MAPPING,
        function_type(),
        elementary(),
        user_path(),
        ARRAY_SUFFIX
    )
}

/// Any declarable type with an optional data location suffix.
pub fn type_name_with_location() -> String {
    format!(r"{}(?:\s+(?:{LOCATION}))?", type_name())
}

// ── Keywords ────────────────────────────────────────────────────────

/// Keywords that may start a statement and therefore must never be read as a
/// user-defined type name in `Type ident` position.
pub const STATEMENT_KEYWORDS: &[&str] = &[
    "return",
    "delete",
    "emit",
    "revert",
    "if",
    "else",
    "for",
    "while",
    "do",
    "break",
    "continue",
    "unchecked",
    "assembly",
    "try",
    "new",
    "import",
    "using",
    "pragma",
];

/// Keywords that qualify a user-defined type in compiler messages.
pub const USER_TYPE_QUALIFIERS: &[&str] = &["enum", "struct", "contract", "library", "interface"];

pub fn is_statement_keyword(word: &str) -> bool {
    STATEMENT_KEYWORDS.contains(&word)
}

// ── Compiled matchers ───────────────────────────────────────────────

static ELEMENTARY_ARRAY_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("^{}", elementary_array())).expect("valid type pattern"));

static USER_PATH_ARRAY_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!("^{}{}", user_path(), ARRAY_SUFFIX)).expect("valid path pattern")
});

static LOCATION_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"\s(?P<loc>{LOCATION})(?:\s+(?:pointer|ref|slice))?$"))
        .expect("valid location pattern")
});

static INNER_LOCATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"\s+(?:{LOCATION})(?:\s+(?:pointer|ref|slice))?\s*\["))
        .expect("valid inner location pattern")
});

/// Drop the data locations the compiler writes between array dimensions of
/// nested reference types (`string memory[] memory` -> `string[] memory`).
pub fn strip_inner_locations(text: &str) -> std::borrow::Cow<'_, str> {
    INNER_LOCATION.replace_all(text, "[")
}

/// Longest elementary type (plus array suffix) at the start of `text`.
pub fn match_elementary(text: &str) -> Option<&str> {
    ELEMENTARY_ARRAY_PREFIX.find(text).map(|m| m.as_str())
}

/// Dotted user path (plus array suffix) at the start of `text`.
pub fn match_user_path(text: &str) -> Option<&str> {
    USER_PATH_ARRAY_PREFIX.find(text).map(|m| m.as_str())
}

/// Trailing data location of a type spelling, if any (`string memory` ->
/// `memory`, `uint256[] storage ref` -> `storage`).
pub fn trailing_location(text: &str) -> Option<&str> {
    LOCATION_SUFFIX
        .captures(text)
        .and_then(|caps| caps.name("loc"))
        .map(|m| m.as_str())
}

/// Reference types cannot be returned without an explicit data location.
pub fn needs_memory_location(ty: &str) -> bool {
    ty.ends_with(']') || ty == "string" || ty == "bytes"
}
