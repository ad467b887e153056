//! Program assembler: renders a session snapshot into one complete source
//! unit whose entry point yields the value of the last line.
//!
//! Assembly is a pure function of `(lines, spec, options)`. The resolver
//! re-assembles the same snapshot several times with more information each
//! time, so the output must be byte-identical for identical inputs.

use crate::classify::{self, Classified, Role, StatementLine};

/// Fixed names and settings for the synthesized unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthOptions {
    /// Version constraint written after `pragma solidity`.
    pub pragma: String,
    /// Name of the container contract.
    pub contract_name: String,
    /// Name of the synthesized entry point.
    pub entry_point: String,
    /// Source unit name the compiler sees.
    pub source_name: String,
    /// Return type guessed by the first trial.
    pub placeholder_type: String,
}

impl Default for SynthOptions {
    fn default() -> Self {
        Self {
            pragma: "^0.8.0".to_string(),
            contract_name: "Main".to_string(),
            entry_point: "exec".to_string(),
            source_name: "main.sol".to_string(),
            placeholder_type: "int256".to_string(),
        }
    }
}

/// How the entry point closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnSpec {
    pub return_type: String,
    pub may_mutate: bool,
    /// `None` when the last line yields no retrievable value.
    pub return_expression: Option<String>,
}

impl ReturnSpec {
    /// The first-trial guess for a session.
    pub fn placeholder(lines: &[StatementLine], options: &SynthOptions) -> Self {
        ReturnSpec {
            return_type: options.placeholder_type.clone(),
            may_mutate: forces_mutation(lines),
            return_expression: return_expression(lines),
        }
    }
}

/// One synthesized source document and the spec it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationUnit {
    pub source: String,
    pub spec: ReturnSpec,
}

// ---------------------------------------------------------------------------
// Return expression
// ---------------------------------------------------------------------------

/// Expression that reads back the value of the last line, if it has one.
///
/// Only the tail can yield a value. Assignments, increments, declarations and
/// constants read back their identifier; bare expressions return themselves.
pub fn return_expression(lines: &[StatementLine]) -> Option<String> {
    let last = lines.last()?;
    let classified = classify::classify(last);
    match classified.role() {
        Role::Expression | Role::Declaration | Role::Constant => {}
        _ => return None,
    }
    match classified.ident() {
        Some(ident) => Some(ident.to_string()),
        None => Some(strip_terminator(last.as_str()).to_string()),
    }
}

fn strip_terminator(text: &str) -> &str {
    text.strip_suffix(';').unwrap_or(text).trim_end()
}

/// Whether any statement constructs a new instance, which rules out a
/// non-mutating entry point.
pub fn forces_mutation(lines: &[StatementLine]) -> bool {
    lines.iter().any(|line| {
        matches!(
            classify::classify(line).role(),
            Role::Expression | Role::Declaration | Role::Constant
        ) && classify::constructs_instance(line)
    })
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Buckets<'a> {
    imports: Vec<&'a str>,
    type_aliases: Vec<&'a str>,
    enums: Vec<&'a str>,
    constants: Vec<&'a str>,
    structs: Vec<&'a str>,
    interfaces: Vec<&'a str>,
    libraries: Vec<&'a str>,
    contracts: Vec<&'a str>,
    members: Vec<&'a str>,
    body: Vec<&'a str>,
}

impl<'a> Buckets<'a> {
    fn top_level(&self) -> [&Vec<&'a str>; 8] {
        [
            &self.imports,
            &self.type_aliases,
            &self.enums,
            &self.constants,
            &self.structs,
            &self.interfaces,
            &self.libraries,
            &self.contracts,
        ]
    }
}

fn partition<'a>(lines: &'a [StatementLine], spec: &ReturnSpec) -> Buckets<'a> {
    let mut buckets = Buckets::default();
    let last_index = lines.len().saturating_sub(1);

    for (index, line) in lines.iter().enumerate() {
        let text = line.as_str();
        let classified = classify::classify(line);
        match classified.role() {
            Role::Import => buckets.imports.push(text),
            Role::TypeAlias => buckets.type_aliases.push(text),
            Role::Enum => buckets.enums.push(text),
            Role::Constant => buckets.constants.push(text),
            Role::Struct => buckets.structs.push(text),
            Role::Interface => buckets.interfaces.push(text),
            Role::Library => buckets.libraries.push(text),
            Role::Contract => buckets.contracts.push(text),
            Role::Declaration if classified.is_local_declaration() => buckets.body.push(text),
            Role::UsingDirective | Role::Declaration | Role::Event | Role::Function => {
                buckets.members.push(text)
            }
            Role::Expression => {
                // a returned bare expression is evaluated by the return itself
                let returned_here = index == last_index
                    && spec.return_expression.is_some()
                    && matches!(classified, Classified::Expression { ident: None });
                if !returned_here {
                    buckets.body.push(text);
                }
            }
        }
    }

    buckets
}

fn push_indented(out: &mut String, text: &str, indent: &str) {
    for line in text.lines() {
        if line.trim().is_empty() {
            out.push('\n');
        } else {
            out.push_str(indent);
            out.push_str(line);
            out.push('\n');
        }
    }
}

/// Render the compilation unit for a session snapshot.
pub fn assemble(lines: &[StatementLine], spec: &ReturnSpec, options: &SynthOptions) -> CompilationUnit {
    let buckets = partition(lines, spec);
    let mut out = String::new();

    out.push_str("// SPDX-License-Identifier: UNLICENSED\n");
    out.push_str(&format!("pragma solidity {};\n", options.pragma));

    for bucket in buckets.top_level() {
        if bucket.is_empty() {
            continue;
        }
        out.push('\n');
        for text in bucket {
            push_indented(&mut out, text, "");
        }
    }

    out.push('\n');
    out.push_str(&format!("contract {} {{\n", options.contract_name));
    for text in &buckets.members {
        push_indented(&mut out, text, "    ");
    }
    if !buckets.members.is_empty() {
        out.push('\n');
    }

    let signature = match spec.return_expression {
        Some(_) => {
            let mutability = if spec.may_mutate { "" } else { " view" };
            format!(
                "function {}() public{} returns ({})",
                options.entry_point, mutability, spec.return_type
            )
        }
        None => format!("function {}() public", options.entry_point),
    };
    out.push_str(&format!("    {} {{\n", signature));
    for text in &buckets.body {
        push_indented(&mut out, text, "        ");
    }
    if let Some(ref expr) = spec.return_expression {
        out.push_str(&format!("        return {};\n", expr));
    }
    out.push_str("    }\n");
    out.push_str("}\n");

    CompilationUnit {
        source: out,
        spec: spec.clone(),
    }
}
