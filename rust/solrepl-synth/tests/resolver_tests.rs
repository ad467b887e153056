use solrepl_synth::{
    CompiledArtifact, CompilerOutput, CompilerService, Diagnostic, ImportResolver, Session,
    Severity, Synthesizer,
};
use std::cell::RefCell;
use std::collections::BTreeMap;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Scripted compiler
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
#[error("solc not found")]
struct Unavailable;

/// Compiler fake that answers each source with a rule and records every
/// source it was given.
struct ScriptedCompiler<F> {
    rule: F,
    seen: RefCell<Vec<String>>,
    unavailable: bool,
}

impl<F: Fn(&str) -> Vec<Diagnostic>> ScriptedCompiler<F> {
    fn new(rule: F) -> Self {
        Self {
            rule,
            seen: RefCell::new(Vec::new()),
            unavailable: false,
        }
    }

    fn calls(&self) -> usize {
        self.seen.borrow().len()
    }
}

impl<F: Fn(&str) -> Vec<Diagnostic>> CompilerService for ScriptedCompiler<F> {
    type Error = Unavailable;

    fn compile(
        &self,
        source_name: &str,
        source: &str,
        _imports: &dyn ImportResolver,
    ) -> Result<CompilerOutput, Unavailable> {
        assert_eq!(source_name, "main.sol");
        self.seen.borrow_mut().push(source.to_string());
        if self.unavailable {
            return Err(Unavailable);
        }
        let diagnostics = (self.rule)(source);
        let mut contracts = BTreeMap::new();
        if !diagnostics.iter().any(|d| d.is_error()) {
            contracts.insert(
                "Main".to_string(),
                CompiledArtifact {
                    name: "Main".into(),
                    abi: Vec::new(),
                    bytecode: "6080".into(),
                    method_identifiers: BTreeMap::from([(
                        "exec()".to_string(),
                        "c0406226".to_string(),
                    )]),
                },
            );
        }
        Ok(CompilerOutput {
            diagnostics,
            contracts,
        })
    }
}

fn mismatch(ty: &str) -> Vec<Diagnostic> {
    vec![Diagnostic::error(
        "TypeError",
        format!(
            "Return argument type {} is not implicitly convertible to expected type (type of first return variable) int256.",
            ty
        ),
    )]
}

fn view_violation() -> Vec<Diagnostic> {
    vec![Diagnostic::error(
        "TypeError",
        "Function declared as view, but this expression (potentially) modifies the state and thus requires non-payable (the default) or payable.",
    )]
}

fn warning(message: &str) -> Diagnostic {
    Diagnostic {
        severity: Severity::Warning,
        message: message.to_string(),
        rendered: format!("Warning: {}", message),
        kind: Some("Warning".into()),
        code: None,
    }
}

/// Mismatch until the source returns `ty`, then success.
fn expects_type(ty: &'static str, reported: &'static str) -> impl Fn(&str) -> Vec<Diagnostic> {
    move |src: &str| {
        if src.contains(&format!("returns ({})", ty)) {
            Vec::new()
        } else {
            mismatch(reported)
        }
    }
}

// ---------------------------------------------------------------------------
// End-to-end scenarios
// ---------------------------------------------------------------------------

#[test]
fn sums_two_state_variables() {
    let synth = Synthesizer::new(ScriptedCompiler::new(expects_type("uint256", "uint256")));
    let result = synth.compile(&["uint256 a = 2", "uint256 b = 3", "a + b"]);

    assert!(result.error.is_none(), "unexpected error: {:?}", result.error);
    assert!(result.artifact.is_some());
    assert_eq!(result.spec.return_type, "uint256");
    assert!(!result.spec.may_mutate);
    assert!(result
        .source
        .contains("function exec() public view returns (uint256) {"));
    assert!(result.source.contains("        return a + b;\n"));
    assert_eq!(synth.compiler().calls(), 2);
}

#[test]
fn recovers_string_memory_from_the_diagnostic() {
    let synth = Synthesizer::new(ScriptedCompiler::new(expects_type(
        "string memory",
        "string memory",
    )));
    let result = synth.compile(&["string memory s = \"hi\""]);

    assert!(result.error.is_none());
    assert_eq!(result.spec.return_type, "string memory");
    assert!(result.source.contains("        string memory s = \"hi\";\n        return s;\n"));
}

#[test]
fn recovers_arrays_of_reference_types() {
    let synth = Synthesizer::new(ScriptedCompiler::new(expects_type(
        "string[] memory",
        "string memory[] memory",
    )));
    let result = synth.compile(&["string[] memory xs = new string[](2)"]);

    assert!(result.error.is_none(), "unexpected error: {:?}", result.error);
    assert_eq!(result.spec.return_type, "string[] memory");
    assert!(result.source.contains("returns (string[] memory)"));
    assert_eq!(synth.compiler().calls(), 2);

    let synth = Synthesizer::new(ScriptedCompiler::new(expects_type(
        "uint256[][] memory",
        "uint256[] memory[] memory",
    )));
    let result = synth.compile(&["uint256[][] memory m = new uint256[][](1)"]);
    assert!(result.error.is_none(), "unexpected error: {:?}", result.error);
    assert_eq!(result.spec.return_type, "uint256[][] memory");
}

#[test]
fn recovers_user_value_types() {
    let synth = Synthesizer::new(ScriptedCompiler::new(expects_type("Price", "Price")));
    let result = synth.compile(&["type Price is uint128", "Price p = Price.wrap(1)"]);

    assert!(result.error.is_none(), "unexpected error: {:?}", result.error);
    assert_eq!(result.spec.return_type, "Price");
    assert!(result.source.contains("        return p;\n"));
}

#[test]
fn new_instances_mutate_from_the_first_trial() {
    let compiler = ScriptedCompiler::new(|src: &str| {
        assert!(
            !src.contains(" view "),
            "entry point must not be view when constructing instances"
        );
        if src.contains("returns (SomeContract)") {
            Vec::new()
        } else {
            mismatch("contract SomeContract")
        }
    });
    let synth = Synthesizer::new(compiler);
    let result = synth.compile(&["contract SomeContract {}", "SomeContract c = new SomeContract()"]);

    assert!(result.error.is_none());
    assert!(result.spec.may_mutate);
    assert_eq!(result.spec.return_type, "SomeContract");
    assert_eq!(synth.compiler().calls(), 2);
}

#[test]
fn failing_line_is_rolled_back() {
    let synth = Synthesizer::new(ScriptedCompiler::new(|_: &str| {
        vec![Diagnostic::error("TypeError", "Division by zero.")]
    }));
    let mut session = Session::new();
    let attempt = session.submit("1/0", &synth);

    assert!(!attempt.succeeded());
    assert_eq!(attempt.error().map(|d| d.message.as_str()), Some("Division by zero."));
    assert!(session.is_empty());
    assert!(attempt.unit.source.contains("return 1/0;"));
}

// ---------------------------------------------------------------------------
// Trial ladder
// ---------------------------------------------------------------------------

#[test]
fn type_then_mutability_takes_three_trials() {
    let compiler = ScriptedCompiler::new(|src: &str| {
        if src.contains("returns (int256)") {
            mismatch("uint256")
        } else if src.contains(" view ") {
            view_violation()
        } else {
            Vec::new()
        }
    });
    let synth = Synthesizer::new(compiler);
    let attempt = synth.resolve(&[
        "uint256 x = 1".into(),
        "x = 5".into(),
    ]);

    assert!(attempt.succeeded());
    assert_eq!(attempt.trial, 3);
    assert_eq!(attempt.unit.spec.return_type, "uint256");
    assert!(attempt.unit.spec.may_mutate);
    assert!(attempt
        .unit
        .source
        .contains("function exec() public returns (uint256) {\n        x = 5;\n        return x;\n"));
}

#[test]
fn mutability_signal_on_the_first_trial() {
    let compiler = ScriptedCompiler::new(|src: &str| {
        if src.contains(" view ") {
            view_violation()
        } else {
            Vec::new()
        }
    });
    let synth = Synthesizer::new(compiler);
    let result = synth.compile(&["int256 n = 1", "n -= 4"]);

    assert!(result.error.is_none());
    assert!(result.spec.may_mutate);
    assert_eq!(result.spec.return_type, "int256");
    assert_eq!(synth.compiler().calls(), 2);
}

#[test]
fn unrecognized_error_surfaces_the_first_trial() {
    let synth = Synthesizer::new(ScriptedCompiler::new(|_: &str| {
        vec![Diagnostic::error("DeclarationError", "Undeclared identifier.")]
    }));
    let attempt = synth.resolve(&["nope".into()]);

    assert_eq!(attempt.trial, 1);
    assert_eq!(synth.compiler().calls(), 1);
    assert_eq!(
        attempt.error().map(|d| d.kind.as_deref()),
        Some(Some("DeclarationError"))
    );
}

#[test]
fn ladder_stops_after_three_trials() {
    let compiler = ScriptedCompiler::new(|src: &str| {
        if src.contains("returns (int256)") {
            mismatch("uint8")
        } else if src.contains(" view ") {
            view_violation()
        } else {
            vec![Diagnostic::error("TypeError", "Still broken.")]
        }
    });
    let synth = Synthesizer::new(compiler);
    let attempt = synth.resolve(&["uint8 x = 1".into(), "x++".into()]);

    assert_eq!(attempt.trial, 3);
    assert_eq!(synth.compiler().calls(), 3);
    assert!(!attempt.succeeded());
    assert_eq!(attempt.error().map(|d| d.message.as_str()), Some("Still broken."));
}

#[test]
fn valueless_statement_drops_the_return_clause() {
    let compiler = ScriptedCompiler::new(|src: &str| {
        if src.contains("returns (") {
            mismatch("tuple()")
        } else {
            Vec::new()
        }
    });
    let synth = Synthesizer::new(compiler);
    let result = synth.compile(&["function poke() public {}", "poke()"]);

    assert!(result.error.is_none());
    assert_eq!(result.spec.return_expression, None);
    assert!(result.source.contains("    function exec() public {\n        poke();\n    }\n"));
}

#[test]
fn warnings_do_not_block_or_steer() {
    let compiler = ScriptedCompiler::new(|src: &str| {
        let mut diags = vec![warning("Function state mutability can be restricted to pure")];
        if src.contains("returns (int256)") {
            diags.extend(mismatch("bool"));
        }
        diags
    });
    let synth = Synthesizer::new(compiler);
    let result = synth.compile(&["true"]);

    assert!(result.error.is_none());
    assert!(result.artifact.is_some());
    assert_eq!(result.spec.return_type, "bool");
    assert_eq!(result.warnings.len(), 1);
}

#[test]
fn unavailable_compiler_is_reported_not_raised() {
    let mut compiler = ScriptedCompiler::new(|_: &str| Vec::new());
    compiler.unavailable = true;
    let synth = Synthesizer::new(compiler);
    let result = synth.compile(&["1"]);

    let err = result.error.expect("service error");
    assert_eq!(err.kind.as_deref(), Some("ServiceError"));
    assert_eq!(err.message, "solc not found");
    assert!(result.artifact.is_none());
}

// ---------------------------------------------------------------------------
// Session invariants
// ---------------------------------------------------------------------------

#[test]
fn successful_turn_appends_exactly_one_line() {
    let synth = Synthesizer::new(ScriptedCompiler::new(expects_type("uint256", "uint256")));
    let mut session = Session::new();

    assert!(session.submit("uint256 a = 2", &synth).succeeded());
    let before = session.clone();
    assert!(session.submit("a * 3", &synth).succeeded());

    assert_eq!(session.len(), before.len() + 1);
    assert_eq!(&session.lines()[..before.len()], before.lines());
    assert_eq!(session.lines().last().map(|l| l.as_str()), Some("a * 3;"));
}

#[test]
fn failed_turn_leaves_session_untouched() {
    let synth = Synthesizer::new(ScriptedCompiler::new(|src: &str| {
        if src.contains("bad") {
            vec![Diagnostic::error("ParserError", "Expected ';' but got identifier")]
        } else {
            Vec::new()
        }
    }));
    let mut session = Session::new();
    assert!(session.submit("contract A {}", &synth).succeeded());
    let before = session.clone();

    let attempt = session.submit("bad bad bad", &synth);
    assert!(!attempt.succeeded());
    assert_eq!(session, before);
}

#[test]
fn compiling_twice_is_deterministic() {
    let synth = Synthesizer::new(ScriptedCompiler::new(expects_type("uint256", "uint256")));
    let lines = ["uint256 a = 2", "a += 1", "a"];
    let first = synth.compile(&lines);
    let second = synth.compile(&lines);
    assert_eq!(first.source, second.source);

    let seen = synth.compiler().seen.borrow();
    assert_eq!(seen[0], seen[2]);
    assert_eq!(seen[1], seen[3]);
}
