//! Return-type/mutability resolver.
//!
//! Drives at most three trial compilations. The first guesses a placeholder
//! return type; each following trial applies one correction from a fixed
//! ladder, fed by the first error of the previous trial:
//!
//! ```text
//! Guessing --(return type mismatch)--> TypeCorrected --(view violation)--> MutabilityCorrected
//! ```
//!
//! A correction whose signal is absent is skipped. The resolver stops at the
//! first trial without errors, or when the ladder is exhausted, and returns the
//! last attempt.

use crate::assemble::{self, CompilationUnit, ReturnSpec, SynthOptions};
use crate::classify::StatementLine;
use crate::diagnostics::{self, Diagnostic, DiagnosticInterpreter, ReturnTypeFix};
use crate::service::{CompiledArtifact, CompilerService, ImportResolver};
use tracing::debug;

/// One synthesize-and-compile trial.
#[derive(Debug, Clone)]
pub struct CompileAttempt {
    pub unit: CompilationUnit,
    /// Everything the compiler reported, warnings included.
    pub diagnostics: Vec<Diagnostic>,
    /// Present exactly when `diagnostics` holds no error.
    pub artifact: Option<CompiledArtifact>,
    /// 1-based trial number that produced this attempt.
    pub trial: usize,
}

impl CompileAttempt {
    pub fn error(&self) -> Option<&Diagnostic> {
        diagnostics::first_error(&self.diagnostics)
    }

    pub fn succeeded(&self) -> bool {
        self.artifact.is_some()
    }
}

/// Where the resolver stands after a trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Guessing,
    TypeCorrected,
    MutabilityCorrected,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Correction {
    ReturnType,
    Mutability,
}

const LADDER: [Correction; 2] = [Correction::ReturnType, Correction::Mutability];

impl Correction {
    fn stage(self) -> Stage {
        match self {
            Correction::ReturnType => Stage::TypeCorrected,
            Correction::Mutability => Stage::MutabilityCorrected,
        }
    }

    /// The next spec, if `diag` carries this correction's signal.
    fn apply(
        self,
        diag: &Diagnostic,
        spec: &ReturnSpec,
        interpreter: &dyn DiagnosticInterpreter,
    ) -> Option<ReturnSpec> {
        match self {
            Correction::ReturnType => match interpreter.return_type(diag)? {
                ReturnTypeFix::Type(ty) => Some(ReturnSpec {
                    return_type: ty,
                    ..spec.clone()
                }),
                ReturnTypeFix::NoValue => Some(ReturnSpec {
                    return_expression: None,
                    ..spec.clone()
                }),
            },
            Correction::Mutability => {
                if spec.may_mutate || !interpreter.requires_mutation(diag) {
                    return None;
                }
                Some(ReturnSpec {
                    may_mutate: true,
                    ..spec.clone()
                })
            }
        }
    }
}

/// Everything a resolver run needs besides the session snapshot.
pub struct ResolveContext<'a, C: CompilerService> {
    pub compiler: &'a C,
    pub imports: &'a dyn ImportResolver,
    pub interpreter: &'a dyn DiagnosticInterpreter,
    pub options: &'a SynthOptions,
}

impl<C: CompilerService> ResolveContext<'_, C> {
    fn trial(&self, lines: &[StatementLine], spec: &ReturnSpec, trial: usize) -> CompileAttempt {
        let unit = assemble::assemble(lines, spec, self.options);
        debug!(
            trial,
            return_type = %spec.return_type,
            may_mutate = spec.may_mutate,
            returns_value = spec.return_expression.is_some(),
            "compiling synthesized unit"
        );

        let output = match self
            .compiler
            .compile(&self.options.source_name, &unit.source, self.imports)
        {
            Ok(output) => output,
            Err(err) => {
                return CompileAttempt {
                    unit,
                    diagnostics: vec![Diagnostic::error("ServiceError", err.to_string())],
                    artifact: None,
                    trial,
                }
            }
        };

        let mut diagnostics = output.diagnostics;
        let mut contracts = output.contracts;
        let artifact = if diagnostics::first_error(&diagnostics).is_some() {
            None
        } else {
            let found = contracts.remove(&self.options.contract_name);
            if found.is_none() {
                diagnostics.push(Diagnostic::error(
                    "ServiceError",
                    format!(
                        "compiler output has no contract '{}'",
                        self.options.contract_name
                    ),
                ));
            }
            found
        };

        debug!(
            trial,
            ok = artifact.is_some(),
            error = ?diagnostics::first_error(&diagnostics).map(|d| d.message.as_str()),
            "trial finished"
        );
        CompileAttempt {
            unit,
            diagnostics,
            artifact,
            trial,
        }
    }
}

/// Resolve the entry point's return type and mutability for `lines`.
pub fn resolve<C: CompilerService>(
    lines: &[StatementLine],
    ctx: &ResolveContext<'_, C>,
) -> CompileAttempt {
    let spec = ReturnSpec::placeholder(lines, ctx.options);
    let mut attempt = ctx.trial(lines, &spec, 1);
    let mut stage = Stage::Guessing;

    for correction in LADDER {
        let Some(diag) = attempt.error() else {
            break;
        };
        let Some(next) = correction.apply(diag, &attempt.unit.spec, ctx.interpreter) else {
            continue;
        };
        stage = correction.stage();
        attempt = ctx.trial(lines, &next, attempt.trial + 1);
    }

    if attempt.succeeded() {
        stage = Stage::Done;
    }
    debug!(?stage, trials = attempt.trial, "resolver finished");
    attempt
}
