//! Session synthesizer for the Solidity REPL.
//!
//! Turns an ordered list of loose statements into one complete source unit
//! with a single entry point that yields the value of the last statement, and
//! discovers the entry point's return type and mutability by trial
//! compilation.

pub mod assemble;
pub mod classify;
pub mod diagnostics;
pub mod grammar;
pub mod resolve;
pub mod service;
pub mod session;

pub use assemble::{CompilationUnit, ReturnSpec, SynthOptions};
pub use classify::{Classified, Role, StatementLine};
pub use diagnostics::{Diagnostic, DiagnosticInterpreter, Severity, SolcDiagnostics};
pub use resolve::CompileAttempt;
pub use service::{
    AbiEntry, AbiParam, CompiledArtifact, CompilerOutput, CompilerService, ImportError,
    ImportResolver, NoImports,
};
pub use session::Session;

use resolve::ResolveContext;

/// Result of [`Synthesizer::compile`], as handed to the shell.
#[derive(Debug, Clone)]
pub struct CompileResult {
    /// Synthesized source of the final trial.
    pub source: String,
    pub spec: ReturnSpec,
    pub error: Option<Diagnostic>,
    pub artifact: Option<CompiledArtifact>,
    pub warnings: Vec<Diagnostic>,
}

impl From<CompileAttempt> for CompileResult {
    fn from(attempt: CompileAttempt) -> Self {
        let error = attempt.error().cloned();
        let warnings = attempt
            .diagnostics
            .iter()
            .filter(|d| !d.is_error())
            .cloned()
            .collect();
        CompileResult {
            source: attempt.unit.source,
            spec: attempt.unit.spec,
            error,
            artifact: attempt.artifact,
            warnings,
        }
    }
}

/// The compiler service plus everything needed to drive it for a session.
pub struct Synthesizer<C> {
    compiler: C,
    imports: Box<dyn ImportResolver>,
    interpreter: Box<dyn DiagnosticInterpreter>,
    options: SynthOptions,
}

impl<C: CompilerService> Synthesizer<C> {
    pub fn new(compiler: C) -> Self {
        Self {
            compiler,
            imports: Box::new(NoImports),
            interpreter: Box::new(SolcDiagnostics),
            options: SynthOptions::default(),
        }
    }

    pub fn with_imports(mut self, imports: impl ImportResolver + 'static) -> Self {
        self.imports = Box::new(imports);
        self
    }

    pub fn with_interpreter(mut self, interpreter: impl DiagnosticInterpreter + 'static) -> Self {
        self.interpreter = Box::new(interpreter);
        self
    }

    pub fn with_options(mut self, options: SynthOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &SynthOptions {
        &self.options
    }

    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    /// Run the trial ladder over a session snapshot.
    pub fn resolve(&self, lines: &[StatementLine]) -> CompileAttempt {
        let ctx = ResolveContext {
            compiler: &self.compiler,
            imports: self.imports.as_ref(),
            interpreter: self.interpreter.as_ref(),
            options: &self.options,
        };
        resolve::resolve(lines, &ctx)
    }

    /// Compile a whole session given as raw lines. Never fails: every
    /// failure is reported in the result.
    pub fn compile<S: AsRef<str>>(&self, session: &[S]) -> CompileResult {
        let lines: Vec<StatementLine> = session
            .iter()
            .map(|raw| StatementLine::new(raw.as_ref()))
            .collect();
        self.resolve(&lines).into()
    }

    /// Render a session with its first-trial guess, without compiling.
    pub fn preview<S: AsRef<str>>(&self, session: &[S]) -> CompilationUnit {
        let lines: Vec<StatementLine> = session
            .iter()
            .map(|raw| StatementLine::new(raw.as_ref()))
            .collect();
        let spec = ReturnSpec::placeholder(&lines, &self.options);
        assemble::assemble(&lines, &spec, &self.options)
    }
}
