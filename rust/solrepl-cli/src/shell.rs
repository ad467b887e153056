//! One REPL turn: add the line to the session, compile, and run the result.

use solrepl_evm::{ExecutionService, Value};
use solrepl_synth::{CompilerService, Diagnostic, Session, StatementLine, Synthesizer};
use tracing::debug;

/// What a turn produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Value of the last statement.
    Value(Value),
    /// Ran, but the last statement has no value.
    NoValue,
    /// Compiled with execution disabled. Carries the resolved return type
    /// when the entry point returns anything.
    Compiled { return_type: Option<String> },
    /// The line did not compile. The session is unchanged.
    CompileFailed(Diagnostic),
    /// The line compiled but running it failed. The session is unchanged.
    ExecFailed(String),
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::CompileFailed(_) | Outcome::ExecFailed(_))
    }
}

/// A session bound to the services that evaluate it.
pub struct Shell<C, E> {
    synth: Synthesizer<C>,
    executor: Option<E>,
    session: Session,
    last_source: Option<String>,
}

impl<C: CompilerService, E: ExecutionService> Shell<C, E> {
    /// `executor: None` compiles without running.
    pub fn new(synth: Synthesizer<C>, executor: Option<E>) -> Self {
        Self {
            synth,
            executor,
            session: Session::new(),
            last_source: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn synthesizer(&self) -> &Synthesizer<C> {
        &self.synth
    }

    /// Source of the most recent compile, accepted or not.
    pub fn last_source(&self) -> Option<&str> {
        self.last_source.as_deref()
    }

    pub fn reset(&mut self) {
        self.session.clear();
        self.last_source = None;
    }

    pub fn pop(&mut self) -> Option<StatementLine> {
        self.session.pop()
    }

    pub fn eval(&mut self, line: &str) -> Outcome {
        let attempt = self.session.submit(line, &self.synth);
        self.last_source = Some(attempt.unit.source.clone());

        let artifact = match attempt.artifact {
            Some(ref artifact) => artifact,
            None => {
                let diag = attempt.error().cloned().unwrap_or_else(|| {
                    Diagnostic::error("ServiceError", "compiler produced no artifact")
                });
                return Outcome::CompileFailed(diag);
            }
        };

        let Some(ref executor) = self.executor else {
            let spec = &attempt.unit.spec;
            return Outcome::Compiled {
                return_type: spec
                    .return_expression
                    .as_ref()
                    .map(|_| spec.return_type.clone()),
            };
        };

        match executor.execute(artifact, &self.synth.options().entry_point) {
            Ok(Some(value)) => Outcome::Value(value),
            Ok(None) => Outcome::NoValue,
            Err(err) => {
                let rejected = self.session.pop();
                debug!(line = ?rejected.as_ref().map(StatementLine::as_str), "execution failed, rolled back");
                Outcome::ExecFailed(err.to_string())
            }
        }
    }
}
