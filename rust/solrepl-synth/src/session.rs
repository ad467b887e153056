//! Session store: the ordered list of accepted lines for one REPL run.
//!
//! A session only ever grows or shrinks at the tail. A submitted line is
//! appended tentatively, and popped again unless its trials end in success,
//! so every prefix of a session stays independently compilable.

use crate::classify::{self, Role, StatementLine};
use crate::resolve::CompileAttempt;
use crate::service::CompilerService;
use crate::Synthesizer;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    lines: Vec<StatementLine>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[StatementLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Accepted lines with their roles, in order.
    pub fn roles(&self) -> impl Iterator<Item = (Role, &StatementLine)> + '_ {
        self.lines
            .iter()
            .map(|line| (classify::classify(line).role(), line))
    }

    /// Drop the last accepted line.
    pub fn pop(&mut self) -> Option<StatementLine> {
        self.lines.pop()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Run one turn: append `raw`, resolve, and roll back unless it compiled.
    ///
    /// Returns the final attempt either way; the session afterwards is the
    /// old session, plus `raw` exactly when the attempt succeeded.
    pub fn submit<C: CompilerService>(
        &mut self,
        raw: &str,
        synth: &Synthesizer<C>,
    ) -> CompileAttempt {
        self.lines.push(StatementLine::new(raw));
        let attempt = synth.resolve(&self.lines);
        if !attempt.succeeded() {
            let rejected = self.lines.pop();
            debug!(line = ?rejected.as_ref().map(StatementLine::as_str), "rolled back line");
        }
        attempt
    }
}

impl<'a> IntoIterator for &'a Session {
    type Item = &'a StatementLine;
    type IntoIter = std::slice::Iter<'a, StatementLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}
