//! solrepl command-line library: configuration, the evaluation shell and the
//! interactive loop.

pub mod colors;
pub mod config;
pub mod repl;
pub mod shell;
