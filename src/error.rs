//! Centralised error hierarchy for the interpreter.
//!
//! Every stage (scanner, parser, resolver, runtime, CLI) converts its failure
//! modes into one of the variants defined here, enabling a uniform
//! `Result<T>` alias throughout the crate while preserving the source line of
//! the offending token.
//!
//! The module does not print diagnostics itself; the driver renders each
//! error as a plain `error at line L: ...` line.

use std::io;

use log::info;
use thiserror::Error;

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
pub enum LoxError {
    /// Lexical (scanner) error.
    #[error("error at line {line}: {message}")]
    Lex { message: String, line: usize },

    /// Syntactic (parser) error.
    #[error("error at line {line}: {message}")]
    Parse { message: String, line: usize },

    /// Static-analysis failure from the binding-distance pass.
    #[error("error at line {line}: {message}")]
    Resolve { message: String, line: usize },

    /// Runtime evaluation error.
    #[error("error at line {line}: {message}")]
    Runtime { message: String, line: usize },

    /// Wrapper around `std::io::Error`. Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl LoxError {
    /// Helper constructor for the scanner.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    /// Helper constructor for the parser.
    pub fn parse<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", line, message);

        LoxError::Parse { message, line }
    }

    /// Helper constructor for the resolver.
    pub fn resolve<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Resolve error: line={}, msg={}", line, message);

        LoxError::Resolve { message, line }
    }

    /// Helper constructor for the evaluator.
    pub fn runtime<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Runtime error: line={}, msg={}", line, message);

        LoxError::Runtime { message, line }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;
