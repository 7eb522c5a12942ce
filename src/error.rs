// SPDX-License-Identifier: Apache-2.0

//! Crate-wide error type.

use std::fmt;
use std::io;

#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    /// A persisted cache file did not parse.
    CacheFormat {
        line: usize,
        message: String,
    },
    /// The underlying SAT backend reported a failure.
    Solver(String),
    /// An internal consistency check failed; indicates a programming error,
    /// not a property of the input.
    InvariantViolation(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "i/o error: {}", e),
            Error::CacheFormat { line, message } => {
                write!(f, "cache file format error at line {}: {}", line, message)
            }
            Error::Solver(msg) => write!(f, "SAT solver error: {}", msg),
            Error::InvariantViolation(msg) => write!(f, "invariant violation: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}
