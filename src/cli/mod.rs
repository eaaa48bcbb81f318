//! Errors and documentation of the command line front end

pub mod docs;

pub use docs::{ManPage, get_manual_overview, get_manual_page};

use std::io;

/// Errors that can occur while running a command line or a script
#[derive(Debug)]
pub enum CliError {
    /// Parser error
    Parse(crate::ParseError),
    /// Evaluation error
    Eval(crate::EvalError),
    /// IO error
    Io(io::Error),
    /// Unknown manual topic
    UnknownTopic(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Parse(e) => write!(f, "{}", e),
            CliError::Eval(crate::EvalError::Script(e)) => write!(f, "{}", e),
            CliError::Eval(e) => write!(f, "Error : {}", e),
            CliError::Io(e) => write!(f, "IO error: {}", e),
            CliError::UnknownTopic(t) => {
                write!(f, "Unknown topic: '{}'\nRun 'man' to see available topics.", t)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Parse(e) => Some(e),
            CliError::Eval(e) => Some(e),
            CliError::Io(e) => Some(e),
            CliError::UnknownTopic(_) => None,
        }
    }
}

impl From<crate::ParseError> for CliError {
    fn from(e: crate::ParseError) -> Self {
        CliError::Parse(e)
    }
}

impl From<crate::EvalError> for CliError {
    fn from(e: crate::EvalError) -> Self {
        CliError::Eval(e)
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}
