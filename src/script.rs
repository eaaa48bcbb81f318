//! Replay of `.ocli` script files.
//!
//! A script is parsed completely before anything runs: any syntax error
//! rejects the whole file. Lines then execute in order. A failing line is
//! recorded and the next one runs; every failure is reported at the end as
//! a stack trace through the nested `.cmds:` calls that led to it.

use std::{fmt, fs, path::Path};

use tracing::{debug, info, warn};

use crate::{
    ast::Node,
    backend::BackendError,
    evaluator::{EvalError, Session},
    parser::{self, ParseError},
};

/// One statement of a script, possibly joined from continued lines.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptLine {
    /// Number of the first physical line, from 1
    pub number: usize,
    pub text: String,
    pub node: Node,
}

/// A place in a script file.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub file: String,
    pub line: usize,
    pub text: String,
}

/// A failed statement with the script lines that led to it, outermost first.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub frames: Vec<Frame>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScriptError {
    /// Lines that do not parse, as `(line number, text)`
    Syntax {
        file: String,
        lines: Vec<(usize, String)>,
    },
    /// Statements that failed while running
    Runtime(Vec<Failure>),
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::Syntax { file, lines } => {
                write!(f, "Syntax errors were found in the file: {}", file)?;
                write!(f, "\nThe following commands were invalid")?;
                for (number, text) in lines {
                    write!(f, "\n  LINE#: {}\tCOMMAND:{}", number, text)?;
                }
                Ok(())
            }
            ScriptError::Runtime(failures) => {
                for (i, failure) in failures.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    writeln!(f, "Stack trace (most recent call last):")?;
                    for frame in &failure.frames {
                        writeln!(f, "  File \"{}\", line {}", frame.file, frame.line)?;
                        writeln!(f, "    {}", frame.text)?;
                    }
                    write!(f, "Error : {}", failure.message)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ScriptError {}

/// Splits a script into statements and parses them.
///
/// `//` comments are dropped and a line ending with `\` continues on the
/// next one. Blank and comment-only lines yield no statement.
pub fn parse_script(text: &str) -> (Vec<ScriptLine>, Vec<(usize, String, ParseError)>) {
    let mut lines = Vec::new();
    let mut errors = Vec::new();
    let mut pending: Vec<String> = Vec::new();
    let mut start = 1;

    for (i, raw) in text.lines().enumerate() {
        let line = parser::strip_comment(raw).trim_end();
        if pending.is_empty() {
            start = i + 1;
        }
        if let Some(continued) = line.strip_suffix('\\') {
            pending.push(continued.trim().to_string());
            continue;
        }
        pending.push(line.trim().to_string());
        let statement = pending
            .drain(..)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if statement.is_empty() {
            continue;
        }
        match parser::parse(&statement) {
            Ok(Node::Nop) => {}
            Ok(node) => lines.push(ScriptLine {
                number: start,
                text: statement,
                node,
            }),
            Err(e) => errors.push((start, statement, e)),
        }
    }
    (lines, errors)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Runs every statement of the script at `path` in `session`.
pub fn run_file(session: &mut Session, path: &Path) -> Result<(), EvalError> {
    let text = fs::read_to_string(path)?;
    run_script(session, &file_name(path), &text)
}

/// Syntax errors of the script at `path`. Nothing runs.
pub fn check_file(path: &Path) -> Result<Vec<(usize, String, ParseError)>, EvalError> {
    let text = fs::read_to_string(path)?;
    let (_, errors) = parse_script(&text);
    Ok(errors)
}

/// Runs a script given as text; `file` names it in error reports.
pub fn run_script(session: &mut Session, file: &str, text: &str) -> Result<(), EvalError> {
    let (lines, errors) = parse_script(text);
    if !errors.is_empty() {
        for (number, _, e) in &errors {
            debug!(file, line = number, error = %e.message, "syntax error in script");
        }
        return Err(ScriptError::Syntax {
            file: file.to_string(),
            lines: errors.into_iter().map(|(n, text, _)| (n, text)).collect(),
        }
        .into());
    }

    info!(file, statements = lines.len(), "running script");
    let mut failures = Vec::new();
    for line in lines {
        debug!(file, line = line.number, text = %line.text, "script statement");
        let frame = Frame {
            file: file.to_string(),
            line: line.number,
            text: line.text.clone(),
        };
        match line.node.execute(session) {
            Ok(_) => {}
            Err(EvalError::Backend(BackendError::AlreadyExists(path))) => {
                warn!(file, line = line.number, "{} already exists, skipped", path);
            }
            Err(EvalError::Script(ScriptError::Runtime(nested))) => {
                failures.extend(nested.into_iter().map(|mut failure| {
                    failure.frames.insert(0, frame.clone());
                    failure
                }));
            }
            Err(e) => failures.push(Failure {
                frames: vec![frame],
                message: e.to_string(),
            }),
        }
        if session.exit_requested {
            break;
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(ScriptError::Runtime(failures).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_continuation_and_comments() {
        let text = "// header\n.var:a=1\n\nfor i in 1..2 { \\\n  .var:a=$a+1 \\\n}\n";
        let (lines, errors) = parse_script(text);
        assert!(errors.is_empty());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].number, 4);
        assert_eq!(lines[1].text, "for i in 1..2 { .var:a=$a+1 }");
    }

    #[test]
    fn test_syntax_report() {
        let error = ScriptError::Syntax {
            file: "f.ocli".to_string(),
            lines: vec![(1, "siteName=siteB".to_string())],
        };
        assert_eq!(
            error.to_string(),
            "Syntax errors were found in the file: f.ocli\nThe following commands were invalid\n  LINE#: 1\tCOMMAND:siteName=siteB"
        );
    }

    #[test]
    fn test_stack_trace_report() {
        let error = ScriptError::Runtime(vec![Failure {
            frames: vec![Frame {
                file: "f.ocli".to_string(),
                line: 1,
                text: ".var: i = eval 10/0".to_string(),
            }],
            message: "cannot divide by 0".to_string(),
        }]);
        assert_eq!(
            error.to_string(),
            "Stack trace (most recent call last):\n  File \"f.ocli\", line 1\n    .var: i = eval 10/0\nError : cannot divide by 0"
        );
    }
}
