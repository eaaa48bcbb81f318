//! Tab completion for the REPL.
//!
//! [`complete_line`] is a pure function over a snapshot of the session:
//! command keywords and aliases for the first word of a statement, `$`
//! variables, and children of the hierarchy for path arguments.
//! [`OcliHelper`] wires it into `rustyline` with its own backend handle.

use std::sync::{Arc, Mutex, RwLock};

use rustyline::{
    Context, Helper,
    completion::{Completer, Pair},
    highlight::Highlighter,
    hint::Hinter,
    validate::Validator,
};

use crate::{
    backend::{Backend, Filters},
    parser::KEYWORDS,
    path::{self, LOGICAL, ORGANISATION},
};

/// Characters after which a new word starts.
const WORD_BREAKS: &[char] = &[' ', '\t', ';', '{', '}', '(', ',', '@', '=', '>', ':'];

/// Commands whose arguments are paths.
const PATH_COMMANDS: &[&str] = &[
    "cd", "ls", "tree", "get", "getu", "getslot", "draw", "undraw", "drawable", "unlink", "link",
    "cp", "lssite", "lsbldg", "lsroom", "lsrack", "lsdev", "lsac", "lspanel", "lscabinet",
    "lscorridor",
];

/// What completion knows of the session.
#[derive(Debug, Clone, Default)]
pub struct CompletionState {
    pub current_path: String,
    pub variables: Vec<String>,
    pub aliases: Vec<String>,
}

/// Names of the children of `dir`, namespaces included.
pub fn child_names(backend: &mut dyn Backend, dir: &str) -> Vec<String> {
    let mut names: Vec<String> = path::NAMESPACES
        .iter()
        .filter(|ns| **ns != "/" && path::parent(ns) == dir)
        .map(|ns| path::base_name(ns).to_string())
        .collect();
    if !matches!(dir, "/" | LOGICAL | ORGANISATION) {
        if let Ok(children) = backend.get_children(dir, &Filters::default()) {
            names.extend(children.iter().map(|(child, _)| path::base_name(child).to_string()));
        }
    }
    names.sort();
    names.dedup();
    names
}

fn with_prefix<'a>(items: impl IntoIterator<Item = &'a str>, prefix: &str) -> Vec<String> {
    let mut matched: Vec<String> = items
        .into_iter()
        .filter(|item| item.starts_with(prefix))
        .map(str::to_string)
        .collect();
    matched.sort();
    matched.dedup();
    matched
}

/// Candidates for the word ending at `pos`, with the offset it starts at.
///
/// `children` lists the child names of an absolute path.
pub fn complete_line(
    line: &str,
    pos: usize,
    state: &CompletionState,
    mut children: impl FnMut(&str) -> Vec<String>,
) -> (usize, Vec<String>) {
    let before = &line[..pos];
    let start = before.rfind(WORD_BREAKS).map(|i| i + 1).unwrap_or(0);
    let word = &before[start..];

    if let Some(name) = word.strip_prefix('$') {
        let vars = with_prefix(state.variables.iter().map(String::as_str), name);
        return (start, vars.into_iter().map(|v| format!("${}", v)).collect());
    }

    let statement = before[..start]
        .rsplit([';', '{'])
        .next()
        .unwrap_or_default()
        .trim_start();
    if statement.is_empty() && !word.starts_with(['/', '.']) {
        let keywords = KEYWORDS
            .iter()
            .copied()
            .filter(|k| k.starts_with(|c: char| c.is_ascii_alphabetic() || c == '.'));
        let aliases = state.aliases.iter().map(String::as_str);
        return (start, with_prefix(keywords.chain(aliases), word));
    }

    let command = statement.split_whitespace().next().unwrap_or_default();
    let command = command.trim_end_matches(':');
    let wants_path = PATH_COMMANDS.contains(&command)
        || statement.starts_with(['+', '-', '=', '>'])
        || word.starts_with(['/', '.']);
    if !wants_path {
        return (start, Vec::new());
    }

    // complete the last segment, keeping what precedes it
    let (dir_part, name) = match word.rfind('/') {
        Some(i) => (&word[..=i], &word[i + 1..]),
        None => ("", word),
    };
    let dir = path::resolve(dir_part, &state.current_path, &state.current_path);
    let names = children(&dir);
    let candidates = with_prefix(names.iter().map(String::as_str), name)
        .into_iter()
        .map(|n| format!("{}{}", dir_part, n))
        .collect();
    (start, candidates)
}

/// `rustyline` helper completing against the session and the backend.
pub struct OcliHelper {
    backend: Mutex<Box<dyn Backend + Send>>,
    state: Arc<RwLock<CompletionState>>,
}

impl OcliHelper {
    pub fn new(backend: Box<dyn Backend + Send>, state: Arc<RwLock<CompletionState>>) -> Self {
        OcliHelper {
            backend: Mutex::new(backend),
            state,
        }
    }
}

impl Completer for OcliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let Ok(state) = self.state.read() else {
            return Ok((pos, Vec::new()));
        };
        let (start, candidates) = complete_line(line, pos, &state, |dir| match self.backend.lock() {
            Ok(mut backend) => child_names(backend.as_mut(), dir),
            Err(_) => Vec::new(),
        });
        let pairs = candidates
            .into_iter()
            .map(|candidate| Pair {
                display: path::base_name(&candidate).to_string(),
                replacement: candidate,
            })
            .collect();
        Ok((start, pairs))
    }
}

impl Hinter for OcliHelper {
    type Hint = String;
}

impl Highlighter for OcliHelper {}

impl Validator for OcliHelper {}

impl Helper for OcliHelper {}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> CompletionState {
        CompletionState {
            current_path: "/Physical/S".to_string(),
            variables: vec!["count".to_string(), "name".to_string()],
            aliases: vec!["lsall".to_string()],
        }
    }

    fn no_children(_: &str) -> Vec<String> {
        Vec::new()
    }

    #[test]
    fn test_first_word_completes_commands_and_aliases() {
        let (start, candidates) = complete_line("ls", 2, &state(), no_children);
        assert_eq!(start, 0);
        assert!(candidates.contains(&"lsrack".to_string()));
        assert!(candidates.contains(&"lsall".to_string()));
        assert!(!candidates.contains(&"cd".to_string()));
    }

    #[test]
    fn test_variables() {
        let (start, candidates) = complete_line("print $c", 8, &state(), no_children);
        assert_eq!(start, 6);
        assert_eq!(candidates, vec!["$count"]);
    }

    #[test]
    fn test_paths_are_completed_from_their_directory() {
        let (start, candidates) = complete_line("cd B1/R", 7, &state(), |dir| {
            assert_eq!(dir, "/Physical/S/B1");
            vec!["R1".to_string(), "R2".to_string(), "X".to_string()]
        });
        assert_eq!(start, 3);
        assert_eq!(candidates, vec!["B1/R1", "B1/R2"]);
    }

    #[test]
    fn test_statement_after_semicolon() {
        let (_, candidates) = complete_line("pwd; tr", 7, &state(), no_children);
        assert_eq!(candidates, vec!["tree"]);
    }
}
