//! Interactive loop.

use std::{
    io,
    path::Path,
    sync::{Arc, RwLock},
};

use rustyline::{Editor, error::ReadlineError, history::DefaultHistory};
use tracing::{debug, error, info, warn};

use crate::{
    backend::Backend,
    cli::CliError,
    completer::{CompletionState, OcliHelper},
    evaluator::Session,
};

fn refresh(state: &RwLock<CompletionState>, session: &Session) {
    if let Ok(mut state) = state.write() {
        state.current_path = session.env.current_path.clone();
        state.variables = session.env.variables().map(|(name, _)| name.clone()).collect();
        state.aliases = session
            .env
            .alias_names()
            .into_iter()
            .map(str::to_string)
            .collect();
    }
}

fn prompt(session: &Session) -> String {
    format!("\x1b[1;32m{}\x1b[0m> ", session.env.current_path)
}

/// Reads commands until `exit` or end of input.
///
/// `completion` answers path completions; it is separate from the session
/// backend since the editor keeps it for the whole loop.
pub fn run(
    session: &mut Session,
    completion: Box<dyn Backend + Send>,
    history: &Path,
) -> Result<(), CliError> {
    let state = Arc::new(RwLock::new(CompletionState::default()));
    let mut editor: Editor<OcliHelper, DefaultHistory> =
        Editor::new().map_err(|e| CliError::Io(io::Error::other(e.to_string())))?;
    editor.set_helper(Some(OcliHelper::new(completion, Arc::clone(&state))));
    if editor.load_history(history).is_err() {
        debug!(path = %history.display(), "no history loaded");
    }

    loop {
        refresh(&state, session);
        for message in session.viz.drain() {
            info!(message = %message, "received from OGrEE-3D");
            session.output.line(format!("OGrEE-3D : {}", message));
        }

        let line = match editor.readline(&prompt(session)) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(CliError::Io(io::Error::other(e.to_string()))),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Err(e) = editor.add_history_entry(line) {
            warn!(error = %e, "cannot record history");
        }

        if let Err(e) = session.run(line) {
            error!(error = %e, "command failed");
            eprintln!("{}", e);
        }
        if session.exit_requested {
            break;
        }
    }

    if let Err(e) = editor.save_history(history) {
        warn!(path = %history.display(), error = %e, "cannot save history");
    }
    session.viz.disconnect();
    Ok(())
}
