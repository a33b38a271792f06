use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::history::History;
use rustyline::{DefaultEditor, Editor, Helper};

use crate::client::{ChatSession, RelayClient, TerminalView, TranscriptView, send_turn};

/// Add non-blank input to the line editor's history
fn remember<H: Helper, I: History>(rl: &mut Editor<H, I>, line: &str) {
    if line.trim().is_empty() {
        return;
    }
    if let Err(e) = rl.add_history_entry(line) {
        tracing::warn!("Failed to add line to history: {}", e);
    }
}

pub async fn run(url: &str) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    let relay = RelayClient::new(url);
    let mut session = ChatSession::default();
    let mut view = TerminalView::new(std::io::stdout());

    view.render(session.transcript());
    view.turn_finished();

    loop {
        let readline = rl.readline(">>> ");
        match readline {
            Ok(line) => {
                remember(&mut rl, &line);
                session.set_draft(&line);
                send_turn(&mut session, &relay, &mut view).await;
            }
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}
