//! Chat client: transcript state and consumption of the relay stream
mod decode;
mod relay;
mod session;
mod view;

use anyhow::Result;
use futures_util::StreamExt;

pub use decode::Utf8Fragments;
pub use relay::{FragmentStream, RelayClient};
pub use session::{ChatSession, ERROR_REPLY, GREETING, TurnState};
pub use view::{TerminalView, TranscriptView};

use crate::openai::Message;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Blank draft or a turn was already in flight, nothing happened
    Ignored,
    Completed,
    Failed,
}

/// Run one conversational turn from the session's current draft.
///
/// Every failure (error status, transport error, a body cut off part
/// way through) ends the same way: the fixed error reply is appended
/// and the session is ready for the next turn.
pub async fn send_turn<V: TranscriptView>(
    session: &mut ChatSession,
    relay: &RelayClient,
    view: &mut V,
) -> TurnOutcome {
    let Some(request) = session.begin_turn() else {
        return TurnOutcome::Ignored;
    };
    view.render(session.transcript());

    let outcome = match stream_reply(session, relay, &request, view).await {
        Ok(()) => TurnOutcome::Completed,
        Err(e) => {
            tracing::error!("Chat turn failed: {:#}", e);
            session.fail_turn();
            view.render(session.transcript());
            TurnOutcome::Failed
        }
    };

    session.end_turn();
    view.turn_finished();
    outcome
}

async fn stream_reply<V: TranscriptView>(
    session: &mut ChatSession,
    relay: &RelayClient,
    request: &[Message],
    view: &mut V,
) -> Result<()> {
    let mut fragments = relay.send(request).await?;
    session.mark_streaming();

    while let Some(fragment) = fragments.next().await {
        session.append_fragment(&fragment?);
        view.render(session.transcript());
    }

    Ok(())
}
