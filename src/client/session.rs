//! In-memory chat state for a single user
use crate::openai::{Message, Role};

pub const GREETING: &str =
    "Hi! I'm Quixa, your AI-powered support assistant. How can I help you today?";
pub const ERROR_REPLY: &str = "I'm sorry, but I encountered an error. Please try again later.";

/// Where the current turn is. A failed turn folds straight back into
/// `Idle` after the error reply is appended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Sending,
    Streaming,
}

#[derive(Debug)]
pub struct ChatSession {
    transcript: Vec<Message>,
    draft: String,
    state: TurnState,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new(vec![Message::new(Role::Assistant, GREETING)])
    }
}

impl ChatSession {
    pub fn new(transcript: Vec<Message>) -> Self {
        Self {
            transcript,
            draft: String::new(),
            state: TurnState::Idle,
        }
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn is_in_flight(&self) -> bool {
        self.state != TurnState::Idle
    }

    /// Replace the pending input. Ignored while a turn is in flight,
    /// the same way a disabled text field would be.
    pub fn set_draft(&mut self, text: &str) {
        if !self.is_in_flight() {
            self.draft = text.to_string();
        }
    }

    /// Start a turn from the current draft.
    ///
    /// Returns the messages to send to the relay, or `None` when the
    /// draft is blank or another turn is still in flight, in which case
    /// nothing is changed. Otherwise the draft is cleared and the user
    /// message plus an empty assistant placeholder are appended together.
    pub fn begin_turn(&mut self) -> Option<Vec<Message>> {
        if self.draft.trim().is_empty() || self.is_in_flight() {
            return None;
        }

        let content = std::mem::take(&mut self.draft);
        let user_msg = Message::new(Role::User, &content);

        // Everything the assistant should respond to, without the placeholder
        let mut request = self.transcript.clone();
        request.push(user_msg.clone());

        self.transcript.push(user_msg);
        self.transcript.push(Message::new(Role::Assistant, ""));
        self.state = TurnState::Sending;

        Some(request)
    }

    pub fn mark_streaming(&mut self) {
        if self.state == TurnState::Sending {
            self.state = TurnState::Streaming;
        }
    }

    /// Append streamed text to the last message, which is always the
    /// assistant placeholder of the in-flight turn.
    pub fn append_fragment(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(last) = self.transcript.last_mut() {
            last.content.push_str(text);
        }
    }

    /// Record a failed turn as a separate assistant reply and release
    /// the guard. Whatever streamed into the placeholder is kept.
    pub fn fail_turn(&mut self) {
        self.transcript.push(Message::new(Role::Assistant, ERROR_REPLY));
        self.state = TurnState::Idle;
    }

    pub fn end_turn(&mut self) {
        self.state = TurnState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with_draft(text: &str) -> ChatSession {
        let mut session = ChatSession::default();
        session.set_draft(text);
        session
    }

    #[test]
    fn test_starts_idle_with_greeting() {
        let session = ChatSession::default();
        assert_eq!(session.state(), TurnState::Idle);
        assert_eq!(
            session.transcript(),
            &[Message::new(Role::Assistant, GREETING)]
        );
    }

    #[test]
    fn test_begin_turn_appends_user_and_placeholder() {
        let mut session = session_with_draft("Hello");
        let request = session.begin_turn().unwrap();

        assert_eq!(
            request,
            vec![
                Message::new(Role::Assistant, GREETING),
                Message::new(Role::User, "Hello"),
            ]
        );
        assert_eq!(
            &session.transcript()[1..],
            &[
                Message::new(Role::User, "Hello"),
                Message::new(Role::Assistant, ""),
            ]
        );
        assert_eq!(session.draft(), "");
        assert_eq!(session.state(), TurnState::Sending);
    }

    #[test]
    fn test_begin_turn_never_sends_system_role() {
        let mut session = session_with_draft("Hello");
        let request = session.begin_turn().unwrap();
        assert!(request.iter().all(|m| m.role != Role::System));
    }

    #[test]
    fn test_blank_draft_is_ignored() {
        for draft in ["", "   ", "\n\t"] {
            let mut session = session_with_draft(draft);
            assert!(session.begin_turn().is_none());
            assert_eq!(session.transcript().len(), 1);
            assert_eq!(session.state(), TurnState::Idle);
        }
    }

    #[test]
    fn test_second_turn_rejected_while_in_flight() {
        let mut session = session_with_draft("first");
        session.begin_turn().unwrap();
        let before = session.transcript().to_vec();

        // The input is disabled so the draft can't change either
        session.set_draft("second");
        assert_eq!(session.draft(), "");
        assert!(session.begin_turn().is_none());
        assert_eq!(session.transcript(), before.as_slice());
    }

    #[test]
    fn test_fragments_append_to_last_message_in_order() {
        let mut session = session_with_draft("Hello");
        session.begin_turn().unwrap();
        session.mark_streaming();

        session.append_fragment("Hi");
        assert_eq!(session.transcript().last().unwrap().content, "Hi");
        session.append_fragment(" there");
        assert_eq!(session.transcript().last().unwrap().content, "Hi there");

        session.end_turn();
        assert_eq!(session.state(), TurnState::Idle);
        assert_eq!(session.transcript()[1].content, "Hello");
    }

    #[test]
    fn test_fail_turn_appends_separate_error_reply() {
        let mut session = session_with_draft("Hello");
        session.begin_turn().unwrap();
        session.fail_turn();

        let transcript = session.transcript();
        assert_eq!(transcript.len(), 4);
        assert_eq!(transcript[2], Message::new(Role::Assistant, ""));
        assert_eq!(transcript[3], Message::new(Role::Assistant, ERROR_REPLY));
        assert!(!session.is_in_flight());
    }

    #[test]
    fn test_next_turn_includes_previous_reply() {
        let mut session = session_with_draft("Hello");
        session.begin_turn().unwrap();
        session.append_fragment("Hi there");
        session.end_turn();

        session.set_draft("How are you?");
        let request = session.begin_turn().unwrap();
        assert_eq!(request.len(), 4);
        assert_eq!(request[2], Message::new(Role::Assistant, "Hi there"));
        assert_eq!(request[3], Message::new(Role::User, "How are you?"));
    }
}
