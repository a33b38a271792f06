use std::io::{self, Write};

use crate::openai::{Message, Role};

const ASSISTANT_PROMPT: &str = "quixa> ";

/// Something that shows the transcript. Called after every change so
/// the newest content is always visible.
pub trait TranscriptView {
    fn render(&mut self, transcript: &[Message]);

    /// The turn resolved and input is accepted again
    fn turn_finished(&mut self) {}
}

/// Writes assistant replies to a terminal as they grow. User messages
/// are already on screen from the line editor so they're skipped.
pub struct TerminalView<W: Write> {
    out: W,
    // Index of the message being written, everything before is done
    current: usize,
    // Bytes of the current message already written
    written: usize,
    started: bool,
    line_open: bool,
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            current: 0,
            written: 0,
            started: false,
            line_open: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn end_line(&mut self) -> io::Result<()> {
        if self.line_open {
            writeln!(self.out)?;
            self.line_open = false;
        }
        Ok(())
    }

    fn write_transcript(&mut self, transcript: &[Message]) -> io::Result<()> {
        while let Some(msg) = transcript.get(self.current) {
            if msg.role == Role::Assistant {
                if !self.started {
                    write!(self.out, "{}", ASSISTANT_PROMPT)?;
                    self.started = true;
                    self.line_open = true;
                }
                let unseen = msg.content.get(self.written..).unwrap_or_default();
                if !unseen.is_empty() {
                    write!(self.out, "{}", unseen)?;
                    self.line_open = true;
                }
                self.written = msg.content.len();
            }

            // The last message can still grow
            if self.current + 1 >= transcript.len() {
                break;
            }
            self.end_line()?;
            self.current += 1;
            self.written = 0;
            self.started = false;
        }
        self.out.flush()
    }
}

impl<W: Write> TranscriptView for TerminalView<W> {
    fn render(&mut self, transcript: &[Message]) {
        if let Err(e) = self.write_transcript(transcript) {
            tracing::warn!("Failed to render transcript: {}", e);
        }
    }

    fn turn_finished(&mut self) {
        if let Err(e) = self.end_line().and_then(|_| self.out.flush()) {
            tracing::warn!("Failed to render transcript: {}", e);
        }
    }
}
