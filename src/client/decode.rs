/// Incremental UTF-8 decoding for a body that arrives in arbitrary
/// byte chunks.
///
/// A character split across two chunks is held back until the rest of
/// it arrives. Invalid sequences become U+FFFD instead of failing the
/// whole stream.
#[derive(Debug, Default)]
pub struct Utf8Fragments {
    pending: Vec<u8>,
}

impl Utf8Fragments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode as much of `bytes` (after anything held back) as forms
    /// complete characters.
    pub fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);

        let mut out = String::new();
        let mut rest: &[u8] = &self.pending;
        let held = loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break Vec::new();
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    // `valid_up_to` always marks a valid prefix
                    out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        // Incomplete sequence at the end, wait for more
                        None => break after.to_vec(),
                    }
                }
            }
        };
        self.pending = held;
        out
    }

    /// End of stream. Anything still held back was truncated.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        self.pending.clear();
        char::REPLACEMENT_CHARACTER.to_string()
    }
}
