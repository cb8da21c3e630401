/// Truncates a string to at most `max_chars` characters.
///
/// Counts Unicode scalar values so a multi-byte character is never split.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Incremental UTF-8 decoder for chunked bodies.
///
/// A multi-byte sequence split across two chunks is held back until the next
/// chunk arrives. Invalid sequences decode to U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    pending: Vec<u8>,
}

impl Utf8StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, chunk: &[u8], out: &mut String) {
        self.pending.extend_from_slice(chunk);
        let mut input = std::mem::take(&mut self.pending);
        let mut start = 0;

        loop {
            match std::str::from_utf8(&input[start..]) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(e) => {
                    let valid_end = start + e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&input[start..valid_end]));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            start = valid_end + len;
                        }
                        None => {
                            // Incomplete trailing sequence; wait for more bytes.
                            input.drain(..valid_end);
                            self.pending = input;
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Flushes any held-back bytes at end of stream.
    pub fn finish(&mut self, out: &mut String) {
        if !self.pending.is_empty() {
            out.push_str(&String::from_utf8_lossy(&self.pending));
            self.pending.clear();
        }
    }
}
