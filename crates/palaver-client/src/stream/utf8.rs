//! Incremental UTF-8 decoding across chunk boundaries.

/// Decodes a byte sequence delivered in arbitrary pieces.
///
/// A chunk may end in the middle of a multi-byte character. The incomplete
/// tail is held back and completed by the next call, so boundary splits
/// never produce replacement characters.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Create a decoder with no carried state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bytes held back from previous calls.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Decode `bytes` and append the text to `out`.
    ///
    /// Invalid sequences are replaced with U+FFFD.
    pub fn decode(&mut self, bytes: &[u8], out: &mut String) {
        let joined;
        let mut input: &[u8] = if self.pending.is_empty() {
            bytes
        } else {
            self.pending.extend_from_slice(bytes);
            joined = std::mem::take(&mut self.pending);
            &joined
        };

        loop {
            match std::str::from_utf8(input) {
                Ok(text) => {
                    out.push_str(text);
                    return;
                }
                Err(e) => {
                    let (valid, rest) = input.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            input = &rest[len..];
                        }
                        None => {
                            // Incomplete sequence at the end of input.
                            self.pending.extend_from_slice(rest);
                            return;
                        }
                    }
                }
            }
        }
    }
}
