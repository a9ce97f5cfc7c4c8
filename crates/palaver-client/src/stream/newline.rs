//! Line-ending normalization across chunk boundaries.

/// Rewrites `\r\n` and lone `\r` to `\n`.
///
/// A `\r` at the end of a chunk is held back until the next chunk shows
/// whether a `\n` follows it.
#[derive(Debug, Default)]
pub struct NewlineNormalizer {
    pending_cr: bool,
}

impl NewlineNormalizer {
    /// Create a normalizer with no carried state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a trailing `\r` is being held back.
    pub fn has_pending(&self) -> bool {
        self.pending_cr
    }

    /// Normalize `text` and append it to `out`.
    pub fn push(&mut self, text: &str, out: &mut String) {
        out.reserve(text.len());
        let mut rest = text;

        if self.pending_cr && !rest.is_empty() {
            self.pending_cr = false;
            out.push('\n');
            rest = rest.strip_prefix('\n').unwrap_or(rest);
        }

        while let Some(pos) = rest.find('\r') {
            out.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];
            if after.is_empty() {
                self.pending_cr = true;
                return;
            }
            out.push('\n');
            rest = after.strip_prefix('\n').unwrap_or(after);
        }
        out.push_str(rest);
    }

    /// Flush a held-back `\r` at end of input. Returns whether one was held.
    pub fn finish(&mut self, out: &mut String) -> bool {
        let pending = std::mem::take(&mut self.pending_cr);
        if pending {
            out.push('\n');
        }
        pending
    }
}
