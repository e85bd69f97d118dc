//! Incremental UTF-8 decoding across chunk boundaries

/// Decodes a byte stream chunk by chunk, holding back the tail of a
/// multi-byte character that was split by the network.
///
/// Bytes that can never form valid UTF-8 are replaced with U+FFFD; an
/// incomplete trailing sequence is retained until the next chunk completes it.
#[derive(Debug, Default)]
pub struct Utf8Accumulator {
    pending: Vec<u8>,
}

impl Utf8Accumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `chunk`, prefixed by whatever was held back from earlier chunks
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);

        let mut out = String::with_capacity(self.pending.len());
        let mut start = 0;
        loop {
            let rest = &self.pending[start..];
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    start = self.pending.len();
                    break;
                }
                Err(e) => {
                    let valid_len = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&rest[..valid_len]));
                    if let Some(invalid_len) = e.error_len() {
                        out.push(char::REPLACEMENT_CHARACTER);
                        start += valid_len + invalid_len;
                    } else {
                        // Incomplete sequence at the end: wait for more bytes
                        start += valid_len;
                        break;
                    }
                }
            }
        }

        self.pending.drain(..start);
        out
    }

    /// Number of bytes held back waiting for a continuation
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
