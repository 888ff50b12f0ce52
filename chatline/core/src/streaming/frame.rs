//! Line Frame Decoder
//!
//! Turns arbitrarily chunked response bodies into `data: ` frames.
//!
//! # Frame Format
//!
//! ```text
//! data: <payload>\n
//! data: <payload>\n
//! : anything else is ignored\n
//! data: <payload at end of stream, terminator optional>
//! ```
//!
//! A line is a frame only if it starts with [`DATA_PREFIX`]; the payload is
//! the rest of the line, byte for byte. Lines that are blank or lack the
//! prefix are normal framing noise and are dropped without error. A `\r`
//! immediately before the `\n` is treated as part of the terminator.
//!
//! Chunk boundaries carry no meaning: the decoder keeps the unterminated tail
//! of the last chunk (and any incomplete UTF-8 sequence) and resumes from it
//! on the next [`FrameDecoder::feed`].

/// Marker that starts every meaningful line
pub const DATA_PREFIX: &str = "data: ";

const LINE_TERMINATOR: char = '\n';

/// Minimum buffer capacity for decoder
const MIN_BUFFER_CAPACITY: usize = 1024;

/// Stateful line decoder for one response body
#[derive(Debug)]
pub struct FrameDecoder {
    /// Undelimited text carried across calls
    buffer: String,
    /// Trailing bytes of an incomplete UTF-8 sequence
    pending_bytes: Vec<u8>,
    frames_emitted: u64,
    lines_discarded: u64,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Create a new decoder
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: String::with_capacity(MIN_BUFFER_CAPACITY),
            pending_bytes: Vec::new(),
            frames_emitted: 0,
            lines_discarded: 0,
        }
    }

    /// Decode a complete body in one go
    #[must_use]
    pub fn decode_all(text: &str) -> Vec<String> {
        let mut decoder = Self::new();
        let mut frames = decoder.feed(text);
        frames.extend(decoder.flush());
        frames
    }

    /// Feed a text chunk, returning every frame it completes
    pub fn feed(&mut self, chunk: &str) -> Vec<String> {
        self.buffer.push_str(chunk);

        let mut frames = Vec::new();
        let mut consumed = 0;

        while let Some(offset) = self.buffer[consumed..].find(LINE_TERMINATOR) {
            let end = consumed + offset;
            let line = &self.buffer[consumed..end];
            let line = line.strip_suffix('\r').unwrap_or(line);

            match frame_payload(line) {
                Some(payload) => {
                    frames.push(payload.to_string());
                    self.frames_emitted += 1;
                }
                None => self.lines_discarded += 1,
            }

            consumed = end + LINE_TERMINATOR.len_utf8();
        }

        self.buffer.drain(..consumed);
        frames
    }

    /// Feed raw bytes from the transport
    ///
    /// Multi-byte characters split across chunks are reassembled; invalid
    /// sequences become U+FFFD.
    pub fn feed_bytes(&mut self, chunk: &[u8]) -> Vec<String> {
        let text = self.decode_utf8(chunk);
        self.feed(&text)
    }

    /// Signal end of stream, returning the final unterminated frame if any
    pub fn flush(&mut self) -> Option<String> {
        if !self.pending_bytes.is_empty() {
            self.pending_bytes.clear();
            self.buffer.push(char::REPLACEMENT_CHARACTER);
        }

        let rest = std::mem::take(&mut self.buffer);
        if rest.is_empty() {
            return None;
        }

        let line = rest.strip_suffix('\r').unwrap_or(rest.as_str());
        match frame_payload(line) {
            Some(payload) => {
                self.frames_emitted += 1;
                Some(payload.to_string())
            }
            None => {
                self.lines_discarded += 1;
                None
            }
        }
    }

    /// Bytes of text waiting for a terminator
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buffer.len() + self.pending_bytes.len()
    }

    /// Frames emitted so far
    #[must_use]
    pub fn frames_emitted(&self) -> u64 {
        self.frames_emitted
    }

    /// Lines dropped for lacking the prefix or being blank
    #[must_use]
    pub fn lines_discarded(&self) -> u64 {
        self.lines_discarded
    }

    /// Decode as much of `pending_bytes + chunk` as forms complete characters
    fn decode_utf8(&mut self, chunk: &[u8]) -> String {
        self.pending_bytes.extend_from_slice(chunk);

        let mut text = String::with_capacity(self.pending_bytes.len());
        let mut rest: &[u8] = &self.pending_bytes;

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    text.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        // Incomplete sequence at the end: wait for more bytes
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }

        let tail = rest.to_vec();
        self.pending_bytes = tail;
        text
    }
}

/// Payload of a frame line, or `None` if the line is noise
fn frame_payload(line: &str) -> Option<&str> {
    if line.trim().is_empty() {
        return None;
    }
    line.strip_prefix(DATA_PREFIX)
}
