//! Incremental decoding of `data:`-framed server-sent event lines.
//!
//! Network reads split lines at arbitrary byte boundaries, so the decoder
//! keeps a carry buffer and only yields payloads for complete lines. Lines
//! that are empty, comments, or any other field than `data:` are dropped;
//! whether a payload is valid JSON is the caller's problem (one bad line
//! must never abort the whole stream).

#[derive(Debug, Default)]
pub struct SseLineDecoder {
    buffer: String,
}

impl SseLineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network read, returning the `data:` payloads of every line
    /// completed by it.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));

        let mut payloads = Vec::new();
        while let Some(newline) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=newline).collect();
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(data) = line.strip_prefix("data: ") {
                payloads.push(data.to_string());
            } else if let Some(data) = line.strip_prefix("data:") {
                payloads.push(data.to_string());
            }
        }
        payloads
    }
}
