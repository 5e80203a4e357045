use crate::errors::AIError;
use serde::{Deserialize, Serialize};

/// Body of a generate request, for both transfer modes.
#[derive(Serialize, Debug, Clone)]
pub struct GenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub stream: bool,
}

/// Complete (non-streaming) generate response. Extra fields are ignored.
#[derive(Deserialize, Debug)]
pub struct GenerateResponse {
    pub response: String,
}

/// One line of a streamed generate response.
#[derive(Deserialize, Debug, Default, PartialEq, Eq)]
pub struct StreamChunk {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl StreamChunk {
    pub fn parse(line: &str) -> Result<Self, AIError> {
        let chunk: StreamChunk = serde_json::from_str(line)
            .map_err(|e| AIError::MalformedResponse(format!("invalid stream line: {e}")))?;
        if let Some(message) = chunk.error {
            return Err(AIError::Stream(message));
        }
        Ok(chunk)
    }
}

/// Splits a byte stream into newline-delimited lines.
///
/// Network chunks may end mid-line or even mid-character, so bytes are buffered
/// until a `\n` arrives and only complete lines are decoded.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `bytes` and returns every line completed by them, blank lines skipped.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line).trim().to_string();
            if !text.is_empty() {
                lines.push(text);
            }
        }
        lines
    }

    /// Returns the trailing unterminated line, if any, once the stream has ended.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        let text = String::from_utf8_lossy(&rest).trim().to_string();
        (!text.is_empty()).then_some(text)
    }
}
