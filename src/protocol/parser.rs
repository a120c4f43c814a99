//! Line Frame Parser
//!
//! Requests arrive as a byte stream. This module cuts that stream into
//! frames: one command per line, terminated by `\n`, with an optional `\r`
//! before it. Inside a frame a backslash escapes the characters that would
//! otherwise break framing:
//!
//! | Escape | Meaning         |
//! |--------|-----------------|
//! | `\\`   | backslash       |
//! | `\n`   | line feed       |
//! | `\r`   | carriage return |
//!
//! ## How the Parser Works
//!
//! The parser reads from a buffer and returns either:
//! - `Ok(Some((frame, consumed)))` - A complete frame, `consumed` bytes were used
//! - `Ok(None)` - Need more data, no terminator yet
//! - `Err(ParseError)` - Invalid data
//!
//! The caller appends network reads to a buffer, calls `parse()`, and
//! advances the buffer by `consumed` on success. A command split across
//! several reads is therefore reassembled, and several commands in one read
//! are handed out one at a time.

use crate::protocol::types::TERMINATOR;
use thiserror::Error;

/// Errors that can occur while framing requests or decoding responses.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// The frame is not valid UTF-8
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(String),

    /// A backslash followed by a character that cannot be escaped
    #[error("invalid escape sequence: \\{0}")]
    InvalidEscape(char),

    /// The frame ends with a lone backslash
    #[error("unterminated escape sequence")]
    UnterminatedEscape,

    /// No terminator within the allowed frame size
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// The peer reported a protocol violation
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// A response frame without a known status prefix
    #[error("malformed response: {0:?}")]
    MalformedResponse(String),

    /// A response frame with an unknown kind tag
    #[error("unknown response kind: {0}")]
    UnknownKind(String),
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Maximum size of a single frame, terminator excluded (64 KB)
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

/// Splits a byte stream into unescaped text frames.
///
/// # Example
///
/// ```
/// use probekv::protocol::FrameParser;
///
/// let mut parser = FrameParser::new();
/// let buffer = b"HSET abc 123\nHGET a";
///
/// let (frame, consumed) = parser.parse(buffer).unwrap().unwrap();
/// assert_eq!(frame, "HSET abc 123");
/// assert_eq!(consumed, 13);
///
/// // The rest has no terminator yet
/// assert_eq!(parser.parse(&buffer[consumed..]).unwrap(), None);
/// ```
#[derive(Debug, Clone)]
pub struct FrameParser {
    max_frame_size: usize,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    /// Creates a parser with the default frame size limit.
    pub fn new() -> Self {
        Self::with_max_frame_size(MAX_FRAME_SIZE)
    }

    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    /// Attempts to take one frame from the front of `buf`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some((frame, consumed)))` - Successfully parsed a frame
    /// - `Ok(None)` - Incomplete data, need more bytes
    /// - `Err(e)` - Parse error
    pub fn parse(&mut self, buf: &[u8]) -> ParseResult<Option<(String, usize)>> {
        let end = match buf.iter().position(|&b| b == TERMINATOR) {
            Some(end) => end,
            None if buf.len() > self.max_frame_size => {
                return Err(ParseError::MessageTooLarge {
                    size: buf.len(),
                    max: self.max_frame_size,
                })
            }
            None => return Ok(None),
        };

        if end > self.max_frame_size {
            return Err(ParseError::MessageTooLarge {
                size: end,
                max: self.max_frame_size,
            });
        }

        let line = &buf[..end];
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        let text = std::str::from_utf8(line).map_err(|e| ParseError::InvalidUtf8(e.to_string()))?;

        Ok(Some((unescape(text)?, end + 1)))
    }
}

/// Convenience function to parse a single frame with default limits.
pub fn parse_frame(buf: &[u8]) -> ParseResult<Option<(String, usize)>> {
    FrameParser::new().parse(buf)
}

/// Escapes `text` so it can travel inside one frame.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

/// Reverses [`escape`].
pub fn unescape(text: &str) -> ParseResult<String> {
    if !text.contains('\\') {
        return Ok(text.to_string());
    }

    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => return Err(ParseError::InvalidEscape(other)),
            None => return Err(ParseError::UnterminatedEscape),
        }
    }
    Ok(out)
}

/// Encodes `command` as a request frame.
pub fn encode_frame(command: &str) -> Vec<u8> {
    let mut buf = escape(command).into_bytes();
    buf.push(TERMINATOR);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_frame() {
        let result = parse_frame(b"HGET abc\n").unwrap();
        assert_eq!(result, Some(("HGET abc".to_string(), 9)));
    }

    #[test]
    fn test_parse_strips_carriage_return() {
        let result = parse_frame(b"QPOP\r\n").unwrap();
        assert_eq!(result, Some(("QPOP".to_string(), 6)));
    }

    #[test]
    fn test_parse_incomplete() {
        assert_eq!(parse_frame(b"HSET abc 12").unwrap(), None);
        assert_eq!(parse_frame(b"").unwrap(), None);
    }

    #[test]
    fn test_parse_empty_frame() {
        assert_eq!(parse_frame(b"\n").unwrap(), Some((String::new(), 1)));
    }

    #[test]
    fn test_parse_pipelined_frames() {
        let mut parser = FrameParser::new();
        let buf = b"QPUSH a\nQPUSH b\nQPOP\n";

        let mut offset = 0;
        let mut frames = Vec::new();
        while let Some((frame, consumed)) = parser.parse(&buf[offset..]).unwrap() {
            frames.push(frame);
            offset += consumed;
        }

        assert_eq!(frames, vec!["QPUSH a", "QPUSH b", "QPOP"]);
        assert_eq!(offset, buf.len());
    }

    #[test]
    fn test_parse_escapes() {
        let result = parse_frame(b"QPUSH line1\\nline2 C:\\\\dir\n").unwrap();
        assert_eq!(
            result.map(|(frame, _)| frame),
            Some("QPUSH line1\nline2 C:\\dir".to_string())
        );
    }

    #[test]
    fn test_parse_invalid_escape() {
        assert_eq!(parse_frame(b"QPUSH \\t\n"), Err(ParseError::InvalidEscape('t')));
        assert_eq!(parse_frame(b"QPUSH \\\n"), Err(ParseError::UnterminatedEscape));
    }

    #[test]
    fn test_parse_invalid_utf8() {
        assert!(matches!(
            parse_frame(b"HGET \xff\xfe\n"),
            Err(ParseError::InvalidUtf8(_))
        ));
    }

    #[test]
    fn test_parse_cyrillic() {
        let result = parse_frame("SADD ключ\n".as_bytes()).unwrap();
        assert_eq!(result.map(|(frame, _)| frame), Some("SADD ключ".to_string()));
    }

    #[test]
    fn test_frame_size_limit() {
        let mut parser = FrameParser::with_max_frame_size(8);

        assert!(matches!(
            parser.parse(b"QPUSH 123456789"),
            Err(ParseError::MessageTooLarge { max: 8, .. })
        ));
        assert!(matches!(
            parser.parse(b"QPUSH 123456789\n"),
            Err(ParseError::MessageTooLarge { max: 8, .. })
        ));
        assert_eq!(parser.parse(b"QPUSH 12").unwrap(), None);
        assert_eq!(
            parser.parse(b"QPUSH 12\n").unwrap(),
            Some(("QPUSH 12".to_string(), 9))
        );
    }

    #[test]
    fn test_escape_roundtrip() {
        let text = "a\\b\nc\rd";
        assert_eq!(escape(text), "a\\\\b\\nc\\rd");
        assert_eq!(unescape(&escape(text)).unwrap(), text);
    }

    #[test]
    fn test_encode_frame() {
        assert_eq!(encode_frame("HSET k v"), b"HSET k v\n");
        assert_eq!(encode_frame("QPUSH a\nb"), b"QPUSH a\\nb\n");

        let (frame, _) = parse_frame(&encode_frame("QPUSH a\nb")).unwrap().unwrap();
        assert_eq!(frame, "QPUSH a\nb");
    }
}
