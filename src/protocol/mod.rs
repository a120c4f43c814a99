//! Wire Protocol
//!
//! This module implements the line-oriented text protocol spoken between
//! ProbeKV and its clients.
//!
//! ## Overview
//!
//! A request is one line: a verb followed by space-separated arguments,
//! e.g. `HSET abc https://example.com`. A response is one line too, either
//! a tagged frame (`+VALUE 123`, `-NOT_FOUND not found`) or, for legacy
//! clients, the human-readable text.
//!
//! ## Modules
//!
//! - `types`: Verbs, replies, command errors and response encoding
//! - `parser`: Frame splitting and escaping
//!
//! ## Example
//!
//! ```
//! use probekv::protocol::{parse_frame, Reply, ReplyFormat, Response, Verb};
//!
//! // Parsing incoming data
//! let (command, consumed) = parse_frame(b"HGET abc\n").unwrap().unwrap();
//! assert_eq!(command, "HGET abc");
//! assert_eq!(consumed, 9);
//!
//! // Creating responses
//! let response = Response::ok(Verb::HGet, Reply::Value("123".into()));
//! assert_eq!(response.encode(ReplyFormat::Tagged), b"+VALUE 123\n");
//! assert_eq!(response.render_text(), "123");
//! ```

pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use parser::{
    encode_frame, escape, parse_frame, unescape, FrameParser, ParseError, ParseResult,
    MAX_FRAME_SIZE,
};
pub use types::{protocol_error_frame, CommandError, Reply, ReplyFormat, Response, Verb};
