//! Protocol Data Types
//!
//! This module defines the command vocabulary ([`Verb`]), the structured
//! result of a command ([`Response`]) and the two ways a response can be
//! put on the wire ([`ReplyFormat`]).
//!
//! ## Tagged Frames
//!
//! Every frame is one line terminated by `\n`. A tagged response starts
//! with a status prefix byte followed by a kind and an optional payload:
//!
//! - `+` success, e.g. `+VALUE https://example.com`
//! - `-` failure, e.g. `-NOT_FOUND not found`
//!
//! Payloads are escaped (see [`escape`](crate::protocol::escape)) so they
//! never contain a raw line break.
//!
//! ## Text Rendering
//!
//! [`Response::render_text`] produces the human-readable strings that the
//! interactive client prints and that text-mode connections receive, e.g.
//! `Извлеченный элемент: a` or `Error`.

use crate::protocol::parser::{escape, unescape, ParseError, ParseResult};
use crate::storage::StorageError;
use std::fmt;
use thiserror::Error;

/// Frame terminator for both requests and responses
pub const TERMINATOR: u8 = b'\n';

/// Status prefixes of tagged response frames
pub mod prefix {
    pub const OK: u8 = b'+';
    pub const ERROR: u8 = b'-';
}

/// Kind sent with `-` when a request frame cannot be decoded
pub const PROTOCOL_ERROR_KIND: &str = "PROTOCOL";

/// The commands understood by the server. Matching is case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    HSet,
    HGet,
    HDel,
    QPush,
    QPop,
    SPush,
    SPop,
    SAdd,
    SIsMember,
    SRem,
}

impl Verb {
    /// Every verb, in the order they are documented.
    pub const ALL: [Verb; 10] = [
        Verb::HSet,
        Verb::HGet,
        Verb::HDel,
        Verb::QPush,
        Verb::QPop,
        Verb::SPush,
        Verb::SPop,
        Verb::SAdd,
        Verb::SIsMember,
        Verb::SRem,
    ];

    /// Matches a wire token exactly.
    pub fn parse(token: &str) -> Option<Verb> {
        Verb::ALL.into_iter().find(|verb| verb.as_str() == token)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::HSet => "HSET",
            Verb::HGet => "HGET",
            Verb::HDel => "HDEL",
            Verb::QPush => "QPUSH",
            Verb::QPop => "QPOP",
            Verb::SPush => "SPUSH",
            Verb::SPop => "SPOP",
            Verb::SAdd => "SADD",
            Verb::SIsMember => "SISMEMBER",
            Verb::SRem => "SREM",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A successful command result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// HSET stored a new key
    Inserted,
    /// HGET found a value
    Value(String),
    /// HDEL removed a key
    Removed,
    /// QPUSH appended a value
    Queued,
    /// SPUSH pushed a value
    Stacked,
    /// QPOP or SPOP removed a value
    Popped(String),
    /// SADD added an element
    Added,
    /// SISMEMBER answer
    Member { key: String, present: bool },
    /// SREM removed an element
    Discarded(String),
}

impl Reply {
    /// The kind tag sent on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Reply::Inserted => "INSERTED",
            Reply::Value(_) => "VALUE",
            Reply::Removed => "REMOVED",
            Reply::Queued => "QUEUED",
            Reply::Stacked => "STACKED",
            Reply::Popped(_) => "POPPED",
            Reply::Added => "ADDED",
            Reply::Member { present: true, .. } => "PRESENT",
            Reply::Member { present: false, .. } => "ABSENT",
            Reply::Discarded(_) => "DISCARDED",
        }
    }

    pub fn payload(&self) -> Option<&str> {
        match self {
            Reply::Value(v) | Reply::Popped(v) | Reply::Discarded(v) => Some(v),
            Reply::Member { key, .. } => Some(key),
            _ => None,
        }
    }

    fn from_wire(kind: &str, payload: Option<String>) -> ParseResult<Reply> {
        let text = payload.unwrap_or_default();
        let reply = match kind {
            "INSERTED" => Reply::Inserted,
            "VALUE" => Reply::Value(text),
            "REMOVED" => Reply::Removed,
            "QUEUED" => Reply::Queued,
            "STACKED" => Reply::Stacked,
            "POPPED" => Reply::Popped(text),
            "ADDED" => Reply::Added,
            "PRESENT" => Reply::Member {
                key: text,
                present: true,
            },
            "ABSENT" => Reply::Member {
                key: text,
                present: false,
            },
            "DISCARDED" => Reply::Discarded(text),
            other => return Err(ParseError::UnknownKind(other.to_string())),
        };
        Ok(reply)
    }

    /// Human-readable confirmation.
    pub fn render_text(&self) -> String {
        match self {
            Reply::Inserted => "Элемент добавлен в хеш-таблицу".to_string(),
            Reply::Value(v) => v.clone(),
            Reply::Removed => "Элемент удалён из хеш-таблицы".to_string(),
            Reply::Queued => "Элемент добавлен в очередь".to_string(),
            Reply::Stacked => "Элемент добавлен в Стек".to_string(),
            Reply::Popped(v) => format!("Извлеченный элемент: {}", v),
            Reply::Added => "Элемент добавлен в Множество".to_string(),
            Reply::Member { key, present: true } => {
                format!("Элемент {} присутствует во множестве", key)
            }
            Reply::Member {
                key,
                present: false,
            } => format!("Элемент {} отсутствует во множестве", key),
            Reply::Discarded(key) => format!("Элемент {} удалён", key),
        }
    }
}

/// A failed command.
///
/// The display text is the message text clients have always received.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Too few arguments for the verb
    #[error("Неверный формат команды")]
    WrongFormat,

    /// QPUSH or SPUSH without a value
    #[error("Невведён элемент добавления")]
    MissingElement,

    #[error("Очередь пуста")]
    QueueEmpty,

    #[error("Стек пуст")]
    StackEmpty,

    /// The verb is not one the server knows
    #[error("Неверная команда")]
    UnknownCommand(String),

    /// A structure rejected the operation
    #[error("Ошибка: {0}")]
    Storage(#[from] StorageError),
}

impl CommandError {
    /// The kind tag sent on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            CommandError::WrongFormat => "FORMAT",
            CommandError::MissingElement => "NO_ELEMENT",
            CommandError::QueueEmpty => "QUEUE_EMPTY",
            CommandError::StackEmpty => "STACK_EMPTY",
            CommandError::UnknownCommand(_) => "UNKNOWN_COMMAND",
            CommandError::Storage(e) => match e {
                StorageError::EmptyKey => "EMPTY_KEY",
                StorageError::DuplicateKey => "DUPLICATE_KEY",
                StorageError::ElementExists => "ELEMENT_EXISTS",
                StorageError::TableFull => "TABLE_FULL",
                StorageError::SetFull => "SET_FULL",
                StorageError::NotFound => "NOT_FOUND",
                StorageError::ElementNotFound => "ELEMENT_NOT_FOUND",
            },
        }
    }

    /// The payload sent on the wire: the offending verb or the storage reason.
    pub fn payload(&self) -> Option<String> {
        match self {
            CommandError::UnknownCommand(verb) => Some(verb.clone()),
            CommandError::Storage(e) => Some(e.to_string()),
            _ => None,
        }
    }

    fn from_wire(kind: &str, payload: Option<String>) -> ParseResult<CommandError> {
        let error = match kind {
            "FORMAT" => CommandError::WrongFormat,
            "NO_ELEMENT" => CommandError::MissingElement,
            "QUEUE_EMPTY" => CommandError::QueueEmpty,
            "STACK_EMPTY" => CommandError::StackEmpty,
            "UNKNOWN_COMMAND" => CommandError::UnknownCommand(payload.unwrap_or_default()),
            "EMPTY_KEY" => StorageError::EmptyKey.into(),
            "DUPLICATE_KEY" => StorageError::DuplicateKey.into(),
            "ELEMENT_EXISTS" => StorageError::ElementExists.into(),
            "TABLE_FULL" => StorageError::TableFull.into(),
            "SET_FULL" => StorageError::SetFull.into(),
            "NOT_FOUND" => StorageError::NotFound.into(),
            "ELEMENT_NOT_FOUND" => StorageError::ElementNotFound.into(),
            PROTOCOL_ERROR_KIND => {
                return Err(ParseError::ProtocolError(payload.unwrap_or_default()))
            }
            other => return Err(ParseError::UnknownKind(other.to_string())),
        };
        Ok(error)
    }
}

/// How responses are written to a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ReplyFormat {
    /// `+KIND payload` / `-KIND payload` frames
    #[default]
    Tagged,
    /// The human-readable rendering, one line per response
    Text,
}

/// The result of dispatching one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// The verb that produced this response, if it was recognised
    pub verb: Option<Verb>,
    pub outcome: Result<Reply, CommandError>,
}

impl Response {
    pub fn ok(verb: Verb, reply: Reply) -> Self {
        Self {
            verb: Some(verb),
            outcome: Ok(reply),
        }
    }

    pub fn error(verb: Option<Verb>, error: impl Into<CommandError>) -> Self {
        Self {
            verb,
            outcome: Err(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    /// The kind tag of the outcome.
    pub fn kind(&self) -> &'static str {
        match &self.outcome {
            Ok(reply) => reply.kind(),
            Err(e) => e.kind(),
        }
    }

    /// Human-readable rendering.
    ///
    /// Any HGET failure renders as the bare word `Error`, which is what URL
    /// front ends match on to detect a missing short link.
    pub fn render_text(&self) -> String {
        match (&self.outcome, self.verb) {
            (Ok(reply), _) => reply.render_text(),
            (Err(CommandError::Storage(_)), Some(Verb::HGet)) => "Error".to_string(),
            (Err(e), _) => e.to_string(),
        }
    }

    /// Encodes the response as one terminated frame.
    pub fn encode(&self, format: ReplyFormat) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode_into(format, &mut buf);
        buf
    }

    /// Encodes the response into an existing buffer.
    pub fn encode_into(&self, format: ReplyFormat, buf: &mut Vec<u8>) {
        match format {
            ReplyFormat::Tagged => {
                let (status, payload) = match &self.outcome {
                    Ok(reply) => (prefix::OK, reply.payload().map(str::to_string)),
                    Err(e) => (prefix::ERROR, e.payload()),
                };
                buf.push(status);
                buf.extend_from_slice(self.kind().as_bytes());
                if let Some(payload) = payload {
                    buf.push(b' ');
                    buf.extend_from_slice(escape(&payload).as_bytes());
                }
            }
            ReplyFormat::Text => {
                buf.extend_from_slice(escape(&self.render_text()).as_bytes());
            }
        }
        buf.push(TERMINATOR);
    }

    /// Decodes one tagged frame (without its terminator).
    ///
    /// `verb` is the verb of the request this frame answers; the wire does
    /// not repeat it. A `-PROTOCOL` frame decodes to
    /// [`ParseError::ProtocolError`].
    pub fn decode(verb: Option<Verb>, frame: &str) -> ParseResult<Response> {
        let frame = frame.strip_suffix('\r').unwrap_or(frame);
        let mut chars = frame.chars();
        let status = chars
            .next()
            .ok_or_else(|| ParseError::MalformedResponse(frame.to_string()))?;
        let rest = chars.as_str();

        let (kind, payload) = match rest.split_once(' ') {
            Some((kind, payload)) => (kind, Some(unescape(payload)?)),
            None => (rest, None),
        };

        let outcome = match status {
            '+' => Ok(Reply::from_wire(kind, payload)?),
            '-' => Err(CommandError::from_wire(kind, payload)?),
            _ => return Err(ParseError::MalformedResponse(frame.to_string())),
        };

        Ok(Response { verb, outcome })
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_text())
    }
}

/// Encodes a `-PROTOCOL` frame for a request that could not be decoded.
pub fn protocol_error_frame(message: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(message.len() + 12);
    buf.push(prefix::ERROR);
    buf.extend_from_slice(PROTOCOL_ERROR_KIND.as_bytes());
    buf.push(b' ');
    buf.extend_from_slice(escape(message).as_bytes());
    buf.push(TERMINATOR);
    buf
}
