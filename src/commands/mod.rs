//! Command dispatch
//!
//! Turns one decoded request line into exactly one [`Response`](crate::protocol::Response).
//! The first space-separated token picks the verb; what follows is the
//! verb's argument.
//!
//! | Structure  | Verbs                          |
//! |------------|--------------------------------|
//! | hash table | `HSET`, `HGET`, `HDEL`         |
//! | queue      | `QPUSH`, `QPOP`                |
//! | stack      | `SPUSH`, `SPOP`                |
//! | hash set   | `SADD`, `SISMEMBER`, `SREM`    |
//!
//! Verbs are case-sensitive. Anything else answers `UNKNOWN_COMMAND` and the
//! session carries on.

pub mod handler;

pub use handler::CommandHandler;
