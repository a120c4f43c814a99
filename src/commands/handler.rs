//! Command Handler Module
//!
//! This module implements every command ProbeKV understands. It splits an
//! incoming command line into tokens, validates the arguments, and runs the
//! matching operation on the storage engine.
//!
//! ## Supported Commands
//!
//! ### Hash Table
//! - `HSET key value` - Insert a new key (the value may contain spaces)
//! - `HGET key` - Get a key's value
//! - `HDEL key` - Delete a key
//!
//! ### Queue
//! - `QPUSH value` - Append to the tail (the value may contain spaces)
//! - `QPOP` - Remove and return the head
//!
//! ### Stack
//! - `SPUSH value` - Push onto the stack (the value may contain spaces)
//! - `SPOP` - Remove and return the top
//!
//! ### Hash Set
//! - `SADD key` - Add an element
//! - `SISMEMBER key` - Check membership
//! - `SREM key` - Remove an element
//!
//! ## Tokenizing
//!
//! Tokens are separated by single spaces; two adjacent spaces produce an
//! empty token. Verbs are case-sensitive. Arguments beyond those a verb
//! needs are ignored, except where the value is formed by rejoining the
//! remaining tokens.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CommandHandler                          │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │  tokenize   │───>│  dispatch() │───>│  cmd_*()    │     │
//! │  └─────────────┘    └─────────────┘    └─────────────┘     │
//! │                                               │             │
//! │                                               ▼             │
//! │                                      StorageEngine          │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use crate::protocol::{CommandError, Reply, Response, Verb};
use crate::storage::StorageEngine;
use std::sync::Arc;

type CommandResult = Result<Reply, CommandError>;

/// Executes text commands against a shared [`StorageEngine`].
#[derive(Clone)]
pub struct CommandHandler {
    /// The storage engine
    storage: Arc<StorageEngine>,
}

impl CommandHandler {
    /// Creates a new command handler with the given storage engine.
    pub fn new(storage: Arc<StorageEngine>) -> Self {
        Self { storage }
    }

    /// Returns the storage engine this handler works on.
    pub fn storage(&self) -> &Arc<StorageEngine> {
        &self.storage
    }

    /// Executes one command line and returns the response.
    ///
    /// Never fails: every problem becomes an error outcome in the response.
    pub fn execute(&self, command: &str) -> Response {
        let mut tokens = command.split(' ');
        let name = tokens.next().unwrap_or_default();
        let args: Vec<&str> = tokens.collect();

        let verb = match Verb::parse(name) {
            Some(verb) => verb,
            None => {
                return Response::error(None, CommandError::UnknownCommand(name.to_string()))
            }
        };

        Response {
            verb: Some(verb),
            outcome: self.dispatch(verb, &args),
        }
    }

    /// Dispatches a command to its handler.
    fn dispatch(&self, verb: Verb, args: &[&str]) -> CommandResult {
        match verb {
            // Hash table
            Verb::HSet => self.cmd_hset(args),
            Verb::HGet => self.cmd_hget(args),
            Verb::HDel => self.cmd_hdel(args),

            // Queue
            Verb::QPush => self.cmd_qpush(args),
            Verb::QPop => self.cmd_qpop(),

            // Stack
            Verb::SPush => self.cmd_spush(args),
            Verb::SPop => self.cmd_spop(),

            // Hash set
            Verb::SAdd => self.cmd_sadd(args),
            Verb::SIsMember => self.cmd_sismember(args),
            Verb::SRem => self.cmd_srem(args),
        }
    }

    // ========================================================================
    // Helper functions
    // ========================================================================

    /// Returns the key argument, or a format error if it is missing.
    fn key<'a>(&self, args: &[&'a str]) -> Result<&'a str, CommandError> {
        args.first().copied().ok_or(CommandError::WrongFormat)
    }

    /// Rejoins all tokens into a single value.
    fn payload(&self, args: &[&str]) -> Result<String, CommandError> {
        if args.is_empty() {
            return Err(CommandError::MissingElement);
        }
        Ok(args.join(" "))
    }

    // ========================================================================
    // Hash table
    // ========================================================================

    /// HSET key value
    fn cmd_hset(&self, args: &[&str]) -> CommandResult {
        if args.len() < 2 {
            return Err(CommandError::WrongFormat);
        }

        let value = args[1..].join(" ");
        self.storage.hset(args[0], &value)?;
        Ok(Reply::Inserted)
    }

    /// HGET key
    fn cmd_hget(&self, args: &[&str]) -> CommandResult {
        let key = self.key(args)?;
        Ok(Reply::Value(self.storage.hget(key)?))
    }

    /// HDEL key
    fn cmd_hdel(&self, args: &[&str]) -> CommandResult {
        let key = self.key(args)?;
        self.storage.hdel(key)?;
        Ok(Reply::Removed)
    }

    // ========================================================================
    // Queue and stack
    // ========================================================================

    /// QPUSH value
    fn cmd_qpush(&self, args: &[&str]) -> CommandResult {
        self.storage.qpush(self.payload(args)?);
        Ok(Reply::Queued)
    }

    /// QPOP
    fn cmd_qpop(&self) -> CommandResult {
        self.storage
            .qpop()
            .map(Reply::Popped)
            .ok_or(CommandError::QueueEmpty)
    }

    /// SPUSH value
    fn cmd_spush(&self, args: &[&str]) -> CommandResult {
        self.storage.spush(self.payload(args)?);
        Ok(Reply::Stacked)
    }

    /// SPOP
    fn cmd_spop(&self) -> CommandResult {
        self.storage
            .spop()
            .map(Reply::Popped)
            .ok_or(CommandError::StackEmpty)
    }

    // ========================================================================
    // Hash set
    // ========================================================================

    /// SADD key
    fn cmd_sadd(&self, args: &[&str]) -> CommandResult {
        let key = self.key(args)?;
        self.storage.sadd(key)?;
        Ok(Reply::Added)
    }

    /// SISMEMBER key
    fn cmd_sismember(&self, args: &[&str]) -> CommandResult {
        let key = self.key(args)?;
        Ok(Reply::Member {
            key: key.to_string(),
            present: self.storage.sismember(key),
        })
    }

    /// SREM key
    fn cmd_srem(&self, args: &[&str]) -> CommandResult {
        let key = self.key(args)?;
        self.storage.srem(key)?;
        Ok(Reply::Discarded(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageError;

    fn create_handler() -> CommandHandler {
        let storage = Arc::new(StorageEngine::new());
        CommandHandler::new(storage)
    }

    fn text(handler: &CommandHandler, command: &str) -> String {
        handler.execute(command).render_text()
    }

    #[test]
    fn test_hset_hget_hdel() {
        let handler = create_handler();

        assert_eq!(text(&handler, "HSET abc 123"), "Элемент добавлен в хеш-таблицу");
        assert_eq!(text(&handler, "HGET abc"), "123");
        assert_eq!(text(&handler, "HDEL abc"), "Элемент удалён из хеш-таблицы");
        assert_eq!(text(&handler, "HGET abc"), "Error");
    }

    #[test]
    fn test_hset_joins_value_tokens() {
        let handler = create_handler();

        let response = handler.execute("HSET greeting hello big world");
        assert_eq!(response.outcome, Ok(Reply::Inserted));
        assert_eq!(
            handler.execute("HGET greeting").outcome,
            Ok(Reply::Value("hello big world".into()))
        );
    }

    #[test]
    fn test_hset_duplicate() {
        let handler = create_handler();

        handler.execute("HSET k v1");
        let response = handler.execute("HSET k v2");
        assert_eq!(
            response.outcome,
            Err(CommandError::Storage(StorageError::DuplicateKey))
        );
        assert_eq!(
            response.render_text(),
            "Ошибка: an element with such a key exists"
        );
        assert_eq!(text(&handler, "HGET k"), "v1");
    }

    #[test]
    fn test_arity_is_checked_before_mutation() {
        let handler = create_handler();

        for command in ["HSET", "HSET onlykey", "HGET", "HDEL", "SADD", "SISMEMBER", "SREM"] {
            let response = handler.execute(command);
            assert_eq!(response.outcome, Err(CommandError::WrongFormat), "{}", command);
            assert_eq!(response.render_text(), "Неверный формат команды");
        }

        let stats = handler.storage().stats();
        assert_eq!(stats.table_len, 0);
        assert_eq!(stats.set_len, 0);
        assert_eq!(stats.writes, 0);
    }

    #[test]
    fn test_empty_key_from_double_space() {
        let handler = create_handler();

        let response = handler.execute("HSET  value");
        assert_eq!(response.outcome, Err(StorageError::EmptyKey.into()));
        assert_eq!(response.render_text(), "Ошибка: KEY==0");
    }

    #[test]
    fn test_hdel_missing() {
        let handler = create_handler();
        assert_eq!(text(&handler, "HDEL nothing"), "Ошибка: not found");
    }

    #[test]
    fn test_queue_commands() {
        let handler = create_handler();

        assert_eq!(text(&handler, "QPOP"), "Очередь пуста");
        assert_eq!(text(&handler, "QPUSH"), "Невведён элемент добавления");

        assert_eq!(text(&handler, "QPUSH a"), "Элемент добавлен в очередь");
        handler.execute("QPUSH b c");
        handler.execute("QPUSH d");

        assert_eq!(text(&handler, "QPOP"), "Извлеченный элемент: a");
        assert_eq!(text(&handler, "QPOP"), "Извлеченный элемент: b c");
        assert_eq!(text(&handler, "QPOP"), "Извлеченный элемент: d");
        assert_eq!(text(&handler, "QPOP"), "Очередь пуста");
    }

    #[test]
    fn test_stack_commands() {
        let handler = create_handler();

        assert_eq!(text(&handler, "SPOP"), "Стек пуст");
        assert_eq!(text(&handler, "SPUSH"), "Невведён элемент добавления");

        assert_eq!(text(&handler, "SPUSH a"), "Элемент добавлен в Стек");
        handler.execute("SPUSH b");
        handler.execute("SPUSH c");

        assert_eq!(text(&handler, "SPOP"), "Извлеченный элемент: c");
        assert_eq!(text(&handler, "SPOP"), "Извлеченный элемент: b");
        assert_eq!(text(&handler, "SPOP"), "Извлеченный элемент: a");
        assert_eq!(text(&handler, "SPOP"), "Стек пуст");
    }

    #[test]
    fn test_set_commands() {
        let handler = create_handler();

        assert_eq!(
            text(&handler, "SISMEMBER url"),
            "Элемент url отсутствует во множестве"
        );
        assert_eq!(text(&handler, "SADD url"), "Элемент добавлен в Множество");
        assert_eq!(
            text(&handler, "SISMEMBER url"),
            "Элемент url присутствует во множестве"
        );
        assert_eq!(
            text(&handler, "SADD url"),
            "Ошибка: an element with such a key exists"
        );
        assert_eq!(text(&handler, "SREM url"), "Элемент url удалён");
        assert_eq!(
            text(&handler, "SISMEMBER url"),
            "Элемент url отсутствует во множестве"
        );
        assert_eq!(text(&handler, "SREM url"), "Ошибка: element not found");
    }

    #[test]
    fn test_unknown_command() {
        let handler = create_handler();

        for command in ["PING", "hset a b", "", " HGET a"] {
            let response = handler.execute(command);
            assert!(matches!(response.outcome, Err(CommandError::UnknownCommand(_))));
            assert_eq!(response.verb, None);
            assert_eq!(response.render_text(), "Неверная команда");
        }
    }

    #[test]
    fn test_table_full_through_commands() {
        let handler = CommandHandler::new(Arc::new(StorageEngine::with_capacity(2)));

        handler.execute("HSET a 1");
        handler.execute("HSET b 2");
        assert_eq!(text(&handler, "HSET c 3"), "Ошибка: HashMap full");
    }

    #[test]
    fn test_handlers_share_storage() {
        let first = create_handler();
        let second = first.clone();

        first.execute("QPUSH shared");
        assert_eq!(
            second.execute("QPOP").outcome,
            Ok(Reply::Popped("shared".into()))
        );
    }
}
