//! Pluggable feed parsers.
//!
//! A [`FeedParser`] turns a readable byte stream into a populated
//! [`Feed`](crate::feed::Feed). Implementations are looked up by name in a
//! [`ParserRegistry`] when a worker is configured, so the parser for a fetch
//! is chosen at runtime without the worker knowing concrete types.
//!
//! Cancellation is cooperative: parsers receive a [`CancellationToken`] and
//! are expected to poll it between articles. A parser that observes
//! cancellation returns the feed populated so far rather than an error.

mod rss;

pub use rss::RssParser;

use std::collections::HashMap;
use std::io::BufRead;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::feed::Feed;

/// Feed document could not be parsed into a [`Feed`].
#[derive(Debug, Error)]
pub enum ParseError {
    /// The byte stream is not a recognizable feed document.
    #[error("invalid feed document: {0}")]
    InvalidDocument(String),

    /// Reading from the input stream failed.
    #[error("failed to read feed input: {0}")]
    Io(#[from] std::io::Error),
}

/// Capability contract for a feed parser.
///
/// `parse` runs synchronously to completion, producing the feed by value —
/// ownership transfers to the caller, the parser retains nothing. `max_items`
/// caps how many articles are kept (`0` = uncapped). The token is polled
/// between articles; a cancelled parse is still `Ok` with whatever was
/// populated before the poll.
pub trait FeedParser: Send {
    fn parse(
        &mut self,
        input: &mut dyn BufRead,
        max_items: usize,
        cancel: &CancellationToken,
    ) -> Result<Feed, ParseError>;
}

/// Constructor for a registered parser.
pub type ParserFactory = fn() -> Box<dyn FeedParser>;

/// Parser lookup failed at configure time.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no parser registered under name {0:?}")]
    UnknownParser(String),
}

/// Name → constructor map for the parsers this process knows about.
///
/// Resolution happens when a worker is configured, so an unknown parser name
/// is a typed configuration error instead of a mid-fetch failure.
pub struct ParserRegistry {
    parsers: HashMap<&'static str, ParserFactory>,
}

impl ParserRegistry {
    /// Registry with the built-in parsers: `"rss"` → [`RssParser`].
    pub fn builtin() -> Self {
        let mut registry = Self {
            parsers: HashMap::new(),
        };
        registry.register("rss", || Box::new(RssParser::new()));
        registry
    }

    /// Empty registry, for callers that only want their own parsers.
    pub fn empty() -> Self {
        Self {
            parsers: HashMap::new(),
        }
    }

    /// Register a parser under `name`, replacing any previous registration.
    pub fn register(&mut self, name: &'static str, factory: ParserFactory) {
        self.parsers.insert(name, factory);
    }

    /// Construct a fresh parser for `name`.
    pub fn resolve(&self, name: &str) -> Result<Box<dyn FeedParser>, RegistryError> {
        let factory = self
            .parsers
            .get(name)
            .ok_or_else(|| RegistryError::UnknownParser(name.to_string()))?;
        Ok(factory())
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
