//! Semaphore-gated RSS fetch-and-parse worker pipeline.
//!
//! The core unit is the [`FetchWorker`]: a background task that waits on a
//! shared concurrency permit, issues a single HTTP GET for a feed URL,
//! streams the body into a parser chosen by name from a [`ParserRegistry`],
//! and reports the outcome — a populated [`Feed`] or an error — as exactly
//! one message on an async channel. Cancellation is cooperative throughout:
//! a cancelled cycle stops parsing at the next article boundary and delivers
//! nothing.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokio::sync::{mpsc, Semaphore};
//! use feedfetch::{FetchConfig, FetchWorker, HttpTransport, ParserRegistry};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = FetchConfig::default();
//! let registry = ParserRegistry::builtin();
//! let transport = Arc::new(HttpTransport::new(&config)?);
//! let permits = Arc::new(Semaphore::new(config.max_concurrent_fetches));
//! let (tx, mut rx) = mpsc::channel(16);
//!
//! let worker = FetchWorker::configure(
//!     &registry,
//!     &config.parser,
//!     transport,
//!     config.max_items_per_feed,
//!     tx,
//!     "https://example.com/feed.xml",
//!     permits,
//! )?;
//! worker.start();
//!
//! if let Some(outcome) = rx.recv().await {
//!     println!("{:?}: {} articles", outcome.completion,
//!              outcome.feed.map(|f| f.article_count()).unwrap_or(0));
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod feed;
pub mod parser;
pub mod transport;
pub mod util;
pub mod worker;

pub use config::{ConfigError, FetchConfig};
pub use feed::{Feed, FeedItem, ItemKind};
pub use parser::{FeedParser, ParseError, ParserRegistry, RegistryError, RssParser};
pub use transport::{HttpTransport, Transport, TransportError};
pub use worker::{spawn_all, Completion, FetchOutcome, FetchWorker, WorkerError, WorkerHandle};
