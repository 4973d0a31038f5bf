//! Fetch workers: one gated task per feed URL.
//!
//! A [`FetchWorker`] runs the full fetch cycle for a single URL: wait for a
//! permit on the shared semaphore, issue one GET through the [`Transport`],
//! hand the body to the configured parser, classify the outcome, and deliver
//! exactly one [`FetchOutcome`] to the result channel — or none at all if
//! the cycle was cancelled.
//!
//! Concurrency is admission control, not a thread pool: every fetch gets its
//! own task, but the semaphore bounds how many are past the gate at once.
//! Cancellation is cooperative; it stops future parse steps and suppresses
//! result delivery, it does not abort an in-flight network read.

use std::io::Cursor;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::FetchConfig;
use crate::feed::Feed;
use crate::parser::{FeedParser, ParseError, ParserRegistry, RegistryError};
use crate::transport::{Transport, TransportError};
use crate::util::{validate_feed_url, UrlValidationError};

/// Completion code carried by a [`FetchOutcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Ok,
    Failed,
}

/// The one message a worker delivers per fetch.
///
/// `Completion::Ok` carries the parsed feed — possibly partial, if the fetch
/// was cancelled mid-parse without a recorded error. `Completion::Failed`
/// carries the error text instead.
#[derive(Debug)]
pub struct FetchOutcome {
    pub url: Url,
    pub completion: Completion,
    pub feed: Option<Feed>,
    pub error: Option<String>,
}

/// Configuration failed; nothing was fetched.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("invalid feed URL: {0}")]
    InvalidUrl(#[from] UrlValidationError),

    #[error(transparent)]
    UnknownParser(#[from] RegistryError),
}

/// Failure inside the fetch cycle. Converted to a FAILED outcome at the
/// worker boundary; nothing propagates past it.
#[derive(Debug, Error)]
enum FetchFailure {
    #[error("failed to parse {0}")]
    EmptyBody(Url),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Orchestrates one fetch-and-parse cycle.
///
/// Built by [`configure`](FetchWorker::configure), which validates the URL
/// and resolves the parser by name up front, then consumed by
/// [`start`](FetchWorker::start). The worker owns its parser and feed
/// exclusively for the duration of the cycle; the only shared state is the
/// transport, the semaphore, and the result channel.
pub struct FetchWorker {
    transport: Arc<dyn Transport>,
    parser: Box<dyn FeedParser>,
    max_items: usize,
    sink: mpsc::Sender<FetchOutcome>,
    url: Url,
    permits: Arc<Semaphore>,
    cancel: CancellationToken,
}

impl FetchWorker {
    /// Validate dependencies and build a worker for one fetch cycle.
    ///
    /// # Errors
    ///
    /// - [`WorkerError::InvalidUrl`] if `feed_url` is not a valid http(s) URL
    /// - [`WorkerError::UnknownParser`] if `parser_name` is not registered
    pub fn configure(
        registry: &ParserRegistry,
        parser_name: &str,
        transport: Arc<dyn Transport>,
        max_items: usize,
        sink: mpsc::Sender<FetchOutcome>,
        feed_url: &str,
        permits: Arc<Semaphore>,
    ) -> Result<Self, WorkerError> {
        let url = validate_feed_url(feed_url)?;
        let parser = registry.resolve(parser_name)?;
        Ok(Self {
            transport,
            parser,
            max_items,
            sink,
            url,
            permits,
            cancel: CancellationToken::new(),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The cancellation token this cycle observes. Cancelling it is safe
    /// from any task at any time, including before [`start`](Self::start).
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Request that the cycle stop as soon as possible. Idempotent.
    pub fn request_cancel(&self) {
        self.cancel.cancel();
    }

    /// Begin the fetch cycle on its own task.
    pub fn start(self) -> WorkerHandle {
        let cancel = self.cancel.clone();
        let join = tokio::spawn(self.run());
        WorkerHandle { cancel, join }
    }

    async fn run(mut self) {
        tracing::debug!(url = %self.url, "waiting for fetch permit");
        let _permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                tracing::debug!(url = %self.url, "cancelled before permit acquisition");
                return;
            }
            permit = self.permits.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                // Closed semaphore: the pool is shutting down
                Err(_) => return,
            },
        };

        if self.cancel.is_cancelled() {
            // Terminal cleanup only: no fetch, no message. The permit is
            // still released by the drop below.
            tracing::debug!(url = %self.url, "cancelled before fetch");
            return;
        }

        let result = fetch_and_parse(
            self.transport.as_ref(),
            self.parser.as_mut(),
            &self.url,
            self.max_items,
            &self.cancel,
        )
        .await;

        let outcome = match result {
            Ok(feed) => {
                if self.cancel.is_cancelled() {
                    tracing::debug!(url = %self.url, "stop requested while parsing");
                } else {
                    tracing::debug!(
                        url = %self.url,
                        articles = feed.article_count(),
                        "finished parsing"
                    );
                }
                FetchOutcome {
                    url: self.url.clone(),
                    completion: Completion::Ok,
                    feed: Some(feed),
                    error: None,
                }
            }
            Err(e) => {
                tracing::warn!(url = %self.url, error = %e, "fetch failed");
                FetchOutcome {
                    url: self.url.clone(),
                    completion: Completion::Failed,
                    feed: None,
                    error: Some(e.to_string()),
                }
            }
        };

        // Cancellation suppresses delivery entirely: the consumer sees a
        // message or silence, never a message after it asked us to stop.
        if self.cancel.is_cancelled() {
            return;
        }
        if self.sink.send(outcome).await.is_err() {
            tracing::debug!(url = %self.url, "result channel closed, outcome dropped");
        }
        // _permit drops here: exactly one release per acquisition, on every
        // exit path above as well.
    }
}

async fn fetch_and_parse(
    transport: &dyn Transport,
    parser: &mut dyn FeedParser,
    url: &Url,
    max_items: usize,
    cancel: &CancellationToken,
) -> Result<Feed, FetchFailure> {
    transport.housekeep();

    // Single attempt: no retry, no backoff beyond the transport's timeout
    let body = transport.get(url).await?;
    if body.is_empty() {
        return Err(FetchFailure::EmptyBody(url.clone()));
    }

    let mut reader = Cursor::new(body);
    let feed = parser.parse(&mut reader, max_items, cancel)?;
    Ok(feed)
}

/// Handle to a started worker.
pub struct WorkerHandle {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    /// Request that the in-flight cycle stop. Idempotent; a no-op once the
    /// cycle has reached a terminal state.
    pub fn request_cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the worker task to exit.
    pub async fn join(self) {
        // A worker task never panics in normal operation; a join error here
        // means the task was aborted externally, which we treat as finished.
        let _ = self.join.await;
    }
}

/// Spawn one gated worker per URL, sharing a permit pool sized from the
/// config and a single result channel.
///
/// Fails eagerly on the first invalid URL or unknown parser name; in that
/// case no workers are started. Handles are returned in input order, but
/// outcomes arrive on the channel in completion order.
pub fn spawn_all<I>(
    registry: &ParserRegistry,
    config: &FetchConfig,
    transport: Arc<dyn Transport>,
    urls: I,
    sink: mpsc::Sender<FetchOutcome>,
) -> Result<Vec<WorkerHandle>, WorkerError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let permits = Arc::new(Semaphore::new(config.max_concurrent_fetches));
    let workers = urls
        .into_iter()
        .map(|url| {
            FetchWorker::configure(
                registry,
                &config.parser,
                transport.clone(),
                config.max_items_per_feed,
                sink.clone(),
                url.as_ref(),
                permits.clone(),
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(workers.into_iter().map(FetchWorker::start).collect())
}
