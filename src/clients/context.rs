//! Per-request context.
//!
//! Every request sent through [`HttpClient`](crate::HttpClient) owns exactly
//! one [`RequestContext`] for as long as it is in flight. The context holds a
//! snapshot of the request, slots for the response and the error, the
//! attempt counter, the cancellation controller, and [`RequestMetadata`].
//!
//! Context ids come from a [`ContextIdGenerator`]: an explicitly owned,
//! lock-free counter. Clients share the process-wide generator returned by
//! [`ContextIdGenerator::shared`] unless given one of their own.

use std::cmp::Ordering as CmpOrdering;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::clients::errors::HttpError;
use crate::clients::http_request::HttpRequest;
use crate::clients::http_response::HttpResponse;

/// Locally unique identifier of a request context.
///
/// Combines a sequence number from a [`ContextIdGenerator`] with the creation
/// timestamp. Unique within one generator's lifetime; not cryptographically
/// unique. Ordering follows the sequence number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ContextId {
    sequence: u64,
    timestamp_ms: i64,
}

impl ContextId {
    /// Creates an id from its parts.
    #[must_use]
    pub const fn new(sequence: u64, timestamp_ms: i64) -> Self {
        Self {
            sequence,
            timestamp_ms,
        }
    }

    /// Returns the sequence number.
    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns the creation timestamp in milliseconds since the Unix epoch.
    #[must_use]
    pub const fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req_{}_{}", self.timestamp_ms, self.sequence)
    }
}

impl PartialOrd for ContextId {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for ContextId {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.sequence
            .cmp(&other.sequence)
            .then(self.timestamp_ms.cmp(&other.timestamp_ms))
    }
}

/// Monotonic source of [`ContextId`]s.
///
/// # Example
///
/// ```rust
/// use fetch_kit::ContextIdGenerator;
///
/// let ids = ContextIdGenerator::new();
/// let first = ids.next_id();
/// let second = ids.next_id();
/// assert_eq!(first.sequence(), 1);
/// assert!(second > first);
///
/// ids.reset();
/// assert_eq!(ids.next_id().sequence(), 1);
/// ```
#[derive(Debug, Default)]
pub struct ContextIdGenerator {
    counter: AtomicU64,
}

static SHARED_GENERATOR: OnceLock<Arc<ContextIdGenerator>> = OnceLock::new();

impl ContextIdGenerator {
    /// Creates a generator whose first id has sequence 1.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
        }
    }

    /// Returns the process-wide generator.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::clone(SHARED_GENERATOR.get_or_init(|| Arc::new(Self::new())))
    }

    /// Issues the next id, stamped with the current time.
    pub fn next_id(&self) -> ContextId {
        self.next_id_at(Utc::now())
    }

    /// Issues the next id, stamped with `now`.
    pub fn next_id_at(&self, now: DateTime<Utc>) -> ContextId {
        let sequence = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        ContextId::new(sequence, now.timestamp_millis())
    }

    /// Returns the sequence number of the last issued id (0 if none).
    #[must_use]
    pub fn current(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }

    /// Restores the initial state: the next id has sequence 1 again.
    ///
    /// Ids issued before a reset may repeat afterwards. Intended for tests.
    pub fn reset(&self) {
        self.counter.store(0, Ordering::Relaxed);
    }
}

/// Metadata recorded when a context is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RequestMetadata {
    /// Unique id of the context.
    pub id: ContextId,
    /// Creation time.
    pub started_at: DateTime<Utc>,
}

/// Per-request metadata and cancellation state.
#[derive(Debug)]
pub struct RequestContext {
    /// Snapshot of the request as it was submitted.
    pub request: HttpRequest,
    /// The response, once one has been received.
    pub response: Option<HttpResponse>,
    /// The error, once the request has failed.
    pub error: Option<HttpError>,
    /// Current attempt number, starting at 1.
    pub attempt: u32,
    /// Internal cancellation controller for this request.
    pub controller: CancellationToken,
    /// Id and creation time.
    pub metadata: RequestMetadata,
}

impl RequestContext {
    /// Creates a context for `request`, drawing its id from `ids`.
    #[must_use]
    pub fn new(request: HttpRequest, ids: &ContextIdGenerator) -> Self {
        let now = Utc::now();
        let id = ids.next_id_at(now);
        Self {
            request,
            response: None,
            error: None,
            attempt: 1,
            controller: CancellationToken::new(),
            metadata: RequestMetadata {
                id,
                started_at: now,
            },
        }
    }

    /// Returns the context id.
    #[must_use]
    pub const fn id(&self) -> ContextId {
        self.metadata.id
    }

    /// Returns the creation time.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.metadata.started_at
    }

    /// Time since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        (Utc::now() - self.metadata.started_at)
            .to_std()
            .unwrap_or_default()
    }

    /// Returns `true` if the controller has been cancelled.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.controller.is_cancelled()
    }

    /// Cancels the controller. Further calls have no effect.
    pub fn abort(&self) {
        self.controller.cancel();
    }

    /// Advances the attempt counter and returns the new attempt number.
    pub fn next_attempt(&mut self) -> u32 {
        self.attempt = self.attempt.saturating_add(1);
        self.attempt
    }

    /// Stores the response in the response slot.
    pub fn record_response(&mut self, response: HttpResponse) {
        self.response = Some(response);
    }

    /// Stores the error in the error slot.
    pub fn record_error(&mut self, error: HttpError) {
        self.error = Some(error);
    }

    /// Consumes the context, yielding the recorded outcome.
    ///
    /// An error takes precedence over a response. A context that recorded
    /// neither settles as aborted.
    ///
    /// # Errors
    ///
    /// Returns the recorded [`HttpError`], or [`HttpError::Aborted`] if
    /// nothing was recorded.
    pub fn into_result(self) -> Result<HttpResponse, HttpError> {
        match (self.error, self.response) {
            (Some(error), _) => Err(error),
            (None, Some(response)) => Ok(response),
            (None, None) => Err(HttpError::Aborted {
                id: self.metadata.id,
            }),
        }
    }
}
