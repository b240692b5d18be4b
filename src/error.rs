//! Error types for the lrudict library.
//!
//! ## Key Components
//!
//! - [`LruError`]: Returned by [`LruDict`](crate::policy::lru_dict::LruDict)
//!   operations (missing key, empty cache, bad capacity, busy cache, fatal
//!   callback failure).
//! - [`CallbackError`]: Returned by an eviction callback. Non-fatal failures are
//!   logged and suppressed by the purge queue; fatal ones abort the drain and
//!   surface as [`LruError::FatalCallback`].
//! - [`ConfigError`]: Returned when cache configuration parameters are invalid
//!   (e.g. zero capacity, pending-callback bound out of range).
//! - [`InvariantError`]: Returned when internal data-structure invariants are
//!   violated (`check_invariants` methods).
//!
//! ## Example Usage
//!
//! ```
//! use lrudict::error::{ConfigError, LruError};
//! use lrudict::policy::lru_dict::LruDict;
//!
//! // Zero capacity is rejected without panicking
//! let bad = LruDict::<u32, String>::new(0);
//! assert!(matches!(bad, Err(LruError::InvalidCapacity)));
//!
//! // Builders report configuration problems as ConfigError
//! let err: ConfigError = LruDict::<u32, String>::builder(4)
//!     .max_pending_callbacks(0)
//!     .try_build()
//!     .unwrap_err();
//! assert!(err.to_string().contains("max_pending_callbacks"));
//! ```

use thiserror::Error;

// ---------------------------------------------------------------------------
// LruError
// ---------------------------------------------------------------------------

/// Error returned by cache operations.
///
/// Every variant except [`LruError::FatalCallback`] is raised before any
/// mutation takes place, so a failed call leaves the cache untouched.
#[derive(Debug, Error)]
pub enum LruError {
    /// The key is not present and the operation requires it.
    #[error("key not found")]
    KeyNotFound,
    /// The operation needs at least one entry.
    #[error("{op}(): cache is empty")]
    EmptyCache { op: &'static str },
    /// Capacity must be at least one.
    #[error("capacity must be positive")]
    InvalidCapacity,
    /// A mutating call started while another one had not finished.
    #[error("attempted entry into cache critical section while busy")]
    Busy,
    /// An eviction callback failed in a way that must reach the caller.
    #[error("fatal error in eviction callback: {0}")]
    FatalCallback(#[source] CallbackError),
}

impl From<CallbackError> for LruError {
    fn from(err: CallbackError) -> Self {
        LruError::FatalCallback(err)
    }
}

// ---------------------------------------------------------------------------
// CallbackError
// ---------------------------------------------------------------------------

/// Failure reported by an eviction callback.
///
/// [`CallbackError::Failed`] is the ordinary case: the purge queue logs it and
/// carries on with the next pending eviction. The remaining variants are fatal
/// and propagate out of the drain to the caller of the triggering operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallbackError {
    #[error("{0}")]
    Failed(String),
    #[error("maximum recursion depth exceeded")]
    RecursionLimit,
    #[error("out of memory")]
    OutOfMemory,
    #[error("exit requested with status {0}")]
    Exit(i32),
}

impl CallbackError {
    /// Creates a non-fatal failure with the given description.
    #[inline]
    pub fn failed(msg: impl Into<String>) -> Self {
        CallbackError::Failed(msg.into())
    }

    /// Returns `true` if this failure must abort the drain and reach the caller.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, CallbackError::Failed(_))
    }
}

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// A `check_invariants` walk found the index, the recency list or the
/// length bookkeeping out of step.
///
/// Only a bug in this crate should ever produce one; the message names the
/// structure and the slot involved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct InvariantError(String);

impl InvariantError {
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Rejected cache configuration.
///
/// Returned by [`LruDictBuilder::try_build`](crate::builder::LruDictBuilder::try_build)
/// and [`LruDict::set_max_pending_callbacks`](crate::policy::lru_dict::LruDict::set_max_pending_callbacks).
///
/// ```
/// use lrudict::builder::LruDictBuilder;
///
/// let err = LruDictBuilder::<u64, u64>::new(0).try_build().unwrap_err();
/// assert_eq!(err.message(), "capacity must be greater than zero");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid configuration: {0}")]
pub struct ConfigError(String);

impl ConfigError {
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// The reason, without the "invalid configuration" prefix.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}
