//! Cache Policy Module
//!
//! Describes how long an entry should live in the backing store.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::cache::DEFAULT_SLIDING_EXPIRATION;

// == Cache Policy ==
/// Expiration policy attached to a single write.
///
/// An empty policy means the entry never expires. When both
/// `expires_after` and `absolute_expiration` are set, the relative one wins.
/// Absolute (or relative) expiration combines with sliding expiration by
/// taking whichever ends first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CachePolicy {
    /// Fixed wall-clock expiration
    pub absolute: Option<DateTime<Utc>>,
    /// Expiration relative to the write time
    pub relative: Option<Duration>,
    /// Expiration renewed on access
    pub sliding: Option<Duration>,
}

impl CachePolicy {
    // == Constructor ==
    /// Creates a policy with no expiration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a fixed wall-clock expiration.
    pub fn absolute_expiration(mut self, at: DateTime<Utc>) -> Self {
        self.absolute = Some(at);
        self
    }

    /// Sets an expiration relative to the moment of the write.
    pub fn expires_after(mut self, duration: Duration) -> Self {
        self.relative = Some(duration);
        self
    }

    /// Sets a sliding expiration.
    pub fn sliding_expiration(mut self, duration: Duration) -> Self {
        self.sliding = Some(duration);
        self
    }

    /// Policy used when a caller supplies none.
    pub fn fallback() -> Self {
        Self::new().sliding_expiration(DEFAULT_SLIDING_EXPIRATION)
    }

    /// Returns true when no expiration of any kind is set.
    pub fn is_unbounded(&self) -> bool {
        self.absolute.is_none() && self.relative.is_none() && self.sliding.is_none()
    }
}
