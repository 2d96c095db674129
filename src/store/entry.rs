//! Stored Entry Module
//!
//! Defines a single value held by the in-process store, with TTL support.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;

use crate::store::EntryExpiry;

// == Stored Entry ==
/// Represents a single stored payload with expiration metadata.
#[derive(Debug, Clone)]
pub struct StoredEntry {
    /// The stored payload
    pub value: Bytes,
    /// Expiry given at write time, consulted again on every read
    pub expiry: EntryExpiry,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl StoredEntry {
    // == Constructor ==
    /// Creates a new entry expiring per `expiry`.
    ///
    /// # Arguments
    /// * `value` - The payload to store
    /// * `expiry` - TTL and sliding window of the entry
    pub fn new(value: Bytes, expiry: EntryExpiry) -> Self {
        let expires_at = expiry.ttl.map(seconds_from_now);

        Self {
            value,
            expiry,
            expires_at,
        }
    }

    // == Renew ==
    /// Restarts the sliding window after a read. No-op for non-sliding entries.
    pub fn renew(&mut self) {
        if let Some(ttl) = self.expiry.renewal(current_timestamp_ms()) {
            self.expires_at = Some(seconds_from_now(ttl));
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches its expiration time.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => current_timestamp_ms() >= expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns remaining TTL in seconds, or None if no expiration is set.
    ///
    /// # Returns
    /// - `Some(0)` if the entry has expired
    /// - `Some(remaining_seconds)` if the entry has TTL and hasn't expired
    /// - `None` if the entry never expires
    pub fn ttl_remaining(&self) -> Option<u64> {
        self.expires_at
            .map(|expires| expires.saturating_sub(current_timestamp_ms()) / 1000)
    }
}

// == Utility Functions ==
fn seconds_from_now(seconds: u64) -> u64 {
    current_timestamp_ms().saturating_add(seconds.saturating_mul(1000))
}

/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn test_entry_creation_no_ttl() {
        let entry = StoredEntry::new(Bytes::from_static(b"value"), EntryExpiry::never());

        assert_eq!(entry.value, Bytes::from_static(b"value"));
        assert!(entry.expires_at.is_none());
        assert!(!entry.is_expired());
        assert!(entry.ttl_remaining().is_none());
    }

    #[test]
    fn test_entry_creation_with_ttl() {
        let entry = StoredEntry::new(Bytes::from_static(b"value"), EntryExpiry::fixed(10));

        assert!(!entry.is_expired());
        let remaining = entry.ttl_remaining().unwrap();
        assert!(remaining <= 10);
        assert!(remaining >= 9);
    }

    #[test]
    fn test_entry_expiration() {
        let entry = StoredEntry::new(Bytes::from_static(b"value"), EntryExpiry::fixed(1));

        assert!(!entry.is_expired());

        // Wait for expiration
        sleep(Duration::from_millis(1100));

        assert!(entry.is_expired());
        assert_eq!(entry.ttl_remaining(), Some(0));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let now = current_timestamp_ms();
        let entry = StoredEntry {
            value: Bytes::new(),
            expiry: EntryExpiry::fixed(0),
            expires_at: Some(now),
        };

        assert!(entry.is_expired(), "Entry should be expired at boundary");
    }

    #[test]
    fn test_renew_restarts_sliding_window() {
        let mut entry = StoredEntry::new(Bytes::from_static(b"value"), EntryExpiry::sliding(30));
        entry.expires_at = Some(current_timestamp_ms() + 1_000);

        entry.renew();

        let remaining = entry.ttl_remaining().unwrap();
        assert!(remaining >= 29 && remaining <= 30);
    }

    #[test]
    fn test_renew_leaves_fixed_entries_alone() {
        let mut entry = StoredEntry::new(Bytes::from_static(b"value"), EntryExpiry::fixed(30));
        let expires_at = current_timestamp_ms() + 1_000;
        entry.expires_at = Some(expires_at);

        entry.renew();

        assert_eq!(entry.expires_at, Some(expires_at));
    }
}
