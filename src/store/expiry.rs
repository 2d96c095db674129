//! Entry Expiry
//!
//! Expiration metadata handed to the store with every write, so a backend can
//! renew sliding entries on read without knowing about cache policies.

// == Entry Expiry ==
/// Expiration of one stored entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryExpiry {
    /// TTL in seconds applied at write time, None = keep until removed
    pub ttl: Option<u64>,
    /// Sliding window in seconds, restarted on every successful read
    pub sliding: Option<u64>,
    /// Absolute deadline (Unix milliseconds) that caps sliding renewals
    pub absolute_ms: Option<u64>,
}

impl EntryExpiry {
    /// Entry kept until removed.
    pub fn never() -> Self {
        Self::default()
    }

    /// Entry expiring `ttl` seconds after the write, never renewed.
    pub fn fixed(ttl: u64) -> Self {
        Self {
            ttl: Some(ttl),
            ..Self::default()
        }
    }

    /// Entry expiring `window` seconds after its latest write or read.
    pub fn sliding(window: u64) -> Self {
        Self {
            ttl: Some(window),
            sliding: Some(window),
            absolute_ms: None,
        }
    }

    // == Renewal ==
    /// TTL in seconds to apply when the entry is read at `now_ms`.
    ///
    /// `None` when the entry does not slide or its absolute deadline has passed.
    /// Otherwise the full window, cut short by the absolute deadline, and never
    /// less than one second.
    pub fn renewal(&self, now_ms: u64) -> Option<u64> {
        let window_ms = self.sliding?.saturating_mul(1000);
        let renewed_ms = match self.absolute_ms {
            Some(deadline) if deadline <= now_ms => return None,
            Some(deadline) => window_ms.min(deadline - now_ms),
            None => window_ms,
        };
        Some((renewed_ms / 1000).max(1))
    }
}
