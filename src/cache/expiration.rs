//! Expiration Calculator
//!
//! Turns a [`CachePolicy`] and a creation timestamp into a store TTL in whole seconds,
//! plus the sliding window the store restarts on reads.
//! Pure functions only; nothing here touches the store.

use chrono::{DateTime, Utc};

use crate::cache::CachePolicy;
use crate::error::{CacheError, Result};
use crate::store::EntryExpiry;

// == Absolute Expiration ==
/// Resolves the absolute expiration of a policy written at `creation`.
///
/// Fails when the absolute expiration is not after `creation`, or when a
/// relative or sliding duration is zero.
pub fn absolute_expiration(
    creation: DateTime<Utc>,
    policy: &CachePolicy,
) -> Result<Option<DateTime<Utc>>> {
    if let Some(absolute) = policy.absolute {
        if absolute <= creation {
            return Err(CacheError::InvalidPolicy(format!(
                "The absolute expiration value must be in the future: {}",
                absolute.to_rfc3339()
            )));
        }
    }

    if policy.sliding.is_some_and(|d| d.is_zero()) {
        return Err(CacheError::InvalidPolicy(
            "The sliding expiration value must be positive".to_string(),
        ));
    }

    match policy.relative {
        Some(relative) if relative.is_zero() => Err(CacheError::InvalidPolicy(
            "The relative expiration value must be positive".to_string(),
        )),
        Some(relative) => {
            let relative = chrono::Duration::from_std(relative).map_err(|_| {
                CacheError::InvalidPolicy("The relative expiration value is too large".to_string())
            })?;
            creation
                .checked_add_signed(relative)
                .map(Some)
                .ok_or_else(|| {
                    CacheError::InvalidPolicy(
                        "The relative expiration value is too large".to_string(),
                    )
                })
        }
        None => Ok(policy.absolute),
    }
}

// == Expiration In Seconds ==
/// Derives the TTL in seconds from a resolved absolute expiration and the sliding part of `policy`.
///
/// Returns `None` when the entry should never expire. Sub-second remainders are
/// truncated, but a positive expiration never yields less than one second.
pub fn expiration_in_seconds(
    creation: DateTime<Utc>,
    absolute: Option<DateTime<Utc>>,
    policy: &CachePolicy,
) -> Option<u64> {
    let until_absolute = absolute.map(|at| (at - creation).num_seconds().max(0) as u64);
    let sliding = policy.sliding.map(|d| d.as_secs());

    let ttl = match (until_absolute, sliding) {
        (Some(a), Some(s)) => Some(a.min(s)),
        (Some(a), None) => Some(a),
        (None, Some(s)) => Some(s),
        (None, None) => None,
    };

    ttl.map(|secs| secs.max(1))
}

// == TTL ==
/// Combines [`absolute_expiration`] and [`expiration_in_seconds`].
pub fn ttl_seconds(policy: &CachePolicy, creation: DateTime<Utc>) -> Result<Option<u64>> {
    let absolute = absolute_expiration(creation, policy)?;
    Ok(expiration_in_seconds(creation, absolute, policy))
}

// == Entry Expiry ==
/// Resolves everything the store needs to expire an entry written at `creation`.
///
/// The sliding window is kept in whole seconds (at least one) so the store can
/// restart it on reads, capped by the absolute expiration if there is one.
pub fn entry_expiry(policy: &CachePolicy, creation: DateTime<Utc>) -> Result<EntryExpiry> {
    let absolute = absolute_expiration(creation, policy)?;
    Ok(EntryExpiry {
        ttl: expiration_in_seconds(creation, absolute, policy),
        sliding: policy.sliding.map(|d| d.as_secs().max(1)),
        absolute_ms: absolute.and_then(|at| u64::try_from(at.timestamp_millis()).ok()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_no_expiration() {
        assert_eq!(ttl_seconds(&CachePolicy::new(), t0()).unwrap(), None);
    }

    #[test]
    fn test_sliding_only() {
        let policy = CachePolicy::new().sliding_expiration(Duration::from_secs(120));
        assert_eq!(ttl_seconds(&policy, t0()).unwrap(), Some(120));
    }

    #[test]
    fn test_absolute_only() {
        let policy = CachePolicy::new().absolute_expiration(t0() + chrono::Duration::minutes(5));
        assert_eq!(ttl_seconds(&policy, t0()).unwrap(), Some(300));
    }

    #[test]
    fn test_relative_only() {
        let policy = CachePolicy::new().expires_after(Duration::from_secs(90));
        assert_eq!(
            absolute_expiration(t0(), &policy).unwrap(),
            Some(t0() + chrono::Duration::seconds(90))
        );
        assert_eq!(ttl_seconds(&policy, t0()).unwrap(), Some(90));
    }

    #[test]
    fn test_absolute_and_sliding_takes_minimum() {
        let policy = CachePolicy::new()
            .absolute_expiration(t0() + chrono::Duration::minutes(10))
            .sliding_expiration(Duration::from_secs(60));
        assert_eq!(ttl_seconds(&policy, t0()).unwrap(), Some(60));

        let policy = CachePolicy::new()
            .absolute_expiration(t0() + chrono::Duration::seconds(30))
            .sliding_expiration(Duration::from_secs(60));
        assert_eq!(ttl_seconds(&policy, t0()).unwrap(), Some(30));
    }

    #[test]
    fn test_relative_overrides_absolute() {
        let policy = CachePolicy::new()
            .absolute_expiration(t0() + chrono::Duration::hours(1))
            .expires_after(Duration::from_secs(10));
        assert_eq!(ttl_seconds(&policy, t0()).unwrap(), Some(10));
    }

    #[test]
    fn test_absolute_in_past_rejected() {
        let policy = CachePolicy::new().absolute_expiration(t0() - chrono::Duration::seconds(1));
        assert!(matches!(
            ttl_seconds(&policy, t0()),
            Err(CacheError::InvalidPolicy(_))
        ));
    }

    #[test]
    fn test_absolute_equal_to_creation_rejected() {
        let policy = CachePolicy::new().absolute_expiration(t0());
        assert!(ttl_seconds(&policy, t0()).is_err());
    }

    #[test]
    fn test_zero_durations_rejected() {
        let sliding = CachePolicy::new().sliding_expiration(Duration::ZERO);
        assert!(ttl_seconds(&sliding, t0()).is_err());

        let relative = CachePolicy::new().expires_after(Duration::ZERO);
        assert!(ttl_seconds(&relative, t0()).is_err());
    }

    #[test]
    fn test_sub_second_ttl_rounds_up_to_one() {
        let policy =
            CachePolicy::new().absolute_expiration(t0() + chrono::Duration::milliseconds(400));
        assert_eq!(ttl_seconds(&policy, t0()).unwrap(), Some(1));

        let policy = CachePolicy::new().sliding_expiration(Duration::from_millis(250));
        assert_eq!(ttl_seconds(&policy, t0()).unwrap(), Some(1));
    }

    #[test]
    fn test_fractional_seconds_truncate() {
        let policy =
            CachePolicy::new().absolute_expiration(t0() + chrono::Duration::milliseconds(2900));
        assert_eq!(ttl_seconds(&policy, t0()).unwrap(), Some(2));
    }

    #[test]
    fn test_entry_expiry_keeps_sliding_window() {
        let policy = CachePolicy::new()
            .absolute_expiration(t0() + chrono::Duration::minutes(10))
            .sliding_expiration(Duration::from_secs(60));

        let expiry = entry_expiry(&policy, t0()).unwrap();

        assert_eq!(expiry.ttl, Some(60));
        assert_eq!(expiry.sliding, Some(60));
        assert_eq!(
            expiry.absolute_ms,
            Some((t0() + chrono::Duration::minutes(10)).timestamp_millis() as u64)
        );
    }

    #[test]
    fn test_entry_expiry_without_sliding_never_renews() {
        let policy = CachePolicy::new().expires_after(Duration::from_secs(30));

        let expiry = entry_expiry(&policy, t0()).unwrap();

        assert_eq!(expiry.ttl, Some(30));
        assert_eq!(expiry.sliding, None);
        assert_eq!(expiry.renewal(t0().timestamp_millis() as u64), None);
    }

    #[test]
    fn test_entry_expiry_rejects_invalid_policy() {
        let policy = CachePolicy::new().absolute_expiration(t0());
        assert!(matches!(
            entry_expiry(&policy, t0()),
            Err(CacheError::InvalidPolicy(_))
        ));
    }
}
