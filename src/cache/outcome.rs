//! Lookup Outcome
//!
//! Two-variant result used by reads so that a missing key is not an error.

use crate::cache::NOT_FOUND;

// == Outcome ==
/// Result of a cache lookup: either a value or a failure message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The lookup produced a value
    Success(T),
    /// The lookup produced nothing, with a reason
    Failure(String),
}

impl<T> Outcome<T> {
    /// The failure returned for absent keys.
    pub fn not_found() -> Self {
        Outcome::Failure(NOT_FOUND.to_string())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// Borrows the value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            Outcome::Success(value) => Some(value),
            Outcome::Failure(_) => None,
        }
    }

    /// Borrows the failure message, if any.
    pub fn error(&self) -> Option<&str> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(message) => Some(message),
        }
    }

    /// Converts into an `Option`, discarding the failure message.
    pub fn into_option(self) -> Option<T> {
        match self {
            Outcome::Success(value) => Some(value),
            Outcome::Failure(_) => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Success(value) => Outcome::Success(f(value)),
            Outcome::Failure(message) => Outcome::Failure(message),
        }
    }
}

impl<T> From<Option<T>> for Outcome<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or_else(Outcome::not_found, Outcome::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_accessors() {
        let outcome = Outcome::Success(42);
        assert!(outcome.is_success());
        assert_eq!(outcome.value(), Some(&42));
        assert_eq!(outcome.error(), None);
        assert_eq!(outcome.into_option(), Some(42));
    }

    #[test]
    fn test_not_found() {
        let outcome: Outcome<String> = Outcome::not_found();
        assert!(!outcome.is_success());
        assert_eq!(outcome.error(), Some("Not Found"));
        assert!(outcome.value().is_none());
    }

    #[test]
    fn test_from_option() {
        assert_eq!(Outcome::from(Some("a")), Outcome::Success("a"));
        assert_eq!(Outcome::<&str>::from(None), Outcome::not_found());
    }

    #[test]
    fn test_map_keeps_failure() {
        let failed: Outcome<i32> = Outcome::Failure("boom".to_string());
        assert_eq!(failed.map(|v| v * 2), Outcome::Failure("boom".to_string()));
        assert_eq!(Outcome::Success(2).map(|v| v * 2), Outcome::Success(4));
    }
}
