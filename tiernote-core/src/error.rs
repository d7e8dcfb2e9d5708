//! Error types for tiernote operations

use std::fmt;
use thiserror::Error;

/// Which storage tier an operation touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// The fast, size-bounded tier.
    Cache,
    /// The unbounded persistent tier.
    Durable,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Cache => "cache",
            Tier::Durable => "durable",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by the note store.
///
/// Deleting an unknown id is not an error, and text is never validated, so
/// tier failures are the only failure mode.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NoteError {
    /// Connection, transaction or (de)serialization failure on a tier.
    #[error("{tier} tier unavailable: {reason}")]
    TierUnavailable { tier: Tier, reason: String },
}

impl NoteError {
    pub fn cache_unavailable(reason: impl Into<String>) -> Self {
        NoteError::TierUnavailable {
            tier: Tier::Cache,
            reason: reason.into(),
        }
    }

    pub fn durable_unavailable(reason: impl Into<String>) -> Self {
        NoteError::TierUnavailable {
            tier: Tier::Durable,
            reason: reason.into(),
        }
    }

    /// Prefix the reason with what the caller had already done.
    pub fn with_context(self, context: impl std::fmt::Display) -> Self {
        match self {
            NoteError::TierUnavailable { tier, reason } => NoteError::TierUnavailable {
                tier,
                reason: format!("{}: {}", context, reason),
            },
        }
    }

    /// The tier that failed.
    pub fn tier(&self) -> Tier {
        match self {
            NoteError::TierUnavailable { tier, .. } => *tier,
        }
    }
}

/// Result type alias for note store operations.
pub type NoteResult<T> = Result<T, NoteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_unavailable_display() {
        let err = NoteError::cache_unavailable("connection refused");
        let msg = format!("{}", err);
        assert!(msg.contains("cache tier unavailable"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn test_error_reports_tier() {
        assert_eq!(NoteError::cache_unavailable("x").tier(), Tier::Cache);
        assert_eq!(NoteError::durable_unavailable("x").tier(), Tier::Durable);
    }

    #[test]
    fn test_context_keeps_tier() {
        let err = NoteError::durable_unavailable("timeout").with_context("copying 3 notes");
        assert_eq!(err.tier(), Tier::Durable);
        assert_eq!(
            err.to_string(),
            "durable tier unavailable: copying 3 notes: timeout"
        );
    }
}
