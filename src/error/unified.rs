//! Error classification and recovery hints.

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authentication,
    RateLimit,
    Network,
    Timeout,
    Server,
    Api,
    Configuration,
    Serialization,
    /// The upstream stream ended in a structurally invalid state.
    Stream,
    Cancelled,
    Unknown,
}

/// Suggested recovery action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    RetryWithBackoff,
    RetryRequest,
    CheckCredentials,
    CheckConfiguration,
    IncreaseTimeout,
    ContactSupport,
    /// Nothing to recover; the caller asked for this outcome.
    None,
}
