//! Resolution error types.
//!
//! Only station resolution fails loudly. Feed, fetch and decode problems are
//! reported per station as [`crate::realtime::ArrivalOutcome`] values instead.

/// Errors raised while resolving a caller's station reference.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// The request carried no station alias at all
    #[error("station alias is required")]
    MissingAlias,

    /// No alias entry matched any spelling variant
    #[error("unknown station alias: {0}")]
    UnknownAlias(String),
}
