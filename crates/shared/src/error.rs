use thiserror::Error;

/// Failure of a remote entity-service call.
///
/// Not-found is not an error: `EntityService::fetch` reports it as
/// `Ok(None)` so callers can treat a missing record as a navigation
/// concern rather than a fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("failed to decode response body: {0}")]
    Decode(String),
    #[error("entity has no identifier")]
    MissingId,
}
