use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the negotiation layer.
///
/// `ErrNegotiation` is the only variant callers should treat as potentially
/// retryable; everything else indicates a programming error or stale state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    #[error("duplicate session: {id}")]
    ErrDuplicateSession { id: String },
    #[error("session not found: {id}")]
    ErrSessionNotFound { id: String },
    #[error("unsupported operation: {0}")]
    ErrUnsupportedOperation(String),
    #[error("negotiation failed: {0}")]
    ErrNegotiation(String),
    #[error("transport is closed")]
    ErrTransportClosed,
    #[error("invalid simulcast config: {0}")]
    ErrInvalidSimulcastConfig(String),
    #[error("media kind mismatch")]
    ErrMediaKindMismatch,
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wraps a failed offer/answer step. An error that already is a
    /// negotiation failure is passed through unchanged.
    pub(crate) fn into_negotiation(self) -> Error {
        match self {
            Error::ErrNegotiation(_) | Error::ErrTransportClosed => self,
            other => Error::ErrNegotiation(other.to_string()),
        }
    }
}
