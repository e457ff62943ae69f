use crate::message::DecodeError;
use thiserror::Error;

/// Errors surfaced to the EAP framework through [`crate::EapResult::Error`].
///
/// Everything recoverable inside the protocol (bad MAC on a challenge, stale
/// RANDs, undecodable attributes where the RFC allows a Client-Error
/// response) is answered on the wire instead and never appears here.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The request could not be decoded and no Client-Error response is
    /// permitted at this point of the exchange.
    #[error("malformed request: {0}")]
    Malformed(#[from] DecodeError),

    /// The peer violated request sequencing, e.g. a second notification in
    /// one method run or a request after a terminal state.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The SIM/USIM collaborator rejected the challenge or returned an
    /// unusable response.
    #[error("SIM/USIM authentication failure: {0}")]
    AuthenticationFailure(String),

    /// A MAC operation was requested before key material was established.
    /// Unreachable through valid protocol sequencing; indicates a bug.
    #[error("key state violation: {0}")]
    KeyStateViolation(&'static str),
}
