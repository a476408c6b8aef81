use thiserror::Error;
use trackkit_location::{AcquireError, AuthorizationStatus, LocationError};

use crate::TransportError;

/// Errors that can end a single report attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    /// Location access is refused until the operator changes system settings.
    #[error("location authorization is {0}")]
    AuthorizationDenied(AuthorizationStatus),

    /// No fix arrived within the acquisition timeout.
    #[error("timed out waiting for a location fix")]
    AcquisitionTimeout,

    /// The platform reported a location failure.
    #[error("failed to get location: {0}")]
    AcquisitionFailed(LocationError),

    /// The payload could not be encoded.
    #[error("failed to serialize report: {0}")]
    Serialization(String),

    /// The configured collector endpoint is not a usable URL.
    #[error("invalid backend URL `{endpoint}`: {reason}")]
    InvalidEndpoint {
        /// The configured value.
        endpoint: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The request could not be delivered.
    #[error("failed to report: {0}")]
    Transport(String),

    /// The collector did not answer in time.
    #[error("report timed out")]
    SendTimeout,

    /// The collector answered with a non-2xx status.
    #[error("collector rejected report with status {status}")]
    RemoteRejected {
        /// HTTP status code.
        status: u16,
    },
}

impl From<AcquireError> for ReportError {
    fn from(err: AcquireError) -> Self {
        match err {
            AcquireError::Timeout => Self::AcquisitionTimeout,
            AcquireError::Failed(err) => Self::AcquisitionFailed(err),
        }
    }
}

impl From<TransportError> for ReportError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout => Self::SendTimeout,
            TransportError::Request(message) => Self::Transport(message),
        }
    }
}

impl From<serde_json::Error> for ReportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
