//! Location authorization handling.
//!
//! This crate models the platform's location permission state and provides
//! [`AuthorizationGate`], which reacts to authorization changes reported by a
//! location backend.

#![warn(missing_docs)]

mod gate;

/// Platform-specific implementations.
pub mod sys;

pub use gate::{AuthorizationGate, GateDecision};
pub use sys::SystemAuthorization;

/// The platform's current location authorization state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthorizationStatus {
    /// The user has not been asked yet.
    NotDetermined,
    /// Location services are disabled or restricted (e.g. by a device profile).
    Restricted,
    /// The user has denied location access.
    Denied,
    /// Access granted, including while the process is in the background.
    AuthorizedAlways,
    /// Access granted while the process is in use.
    AuthorizedWhenInUse,
    /// The platform reported a state this crate does not recognize.
    Unknown,
}

impl AuthorizationStatus {
    /// Whether location updates may be delivered in this state.
    #[must_use]
    pub const fn is_authorized(self) -> bool {
        matches!(self, Self::AuthorizedAlways | Self::AuthorizedWhenInUse)
    }

    /// Whether only the operator can change this state.
    #[must_use]
    pub const fn is_refused(self) -> bool {
        matches!(self, Self::Restricted | Self::Denied)
    }
}

impl std::fmt::Display for AuthorizationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotDetermined => write!(f, "not determined"),
            Self::Restricted => write!(f, "restricted"),
            Self::Denied => write!(f, "denied"),
            Self::AuthorizedAlways => write!(f, "authorized (always)"),
            Self::AuthorizedWhenInUse => write!(f, "authorized (when in use)"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// The kind of grant to ask the platform for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AuthorizationLevel {
    /// Ask for access at all times.
    Always,
    /// Ask for access while the process is in use.
    #[default]
    WhenInUse,
}

impl std::str::FromStr for AuthorizationLevel {
    type Err = PermissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "when-in-use" | "when_in_use" | "wheninuse" => Ok(Self::WhenInUse),
            other => Err(PermissionError::UnknownLevel(other.to_string())),
        }
    }
}

/// Errors that can occur when handling authorization.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PermissionError {
    /// The authorization level string was not recognized.
    #[error("unknown authorization level: {0} (expected `always` or `when-in-use`)")]
    UnknownLevel(String),
}

/// Narrow view of a platform location service's permission surface.
///
/// Implementations report status changes asynchronously through their own
/// delegate mechanism; [`request_authorization`](Self::request_authorization)
/// must return without waiting for the user.
pub trait AuthorizationProvider: Send + Sync {
    /// Current platform-reported status. No side effects.
    fn authorization_status(&self) -> AuthorizationStatus;

    /// Issue an asynchronous permission prompt for `level`.
    fn request_authorization(&self, level: AuthorizationLevel);
}
