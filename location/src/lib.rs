//! Location fix acquisition.
//!
//! This crate turns a callback-driven platform location service into two
//! shapes a polling caller can consume: a continuously refreshed last known
//! fix, and a bounded "get one fix or time out" call.
//!
//! Platform services are reached through [`LocationBackend`]; events flow back
//! through a [`LocationDelegate`]. [`LocationManager`] wires a backend to the
//! authorization gate and the [`FixAcquirer`].

#![warn(missing_docs)]

mod acquirer;
mod manager;
pub mod mock;
mod rendezvous;

/// Platform-specific implementations.
pub mod sys;

use std::sync::Arc;

use chrono::{DateTime, Utc};

pub use acquirer::{AcquireError, FixAcquirer};
pub use manager::LocationManager;
pub use rendezvous::{Rendezvous, Waiter};
pub use trackkit_permission::{
    AuthorizationGate, AuthorizationLevel, AuthorizationProvider, AuthorizationStatus,
    GateDecision,
};

/// A single position sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Fix {
    /// Latitude in degrees (-90 to 90).
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180).
    pub longitude: f64,
    /// Horizontal accuracy radius in meters.
    pub horizontal_accuracy: f64,
    /// Altitude in meters above sea level.
    pub altitude: f64,
    /// When the platform sampled this position.
    pub sampled_at: DateTime<Utc>,
}

impl Fix {
    /// Whether latitude and longitude are finite and in range.
    #[must_use]
    pub fn has_valid_coordinates(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Errors reported by a location backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    /// Location access was denied.
    #[error("location access denied")]
    Denied,
    /// The platform could not determine a location right now.
    #[error("location unknown")]
    LocationUnknown,
    /// No location service is available on this platform.
    #[error("location service not available")]
    NotAvailable,
    /// The backend has no delegate to deliver results to.
    #[error("no delegate registered with the location backend")]
    DelegateMissing,
    /// Any other backend failure.
    #[error("location backend error: {0}")]
    Backend(String),
}

/// Result alias for location operations.
pub type LocationResult<T> = Result<T, LocationError>;

/// Events delivered by a location backend.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationEvent {
    /// A new position sample.
    Update {
        /// The sample.
        fix: Fix,
    },
    /// A location request failed.
    Failure {
        /// Why it failed.
        error: LocationError,
    },
    /// The platform authorization state changed.
    AuthorizationChanged {
        /// The new state.
        status: AuthorizationStatus,
    },
}

/// Receives events from a [`LocationBackend`].
///
/// Backends may call this from any thread, at any time.
pub trait LocationDelegate: Send + Sync {
    /// Handle one event.
    fn on_event(&self, event: LocationEvent);
}

/// A platform location service.
///
/// Requests return as soon as they are issued; results arrive later through
/// the registered delegate.
pub trait LocationBackend: AuthorizationProvider {
    /// Register the delegate that receives all events.
    fn set_delegate(&self, delegate: Arc<dyn LocationDelegate>);

    /// Request a single fresh fix.
    ///
    /// # Errors
    ///
    /// Returns an error if the request could not be issued.
    fn request_location(&self) -> LocationResult<()>;

    /// Start delivering updates continuously.
    ///
    /// # Errors
    ///
    /// Returns an error if updates could not be started.
    fn start_updates(&self) -> LocationResult<()>;
}
