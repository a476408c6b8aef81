use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use log::error;

use crate::{
    AuthorizationGate, AuthorizationLevel, AuthorizationStatus, Fix, FixAcquirer, GateDecision,
    LocationBackend, LocationDelegate, LocationEvent, LocationResult,
};

/// Routes backend events to the gate and the acquirer.
///
/// Holds weak references: the backend owns this delegate, and both targets
/// own the backend.
struct EventRouter {
    gate: Weak<AuthorizationGate>,
    acquirer: Weak<FixAcquirer>,
}

impl fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRouter").finish()
    }
}

impl LocationDelegate for EventRouter {
    fn on_event(&self, event: LocationEvent) {
        let Some(acquirer) = self.acquirer.upgrade() else {
            return;
        };

        match event {
            LocationEvent::Update { fix } => acquirer.handle_update(fix),
            LocationEvent::Failure { error } => acquirer.handle_failure(error),
            LocationEvent::AuthorizationChanged { status } => {
                let Some(gate) = self.gate.upgrade() else {
                    return;
                };
                if gate.on_status_changed(status) == GateDecision::StartSampling {
                    if let Err(err) = acquirer.start_continuous() {
                        error!("failed to start location updates: {err}");
                    }
                }
            }
        }
    }
}

/// A location backend wired to an [`AuthorizationGate`] and a [`FixAcquirer`].
#[derive(Clone)]
pub struct LocationManager {
    gate: Arc<AuthorizationGate>,
    acquirer: Arc<FixAcquirer>,
}

impl fmt::Debug for LocationManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocationManager")
            .field("gate", &self.gate)
            .field("acquirer", &self.acquirer)
            .finish()
    }
}

impl LocationManager {
    /// Creates a manager over `backend` and registers itself as its delegate.
    pub fn new<B>(backend: Arc<B>, level: AuthorizationLevel) -> Self
    where
        B: LocationBackend + 'static,
    {
        let gate = Arc::new(AuthorizationGate::new(backend.clone(), level));
        let acquirer = Arc::new(FixAcquirer::new(backend.clone()));

        backend.set_delegate(Arc::new(EventRouter {
            gate: Arc::downgrade(&gate),
            acquirer: Arc::downgrade(&acquirer),
        }));

        Self { gate, acquirer }
    }

    /// The authorization gate.
    #[must_use]
    pub fn gate(&self) -> &AuthorizationGate {
        &self.gate
    }

    /// The fix acquirer.
    #[must_use]
    pub fn acquirer(&self) -> &FixAcquirer {
        &self.acquirer
    }

    /// Startup authorization check; see [`AuthorizationGate::prepare`].
    pub async fn prepare(&self, grace: Duration) -> AuthorizationStatus {
        self.gate.prepare(grace).await
    }

    /// Starts continuous sampling regardless of the current authorization.
    ///
    /// Until access is granted the platform simply delivers nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses to start updates.
    pub fn start_continuous(&self) -> LocationResult<()> {
        self.gate.mark_sampling();
        self.acquirer.start_continuous()
    }

    /// The most recently delivered fix, if any.
    #[must_use]
    pub fn last_fix(&self) -> Option<Fix> {
        self.acquirer.last_fix()
    }

    /// Requests one fix; see [`FixAcquirer::acquire_once`].
    pub async fn acquire_once(&self, timeout: Duration) -> Option<Fix> {
        self.acquirer.acquire_once(timeout).await
    }
}
