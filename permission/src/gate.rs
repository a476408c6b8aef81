use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use log::{info, warn};

use crate::{AuthorizationLevel, AuthorizationProvider, AuthorizationStatus};

const OPERATOR_HINT: &str =
    "enable location access in System Settings > Privacy & Security > Location Services";

/// What the gate decided after observing a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// A permission prompt was issued.
    Requested,
    /// Access is refused until the operator changes system settings.
    AwaitingOperator,
    /// Access was granted and continuous sampling should start now.
    StartSampling,
    /// Access was granted but sampling is already running.
    AlreadySampling,
    /// The status was not recognized; nothing was done.
    Ignored,
}

/// Tracks location authorization and drives (re-)requesting it.
pub struct AuthorizationGate {
    provider: Arc<dyn AuthorizationProvider>,
    level: AuthorizationLevel,
    prompts: AtomicUsize,
    sampling: AtomicBool,
}

impl fmt::Debug for AuthorizationGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationGate")
            .field("level", &self.level)
            .field("prompts", &self.prompts.load(Ordering::Relaxed))
            .field("sampling", &self.sampling.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl AuthorizationGate {
    /// Creates a gate that asks `provider` for `level` access.
    pub fn new(provider: Arc<dyn AuthorizationProvider>, level: AuthorizationLevel) -> Self {
        Self {
            provider,
            level,
            prompts: AtomicUsize::new(0),
            sampling: AtomicBool::new(false),
        }
    }

    /// The level this gate asks for.
    #[must_use]
    pub const fn level(&self) -> AuthorizationLevel {
        self.level
    }

    /// Reads the platform-reported status.
    #[must_use]
    pub fn current_status(&self) -> AuthorizationStatus {
        self.provider.authorization_status()
    }

    /// Issues an asynchronous permission prompt. Does not wait for the answer.
    pub fn request_authorization(&self) {
        info!("requesting {:?} location authorization", self.level);
        self.prompts.fetch_add(1, Ordering::SeqCst);
        self.provider.request_authorization(self.level);
    }

    /// Number of prompts issued through this gate.
    #[must_use]
    pub fn prompts_issued(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }

    /// Whether continuous sampling has been enabled.
    #[must_use]
    pub fn is_sampling(&self) -> bool {
        self.sampling.load(Ordering::SeqCst)
    }

    /// Records that sampling was started outside of a status transition.
    pub fn mark_sampling(&self) {
        self.sampling.store(true, Ordering::SeqCst);
    }

    /// Handles a platform authorization change.
    pub fn on_status_changed(&self, status: AuthorizationStatus) -> GateDecision {
        info!("authorization status changed: {status}");
        match status {
            AuthorizationStatus::NotDetermined => {
                self.request_authorization();
                GateDecision::Requested
            }
            AuthorizationStatus::Restricted => {
                warn!("location services are restricted; {OPERATOR_HINT}");
                GateDecision::AwaitingOperator
            }
            AuthorizationStatus::Denied => {
                warn!("location access denied; {OPERATOR_HINT}");
                GateDecision::AwaitingOperator
            }
            AuthorizationStatus::AuthorizedAlways | AuthorizationStatus::AuthorizedWhenInUse => {
                if self.sampling.swap(true, Ordering::SeqCst) {
                    GateDecision::AlreadySampling
                } else {
                    GateDecision::StartSampling
                }
            }
            AuthorizationStatus::Unknown => {
                warn!("unrecognized authorization status; ignoring");
                GateDecision::Ignored
            }
        }
    }

    /// Startup check.
    ///
    /// When the status is undetermined, prompts once and waits `grace` for the
    /// user to answer. Proceeds regardless of the answer and returns whatever
    /// status the platform reports afterwards.
    pub async fn prepare(&self, grace: Duration) -> AuthorizationStatus {
        let status = self.current_status();
        info!("initial authorization status: {status}");
        if status != AuthorizationStatus::NotDetermined {
            return status;
        }

        self.request_authorization();
        info!(
            "waiting {}s for the location permission prompt",
            grace.as_secs_f32()
        );
        tokio::time::sleep(grace).await;
        self.current_status()
    }
}
