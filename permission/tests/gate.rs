use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use trackkit_permission::{
    AuthorizationGate, AuthorizationLevel, AuthorizationProvider, AuthorizationStatus,
    GateDecision,
};

/// Provider whose status is set by the test and which counts prompts.
#[derive(Default)]
struct Recording {
    status: Mutex<Option<AuthorizationStatus>>,
    requests: AtomicUsize,
    last_level: Mutex<Option<AuthorizationLevel>>,
    grant_on_request: bool,
}

impl Recording {
    fn with_status(status: AuthorizationStatus) -> Self {
        Self {
            status: Mutex::new(Some(status)),
            ..Self::default()
        }
    }

    fn set(&self, status: AuthorizationStatus) {
        *self.status.lock().unwrap() = Some(status);
    }

    fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl AuthorizationProvider for Recording {
    fn authorization_status(&self) -> AuthorizationStatus {
        self.status
            .lock()
            .unwrap()
            .unwrap_or(AuthorizationStatus::NotDetermined)
    }

    fn request_authorization(&self, level: AuthorizationLevel) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        *self.last_level.lock().unwrap() = Some(level);
        if self.grant_on_request {
            self.set(AuthorizationStatus::AuthorizedWhenInUse);
        }
    }
}

#[test]
fn not_determined_then_denied_prompts_once() {
    let provider = Arc::new(Recording::with_status(AuthorizationStatus::NotDetermined));
    let gate = AuthorizationGate::new(provider.clone(), AuthorizationLevel::Always);

    assert_eq!(
        gate.on_status_changed(AuthorizationStatus::NotDetermined),
        GateDecision::Requested
    );
    provider.set(AuthorizationStatus::Denied);
    assert_eq!(
        gate.on_status_changed(AuthorizationStatus::Denied),
        GateDecision::AwaitingOperator
    );
    // Repeated refusals never trigger another prompt
    assert_eq!(
        gate.on_status_changed(AuthorizationStatus::Denied),
        GateDecision::AwaitingOperator
    );

    assert_eq!(provider.requests(), 1);
    assert_eq!(gate.prompts_issued(), 1);
    assert_eq!(
        *provider.last_level.lock().unwrap(),
        Some(AuthorizationLevel::Always)
    );
    assert!(!gate.is_sampling());
}

#[test]
fn restricted_takes_no_action() {
    let provider = Arc::new(Recording::with_status(AuthorizationStatus::Restricted));
    let gate = AuthorizationGate::new(provider.clone(), AuthorizationLevel::WhenInUse);

    assert_eq!(
        gate.on_status_changed(AuthorizationStatus::Restricted),
        GateDecision::AwaitingOperator
    );
    assert_eq!(provider.requests(), 0);
}

#[test]
fn current_status_has_no_side_effects() {
    let provider = Arc::new(Recording::with_status(AuthorizationStatus::NotDetermined));
    let gate = AuthorizationGate::new(provider.clone(), AuthorizationLevel::WhenInUse);

    assert_eq!(gate.current_status(), AuthorizationStatus::NotDetermined);
    assert_eq!(gate.current_status(), AuthorizationStatus::NotDetermined);
    assert_eq!(provider.requests(), 0);
}

#[tokio::test(start_paused = true)]
async fn prepare_prompts_and_waits_the_grace_period() {
    let provider = Arc::new(Recording {
        grant_on_request: true,
        ..Recording::with_status(AuthorizationStatus::NotDetermined)
    });
    let gate = AuthorizationGate::new(provider.clone(), AuthorizationLevel::WhenInUse);

    let start = tokio::time::Instant::now();
    let status = gate.prepare(Duration::from_secs(5)).await;

    assert_eq!(status, AuthorizationStatus::AuthorizedWhenInUse);
    assert!(start.elapsed() >= Duration::from_secs(5));
    assert_eq!(provider.requests(), 1);
}

#[tokio::test(start_paused = true)]
async fn prepare_proceeds_without_an_answer() {
    let provider = Arc::new(Recording::with_status(AuthorizationStatus::NotDetermined));
    let gate = AuthorizationGate::new(provider.clone(), AuthorizationLevel::WhenInUse);

    let status = gate.prepare(Duration::from_secs(3)).await;

    assert_eq!(status, AuthorizationStatus::NotDetermined);
    assert_eq!(provider.requests(), 1);
}

#[tokio::test(start_paused = true)]
async fn prepare_skips_prompt_when_already_decided() {
    let provider = Arc::new(Recording::with_status(AuthorizationStatus::AuthorizedAlways));
    let gate = AuthorizationGate::new(provider.clone(), AuthorizationLevel::Always);

    let start = tokio::time::Instant::now();
    let status = gate.prepare(Duration::from_secs(5)).await;

    assert_eq!(status, AuthorizationStatus::AuthorizedAlways);
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(provider.requests(), 0);
}
