//! Scriptable in-process backend for tests and demos.
//!
//! [`MockBackend`] answers location requests from a queue of
//! [`MockResponse`]s and lets the caller push updates, failures and
//! authorization changes as if they came from the platform.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use chrono::Utc;
use log::debug;

use crate::{
    AuthorizationLevel, AuthorizationProvider, AuthorizationStatus, Fix, LocationBackend,
    LocationDelegate, LocationError, LocationEvent, LocationResult,
};

/// How the mock answers one location request.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Deliver this fix on the calling thread.
    Fix(Fix),
    /// Deliver this failure on the calling thread.
    Fail(LocationError),
    /// Never answer.
    Silent,
    /// Deliver the inner response from another thread after a delay.
    Delayed(Duration, Box<MockResponse>),
}

/// A [`LocationBackend`] driven entirely by the caller.
pub struct MockBackend {
    delegate: Mutex<Option<Arc<dyn LocationDelegate>>>,
    status: Mutex<AuthorizationStatus>,
    grant_on_request: Mutex<Option<AuthorizationStatus>>,
    responses: Mutex<VecDeque<MockResponse>>,
    fallback: Mutex<MockResponse>,
    location_requests: AtomicUsize,
    authorization_requests: AtomicUsize,
    update_starts: AtomicUsize,
}

impl fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockBackend")
            .field("status", &self.authorization_status())
            .field("location_requests", &self.location_requests())
            .field("authorization_requests", &self.authorization_requests())
            .finish_non_exhaustive()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new(AuthorizationStatus::AuthorizedAlways)
    }
}

impl MockBackend {
    /// Creates a mock in `status` that never answers location requests.
    #[must_use]
    pub fn new(status: AuthorizationStatus) -> Self {
        Self {
            delegate: Mutex::new(None),
            status: Mutex::new(status),
            grant_on_request: Mutex::new(None),
            responses: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(MockResponse::Silent),
            location_requests: AtomicUsize::new(0),
            authorization_requests: AtomicUsize::new(0),
            update_starts: AtomicUsize::new(0),
        }
    }

    /// Queues responses for the next location requests, in order.
    #[must_use]
    pub fn with_responses(self, responses: impl IntoIterator<Item = MockResponse>) -> Self {
        self.responses
            .lock()
            .expect("responses mutex poisoned")
            .extend(responses);
        self
    }

    /// Sets the response used once the queue is empty.
    #[must_use]
    pub fn with_fallback(self, response: MockResponse) -> Self {
        *self.fallback.lock().expect("fallback mutex poisoned") = response;
        self
    }

    /// Moves to `status` and notifies the delegate whenever a prompt is issued.
    #[must_use]
    pub fn granting(self, status: AuthorizationStatus) -> Self {
        *self.grant_on_request.lock().expect("grant mutex poisoned") = Some(status);
        self
    }

    /// Queues one more response.
    pub fn push_response(&self, response: MockResponse) {
        self.responses
            .lock()
            .expect("responses mutex poisoned")
            .push_back(response);
    }

    /// Delivers an update as the platform would.
    pub fn deliver_update(&self, fix: Fix) {
        self.dispatch(LocationEvent::Update { fix });
    }

    /// Delivers a failure as the platform would.
    pub fn deliver_failure(&self, error: LocationError) {
        self.dispatch(LocationEvent::Failure { error });
    }

    /// Changes the authorization state and notifies the delegate.
    pub fn change_authorization(&self, status: AuthorizationStatus) {
        *self.status.lock().expect("status mutex poisoned") = status;
        self.dispatch(LocationEvent::AuthorizationChanged { status });
    }

    /// Number of one-shot location requests received.
    #[must_use]
    pub fn location_requests(&self) -> usize {
        self.location_requests.load(Ordering::SeqCst)
    }

    /// Number of authorization prompts received.
    #[must_use]
    pub fn authorization_requests(&self) -> usize {
        self.authorization_requests.load(Ordering::SeqCst)
    }

    /// Number of times continuous updates were started.
    #[must_use]
    pub fn update_starts(&self) -> usize {
        self.update_starts.load(Ordering::SeqCst)
    }

    fn delegate(&self) -> Option<Arc<dyn LocationDelegate>> {
        self.delegate
            .lock()
            .expect("delegate mutex poisoned")
            .clone()
    }

    fn dispatch(&self, event: LocationEvent) {
        match self.delegate() {
            Some(delegate) => delegate.on_event(event),
            None => debug!("mock backend has no delegate; dropping {event:?}"),
        }
    }

    fn next_response(&self) -> MockResponse {
        self.responses
            .lock()
            .expect("responses mutex poisoned")
            .pop_front()
            .unwrap_or_else(|| self.fallback.lock().expect("fallback mutex poisoned").clone())
    }
}

fn answer(delegate: &Arc<dyn LocationDelegate>, response: MockResponse) {
    match response {
        MockResponse::Fix(fix) => delegate.on_event(LocationEvent::Update { fix }),
        MockResponse::Fail(error) => delegate.on_event(LocationEvent::Failure { error }),
        MockResponse::Silent => {}
        MockResponse::Delayed(delay, inner) => {
            let delegate = delegate.clone();
            thread::spawn(move || {
                thread::sleep(delay);
                answer(&delegate, *inner);
            });
        }
    }
}

impl AuthorizationProvider for MockBackend {
    fn authorization_status(&self) -> AuthorizationStatus {
        *self.status.lock().expect("status mutex poisoned")
    }

    fn request_authorization(&self, _level: AuthorizationLevel) {
        self.authorization_requests.fetch_add(1, Ordering::SeqCst);
        let grant = *self.grant_on_request.lock().expect("grant mutex poisoned");
        if let Some(status) = grant {
            self.change_authorization(status);
        }
    }
}

impl LocationBackend for MockBackend {
    fn set_delegate(&self, delegate: Arc<dyn LocationDelegate>) {
        *self.delegate.lock().expect("delegate mutex poisoned") = Some(delegate);
    }

    fn request_location(&self) -> LocationResult<()> {
        self.location_requests.fetch_add(1, Ordering::SeqCst);
        let delegate = self.delegate().ok_or(LocationError::DelegateMissing)?;
        answer(&delegate, self.next_response());
        Ok(())
    }

    fn start_updates(&self) -> LocationResult<()> {
        self.update_starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A fix at the given coordinates, sampled now, with 5 m accuracy.
#[must_use]
pub fn fix_at(latitude: f64, longitude: f64) -> Fix {
    Fix {
        latitude,
        longitude,
        horizontal_accuracy: 5.0,
        altitude: 0.0,
        sampled_at: Utc::now(),
    }
}
