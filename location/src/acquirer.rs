use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, info, warn};

use crate::{Fix, LocationBackend, LocationError, LocationResult, Rendezvous};

/// Why [`FixAcquirer::acquire_once_detailed`] produced no fix.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AcquireError {
    /// Neither a fix nor a failure arrived in time.
    #[error("timed out waiting for a location fix")]
    Timeout,
    /// The platform reported a failure.
    #[error("location request failed: {0}")]
    Failed(#[from] LocationError),
}

/// Bridges callback-driven location delivery into polled and bounded reads.
pub struct FixAcquirer {
    backend: Arc<dyn LocationBackend>,
    last: Mutex<Option<Fix>>,
    pending: Rendezvous<LocationResult<Fix>>,
    continuous: AtomicBool,
}

impl fmt::Debug for FixAcquirer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixAcquirer")
            .field("last", &self.last_fix())
            .field("pending", &self.pending)
            .field("continuous", &self.continuous.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl FixAcquirer {
    /// Creates an acquirer issuing requests to `backend`.
    ///
    /// The backend's delegate must route updates and failures to
    /// [`handle_update`](Self::handle_update) and
    /// [`handle_failure`](Self::handle_failure).
    pub fn new(backend: Arc<dyn LocationBackend>) -> Self {
        Self {
            backend,
            last: Mutex::new(None),
            pending: Rendezvous::new(),
            continuous: AtomicBool::new(false),
        }
    }

    /// Starts continuous updates. Calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses to start updates.
    pub fn start_continuous(&self) -> LocationResult<()> {
        if self.continuous.swap(true, Ordering::SeqCst) {
            debug!("continuous location updates already running");
            return Ok(());
        }

        info!("starting location updates");
        self.backend.start_updates().inspect_err(|_| {
            self.continuous.store(false, Ordering::SeqCst);
        })
    }

    /// Whether continuous updates were started.
    #[must_use]
    pub fn is_continuous(&self) -> bool {
        self.continuous.load(Ordering::SeqCst)
    }

    /// The most recently delivered fix, if any.
    #[must_use]
    pub fn last_fix(&self) -> Option<Fix> {
        self.last.lock().expect("last fix mutex poisoned").clone()
    }

    /// Requests one fresh fix and waits at most `timeout` for it.
    ///
    /// Timing out does not cancel the platform request; a late fix still
    /// becomes the [`last_fix`](Self::last_fix).
    pub async fn acquire_once(&self, timeout: Duration) -> Option<Fix> {
        self.acquire_once_detailed(timeout).await.ok()
    }

    /// Like [`acquire_once`](Self::acquire_once) but reports why no fix came.
    ///
    /// # Errors
    ///
    /// Returns [`AcquireError::Timeout`] when nothing arrived in time, or
    /// [`AcquireError::Failed`] with the platform's reason.
    pub async fn acquire_once_detailed(&self, timeout: Duration) -> Result<Fix, AcquireError> {
        let waiter = self.pending.arm();

        if let Err(err) = self.backend.request_location() {
            warn!("could not request a location fix: {err}");
            return Err(AcquireError::Failed(err));
        }

        match waiter.wait(timeout).await {
            Some(Ok(fix)) => Ok(fix),
            Some(Err(err)) => Err(AcquireError::Failed(err)),
            None => {
                warn!("location request timed out after {:?}", timeout);
                Err(AcquireError::Timeout)
            }
        }
    }

    /// Stores a delivered fix and wakes a pending [`acquire_once`](Self::acquire_once).
    pub fn handle_update(&self, fix: Fix) {
        debug!(
            "location: {}, {} (accuracy: {}m)",
            fix.latitude, fix.longitude, fix.horizontal_accuracy
        );
        {
            let mut last = self.last.lock().expect("last fix mutex poisoned");
            *last = Some(fix.clone());
        }
        self.pending.release(Ok(fix));
    }

    /// Logs a delivered failure and wakes a pending [`acquire_once`](Self::acquire_once).
    pub fn handle_failure(&self, error: LocationError) {
        match &error {
            LocationError::Denied => warn!(
                "location access denied; enable it in System Settings > Privacy & Security > Location Services"
            ),
            LocationError::LocationUnknown => warn!("location unknown; will try again"),
            other => warn!("location error: {other}"),
        }
        self.pending.release(Err(error));
    }
}
