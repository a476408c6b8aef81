//! Platform-specific location backends.

use std::sync::Arc;
use std::time::Duration;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "linux")]
pub use linux::GeoClueBackend;

/// The backend used on the current platform.
#[cfg(target_os = "linux")]
pub type PlatformBackend = GeoClueBackend;

/// The backend used on the current platform.
#[cfg(not(target_os = "linux"))]
pub type PlatformBackend = UnsupportedBackend;

/// Creates the current platform's backend.
///
/// `update_interval` is the minimum time between platform updates.
#[must_use]
pub fn platform_backend(update_interval: Duration) -> Arc<PlatformBackend> {
    Arc::new(PlatformBackend::new(update_interval))
}

#[cfg(not(target_os = "linux"))]
pub use fallback::UnsupportedBackend;

// Fallback for platforms without a location backend
#[cfg(not(target_os = "linux"))]
mod fallback {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use trackkit_permission::SystemAuthorization;

    use crate::{
        AuthorizationLevel, AuthorizationProvider, AuthorizationStatus, LocationBackend,
        LocationDelegate, LocationError, LocationEvent, LocationResult,
    };

    /// Backend that fails every request with [`LocationError::NotAvailable`].
    #[derive(Default)]
    pub struct UnsupportedBackend {
        delegate: Mutex<Option<Arc<dyn LocationDelegate>>>,
    }

    impl std::fmt::Debug for UnsupportedBackend {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("UnsupportedBackend").finish()
        }
    }

    impl UnsupportedBackend {
        /// Creates the backend. The update interval is unused.
        #[must_use]
        pub fn new(_update_interval: Duration) -> Self {
            Self::default()
        }

        fn fail(&self) -> LocationResult<()> {
            let delegate = self
                .delegate
                .lock()
                .expect("delegate mutex poisoned")
                .clone()
                .ok_or(LocationError::DelegateMissing)?;
            delegate.on_event(LocationEvent::Failure {
                error: LocationError::NotAvailable,
            });
            Ok(())
        }
    }

    impl AuthorizationProvider for UnsupportedBackend {
        fn authorization_status(&self) -> AuthorizationStatus {
            SystemAuthorization.authorization_status()
        }

        fn request_authorization(&self, level: AuthorizationLevel) {
            SystemAuthorization.request_authorization(level);
        }
    }

    impl LocationBackend for UnsupportedBackend {
        fn set_delegate(&self, delegate: Arc<dyn LocationDelegate>) {
            *self.delegate.lock().expect("delegate mutex poisoned") = Some(delegate);
        }

        fn request_location(&self) -> LocationResult<()> {
            self.fail()
        }

        fn start_updates(&self) -> LocationResult<()> {
            self.fail()
        }
    }
}
