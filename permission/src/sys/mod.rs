//! Platform-specific authorization implementations.

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "linux")]
pub use linux::SystemAuthorization;

// Fallback for platforms without a system authorization model
#[cfg(not(target_os = "linux"))]
mod fallback {
    use log::warn;

    use crate::{AuthorizationLevel, AuthorizationProvider, AuthorizationStatus};

    /// Authorization provider for platforms without a supported backend.
    ///
    /// Always reports [`AuthorizationStatus::NotDetermined`]; prompts are logged
    /// and dropped.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct SystemAuthorization;

    impl AuthorizationProvider for SystemAuthorization {
        fn authorization_status(&self) -> AuthorizationStatus {
            AuthorizationStatus::NotDetermined
        }

        fn request_authorization(&self, level: AuthorizationLevel) {
            warn!("cannot prompt for {level:?} location authorization on this platform");
        }
    }
}

#[cfg(not(target_os = "linux"))]
pub use fallback::SystemAuthorization;
