//! Linux authorization implementation.
//!
//! On Linux, location access is decided by the GeoClue2 agent and its
//! configuration (`/etc/geoclue/geoclue.conf`), not by a runtime prompt in the
//! requesting process. A client that can talk to GeoClue is authorized; a
//! refusal shows up later as a failed location request.

use log::debug;

use crate::{AuthorizationLevel, AuthorizationProvider, AuthorizationStatus};

/// Authorization provider backed by the system's location policy.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAuthorization;

impl AuthorizationProvider for SystemAuthorization {
    fn authorization_status(&self) -> AuthorizationStatus {
        AuthorizationStatus::AuthorizedAlways
    }

    fn request_authorization(&self, level: AuthorizationLevel) {
        // No runtime permission prompts on Linux; the GeoClue agent decides
        debug!("ignoring {level:?} authorization request; GeoClue handles access");
    }
}
