use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use trackkit_location::{AuthorizationStatus, Fix, LocationManager};

use crate::{ReportError, ReportPayload, ReporterConfig, Ticker, Transport};

const JSON_HEADERS: [(&str, &str); 1] = [("Content-Type", "application/json")];

/// Result of one send, used for logging and exit status.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReportOutcome {
    /// Status code, if the collector answered.
    pub http_status: Option<u16>,
    /// The collector's `blocked` flag, if its reply carried one.
    pub blocked: Option<bool>,
    /// Why the report did not succeed.
    pub failure: Option<ReportError>,
}

impl ReportOutcome {
    fn failed(error: ReportError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    /// Whether the collector accepted the report with a 2xx status.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.failure.is_none()
    }

    /// Whether the collector flagged the device as being at a blocked location.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.blocked == Some(true)
    }

    /// Converts into a result for single-shot callers.
    ///
    /// # Errors
    ///
    /// Returns the recorded failure, if any.
    pub fn into_result(self) -> Result<Self, ReportError> {
        match self.failure {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }
}

/// Per-iteration counters from [`Reporter::run_daemon`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DaemonStats {
    /// Loop iterations run.
    pub iterations: usize,
    /// Reports accepted by the collector.
    pub reported: usize,
    /// Reports that failed for any reason.
    pub failed: usize,
    /// Reports flagged as blocked.
    pub blocked: usize,
    /// Iterations skipped because no fix had arrived yet.
    pub waiting: usize,
}

impl DaemonStats {
    fn record(&mut self, outcome: &ReportOutcome) {
        if outcome.success() {
            self.reported += 1;
        } else {
            self.failed += 1;
        }
        if outcome.is_blocked() {
            self.blocked += 1;
        }
    }
}

/// Acquires fixes and reports them to the collector.
pub struct Reporter {
    config: ReporterConfig,
    location: LocationManager,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter")
            .field("config", &self.config)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

impl Reporter {
    /// Creates a reporter.
    pub fn new(
        config: ReporterConfig,
        location: LocationManager,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            config,
            location,
            transport,
        }
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &ReporterConfig {
        &self.config
    }

    /// The location manager fixes are read from.
    #[must_use]
    pub const fn location(&self) -> &LocationManager {
        &self.location
    }

    /// Startup for daemon mode: settles authorization, then starts continuous
    /// sampling whatever the outcome.
    pub async fn start_sampling(&self) -> AuthorizationStatus {
        let status = self.location.prepare(self.config.authorization_grace).await;
        if let Err(err) = self.location.start_continuous() {
            error!("failed to start location updates: {err}");
        }
        status
    }

    /// Startup for single-shot modes.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::AuthorizationDenied`] if access is denied or
    /// restricted.
    pub async fn ensure_authorized(&self) -> Result<AuthorizationStatus, ReportError> {
        let status = self.location.prepare(self.config.authorization_grace).await;
        if status.is_refused() {
            return Err(ReportError::AuthorizationDenied(status));
        }
        Ok(status)
    }

    /// Requests one fix, waiting at most `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::AcquisitionTimeout`] or
    /// [`ReportError::AcquisitionFailed`].
    pub async fn acquire(&self, timeout: Duration) -> Result<Fix, ReportError> {
        Ok(self
            .location
            .acquirer()
            .acquire_once_detailed(timeout)
            .await?)
    }

    /// The payload that would be sent for `fix`.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Serialization`] if `fix` holds values that
    /// cannot be reported.
    pub fn payload(&self, fix: &Fix) -> Result<ReportPayload, ReportError> {
        ReportPayload::try_new(fix, &self.config.device_id, self.config.source.as_deref())
    }

    /// Reports `fix` and logs the outcome. Never fails; failures are recorded
    /// in the returned outcome.
    pub async fn send(&self, fix: &Fix) -> ReportOutcome {
        let outcome = self.try_send(fix).await.unwrap_or_else(ReportOutcome::failed);

        match &outcome.failure {
            None if outcome.is_blocked() => {
                warn!("at blocked location (status {:?})", outcome.http_status);
            }
            None => info!(
                "location reported (lat: {:.4}, lng: {:.4}), status: {:?}",
                fix.latitude, fix.longitude, outcome.http_status
            ),
            Some(err) => {
                if outcome.is_blocked() {
                    warn!("at blocked location (status {:?})", outcome.http_status);
                }
                error!("{err}");
            }
        }

        outcome
    }

    async fn try_send(&self, fix: &Fix) -> Result<ReportOutcome, ReportError> {
        let url = self.config.endpoint_url()?;
        let body = serde_json::to_vec(&self.payload(fix)?)?;

        let request = self
            .transport
            .post(&url, body, &JSON_HEADERS, self.config.request_timeout);
        let response = tokio::time::timeout(self.config.send_timeout, request)
            .await
            .map_err(|_| ReportError::SendTimeout)??;

        let blocked = blocked_flag(&response.body);
        let failure = (!(200..300).contains(&response.status)).then_some(
            ReportError::RemoteRejected {
                status: response.status,
            },
        );

        Ok(ReportOutcome {
            http_status: Some(response.status),
            blocked,
            failure,
        })
    }

    /// Acquires one fix and reports it.
    ///
    /// # Errors
    ///
    /// Returns the acquisition error, or the send's failure.
    pub async fn run_once(&self, timeout: Duration) -> Result<ReportOutcome, ReportError> {
        let fix = self.acquire(timeout).await?;
        self.send(&fix).await.into_result()
    }

    /// Reports the latest fix on every tick until the ticker stops.
    ///
    /// Failures are logged and never end the loop.
    pub async fn run_daemon(&self, ticker: &mut dyn Ticker) -> DaemonStats {
        let mut stats = DaemonStats::default();

        while ticker.tick().await {
            stats.iterations += 1;
            match self.location.last_fix() {
                Some(fix) => {
                    let outcome = self.send(&fix).await;
                    stats.record(&outcome);
                }
                None => {
                    info!("waiting for location fix...");
                    stats.waiting += 1;
                }
            }
        }

        stats
    }
}

/// Reads `{"blocked": bool}` from a collector reply.
fn blocked_flag(body: &[u8]) -> Option<bool> {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()?
        .get("blocked")?
        .as_bool()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocked_flag_parsing() {
        assert_eq!(blocked_flag(br#"{"blocked": true}"#), Some(true));
        assert_eq!(blocked_flag(br#"{"blocked": false, "zone": "x"}"#), Some(false));
        assert_eq!(blocked_flag(br#"{"ok": 1}"#), None);
        assert_eq!(blocked_flag(br#"{"blocked": "yes"}"#), None);
        assert_eq!(blocked_flag(b"<html>"), None);
        assert_eq!(blocked_flag(b""), None);
    }

    #[test]
    fn outcome_results() {
        let ok = ReportOutcome {
            http_status: Some(201),
            ..ReportOutcome::default()
        };
        assert!(ok.success());
        assert!(ok.into_result().is_ok());

        let rejected = ReportOutcome::failed(ReportError::RemoteRejected { status: 500 });
        assert_eq!(
            rejected.into_result(),
            Err(ReportError::RemoteRejected { status: 500 })
        );
    }
}
