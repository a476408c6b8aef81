use std::time::Duration;

use log::warn;
use reqwest::Url;
use trackkit_permission::AuthorizationLevel;

use crate::ReportError;

/// Collector used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8080/api/device-location";

/// Errors in reporter configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The device identifier is empty.
    #[error("device id must not be empty")]
    EmptyDeviceId,
    /// A timeout that bounds a wait is zero.
    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),
    /// The send wait is shorter than the request timeout it bounds.
    #[error("send timeout ({send:?}) is shorter than the request timeout ({request:?})")]
    SendShorterThanRequest {
        /// Configured send timeout.
        send: Duration,
        /// Configured request timeout.
        request: Duration,
    },
}

/// Settings fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReporterConfig {
    /// Collector URL the report is POSTed to.
    pub endpoint: String,
    /// Opaque identifier sent with every report.
    pub device_id: String,
    /// Pause between daemon iterations. Zero runs iterations back to back.
    pub interval: Duration,
    /// Timeout handed to the HTTP client for one request.
    pub request_timeout: Duration,
    /// Upper bound on how long a send blocks its caller.
    pub send_timeout: Duration,
    /// Upper bound on waiting for a single fix.
    pub acquisition_timeout: Duration,
    /// Which grant to ask for when the status is undetermined.
    pub authorization_level: AuthorizationLevel,
    /// How long to wait for the user after prompting at startup.
    pub authorization_grace: Duration,
    /// Optional agent tag added to the payload.
    pub source: Option<String>,
    /// Minimum time between platform location updates.
    pub update_interval: Duration,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            device_id: "trackkit".to_string(),
            interval: Duration::from_secs(60),
            request_timeout: Duration::from_secs(10),
            send_timeout: Duration::from_secs(15),
            acquisition_timeout: Duration::from_secs(30),
            authorization_level: AuthorizationLevel::WhenInUse,
            authorization_grace: Duration::from_secs(5),
            source: None,
            update_interval: Duration::from_secs(10),
        }
    }
}

impl ReporterConfig {
    /// Checks the settings that cannot be fixed at send time.
    ///
    /// The endpoint is not checked here; a bad endpoint fails each send.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device_id.trim().is_empty() {
            return Err(ConfigError::EmptyDeviceId);
        }

        for (name, value) in [
            ("request timeout", self.request_timeout),
            ("send timeout", self.send_timeout),
            ("acquisition timeout", self.acquisition_timeout),
            ("update interval", self.update_interval),
        ] {
            if value.is_zero() {
                return Err(ConfigError::ZeroTimeout(name));
            }
        }

        if self.send_timeout < self.request_timeout {
            return Err(ConfigError::SendShorterThanRequest {
                send: self.send_timeout,
                request: self.request_timeout,
            });
        }

        if !self.interval.is_zero() && self.request_timeout >= self.interval {
            warn!(
                "request timeout ({:?}) is not shorter than the report interval ({:?})",
                self.request_timeout, self.interval
            );
        }

        Ok(())
    }

    /// Parses the endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::InvalidEndpoint`] unless it is an absolute
    /// `http` or `https` URL.
    pub fn endpoint_url(&self) -> Result<Url, ReportError> {
        let invalid = |reason: String| ReportError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            reason,
        };

        let url = Url::parse(&self.endpoint).map_err(|e| invalid(e.to_string()))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(invalid(format!("unsupported scheme `{other}`"))),
        }
    }
}
