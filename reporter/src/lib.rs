//! Periodic location reporting.
//!
//! [`Reporter`] reads fixes from a [`LocationManager`] and posts them as JSON
//! to a collector through a [`Transport`]. It runs either once or forever on a
//! fixed cadence driven by a [`Ticker`].
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use trackkit_location::{LocationManager, sys};
//! use trackkit_reporter::{HttpTransport, IntervalTicker, Reporter, ReporterConfig};
//!
//! let config = ReporterConfig::default();
//! let backend = sys::platform_backend(config.update_interval);
//! let location = LocationManager::new(backend, config.authorization_level);
//! let reporter = Reporter::new(config, location, Arc::new(HttpTransport::new()?));
//!
//! reporter.start_sampling().await;
//! reporter.run_daemon(&mut IntervalTicker::new(reporter.config().interval)).await;
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod payload;
mod reporter;
mod ticker;
mod transport;

pub use config::{ConfigError, DEFAULT_ENDPOINT, ReporterConfig};
pub use error::ReportError;
pub use payload::ReportPayload;
pub use reporter::{DaemonStats, ReportOutcome, Reporter};
pub use ticker::{CountedTicker, IntervalTicker, Ticker};
pub use transport::{HttpResponse, HttpTransport, Transport, TransportError};

pub use trackkit_location::LocationManager;
