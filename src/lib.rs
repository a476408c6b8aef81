//! # Trackkit
//!
//! Periodic device location sampling and reporting to a remote collector.
//!
//! Trackkit is split into small crates so that an embedder can pick only the
//! layers it needs.
//!
//! ## Features
//!
//! - `permission`: Location authorization tracking and the startup prompt.
//! - `location`: Fix acquisition on top of a platform location backend.
//! - `reporter`: The report loop, payload encoding and HTTP transport.
//!
//! Use the `full` feature to enable everything.
//!
//! ## Example
//!
//! ```toml
//! [dependencies]
//! trackkit = { version = "0.1", features = ["location"] }
//! ```
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use trackkit::location::LocationManager;
//!
//! async fn print_fix(manager: &LocationManager) {
//!     if let Some(fix) = manager.acquirer().acquire_once(Duration::from_secs(30)).await {
//!         println!("Latitude: {}, Longitude: {}", fix.latitude, fix.longitude);
//!     }
//! }
//! ```

#[cfg(feature = "location")]
pub use trackkit_location as location;

#[cfg(feature = "permission")]
pub use trackkit_permission as permission;

#[cfg(feature = "reporter")]
pub use trackkit_reporter as reporter;
