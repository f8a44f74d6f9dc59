//! Typed configuration for Courier servers.
//!
//! - TOML and JSON files, strict about unknown fields
//! - `COURIER__SECTION__KEY` environment overrides, optionally from `.env`
//! - validation of addresses, the upgrade path and size limits
//!
//! # Example
//!
//! ```no_run
//! use courier_config::ConfigLoader;
//!
//! # fn main() -> Result<(), courier_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_file("courier.toml")?
//!     .with_default_env()
//!     .load()?;
//! # Ok(())
//! # }
//! ```
//!
//! # File format
//!
//! ```toml
//! [server]
//! bind_addr = "0.0.0.0:3000"
//! path = "/"
//! shutdown_timeout_secs = 30
//! max_message_size = 67108864
//!
//! [telemetry]
//! service_name = "chat"
//!
//! [telemetry.logging]
//! enabled = true
//! level = "info"
//! format = "json"
//!
//! [telemetry.metrics]
//! enabled = true
//! addr = "0.0.0.0:9090"
//! ```

#![doc(html_root_url = "https://docs.rs/courier-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::CourierConfig;
pub use error::ConfigError;
pub use loader::{ConfigLoader, DEFAULT_ENV_PREFIX};
pub use schema::{LogFormat, LoggingSection, MetricsSection, ServerSection, TelemetrySection};
