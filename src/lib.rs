//! # Metrika Bridge
//!
//! Typed query construction and retrying transport for the Yandex Metrica
//! management and reporting APIs.
//!
//! Every report is described by a [`ReportRequest`], validated and turned
//! into a single [`BuiltUrl`] by the [`QueryBuilder`], then executed by the
//! [`MetrikaClient`] with a bounded, linear-backoff retry policy.
//!
//! ## Features
//!
//! - **Fail-fast validation**: counter ids, calendar dates, metric and
//!   dimension bounds are checked before any network activity
//! - **Attribution in dimension names**: attribution models are encoded into
//!   each dimension (`ym:s:lastUTMCampaign`), never sent as a separate parameter
//! - **Conservative retries**: only timeouts and HTTP 500/502/503 are retried
//! - **Operation table**: every report is reachable by name with a parameter schema
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use metrika_bridge::{Config, MetrikaClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = MetrikaClient::new(&Config::new("oauth-token"))?;
//!     let report = client
//!         .call(
//!             "get_data_by_time",
//!             serde_json::json!({
//!                 "counter_id": "44147844",
//!                 "metrics": ["ym:s:visits"],
//!                 "dimensions": ["ym:s:UTMCampaign"],
//!                 "attribution": "last",
//!                 "group": "week"
//!             }),
//!         )
//!         .await?;
//!     println!("{report}");
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! The CLI reads configuration from:
//! - Command-line arguments
//! - Environment variables (prefixed with `METRIKA_`)
//! - A JSON configuration file
//!
//! See [`Config`] and [`ClientConfig`] for all available options.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod attribution;
pub mod client;
pub mod config;
pub mod error;
pub mod operations;
pub mod params;
pub mod query;
pub mod validate;

// Re-exports for convenience
pub use attribution::{rewrite_dimension, rewrite_dimensions, Attribution};
pub use client::MetrikaClient;
pub use config::{Args, ClientConfig, Command, Config};
pub use error::{MetrikaError, Result};
pub use operations::{OperationSpec, ParamKind, ParamSpec, OPERATIONS};
pub use params::{
    CounterParams, DateRangeParams, EcommerceParams, GoalsParams, PageDepthParams,
    PagePerformanceParams, RegionalParams, ReportParams, TimeSeriesParams,
};
pub use query::{BuiltUrl, ContentReport, Filter, QueryBuilder, ReportRequest, Surface};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
