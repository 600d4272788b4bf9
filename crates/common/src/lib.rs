//! wst Common Library
//!
//! Value models and configuration types shared by the wst crates: typed
//! parameters, metrics, the per-instance runtime blackboard and the
//! declarative spec schema.

pub mod error;
pub mod foundation;
pub mod metrics;
pub mod parameters;
pub mod runtime;
pub mod types;

pub use error::{Error, Result};
pub use foundation::Foundation;
pub use metrics::{Metric, MetricOperator, MetricSet, MetricValue, Metrics};
pub use parameters::{Parameter, Parameters};
pub use runtime::{CommandOutput, OutputType, ResponseData, RunData, RuntimeValue};

/// wst version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Tag used for servers that do not declare one
pub const DEFAULT_SERVER_TAG: &str = "default";
