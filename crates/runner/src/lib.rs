//! wst Runner
//!
//! Executes declarative integration test specs. A spec names servers, which
//! may extend one another, and instances, which run ordered actions against
//! services of those servers.
//!
//! # Architecture
//!
//! ```text
//! Spec ──► ServersMaker ──► Servers (resolved extends chains)
//!   │
//!   └──► Instance ──► ActionMaker ──► [Action]
//!                          │             ├── OutputAction   (scans live or captured output)
//!                          │             ├── ResponseAction (captured response)
//!                          │             ├── MetricsAction  (captured metrics)
//!                          │             └── CustomAction   (server-declared expectation)
//!                          └── SequentialExpander (splices server sequential actions)
//! ```
//!
//! Services are provided by a [`ServiceEnvironment`]; actions read data
//! captured earlier in the run from the [`wst_common::RunData`] blackboard.

pub mod actions;
pub mod error;
pub mod expectations;
pub mod instances;
pub mod matcher;
pub mod scanner;
pub mod servers;
pub mod services;
pub mod spec;

#[cfg(test)]
mod testing;

pub use actions::{Action, ActionMaker, OnFailure, When};
pub use error::{Error, Result};
pub use expectations::{ExpectationKind, ExpectationsMaker};
pub use instances::{ActionOutcome, ActionStatus, Instance, InstanceResult};
pub use scanner::{ActionContext, OutputScanner, ScanError};
pub use servers::{Server, ServerKey, Servers, ServersMaker};
pub use services::{
    DeclaredService, Service, ServiceDefinition, ServiceEnvironment, ServiceLocator,
    StaticServiceLocator,
};
pub use spec::{RunSummary, Spec};
