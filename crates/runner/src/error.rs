//! Error types for action construction and execution

use thiserror::Error;

use crate::scanner::ScanError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid {field} value: {value}")]
    InvalidValue { field: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Service {0} not found")]
    ServiceNotFound(String),

    #[error("Service {0} is not running")]
    ServiceNotRunning(String),

    #[error("Expectation {name} not found on server {server}")]
    ExpectationNotFound { name: String, server: String },

    #[error("No expectation set for {0}")]
    ExpectationNotSet(String),

    #[error("Multiple expectations set for {0}")]
    MultipleExpectations(String),

    #[error("Sequential action {name} not found on server {server}")]
    SequentialNotFound { name: String, server: String },

    #[error("Circular sequential action {0}")]
    CircularSequential(String),

    #[error("Server {0} not found")]
    ServerNotFound(String),

    #[error("Duplicate server {0}")]
    DuplicateServer(String),

    #[error("Parent {parent} not found for server {child}")]
    ParentNotFound { parent: String, child: String },

    #[error("Circular inheritance detected for server {0}")]
    CircularInheritance(String),

    #[error("Sandbox {child} cannot inherit from sandbox {parent}")]
    SandboxInherit { child: String, parent: String },

    #[error("User lookup failed: {0}")]
    UserLookup(String),

    #[error("{kind} data not found for {key}")]
    DataNotFound { kind: &'static str, key: String },

    #[error("Invalid {kind} data type for {key}: found {found}")]
    InvalidDataType {
        kind: &'static str,
        key: String,
        found: &'static str,
    },

    #[error("Timeout must be positive for action on service {0}")]
    InvalidTimeout(String),

    #[error("Metrics expectation {id} failed: {source}")]
    MetricsCheck {
        id: String,
        #[source]
        source: wst_common::Error,
    },

    #[error("Template rendering failed: {0}")]
    Template(String),

    #[error("Invalid regular expression: {0}")]
    Regex(#[from] regex::Error),

    #[error("Output scan failed: {0}")]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Common(#[from] wst_common::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
