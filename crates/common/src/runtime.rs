//! Per-instance runtime blackboard
//!
//! Request, command and metrics actions store what they captured under
//! string keys (`response/<id>`, `command/<name>`, `metrics/<id>`); the
//! expectation actions later load those entries and assert on them.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::io::Cursor;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

use crate::metrics::Metrics;

/// Output channel of a service or command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputType {
    Stdout,
    Stderr,
    Any,
}

impl OutputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputType::Stdout => "stdout",
            OutputType::Stderr => "stderr",
            OutputType::Any => "any",
        }
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn response_key(request: &str) -> String {
    format!("response/{}", request)
}

pub fn metrics_key(id: &str) -> String {
    format!("metrics/{}", id)
}

pub fn command_key(command: &str) -> String {
    format!("command/{}", command)
}

/// Captured response of a request action
#[derive(Debug, Clone, Default)]
pub struct ResponseData {
    pub status: u16,
    pub headers: HashMap<String, Vec<String>>,
    pub body: String,
}

impl ResponseData {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .entry(name.to_string())
            .or_default()
            .push(value.to_string());
        self
    }

    /// First value of a header; names compare case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }
}

/// Captured output of a finished command
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn new(stdout: impl Into<Vec<u8>>, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Reader over the requested channel; `Any` yields stdout then stderr.
    pub fn reader(&self, output_type: OutputType) -> Box<dyn AsyncRead + Send + Unpin> {
        match output_type {
            OutputType::Stdout => Box::new(Cursor::new(self.stdout.clone())),
            OutputType::Stderr => Box::new(Cursor::new(self.stderr.clone())),
            OutputType::Any => {
                let mut stdout = self.stdout.clone();
                if !stdout.is_empty() && !stdout.ends_with(b"\n") {
                    stdout.push(b'\n');
                }
                Box::new(Cursor::new(stdout).chain(Cursor::new(self.stderr.clone())))
            }
        }
    }
}

/// Value held on the blackboard
#[derive(Clone)]
pub enum RuntimeValue {
    Response(Arc<ResponseData>),
    Metrics(Arc<dyn Metrics>),
    Command(Arc<CommandOutput>),
}

impl RuntimeValue {
    pub fn kind(&self) -> &'static str {
        match self {
            RuntimeValue::Response(_) => "response",
            RuntimeValue::Metrics(_) => "metrics",
            RuntimeValue::Command(_) => "command",
        }
    }
}

/// Shared key/value store for a single instance run
#[derive(Clone, Default)]
pub struct RunData {
    values: Arc<RwLock<HashMap<String, RuntimeValue>>>,
}

impl RunData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, key: impl Into<String>, value: RuntimeValue) {
        let key = key.into();
        trace!("Storing {} data under {}", value.kind(), key);
        self.values.write().insert(key, value);
    }

    pub fn load(&self, key: &str) -> Option<RuntimeValue> {
        self.values.read().get(key).cloned()
    }
}
