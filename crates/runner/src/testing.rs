//! Test doubles for services, metrics and user lookup

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, DuplexStream};

use wst_common::types::ServerConfig;
use wst_common::{Metric, MetricOperator, Metrics, OutputType, Parameters};

use crate::error::{Error, Result};
use crate::expectations::ExpectationsMaker;
use crate::scanner::ActionContext;
use crate::servers::{Server, Servers, ServersMaker, UserDirectory, UserInfo};
use crate::services::{
    OutputReader, Service, ServiceDefinition, ServiceEnvironment, ServiceLocator,
    StaticServiceLocator,
};

/// Build servers from a YAML list with a fixed current user.
pub fn make_servers(yaml: &str) -> Result<Servers> {
    let configs: Vec<ServerConfig> = serde_yaml::from_str(yaml).unwrap();
    make_servers_from(&configs)
}

fn make_servers_from(configs: &[ServerConfig]) -> Result<Servers> {
    let users = StaticUserDirectory::new().with_current("tester", 1000, 1000, "tester");
    ServersMaker::new(ExpectationsMaker::new(), Arc::new(users)).make(configs)
}

/// Build a single server from its YAML definition.
pub fn make_server(yaml: &str) -> Arc<Server> {
    let config: ServerConfig = serde_yaml::from_str(yaml).unwrap();
    let servers = make_servers_from(&[config]).unwrap();
    let server = servers.iter().next().cloned().unwrap();
    server
}

/// Replace `{{ name }}` placeholders with parameter values.
fn render(text: &str, params: &Parameters) -> Result<String> {
    let mut rendered = text.to_string();
    for (name, value) in params.iter() {
        rendered = rendered.replace(&format!("{{{{ {} }}}}", name), &value.to_string());
    }
    if rendered.contains("{{") {
        return Err(Error::Template(format!("unresolved placeholder in {:?}", text)));
    }
    Ok(rendered)
}

pub struct MockService {
    name: String,
    server: Arc<Server>,
    parameters: Parameters,
    output: Vec<u8>,
    hold_open: bool,
    fail_render: bool,
    writers: Mutex<Vec<DuplexStream>>,
    requested: Mutex<Option<OutputType>>,
}

impl MockService {
    pub fn new(name: &str) -> Self {
        let server = make_server(&format!("name: {}", name));
        Self {
            name: name.to_string(),
            parameters: server.parameters().clone(),
            server,
            output: Vec::new(),
            hold_open: false,
            fail_render: false,
            writers: Mutex::new(Vec::new()),
            requested: Mutex::new(None),
        }
    }

    pub fn with_server(mut self, server: Arc<Server>) -> Self {
        self.parameters = server.parameters().clone();
        self.server = server;
        self
    }

    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Output that ends after `output`.
    pub fn with_output(mut self, output: &str) -> Self {
        self.output = output.as_bytes().to_vec();
        self.hold_open = false;
        self
    }

    /// Output that stays open after `output`.
    pub fn with_open_output(mut self, output: &str) -> Self {
        self.output = output.as_bytes().to_vec();
        self.hold_open = true;
        self
    }

    pub fn failing_render(mut self) -> Self {
        self.fail_render = true;
        self
    }

    pub fn requested_output(&self) -> Option<OutputType> {
        *self.requested.lock()
    }
}

#[async_trait]
impl Service for MockService {
    fn name(&self) -> &str {
        &self.name
    }

    fn server(&self) -> Arc<Server> {
        Arc::clone(&self.server)
    }

    fn server_parameters(&self) -> Parameters {
        self.parameters.clone()
    }

    fn render_template(&self, text: &str, params: &Parameters) -> Result<String> {
        if self.fail_render {
            return Err(Error::Template(format!("cannot render {:?}", text)));
        }
        render(text, params)
    }

    async fn output_reader(
        &self,
        _ctx: &ActionContext,
        output_type: OutputType,
    ) -> Result<OutputReader> {
        *self.requested.lock() = Some(output_type);
        if !self.hold_open {
            return Ok(Box::new(Cursor::new(self.output.clone())));
        }
        let (mut writer, reader) = tokio::io::duplex(64 * 1024);
        writer.write_all(&self.output).await?;
        self.writers.lock().push(writer);
        Ok(Box::new(reader))
    }
}

/// User directory over a fixed table
#[derive(Debug, Default)]
pub struct StaticUserDirectory {
    users: HashMap<String, UserInfo>,
    groups: HashMap<u32, String>,
    current: Option<String>,
}

impl StaticUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, name: &str, uid: u32, gid: u32, group: &str) -> Self {
        self.users.insert(
            name.to_string(),
            UserInfo {
                name: name.to_string(),
                uid,
                gid,
            },
        );
        self.groups.insert(gid, group.to_string());
        self
    }

    pub fn with_current(mut self, name: &str, uid: u32, gid: u32, group: &str) -> Self {
        self = self.with_user(name, uid, gid, group);
        self.current = Some(name.to_string());
        self
    }
}

impl UserDirectory for StaticUserDirectory {
    fn lookup_user(&self, name: &str) -> Result<UserInfo> {
        self.users
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UserLookup(format!("user {} does not exist", name)))
    }

    fn current_user(&self) -> Result<UserInfo> {
        let name = self
            .current
            .as_deref()
            .ok_or_else(|| Error::UserLookup("no current user".to_string()))?;
        self.lookup_user(name)
    }

    fn primary_group(&self, user: &UserInfo) -> Result<String> {
        self.groups
            .get(&user.gid)
            .cloned()
            .ok_or_else(|| Error::UserLookup(format!("no group {}", user.gid)))
    }
}

/// Metric counting how often it is compared
pub struct CountingMetric {
    name: String,
    value: f64,
    calls: AtomicUsize,
}

impl Metric for CountingMetric {
    fn name(&self) -> &str {
        &self.name
    }

    fn compare(&self, operator: MetricOperator, value: f64) -> wst_common::Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(operator.apply(self.value, value))
    }
}

#[derive(Default)]
pub struct CountingMetrics {
    metrics: HashMap<String, Arc<CountingMetric>>,
}

impl CountingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.metrics.insert(
            name.to_string(),
            Arc::new(CountingMetric {
                name: name.to_string(),
                value,
                calls: AtomicUsize::new(0),
            }),
        );
        self
    }

    pub fn calls(&self, name: &str) -> usize {
        self.metrics
            .get(name)
            .map(|m| m.calls.load(Ordering::SeqCst))
            .unwrap_or(0)
    }
}

impl Metrics for CountingMetrics {
    fn find(&self, name: &str) -> wst_common::Result<Arc<dyn Metric>> {
        self.metrics
            .get(name)
            .map(|m| m.clone() as Arc<dyn Metric>)
            .ok_or_else(|| wst_common::Error::MetricNotFound(name.to_string()))
    }
}

/// Environment serving mock services with canned output per service name
#[derive(Default)]
pub struct MockEnvironment {
    outputs: HashMap<String, String>,
    failing: Option<String>,
    released: Mutex<Vec<String>>,
}

impl MockEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(mut self, service: &str, output: &str) -> Self {
        self.outputs.insert(service.to_string(), output.to_string());
        self
    }

    /// Fail to provide services for `instance`.
    pub fn failing_for(mut self, instance: &str) -> Self {
        self.failing = Some(instance.to_string());
        self
    }

    pub fn released(&self) -> Vec<String> {
        let mut released = self.released.lock().clone();
        released.sort();
        released
    }
}

#[async_trait]
impl ServiceEnvironment for MockEnvironment {
    async fn services(
        &self,
        instance: &str,
        definitions: Vec<ServiceDefinition>,
    ) -> Result<Arc<dyn ServiceLocator>> {
        if self.failing.as_deref() == Some(instance) {
            return Err(Error::ServiceNotRunning(format!("{} services", instance)));
        }
        let mut locator = StaticServiceLocator::new();
        for definition in definitions {
            let output = self
                .outputs
                .get(&definition.name)
                .map(String::as_str)
                .unwrap_or_default();
            let service = MockService::new(&definition.name)
                .with_server(Arc::clone(&definition.server))
                .with_parameters(definition.parameters)
                .with_output(output);
            locator.add(Arc::new(service));
        }
        Ok(Arc::new(locator))
    }

    async fn release(&self, instance: &str) -> Result<()> {
        self.released.lock().push(instance.to_string());
        Ok(())
    }
}
