//! Service seams consumed by actions
//!
//! Process lifecycle lives elsewhere; actions only need to find a service by
//! name, read its output and render templates through it. A
//! [`ServiceEnvironment`] turns the resolved service definitions of an
//! instance into running services.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::AsyncRead;

use wst_common::types::InstanceConfig;
use wst_common::{OutputType, Parameters};

use crate::error::{Error, Result};
use crate::scanner::{ActionContext, OutputScanner};
use crate::servers::{SandboxType, Server, ServerKey, Servers};

pub type OutputReader = Box<dyn AsyncRead + Send + Unpin>;

/// A running (or simulated) service of an instance
#[async_trait]
pub trait Service: Send + Sync {
    fn name(&self) -> &str;

    /// Resolved server definition the service runs
    fn server(&self) -> Arc<Server>;

    /// Server parameters merged with the service's own overrides
    fn server_parameters(&self) -> Parameters;

    fn render_template(&self, text: &str, params: &Parameters) -> Result<String>;

    /// Live output stream of the service.
    async fn output_reader(&self, ctx: &ActionContext, output_type: OutputType)
        -> Result<OutputReader>;

    async fn output_scanner(
        &self,
        ctx: &ActionContext,
        output_type: OutputType,
    ) -> Result<OutputScanner<OutputReader>> {
        let reader = self.output_reader(ctx, output_type).await?;
        Ok(OutputScanner::new(reader, ctx.clone()))
    }
}

pub trait ServiceLocator: Send + Sync {
    fn find(&self, name: &str) -> Result<Arc<dyn Service>>;
}

/// Locator over a fixed set of services
#[derive(Default, Clone)]
pub struct StaticServiceLocator {
    services: HashMap<String, Arc<dyn Service>>,
}

impl StaticServiceLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, service: Arc<dyn Service>) -> Self {
        self.add(service);
        self
    }

    pub fn add(&mut self, service: Arc<dyn Service>) {
        self.services.insert(service.name().to_string(), service);
    }
}

impl ServiceLocator for StaticServiceLocator {
    fn find(&self, name: &str) -> Result<Arc<dyn Service>> {
        self.services
            .get(name)
            .cloned()
            .ok_or_else(|| Error::ServiceNotFound(name.to_string()))
    }
}

/// Service of an instance resolved against the server set
#[derive(Debug, Clone)]
pub struct ServiceDefinition {
    pub name: String,
    pub server: Arc<Server>,
    /// Service overrides, then instance, then server, then spec defaults
    pub parameters: Parameters,
    pub sandbox: Option<SandboxType>,
}

impl ServiceDefinition {
    /// Resolve every service declared by `instance`, sorted by name.
    ///
    /// `defaults` are the spec-wide default parameters.
    pub fn resolve_all(
        instance: &InstanceConfig,
        servers: &Servers,
        defaults: &Parameters,
    ) -> Result<Vec<ServiceDefinition>> {
        let instance_parameters = Parameters::make(&instance.parameters)?;

        let mut names: Vec<&String> = instance.services.keys().collect();
        names.sort_unstable();

        names
            .into_iter()
            .map(|name| {
                let config = &instance.services[name];
                let key = ServerKey::new(config.server.name.clone(), config.server.tag.clone());
                let server = servers.find(&key)?;

                let sandbox = config
                    .server
                    .sandbox
                    .as_deref()
                    .map(str::parse::<SandboxType>)
                    .transpose()?;
                if let Some(kind) = sandbox {
                    if server.sandbox(kind).is_none() {
                        return Err(Error::InvalidConfig(format!(
                            "server {} of service {} has no {} sandbox",
                            key, name, kind
                        )));
                    }
                }

                let parameters = Parameters::make(&config.server.parameters)?
                    .inherit(&instance_parameters)
                    .inherit(server.parameters())
                    .inherit(defaults);

                Ok(ServiceDefinition {
                    name: name.clone(),
                    server,
                    parameters,
                    sandbox,
                })
            })
            .collect()
    }
}

/// Service known only by its definition; it never produces output.
pub struct DeclaredService {
    definition: ServiceDefinition,
}

impl DeclaredService {
    pub fn new(definition: ServiceDefinition) -> Self {
        Self { definition }
    }

    /// Locator over the declared form of `definitions`.
    pub fn locator(definitions: Vec<ServiceDefinition>) -> StaticServiceLocator {
        definitions
            .into_iter()
            .fold(StaticServiceLocator::new(), |locator, definition| {
                locator.with(Arc::new(DeclaredService::new(definition)))
            })
    }
}

#[async_trait]
impl Service for DeclaredService {
    fn name(&self) -> &str {
        &self.definition.name
    }

    fn server(&self) -> Arc<Server> {
        Arc::clone(&self.definition.server)
    }

    fn server_parameters(&self) -> Parameters {
        self.definition.parameters.clone()
    }

    fn render_template(&self, _text: &str, _params: &Parameters) -> Result<String> {
        Err(Error::ServiceNotRunning(self.definition.name.clone()))
    }

    async fn output_reader(
        &self,
        _ctx: &ActionContext,
        _output_type: OutputType,
    ) -> Result<OutputReader> {
        Err(Error::ServiceNotRunning(self.definition.name.clone()))
    }
}

/// Provides the running services of an instance
#[async_trait]
pub trait ServiceEnvironment: Send + Sync {
    /// Start (or attach to) the services of `instance`.
    async fn services(
        &self,
        instance: &str,
        definitions: Vec<ServiceDefinition>,
    ) -> Result<Arc<dyn ServiceLocator>>;

    /// Release whatever `services` acquired for `instance`.
    async fn release(&self, _instance: &str) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::make_servers;

    const SERVERS: &str = r#"
- name: fpm
  parameters:
    pool: www
    workers: 2
  sandboxes:
    local: {}
- name: nginx
"#;

    fn instance(yaml: &str) -> InstanceConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_resolve_parameters_priority() {
        let servers = make_servers(SERVERS).unwrap();
        let instance = instance(
            r#"
name: basic
parameters:
  workers: 4
  mode: strict
services:
  fpm:
    server:
      name: fpm
      sandbox: local
      parameters:
        mode: loose
"#,
        );
        let defaults = Parameters::from_iter([("pool", "default"), ("timezone", "UTC")]);

        let definitions = ServiceDefinition::resolve_all(&instance, &servers, &defaults).unwrap();
        assert_eq!(definitions.len(), 1);
        let fpm = &definitions[0];
        assert_eq!(fpm.sandbox, Some(SandboxType::Local));
        assert_eq!(fpm.parameters.get("mode").unwrap().to_string(), "loose");
        assert_eq!(fpm.parameters.get("workers").unwrap().to_int(), 4);
        assert_eq!(fpm.parameters.get("pool").unwrap().to_string(), "www");
        assert_eq!(fpm.parameters.get("timezone").unwrap().to_string(), "UTC");
    }

    #[test]
    fn test_resolve_rejects_unknown_server_and_sandbox() {
        let servers = make_servers(SERVERS).unwrap();

        let unknown = instance("name: a\nservices:\n  db:\n    server: {name: mysql}\n");
        let err =
            ServiceDefinition::resolve_all(&unknown, &servers, &Parameters::new()).unwrap_err();
        assert_eq!(err.to_string(), "Server mysql:default not found");

        let missing =
            instance("name: a\nservices:\n  web:\n    server: {name: nginx, sandbox: docker}\n");
        let err =
            ServiceDefinition::resolve_all(&missing, &servers, &Parameters::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_declared_service_has_no_output() {
        let servers = make_servers(SERVERS).unwrap();
        let instance = instance("name: a\nservices:\n  web:\n    server: {name: nginx}\n");
        let definitions =
            ServiceDefinition::resolve_all(&instance, &servers, &Parameters::new()).unwrap();
        let locator = DeclaredService::locator(definitions);

        let service = locator.find("web").unwrap();
        assert_eq!(service.server().name(), "nginx");
        let err = service
            .output_reader(&ActionContext::new(), OutputType::Any)
            .await
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "Service web is not running");
        assert!(locator.find("fpm").is_err());
    }
}
