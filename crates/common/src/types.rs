//! Declarative spec schema
//!
//! These types mirror the YAML spec file one to one. Enumerated values
//! (match types, operators, gating policies) stay as strings here so the
//! makers can reject bad values with errors that name the offending field.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type RawParameters = HashMap<String, serde_yaml::Value>;

/// Top-level spec file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpecConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub defaults: DefaultsConfig,

    #[serde(default)]
    pub servers: Vec<ServerConfig>,

    #[serde(default)]
    pub instances: Vec<InstanceConfig>,
}

fn default_version() -> u32 {
    1
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default)]
    pub timeouts: DefaultTimeoutsConfig,

    #[serde(default)]
    pub parameters: RawParameters,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultTimeoutsConfig {
    /// Default timeout of a single action in milliseconds
    #[serde(default = "default_action_timeout")]
    pub action: u64,

    /// Timeout of all actions of an instance in milliseconds (0 = unbounded)
    #[serde(default)]
    pub actions: u64,
}

impl Default for DefaultTimeoutsConfig {
    fn default() -> Self {
        Self {
            action: default_action_timeout(),
            actions: 0,
        }
    }
}

fn default_action_timeout() -> u64 {
    5000 // 5 seconds
}

fn default_tag() -> String {
    crate::DEFAULT_SERVER_TAG.to_string()
}

/// Server definition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: String,

    #[serde(default = "default_tag")]
    pub tag: String,

    /// Parent server as `name` or `name:tag`
    #[serde(default)]
    pub extends: Option<String>,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub group: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub parameters: RawParameters,

    #[serde(default)]
    pub configs: HashMap<String, ServerConfigFile>,

    #[serde(default)]
    pub templates: HashMap<String, ServerTemplate>,

    #[serde(default)]
    pub sandboxes: SandboxesConfig,

    #[serde(default)]
    pub actions: ServerActionsConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfigFile {
    pub file: String,

    #[serde(default)]
    pub parameters: RawParameters,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerTemplate {
    pub file: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SandboxesConfig {
    #[serde(default)]
    pub local: Option<SandboxConfig>,

    #[serde(default)]
    pub docker: Option<SandboxConfig>,

    #[serde(default)]
    pub kubernetes: Option<SandboxConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SandboxConfig {
    #[serde(default)]
    pub available: Option<bool>,

    #[serde(default)]
    pub dirs: HashMap<String, String>,

    #[serde(default)]
    pub hooks: HashMap<String, HookConfig>,

    /// Container sandboxes only
    #[serde(default)]
    pub image: Option<ContainerImageConfig>,

    /// Container sandboxes only
    #[serde(default)]
    pub registry: Option<RegistryConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookConfig {
    #[serde(default)]
    pub command: Option<String>,

    #[serde(default)]
    pub signal: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerImageConfig {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub tag: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerActionsConfig {
    #[serde(default)]
    pub expect: HashMap<String, ServerExpectationConfig>,

    #[serde(default)]
    pub sequential: HashMap<String, ServerSequentialConfig>,
}

/// Named expectation a server offers to custom actions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerExpectationConfig {
    #[serde(default)]
    pub parameters: RawParameters,

    #[serde(default)]
    pub output: Option<OutputExpectationConfig>,

    #[serde(default)]
    pub response: Option<ResponseExpectationConfig>,

    #[serde(default)]
    pub metrics: Option<MetricsExpectationConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerSequentialConfig {
    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    pub actions: Vec<ActionConfig>,
}

/// Test scenario
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstanceConfig {
    pub name: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub parameters: RawParameters,

    #[serde(default)]
    pub timeouts: InstanceTimeoutsConfig,

    #[serde(default)]
    pub services: HashMap<String, ServiceConfig>,

    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    pub actions: Vec<ActionConfig>,
}

/// Zero means "use the spec default"
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstanceTimeoutsConfig {
    #[serde(default)]
    pub action: u64,

    #[serde(default)]
    pub actions: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub server: ServiceServerConfig,

    #[serde(default)]
    pub resources: RawParameters,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceServerConfig {
    pub name: String,

    #[serde(default = "default_tag")]
    pub tag: String,

    #[serde(default)]
    pub sandbox: Option<String>,

    #[serde(default)]
    pub parameters: RawParameters,
}

/// A single action of an instance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionConfig {
    Expect(ExpectationActionConfig),
    Sequential(SequentialActionConfig),
}

fn default_when() -> String {
    "on_success".to_string()
}

fn default_on_failure() -> String {
    "fail".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpectationActionConfig {
    #[serde(default)]
    pub service: String,

    /// Milliseconds; zero selects the default timeout
    #[serde(default)]
    pub timeout: u64,

    #[serde(default = "default_when")]
    pub when: String,

    #[serde(default = "default_on_failure")]
    pub on_failure: String,

    #[serde(default)]
    pub parameters: RawParameters,

    #[serde(default)]
    pub output: Option<OutputExpectationConfig>,

    #[serde(default)]
    pub response: Option<ResponseExpectationConfig>,

    #[serde(default)]
    pub metrics: Option<MetricsExpectationConfig>,

    #[serde(default)]
    pub custom: Option<CustomExpectationConfig>,
}

impl Default for ExpectationActionConfig {
    fn default() -> Self {
        Self {
            service: String::new(),
            timeout: 0,
            when: default_when(),
            on_failure: default_on_failure(),
            parameters: RawParameters::new(),
            output: None,
            response: None,
            metrics: None,
            custom: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequentialActionConfig {
    #[serde(default)]
    pub service: String,

    pub name: String,

    #[serde(default)]
    pub timeout: u64,

    #[serde(default = "default_when")]
    pub when: String,

    #[serde(default = "default_on_failure")]
    pub on_failure: String,
}

fn default_order() -> String {
    "fixed".to_string()
}

fn default_match() -> String {
    "exact".to_string()
}

fn default_output_type() -> String {
    "any".to_string()
}

fn default_last() -> String {
    "last".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputExpectationConfig {
    /// Captured command to read instead of the service output
    #[serde(default)]
    pub command: String,

    #[serde(default = "default_order")]
    pub order: String,

    #[serde(rename = "match", default = "default_match")]
    pub match_type: String,

    #[serde(rename = "type", default = "default_output_type")]
    pub output_type: String,

    #[serde(default)]
    pub messages: Vec<String>,

    #[serde(default)]
    pub render_template: bool,
}

impl Default for OutputExpectationConfig {
    fn default() -> Self {
        Self {
            command: String::new(),
            order: default_order(),
            match_type: default_match(),
            output_type: default_output_type(),
            messages: Vec::new(),
            render_template: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseExpectationConfig {
    #[serde(default = "default_last")]
    pub request: String,

    #[serde(default)]
    pub headers: HashMap<String, String>,

    #[serde(default)]
    pub body: ResponseBodyConfig,

    #[serde(default)]
    pub status: u16,
}

impl Default for ResponseExpectationConfig {
    fn default() -> Self {
        Self {
            request: default_last(),
            headers: HashMap::new(),
            body: ResponseBodyConfig::default(),
            status: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseBodyConfig {
    #[serde(default)]
    pub content: String,

    /// Empty disables body comparison
    #[serde(rename = "match", default)]
    pub match_type: String,

    #[serde(default)]
    pub render_template: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsExpectationConfig {
    #[serde(default = "default_last")]
    pub id: String,

    #[serde(default)]
    pub rules: Vec<MetricRuleConfig>,
}

impl Default for MetricsExpectationConfig {
    fn default() -> Self {
        Self {
            id: default_last(),
            rules: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricRuleConfig {
    pub metric: String,
    pub operator: String,
    pub value: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomExpectationConfig {
    pub name: String,

    #[serde(default)]
    pub parameters: RawParameters,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_spec() {
        let yaml = r#"
name: fpm
servers:
  - name: fpm
    extends: base
    port: 9000
    actions:
      expect:
        ready:
          output:
            messages: ["ready to handle connections"]
instances:
  - name: basic
    services:
      fpm_svc:
        server:
          name: fpm
    actions:
      - expect:
          service: fpm_svc
          response:
            body:
              content: ok
              match: exact
            status: 200
      - sequential:
          service: fpm_svc
          name: boot
"#;
        let spec: SpecConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.version, 1);
        assert_eq!(spec.defaults.timeouts.action, 5000);
        assert_eq!(spec.servers[0].tag, "default");
        assert_eq!(spec.servers[0].extends.as_deref(), Some("base"));

        let ready = &spec.servers[0].actions.expect["ready"];
        let output = ready.output.as_ref().unwrap();
        assert_eq!(output.order, "fixed");
        assert_eq!(output.match_type, "exact");
        assert_eq!(output.output_type, "any");

        let instance = &spec.instances[0];
        assert_eq!(instance.services["fpm_svc"].server.tag, "default");
        match &instance.actions[0] {
            ActionConfig::Expect(expect) => {
                assert_eq!(expect.when, "on_success");
                assert_eq!(expect.on_failure, "fail");
                let response = expect.response.as_ref().unwrap();
                assert_eq!(response.request, "last");
                assert_eq!(response.status, 200);
            }
            other => panic!("unexpected action {:?}", other),
        }
        assert!(matches!(&instance.actions[1], ActionConfig::Sequential(s) if s.name == "boot"));
    }
}
