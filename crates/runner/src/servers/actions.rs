//! Actions a server definition offers to instances

use std::collections::HashMap;
use std::sync::Arc;

use wst_common::types::{ActionConfig, ServerActionsConfig, ServerExpectationConfig};
use wst_common::Parameters;

use crate::error::{Error, Result};
use crate::expectations::{ExpectationKind, ExpectationsMaker};

/// Named expectation template used by custom actions
#[derive(Debug, Clone, PartialEq)]
pub struct ExpectAction {
    name: String,
    parameters: Parameters,
    kind: ExpectationKind,
}

impl ExpectAction {
    pub fn new(name: impl Into<String>, parameters: Parameters, kind: ExpectationKind) -> Self {
        Self {
            name: name.into(),
            parameters,
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn kind(&self) -> &ExpectationKind {
        &self.kind
    }
}

/// Named, ordered list of action configs
#[derive(Debug, Clone)]
pub struct SequentialAction {
    name: String,
    actions: Vec<ActionConfig>,
}

impl SequentialAction {
    pub fn new(name: impl Into<String>, actions: Vec<ActionConfig>) -> Self {
        Self {
            name: name.into(),
            actions,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn actions(&self) -> &[ActionConfig] {
        &self.actions
    }
}

#[derive(Debug, Clone, Default)]
pub struct Actions {
    pub expect: HashMap<String, Arc<ExpectAction>>,
    pub sequential: HashMap<String, Arc<SequentialAction>>,
}

impl Actions {
    /// Add parent actions whose names this server does not define.
    pub fn inherit(&mut self, parent: &Actions) {
        for (name, action) in &parent.expect {
            self.expect
                .entry(name.clone())
                .or_insert_with(|| Arc::clone(action));
        }
        for (name, action) in &parent.sequential {
            self.sequential
                .entry(name.clone())
                .or_insert_with(|| Arc::clone(action));
        }
    }

    pub fn expect_names(&self) -> Vec<&str> {
        sorted_keys(&self.expect)
    }

    pub fn sequential_names(&self) -> Vec<&str> {
        sorted_keys(&self.sequential)
    }
}

fn sorted_keys<V>(map: &HashMap<String, V>) -> Vec<&str> {
    let mut names: Vec<&str> = map.keys().map(String::as_str).collect();
    names.sort_unstable();
    names
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ActionsMaker {
    expectations: ExpectationsMaker,
}

impl ActionsMaker {
    pub fn new(expectations: ExpectationsMaker) -> Self {
        Self { expectations }
    }

    pub fn make(&self, config: &ServerActionsConfig) -> Result<Actions> {
        let mut actions = Actions::default();
        for (name, expectation) in &config.expect {
            let action = self.make_expect_action(name, expectation)?;
            actions.expect.insert(name.clone(), Arc::new(action));
        }
        for (name, sequential) in &config.sequential {
            actions.sequential.insert(
                name.clone(),
                Arc::new(SequentialAction::new(name.clone(), sequential.actions.clone())),
            );
        }
        Ok(actions)
    }

    fn make_expect_action(
        &self,
        name: &str,
        config: &ServerExpectationConfig,
    ) -> Result<ExpectAction> {
        let label = format!("server expectation {}", name);
        let kind = match (&config.output, &config.response, &config.metrics) {
            (Some(output), None, None) => {
                ExpectationKind::Output(self.expectations.make_output_expectation(output)?)
            }
            (None, Some(response), None) => {
                ExpectationKind::Response(self.expectations.make_response_expectation(response)?)
            }
            (None, None, Some(metrics)) => {
                ExpectationKind::Metrics(self.expectations.make_metrics_expectation(metrics)?)
            }
            (None, None, None) => return Err(Error::ExpectationNotSet(label)),
            _ => return Err(Error::MultipleExpectations(label)),
        };
        Ok(ExpectAction::new(name, Parameters::make(&config.parameters)?, kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make(yaml: &str) -> Result<Actions> {
        let config: ServerActionsConfig = serde_yaml::from_str(yaml).unwrap();
        ActionsMaker::default().make(&config)
    }

    #[test]
    fn test_make_actions() {
        let actions = make(
            r#"
expect:
  ready:
    parameters:
      pool: www
    output:
      messages: ["ready"]
  status:
    response:
      status: 200
sequential:
  boot:
    actions:
      - expect:
          custom:
            name: ready
"#,
        )
        .unwrap();

        assert_eq!(actions.expect_names(), vec!["ready", "status"]);
        assert_eq!(actions.expect["ready"].kind().name(), "output");
        assert_eq!(actions.expect["ready"].parameters().len(), 1);
        assert_eq!(actions.expect["status"].kind().name(), "response");
        assert_eq!(actions.sequential["boot"].actions().len(), 1);
    }

    #[test]
    fn test_expectation_must_set_exactly_one_kind() {
        let err = make("expect:\n  empty:\n    parameters: {a: 1}\n").unwrap_err();
        assert!(matches!(err, Error::ExpectationNotSet(label) if label.ends_with("empty")));

        let err = make(
            "expect:\n  both:\n    output: {messages: [a]}\n    metrics: {rules: []}\n",
        )
        .unwrap_err();
        assert!(matches!(err, Error::MultipleExpectations(_)));
    }

    #[test]
    fn test_invalid_expectation_fails() {
        let err = make("expect:\n  bad:\n    output: {order: sorted}\n").unwrap_err();
        assert_eq!(err.to_string(), "Invalid output order value: sorted");
    }

    #[test]
    fn test_inherit_keeps_own_actions() {
        let mut child = make("expect:\n  ready:\n    output: {messages: [child]}\n").unwrap();
        let parent = make(
            r#"
expect:
  ready:
    output: {messages: [parent]}
  alive:
    response: {status: 200}
sequential:
  boot:
    actions: []
"#,
        )
        .unwrap();

        child.inherit(&parent);

        match child.expect["ready"].kind() {
            ExpectationKind::Output(output) => assert_eq!(output.messages, vec!["child"]),
            other => panic!("unexpected kind {:?}", other),
        }
        assert!(child.expect.contains_key("alive"));
        assert!(child.sequential.contains_key("boot"));
    }
}
