//! Sequential action expansion
//!
//! A sequential action is never executed directly: it names an ordered list
//! of action configs on the target service's server, which the action maker
//! splices into the instance in its place.

use wst_common::types::{ActionConfig, SequentialActionConfig};

use crate::actions::{OnFailure, When};
use crate::error::{Error, Result};
use crate::services::ServiceLocator;

/// Sub-action configs of one sequential action
#[derive(Debug, Clone)]
pub struct Expansion {
    pub actions: Vec<ActionConfig>,
    /// Milliseconds
    pub default_timeout: u64,
}

/// Tracks the sequential actions currently being expanded
#[derive(Debug, Default)]
pub struct SequentialExpander {
    stack: Vec<String>,
}

impl SequentialExpander {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `config` and push it on the expansion stack.
    ///
    /// Sub-actions without a service use the sequential action's service, a
    /// nonzero sequential timeout becomes their default timeout, and a
    /// non-default `when`/`on_failure` overrides theirs.
    pub fn enter(
        &mut self,
        config: &SequentialActionConfig,
        locator: &dyn ServiceLocator,
        default_timeout: u64,
    ) -> Result<Expansion> {
        let when: When = config.when.parse()?;
        let on_failure: OnFailure = config.on_failure.parse()?;

        let service = locator.find(&config.service)?;
        let server = service.server();
        let sequential = server
            .sequential_action(&config.name)
            .ok_or_else(|| Error::SequentialNotFound {
                name: config.name.clone(),
                server: server.key().to_string(),
            })?;

        let key = format!("{}/{}", server.key(), config.name);
        if self.stack.contains(&key) {
            return Err(Error::CircularSequential(key));
        }
        self.stack.push(key);

        let actions = sequential
            .actions()
            .iter()
            .map(|sub| inherit(sub, config, when, on_failure))
            .collect();

        Ok(Expansion {
            actions,
            default_timeout: if config.timeout != 0 {
                config.timeout
            } else {
                default_timeout
            },
        })
    }

    pub fn leave(&mut self) {
        self.stack.pop();
    }
}

fn inherit(
    sub: &ActionConfig,
    parent: &SequentialActionConfig,
    when: When,
    on_failure: OnFailure,
) -> ActionConfig {
    let mut sub = sub.clone();
    let (service, sub_when, sub_on_failure) = match &mut sub {
        ActionConfig::Expect(c) => (&mut c.service, &mut c.when, &mut c.on_failure),
        ActionConfig::Sequential(c) => (&mut c.service, &mut c.when, &mut c.on_failure),
    };
    if service.is_empty() {
        *service = parent.service.clone();
    }
    if when != When::OnSuccess {
        *sub_when = when.as_str().to_string();
    }
    if on_failure != OnFailure::Fail {
        *sub_on_failure = on_failure.as_str().to_string();
    }
    sub
}
