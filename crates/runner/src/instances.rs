//! Instance runner
//!
//! An instance is one test scenario: an ordered list of actions executed
//! against the services of the instance. Actions run one at a time; gating
//! decides which of them run once an earlier action has failed.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use wst_common::types::{DefaultTimeoutsConfig, InstanceConfig};
use wst_common::RunData;

use crate::actions::{Action, ActionMaker, OnFailure};
use crate::error::Result;
use crate::scanner::ActionContext;
use crate::services::ServiceLocator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Matched,
    Failed,
    Ignored,
    Skipped,
    Error,
}

/// Result of one action of an instance run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub action: String,
    pub status: ActionStatus,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Result of running a single instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceResult {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub actions: Vec<ActionOutcome>,
    pub error: Option<String>,
}

impl InstanceResult {
    /// Result of an instance that could not be set up.
    pub fn failed(name: &str, error: String) -> Self {
        Self {
            name: name.to_string(),
            success: false,
            duration_ms: 0,
            actions: Vec::new(),
            error: Some(error),
        }
    }
}

pub struct Instance {
    name: String,
    title: String,
    actions: Vec<Box<dyn Action>>,
    /// Bound on all actions together
    timeout: Option<Duration>,
}

impl Instance {
    /// Build the expanded action list of `config`.
    pub fn make(
        config: &InstanceConfig,
        defaults: &DefaultTimeoutsConfig,
        locator: &dyn ServiceLocator,
        maker: &ActionMaker,
    ) -> Result<Self> {
        let default_timeout = if config.timeouts.action != 0 {
            config.timeouts.action
        } else {
            defaults.action
        };
        let total = if config.timeouts.actions != 0 {
            config.timeouts.actions
        } else {
            defaults.actions
        };

        let mut actions = Vec::new();
        for action in &config.actions {
            actions.extend(maker.make(action, locator, default_timeout)?);
        }
        debug!("Instance {} has {} action(s)", config.name, actions.len());

        Ok(Self {
            name: config.name.clone(),
            title: config.title.clone(),
            actions,
            timeout: (total != 0).then(|| Duration::from_millis(total)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn actions(&self) -> &[Box<dyn Action>] {
        &self.actions
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub async fn run(&self, ctx: &ActionContext, data: &RunData) -> InstanceResult {
        let start = Instant::now();
        let root = match self.timeout {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx.clone(),
        };

        let mut failed = false;
        let mut instance_error = None;
        let mut outcomes = Vec::with_capacity(self.actions.len());

        for action in &self.actions {
            let description = action.describe();
            if !action.when().should_run(failed) {
                debug!("Skipping {} (when {})", description, action.when());
                outcomes.push(ActionOutcome {
                    action: description,
                    status: ActionStatus::Skipped,
                    duration_ms: 0,
                    error: None,
                });
                continue;
            }

            let action_ctx = root.with_timeout(action.timeout());
            let action_start = Instant::now();
            let result = action.execute(&action_ctx, data).await;
            action_ctx.cancel();
            let duration_ms = action_start.elapsed().as_millis() as u64;

            let (status, error) = match result {
                Ok(true) => {
                    debug!("Matched {}", description);
                    (ActionStatus::Matched, None)
                }
                Ok(false) if action.on_failure() == OnFailure::Ignore => {
                    info!("Ignoring failed {}", description);
                    (ActionStatus::Ignored, None)
                }
                Ok(false) => {
                    warn!("Failed {}", description);
                    failed = true;
                    (ActionStatus::Failed, None)
                }
                Err(e) => {
                    error!("Error in {}: {}", description, e);
                    (ActionStatus::Error, Some(e.to_string()))
                }
            };
            outcomes.push(ActionOutcome {
                action: description,
                status,
                duration_ms,
                error: error.clone(),
            });

            if let Some(e) = error {
                failed = true;
                instance_error = Some(e);
                break;
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        if failed && instance_error.is_none() {
            let count = outcomes
                .iter()
                .filter(|o| o.status == ActionStatus::Failed)
                .count();
            instance_error = Some(format!("{} action(s) did not match", count));
        }

        InstanceResult {
            name: self.name.clone(),
            success: !failed,
            duration_ms,
            actions: outcomes,
            error: instance_error,
        }
    }
}
