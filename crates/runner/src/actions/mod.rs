//! Action framework
//!
//! An [`Action`] is one executable step of an instance. Actions are built
//! once from configuration by [`ActionMaker`] and are immutable afterwards;
//! every execution reads whatever it needs from the run's blackboard.

pub mod expect;
pub mod sequential;

use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use wst_common::types::ActionConfig;
use wst_common::{Foundation, RunData};

use crate::error::{Error, Result};
use crate::scanner::ActionContext;
use crate::services::ServiceLocator;

pub use expect::{CommonExpectation, ExpectationActionMaker};
pub use sequential::SequentialExpander;

/// Gate deciding whether an action runs given the outcome so far
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum When {
    Always,
    OnSuccess,
    OnFailure,
}

impl When {
    pub fn as_str(&self) -> &'static str {
        match self {
            When::Always => "always",
            When::OnSuccess => "on_success",
            When::OnFailure => "on_failure",
        }
    }

    /// Whether an action gated by `self` runs after `failed` earlier steps.
    pub fn should_run(&self, failed: bool) -> bool {
        match self {
            When::Always => true,
            When::OnSuccess => !failed,
            When::OnFailure => failed,
        }
    }
}

impl FromStr for When {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "always" => Ok(When::Always),
            "on_success" => Ok(When::OnSuccess),
            "on_failure" => Ok(When::OnFailure),
            other => Err(Error::InvalidValue {
                field: "action when",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for When {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a non-match means for the instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnFailure {
    Fail,
    Ignore,
}

impl OnFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            OnFailure::Fail => "fail",
            OnFailure::Ignore => "ignore",
        }
    }
}

impl FromStr for OnFailure {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fail" => Ok(OnFailure::Fail),
            "ignore" => Ok(OnFailure::Ignore),
            other => Err(Error::InvalidValue {
                field: "action on_failure",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for OnFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait Action: Send + Sync {
    /// Run the action; `Ok(false)` is a plain non-match.
    async fn execute(&self, ctx: &ActionContext, data: &RunData) -> Result<bool>;

    fn timeout(&self) -> Duration;

    fn when(&self) -> When;

    fn on_failure(&self) -> OnFailure;

    /// Short label used in logs and results
    fn describe(&self) -> String;
}

/// Builds executable actions from action configs
#[derive(Debug, Clone)]
pub struct ActionMaker {
    expectations: ExpectationActionMaker,
}

impl ActionMaker {
    pub fn new(foundation: Foundation) -> Self {
        Self {
            expectations: ExpectationActionMaker::new(foundation),
        }
    }

    pub fn expectations(&self) -> &ExpectationActionMaker {
        &self.expectations
    }

    /// Build the actions for one config; sequential actions expand in place.
    ///
    /// `default_timeout` is in milliseconds.
    pub fn make(
        &self,
        config: &ActionConfig,
        locator: &dyn ServiceLocator,
        default_timeout: u64,
    ) -> Result<Vec<Box<dyn Action>>> {
        let mut expander = SequentialExpander::new();
        self.make_nested(config, locator, default_timeout, &mut expander)
    }

    fn make_nested(
        &self,
        config: &ActionConfig,
        locator: &dyn ServiceLocator,
        default_timeout: u64,
        expander: &mut SequentialExpander,
    ) -> Result<Vec<Box<dyn Action>>> {
        match config {
            ActionConfig::Expect(expect) => {
                let action = self.expectations.make(expect, locator, default_timeout)?;
                Ok(vec![action])
            }
            ActionConfig::Sequential(sequential) => {
                let expansion = expander.enter(sequential, locator, default_timeout)?;
                let mut actions = Vec::new();
                for sub in &expansion.actions {
                    let nested =
                        self.make_nested(sub, locator, expansion.default_timeout, expander)?;
                    actions.extend(nested);
                }
                expander.leave();
                Ok(actions)
            }
        }
    }
}
