//! Metrics expectation action

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use wst_common::runtime::metrics_key;
use wst_common::{Metrics, RunData, RuntimeValue};

use crate::actions::expect::CommonExpectation;
use crate::actions::{Action, OnFailure, When};
use crate::error::{Error, Result};
use crate::expectations::MetricsExpectation;
use crate::scanner::ActionContext;

/// Evaluates metric rules against a captured metrics snapshot
#[derive(Debug, Clone)]
pub struct MetricsAction {
    common: CommonExpectation,
    expectation: MetricsExpectation,
}

impl MetricsAction {
    pub fn new(common: CommonExpectation, expectation: MetricsExpectation) -> Self {
        Self {
            common,
            expectation,
        }
    }

    fn metrics(&self, data: &RunData) -> Result<Arc<dyn Metrics>> {
        let key = metrics_key(&self.expectation.id);
        match data.load(&key) {
            Some(RuntimeValue::Metrics(metrics)) => Ok(metrics),
            Some(other) => Err(Error::InvalidDataType {
                kind: "metrics",
                key,
                found: other.kind(),
            }),
            None => Err(Error::DataNotFound {
                kind: "metrics",
                key,
            }),
        }
    }

    /// Rules are evaluated in order; the first one failing decides.
    pub(crate) fn check(&self, data: &RunData) -> Result<bool> {
        let metrics = self.metrics(data)?;
        let failed = |source| Error::MetricsCheck {
            id: self.expectation.id.clone(),
            source,
        };
        for rule in &self.expectation.rules {
            let metric = metrics.find(&rule.metric).map_err(failed)?;
            if !metric.compare(rule.operator, rule.value).map_err(failed)? {
                debug!(
                    "Metric rule {} {} {} does not hold",
                    rule.metric, rule.operator, rule.value
                );
                return Ok(self.common.not_matched());
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl Action for MetricsAction {
    async fn execute(&self, _ctx: &ActionContext, data: &RunData) -> Result<bool> {
        self.check(data)
    }

    fn timeout(&self) -> Duration {
        self.common.timeout()
    }

    fn when(&self) -> When {
        self.common.when()
    }

    fn on_failure(&self) -> OnFailure {
        self.common.on_failure()
    }

    fn describe(&self) -> String {
        self.common.describe("metrics")
    }
}
