//! Custom expectation action
//!
//! Runs an expectation the target server declares under `actions.expect`.
//! Parameters resolve with the action's own values first, then the named
//! expectation's, then the server's.

use async_trait::async_trait;
use std::time::Duration;

use wst_common::types::CustomExpectationConfig;
use wst_common::{Parameters, RunData};

use crate::actions::expect::{CommonExpectation, MetricsAction, OutputAction, ResponseAction};
use crate::actions::{Action, OnFailure, When};
use crate::error::{Error, Result};
use crate::expectations::ExpectationKind;
use crate::scanner::ActionContext;

/// Matching logic selected from the server expectation's kind
#[derive(Debug, Clone)]
pub enum CustomExpectation {
    Output(OutputAction),
    Response(ResponseAction),
    Metrics(MetricsAction),
}

#[derive(Debug, Clone)]
pub struct CustomAction {
    name: String,
    common: CommonExpectation,
    expectation: CustomExpectation,
}

impl CustomAction {
    /// Resolve `config.name` on the service's server.
    ///
    /// `action_parameters` are the parameters of the enclosing action config.
    pub fn make(
        common: CommonExpectation,
        config: &CustomExpectationConfig,
        action_parameters: Parameters,
    ) -> Result<Self> {
        let service = common.service();
        let server = service.server();
        let expect = server
            .expect_action(&config.name)
            .ok_or_else(|| Error::ExpectationNotFound {
                name: config.name.clone(),
                server: server.key().to_string(),
            })?;

        let parameters = Parameters::make(&config.parameters)?
            .inherit(&action_parameters)
            .inherit(expect.parameters())
            .inherit(&service.server_parameters());

        let expectation = match expect.kind() {
            ExpectationKind::Output(output) => CustomExpectation::Output(OutputAction::new(
                common.clone(),
                output.clone(),
                parameters,
            )),
            ExpectationKind::Response(response) => CustomExpectation::Response(
                ResponseAction::new(common.clone(), response.clone(), parameters),
            ),
            ExpectationKind::Metrics(metrics) => {
                CustomExpectation::Metrics(MetricsAction::new(common.clone(), metrics.clone()))
            }
        };

        Ok(Self {
            name: config.name.clone(),
            common,
            expectation,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expectation(&self) -> &CustomExpectation {
        &self.expectation
    }
}

#[async_trait]
impl Action for CustomAction {
    async fn execute(&self, ctx: &ActionContext, data: &RunData) -> Result<bool> {
        match &self.expectation {
            CustomExpectation::Output(action) => action.check(ctx, data).await,
            CustomExpectation::Response(action) => action.check(data),
            CustomExpectation::Metrics(action) => action.check(data),
        }
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
        self.common.describe(&format!("custom {}", self.name))
    }
}
