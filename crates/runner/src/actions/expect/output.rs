//! Output expectation action

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use wst_common::runtime::command_key;
use wst_common::{Parameters, RunData, RuntimeValue};

use crate::actions::expect::CommonExpectation;
use crate::actions::{Action, OnFailure, When};
use crate::error::{Error, Result};
use crate::expectations::{OrderType, OutputExpectation};
use crate::matcher::Matcher;
use crate::scanner::{ActionContext, OutputScanner, ScanError};
use crate::services::OutputReader;

/// Matches expected messages against lines of service or command output
#[derive(Debug, Clone)]
pub struct OutputAction {
    common: CommonExpectation,
    expectation: OutputExpectation,
    parameters: Parameters,
}

impl OutputAction {
    pub fn new(
        common: CommonExpectation,
        expectation: OutputExpectation,
        parameters: Parameters,
    ) -> Self {
        Self {
            common,
            expectation,
            parameters,
        }
    }

    pub fn expectation(&self) -> &OutputExpectation {
        &self.expectation
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    fn matchers(&self) -> Result<Vec<Matcher>> {
        let service = self.common.service();
        self.expectation
            .messages
            .iter()
            .map(|message| {
                let message = if self.expectation.render_template {
                    service.render_template(message, &self.parameters)?
                } else {
                    message.clone()
                };
                Matcher::new(self.expectation.match_type, &message)
            })
            .collect()
    }

    async fn scanner(
        &self,
        ctx: &ActionContext,
        data: &RunData,
    ) -> Result<OutputScanner<OutputReader>> {
        let output_type = self.expectation.output_type;
        if self.expectation.command.is_empty() {
            return self.common.service().output_scanner(ctx, output_type).await;
        }

        let key = command_key(&self.expectation.command);
        match data.load(&key) {
            Some(RuntimeValue::Command(output)) => {
                Ok(OutputScanner::new(output.reader(output_type), ctx.clone()))
            }
            Some(other) => Err(Error::InvalidDataType {
                kind: "command",
                key,
                found: other.kind(),
            }),
            None => Err(Error::DataNotFound {
                kind: "command",
                key,
            }),
        }
    }

    /// Remove the message matched by `line`, if any.
    fn consume(&self, remaining: &mut Vec<Matcher>, line: &str) -> bool {
        let position = match self.expectation.order_type {
            OrderType::Fixed => remaining.first().filter(|m| m.is_match(line)).map(|_| 0),
            OrderType::Random => remaining.iter().position(|m| m.is_match(line)),
        };
        match position {
            Some(index) => {
                let matched = remaining.remove(index);
                debug!("Matched output message {:?}", matched.pattern());
                true
            }
            None => false,
        }
    }

    pub(crate) async fn check(&self, ctx: &ActionContext, data: &RunData) -> Result<bool> {
        let mut remaining = self.matchers()?;
        if remaining.is_empty() {
            return Ok(true);
        }

        let mut scanner = self.scanner(ctx, data).await?;
        loop {
            match scanner.next_line().await {
                Ok(Some(line)) => {
                    self.consume(&mut remaining, &line);
                    if remaining.is_empty() {
                        return Ok(true);
                    }
                }
                Ok(None) => {
                    debug!(
                        "Output ended with {} unmatched message(s), first {:?}",
                        remaining.len(),
                        remaining[0].pattern()
                    );
                    return Ok(self.common.not_matched());
                }
                Err(ScanError::DeadlineExceeded) => {
                    debug!(
                        "Output deadline exceeded with {} unmatched message(s)",
                        remaining.len()
                    );
                    return Ok(false);
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

#[async_trait]
impl Action for OutputAction {
    async fn execute(&self, ctx: &ActionContext, data: &RunData) -> Result<bool> {
        self.check(ctx, data).await
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
        self.common.describe("output")
    }
}
