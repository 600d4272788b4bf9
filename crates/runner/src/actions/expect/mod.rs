//! Expectation actions
//!
//! Each action pairs a [`CommonExpectation`] (target service, timeout and
//! gating) with one typed expectation and evaluates it against live output or
//! data captured earlier in the run.

pub mod custom;
pub mod metrics;
pub mod output;
pub mod response;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use wst_common::types::ExpectationActionConfig;
use wst_common::{Foundation, Parameters};

use crate::actions::{Action, OnFailure, When};
use crate::error::{Error, Result};
use crate::expectations::ExpectationsMaker;
use crate::services::{Service, ServiceLocator};

pub use custom::CustomAction;
pub use metrics::MetricsAction;
pub use output::OutputAction;
pub use response::ResponseAction;

/// Target service, timeout and gating shared by all expectation actions
#[derive(Clone)]
pub struct CommonExpectation {
    service: Arc<dyn Service>,
    timeout: Duration,
    when: When,
    on_failure: OnFailure,
    foundation: Foundation,
}

impl fmt::Debug for CommonExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommonExpectation")
            .field("service", &self.service.name())
            .field("timeout", &self.timeout)
            .field("when", &self.when)
            .field("on_failure", &self.on_failure)
            .field("foundation", &self.foundation)
            .finish()
    }
}

impl CommonExpectation {
    pub fn service(&self) -> &Arc<dyn Service> {
        &self.service
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn when(&self) -> When {
        self.when
    }

    pub fn on_failure(&self) -> OnFailure {
        self.on_failure
    }

    pub fn dry_run(&self) -> bool {
        self.foundation.dry_run()
    }

    /// Outcome of a failed comparison: a dry run pretends it passed.
    pub(crate) fn not_matched(&self) -> bool {
        self.dry_run()
    }

    pub(crate) fn describe(&self, kind: &str) -> String {
        format!("{} expectation on service {}", kind, self.service.name())
    }
}

/// Builds expectation actions from their configs
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpectationActionMaker {
    expectations: ExpectationsMaker,
    foundation: Foundation,
}

impl ExpectationActionMaker {
    pub fn new(foundation: Foundation) -> Self {
        Self {
            expectations: ExpectationsMaker::new(),
            foundation,
        }
    }

    pub fn expectations(&self) -> &ExpectationsMaker {
        &self.expectations
    }

    /// Resolve the service, timeout and gating of an expectation action.
    ///
    /// Timeouts are milliseconds; zero selects `default_timeout`.
    pub fn make_common_expectation(
        &self,
        locator: &dyn ServiceLocator,
        service_name: &str,
        timeout: u64,
        default_timeout: u64,
        when: &str,
        on_failure: &str,
    ) -> Result<CommonExpectation> {
        let service = locator.find(service_name)?;

        let timeout = if timeout != 0 { timeout } else { default_timeout };
        if timeout == 0 {
            return Err(Error::InvalidTimeout(service_name.to_string()));
        }

        Ok(CommonExpectation {
            service,
            timeout: Duration::from_millis(timeout),
            when: when.parse()?,
            on_failure: on_failure.parse()?,
            foundation: self.foundation,
        })
    }

    pub fn make(
        &self,
        config: &ExpectationActionConfig,
        locator: &dyn ServiceLocator,
        default_timeout: u64,
    ) -> Result<Box<dyn Action>> {
        let common = self.make_common_expectation(
            locator,
            &config.service,
            config.timeout,
            default_timeout,
            &config.when,
            &config.on_failure,
        )?;
        let parameters = Parameters::make(&config.parameters)?;
        let label = format!("action on service {}", config.service);

        let action: Box<dyn Action> =
            match (&config.output, &config.response, &config.metrics, &config.custom) {
                (Some(output), None, None, None) => {
                    let parameters = parameters.inherit(&common.service().server_parameters());
                    let expectation = self.expectations.make_output_expectation(output)?;
                    Box::new(OutputAction::new(common, expectation, parameters))
                }
                (None, Some(response), None, None) => {
                    let parameters = parameters.inherit(&common.service().server_parameters());
                    let expectation = self.expectations.make_response_expectation(response)?;
                    Box::new(ResponseAction::new(common, expectation, parameters))
                }
                (None, None, Some(metrics), None) => {
                    let expectation = self.expectations.make_metrics_expectation(metrics)?;
                    Box::new(MetricsAction::new(common, expectation))
                }
                (None, None, None, Some(custom)) => {
                    Box::new(CustomAction::make(common, custom, parameters)?)
                }
                (None, None, None, None) => return Err(Error::ExpectationNotSet(label)),
                _ => return Err(Error::MultipleExpectations(label)),
            };
        Ok(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::StaticServiceLocator;
    use crate::testing::MockService;
    use test_case::test_case;

    fn locator() -> StaticServiceLocator {
        StaticServiceLocator::new().with(Arc::new(MockService::new("fpm")))
    }

    fn maker() -> ExpectationActionMaker {
        ExpectationActionMaker::new(Foundation::default())
    }

    #[test_case(0, 5000, 5000; "zero uses default")]
    #[test_case(3000, 5000, 3000; "explicit overrides default")]
    #[test_case(250, 0, 250; "explicit without default")]
    fn test_timeout_resolution(timeout: u64, default_timeout: u64, millis: u64) {
        let common = maker()
            .make_common_expectation(
                &locator(),
                "fpm",
                timeout,
                default_timeout,
                "always",
                "ignore",
            )
            .unwrap();
        assert_eq!(common.timeout(), Duration::from_millis(millis));
        assert_eq!(common.timeout().as_nanos(), millis as u128 * 1_000_000);
        assert_eq!(common.when(), When::Always);
        assert_eq!(common.on_failure(), OnFailure::Ignore);
        assert_eq!(common.service().name(), "fpm");
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = maker()
            .make_common_expectation(&locator(), "fpm", 0, 0, "on_success", "fail")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTimeout(service) if service == "fpm"));
    }

    #[test]
    fn test_service_lookup_error_propagates() {
        let err = maker()
            .make_common_expectation(&locator(), "nginx", 0, 5000, "on_success", "fail")
            .unwrap_err();
        assert_eq!(err.to_string(), "Service nginx not found");
    }

    #[test_case("sometimes", "fail", "action when"; "bad when")]
    #[test_case("always", "retry", "action on_failure"; "bad on failure")]
    fn test_gating_validated(when: &str, on_failure: &str, field: &str) {
        let err = maker()
            .make_common_expectation(&locator(), "fpm", 0, 5000, when, on_failure)
            .unwrap_err();
        match err {
            Error::InvalidValue { field: f, .. } => assert_eq!(f, field),
            other => panic!("unexpected error {other}"),
        }
    }

    fn config(yaml: &str) -> ExpectationActionConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_make_dispatches_on_kind() {
        let action = maker()
            .make(
                &config("service: fpm\ntimeout: 100\noutput: {messages: [ready]}\n"),
                &locator(),
                5000,
            )
            .unwrap();
        assert_eq!(action.timeout(), Duration::from_millis(100));
        assert_eq!(action.describe(), "output expectation on service fpm");

        let action = maker()
            .make(&config("service: fpm\nmetrics: {rules: []}\n"), &locator(), 5000)
            .unwrap();
        assert_eq!(action.timeout(), Duration::from_millis(5000));
        assert_eq!(action.describe(), "metrics expectation on service fpm");
    }

    #[test]
    fn test_make_requires_exactly_one_kind() {
        let err = maker()
            .make(&config("service: fpm\n"), &locator(), 5000)
            .err()
            .unwrap();
        assert!(matches!(err, Error::ExpectationNotSet(_)));

        let err = maker()
            .make(
                &config("service: fpm\noutput: {messages: [a]}\nresponse: {status: 200}\n"),
                &locator(),
                5000,
            )
            .err()
            .unwrap();
        assert!(matches!(err, Error::MultipleExpectations(_)));
    }
}
