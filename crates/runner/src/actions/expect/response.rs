//! Response expectation action

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use wst_common::runtime::response_key;
use wst_common::{Parameters, ResponseData, RunData, RuntimeValue};

use crate::actions::expect::CommonExpectation;
use crate::actions::{Action, OnFailure, When};
use crate::error::{Error, Result};
use crate::expectations::ResponseExpectation;
use crate::matcher::Matcher;
use crate::scanner::ActionContext;

/// Compares a captured response with the expected status, headers and body
#[derive(Debug, Clone)]
pub struct ResponseAction {
    common: CommonExpectation,
    expectation: ResponseExpectation,
    parameters: Parameters,
}

impl ResponseAction {
    pub fn new(
        common: CommonExpectation,
        expectation: ResponseExpectation,
        parameters: Parameters,
    ) -> Self {
        Self {
            common,
            expectation,
            parameters,
        }
    }

    pub fn expectation(&self) -> &ResponseExpectation {
        &self.expectation
    }

    fn response(&self, data: &RunData) -> Result<Arc<ResponseData>> {
        let key = response_key(&self.expectation.request);
        match data.load(&key) {
            Some(RuntimeValue::Response(response)) => Ok(response),
            Some(other) => Err(Error::InvalidDataType {
                kind: "response",
                key,
                found: other.kind(),
            }),
            None => Err(Error::DataNotFound {
                kind: "response",
                key,
            }),
        }
    }

    pub(crate) fn check(&self, data: &RunData) -> Result<bool> {
        let response = self.response(data)?;
        let expectation = &self.expectation;

        if expectation.status_code != 0 && expectation.status_code != response.status {
            debug!(
                "Response status {} does not match expected {}",
                response.status, expectation.status_code
            );
            return Ok(self.common.not_matched());
        }

        for (name, expected) in &expectation.headers {
            match response.header(name) {
                Some(value) if value == expected => {}
                value => {
                    debug!(
                        "Response header {} is {:?}, expected {:?}",
                        name, value, expected
                    );
                    return Ok(self.common.not_matched());
                }
            }
        }

        let Some(body_match) = expectation.body_match else {
            return Ok(true);
        };
        let content = if expectation.body_render_template {
            self.common
                .service()
                .render_template(&expectation.body_content, &self.parameters)?
        } else {
            expectation.body_content.clone()
        };
        if !Matcher::new(body_match, &content)?.is_match(&response.body) {
            debug!("Response body does not {} match {:?}", body_match, content);
            return Ok(self.common.not_matched());
        }
        Ok(true)
    }
}

#[async_trait]
impl Action for ResponseAction {
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
        self.common.describe("response")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::expect::ExpectationActionMaker;
    use crate::expectations::MatchType;
    use crate::services::StaticServiceLocator;
    use crate::testing::MockService;
    use std::collections::HashMap;
    use wst_common::{Foundation, MetricSet};

    fn expectation(body: &str, body_match: Option<MatchType>, status: u16) -> ResponseExpectation {
        ResponseExpectation {
            request: "last".to_string(),
            headers: HashMap::new(),
            body_content: body.to_string(),
            body_match,
            body_render_template: false,
            status_code: status,
        }
    }

    fn action_with(
        service: MockService,
        dry_run: bool,
        expectation: ResponseExpectation,
    ) -> ResponseAction {
        let locator = StaticServiceLocator::new().with(Arc::new(service));
        let common = ExpectationActionMaker::new(Foundation::new(dry_run))
            .make_common_expectation(&locator, "fpm", 0, 5000, "on_success", "fail")
            .unwrap();
        ResponseAction::new(common, expectation, Parameters::from_iter([("name", "world")]))
    }

    fn action(dry_run: bool, expectation: ResponseExpectation) -> ResponseAction {
        action_with(MockService::new("fpm"), dry_run, expectation)
    }

    fn data(response: ResponseData) -> RunData {
        let data = RunData::new();
        data.store(response_key("last"), RuntimeValue::Response(Arc::new(response)));
        data
    }

    #[tokio::test]
    async fn test_exact_body_and_status() {
        let action = action(false, expectation("test", Some(MatchType::Exact), 200));
        let ctx = ActionContext::new();
        assert!(action.execute(&ctx, &data(ResponseData::new(200, "test"))).await.unwrap());
        assert!(!action.execute(&ctx, &data(ResponseData::new(201, "test"))).await.unwrap());
    }

    #[test]
    fn test_zero_status_is_not_checked() {
        let action = action(false, expectation("ok", Some(MatchType::Prefix), 0));
        assert!(action.check(&data(ResponseData::new(503, "ok then"))).unwrap());
    }

    #[test]
    fn test_headers_compare_first_value() {
        let mut exp = expectation("", None, 200);
        exp.headers.insert("Content-Type".to_string(), "text/plain".to_string());
        let action = action(false, exp);

        let response = ResponseData::new(200, "")
            .with_header("content-type", "text/plain")
            .with_header("content-type", "text/html");
        assert!(action.check(&data(response)).unwrap());

        let response = ResponseData::new(200, "").with_header("content-type", "text/html");
        assert!(!action.check(&data(response)).unwrap());
        assert!(!action.check(&data(ResponseData::new(200, ""))).unwrap());
    }

    #[test]
    fn test_no_body_match_skips_body() {
        let action = action(false, expectation("anything", None, 200));
        assert!(action.check(&data(ResponseData::new(200, "something else"))).unwrap());
    }

    #[test]
    fn test_body_match_types() {
        let body = "Hello, world!";
        let cases = [
            (MatchType::Regexp, r"^Hello, \w+!$", true),
            (MatchType::Prefix, "Hello", true),
            (MatchType::Suffix, "world!", true),
            (MatchType::Infix, "o, w", true),
            (MatchType::Exact, "Hello", false),
        ];
        for (match_type, content, expected) in cases {
            let action = action(false, expectation(content, Some(match_type), 0));
            assert_eq!(
                action.check(&data(ResponseData::new(200, body))).unwrap(),
                expected,
                "{} {}",
                match_type,
                content
            );
        }
    }

    #[test]
    fn test_rendered_body() {
        let mut exp = expectation("Hello, {{ name }}!", Some(MatchType::Exact), 200);
        exp.body_render_template = true;
        let action = action(false, exp);
        assert!(action.check(&data(ResponseData::new(200, "Hello, world!"))).unwrap());
    }

    #[test]
    fn test_render_error_propagates() {
        let mut exp = expectation("{{ name }}", Some(MatchType::Exact), 200);
        exp.body_render_template = true;
        let action = action_with(MockService::new("fpm").failing_render(), true, exp);
        assert!(action.check(&data(ResponseData::new(200, "world"))).is_err());
    }

    #[test]
    fn test_dry_run_upgrades_non_match() {
        let response = ResponseData::new(500, "error");
        let exp = expectation("ok", Some(MatchType::Exact), 200);
        assert!(!action(false, exp.clone()).check(&data(response.clone())).unwrap());
        assert!(action(true, exp).check(&data(response.clone())).unwrap());

        let exp = expectation("ok", Some(MatchType::Exact), 0);
        assert!(action(true, exp).check(&data(response)).unwrap());
    }

    #[test]
    fn test_invalid_regex_is_error_in_dry_run() {
        let action = action(true, expectation("te.a(a", Some(MatchType::Regexp), 0));
        let err = action.check(&data(ResponseData::new(200, "tera"))).unwrap_err();
        assert!(matches!(err, Error::Regex(_)));
    }

    #[test]
    fn test_missing_or_mistyped_data() {
        let action = action(true, expectation("", None, 0));
        let err = action.check(&RunData::new()).unwrap_err();
        assert_eq!(err.to_string(), "response data not found for response/last");

        let data = RunData::new();
        data.store(response_key("last"), RuntimeValue::Metrics(Arc::new(MetricSet::new())));
        let err = action.check(&data).unwrap_err();
        assert!(matches!(err, Error::InvalidDataType { found: "metrics", .. }));
    }
}
