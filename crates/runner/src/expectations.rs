//! Expectation definitions
//!
//! Typed, validated forms of the `output`, `response` and `metrics`
//! expectation blocks. [`ExpectationsMaker`] is the only way to build them
//! from configuration; it rejects any enumerated value outside its whitelist
//! and otherwise copies values through untouched.

use std::collections::HashMap;
use std::fmt;

use wst_common::types::{
    MetricsExpectationConfig, OutputExpectationConfig, ResponseExpectationConfig,
};
use wst_common::{MetricOperator, OutputType};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderType {
    Fixed,
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType {
    Exact,
    Regexp,
    Prefix,
    Suffix,
    Infix,
}

impl MatchType {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "exact" => Some(MatchType::Exact),
            "regexp" => Some(MatchType::Regexp),
            "prefix" => Some(MatchType::Prefix),
            "suffix" => Some(MatchType::Suffix),
            "infix" => Some(MatchType::Infix),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Exact => "exact",
            MatchType::Regexp => "regexp",
            MatchType::Prefix => "prefix",
            MatchType::Suffix => "suffix",
            MatchType::Infix => "infix",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputExpectation {
    /// Empty reads the live service output
    pub command: String,
    pub order_type: OrderType,
    pub match_type: MatchType,
    pub output_type: OutputType,
    pub messages: Vec<String>,
    pub render_template: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseExpectation {
    pub request: String,
    pub headers: HashMap<String, String>,
    pub body_content: String,
    /// `None` skips the body comparison
    pub body_match: Option<MatchType>,
    pub body_render_template: bool,
    /// Zero skips the status check
    pub status_code: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricRule {
    pub metric: String,
    pub operator: MetricOperator,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricsExpectation {
    pub id: String,
    pub rules: Vec<MetricRule>,
}

/// Exactly one kind of expectation
#[derive(Debug, Clone, PartialEq)]
pub enum ExpectationKind {
    Output(OutputExpectation),
    Response(ResponseExpectation),
    Metrics(MetricsExpectation),
}

impl ExpectationKind {
    pub fn name(&self) -> &'static str {
        match self {
            ExpectationKind::Output(_) => "output",
            ExpectationKind::Response(_) => "response",
            ExpectationKind::Metrics(_) => "metrics",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExpectationsMaker;

impl ExpectationsMaker {
    pub fn new() -> Self {
        Self
    }

    pub fn make_output_expectation(
        &self,
        config: &OutputExpectationConfig,
    ) -> Result<OutputExpectation> {
        let order_type = match config.order.as_str() {
            "fixed" => OrderType::Fixed,
            "random" => OrderType::Random,
            other => return Err(invalid("output order", other)),
        };
        let match_type = MatchType::parse(&config.match_type)
            .ok_or_else(|| invalid("output match", &config.match_type))?;
        let output_type = match config.output_type.as_str() {
            "any" => OutputType::Any,
            "stdout" => OutputType::Stdout,
            "stderr" => OutputType::Stderr,
            other => return Err(invalid("output type", other)),
        };

        Ok(OutputExpectation {
            command: config.command.clone(),
            order_type,
            match_type,
            output_type,
            messages: config.messages.clone(),
            render_template: config.render_template,
        })
    }

    pub fn make_response_expectation(
        &self,
        config: &ResponseExpectationConfig,
    ) -> Result<ResponseExpectation> {
        let body_match = match config.body.match_type.as_str() {
            "" => None,
            other => Some(
                MatchType::parse(other).ok_or_else(|| invalid("response body match", other))?,
            ),
        };

        Ok(ResponseExpectation {
            request: config.request.clone(),
            headers: config.headers.clone(),
            body_content: config.body.content.clone(),
            body_match,
            body_render_template: config.body.render_template,
            status_code: config.status,
        })
    }

    pub fn make_metrics_expectation(
        &self,
        config: &MetricsExpectationConfig,
    ) -> Result<MetricsExpectation> {
        let rules = config
            .rules
            .iter()
            .map(|rule| {
                let operator = rule
                    .operator
                    .parse::<MetricOperator>()
                    .map_err(|_| invalid("metrics rule operator", &rule.operator))?;
                Ok(MetricRule {
                    metric: rule.metric.clone(),
                    operator,
                    value: rule.value,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(MetricsExpectation {
            id: config.id.clone(),
            rules,
        })
    }
}

fn invalid(field: &'static str, value: &str) -> Error {
    Error::InvalidValue {
        field,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;
    use wst_common::types::{MetricRuleConfig, ResponseBodyConfig};

    fn output_config(order: &str, match_type: &str, output_type: &str) -> OutputExpectationConfig {
        OutputExpectationConfig {
            command: String::new(),
            order: order.to_string(),
            match_type: match_type.to_string(),
            output_type: output_type.to_string(),
            messages: vec!["ready".to_string()],
            render_template: true,
        }
    }

    #[test]
    fn test_make_output_expectation() {
        let maker = ExpectationsMaker::new();
        let exp = maker
            .make_output_expectation(&output_config("random", "suffix", "stderr"))
            .unwrap();
        assert_eq!(
            exp,
            OutputExpectation {
                command: String::new(),
                order_type: OrderType::Random,
                match_type: MatchType::Suffix,
                output_type: OutputType::Stderr,
                messages: vec!["ready".to_string()],
                render_template: true,
            }
        );
    }

    #[test_case("sorted", "exact", "any", "output order"; "bad order")]
    #[test_case("fixed", "glob", "any", "output match"; "bad match")]
    #[test_case("fixed", "exact", "stdin", "output type"; "bad type")]
    #[test_case("fixed", "", "any", "output match"; "empty match")]
    fn test_make_output_expectation_rejects(order: &str, m: &str, t: &str, field: &str) {
        let err = ExpectationsMaker::new()
            .make_output_expectation(&output_config(order, m, t))
            .unwrap_err();
        match err {
            Error::InvalidValue { field: f, .. } => assert_eq!(f, field),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test_case("", None; "empty is none")]
    #[test_case("exact", Some(MatchType::Exact); "exact")]
    #[test_case("regexp", Some(MatchType::Regexp); "regexp")]
    #[test_case("infix", Some(MatchType::Infix); "infix")]
    fn test_make_response_expectation_body_match(raw: &str, expected: Option<MatchType>) {
        let config = ResponseExpectationConfig {
            request: "last".to_string(),
            headers: HashMap::from([("content-type".to_string(), "text/plain".to_string())]),
            body: ResponseBodyConfig {
                content: "ok".to_string(),
                match_type: raw.to_string(),
                render_template: false,
            },
            status: 200,
        };
        let exp = ExpectationsMaker::new().make_response_expectation(&config).unwrap();
        assert_eq!(exp.body_match, expected);
        assert_eq!(exp.status_code, 200);
        assert_eq!(exp.body_content, "ok");
        assert_eq!(exp.headers["content-type"], "text/plain");
    }

    #[test]
    fn test_make_response_expectation_rejects_match() {
        let mut config = ResponseExpectationConfig::default();
        config.body.match_type = "none".to_string();
        let err = ExpectationsMaker::new()
            .make_response_expectation(&config)
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid response body match value: none");
    }

    #[test]
    fn test_make_metrics_expectation() {
        let config = MetricsExpectationConfig {
            id: "status".to_string(),
            rules: vec![
                MetricRuleConfig {
                    metric: "active processes".to_string(),
                    operator: "ge".to_string(),
                    value: 1.0,
                },
                MetricRuleConfig {
                    metric: "idle processes".to_string(),
                    operator: "lt".to_string(),
                    value: 5.0,
                },
            ],
        };
        let exp = ExpectationsMaker::new().make_metrics_expectation(&config).unwrap();
        assert_eq!(exp.id, "status");
        assert_eq!(exp.rules[0].operator, MetricOperator::Ge);
        assert_eq!(exp.rules[1].operator, MetricOperator::Lt);
    }

    #[test]
    fn test_make_metrics_expectation_cites_first_bad_operator() {
        let config = MetricsExpectationConfig {
            id: "last".to_string(),
            rules: vec![
                MetricRuleConfig {
                    metric: "a".to_string(),
                    operator: "eq".to_string(),
                    value: 1.0,
                },
                MetricRuleConfig {
                    metric: "b".to_string(),
                    operator: "gte".to_string(),
                    value: 1.0,
                },
                MetricRuleConfig {
                    metric: "c".to_string(),
                    operator: "lte".to_string(),
                    value: 1.0,
                },
            ],
        };
        let err = ExpectationsMaker::new()
            .make_metrics_expectation(&config)
            .unwrap_err();
        assert!(err.to_string().ends_with("gte"), "{}", err);
    }
}
