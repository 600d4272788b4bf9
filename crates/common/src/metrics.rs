//! Metric values captured from services
//!
//! A metrics snapshot is stored on the runtime blackboard by whatever action
//! scraped it; expectation actions only ever look metrics up and compare them.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};

/// Relational operator used by metric rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricOperator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl MetricOperator {
    /// Evaluate `lhs <op> rhs`.
    pub fn apply(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            MetricOperator::Eq => lhs == rhs,
            MetricOperator::Ne => lhs != rhs,
            MetricOperator::Gt => lhs > rhs,
            MetricOperator::Ge => lhs >= rhs,
            MetricOperator::Lt => lhs < rhs,
            MetricOperator::Le => lhs <= rhs,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricOperator::Eq => "eq",
            MetricOperator::Ne => "ne",
            MetricOperator::Gt => "gt",
            MetricOperator::Ge => "ge",
            MetricOperator::Lt => "lt",
            MetricOperator::Le => "le",
        }
    }
}

impl FromStr for MetricOperator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "eq" => Ok(MetricOperator::Eq),
            "ne" => Ok(MetricOperator::Ne),
            "gt" => Ok(MetricOperator::Gt),
            "ge" => Ok(MetricOperator::Ge),
            "lt" => Ok(MetricOperator::Lt),
            "le" => Ok(MetricOperator::Le),
            other => Err(Error::InvalidOperator(other.to_string())),
        }
    }
}

impl fmt::Display for MetricOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single named metric
pub trait Metric: Send + Sync {
    fn name(&self) -> &str;

    /// Compare the metric against `value` using `operator`.
    fn compare(&self, operator: MetricOperator, value: f64) -> Result<bool>;
}

/// A set of metrics captured at one point in time
pub trait Metrics: Send + Sync {
    fn find(&self, name: &str) -> Result<Arc<dyn Metric>>;
}

/// Raw metric value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Number(f64),
    /// Compared in milliseconds
    Duration(Duration),
}

impl MetricValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            MetricValue::Number(n) => *n,
            MetricValue::Duration(d) => d.as_secs_f64() * 1000.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NamedMetric {
    name: String,
    value: MetricValue,
}

impl NamedMetric {
    pub fn new(name: impl Into<String>, value: MetricValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn value(&self) -> MetricValue {
        self.value
    }
}

impl Metric for NamedMetric {
    fn name(&self) -> &str {
        &self.name
    }

    fn compare(&self, operator: MetricOperator, value: f64) -> Result<bool> {
        let current = self.value.as_f64();
        if current.is_nan() || value.is_nan() {
            return Err(Error::Incomparable {
                metric: self.name.clone(),
                reason: "value is not a number".to_string(),
            });
        }
        Ok(operator.apply(current, value))
    }
}

/// In-memory metrics snapshot
#[derive(Clone, Default)]
pub struct MetricSet {
    metrics: HashMap<String, Arc<NamedMetric>>,
}

impl MetricSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: MetricValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: MetricValue) {
        self.metrics
            .insert(name.to_string(), Arc::new(NamedMetric::new(name, value)));
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

impl Metrics for MetricSet {
    fn find(&self, name: &str) -> Result<Arc<dyn Metric>> {
        self.metrics
            .get(name)
            .map(|m| m.clone() as Arc<dyn Metric>)
            .ok_or_else(|| Error::MetricNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("eq", MetricOperator::Eq)]
    #[test_case("ne", MetricOperator::Ne)]
    #[test_case("gt", MetricOperator::Gt)]
    #[test_case("ge", MetricOperator::Ge)]
    #[test_case("lt", MetricOperator::Lt)]
    #[test_case("le", MetricOperator::Le)]
    fn test_operator_whitelist(raw: &str, expected: MetricOperator) {
        let op: MetricOperator = raw.parse().unwrap();
        assert_eq!(op, expected);
        assert_eq!(op.as_str(), raw);
    }

    #[test_case("=="; "symbolic")]
    #[test_case("EQ"; "uppercase")]
    #[test_case(""; "empty")]
    fn test_operator_rejects(raw: &str) {
        let err = raw.parse::<MetricOperator>().unwrap_err();
        assert!(matches!(err, Error::InvalidOperator(op) if op == raw));
    }

    #[test]
    fn test_compare_number() {
        let set = MetricSet::new().with("accepted conn", MetricValue::Number(10.0));
        let metric = set.find("accepted conn").unwrap();
        assert!(metric.compare(MetricOperator::Lt, 12.0).unwrap());
        assert!(metric.compare(MetricOperator::Ge, 10.0).unwrap());
        assert!(!metric.compare(MetricOperator::Ne, 10.0).unwrap());
    }

    #[test]
    fn test_compare_duration_in_millis() {
        let set = MetricSet::new().with(
            "request duration",
            MetricValue::Duration(Duration::from_millis(1500)),
        );
        let metric = set.find("request duration").unwrap();
        assert!(metric.compare(MetricOperator::Eq, 1500.0).unwrap());
        assert!(metric.compare(MetricOperator::Gt, 1000.0).unwrap());
    }

    #[test]
    fn test_find_missing() {
        let err = MetricSet::new().find("idle processes").err().unwrap();
        assert!(matches!(err, Error::MetricNotFound(name) if name == "idle processes"));
    }

    #[test]
    fn test_nan_is_incomparable() {
        let metric = NamedMetric::new("load", MetricValue::Number(f64::NAN));
        assert!(metric.compare(MetricOperator::Eq, 1.0).is_err());
    }
}
