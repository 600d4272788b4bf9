//! Typed parameter values
//!
//! Parameters are the values threaded into template rendering. They are
//! loosely typed: every value can be read back as any scalar kind, which
//! mirrors how spec authors write them in YAML.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::error::{Error, Result};

/// A single parameter value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Parameter {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<Parameter>),
    Map(Parameters),
}

impl Parameter {
    /// Convert a raw YAML value, naming `name` in any error.
    pub fn make(name: &str, value: &serde_yaml::Value) -> Result<Self> {
        use serde_yaml::Value;

        match value {
            Value::Bool(b) => Ok(Parameter::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Parameter::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(Parameter::Float(f))
                } else {
                    Err(invalid(name, format!("unsupported number {}", n)))
                }
            }
            Value::String(s) => Ok(Parameter::String(s.clone())),
            Value::Sequence(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| Parameter::make(&format!("{}[{}]", name, i), item))
                .collect::<Result<Vec<_>>>()
                .map(Parameter::Array),
            Value::Mapping(mapping) => {
                let mut params = Parameters::new();
                for (key, item) in mapping {
                    let key = key
                        .as_str()
                        .ok_or_else(|| invalid(name, "map keys must be strings"))?;
                    let nested = format!("{}.{}", name, key);
                    params.insert(key, Parameter::make(&nested, item)?);
                }
                Ok(Parameter::Map(params))
            }
            Value::Null => Err(invalid(name, "null values are not supported")),
            Value::Tagged(tagged) => Err(invalid(
                name,
                format!("tagged values are not supported ({})", tagged.tag),
            )),
        }
    }

    pub fn to_bool(&self) -> bool {
        match self {
            Parameter::Bool(b) => *b,
            Parameter::Int(i) => *i != 0,
            Parameter::Float(f) => *f != 0.0,
            Parameter::String(s) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "true" | "yes" | "on" | "1"
            ),
            Parameter::Array(items) => !items.is_empty(),
            Parameter::Map(map) => !map.is_empty(),
        }
    }

    pub fn to_int(&self) -> i64 {
        match self {
            Parameter::Bool(b) => i64::from(*b),
            Parameter::Int(i) => *i,
            Parameter::Float(f) => *f as i64,
            Parameter::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
                    .unwrap_or(0)
            }
            Parameter::Array(_) | Parameter::Map(_) => 0,
        }
    }

    pub fn to_float(&self) -> f64 {
        match self {
            Parameter::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Parameter::Int(i) => *i as f64,
            Parameter::Float(f) => *f,
            Parameter::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
            Parameter::Array(_) | Parameter::Map(_) => 0.0,
        }
    }

    /// Scalars become a single element array.
    pub fn to_array(&self) -> Vec<Parameter> {
        match self {
            Parameter::Array(items) => items.clone(),
            other => vec![other.clone()],
        }
    }

    /// Non-map values yield an empty map.
    pub fn to_map(&self) -> Parameters {
        match self {
            Parameter::Map(map) => map.clone(),
            _ => Parameters::new(),
        }
    }
}

fn invalid(name: &str, reason: impl Into<String>) -> Error {
    Error::InvalidParameter {
        name: name.to_string(),
        reason: reason.into(),
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parameter::Bool(b) => write!(f, "{}", b),
            Parameter::Int(i) => write!(f, "{}", i),
            Parameter::Float(v) => write!(f, "{}", v),
            Parameter::String(s) => write!(f, "{}", s),
            Parameter::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Parameter::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<bool> for Parameter {
    fn from(value: bool) -> Self {
        Parameter::Bool(value)
    }
}

impl From<i64> for Parameter {
    fn from(value: i64) -> Self {
        Parameter::Int(value)
    }
}

impl From<f64> for Parameter {
    fn from(value: f64) -> Self {
        Parameter::Float(value)
    }
}

impl From<&str> for Parameter {
    fn from(value: &str) -> Self {
        Parameter::String(value.to_string())
    }
}

impl From<String> for Parameter {
    fn from(value: String) -> Self {
        Parameter::String(value)
    }
}

/// Named parameter values
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Parameters {
    values: BTreeMap<String, Parameter>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build parameters from raw YAML configuration.
    pub fn make(raw: &HashMap<String, serde_yaml::Value>) -> Result<Self> {
        let mut params = Parameters::new();
        for (name, value) in raw {
            params.insert(name.clone(), Parameter::make(name, value)?);
        }
        Ok(params)
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Parameter>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Parameter)> {
        self.values.iter()
    }

    /// Low-priority merge: keys already present in `self` win.
    pub fn inherit(mut self, other: &Parameters) -> Self {
        self.inherit_from(other);
        self
    }

    pub fn inherit_from(&mut self, other: &Parameters) {
        for (name, value) in &other.values {
            self.values
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }
    }
}

impl<K: Into<String>, V: Into<Parameter>> FromIterator<(K, V)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Parameters::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}
