//! Server config files and templates

use std::collections::HashMap;

use wst_common::types::{ServerConfigFile, ServerTemplate};
use wst_common::Parameters;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub file: String,
    pub parameters: Parameters,
}

/// Named config files of a server
#[derive(Debug, Clone, Default)]
pub struct Configs {
    configs: HashMap<String, Config>,
}

impl Configs {
    pub fn make(raw: &HashMap<String, ServerConfigFile>) -> Result<Self> {
        let mut configs = HashMap::with_capacity(raw.len());
        for (name, config) in raw {
            configs.insert(
                name.clone(),
                Config {
                    file: config.file.clone(),
                    parameters: Parameters::make(&config.parameters)?,
                },
            );
        }
        Ok(Self { configs })
    }

    pub fn get(&self, name: &str) -> Option<&Config> {
        self.configs.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.configs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// Add configs of `parent` this server does not define.
    pub fn inherit(&mut self, parent: &Configs) {
        for (name, config) in &parent.configs {
            self.configs
                .entry(name.clone())
                .or_insert_with(|| config.clone());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub file: String,
}

/// Named templates of a server
#[derive(Debug, Clone, Default)]
pub struct Templates {
    templates: HashMap<String, Template>,
}

impl Templates {
    pub fn make(raw: &HashMap<String, ServerTemplate>) -> Self {
        Self {
            templates: raw
                .iter()
                .map(|(name, t)| (name.clone(), Template { file: t.file.clone() }))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.templates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn inherit(&mut self, parent: &Templates) {
        for (name, template) in &parent.templates {
            self.templates
                .entry(name.clone())
                .or_insert_with(|| template.clone());
        }
    }
}
