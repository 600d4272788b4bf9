//! Sandbox descriptors of a server
//!
//! A sandbox describes where a server runs (local process or container).
//! Sandboxes are inheritable: a child server fills gaps in its own sandboxes
//! from the parent's, but two sandboxes of different kinds never merge.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use wst_common::types::{HookConfig, SandboxConfig, SandboxesConfig};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SandboxType {
    Local,
    Docker,
    Kubernetes,
}

impl SandboxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SandboxType::Local => "local",
            SandboxType::Docker => "docker",
            SandboxType::Kubernetes => "kubernetes",
        }
    }
}

impl FromStr for SandboxType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "local" => Ok(SandboxType::Local),
            "docker" => Ok(SandboxType::Docker),
            "kubernetes" => Ok(SandboxType::Kubernetes),
            other => Err(Error::InvalidValue {
                field: "sandbox",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for SandboxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hook {
    Command(String),
    Signal(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommonSandbox {
    pub available: Option<bool>,
    pub dirs: HashMap<String, String>,
    pub hooks: HashMap<String, Hook>,
}

impl CommonSandbox {
    fn inherit(&mut self, parent: &CommonSandbox) {
        if self.available.is_none() {
            self.available = parent.available;
        }
        for (name, dir) in &parent.dirs {
            self.dirs.entry(name.clone()).or_insert_with(|| dir.clone());
        }
        for (name, hook) in &parent.hooks {
            self.hooks.entry(name.clone()).or_insert_with(|| hook.clone());
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerImage {
    pub name: Option<String>,
    pub tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryAuth {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerSandbox {
    pub common: CommonSandbox,
    pub image: ContainerImage,
    pub registry: Option<RegistryAuth>,
}

impl ContainerSandbox {
    fn inherit(&mut self, parent: &ContainerSandbox) {
        self.common.inherit(&parent.common);
        if self.image.name.is_none() {
            self.image.name = parent.image.name.clone();
        }
        if self.image.tag.is_none() {
            self.image.tag = parent.image.tag.clone();
        }
        if self.registry.is_none() {
            self.registry = parent.registry.clone();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sandbox {
    Local(CommonSandbox),
    Docker(ContainerSandbox),
    Kubernetes(ContainerSandbox),
}

impl Sandbox {
    pub fn kind(&self) -> SandboxType {
        match self {
            Sandbox::Local(_) => SandboxType::Local,
            Sandbox::Docker(_) => SandboxType::Docker,
            Sandbox::Kubernetes(_) => SandboxType::Kubernetes,
        }
    }

    pub fn common(&self) -> &CommonSandbox {
        match self {
            Sandbox::Local(common) => common,
            Sandbox::Docker(c) | Sandbox::Kubernetes(c) => &c.common,
        }
    }

    /// Sandboxes are available unless explicitly disabled.
    pub fn is_available(&self) -> bool {
        self.common().available.unwrap_or(true)
    }

    pub fn inherit(&mut self, parent: &Sandbox) -> Result<()> {
        if self.kind() != parent.kind() {
            return Err(Error::SandboxInherit {
                child: self.kind().to_string(),
                parent: parent.kind().to_string(),
            });
        }
        self.merge(parent);
        Ok(())
    }

    /// Fill gaps from `parent`, which must be of the same kind.
    fn merge(&mut self, parent: &Sandbox) {
        match (self, parent) {
            (Sandbox::Local(own), Sandbox::Local(p)) => own.inherit(p),
            (Sandbox::Docker(own), Sandbox::Docker(p))
            | (Sandbox::Kubernetes(own), Sandbox::Kubernetes(p)) => own.inherit(p),
            _ => {}
        }
    }

    fn make(kind: SandboxType, config: &SandboxConfig) -> Result<Self> {
        let common = CommonSandbox {
            available: config.available,
            dirs: config.dirs.clone(),
            hooks: config
                .hooks
                .iter()
                .map(|(name, hook)| Ok((name.clone(), make_hook(kind, name, hook)?)))
                .collect::<Result<_>>()?,
        };

        if kind == SandboxType::Local {
            if config.image.is_some() || config.registry.is_some() {
                return Err(Error::InvalidConfig(
                    "image and registry are only valid for container sandboxes".to_string(),
                ));
            }
            return Ok(Sandbox::Local(common));
        }

        let container = ContainerSandbox {
            common,
            image: config
                .image
                .as_ref()
                .map(|image| ContainerImage {
                    name: image.name.clone(),
                    tag: image.tag.clone(),
                })
                .unwrap_or_default(),
            registry: config.registry.as_ref().map(|r| RegistryAuth {
                username: r.username.clone(),
                password: r.password.clone(),
            }),
        };
        Ok(match kind {
            SandboxType::Docker => Sandbox::Docker(container),
            _ => Sandbox::Kubernetes(container),
        })
    }
}

fn make_hook(kind: SandboxType, name: &str, hook: &HookConfig) -> Result<Hook> {
    match (&hook.command, &hook.signal) {
        (Some(command), None) => Ok(Hook::Command(command.clone())),
        (None, Some(signal)) => Ok(Hook::Signal(signal.clone())),
        _ => Err(Error::InvalidConfig(format!(
            "{} sandbox hook {} must set exactly one of command or signal",
            kind, name
        ))),
    }
}

/// Sandboxes of a server keyed by kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sandboxes {
    sandboxes: HashMap<SandboxType, Sandbox>,
}

impl Sandboxes {
    pub fn make(config: &SandboxesConfig) -> Result<Self> {
        let mut sandboxes = HashMap::new();
        let declared = [
            (SandboxType::Local, &config.local),
            (SandboxType::Docker, &config.docker),
            (SandboxType::Kubernetes, &config.kubernetes),
        ];
        for (kind, sandbox) in declared {
            if let Some(sandbox) = sandbox {
                sandboxes.insert(kind, Sandbox::make(kind, sandbox)?);
            }
        }
        Ok(Self { sandboxes })
    }

    pub fn get(&self, kind: SandboxType) -> Option<&Sandbox> {
        self.sandboxes.get(&kind)
    }

    pub fn kinds(&self) -> Vec<SandboxType> {
        let mut kinds: Vec<SandboxType> = self.sandboxes.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }

    pub fn is_empty(&self) -> bool {
        self.sandboxes.is_empty()
    }

    /// Add the parent's missing sandboxes and fill gaps in shared ones.
    ///
    /// Entries are keyed by kind, so only sandboxes of one kind ever merge.
    pub fn inherit(&mut self, parent: &Sandboxes) {
        for (kind, sandbox) in &parent.sandboxes {
            match self.sandboxes.get_mut(kind) {
                Some(own) => own.merge(sandbox),
                None => {
                    self.sandboxes.insert(*kind, sandbox.clone());
                }
            }
        }
    }
}
