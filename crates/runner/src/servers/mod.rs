//! Server definitions and `extends` resolution
//!
//! Every server is identified by its `(name, tag)` pair. A server may extend
//! one parent; [`ServersMaker`] builds all nodes first, then resolves each
//! extends chain root-first, filling gaps in the child from the already
//! resolved parent. Construction is all-or-nothing: any failing node aborts
//! the whole set.

pub mod actions;
pub mod configs;
pub mod sandboxes;
pub mod users;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use wst_common::types::ServerConfig;
use wst_common::{Parameters, DEFAULT_SERVER_TAG};

use crate::error::{Error, Result};
use crate::expectations::ExpectationsMaker;

pub use actions::{Actions, ActionsMaker, ExpectAction, SequentialAction};
pub use configs::{Config, Configs, Template, Templates};
pub use sandboxes::{Sandbox, SandboxType, Sandboxes};
pub use users::{SystemUserDirectory, UserDirectory, UserInfo};

/// Identity of a server definition
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServerKey {
    name: String,
    tag: String,
}

impl ServerKey {
    pub fn new(name: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag: tag.into(),
        }
    }

    /// Parse `name` or `name:tag`; a missing tag is the default tag.
    pub fn parse(value: &str) -> Self {
        match value.split_once(':') {
            Some((name, tag)) if !tag.is_empty() => Self::new(name, tag),
            Some((name, _)) => Self::new(name, DEFAULT_SERVER_TAG),
            None => Self::new(value, DEFAULT_SERVER_TAG),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl fmt::Display for ServerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.tag)
    }
}

/// Fully resolved server definition
#[derive(Debug)]
pub struct Server {
    key: ServerKey,
    user: String,
    group: String,
    port: Option<u16>,
    parent: Option<Arc<Server>>,
    actions: Actions,
    configs: Configs,
    templates: Templates,
    parameters: Parameters,
    sandboxes: Sandboxes,
}

impl Server {
    pub fn name(&self) -> &str {
        self.key.name()
    }

    pub fn tag(&self) -> &str {
        self.key.tag()
    }

    pub fn key(&self) -> &ServerKey {
        &self.key
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn parent(&self) -> Option<&Arc<Server>> {
        self.parent.as_ref()
    }

    pub fn parent_key(&self) -> Option<&ServerKey> {
        self.parent.as_ref().map(|parent| parent.key())
    }

    pub fn actions(&self) -> &Actions {
        &self.actions
    }

    pub fn expect_action(&self, name: &str) -> Option<Arc<ExpectAction>> {
        self.actions.expect.get(name).cloned()
    }

    pub fn sequential_action(&self, name: &str) -> Option<Arc<SequentialAction>> {
        self.actions.sequential.get(name).cloned()
    }

    pub fn config(&self, name: &str) -> Option<&Config> {
        self.configs.get(name)
    }

    pub fn configs(&self) -> &Configs {
        &self.configs
    }

    pub fn template(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    pub fn templates(&self) -> &Templates {
        &self.templates
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn sandbox(&self, kind: SandboxType) -> Option<&Sandbox> {
        self.sandboxes.get(kind)
    }

    pub fn sandboxes(&self) -> &Sandboxes {
        &self.sandboxes
    }
}

/// Resolved servers in declaration order
#[derive(Debug, Default, Clone)]
pub struct Servers {
    servers: HashMap<ServerKey, Arc<Server>>,
    order: Vec<ServerKey>,
}

impl Servers {
    pub fn get(&self, name: &str, tag: &str) -> Option<Arc<Server>> {
        self.servers.get(&ServerKey::new(name, tag)).cloned()
    }

    pub fn find(&self, key: &ServerKey) -> Result<Arc<Server>> {
        self.servers
            .get(key)
            .cloned()
            .ok_or_else(|| Error::ServerNotFound(key.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Server>> {
        self.order.iter().filter_map(|key| self.servers.get(key))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Visitation state of a node during chain resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unvisited,
    InProgress,
    Done,
}

/// Server built from its own config, before inheritance
struct ServerNode {
    key: ServerKey,
    extends: Option<ServerKey>,
    user: String,
    group: String,
    port: Option<u16>,
    actions: Actions,
    configs: Configs,
    templates: Templates,
    parameters: Parameters,
    sandboxes: Sandboxes,
}

impl ServerNode {
    fn extend(self, parent: Option<Arc<Server>>) -> Server {
        let ServerNode {
            key,
            user,
            group,
            mut port,
            mut actions,
            mut configs,
            mut templates,
            mut parameters,
            mut sandboxes,
            ..
        } = self;

        if let Some(parent) = &parent {
            actions.inherit(&parent.actions);
            configs.inherit(&parent.configs);
            templates.inherit(&parent.templates);
            parameters.inherit_from(&parent.parameters);
            sandboxes.inherit(&parent.sandboxes);
            if port.is_none() {
                port = parent.port;
            }
        }

        Server {
            key,
            user,
            group,
            port,
            parent,
            actions,
            configs,
            templates,
            parameters,
            sandboxes,
        }
    }
}

/// Builds the resolved server set from server configs
pub struct ServersMaker {
    actions: ActionsMaker,
    users: Arc<dyn UserDirectory>,
}

impl ServersMaker {
    pub fn new(expectations: ExpectationsMaker, users: Arc<dyn UserDirectory>) -> Self {
        Self {
            actions: ActionsMaker::new(expectations),
            users,
        }
    }

    pub fn with_system_users(expectations: ExpectationsMaker) -> Self {
        Self::new(expectations, Arc::new(SystemUserDirectory))
    }

    pub fn make(&self, configs: &[ServerConfig]) -> Result<Servers> {
        let mut nodes = HashMap::with_capacity(configs.len());
        let mut visits = HashMap::with_capacity(configs.len());
        let mut order = Vec::with_capacity(configs.len());

        for config in configs {
            let node = self.make_node(config)?;
            if nodes.contains_key(&node.key) {
                return Err(Error::DuplicateServer(node.key.to_string()));
            }
            order.push(node.key.clone());
            visits.insert(node.key.clone(), Visit::Unvisited);
            nodes.insert(node.key.clone(), node);
        }

        let mut resolved: HashMap<ServerKey, Arc<Server>> = HashMap::with_capacity(order.len());
        for key in &order {
            let chain = Self::unresolved_chain(key, &nodes, &mut visits)?;
            for current in chain.into_iter().rev() {
                let Some(node) = nodes.remove(&current) else {
                    continue;
                };
                let parent = node
                    .extends
                    .as_ref()
                    .and_then(|parent| resolved.get(parent))
                    .cloned();
                let server = node.extend(parent);
                debug!(
                    "Resolved server {} (parent: {})",
                    current,
                    server
                        .parent_key()
                        .map(ToString::to_string)
                        .unwrap_or_else(|| "none".to_string())
                );
                visits.insert(current.clone(), Visit::Done);
                resolved.insert(current, Arc::new(server));
            }
        }

        Ok(Servers {
            servers: resolved,
            order,
        })
    }

    /// Walk up from `key` and return the not yet resolved nodes, child first.
    fn unresolved_chain(
        key: &ServerKey,
        nodes: &HashMap<ServerKey, ServerNode>,
        visits: &mut HashMap<ServerKey, Visit>,
    ) -> Result<Vec<ServerKey>> {
        let mut chain = Vec::new();
        let mut current = key.clone();
        loop {
            match visits.get(&current).copied() {
                Some(Visit::Done) => break,
                Some(Visit::InProgress) => {
                    return Err(Error::CircularInheritance(current.to_string()))
                }
                Some(Visit::Unvisited) => {}
                None => return Err(Error::ServerNotFound(current.to_string())),
            }
            visits.insert(current.clone(), Visit::InProgress);
            chain.push(current.clone());

            let Some(parent) = nodes.get(&current).and_then(|node| node.extends.clone()) else {
                break;
            };
            if !visits.contains_key(&parent) {
                return Err(Error::ParentNotFound {
                    parent: parent.to_string(),
                    child: current.to_string(),
                });
            }
            current = parent;
        }
        Ok(chain)
    }

    fn make_node(&self, config: &ServerConfig) -> Result<ServerNode> {
        let key = ServerKey::new(config.name.clone(), config.tag.clone());
        let (user, group) = self.resolve_user(config)?;

        Ok(ServerNode {
            extends: config
                .extends
                .as_deref()
                .filter(|extends| !extends.is_empty())
                .map(ServerKey::parse),
            user,
            group,
            port: config.port,
            actions: self.actions.make(&config.actions)?,
            configs: Configs::make(&config.configs)?,
            templates: Templates::make(&config.templates),
            parameters: Parameters::make(&config.parameters)?,
            sandboxes: Sandboxes::make(&config.sandboxes)?,
            key,
        })
    }

    fn resolve_user(&self, config: &ServerConfig) -> Result<(String, String)> {
        let user = match &config.user {
            Some(name) => self.users.lookup_user(name)?,
            None => self.users.current_user()?,
        };
        let group = match &config.group {
            Some(group) => group.clone(),
            None => self.users.primary_group(&user)?,
        };
        Ok((user.name, group))
    }
}
