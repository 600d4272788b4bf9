//! Servers Command

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use wst_runner::{Server, Spec};

use crate::output::{print_list, OutputFormat, TableDisplay};

#[derive(Args)]
pub struct ServersArgs {
    /// Spec file
    path: PathBuf,
}

/// Resolved server as listed by `wst servers`
#[derive(Debug, Serialize)]
pub struct ServerRow {
    pub name: String,
    pub tag: String,
    pub parent: Option<String>,
    pub user: String,
    pub group: String,
    pub port: Option<u16>,
    pub expect_actions: Vec<String>,
    pub sequential_actions: Vec<String>,
    pub configs: Vec<String>,
    pub templates: Vec<String>,
    pub sandboxes: Vec<String>,
}

impl From<&Server> for ServerRow {
    fn from(server: &Server) -> Self {
        let owned = |names: Vec<&str>| names.into_iter().map(String::from).collect();
        Self {
            name: server.name().to_string(),
            tag: server.tag().to_string(),
            parent: server.parent_key().map(ToString::to_string),
            user: server.user().to_string(),
            group: server.group().to_string(),
            port: server.port(),
            expect_actions: owned(server.actions().expect_names()),
            sequential_actions: owned(server.actions().sequential_names()),
            configs: owned(server.configs().names()),
            templates: owned(server.templates().names()),
            sandboxes: server
                .sandboxes()
                .kinds()
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

fn list(values: &[String]) -> String {
    if values.is_empty() {
        "-".to_string()
    } else {
        values.join(", ")
    }
}

impl TableDisplay for ServerRow {
    fn headers() -> Vec<&'static str> {
        vec![
            "Name", "Tag", "Parent", "User", "Group", "Port", "Expect", "Sequential", "Configs",
            "Templates", "Sandboxes",
        ]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.tag.clone(),
            self.parent.clone().unwrap_or_else(|| "-".to_string()),
            self.user.clone(),
            self.group.clone(),
            self.port.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string()),
            list(&self.expect_actions),
            list(&self.sequential_actions),
            list(&self.configs),
            list(&self.templates),
            list(&self.sandboxes),
        ]
    }
}

pub fn rows(spec: &Spec) -> Result<Vec<ServerRow>> {
    let servers = spec.servers()?;
    Ok(servers.iter().map(|server| ServerRow::from(server.as_ref())).collect())
}

pub fn execute(args: ServersArgs, format: OutputFormat) -> Result<()> {
    let spec = Spec::from_file(&args.path)?;
    print_list(&rows(&spec)?, format)
}
