//! Spec loading, validation and execution

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use wst_common::types::{InstanceConfig, SpecConfig};
use wst_common::{Foundation, Parameters, RunData};

use crate::actions::ActionMaker;
use crate::error::{Error, Result};
use crate::expectations::ExpectationsMaker;
use crate::instances::{Instance, InstanceResult};
use crate::scanner::ActionContext;
use crate::servers::{Servers, ServersMaker, SystemUserDirectory, UserDirectory};
use crate::services::{DeclaredService, ServiceDefinition, ServiceEnvironment};

const SUPPORTED_VERSION: u32 = 1;

/// Result of running the instances of a spec
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<InstanceResult>,
}

impl RunSummary {
    pub fn success(&self) -> bool {
        self.failed == 0
    }

    /// Write the summary as pretty JSON to `path`, creating parent dirs.
    pub fn write_json(&self, path: &Path) -> Result<PathBuf> {
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!("Results written to: {}", path.display());
        Ok(path.to_path_buf())
    }
}

/// A loaded spec with its run settings
pub struct Spec {
    config: SpecConfig,
    foundation: Foundation,
    users: Arc<dyn UserDirectory>,
}

impl Spec {
    pub fn new(config: SpecConfig) -> Self {
        Self {
            config,
            foundation: Foundation::default(),
            users: Arc::new(SystemUserDirectory),
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(Self::new(serde_yaml::from_str(yaml)?))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Spec files at `path`: the file itself, or every `*.yaml`/`*.yml`
    /// below a directory, sorted.
    pub fn discover(path: &Path) -> Vec<PathBuf> {
        if path.is_file() {
            return vec![path.to_path_buf()];
        }
        let mut paths: Vec<PathBuf> = walkdir::WalkDir::new(path)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| {
                p.extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();
        paths
    }

    /// Load every spec found by [`Spec::discover`].
    pub fn load_all(path: &Path) -> Result<Vec<Self>> {
        Self::discover(path)
            .iter()
            .map(|path| Self::from_file(path))
            .collect()
    }

    pub fn with_foundation(mut self, foundation: Foundation) -> Self {
        self.foundation = foundation;
        self
    }

    pub fn with_users(mut self, users: Arc<dyn UserDirectory>) -> Self {
        self.users = users;
        self
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &SpecConfig {
        &self.config
    }

    /// Build the resolved server set.
    pub fn servers(&self) -> Result<Servers> {
        if self.config.version != SUPPORTED_VERSION {
            return Err(Error::InvalidValue {
                field: "spec version",
                value: self.config.version.to_string(),
            });
        }
        ServersMaker::new(ExpectationsMaker::new(), Arc::clone(&self.users))
            .make(&self.config.servers)
    }

    /// Check servers and every instance action without running anything.
    pub fn validate(&self) -> Result<()> {
        self.prepare().map(|_| ())
    }

    /// Build the servers and every instance against declared services.
    ///
    /// Returns the service definitions of each instance in declaration order.
    fn prepare(&self) -> Result<Vec<PreparedInstance<'_>>> {
        let servers = self.servers()?;
        let defaults = Parameters::make(&self.config.defaults.parameters)?;
        let maker = ActionMaker::new(self.foundation);

        let mut names = HashSet::new();
        let mut prepared = Vec::with_capacity(self.config.instances.len());
        for instance in &self.config.instances {
            if !names.insert(instance.name.as_str()) {
                return Err(Error::InvalidConfig(format!(
                    "duplicate instance {}",
                    instance.name
                )));
            }
            let definitions = ServiceDefinition::resolve_all(instance, &servers, &defaults)?;
            let locator = DeclaredService::locator(definitions.clone());
            let built = Instance::make(instance, &self.config.defaults.timeouts, &locator, &maker)?;
            debug!(
                "Instance {} is valid with {} action(s)",
                built.name(),
                built.actions().len()
            );
            prepared.push(PreparedInstance {
                config: instance,
                definitions,
            });
        }
        Ok(prepared)
    }

    /// Run the instances named `filter` (all when `None`) concurrently.
    ///
    /// Every instance of the spec is built first; a config error aborts the
    /// run before any service is requested.
    pub async fn run(
        &self,
        environment: &dyn ServiceEnvironment,
        filter: Option<&str>,
    ) -> Result<RunSummary> {
        let start = Instant::now();
        let prepared = self.prepare()?;
        let maker = ActionMaker::new(self.foundation);

        let selected: Vec<PreparedInstance<'_>> = prepared
            .into_iter()
            .filter(|instance| filter.map_or(true, |name| instance.config.name == name))
            .collect();
        if let Some(name) = filter {
            if selected.is_empty() {
                return Err(Error::InvalidConfig(format!("instance {} not found", name)));
            }
        }

        info!("Running {} instance(s)...", selected.len());
        let results = join_all(
            selected
                .into_iter()
                .map(|instance| self.run_instance(instance, &maker, environment)),
        )
        .await;

        let passed = results.iter().filter(|r| r.success).count();
        let failed = results.len() - passed;
        let duration_ms = start.elapsed().as_millis() as u64;

        info!("");
        info!(
            "Instance Results: {} passed, {} failed ({} ms)",
            passed, failed, duration_ms
        );

        Ok(RunSummary {
            total: results.len(),
            passed,
            failed,
            duration_ms,
            results,
        })
    }

    async fn run_instance(
        &self,
        prepared: PreparedInstance<'_>,
        maker: &ActionMaker,
        environment: &dyn ServiceEnvironment,
    ) -> InstanceResult {
        let PreparedInstance {
            config,
            definitions,
        } = prepared;

        let locator = match environment.services(&config.name, definitions).await {
            Ok(locator) => locator,
            Err(e) => {
                error!("✗ {} - {}", config.name, e);
                return InstanceResult::failed(&config.name, e.to_string());
            }
        };

        let result = match Instance::make(
            config,
            &self.config.defaults.timeouts,
            locator.as_ref(),
            maker,
        ) {
            Ok(instance) => {
                debug!("Running instance: {}", instance.name());
                instance.run(&ActionContext::new(), &RunData::new()).await
            }
            Err(e) => InstanceResult::failed(&config.name, e.to_string()),
        };

        if let Err(e) = environment.release(&config.name).await {
            warn!("Failed to release services of {}: {}", config.name, e);
        }

        if result.success {
            info!("✓ {} ({} ms)", result.name, result.duration_ms);
        } else {
            error!(
                "✗ {} - {}",
                result.name,
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
        result
    }
}

/// Instance config with its resolved service definitions
struct PreparedInstance<'a> {
    config: &'a InstanceConfig,
    definitions: Vec<ServiceDefinition>,
}
