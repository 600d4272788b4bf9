//! Validate Command

use anyhow::{bail, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::debug;

use wst_runner::Spec;

use crate::output::{print_error, print_success};

#[derive(Args)]
pub struct ValidateArgs {
    /// Spec files or directories containing them
    #[arg(required = true)]
    paths: Vec<PathBuf>,
}

pub fn execute(args: ValidateArgs) -> Result<()> {
    let mut files = Vec::new();
    for path in &args.paths {
        if !path.exists() {
            bail!("{} does not exist", path.display());
        }
        files.extend(Spec::discover(path));
    }
    if files.is_empty() {
        bail!("No spec files found");
    }

    let mut failed = 0;
    for path in &files {
        debug!("Validating {}", path.display());
        match Spec::from_file(path).and_then(|spec| spec.validate().map(|_| spec)) {
            Ok(spec) => print_success(&format!(
                "{}: {} server(s), {} instance(s)",
                path.display(),
                spec.config().servers.len(),
                spec.config().instances.len()
            )),
            Err(e) => {
                failed += 1;
                print_error(&format!("{}: {}", path.display(), e));
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} spec file(s) failed validation", failed, files.len());
    }
    Ok(())
}
