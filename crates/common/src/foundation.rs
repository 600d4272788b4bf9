//! Process-wide settings shared by every action

/// Cross-cutting run settings.
///
/// Logging goes through the global `tracing` dispatcher, so the only state
/// carried here is the run mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct Foundation {
    dry_run: bool,
}

impl Foundation {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    /// Whether unmet expectations should be reported as passing.
    pub fn dry_run(&self) -> bool {
        self.dry_run
    }
}
