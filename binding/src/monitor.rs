//! Warning delivery.

use tracing::warn;

/// Receives the warnings of each successful provider build, one call per
/// accumulated warning. Warnings of failed builds are dropped.
pub trait WarningsMonitor: Send + Sync {
    fn on_warning(&self, message: &str);
}

/// Forwards warnings to the `tracing` subscriber at WARN level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingWarningsMonitor;

impl WarningsMonitor for TracingWarningsMonitor {
    fn on_warning(&self, message: &str) {
        warn!("{message}");
    }
}
