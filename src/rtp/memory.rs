use sysinfo::{Pid, System};
use tracing::{debug, warn};

/// Fraction of the configured ceiling above which a warning is logged.
const WARN_FRACTION: f64 = 0.8;

/// Advisory resident-memory sampler for long parses. Never aborts work.
pub struct MemoryMonitor {
    system: System,
    pid: Option<Pid>,
    limit_bytes: u64,
    warned: bool,
}

impl MemoryMonitor {
    pub fn new(limit_mb: u64) -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(err) => {
                debug!(error = err, "memory sampling unavailable");
                None
            }
        };

        Self {
            system: System::new(),
            pid,
            limit_bytes: limit_mb.saturating_mul(1024 * 1024),
            warned: false,
        }
    }

    pub fn warned(&self) -> bool {
        self.warned
    }

    /// Current resident set size in bytes, when the platform reports it.
    pub fn resident_bytes(&mut self) -> Option<u64> {
        let pid = self.pid?;
        if !self.system.refresh_process(pid) {
            return None;
        }
        self.system.process(pid).map(|process| process.memory())
    }

    /// Samples once; logs a warning the first time usage crosses 80% of the limit.
    pub fn check(&mut self, processed: usize) {
        let Some(resident) = self.resident_bytes() else {
            return;
        };

        let ratio = if self.limit_bytes == 0 {
            0.0
        } else {
            resident as f64 / self.limit_bytes as f64
        };
        debug!(processed, resident_mb = resident / (1024 * 1024), "memory sample");

        if ratio > WARN_FRACTION && !self.warned {
            self.warned = true;
            warn!(
                processed,
                resident_mb = resident / (1024 * 1024),
                limit_mb = self.limit_bytes / (1024 * 1024),
                "request parsing is close to the configured memory limit"
            );
        }
    }
}
