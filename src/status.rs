/// Process-wide progress counters, updated by the scan runner and read by the
/// stdin status watcher and the SIGUSR1 handler.
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct ScanStatus {
    pub total_targets: AtomicU64,
    pub completed_targets: AtomicU64,
    pub total_hosts: AtomicU64,
    pub completed_hosts: AtomicU64,
    pub cycles: AtomicU64,
}

impl ScanStatus {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Render a human-readable one-line progress summary.
pub fn format_status(status: &ScanStatus) -> String {
    let total = status.total_targets.load(Ordering::Relaxed);
    let done = status.completed_targets.load(Ordering::Relaxed);
    let hosts_total = status.total_hosts.load(Ordering::Relaxed);
    let hosts_done = status.completed_hosts.load(Ordering::Relaxed);
    let cycles = status.cycles.load(Ordering::Relaxed);

    let mut out = format!("progress: targets {done}/{total}");
    if total > 0 {
        let pct = (done as f64 / total as f64) * 100.0;
        out.push_str(&format!(" ({pct:.1}%)"));
    }
    if hosts_total > 0 {
        out.push_str(&format!(", hosts {hosts_done}/{hosts_total}"));
    }
    if cycles > 0 {
        out.push_str(&format!(", cycles {cycles}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_percentage_when_total_known() {
        let status = ScanStatus::new();
        status.total_targets.store(200, Ordering::Relaxed);
        status.completed_targets.store(50, Ordering::Relaxed);
        let line = format_status(&status);
        assert!(line.contains("50/200"));
        assert!(line.contains("25.0%"));
    }

    #[test]
    fn omits_optional_fields_when_zero() {
        let status = ScanStatus::new();
        let line = format_status(&status);
        assert_eq!(line, "progress: targets 0/0");
    }
}
