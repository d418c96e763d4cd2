//! Best-effort OS sandboxing applied once, before any scanning begins.
#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "freebsd")]
mod freebsd;
#[cfg(not(any(target_os = "linux", target_os = "freebsd")))]
mod other;

/// Outcome of attempting to sandbox the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SandboxStatus {
    Applied,
    Skipped,
    Failed,
}

/// Apply whatever sandbox this platform supports. `hosts` is the raw list of
/// target specs as given on the command line; Capsicum needs it to confirm no
/// DNS resolution will be required after the sandbox is entered.
pub fn apply_sandbox(hosts: &[String]) -> (SandboxStatus, String) {
    #[cfg(target_os = "linux")]
    {
        linux::apply(hosts)
    }
    #[cfg(target_os = "freebsd")]
    {
        freebsd::apply(hosts)
    }
    #[cfg(not(any(target_os = "linux", target_os = "freebsd")))]
    {
        other::apply(hosts)
    }
}
