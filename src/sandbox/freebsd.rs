use super::SandboxStatus;

fn is_ip_literal(host: &str) -> bool {
    host.parse::<std::net::Ipv4Addr>().is_ok() || host.parse::<std::net::Ipv6Addr>().is_ok()
}

pub fn apply(hosts: &[String]) -> (SandboxStatus, String) {
    for host in hosts {
        if !is_ip_literal(host) {
            return (
                SandboxStatus::Skipped,
                "Capsicum sandbox requires IP literals (DNS not available)".to_string(),
            );
        }
    }

    // Safety: cap_getmode/cap_enter are plain syscalls with no preconditions
    // beyond FreeBSD's Capsicum support, which this module is gated on.
    let already_capable = unsafe {
        let mut mode: u32 = 0;
        libc::cap_getmode(&mut mode) == 0 && mode == 1
    };
    if already_capable {
        return (
            SandboxStatus::Applied,
            "Capsicum already enabled".to_string(),
        );
    }

    let rc = unsafe { libc::cap_enter() };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        return (
            SandboxStatus::Failed,
            format!("Capsicum cap_enter failed: {err}"),
        );
    }

    (
        SandboxStatus::Applied,
        "Capsicum sandbox enabled".to_string(),
    )
}
