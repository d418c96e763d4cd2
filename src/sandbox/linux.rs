//! Landlock filesystem sandbox. Locked down to read-only access to the paths
//! DNS resolution needs (`/etc/resolv.conf` and friends); everything else on
//! the filesystem becomes unreachable for the rest of the process lifetime.
use std::ffi::CString;
use std::os::unix::io::RawFd;

use super::SandboxStatus;

// Generic syscall table numbers (shared by x86_64 and aarch64); stable since
// landlock's introduction in Linux 5.13.
const SYS_LANDLOCK_CREATE_RULESET: i64 = 444;
const SYS_LANDLOCK_ADD_RULE: i64 = 445;
const SYS_LANDLOCK_RESTRICT_SELF: i64 = 446;

const LANDLOCK_RULE_PATH_BENEATH: u32 = 1;
const LANDLOCK_ACCESS_FS_READ_FILE: u64 = 1 << 2;
const LANDLOCK_ACCESS_FS_READ_DIR: u64 = 1 << 3;

#[repr(C)]
struct LandlockRulesetAttr {
    handled_access_fs: u64,
}

#[repr(C)]
struct LandlockPathBeneathAttr {
    allowed_access: u64,
    parent_fd: RawFd,
}

unsafe fn create_ruleset(attr: &LandlockRulesetAttr) -> i64 {
    libc::syscall(
        SYS_LANDLOCK_CREATE_RULESET,
        attr as *const LandlockRulesetAttr,
        std::mem::size_of::<LandlockRulesetAttr>(),
        0u32,
    )
}

unsafe fn add_rule(ruleset_fd: i32, rule_attr: &LandlockPathBeneathAttr) -> i64 {
    libc::syscall(
        SYS_LANDLOCK_ADD_RULE,
        ruleset_fd,
        LANDLOCK_RULE_PATH_BENEATH,
        rule_attr as *const LandlockPathBeneathAttr,
        0u32,
    )
}

unsafe fn restrict_self(ruleset_fd: i32) -> i64 {
    libc::syscall(SYS_LANDLOCK_RESTRICT_SELF, ruleset_fd, 0u32)
}

fn add_path_rule(ruleset_fd: i32, path: &str, access: u64) {
    let Ok(cpath) = CString::new(path) else {
        return;
    };
    // Safety: O_PATH|O_CLOEXEC open of a fixed, caller-controlled path string.
    let fd = unsafe { libc::open(cpath.as_ptr(), libc::O_PATH | libc::O_CLOEXEC) };
    if fd < 0 {
        return;
    }
    let rule = LandlockPathBeneathAttr {
        allowed_access: access,
        parent_fd: fd,
    };
    // Safety: rule outlives the syscall, fd is a valid open descriptor closed below.
    unsafe {
        add_rule(ruleset_fd, &rule);
        libc::close(fd);
    }
}

pub fn apply(_hosts: &[String]) -> (SandboxStatus, String) {
    let ruleset = LandlockRulesetAttr {
        handled_access_fs: LANDLOCK_ACCESS_FS_READ_FILE | LANDLOCK_ACCESS_FS_READ_DIR,
    };

    // Safety: ruleset is a valid, correctly sized attr struct for this syscall ABI version.
    let ruleset_fd = unsafe { create_ruleset(&ruleset) };
    if ruleset_fd < 0 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::ENOSYS) {
            return (
                SandboxStatus::Skipped,
                "Landlock not supported by kernel".to_string(),
            );
        }
        return (
            SandboxStatus::Failed,
            format!("Landlock create_ruleset failed: {err}"),
        );
    }
    let ruleset_fd = ruleset_fd as i32;

    add_path_rule(ruleset_fd, "/etc", LANDLOCK_ACCESS_FS_READ_DIR);
    add_path_rule(ruleset_fd, "/etc/resolv.conf", LANDLOCK_ACCESS_FS_READ_FILE);
    add_path_rule(ruleset_fd, "/etc/hosts", LANDLOCK_ACCESS_FS_READ_FILE);
    add_path_rule(ruleset_fd, "/etc/nsswitch.conf", LANDLOCK_ACCESS_FS_READ_FILE);

    add_path_rule(ruleset_fd, "/run", LANDLOCK_ACCESS_FS_READ_DIR);
    add_path_rule(ruleset_fd, "/run/systemd", LANDLOCK_ACCESS_FS_READ_DIR);
    add_path_rule(ruleset_fd, "/run/systemd/resolve", LANDLOCK_ACCESS_FS_READ_DIR);
    add_path_rule(
        ruleset_fd,
        "/run/systemd/resolve/stub-resolv.conf",
        LANDLOCK_ACCESS_FS_READ_FILE,
    );
    add_path_rule(
        ruleset_fd,
        "/run/systemd/resolve/resolv.conf",
        LANDLOCK_ACCESS_FS_READ_FILE,
    );

    // Safety: plain prctl syscall, no pointers beyond what libc declares.
    if unsafe { libc::prctl(libc::PR_SET_NO_NEW_PRIVS, 1, 0, 0, 0) } != 0 {
        let err = std::io::Error::last_os_error();
        unsafe { libc::close(ruleset_fd) };
        return (
            SandboxStatus::Failed,
            format!("Landlock failed to set no_new_privs: {err}"),
        );
    }

    // Safety: ruleset_fd is the descriptor just created above.
    if unsafe { restrict_self(ruleset_fd) } != 0 {
        let err = std::io::Error::last_os_error();
        unsafe { libc::close(ruleset_fd) };
        return (
            SandboxStatus::Failed,
            format!("Landlock restrict_self failed: {err}"),
        );
    }

    unsafe { libc::close(ruleset_fd) };
    (
        SandboxStatus::Applied,
        "Landlock sandbox enabled".to_string(),
    )
}
