use super::SandboxStatus;

pub fn apply(_hosts: &[String]) -> (SandboxStatus, String) {
    (
        SandboxStatus::Skipped,
        "Sandboxing not supported on this platform".to_string(),
    )
}
