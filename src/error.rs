/// Error handling for pulsescan
///
/// Defines the error hierarchy used across argument parsing, target resolution,
/// probing, and the platform sandbox, using thiserror for ergonomic definitions.
use std::net::IpAddr;
use thiserror::Error;
use tracing::error;

/// Main error type for the scanner.
#[derive(Error, Debug)]
pub enum ScanError {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CLI argument validation errors
    #[error("Argument error: {message}")]
    Argument { message: String },

    /// Invalid target specification (host/CIDR/range)
    #[error("Invalid target: {target} - {reason}")]
    InvalidTarget { target: String, reason: String },

    /// Invalid port errors
    #[error("Invalid port: {port} - {reason}")]
    InvalidPort { port: String, reason: String },

    /// Host resolution failure (DNS)
    #[error("Failed to resolve host {host}: {reason}")]
    ResolutionFailed { host: String, reason: String },

    /// Probe socket errors that did not fit a classified probe state
    #[error("Probe error on {target}:{port} - {reason}")]
    ProbeFailed {
        target: IpAddr,
        port: u16,
        reason: String,
    },

    /// Permission errors (raw ICMP socket)
    #[error("Permission denied: {operation}")]
    PermissionDenied { operation: String },

    /// Packet crafting/parsing errors
    #[error("Packet error: {message}")]
    PacketError { message: String },

    /// Sandbox application failed
    #[error("Sandbox error: {message}")]
    SandboxFailed { message: String },

    /// Output/formatting errors
    #[error("Output error: {message}")]
    OutputError { message: String },
}

/// Result type alias for scanner operations.
pub type ScanResult<T> = Result<T, ScanError>;

impl ScanError {
    pub fn argument<S: Into<String>>(message: S) -> Self {
        ScanError::Argument {
            message: message.into(),
        }
    }

    pub fn invalid_target<S1: Into<String>, S2: Into<String>>(target: S1, reason: S2) -> Self {
        ScanError::InvalidTarget {
            target: target.into(),
            reason: reason.into(),
        }
    }

    pub fn resolution_failed<S1: Into<String>, S2: Into<String>>(host: S1, reason: S2) -> Self {
        ScanError::ResolutionFailed {
            host: host.into(),
            reason: reason.into(),
        }
    }

    pub fn probe_failed<S: Into<String>>(target: IpAddr, port: u16, reason: S) -> Self {
        ScanError::ProbeFailed {
            target,
            port,
            reason: reason.into(),
        }
    }

    pub fn permission_denied<S: Into<String>>(operation: S) -> Self {
        ScanError::PermissionDenied {
            operation: operation.into(),
        }
    }

    pub fn packet_error<S: Into<String>>(message: S) -> Self {
        ScanError::PacketError {
            message: message.into(),
        }
    }

    pub fn sandbox_failed<S: Into<String>>(message: S) -> Self {
        ScanError::SandboxFailed {
            message: message.into(),
        }
    }

    /// Log this error at a severity appropriate to its kind.
    pub fn log(&self) {
        match self {
            ScanError::PermissionDenied { .. } | ScanError::SandboxFailed { .. } => {
                error!("{}", self);
            }
            ScanError::ResolutionFailed { .. } | ScanError::ProbeFailed { .. } => {
                tracing::warn!("{}", self);
            }
            _ => {
                error!("{}", self);
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ScanError::PermissionDenied { .. } | ScanError::SandboxFailed { .. } => {
                ErrorSeverity::Critical
            }
            ScanError::Io(_) | ScanError::PacketError { .. } => ErrorSeverity::High,
            ScanError::Argument { .. }
            | ScanError::InvalidTarget { .. }
            | ScanError::InvalidPort { .. } => ErrorSeverity::Medium,
            ScanError::ResolutionFailed { .. } | ScanError::ProbeFailed { .. } => {
                ErrorSeverity::Low
            }
            ScanError::OutputError { .. } => ErrorSeverity::Medium,
        }
    }
}

/// Error severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Low => write!(f, "LOW"),
            ErrorSeverity::Medium => write!(f, "MEDIUM"),
            ErrorSeverity::High => write!(f, "HIGH"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Error context captured at the point an error surfaces, for structured logging.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub error: String,
    pub severity: ErrorSeverity,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ErrorContext {
    pub fn new(error: &ScanError) -> Self {
        Self {
            error: error.to_string(),
            severity: error.severity(),
            timestamp: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn test_error_creation() {
        let err = ScanError::argument("bad flag");
        assert!(matches!(err, ScanError::Argument { .. }));
    }

    #[test]
    fn test_error_severity() {
        let err = ScanError::permission_denied("ICMP requires root or CAP_NET_RAW");
        assert_eq!(err.severity(), ErrorSeverity::Critical);

        let ip = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1));
        let err = ScanError::probe_failed(ip, 80, "connection refused");
        assert_eq!(err.severity(), ErrorSeverity::Low);
    }

    #[test]
    fn test_error_context() {
        let err = ScanError::argument("bad flag");
        let ctx = ErrorContext::new(&err);
        assert_eq!(ctx.severity, ErrorSeverity::Medium);
    }
}
