/// Core data model: scan options, probe/ICMP result types, output format.
use std::time::Duration;

/// Which probe state machine a sweep runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    TcpConnect,
    TcpBanner,
    Udp,
}

impl ScanMode {
    /// Label used in structured output and the `-m/--mode` flag.
    pub fn label(&self) -> &'static str {
        match self {
            ScanMode::TcpConnect => "connect",
            ScanMode::TcpBanner => "banner",
            ScanMode::Udp => "udp",
        }
    }

    pub fn is_udp(&self) -> bool {
        matches!(self, ScanMode::Udp)
    }
}

/// Output record format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Immutable options for the duration of a sweep (or every cycle of a ping loop).
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub ports: Vec<u16>,
    pub timeout: Duration,
    pub banner_timeout: Duration,
    pub banner_bytes: usize,
    pub max_inflight: usize,
    pub mode: ScanMode,
    pub ping_mode: bool,
    pub ping_interval: Duration,
    pub icmp_count: u32,
    pub open_only: bool,
    pub debug_dns: bool,
    pub verbose: bool,
    pub ipv4_only: bool,
    pub ipv6_only: bool,
    pub icmp_ping: bool,
    pub reverse_dns: bool,
    pub sandbox: bool,
    pub output_format: OutputFormat,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            ports: Vec::new(),
            timeout: Duration::from_millis(1000),
            banner_timeout: Duration::from_millis(500),
            banner_bytes: 128,
            max_inflight: 200,
            mode: ScanMode::TcpConnect,
            ping_mode: false,
            ping_interval: Duration::from_millis(1000),
            icmp_count: 1,
            open_only: false,
            debug_dns: false,
            verbose: false,
            ipv4_only: false,
            ipv6_only: false,
            icmp_ping: false,
            reverse_dns: false,
            sandbox: true,
            output_format: OutputFormat::Text,
        }
    }
}

/// Observable state of a TCP/UDP probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeState {
    Open,
    Closed,
    FilteredTimeout,
    OpenFiltered,
    Error,
}

impl ProbeState {
    pub fn label(&self) -> &'static str {
        match self {
            ProbeState::Open => "open",
            ProbeState::Closed => "closed",
            ProbeState::FilteredTimeout => "filtered/timeout",
            ProbeState::OpenFiltered => "open|filtered",
            ProbeState::Error => "error",
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, ProbeState::Open)
    }
}

impl std::fmt::Display for ProbeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Result of a single (address, port) probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub port: u16,
    pub state: ProbeState,
    pub detail: String,
}

/// A probe result attributed to the host string and address it came from.
#[derive(Debug, Clone)]
pub struct ScanRecord {
    pub host: String,
    pub address: std::net::IpAddr,
    pub result: ProbeResult,
}

/// Observable state of an ICMP echo probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IcmpState {
    Up,
    Down,
    Error,
}

impl IcmpState {
    pub fn label(&self) -> &'static str {
        match self {
            IcmpState::Up => "up",
            IcmpState::Down => "down",
            IcmpState::Error => "error",
        }
    }

    pub fn is_up(&self) -> bool {
        matches!(self, IcmpState::Up)
    }
}

impl std::fmt::Display for IcmpState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Result of an ICMP echo probe (one attempt, or the aggregate of several).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcmpResult {
    pub state: IcmpState,
    pub detail: String,
}

impl IcmpResult {
    pub fn down(detail: impl Into<String>) -> Self {
        Self {
            state: IcmpState::Down,
            detail: detail.into(),
        }
    }
}

/// A host specification resolved to zero or more addresses.
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    pub host: String,
    pub addresses: Vec<std::net::IpAddr>,
    pub used_range: bool,
}

/// The literal substring that marks an ICMP permission-denied error. The outer
/// multi-attempt loop and the top-level dispatcher both look for this exact
/// text to decide whether to abort the whole sweep.
pub const ICMP_PERMISSION_MARKER: &str = "ICMP requires";
