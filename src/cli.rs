/// Command-line surface: argument parsing, validation, and the translation
/// into a [`ScanOptions`].
use std::time::Duration;

use clap::Parser;

use crate::error::{ScanError, ScanResult};
use crate::options::{OutputFormat, ScanMode, ScanOptions};
use crate::ports::{default_dev_ports, parse_ports, popular_ports, top_ports};

#[derive(Parser, Debug)]
#[command(name = "pulsescan", about = "Coroutine-style async network reconnaissance tool (no raw sockets unless --icmp-ping is used)")]
pub struct Cli {
    /// Target host(s): hostname, IP literal, CIDR block, or dash range.
    #[arg(required = true)]
    pub hosts: Vec<String>,

    /// Ports to scan (comma list and ranges, e.g. 22,80,8000-8010).
    #[arg(short = 'p', long = "ports")]
    pub ports: Option<String>,

    /// Per-connection timeout in seconds.
    #[arg(short = 't', long = "timeout", default_value_t = 1.0)]
    pub timeout: f64,

    /// Max concurrent connection attempts.
    #[arg(long = "max-inflight", default_value_t = 200)]
    pub max_inflight: usize,

    /// Scan mode: connect, banner, udp.
    #[arg(short = 'm', long = "mode", default_value = "connect")]
    pub mode: String,

    /// Output format: text or json.
    #[arg(long = "output", default_value = "text")]
    pub output: String,

    /// Banner wait timeout in seconds (banner mode).
    #[arg(long = "banner-timeout", default_value_t = 0.5)]
    pub banner_timeout: f64,

    /// Max bytes to read for banner (banner mode).
    #[arg(long = "banner-bytes", default_value_t = 128)]
    pub banner_bytes: usize,

    /// Repeat scans at an interval and only report changes.
    #[arg(long = "ping")]
    pub ping_mode: bool,

    /// Only print open ports.
    #[arg(long = "open")]
    pub open_only: bool,

    /// Log DNS resolution results.
    #[arg(long = "debug-dns")]
    pub debug_dns: bool,

    /// Enable verbose tracing.
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Use IPv4 only.
    #[arg(short = '4')]
    pub ipv4_only: bool,

    /// Use IPv6 only.
    #[arg(short = '6')]
    pub ipv6_only: bool,

    /// ICMP echo ping (requires privileges).
    #[arg(long = "icmp-ping")]
    pub icmp_ping: bool,

    /// ICMP echo count per host (icmp mode).
    #[arg(short = 'c', long = "icmp-count", default_value_t = 1)]
    pub icmp_count: u32,

    /// Scan top N common ports from the built-in list.
    #[arg(long = "top-ports")]
    pub top_ports: Option<usize>,

    /// Resolve PTR records for target IPs.
    #[arg(long = "reverse-dns")]
    pub reverse_dns: bool,

    /// Ping interval in seconds (ping mode).
    #[arg(long = "interval", default_value_t = 1.0)]
    pub interval: f64,
}

/// Everything `parse_cli` produces: the validated options plus the host list.
pub struct ParsedCli {
    pub opts: ScanOptions,
    pub hosts: Vec<String>,
}

fn seconds_to_duration(seconds: f64) -> Duration {
    Duration::from_millis((seconds * 1000.0).max(0.0) as u64)
}

/// Parse and validate `argv`, returning a ready-to-run [`ScanOptions`].
///
/// `--sandbox` is deliberately not a flag here: the sandbox always runs and
/// cannot be disabled from the command line.
pub fn parse_cli(args: impl IntoIterator<Item = String>) -> ScanResult<ParsedCli> {
    let cli = Cli::try_parse_from(args).map_err(|e| ScanError::argument(e.to_string()))?;

    if cli.ipv4_only && cli.ipv6_only {
        return Err(ScanError::argument("Cannot use -4 and -6 together"));
    }

    if cli.icmp_ping
        && (cli.ports.is_some()
            || cli.top_ports.is_some()
            || cli.mode != "connect"
            || cli.banner_timeout != 0.5
            || cli.banner_bytes != 128)
    {
        return Err(ScanError::argument(
            "--icmp-ping cannot be used with port scan options",
        ));
    }

    if let Some(n) = cli.top_ports {
        if n < 1 {
            return Err(ScanError::argument("--top-ports must be >= 1"));
        }
        if n > popular_ports().len() {
            return Err(ScanError::argument(format!(
                "--top-ports max is {}",
                popular_ports().len()
            )));
        }
        if cli.ports.is_some() {
            return Err(ScanError::argument("--top-ports cannot be used with --ports"));
        }
    }

    if cli.icmp_count < 1 {
        return Err(ScanError::argument("--icmp-count must be >= 1"));
    }

    let ports = if let Some(n) = cli.top_ports {
        top_ports(n)
    } else if let Some(spec) = &cli.ports {
        parse_ports(spec)?
    } else {
        default_dev_ports()
    };

    let mode = match cli.mode.to_lowercase().as_str() {
        "connect" => ScanMode::TcpConnect,
        "banner" => ScanMode::TcpBanner,
        "udp" => ScanMode::Udp,
        other => {
            return Err(ScanError::argument(format!(
                "unknown scan mode '{other}' (expected connect, banner, or udp)"
            )));
        }
    };

    let output_format = match cli.output.to_lowercase().as_str() {
        "text" => OutputFormat::Text,
        "json" => OutputFormat::Json,
        other => {
            return Err(ScanError::argument(format!(
                "unknown output format '{other}' (expected text or json)"
            )));
        }
    };

    let opts = ScanOptions {
        ports,
        timeout: seconds_to_duration(cli.timeout),
        banner_timeout: seconds_to_duration(cli.banner_timeout),
        banner_bytes: cli.banner_bytes,
        max_inflight: cli.max_inflight,
        mode,
        ping_mode: cli.ping_mode,
        ping_interval: seconds_to_duration(cli.interval),
        icmp_count: cli.icmp_count,
        open_only: cli.open_only,
        debug_dns: cli.debug_dns,
        verbose: cli.verbose,
        ipv4_only: cli.ipv4_only,
        ipv6_only: cli.ipv6_only,
        icmp_ping: cli.icmp_ping,
        reverse_dns: cli.reverse_dns,
        sandbox: true,
        output_format,
    };

    Ok(ParsedCli {
        opts,
        hosts: cli.hosts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Vec<String> {
        let mut v = vec!["pulsescan".to_string()];
        v.extend(extra.iter().map(|s| s.to_string()));
        v
    }

    #[test]
    fn defaults_to_dev_ports_and_connect_mode() {
        let parsed = parse_cli(args(&["example.com"])).unwrap();
        assert_eq!(parsed.opts.ports, default_dev_ports());
        assert_eq!(parsed.opts.mode, ScanMode::TcpConnect);
        assert!(parsed.opts.sandbox);
    }

    #[test]
    fn rejects_both_address_families() {
        let result = parse_cli(args(&["-4", "-6", "example.com"]));
        assert!(result.is_err());
    }

    #[test]
    fn rejects_icmp_ping_with_ports() {
        let result = parse_cli(args(&["--icmp-ping", "-p", "80", "example.com"]));
        assert!(result.is_err());
    }

    #[test]
    fn top_ports_overrides_default_list() {
        let parsed = parse_cli(args(&["--top-ports", "5", "example.com"])).unwrap();
        assert_eq!(parsed.opts.ports, top_ports(5));
    }

    #[test]
    fn rejects_top_ports_beyond_table() {
        let result = parse_cli(args(&["--top-ports", "999999", "example.com"]));
        assert!(result.is_err());
    }

    #[test]
    fn parses_custom_port_list() {
        let parsed = parse_cli(args(&["-p", "22,80,8000-8002", "example.com"])).unwrap();
        assert_eq!(parsed.opts.ports, vec![22, 80, 8000, 8001, 8002]);
    }

    #[test]
    fn json_output_format_is_recognized() {
        let parsed = parse_cli(args(&["--output", "json", "example.com"])).unwrap();
        assert_eq!(parsed.opts.output_format, OutputFormat::Json);
    }
}
