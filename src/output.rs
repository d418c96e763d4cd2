/// Text and JSON rendering of scan/ICMP results.
use std::collections::HashMap;
use std::net::IpAddr;

use crate::options::{OutputFormat, ProbeResult, ProbeState, ScanMode, ScanRecord};
use crate::ports::service_name_for_port;

/// Lowercase key `address` is stored under in a reverse-DNS map.
pub fn reverse_dns_for(addr: IpAddr, reverse_map: &HashMap<String, String>) -> String {
    reverse_map.get(&addr.to_string()).cloned().unwrap_or_default()
}

/// `addr`, with its PTR name appended in parentheses when known.
pub fn format_address_with_reverse(addr: IpAddr, reverse_map: &HashMap<String, String>) -> String {
    let base = addr.to_string();
    let reverse = reverse_dns_for(addr, reverse_map);
    if reverse.is_empty() {
        base
    } else {
        format!("{base} ({reverse})")
    }
}

fn mode_label(mode: ScanMode) -> &'static str {
    mode.label()
}

/// Escape `value` for embedding in a JSON string literal.
pub fn json_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

struct ParsedKey {
    host: String,
    address: String,
    port: u16,
}

/// Split a `host|address:port` change-tracking key back into its parts.
fn parse_key(key: &str) -> Option<ParsedKey> {
    let (host, rest) = key.split_once('|')?;
    let colon = rest.rfind(':')?;
    let address = &rest[..colon];
    let port: u16 = rest[colon + 1..].parse().ok()?;
    Some(ParsedKey {
        host: host.to_string(),
        address: address.to_string(),
        port,
    })
}

/// Full `nmap`-style report for one host's sweep, used in the (non-ping-mode)
/// single-sweep path.
pub fn emit_scan_report(
    host: &str,
    addr: IpAddr,
    results: &[ProbeResult],
    reverse_map: &HashMap<String, String>,
    mode: ScanMode,
    open_only: bool,
) -> String {
    let mut out = String::new();
    let address = addr.to_string();
    let mut header = format!("Scan report for {host}");
    if host != address {
        header.push_str(&format!(" ({address})"));
    } else {
        let reverse = reverse_dns_for(addr, reverse_map);
        if !reverse.is_empty() {
            header.push_str(&format!(" ({reverse})"));
        }
    }
    out.push_str(&header);
    out.push('\n');
    out.push_str("Host is up.\n");

    let mut sorted: Vec<&ProbeResult> = results.iter().collect();
    sorted.sort_by_key(|r| r.port);

    let mut closed = 0usize;
    let mut filtered = 0usize;
    let mut errors = 0usize;
    let mut open = 0usize;
    for r in &sorted {
        match r.state {
            ProbeState::Open => open += 1,
            ProbeState::Closed => closed += 1,
            ProbeState::FilteredTimeout | ProbeState::OpenFiltered => filtered += 1,
            ProbeState::Error => errors += 1,
        }
    }
    let _ = open;

    let proto = if mode.is_udp() { "udp" } else { "tcp" };
    if !open_only {
        if closed > 0 {
            out.push_str(&format!(
                "Not shown: {closed} closed {proto} ports (conn-refused)\n"
            ));
        }
        if filtered > 0 {
            out.push_str(&format!(
                "Not shown: {filtered} filtered {proto} ports (no-response)\n"
            ));
        }
        if errors > 0 {
            out.push_str(&format!(
                "Not shown: {errors} error {proto} ports (io-error)\n"
            ));
        }
    }

    let display: Vec<&&ProbeResult> = sorted
        .iter()
        .filter(|r| !open_only || r.state.is_open())
        .collect();

    if display.is_empty() {
        if !open_only && !sorted.is_empty() {
            let all_closed = closed == sorted.len();
            out.push_str(&format!(
                "All {} scanned {proto} ports on {address} are {}.\n",
                sorted.len(),
                if all_closed { "closed" } else { "filtered" }
            ));
        }
        out.push('\n');
        return out;
    }

    let show_detail = matches!(mode, ScanMode::TcpBanner);
    let mut header_line = format!("{:<9}{:<14}{:<12}", "PORT", "STATE", "SERVICE");
    if show_detail {
        header_line.push_str("DETAIL");
    }
    out.push_str(&header_line);
    out.push('\n');

    for result in display {
        let port_label = format!("{}/{proto}", result.port);
        let mut line = format!(
            "{:<9}{:<14}{:<12}",
            port_label,
            result.state.label(),
            service_name_for_port(result.port, mode.is_udp())
        );
        if show_detail {
            let mut detail = result
                .detail
                .replace('\n', " ")
                .replace('\r', " ")
                .replace('\t', " ");
            if detail.len() > 100 {
                detail.truncate(97);
                detail.push_str("...");
            }
            line.push_str(&detail);
        }
        out.push_str(&line);
        out.push('\n');
    }
    out.push('\n');
    out
}

/// One line describing a single probe outcome, in ping-mode or the
/// line-oriented (non-report) single-sweep path.
pub fn emit_port_result(
    record: &ScanRecord,
    reverse_map: &HashMap<String, String>,
    is_change: bool,
    mode: ScanMode,
    format: OutputFormat,
) -> String {
    if format == OutputFormat::Text {
        let prefix = if is_change { "CHANGE " } else { "" };
        return format!(
            "{prefix}{} {}:{} -> {} ({})\n",
            record.host,
            format_address_with_reverse(record.address, reverse_map),
            record.result.port,
            record.result.state,
            record.result.detail
        );
    }

    let address = record.address.to_string();
    let reverse = reverse_dns_for(record.address, reverse_map);
    format!(
        "{{\"event\":\"result\",\"change\":{},\"mode\":\"{}\",\"host\":\"{}\",\"address\":\"{}\",\"reverse_dns\":\"{}\",\"port\":{},\"state\":\"{}\",\"detail\":\"{}\"}}\n",
        is_change,
        json_escape(mode_label(mode)),
        json_escape(&record.host),
        json_escape(&address),
        json_escape(&reverse),
        record.result.port,
        json_escape(record.result.state.label()),
        json_escape(&record.result.detail),
    )
}

/// One line describing a single ICMP echo outcome.
pub fn emit_icmp_result(
    host: &str,
    addr: IpAddr,
    state: &str,
    detail: &str,
    reverse_map: &HashMap<String, String>,
    is_change: bool,
    format: OutputFormat,
) -> String {
    if format == OutputFormat::Text {
        let prefix = if is_change { "CHANGE " } else { "" };
        return format!(
            "{prefix}{host} {} -> {state} ({detail})\n",
            format_address_with_reverse(addr, reverse_map)
        );
    }

    let address = addr.to_string();
    let reverse = reverse_dns_for(addr, reverse_map);
    format!(
        "{{\"event\":\"result\",\"change\":{},\"mode\":\"icmp\",\"host\":\"{}\",\"address\":\"{}\",\"reverse_dns\":\"{}\",\"port\":null,\"state\":\"{}\",\"detail\":\"{}\"}}\n",
        is_change,
        json_escape(host),
        json_escape(&address),
        json_escape(&reverse),
        json_escape(state),
        json_escape(detail),
    )
}

/// A change-tracking key disappeared entirely this cycle (the host no longer
/// resolves to this address, or the address dropped out of a range).
pub fn emit_unavailable(key: &str, is_change: bool, mode_label: &str, format: OutputFormat) -> String {
    if format == OutputFormat::Text {
        let prefix = if is_change { "CHANGE " } else { "" };
        return format!("{prefix}{key} -> unavailable (no longer resolved)\n");
    }

    let parsed = parse_key(key);
    let mut out = format!(
        "{{\"event\":\"unavailable\",\"change\":{},\"mode\":\"{}\"",
        is_change,
        json_escape(mode_label)
    );
    match parsed {
        Some(p) => {
            out.push_str(&format!(
                ",\"host\":\"{}\",\"address\":\"{}\",\"port\":{}",
                json_escape(&p.host),
                json_escape(&p.address),
                p.port
            ));
        }
        None => {
            out.push_str(&format!(",\"key\":\"{}\"", json_escape(key)));
        }
    }
    out.push_str(",\"state\":\"unavailable\",\"detail\":\"no longer resolved\"}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{ProbeResult, ProbeState};
    use std::net::Ipv4Addr;

    #[test]
    fn json_escape_handles_control_chars() {
        assert_eq!(json_escape("a\"b\\c\n"), "a\\\"b\\\\c\\n");
        assert_eq!(json_escape("\u{1}"), "\\u0001");
    }

    #[test]
    fn parse_key_splits_on_last_colon() {
        let parsed = parse_key("host|10.0.0.1:8080").unwrap();
        assert_eq!(parsed.host, "host");
        assert_eq!(parsed.address, "10.0.0.1");
        assert_eq!(parsed.port, 8080);
    }

    #[test]
    fn parse_key_rejects_missing_port() {
        assert!(parse_key("host|10.0.0.1").is_none());
    }

    #[test]
    fn text_port_result_marks_changes() {
        let record = ScanRecord {
            host: "example.com".to_string(),
            address: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
            result: ProbeResult {
                port: 22,
                state: ProbeState::Open,
                detail: "connect succeeded".to_string(),
            },
        };
        let line = emit_port_result(&record, &HashMap::new(), true, ScanMode::TcpConnect, OutputFormat::Text);
        assert!(line.starts_with("CHANGE example.com"));
        assert!(line.contains("open"));
    }

    #[test]
    fn json_unavailable_falls_back_to_raw_key() {
        let line = emit_unavailable("not-a-key", false, "connect", OutputFormat::Json);
        assert!(line.contains("\"key\":\"not-a-key\""));
    }
}
