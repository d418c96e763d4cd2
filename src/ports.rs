/// Port list parsing and the default/popular/service-name tables.
use crate::error::{ScanError, ScanResult};

/// The 32 ports scanned when no `-p`/`--top-ports` flag is given.
pub fn default_dev_ports() -> Vec<u16> {
    vec![
        22, 80, 443, 3000, 3001, 3002, 4000, 4200, 5000, 5001, 5173, 5432, 5672, 6379, 8000,
        8080, 8081, 8082, 8443, 9000, 9090, 9092, 9200, 9300, 11211, 15672, 2181, 27017, 3306,
        6006, 9222, 9229,
    ]
}

/// The larger popular-port list used by `--top-ports`, ordered the same way
/// the original's table is. `top_ports(n)` returns a prefix of this list.
pub fn popular_ports() -> Vec<u16> {
    vec![
        20, 21, 22, 23, 25, 53, 80, 81, 88, 110, 111, 113, 119, 135, 139, 143, 161, 389, 443,
        445, 465, 512, 513, 514, 515, 543, 544, 548, 554, 587, 631, 636, 873, 902, 993, 995,
        1025, 1080, 1433, 1723, 2049, 2082, 2083, 3306, 3389, 5432, 5900, 6379, 8080, 8443,
    ]
}

/// `top_ports(n)` returns the first `n` entries of [`popular_ports`], clamped to
/// the table length.
pub fn top_ports(n: usize) -> Vec<u16> {
    let table = popular_ports();
    let n = n.min(table.len());
    table[..n].to_vec()
}

/// Parse a comma-separated port list where each token is either a single port
/// or an inclusive `a-b` range (e.g. `22,80,8000-8010`).
///
/// Deliberately does not sort or deduplicate the result: ports are reported in
/// the order they were requested, matching the behavior this was distilled from.
pub fn parse_ports(spec: &str) -> ScanResult<Vec<u16>> {
    let mut ports = Vec::new();
    for token in spec.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        if let Some((start, end)) = token.split_once('-') {
            let start: u16 = start.trim().parse().map_err(|_| ScanError::InvalidPort {
                port: token.to_string(),
                reason: "not a valid range start".to_string(),
            })?;
            let end: u16 = end.trim().parse().map_err(|_| ScanError::InvalidPort {
                port: token.to_string(),
                reason: "not a valid range end".to_string(),
            })?;
            let (start, end) = if start > end { (end, start) } else { (start, end) };
            for p in start..=end {
                ports.push(p);
            }
        } else {
            let port: u16 = token.parse().map_err(|_| ScanError::InvalidPort {
                port: token.to_string(),
                reason: "not a valid port number".to_string(),
            })?;
            ports.push(port);
        }
    }
    Ok(ports)
}

/// Well-known TCP service name for `port`, if this table has one.
pub fn tcp_service_name(port: u16) -> Option<&'static str> {
    match port {
        20 => Some("ftp-data"),
        21 => Some("ftp"),
        22 => Some("ssh"),
        23 => Some("telnet"),
        25 => Some("smtp"),
        53 => Some("domain"),
        80 => Some("http"),
        81 => Some("http-alt"),
        88 => Some("kerberos"),
        110 => Some("pop3"),
        111 => Some("rpcbind"),
        135 => Some("msrpc"),
        139 => Some("netbios-ssn"),
        143 => Some("imap"),
        389 => Some("ldap"),
        443 => Some("https"),
        445 => Some("microsoft-ds"),
        465 => Some("smtps"),
        587 => Some("submission"),
        631 => Some("ipp"),
        873 => Some("rsync"),
        993 => Some("imaps"),
        995 => Some("pop3s"),
        1433 => Some("ms-sql"),
        2049 => Some("nfs"),
        3306 => Some("mysql"),
        3389 => Some("ms-wbt-server"),
        5432 => Some("postgresql"),
        5672 => Some("amqp"),
        5900 => Some("vnc"),
        6379 => Some("redis"),
        8080 => Some("http-alt"),
        8443 => Some("https-alt"),
        9092 => Some("kafka"),
        9200 => Some("elasticsearch"),
        9300 => Some("elasticsearch"),
        11211 => Some("memcache"),
        27017 => Some("mongodb"),
        _ => None,
    }
}

/// Well-known UDP service name for `port`, if this table has one.
pub fn udp_service_name(port: u16) -> Option<&'static str> {
    match port {
        53 => Some("domain"),
        67 | 68 => Some("dhcp"),
        69 => Some("tftp"),
        123 => Some("ntp"),
        161 => Some("snmp"),
        500 => Some("isakmp"),
        1900 => Some("ssdp"),
        5353 => Some("mdns"),
        _ => None,
    }
}

/// Service name lookup for the given mode (`udp` uses the UDP table, everything
/// else the TCP table), falling back to `"unknown"`.
pub fn service_name_for_port(port: u16, is_udp: bool) -> &'static str {
    let hit = if is_udp {
        udp_service_name(port)
    } else {
        tcp_service_name(port)
    };
    hit.unwrap_or("unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_list() {
        let ports = parse_ports("22,80,8000-8002").unwrap();
        assert_eq!(ports, vec![22, 80, 8000, 8001, 8002]);
    }

    #[test]
    fn preserves_duplicates_and_order() {
        let ports = parse_ports("80,22,80").unwrap();
        assert_eq!(ports, vec![80, 22, 80]);
    }

    #[test]
    fn swapped_range_expands_the_same_as_in_order() {
        let swapped = parse_ports("100-50").unwrap();
        let in_order = parse_ports("50-100").unwrap();
        assert_eq!(swapped, in_order);
        assert_eq!(swapped, (50..=100).collect::<Vec<u16>>());
    }

    #[test]
    fn rejects_garbage_token() {
        assert!(parse_ports("http").is_err());
    }

    #[test]
    fn top_ports_clamps_to_table_length() {
        let all = popular_ports();
        assert_eq!(top_ports(10_000).len(), all.len());
        assert_eq!(top_ports(5), &all[..5]);
    }

    #[test]
    fn default_dev_ports_has_32_entries() {
        assert_eq!(default_dev_ports().len(), 32);
    }

    #[test]
    fn service_names_fall_back_to_unknown() {
        assert_eq!(service_name_for_port(80, false), "http");
        assert_eq!(service_name_for_port(53, true), "domain");
        assert_eq!(service_name_for_port(1, false), "unknown");
    }
}
