/// Target resolution: hostnames, IP literals, CIDR blocks, and dash ranges
/// expand into concrete addresses.
use crate::error::{ScanError, ScanResult};
use crate::options::ResolvedTarget;
use std::net::{IpAddr, Ipv4Addr};
use tokio::net::lookup_host;
use tracing::debug;

/// Resolve one host token (hostname, IP literal, CIDR, or dash range) to the
/// set of addresses it names.
///
/// This never fails on resolution problems: a DNS failure or an address
/// family filter that eliminates every candidate both print their own
/// message to stderr and come back as `Ok` with an empty address list, the
/// same shape the original uses so a caller only has to check
/// `addresses.is_empty()`. `parse_cidr`/`parse_dash_range` still return `Err`
/// for a malformed spec (bad prefix, backwards range): that's a user error,
/// not a resolution outcome.
pub async fn resolve_target(
    host: &str,
    ipv4_only: bool,
    ipv6_only: bool,
    debug_dns: bool,
) -> ScanResult<ResolvedTarget> {
    if let Some(addresses) = parse_cidr(host)? {
        return Ok(filtered_range_target(host, addresses, ipv6_only));
    }
    if let Some(addresses) = parse_dash_range(host)? {
        return Ok(filtered_range_target(host, addresses, ipv6_only));
    }
    if let Ok(addr) = host.parse::<IpAddr>() {
        let addresses = if (ipv4_only && addr.is_ipv6()) || (ipv6_only && addr.is_ipv4()) {
            vec![]
        } else {
            vec![addr]
        };
        return Ok(ResolvedTarget {
            host: host.to_string(),
            addresses,
            used_range: false,
        });
    }

    if debug_dns {
        debug!(host, "resolving via DNS");
    }
    // lookup_host requires a socket address; port 0 is a placeholder discarded below.
    let lookup_target = format!("{host}:0");
    let addrs = match lookup_host(&lookup_target).await {
        Ok(addrs) => addrs,
        Err(e) => {
            eprintln!("Failed to resolve host {host}: {e}");
            return Ok(ResolvedTarget {
                host: host.to_string(),
                addresses: vec![],
                used_range: false,
            });
        }
    };

    let mut addresses: Vec<IpAddr> = addrs
        .map(|sa| sa.ip())
        .filter(|ip| {
            if ipv4_only {
                ip.is_ipv4()
            } else if ipv6_only {
                ip.is_ipv6()
            } else {
                true
            }
        })
        .collect();
    addresses.dedup();

    if addresses.is_empty() {
        eprintln!("Failed to resolve host {host}: no addresses of the requested family");
    } else if debug_dns {
        debug!(host, ?addresses, "resolved");
    }

    Ok(ResolvedTarget {
        host: host.to_string(),
        addresses,
        used_range: false,
    })
}

/// CIDR/range expansion only ever produces IPv4 addresses, so `-4` is always
/// satisfied and `-6` always empties the result, matching `resolve_or_expand`.
fn filtered_range_target(host: &str, addresses: Vec<IpAddr>, ipv6_only: bool) -> ResolvedTarget {
    let addresses = if ipv6_only { vec![] } else { addresses };
    ResolvedTarget {
        host: host.to_string(),
        addresses,
        used_range: true,
    }
}

/// Parse `A.B.C.D/prefix` into every address in the block, including the
/// network and broadcast addresses.
fn parse_cidr(spec: &str) -> ScanResult<Option<Vec<IpAddr>>> {
    let Some((addr_part, prefix_part)) = spec.split_once('/') else {
        return Ok(None);
    };
    let Ok(base) = addr_part.parse::<Ipv4Addr>() else {
        return Ok(None);
    };
    let prefix: u32 = prefix_part.parse().map_err(|_| {
        ScanError::invalid_target(spec, "CIDR prefix is not a valid number")
    })?;
    if prefix > 32 {
        return Err(ScanError::invalid_target(
            spec,
            "CIDR prefix must be between 0 and 32",
        ));
    }

    let base_bits = u32::from(base);
    let host_bits = 32 - prefix;
    let mask = if host_bits == 32 {
        0
    } else {
        !0u32 << host_bits
    };
    let network = base_bits & mask;
    let count: u32 = if host_bits >= 32 { u32::MAX } else { 1u32 << host_bits };

    let mut addresses = Vec::with_capacity(count as usize);
    for offset in 0..count {
        addresses.push(IpAddr::V4(Ipv4Addr::from(network.wrapping_add(offset))));
        if offset == u32::MAX {
            break;
        }
    }
    Ok(Some(addresses))
}

/// Parse `A.B.C.D-E.F.G.H` or the shorthand `A.B.C.D-N` (same first three
/// octets, last octet spans to `N`) into every address in the inclusive range.
fn parse_dash_range(spec: &str) -> ScanResult<Option<Vec<IpAddr>>> {
    let Some((start_part, end_part)) = spec.split_once('-') else {
        return Ok(None);
    };
    let Ok(start) = start_part.parse::<Ipv4Addr>() else {
        return Ok(None);
    };

    let end = if let Ok(end) = end_part.parse::<Ipv4Addr>() {
        end
    } else if let Ok(last_octet) = end_part.parse::<u8>() {
        let [a, b, c, _] = start.octets();
        Ipv4Addr::new(a, b, c, last_octet)
    } else {
        return Err(ScanError::invalid_target(
            spec,
            "range end is neither an IPv4 address nor a last-octet number",
        ));
    };

    let start_bits = u32::from(start);
    let end_bits = u32::from(end);
    if start_bits > end_bits {
        return Err(ScanError::invalid_target(
            spec,
            "range start is greater than range end",
        ));
    }

    let addresses = (start_bits..=end_bits)
        .map(|bits| IpAddr::V4(Ipv4Addr::from(bits)))
        .collect();
    Ok(Some(addresses))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cidr_includes_network_and_broadcast() {
        let addrs = parse_cidr("192.168.1.0/30").unwrap().unwrap();
        assert_eq!(
            addrs,
            vec![
                IpAddr::V4(Ipv4Addr::new(192, 168, 1, 0)),
                IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1)),
                IpAddr::V4(Ipv4Addr::new(192, 168, 1, 2)),
                IpAddr::V4(Ipv4Addr::new(192, 168, 1, 3)),
            ]
        );
    }

    #[test]
    fn cidr_slash_32_is_single_host() {
        let addrs = parse_cidr("10.0.0.5/32").unwrap().unwrap();
        assert_eq!(addrs, vec![IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5))]);
    }

    #[test]
    fn full_range_explicit() {
        let addrs = parse_dash_range("10.0.0.1-10.0.0.3").unwrap().unwrap();
        assert_eq!(
            addrs,
            vec![
                IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
                IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)),
                IpAddr::V4(Ipv4Addr::new(10, 0, 0, 3)),
            ]
        );
    }

    #[test]
    fn last_octet_shorthand() {
        let addrs = parse_dash_range("10.0.0.1-3").unwrap().unwrap();
        assert_eq!(
            addrs,
            vec![
                IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
                IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)),
                IpAddr::V4(Ipv4Addr::new(10, 0, 0, 3)),
            ]
        );
    }

    #[test]
    fn rejects_backwards_range() {
        assert!(parse_dash_range("10.0.0.5-10.0.0.1").is_err());
    }

    #[test]
    fn plain_hostname_is_not_a_range_or_cidr() {
        assert!(parse_cidr("example.com").unwrap().is_none());
        assert!(parse_dash_range("example.com").unwrap().is_none());
    }

    #[tokio::test]
    async fn ipv6_only_empties_a_v4_cidr() {
        let resolved = resolve_target("10.0.0.0/30", false, true, false).await.unwrap();
        assert!(resolved.addresses.is_empty());
        assert!(resolved.used_range);
    }

    #[tokio::test]
    async fn ipv4_only_keeps_a_v4_cidr() {
        let resolved = resolve_target("10.0.0.0/30", true, false, false).await.unwrap();
        assert_eq!(resolved.addresses.len(), 4);
    }

    #[tokio::test]
    async fn ip_literal_resolves_to_itself() {
        let resolved = resolve_target("127.0.0.1", false, false, false).await.unwrap();
        assert_eq!(resolved.addresses, vec![IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))]);
        assert!(!resolved.used_range);
    }

    #[tokio::test]
    async fn ipv4_only_empties_a_v6_literal() {
        let resolved = resolve_target("::1", true, false, false).await.unwrap();
        assert!(resolved.addresses.is_empty());
    }

    #[tokio::test]
    async fn ipv6_only_empties_a_v4_literal() {
        let resolved = resolve_target("127.0.0.1", false, true, false).await.unwrap();
        assert!(resolved.addresses.is_empty());
    }
}
