/// Best-effort reverse-DNS (PTR) lookups for a batch of addresses, used to
/// annotate output when `--reverse-dns` is set.
use std::collections::HashMap;
use std::net::IpAddr;

use dns_lookup::lookup_addr;
use tracing::debug;

/// Resolve a PTR name for every address in `addresses`, skipping any that
/// fail to resolve. Each lookup is blocking, so they run on the blocking
/// thread pool and complete concurrently.
pub async fn build_reverse_map(addresses: &[IpAddr]) -> HashMap<String, String> {
    let mut tasks = Vec::with_capacity(addresses.len());
    for addr in addresses.iter().copied() {
        tasks.push(tokio::task::spawn_blocking(move || {
            let name = lookup_addr(&addr).ok();
            (addr, name)
        }));
    }

    let mut map = HashMap::with_capacity(addresses.len());
    for task in tasks {
        if let Ok((addr, Some(name))) = task.await {
            debug!(%addr, %name, "reverse dns resolved");
            map.insert(addr.to_string(), name);
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn lookup_of_documentation_address_does_not_panic() {
        // TEST-NET-1; has no PTR record in any real zone, so this should come
        // back empty rather than resolving to something.
        let addr = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 123));
        let map = build_reverse_map(&[addr]).await;
        assert!(map.len() <= 1);
    }

    #[tokio::test]
    async fn empty_input_yields_empty_map() {
        let map = build_reverse_map(&[]).await;
        assert!(map.is_empty());
    }
}
