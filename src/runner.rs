/// Bounded-concurrency sweep of one host's (address, port) pairs.
///
/// A single coordinator owns the work queue and the in-flight task set, so no
/// shared mutable state crosses a task boundary and no locking is needed: it
/// tops the `JoinSet` up to `max_inflight` probes, waits for the next one to
/// finish, delivers the result, and repeats until both the queue and the set
/// are empty.
use std::collections::VecDeque;
use std::net::IpAddr;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::warn;

use crate::options::{ProbeResult, ScanMode, ScanOptions};
use crate::probe::{tcp_banner, tcp_connect, udp};

async fn scan_one(addr: IpAddr, port: u16, opts: Arc<ScanOptions>) -> ProbeResult {
    match opts.mode {
        ScanMode::TcpConnect => tcp_connect::probe(addr, port, opts.timeout).await,
        ScanMode::TcpBanner => {
            tcp_banner::probe(addr, port, opts.timeout, opts.banner_timeout, opts.banner_bytes).await
        }
        ScanMode::Udp => udp::probe(addr, port, opts.timeout).await,
    }
}

/// Probe every `(address, port)` pair for `addresses x opts.ports`, invoking
/// `on_result` for each completed probe as soon as it finishes (order is not
/// guaranteed). Runs up to `opts.max_inflight` probes concurrently.
pub async fn run_scans<F>(addresses: &[IpAddr], opts: Arc<ScanOptions>, mut on_result: F)
where
    F: FnMut(IpAddr, ProbeResult),
{
    if addresses.is_empty() || opts.ports.is_empty() {
        return;
    }

    let mut queue: VecDeque<(IpAddr, u16)> = VecDeque::with_capacity(addresses.len() * opts.ports.len());
    for &addr in addresses {
        for &port in &opts.ports {
            queue.push_back((addr, port));
        }
    }

    let mut inflight: JoinSet<(IpAddr, ProbeResult)> = JoinSet::new();

    loop {
        while inflight.len() < opts.max_inflight.max(1) {
            let Some((addr, port)) = queue.pop_front() else {
                break;
            };
            let task_opts = opts.clone();
            inflight.spawn(async move {
                let result = scan_one(addr, port, task_opts).await;
                (addr, result)
            });
        }

        let Some(joined) = inflight.join_next().await else {
            break;
        };

        match joined {
            Ok((addr, result)) => on_result(addr, result),
            Err(e) => {
                warn!(error = %e, "probe task failed to join");
            }
        }
    }
}

/// Build a `"host|address:port"` change-tracking key identical across cycles
/// for the same address/port pairing.
pub fn fingerprint_key(host: &str, addr: IpAddr, port: u16) -> String {
    format!("{host}|{addr}:{port}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ProbeState;
    use std::net::Ipv4Addr;
    use std::sync::Mutex;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn visits_every_address_port_pair() {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let accept_task = tokio::spawn(async move {
            loop {
                if listener.accept().await.is_err() {
                    break;
                }
            }
        });

        let opts = Arc::new(ScanOptions {
            ports: vec![port],
            max_inflight: 4,
            ..ScanOptions::default()
        });
        let addresses = vec![IpAddr::V4(Ipv4Addr::LOCALHOST)];
        let results = Mutex::new(Vec::new());

        run_scans(&addresses, opts, |addr, result| {
            results.lock().unwrap().push((addr, result));
        })
        .await;

        let results = results.into_inner().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].1.state, ProbeState::Open);
        accept_task.abort();
    }

    #[test]
    fn fingerprint_key_is_stable() {
        let addr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(fingerprint_key("example.com", addr, 80), "example.com|10.0.0.1:80");
    }
}
