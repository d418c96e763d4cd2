/// ICMP echo sweeps: a single pass (`--icmp-ping`) and a change-detection loop
/// (`--icmp-ping --ping-mode`).
use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tracing::trace;

use crate::options::{IcmpResult, IcmpState, ScanOptions, ICMP_PERMISSION_MARKER};
use crate::output::{emit_icmp_result, emit_unavailable};
use crate::packet::IcmpCodec;
use crate::probe::icmp::probe_once;
use crate::resolver::resolve_target;
use crate::reverse_dns::build_reverse_map;
use crate::status::ScanStatus;

/// Change-tracking key for one host/address ICMP result. Deliberately carries
/// no port (ICMP has none); JSON rendering of a disappearance falls back to a
/// raw `key` field since this can't always be split back into host/address.
fn icmp_key(host: &str, addr: IpAddr) -> String {
    format!("{host}|{addr}")
}

/// Ping `addr` up to `opts.icmp_count` times, stopping early on the first
/// reply. Returns `Err(detail)` if a reply is unreachable because ICMP needs
/// privileges this process doesn't have; the caller should abort the whole
/// sweep in that case exactly like the C++ original does.
async fn ping_with_retries(
    addr: IpAddr,
    opts: &ScanOptions,
    codec: &Arc<IcmpCodec>,
) -> Result<IcmpResult, String> {
    let mut final_result = IcmpResult::down("timeout");
    for _ in 0..opts.icmp_count.max(1) {
        let result = probe_once(addr, opts.timeout, codec.clone()).await;
        if result.state == IcmpState::Up {
            final_result = result;
            break;
        }
        if result.state == IcmpState::Error && result.detail.contains(ICMP_PERMISSION_MARKER) {
            eprintln!("{}", result.detail);
            return Err(result.detail);
        }
        final_result = result;
    }
    if opts.icmp_count > 1 && final_result.state == IcmpState::Down {
        final_result.detail = format!("timeout ({}x)", opts.icmp_count);
    }
    Ok(final_result)
}

/// One sweep of `hosts`. `last_state`, when `Some`, is used both to suppress
/// unchanged results and to detect addresses that disappeared since the
/// previous cycle; `changes_only` controls whether unchanged first-cycle
/// results are still printed as non-change lines (matching the port-mode
/// ping loop's `first_pass` behavior).
async fn scan_hosts_once(
    hosts: &[String],
    opts: &ScanOptions,
    codec: &Arc<IcmpCodec>,
    status: &ScanStatus,
    last_state: &mut Option<HashMap<String, (String, String)>>,
) {
    let first_pass = last_state.as_ref().map(|m| m.is_empty()).unwrap_or(true);
    let mut current_keys: HashSet<String> = HashSet::new();

    for host in hosts {
        let resolved = match resolve_target(host, opts.ipv4_only, opts.ipv6_only, opts.debug_dns).await {
            Ok(r) if !r.addresses.is_empty() => r,
            Ok(r) => {
                if r.used_range {
                    eprintln!("No addresses after IP filter for host {host}");
                }
                continue;
            }
            Err(e) => {
                trace!(host, error = %e, "invalid target");
                continue;
            }
        };

        status.total_hosts.fetch_add(1, Ordering::Relaxed);
        let reverse_map = if opts.reverse_dns {
            build_reverse_map(&resolved.addresses).await
        } else {
            HashMap::new()
        };

        for addr in resolved.addresses {
            let result = match ping_with_retries(addr, opts, codec).await {
                Ok(r) => r,
                Err(_) => return,
            };

            let key = icmp_key(host, addr);
            current_keys.insert(key.clone());
            let current = (result.state.label().to_string(), result.detail.clone());

            match last_state {
                Some(map) => {
                    let changed = map.get(&key).map(|prev| *prev != current).unwrap_or(true);
                    if first_pass || changed {
                        if !opts.open_only || result.state.is_up() {
                            print!(
                                "{}",
                                emit_icmp_result(
                                    host,
                                    addr,
                                    &result.state.to_string(),
                                    &result.detail,
                                    &reverse_map,
                                    !first_pass,
                                    opts.output_format,
                                )
                            );
                        }
                        map.insert(key, current);
                    }
                }
                None => {
                    if !opts.open_only || result.state.is_up() {
                        print!(
                            "{}",
                            emit_icmp_result(
                                host,
                                addr,
                                &result.state.to_string(),
                                &result.detail,
                                &reverse_map,
                                false,
                                opts.output_format,
                            )
                        );
                    }
                }
            }
            status.completed_hosts.fetch_add(1, Ordering::Relaxed);
        }
    }

    if let Some(map) = last_state {
        if !first_pass {
            map.retain(|key, _| {
                if current_keys.contains(key) {
                    true
                } else {
                    if !opts.open_only {
                        print!("{}", emit_unavailable(key, true, "icmp", opts.output_format));
                    }
                    false
                }
            });
        }
    }
}

/// `--icmp-ping` without `--ping-mode`: one sweep, no change tracking.
pub async fn run_single_pass(hosts: &[String], opts: Arc<ScanOptions>, status: Arc<ScanStatus>) {
    let codec = Arc::new(IcmpCodec::new(std::process::id() as u16));
    let mut last_state = None;
    scan_hosts_once(hosts, &opts, &codec, &status, &mut last_state).await;
}

/// `--icmp-ping --ping-mode`: sweep forever on `opts.ping_interval`, reporting
/// only first-pass results, changes, and disappearances.
pub async fn run_loop(hosts: &[String], opts: Arc<ScanOptions>, status: Arc<ScanStatus>) {
    let codec = Arc::new(IcmpCodec::new(std::process::id() as u16));
    let mut last_state = Some(HashMap::new());

    loop {
        trace!("icmp ping cycle start");
        status.cycles.fetch_add(1, Ordering::Relaxed);
        scan_hosts_once(hosts, &opts, &codec, &status, &mut last_state).await;
        trace!("icmp ping cycle end");
        tokio::time::sleep(opts.ping_interval).await;
    }
}
