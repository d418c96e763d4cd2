/// Change-detection loop for TCP/UDP port scanning: re-sweeps every host on a
/// fixed interval and reports only first-pass results, state transitions, and
/// disappearances.
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::trace;

use crate::options::{ProbeResult, ScanOptions, ScanRecord};
use crate::output::{emit_port_result, emit_unavailable};
use crate::resolver::resolve_target;
use crate::reverse_dns::build_reverse_map;
use crate::runner::{fingerprint_key, run_scans};
use crate::status::ScanStatus;

/// Run `ping_loop` forever (until the process is signaled), printing each
/// cycle's output to stdout.
pub async fn run(hosts: &[String], opts: Arc<ScanOptions>, status: Arc<ScanStatus>) {
    use std::sync::atomic::Ordering;

    let mut last_state: HashMap<String, (String, String)> = HashMap::new();
    let mut first_pass = true;

    status.total_hosts.store(hosts.len() as u64, Ordering::Relaxed);

    loop {
        trace!("ping cycle start");
        status.cycles.fetch_add(1, Ordering::Relaxed);
        status.completed_targets.store(0, Ordering::Relaxed);
        status.completed_hosts.store(0, Ordering::Relaxed);

        let mut current_keys: HashSet<String> = HashSet::new();
        let mut cycle_total: u64 = 0;
        let mut targets = Vec::with_capacity(hosts.len());
        for host in hosts {
            match resolve_target(host, opts.ipv4_only, opts.ipv6_only, opts.debug_dns).await {
                Ok(resolved) if !resolved.addresses.is_empty() => {
                    cycle_total += resolved.addresses.len() as u64 * opts.ports.len() as u64;
                    targets.push(resolved);
                }
                Ok(resolved) => {
                    if resolved.used_range {
                        eprintln!("No addresses after IP filter for host {host}");
                    }
                }
                Err(e) => {
                    tracing::warn!(host, error = %e, "invalid target");
                }
            }
        }
        status.total_targets.store(cycle_total, Ordering::Relaxed);

        for target in &targets {
            let reverse_map = if opts.reverse_dns {
                build_reverse_map(&target.addresses).await
            } else {
                HashMap::new()
            };

            let host = target.host.clone();
            let opts_for_cycle = opts.clone();
            run_scans(&target.addresses, opts_for_cycle, |addr, result: ProbeResult| {
                status.completed_targets.fetch_add(1, Ordering::Relaxed);
                let key = fingerprint_key(&host, addr, result.port);
                current_keys.insert(key.clone());
                let current = (result.state.label().to_string(), result.detail.clone());

                let changed = match last_state.get(&key) {
                    Some(prev) => *prev != current,
                    None => true,
                };
                if first_pass || changed {
                    if !opts.open_only || result.state.is_open() {
                        let record = ScanRecord {
                            host: host.clone(),
                            address: addr,
                            result,
                        };
                        print!(
                            "{}",
                            emit_port_result(&record, &reverse_map, !first_pass, opts.mode, opts.output_format)
                        );
                    }
                    last_state.insert(key, current);
                }
            })
            .await;

            status.completed_hosts.fetch_add(1, Ordering::Relaxed);
        }

        if !first_pass {
            last_state.retain(|key, _| {
                if current_keys.contains(key) {
                    true
                } else {
                    if !opts.open_only {
                        print!("{}", emit_unavailable(key, true, opts.mode.label(), opts.output_format));
                    }
                    false
                }
            });
        }
        first_pass = false;

        trace!("ping cycle end");
        tokio::time::sleep(opts.ping_interval).await;
    }
}
