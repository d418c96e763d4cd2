/// ICMP echo probe over a raw socket.
///
/// Raw sockets are blocking by nature and not integrated with tokio's
/// reactor, so the whole send/receive round trip for one probe runs on the
/// blocking thread pool via `spawn_blocking`, with a kernel-side read
/// deadline doing the work `tokio::time::timeout` does for the other probes.
use std::io::{self, Read};
use std::net::{IpAddr, Ipv6Addr, SocketAddr, UdpSocket};
use std::sync::Arc;
use std::time::{Duration, Instant};

use socket2::{Domain, Protocol, SockAddr, Socket, Type};

use crate::error::ScanError;
use crate::options::{IcmpResult, IcmpState, ICMP_PERMISSION_MARKER};
use crate::packet::icmp_codec::IcmpCodec;

pub async fn probe_once(addr: IpAddr, deadline: Duration, codec: Arc<IcmpCodec>) -> IcmpResult {
    match tokio::task::spawn_blocking(move || blocking_round_trip(addr, deadline, &codec)).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => IcmpResult {
            state: IcmpState::Error,
            detail: e.to_string(),
        },
        Err(_) => IcmpResult {
            state: IcmpState::Error,
            detail: "probe task panicked".to_string(),
        },
    }
}

fn blocking_round_trip(
    addr: IpAddr,
    deadline: Duration,
    codec: &IcmpCodec,
) -> Result<IcmpResult, ScanError> {
    let mut socket = open_socket(addr)?;

    let (packet, seq) = match addr {
        IpAddr::V4(_) => codec.build_echo_request_v4()?,
        IpAddr::V6(v6) => {
            let source = local_v6_source(v6)?;
            codec.build_echo_request_v6(Some(source), v6)?
        }
    };

    let dest: SockAddr = SocketAddr::new(addr, 0).into();
    socket.send_to(&packet, &dest)?;

    let deadline_instant = Instant::now() + deadline;
    let mut buf = [0u8; 1024];
    loop {
        let remaining = deadline_instant.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(IcmpResult::down("timeout"));
        }
        socket.set_read_timeout(Some(remaining))?;
        match socket.read(&mut buf) {
            Ok(n) => {
                let matched = match addr {
                    IpAddr::V4(_) => codec.matches_echo_reply_v4(&buf[..n], seq),
                    IpAddr::V6(_) => codec.matches_echo_reply_v6(&buf[..n], seq),
                };
                if matched {
                    return Ok(IcmpResult {
                        state: IcmpState::Up,
                        detail: "echo reply".to_string(),
                    });
                }
                // Unrelated ICMP traffic sharing this socket; keep waiting.
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut => {
                return Ok(IcmpResult::down("timeout"));
            }
            Err(e) => return Err(ScanError::Io(e)),
        }
    }
}

/// Find the local IPv6 address that would be used to reach `destination`, by
/// connecting a UDP socket to it and reading back the local endpoint the
/// kernel picked. No packet is ever sent on this socket; it only exists to
/// ask the routing table for a source address, matching the pseudo-header
/// the destination's kernel will expect.
fn local_v6_source(destination: Ipv6Addr) -> Result<Ipv6Addr, ScanError> {
    let socket = UdpSocket::bind("[::]:0")?;
    socket.connect(SocketAddr::new(IpAddr::V6(destination), 0))?;
    match socket.local_addr()?.ip() {
        IpAddr::V6(source) => Ok(source),
        IpAddr::V4(_) => Err(ScanError::packet_error(
            "UDP socket connected to an IPv6 destination returned an IPv4 local address",
        )),
    }
}

fn open_socket(addr: IpAddr) -> Result<Socket, ScanError> {
    let (domain, protocol) = match addr {
        IpAddr::V4(_) => (Domain::IPV4, Protocol::ICMPV4),
        IpAddr::V6(_) => (Domain::IPV6, Protocol::ICMPV6),
    };
    Socket::new(domain, Type::RAW, Some(protocol)).map_err(|e| {
        if e.kind() == io::ErrorKind::PermissionDenied {
            ScanError::permission_denied(permission_hint())
        } else {
            ScanError::Io(e)
        }
    })
}

fn permission_hint() -> String {
    format!("{ICMP_PERMISSION_MARKER} root or CAP_NET_RAW (try: sudo setcap cap_net_raw+ep ./pulsescan)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_hint_contains_marker() {
        assert!(permission_hint().starts_with(ICMP_PERMISSION_MARKER));
    }
}
