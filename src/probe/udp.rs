/// UDP probe: send a service-specific payload and see whether anything comes
/// back. A connected socket surfaces ICMP port-unreachable replies as a
/// `ConnectionRefused`/`ConnectionReset` error on send or receive instead of
/// silently swallowing them.
use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::timeout;

use crate::options::{ProbeResult, ProbeState};
use crate::udp_probes::udp_probe_payload;

fn is_unreachable(kind: ErrorKind) -> bool {
    matches!(kind, ErrorKind::ConnectionRefused | ErrorKind::ConnectionReset)
}

pub async fn probe(addr: IpAddr, port: u16, deadline: Duration) -> ProbeResult {
    let unspecified: SocketAddr = if addr.is_ipv4() {
        (std::net::Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
    };

    let socket = match UdpSocket::bind(unspecified).await {
        Ok(s) => s,
        Err(e) => {
            return ProbeResult {
                port,
                state: ProbeState::Error,
                detail: format!("open failed: {e}"),
            };
        }
    };

    let target = SocketAddr::new(addr, port);
    if let Err(e) = socket.connect(target).await {
        return ProbeResult {
            port,
            state: ProbeState::Error,
            detail: format!("connect failed: {e}"),
        };
    }

    let payload = udp_probe_payload(port);
    if let Err(e) = socket.send(&payload).await {
        return if is_unreachable(e.kind()) {
            ProbeResult {
                port,
                state: ProbeState::Closed,
                detail: e.to_string(),
            }
        } else {
            ProbeResult {
                port,
                state: ProbeState::Error,
                detail: format!("send failed: {e}"),
            }
        };
    }

    let mut buf = vec![0u8; 512];
    match timeout(deadline, socket.recv(&mut buf)).await {
        Ok(Ok(n)) if n > 0 => ProbeResult {
            port,
            state: ProbeState::Open,
            detail: format!("received {n} bytes"),
        },
        Ok(Ok(_)) => ProbeResult {
            port,
            state: ProbeState::OpenFiltered,
            detail: "no response before deadline".to_string(),
        },
        Ok(Err(e)) if is_unreachable(e.kind()) => ProbeResult {
            port,
            state: ProbeState::Closed,
            detail: e.to_string(),
        },
        Ok(Err(e)) => ProbeResult {
            port,
            state: ProbeState::Error,
            detail: e.to_string(),
        },
        Err(_) => ProbeResult {
            port,
            state: ProbeState::OpenFiltered,
            detail: "no response before deadline".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn silent_service_is_open_filtered() {
        let listener = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        // Hold the socket open but never reply.
        let _keepalive = listener;

        let result = probe(
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            port,
            Duration::from_millis(150),
        )
        .await;
        assert_eq!(result.state, ProbeState::OpenFiltered);
    }

    #[tokio::test]
    async fn responding_service_is_open() {
        let listener = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut buf = [0u8; 64];
            if let Ok((n, from)) = listener.recv_from(&mut buf).await {
                let _ = listener.send_to(&buf[..n], from).await;
            }
        });

        let result = probe(
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            port,
            Duration::from_millis(500),
        )
        .await;
        assert_eq!(result.state, ProbeState::Open);
    }
}
