/// Plain TCP connect probe: the state is entirely determined by whether and
/// how the connection attempt fails.
use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::options::{ProbeResult, ProbeState};

pub async fn probe(addr: IpAddr, port: u16, deadline: Duration) -> ProbeResult {
    let target = SocketAddr::new(addr, port);
    match timeout(deadline, TcpStream::connect(target)).await {
        Ok(Ok(_stream)) => ProbeResult {
            port,
            state: ProbeState::Open,
            detail: "connect succeeded".to_string(),
        },
        Ok(Err(e)) if e.kind() == ErrorKind::ConnectionRefused => ProbeResult {
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
            state: ProbeState::FilteredTimeout,
            detail: "no response before deadline".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn open_port_reports_open() {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let accept_task = tokio::spawn(async move {
            let _ = listener.accept().await;
        });

        let result = probe(IpAddr::V4(Ipv4Addr::LOCALHOST), port, Duration::from_millis(500)).await;
        assert_eq!(result.state, ProbeState::Open);
        accept_task.abort();
    }

    #[tokio::test]
    async fn closed_port_reports_closed() {
        // Bind then drop to free a port that's very likely to bounce RST on connect.
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = probe(IpAddr::V4(Ipv4Addr::LOCALHOST), port, Duration::from_millis(500)).await;
        assert_eq!(result.state, ProbeState::Closed);
    }
}
