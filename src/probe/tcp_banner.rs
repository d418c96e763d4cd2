/// TCP connect probe that, once connected, waits briefly for the service to
/// speak first and reports what it sent.
use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::options::{ProbeResult, ProbeState};

pub async fn probe(
    addr: IpAddr,
    port: u16,
    connect_deadline: Duration,
    banner_deadline: Duration,
    banner_bytes: usize,
) -> ProbeResult {
    let target = SocketAddr::new(addr, port);
    let mut stream = match timeout(connect_deadline, TcpStream::connect(target)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) if e.kind() == ErrorKind::ConnectionRefused => {
            return ProbeResult {
                port,
                state: ProbeState::Closed,
                detail: e.to_string(),
            };
        }
        Ok(Err(e)) => {
            return ProbeResult {
                port,
                state: ProbeState::Error,
                detail: e.to_string(),
            };
        }
        Err(_) => {
            return ProbeResult {
                port,
                state: ProbeState::FilteredTimeout,
                detail: "no response before deadline".to_string(),
            };
        }
    };

    let mut buf = vec![0u8; banner_bytes.max(1)];
    let detail = match timeout(banner_deadline, stream.read(&mut buf)).await {
        Ok(Ok(0)) => "no banner data".to_string(),
        Ok(Ok(n)) => {
            let banner = String::from_utf8_lossy(&buf[..n]);
            format!("banner: {banner}")
        }
        Ok(Err(e)) => format!("read error: {e}"),
        Err(_) => "no banner before deadline".to_string(),
    };

    ProbeResult {
        port,
        state: ProbeState::Open,
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn reads_banner_the_service_sends() {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                let _ = stream.write_all(b"hello\r\n").await;
            }
        });

        let result = probe(
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            port,
            Duration::from_millis(500),
            Duration::from_millis(500),
            128,
        )
        .await;
        assert_eq!(result.state, ProbeState::Open);
        assert!(result.detail.contains("hello"));
    }

    #[tokio::test]
    async fn silent_service_reports_no_banner() {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let accept_task = tokio::spawn(async move {
            let _accepted = listener.accept().await;
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let result = probe(
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            port,
            Duration::from_millis(500),
            Duration::from_millis(100),
            128,
        )
        .await;
        assert_eq!(result.state, ProbeState::Open);
        assert_eq!(result.detail, "no banner before deadline");
        accept_task.abort();
    }
}
