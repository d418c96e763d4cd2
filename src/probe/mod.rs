//! One state machine per scan mode plus the ICMP echo probe.
pub mod icmp;
pub mod tcp_banner;
pub mod tcp_connect;
pub mod udp;
