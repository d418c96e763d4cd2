/// Service-specific UDP probe payloads.
///
/// Sending an empty datagram gets a closed port's ICMP port-unreachable back
/// reliably, but says nothing about an open one: most UDP services stay
/// silent unless they recognize the payload. Each of these mimics the start
/// of a real client handshake for a specific protocol.

/// DNS query for the A record of example.com.
fn dns_query_example_com() -> Vec<u8> {
    vec![
        0x12, 0x34, // ID
        0x01, 0x00, // flags: recursion desired
        0x00, 0x01, // QDCOUNT
        0x00, 0x00, // ANCOUNT
        0x00, 0x00, // NSCOUNT
        0x00, 0x00, // ARCOUNT
        0x07, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 0x03, b'c', b'o', b'm',
        0x00, // end of name
        0x00, 0x01, // QTYPE A
        0x00, 0x01, // QCLASS IN
    ]
}

/// Long-header QUIC packet carrying an unsupported version, to elicit a
/// version-negotiation response.
fn quic_version_negotiation_probe() -> Vec<u8> {
    let mut packet = Vec::with_capacity(1 + 4 + 1 + 8 + 1 + 8);
    packet.push(0xC0); // long header, fixed bit set
    packet.extend_from_slice(&[0x0A, 0x0A, 0x0A, 0x0A]); // unsupported version
    packet.push(8);
    packet.extend_from_slice(&[0x50, 0x53, 0x43, 0x50, 0x50, 0x44, 0x31, 0x30]);
    packet.push(8);
    packet.extend_from_slice(&[0x50, 0x53, 0x43, 0x50, 0x50, 0x53, 0x31, 0x30]);
    packet
}

/// NTP client request (LI=0, VN=4, Mode=3).
fn ntp_client_probe() -> Vec<u8> {
    vec![0x23]
}

/// SIP OPTIONS request, used to probe a SIP endpoint without placing a call.
fn sip_options_probe() -> Vec<u8> {
    let message = "OPTIONS sip:example.com SIP/2.0\r\n\
        Via: SIP/2.0/UDP 0.0.0.0:5060;branch=z9hG4bKpscpp\r\n\
        Max-Forwards: 70\r\n\
        To: <sip:example.com>\r\n\
        From: <sip:scanner@pulsescan>;tag=psrs\r\n\
        Call-ID: psrs-options\r\n\
        CSeq: 1 OPTIONS\r\n\
        Contact: <sip:scanner@0.0.0.0>\r\n\
        Content-Length: 0\r\n\
        \r\n";
    message.as_bytes().to_vec()
}

/// IAX2 full frame PING: src call number 0x8001, dst call number 0x0000,
/// zero timestamp/oseq/iseq, type IAX (0x06), subclass PING (0x06).
fn iax2_ping_probe() -> Vec<u8> {
    vec![
        0x80, 0x01, // src call number
        0x00, 0x00, // dst call number
        0x00, 0x00, 0x00, 0x00, // timestamp
        0x00, // oseq
        0x00, // iseq
        0x06, // type
        0x06, // subclass
    ]
}

/// Probe payload to send to `port`, falling back to a single zero byte for
/// ports with no dedicated probe.
pub fn udp_probe_payload(port: u16) -> Vec<u8> {
    match port {
        53 => dns_query_example_com(),
        123 => ntp_client_probe(),
        443 => quic_version_negotiation_probe(),
        5060 => sip_options_probe(),
        4569 => iax2_ping_probe(),
        _ => vec![0x00],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dns_probe_ends_with_a_query() {
        let payload = udp_probe_payload(53);
        assert_eq!(&payload[payload.len() - 4..], &[0x00, 0x01, 0x00, 0x01]);
    }

    #[test]
    fn ntp_probe_is_single_byte() {
        assert_eq!(udp_probe_payload(123), vec![0x23]);
    }

    #[test]
    fn unknown_port_gets_zero_byte() {
        assert_eq!(udp_probe_payload(9999), vec![0x00]);
    }

    #[test]
    fn sip_probe_is_well_formed_request_line() {
        let payload = udp_probe_payload(5060);
        let text = String::from_utf8(payload).unwrap();
        assert!(text.starts_with("OPTIONS sip:example.com SIP/2.0\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }
}
