/// ICMP echo request/reply encoding and decoding.
///
/// Builds outbound echo requests and recognizes matching echo replies for both
/// address families. IPv4 raw sockets on Linux hand back the IP header in
/// front of the ICMP payload; IPv6 raw sockets do not, so the two parsers
/// differ in where they start looking.
use std::net::Ipv6Addr;
use std::sync::atomic::{AtomicU16, Ordering};

use pnet_packet::icmp::{self, echo_reply::EchoReplyPacket, echo_request::MutableEchoRequestPacket, IcmpTypes};
use pnet_packet::icmpv6::{
    self, echo_reply::Icmpv6EchoReplyPacket, echo_request::MutableEchoRequestPacket as MutableIcmpv6EchoRequestPacket,
    Icmpv6Types,
};
use pnet_packet::Packet;

use crate::error::{ScanError, ScanResult};

/// Payload carried by every echo request this tool sends.
const ECHO_BODY: &[u8] = b"pulsescan";

/// Builds outbound echo requests with a shared, monotonically increasing
/// sequence number and parses inbound replies.
pub struct IcmpCodec {
    identifier: u16,
    sequence: AtomicU16,
}

impl IcmpCodec {
    pub fn new(identifier: u16) -> Self {
        Self {
            identifier,
            sequence: AtomicU16::new(0),
        }
    }

    /// Identifier embedded in every request this codec builds (the process id,
    /// truncated to 16 bits, by convention).
    pub fn identifier(&self) -> u16 {
        self.identifier
    }

    fn next_sequence(&self) -> u16 {
        self.sequence.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    /// Build an IPv4 echo request, returning the wire bytes and the sequence
    /// number used so the caller can match the eventual reply.
    pub fn build_echo_request_v4(&self) -> ScanResult<(Vec<u8>, u16)> {
        let seq = self.next_sequence();
        let mut buf = vec![0u8; 8 + ECHO_BODY.len()];
        {
            let mut packet = MutableEchoRequestPacket::new(&mut buf)
                .ok_or_else(|| ScanError::packet_error("buffer too small for echo request"))?;
            packet.set_icmp_type(IcmpTypes::EchoRequest);
            packet.set_icmp_code(icmp::IcmpCode::new(0));
            packet.set_identifier(self.identifier);
            packet.set_sequence_number(seq);
            packet.set_payload(ECHO_BODY);
        }
        let checksum = icmp::checksum(
            &icmp::IcmpPacket::new(&buf)
                .ok_or_else(|| ScanError::packet_error("failed to reinterpret echo request"))?,
        );
        let mut packet = MutableEchoRequestPacket::new(&mut buf)
            .ok_or_else(|| ScanError::packet_error("buffer too small for echo request"))?;
        packet.set_checksum(checksum);
        Ok((buf, seq))
    }

    /// Build an IPv6 echo request. The ICMPv6 checksum depends on a
    /// pseudo-header of the source and destination addresses, which the
    /// kernel fills in automatically for `IPPROTO_ICMPV6` raw sockets on
    /// Linux, so this does not compute one itself; `source`/`destination` are
    /// accepted for platforms (or tests) where the caller must supply it.
    pub fn build_echo_request_v6(
        &self,
        source: Option<Ipv6Addr>,
        destination: Ipv6Addr,
    ) -> ScanResult<(Vec<u8>, u16)> {
        let seq = self.next_sequence();
        let mut buf = vec![0u8; 8 + ECHO_BODY.len()];
        {
            let mut packet = MutableIcmpv6EchoRequestPacket::new(&mut buf)
                .ok_or_else(|| ScanError::packet_error("buffer too small for echo request"))?;
            packet.set_icmpv6_type(Icmpv6Types::EchoRequest);
            packet.set_icmpv6_code(icmpv6::Icmpv6Code::new(0));
            packet.set_identifier(self.identifier);
            packet.set_sequence_number(seq);
            packet.set_payload(ECHO_BODY);
        }
        if let Some(source) = source {
            let checksum = icmpv6::checksum(
                &icmpv6::Icmpv6Packet::new(&buf)
                    .ok_or_else(|| ScanError::packet_error("failed to reinterpret echo request"))?,
                &source,
                &destination,
            );
            let mut packet = MutableIcmpv6EchoRequestPacket::new(&mut buf)
                .ok_or_else(|| ScanError::packet_error("buffer too small for echo request"))?;
            packet.set_checksum(checksum);
        }
        Ok((buf, seq))
    }

    /// Does `data` (as read off a raw IPv4 socket, IP header included) contain
    /// an echo reply matching `identifier`/`seq`? Requires code 0 as well as
    /// type and identifier/sequence: a wrong-code packet never matches.
    pub fn matches_echo_reply_v4(&self, data: &[u8], seq: u16) -> bool {
        let offset = ipv4_header_len(data);
        let Some(body) = data.get(offset..) else {
            return false;
        };
        let Some(reply) = EchoReplyPacket::new(body) else {
            return false;
        };
        reply.get_icmp_type() == IcmpTypes::EchoReply
            && reply.get_icmp_code() == icmp::IcmpCode::new(0)
            && reply.get_identifier() == self.identifier
            && reply.get_sequence_number() == seq
    }

    /// Does `data` (as read off a raw IPv6 socket) contain an echo reply
    /// matching `identifier`/`seq`? Some platforms hand back an outer IPv6
    /// header in front of the ICMPv6 payload; skip it the same way the IPv4
    /// side skips its IP header. Requires code 0 in addition to type and
    /// identifier/sequence.
    pub fn matches_echo_reply_v6(&self, data: &[u8], seq: u16) -> bool {
        let offset = ipv6_header_len(data);
        let Some(body) = data.get(offset..) else {
            return false;
        };
        let Some(reply) = Icmpv6EchoReplyPacket::new(body) else {
            return false;
        };
        reply.get_icmpv6_type() == Icmpv6Types::EchoReply
            && reply.get_icmpv6_code() == icmpv6::Icmpv6Code::new(0)
            && reply.get_identifier() == self.identifier
            && reply.get_sequence_number() == seq
    }
}

/// IPv4 header length in bytes, from the IHL nibble, or 0 if `data` doesn't
/// look like an IPv4 header at all (some platforms hand back the ICMP payload
/// directly).
fn ipv4_header_len(data: &[u8]) -> usize {
    match data.first() {
        Some(&byte) if byte >> 4 == 4 => ((byte & 0x0F) as usize) * 4,
        _ => 0,
    }
}

/// Length of an optional outer IPv6 header in front of the ICMPv6 payload: 40
/// fixed bytes if one is present, 0 if `data` looks like bare ICMPv6 already.
fn ipv6_header_len(data: &[u8]) -> usize {
    match data.first() {
        Some(&byte) if byte >> 4 == 6 && data.len() >= 40 => 40,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_v4_request_with_increasing_sequence() {
        let codec = IcmpCodec::new(4242);
        let (_buf1, seq1) = codec.build_echo_request_v4().unwrap();
        let (_buf2, seq2) = codec.build_echo_request_v4().unwrap();
        assert_eq!(seq1, 1);
        assert_eq!(seq2, 2);
    }

    #[test]
    fn v4_request_has_correct_type_and_identifier() {
        let codec = IcmpCodec::new(1234);
        let (buf, seq) = codec.build_echo_request_v4().unwrap();
        let packet = icmp::IcmpPacket::new(&buf).unwrap();
        assert_eq!(packet.get_icmp_type(), IcmpTypes::EchoRequest);
        let reply = icmp::echo_request::EchoRequestPacket::new(&buf).unwrap();
        assert_eq!(reply.get_identifier(), 1234);
        assert_eq!(reply.get_sequence_number(), seq);
    }

    #[test]
    fn ipv4_header_len_reads_ihl() {
        let mut header = vec![0u8; 20];
        header[0] = 0x45;
        assert_eq!(ipv4_header_len(&header), 20);
        assert_eq!(ipv4_header_len(&[0u8; 8]), 0);
    }

    #[test]
    fn ipv6_header_len_reads_version_nibble() {
        let mut header = vec![0u8; 48];
        header[0] = 0x60;
        assert_eq!(ipv6_header_len(&header), 40);
        assert_eq!(ipv6_header_len(&[0u8; 8]), 0);
    }

    fn build_v4_reply(identifier: u16, seq: u16, code: u8) -> Vec<u8> {
        use pnet_packet::icmp::echo_reply::MutableEchoReplyPacket;
        let mut buf = vec![0u8; 8 + ECHO_BODY.len()];
        let mut packet = MutableEchoReplyPacket::new(&mut buf).unwrap();
        packet.set_icmp_type(IcmpTypes::EchoReply);
        packet.set_icmp_code(icmp::IcmpCode::new(code));
        packet.set_identifier(identifier);
        packet.set_sequence_number(seq);
        buf
    }

    #[test]
    fn v4_reply_matches_on_type_code_identifier_sequence() {
        let codec = IcmpCodec::new(42);
        let reply = build_v4_reply(42, 7, 0);
        assert!(codec.matches_echo_reply_v4(&reply, 7));
    }

    #[test]
    fn v4_reply_with_nonzero_code_never_matches() {
        let codec = IcmpCodec::new(42);
        let reply = build_v4_reply(42, 7, 1);
        assert!(!codec.matches_echo_reply_v4(&reply, 7));
    }

    fn build_v6_reply(identifier: u16, seq: u16, code: u8) -> Vec<u8> {
        use pnet_packet::icmpv6::echo_reply::MutableEchoReplyPacket as MutableIcmpv6EchoReplyPacket;
        let mut buf = vec![0u8; 8 + ECHO_BODY.len()];
        let mut packet = MutableIcmpv6EchoReplyPacket::new(&mut buf).unwrap();
        packet.set_icmpv6_type(Icmpv6Types::EchoReply);
        packet.set_icmpv6_code(icmpv6::Icmpv6Code::new(code));
        packet.set_identifier(identifier);
        packet.set_sequence_number(seq);
        buf
    }

    #[test]
    fn v6_reply_matches_with_no_outer_header() {
        let codec = IcmpCodec::new(99);
        let reply = build_v6_reply(99, 3, 0);
        assert!(codec.matches_echo_reply_v6(&reply, 3));
    }

    #[test]
    fn v6_reply_with_nonzero_code_never_matches() {
        let codec = IcmpCodec::new(99);
        let reply = build_v6_reply(99, 3, 1);
        assert!(!codec.matches_echo_reply_v6(&reply, 3));
    }

    #[test]
    fn v6_reply_skips_outer_ipv6_header_when_present() {
        let codec = IcmpCodec::new(99);
        let body = build_v6_reply(99, 3, 0);
        let mut framed = vec![0u8; 40];
        framed[0] = 0x60;
        framed.extend_from_slice(&body);
        assert!(codec.matches_echo_reply_v6(&framed, 3));
    }
}
