//! ICMP packet encoding/decoding.
pub mod icmp_codec;

pub use icmp_codec::IcmpCodec;
