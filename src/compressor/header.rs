//! Container header.
//!
//! ```text
//! offset size field
//!      0    4 magic "BPIP"
//!      4    1 version
//!      5    1 codec id
//!      6    1 context depth (0 for Huffman)
//!      7    1 reserved, zero
//!      8    8 source length in bits (LE)
//!     16    8 payload length in bits (LE)
//! ```

use bytemuck::{Pod, Zeroable};

use crate::config::Codec;
use crate::ctw::MAX_DEPTH;
use crate::error::{Error, Result};

/// Leading bytes of every container.
pub const MAGIC: [u8; 4] = *b"BPIP";
/// Current container version.
pub const VERSION: u8 = 1;
/// Header size in bytes.
pub const HEADER_LEN: usize = std::mem::size_of::<RawHeader>();

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct RawHeader {
    magic: [u8; 4],
    version: u8,
    codec: u8,
    depth: u8,
    reserved: u8,
    source_bits: u64,
    payload_bits: u64,
}

/// Out-of-band metadata a decoder needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Codec that produced the payload.
    pub codec: Codec,
    /// CTW context depth; 0 for Huffman.
    pub depth: u8,
    /// Length of the source in bits.
    pub source_bits: u64,
    /// Meaningful bits in the coded payload.
    pub payload_bits: u64,
}

impl Header {
    /// Serialize to the fixed 24-byte layout.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let raw = RawHeader {
            magic: MAGIC,
            version: VERSION,
            codec: self.codec.id(),
            depth: self.depth,
            reserved: 0,
            source_bits: self.source_bits.to_le(),
            payload_bits: self.payload_bits.to_le(),
        };
        let mut out = [0u8; HEADER_LEN];
        out.copy_from_slice(bytemuck::bytes_of(&raw));
        out
    }

    /// Parse a header and return it with the bytes that follow.
    ///
    /// # Errors
    /// Returns an error for short input, foreign magic, unknown versions or
    /// codecs, and fields no encoder writes.
    pub fn parse(bytes: &[u8]) -> Result<(Header, &[u8])> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::Truncated {
                needed: HEADER_LEN,
                available: bytes.len(),
            });
        }
        let raw: RawHeader = bytemuck::pod_read_unaligned(&bytes[..HEADER_LEN]);

        if raw.magic != MAGIC {
            return Err(Error::BadMagic(raw.magic));
        }
        if raw.version != VERSION {
            return Err(Error::UnsupportedVersion(raw.version));
        }
        let codec = Codec::from_id(raw.codec)?;
        if raw.reserved != 0 {
            return Err(Error::Corrupt(format!("reserved byte is {}", raw.reserved)));
        }
        let depth_ok = match codec {
            Codec::Ctw => (1..=MAX_DEPTH).contains(&raw.depth),
            Codec::Huffman => raw.depth == 0,
        };
        if !depth_ok {
            return Err(Error::Corrupt(format!(
                "context depth {} for {codec}",
                raw.depth
            )));
        }
        let source_bits = u64::from_le(raw.source_bits);
        if source_bits % 8 != 0 {
            return Err(Error::Corrupt(format!(
                "source length of {source_bits} bits is not whole bytes"
            )));
        }

        let header = Header {
            codec,
            depth: raw.depth,
            source_bits,
            payload_bits: u64::from_le(raw.payload_bits),
        };
        Ok((header, &bytes[HEADER_LEN..]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Header {
        Header {
            codec: Codec::Ctw,
            depth: 5,
            source_bits: 8 * 1234,
            payload_bits: 977,
        }
    }

    #[test]
    fn test_layout() {
        assert_eq!(HEADER_LEN, 24);
        let bytes = sample().to_bytes();
        assert_eq!(&bytes[..4], b"BPIP");
        assert_eq!(bytes[4..8], [VERSION, 0, 5, 0]);
        assert_eq!(bytes[8..16], (8u64 * 1234).to_le_bytes());
        assert_eq!(bytes[16..24], 977u64.to_le_bytes());
    }

    #[test]
    fn test_parse_unaligned() {
        let mut buf = vec![0xAA];
        buf.extend_from_slice(&sample().to_bytes());
        buf.extend_from_slice(&[1, 2, 3]);
        let (header, rest) = Header::parse(&buf[1..]).unwrap();
        assert_eq!(header, sample());
        assert_eq!(rest, &[1, 2, 3]);
    }

    #[test]
    fn test_rejects_bad_fields() {
        let good = sample().to_bytes();

        assert!(matches!(
            Header::parse(&good[..10]),
            Err(Error::Truncated { needed: 24, available: 10 })
        ));

        let mut bad = good;
        bad[0] = b'X';
        assert!(matches!(Header::parse(&bad), Err(Error::BadMagic(_))));

        let mut bad = good;
        bad[4] = 9;
        assert!(matches!(Header::parse(&bad), Err(Error::UnsupportedVersion(9))));

        let mut bad = good;
        bad[5] = 4;
        assert!(matches!(Header::parse(&bad), Err(Error::UnknownCodec(4))));

        let mut bad = good;
        bad[6] = 0;
        assert!(matches!(Header::parse(&bad), Err(Error::Corrupt(_))));

        let mut bad = good;
        bad[8] = 3;
        assert!(matches!(Header::parse(&bad), Err(Error::Corrupt(_))));
    }
}
