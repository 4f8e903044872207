//! Codec selection and context depth.

use std::fmt;
use std::str::FromStr;

use crate::ctw::MAX_DEPTH;
use crate::error::{Error, Result};

/// Context depth used when none is given.
pub const DEFAULT_DEPTH: u8 = 8;

/// Which codec a run uses. The two are never combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Codec {
    /// Context-tree weighting with arithmetic coding.
    #[default]
    Ctw,
    /// Static Huffman coding of bytes.
    Huffman,
}

impl Codec {
    /// Identifier stored in the container header.
    pub fn id(self) -> u8 {
        match self {
            Codec::Ctw => 0,
            Codec::Huffman => 1,
        }
    }

    /// Inverse of [`Codec::id`].
    ///
    /// # Errors
    /// Returns `Error::UnknownCodec` for unassigned ids.
    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            0 => Ok(Codec::Ctw),
            1 => Ok(Codec::Huffman),
            other => Err(Error::UnknownCodec(other)),
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Codec::Ctw => f.write_str("ctw"),
            Codec::Huffman => f.write_str("huffman"),
        }
    }
}

impl FromStr for Codec {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ctw" => Ok(Codec::Ctw),
            "huffman" => Ok(Codec::Huffman),
            other => Err(format!("unknown codec '{other}' (expected ctw or huffman)")),
        }
    }
}

/// Settings for one compression run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Codec to use.
    pub codec: Codec,
    /// Maximum context length for CTW; ignored by Huffman.
    pub depth: u8,
}

impl Config {
    /// CTW with the given context depth.
    pub fn ctw(depth: u8) -> Self {
        Config {
            codec: Codec::Ctw,
            depth,
        }
    }

    /// Static Huffman coding.
    pub fn huffman() -> Self {
        Config {
            codec: Codec::Huffman,
            depth: DEFAULT_DEPTH,
        }
    }

    /// Reject settings no session can run with.
    ///
    /// # Errors
    /// Returns `Error::InvalidDepth` for a CTW depth outside `1..=MAX_DEPTH`.
    pub fn validate(&self) -> Result<()> {
        if self.codec == Codec::Ctw && !(1..=MAX_DEPTH).contains(&self.depth) {
            return Err(Error::InvalidDepth {
                depth: self.depth as u32,
                max: MAX_DEPTH,
            });
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::ctw(DEFAULT_DEPTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_ids_round_trip() {
        for codec in [Codec::Ctw, Codec::Huffman] {
            assert_eq!(Codec::from_id(codec.id()).unwrap(), codec);
            assert_eq!(codec.to_string().parse::<Codec>().unwrap(), codec);
        }
        assert!(matches!(Codec::from_id(7), Err(Error::UnknownCodec(7))));
        assert!("lzma".parse::<Codec>().is_err());
    }

    #[test]
    fn test_validate() {
        assert!(Config::default().validate().is_ok());
        assert!(Config::ctw(0).validate().is_err());
        assert!(Config::ctw(MAX_DEPTH).validate().is_ok());
        assert!(Config::ctw(MAX_DEPTH + 1).validate().is_err());
        assert!(Config::huffman().validate().is_ok());
    }
}
