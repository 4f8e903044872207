//! Static byte-level Huffman coding, the alternative to CTW.
//!
//! The symbol counts travel with the stream; both sides rebuild the same tree
//! from them.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use tracing::debug;

use crate::arithmetic::{BitReader, BitWriter};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Leaf { symbol: u8 },
    Internal { left: Box<Node>, right: Box<Node> },
}

// Heap entry; ties on frequency are broken by creation order so that the
// tree only depends on the counts.
#[derive(Debug, PartialEq, Eq)]
struct Entry {
    freq: u64,
    order: usize,
    node: Node,
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.freq, other.order).cmp(&(self.freq, self.order)) // min-heap
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn build_tree(counts: &[u64; 256]) -> Option<Node> {
    let mut heap: BinaryHeap<Entry> = counts
        .iter()
        .enumerate()
        .filter(|(_, &freq)| freq > 0)
        .map(|(symbol, &freq)| Entry {
            freq,
            order: symbol,
            node: Node::Leaf {
                symbol: symbol as u8,
            },
        })
        .collect();

    let mut order = 256;
    while heap.len() > 1 {
        let (Some(left), Some(right)) = (heap.pop(), heap.pop()) else {
            break;
        };
        heap.push(Entry {
            freq: left.freq + right.freq,
            order,
            node: Node::Internal {
                left: Box::new(left.node),
                right: Box::new(right.node),
            },
        });
        order += 1;
    }
    heap.pop().map(|entry| entry.node)
}

fn build_codes(node: &Node, prefix: Vec<u8>, codes: &mut [Vec<u8>]) {
    match node {
        Node::Leaf { symbol } => {
            codes[*symbol as usize] = if prefix.is_empty() { vec![0] } else { prefix };
        }
        Node::Internal { left, right } => {
            let mut left_prefix = prefix.clone();
            left_prefix.push(0);
            build_codes(left, left_prefix, codes);

            let mut right_prefix = prefix;
            right_prefix.push(1);
            build_codes(right, right_prefix, codes);
        }
    }
}

/// A Huffman-coded byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanStream {
    /// Occurrences of each byte value in the source.
    pub counts: [u64; 256],
    /// Packed code bits.
    pub payload: Vec<u8>,
    /// Meaningful bits in `payload`.
    pub payload_bits: u64,
}

impl HuffmanStream {
    /// Number of source bytes.
    pub fn source_len(&self) -> u64 {
        self.counts.iter().fold(0u64, |acc, &c| acc.saturating_add(c))
    }

    /// Serialize as `[n: u16][n x (symbol: u8, count: u64)]` followed by the
    /// code bytes. Integers are little-endian.
    pub fn to_bytes(&self) -> Vec<u8> {
        let used: Vec<(usize, u64)> = self
            .counts
            .iter()
            .enumerate()
            .filter(|(_, &c)| c > 0)
            .map(|(s, &c)| (s, c))
            .collect();
        let mut out = Vec::with_capacity(2 + used.len() * 9 + self.payload.len());
        out.extend_from_slice(&(used.len() as u16).to_le_bytes());
        for (symbol, count) in used {
            out.push(symbol as u8);
            out.extend_from_slice(&count.to_le_bytes());
        }
        out.extend_from_slice(&self.payload);
        out
    }

    /// Parse the layout written by [`HuffmanStream::to_bytes`].
    ///
    /// # Errors
    /// Returns `Error::Truncated` or `Error::Corrupt` for malformed tables.
    pub fn from_bytes(bytes: &[u8], payload_bits: u64) -> Result<Self> {
        let table_len = bytes
            .get(..2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]) as usize)
            .ok_or(Error::Truncated {
                needed: 2,
                available: bytes.len(),
            })?;
        if table_len > 256 {
            return Err(Error::Corrupt(format!("{table_len} symbols in table")));
        }
        let codes_start = 2 + table_len * 9;
        if bytes.len() < codes_start {
            return Err(Error::Truncated {
                needed: codes_start,
                available: bytes.len(),
            });
        }

        let mut counts = [0u64; 256];
        for entry in bytes[2..codes_start].chunks_exact(9) {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&entry[1..]);
            let count = u64::from_le_bytes(raw);
            if count == 0 || counts[entry[0] as usize] != 0 {
                return Err(Error::Corrupt(format!(
                    "bad table entry for symbol {}",
                    entry[0]
                )));
            }
            counts[entry[0] as usize] = count;
        }

        let payload = bytes[codes_start..].to_vec();
        if payload.len() as u64 != payload_bits.div_ceil(8) {
            return Err(Error::Corrupt(format!(
                "{} code bytes for {} bits",
                payload.len(),
                payload_bits
            )));
        }
        Ok(HuffmanStream {
            counts,
            payload,
            payload_bits,
        })
    }
}

/// Huffman-code `data`.
pub fn encode(data: &[u8]) -> HuffmanStream {
    let mut counts = [0u64; 256];
    for &b in data {
        counts[b as usize] += 1;
    }

    let mut codes = vec![Vec::new(); 256];
    if let Some(root) = build_tree(&counts) {
        build_codes(&root, Vec::new(), &mut codes);
    }

    let mut writer = BitWriter::new();
    for &b in data {
        for &bit in &codes[b as usize] {
            writer.write_bit(bit);
        }
    }
    let (payload, payload_bits) = writer.finish();
    debug!(source = data.len(), payload_bits, "huffman encoded");

    HuffmanStream {
        counts,
        payload,
        payload_bits,
    }
}

/// Decode a [`HuffmanStream`].
///
/// # Errors
/// Returns `Error::Corrupt` if code bits remain after the last symbol.
pub fn decode(stream: &HuffmanStream) -> Result<Vec<u8>> {
    let len = stream.source_len();
    let Some(root) = build_tree(&stream.counts) else {
        return Ok(Vec::new());
    };

    let mut reader = BitReader::new(&stream.payload, stream.payload_bits);
    let mut out = Vec::with_capacity(len.min(1 << 20) as usize);
    for _ in 0..len {
        let mut node = &root;
        if let Node::Leaf { .. } = node {
            reader.read_bit();
        }
        while let Node::Internal { left, right } = node {
            node = if reader.read_bit() == 0 { left } else { right };
        }
        if let Node::Leaf { symbol } = node {
            out.push(*symbol);
        }
    }

    if reader.position() < stream.payload_bits {
        return Err(Error::Corrupt(format!(
            "{} code bits left after the last symbol",
            stream.payload_bits - reader.position()
        )));
    }
    Ok(out)
}
