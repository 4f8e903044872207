//! MSB-first bit packing for coder payloads.
//!
//! The writer drops trailing zero bits: a payload is a binary fraction, and
//! the reader yields zeros past the end of its input.

/// Packs bits MSB-first into bytes.
#[derive(Debug, Clone, Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    bit_buffer: u8,
    bit_count: u8,
    // Bits written up to and including the last 1.
    significant: u64,
}

impl BitWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one bit.
    pub fn write_bit(&mut self, bit: u8) {
        self.bit_buffer |= (bit & 1) << (7 - self.bit_count);
        self.bit_count += 1;
        if bit & 1 == 1 {
            self.significant = self.bit_len();
        }
        if self.bit_count == 8 {
            self.bytes.push(self.bit_buffer);
            self.bit_buffer = 0;
            self.bit_count = 0;
        }
    }

    /// Bits written so far, trailing zeros included.
    pub fn bit_len(&self) -> u64 {
        self.bytes.len() as u64 * 8 + self.bit_count as u64
    }

    /// Return the packed bytes and the number of meaningful bits.
    ///
    /// The result ends with the last 1 bit; padding in the final byte is zero.
    pub fn finish(mut self) -> (Vec<u8>, u64) {
        if self.bit_count > 0 {
            self.bytes.push(self.bit_buffer);
        }
        self.bytes.truncate(self.significant.div_ceil(8) as usize);
        (self.bytes, self.significant)
    }
}

/// Reads bits MSB-first, yielding zeros once `bit_len` bits are consumed.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    bytes: &'a [u8],
    bit_len: u64,
    pos: u64,
}

impl<'a> BitReader<'a> {
    /// Read the first `bit_len` bits of `bytes`.
    pub fn new(bytes: &'a [u8], bit_len: u64) -> Self {
        let bit_len = bit_len.min(bytes.len() as u64 * 8);
        Self {
            bytes,
            bit_len,
            pos: 0,
        }
    }

    /// Next bit, or 0 past the end.
    pub fn read_bit(&mut self) -> u8 {
        let bit = if self.pos < self.bit_len {
            (self.bytes[(self.pos / 8) as usize] >> (7 - self.pos % 8)) & 1
        } else {
            0
        };
        self.pos += 1;
        bit
    }

    /// Bits consumed so far, including virtual zeros.
    pub fn position(&self) -> u64 {
        self.pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packs_msb_first() {
        let mut writer = BitWriter::new();
        for bit in [1, 0, 1, 1, 0, 0, 0, 0, 1] {
            writer.write_bit(bit);
        }
        assert_eq!(writer.bit_len(), 9);
        let (bytes, bits) = writer.finish();
        assert_eq!(bytes, vec![0b1011_0000, 0b1000_0000]);
        assert_eq!(bits, 9);
    }

    #[test]
    fn test_strips_trailing_zeros() {
        let mut writer = BitWriter::new();
        for bit in [0, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0] {
            writer.write_bit(bit);
        }
        let (bytes, bits) = writer.finish();
        assert_eq!(bytes, vec![0b0110_0000]);
        assert_eq!(bits, 3);

        let (bytes, bits) = BitWriter::new().finish();
        assert!(bytes.is_empty());
        assert_eq!(bits, 0);
    }

    #[test]
    fn test_reader_pads_with_zeros() {
        let bytes = [0b1100_0001];
        let mut reader = BitReader::new(&bytes, 3);
        let read: Vec<u8> = (0..10).map(|_| reader.read_bit()).collect();
        assert_eq!(read, vec![1, 1, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(reader.position(), 10);
    }
}
