use tracing::trace;

use crate::ctw::Prob;
use crate::error::{Error, Result};

use super::bitio::{BitReader, BitWriter};
use super::interval::{rescale_offset, CodingInterval, Rescale, CODE_BITS, HALF};

/// Binary arithmetic encoder.
///
/// Each call narrows the interval by the probability of the bit; the finished
/// stream is the shortest binary fraction inside the final interval.
#[derive(Debug, Default)]
pub struct ArithmeticEncoder {
    interval: CodingInterval,
    pending: u64,
    output: BitWriter,
}

impl ArithmeticEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode `bit`, where `p1` is the probability that it is 1.
    pub fn encode_bit(&mut self, bit: u8, p1: Prob) {
        let mid = self.interval.split(p1);
        self.interval.narrow(bit, mid);

        while let Some(step) = self.interval.next_rescale() {
            match step {
                Rescale::Lower => self.emit(0),
                Rescale::Upper => self.emit(1),
                Rescale::Middle => self.pending += 1,
            }
            self.interval.apply(step);
        }
    }

    /// The current interval.
    pub fn interval(&self) -> &CodingInterval {
        &self.interval
    }

    /// Code bits produced so far, excluding pending ones.
    pub fn bits_written(&self) -> u64 {
        self.output.bit_len()
    }

    /// Flush the final code point. Returns the packed bytes and their bit
    /// length.
    pub fn finish(mut self) -> (Vec<u8>, u64) {
        // The interval straddles 1/2 here. Its lower end is the bare prefix
        // when nothing is pending and low is 0; otherwise the midpoint, a
        // single 1 bit, is the shortest point inside.
        if self.interval.low() != 0 || self.pending != 0 {
            self.emit(1);
        }
        let (bytes, bits) = self.output.finish();
        trace!(bits, "arithmetic encoder finished");
        (bytes, bits)
    }

    fn emit(&mut self, bit: u8) {
        self.output.write_bit(bit);
        for _ in 0..self.pending {
            self.output.write_bit(bit ^ 1);
        }
        self.pending = 0;
    }
}

/// Binary arithmetic decoder, the mirror image of [`ArithmeticEncoder`].
#[derive(Debug)]
pub struct ArithmeticDecoder<'a> {
    interval: CodingInterval,
    // The next 32 bits of the code point, in register coordinates.
    value: u64,
    pending: u64,
    reader: BitReader<'a>,
    payload_bits: u64,
    decoded: u64,
}

impl<'a> ArithmeticDecoder<'a> {
    /// Start decoding the first `payload_bits` bits of `payload`.
    pub fn new(payload: &'a [u8], payload_bits: u64) -> Self {
        let mut reader = BitReader::new(payload, payload_bits);
        let value = (0..CODE_BITS).fold(0, |value, _| (value << 1) | reader.read_bit() as u64);
        ArithmeticDecoder {
            interval: CodingInterval::new(),
            value,
            pending: 0,
            reader,
            payload_bits,
            decoded: 0,
        }
    }

    /// Decode one bit, where `p1` is the probability that it is 1.
    ///
    /// # Errors
    /// Returns `Error::LostContainment` if the code point has left the
    /// interval.
    pub fn decode_bit(&mut self, p1: Prob) -> Result<u8> {
        if self.value < self.interval.low() || self.value >= self.interval.high() {
            return Err(Error::LostContainment { bit: self.decoded });
        }

        let mid = self.interval.split(p1);
        let bit = if self.value < mid { 0 } else { 1 };
        self.interval.narrow(bit, mid);

        while let Some(step) = self.interval.next_rescale() {
            match step {
                Rescale::Middle => self.pending += 1,
                _ => self.pending = 0,
            }
            self.value = ((self.value - rescale_offset(step)) << 1) | self.reader.read_bit() as u64;
            self.interval.apply(step);
        }

        self.decoded += 1;
        Ok(bit)
    }

    /// The current interval.
    pub fn interval(&self) -> &CodingInterval {
        &self.interval
    }

    /// Check that the payload is exactly what the encoder would have emitted
    /// for the decoded bits.
    ///
    /// # Errors
    /// Returns `Error::Corrupt` when the payload carries bits past the code
    /// point or the code point is not the one the encoder picks.
    pub fn finish(self) -> Result<()> {
        let expected = if self.interval.low() == 0 && self.pending == 0 {
            0
        } else {
            HALF
        };
        if self.value != expected {
            return Err(Error::Corrupt(format!(
                "code point {:#010x} is not the final point {:#010x}",
                self.value, expected
            )));
        }
        if self.reader.position() < self.payload_bits {
            return Err(Error::Corrupt(format!(
                "{} payload bits left after the code point",
                self.payload_bits - self.reader.position()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(bits: &[u8], p1: Prob) -> (Vec<u8>, u64) {
        let mut encoder = ArithmeticEncoder::new();
        for &bit in bits {
            encoder.encode_bit(bit, p1);
        }
        let (payload, payload_bits) = encoder.finish();

        let mut decoder = ArithmeticDecoder::new(&payload, payload_bits);
        let decoded: Vec<u8> = bits
            .iter()
            .map(|_| decoder.decode_bit(p1).unwrap())
            .collect();
        assert_eq!(decoded, bits);
        decoder.finish().unwrap();
        (payload, payload_bits)
    }

    #[test]
    fn test_empty_stream_has_no_payload() {
        let (payload, bits) = ArithmeticEncoder::new().finish();
        assert!(payload.is_empty());
        assert_eq!(bits, 0);
    }

    #[test]
    fn test_fair_bits_are_copied() {
        let bits = [1, 0, 1, 1, 0, 0, 1, 0, 1];
        let (payload, payload_bits) = round_trip(&bits, Prob::HALF);
        // With p = 1/2 the code is the input itself, trailing zeros dropped.
        assert_eq!(payload_bits, 9);
        assert_eq!(payload, vec![0b1011_0010, 0b1000_0000]);
    }

    #[test]
    fn test_skewed_bits_compress() {
        let mut bits = vec![0u8; 2000];
        bits[700] = 1;
        bits[1500] = 1;
        let p1 = Prob::from_ratio(1, 1000);
        let (_, payload_bits) = round_trip(&bits, p1);
        // -log2 of the sequence probability is about 22.8 bits.
        assert!(payload_bits <= 25, "{payload_bits} bits");
    }

    #[test]
    fn test_pending_bits_resolve() {
        // Alternating near-certain and near-impossible bits keep the interval
        // around 1/2 and exercise the middle rescale.
        let bits: Vec<u8> = (0..300).map(|i| (i % 2) as u8).collect();
        round_trip(&bits, Prob::from_ratio(1, 3));
        round_trip(&bits, Prob::from_ratio(2, 3));
    }

    #[test]
    fn test_interval_narrows_monotonically() {
        let mut encoder = ArithmeticEncoder::new();
        let mut width = encoder.interval().log2_width();
        assert_eq!(width, 0.0);
        for i in 0..500u64 {
            let bit = (i * 7 % 5 == 0) as u8;
            encoder.encode_bit(bit, Prob::from_ratio(1 + i % 9, 10));
            let interval = encoder.interval();
            assert!(interval.low() < interval.high());
            assert!(interval.high_fraction() <= 1.0);
            let next = interval.log2_width();
            assert!(next < width);
            width = next;
        }
    }

    #[test]
    fn test_trailing_garbage_is_rejected() {
        let bits = [0u8, 1, 1, 0, 1];
        let mut encoder = ArithmeticEncoder::new();
        for &bit in &bits {
            encoder.encode_bit(bit, Prob::from_ratio(1, 4));
        }
        let (mut payload, payload_bits) = encoder.finish();
        payload.extend_from_slice(&[0xff; 8]);
        let mut decoder = ArithmeticDecoder::new(&payload, payload_bits + 64);
        for _ in 0..bits.len() {
            decoder.decode_bit(Prob::from_ratio(1, 4)).unwrap();
        }
        assert!(matches!(decoder.finish(), Err(Error::Corrupt(_))));
    }
}
