use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::arithmetic::{ArithmeticDecoder, ArithmeticEncoder, CodingInterval};
use crate::config::{Codec, Config};
use crate::ctw::CtwModel;
use crate::error::{Error, Result};
use crate::huffman::{self, HuffmanStream};

use super::header::{Header, HEADER_LEN};

// Source bytes between progress callbacks.
const PROGRESS_STRIDE: usize = 4096;

/// Metadata that travels next to a CTW payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamInfo {
    /// Context depth of the model.
    pub depth: u8,
    /// Source length in bits.
    pub source_bits: u64,
    /// Meaningful bits in the payload.
    pub payload_bits: u64,
}

/// A CTW-coded stream: the binary fraction plus its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedStream {
    pub info: StreamInfo,
    pub payload: Vec<u8>,
}

/// One CTW encoding session.
///
/// Predicts every bit from the context tree before coding it and updates the
/// tree after.
#[derive(Debug)]
pub struct CtwEncoder {
    model: CtwModel,
    coder: ArithmeticEncoder,
    source_bits: u64,
}

impl CtwEncoder {
    /// Start a session with a fresh tree of the given depth.
    pub fn new(depth: u8) -> Result<Self> {
        Ok(CtwEncoder {
            model: CtwModel::new(depth)?,
            coder: ArithmeticEncoder::new(),
            source_bits: 0,
        })
    }

    /// Code one bit.
    pub fn push_bit(&mut self, bit: u8) {
        let p1 = self.model.predict();
        self.coder.encode_bit(bit, p1);
        self.model.observe(bit);
        self.source_bits += 1;
    }

    /// Code a byte, most significant bit first.
    pub fn push_byte(&mut self, byte: u8) {
        for shift in (0..8).rev() {
            self.push_bit((byte >> shift) & 1);
        }
    }

    /// The model driving the coder.
    pub fn model(&self) -> &CtwModel {
        &self.model
    }

    /// The coder's current interval.
    pub fn interval(&self) -> &CodingInterval {
        self.coder.interval()
    }

    /// Emit the final code point.
    pub fn finish(self) -> EncodedStream {
        let depth = self.model.tree().depth();
        let (payload, payload_bits) = self.coder.finish();
        debug!(
            depth,
            source_bits = self.source_bits,
            payload_bits,
            ideal_bits = self.model.ideal_code_length(),
            "ctw session finished"
        );
        EncodedStream {
            info: StreamInfo {
                depth,
                source_bits: self.source_bits,
                payload_bits,
            },
            payload,
        }
    }
}

/// One CTW decoding session, in lock-step with the encoder's model.
#[derive(Debug)]
pub struct CtwDecoder<'a> {
    model: CtwModel,
    coder: ArithmeticDecoder<'a>,
}

impl<'a> CtwDecoder<'a> {
    /// Start decoding `stream`.
    ///
    /// # Errors
    /// Returns `Error::InvalidDepth` or `Error::Corrupt` if the metadata does
    /// not fit the payload.
    pub fn new(stream: &'a EncodedStream) -> Result<Self> {
        check_payload(&stream.payload, stream.info.payload_bits)?;
        Ok(CtwDecoder {
            model: CtwModel::new(stream.info.depth)?,
            coder: ArithmeticDecoder::new(&stream.payload, stream.info.payload_bits),
        })
    }

    /// Decode one bit.
    pub fn next_bit(&mut self) -> Result<u8> {
        let p1 = self.model.predict();
        let bit = self.coder.decode_bit(p1)?;
        self.model.observe(bit);
        Ok(bit)
    }

    /// Decode one byte, most significant bit first.
    pub fn next_byte(&mut self) -> Result<u8> {
        let mut byte = 0;
        for _ in 0..8 {
            byte = (byte << 1) | self.next_bit()?;
        }
        Ok(byte)
    }

    /// Check that the payload held nothing beyond the code point.
    pub fn finish(self) -> Result<()> {
        self.coder.finish()
    }
}

// Payload length must match the bit count exactly and end on its last 1 bit.
fn check_payload(payload: &[u8], payload_bits: u64) -> Result<()> {
    if payload.len() as u64 != payload_bits.div_ceil(8) {
        return Err(Error::Corrupt(format!(
            "{} payload bytes for {} bits",
            payload.len(),
            payload_bits
        )));
    }
    if let Some(&last) = payload.last() {
        let used = ((payload_bits - 1) % 8 + 1) as u32;
        let padding = (1u8 << (8 - used)).wrapping_sub(1);
        if (last >> (8 - used)) & 1 != 1 || last & padding != 0 {
            return Err(Error::Corrupt("payload does not end on its final bit".into()));
        }
    }
    Ok(())
}

/// CTW-encode `data` with a context tree of depth `depth`.
///
/// # Errors
/// Returns `Error::InvalidDepth` before any tree is built if `depth` is out
/// of range.
pub fn encode(data: &[u8], depth: u8) -> Result<EncodedStream> {
    encode_with_progress(data, depth, |_| {})
}

/// [`encode`], calling `progress` with the completed fraction as it goes.
pub fn encode_with_progress(
    data: &[u8],
    depth: u8,
    progress: impl FnMut(f32),
) -> Result<EncodedStream> {
    run_ctw(data, depth, progress).map(|(stream, _)| stream)
}

// Returns the stream and the model's ideal code length in bits.
fn run_ctw(
    data: &[u8],
    depth: u8,
    mut progress: impl FnMut(f32),
) -> Result<(EncodedStream, f64)> {
    let mut session = CtwEncoder::new(depth)?;
    for (i, &byte) in data.iter().enumerate() {
        if i % PROGRESS_STRIDE == 0 {
            progress(i as f32 / data.len() as f32);
        }
        session.push_byte(byte);
    }
    progress(1.0);
    let ideal = session.model().ideal_code_length();
    Ok((session.finish(), ideal))
}

/// Decode a CTW stream back to bytes.
///
/// # Errors
/// Returns a corruption error if the stream is inconsistent; nothing is
/// salvaged.
pub fn decode(stream: &EncodedStream) -> Result<Vec<u8>> {
    if stream.info.source_bits % 8 != 0 {
        return Err(Error::Corrupt(format!(
            "source length of {} bits is not whole bytes",
            stream.info.source_bits
        )));
    }
    let len = stream.info.source_bits / 8;
    let mut session = CtwDecoder::new(stream)?;
    let mut out = Vec::with_capacity(len.min(1 << 20) as usize);
    for _ in 0..len {
        out.push(session.next_byte()?);
    }
    session.finish()?;
    Ok(out)
}

/// Sizes of one compression run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressionReport {
    pub codec: Codec,
    /// Context depth; 0 for Huffman.
    pub depth: u8,
    pub source_bytes: u64,
    /// Container size, header included.
    pub compressed_bytes: u64,
    /// `-log2` of the model probability of the source, CTW only.
    pub ideal_bits: Option<f64>,
}

impl CompressionReport {
    /// Compressed size as a fraction of the source size.
    pub fn ratio(&self) -> f64 {
        if self.source_bytes == 0 {
            return 0.0;
        }
        self.compressed_bytes as f64 / self.source_bytes as f64
    }

    /// Compressed bits per source byte.
    pub fn bits_per_byte(&self) -> f64 {
        self.ratio() * 8.0
    }
}

impl fmt::Display for CompressionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.codec {
            Codec::Ctw => format!("ctw(D={})", self.depth),
            Codec::Huffman => "huffman".to_string(),
        };
        write!(
            f,
            "{name:<12} {:>12} -> {:>12} bytes  {:>6.2}%  {:.3} bits/byte",
            self.source_bytes,
            self.compressed_bytes,
            self.ratio() * 100.0,
            self.bits_per_byte()
        )?;
        if let Some(ideal) = self.ideal_bits {
            write!(f, "  (model ideal {:.0} bytes)", ideal / 8.0)?;
        }
        Ok(())
    }
}

/// Compress `data` into a self-describing container.
///
/// # Errors
/// Returns `Error::InvalidDepth` for an invalid CTW configuration.
pub fn compress(data: &[u8], config: &Config) -> Result<Vec<u8>> {
    compress_with_progress(data, config, |_| {}).map(|(bytes, _)| bytes)
}

/// [`compress`], reporting progress and returning the size report.
pub fn compress_with_progress(
    data: &[u8],
    config: &Config,
    mut progress: impl FnMut(f32),
) -> Result<(Vec<u8>, CompressionReport)> {
    config.validate()?;
    let source_bits = data.len() as u64 * 8;

    let (header, body, ideal_bits) = match config.codec {
        Codec::Ctw => {
            let (stream, ideal) = run_ctw(data, config.depth, &mut progress)?;
            let header = Header {
                codec: Codec::Ctw,
                depth: config.depth,
                source_bits,
                payload_bits: stream.info.payload_bits,
            };
            (header, stream.payload, Some(ideal))
        }
        Codec::Huffman => {
            let stream = huffman::encode(data);
            progress(1.0);
            let header = Header {
                codec: Codec::Huffman,
                depth: 0,
                source_bits,
                payload_bits: stream.payload_bits,
            };
            (header, stream.to_bytes(), None)
        }
    };

    let mut out = Vec::with_capacity(HEADER_LEN + body.len());
    out.extend_from_slice(&header.to_bytes());
    out.extend_from_slice(&body);

    let report = CompressionReport {
        codec: config.codec,
        depth: header.depth,
        source_bytes: data.len() as u64,
        compressed_bytes: out.len() as u64,
        ideal_bits,
    };
    Ok((out, report))
}

/// Restore the bytes of a container written by [`compress`].
///
/// # Errors
/// Returns a corruption error for any inconsistency in header or payload.
pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>> {
    let (header, body) = Header::parse(bytes)?;
    debug!(?header, "decompressing");

    match header.codec {
        Codec::Ctw => decode(&EncodedStream {
            info: StreamInfo {
                depth: header.depth,
                source_bits: header.source_bits,
                payload_bits: header.payload_bits,
            },
            payload: body.to_vec(),
        }),
        Codec::Huffman => {
            let stream = HuffmanStream::from_bytes(body, header.payload_bits)?;
            if stream.counts.iter().try_fold(0u64, |acc, &c| acc.checked_add(c))
                != Some(header.source_bits / 8)
            {
                return Err(Error::Corrupt(
                    "symbol table does not match the source length".into(),
                ));
            }
            huffman::decode(&stream)
        }
    }
}

fn read_all<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    Ok(data)
}

fn write_all<P: AsRef<Path>>(path: P, data: &[u8]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(data)?;
    writer.flush()?;
    Ok(())
}

/// Compress the file at `input_path` into `output_path`.
pub fn compress_file<P: AsRef<Path>>(
    input_path: P,
    output_path: P,
    config: &Config,
) -> Result<CompressionReport> {
    compress_file_with_progress(input_path, output_path, config, |_| {})
}

/// [`compress_file`] with a progress callback.
pub fn compress_file_with_progress<P: AsRef<Path>>(
    input_path: P,
    output_path: P,
    config: &Config,
    progress: impl FnMut(f32),
) -> Result<CompressionReport> {
    config.validate()?;
    let data = read_all(&input_path)?;
    let (compressed, report) = compress_with_progress(&data, config, progress)?;
    write_all(&output_path, &compressed)?;
    info!(
        input = %input_path.as_ref().display(),
        output = %output_path.as_ref().display(),
        "{report}"
    );
    Ok(report)
}

/// Decompress the container at `input_path` into `output_path`. Returns the
/// number of bytes restored.
pub fn decompress_file<P: AsRef<Path>>(input_path: P, output_path: P) -> Result<u64> {
    let compressed = read_all(&input_path)?;
    let data = decompress(&compressed)?;
    write_all(&output_path, &data)?;
    info!(
        input = %input_path.as_ref().display(),
        output = %output_path.as_ref().display(),
        bytes = data.len(),
        "decompressed"
    );
    Ok(data.len() as u64)
}

/// Compress `data` with Huffman and with CTW at each of `depths`, one
/// independent session per candidate, and report the sizes.
///
/// # Errors
/// Returns `Error::InvalidDepth` if any depth is out of range.
pub fn compare(data: &[u8], depths: &[u8]) -> Result<Vec<CompressionReport>> {
    let mut configs = vec![Config::huffman()];
    configs.extend(depths.iter().map(|&depth| Config::ctw(depth)));
    for config in &configs {
        config.validate()?;
    }

    configs
        .par_iter()
        .map(|config| compress_with_progress(data, config, |_| {}).map(|(_, report)| report))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        let stream = encode(&[], 3).unwrap();
        assert_eq!(stream.info.payload_bits, 0);
        assert!(stream.payload.is_empty());
        assert!(decode(&stream).unwrap().is_empty());

        let container = compress(&[], &Config::ctw(3)).unwrap();
        assert_eq!(container.len(), HEADER_LEN);
        assert!(decompress(&container).unwrap().is_empty());
    }

    #[test]
    fn test_repeating_pattern_beats_raw_bits() {
        let mut session = CtwEncoder::new(2).unwrap();
        for bit in [0, 0, 0, 1, 0, 0, 0, 1] {
            session.push_bit(bit);
        }
        let stream = session.finish();
        assert!(stream.info.payload_bits < 8, "{:?}", stream.info);
    }

    #[test]
    fn test_constant_bytes_compress() {
        let data = vec![0u8; 1000];
        let stream = encode(&data, 3).unwrap();
        assert!(stream.payload.len() < 10, "{} bytes", stream.payload.len());
        assert_eq!(decode(&stream).unwrap(), data);
    }

    #[test]
    fn test_payload_close_to_ideal() {
        let data = b"context tree weighting mixes every model up to depth D".repeat(4);
        let (stream, ideal) = run_ctw(&data, 6, |_| {}).unwrap();
        assert!((stream.info.payload_bits as f64) <= ideal + 4.0);
    }

    #[test]
    fn test_interval_never_widens() {
        let mut session = CtwEncoder::new(4).unwrap();
        let mut width = session.interval().log2_width();
        for &byte in b"narrowing, narrowing, narrowing" {
            session.push_byte(byte);
            let next = session.interval().log2_width();
            assert!(next <= width);
            assert!(session.interval().low() < session.interval().high());
            width = next;
        }
    }

    #[test]
    fn test_progress_reaches_one() {
        let mut seen = Vec::new();
        encode_with_progress(&vec![7u8; 10_000], 2, |p| seen.push(p)).unwrap();
        assert_eq!(seen.first(), Some(&0.0));
        assert_eq!(seen.last(), Some(&1.0));
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_rejects_inconsistent_metadata() {
        let mut stream = encode(b"some bytes to encode", 4).unwrap();

        let mut short = stream.clone();
        short.payload.pop();
        assert!(matches!(decode(&short), Err(Error::Corrupt(_))));

        let mut odd = stream.clone();
        odd.info.source_bits += 3;
        assert!(matches!(decode(&odd), Err(Error::Corrupt(_))));

        let mut deep = stream.clone();
        deep.info.depth = 0;
        assert!(matches!(decode(&deep), Err(Error::InvalidDepth { .. })));

        stream.info.payload_bits -= 1;
        assert!(decode(&stream).is_err());
    }

    #[test]
    fn test_compare_reports_every_candidate() {
        let data = b"abababababababababababababababab".repeat(8);
        let reports = compare(&data, &[1, 2, 4]).unwrap();
        assert_eq!(reports.len(), 4);
        assert_eq!(reports[0].codec, Codec::Huffman);
        assert_eq!(
            reports[1..].iter().map(|r| r.depth).collect::<Vec<_>>(),
            vec![1, 2, 4]
        );
        assert!(reports.iter().all(|r| r.source_bytes == data.len() as u64));
        assert!(compare(&data, &[0]).is_err());
    }
}
