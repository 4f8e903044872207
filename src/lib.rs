//! # bitpiper
//!
//! Lossless compression of byte streams with context-tree weighting (CTW)
//! driving a binary arithmetic coder, plus a static Huffman coder for
//! comparison.
//!
//! Every source bit is predicted from the `D` bits before it. The context
//! tree mixes all tree sources up to depth `D`, and the arithmetic coder
//! narrows an interval by the predicted probability. The output is the
//! shortest binary fraction inside the final interval.
//!
//! ## Quick start
//!
//! ```
//! use bitpiper::{compress, decompress, Config};
//!
//! let data = b"abracadabra abracadabra abracadabra";
//! let packed = compress(data, &Config::ctw(6)).unwrap();
//! assert_eq!(decompress(&packed).unwrap(), data);
//! ```
//!
//! Lower level pieces are public too: [`ctw::ContextTree`] for the model,
//! [`arithmetic::ArithmeticEncoder`] for the coder and
//! [`compressor::CtwEncoder`] for a bit-at-a-time session.

pub mod arithmetic;
pub mod compressor;
pub mod config;
pub mod ctw;
pub mod error;
pub mod huffman;

pub use compressor::{
    compare, compress, compress_file, compress_file_with_progress, compress_with_progress, decode,
    decompress, decompress_file, encode, encode_with_progress, CompressionReport, EncodedStream,
};
pub use config::{Codec, Config, DEFAULT_DEPTH};
pub use ctw::MAX_DEPTH;
pub use error::{Error, Result};
