//! Bit-level arithmetic coding.

pub mod arithmetic;
pub mod bitio;
pub mod interval;

pub use arithmetic::{ArithmeticDecoder, ArithmeticEncoder};
pub use bitio::{BitReader, BitWriter};
pub use interval::{CodingInterval, Rescale};
