//! Static Huffman coding.

pub mod huffman;

pub use huffman::{decode, encode, HuffmanStream};
