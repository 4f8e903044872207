//! Sessions, the container format and file entry points.

pub mod compressor;
pub mod header;

pub use compressor::{
    compare, compress, compress_file, compress_file_with_progress, compress_with_progress, decode,
    decompress, decompress_file, encode, encode_with_progress, CompressionReport, CtwDecoder,
    CtwEncoder, EncodedStream, StreamInfo,
};
pub use header::{Header, HEADER_LEN};
