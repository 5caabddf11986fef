//! Zip container reading.
//!
//! - [`structures`]: on-disk records (EOCD, ZIP64 records, file headers)
//! - [`parser`]: central directory discovery over a [`ReadAt`](crate::io::ReadAt) source
//! - [`reader`]: [`ZipArchive`], entry lookup, decompression and extraction
//!
//! Supports STORED and DEFLATE entries and ZIP64 archives. Encrypted and
//! multi-disk archives are rejected.

mod parser;
mod reader;
mod structures;

pub use parser::{CentralDirectory, ZipParser};
pub use reader::ZipArchive;
pub use structures::{CompressionMethod, ZipFileEntry};
