use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use flate2::read::DeflateDecoder;
use tokio::fs;

use super::parser::ZipParser;
use super::structures::{CompressionMethod, ZipFileEntry};
use crate::io::ReadAt;

/// Best case DEFLATE expansion: one 258-byte match per 2 bits of input
const MAX_DEFLATE_RATIO: u64 = 1032;
/// Upper bound for the up-front output allocation; larger entries grow as
/// they decode.
const MAX_PREALLOC: u64 = 64 * 1024 * 1024;

/// An opened zip archive with its central directory already decoded
pub struct ZipArchive {
    parser: ZipParser,
    entries: Vec<ZipFileEntry>,
}

impl ZipArchive {
    /// Read the central directory of the archive behind `reader`.
    pub async fn open(reader: Arc<dyn ReadAt>) -> Result<Self> {
        let parser = ZipParser::new(reader);
        let entries = parser.list_files().await?;
        Ok(Self { parser, entries })
    }

    pub fn entries(&self) -> &[ZipFileEntry] {
        &self.entries
    }

    /// Network traffic spent on this archive, for remote sources
    pub fn transferred_bytes(&self) -> Option<u64> {
        self.parser.reader().transferred_bytes()
    }

    /// Find a file entry by its exact stored name.
    pub fn by_name(&self, name: &str) -> Option<&ZipFileEntry> {
        self.entries
            .iter()
            .find(|e| !e.is_directory && e.file_name == name)
    }

    /// Fail early for entries this reader cannot decode, or whose declared
    /// size cannot come out of their compressed data.
    pub fn ensure_supported(entry: &ZipFileEntry) -> Result<()> {
        if entry.is_encrypted() {
            bail!("{} is encrypted", entry.file_name);
        }

        let plausible = match entry.compression_method {
            CompressionMethod::Stored => entry.uncompressed_size == entry.compressed_size,
            CompressionMethod::Deflate => {
                entry.uncompressed_size <= entry.compressed_size.saturating_mul(MAX_DEFLATE_RATIO)
            }
            CompressionMethod::Unknown(code) => bail!(
                "{} uses unsupported compression method {} (only STORED and DEFLATE are supported)",
                entry.file_name,
                code
            ),
        };
        if !plausible {
            bail!(
                "{} declares an implausible size: {} bytes from {} compressed",
                entry.file_name,
                entry.uncompressed_size,
                entry.compressed_size
            );
        }

        Ok(())
    }

    /// Read and decompress an entry, verifying its size and CRC-32.
    pub async fn read_entry(&self, entry: &ZipFileEntry) -> Result<Vec<u8>> {
        Self::ensure_supported(entry)?;

        let data_offset = self.parser.data_offset(entry).await?;
        let archive_size = self.parser.reader().size();
        if data_offset
            .checked_add(entry.compressed_size)
            .is_none_or(|end| end > archive_size)
        {
            bail!("{} runs past the end of the archive", entry.file_name);
        }

        let mut raw = vec![0u8; entry.compressed_size as usize];
        self.parser
            .reader()
            .read_exact_at(data_offset, &mut raw)
            .await?;

        let data = match entry.compression_method {
            CompressionMethod::Stored => raw,
            CompressionMethod::Deflate => {
                let capacity = entry.uncompressed_size.min(MAX_PREALLOC);
                let mut out = Vec::with_capacity(capacity as usize);
                // One byte past the declared size is enough to detect a lie
                DeflateDecoder::new(raw.as_slice())
                    .take(entry.uncompressed_size.saturating_add(1))
                    .read_to_end(&mut out)
                    .with_context(|| format!("Failed to inflate {}", entry.file_name))?;
                out
            }
            CompressionMethod::Unknown(code) => {
                bail!("Unsupported compression method {} for {}", code, entry.file_name)
            }
        };

        if data.len() as u64 != entry.uncompressed_size {
            bail!(
                "{} decoded to {} bytes, expected {}",
                entry.file_name,
                data.len(),
                entry.uncompressed_size
            );
        }

        let crc = crc32fast::hash(&data);
        if crc != entry.crc32 {
            bail!(
                "CRC-32 mismatch for {}: got {:08x}, expected {:08x}",
                entry.file_name,
                crc,
                entry.crc32
            );
        }

        Ok(data)
    }

    /// Extract a file entry to `output_path`, replacing any existing file.
    ///
    /// Parent directories are created as needed. On unix the permission bits
    /// recorded in the archive are applied. An existing file is unlinked
    /// first, so a read-only copy from an earlier extraction does not block
    /// the write.
    pub async fn extract_to_file(&self, entry: &ZipFileEntry, output_path: &Path) -> Result<()> {
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let data = self.read_entry(entry).await?;
        match fs::remove_file(output_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        fs::write(output_path, &data).await?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(output_path, std::fs::Permissions::from_mode(mode)).await?;
        }

        Ok(())
    }
}
