//! Central directory discovery.
//!
//! Zip archives are read from the end:
//! 1. Find the End of Central Directory (EOCD) in the file's tail
//! 2. If fields are saturated, follow the ZIP64 locator to the ZIP64 EOCD
//! 3. Read the whole Central Directory in one request and decode each header
//!
//! Entry data is only touched later, when an entry is read. For remote
//! archives this keeps the listing down to one or two Range requests.

use std::io::Cursor;
use std::sync::Arc;

use anyhow::{Result, bail};

use super::structures::{
    CDFH_MIN_SIZE, EndOfCentralDirectory, LFH_SIZE, Zip64EndOfCentralDirectory, Zip64Locator,
    ZipFileEntry, local_data_offset,
};
use crate::io::ReadAt;

/// Longest comment the 16-bit length field can describe
const MAX_COMMENT_SIZE: u64 = 65535;

/// Location of the central directory inside the archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CentralDirectory {
    pub offset: u64,
    pub size: u64,
    pub entries: u64,
}

/// Low-level zip parser over any [`ReadAt`] source.
pub struct ZipParser {
    reader: Arc<dyn ReadAt>,
    size: u64,
}

impl ZipParser {
    pub fn new(reader: Arc<dyn ReadAt>) -> Self {
        let size = reader.size();
        Self { reader, size }
    }

    /// Find the EOCD record and return it with its offset.
    ///
    /// Tries the comment-less layout first, then scans backwards through the
    /// largest possible comment window for a signature whose comment length
    /// matches the bytes that follow it.
    pub async fn find_eocd(&self) -> Result<(EndOfCentralDirectory, u64)> {
        let eocd_size = EndOfCentralDirectory::SIZE as u64;
        if self.size < eocd_size {
            bail!("Not a valid ZIP file: {} bytes is too small", self.size);
        }

        let offset = self.size - eocd_size;
        let mut buf = vec![0u8; EndOfCentralDirectory::SIZE];
        self.reader.read_exact_at(offset, &mut buf).await?;
        if &buf[0..4] == EndOfCentralDirectory::SIGNATURE && buf[20..22] == [0, 0] {
            return Ok((EndOfCentralDirectory::parse(&buf)?, offset));
        }

        let window = (MAX_COMMENT_SIZE + eocd_size).min(self.size);
        let window_start = self.size - window;
        let mut buf = vec![0u8; window as usize];
        self.reader.read_exact_at(window_start, &mut buf).await?;

        for i in (0..=buf.len() - EndOfCentralDirectory::SIZE).rev() {
            if &buf[i..i + 4] != EndOfCentralDirectory::SIGNATURE {
                continue;
            }
            let comment_len = usize::from(u16::from_le_bytes([buf[i + 20], buf[i + 21]]));
            if comment_len == buf.len() - i - EndOfCentralDirectory::SIZE {
                let eocd = EndOfCentralDirectory::parse(&buf[i..i + EndOfCentralDirectory::SIZE])?;
                return Ok((eocd, window_start + i as u64));
            }
        }

        bail!("Not a valid ZIP file: End of Central Directory not found")
    }

    /// Follow the ZIP64 locator that precedes the EOCD.
    async fn read_zip64_eocd(&self, eocd_offset: u64) -> Result<Zip64EndOfCentralDirectory> {
        let Some(locator_offset) = eocd_offset.checked_sub(Zip64Locator::SIZE as u64) else {
            bail!("Archive too small for its ZIP64 End of Central Directory Locator");
        };

        let mut buf = vec![0u8; Zip64Locator::SIZE];
        self.reader.read_exact_at(locator_offset, &mut buf).await?;
        let locator = Zip64Locator::parse(&buf)?;

        let mut buf = vec![0u8; Zip64EndOfCentralDirectory::MIN_SIZE];
        self.reader
            .read_exact_at(locator.eocd64_offset, &mut buf)
            .await?;
        Zip64EndOfCentralDirectory::parse(&buf)
    }

    /// Locate the central directory and check it fits inside the archive.
    pub async fn central_directory(&self) -> Result<CentralDirectory> {
        let (eocd, eocd_offset) = self.find_eocd().await?;

        let cd = if eocd.needs_zip64() {
            let eocd64 = self.read_zip64_eocd(eocd_offset).await?;
            CentralDirectory {
                offset: eocd64.cd_offset,
                size: eocd64.cd_size,
                entries: eocd64.total_entries,
            }
        } else {
            CentralDirectory {
                offset: u64::from(eocd.cd_offset),
                size: u64::from(eocd.cd_size),
                entries: u64::from(eocd.total_entries),
            }
        };

        if cd.offset.checked_add(cd.size).is_none_or(|end| end > eocd_offset) {
            bail!(
                "Central Directory ({} bytes at offset {}) lies outside the archive",
                cd.size,
                cd.offset
            );
        }
        if cd.entries.saturating_mul(CDFH_MIN_SIZE as u64) > cd.size {
            bail!(
                "Central Directory of {} bytes cannot hold {} entries",
                cd.size,
                cd.entries
            );
        }

        Ok(cd)
    }

    /// Decode every Central Directory File Header.
    pub async fn list_files(&self) -> Result<Vec<ZipFileEntry>> {
        let cd = self.central_directory().await?;

        let mut data = vec![0u8; cd.size as usize];
        self.reader.read_exact_at(cd.offset, &mut data).await?;

        let mut cursor = Cursor::new(data.as_slice());
        let mut entries = Vec::with_capacity(cd.entries as usize);
        for _ in 0..cd.entries {
            entries.push(ZipFileEntry::read_from(&mut cursor)?);
        }

        Ok(entries)
    }

    /// Offset where the (possibly compressed) data of `entry` begins.
    pub async fn data_offset(&self, entry: &ZipFileEntry) -> Result<u64> {
        let mut header = vec![0u8; LFH_SIZE];
        self.reader
            .read_exact_at(entry.lfh_offset, &mut header)
            .await?;
        local_data_offset(entry.lfh_offset, &header)
    }

    pub fn reader(&self) -> &Arc<dyn ReadAt> {
        &self.reader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct InMemory(Vec<u8>);

    #[async_trait]
    impl ReadAt for InMemory {
        async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
            let start = (offset as usize).min(self.0.len());
            let n = buf.len().min(self.0.len() - start);
            buf[..n].copy_from_slice(&self.0[start..start + n]);
            Ok(n)
        }

        fn size(&self) -> u64 {
            self.0.len() as u64
        }
    }

    fn eocd(entries: u16, cd_size: u32, cd_offset: u32, comment: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(EndOfCentralDirectory::SIGNATURE);
        buf.extend_from_slice(&[0u8; 4]);
        buf.extend_from_slice(&entries.to_le_bytes());
        buf.extend_from_slice(&entries.to_le_bytes());
        buf.extend_from_slice(&cd_size.to_le_bytes());
        buf.extend_from_slice(&cd_offset.to_le_bytes());
        buf.extend_from_slice(&(comment.len() as u16).to_le_bytes());
        buf.extend_from_slice(comment);
        buf
    }

    fn parser(data: Vec<u8>) -> ZipParser {
        ZipParser::new(Arc::new(InMemory(data)))
    }

    #[tokio::test]
    async fn test_empty_archive() {
        let entries = parser(eocd(0, 0, 0, b"")).list_files().await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_eocd_behind_comment() {
        let mut data = b"junk before the directory".to_vec();
        data.extend(eocd(0, 0, 25, b"Livery pack, do not redistribute"));

        let (record, offset) = parser(data).find_eocd().await.unwrap();
        assert_eq!(offset, 25);
        assert_eq!(record.comment_len, 32);
    }

    #[tokio::test]
    async fn test_directory_outside_archive() {
        let err = parser(eocd(1, 46, 100, b""))
            .central_directory()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("lies outside the archive"));
    }

    #[tokio::test]
    async fn test_entry_count_exceeds_directory() {
        let mut data = vec![0u8; 46];
        data.extend(eocd(500, 46, 0, b""));

        let err = parser(data).central_directory().await.unwrap_err();
        assert!(err.to_string().contains("cannot hold 500 entries"));
    }

    #[tokio::test]
    async fn test_too_small() {
        let err = parser(b"PK".to_vec()).find_eocd().await.unwrap_err();
        assert!(err.to_string().contains("too small"));
    }
}
