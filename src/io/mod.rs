mod http;
mod local;

pub use http::{HttpRangeReader, HttpStatusError};
pub use local::LocalFileReader;

use anyhow::{Result, bail};
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;

/// Trait for random access reading from an archive source
#[async_trait]
pub trait ReadAt: Send + Sync {
    /// Read data at the specified offset into the buffer
    ///
    /// May return fewer bytes than requested; `Ok(0)` means end of data.
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Get the total size of the data source
    fn size(&self) -> u64;

    /// Bytes fetched over the network so far; `None` for local sources
    fn transferred_bytes(&self) -> Option<u64> {
        None
    }

    /// Fill the whole buffer starting at `offset`, failing on a short source.
    async fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let end = offset.checked_add(buf.len() as u64);
        if end.is_none_or(|end| end > self.size()) {
            bail!(
                "Read of {} bytes at offset {} runs past end of archive ({} bytes)",
                buf.len(),
                offset,
                self.size()
            );
        }

        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read_at(offset + filled as u64, &mut buf[filled..]).await?;
            if n == 0 {
                bail!("Unexpected end of archive at offset {}", offset + filled as u64);
            }
            filled += n;
        }
        Ok(())
    }
}

/// Where an archive lives: on disk or behind an HTTP(S) URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveLocation {
    Local(PathBuf),
    Remote(String),
}

impl ArchiveLocation {
    pub fn parse(input: &str) -> Self {
        if is_http_url(input) {
            ArchiveLocation::Remote(input.to_string())
        } else {
            ArchiveLocation::Local(PathBuf::from(input))
        }
    }
}

impl fmt::Display for ArchiveLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveLocation::Local(path) => write!(f, "{}", path.display()),
            ArchiveLocation::Remote(url) => f.write_str(url),
        }
    }
}

fn is_http_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}
