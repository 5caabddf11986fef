use super::ReadAt;
use anyhow::Result;
use async_trait::async_trait;
use std::fs::File;
use std::path::Path;

/// Livery archive on the local filesystem, read with positional reads.
pub struct LocalFileReader {
    file: File,
    size: u64,
}

impl LocalFileReader {
    pub fn new(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        Ok(Self { file, size })
    }
}

#[async_trait]
impl ReadAt for LocalFileReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::FileExt;
            Ok(self.file.read_at(buf, offset)?)
        }

        #[cfg(windows)]
        {
            // seek_read moves the cursor, which nothing else relies on
            use std::os::windows::fs::FileExt;
            Ok(self.file.seek_read(buf, offset)?)
        }

        #[cfg(not(any(unix, windows)))]
        {
            use std::io::{Read, Seek, SeekFrom};
            let mut file = &self.file;
            file.seek(SeekFrom::Start(offset))?;
            Ok(file.read(buf)?)
        }
    }

    fn size(&self) -> u64 {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_read_at_offset() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.bin");
        std::fs::write(&path, b"PK\x03\x04livery").unwrap();

        let reader = LocalFileReader::new(&path).unwrap();
        assert_eq!(reader.size(), 10);

        let mut buf = [0u8; 6];
        reader.read_exact_at(4, &mut buf).await.unwrap();
        assert_eq!(&buf, b"livery");
    }

    #[test]
    fn test_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        assert!(LocalFileReader::new(&temp_dir.path().join("nope.zip")).is_err());
    }
}
