use std::io::Write;
use std::path::Path;

use tempfile::TempDir;
use zip::CompressionMethod;
use zip::write::FileOptions;

use crate::installer::LAYOUT_GENERATOR;

/// One entry of a fixture archive
pub struct ZipFixture {
    name: String,
    data: Option<Vec<u8>>,
    method: CompressionMethod,
    mode: Option<u32>,
}

impl ZipFixture {
    pub fn dir(name: &str) -> Self {
        Self {
            name: name.to_string(),
            data: None,
            method: CompressionMethod::Stored,
            mode: None,
        }
    }

    pub fn stored(name: &str, data: &[u8]) -> Self {
        Self {
            name: name.to_string(),
            data: Some(data.to_vec()),
            method: CompressionMethod::Stored,
            mode: None,
        }
    }

    pub fn deflated(name: &str, data: &[u8]) -> Self {
        Self {
            method: CompressionMethod::Deflated,
            ..Self::stored(name, data)
        }
    }

    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = Some(mode);
        self
    }
}

/// Write a zip archive built from `entries` to `path`
pub fn write_zip(path: &Path, entries: &[ZipFixture]) {
    let file = std::fs::File::create(path).expect("Failed to create fixture archive");
    let mut writer = zip::ZipWriter::new(file);

    for entry in entries {
        let mut options = FileOptions::default().compression_method(entry.method);
        if let Some(mode) = entry.mode {
            options = options.unix_permissions(mode);
        }
        match &entry.data {
            None => writer.add_directory(entry.name.as_str(), options).unwrap(),
            Some(data) => {
                writer.start_file(entry.name.as_str(), options).unwrap();
                writer.write_all(data).unwrap();
            }
        }
    }

    writer.finish().expect("Failed to finish fixture archive");
}

/// Metadata document with every required field present
pub fn livery_json(livery_id: &str, atc_id: &str) -> String {
    format!(
        r#"{{
  "rev": 3,
  "productId": 7700,
  "productPackage": "pmdg-aircraft-77f",
  "title": "Air France Cargo",
  "airline": "Air France",
  "airlineIcao": "AFR",
  "atcId": "{atc_id}",
  "liveryId": "{livery_id}",
  "version": 1
}}"#
    )
}

/// Community folder containing the layout generator marker
pub fn community_root() -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp directory");
    std::fs::write(dir.path().join(LAYOUT_GENERATOR), b"MZ").unwrap();
    dir
}

/// Every path below `root`, relative and sorted
pub fn tree(root: &Path) -> Vec<String> {
    fn walk(root: &Path, dir: &Path, out: &mut Vec<String>) {
        let Ok(read_dir) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in read_dir.flatten() {
            let path = entry.path();
            let rel = path.strip_prefix(root).unwrap();
            out.push(rel.to_string_lossy().replace('\\', "/"));
            if path.is_dir() {
                walk(root, &path, out);
            }
        }
    }

    let mut out = Vec::new();
    walk(root, root, &mut out);
    out.sort();
    out
}

/// Single DEFLATE entry whose central directory header claims
/// `declared_size` bytes through a ZIP64 extra field.
pub fn zip64_declared_size(name: &str, data: &[u8], declared_size: u64) -> Vec<u8> {
    let mut encoder =
        flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    let payload = encoder.finish().unwrap();
    let crc = crc32fast::hash(data);
    let name_len = name.len() as u16;

    let mut zip = Vec::new();
    zip.extend_from_slice(b"PK\x03\x04");
    zip.extend_from_slice(&20u16.to_le_bytes()); // version needed
    zip.extend_from_slice(&0u16.to_le_bytes()); // flags
    zip.extend_from_slice(&8u16.to_le_bytes()); // deflate
    zip.extend_from_slice(&[0u8; 4]); // time, date
    zip.extend_from_slice(&crc.to_le_bytes());
    zip.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    zip.extend_from_slice(&(data.len() as u32).to_le_bytes());
    zip.extend_from_slice(&name_len.to_le_bytes());
    zip.extend_from_slice(&0u16.to_le_bytes());
    zip.extend_from_slice(name.as_bytes());
    zip.extend_from_slice(&payload);

    let cd_offset = zip.len() as u32;
    zip.extend_from_slice(b"PK\x01\x02");
    zip.extend_from_slice(&0x0314u16.to_le_bytes()); // made by unix
    zip.extend_from_slice(&45u16.to_le_bytes());
    zip.extend_from_slice(&0u16.to_le_bytes());
    zip.extend_from_slice(&8u16.to_le_bytes());
    zip.extend_from_slice(&[0u8; 4]);
    zip.extend_from_slice(&crc.to_le_bytes());
    zip.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    zip.extend_from_slice(&u32::MAX.to_le_bytes()); // size lives in the extra field
    zip.extend_from_slice(&name_len.to_le_bytes());
    zip.extend_from_slice(&12u16.to_le_bytes()); // extra length
    zip.extend_from_slice(&0u16.to_le_bytes()); // comment length
    zip.extend_from_slice(&0u16.to_le_bytes()); // disk
    zip.extend_from_slice(&0u16.to_le_bytes()); // internal attrs
    zip.extend_from_slice(&(0o100644u32 << 16).to_le_bytes());
    zip.extend_from_slice(&0u32.to_le_bytes()); // local header offset
    zip.extend_from_slice(name.as_bytes());
    zip.extend_from_slice(&0x0001u16.to_le_bytes());
    zip.extend_from_slice(&8u16.to_le_bytes());
    zip.extend_from_slice(&declared_size.to_le_bytes());
    let cd_size = zip.len() as u32 - cd_offset;

    zip.extend_from_slice(b"PK\x05\x06");
    zip.extend_from_slice(&[0u8; 4]); // disk numbers
    zip.extend_from_slice(&1u16.to_le_bytes());
    zip.extend_from_slice(&1u16.to_le_bytes());
    zip.extend_from_slice(&cd_size.to_le_bytes());
    zip.extend_from_slice(&cd_offset.to_le_bytes());
    zip.extend_from_slice(&0u16.to_le_bytes());
    zip
}
