use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};

use anyhow::{Result, bail};

const U16_SENTINEL: u16 = 0xFFFF;
const U32_SENTINEL: u32 = 0xFFFF_FFFF;
const ZIP64_EXTRA_ID: u16 = 0x0001;
const HOST_UNIX: u16 = 3;
const FLAG_ENCRYPTED: u16 = 0x0001;

/// Compression method recorded for an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl From<u16> for CompressionMethod {
    fn from(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            other => CompressionMethod::Unknown(other),
        }
    }
}

impl CompressionMethod {
    pub fn code(self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unknown(v) => v,
        }
    }
}

/// End of Central Directory record, 22 bytes plus a trailing comment
#[derive(Debug)]
pub struct EndOfCentralDirectory {
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8; 4] = b"PK\x05\x06";
    pub const SIZE: usize = 22;

    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE || &data[0..4] != Self::SIGNATURE {
            bail!("Invalid End of Central Directory");
        }

        // Skip signature, disk number and disk-with-cd
        let mut cursor = Cursor::new(&data[8..Self::SIZE]);
        Ok(Self {
            disk_entries: cursor.read_u16::<LittleEndian>()?,
            total_entries: cursor.read_u16::<LittleEndian>()?,
            cd_size: cursor.read_u32::<LittleEndian>()?,
            cd_offset: cursor.read_u32::<LittleEndian>()?,
            comment_len: cursor.read_u16::<LittleEndian>()?,
        })
    }

    /// Any saturated field means the real value lives in the ZIP64 record.
    pub fn needs_zip64(&self) -> bool {
        self.disk_entries == U16_SENTINEL
            || self.total_entries == U16_SENTINEL
            || self.cd_size == U32_SENTINEL
            || self.cd_offset == U32_SENTINEL
    }
}

/// ZIP64 End of Central Directory Locator, sits right before the EOCD
pub struct Zip64Locator {
    pub eocd64_offset: u64,
}

impl Zip64Locator {
    pub const SIGNATURE: &'static [u8; 4] = b"PK\x06\x07";
    pub const SIZE: usize = 20;

    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE || &data[0..4] != Self::SIGNATURE {
            bail!("Invalid ZIP64 End of Central Directory Locator");
        }

        let mut cursor = Cursor::new(&data[8..16]);
        Ok(Self {
            eocd64_offset: cursor.read_u64::<LittleEndian>()?,
        })
    }
}

/// ZIP64 End of Central Directory record
pub struct Zip64EndOfCentralDirectory {
    pub total_entries: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
}

impl Zip64EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8; 4] = b"PK\x06\x06";
    pub const MIN_SIZE: usize = 56;

    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::MIN_SIZE || &data[0..4] != Self::SIGNATURE {
            bail!("Invalid ZIP64 End of Central Directory");
        }

        // Entries on this disk at 24, total entries at 32
        let mut cursor = Cursor::new(&data[32..Self::MIN_SIZE]);
        Ok(Self {
            total_entries: cursor.read_u64::<LittleEndian>()?,
            cd_size: cursor.read_u64::<LittleEndian>()?,
            cd_offset: cursor.read_u64::<LittleEndian>()?,
        })
    }
}

pub const CDFH_SIGNATURE: &[u8; 4] = b"PK\x01\x02";
pub const CDFH_MIN_SIZE: usize = 46;

pub const LFH_SIGNATURE: &[u8; 4] = b"PK\x03\x04";
pub const LFH_SIZE: usize = 30;

/// One entry of the central directory
#[derive(Debug, Clone)]
pub struct ZipFileEntry {
    pub file_name: String,
    pub compression_method: CompressionMethod,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub crc32: u32,
    pub lfh_offset: u64,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub is_directory: bool,
    version_made_by: u16,
    flags: u16,
    external_attrs: u32,
}

impl ZipFileEntry {
    /// Parse a Central Directory File Header at the cursor position,
    /// leaving the cursor on the next header.
    pub fn read_from(cursor: &mut Cursor<&[u8]>) -> Result<Self> {
        let mut sig = [0u8; 4];
        cursor.read_exact(&mut sig)?;
        if &sig != CDFH_SIGNATURE {
            bail!("Invalid Central Directory File Header");
        }

        let version_made_by = cursor.read_u16::<LittleEndian>()?;
        let _version_needed = cursor.read_u16::<LittleEndian>()?;
        let flags = cursor.read_u16::<LittleEndian>()?;
        let compression_method = cursor.read_u16::<LittleEndian>()?;
        let last_mod_time = cursor.read_u16::<LittleEndian>()?;
        let last_mod_date = cursor.read_u16::<LittleEndian>()?;
        let crc32 = cursor.read_u32::<LittleEndian>()?;
        let compressed_size = cursor.read_u32::<LittleEndian>()?;
        let uncompressed_size = cursor.read_u32::<LittleEndian>()?;
        let name_len = cursor.read_u16::<LittleEndian>()?;
        let extra_len = cursor.read_u16::<LittleEndian>()?;
        let comment_len = cursor.read_u16::<LittleEndian>()?;
        let _disk_start = cursor.read_u16::<LittleEndian>()?;
        let _internal_attrs = cursor.read_u16::<LittleEndian>()?;
        let external_attrs = cursor.read_u32::<LittleEndian>()?;
        let lfh_offset = cursor.read_u32::<LittleEndian>()?;

        let mut name = vec![0u8; usize::from(name_len)];
        cursor.read_exact(&mut name)?;
        let file_name = String::from_utf8_lossy(&name).into_owned();

        let mut extra = vec![0u8; usize::from(extra_len)];
        cursor.read_exact(&mut extra)?;

        let mut comment = vec![0u8; usize::from(comment_len)];
        cursor.read_exact(&mut comment)?;

        let mut entry = Self {
            is_directory: file_name.ends_with('/') || file_name.ends_with('\\'),
            file_name,
            compression_method: CompressionMethod::from(compression_method),
            compressed_size: u64::from(compressed_size),
            uncompressed_size: u64::from(uncompressed_size),
            crc32,
            lfh_offset: u64::from(lfh_offset),
            last_mod_time,
            last_mod_date,
            version_made_by,
            flags,
            external_attrs,
        };
        entry.apply_zip64_extra(&extra)?;

        Ok(entry)
    }

    /// Replace saturated 32-bit fields with the values from the ZIP64 extra
    /// field. Values appear in fixed order, only for fields that overflowed.
    fn apply_zip64_extra(&mut self, extra: &[u8]) -> Result<()> {
        let mut cursor = Cursor::new(extra);

        while (cursor.position() as usize) + 4 <= extra.len() {
            let id = cursor.read_u16::<LittleEndian>()?;
            let size = u64::from(cursor.read_u16::<LittleEndian>()?);
            let body_end = cursor.position() + size;

            if id == ZIP64_EXTRA_ID {
                if self.uncompressed_size == u64::from(U32_SENTINEL) {
                    self.uncompressed_size = cursor.read_u64::<LittleEndian>()?;
                }
                if self.compressed_size == u64::from(U32_SENTINEL) {
                    self.compressed_size = cursor.read_u64::<LittleEndian>()?;
                }
                if self.lfh_offset == u64::from(U32_SENTINEL) {
                    self.lfh_offset = cursor.read_u64::<LittleEndian>()?;
                }
            }

            cursor.set_position(body_end);
        }

        Ok(())
    }

    /// Permission bits recorded by a unix archiver, if any.
    /// setuid, setgid and sticky bits are dropped.
    pub fn unix_mode(&self) -> Option<u32> {
        if self.version_made_by >> 8 != HOST_UNIX {
            return None;
        }
        match (self.external_attrs >> 16) & 0o777 {
            0 => None,
            mode => Some(mode),
        }
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }

    /// Parse modification date to (year, month, day)
    pub fn mod_date(&self) -> (u16, u8, u8) {
        let day = (self.last_mod_date & 0x1F) as u8;
        let month = ((self.last_mod_date >> 5) & 0x0F) as u8;
        let year = ((self.last_mod_date >> 9) & 0x7F) + 1980;
        (year, month, day)
    }

    /// Parse modification time to (hour, minute, second)
    pub fn mod_time(&self) -> (u8, u8, u8) {
        let second = ((self.last_mod_time & 0x1F) * 2) as u8;
        let minute = ((self.last_mod_time >> 5) & 0x3F) as u8;
        let hour = ((self.last_mod_time >> 11) & 0x1F) as u8;
        (hour, minute, second)
    }
}

/// Offset of the entry data behind a Local File Header.
///
/// The local name and extra lengths may differ from the central directory,
/// so they are read from the local header itself.
pub fn local_data_offset(lfh_offset: u64, header: &[u8]) -> Result<u64> {
    if header.len() < LFH_SIZE || &header[0..4] != LFH_SIGNATURE {
        bail!("Invalid Local File Header at offset {}", lfh_offset);
    }

    let mut cursor = Cursor::new(&header[26..LFH_SIZE]);
    let name_len = u64::from(cursor.read_u16::<LittleEndian>()?);
    let extra_len = u64::from(cursor.read_u16::<LittleEndian>()?);

    Ok(lfh_offset + LFH_SIZE as u64 + name_len + extra_len)
}
