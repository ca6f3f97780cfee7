//! `TKey` records locating stored objects inside a file.

use crate::error::{Result, RootError};
use crate::reader::Reader;

/// Streamer versions above this store seek pointers as u64.
pub const LARGE_KEY_VERSION: u16 = 1000;

const DIRECTORY_CLASSES: [&str; 2] = ["TDirectoryFile", "TDirectory"];

/// One key record as laid out on disk.
///
/// ```text
/// u32 record_len | u16 version | u32 object_len | u32 datime
/// u16 header_len | u16 cycle   | seek offset    | seek parent
/// string class   | string name | string title
/// ```
#[derive(Debug, Clone)]
pub struct Key {
    /// Header plus stored (possibly compressed) object.
    pub record_len: u32,
    /// Object size once decompressed.
    pub object_len: u32,
    /// Size of the header alone.
    pub header_len: u16,
    /// Cycle number within the owning directory.
    pub cycle: u16,
    /// Absolute offset of the record.
    pub offset: u64,
    /// Class of the stored object.
    pub class_name: String,
    /// Object name.
    pub name: String,
    /// Object title.
    pub title: String,
}

impl Key {
    /// Parse a key header at the cursor. `wide` is set for large files,
    /// which use 64-bit seek pointers regardless of the key version.
    pub fn read(r: &mut Reader, wide: bool) -> Result<Self> {
        let record_len = r.read_u32()?;
        let version = r.read_u16()?;
        let object_len = r.read_u32()?;
        r.skip(4)?;
        let header_len = r.read_u16()?;
        let cycle = r.read_u16()?;

        let wide = wide || version > LARGE_KEY_VERSION;
        let offset = r.read_seek(wide)?;
        r.read_seek(wide)?;

        Ok(Key {
            record_len,
            object_len,
            header_len,
            cycle,
            offset,
            class_name: r.read_string()?,
            name: r.read_string()?,
            title: r.read_string()?,
        })
    }

    /// Whether this key holds a subdirectory.
    pub fn is_directory(&self) -> bool {
        DIRECTORY_CLASSES.contains(&self.class_name.as_str())
    }

    /// Stored bytes differ in size from the object, so they are compressed.
    pub fn is_compressed(&self) -> bool {
        self.record_len.saturating_sub(u32::from(self.header_len)) != self.object_len
    }

    /// Stored object bytes of this record within `file`, header stripped.
    pub fn stored_bytes<'a>(&self, file: &'a [u8]) -> Result<&'a [u8]> {
        let start = self.offset as usize;
        let len = self.record_len as usize;
        let record = file.get(start..start.saturating_add(len)).ok_or(RootError::BufferUnderflow {
            offset: start,
            need: len,
            have: file.len().saturating_sub(start),
        })?;
        record.get(usize::from(self.header_len)..).ok_or_else(|| {
            RootError::Deserialization(format!("key '{}' is shorter than its own header", self.name))
        })
    }

    /// Summary for callers outside the crate.
    pub fn info(&self) -> KeyInfo {
        KeyInfo {
            name: self.name.clone(),
            class_name: self.class_name.clone(),
            title: self.title.clone(),
            cycle: self.cycle,
            is_directory: self.is_directory(),
        }
    }
}

/// What [`RootFile::list_keys`](crate::RootFile::list_keys) reports per key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInfo {
    /// Object name.
    pub name: String,
    /// Class name, e.g. `TH1D` or `TDirectoryFile`.
    pub class_name: String,
    /// Object title.
    pub title: String,
    /// Cycle number.
    pub cycle: u16,
    /// The key holds a subdirectory that can be listed in turn.
    pub is_directory: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(record_len: u32, header_len: u16, object_len: u32, class_name: &str) -> Key {
        Key {
            record_len,
            object_len,
            header_len,
            cycle: 1,
            offset: 0,
            class_name: class_name.into(),
            name: "k".into(),
            title: String::new(),
        }
    }

    #[test]
    fn compression_follows_sizes() {
        assert!(!key(100, 60, 40, "TH1D").is_compressed());
        assert!(key(100, 60, 400, "TH1D").is_compressed());
    }

    #[test]
    fn stored_bytes_skip_header() {
        let file = [0u8, 0, 7, 8, 9];
        let k = key(5, 2, 3, "TH1D");
        assert_eq!(k.stored_bytes(&file).unwrap(), &[7, 8, 9]);
        assert!(key(9, 2, 7, "TH1D").stored_bytes(&file).is_err());
    }

    #[test]
    fn info_flags_directories() {
        assert!(key(1, 1, 0, "TDirectoryFile").info().is_directory);
        assert!(!key(1, 1, 0, "TH1F").info().is_directory);
    }
}
