//! Directory key lists.

use crate::error::Result;
use crate::key::{Key, LARGE_KEY_VERSION};
use crate::reader::Reader;

/// Where a directory keeps its key list.
#[derive(Debug, Clone, Copy)]
pub struct DirectoryHeader {
    /// Offset of the key list; 0 when the directory is empty.
    pub keys_offset: u64,
}

impl DirectoryHeader {
    /// Decode the `TDirectory` streamer at the cursor.
    ///
    /// ```text
    /// u16 version | u32 ctime | u32 mtime | u32 nbytes keys | u32 nbytes name
    /// seek self   | seek parent | seek keys
    /// ```
    pub fn read(r: &mut Reader) -> Result<Self> {
        let wide = r.read_u16()? > LARGE_KEY_VERSION;
        r.skip(4 * 4)?;
        r.read_seek(wide)?;
        r.read_seek(wide)?;
        Ok(Self { keys_offset: r.read_seek(wide)? })
    }
}

/// Keys of one directory in file order. Several cycles of a name may appear.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    keys: Vec<Key>,
}

impl Directory {
    /// Read the key list `header` points at: a key record for the list
    /// itself, a u32 count, then the keys.
    pub fn read(file: &[u8], header: DirectoryHeader, wide: bool) -> Result<Self> {
        if header.keys_offset == 0 {
            return Ok(Self::default());
        }
        let mut r = Reader::at(file, header.keys_offset as usize);
        Key::read(&mut r, wide)?;
        let count = r.read_u32()?;
        let keys = (0..count).map(|_| Key::read(&mut r, wide)).collect::<Result<_>>()?;
        Ok(Self { keys })
    }

    /// All keys.
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// Latest cycle of `name`.
    pub fn find_key(&self, name: &str) -> Option<&Key> {
        self.keys.iter().filter(|k| k.name == name).max_by_key(|k| k.cycle)
    }
}
