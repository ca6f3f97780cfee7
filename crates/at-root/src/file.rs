//! Top-level ROOT file access.

use std::fs;
use std::path::{Path, PathBuf};

use crate::decompress::decompress;
use crate::directory::{Directory, DirectoryHeader};
use crate::error::{Result, RootError};
use crate::histogram::Histogram;
use crate::key::{Key, KeyInfo};
use crate::objects;
use crate::reader::Reader;

pub(crate) const ROOT_MAGIC: &[u8; 4] = b"root";
/// Format versions from here on store 64-bit offsets.
pub(crate) const LARGE_FILE_VERSION: u32 = 1_000_000;
/// Shortest byte count that can hold a file header.
pub(crate) const MIN_FILE_LEN: usize = 64;

/// Weight files on disk are mapped; written files are parsed from memory.
enum Backing {
    Memory(Vec<u8>),
    Mapped(memmap2::Mmap),
}

impl Backing {
    fn bytes(&self) -> &[u8] {
        match self {
            Backing::Memory(v) => v,
            Backing::Mapped(m) => m,
        }
    }
}

/// A ROOT file opened read-only.
pub struct RootFile {
    backing: Backing,
    path: PathBuf,
    wide: bool,
    top: DirectoryHeader,
}

impl std::fmt::Debug for RootFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootFile")
            .field("path", &self.path)
            .field("len", &self.bytes().len())
            .field("wide", &self.wide)
            .finish()
    }
}

impl RootFile {
    /// Map and parse a ROOT file from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = fs::File::open(&path)?;
        // SAFETY: read-only mapping; weight files are not rewritten while a job runs.
        let map = unsafe { memmap2::Mmap::map(&file)? };
        Self::parse(Backing::Mapped(map), path)
    }

    /// Parse a ROOT file held in memory. `path` only labels diagnostics.
    pub fn from_bytes(data: Vec<u8>, path: impl Into<PathBuf>) -> Result<Self> {
        Self::parse(Backing::Memory(data), path.into())
    }

    fn parse(backing: Backing, path: PathBuf) -> Result<Self> {
        let (wide, top) = read_file_header(backing.bytes())?;
        log::debug!("opened {} ({} bytes, wide offsets: {wide})", path.display(), backing.bytes().len());
        Ok(Self { backing, path, wide, top })
    }

    fn bytes(&self) -> &[u8] {
        self.backing.bytes()
    }

    /// Path the file was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keys of the top-level directory.
    pub fn list_keys(&self) -> Result<Vec<KeyInfo>> {
        self.list_keys_in("")
    }

    /// Keys of the directory at `path`; `""` is the top level.
    pub fn list_keys_in(&self, path: &str) -> Result<Vec<KeyInfo>> {
        let dir = segments(path).try_fold(self.top_directory()?, |dir, name| self.subdirectory(&dir, name, path))?;
        Ok(dir.keys().iter().map(Key::info).collect())
    }

    /// Read the histogram at `path`, e.g. `"isrWeight"` or `"2016/puData"`.
    pub fn get_histogram(&self, path: &str) -> Result<Histogram> {
        let not_found = || RootError::KeyNotFound(path.to_string());
        let (dirs, leaf) = path.trim_matches('/').rsplit_once('/').unwrap_or(("", path.trim_matches('/')));
        if leaf.is_empty() {
            return Err(not_found());
        }
        let dir = segments(dirs).try_fold(self.top_directory()?, |dir, name| self.subdirectory(&dir, name, path))?;
        let key = dir.find_key(leaf).ok_or_else(not_found)?;
        if !objects::is_histogram_class(&key.class_name) {
            return Err(RootError::UnsupportedClass(format!(
                "'{path}' holds a {}, not a 1D histogram",
                key.class_name
            )));
        }
        objects::read_histogram(&self.object_bytes(key)?, &key.class_name)
    }

    fn top_directory(&self) -> Result<Directory> {
        Directory::read(self.bytes(), self.top, self.wide)
    }

    fn subdirectory(&self, parent: &Directory, name: &str, full_path: &str) -> Result<Directory> {
        let key = parent
            .find_key(name)
            .ok_or_else(|| RootError::KeyNotFound(format!("{name} (in path {full_path})")))?;
        if !key.is_directory() {
            return Err(RootError::Deserialization(format!(
                "'{name}' is a {}, not a directory",
                key.class_name
            )));
        }
        let header = DirectoryHeader::read(&mut Reader::new(&self.object_bytes(key)?))?;
        Directory::read(self.bytes(), header, self.wide)
    }

    fn object_bytes(&self, key: &Key) -> Result<Vec<u8>> {
        let stored = key.stored_bytes(self.bytes())?;
        if key.is_compressed() { decompress(stored, key.object_len as usize) } else { Ok(stored.to_vec()) }
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Check the magic, then decode the fixed header and the top directory
/// record that follows the name record at `fBEGIN + fNbytesName`.
///
/// ```text
/// "root" | u32 version | u32 begin | seek end | seek free
/// u32 nbytes free | u32 n free | u32 nbytes name | ...
/// ```
fn read_file_header(data: &[u8]) -> Result<(bool, DirectoryHeader)> {
    if data.len() < MIN_FILE_LEN || !data.starts_with(ROOT_MAGIC) {
        return Err(RootError::BadMagic);
    }
    let mut r = Reader::at(data, ROOT_MAGIC.len());
    let wide = r.read_u32()? >= LARGE_FILE_VERSION;
    let begin = r.read_u32()? as usize;
    r.read_seek(wide)?;
    r.read_seek(wide)?;
    r.skip(2 * 4)?;
    let name_len = r.read_u32()? as usize;

    let top_at = begin + name_len;
    if top_at >= data.len() {
        return Err(RootError::Deserialization("top directory lies past end of file".into()));
    }
    let top = DirectoryHeader::read(&mut Reader::at(data, top_at))?;
    Ok((wide, top))
}
