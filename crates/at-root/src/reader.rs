//! Big-endian streamer decoding.

use crate::error::{Result, RootError};

/// Flag on the leading u32 of a streamed object saying a byte count, not a
/// bare version, comes first.
pub const BYTE_COUNT_MASK: u32 = 0x4000_0000;

/// `TObject::kIsReferenced`: a process-id slot follows the bits.
const IS_REFERENCED: u32 = 1 << 4;

macro_rules! be_primitives {
    ($($(#[$doc:meta])* $name:ident => $ty:ty;)*) => {
        $(
            $(#[$doc])*
            pub fn $name(&mut self) -> Result<$ty> {
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(self.take(std::mem::size_of::<$ty>())?);
                Ok(<$ty>::from_be_bytes(raw))
            }
        )*
    };
}

/// Forward-only cursor over streamed bytes.
pub struct Reader<'a> {
    buf: &'a [u8],
    at: usize,
}

impl<'a> Reader<'a> {
    /// Cursor at the start of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, at: 0 }
    }

    /// Cursor at an absolute offset into `buf`.
    pub fn at(buf: &'a [u8], offset: usize) -> Self {
        Self { buf, at: offset }
    }

    /// Current offset.
    pub fn offset(&self) -> usize {
        self.at
    }

    /// Unread byte count.
    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.at)
    }

    fn underflow(&self, need: usize) -> RootError {
        RootError::BufferUnderflow { offset: self.at, need, have: self.remaining() }
    }

    /// Borrow the next `n` bytes and advance past them.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.at.checked_add(n).filter(|&end| end <= self.buf.len()).ok_or_else(|| self.underflow(n))?;
        let out = &self.buf[self.at..end];
        self.at = end;
        Ok(out)
    }

    /// Advance by `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(drop)
    }

    be_primitives! {
        /// One byte.
        read_u8 => u8;
        /// Big-endian u16.
        read_u16 => u16;
        /// Big-endian i16.
        read_i16 => i16;
        /// Big-endian u32.
        read_u32 => u32;
        /// Big-endian i32.
        read_i32 => i32;
        /// Big-endian u64.
        read_u64 => u64;
        /// Big-endian f32.
        read_f32 => f32;
        /// Big-endian f64.
        read_f64 => f64;
    }

    /// A file offset, stored as u64 when `wide` and u32 otherwise.
    pub fn read_seek(&mut self, wide: bool) -> Result<u64> {
        if wide { self.read_u64() } else { self.read_u32().map(u64::from) }
    }

    /// A `TString`: a length byte, or 255 then a u32 length, then the bytes.
    pub fn read_string(&mut self) -> Result<String> {
        let len = match self.read_u8()? {
            u8::MAX => self.read_u32()? as usize,
            short => usize::from(short),
        };
        Ok(String::from_utf8_lossy(self.take(len)?).into_owned())
    }

    /// A streamer version header: the class version and, when the header
    /// carries a byte count, the absolute offset just past the object.
    pub fn read_version(&mut self) -> Result<(u16, Option<usize>)> {
        let start = self.at;
        let word = self.read_u32()?;
        if word & BYTE_COUNT_MASK == 0 {
            // bare u16 version, no byte count
            self.at = start + 2;
            return Ok(((word >> 16) as u16, None));
        }
        let end = start + 4 + (word & !BYTE_COUNT_MASK) as usize;
        Ok((self.read_u16()?, Some(end)))
    }

    /// Move to `end` unless the cursor is already past it.
    pub fn seek_forward(&mut self, end: usize) -> Result<()> {
        if end > self.buf.len() {
            return Err(self.underflow(end.saturating_sub(self.at)));
        }
        self.at = self.at.max(end);
        Ok(())
    }

    /// Jump to the optional end offset returned by [`read_version`](Self::read_version).
    pub fn finish(&mut self, end: Option<usize>) -> Result<()> {
        end.map_or(Ok(()), |end| self.seek_forward(end))
    }

    /// Step over a whole streamed object. Objects without a byte count
    /// only lose their version.
    pub fn skip_object(&mut self) -> Result<()> {
        let (_, end) = self.read_version()?;
        self.finish(end)
    }

    /// A `TObject` header, returning its bits.
    pub fn read_tobject(&mut self) -> Result<u32> {
        self.skip(2 + 4)?;
        let bits = self.read_u32()?;
        if bits & IS_REFERENCED != 0 {
            self.skip(2)?;
        }
        Ok(bits)
    }

    /// A `TNamed`, returning name and title.
    pub fn read_tnamed(&mut self) -> Result<(String, String)> {
        let (_, end) = self.read_version()?;
        self.read_tobject()?;
        let named = (self.read_string()?, self.read_string()?);
        self.finish(end)?;
        Ok(named)
    }

    /// `n` doubles.
    pub fn read_f64_vec(&mut self, n: usize) -> Result<Vec<f64>> {
        let raw = self.take(n.checked_mul(8).ok_or_else(|| self.underflow(usize::MAX))?)?;
        Ok(raw
            .chunks_exact(8)
            .map(|c| f64::from_be_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
            .collect())
    }

    /// `n` floats, widened.
    pub fn read_f32_vec(&mut self, n: usize) -> Result<Vec<f64>> {
        let raw = self.take(n.checked_mul(4).ok_or_else(|| self.underflow(usize::MAX))?)?;
        Ok(raw.chunks_exact(4).map(|c| f64::from(f32::from_be_bytes([c[0], c[1], c[2], c[3]]))).collect())
    }
}
