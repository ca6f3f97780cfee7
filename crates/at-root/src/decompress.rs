//! Inflating ROOT compressed object payloads.
//!
//! A compressed payload is a sequence of blocks, each with a 9-byte header:
//! ```text
//! bytes 0-1:  algorithm ("ZL" zlib, "L4" LZ4, "ZS" ZSTD, "XZ" LZMA)
//! byte  2:    method
//! bytes 3-5:  compressed size   (little-endian u24)
//! bytes 6-8:  uncompressed size (little-endian u24)
//! ```

use std::io::Read;

use crate::error::{Result, RootError};

const BLOCK_HEADER_LEN: usize = 9;

#[derive(Debug, Clone, Copy)]
enum Codec {
    Zlib,
    Lz4,
    Zstd,
    Xz,
}

impl Codec {
    fn from_tag(tag: &[u8]) -> Result<Self> {
        match tag {
            b"ZL" => Ok(Codec::Zlib),
            b"L4" => Ok(Codec::Lz4),
            b"ZS" => Ok(Codec::Zstd),
            b"XZ" => Ok(Codec::Xz),
            other => Err(RootError::Decompression(format!(
                "unknown compression tag {:?}",
                String::from_utf8_lossy(other)
            ))),
        }
    }

    fn inflate(self, block: &[u8], len: usize) -> Result<Vec<u8>> {
        let fail = |e: &dyn std::fmt::Display| RootError::Decompression(format!("{self:?}: {e}"));
        let mut out = Vec::with_capacity(len);
        match self {
            Codec::Zlib => {
                flate2::read::ZlibDecoder::new(block).read_to_end(&mut out).map_err(|e| fail(&e))?;
            }
            Codec::Lz4 => {
                // 8-byte xxhash64 checksum ahead of the stream, not verified
                let stream = block.get(8..).ok_or_else(|| fail(&"block shorter than its checksum"))?;
                out = lz4_flex::decompress(stream, len).map_err(|e| fail(&e))?;
            }
            Codec::Zstd => {
                ruzstd::decoding::StreamingDecoder::new(block)
                    .map_err(|e| fail(&e))?
                    .read_to_end(&mut out)
                    .map_err(|e| fail(&e))?;
            }
            Codec::Xz => {
                lzma_rs::xz_decompress(&mut std::io::BufReader::new(block), &mut out).map_err(|e| fail(&e))?;
            }
        }
        Ok(out)
    }
}

fn le24(b: &[u8]) -> usize {
    b.iter().take(3).rev().fold(0, |acc, &byte| (acc << 8) | usize::from(byte))
}

/// Inflate the block sequence in `src` into exactly `expected_len` bytes.
pub fn decompress(src: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected_len);
    let mut rest = src;

    while out.len() < expected_len && rest.len() >= BLOCK_HEADER_LEN {
        let (header, tail) = rest.split_at(BLOCK_HEADER_LEN);
        let stored = le24(&header[3..6]);
        let inflated_len = le24(&header[6..9]);
        if tail.len() < stored {
            return Err(RootError::Decompression(format!(
                "block claims {stored} compressed bytes, {} remain",
                tail.len()
            )));
        }
        let (block, next) = tail.split_at(stored);

        let inflated = Codec::from_tag(&header[..2])?.inflate(block, inflated_len)?;
        if inflated.len() != inflated_len {
            return Err(RootError::Decompression(format!(
                "block inflated to {} bytes, header says {inflated_len}",
                inflated.len()
            )));
        }
        out.extend_from_slice(&inflated);
        rest = next;
    }

    if out.len() != expected_len {
        return Err(RootError::Decompression(format!(
            "payload inflated to {} bytes, key says {expected_len}",
            out.len()
        )));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root_block(tag: &[u8; 2], method: u8, compressed: &[u8], u_len: usize) -> Vec<u8> {
        let mut block = Vec::with_capacity(BLOCK_HEADER_LEN + compressed.len());
        block.extend_from_slice(tag);
        block.push(method);
        block.extend_from_slice(&(compressed.len() as u32).to_le_bytes()[..3]);
        block.extend_from_slice(&(u_len as u32).to_le_bytes()[..3]);
        block.extend_from_slice(compressed);
        block
    }

    const PAYLOAD: &[u8] = b"isrWeight isrWeight isrWeight isrWeight 0.9 0.8 0.9 0.8";

    #[test]
    fn sizes_are_little_endian_u24() {
        assert_eq!(le24(&[0x10, 0x00, 0x00]), 16);
        assert_eq!(le24(&[0x00, 0x01, 0x00]), 256);
        assert_eq!(le24(&[0xff, 0xff, 0xff]), 0xFF_FFFF);
    }

    #[test]
    fn zlib_block() {
        use flate2::Compression;
        use flate2::write::ZlibEncoder;
        use std::io::Write;

        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(PAYLOAD).unwrap();
        let block = root_block(b"ZL", 8, &enc.finish().unwrap(), PAYLOAD.len());
        assert_eq!(decompress(&block, PAYLOAD.len()).unwrap(), PAYLOAD);
    }

    #[test]
    fn lz4_block_skips_checksum() {
        let mut compressed = vec![0u8; 8];
        compressed.extend_from_slice(&lz4_flex::compress(PAYLOAD));
        let block = root_block(b"L4", 4, &compressed, PAYLOAD.len());
        assert_eq!(decompress(&block, PAYLOAD.len()).unwrap(), PAYLOAD);
    }

    #[test]
    fn zstd_block() {
        let compressed = ruzstd::encoding::compress_to_vec(
            PAYLOAD,
            ruzstd::encoding::CompressionLevel::Fastest,
        );
        let block = root_block(b"ZS", 5, &compressed, PAYLOAD.len());
        assert_eq!(decompress(&block, PAYLOAD.len()).unwrap(), PAYLOAD);
    }

    #[test]
    fn xz_block() {
        let mut compressed = Vec::new();
        lzma_rs::xz_compress(&mut std::io::BufReader::new(PAYLOAD), &mut compressed).unwrap();
        let block = root_block(b"XZ", 7, &compressed, PAYLOAD.len());
        assert_eq!(decompress(&block, PAYLOAD.len()).unwrap(), PAYLOAD);
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let block = root_block(b"QQ", 0, b"abc", 3);
        assert!(matches!(decompress(&block, 3), Err(RootError::Decompression(_))));
    }

    #[test]
    fn truncated_block_is_rejected() {
        let mut block = root_block(b"ZL", 8, b"abcdef", 6);
        block.truncate(BLOCK_HEADER_LEN + 2);
        assert!(matches!(decompress(&block, 6), Err(RootError::Decompression(_))));
    }
}
