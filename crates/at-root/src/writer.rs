//! Minimal ROOT writer for 1D histograms.
//!
//! Produces small, uncompressed files that [`RootFile`](crate::RootFile) (and
//! ROOT itself) can read back: a file header, a top-level directory, optional
//! nested `TDirectoryFile`s and one `TH1D` record per histogram. Used to build
//! weight-file fixtures and to export derived correction histograms.

use std::path::Path;

use crate::error::{Result, RootError};
use crate::file::{MIN_FILE_LEN, ROOT_MAGIC};
use crate::histogram::Histogram;
use crate::objects::{TAXIS_VERSION, TH1_VERSION, TH1D_VERSION};
use crate::reader::BYTE_COUNT_MASK;

const FILE_VERSION: u32 = 62_206;
const BEGIN: usize = 100;
const KEY_VERSION: u16 = 4;
const DIRECTORY_VERSION: u16 = 5;
/// Offsets of `fNbytesKeys` and `fSeekKeys` inside a small `TDirectory` streamer.
const DIR_NBYTES_KEYS_OFFSET: usize = 10;
const DIR_SEEK_KEYS_OFFSET: usize = 26;
/// Offset of `fKeylen` inside a key header.
const KEY_LEN_OFFSET: usize = 14;

enum Node {
    Histogram(Histogram),
    Directory(Vec<(String, Node)>),
}

/// Collects histograms and serialises them into a ROOT file.
#[derive(Default)]
pub struct RootFileWriter {
    nodes: Vec<(String, Node)>,
}

impl RootFileWriter {
    /// An empty file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `histogram` at `path` (`"name"` or `"dir/sub/name"`).
    ///
    /// Intermediate directories are created on demand. The stored object
    /// takes the last path component as its name.
    pub fn add_histogram(&mut self, path: &str, histogram: &Histogram) -> Result<&mut Self> {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let Some((leaf, dirs)) = parts.split_last() else {
            return Err(RootError::InvalidPath(path.to_string()));
        };

        let mut level = &mut self.nodes;
        for dir in dirs {
            let idx = match level.iter().position(|(n, _)| n == dir) {
                Some(idx) => idx,
                None => {
                    level.push((dir.to_string(), Node::Directory(Vec::new())));
                    level.len() - 1
                }
            };
            level = match &mut level[idx].1 {
                Node::Directory(children) => children,
                Node::Histogram(_) => {
                    return Err(RootError::InvalidPath(format!("'{dir}' in '{path}' is a histogram")));
                }
            };
        }
        if level.iter().any(|(n, _)| n == leaf) {
            return Err(RootError::InvalidPath(format!("'{path}' already exists")));
        }

        let mut histogram = histogram.clone();
        histogram.name = leaf.to_string();
        level.push((leaf.to_string(), Node::Histogram(histogram)));
        Ok(self)
    }

    /// Serialise into ROOT file bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = WBuffer::default();

        // File header, patched once the layout is known.
        w.bytes(ROOT_MAGIC);
        w.u32(FILE_VERSION);
        w.u32(BEGIN as u32);
        let end_at = w.placeholder_u32(); // fEND
        w.u32(0); // fSeekFree
        w.u32(0); // fNbytesFree
        w.u32(0); // nfree
        let nbytes_name_at = w.placeholder_u32();
        w.u8(4); // fUnits
        w.u32(0); // fCompress
        w.u32(0); // fSeekInfo
        w.u32(0); // fNbytesInfo
        w.bytes(&[0u8; 18]); // fUUID
        w.pad_to(BEGIN);

        // Name record: a TKey for the file followed by its TNamed strings.
        let name_start = w.len();
        w.key_header(0, 0, 1, BEGIN as u32, 0, "TFile", "weights.root", "");
        w.string("weights.root");
        w.string("");
        let nbytes_name = (w.len() - name_start) as u32;
        w.patch_u32(nbytes_name_at, nbytes_name);
        let name_key_len = w.read_u16_at(name_start + KEY_LEN_OFFSET) as u32;
        w.patch_u32(name_start, nbytes_name);
        w.patch_u32(name_start + 6, nbytes_name - name_key_len);

        let top_dir = w.len();
        w.directory_streamer(nbytes_name, BEGIN as u32, 0);
        let (seek_keys, nbytes_keys) = write_directory(&mut w, &self.nodes, BEGIN as u32, "weights.root");
        w.patch_u32(top_dir + DIR_NBYTES_KEYS_OFFSET, nbytes_keys);
        w.patch_u32(top_dir + DIR_SEEK_KEYS_OFFSET, seek_keys);

        if w.len() < MIN_FILE_LEN {
            w.pad_to(MIN_FILE_LEN);
        }
        let end = w.len() as u32;
        w.patch_u32(end_at, end);
        w.buf
    }

    /// Serialise and write to `path`.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_bytes())?;
        Ok(())
    }
}

/// Write the records of one directory followed by its key list.
///
/// Returns `(seek_keys, nbytes_keys)` of the key list.
fn write_directory(w: &mut WBuffer, nodes: &[(String, Node)], dir_seek: u32, dir_name: &str) -> (u32, u32) {
    let mut headers: Vec<Vec<u8>> = Vec::with_capacity(nodes.len());

    for (name, node) in nodes {
        match node {
            Node::Histogram(h) => {
                let payload = th1d_payload(h);
                let start = w.len() as u32;
                let header = key_header_bytes(payload.len() as u32, 1, start, dir_seek, "TH1D", name, &h.title);
                w.bytes(&header);
                w.bytes(&payload);
                headers.push(header);
            }
            Node::Directory(children) => {
                let start = w.len() as u32;
                let mut streamer = WBuffer::default();
                streamer.directory_streamer(0, start, dir_seek);
                let payload_len = streamer.len() as u32;
                let header = key_header_bytes(payload_len, 1, start, dir_seek, "TDirectoryFile", name, name);
                let payload_at = w.len() + header.len();
                w.bytes(&header);
                w.bytes(&streamer.buf);

                let (seek_keys, nbytes_keys) = write_directory(w, children, start, name);
                w.patch_u32(payload_at + DIR_NBYTES_KEYS_OFFSET, nbytes_keys);
                w.patch_u32(payload_at + DIR_SEEK_KEYS_OFFSET, seek_keys);
                headers.push(header);
            }
        }
    }

    let seek_keys = w.len() as u32;
    let body_len = 4 + headers.iter().map(Vec::len).sum::<usize>() as u32;
    let list_header = key_header_bytes(body_len, 1, seek_keys, dir_seek, "TDirectory", dir_name, "");
    w.bytes(&list_header);
    w.u32(headers.len() as u32);
    for header in &headers {
        w.bytes(header);
    }
    (seek_keys, w.len() as u32 - seek_keys)
}

fn key_header_bytes(
    obj_len: u32,
    cycle: u16,
    seek_key: u32,
    seek_pdir: u32,
    class_name: &str,
    name: &str,
    title: &str,
) -> Vec<u8> {
    let mut w = WBuffer::default();
    w.key_header(obj_len, obj_len, cycle, seek_key, seek_pdir, class_name, name, title);
    let key_len = w.len() as u32;
    w.patch_u32(0, key_len + obj_len);
    w.buf
}

fn th1d_payload(h: &Histogram) -> Vec<u8> {
    let n_cells = h.n_bins + 2;
    let cells: Vec<f64> = (0..n_cells).map(|bin| h.content(bin)).collect();
    let sumw2: Option<Vec<f64>> =
        h.sumw2.as_ref().map(|_| (0..n_cells).map(|bin| h.error_squared(bin)).collect());

    let mut w = WBuffer::default();
    w.versioned(TH1D_VERSION, |w| {
        w.versioned(TH1_VERSION, |w| {
            w.tnamed(&h.name, &h.title);
            w.versioned(2, |w| {
                w.i16(602);
                w.i16(1);
                w.i16(1);
            }); // TAttLine
            w.versioned(2, |w| {
                w.i16(0);
                w.i16(1001);
            }); // TAttFill
            w.versioned(2, |w| {
                w.i16(1);
                w.i16(1);
                w.f32(1.0);
            }); // TAttMarker
            w.i32(n_cells as i32);
            w.taxis("xaxis", h.n_bins, h.x_min, h.x_max, variable_edges(h));
            w.taxis("yaxis", 1, 0.0, 1.0, None);
            w.taxis("zaxis", 1, 0.0, 1.0, None);
            w.i16(0); // fBarOffset
            w.i16(1000); // fBarWidth
            w.f64(h.entries);
            w.f64(h.integral()); // fTsumw
            w.f64(sumw2.as_ref().map_or(h.integral(), |s| s[1..=h.n_bins].iter().sum())); // fTsumw2
            w.f64(0.0); // fTsumwx
            w.f64(0.0); // fTsumwx2
            w.f64(-1111.0); // fMaximum
            w.f64(-1111.0); // fMinimum
            w.f64(0.0); // fNormFactor
            w.u32(0); // fContour
            match &sumw2 {
                Some(s) => w.array_f64(s),
                None => w.u32(0),
            }
            w.string(""); // fOption
            w.versioned(5, |w| {
                w.tobject();
                w.string("");
                w.i32(0);
            }); // fFunctions
            w.i32(0); // fBufferSize
            w.i32(0); // fBinStatErrOpt
            w.i32(2); // fStatOverflows
        });
        w.array_f64(&cells);
    });
    w.buf
}

fn variable_edges(h: &Histogram) -> Option<&[f64]> {
    let width = (h.x_max - h.x_min) / h.n_bins as f64;
    let tolerance = 1e-12 * (h.x_max - h.x_min).abs().max(1.0);
    let uniform = h
        .bin_edges
        .iter()
        .enumerate()
        .all(|(i, &edge)| (edge - (h.x_min + i as f64 * width)).abs() <= tolerance);
    if uniform { None } else { Some(h.bin_edges.as_slice()) }
}

/// Big-endian write buffer mirroring [`Reader`](crate::reader::Reader).
#[derive(Default)]
struct WBuffer {
    buf: Vec<u8>,
}

impl WBuffer {
    fn len(&self) -> usize {
        self.buf.len()
    }

    fn bytes(&mut self, b: &[u8]) {
        self.buf.extend_from_slice(b);
    }

    fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn u16(&mut self, v: u16) {
        self.bytes(&v.to_be_bytes());
    }

    fn i16(&mut self, v: i16) {
        self.bytes(&v.to_be_bytes());
    }

    fn u32(&mut self, v: u32) {
        self.bytes(&v.to_be_bytes());
    }

    fn i32(&mut self, v: i32) {
        self.bytes(&v.to_be_bytes());
    }

    fn f32(&mut self, v: f32) {
        self.bytes(&v.to_be_bytes());
    }

    fn f64(&mut self, v: f64) {
        self.bytes(&v.to_be_bytes());
    }

    fn array_f64(&mut self, values: &[f64]) {
        self.u32(values.len() as u32);
        for &v in values {
            self.f64(v);
        }
    }

    fn string(&mut self, s: &str) {
        if s.len() < 255 {
            self.u8(s.len() as u8);
        } else {
            self.u8(255);
            self.u32(s.len() as u32);
        }
        self.bytes(s.as_bytes());
    }

    fn placeholder_u32(&mut self) -> usize {
        let at = self.len();
        self.u32(0);
        at
    }

    fn patch_u32(&mut self, at: usize, v: u32) {
        self.buf[at..at + 4].copy_from_slice(&v.to_be_bytes());
    }

    fn read_u16_at(&self, at: usize) -> u16 {
        u16::from_be_bytes([self.buf[at], self.buf[at + 1]])
    }

    fn pad_to(&mut self, len: usize) {
        if self.buf.len() < len {
            self.buf.resize(len, 0);
        }
    }

    /// Write `body` behind a byte-counted version header.
    fn versioned(&mut self, version: u16, body: impl FnOnce(&mut Self)) {
        let start = self.placeholder_u32();
        self.u16(version);
        body(self);
        let count = (self.len() - start - 4) as u32;
        self.patch_u32(start, BYTE_COUNT_MASK | count);
    }

    fn tobject(&mut self) {
        self.u16(1);
        self.u32(0); // fUniqueID
        self.u32(0x0300_0000); // kNotDeleted | kIsOnHeap
    }

    fn tnamed(&mut self, name: &str, title: &str) {
        self.versioned(1, |w| {
            w.tobject();
            w.string(name);
            w.string(title);
        });
    }

    fn taxis(&mut self, name: &str, n_bins: usize, x_min: f64, x_max: f64, edges: Option<&[f64]>) {
        self.versioned(TAXIS_VERSION, |w| {
            w.tnamed(name, "");
            w.versioned(4, |w| {
                w.i32(510); // fNdivisions
                w.i16(1); // fAxisColor
                w.i16(1); // fLabelColor
                w.i16(42); // fLabelFont
                w.f32(0.005); // fLabelOffset
                w.f32(0.035); // fLabelSize
                w.f32(0.03); // fTickLength
                w.f32(1.0); // fTitleOffset
                w.f32(0.035); // fTitleSize
                w.i16(1); // fTitleColor
                w.i16(42); // fTitleFont
            }); // TAttAxis
            w.i32(n_bins as i32);
            w.f64(x_min);
            w.f64(x_max);
            match edges {
                Some(e) => w.array_f64(e),
                None => w.u32(0),
            }
            w.i32(0); // fFirst
            w.i32(0); // fLast
            w.u16(0); // fBits2
            w.u8(0); // fTimeDisplay
            w.string(""); // fTimeFormat
            w.u32(0); // fLabels (null)
            w.u32(0); // fModLabs (null)
        });
    }

    fn directory_streamer(&mut self, nbytes_name: u32, seek_dir: u32, seek_parent: u32) {
        self.u16(DIRECTORY_VERSION);
        self.u32(0); // fDatimeC
        self.u32(0); // fDatimeM
        self.u32(0); // fNbytesKeys, patched
        self.u32(nbytes_name);
        self.u32(seek_dir);
        self.u32(seek_parent);
        self.u32(0); // fSeekKeys, patched
        self.u16(1); // UUID version
        self.bytes(&[0u8; 16]);
    }

    #[allow(clippy::too_many_arguments)]
    fn key_header(
        &mut self,
        n_bytes: u32,
        obj_len: u32,
        cycle: u16,
        seek_key: u32,
        seek_pdir: u32,
        class_name: &str,
        name: &str,
        title: &str,
    ) {
        let start = self.len();
        self.u32(n_bytes);
        self.u16(KEY_VERSION);
        self.u32(obj_len);
        self.u32(0); // fDatime
        self.u16(0); // fKeylen, patched below
        self.u16(cycle);
        self.u32(seek_key);
        self.u32(seek_pdir);
        self.string(class_name);
        self.string(name);
        self.string(title);
        let key_len = (self.len() - start) as u16;
        let at = start + KEY_LEN_OFFSET;
        self.buf[at..at + 2].copy_from_slice(&key_len.to_be_bytes());
    }
}
