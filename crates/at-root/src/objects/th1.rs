//! `TH1D` / `TH1F` streamer decoding.
//!
//! Layout consumed here:
//! ```text
//! TH1D | TH1F            version header
//!   TH1                  version header
//!     TNamed             fName, fTitle
//!     TAttLine/Fill/Marker   skipped by byte count
//!     fNcells            i32
//!     fXaxis             TAxis (fNbins, fXmin, fXmax, fXbins)
//!     fYaxis, fZaxis     skipped by byte count
//!     fBarOffset, fBarWidth, fEntries, fTsumw, fTsumw2, fTsumwx, fTsumwx2
//!     fMaximum, fMinimum (v >= 2), fNormFactor (v >= 3)
//!     fContour           TArrayD
//!     fSumw2             TArrayD
//!     fOption            TString
//!     fFunctions         TList, skipped by byte count
//!     fBufferSize (v >= 4), fBinStatErrOpt (v >= 7), fStatOverflows (v >= 8)
//!   TArrayD | TArrayF    fNcells bin contents, under/overflow included
//! ```

use crate::error::{Result, RootError};
use crate::histogram::Histogram;
use crate::reader::Reader;

/// `TH1D`/`TH1F` class version written by [`RootFileWriter`](crate::RootFileWriter).
pub(crate) const TH1D_VERSION: u16 = 3;
/// `TH1` class version written by [`RootFileWriter`](crate::RootFileWriter).
pub(crate) const TH1_VERSION: u16 = 8;
/// `TAxis` class version written by [`RootFileWriter`](crate::RootFileWriter).
pub(crate) const TAXIS_VERSION: u16 = 10;

#[derive(Clone, Copy)]
pub(crate) enum BinStorage {
    F32,
    F64,
}

struct Axis {
    n_bins: usize,
    x_min: f64,
    x_max: f64,
    edges: Vec<f64>,
}

struct Th1Base {
    name: String,
    title: String,
    n_cells: usize,
    axis: Axis,
    entries: f64,
    sumw2: Vec<f64>,
}

pub(crate) fn read_th1(data: &[u8], storage: BinStorage) -> Result<Histogram> {
    let mut r = Reader::new(data);

    let (version, _end) = r.read_version()?;
    if version < 1 {
        return Err(RootError::Deserialization(format!("unsupported TH1 subclass version {version}")));
    }

    let base = read_th1_base(&mut r)?;

    let n = r.read_u32()? as usize;
    if n != base.n_cells {
        return Err(RootError::Deserialization(format!(
            "'{}': bin array has {} cells, fNcells is {}",
            base.name, n, base.n_cells
        )));
    }
    let cells = match storage {
        BinStorage::F64 => r.read_f64_vec(n)?,
        BinStorage::F32 => r.read_f32_vec(n)?,
    };

    assemble(base, cells)
}

fn read_th1_base(r: &mut Reader) -> Result<Th1Base> {
    let (version, end) = r.read_version()?;

    let (name, title) = r.read_tnamed()?;
    r.skip_object()?; // TAttLine
    r.skip_object()?; // TAttFill
    r.skip_object()?; // TAttMarker

    let n_cells = r.read_i32()?;
    if n_cells < 2 {
        return Err(RootError::Deserialization(format!("'{name}': fNcells = {n_cells}")));
    }

    let axis = read_taxis(r)?;
    r.skip_object()?; // fYaxis
    r.skip_object()?; // fZaxis

    let _bar_offset = r.read_i16()?;
    let _bar_width = r.read_i16()?;
    let entries = r.read_f64()?;
    r.skip(4 * 8)?; // fTsumw, fTsumw2, fTsumwx, fTsumwx2
    if version >= 2 {
        r.skip(2 * 8)?; // fMaximum, fMinimum
    }
    if version >= 3 {
        r.skip(8)?; // fNormFactor
    }

    let n_contour = r.read_u32()? as usize;
    r.skip(n_contour * 8)?;

    let n_sumw2 = r.read_u32()? as usize;
    let sumw2 = r.read_f64_vec(n_sumw2)?;

    let _option = r.read_string()?;
    r.skip_object()?; // fFunctions

    if version >= 4 {
        let buffer_size = r.read_i32()?;
        if buffer_size > 0 {
            r.skip(buffer_size as usize * 8)?;
        }
    }
    if version >= 7 {
        let _bin_stat_err_opt = r.read_i32()?;
    }
    if version >= 8 {
        let _stat_overflows = r.read_i32()?;
    }

    r.finish(end)?;

    Ok(Th1Base { name, title, n_cells: n_cells as usize, axis, entries, sumw2 })
}

fn read_taxis(r: &mut Reader) -> Result<Axis> {
    let (_version, end) = r.read_version()?;
    let _ = r.read_tnamed()?;
    r.skip_object()?; // TAttAxis

    let n_bins = r.read_i32()?;
    if n_bins < 1 {
        return Err(RootError::Deserialization(format!("axis with {n_bins} bins")));
    }
    let x_min = r.read_f64()?;
    let x_max = r.read_f64()?;
    let n_edges = r.read_u32()? as usize;
    let edges = r.read_f64_vec(n_edges)?;

    r.finish(end)?;
    Ok(Axis { n_bins: n_bins as usize, x_min, x_max, edges })
}

fn assemble(base: Th1Base, cells: Vec<f64>) -> Result<Histogram> {
    let Th1Base { name, title, n_cells, axis, entries, sumw2 } = base;
    let n = axis.n_bins;
    if n_cells != n + 2 {
        return Err(RootError::Deserialization(format!(
            "'{name}': fNcells {n_cells} does not match {n} bins plus flows"
        )));
    }

    let bin_edges = if axis.edges.is_empty() {
        let width = (axis.x_max - axis.x_min) / n as f64;
        (0..=n).map(|i| axis.x_min + i as f64 * width).collect()
    } else if axis.edges.len() == n + 1 {
        axis.edges
    } else {
        return Err(RootError::Deserialization(format!(
            "'{name}': {} variable edges for {n} bins",
            axis.edges.len()
        )));
    };

    let (sumw2, flow_sumw2) = if sumw2.len() == n_cells {
        (Some(sumw2[1..=n].to_vec()), Some((sumw2[0], sumw2[n + 1])))
    } else {
        (None, None)
    };

    Ok(Histogram {
        name,
        title,
        n_bins: n,
        x_min: axis.x_min,
        x_max: axis.x_max,
        bin_edges,
        bin_content: cells[1..=n].to_vec(),
        sumw2,
        underflow: cells[0],
        overflow: cells[n + 1],
        flow_sumw2,
        entries,
    })
}
