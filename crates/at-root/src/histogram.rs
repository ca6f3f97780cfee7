//! Owned 1D histogram with ROOT bin numbering.
//!
//! Bins are addressed the way `TH1` addresses them: bin `0` is the underflow,
//! bins `1..=n_bins` are the regular bins and `n_bins + 1` is the overflow.

use std::cmp::Ordering;

use crate::error::{Result, RootError};

/// A 1D histogram read from (or destined for) a ROOT file.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// Histogram name.
    pub name: String,
    /// Histogram title.
    pub title: String,
    /// Number of regular bins.
    pub n_bins: usize,
    /// Lower edge of the first bin.
    pub x_min: f64,
    /// Upper edge of the last bin.
    pub x_max: f64,
    /// Bin edges (length `n_bins + 1`).
    pub bin_edges: Vec<f64>,
    /// Regular bin contents (length `n_bins`).
    pub bin_content: Vec<f64>,
    /// Per-bin sum of squared weights, when stored (length `n_bins`).
    pub sumw2: Option<Vec<f64>>,
    /// Underflow content.
    pub underflow: f64,
    /// Overflow content.
    pub overflow: f64,
    /// Underflow / overflow sum of squared weights, when stored.
    pub flow_sumw2: Option<(f64, f64)>,
    /// Number of entries.
    pub entries: f64,
}

impl Histogram {
    /// An empty histogram with `n_bins` equal-width bins over `[x_min, x_max)`.
    pub fn uniform(name: impl Into<String>, n_bins: usize, x_min: f64, x_max: f64) -> Result<Self> {
        let width = (x_max - x_min) / n_bins as f64;
        let bin_edges = (0..=n_bins).map(|i| x_min + i as f64 * width).collect();
        Self::with_edges(name, bin_edges)
    }

    /// An empty histogram with explicit (strictly increasing) bin edges.
    pub fn with_edges(name: impl Into<String>, bin_edges: Vec<f64>) -> Result<Self> {
        if bin_edges.len() < 2 {
            return Err(RootError::HistogramMismatch(
                "a histogram needs at least two bin edges".into(),
            ));
        }
        if bin_edges.windows(2).any(|w| w[0].partial_cmp(&w[1]) != Some(Ordering::Less)) {
            return Err(RootError::HistogramMismatch(
                "bin edges must be strictly increasing".into(),
            ));
        }
        let n_bins = bin_edges.len() - 1;
        let name = name.into();
        Ok(Self {
            title: name.clone(),
            name,
            n_bins,
            x_min: bin_edges[0],
            x_max: bin_edges[n_bins],
            bin_edges,
            bin_content: vec![0.0; n_bins],
            sumw2: None,
            underflow: 0.0,
            overflow: 0.0,
            flow_sumw2: None,
            entries: 0.0,
        })
    }

    /// The bin containing `x` (`TH1::FindBin`).
    ///
    /// Values below the first edge map to 0, values at or above the last edge
    /// to `n_bins + 1`. Each bin includes its lower edge.
    pub fn find_bin(&self, x: f64) -> usize {
        if x < self.x_min {
            0
        } else if x >= self.x_max {
            self.n_bins + 1
        } else {
            // Number of edges at or below x; NaN matches none and lands in 0.
            self.bin_edges.partition_point(|&edge| edge <= x)
        }
    }

    /// Content of `bin`; out-of-range bins read as 0.
    pub fn content(&self, bin: usize) -> f64 {
        match bin {
            0 => self.underflow,
            b if b <= self.n_bins => self.bin_content[b - 1],
            b if b == self.n_bins + 1 => self.overflow,
            _ => 0.0,
        }
    }

    /// Overwrite the content of `bin`. Out-of-range bins are ignored.
    pub fn set_content(&mut self, bin: usize, value: f64) {
        match bin {
            0 => self.underflow = value,
            b if b <= self.n_bins => self.bin_content[b - 1] = value,
            b if b == self.n_bins + 1 => self.overflow = value,
            _ => {}
        }
    }

    /// Squared statistical error of `bin`.
    ///
    /// Uses the stored sum of squared weights, or `|content|` (Poisson) when
    /// none is stored.
    pub fn error_squared(&self, bin: usize) -> f64 {
        match (&self.sumw2, self.flow_sumw2) {
            (Some(sw2), Some((under, over))) => match bin {
                0 => under,
                b if b <= self.n_bins => sw2[b - 1],
                b if b == self.n_bins + 1 => over,
                _ => 0.0,
            },
            (Some(sw2), None) if (1..=self.n_bins).contains(&bin) => sw2[bin - 1],
            _ => self.content(bin).abs(),
        }
    }

    /// Statistical error of `bin` (`TH1::GetBinError`).
    pub fn error(&self, bin: usize) -> f64 {
        self.error_squared(bin).sqrt()
    }

    /// Content and error at `x`, clamping anything past the last bin into it.
    ///
    /// Underflow is not clamped: values below the first edge read bin 0.
    pub fn evaluate_clamped(&self, x: f64) -> (f64, f64) {
        let bin = self.find_bin(x).min(self.n_bins);
        (self.content(bin), self.error(bin))
    }

    /// Sum of the regular bin contents (`TH1::Integral()`).
    pub fn integral(&self) -> f64 {
        self.bin_content.iter().sum()
    }

    /// Multiply every cell by `factor` (`TH1::Scale`).
    ///
    /// Squared weights scale by `factor²`; Poisson errors are materialised
    /// first so they scale too.
    pub fn scale(&mut self, factor: f64) {
        if factor != 1.0 {
            self.ensure_sumw2();
        }
        for v in self.bin_content.iter_mut() {
            *v *= factor;
        }
        self.underflow *= factor;
        self.overflow *= factor;

        let f2 = factor * factor;
        if let Some(sw2) = self.sumw2.as_mut() {
            for v in sw2.iter_mut() {
                *v *= f2;
            }
        }
        if let Some((under, over)) = self.flow_sumw2.as_mut() {
            *under *= f2;
            *over *= f2;
        }
    }

    /// Divide cell by cell by `denominator` (`TH1::Divide`).
    ///
    /// Cells with a zero denominator become 0. Errors are propagated as
    /// uncorrelated when either histogram stores squared weights.
    pub fn divide(&mut self, denominator: &Histogram) -> Result<()> {
        if self.n_bins != denominator.n_bins {
            return Err(RootError::HistogramMismatch(format!(
                "cannot divide '{}' ({} bins) by '{}' ({} bins)",
                self.name, self.n_bins, denominator.name, denominator.n_bins
            )));
        }
        let with_errors = self.sumw2.is_some() || denominator.sumw2.is_some();
        if with_errors {
            self.ensure_sumw2();
        }

        let cells = self.n_bins + 2;
        let mut contents = Vec::with_capacity(cells);
        let mut errors = Vec::with_capacity(cells);
        for bin in 0..cells {
            let c1 = self.content(bin);
            let c2 = denominator.content(bin);
            if c2 == 0.0 {
                contents.push(0.0);
                errors.push(0.0);
                continue;
            }
            contents.push(c1 / c2);
            let e1sq = self.error_squared(bin);
            let e2sq = denominator.error_squared(bin);
            errors.push((e1sq * c2 * c2 + e2sq * c1 * c1) / (c2 * c2 * c2 * c2));
        }

        for (bin, value) in contents.into_iter().enumerate() {
            self.set_content(bin, value);
        }
        if with_errors {
            let n = self.n_bins;
            self.sumw2 = Some(errors[1..=n].to_vec());
            self.flow_sumw2 = Some((errors[0], errors[n + 1]));
        }
        Ok(())
    }

    fn ensure_sumw2(&mut self) {
        if self.sumw2.is_none() {
            self.sumw2 = Some(self.bin_content.iter().map(|c| c.abs()).collect());
        }
        if self.flow_sumw2.is_none() {
            self.flow_sumw2 = Some((self.underflow.abs(), self.overflow.abs()));
        }
    }
}
