//! Angular matching in (eta, phi) space.
//!
//! Everything here is pure: distances are computed on the fly from the
//! [`Direction`] of each object and nothing is cached between calls.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

/// Distance reported when there is nothing to match against.
pub const MAX_DELTA_R: f64 = 99.0;

/// Anything with a pseudorapidity and an azimuth.
pub trait Direction {
    /// Pseudorapidity.
    fn eta(&self) -> f64;
    /// Azimuthal angle in radians.
    fn phi(&self) -> f64;
}

impl<D: Direction + ?Sized> Direction for &D {
    fn eta(&self) -> f64 {
        (**self).eta()
    }
    fn phi(&self) -> f64 {
        (**self).phi()
    }
}

/// A bare (eta, phi) point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EtaPhi {
    /// Pseudorapidity.
    pub eta: f64,
    /// Azimuth.
    pub phi: f64,
}

impl EtaPhi {
    /// Create a point.
    pub fn new(eta: f64, phi: f64) -> Self {
        Self { eta, phi }
    }
}

impl Direction for EtaPhi {
    fn eta(&self) -> f64 {
        self.eta
    }
    fn phi(&self) -> f64 {
        self.phi
    }
}

/// Ordered veto points plus the coarsest resolution they were built with.
///
/// `min_delta_r` raises the threshold of every [`is_fiducial`] query made
/// against this list, so a caller cannot ask for a finer veto than the list
/// can support.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EtaPhiList {
    points: Vec<EtaPhi>,
    min_delta_r: f64,
}

impl EtaPhiList {
    /// Empty list with the given resolution. Negative or NaN values are rejected.
    pub fn new(min_delta_r: f64) -> Result<Self> {
        if min_delta_r.is_nan() || min_delta_r < 0.0 {
            return Err(Error::Validation(format!(
                "EtaPhiList min_delta_r must be >= 0, got {min_delta_r}"
            )));
        }
        Ok(Self { points: Vec::new(), min_delta_r })
    }

    /// Build a list from the directions of an upstream collection.
    pub fn from_candidates<'a, D, I>(candidates: I, min_delta_r: f64) -> Result<Self>
    where
        D: Direction + 'a,
        I: IntoIterator<Item = &'a D>,
    {
        let mut list = Self::new(min_delta_r)?;
        list.points.extend(candidates.into_iter().map(|c| EtaPhi::new(c.eta(), c.phi())));
        Ok(list)
    }

    /// Append a point.
    pub fn push(&mut self, point: EtaPhi) {
        self.points.push(point);
    }

    /// Resolution floor of this list.
    pub fn min_delta_r(&self) -> f64 {
        self.min_delta_r
    }

    /// Points in insertion order.
    pub fn points(&self) -> &[EtaPhi] {
        &self.points
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// `true` when the list holds no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Azimuthal difference `phi1 - phi2` wrapped into `(-π, π]`.
///
/// In-range differences are returned untouched, so swapping the arguments
/// only flips the sign.
pub fn delta_phi(phi1: f64, phi2: f64) -> f64 {
    let d = phi1 - phi2;
    if d > -PI && d <= PI {
        return d;
    }
    let wrapped = d - TAU * (d / TAU).round();
    if wrapped <= -PI {
        wrapped + TAU
    } else if wrapped > PI {
        wrapped - TAU
    } else {
        wrapped
    }
}

/// `sqrt(Δη² + Δφ²)` with the azimuthal difference wrapped.
pub fn delta_r(eta1: f64, phi1: f64, eta2: f64, phi2: f64) -> f64 {
    let deta = eta1 - eta2;
    let dphi = delta_phi(phi1, phi2);
    deta.hypot(dphi)
}

/// [`delta_r`] between two directions.
pub fn delta_r_between<A: Direction + ?Sized, B: Direction + ?Sized>(a: &A, b: &B) -> f64 {
    delta_r(a.eta(), a.phi(), b.eta(), b.phi())
}

/// `false` as soon as any veto point lies strictly closer than
/// `max(min_delta_r, veto.min_delta_r())`. An empty list never vetoes.
pub fn is_fiducial<D: Direction + ?Sized>(point: &D, veto: &EtaPhiList, min_delta_r: f64) -> bool {
    let threshold = min_delta_r.max(veto.min_delta_r);
    !veto.points.iter().any(|v| delta_r_between(point, v) < threshold)
}

/// Index and distance of a matched candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    /// Position in the candidate slice.
    pub index: usize,
    /// Angular distance to the reference.
    pub delta_r: f64,
}

/// Nearest candidate to `reference`.
///
/// When `max_delta_r >= 0`, candidates farther than it are ignored; a negative
/// value disables the cut. Ties keep the earliest candidate.
pub fn find_nearest<C: Direction, R: Direction + ?Sized>(
    candidates: &[C],
    reference: &R,
    max_delta_r: f64,
) -> Option<Match> {
    let mut best: Option<Match> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        let dr = delta_r_between(candidate, reference);
        if max_delta_r >= 0.0 && dr > max_delta_r {
            continue;
        }
        if best.is_none_or(|b| dr < b.delta_r) {
            best = Some(Match { index, delta_r: dr });
        }
    }
    best
}

/// Smallest distance from `reference` to any candidate, without a cut.
pub fn min_delta_r_to<C: Direction, R: Direction + ?Sized>(candidates: &[C], reference: &R) -> Option<f64> {
    find_nearest(candidates, reference, -1.0).map(|m| m.delta_r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_delta_phi_wraps() {
        assert_relative_eq!(delta_phi(0.1, -0.1), 0.2, epsilon = 1e-12);
        assert_relative_eq!(delta_phi(3.0, -3.0), 6.0 - TAU, epsilon = 1e-12);
        assert_relative_eq!(delta_phi(-3.0, 3.0), TAU - 6.0, epsilon = 1e-12);
        assert_relative_eq!(delta_phi(PI, 0.0), PI, epsilon = 1e-12);
        assert!(delta_phi(0.0, PI) > 0.0, "-π maps to +π");
    }

    #[test]
    fn test_delta_r_periodic_in_phi() {
        for &phi in &[-3.0, -1.0, 0.0, 0.5, 3.1] {
            assert_relative_eq!(delta_r(0.7, phi, 0.7, phi + TAU), 0.0, epsilon = 1e-12);
        }
        assert_relative_eq!(delta_r(0.0, 0.0, 0.3, 0.4), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_delta_r_is_symmetric() {
        let pairs = [
            (0.1, 0.3),
            (0.3, 0.1),
            (-0.7, 0.2),
            (3.0, -3.0),
            (-3.1, 3.1),
            (PI, -PI),
            (0.0, PI),
            (2.5, -2.9),
            (10.0, -4.0),
        ];
        for (a, b) in pairs {
            assert_eq!(delta_r(0.4, a, -0.2, b), delta_r(-0.2, b, 0.4, a), "phi {a} vs {b}");
            assert_eq!(delta_phi(a, b).abs(), delta_phi(b, a).abs(), "phi {a} vs {b}");
        }
        assert_eq!(delta_r(0.0, 0.1, 0.0, 0.3), delta_r(0.0, 0.3, 0.0, 0.1));
    }

    #[test]
    fn test_find_nearest_mirrored_phi_tie() {
        let cands = [EtaPhi::new(0.0, -0.2), EtaPhi::new(0.0, 0.2)];
        let m = find_nearest(&cands, &EtaPhi::new(0.0, 0.0), -1.0).unwrap();
        assert_eq!(m.index, 0);
        assert_eq!(m.delta_r, 0.2);
    }

    #[test]
    fn test_eta_phi_list_rejects_bad_resolution() {
        assert!(EtaPhiList::new(-0.1).is_err());
        assert!(EtaPhiList::new(f64::NAN).is_err());
        assert!(EtaPhiList::new(0.0).unwrap().is_empty());
    }

    #[test]
    fn test_is_fiducial() {
        let empty = EtaPhiList::new(0.0).unwrap();
        assert!(is_fiducial(&EtaPhi::new(0.0, 0.0), &empty, 10.0));

        let points = [EtaPhi::new(0.0, 0.0)];
        let veto = EtaPhiList::from_candidates(&points, 0.1).unwrap();
        // strictly inside the list resolution
        assert!(!is_fiducial(&EtaPhi::new(0.05, 0.0), &veto, 0.01));
        // list resolution wins over a finer request
        assert!(!is_fiducial(&EtaPhi::new(0.09, 0.0), &veto, 0.0));
        // a coarser request wins over the list resolution
        assert!(!is_fiducial(&EtaPhi::new(0.3, 0.0), &veto, 0.5));
        assert!(is_fiducial(&EtaPhi::new(0.3, 0.0), &veto, 0.2));
        // exactly at threshold is not a veto
        assert!(is_fiducial(&EtaPhi::new(0.5, 0.0), &veto, 0.5));
    }

    #[test]
    fn test_find_nearest() {
        let cands = [EtaPhi::new(1.0, 0.0), EtaPhi::new(0.2, 0.0), EtaPhi::new(-0.2, 0.0)];
        let origin = EtaPhi::new(0.0, 0.0);

        let m = find_nearest(&cands, &origin, -1.0).unwrap();
        assert_eq!(m.index, 1, "earliest of the tied minima");
        assert_relative_eq!(m.delta_r, 0.2, epsilon = 1e-12);

        assert!(find_nearest(&cands, &origin, 0.1).is_none());
        assert_eq!(find_nearest(&cands, &EtaPhi::new(0.9, 0.0), 0.15).map(|m| m.index), Some(0));
        assert!(find_nearest::<EtaPhi, _>(&[], &origin, -1.0).is_none());
    }

    #[test]
    fn test_min_delta_r_to() {
        let cands = [EtaPhi::new(0.0, 3.0), EtaPhi::new(0.0, -3.0)];
        let dr = min_delta_r_to(&cands, &EtaPhi::new(0.0, PI)).unwrap();
        assert_relative_eq!(dr, PI - 3.0, epsilon = 1e-12);
        assert!(min_delta_r_to::<EtaPhi, _>(&[], &EtaPhi::new(0.0, 0.0)).is_none());
    }
}
