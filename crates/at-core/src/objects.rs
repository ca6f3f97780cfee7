//! Physics objects read from event snapshots, and the analysis-level wrappers
//! built from them.

use crate::matching::{
    Direction, EtaPhiList, MAX_DELTA_R, delta_r_between, find_nearest, is_fiducial, min_delta_r_to,
};
use crate::Result;
use serde::{Deserialize, Serialize};

/// Pdg id of the muon; gen matching of [`Muon`] is restricted to it.
pub const MUON_PDG_ID: i32 = 13;

/// Default cone used to associate a reconstructed object with a generated one.
pub const DEFAULT_GEN_MATCH_DELTA_R: f64 = 0.1;

/// Kinematics shared by every particle-like object.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Transverse momentum (GeV).
    pub pt: f64,
    /// Pseudorapidity.
    pub eta: f64,
    /// Azimuth.
    pub phi: f64,
    /// Electric charge.
    #[serde(default)]
    pub charge: i32,
    /// Particle-data-group id (signed).
    #[serde(default)]
    pub pdg_id: i32,
}

impl Candidate {
    /// Build from (pt, eta, phi) with zero charge and id.
    pub fn new(pt: f64, eta: f64, phi: f64) -> Self {
        Self { pt, eta, phi, charge: 0, pdg_id: 0 }
    }

    /// x component of the momentum.
    pub fn px(&self) -> f64 {
        self.pt * self.phi.cos()
    }

    /// y component of the momentum.
    pub fn py(&self) -> f64 {
        self.pt * self.phi.sin()
    }

    /// z component of the momentum.
    pub fn pz(&self) -> f64 {
        self.pt * self.eta.sinh()
    }

    /// Momentum magnitude.
    pub fn p(&self) -> f64 {
        self.pt * self.eta.cosh()
    }

    /// Polar angle.
    pub fn theta(&self) -> f64 {
        2.0 * (-self.eta).exp().atan()
    }
}

impl Direction for Candidate {
    fn eta(&self) -> f64 {
        self.eta
    }
    fn phi(&self) -> f64 {
        self.phi
    }
}

/// Generated particle. `mother` indexes into the same collection.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct McParticle {
    /// Kinematics and id.
    #[serde(flatten)]
    pub candidate: Candidate,
    /// Generator status code.
    #[serde(default)]
    pub status: i32,
    /// Index of the (first) mother, if any.
    #[serde(default)]
    pub mother: Option<usize>,
}

impl McParticle {
    /// Build a particle with the given id and mother.
    pub fn new(pdg_id: i32, pt: f64, eta: f64, phi: f64, mother: Option<usize>) -> Self {
        Self { candidate: Candidate { pdg_id, ..Candidate::new(pt, eta, phi) }, status: 1, mother }
    }

    /// Signed pdg id.
    pub fn pdg_id(&self) -> i32 {
        self.candidate.pdg_id
    }
}

impl Direction for McParticle {
    fn eta(&self) -> f64 {
        self.candidate.eta
    }
    fn phi(&self) -> f64 {
        self.candidate.phi
    }
}

/// `true` unless some ancestor of `particles[index]` carries the same signed
/// pdg id as the particle itself. A particle without a mother is original.
///
/// The walk is bounded by the collection length so malformed mother links
/// that form a cycle terminate.
pub fn is_original(particles: &[McParticle], index: usize) -> bool {
    let Some(particle) = particles.get(index) else {
        return false;
    };
    let id = particle.pdg_id();
    let mut next = particle.mother;
    for _ in 0..particles.len() {
        let Some(m) = next.and_then(|i| particles.get(i)) else {
            return true;
        };
        if m.pdg_id() == id {
            return false;
        }
        next = m.mother;
    }
    true
}

/// One bunch-crossing record of the pileup summary.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PileupInfo {
    /// Bunch crossing relative to the triggered one.
    pub bunch_crossing: i32,
    /// Poisson mean of the number of interactions.
    pub true_num_interactions: f32,
}

/// Hit-pattern counters of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HitPattern {
    /// Valid hits.
    pub number_of_valid_hits: u32,
    /// Missing hits before the first valid hit.
    pub missing_inner_hits: u32,
    /// Missing hits between valid hits.
    pub missing_middle_hits: u32,
    /// Missing hits after the last valid hit.
    pub missing_outer_hits: u32,
}

/// Reconstructed general track.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RecoTrack {
    /// Kinematics at the point of closest approach.
    #[serde(flatten)]
    pub candidate: Candidate,
    /// Hit counters.
    #[serde(flatten)]
    pub hits: HitPattern,
    /// Transverse impact parameter.
    #[serde(default)]
    pub d0: f64,
    /// Longitudinal impact parameter.
    #[serde(default)]
    pub dz: f64,
}

impl Direction for RecoTrack {
    fn eta(&self) -> f64 {
        self.candidate.eta
    }
    fn phi(&self) -> f64 {
        self.candidate.phi
    }
}

/// Track refitted with the Gaussian-sum filter (electron tracking).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GsfTrack {
    /// Underlying track.
    #[serde(flatten)]
    pub track: RecoTrack,
}

impl Direction for GsfTrack {
    fn eta(&self) -> f64 {
        self.track.candidate.eta
    }
    fn phi(&self) -> f64 {
        self.track.candidate.phi
    }
}

/// Particle-flow isolation sums in a cone of 0.4.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PfIsolation {
    /// Charged hadrons from the primary vertex.
    pub sum_charged_hadron_pt: f64,
    /// Neutral hadrons.
    pub sum_neutral_hadron_et: f64,
    /// Photons.
    pub sum_photon_et: f64,
    /// Charged particles from pileup vertices.
    pub sum_pu_pt: f64,
}

/// Reconstructed muon.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoMuon {
    /// Kinematics.
    #[serde(flatten)]
    pub candidate: Candidate,
    /// Global-muon flag.
    #[serde(default)]
    pub is_global_muon: bool,
    /// Tracker-muon flag.
    #[serde(default)]
    pub is_tracker_muon: bool,
    /// Muon stations with matched segments.
    #[serde(default)]
    pub number_of_matched_stations: i32,
    /// Isolation sums.
    #[serde(default)]
    pub pf_isolation_r04: PfIsolation,
}

impl Direction for RecoMuon {
    fn eta(&self) -> f64 {
        self.candidate.eta
    }
    fn phi(&self) -> f64 {
        self.candidate.phi
    }
}

/// A reconstructed object together with its nearest generated particle.
///
/// `SPECIES` restricts matching to particles with that `|pdgId|`; zero
/// accepts any particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenMatchable<T, const SPECIES: i32> {
    /// Wrapped object.
    pub object: T,
    gen_match: Option<(McParticle, f64)>,
}

impl<T: Direction, const SPECIES: i32> GenMatchable<T, SPECIES> {
    /// Match `object` against `mcparticles` within `max_delta_r`.
    pub fn new(object: T, mcparticles: Option<&[McParticle]>, max_delta_r: f64) -> Self {
        let gen_match = mcparticles.and_then(|particles| {
            let eligible: Vec<McParticle> = particles
                .iter()
                .filter(|p| SPECIES == 0 || p.pdg_id().abs() == SPECIES)
                .copied()
                .collect();
            find_nearest(&eligible, &object, max_delta_r).map(|m| (eligible[m.index], m.delta_r))
        });
        Self { object, gen_match }
    }

    /// Matched generated particle.
    pub fn gen_matched_particle(&self) -> Option<&McParticle> {
        self.gen_match.as_ref().map(|(p, _)| p)
    }

    /// Distance to the matched particle, [`MAX_DELTA_R`] when unmatched.
    pub fn gen_matched_delta_r(&self) -> f64 {
        self.gen_match.map_or(MAX_DELTA_R, |(_, dr)| dr)
    }

    /// Pdg id of the matched particle, 0 when unmatched.
    pub fn gen_matched_pdg_id(&self) -> i32 {
        self.gen_match.map_or(0, |(p, _)| p.pdg_id())
    }
}

impl<T: Direction, const SPECIES: i32> Direction for GenMatchable<T, SPECIES> {
    fn eta(&self) -> f64 {
        self.object.eta()
    }
    fn phi(&self) -> f64 {
        self.object.phi()
    }
}

/// Cone sizes used when building analysis tracks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackMatchingParams {
    /// Veto cone around electrons and muons.
    pub min_delta_r_for_fiducial_track: f64,
    /// Cone for associating a GSF track; negative disables the cut.
    pub max_delta_r_for_gsf_track_matching: f64,
    /// Cone for gen matching.
    pub max_delta_r_for_gen_matching: f64,
}

impl Default for TrackMatchingParams {
    fn default() -> Self {
        Self {
            min_delta_r_for_fiducial_track: 0.05,
            max_delta_r_for_gsf_track_matching: 0.2,
            max_delta_r_for_gen_matching: DEFAULT_GEN_MATCH_DELTA_R,
        }
    }
}

/// Analysis-level track.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    /// Reco track with its generator match.
    pub base: GenMatchable<RecoTrack, 0>,
    d_r_min_jet: Option<f64>,
    is_fiducial_electron_track: bool,
    is_fiducial_muon_track: bool,
    matched_gsf_track: Option<(GsfTrack, f64)>,
}

impl Track {
    /// Evaluate vetoes and matches for one reco track.
    pub fn new(
        track: RecoTrack,
        mcparticles: Option<&[McParticle]>,
        electron_veto: &EtaPhiList,
        muon_veto: &EtaPhiList,
        gsf_tracks: &[GsfTrack],
        jets: &[Candidate],
        params: &TrackMatchingParams,
    ) -> Self {
        let min_dr = params.min_delta_r_for_fiducial_track;
        let is_fiducial_electron_track = is_fiducial(&track, electron_veto, min_dr);
        let is_fiducial_muon_track = is_fiducial(&track, muon_veto, min_dr);
        let matched_gsf_track = find_nearest(gsf_tracks, &track, params.max_delta_r_for_gsf_track_matching)
            .map(|m| (gsf_tracks[m.index], m.delta_r));
        let d_r_min_jet = min_delta_r_to(jets, &track);
        Self {
            base: GenMatchable::new(track, mcparticles, params.max_delta_r_for_gen_matching),
            d_r_min_jet,
            is_fiducial_electron_track,
            is_fiducial_muon_track,
            matched_gsf_track,
        }
    }

    /// Underlying reco track.
    pub fn track(&self) -> &RecoTrack {
        &self.base.object
    }

    /// Distance to the nearest jet, [`MAX_DELTA_R`] without jets.
    pub fn d_r_min_jet(&self) -> f64 {
        self.d_r_min_jet.unwrap_or(MAX_DELTA_R)
    }

    /// Outside every electron veto cone.
    pub fn is_fiducial_electron_track(&self) -> bool {
        self.is_fiducial_electron_track
    }

    /// Outside every muon veto cone.
    pub fn is_fiducial_muon_track(&self) -> bool {
        self.is_fiducial_muon_track
    }

    /// Matched GSF track.
    pub fn matched_gsf_track(&self) -> Option<&GsfTrack> {
        self.matched_gsf_track.as_ref().map(|(t, _)| t)
    }

    /// Distance to the matched GSF track, [`MAX_DELTA_R`] when unmatched.
    pub fn d_r_to_matched_gsf_track(&self) -> f64 {
        self.matched_gsf_track.map_or(MAX_DELTA_R, |(_, dr)| dr)
    }

    /// Hit counters of the matched GSF track.
    pub fn gsf_track_hits(&self) -> Option<HitPattern> {
        self.matched_gsf_track.map(|(t, _)| t.track.hits)
    }
}

impl Direction for Track {
    fn eta(&self) -> f64 {
        self.base.eta()
    }
    fn phi(&self) -> f64 {
        self.base.phi()
    }
}

/// Analysis-level muon with isolation corrections.
#[derive(Debug, Clone, PartialEq)]
pub struct Muon {
    /// Reco muon with its generator match.
    pub base: GenMatchable<RecoMuon, MUON_PDG_ID>,
    sum_charged_hadron_pt_corr: f64,
    sum_pu_pt_corr: f64,
    pfd_beta_iso_corr: f64,
}

impl Muon {
    /// Wrap a reco muon, matching it to generated muons.
    pub fn new(muon: RecoMuon, mcparticles: Option<&[McParticle]>, max_gen_delta_r: f64) -> Self {
        let iso = muon.pf_isolation_r04;
        let neutral = (iso.sum_neutral_hadron_et + iso.sum_photon_et - 0.5 * iso.sum_pu_pt).max(0.0);
        let pt = muon.candidate.pt;
        let pfd_beta_iso_corr = if pt > 0.0 { (iso.sum_charged_hadron_pt + neutral) / pt } else { 0.0 };
        Self {
            base: GenMatchable::new(muon, mcparticles, max_gen_delta_r),
            sum_charged_hadron_pt_corr: iso.sum_charged_hadron_pt,
            sum_pu_pt_corr: iso.sum_pu_pt,
            pfd_beta_iso_corr,
        }
    }

    /// Underlying reco muon.
    pub fn muon(&self) -> &RecoMuon {
        &self.base.object
    }

    /// Delta-beta corrected relative isolation.
    pub fn pfd_beta_iso_corr(&self) -> f64 {
        self.pfd_beta_iso_corr
    }

    /// Charged hadron isolation sum.
    pub fn sum_charged_hadron_pt_corr(&self) -> f64 {
        self.sum_charged_hadron_pt_corr
    }

    /// Pileup charged isolation sum.
    pub fn sum_pu_pt_corr(&self) -> f64 {
        self.sum_pu_pt_corr
    }

    /// Distance between this muon and another direction.
    pub fn delta_r_to<D: Direction + ?Sized>(&self, other: &D) -> f64 {
        delta_r_between(self, other)
    }
}

impl Direction for Muon {
    fn eta(&self) -> f64 {
        self.base.eta()
    }
    fn phi(&self) -> f64 {
        self.base.phi()
    }
}

/// Build the per-event veto list from any collection.
pub fn veto_list<D: Direction>(objects: Option<&[D]>, min_delta_r: f64) -> Result<EtaPhiList> {
    EtaPhiList::from_candidates(objects.unwrap_or_default(), min_delta_r)
}
