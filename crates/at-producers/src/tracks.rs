//! Track vetoes and GSF-track matching.

use crate::producer::EventVariableProducer;
use crate::Result;
use at_core::objects::{RecoTrack, Track, TrackMatchingParams, veto_list};
use at_core::{Event, EventVariables};

/// Build analysis tracks for every reco track in `event`.
///
/// Electron and muon veto lists carry no resolution floor of their own; the
/// configured cone applies.
pub fn build_tracks(event: &Event, params: &TrackMatchingParams) -> Result<Vec<Track>> {
    analysis_tracks(event, params, event.collections.tracks.as_deref().unwrap_or_default())
}

/// Analysis track for the first reco track only, against the same vetoes.
pub fn build_leading_track(event: &Event, params: &TrackMatchingParams) -> Result<Option<Track>> {
    let leading = event.collections.tracks.as_deref().and_then(|t| t.get(..1)).unwrap_or_default();
    Ok(analysis_tracks(event, params, leading)?.pop())
}

fn analysis_tracks(event: &Event, params: &TrackMatchingParams, tracks: &[RecoTrack]) -> Result<Vec<Track>> {
    let c = &event.collections;
    let electron_veto = veto_list(c.electrons.as_deref(), 0.0)?;
    let muon_veto = veto_list(c.muons.as_deref(), 0.0)?;
    let gsf = c.gsf_tracks.as_deref().unwrap_or_default();
    let jets = c.jets.as_deref().unwrap_or_default();
    let mcparticles = c.mcparticles.as_deref();
    Ok(tracks
        .iter()
        .map(|t| Track::new(*t, mcparticles, &electron_veto, &muon_veto, gsf, jets, params))
        .collect())
}

/// Publishes `nTracks`, `nFiducialTracks` and `nTracksMatchedToGsf`.
///
/// A fiducial track lies outside every electron and muon veto cone.
#[derive(Debug, Clone)]
pub struct TrackProducer {
    params: TrackMatchingParams,
}

impl TrackProducer {
    /// Producer with the given cones.
    pub fn new(params: TrackMatchingParams) -> Self {
        Self { params }
    }
}

impl EventVariableProducer for TrackProducer {
    fn name(&self) -> &str {
        "trackProducer"
    }

    fn add_variables(&self, event: &Event, vars: &mut EventVariables) -> Result<()> {
        let tracks = build_tracks(event, &self.params)?;
        let fiducial = tracks
            .iter()
            .filter(|t| t.is_fiducial_electron_track() && t.is_fiducial_muon_track())
            .count();
        let matched = tracks.iter().filter(|t| t.matched_gsf_track().is_some()).count();
        vars.insert("nTracks", tracks.len() as f64);
        vars.insert("nFiducialTracks", fiducial as f64);
        vars.insert("nTracksMatchedToGsf", matched as f64);
        Ok(())
    }
}
