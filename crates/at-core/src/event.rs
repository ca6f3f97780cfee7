//! Event snapshots and the per-event variable map.

use crate::objects::{Candidate, GsfTrack, McParticle, PileupInfo, RecoMuon, RecoTrack};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Collections available to producers. `None` means the collection was not
/// retrieved for this event, which is distinct from an empty collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Collections {
    /// Generated particles.
    pub mcparticles: Option<Vec<McParticle>>,
    /// Pileup summary records, one per bunch crossing.
    pub pileupinfos: Option<Vec<PileupInfo>>,
    /// General tracks.
    pub tracks: Option<Vec<RecoTrack>>,
    /// GSF tracks.
    pub gsf_tracks: Option<Vec<GsfTrack>>,
    /// Electrons.
    pub electrons: Option<Vec<Candidate>>,
    /// Muons.
    pub muons: Option<Vec<RecoMuon>>,
    /// Jets.
    pub jets: Option<Vec<Candidate>>,
}

/// One event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Run number.
    pub run: u32,
    /// Luminosity block.
    pub lumi: u32,
    /// Event number.
    pub event: u64,
    /// Collision data rather than simulation.
    #[serde(default)]
    pub is_real_data: bool,
    /// Retrieved collections.
    #[serde(default)]
    pub collections: Collections,
}

impl Event {
    /// Parse a JSON array of events, or one JSON object per line.
    pub fn parse_many(text: &str) -> Result<Vec<Event>> {
        let trimmed = text.trim_start();
        if trimmed.starts_with('[') {
            return Ok(serde_json::from_str(trimmed)?);
        }
        trimmed
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(Error::from))
            .collect()
    }

    /// Number of objects in a collection, `None` when it was not retrieved.
    pub fn collection_len(&self, kind: CollectionKind) -> Option<usize> {
        let c = &self.collections;
        match kind {
            CollectionKind::Mcparticles => c.mcparticles.as_ref().map(Vec::len),
            CollectionKind::Pileupinfos => c.pileupinfos.as_ref().map(Vec::len),
            CollectionKind::Tracks => c.tracks.as_ref().map(Vec::len),
            CollectionKind::GsfTracks => c.gsf_tracks.as_ref().map(Vec::len),
            CollectionKind::Electrons => c.electrons.as_ref().map(Vec::len),
            CollectionKind::Muons => c.muons.as_ref().map(Vec::len),
            CollectionKind::Jets => c.jets.as_ref().map(Vec::len),
        }
    }
}

/// Names of the event collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    /// `mcparticles`
    Mcparticles,
    /// `pileupinfos`
    Pileupinfos,
    /// `tracks`
    Tracks,
    /// `gsf_tracks`
    GsfTracks,
    /// `electrons`
    Electrons,
    /// `muons`
    Muons,
    /// `jets`
    Jets,
}

impl CollectionKind {
    /// Every collection, in snapshot order.
    pub const ALL: [CollectionKind; 7] = [
        Self::Mcparticles,
        Self::Pileupinfos,
        Self::Tracks,
        Self::GsfTracks,
        Self::Electrons,
        Self::Muons,
        Self::Jets,
    ];

    /// Snapshot key.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mcparticles => "mcparticles",
            Self::Pileupinfos => "pileupinfos",
            Self::Tracks => "tracks",
            Self::GsfTracks => "gsf_tracks",
            Self::Electrons => "electrons",
            Self::Muons => "muons",
            Self::Jets => "jets",
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| Error::Validation(format!("unknown collection '{s}'")))
    }
}

/// Per-event key/value output. Producers only insert or overwrite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventVariables(BTreeMap<String, f64>);

impl EventVariables {
    /// Empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a value.
    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        self.0.insert(key.into(), value);
    }

    /// Look up a value.
    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` when nothing has been published.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
