//! # at-core
//!
//! Core data model for AnaTools producers.
//!
//! - [`objects`]: reconstructed and generated physics objects plus the
//!   analysis-level wrappers ([`Track`], [`Muon`]) built from them
//! - [`event`]: the per-event snapshot producers read and the
//!   [`EventVariables`] map they write
//! - [`matching`]: angular distance, fiducial vetoing and nearest-neighbour
//!   matching
//! - [`reflect`]: string-addressed numeric member access over a registry of
//!   known types

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod event;
pub mod matching;
pub mod objects;
pub mod reflect;

pub use error::{Error, Result};
pub use event::{CollectionKind, Collections, Event, EventVariables};
pub use matching::{Direction, EtaPhi, EtaPhiList, Match, delta_phi, delta_r, find_nearest, is_fiducial};
pub use objects::{
    Candidate, GenMatchable, GsfTrack, HitPattern, McParticle, Muon, PileupInfo, RecoMuon, RecoTrack,
    Track, TrackMatchingParams,
};
pub use reflect::{MemberValue, Reflect, TypeInfo, TypeRegistry};
