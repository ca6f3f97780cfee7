//! Member variables of the leading object of a collection.

use crate::config::UserVariableConfig;
use crate::producer::{EventVariableProducer, Once};
use crate::tracks::build_leading_track;
use crate::Result;
use at_core::objects::{Muon, TrackMatchingParams};
use at_core::{CollectionKind, Event, EventVariables, TypeRegistry};
use std::any::Any;
use std::sync::Arc;

/// The first object of `kind` in `event` as the analysis type the registry
/// knows it by, or `None` when the collection is missing or empty.
pub fn leading_object(
    event: &Event,
    kind: CollectionKind,
    params: &TrackMatchingParams,
) -> Result<Option<(&'static str, Box<dyn Any>)>> {
    fn boxed<T: Any>(name: &'static str, value: T) -> (&'static str, Box<dyn Any>) {
        (name, Box::new(value))
    }

    let c = &event.collections;
    if event.collection_len(kind).unwrap_or(0) == 0 {
        return Ok(None);
    }
    let object = match kind {
        CollectionKind::Mcparticles => c.mcparticles.as_ref().map(|v| boxed("reco::GenParticle", v[0])),
        CollectionKind::Pileupinfos => c.pileupinfos.as_ref().map(|v| boxed("PileupSummaryInfo", v[0])),
        CollectionKind::Tracks => build_leading_track(event, params)?.map(|t| boxed("osu::Track", t)),
        CollectionKind::GsfTracks => c.gsf_tracks.as_ref().map(|v| boxed("reco::GsfTrack", v[0])),
        CollectionKind::Electrons => c.electrons.as_ref().map(|v| boxed("reco::LeafCandidate", v[0])),
        CollectionKind::Jets => c.jets.as_ref().map(|v| boxed("reco::LeafCandidate", v[0])),
        CollectionKind::Muons => c.muons.as_ref().map(|v| {
            let muon = Muon::new(v[0], c.mcparticles.as_deref(), params.max_delta_r_for_gen_matching);
            boxed("osu::Muon", muon)
        }),
    };
    Ok(object)
}

/// Publishes one member of the leading object of a collection.
pub struct MemberVariableProducer {
    collection: CollectionKind,
    member: String,
    key: String,
    registry: Arc<TypeRegistry>,
    params: TrackMatchingParams,
    empty_collection: Once,
}

impl MemberVariableProducer {
    /// Producer for one configured user variable.
    pub fn new(config: &UserVariableConfig, registry: Arc<TypeRegistry>, params: TrackMatchingParams) -> Self {
        Self {
            collection: config.collection,
            member: config.member.clone(),
            key: config.output_key(),
            registry,
            params,
            empty_collection: Once::default(),
        }
    }

    /// Output key.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl EventVariableProducer for MemberVariableProducer {
    fn name(&self) -> &str {
        &self.key
    }

    fn add_variables(&self, event: &Event, vars: &mut EventVariables) -> Result<()> {
        let Some((type_name, object)) = leading_object(event, self.collection, &self.params)? else {
            if self.empty_collection.first() {
                log::info!("{}: no {} in event; variable not published", self.key, self.collection);
            }
            return Ok(());
        };
        let value = self.registry.get_numeric_member(type_name, &*object, &self.member)?;
        vars.insert(self.key.as_str(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use at_core::objects::{Candidate, RecoMuon};

    fn producer(collection: CollectionKind, member: &str) -> MemberVariableProducer {
        let cfg = UserVariableConfig { collection, member: member.into(), key: Some("out".into()) };
        MemberVariableProducer::new(&cfg, Arc::new(TypeRegistry::with_builtin_types()), TrackMatchingParams::default())
    }

    fn event_with_muons() -> Event {
        let mut event = Event::default();
        event.collections.muons = Some(vec![
            RecoMuon { candidate: Candidate::new(50.0, 0.3, 0.0), is_tracker_muon: true, ..Default::default() },
            RecoMuon { candidate: Candidate::new(20.0, 0.0, 0.0), ..Default::default() },
        ]);
        event
    }

    #[test]
    fn test_leading_muon_member() {
        let mut vars = EventVariables::new();
        producer(CollectionKind::Muons, "pt").add_variables(&event_with_muons(), &mut vars).unwrap();
        assert_eq!(vars.get("out"), Some(50.0));

        producer(CollectionKind::Muons, "isTrackerMuon").add_variables(&event_with_muons(), &mut vars).unwrap();
        assert_eq!(vars.get("out"), Some(1.0));
    }

    #[test]
    fn test_missing_collection_publishes_nothing() {
        let mut vars = EventVariables::new();
        producer(CollectionKind::Jets, "pt").add_variables(&event_with_muons(), &mut vars).unwrap();
        assert!(vars.is_empty());
    }

    #[test]
    fn test_unknown_member_is_not_fatal() {
        let mut vars = EventVariables::new();
        let err = producer(CollectionKind::Muons, "bogus").add_variables(&event_with_muons(), &mut vars).unwrap_err();
        assert!(!err.is_fatal());
        assert!(vars.is_empty());
    }

    #[test]
    fn test_leading_track_is_analysis_track() {
        let mut event = Event::default();
        event.collections.tracks = Some(vec![Default::default()]);
        let (name, _) = leading_object(&event, CollectionKind::Tracks, &TrackMatchingParams::default())
            .unwrap()
            .unwrap();
        assert_eq!(name, "osu::Track");
    }
}
