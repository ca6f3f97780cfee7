//! Descriptors of the physics objects in [`crate::objects`].

use super::{MemberValue, Reflect, TypeInfo, TypeRegistry};
use crate::objects::{
    Candidate, GenMatchable, GsfTrack, HitPattern, McParticle, Muon, MUON_PDG_ID, PileupInfo, RecoMuon,
    RecoTrack, Track,
};

const RECO: &[&str] = &["reco"];
const OSU: &[&str] = &["osu"];
const GLOBAL: &[&str] = &[];

const GEN_PARTICLE_REF: &str = "edm::Ref<std::vector<reco::GenParticle> >";
const GSF_TRACK_REF: &str = "edm::Ref<std::vector<reco::GsfTrack> >";

pub(super) fn register_builtin_types(registry: &mut TypeRegistry) {
    registry.register_type::<Candidate>();
    registry.register_type::<McParticle>();
    registry.register_type::<PileupInfo>();
    registry.register_type::<RecoTrack>();
    registry.register_type::<GsfTrack>();
    registry.register_type::<RecoMuon>();
    registry.register_type::<GenMatchable<RecoMuon, MUON_PDG_ID>>();
    registry.register_type::<GenMatchable<RecoTrack, 0>>();
    registry.register_type::<Muon>();
    registry.register_type::<Track>();
}

impl Reflect for Candidate {
    fn type_info() -> TypeInfo {
        TypeInfo::builder::<Candidate>(RECO, "LeafCandidate")
            .method("pt", |c| MemberValue::Double(c.pt))
            .method("eta", |c| MemberValue::Double(c.eta))
            .method("phi", |c| MemberValue::Double(c.phi))
            .method("px", |c| MemberValue::Double(c.px()))
            .method("py", |c| MemberValue::Double(c.py()))
            .method("pz", |c| MemberValue::Double(c.pz()))
            .method("p", |c| MemberValue::Double(c.p()))
            .method("theta", |c| MemberValue::Double(c.theta()))
            .method("charge", |c| MemberValue::Int(c.charge))
            .method("pdgId", |c| MemberValue::Int(c.pdg_id))
            .build()
    }
}

impl Reflect for McParticle {
    fn type_info() -> TypeInfo {
        TypeInfo::builder::<McParticle>(RECO, "GenParticle")
            .data_member("status", |p| MemberValue::Int(p.status))
            .method("numberOfMothers", |p| MemberValue::Unsigned(u32::from(p.mother.is_some())))
            .method("motherRef", |_| MemberValue::Other(GEN_PARTICLE_REF))
            .base(RECO, "LeafCandidate", |p: &McParticle| &p.candidate)
            .build()
    }
}

impl Reflect for PileupInfo {
    fn type_info() -> TypeInfo {
        TypeInfo::builder::<PileupInfo>(GLOBAL, "PileupSummaryInfo")
            .method("getBunchCrossing", |p| MemberValue::Int(p.bunch_crossing))
            .method("getTrueNumInteractions", |p| MemberValue::Float(p.true_num_interactions))
            .build()
    }
}

impl Reflect for RecoTrack {
    fn type_info() -> TypeInfo {
        TypeInfo::builder::<RecoTrack>(RECO, "Track")
            .method("d0", |t| MemberValue::Double(t.d0))
            .method("dz", |t| MemberValue::Double(t.dz))
            .method("numberOfValidHits", |t| MemberValue::Unsigned(t.hits.number_of_valid_hits))
            .method("missingInnerHits", |t| MemberValue::Unsigned(t.hits.missing_inner_hits))
            .method("missingMiddleHits", |t| MemberValue::Unsigned(t.hits.missing_middle_hits))
            .method("missingOuterHits", |t| MemberValue::Unsigned(t.hits.missing_outer_hits))
            .base(RECO, "LeafCandidate", |t: &RecoTrack| &t.candidate)
            .build()
    }
}

impl Reflect for GsfTrack {
    fn type_info() -> TypeInfo {
        TypeInfo::builder::<GsfTrack>(RECO, "GsfTrack")
            .base(RECO, "Track", |t: &GsfTrack| &t.track)
            .build()
    }
}

impl Reflect for RecoMuon {
    fn type_info() -> TypeInfo {
        TypeInfo::builder::<RecoMuon>(RECO, "Muon")
            .method("isGlobalMuon", |m| MemberValue::Bool(m.is_global_muon))
            .method("isTrackerMuon", |m| MemberValue::Bool(m.is_tracker_muon))
            .method("numberOfMatchedStations", |m| MemberValue::Int(m.number_of_matched_stations))
            .base(RECO, "LeafCandidate", |m: &RecoMuon| &m.candidate)
            .build()
    }
}

fn wrapped<T, const SPECIES: i32>(g: &GenMatchable<T, SPECIES>) -> &T {
    &g.object
}

impl Reflect for GenMatchable<RecoMuon, MUON_PDG_ID> {
    fn type_info() -> TypeInfo {
        TypeInfo::builder::<Self>(OSU, "GenMatchable<reco::Muon,13>")
            .method("genMatchedDeltaR", |g| MemberValue::Double(g.gen_matched_delta_r()))
            .method("genMatchedPdgId", |g| MemberValue::Int(g.gen_matched_pdg_id()))
            .method("genMatchedParticle", |_| MemberValue::Other(GEN_PARTICLE_REF))
            .base(RECO, "Muon", wrapped::<RecoMuon, MUON_PDG_ID>)
            .build()
    }
}

impl Reflect for GenMatchable<RecoTrack, 0> {
    fn type_info() -> TypeInfo {
        TypeInfo::builder::<Self>(OSU, "GenMatchable<reco::Track,0>")
            .method("genMatchedDeltaR", |g| MemberValue::Double(g.gen_matched_delta_r()))
            .method("genMatchedPdgId", |g| MemberValue::Int(g.gen_matched_pdg_id()))
            .method("genMatchedParticle", |_| MemberValue::Other(GEN_PARTICLE_REF))
            .base(RECO, "Track", wrapped::<RecoTrack, 0>)
            .build()
    }
}

impl Reflect for Muon {
    fn type_info() -> TypeInfo {
        TypeInfo::builder::<Muon>(OSU, "Muon")
            .method("pfdBetaIsoCorr", |m| MemberValue::Double(m.pfd_beta_iso_corr()))
            .method("sumChargedHadronPtCorr", |m| MemberValue::Double(m.sum_charged_hadron_pt_corr()))
            .method("sumPUPtCorr", |m| MemberValue::Double(m.sum_pu_pt_corr()))
            .base(OSU, "GenMatchable<reco::Muon,13>", |m: &Muon| &m.base)
            .build()
    }
}

/// -1 when no GSF track was matched.
fn gsf_hits(t: &Track, count: fn(&HitPattern) -> u32) -> MemberValue {
    MemberValue::Int(t.gsf_track_hits().map_or(-1, |h| i32::try_from(count(&h)).unwrap_or(i32::MAX)))
}

impl Reflect for Track {
    fn type_info() -> TypeInfo {
        TypeInfo::builder::<Track>(OSU, "Track")
            .method("dRMinJet", |t| MemberValue::Double(t.d_r_min_jet()))
            .method("isFiducialElectronTrack", |t| MemberValue::Bool(t.is_fiducial_electron_track()))
            .method("isFiducialMuonTrack", |t| MemberValue::Bool(t.is_fiducial_muon_track()))
            .method("matchedGsfTrack", |_| MemberValue::Other(GSF_TRACK_REF))
            .method("dRToMatchedGsfTrack", |t| MemberValue::Double(t.d_r_to_matched_gsf_track()))
            .method("gsfTrackNumberOfValidHits", |t| gsf_hits(t, |h| h.number_of_valid_hits))
            .method("gsfTrackMissingInnerHits", |t| gsf_hits(t, |h| h.missing_inner_hits))
            .method("gsfTrackMissingMiddleHits", |t| gsf_hits(t, |h| h.missing_middle_hits))
            .method("gsfTrackMissingOuterHits", |t| gsf_hits(t, |h| h.missing_outer_hits))
            .base(OSU, "GenMatchable<reco::Track,0>", |t: &Track| &t.base)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::MAX_DELTA_R;

    #[test]
    fn test_every_builtin_base_is_registered() {
        let registry = TypeRegistry::with_builtin_types();
        assert_eq!(registry.type_names().len(), 10);
        for name in registry.type_names() {
            for base in registry.get(name).unwrap().bases() {
                assert!(
                    registry.get(&base.qualified_name()).is_some(),
                    "{name}: base {} not registered",
                    base.qualified_name()
                );
            }
        }
    }

    #[test]
    fn test_pileup_float_member() {
        let registry = TypeRegistry::with_builtin_types();
        let pu = PileupInfo { bunch_crossing: -1, true_num_interactions: 20.5 };
        assert_eq!(registry.get_numeric_member("PileupSummaryInfo", &pu, "getTrueNumInteractions").unwrap(), 20.5);
        assert_eq!(registry.get_numeric_member("PileupSummaryInfo", &pu, "getBunchCrossing").unwrap(), -1.0);
    }

    #[test]
    fn test_gen_particle_data_member_and_base() {
        let registry = TypeRegistry::with_builtin_types();
        let p = McParticle { status: 62, ..McParticle::new(-1000006, 300.0, 1.0, 0.0, Some(0)) };
        assert_eq!(registry.get_numeric_member("reco::GenParticle", &p, "status").unwrap(), 62.0);
        assert_eq!(registry.get_numeric_member("reco::GenParticle", &p, "numberOfMothers").unwrap(), 1.0);
        assert_eq!(registry.get_numeric_member("reco::GenParticle", &p, "pdgId").unwrap(), -1000006.0);
    }

    #[test]
    fn test_gsf_track_reaches_leaf_candidate() {
        let registry = TypeRegistry::with_builtin_types();
        let t = GsfTrack { track: RecoTrack { candidate: Candidate::new(7.0, 0.0, 0.0), ..Default::default() } };
        assert_eq!(registry.get_numeric_member("reco::GsfTrack", &t, "pt").unwrap(), 7.0);
    }

    #[test]
    fn test_unmatched_track_members() {
        let registry = TypeRegistry::with_builtin_types();
        let empty = crate::EtaPhiList::new(0.0).unwrap();
        let t = Track::new(RecoTrack::default(), None, &empty, &empty, &[], &[], &Default::default());
        assert_eq!(registry.get_numeric_member("osu::Track", &t, "dRToMatchedGsfTrack").unwrap(), MAX_DELTA_R);
        assert_eq!(registry.get_numeric_member("osu::Track", &t, "gsfTrackNumberOfValidHits").unwrap(), -1.0);
        assert_eq!(registry.get_numeric_member("osu::Track", &t, "genMatchedDeltaR").unwrap(), MAX_DELTA_R);
        assert_eq!(registry.get_numeric_member("osu::Track", &t, "isFiducialMuonTrack").unwrap(), 1.0);
    }
}
