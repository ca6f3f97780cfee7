//! Initial-state-radiation reweighting.
//!
//! The ISR system is the vector sum of the transverse momenta of the
//! original instances of the configured particles. Its magnitude is looked
//! up in every weight histogram and the results are multiplied.

use crate::config::IsrWeightConfig;
use crate::producer::{EventVariableProducer, Once};
use crate::weights::{HistogramCache, HistogramSource, HistogramWeightSet, Weights};
use crate::Result;
use at_core::objects::{McParticle, is_original};
use at_core::{Event, EventVariables};
use std::sync::Arc;

/// Published when no weight can be computed.
const NEUTRAL_ISR_PT: f64 = -1.0;

/// Transverse momentum of the ISR system.
///
/// Each particle contributes once per configured id matching its `|pdgId|`,
/// so listing an id and its antiparticle counts matching particles twice.
pub fn isr_pt(particles: &[McParticle], pdg_ids: &[i32]) -> f64 {
    let mut px = 0.0;
    let mut py = 0.0;
    for (i, p) in particles.iter().enumerate() {
        for id in pdg_ids {
            if p.pdg_id().abs() == id.abs() && is_original(particles, i) {
                px += p.candidate.px();
                py += p.candidate.py();
            }
        }
    }
    px.hypot(py)
}

fn build_weight_set(histograms: Vec<at_root::Histogram>) -> Result<HistogramWeightSet> {
    Ok(HistogramWeightSet::new(histograms))
}

/// Publishes `isrPt`, `isrWeight`, `isrWeightUp` and `isrWeightDown`.
pub struct IsrWeightProducer {
    pdg_ids: Vec<i32>,
    weights: Option<HistogramCache<HistogramWeightSet>>,
    missing_particles: Once,
}

impl IsrWeightProducer {
    /// Weights are disabled when the file or the histogram list is unset.
    pub fn new(config: &IsrWeightConfig, source: Arc<dyn HistogramSource>) -> Self {
        let weights = config
            .weights()
            .map(|(file, names)| HistogramCache::new(source, file, names.to_vec(), build_weight_set));
        if weights.is_none() {
            log::info!("isrWeightProducer: no weight file configured; weights fixed to 1");
        }
        Self { pdg_ids: config.pdg_ids.clone(), weights, missing_particles: Once::default() }
    }

    fn publish(vars: &mut EventVariables, pt: f64, w: Weights) {
        vars.insert("isrPt", pt);
        vars.insert("isrWeight", w.nominal);
        vars.insert("isrWeightUp", w.up);
        vars.insert("isrWeightDown", w.down);
    }
}

impl EventVariableProducer for IsrWeightProducer {
    fn name(&self) -> &str {
        "isrWeightProducer"
    }

    fn add_variables(&self, event: &Event, vars: &mut EventVariables) -> Result<()> {
        let Some(cache) = self.weights.as_ref().filter(|_| !event.is_real_data) else {
            Self::publish(vars, NEUTRAL_ISR_PT, Weights::default());
            return Ok(());
        };
        let Some(particles) = event.collections.mcparticles.as_deref() else {
            if self.missing_particles.first() {
                log::info!("{}: no mcparticles in event; weights fixed to 1", self.name());
            }
            Self::publish(vars, NEUTRAL_ISR_PT, Weights::default());
            return Ok(());
        };

        let weights = cache.get()?;
        let pt = isr_pt(particles, &self.pdg_ids);
        Self::publish(vars, pt, weights.evaluate(pt));
        Ok(())
    }
}
