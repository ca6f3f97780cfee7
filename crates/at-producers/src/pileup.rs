//! Pileup reweighting.

use crate::config::PuScalingConfig;
use crate::producer::{EventVariableProducer, Once};
use crate::weights::{HistogramCache, HistogramSource};
use crate::{ProducerError, Result};
use at_core::objects::PileupInfo;
use at_core::{Event, EventVariables};
use at_root::Histogram;
use std::sync::Arc;

/// Ratio of the target pileup distribution to the simulated one.
#[derive(Debug, Clone, PartialEq)]
pub struct PileupCorrection {
    ratio: Histogram,
}

impl PileupCorrection {
    /// Build from `[simulated, target]`.
    ///
    /// The simulated distribution is normalised to the target's integral and
    /// re-binned onto `[0, n)` with the target's bin count `n`, reading its
    /// bins `1..=n` in order. The target is then divided by it bin by bin.
    pub fn from_histograms(histograms: Vec<Histogram>) -> Result<Self> {
        let [mut simulated, mut target]: [Histogram; 2] = histograms.try_into().map_err(|v: Vec<Histogram>| {
            ProducerError::IncompatibleHistograms(format!("expected 2 pileup histograms, got {}", v.len()))
        })?;

        let mc_integral = simulated.integral();
        if mc_integral == 0.0 || !mc_integral.is_finite() {
            return Err(ProducerError::IncompatibleHistograms(format!(
                "simulated pileup histogram '{}' has integral {mc_integral}",
                simulated.name
            )));
        }
        simulated.scale(target.integral() / mc_integral);

        let n = target.n_bins;
        let mut trimmed = Histogram::uniform("trimmed", n, 0.0, n as f64)
            .map_err(|e| ProducerError::IncompatibleHistograms(e.to_string()))?;
        for bin in 1..=n {
            trimmed.set_content(bin, simulated.content(bin));
        }
        target.divide(&trimmed).map_err(|e| ProducerError::IncompatibleHistograms(e.to_string()))?;
        Ok(Self { ratio: target })
    }

    /// Weight for an event with `true_interactions` expected interactions.
    pub fn weight(&self, true_interactions: f64) -> f64 {
        self.ratio.content(self.ratio.find_bin(true_interactions))
    }

    /// The ratio histogram.
    pub fn histogram(&self) -> &Histogram {
        &self.ratio
    }
}

/// True interaction count of the in-time bunch crossing; the last record with
/// bunch crossing 0 wins, 0 when there is none.
pub fn in_time_interactions(pileup: &[PileupInfo]) -> f64 {
    pileup
        .iter()
        .rev()
        .find(|p| p.bunch_crossing == 0)
        .map_or(0.0, |p| f64::from(p.true_num_interactions))
}

/// Publishes `puScalingFactor`.
pub struct PuScalingFactorProducer {
    correction: Option<HistogramCache<PileupCorrection>>,
    missing_pileup: Once,
}

impl PuScalingFactorProducer {
    /// Reweighting is active only for formats that carry pileup summaries.
    pub fn new(config: &PuScalingConfig, source: Arc<dyn HistogramSource>) -> Self {
        let correction = if config.data_format.supports_pileup_reweighting() {
            Some(HistogramCache::new(
                source,
                config.pu.clone(),
                vec![config.dataset.clone(), config.target.clone()],
                PileupCorrection::from_histograms,
            ))
        } else {
            log::info!("puScalingFactorProducer: {:?} input; factor fixed to 1", config.data_format);
            None
        };
        Self { correction, missing_pileup: Once::default() }
    }
}

impl EventVariableProducer for PuScalingFactorProducer {
    fn name(&self) -> &str {
        "puScalingFactorProducer"
    }

    fn add_variables(&self, event: &Event, vars: &mut EventVariables) -> Result<()> {
        let Some(cache) = self.correction.as_ref().filter(|_| !event.is_real_data) else {
            vars.insert("puScalingFactor", 1.0);
            return Ok(());
        };
        let correction = cache.get()?;
        let Some(pileup) = event.collections.pileupinfos.as_deref() else {
            if self.missing_pileup.first() {
                log::info!("{}: no pileupinfos in event; factor fixed to 1", self.name());
            }
            vars.insert("puScalingFactor", 1.0);
            return Ok(());
        };
        vars.insert("puScalingFactor", correction.weight(in_time_interactions(pileup)));
        Ok(())
    }
}
