//! The producer trait and the ordered set of producers run on each event.

use crate::config::AnalysisConfig;
use crate::isr::IsrWeightProducer;
use crate::member::MemberVariableProducer;
use crate::pileup::PuScalingFactorProducer;
use crate::tracks::TrackProducer;
use crate::weights::HistogramSource;
use crate::Result;
use at_core::{Event, EventVariables, TypeRegistry};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Computes derived quantities from one event and publishes them.
///
/// Implementations take `&self`; any lazily built state is internally
/// synchronised so one producer can serve several threads.
pub trait EventVariableProducer: Send + Sync {
    /// Name used in log messages.
    fn name(&self) -> &str;

    /// Insert this producer's variables for `event` into `vars`.
    fn add_variables(&self, event: &Event, vars: &mut EventVariables) -> Result<()>;
}

/// `true` only on the first call; used to log a recurring condition once.
#[derive(Debug, Default)]
pub(crate) struct Once(AtomicBool);

impl Once {
    pub(crate) fn first(&self) -> bool {
        !self.0.swap(true, Ordering::Relaxed)
    }
}

/// Producers in configuration order.
pub struct ProducerSet {
    producers: Vec<Box<dyn EventVariableProducer>>,
}

impl ProducerSet {
    /// Wrap an explicit list.
    pub fn new(producers: Vec<Box<dyn EventVariableProducer>>) -> Self {
        Self { producers }
    }

    /// One producer per configured section, weights read through `source`.
    pub fn from_config(
        config: &AnalysisConfig,
        source: Arc<dyn HistogramSource>,
        registry: Arc<TypeRegistry>,
    ) -> Result<Self> {
        config.validate()?;
        let mut producers: Vec<Box<dyn EventVariableProducer>> = Vec::new();
        if let Some(isr) = &config.isr_weight {
            producers.push(Box::new(IsrWeightProducer::new(isr, Arc::clone(&source))));
        }
        if let Some(pu) = &config.pu_scaling {
            producers.push(Box::new(PuScalingFactorProducer::new(pu, Arc::clone(&source))));
        }
        if let Some(tracks) = &config.tracks {
            producers.push(Box::new(TrackProducer::new(*tracks)));
        }
        let params = config.tracks.unwrap_or_default();
        for uv in &config.user_variables {
            producers.push(Box::new(MemberVariableProducer::new(uv, Arc::clone(&registry), params)));
        }
        Ok(Self { producers })
    }

    /// Producer names in run order.
    pub fn names(&self) -> Vec<&str> {
        self.producers.iter().map(|p| p.name()).collect()
    }

    /// Number of producers.
    pub fn len(&self) -> usize {
        self.producers.len()
    }

    /// `true` when nothing is configured.
    pub fn is_empty(&self) -> bool {
        self.producers.is_empty()
    }

    /// Run every producer on `event`.
    ///
    /// A fatal error stops the run and is returned; any other error is logged
    /// and only that producer's output is missing for this event.
    pub fn process(&self, event: &Event) -> Result<EventVariables> {
        let mut vars = EventVariables::new();
        for producer in &self.producers {
            match producer.add_variables(event, &mut vars) {
                Ok(()) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => log::warn!(
                    "{}: skipped for run {} event {}: {e}",
                    producer.name(),
                    event.run,
                    event.event
                ),
            }
        }
        Ok(vars)
    }
}

impl std::fmt::Debug for ProducerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProducerSet").field("producers", &self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProducerError;

    struct Fixed(&'static str, f64);

    impl EventVariableProducer for Fixed {
        fn name(&self) -> &str {
            self.0
        }
        fn add_variables(&self, _event: &Event, vars: &mut EventVariables) -> Result<()> {
            vars.insert(self.0, self.1);
            Ok(())
        }
    }

    struct Failing(bool);

    impl EventVariableProducer for Failing {
        fn name(&self) -> &str {
            "failing"
        }
        fn add_variables(&self, _event: &Event, _vars: &mut EventVariables) -> Result<()> {
            if self.0 {
                Err(ProducerError::IncompatibleHistograms("boom".into()))
            } else {
                Err(at_core::Error::Validation("bad event".into()).into())
            }
        }
    }

    #[test]
    fn test_non_fatal_errors_are_skipped() {
        let set = ProducerSet::new(vec![Box::new(Fixed("a", 1.0)), Box::new(Failing(false)), Box::new(Fixed("b", 2.0))]);
        let vars = set.process(&Event::default()).unwrap();
        assert_eq!(vars.get("a"), Some(1.0));
        assert_eq!(vars.get("b"), Some(2.0));
    }

    #[test]
    fn test_fatal_error_stops() {
        let set = ProducerSet::new(vec![Box::new(Failing(true)), Box::new(Fixed("b", 2.0))]);
        assert!(set.process(&Event::default()).unwrap_err().is_fatal());
    }

    #[test]
    fn test_once() {
        let once = Once::default();
        assert!(once.first());
        assert!(!once.first());
    }
}
