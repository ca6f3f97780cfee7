//! # at-producers
//!
//! Per-event variable producers.
//!
//! Each producer implements [`EventVariableProducer`]: it reads collections
//! from an [`at_core::Event`] and publishes derived values into the event's
//! [`at_core::EventVariables`]. Histogram-based weights are read from ROOT
//! files through a [`weights::HistogramSource`] on first use and cached.
//!
//! - [`IsrWeightProducer`]: `isrPt`, `isrWeight`, `isrWeightUp`, `isrWeightDown`
//! - [`PuScalingFactorProducer`]: `puScalingFactor`
//! - [`TrackProducer`]: track veto and GSF matching summaries
//! - [`MemberVariableProducer`]: a named member of a leading object

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod isr;
pub mod member;
pub mod pileup;
pub mod producer;
pub mod tracks;
pub mod weights;

pub use config::{AnalysisConfig, DataFormat, read_config};
pub use error::{ProducerError, Result};
pub use isr::IsrWeightProducer;
pub use member::MemberVariableProducer;
pub use pileup::PuScalingFactorProducer;
pub use producer::{EventVariableProducer, ProducerSet};
pub use tracks::TrackProducer;
pub use weights::{HistogramSource, MemoryHistogramSource, RootHistogramSource};
