//! Producers driven through configuration and real weight files.

use approx::assert_relative_eq;
use at_core::objects::{McParticle, PileupInfo};
use at_core::{Event, EventVariables, TypeRegistry};
use at_producers::config::{IsrWeightConfig, PuScalingConfig};
use at_producers::weights::HistogramSource;
use at_producers::{
    AnalysisConfig, DataFormat, EventVariableProducer, IsrWeightProducer, MemoryHistogramSource, ProducerError,
    ProducerSet, PuScalingFactorProducer, RootHistogramSource, read_config,
};
use at_root::{Histogram, RootFileWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn weight_hist(name: &str, content: f64, error: f64) -> Histogram {
    let mut h = Histogram::with_edges(name, vec![0.0, 100.0, 200.0, 500.0]).unwrap();
    h.bin_content = vec![1.0, content, 1.0];
    h.sumw2 = Some(vec![0.0, error * error, 0.0]);
    h
}

fn simulated_event(particles: Vec<McParticle>) -> Event {
    let mut ev = Event { run: 1, lumi: 2, event: 3, ..Default::default() };
    ev.collections.mcparticles = Some(particles);
    ev
}

fn run(producer: &dyn EventVariableProducer, event: &Event) -> EventVariables {
    let mut vars = EventVariables::new();
    producer.add_variables(event, &mut vars).unwrap();
    vars
}

fn assert_neutral_isr(vars: &EventVariables) {
    assert_eq!(vars.get("isrPt"), Some(-1.0));
    assert_eq!(vars.get("isrWeight"), Some(1.0));
    assert_eq!(vars.get("isrWeightUp"), Some(1.0));
    assert_eq!(vars.get("isrWeightDown"), Some(1.0));
}

#[test]
fn isr_without_weight_file_is_neutral() {
    let cfg = IsrWeightConfig { pdg_ids: vec![1000006], weight_file: None, weight_hist: vec!["w".into()] };
    let producer = IsrWeightProducer::new(&cfg, Arc::new(RootHistogramSource));
    let ev = simulated_event(vec![McParticle::new(1000006, 150.0, 0.0, 0.0, None)]);
    assert_neutral_isr(&run(&producer, &ev));
}

#[test]
fn isr_neutral_for_data_and_missing_particles() {
    let cfg = IsrWeightConfig {
        pdg_ids: vec![1000006],
        weight_file: Some(PathBuf::from("/no/such/file.root")),
        weight_hist: vec!["w".into()],
    };
    let producer = IsrWeightProducer::new(&cfg, Arc::new(RootHistogramSource));

    let mut data = simulated_event(vec![McParticle::new(1000006, 150.0, 0.0, 0.0, None)]);
    data.is_real_data = true;
    assert_neutral_isr(&run(&producer, &data));

    let mut no_particles = Event::default();
    no_particles.collections.mcparticles = None;
    assert_neutral_isr(&run(&producer, &no_particles));
}

#[test]
fn isr_weights_from_root_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("isr.root");
    let mut writer = RootFileWriter::new();
    writer
        .add_histogram("a", &weight_hist("a", 0.9, 0.05))
        .unwrap()
        .add_histogram("syst/b", &weight_hist("b", 0.8, 0.1))
        .unwrap();
    writer.write(&path).unwrap();

    let cfg = IsrWeightConfig {
        pdg_ids: vec![1000006],
        weight_file: Some(path),
        weight_hist: vec!["a".into(), "syst/b".into()],
    };
    let producer = IsrWeightProducer::new(&cfg, Arc::new(RootHistogramSource));
    let ev = simulated_event(vec![
        McParticle::new(1000006, 90.0, 0.0, 0.0, None),
        McParticle::new(-1000006, 60.0, 0.0, 0.0, None),
    ]);
    let vars = run(&producer, &ev);
    assert_relative_eq!(vars.get("isrPt").unwrap(), 150.0, epsilon = 1e-9);
    assert_relative_eq!(vars.get("isrWeight").unwrap(), 0.72, epsilon = 1e-12);
    assert_relative_eq!(vars.get("isrWeightUp").unwrap(), 0.95 * 0.9, epsilon = 1e-12);
    assert_relative_eq!(vars.get("isrWeightDown").unwrap(), 0.595, epsilon = 1e-12);
}

#[test]
fn isr_missing_histogram_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("isr.root");
    let mut writer = RootFileWriter::new();
    writer.add_histogram("a", &weight_hist("a", 0.9, 0.05)).unwrap();
    writer.write(&path).unwrap();

    let cfg = IsrWeightConfig { pdg_ids: vec![6], weight_file: Some(path), weight_hist: vec!["nope".into()] };
    let producer = IsrWeightProducer::new(&cfg, Arc::new(RootHistogramSource));
    let err = producer
        .add_variables(&simulated_event(vec![]), &mut EventVariables::new())
        .unwrap_err();
    assert!(matches!(err, ProducerError::MissingHistogram { ref name, .. } if name == "nope"));
    assert!(err.is_fatal());
}

struct CountingSource {
    inner: MemoryHistogramSource,
    loads: AtomicUsize,
}

impl HistogramSource for CountingSource {
    fn load(&self, path: &Path, names: &[String]) -> at_producers::Result<Vec<Histogram>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.load(path, names)
    }
}

fn pileup_source() -> Arc<CountingSource> {
    let mut mc = Histogram::uniform("mc", 4, 0.0, 4.0).unwrap();
    mc.bin_content = vec![1.0, 1.0, 1.0, 1.0];
    let mut data = Histogram::uniform("data", 4, 0.0, 4.0).unwrap();
    data.bin_content = vec![2.0, 2.0, 4.0, 0.0];
    let mut inner = MemoryHistogramSource::new();
    inner.insert("pu.root", "mc", mc).insert("pu.root", "data", data);
    Arc::new(CountingSource { inner, loads: AtomicUsize::new(0) })
}

fn pu_config(data_format: DataFormat) -> PuScalingConfig {
    PuScalingConfig { pu: "pu.root".into(), dataset: "mc".into(), target: "data".into(), data_format }
}

fn pileup_event(bx0: f32) -> Event {
    let mut ev = Event::default();
    ev.collections.pileupinfos = Some(vec![
        PileupInfo { bunch_crossing: -1, true_num_interactions: 0.5 },
        PileupInfo { bunch_crossing: 0, true_num_interactions: bx0 },
    ]);
    ev
}

#[test]
fn pileup_factor_loaded_once() {
    let source = pileup_source();
    let producer = PuScalingFactorProducer::new(&pu_config(DataFormat::MiniAod), source.clone());

    // mc scaled by 8/4 = 2 -> ratio [1, 1, 2, 0]
    for (n, expected) in [(0.2, 1.0), (2.5, 2.0), (3.7, 0.0), (9.0, 0.0)] {
        let vars = run(&producer, &pileup_event(n));
        assert_relative_eq!(vars.get("puScalingFactor").unwrap(), expected, epsilon = 1e-12);
    }
    assert_eq!(source.loads.load(Ordering::SeqCst), 1);
}

#[test]
fn pileup_factor_is_one_for_data() {
    // configured histograms do not even exist
    let producer =
        PuScalingFactorProducer::new(&pu_config(DataFormat::MiniAodCustom), Arc::new(MemoryHistogramSource::new()));
    let mut ev = pileup_event(2.5);
    ev.is_real_data = true;
    assert_eq!(run(&producer, &ev).get("puScalingFactor"), Some(1.0));
}

#[test]
fn pileup_factor_is_one_for_other_formats_and_missing_pileup() {
    let source = pileup_source();
    let aod = PuScalingFactorProducer::new(&pu_config(DataFormat::Aod), source.clone());
    assert_eq!(run(&aod, &pileup_event(2.5)).get("puScalingFactor"), Some(1.0));

    assert_eq!(source.loads.load(Ordering::SeqCst), 0);

    let mini = PuScalingFactorProducer::new(&pu_config(DataFormat::MiniAod), source.clone());
    assert_eq!(run(&mini, &Event::default()).get("puScalingFactor"), Some(1.0));
    assert_eq!(source.loads.load(Ordering::SeqCst), 1);
}

#[test]
fn pileup_missing_weight_file_reported_without_pileupinfos() {
    let producer =
        PuScalingFactorProducer::new(&pu_config(DataFormat::MiniAod), Arc::new(MemoryHistogramSource::new()));
    let mut vars = EventVariables::new();
    let err = producer.add_variables(&Event::default(), &mut vars).unwrap_err();
    assert!(matches!(err, ProducerError::MissingWeightFile { .. }));
    assert!(err.is_fatal());
    assert!(vars.get("puScalingFactor").is_none());
}

#[test]
fn producer_set_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut writer = RootFileWriter::new();
    writer.add_histogram("isrWeight", &weight_hist("isrWeight", 0.9, 0.05)).unwrap();
    writer.write(dir.path().join("isr.root")).unwrap();

    let cfg_path = dir.path().join("analysis.yaml");
    std::fs::write(
        &cfg_path,
        "isr_weight: { pdg_ids: [1000006], weight_file: isr.root, weight_hist: [isrWeight] }\n\
         tracks: { min_delta_r_for_fiducial_track: 0.05 }\n\
         user_variables:\n  - { collection: mcparticles, member: pt, key: leadingGenPt }\n",
    )
    .unwrap();
    let config: AnalysisConfig = read_config(&cfg_path).unwrap();

    let set = ProducerSet::from_config(
        &config,
        Arc::new(RootHistogramSource),
        Arc::new(TypeRegistry::with_builtin_types()),
    )
    .unwrap();
    assert_eq!(set.names(), vec!["isrWeightProducer", "trackProducer", "leadingGenPt"]);

    let vars = set.process(&simulated_event(vec![McParticle::new(1000006, 150.0, 0.0, 0.0, None)])).unwrap();
    assert_relative_eq!(vars.get("isrWeight").unwrap(), 0.9, epsilon = 1e-12);
    assert_eq!(vars.get("nTracks"), Some(0.0));
    assert_relative_eq!(vars.get("leadingGenPt").unwrap(), 150.0, epsilon = 1e-12);
}

#[test]
fn producer_set_stops_on_missing_weight_file() {
    let config = AnalysisConfig {
        isr_weight: Some(IsrWeightConfig {
            pdg_ids: vec![1000006],
            weight_file: Some("/no/such/dir/isr.root".into()),
            weight_hist: vec!["w".into()],
        }),
        ..Default::default()
    };
    let set = ProducerSet::from_config(
        &config,
        Arc::new(RootHistogramSource),
        Arc::new(TypeRegistry::with_builtin_types()),
    )
    .unwrap();
    let err = set.process(&simulated_event(vec![])).unwrap_err();
    assert!(matches!(err, ProducerError::MissingWeightFile { .. }));
}
