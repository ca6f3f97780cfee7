//! Integration tests: write weight files and read them back.

use approx::assert_relative_eq;
use at_root::{Histogram, RootError, RootFile, RootFileWriter};

fn isr_histogram() -> Histogram {
    let mut h = Histogram::with_edges("isrWeight", vec![0.0, 50.0, 100.0, 200.0, 400.0]).unwrap();
    h.title = "ISR weight vs. p_{T}".to_string();
    h.bin_content = vec![1.02, 0.95, 0.88, 0.79];
    h.sumw2 = Some(vec![0.0001, 0.0004, 0.0009, 0.0025]);
    h.overflow = 0.5;
    h.flow_sumw2 = Some((0.0, 0.01));
    h.entries = 1234.0;
    h
}

fn pileup_histogram(name: &str, contents: &[f64]) -> Histogram {
    let mut h = Histogram::uniform(name, contents.len(), 0.0, contents.len() as f64).unwrap();
    h.bin_content = contents.to_vec();
    h
}

#[test]
fn written_file_round_trips_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("weights.root");

    let mut writer = RootFileWriter::new();
    writer
        .add_histogram("isrWeight", &isr_histogram())
        .unwrap()
        .add_histogram("pileup/mc", &pileup_histogram("mc", &[1.0, 4.0, 9.0]))
        .unwrap()
        .add_histogram("pileup/2016/data", &pileup_histogram("data", &[2.0, 3.0, 5.0]))
        .unwrap();
    writer.write(&path).unwrap();

    let f = RootFile::open(&path).expect("failed to open written file");
    let keys = f.list_keys().unwrap();
    let names: Vec<_> = keys.iter().map(|k| (k.name.as_str(), k.class_name.as_str())).collect();
    assert_eq!(names, vec![("isrWeight", "TH1D"), ("pileup", "TDirectoryFile")]);

    let nested = f.list_keys_in("pileup").unwrap();
    assert_eq!(nested.len(), 2);
    assert_eq!(nested[1].name, "2016");
    assert!(nested[1].is_directory && !keys[0].is_directory);

    let h = f.get_histogram("isrWeight").unwrap();
    assert_eq!(h, isr_histogram());
    assert_relative_eq!(h.error(3), 0.03, epsilon = 1e-12);

    let data = f.get_histogram("pileup/2016/data").unwrap();
    assert_eq!(data.name, "data");
    assert_eq!(data.bin_content, vec![2.0, 3.0, 5.0]);
    assert_eq!(data.bin_edges, vec![0.0, 1.0, 2.0, 3.0]);
    assert!(data.sumw2.is_none());
}

#[test]
fn missing_objects_are_reported() {
    let mut writer = RootFileWriter::new();
    writer.add_histogram("dir/h", &pileup_histogram("h", &[1.0])).unwrap();
    let f = RootFile::from_bytes(writer.to_bytes(), "mem.root").unwrap();

    assert!(matches!(f.get_histogram("nope"), Err(RootError::KeyNotFound(_))));
    assert!(matches!(f.get_histogram("dir/nope"), Err(RootError::KeyNotFound(_))));
    assert!(matches!(f.get_histogram(""), Err(RootError::KeyNotFound(_))));
    assert!(matches!(f.get_histogram("dir"), Err(RootError::UnsupportedClass(_))));
    assert!(matches!(f.get_histogram("dir/h/x"), Err(RootError::Deserialization(_))));
}

#[test]
fn truncated_file_fails_cleanly() {
    let mut writer = RootFileWriter::new();
    writer.add_histogram("h", &isr_histogram()).unwrap();
    let mut bytes = writer.to_bytes();
    bytes.truncate(bytes.len() - 40);
    match RootFile::from_bytes(bytes, "cut.root") {
        Ok(f) => assert!(f.get_histogram("h").is_err()),
        Err(_) => {}
    }
}
