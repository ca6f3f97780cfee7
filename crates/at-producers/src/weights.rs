//! Lazily loaded histogram weights.
//!
//! A [`HistogramCache`] fetches a fixed list of histograms from one file the
//! first time it is asked, turns them into a derived value (a
//! [`HistogramWeightSet`] for ISR, a correction histogram for pileup) and
//! keeps only that value. The file is never touched again.

use crate::{ProducerError, Result};
use at_root::{Histogram, RootFile};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Where weight histograms come from.
pub trait HistogramSource: Send + Sync {
    /// Open `path` and fetch every histogram in `names`, in order.
    ///
    /// An unopenable file is [`ProducerError::MissingWeightFile`]; an absent
    /// histogram is [`ProducerError::MissingHistogram`].
    fn load(&self, path: &Path, names: &[String]) -> Result<Vec<Histogram>>;
}

/// Reads histograms from ROOT files on disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct RootHistogramSource;

impl HistogramSource for RootHistogramSource {
    fn load(&self, path: &Path, names: &[String]) -> Result<Vec<Histogram>> {
        let file = RootFile::open(path)
            .map_err(|source| ProducerError::MissingWeightFile { path: path.to_path_buf(), source })?;
        let histograms = names
            .iter()
            .map(|name| {
                file.get_histogram(name).map_err(|source| ProducerError::MissingHistogram {
                    path: path.to_path_buf(),
                    name: name.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        log::info!("loaded {} histogram(s) from {}", histograms.len(), path.display());
        Ok(histograms)
    }
}

/// In-memory histograms keyed by (file, histogram path).
#[derive(Debug, Default, Clone)]
pub struct MemoryHistogramSource {
    files: HashMap<PathBuf, HashMap<String, Histogram>>,
}

impl MemoryHistogramSource {
    /// Empty source; every file is missing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a histogram under `path` / `name`.
    pub fn insert(&mut self, path: impl Into<PathBuf>, name: impl Into<String>, histogram: Histogram) -> &mut Self {
        self.files.entry(path.into()).or_default().insert(name.into(), histogram);
        self
    }
}

impl HistogramSource for MemoryHistogramSource {
    fn load(&self, path: &Path, names: &[String]) -> Result<Vec<Histogram>> {
        let file = self.files.get(path).ok_or_else(|| ProducerError::MissingWeightFile {
            path: path.to_path_buf(),
            source: at_root::RootError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "no such file")),
        })?;
        names
            .iter()
            .map(|name| {
                file.get(name).cloned().ok_or_else(|| ProducerError::MissingHistogram {
                    path: path.to_path_buf(),
                    name: name.clone(),
                    source: at_root::RootError::KeyNotFound(name.clone()),
                })
            })
            .collect()
    }
}

/// Nominal weight with its one-sigma variations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    /// Product of bin contents.
    pub nominal: f64,
    /// Product of `content + error`.
    pub up: f64,
    /// Product of `max(content - error, 0)`.
    pub down: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self { nominal: 1.0, up: 1.0, down: 1.0 }
    }
}

/// Ordered histograms whose values multiply into one weight.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramWeightSet {
    histograms: Vec<Histogram>,
}

impl HistogramWeightSet {
    /// Wrap loaded histograms.
    pub fn new(histograms: Vec<Histogram>) -> Self {
        Self { histograms }
    }

    /// Histograms in multiplication order.
    pub fn histograms(&self) -> &[Histogram] {
        &self.histograms
    }

    /// Composite weight at `x`. Values past the last bin read the last bin.
    pub fn evaluate(&self, x: f64) -> Weights {
        self.histograms.iter().fold(Weights::default(), |w, h| {
            let (content, error) = h.evaluate_clamped(x);
            Weights {
                nominal: w.nominal * content,
                up: w.up * (content + error),
                down: w.down * (content - error).max(0.0),
            }
        })
    }
}

/// Turns freshly loaded histograms into the cached value.
pub type BuildFn<T> = fn(Vec<Histogram>) -> Result<T>;

/// Load-once cache over a [`HistogramSource`].
///
/// Exactly one caller performs the load; concurrent callers wait on the lock
/// and then share the result. A failed load leaves the cache empty.
pub struct HistogramCache<T> {
    source: Arc<dyn HistogramSource>,
    path: PathBuf,
    names: Vec<String>,
    build: BuildFn<T>,
    state: Mutex<Option<Arc<T>>>,
}

impl<T> HistogramCache<T> {
    /// Cache for `names` in `path`, built with `build` on first use.
    pub fn new(source: Arc<dyn HistogramSource>, path: impl Into<PathBuf>, names: Vec<String>, build: BuildFn<T>) -> Self {
        Self { source, path: path.into(), names, build, state: Mutex::new(None) }
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `true` once a load has succeeded.
    pub fn is_loaded(&self) -> bool {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// The cached value, loading it on first call.
    pub fn get(&self) -> Result<Arc<T>> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(value) = state.as_ref() {
            return Ok(Arc::clone(value));
        }
        let histograms = self.source.load(&self.path, &self.names)?;
        let value = Arc::new((self.build)(histograms)?);
        *state = Some(Arc::clone(&value));
        Ok(value)
    }
}

impl<T> std::fmt::Debug for HistogramCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistogramCache")
            .field("path", &self.path)
            .field("names", &self.names)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn flat(name: &str, content: f64, error: f64) -> Histogram {
        let mut h = Histogram::uniform(name, 4, 0.0, 400.0).unwrap();
        h.bin_content = vec![content; 4];
        h.sumw2 = Some(vec![error * error; 4]);
        h
    }

    struct Counting {
        inner: MemoryHistogramSource,
        loads: AtomicUsize,
    }

    impl HistogramSource for Counting {
        fn load(&self, path: &Path, names: &[String]) -> Result<Vec<Histogram>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.inner.load(path, names)
        }
    }

    fn ok_set(h: Vec<Histogram>) -> Result<HistogramWeightSet> {
        Ok(HistogramWeightSet::new(h))
    }

    #[test]
    fn test_composite_weights() {
        let set = HistogramWeightSet::new(vec![flat("a", 0.9, 0.05), flat("b", 0.8, 0.1)]);
        let w = set.evaluate(150.0);
        assert_relative_eq!(w.nominal, 0.72, epsilon = 1e-12);
        assert_relative_eq!(w.up, 0.95 * 0.9, epsilon = 1e-12);
        assert_relative_eq!(w.down, 0.85 * 0.7, epsilon = 1e-12);
    }

    #[test]
    fn test_down_variation_floors_at_zero() {
        let set = HistogramWeightSet::new(vec![flat("a", 0.1, 0.5)]);
        let w = set.evaluate(10.0);
        assert_eq!(w.down, 0.0);
        assert_relative_eq!(w.up, 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_set_is_neutral() {
        assert_eq!(HistogramWeightSet::new(vec![]).evaluate(5.0), Weights::default());
    }

    #[test]
    fn test_past_last_edge_reads_last_bin() {
        let mut h = flat("a", 1.0, 0.0);
        h.bin_content[3] = 0.5;
        h.overflow = 123.0;
        let set = HistogramWeightSet::new(vec![h]);
        assert_eq!(set.evaluate(400.0).nominal, 0.5);
        assert_eq!(set.evaluate(1e9).nominal, 0.5);
    }

    #[test]
    fn test_cache_loads_once() {
        let mut inner = MemoryHistogramSource::new();
        inner.insert("w.root", "a", flat("a", 2.0, 0.0));
        let source = Arc::new(Counting { inner, loads: AtomicUsize::new(0) });
        let cache = HistogramCache::new(source.clone(), "w.root", vec!["a".into()], ok_set);
        assert!(!cache.is_loaded());
        for _ in 0..5 {
            assert_eq!(cache.get().unwrap().evaluate(1.0).nominal, 2.0);
        }
        assert!(cache.is_loaded());
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cache_loads_once_across_threads() {
        let mut inner = MemoryHistogramSource::new();
        inner.insert("w.root", "a", flat("a", 2.0, 0.0));
        let source = Arc::new(Counting { inner, loads: AtomicUsize::new(0) });
        let cache = HistogramCache::new(source.clone(), "w.root", vec!["a".into()], ok_set);
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| cache.get().unwrap());
            }
        });
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_file_and_histogram() {
        let mut src = MemoryHistogramSource::new();
        src.insert("w.root", "a", flat("a", 1.0, 0.0));
        let src: Arc<dyn HistogramSource> = Arc::new(src);

        let cache = HistogramCache::new(src.clone(), "nope.root", vec!["a".into()], ok_set);
        assert!(matches!(cache.get(), Err(ProducerError::MissingWeightFile { .. })));
        assert!(!cache.is_loaded());

        let cache = HistogramCache::new(src, "w.root", vec!["a".into(), "b".into()], ok_set);
        match cache.get() {
            Err(ProducerError::MissingHistogram { name, .. }) => assert_eq!(name, "b"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_root_source_reports_missing_file() {
        let err = RootHistogramSource.load(Path::new("/definitely/not/here.root"), &["h".into()]).unwrap_err();
        assert!(matches!(err, ProducerError::MissingWeightFile { .. }));
        assert!(err.is_fatal());
    }
}
