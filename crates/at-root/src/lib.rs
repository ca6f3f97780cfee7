//! # at-root
//!
//! Reads the ROOT files that hold AnaTools weight histograms, without
//! linking ROOT itself.
//!
//! Coverage is limited to what reweighting needs. That means the file
//! header, nested directory key lists, compressed payloads and
//! `TH1D`/`TH1F` objects. A [`Histogram`] owns its bins and follows ROOT
//! binning rules, so the file can be closed once histograms are read.
//! [`RootFileWriter`] produces small uncompressed files for tests and tools.
//!
//! ```no_run
//! # fn main() -> at_root::Result<()> {
//! let file = at_root::RootFile::open("isr_weights.root")?;
//! for key in file.list_keys()? {
//!     println!("{} {}", key.class_name, key.name);
//! }
//! let (w, err) = file.get_histogram("isrWeight")?.evaluate_clamped(125.0);
//! println!("{w} +- {err}");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod decompress;
pub mod directory;
pub mod error;
pub mod file;
pub mod histogram;
pub mod key;
pub mod objects;
pub mod reader;
pub mod writer;

pub use error::{Result, RootError};
pub use file::RootFile;
pub use histogram::Histogram;
pub use key::KeyInfo;
pub use writer::RootFileWriter;
