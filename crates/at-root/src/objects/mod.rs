//! Dispatch from stored class names to object decoders.

mod th1;

pub(crate) use th1::{TH1_VERSION, TH1D_VERSION, TAXIS_VERSION};

use crate::error::{Result, RootError};
use crate::histogram::Histogram;

/// Whether `class_name` is a 1D histogram this crate can decode.
pub fn is_histogram_class(class_name: &str) -> bool {
    matches!(class_name, "TH1D" | "TH1F")
}

/// Decode a histogram from an uncompressed object payload.
pub fn read_histogram(payload: &[u8], class_name: &str) -> Result<Histogram> {
    match class_name {
        "TH1D" => th1::read_th1(payload, th1::BinStorage::F64),
        "TH1F" => th1::read_th1(payload, th1::BinStorage::F32),
        _ => Err(RootError::UnsupportedClass(class_name.to_string())),
    }
}
