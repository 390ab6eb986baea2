//! Components E-H: turns an extracted MRF file into loadable rows.

pub mod column_discoverer;
pub mod csv;
pub mod filter;
pub mod json;

use std::path::Path;

use crate::error::TransformError;
use crate::model::charge::{PayerCharge, StandardCharge};
use crate::model::hospital::Hospital;
use crate::model::service::Service;

/// Everything one MRF file contributes: its hospital's metadata plus the
/// services and charge rows the loader will upsert.
#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub hospital: Hospital,
    pub services: Vec<Service>,
    pub standard_charges: Vec<StandardCharge>,
    pub payer_charges: Vec<PayerCharge>,
}

/// Dispatches to the CSV or JSON transform based on `path`'s extension.
pub fn transform(path: &Path) -> Result<TransformOutput, TransformError> {
    match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()) {
        Some(ext) if ext == "csv" => csv::transform(path),
        Some(ext) if ext == "json" => json::transform(path),
        _ => Err(TransformError::MissingColumns {
            path: path.to_path_buf(),
            missing: vec!["recognized file extension (.csv or .json)".to_string()],
        }),
    }
}
