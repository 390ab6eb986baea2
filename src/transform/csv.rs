//! Component F: transforms an MRF CSV into services and charges.
//!
//! Layout mirrors the original ETL's expectations: row 1 is a metadata
//! header, row 2 is the matching metadata values (hospital name, license
//! number, address, ...), row 3 is the real column header for the charge
//! table, and row 4 onward is the charge data itself.

use std::path::Path;

use bigdecimal::BigDecimal;
use csv::{ReaderBuilder, StringRecord};
use encoding_rs::WINDOWS_1252;
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::TransformError;
use crate::model::charge::{PayerCharge, StandardCharge};
use crate::model::hospital::Hospital;
use crate::model::service::{CodeType, Service, Setting};
use crate::transform::column_discoverer::{self, normalize, ColumnMapping};
use crate::transform::filter::{self, CodeCandidate};
use crate::transform::TransformOutput;

const CHUNK_ROWS: usize = 5000;

pub fn transform(path: &Path) -> Result<TransformOutput, TransformError> {
    let bytes = std::fs::read(path).map_err(|source| TransformError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    // MRF CSVs are not reliably UTF-8; decode as Windows-1252 (a superset of
    // Latin-1 in practice for this data) before handing off to the csv reader.
    let (decoded, _, _) = WINDOWS_1252.decode(&bytes);

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(decoded.as_bytes());
    let mut rows = reader.records();

    let header_row = next_row(&mut rows, path)?;
    let value_row = next_row(&mut rows, path)?;
    let hospital = extract_hospital(&header_row, &value_row);

    let column_header_row = next_row(&mut rows, path)?;
    let headers: Vec<String> = column_header_row.iter().map(|s| s.to_string()).collect();
    let mapping = column_discoverer::discover(&headers, path)?;

    let hospital_key = hospital
        .key
        .as_ref()
        .map(|k| k.as_str().to_string())
        .unwrap_or_default();

    let mut services = Vec::new();
    let mut standard_charges = Vec::new();
    let mut payer_charges = Vec::new();

    for (row_idx, record) in rows.enumerate() {
        let record = record.map_err(|source| TransformError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        process_row(
            &headers,
            &record,
            &mapping,
            &hospital_key,
            path,
            &mut services,
            &mut standard_charges,
            &mut payer_charges,
        )?;
        if (row_idx + 1) % CHUNK_ROWS == 0 {
            debug!(path = %path.display(), rows = row_idx + 1, "processed chunk");
        }
    }

    info!(
        path = %path.display(),
        services = services.len(),
        standard_charges = standard_charges.len(),
        payer_charges = payer_charges.len(),
        "csv transform complete"
    );

    Ok(TransformOutput {
        hospital,
        services,
        standard_charges,
        payer_charges,
    })
}

fn next_row<R: std::io::Read>(
    rows: &mut csv::StringRecordsIter<'_, R>,
    path: &Path,
) -> Result<StringRecord, TransformError> {
    rows.next()
        .ok_or_else(|| TransformError::MissingHospitalIdentity {
            path: path.to_path_buf(),
        })?
        .map_err(|source| TransformError::Csv {
            path: path.to_path_buf(),
            source,
        })
}

fn extract_hospital(header_row: &StringRecord, value_row: &StringRecord) -> Hospital {
    let mut hospital = Hospital::default();
    for (header, value) in header_row.iter().zip(value_row.iter()) {
        let norm = normalize(header);
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        if norm.contains("license") {
            hospital.key = Some(Hospital::license_key_from_header(header, value));
        } else if hospital.name.is_none() && norm.contains("name") && !norm.contains("license") {
            hospital.name = Some(value.to_string());
        } else if norm.contains("address") {
            hospital.address = Some(value.to_string());
        } else if norm.contains("updated") {
            hospital.last_updated = chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").ok();
        } else if norm.contains("npi") {
            hospital.type_2_npi = Some(value.to_string());
        }
    }
    hospital
}

fn field(headers: &[String], record: &StringRecord, name: &Option<String>) -> Option<String> {
    let name = name.as_ref()?;
    let idx = headers.iter().position(|h| h == name)?;
    let value = record.get(idx)?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn field_decimal(headers: &[String], record: &StringRecord, name: &Option<String>) -> Option<BigDecimal> {
    field(headers, record, name).and_then(|s| BigDecimal::from_str(&s).ok())
}

#[allow(clippy::too_many_arguments)]
fn process_row(
    headers: &[String],
    record: &StringRecord,
    mapping: &ColumnMapping,
    hospital_key: &str,
    path: &Path,
    services: &mut Vec<Service>,
    standard_charges: &mut Vec<StandardCharge>,
    payer_charges: &mut Vec<PayerCharge>,
) -> Result<(), TransformError> {
    let Some(raw_setting) = field(headers, record, &mapping.setting) else {
        return Ok(());
    };

    let candidates: Vec<CodeCandidate> = mapping
        .code_pairs
        .iter()
        .filter_map(|pair| {
            let code_idx = headers.iter().position(|h| h == &pair.code_col)?;
            let type_idx = headers.iter().position(|h| h == &pair.type_col)?;
            let code = record.get(code_idx)?.trim();
            let type_raw = record.get(type_idx)?.trim();
            if code.is_empty() || type_raw.is_empty() {
                return None;
            }
            let code_type = CodeType::parse(type_raw, path).ok()?;
            Some(CodeCandidate {
                code: code.to_string(),
                code_type,
            })
        })
        .collect();

    let Some(candidate) = filter::first_allowed(&candidates) else {
        return Ok(());
    };

    let settings = if Setting::is_both(&raw_setting) {
        vec![Setting::Inpatient, Setting::Outpatient]
    } else {
        vec![Setting::parse(&raw_setting, path)?]
    };

    let description = field(headers, record, &mapping.description);
    let modifiers = field(headers, record, &mapping.modifier);
    let gross = field_decimal(headers, record, &mapping.gross);
    let discounted = field_decimal(headers, record, &mapping.discounted);
    let min_negotiated = field_decimal(headers, record, &mapping.min_negotiated);
    let max_negotiated = field_decimal(headers, record, &mapping.max_negotiated);

    let payer_name = field(headers, record, &mapping.payer_name);
    let plan_name = field(headers, record, &mapping.plan_name);
    let negotiated_dollar = field_decimal(headers, record, &mapping.negotiated_dollar);
    let negotiated_percent = field_decimal(headers, record, &mapping.negotiated_percent);
    let negotiated_algorithm = field(headers, record, &mapping.negotiated_algorithm);
    let estimated = field_decimal(headers, record, &mapping.estimated);
    let methodology = field(headers, record, &mapping.methodology);
    let note = field(headers, record, &mapping.note);

    for setting in settings {
        let service = Service::from_csv_fields(
            setting,
            &candidate.code,
            candidate.code_type,
            description.clone(),
            modifiers.clone(),
        );

        standard_charges.push(StandardCharge {
            hospital_key: hospital_key.to_string(),
            service_id: service.service_id.clone(),
            gross_charge: gross.clone(),
            discounted_cash_price: discounted.clone(),
            min_negotiated_charge: min_negotiated.clone(),
            max_negotiated_charge: max_negotiated.clone(),
        });

        // A row missing either the payer name or the plan name contributes no
        // payer_charges row — it carries no identifiable negotiated rate.
        if let (Some(payer), Some(plan)) = (&payer_name, &plan_name) {
            payer_charges.push(PayerCharge {
                hospital_key: hospital_key.to_string(),
                service_id: service.service_id.clone(),
                payer_name: payer.clone(),
                plan_name: plan.clone(),
                modifiers: modifiers.clone(),
                negotiated_dollar: negotiated_dollar.clone(),
                negotiated_percent: negotiated_percent.clone(),
                negotiated_algorithm: negotiated_algorithm.clone(),
                estimated_amount: estimated.clone(),
                methodology: methodology.clone(),
                additional_notes: note.clone(),
            });
        }

        services.push(service);
    }

    Ok(())
}
