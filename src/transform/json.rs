//! Component G: transforms an MRF JSON document into services and charges.
//!
//! The JSON MRF schema nests payer-specific rates two levels deeper than the
//! CSV schema (`standard_charge_information[].standard_charges[].payers_information[]`),
//! and carries no hospital license number — hospitals are keyed by name
//! instead (see [`crate::model::hospital::HospitalKey`]).

use std::path::Path;

use bigdecimal::BigDecimal;
use serde::Deserialize;
use tracing::info;

use crate::error::TransformError;
use crate::model::charge::{PayerCharge, StandardCharge};
use crate::model::hospital::Hospital;
use crate::model::service::{CodeType, Service, Setting};
use crate::transform::filter::{self, CodeCandidate};
use crate::transform::TransformOutput;

#[derive(Debug, Deserialize)]
struct MrfDocument {
    hospital_name: Option<String>,
    #[serde(alias = "hospital_location")]
    location_name: Option<String>,
    #[serde(default)]
    hospital_address: Vec<String>,
    license_information: Option<LicenseInformation>,
    #[serde(default)]
    type_2_npi: Vec<String>,
    #[serde(default)]
    financial_aid_policy: Vec<String>,
    last_updated_on: Option<String>,
    #[serde(default)]
    standard_charge_information: Vec<StandardChargeInformation>,
}

#[derive(Debug, Deserialize)]
struct LicenseInformation {
    license_number: String,
    state: String,
}

#[derive(Debug, Deserialize)]
struct StandardChargeInformation {
    description: Option<String>,
    #[serde(default)]
    code_information: Vec<CodeInformation>,
    #[serde(default)]
    standard_charges: Vec<ChargeEntry>,
}

#[derive(Debug, Deserialize)]
struct CodeInformation {
    code: String,
    #[serde(rename = "type")]
    code_type: String,
}

#[derive(Debug, Deserialize)]
struct ChargeEntry {
    setting: String,
    #[serde(default)]
    modifiers: Vec<String>,
    gross_charge: Option<BigDecimal>,
    discounted_cash_price: Option<BigDecimal>,
    minimum: Option<BigDecimal>,
    maximum: Option<BigDecimal>,
    #[serde(default)]
    payers_information: Vec<PayerInformation>,
}

#[derive(Debug, Deserialize)]
struct PayerInformation {
    payer_name: Option<String>,
    plan_name: Option<String>,
    standard_charge_dollar: Option<BigDecimal>,
    standard_charge_percentage: Option<BigDecimal>,
    standard_charge_algorithm: Option<String>,
    estimated_amount: Option<BigDecimal>,
    methodology: Option<String>,
    additional_generic_notes: Option<String>,
}

pub fn transform(path: &Path) -> Result<TransformOutput, TransformError> {
    let text = std::fs::read_to_string(path).map_err(|source| TransformError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    // MRF JSON is published with a UTF-8 BOM; strip it before parsing.
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);

    let doc: MrfDocument = serde_json::from_str(text).map_err(|source| TransformError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let hospital = extract_hospital(&doc);
    let hospital_key = hospital
        .key
        .as_ref()
        .map(|k| k.as_str().to_string())
        .unwrap_or_default();

    let mut services = Vec::new();
    let mut standard_charges = Vec::new();
    let mut payer_charges = Vec::new();

    for item in &doc.standard_charge_information {
        let candidates: Vec<CodeCandidate> = item
            .code_information
            .iter()
            .filter_map(|c| {
                let code_type = CodeType::parse(&c.code_type, path).ok()?;
                Some(CodeCandidate {
                    code: c.code.clone(),
                    code_type,
                })
            })
            .collect();

        let Some(candidate) = filter::first_allowed(&candidates) else {
            continue;
        };

        for charge in &item.standard_charges {
            let modifiers = charge.modifiers.join(",");
            let settings = if Setting::is_both(&charge.setting) {
                vec![Setting::Inpatient, Setting::Outpatient]
            } else {
                vec![Setting::parse(&charge.setting, path)?]
            };

            for setting in settings {
                let service = Service::from_json_fields(
                    setting,
                    &candidate.code,
                    candidate.code_type,
                    &modifiers,
                    item.description.clone(),
                );

                standard_charges.push(StandardCharge {
                    hospital_key: hospital_key.clone(),
                    service_id: service.service_id.clone(),
                    gross_charge: charge.gross_charge.clone(),
                    discounted_cash_price: charge.discounted_cash_price.clone(),
                    min_negotiated_charge: charge.minimum.clone(),
                    max_negotiated_charge: charge.maximum.clone(),
                });

                for payer in &charge.payers_information {
                    if let (Some(payer_name), Some(plan_name)) =
                        (&payer.payer_name, &payer.plan_name)
                    {
                        payer_charges.push(PayerCharge {
                            hospital_key: hospital_key.clone(),
                            service_id: service.service_id.clone(),
                            payer_name: payer_name.clone(),
                            plan_name: plan_name.clone(),
                            modifiers: service.modifiers.clone(),
                            negotiated_dollar: payer.standard_charge_dollar.clone(),
                            negotiated_percent: payer.standard_charge_percentage.clone(),
                            negotiated_algorithm: payer.standard_charge_algorithm.clone(),
                            estimated_amount: payer.estimated_amount.clone(),
                            methodology: payer.methodology.clone(),
                            additional_notes: payer.additional_generic_notes.clone(),
                        });
                    }
                }

                services.push(service);
            }
        }
    }

    info!(
        path = %path.display(),
        services = services.len(),
        standard_charges = standard_charges.len(),
        payer_charges = payer_charges.len(),
        "json transform complete"
    );

    Ok(TransformOutput {
        hospital,
        services,
        standard_charges,
        payer_charges,
    })
}

fn extract_hospital(doc: &MrfDocument) -> Hospital {
    let key = doc
        .license_information
        .as_ref()
        .map(|lic| crate::model::hospital::HospitalKey::LicenseNumber(format!("{}|{}", lic.license_number, lic.state)))
        .or_else(|| doc.hospital_name.as_ref().map(|n| Hospital::name_key(n)));

    Hospital {
        key,
        name: doc.hospital_name.clone(),
        location: doc.location_name.clone(),
        address: if doc.hospital_address.is_empty() {
            None
        } else {
            Some(doc.hospital_address.join("|"))
        },
        last_updated: doc
            .last_updated_on
            .as_deref()
            .and_then(|s| chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()),
        type_2_npi: if doc.type_2_npi.is_empty() {
            None
        } else {
            Some(doc.type_2_npi.join("|"))
        },
        financial_aid_policy: if doc.financial_aid_policy.is_empty() {
            None
        } else {
            Some(doc.financial_aid_policy.join("|"))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_json(dir: &std::path::Path, contents: &str) -> std::path::PathBuf {
        let path = dir.join("mrf.json");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    const SAMPLE: &str = r#"{
        "hospital_name": "Example Hospital",
        "last_updated_on": "2026-01-01",
        "standard_charge_information": [
            {
                "description": "Office visit",
                "code_information": [{"code": "99213", "type": "CPT"}],
                "standard_charges": [
                    {
                        "setting": "both",
                        "modifiers": ["25"],
                        "gross_charge": 250.00,
                        "payers_information": [
                            {"payer_name": "Acme Payer", "plan_name": "Gold Plan", "standard_charge_dollar": 180.00}
                        ]
                    }
                ]
            }
        ]
    }"#;

    #[test]
    fn transforms_nested_json_with_both_setting_expansion() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_json(dir.path(), SAMPLE);
        let output = transform(&path).unwrap();
        assert_eq!(output.hospital.name.as_deref(), Some("Example Hospital"));
        assert_eq!(output.services.len(), 2);
        assert_eq!(output.payer_charges.len(), 2);
    }

    #[test]
    fn json_service_id_diverges_from_csv_equivalent_due_to_modifiers() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_json(dir.path(), SAMPLE);
        let output = transform(&path).unwrap();
        let json_id = &output.services[0].service_id;
        let csv_id = Service::from_csv_fields(
            output.services[0].setting,
            &output.services[0].code,
            output.services[0].code_type,
            None,
            None,
        )
        .service_id;
        assert_ne!(json_id, &csv_id);
    }

    #[test]
    fn drops_items_whose_only_code_is_not_whitelisted() {
        let dir = tempfile::tempdir().unwrap();
        let contents = r#"{
            "hospital_name": "Example Hospital",
            "standard_charge_information": [
                {
                    "description": "Unlisted",
                    "code_information": [{"code": "00000", "type": "CPT"}],
                    "standard_charges": [{"setting": "outpatient"}]
                }
            ]
        }"#;
        let path = write_json(dir.path(), contents);
        let output = transform(&path).unwrap();
        assert!(output.services.is_empty());
    }
}
