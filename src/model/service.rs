//! The billed-service identity: setting, code type, and the deterministic
//! service id that ties a `standard_charges`/`payer_charges` row back to a
//! `services` row.

use sha2::{Digest, Sha256};

use crate::error::TransformError;

/// Care setting a charge applies to. Closed: anything else is a transform error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Setting {
    Inpatient,
    Outpatient,
}

impl Setting {
    /// Parses a setting value read from source data (`_normalize_setting` in the
    /// original CSV ETL, `setting.capitalize()` in the original JSON ETL — both
    /// collapse to this fixed two-value domain, with "Both" expanded by the caller
    /// into one row per setting rather than represented here).
    pub fn parse(raw: &str, path: &std::path::Path) -> Result<Self, TransformError> {
        let normalized = raw.trim().to_ascii_lowercase();
        match normalized.as_str() {
            s if s.contains("inpatient") && !s.contains("outpatient") => Ok(Setting::Inpatient),
            s if s.contains("outpatient") && !s.contains("inpatient") => Ok(Setting::Outpatient),
            _ => Err(TransformError::UnknownSetting {
                path: path.to_path_buf(),
                value: raw.to_string(),
            }),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Setting::Inpatient => "Inpatient",
            Setting::Outpatient => "Outpatient",
        }
    }

    /// True when `raw` names both settings at once and should be expanded into
    /// one [`Setting::Inpatient`] row and one [`Setting::Outpatient`] row.
    pub fn is_both(raw: &str) -> bool {
        let normalized = raw.trim().to_ascii_lowercase();
        normalized.contains("both")
            || (normalized.contains("inpatient") && normalized.contains("outpatient"))
    }
}

/// Billing code family. Closed: unrecognized values are rejected, not coerced
/// into a catch-all variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeType {
    MsDrg,
    AprDrg,
    Cpt,
    Hcpcs,
}

impl CodeType {
    pub fn parse(raw: &str, path: &std::path::Path) -> Result<Self, TransformError> {
        let normalized = raw.trim().to_ascii_uppercase();
        match normalized.as_str() {
            "MS-DRG" | "MS DRG" | "MSDRG" => Ok(CodeType::MsDrg),
            "APR-DRG" | "APR DRG" | "APRDRG" => Ok(CodeType::AprDrg),
            "CPT" => Ok(CodeType::Cpt),
            "HCPCS" => Ok(CodeType::Hcpcs),
            _ => Err(TransformError::UnknownCodeType {
                path: path.to_path_buf(),
                value: raw.to_string(),
            }),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CodeType::MsDrg => "MS-DRG",
            CodeType::AprDrg => "APR-DRG",
            CodeType::Cpt => "CPT",
            CodeType::Hcpcs => "HCPCS",
        }
    }
}

/// A billed service: the tuple a `service_id` hash is derived from, plus the
/// `description`/`modifiers` attributes the `services` table carries
/// alongside it (§3 Service, §6 `services(service_id, setting, code,
/// description, type, modifiers?)`).
#[derive(Debug, Clone)]
pub struct Service {
    pub service_id: String,
    pub setting: Setting,
    pub code: String,
    pub code_type: CodeType,
    pub description: Option<String>,
    pub modifiers: Option<String>,
}

impl Service {
    /// Builds the CSV-sourced identity hash: `sha256("{setting}|{code}|{code_type}")`.
    /// Modifiers are intentionally excluded from the hash here; the JSON path
    /// includes them (see [`Service::from_json_fields`]) — a preserved
    /// asymmetry, not a bug to fix. `modifiers` is still carried as a plain
    /// attribute on the row, the same way the CSV source's own modifier
    /// column is carried onto `payer_charges` without affecting identity.
    pub fn from_csv_fields(
        setting: Setting,
        code: &str,
        code_type: CodeType,
        description: Option<String>,
        modifiers: Option<String>,
    ) -> Self {
        let service_id = hash_parts(&[setting.as_str(), code, code_type.as_str()]);
        Service {
            service_id,
            setting,
            code: code.to_string(),
            code_type,
            description,
            modifiers,
        }
    }

    /// Builds the JSON-sourced identity hash:
    /// `sha256("{setting}|{code}|{code_type}|{modifiers}")`.
    pub fn from_json_fields(
        setting: Setting,
        code: &str,
        code_type: CodeType,
        modifiers: &str,
        description: Option<String>,
    ) -> Self {
        let service_id = hash_parts(&[setting.as_str(), code, code_type.as_str(), modifiers]);
        Service {
            service_id,
            setting,
            code: code.to_string(),
            code_type,
            description,
            modifiers: if modifiers.is_empty() {
                None
            } else {
                Some(modifiers.to_string())
            },
        }
    }
}

fn hash_parts(parts: &[&str]) -> String {
    let joined = parts.join("|");
    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    format!("{:x}", hasher.finalize())
}
