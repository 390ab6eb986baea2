//! The hospital metadata row, and the key used to scope a full-replace load.

/// The column a hospital's charge rows are scoped by when the loader deletes
/// and re-inserts `standard_charges`/`payer_charges` for a run.
///
/// The CSV source keys hospitals by license number (derived from a matched
/// header's last two characters plus the digits of the cell value — a
/// preserved quirk, not a bug to fix: the state suffix comes from the header
/// text, not the value). The JSON source keys hospitals by name instead,
/// since the JSON MRF schema carries no license-number field at all.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HospitalKey {
    LicenseNumber(String),
    Name(String),
}

impl HospitalKey {
    pub fn as_str(&self) -> &str {
        match self {
            HospitalKey::LicenseNumber(s) => s,
            HospitalKey::Name(s) => s,
        }
    }
}

/// A hospital's metadata, as extracted from either an MRF CSV header block or
/// an MRF JSON document's top-level fields.
#[derive(Debug, Clone, Default)]
pub struct Hospital {
    pub key: Option<HospitalKey>,
    pub name: Option<String>,
    pub location: Option<String>,
    pub address: Option<String>,
    pub last_updated: Option<chrono::NaiveDate>,
    pub type_2_npi: Option<String>,
    pub financial_aid_policy: Option<String>,
}

impl Hospital {
    /// Derives the CSV license-number key: digits of `value` joined to the
    /// last two characters of `header`. The state always comes from the
    /// header text the value was matched under, never from the value itself.
    pub fn license_key_from_header(header: &str, value: &str) -> HospitalKey {
        let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
        let state_suffix: String = header.chars().rev().take(2).collect::<Vec<_>>().into_iter().rev().collect();
        HospitalKey::LicenseNumber(format!("{digits}|{state_suffix}"))
    }

    pub fn name_key(name: &str) -> HospitalKey {
        HospitalKey::Name(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn license_key_pulls_state_from_header_not_value() {
        let key = Hospital::license_key_from_header("license_number_OH", "123-456-789");
        assert_eq!(key, HospitalKey::LicenseNumber("123456789|OH".to_string()));
    }

    #[test]
    fn license_key_strips_non_digit_characters() {
        let key = Hospital::license_key_from_header("hdr_TX", "AB-0012");
        assert_eq!(key, HospitalKey::LicenseNumber("0012|TX".to_string()));
    }
}
