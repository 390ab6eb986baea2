//! Component E: maps a hospital's (frequently idiosyncratic) CSV header row
//! onto the fixed logical schema the transform stage expects.
//!
//! Every hospital publishes its own column names for the same underlying
//! fields (`"Gross Charge"`, `"gross_charge_amount"`, `"Chargemaster Gross"`,
//! ...), so headers are matched by normalized substring rather than by exact
//! name, the same rule the original ETL used.

use std::path::Path;

use regex::Regex;

use crate::error::TransformError;

/// One `code`/`code_type` column pair, numbered the way hospitals publish
/// multiple code systems per row (`code|1`, `code|1|type`, `code|2`, ...).
#[derive(Debug, Clone)]
pub struct CodePair {
    pub code_col: String,
    pub type_col: String,
}

/// The logical columns discovered in a header row.
#[derive(Debug, Clone, Default)]
pub struct ColumnMapping {
    pub setting: Option<String>,
    pub description: Option<String>,
    pub payer_name: Option<String>,
    pub plan_name: Option<String>,
    pub modifier: Option<String>,
    pub gross: Option<String>,
    pub discounted: Option<String>,
    pub min_negotiated: Option<String>,
    pub max_negotiated: Option<String>,
    pub negotiated_dollar: Option<String>,
    pub negotiated_percent: Option<String>,
    pub negotiated_algorithm: Option<String>,
    pub estimated: Option<String>,
    pub methodology: Option<String>,
    pub note: Option<String>,
    pub code_pairs: Vec<CodePair>,
}

/// Lowercases and strips non-alphanumeric characters, so `"Gross Charge"`,
/// `"gross-charge"`, and `"GROSS_CHARGE"` all normalize identically.
pub(crate) fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Discovers the logical columns in `headers`. At least one code/type pair
/// and a setting column are required; anything else missing is tolerated
/// (absent optional fields are simply not populated downstream).
pub fn discover(headers: &[String], path: &Path) -> Result<ColumnMapping, TransformError> {
    let code_re = Regex::new(r"^code(\d+)$").unwrap();
    let type_re = Regex::new(r"^code(\d+)type$").unwrap();

    let normalized: Vec<(String, &String)> = headers.iter().map(|h| (normalize(h), h)).collect();

    let mut code_cols: Vec<(u32, String)> = Vec::new();
    let mut type_cols: Vec<(u32, String)> = Vec::new();
    for (norm, original) in &normalized {
        if let Some(caps) = code_re.captures(norm) {
            let n: u32 = caps[1].parse().unwrap();
            code_cols.push((n, (*original).clone()));
        } else if let Some(caps) = type_re.captures(norm) {
            let n: u32 = caps[1].parse().unwrap();
            type_cols.push((n, (*original).clone()));
        }
    }
    code_cols.sort_by_key(|(n, _)| *n);
    let code_pairs: Vec<CodePair> = code_cols
        .into_iter()
        .filter_map(|(n, code_col)| {
            type_cols
                .iter()
                .find(|(tn, _)| *tn == n)
                .map(|(_, type_col)| CodePair {
                    code_col,
                    type_col: type_col.clone(),
                })
        })
        .collect();

    let find = |needles: &[&str]| -> Option<String> {
        normalized
            .iter()
            .find(|(norm, _)| needles.iter().any(|n| norm.contains(n)))
            .map(|(_, original)| (*original).clone())
    };

    let mapping = ColumnMapping {
        setting: find(&["setting"]),
        description: find(&["description"]),
        payer_name: normalized
            .iter()
            .find(|(norm, _)| norm.contains("payer") && norm.contains("name"))
            .map(|(_, o)| (*o).clone()),
        plan_name: normalized
            .iter()
            .find(|(norm, _)| norm.contains("plan") && norm.contains("name"))
            .map(|(_, o)| (*o).clone()),
        modifier: find(&["modifier"]),
        gross: find(&["gross"]),
        discounted: find(&["discounted"]),
        min_negotiated: find(&["min"]),
        max_negotiated: find(&["max"]),
        negotiated_dollar: normalized
            .iter()
            .find(|(norm, _)| norm.contains("negotiated") && norm.contains("dollar"))
            .map(|(_, o)| (*o).clone()),
        negotiated_percent: normalized
            .iter()
            .find(|(norm, _)| norm.contains("negotiated") && norm.contains("percent"))
            .map(|(_, o)| (*o).clone()),
        negotiated_algorithm: normalized
            .iter()
            .find(|(norm, _)| norm.contains("negotiated") && norm.contains("algorithm"))
            .map(|(_, o)| (*o).clone()),
        estimated: find(&["estimated"]),
        methodology: find(&["methodology"]),
        note: find(&["note"]),
        code_pairs,
    };

    if mapping.code_pairs.is_empty() || mapping.setting.is_none() {
        let mut missing = Vec::new();
        if mapping.code_pairs.is_empty() {
            missing.push("code/code_type pair".to_string());
        }
        if mapping.setting.is_none() {
            missing.push("setting".to_string());
        }
        return Err(TransformError::MissingColumns {
            path: path.to_path_buf(),
            missing,
        });
    }

    Ok(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn discovers_numbered_code_pairs() {
        let h = headers(&["setting", "code|1", "code|1|type", "code|2", "code|2|type"]);
        let mapping = discover(&h, &PathBuf::from("x.csv")).unwrap();
        assert_eq!(mapping.code_pairs.len(), 2);
        assert_eq!(mapping.code_pairs[0].code_col, "code|1");
        assert_eq!(mapping.code_pairs[0].type_col, "code|1|type");
    }

    #[test]
    fn matches_headers_regardless_of_casing_and_punctuation() {
        let h = headers(&["Setting", "Code|1", "Code|1|Type", "Gross Charge", "Payer Name", "Plan Name"]);
        let mapping = discover(&h, &PathBuf::from("x.csv")).unwrap();
        assert_eq!(mapping.gross.as_deref(), Some("Gross Charge"));
        assert_eq!(mapping.payer_name.as_deref(), Some("Payer Name"));
        assert_eq!(mapping.plan_name.as_deref(), Some("Plan Name"));
    }

    #[test]
    fn errors_when_no_code_pair_found() {
        let h = headers(&["setting", "gross_charge"]);
        let result = discover(&h, &PathBuf::from("x.csv"));
        assert!(result.is_err());
    }
}
