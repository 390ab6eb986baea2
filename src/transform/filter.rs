//! Component H: the charge filter shared by the CSV and JSON transforms.
//!
//! A row survives if its code/type pair is in the unconditional whitelist
//! (`MS-DRG`, `APR-DRG`, any code) or the conditional whitelist (`CPT`,
//! `HCPCS`, code must be in [`crate::whitelist::allowed_cpt_hcpcs_codes`]).

use crate::model::service::CodeType;
use crate::whitelist;

/// One `(code, code_type)` candidate read off a source row.
#[derive(Debug, Clone)]
pub struct CodeCandidate {
    pub code: String,
    pub code_type: CodeType,
}

/// Picks the first candidate in `candidates` that passes the whitelist, in
/// the order given — mirroring the original CSV transform's "first matching
/// code/type column pair wins" rule, and the original JSON transform's
/// "first code in `code_information` that is relevant" rule.
pub fn first_allowed(candidates: &[CodeCandidate]) -> Option<&CodeCandidate> {
    candidates
        .iter()
        .find(|c| whitelist::is_allowed(c.code_type, &c.code))
}
