//! Fixed whitelists that gate which billed services survive the charge filter.
//!
//! These are the same two-tier whitelist the original hospital-charge ETL used:
//! diagnosis-related-group codes (`MS-DRG`, `APR-DRG`) are accepted unconditionally,
//! while procedure codes (`CPT`, `HCPCS`) must additionally appear in
//! [`ALLOWED_CPT_HCPCS_CODES`].

use std::collections::HashSet;
use std::sync::OnceLock;

use crate::model::service::CodeType;

/// Code types accepted regardless of the code value.
pub const ALLOWED_TYPES_UNCONDITIONAL: [CodeType; 2] = [CodeType::MsDrg, CodeType::AprDrg];

/// Code types accepted only when the code value is in [`ALLOWED_CPT_HCPCS_CODES`].
pub const ALLOWED_TYPES_CONDITIONAL: [CodeType; 2] = [CodeType::Cpt, CodeType::Hcpcs];

/// Procedure codes allowed for `CPT`/`HCPCS` services, fixed at build time.
const ALLOWED_CPT_HCPCS_CODE_LIST: &[&str] = &[
    "00670", "01214", "01215", "01402", "01961", "01967", "12001", "17134", "19120", "20526",
    "20550", "20552", "20600", "20605", "20606", "20610", "20611", "20612", "20931", "22514",
    "22551", "22845", "23350", "24220", "25246", "27093", "27096", "27130", "27134", "27369",
    "27447", "27648", "29826", "29827", "29881", "32555", "33206", "33207", "33208", "33274",
    "36415", "38571", "42820", "43235", "43239", "45378", "45380", "45385", "45391", "46415",
    "47000", "47562", "49083", "49505", "50200", "51700", "51701", "51798", "52000", "55700",
    "55866", "58340", "59400", "59510", "59610", "62322", "62323", "63047", "63048", "63060",
    "64447", "64483", "66291", "66821", "66984", "70110", "70140", "70160", "70200", "70220",
    "70260", "70330", "70336", "70355", "70450", "70460", "70470", "70480", "70481", "70482",
    "70486", "70487", "70490", "70491", "70492", "70540", "70543", "70551", "70553", "71045",
    "71046", "71100", "71101", "71120", "71130", "71250", "71260", "71270", "71550", "71552",
    "72020", "72040", "72070", "72072", "72082", "72100", "72110", "72125", "72126", "72128",
    "72129", "72131", "72132", "72141", "72146", "72148", "72156", "72157", "72158", "72170",
    "72192", "72193", "72194", "72195", "72197", "72202", "72220", "73000", "73010", "73030",
    "73040", "73050", "73080", "73085", "73090", "73110", "73115", "73130", "73140", "73200",
    "73201", "73218", "73220", "73221", "73223", "73502", "73525", "73552", "73562", "73564",
    "73580", "73590", "73610", "73630", "73650", "73660", "73700", "73701", "73702", "73718",
    "73720", "73721", "73723", "73925", "73971", "74018", "74150", "74153", "74160", "74170",
    "74176", "74177", "74178", "74181", "74183", "74220", "74270", "74280", "74740", "75012",
    "75557", "75561", "75565", "76000", "76376", "76380", "76506", "76536", "76604", "76641",
    "76642", "76700", "76705", "76770", "76775", "76776", "76801", "76805", "76811", "76813",
    "76815", "76816", "76817", "76819", "76830", "76831", "76856", "76857", "76870", "76872",
    "76882", "76942", "76946", "77002", "77063", "77065", "77066", "77067", "77072", "77073",
    "77074", "77075", "77077", "78452", "78815", "78816", "80048", "80053", "80055", "80061",
    "80069", "80076", "81000", "81001", "81002", "81003", "82040", "82043", "82247", "82248",
    "82306", "82310", "82374", "82435", "82565", "82570", "82607", "82728", "82947", "83036",
    "83540", "83550", "83735", "83970", "84075", "84100", "84132", "84153", "84154", "84155",
    "84156", "84439", "84443", "84450", "84460", "85025", "85027", "85610", "85652", "85730",
    "86140", "87086", "88300", "88307", "88313", "88346", "90832", "90834", "90837", "90846",
    "90847", "90853", "92961", "93000", "93005", "93010", "93016", "93017", "93018", "93225",
    "93226", "93227", "93306", "93308", "93312", "93320", "93325", "93350", "93452", "93650",
    "93656", "93880", "93882", "93886", "93888", "93892", "93893", "93923", "93926", "93930",
    "93931", "93970", "93975", "93976", "93978", "93979", "94070", "94640", "94668", "94760",
    "94762", "95720", "95810", "96101", "97110", "97161", "97162", "97163", "99152", "99153",
    "99203", "99204", "99205", "99211", "99243", "99244", "99385", "99386", "99421", "99422",
    "99423", "C8928",
];

static ALLOWED_CPT_HCPCS_CODES_SET: OnceLock<HashSet<&'static str>> = OnceLock::new();

/// The ~450 CPT/HCPCS procedure codes accepted by the charge filter.
pub fn allowed_cpt_hcpcs_codes() -> &'static HashSet<&'static str> {
    ALLOWED_CPT_HCPCS_CODES_SET.get_or_init(|| ALLOWED_CPT_HCPCS_CODE_LIST.iter().copied().collect())
}

/// Whether `code_type` is accepted unconditionally (MS-DRG, APR-DRG).
pub fn is_unconditionally_allowed(code_type: CodeType) -> bool {
    ALLOWED_TYPES_UNCONDITIONAL.contains(&code_type)
}

/// Whether `code_type` is a conditionally-allowed family (CPT, HCPCS).
pub fn is_conditional_type(code_type: CodeType) -> bool {
    ALLOWED_TYPES_CONDITIONAL.contains(&code_type)
}

/// Applies the full two-tier whitelist rule: `(type, code) -> bool`.
pub fn is_allowed(code_type: CodeType, code: &str) -> bool {
    is_unconditionally_allowed(code_type)
        || (is_conditional_type(code_type) && allowed_cpt_hcpcs_codes().contains(code))
}
