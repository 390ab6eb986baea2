//! The two charge-fact tables a service's pricing is loaded into.

use bigdecimal::BigDecimal;

/// A hospital's self-reported standard charges for one service.
/// `description` lives on the service itself (see [`crate::model::service::Service`]),
/// not here — the schema's `standard_charges` table carries no description column.
#[derive(Debug, Clone)]
pub struct StandardCharge {
    pub hospital_key: String,
    pub service_id: String,
    pub gross_charge: Option<BigDecimal>,
    pub discounted_cash_price: Option<BigDecimal>,
    pub min_negotiated_charge: Option<BigDecimal>,
    pub max_negotiated_charge: Option<BigDecimal>,
}

/// One payer/plan's negotiated charge for a service. Rows lacking both a
/// payer name and a plan name are dropped by the transform stage before
/// reaching the loader (§4.F/§4.G "skip row if payer_name or plan_name is
/// None" — preserved as a precondition of this type, not re-checked here).
#[derive(Debug, Clone)]
pub struct PayerCharge {
    pub hospital_key: String,
    pub service_id: String,
    pub payer_name: String,
    pub plan_name: String,
    pub modifiers: Option<String>,
    pub negotiated_dollar: Option<BigDecimal>,
    pub negotiated_percent: Option<BigDecimal>,
    pub negotiated_algorithm: Option<String>,
    pub estimated_amount: Option<BigDecimal>,
    pub methodology: Option<String>,
    pub additional_notes: Option<String>,
}
