//! Domain types shared across the transform and load stages.

pub mod charge;
pub mod hospital;
pub mod service;

pub use charge::{PayerCharge, StandardCharge};
pub use hospital::Hospital;
pub use service::{CodeType, Service, Setting};
