//! Component I: batched three-table upsert into the shared relational store.
//!
//! Scoped to one hospital per call: delete that hospital's prior
//! `standard_charges`/`payer_charges` rows, then upsert its metadata row,
//! then upsert services and charges — all inside one transaction, so a
//! failed run never leaves a hospital half-replaced.

use async_trait::async_trait;
use sqlx::{PgPool, QueryBuilder};
use tracing::info;

use crate::error::LoadError;
use crate::transform::TransformOutput;

const BATCH_SIZE: usize = 5000;

/// Abstraction over "persist one MRF file's transform output", so the
/// pipeline coordinator can be tested against an in-process fake instead of
/// a real database.
#[async_trait]
pub trait Loader: Send + Sync {
    async fn load(&self, output: &TransformOutput) -> Result<(), LoadError>;
}

/// Postgres-backed [`Loader`].
pub struct PgLoader {
    pool: PgPool,
}

impl PgLoader {
    pub fn new(pool: PgPool) -> Self {
        PgLoader { pool }
    }
}

#[async_trait]
impl Loader for PgLoader {
    async fn load(&self, output: &TransformOutput) -> Result<(), LoadError> {
        let hospital_key = output
            .hospital
            .key
            .as_ref()
            .ok_or(LoadError::MissingHospitalKey)?
            .as_str()
            .to_string();

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM standard_charges WHERE hospital_key = $1")
            .bind(&hospital_key)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM payer_charges WHERE hospital_key = $1")
            .bind(&hospital_key)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO hospitals (hospital_key, name, location, address, last_updated, type_2_npi, financial_aid_policy) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (hospital_key) DO UPDATE SET \
                name = EXCLUDED.name, \
                location = EXCLUDED.location, \
                address = EXCLUDED.address, \
                last_updated = EXCLUDED.last_updated, \
                type_2_npi = EXCLUDED.type_2_npi, \
                financial_aid_policy = EXCLUDED.financial_aid_policy",
        )
        .bind(&hospital_key)
        .bind(&output.hospital.name)
        .bind(&output.hospital.location)
        .bind(&output.hospital.address)
        .bind(&output.hospital.last_updated)
        .bind(&output.hospital.type_2_npi)
        .bind(&output.hospital.financial_aid_policy)
        .execute(&mut *tx)
        .await?;

        for chunk in output.services.chunks(BATCH_SIZE) {
            if chunk.is_empty() {
                continue;
            }
            let mut qb = QueryBuilder::new(
                "INSERT INTO services (service_id, setting, code, description, code_type, modifiers) ",
            );
            qb.push_values(chunk, |mut b, s| {
                b.push_bind(&s.service_id)
                    .push_bind(s.setting.as_str())
                    .push_bind(&s.code)
                    .push_bind(&s.description)
                    .push_bind(s.code_type.as_str())
                    .push_bind(&s.modifiers);
            });
            qb.push(" ON CONFLICT (service_id) DO NOTHING");
            qb.build().execute(&mut *tx).await?;
        }

        for chunk in output.standard_charges.chunks(BATCH_SIZE) {
            if chunk.is_empty() {
                continue;
            }
            let mut qb = QueryBuilder::new(
                "INSERT INTO standard_charges \
                 (hospital_key, service_id, gross_charge, discounted_cash_price, \
                  min_negotiated_charge, max_negotiated_charge) ",
            );
            qb.push_values(chunk, |mut b, c| {
                b.push_bind(&c.hospital_key)
                    .push_bind(&c.service_id)
                    .push_bind(&c.gross_charge)
                    .push_bind(&c.discounted_cash_price)
                    .push_bind(&c.min_negotiated_charge)
                    .push_bind(&c.max_negotiated_charge);
            });
            qb.push(
                " ON CONFLICT (hospital_key, service_id) DO UPDATE SET \
                  gross_charge = COALESCE(EXCLUDED.gross_charge, standard_charges.gross_charge), \
                  discounted_cash_price = COALESCE(EXCLUDED.discounted_cash_price, standard_charges.discounted_cash_price), \
                  min_negotiated_charge = COALESCE(EXCLUDED.min_negotiated_charge, standard_charges.min_negotiated_charge), \
                  max_negotiated_charge = COALESCE(EXCLUDED.max_negotiated_charge, standard_charges.max_negotiated_charge)",
            );
            qb.build().execute(&mut *tx).await?;
        }

        for chunk in output.payer_charges.chunks(BATCH_SIZE) {
            if chunk.is_empty() {
                continue;
            }
            let mut qb = QueryBuilder::new(
                "INSERT INTO payer_charges \
                 (hospital_key, service_id, payer_name, plan_name, modifiers, negotiated_dollar, \
                  negotiated_percent, negotiated_algorithm, estimated_amount, methodology, additional_notes) ",
            );
            qb.push_values(chunk, |mut b, c| {
                b.push_bind(&c.hospital_key)
                    .push_bind(&c.service_id)
                    .push_bind(&c.payer_name)
                    .push_bind(&c.plan_name)
                    .push_bind(&c.modifiers)
                    .push_bind(&c.negotiated_dollar)
                    .push_bind(&c.negotiated_percent)
                    .push_bind(&c.negotiated_algorithm)
                    .push_bind(&c.estimated_amount)
                    .push_bind(&c.methodology)
                    .push_bind(&c.additional_notes);
            });
            // Unlike standard_charges, a payer's reported rate fully replaces
            // whatever was there before — no COALESCE merge.
            qb.push(
                " ON CONFLICT (hospital_key, service_id, payer_name, plan_name) DO UPDATE SET \
                  modifiers = EXCLUDED.modifiers, \
                  negotiated_dollar = EXCLUDED.negotiated_dollar, \
                  negotiated_percent = EXCLUDED.negotiated_percent, \
                  negotiated_algorithm = EXCLUDED.negotiated_algorithm, \
                  estimated_amount = EXCLUDED.estimated_amount, \
                  methodology = EXCLUDED.methodology, \
                  additional_notes = EXCLUDED.additional_notes",
            );
            qb.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;

        info!(
            hospital_key,
            services = output.services.len(),
            standard_charges = output.standard_charges.len(),
            payer_charges = output.payer_charges.len(),
            "loaded"
        );

        Ok(())
    }
}
