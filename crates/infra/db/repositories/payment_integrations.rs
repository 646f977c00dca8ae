use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{RunQueryDsl, insert_into, prelude::*};
use uuid::Uuid;

use crate::{
    domain::{
        entities::payment_integrations::{
            PaymentIntegrationEntity, UpsertPaymentIntegrationEntity,
        },
        repositories::payment_integrations::PaymentIntegrationRepository,
    },
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::payment_integrations},
};

pub struct PaymentIntegrationPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PaymentIntegrationPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PaymentIntegrationRepository for PaymentIntegrationPostgres {
    async fn find_by_user_and_provider(
        &self,
        user_id: Uuid,
        provider: String,
    ) -> Result<Option<PaymentIntegrationEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = payment_integrations::table
            .filter(payment_integrations::user_id.eq(user_id))
            .filter(payment_integrations::provider.eq(provider))
            .order(payment_integrations::updated_at.desc())
            .select(PaymentIntegrationEntity::as_select())
            .first::<PaymentIntegrationEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn upsert(&self, integration: UpsertPaymentIntegrationEntity) -> Result<Uuid> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let existing = payment_integrations::table
            .filter(payment_integrations::user_id.eq(integration.user_id))
            .filter(payment_integrations::provider.eq(&integration.provider))
            .select(payment_integrations::id)
            .first::<Uuid>(&mut conn)
            .optional()?;

        let id = match existing {
            Some(id) => {
                diesel::update(payment_integrations::table.find(id))
                    .set((
                        payment_integrations::status.eq(&integration.status),
                        payment_integrations::access_token.eq(&integration.access_token),
                        payment_integrations::refresh_token.eq(&integration.refresh_token),
                        payment_integrations::token_expires_at.eq(integration.token_expires_at),
                        payment_integrations::public_key.eq(&integration.public_key),
                        payment_integrations::provider_user_id.eq(&integration.provider_user_id),
                        payment_integrations::updated_at.eq(Utc::now()),
                    ))
                    .execute(&mut conn)?;
                id
            }
            None => insert_into(payment_integrations::table)
                .values(&integration)
                .returning(payment_integrations::id)
                .get_result::<Uuid>(&mut conn)?,
        };

        Ok(id)
    }
}
