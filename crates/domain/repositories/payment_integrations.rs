use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::payment_integrations::{
    PaymentIntegrationEntity, UpsertPaymentIntegrationEntity,
};

#[async_trait]
#[automock]
pub trait PaymentIntegrationRepository {
    async fn find_by_user_and_provider(
        &self,
        user_id: Uuid,
        provider: String,
    ) -> Result<Option<PaymentIntegrationEntity>>;

    async fn upsert(&self, integration: UpsertPaymentIntegrationEntity) -> Result<Uuid>;
}
