use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::payment_integrations;

/// Per-tenant gateway connection (OAuth credentials and their expiry).
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = payment_integrations)]
pub struct PaymentIntegrationEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub provider: String,
    pub status: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub public_key: Option<String>,
    pub provider_user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentIntegrationEntity {
    /// Connected means the tenant can be charged through the gateway.
    pub fn is_connected(&self) -> bool {
        self.status == "active" && self.access_token.is_some()
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payment_integrations)]
pub struct UpsertPaymentIntegrationEntity {
    pub user_id: Uuid,
    pub provider: String,
    pub status: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub public_key: Option<String>,
    pub provider_user_id: Option<String>,
}
