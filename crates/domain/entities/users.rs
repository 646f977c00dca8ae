use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::users;

/// Tenant account. The PIX merchant fields feed the static payload builder;
/// `created_at` anchors the signup trial window.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = users)]
pub struct UserEntity {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    pub status: String,
    pub pix_key: Option<String>,
    pub merchant_name: Option<String>,
    pub merchant_city: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
