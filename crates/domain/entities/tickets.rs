use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::infra::db::postgres::schema::tickets;

/// Service-order subset the billing subsystem reads: ownership, the billable
/// amount, and the payment date it propagates on settlement.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = tickets)]
pub struct TicketEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub client_id: Option<Uuid>,
    pub amount: Decimal,
    pub status: String,
    pub payment_date: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
