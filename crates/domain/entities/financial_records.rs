use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::value_objects::enums::financial_record_statuses::FinancialRecordStatus;
use crate::infra::db::postgres::schema::financial_records;

/// One receivable owned by a tenant, optionally tied to a ticket and client.
/// Mutated only by the settlement engine; never deleted here.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = financial_records)]
pub struct FinancialRecordEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ticket_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub amount: Decimal,
    pub status: String,
    pub due_date: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FinancialRecordEntity {
    pub fn is_paid(&self) -> bool {
        FinancialRecordStatus::from_str(&self.status) == FinancialRecordStatus::Paid
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = financial_records)]
pub struct InsertFinancialRecordEntity {
    pub user_id: Uuid,
    pub ticket_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub amount: Decimal,
    pub status: String,
    pub due_date: DateTime<Utc>,
    pub description: Option<String>,
}
