use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{RunQueryDsl, insert_into, prelude::*, update};
use uuid::Uuid;

use crate::{
    domain::{
        entities::financial_records::{FinancialRecordEntity, InsertFinancialRecordEntity},
        repositories::financial_records::FinancialRecordRepository,
        value_objects::enums::financial_record_statuses::FinancialRecordStatus,
    },
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::financial_records},
};

pub struct FinancialRecordPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl FinancialRecordPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl FinancialRecordRepository for FinancialRecordPostgres {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<FinancialRecordEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = financial_records::table
            .find(id)
            .select(FinancialRecordEntity::as_select())
            .first::<FinancialRecordEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn find_by_ticket(&self, ticket_id: Uuid) -> Result<Option<FinancialRecordEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = financial_records::table
            .filter(financial_records::ticket_id.eq(ticket_id))
            .order(financial_records::created_at.asc())
            .select(FinancialRecordEntity::as_select())
            .first::<FinancialRecordEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn create(&self, record: InsertFinancialRecordEntity) -> Result<FinancialRecordEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = insert_into(financial_records::table)
            .values(&record)
            .returning(FinancialRecordEntity::as_returning())
            .get_result::<FinancialRecordEntity>(&mut conn)?;

        Ok(result)
    }

    async fn mark_paid(&self, id: Uuid, paid_at: DateTime<Utc>) -> Result<FinancialRecordEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = update(financial_records::table)
            .filter(financial_records::id.eq(id))
            .set((
                financial_records::status.eq(FinancialRecordStatus::Paid.to_string()),
                financial_records::paid_at.eq(Some(paid_at)),
            ))
            .returning(FinancialRecordEntity::as_returning())
            .get_result::<FinancialRecordEntity>(&mut conn)?;

        Ok(result)
    }
}
