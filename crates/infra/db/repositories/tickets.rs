use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{RunQueryDsl, prelude::*, update};
use uuid::Uuid;

use crate::{
    domain::{entities::tickets::TicketEntity, repositories::tickets::TicketRepository},
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::tickets},
};

pub struct TicketPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl TicketPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl TicketRepository for TicketPostgres {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<TicketEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = tickets::table
            .find(id)
            .select(TicketEntity::as_select())
            .first::<TicketEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn set_payment_date(&self, id: Uuid, payment_date: DateTime<Utc>) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(tickets::table)
            .filter(tickets::id.eq(id))
            .set(tickets::payment_date.eq(Some(payment_date)))
            .execute(&mut conn)?;

        Ok(())
    }
}
