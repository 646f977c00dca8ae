use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, prelude::*};
use uuid::Uuid;

use crate::{
    domain::repositories::technician_affiliations::TechnicianAffiliationRepository,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::technician_affiliations},
};

pub struct TechnicianAffiliationPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl TechnicianAffiliationPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl TechnicianAffiliationRepository for TechnicianAffiliationPostgres {
    async fn is_accepted(&self, company_id: Uuid, technician_id: Uuid) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let affiliation = technician_affiliations::table
            .filter(technician_affiliations::company_id.eq(company_id))
            .filter(technician_affiliations::technician_id.eq(technician_id))
            .filter(technician_affiliations::status.eq("accepted"))
            .select(technician_affiliations::id)
            .first::<Uuid>(&mut conn)
            .optional()?;

        Ok(affiliation.is_some())
    }
}
