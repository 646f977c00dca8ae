use std::sync::Arc;

use chrono::{Duration, Utc};
use crates::{
    domain::{
        entities::financial_records::{FinancialRecordEntity, InsertFinancialRecordEntity},
        repositories::{financial_records::FinancialRecordRepository, tickets::TicketRepository},
        value_objects::enums::financial_record_statuses::FinancialRecordStatus,
    },
    payments::link_token::{self, BillingLinkClaims},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::config_model::Billing;

#[derive(Debug, Error)]
pub enum BillingLinkError {
    /// Payer-facing catch-all: signature, expiry, and dangling references all
    /// collapse into this so the response does not reveal which check failed.
    #[error("invalid or expired link")]
    InvalidLink,
    #[error("billing reference not found")]
    NotFound,
    #[error("tenant does not own this billing reference")]
    Forbidden,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl BillingLinkError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            BillingLinkError::InvalidLink => StatusCode::NOT_FOUND,
            BillingLinkError::NotFound => StatusCode::NOT_FOUND,
            BillingLinkError::Forbidden => StatusCode::FORBIDDEN,
            BillingLinkError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type BillingLinkResult<T> = std::result::Result<T, BillingLinkError>;

#[derive(Debug, Serialize)]
pub struct IssuedLink {
    pub url: String,
    pub token: String,
    pub record_id: Uuid,
    pub expires_at_epoch_ms: i64,
}

/// Issues shareable payment links and resolves them back into charges.
/// Issuing lazily creates the financial record on the first request for a
/// ticket that has none yet.
pub struct BillingLinkUseCase<R, T>
where
    R: FinancialRecordRepository + Send + Sync + 'static,
    T: TicketRepository + Send + Sync + 'static,
{
    record_repo: Arc<R>,
    ticket_repo: Arc<T>,
    config: Billing,
}

impl<R, T> BillingLinkUseCase<R, T>
where
    R: FinancialRecordRepository + Send + Sync + 'static,
    T: TicketRepository + Send + Sync + 'static,
{
    pub fn new(record_repo: Arc<R>, ticket_repo: Arc<T>, config: Billing) -> Self {
        Self {
            record_repo,
            ticket_repo,
            config,
        }
    }

    pub async fn issue_link(
        &self,
        tenant_id: Uuid,
        reference_id: Uuid,
    ) -> BillingLinkResult<IssuedLink> {
        let record = self.resolve_or_create_record(tenant_id, reference_id).await?;

        let ttl = Duration::seconds(self.config.link_ttl_seconds as i64);
        let claims = BillingLinkClaims::new(tenant_id, record.id, ttl, Utc::now());
        let token = link_token::encode(&claims, &self.config.link_secret);

        let url = format!(
            "{}/pagamento/{}",
            self.config.public_base_url.trim_end_matches('/'),
            token
        );

        info!(
            %tenant_id,
            record_id = %record.id,
            expires_at_epoch_ms = claims.expires_at_epoch_ms,
            "billing_links: link issued"
        );

        Ok(IssuedLink {
            url,
            token,
            record_id: record.id,
            expires_at_epoch_ms: claims.expires_at_epoch_ms,
        })
    }

    /// Validates the bearer token and loads the charge it grants access to.
    pub async fn resolve_link(
        &self,
        token: &str,
    ) -> BillingLinkResult<(BillingLinkClaims, FinancialRecordEntity)> {
        let claims =
            link_token::decode(token, &self.config.link_secret).map_err(|err| {
                warn!(error = %err, "billing_links: token rejected");
                BillingLinkError::InvalidLink
            })?;

        let record = self
            .record_repo
            .find_by_id(claims.reference_id)
            .await?
            .ok_or(BillingLinkError::InvalidLink)?;

        // A token can only grant access to a record its grantor owns.
        if record.user_id != claims.tenant_id {
            warn!(
                record_id = %record.id,
                token_tenant = %claims.tenant_id,
                "billing_links: token tenant does not own record"
            );
            return Err(BillingLinkError::InvalidLink);
        }

        Ok((claims, record))
    }

    async fn resolve_or_create_record(
        &self,
        tenant_id: Uuid,
        reference_id: Uuid,
    ) -> BillingLinkResult<FinancialRecordEntity> {
        if let Some(record) = self.record_repo.find_by_id(reference_id).await? {
            return self.owned(tenant_id, record);
        }

        if let Some(record) = self.record_repo.find_by_ticket(reference_id).await? {
            return self.owned(tenant_id, record);
        }

        let ticket = self
            .ticket_repo
            .find_by_id(reference_id)
            .await?
            .ok_or(BillingLinkError::NotFound)?;
        if ticket.user_id != tenant_id {
            return Err(BillingLinkError::Forbidden);
        }

        let record = self
            .record_repo
            .create(InsertFinancialRecordEntity {
                user_id: ticket.user_id,
                ticket_id: Some(ticket.id),
                client_id: ticket.client_id,
                amount: ticket.amount,
                status: FinancialRecordStatus::Pending.to_string(),
                due_date: ticket.completed_at.unwrap_or_else(Utc::now),
                description: None,
            })
            .await?;

        info!(
            %tenant_id,
            ticket_id = %ticket.id,
            record_id = %record.id,
            "billing_links: financial record created on first link request"
        );

        Ok(record)
    }

    fn owned(
        &self,
        tenant_id: Uuid,
        record: FinancialRecordEntity,
    ) -> BillingLinkResult<FinancialRecordEntity> {
        if record.user_id != tenant_id {
            let err = BillingLinkError::Forbidden;
            warn!(
                %tenant_id,
                record_id = %record.id,
                status = err.status_code().as_u16(),
                "billing_links: tenant does not own record"
            );
            return Err(err);
        }

        Ok(record)
    }
}
