use std::sync::Arc;

use chrono::{DateTime, Utc};
use crates::domain::{
    entities::financial_records::{FinancialRecordEntity, InsertFinancialRecordEntity},
    repositories::{
        financial_records::FinancialRecordRepository,
        technician_affiliations::TechnicianAffiliationRepository, tickets::TicketRepository,
        users::UserRepository,
    },
    value_objects::enums::{
        financial_record_statuses::FinancialRecordStatus, user_roles::UserRole,
    },
};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("financial record not found")]
    NotFound,
    #[error("tenant does not own this financial record")]
    Forbidden,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl SettlementError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            SettlementError::NotFound => StatusCode::NOT_FOUND,
            SettlementError::Forbidden => StatusCode::FORBIDDEN,
            SettlementError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type SettlementResult<T> = std::result::Result<T, SettlementError>;

/// Applies pending→paid transitions. The transition is a monotonic one-way
/// flag: settling an already-paid record is a no-op that returns the current
/// row, which is what makes webhook redelivery safe.
pub struct SettlementUseCase<R, T, U, A>
where
    R: FinancialRecordRepository + Send + Sync + 'static,
    T: TicketRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    A: TechnicianAffiliationRepository + Send + Sync + 'static,
{
    record_repo: Arc<R>,
    ticket_repo: Arc<T>,
    user_repo: Arc<U>,
    affiliation_repo: Arc<A>,
}

impl<R, T, U, A> SettlementUseCase<R, T, U, A>
where
    R: FinancialRecordRepository + Send + Sync + 'static,
    T: TicketRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    A: TechnicianAffiliationRepository + Send + Sync + 'static,
{
    pub fn new(
        record_repo: Arc<R>,
        ticket_repo: Arc<T>,
        user_repo: Arc<U>,
        affiliation_repo: Arc<A>,
    ) -> Self {
        Self {
            record_repo,
            ticket_repo,
            user_repo,
            affiliation_repo,
        }
    }

    /// Tenant-facing entry point: resolves the reference, checks the acting
    /// tenant may settle it, then applies the transition.
    pub async fn mark_paid(
        &self,
        acting_tenant: Uuid,
        reference_id: Uuid,
        paid_at: DateTime<Utc>,
    ) -> SettlementResult<FinancialRecordEntity> {
        let record = self.resolve_record(reference_id).await?;
        self.ensure_tenant_can_settle(acting_tenant, &record).await?;
        self.apply_transition(record, paid_at).await
    }

    /// Reconciliation entry point: the webhook already authenticated the
    /// event against the provider, so the transition runs under the record
    /// owner without a separate actor check.
    pub async fn settle_reference(
        &self,
        reference_id: Uuid,
        paid_at: DateTime<Utc>,
    ) -> SettlementResult<FinancialRecordEntity> {
        let record = self.resolve_record(reference_id).await?;
        self.apply_transition(record, paid_at).await
    }

    async fn apply_transition(
        &self,
        record: FinancialRecordEntity,
        paid_at: DateTime<Utc>,
    ) -> SettlementResult<FinancialRecordEntity> {
        if record.is_paid() {
            info!(
                record_id = %record.id,
                paid_at = ?record.paid_at,
                "settlement: record already paid, no-op"
            );
            return Ok(record);
        }

        let updated = self.record_repo.mark_paid(record.id, paid_at).await?;
        info!(
            record_id = %updated.id,
            %paid_at,
            "settlement: record marked paid"
        );

        // Best effort: a failed propagation does not roll the settlement back.
        if let Some(ticket_id) = updated.ticket_id {
            if let Err(err) = self.ticket_repo.set_payment_date(ticket_id, paid_at).await {
                warn!(
                    record_id = %updated.id,
                    %ticket_id,
                    db_error = ?err,
                    "settlement: failed to propagate payment date to ticket"
                );
            }
        }

        Ok(updated)
    }

    /// Resolution order: the reference is tried as a financial record id
    /// first, then as a ticket id, lazily creating the ticket's record with
    /// the ticket's billable amount when none exists yet.
    async fn resolve_record(
        &self,
        reference_id: Uuid,
    ) -> SettlementResult<FinancialRecordEntity> {
        if let Some(record) = self.record_repo.find_by_id(reference_id).await? {
            return Ok(record);
        }

        if let Some(record) = self.record_repo.find_by_ticket(reference_id).await? {
            return Ok(record);
        }

        let ticket = self
            .ticket_repo
            .find_by_id(reference_id)
            .await?
            .ok_or(SettlementError::NotFound)?;

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
            ticket_id = %ticket.id,
            record_id = %record.id,
            "settlement: lazily created financial record for ticket"
        );

        Ok(record)
    }

    async fn ensure_tenant_can_settle(
        &self,
        acting_tenant: Uuid,
        record: &FinancialRecordEntity,
    ) -> SettlementResult<()> {
        if record.user_id == acting_tenant {
            return Ok(());
        }

        let actor = self
            .user_repo
            .find_by_id(acting_tenant)
            .await?
            .ok_or(SettlementError::Forbidden)?;

        if UserRole::from_str(&actor.role) == UserRole::Company
            && self
                .affiliation_repo
                .is_accepted(acting_tenant, record.user_id)
                .await?
        {
            return Ok(());
        }

        let err = SettlementError::Forbidden;
        warn!(
            %acting_tenant,
            record_id = %record.id,
            record_owner = %record.user_id,
            status = err.status_code().as_u16(),
            "settlement: tenant may not settle this record"
        );
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crates::domain::{
        entities::{tickets::TicketEntity, users::UserEntity},
        repositories::{
            financial_records::MockFinancialRecordRepository,
            technician_affiliations::MockTechnicianAffiliationRepository,
            tickets::MockTicketRepository, users::MockUserRepository,
        },
    };
    use mockall::predicate::eq;
    use rust_decimal_macros::dec;

    fn sample_record(
        id: Uuid,
        owner: Uuid,
        status: FinancialRecordStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> FinancialRecordEntity {
        let now = Utc::now();
        FinancialRecordEntity {
            id,
            user_id: owner,
            ticket_id: Some(Uuid::new_v4()),
            client_id: Some(Uuid::new_v4()),
            amount: dec!(320.00),
            status: status.to_string(),
            due_date: now + Duration::days(7),
            paid_at,
            description: Some("Visita tecnica".to_string()),
            created_at: now,
        }
    }

    fn sample_user(id: Uuid, role: &str) -> UserEntity {
        let now = Utc::now();
        UserEntity {
            id,
            email: "tenant@example.com".to_string(),
            role: role.to_string(),
            status: "active".to_string(),
            pix_key: None,
            merchant_name: None,
            merchant_city: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn usecase(
        record_repo: MockFinancialRecordRepository,
        ticket_repo: MockTicketRepository,
        user_repo: MockUserRepository,
        affiliation_repo: MockTechnicianAffiliationRepository,
    ) -> SettlementUseCase<
        MockFinancialRecordRepository,
        MockTicketRepository,
        MockUserRepository,
        MockTechnicianAffiliationRepository,
    > {
        SettlementUseCase::new(
            Arc::new(record_repo),
            Arc::new(ticket_repo),
            Arc::new(user_repo),
            Arc::new(affiliation_repo),
        )
    }

    #[tokio::test]
    async fn marks_pending_record_paid_and_propagates_to_ticket() {
        let tenant = Uuid::new_v4();
        let record_id = Uuid::new_v4();
        let paid_at = Utc::now();
        let pending = sample_record(record_id, tenant, FinancialRecordStatus::Pending, None);
        let ticket_id = pending.ticket_id.unwrap();

        let mut paid = pending.clone();
        paid.status = FinancialRecordStatus::Paid.to_string();
        paid.paid_at = Some(paid_at);

        let mut record_repo = MockFinancialRecordRepository::new();
        record_repo
            .expect_find_by_id()
            .with(eq(record_id))
            .returning(move |_| {
                let pending = pending.clone();
                Box::pin(async move { Ok(Some(pending)) })
            });
        record_repo
            .expect_mark_paid()
            .with(eq(record_id), eq(paid_at))
            .times(1)
            .returning(move |_, _| {
                let paid = paid.clone();
                Box::pin(async move { Ok(paid) })
            });

        let mut ticket_repo = MockTicketRepository::new();
        ticket_repo
            .expect_set_payment_date()
            .with(eq(ticket_id), eq(paid_at))
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));

        let usecase = usecase(
            record_repo,
            ticket_repo,
            MockUserRepository::new(),
            MockTechnicianAffiliationRepository::new(),
        );

        let settled = usecase.mark_paid(tenant, record_id, paid_at).await.unwrap();
        assert_eq!(settled.paid_at, Some(paid_at));
        assert!(settled.is_paid());
    }

    #[tokio::test]
    async fn settling_twice_keeps_first_paid_at_and_does_not_error() {
        let tenant = Uuid::new_v4();
        let record_id = Uuid::new_v4();
        let first_paid_at = Utc::now();
        let already_paid = sample_record(
            record_id,
            tenant,
            FinancialRecordStatus::Paid,
            Some(first_paid_at),
        );

        let mut record_repo = MockFinancialRecordRepository::new();
        record_repo
            .expect_find_by_id()
            .with(eq(record_id))
            .returning(move |_| {
                let already_paid = already_paid.clone();
                Box::pin(async move { Ok(Some(already_paid)) })
            });
        // No mark_paid expectation: the second call must not touch the store.

        let usecase = usecase(
            record_repo,
            MockTicketRepository::new(),
            MockUserRepository::new(),
            MockTechnicianAffiliationRepository::new(),
        );

        let later = first_paid_at + Duration::hours(6);
        let settled = usecase.mark_paid(tenant, record_id, later).await.unwrap();
        assert_eq!(settled.paid_at, Some(first_paid_at));
    }

    #[tokio::test]
    async fn resolves_ticket_reference_and_lazily_creates_record() {
        let tenant = Uuid::new_v4();
        let ticket_id = Uuid::new_v4();
        let paid_at = Utc::now();
        let client_id = Uuid::new_v4();

        let ticket = TicketEntity {
            id: ticket_id,
            user_id: tenant,
            client_id: Some(client_id),
            amount: dec!(480.00),
            status: "completed".to_string(),
            payment_date: None,
            completed_at: Some(paid_at - Duration::days(1)),
            created_at: paid_at - Duration::days(3),
        };

        let created = FinancialRecordEntity {
            id: Uuid::new_v4(),
            user_id: tenant,
            ticket_id: Some(ticket_id),
            client_id: Some(client_id),
            amount: dec!(480.00),
            status: FinancialRecordStatus::Pending.to_string(),
            due_date: paid_at,
            paid_at: None,
            description: None,
            created_at: paid_at,
        };
        let created_id = created.id;

        let mut paid = created.clone();
        paid.status = FinancialRecordStatus::Paid.to_string();
        paid.paid_at = Some(paid_at);

        let mut record_repo = MockFinancialRecordRepository::new();
        record_repo
            .expect_find_by_id()
            .with(eq(ticket_id))
            .returning(|_| Box::pin(async { Ok(None) }));
        record_repo
            .expect_find_by_ticket()
            .with(eq(ticket_id))
            .returning(|_| Box::pin(async { Ok(None) }));
        record_repo
            .expect_create()
            .withf(move |record| {
                record.user_id == tenant
                    && record.ticket_id == Some(ticket_id)
                    && record.amount == dec!(480.00)
            })
            .times(1)
            .returning(move |_| {
                let created = created.clone();
                Box::pin(async move { Ok(created) })
            });
        record_repo
            .expect_mark_paid()
            .with(eq(created_id), eq(paid_at))
            .times(1)
            .returning(move |_, _| {
                let paid = paid.clone();
                Box::pin(async move { Ok(paid) })
            });

        let mut ticket_repo = MockTicketRepository::new();
        ticket_repo
            .expect_find_by_id()
            .with(eq(ticket_id))
            .returning(move |_| {
                let ticket = ticket.clone();
                Box::pin(async move { Ok(Some(ticket)) })
            });
        ticket_repo
            .expect_set_payment_date()
            .returning(|_, _| Box::pin(async { Ok(()) }));

        let usecase = usecase(
            record_repo,
            ticket_repo,
            MockUserRepository::new(),
            MockTechnicianAffiliationRepository::new(),
        );

        let settled = usecase.mark_paid(tenant, ticket_id, paid_at).await.unwrap();
        assert_eq!(settled.id, created_id);
        assert!(settled.is_paid());
    }

    #[tokio::test]
    async fn unknown_reference_is_not_found() {
        let mut record_repo = MockFinancialRecordRepository::new();
        record_repo
            .expect_find_by_id()
            .returning(|_| Box::pin(async { Ok(None) }));
        record_repo
            .expect_find_by_ticket()
            .returning(|_| Box::pin(async { Ok(None) }));

        let mut ticket_repo = MockTicketRepository::new();
        ticket_repo
            .expect_find_by_id()
            .returning(|_| Box::pin(async { Ok(None) }));

        let usecase = usecase(
            record_repo,
            ticket_repo,
            MockUserRepository::new(),
            MockTechnicianAffiliationRepository::new(),
        );

        let result = usecase
            .mark_paid(Uuid::new_v4(), Uuid::new_v4(), Utc::now())
            .await;
        assert!(matches!(result, Err(SettlementError::NotFound)));
    }

    #[tokio::test]
    async fn foreign_record_is_forbidden_for_technician() {
        let actor = Uuid::new_v4();
        let owner = Uuid::new_v4();
        let record_id = Uuid::new_v4();
        let record = sample_record(record_id, owner, FinancialRecordStatus::Pending, None);

        let mut record_repo = MockFinancialRecordRepository::new();
        record_repo.expect_find_by_id().returning(move |_| {
            let record = record.clone();
            Box::pin(async move { Ok(Some(record)) })
        });

        let mut user_repo = MockUserRepository::new();
        user_repo
            .expect_find_by_id()
            .with(eq(actor))
            .returning(move |_| {
                let user = sample_user(actor, "technician");
                Box::pin(async move { Ok(Some(user)) })
            });

        let usecase = usecase(
            record_repo,
            MockTicketRepository::new(),
            user_repo,
            MockTechnicianAffiliationRepository::new(),
        );

        let result = usecase.mark_paid(actor, record_id, Utc::now()).await;
        assert!(matches!(result, Err(SettlementError::Forbidden)));
    }

    #[tokio::test]
    async fn company_with_accepted_affiliation_can_settle() {
        let company = Uuid::new_v4();
        let technician = Uuid::new_v4();
        let record_id = Uuid::new_v4();
        let paid_at = Utc::now();
        let record = sample_record(record_id, technician, FinancialRecordStatus::Pending, None);

        let mut paid = record.clone();
        paid.status = FinancialRecordStatus::Paid.to_string();
        paid.paid_at = Some(paid_at);

        let mut record_repo = MockFinancialRecordRepository::new();
        record_repo.expect_find_by_id().returning(move |_| {
            let record = record.clone();
            Box::pin(async move { Ok(Some(record)) })
        });
        record_repo
            .expect_mark_paid()
            .times(1)
            .returning(move |_, _| {
                let paid = paid.clone();
                Box::pin(async move { Ok(paid) })
            });

        let mut user_repo = MockUserRepository::new();
        user_repo
            .expect_find_by_id()
            .with(eq(company))
            .returning(move |_| {
                let user = sample_user(company, "company");
                Box::pin(async move { Ok(Some(user)) })
            });

        let mut affiliation_repo = MockTechnicianAffiliationRepository::new();
        affiliation_repo
            .expect_is_accepted()
            .with(eq(company), eq(technician))
            .returning(|_, _| Box::pin(async { Ok(true) }));

        let mut ticket_repo = MockTicketRepository::new();
        ticket_repo
            .expect_set_payment_date()
            .returning(|_, _| Box::pin(async { Ok(()) }));

        let usecase = usecase(record_repo, ticket_repo, user_repo, affiliation_repo);

        let settled = usecase.mark_paid(company, record_id, paid_at).await.unwrap();
        assert!(settled.is_paid());
    }

    #[tokio::test]
    async fn failed_ticket_propagation_does_not_roll_back_settlement() {
        let tenant = Uuid::new_v4();
        let record_id = Uuid::new_v4();
        let paid_at = Utc::now();
        let pending = sample_record(record_id, tenant, FinancialRecordStatus::Pending, None);

        let mut paid = pending.clone();
        paid.status = FinancialRecordStatus::Paid.to_string();
        paid.paid_at = Some(paid_at);

        let mut record_repo = MockFinancialRecordRepository::new();
        record_repo.expect_find_by_id().returning(move |_| {
            let pending = pending.clone();
            Box::pin(async move { Ok(Some(pending)) })
        });
        record_repo
            .expect_mark_paid()
            .times(1)
            .returning(move |_, _| {
                let paid = paid.clone();
                Box::pin(async move { Ok(paid) })
            });

        let mut ticket_repo = MockTicketRepository::new();
        ticket_repo
            .expect_set_payment_date()
            .returning(|_, _| Box::pin(async { Err(anyhow::anyhow!("ticket table unavailable")) }));

        let usecase = usecase(
            record_repo,
            ticket_repo,
            MockUserRepository::new(),
            MockTechnicianAffiliationRepository::new(),
        );

        let settled = usecase.mark_paid(tenant, record_id, paid_at).await.unwrap();
        assert!(settled.is_paid());
    }
}
