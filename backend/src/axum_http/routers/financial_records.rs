use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use chrono::Utc;
use crates::{
    domain::{
        repositories::{
            financial_records::FinancialRecordRepository,
            technician_affiliations::TechnicianAffiliationRepository, tickets::TicketRepository,
            users::UserRepository,
        },
        value_objects::financial_records::FinancialRecordDto,
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            financial_records::FinancialRecordPostgres,
            technician_affiliations::TechnicianAffiliationPostgres, tickets::TicketPostgres,
            users::UserPostgres,
        },
    },
};
use tracing::error;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    axum_http::error_responses::{error_response, internal_error_response},
    usecases::settlement::{SettlementError, SettlementUseCase},
};

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let record_repository = FinancialRecordPostgres::new(Arc::clone(&db_pool));
    let ticket_repository = TicketPostgres::new(Arc::clone(&db_pool));
    let user_repository = UserPostgres::new(Arc::clone(&db_pool));
    let affiliation_repository = TechnicianAffiliationPostgres::new(Arc::clone(&db_pool));

    let usecase = SettlementUseCase::new(
        Arc::new(record_repository),
        Arc::new(ticket_repository),
        Arc::new(user_repository),
        Arc::new(affiliation_repository),
    );

    Router::new()
        .route(
            "/:id/settle",
            post(settle::<
                FinancialRecordPostgres,
                TicketPostgres,
                UserPostgres,
                TechnicianAffiliationPostgres,
            >),
        )
        .with_state(Arc::new(usecase))
}

/// Direct "mark paid" action from an authenticated tenant.
pub async fn settle<R, T, U, A>(
    State(usecase): State<Arc<SettlementUseCase<R, T, U, A>>>,
    AuthUser { user_id, .. }: AuthUser,
    Path(reference_id): Path<Uuid>,
) -> impl IntoResponse
where
    R: FinancialRecordRepository + Send + Sync,
    T: TicketRepository + Send + Sync,
    U: UserRepository + Send + Sync,
    A: TechnicianAffiliationRepository + Send + Sync,
{
    match usecase.mark_paid(user_id, reference_id, Utc::now()).await {
        Ok(record) => (StatusCode::OK, Json(FinancialRecordDto::from(record))).into_response(),
        Err(SettlementError::Internal(err)) => {
            error!(
                %user_id,
                %reference_id,
                error = ?err,
                "financial_records: settle failed"
            );
            internal_error_response()
        }
        Err(err) => error_response(err.status_code(), err.to_string()),
    }
}
