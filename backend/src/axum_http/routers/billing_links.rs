use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use crates::{
    domain::repositories::{
        financial_records::FinancialRecordRepository, tickets::TicketRepository,
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{financial_records::FinancialRecordPostgres, tickets::TicketPostgres},
    },
};
use serde::Deserialize;
use tracing::error;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    axum_http::error_responses::{error_response, internal_error_response},
    config::config_model::Billing,
    usecases::billing_links::{BillingLinkError, BillingLinkUseCase},
};

#[derive(Debug, Deserialize)]
pub struct IssueLinkRequest {
    pub reference_id: Uuid,
}

pub fn routes(db_pool: Arc<PgPoolSquad>, config: Billing) -> Router {
    let record_repository = FinancialRecordPostgres::new(Arc::clone(&db_pool));
    let ticket_repository = TicketPostgres::new(Arc::clone(&db_pool));

    let usecase = BillingLinkUseCase::new(
        Arc::new(record_repository),
        Arc::new(ticket_repository),
        config,
    );

    Router::new()
        .route(
            "/",
            post(issue_link::<FinancialRecordPostgres, TicketPostgres>),
        )
        .with_state(Arc::new(usecase))
}

pub async fn issue_link<R, T>(
    State(usecase): State<Arc<BillingLinkUseCase<R, T>>>,
    AuthUser { user_id, .. }: AuthUser,
    Json(request): Json<IssueLinkRequest>,
) -> impl IntoResponse
where
    R: FinancialRecordRepository + Send + Sync,
    T: TicketRepository + Send + Sync,
{
    match usecase.issue_link(user_id, request.reference_id).await {
        Ok(link) => (StatusCode::OK, Json(link)).into_response(),
        Err(BillingLinkError::Internal(err)) => {
            error!(
                %user_id,
                reference_id = %request.reference_id,
                error = ?err,
                "billing_links: failed to issue link"
            );
            internal_error_response()
        }
        Err(err) => error_response(err.status_code(), err.to_string()),
    }
}
