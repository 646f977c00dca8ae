use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use crates::{
    domain::{
        repositories::{
            financial_records::FinancialRecordRepository,
            payment_integrations::PaymentIntegrationRepository, tickets::TicketRepository,
            users::UserRepository,
        },
        value_objects::{
            charges::{ChargeRequest, PayerInfo},
            enums::charge_providers::ProviderChoice,
            financial_records::FinancialRecordDto,
        },
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            financial_records::FinancialRecordPostgres,
            payment_integrations::PaymentIntegrationPostgres, tickets::TicketPostgres,
            users::UserPostgres,
        },
    },
    payments::mercadopago::MercadoPagoClient,
};
use serde::Deserialize;
use tracing::error;

use crate::{
    axum_http::error_responses::{error_response, internal_error_response},
    config::config_model::DotEnvyConfig,
    usecases::{
        billing_links::{BillingLinkError, BillingLinkUseCase},
        charges::{ChargeError, ChargeUseCase},
        gateway::PaymentGateway,
    },
};

/// What the anonymous payer submits alongside the link token when asking for
/// a payable artifact.
#[derive(Debug, Deserialize)]
pub struct PublicChargeRequest {
    #[serde(default)]
    pub payer: PayerInfo,
    #[serde(default)]
    pub provider: ProviderChoice,
}

struct PublicPaymentState<R, T, U, I, G>
where
    R: FinancialRecordRepository + Send + Sync + 'static,
    T: TicketRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    I: PaymentIntegrationRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    links: BillingLinkUseCase<R, T>,
    charges: ChargeUseCase<U, I, G>,
}

pub fn routes(db_pool: Arc<PgPoolSquad>, config: &DotEnvyConfig) -> Router {
    let record_repository = FinancialRecordPostgres::new(Arc::clone(&db_pool));
    let ticket_repository = TicketPostgres::new(Arc::clone(&db_pool));
    let user_repository = UserPostgres::new(Arc::clone(&db_pool));
    let integration_repository = PaymentIntegrationPostgres::new(Arc::clone(&db_pool));

    let links = BillingLinkUseCase::new(
        Arc::new(record_repository),
        Arc::new(ticket_repository),
        config.billing.clone(),
    );
    let charges = ChargeUseCase::new(
        Arc::new(user_repository),
        Arc::new(integration_repository),
        Arc::new(MercadoPagoClient::new()),
        config.mercado_pago.clone(),
        config.billing.public_base_url.clone(),
    );

    let state = Arc::new(PublicPaymentState { links, charges });

    Router::new()
        .route(
            "/:token",
            get(view_charge::<
                FinancialRecordPostgres,
                TicketPostgres,
                UserPostgres,
                PaymentIntegrationPostgres,
                MercadoPagoClient,
            >),
        )
        .route(
            "/:token/charge",
            post(create_charge::<
                FinancialRecordPostgres,
                TicketPostgres,
                UserPostgres,
                PaymentIntegrationPostgres,
                MercadoPagoClient,
            >),
        )
        .with_state(state)
}

/// Payer view of the linked charge. Any token problem answers with the same
/// generic message so the endpoint does not become a validity oracle.
async fn view_charge<R, T, U, I, G>(
    State(state): State<Arc<PublicPaymentState<R, T, U, I, G>>>,
    Path(token): Path<String>,
) -> impl IntoResponse
where
    R: FinancialRecordRepository + Send + Sync,
    T: TicketRepository + Send + Sync,
    U: UserRepository + Send + Sync,
    I: PaymentIntegrationRepository + Send + Sync,
    G: PaymentGateway + Send + Sync,
{
    match state.links.resolve_link(&token).await {
        Ok((_claims, record)) => {
            (StatusCode::OK, Json(FinancialRecordDto::from(record))).into_response()
        }
        Err(BillingLinkError::Internal(err)) => {
            error!(error = ?err, "public_payment: failed to resolve link");
            internal_error_response()
        }
        Err(err) => error_response(err.status_code(), err.to_string()),
    }
}

async fn create_charge<R, T, U, I, G>(
    State(state): State<Arc<PublicPaymentState<R, T, U, I, G>>>,
    Path(token): Path<String>,
    Json(request): Json<PublicChargeRequest>,
) -> impl IntoResponse
where
    R: FinancialRecordRepository + Send + Sync,
    T: TicketRepository + Send + Sync,
    U: UserRepository + Send + Sync,
    I: PaymentIntegrationRepository + Send + Sync,
    G: PaymentGateway + Send + Sync,
{
    let (claims, record) = match state.links.resolve_link(&token).await {
        Ok(resolved) => resolved,
        Err(BillingLinkError::Internal(err)) => {
            error!(error = ?err, "public_payment: failed to resolve link");
            return internal_error_response();
        }
        Err(err) => return error_response(err.status_code(), err.to_string()),
    };

    let charge_request = ChargeRequest {
        amount: record.amount,
        payer: request.payer,
        description: record.description.clone(),
        reference: record.id.to_string(),
        provider: request.provider,
    };

    match state
        .charges
        .create_charge(claims.tenant_id, charge_request)
        .await
    {
        Ok(artifact) => (StatusCode::OK, Json(artifact)).into_response(),
        Err(ChargeError::Internal(err)) => {
            error!(
                record_id = %record.id,
                error = ?err,
                "public_payment: failed to create charge"
            );
            internal_error_response()
        }
        Err(err) => error_response(err.status_code(), err.to_string()),
    }
}
