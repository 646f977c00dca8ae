use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use crates::{
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            financial_records::FinancialRecordPostgres,
            payment_integrations::PaymentIntegrationPostgres,
            subscriptions::SubscriptionPostgres,
            technician_affiliations::TechnicianAffiliationPostgres, tickets::TicketPostgres,
            users::UserPostgres,
        },
    },
    payments::mercadopago::MercadoPagoClient,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::{
    config::config_model::MercadoPago,
    usecases::{
        payment_webhook::{PaymentWebhookUseCase, WebhookNotification},
        settlement::SettlementUseCase,
    },
};

type WebhookUseCase = PaymentWebhookUseCase<
    MercadoPagoClient,
    PaymentIntegrationPostgres,
    SubscriptionPostgres,
    UserPostgres,
    FinancialRecordPostgres,
    TicketPostgres,
    TechnicianAffiliationPostgres,
>;

/// Providers deliver the pointer in several shapes: `topic`/`type` plus
/// `id`/`data.id` in the query, optionally a tenant and reference hint added
/// at charge creation.
#[derive(Debug, Deserialize)]
pub struct WebhookQuery {
    pub topic: Option<String>,
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub id: Option<String>,
    #[serde(rename = "data.id")]
    pub data_id: Option<String>,
    pub user_id: Option<Uuid>,
    pub record_id: Option<Uuid>,
    pub ticket_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookBody {
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub action: Option<String>,
    pub data: Option<WebhookBodyData>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookBodyData {
    pub id: Option<serde_json::Value>,
}

pub fn routes(db_pool: Arc<PgPoolSquad>, config: MercadoPago) -> Router {
    let integration_repository = PaymentIntegrationPostgres::new(Arc::clone(&db_pool));
    let subscription_repository = SubscriptionPostgres::new(Arc::clone(&db_pool));
    let user_repository = Arc::new(UserPostgres::new(Arc::clone(&db_pool)));
    let record_repository = FinancialRecordPostgres::new(Arc::clone(&db_pool));
    let ticket_repository = TicketPostgres::new(Arc::clone(&db_pool));
    let affiliation_repository = TechnicianAffiliationPostgres::new(Arc::clone(&db_pool));

    let settlement = SettlementUseCase::new(
        Arc::new(record_repository),
        Arc::new(ticket_repository),
        Arc::clone(&user_repository),
        Arc::new(affiliation_repository),
    );

    let usecase = PaymentWebhookUseCase::new(
        Arc::new(MercadoPagoClient::new()),
        Arc::new(integration_repository),
        Arc::new(subscription_repository),
        user_repository,
        Arc::new(settlement),
        config.platform_access_token,
    );

    Router::new()
        .route("/webhook", get(receive_get).post(receive_post))
        .with_state(Arc::new(usecase))
}

pub async fn receive_get(
    State(usecase): State<Arc<WebhookUseCase>>,
    Query(query): Query<WebhookQuery>,
) -> impl IntoResponse {
    handle(usecase, query, None).await
}

pub async fn receive_post(
    State(usecase): State<Arc<WebhookUseCase>>,
    Query(query): Query<WebhookQuery>,
    body: Option<Json<WebhookBody>>,
) -> impl IntoResponse {
    handle(usecase, query, body.map(|Json(body)| body)).await
}

/// Acknowledges with `{"received": true}` on every non-fatal outcome; only a
/// failed authoritative fetch answers 500 so the provider redelivers.
async fn handle(
    usecase: Arc<WebhookUseCase>,
    query: WebhookQuery,
    body: Option<WebhookBody>,
) -> axum::response::Response {
    let notification = merge_notification(query, body);

    match usecase.process(notification).await {
        Ok(_outcome) => (StatusCode::OK, Json(json!({ "received": true }))).into_response(),
        Err(err) => {
            error!(error = ?err, "payment_webhook: processing failed, provider will retry");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "received": false })),
            )
                .into_response()
        }
    }
}

fn merge_notification(query: WebhookQuery, body: Option<WebhookBody>) -> WebhookNotification {
    let body = body.unwrap_or_default();

    let body_payment_id = body.data.and_then(|data| {
        data.id.map(|id| match id {
            serde_json::Value::String(value) => value,
            other => other.to_string(),
        })
    });

    WebhookNotification {
        topic: query.topic.or(query.type_).or(body.type_).or(body.action),
        payment_id: query.id.or(query.data_id).or(body_payment_id),
        tenant_id: query.user_id,
        record_id: query.record_id,
        ticket_id: query.ticket_id,
    }
}
