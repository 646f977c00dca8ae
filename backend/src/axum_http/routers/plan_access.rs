use std::sync::Arc;

use axum::{
    Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get,
};
use crates::{
    domain::repositories::{subscriptions::SubscriptionRepository, users::UserRepository},
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{subscriptions::SubscriptionPostgres, users::UserPostgres},
    },
};
use tracing::error;

use crate::{
    auth::AuthUser, axum_http::error_responses::internal_error_response,
    usecases::plan_access::PlanAccessUseCase,
};

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let user_repository = UserPostgres::new(Arc::clone(&db_pool));
    let subscription_repository = SubscriptionPostgres::new(Arc::clone(&db_pool));

    let usecase = PlanAccessUseCase::new(
        Arc::new(user_repository),
        Arc::new(subscription_repository),
    );

    Router::new()
        .route("/current", get(current::<UserPostgres, SubscriptionPostgres>))
        .with_state(Arc::new(usecase))
}

pub async fn current<U, S>(
    State(usecase): State<Arc<PlanAccessUseCase<U, S>>>,
    AuthUser { user_id, .. }: AuthUser,
) -> impl IntoResponse
where
    U: UserRepository + Send + Sync,
    S: SubscriptionRepository + Send + Sync,
{
    match usecase.resolve_for_tenant(user_id).await {
        Ok(decision) => (StatusCode::OK, Json(decision)).into_response(),
        Err(err) => {
            error!(%user_id, error = ?err, "plan_access: failed to resolve access decision");
            internal_error_response()
        }
    }
}
