use std::{collections::HashMap, sync::Arc};

use chrono::{Duration, Utc};
use crates::{
    domain::{
        entities::{
            payment_integrations::{PaymentIntegrationEntity, UpsertPaymentIntegrationEntity},
            users::UserEntity,
        },
        repositories::{
            payment_integrations::PaymentIntegrationRepository, users::UserRepository,
        },
        value_objects::{
            charges::{ChargeArtifact, ChargeRequest, PayerDocument},
            enums::charge_providers::{ChargeProvider, ProviderChoice},
        },
    },
    payments::{
        mercadopago::{CreatePixChargeRequest, MpIdentification, MpPayer},
        pix::{self, MAX_TXID_LEN, PixPayload},
    },
};
use rust_decimal::prelude::ToPrimitive;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::config_model::MercadoPago;
use crate::usecases::gateway::PaymentGateway;

pub const GATEWAY_PROVIDER: &str = "mercadopago";

/// Refresh the stored gateway token when it is this close to expiring.
const TOKEN_REFRESH_MARGIN_SECONDS: i64 = 60;

#[derive(Debug, Error)]
pub enum ChargeError {
    #[error("tenant not found")]
    TenantNotFound,
    #[error("no instant-payment key configured for tenant")]
    MissingPaymentKey,
    #[error("payer tax id is required (11-digit CPF or 14-digit CNPJ)")]
    MissingPayerDocument,
    #[error("payment gateway is not connected for this tenant")]
    GatewayNotConnected,
    #[error("gateway charge failed: {0}")]
    ProviderCharge(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ChargeError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            ChargeError::TenantNotFound => StatusCode::NOT_FOUND,
            ChargeError::MissingPaymentKey
            | ChargeError::MissingPayerDocument
            | ChargeError::GatewayNotConnected => StatusCode::BAD_REQUEST,
            ChargeError::ProviderCharge(_) => StatusCode::BAD_GATEWAY,
            ChargeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type ChargeResult<T> = std::result::Result<T, ChargeError>;

/// Builds a payable artifact for a charge: either the tenant's static
/// instant-payment code or a gateway-hosted charge, per the caller's
/// provider choice.
pub struct ChargeUseCase<U, I, G>
where
    U: UserRepository + Send + Sync + 'static,
    I: PaymentIntegrationRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    user_repo: Arc<U>,
    integration_repo: Arc<I>,
    gateway: Arc<G>,
    mercado_pago: MercadoPago,
    public_base_url: String,
}

impl<U, I, G> ChargeUseCase<U, I, G>
where
    U: UserRepository + Send + Sync + 'static,
    I: PaymentIntegrationRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    pub fn new(
        user_repo: Arc<U>,
        integration_repo: Arc<I>,
        gateway: Arc<G>,
        mercado_pago: MercadoPago,
        public_base_url: String,
    ) -> Self {
        Self {
            user_repo,
            integration_repo,
            gateway,
            mercado_pago,
            public_base_url,
        }
    }

    pub async fn create_charge(
        &self,
        tenant_id: Uuid,
        request: ChargeRequest,
    ) -> ChargeResult<ChargeArtifact> {
        info!(
            %tenant_id,
            reference = %request.reference,
            provider = %request.provider,
            "charges: create charge requested"
        );

        let tenant = self
            .user_repo
            .find_by_id(tenant_id)
            .await?
            .ok_or(ChargeError::TenantNotFound)?;

        let connected_integration = self
            .integration_repo
            .find_by_user_and_provider(tenant_id, GATEWAY_PROVIDER.to_string())
            .await?
            .filter(PaymentIntegrationEntity::is_connected);

        match (request.provider, connected_integration) {
            (ProviderChoice::Gateway, None) => {
                let err = ChargeError::GatewayNotConnected;
                warn!(
                    %tenant_id,
                    status = err.status_code().as_u16(),
                    "charges: gateway explicitly requested without connected credentials"
                );
                Err(err)
            }
            (ProviderChoice::Gateway | ProviderChoice::Auto, Some(integration)) => {
                self.gateway_charge(tenant_id, integration, request).await
            }
            (ProviderChoice::Auto, None) | (ProviderChoice::Static, _) => {
                self.static_charge(&tenant, request)
            }
        }
    }

    /// Assembles the static instant-payment code. Pure apart from the tenant
    /// profile lookup done by the caller; always succeeds when a payment key
    /// is configured.
    fn static_charge(
        &self,
        tenant: &UserEntity,
        request: ChargeRequest,
    ) -> ChargeResult<ChargeArtifact> {
        let pix_key = tenant
            .pix_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                let err = ChargeError::MissingPaymentKey;
                warn!(
                    tenant_id = %tenant.id,
                    status = err.status_code().as_u16(),
                    "charges: tenant has no instant-payment key configured"
                );
                err
            })?;

        let txid: String = format!("TICKET{}", request.reference)
            .chars()
            .take(MAX_TXID_LEN)
            .collect();

        let payload = PixPayload::new(
            pix_key,
            Some(request.amount),
            tenant.merchant_name.clone().unwrap_or_default(),
            tenant.merchant_city.clone().unwrap_or_default(),
            txid,
            request.description.clone(),
        )
        .to_string();
        let qr_image_data_uri = pix::qr_svg_data_uri(&payload)?;

        info!(tenant_id = %tenant.id, reference = %request.reference, "charges: static code assembled");

        Ok(ChargeArtifact {
            provider: ChargeProvider::StaticPix,
            payload: Some(payload),
            qr_image_data_uri: Some(qr_image_data_uri),
            external_payment_id: None,
            status: None,
        })
    }

    async fn gateway_charge(
        &self,
        tenant_id: Uuid,
        integration: PaymentIntegrationEntity,
        request: ChargeRequest,
    ) -> ChargeResult<ChargeArtifact> {
        let document = request
            .payer
            .tax_id
            .as_deref()
            .and_then(PayerDocument::classify)
            .ok_or_else(|| {
                let err = ChargeError::MissingPayerDocument;
                warn!(
                    %tenant_id,
                    status = err.status_code().as_u16(),
                    "charges: payer document missing or unclassifiable"
                );
                err
            })?;

        let access_token = self.fresh_access_token(tenant_id, integration).await?;

        let amount = request
            .amount
            .to_f64()
            .ok_or_else(|| anyhow::anyhow!("charge amount is not representable"))?;

        let metadata = HashMap::from([
            ("purpose".to_string(), "record-settlement".to_string()),
            ("record_id".to_string(), request.reference.clone()),
        ]);

        let notification_url = format!(
            "{}/api/v1/payments/webhook?user_id={}&record_id={}",
            self.public_base_url.trim_end_matches('/'),
            tenant_id,
            request.reference,
        );

        let charge = CreatePixChargeRequest {
            transaction_amount: amount,
            description: request.description.clone(),
            payment_method_id: "pix".to_string(),
            external_reference: request.reference.clone(),
            payer: MpPayer {
                email: request.payer.email.clone(),
                first_name: request.payer.name.clone(),
                identification: MpIdentification {
                    type_: document.type_code().to_string(),
                    number: document.number().to_string(),
                },
            },
            metadata,
            notification_url: Some(notification_url),
        };

        // A distinct key per attempt; the provider dedupes transport retries
        // of this attempt on it.
        let idempotency_key = Uuid::new_v4().to_string();

        let payment = self
            .gateway
            .create_pix_charge(&access_token, &charge, &idempotency_key)
            .await
            .map_err(|err| {
                let err = ChargeError::ProviderCharge(err.to_string());
                warn!(
                    %tenant_id,
                    reference = %request.reference,
                    status = err.status_code().as_u16(),
                    error = %err,
                    "charges: gateway charge creation failed"
                );
                err
            })?;

        info!(
            %tenant_id,
            reference = %request.reference,
            external_payment_id = ?payment.id,
            gateway_status = ?payment.status,
            "charges: gateway charge created"
        );

        Ok(ChargeArtifact {
            provider: ChargeProvider::Gateway,
            payload: payment.payload(),
            qr_image_data_uri: payment.qr_image_data_uri(),
            external_payment_id: payment.id.map(|id| id.to_string()),
            status: payment.status,
        })
    }

    /// Returns a usable access token, exchanging the refresh token first when
    /// the stored one is about to expire. A failed refresh falls back to the
    /// stale token; only a later provider rejection becomes a hard error.
    async fn fresh_access_token(
        &self,
        tenant_id: Uuid,
        integration: PaymentIntegrationEntity,
    ) -> ChargeResult<String> {
        let access_token = integration
            .access_token
            .clone()
            .ok_or(ChargeError::GatewayNotConnected)?;

        let expires_soon = integration
            .token_expires_at
            .map(|expires_at| {
                expires_at - Utc::now() <= Duration::seconds(TOKEN_REFRESH_MARGIN_SECONDS)
            })
            .unwrap_or(false);

        let (Some(refresh_token), Some(client_id), Some(client_secret)) = (
            integration.refresh_token.clone(),
            self.mercado_pago.client_id.clone(),
            self.mercado_pago.client_secret.clone(),
        ) else {
            return Ok(access_token);
        };

        if !expires_soon {
            return Ok(access_token);
        }

        match self
            .gateway
            .refresh_access_token(&client_id, &client_secret, &refresh_token)
            .await
        {
            Ok(tokens) => {
                let token_expires_at = tokens
                    .expires_in
                    .map(|seconds| Utc::now() + Duration::seconds(seconds));

                let updated = UpsertPaymentIntegrationEntity {
                    user_id: tenant_id,
                    provider: GATEWAY_PROVIDER.to_string(),
                    status: "active".to_string(),
                    access_token: Some(tokens.access_token.clone()),
                    refresh_token: tokens.refresh_token.or(Some(refresh_token)),
                    token_expires_at,
                    public_key: integration.public_key.clone(),
                    provider_user_id: integration.provider_user_id.clone(),
                };

                // Last-writer-wins; a concurrent refresher storing a newer
                // token right after us is fine.
                if let Err(err) = self.integration_repo.upsert(updated).await {
                    warn!(
                        %tenant_id,
                        db_error = ?err,
                        "charges: failed to store refreshed gateway credentials"
                    );
                }

                info!(%tenant_id, "charges: gateway credentials refreshed");
                Ok(tokens.access_token)
            }
            Err(err) => {
                warn!(
                    %tenant_id,
                    error = ?err,
                    "charges: token refresh failed, attempting charge with stale credential"
                );
                Ok(access_token)
            }
        }
    }
}
