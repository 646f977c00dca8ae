use std::{collections::HashMap, time::Duration};

use anyhow::Result;
use chrono::{DateTime, Utc};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::error;

const API_BASE_URL: &str = "https://api.mercadopago.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Minimal Mercado Pago client built on reqwest. Access tokens are supplied
/// per call because charges run under tenant-connected credentials while
/// reconciliation may fall back to the platform account.
pub struct MercadoPagoClient {
    http: reqwest::Client,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatePixChargeRequest {
    pub transaction_amount: f64,
    pub description: Option<String>,
    pub payment_method_id: String,
    pub external_reference: String,
    pub payer: MpPayer,
    pub metadata: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MpPayer {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub identification: MpIdentification,
}

#[derive(Debug, Clone, Serialize)]
pub struct MpIdentification {
    #[serde(rename = "type")]
    pub type_: String,
    pub number: String,
}

#[derive(Debug, Deserialize)]
pub struct MpPayment {
    pub id: Option<i64>,
    pub status: Option<String>,
    pub date_approved: Option<DateTime<Utc>>,
    pub external_reference: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub point_of_interaction: Option<MpPointOfInteraction>,
}

#[derive(Debug, Deserialize)]
pub struct MpPointOfInteraction {
    pub transaction_data: Option<MpTransactionData>,
}

#[derive(Debug, Deserialize)]
pub struct MpTransactionData {
    pub qr_code: Option<String>,
    pub qr_code_base64: Option<String>,
    pub ticket_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MpTokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct MpErrorEnvelope {
    message: Option<String>,
    error: Option<String>,
    status: Option<i64>,
    cause: Option<Vec<MpErrorCause>>,
}

#[derive(Debug, Deserialize)]
struct MpErrorCause {
    code: Option<serde_json::Value>,
    description: Option<String>,
}

impl MpPayment {
    pub fn metadata_str(&self, key: &str) -> Option<String> {
        match self.metadata.get(key)? {
            serde_json::Value::String(value) => Some(value.clone()),
            serde_json::Value::Number(value) => Some(value.to_string()),
            _ => None,
        }
    }

    pub fn metadata_i64(&self, key: &str) -> Option<i64> {
        match self.metadata.get(key)? {
            serde_json::Value::Number(value) => value.as_i64(),
            serde_json::Value::String(value) => value.parse().ok(),
            _ => None,
        }
    }

    pub fn payload(&self) -> Option<String> {
        self.transaction_data()?.qr_code.clone()
    }

    pub fn qr_image_data_uri(&self) -> Option<String> {
        let image = self.transaction_data()?.qr_code_base64.clone()?;
        Some(format!("data:image/png;base64,{image}"))
    }

    fn transaction_data(&self) -> Option<&MpTransactionData> {
        self.point_of_interaction
            .as_ref()?
            .transaction_data
            .as_ref()
    }
}

impl Default for MercadoPagoClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MercadoPagoClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("failed to build http client"),
        }
    }

    async fn ensure_success(resp: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let (provider_message, provider_error, provider_status, provider_causes) =
            match serde_json::from_str::<MpErrorEnvelope>(&body) {
                Ok(envelope) => {
                    let causes = envelope.cause.map(|causes| {
                        causes
                            .into_iter()
                            .map(|cause| {
                                format!(
                                    "{:?}: {}",
                                    cause.code,
                                    cause.description.unwrap_or_default()
                                )
                            })
                            .collect::<Vec<_>>()
                            .join("; ")
                    });
                    (envelope.message, envelope.error, envelope.status, causes)
                }
                Err(_) => (None, None, None, None),
            };

        error!(
            status = %status,
            provider_message = ?provider_message,
            provider_error = ?provider_error,
            provider_status = ?provider_status,
            provider_causes = ?provider_causes,
            response_body = %body,
            context = %context,
            "mercado pago api request failed"
        );

        anyhow::bail!(
            "Mercado Pago request failed: {} (status {}, message {:?})",
            context,
            status,
            provider_message
        );
    }

    /// Submits a PIX charge. The idempotency key must be distinct per
    /// attempt; Mercado Pago deduplicates retries of the same attempt on it.
    pub async fn create_pix_charge(
        &self,
        access_token: &str,
        request: &CreatePixChargeRequest,
        idempotency_key: &str,
    ) -> Result<MpPayment> {
        // https://www.mercadopago.com.br/developers/en/reference/payments/_payments/post
        let resp = self
            .http
            .post(format!("{API_BASE_URL}/v1/payments"))
            .header(AUTHORIZATION, format!("Bearer {access_token}"))
            .header(CONTENT_TYPE, "application/json")
            .header("X-Idempotency-Key", idempotency_key)
            .json(request)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "create pix charge").await?;

        let payment: MpPayment = resp.json().await?;
        Ok(payment)
    }

    /// Fetches the authoritative payment state by id. Reconciliation always
    /// goes through this call instead of trusting callback bodies.
    pub async fn get_payment(&self, access_token: &str, payment_id: &str) -> Result<MpPayment> {
        // https://www.mercadopago.com.br/developers/en/reference/payments/_payments_id/get
        let resp = self
            .http
            .get(format!("{API_BASE_URL}/v1/payments/{payment_id}"))
            .header(AUTHORIZATION, format!("Bearer {access_token}"))
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "get payment").await?;

        let payment: MpPayment = resp.json().await?;
        Ok(payment)
    }

    /// Exchanges a refresh token for fresh tenant credentials.
    pub async fn refresh_access_token(
        &self,
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
    ) -> Result<MpTokenResponse> {
        // https://www.mercadopago.com.br/developers/en/reference/oauth/_oauth_token/post
        let body = [
            ("grant_type", "refresh_token"),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("refresh_token", refresh_token),
        ];

        let resp = self
            .http
            .post(format!("{API_BASE_URL}/oauth/token"))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "refresh access token").await?;

        let tokens: MpTokenResponse = resp.json().await?;
        Ok(tokens)
    }
}
