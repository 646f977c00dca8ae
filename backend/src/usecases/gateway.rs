use anyhow::Result as AnyResult;
use async_trait::async_trait;
use crates::payments::mercadopago::{
    CreatePixChargeRequest, MercadoPagoClient, MpPayment, MpTokenResponse,
};

/// Seam over the gateway client so charge creation and reconciliation can be
/// tested against fakes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_pix_charge(
        &self,
        access_token: &str,
        request: &CreatePixChargeRequest,
        idempotency_key: &str,
    ) -> AnyResult<MpPayment>;

    async fn get_payment(&self, access_token: &str, payment_id: &str) -> AnyResult<MpPayment>;

    async fn refresh_access_token(
        &self,
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
    ) -> AnyResult<MpTokenResponse>;
}

#[async_trait]
impl PaymentGateway for MercadoPagoClient {
    async fn create_pix_charge(
        &self,
        access_token: &str,
        request: &CreatePixChargeRequest,
        idempotency_key: &str,
    ) -> AnyResult<MpPayment> {
        self.create_pix_charge(access_token, request, idempotency_key)
            .await
    }

    async fn get_payment(&self, access_token: &str, payment_id: &str) -> AnyResult<MpPayment> {
        self.get_payment(access_token, payment_id).await
    }

    async fn refresh_access_token(
        &self,
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
    ) -> AnyResult<MpTokenResponse> {
        self.refresh_access_token(client_id, client_secret, refresh_token)
            .await
    }
}
