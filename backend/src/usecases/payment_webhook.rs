use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Months, Utc};
use crates::{
    domain::{
        entities::subscriptions::InsertSubscriptionEntity,
        repositories::{
            financial_records::FinancialRecordRepository,
            payment_integrations::PaymentIntegrationRepository,
            subscriptions::SubscriptionRepository,
            technician_affiliations::TechnicianAffiliationRepository,
            tickets::TicketRepository, users::UserRepository,
        },
        value_objects::enums::subscription_statuses::SubscriptionStatus,
    },
    payments::mercadopago::MpPayment,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::usecases::{
    charges::GATEWAY_PROVIDER,
    gateway::PaymentGateway,
    settlement::{SettlementError, SettlementUseCase},
};

/// Plan purchases may buy 1-5 billing cycles at once; anything else in the
/// metadata is clamped into this range.
const MIN_PLAN_MONTHS: i64 = 1;
const MAX_PLAN_MONTHS: i64 = 5;

/// Normalized provider notification, merged from query and body by the
/// transport layer. Only the payment id pointer is trusted; status always
/// comes from the authoritative fetch.
#[derive(Debug, Clone, Default)]
pub struct WebhookNotification {
    pub topic: Option<String>,
    pub payment_id: Option<String>,
    pub tenant_id: Option<Uuid>,
    pub record_id: Option<Uuid>,
    pub ticket_id: Option<Uuid>,
}

#[derive(Debug, PartialEq)]
pub enum WebhookOutcome {
    /// Acknowledged and discarded: no payment pointer, foreign topic, or an
    /// unresolvable business reference.
    Ignored,
    /// Authoritative status was not approved; nothing changed.
    Observed { status: String },
    RecordSettled { record_id: Uuid },
    PlanApplied {
        subscription_id: Uuid,
        end_date: Option<DateTime<Utc>>,
    },
}

#[derive(Debug)]
enum PaymentPurpose {
    Settlement { reference_id: Uuid },
    PlanPurchase { tenant_id: Uuid, plan_id: String },
    Unknown,
}

/// Drives the settlement engine and the subscription upserts from provider
/// callbacks. Deliveries are at-least-once and unordered; every applied
/// effect is idempotent, so no dedup table is kept.
pub struct PaymentWebhookUseCase<G, I, S, U, R, T, A>
where
    G: PaymentGateway + Send + Sync + 'static,
    I: PaymentIntegrationRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    R: FinancialRecordRepository + Send + Sync + 'static,
    T: TicketRepository + Send + Sync + 'static,
    A: TechnicianAffiliationRepository + Send + Sync + 'static,
{
    gateway: Arc<G>,
    integration_repo: Arc<I>,
    subscription_repo: Arc<S>,
    user_repo: Arc<U>,
    settlement: Arc<SettlementUseCase<R, T, U, A>>,
    platform_access_token: Option<String>,
}

impl<G, I, S, U, R, T, A> PaymentWebhookUseCase<G, I, S, U, R, T, A>
where
    G: PaymentGateway + Send + Sync + 'static,
    I: PaymentIntegrationRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    R: FinancialRecordRepository + Send + Sync + 'static,
    T: TicketRepository + Send + Sync + 'static,
    A: TechnicianAffiliationRepository + Send + Sync + 'static,
{
    pub fn new(
        gateway: Arc<G>,
        integration_repo: Arc<I>,
        subscription_repo: Arc<S>,
        user_repo: Arc<U>,
        settlement: Arc<SettlementUseCase<R, T, U, A>>,
        platform_access_token: Option<String>,
    ) -> Self {
        Self {
            gateway,
            integration_repo,
            subscription_repo,
            user_repo,
            settlement,
            platform_access_token,
        }
    }

    /// Runs the per-notification state machine. An `Err` means the
    /// authoritative fetch (or a store write) failed and the provider should
    /// retry; every business-level miss resolves to an acknowledged outcome.
    pub async fn process(&self, notification: WebhookNotification) -> Result<WebhookOutcome> {
        let Some(payment_id) = notification
            .payment_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
        else {
            debug!("payment_webhook: notification without payment id, ignoring");
            return Ok(WebhookOutcome::Ignored);
        };

        if let Some(topic) = notification.topic.as_deref() {
            if !is_payment_topic(topic) {
                debug!(topic, "payment_webhook: non-payment topic, ignoring");
                return Ok(WebhookOutcome::Ignored);
            }
        }

        let Some(access_token) = self.resolve_access_token(&notification).await? else {
            warn!(
                payment_id,
                tenant_id = ?notification.tenant_id,
                "payment_webhook: no usable gateway credentials for notification"
            );
            return Ok(WebhookOutcome::Ignored);
        };

        // The callback is only a pointer; status comes from the provider.
        let payment = self
            .gateway
            .get_payment(&access_token, payment_id)
            .await
            .context("authoritative payment fetch failed")?;

        let status = payment.status.clone().unwrap_or_else(|| "unknown".to_string());
        let purpose = classify(&payment, &notification);
        info!(
            payment_id,
            %status,
            purpose = ?purpose,
            "payment_webhook: payment fetched"
        );

        if status != "approved" {
            info!(payment_id, %status, "payment_webhook: non-approved status observed only");
            return Ok(WebhookOutcome::Observed { status });
        }

        match purpose {
            PaymentPurpose::Settlement { reference_id } => {
                let paid_at = payment.date_approved.unwrap_or_else(Utc::now);
                match self.settlement.settle_reference(reference_id, paid_at).await {
                    Ok(record) => Ok(WebhookOutcome::RecordSettled { record_id: record.id }),
                    Err(SettlementError::NotFound) | Err(SettlementError::Forbidden) => {
                        warn!(
                            payment_id,
                            %reference_id,
                            "payment_webhook: settlement reference could not be applied"
                        );
                        Ok(WebhookOutcome::Ignored)
                    }
                    Err(SettlementError::Internal(err)) => Err(err),
                }
            }
            PaymentPurpose::PlanPurchase { tenant_id, plan_id } => {
                self.apply_plan_purchase(payment_id, &payment, tenant_id, plan_id)
                    .await
            }
            PaymentPurpose::Unknown => {
                warn!(payment_id, "payment_webhook: approved payment with no resolvable purpose");
                Ok(WebhookOutcome::Ignored)
            }
        }
    }

    async fn resolve_access_token(
        &self,
        notification: &WebhookNotification,
    ) -> Result<Option<String>> {
        match notification.tenant_id {
            Some(tenant_id) => {
                let integration = self
                    .integration_repo
                    .find_by_user_and_provider(tenant_id, GATEWAY_PROVIDER.to_string())
                    .await?;
                Ok(integration.and_then(|integration| integration.access_token))
            }
            None => Ok(self.platform_access_token.clone()),
        }
    }

    /// Extends the tenant's active subscription or creates a new one. The
    /// upsert is keyed by the gateway payment id, so redelivering the same
    /// approved payment never stacks months twice.
    async fn apply_plan_purchase(
        &self,
        payment_id: &str,
        payment: &MpPayment,
        tenant_id: Uuid,
        plan_id: String,
    ) -> Result<WebhookOutcome> {
        if let Some(existing) = self
            .subscription_repo
            .find_by_payment_ref(payment_id.to_string())
            .await?
        {
            info!(
                payment_id,
                subscription_id = %existing.id,
                "payment_webhook: payment already applied to subscription"
            );
            return Ok(WebhookOutcome::PlanApplied {
                subscription_id: existing.id,
                end_date: existing.end_date,
            });
        }

        let Some(tenant) = self.user_repo.find_by_id(tenant_id).await? else {
            warn!(payment_id, %tenant_id, "payment_webhook: plan purchase for unknown tenant");
            return Ok(WebhookOutcome::Ignored);
        };

        let months = payment
            .metadata_i64("months")
            .unwrap_or(MIN_PLAN_MONTHS)
            .clamp(MIN_PLAN_MONTHS, MAX_PLAN_MONTHS);
        let cycle_multiplier = if is_yearly_plan(&plan_id) { 12 } else { 1 };
        let cycle_months = (months * cycle_multiplier) as u32;

        let now = Utc::now();
        let email = tenant.email.trim().to_lowercase();
        let subscriptions = self.subscription_repo.find_by_email(email.clone()).await?;
        let active = subscriptions
            .into_iter()
            .find(|subscription| subscription.is_active_at(now));

        match active {
            Some(subscription) => {
                // Extend from whichever is later: now or the current end.
                let base = subscription
                    .end_date
                    .filter(|end| *end > now)
                    .unwrap_or(now);
                let new_end = base
                    .checked_add_months(Months::new(cycle_months))
                    .context("failed to compute extended subscription end date")?;

                self.subscription_repo
                    .extend_period(subscription.id, new_end, payment_id.to_string())
                    .await?;

                info!(
                    payment_id,
                    subscription_id = %subscription.id,
                    months,
                    cycle_months,
                    %new_end,
                    "payment_webhook: subscription extended"
                );

                Ok(WebhookOutcome::PlanApplied {
                    subscription_id: subscription.id,
                    end_date: Some(new_end),
                })
            }
            None => {
                let end_date = now
                    .checked_add_months(Months::new(cycle_months))
                    .context("failed to compute subscription end date")?;

                let subscription_id = self
                    .subscription_repo
                    .create(InsertSubscriptionEntity {
                        email,
                        role: tenant.role.clone(),
                        plan_id: plan_id.clone(),
                        status: SubscriptionStatus::Active.to_string(),
                        start_date: now,
                        end_date: Some(end_date),
                        gateway_payment_ref: Some(payment_id.to_string()),
                    })
                    .await?;

                info!(
                    payment_id,
                    %subscription_id,
                    %plan_id,
                    months,
                    cycle_months,
                    %end_date,
                    "payment_webhook: subscription created"
                );

                Ok(WebhookOutcome::PlanApplied {
                    subscription_id,
                    end_date: Some(end_date),
                })
            }
        }
    }
}

fn is_payment_topic(topic: &str) -> bool {
    topic == "payment" || topic.starts_with("payment.")
}

fn is_yearly_plan(plan_id: &str) -> bool {
    plan_id.contains("yearly") || plan_id.contains("anual")
}

/// Purpose resolution order: metadata recorded at charge creation, then the
/// `plan:<tenant>:<plan>` external-reference convention, then the reference
/// hints the callback URL itself carried.
fn classify(payment: &MpPayment, notification: &WebhookNotification) -> PaymentPurpose {
    if let Some(reference_id) = payment
        .metadata_str("record_id")
        .and_then(|value| Uuid::parse_str(&value).ok())
    {
        return PaymentPurpose::Settlement { reference_id };
    }

    if let Some(reference_id) = payment
        .metadata_str("ticket_id")
        .and_then(|value| Uuid::parse_str(&value).ok())
    {
        return PaymentPurpose::Settlement { reference_id };
    }

    if let Some((tenant_id, plan_id)) = payment
        .external_reference
        .as_deref()
        .and_then(parse_plan_reference)
    {
        return PaymentPurpose::PlanPurchase { tenant_id, plan_id };
    }

    if let Some(reference_id) = notification.record_id.or(notification.ticket_id) {
        return PaymentPurpose::Settlement { reference_id };
    }

    PaymentPurpose::Unknown
}

fn parse_plan_reference(reference: &str) -> Option<(Uuid, String)> {
    let rest = reference.strip_prefix("plan:")?;
    let (tenant, plan) = rest.split_once(':')?;
    let tenant_id = Uuid::parse_str(tenant).ok()?;
    if plan.is_empty() {
        return None;
    }

    Some((tenant_id, plan.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crates::domain::{
        entities::{
            financial_records::FinancialRecordEntity,
            payment_integrations::PaymentIntegrationEntity, subscriptions::SubscriptionEntity,
            users::UserEntity,
        },
        repositories::{
            financial_records::MockFinancialRecordRepository,
            payment_integrations::MockPaymentIntegrationRepository,
            subscriptions::MockSubscriptionRepository,
            technician_affiliations::MockTechnicianAffiliationRepository,
            tickets::MockTicketRepository, users::MockUserRepository,
        },
        value_objects::enums::financial_record_statuses::FinancialRecordStatus,
    };
    use mockall::predicate::eq;
    use rust_decimal_macros::dec;

    use crate::usecases::gateway::MockPaymentGateway;

    type TestUseCase = PaymentWebhookUseCase<
        MockPaymentGateway,
        MockPaymentIntegrationRepository,
        MockSubscriptionRepository,
        MockUserRepository,
        MockFinancialRecordRepository,
        MockTicketRepository,
        MockTechnicianAffiliationRepository,
    >;

    struct TestRepos {
        gateway: MockPaymentGateway,
        integration_repo: MockPaymentIntegrationRepository,
        subscription_repo: MockSubscriptionRepository,
        user_repo: MockUserRepository,
        record_repo: MockFinancialRecordRepository,
        ticket_repo: MockTicketRepository,
    }

    impl Default for TestRepos {
        fn default() -> Self {
            Self {
                gateway: MockPaymentGateway::new(),
                integration_repo: MockPaymentIntegrationRepository::new(),
                subscription_repo: MockSubscriptionRepository::new(),
                user_repo: MockUserRepository::new(),
                record_repo: MockFinancialRecordRepository::new(),
                ticket_repo: MockTicketRepository::new(),
            }
        }
    }

    impl TestRepos {
        fn build(self, platform_token: Option<&str>) -> TestUseCase {
            let user_repo = Arc::new(self.user_repo);
            let settlement = Arc::new(SettlementUseCase::new(
                Arc::new(self.record_repo),
                Arc::new(self.ticket_repo),
                Arc::clone(&user_repo),
                Arc::new(MockTechnicianAffiliationRepository::new()),
            ));

            PaymentWebhookUseCase::new(
                Arc::new(self.gateway),
                Arc::new(self.integration_repo),
                Arc::new(self.subscription_repo),
                user_repo,
                settlement,
                platform_token.map(|token| token.to_string()),
            )
        }
    }

    fn approved_payment(metadata: serde_json::Value, external_reference: Option<&str>) -> MpPayment {
        serde_json::from_value(serde_json::json!({
            "id": 555001,
            "status": "approved",
            "date_approved": "2026-08-01T12:00:00Z",
            "external_reference": external_reference,
            "metadata": metadata,
        }))
        .unwrap()
    }

    fn pending_record(record_id: Uuid) -> FinancialRecordEntity {
        let now = Utc::now();
        FinancialRecordEntity {
            id: record_id,
            user_id: Uuid::new_v4(),
            ticket_id: None,
            client_id: None,
            amount: dec!(200.00),
            status: FinancialRecordStatus::Pending.to_string(),
            due_date: now,
            paid_at: None,
            description: None,
            created_at: now,
        }
    }

    fn sample_tenant(id: Uuid, email: &str) -> UserEntity {
        let now = Utc::now();
        UserEntity {
            id,
            email: email.to_string(),
            role: "technician".to_string(),
            status: "active".to_string(),
            pix_key: None,
            merchant_name: None,
            merchant_city: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn active_subscription(email: &str, end_date: Option<DateTime<Utc>>) -> SubscriptionEntity {
        let now = Utc::now();
        SubscriptionEntity {
            id: Uuid::new_v4(),
            email: email.to_string(),
            role: "technician".to_string(),
            plan_id: "tech_monthly".to_string(),
            status: SubscriptionStatus::Active.to_string(),
            start_date: now - Duration::days(20),
            end_date,
            gateway_payment_ref: Some("111".to_string()),
            created_at: now - Duration::days(20),
            updated_at: now - Duration::days(20),
        }
    }

    #[tokio::test]
    async fn notification_without_payment_id_is_ignored() {
        let usecase = TestRepos::default().build(Some("platform-token"));

        let outcome = usecase
            .process(WebhookNotification {
                topic: Some("payment".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(outcome, WebhookOutcome::Ignored);
    }

    #[tokio::test]
    async fn non_payment_topic_is_ignored_without_fetch() {
        let usecase = TestRepos::default().build(Some("platform-token"));

        let outcome = usecase
            .process(WebhookNotification {
                topic: Some("merchant_order".to_string()),
                payment_id: Some("555001".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(outcome, WebhookOutcome::Ignored);
    }

    #[tokio::test]
    async fn approved_settlement_applies_once_across_redeliveries() {
        let record_id = Uuid::new_v4();
        let pending = pending_record(record_id);
        let approved_at: DateTime<Utc> = "2026-08-01T12:00:00Z".parse().unwrap();

        let mut paid = pending.clone();
        paid.status = FinancialRecordStatus::Paid.to_string();
        paid.paid_at = Some(approved_at);
        let paid_for_second = paid.clone();

        let mut repos = TestRepos::default();
        repos.gateway.expect_get_payment().times(2).returning({
            let record_id = record_id.to_string();
            move |_, _| {
                let payment = approved_payment(
                    serde_json::json!({
                        "record_id": record_id.clone(),
                        "purpose": "record-settlement"
                    }),
                    Some("A1B2"),
                );
                Box::pin(async move { Ok(payment) })
            }
        });

        // First delivery sees a pending record and settles it; the second
        // sees it paid and must not touch the store again.
        let deliveries = std::sync::atomic::AtomicUsize::new(0);
        repos
            .record_repo
            .expect_find_by_id()
            .with(eq(record_id))
            .times(2)
            .returning(move |_| {
                let seen = deliveries.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                let record = if seen == 0 {
                    pending.clone()
                } else {
                    paid_for_second.clone()
                };
                Box::pin(async move { Ok(Some(record)) })
            });
        repos
            .record_repo
            .expect_mark_paid()
            .with(eq(record_id), eq(approved_at))
            .times(1)
            .returning(move |_, _| {
                let paid = paid.clone();
                Box::pin(async move { Ok(paid) })
            });

        let usecase = repos.build(Some("platform-token"));

        let notification = WebhookNotification {
            topic: Some("payment".to_string()),
            payment_id: Some("555001".to_string()),
            ..Default::default()
        };

        let first = usecase.process(notification.clone()).await.unwrap();
        assert_eq!(first, WebhookOutcome::RecordSettled { record_id });

        let second = usecase.process(notification).await.unwrap();
        assert_eq!(second, WebhookOutcome::RecordSettled { record_id });
    }

    #[tokio::test]
    async fn non_approved_status_is_observed_only() {
        let mut repos = TestRepos::default();
        repos.gateway.expect_get_payment().returning(|_, _| {
            Box::pin(async {
                Ok(serde_json::from_value(serde_json::json!({
                    "id": 555001,
                    "status": "rejected",
                    "metadata": {"record_id": Uuid::new_v4().to_string()}
                }))
                .unwrap())
            })
        });

        let usecase = repos.build(Some("platform-token"));

        let outcome = usecase
            .process(WebhookNotification {
                payment_id: Some("555001".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(
            outcome,
            WebhookOutcome::Observed {
                status: "rejected".to_string()
            }
        );
    }

    #[tokio::test]
    async fn fetch_failure_propagates_for_provider_retry() {
        let mut repos = TestRepos::default();
        repos
            .gateway
            .expect_get_payment()
            .returning(|_, _| Box::pin(async { Err(anyhow::anyhow!("timed out")) }));

        let usecase = repos.build(Some("platform-token"));

        let result = usecase
            .process(WebhookNotification {
                payment_id: Some("555001".to_string()),
                ..Default::default()
            })
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn tenant_scoped_notification_uses_tenant_credentials() {
        let tenant_id = Uuid::new_v4();
        let record_id = Uuid::new_v4();
        let now = Utc::now();

        let integration = PaymentIntegrationEntity {
            id: Uuid::new_v4(),
            user_id: tenant_id,
            provider: GATEWAY_PROVIDER.to_string(),
            status: "active".to_string(),
            access_token: Some("tenant-token".to_string()),
            refresh_token: None,
            token_expires_at: None,
            public_key: None,
            provider_user_id: None,
            created_at: now,
            updated_at: now,
        };

        let mut repos = TestRepos::default();
        repos
            .integration_repo
            .expect_find_by_user_and_provider()
            .with(eq(tenant_id), eq(GATEWAY_PROVIDER.to_string()))
            .returning(move |_, _| {
                let integration = integration.clone();
                Box::pin(async move { Ok(Some(integration)) })
            });
        repos
            .gateway
            .expect_get_payment()
            .withf(|token, _| token == "tenant-token")
            .returning(|_, _| {
                Box::pin(async {
                    Ok(serde_json::from_value::<MpPayment>(serde_json::json!({
                        "id": 555001,
                        "status": "pending",
                        "metadata": {}
                    }))
                    .unwrap())
                })
            });

        let usecase = repos.build(None);

        let outcome = usecase
            .process(WebhookNotification {
                payment_id: Some("555001".to_string()),
                tenant_id: Some(tenant_id),
                record_id: Some(record_id),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(
            outcome,
            WebhookOutcome::Observed {
                status: "pending".to_string()
            }
        );
    }

    #[tokio::test]
    async fn plan_purchase_extends_active_subscription_from_later_of_now_and_end() {
        let tenant_id = Uuid::new_v4();
        let current_end = Utc::now() + Duration::days(10);
        let subscription = active_subscription("tenant@example.com", Some(current_end));
        let subscription_id = subscription.id;
        let expected_end = current_end.checked_add_months(Months::new(3)).unwrap();

        let mut repos = TestRepos::default();
        repos.gateway.expect_get_payment().returning({
            let reference = format!("plan:{tenant_id}:tech_monthly");
            move |_, _| {
                let payment =
                    approved_payment(serde_json::json!({"months": 3}), Some(reference.as_str()));
                Box::pin(async move { Ok(payment) })
            }
        });
        repos
            .subscription_repo
            .expect_find_by_payment_ref()
            .with(eq("555001".to_string()))
            .returning(|_| Box::pin(async { Ok(None) }));
        repos
            .user_repo
            .expect_find_by_id()
            .with(eq(tenant_id))
            .returning(move |_| {
                let tenant = sample_tenant(tenant_id, "Tenant@Example.com");
                Box::pin(async move { Ok(Some(tenant)) })
            });
        repos
            .subscription_repo
            .expect_find_by_email()
            .with(eq("tenant@example.com".to_string()))
            .returning(move |_| {
                let subscription = subscription.clone();
                Box::pin(async move { Ok(vec![subscription]) })
            });
        repos
            .subscription_repo
            .expect_extend_period()
            .with(eq(subscription_id), eq(expected_end), eq("555001".to_string()))
            .times(1)
            .returning(|_, _, _| Box::pin(async { Ok(()) }));

        let usecase = repos.build(Some("platform-token"));

        let outcome = usecase
            .process(WebhookNotification {
                payment_id: Some("555001".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(
            outcome,
            WebhookOutcome::PlanApplied {
                subscription_id,
                end_date: Some(expected_end),
            }
        );
    }

    #[tokio::test]
    async fn plan_purchase_clamps_months_and_creates_subscription() {
        let tenant_id = Uuid::new_v4();

        let mut repos = TestRepos::default();
        repos.gateway.expect_get_payment().returning({
            let reference = format!("plan:{tenant_id}:tech_monthly");
            move |_, _| {
                let payment =
                    approved_payment(serde_json::json!({"months": 9}), Some(reference.as_str()));
                Box::pin(async move { Ok(payment) })
            }
        });
        repos
            .subscription_repo
            .expect_find_by_payment_ref()
            .returning(|_| Box::pin(async { Ok(None) }));
        repos
            .user_repo
            .expect_find_by_id()
            .returning(move |_| {
                let tenant = sample_tenant(tenant_id, "tenant@example.com");
                Box::pin(async move { Ok(Some(tenant)) })
            });
        repos
            .subscription_repo
            .expect_find_by_email()
            .returning(|_| Box::pin(async { Ok(vec![]) }));
        repos
            .subscription_repo
            .expect_create()
            .withf(|subscription| {
                // months=9 clamps to 5 on a monthly plan.
                subscription.end_date
                    == subscription.start_date.checked_add_months(Months::new(5))
                    && subscription.gateway_payment_ref.as_deref() == Some("555001")
                    && subscription.status == "active"
            })
            .times(1)
            .returning(|_| Box::pin(async { Ok(Uuid::new_v4()) }));

        let usecase = repos.build(Some("platform-token"));

        let outcome = usecase
            .process(WebhookNotification {
                payment_id: Some("555001".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(matches!(outcome, WebhookOutcome::PlanApplied { .. }));
    }

    #[tokio::test]
    async fn yearly_plan_multiplies_billing_cycles() {
        let tenant_id = Uuid::new_v4();

        let mut repos = TestRepos::default();
        repos.gateway.expect_get_payment().returning({
            let reference = format!("plan:{tenant_id}:tech_yearly");
            move |_, _| {
                let payment =
                    approved_payment(serde_json::json!({"months": 1}), Some(reference.as_str()));
                Box::pin(async move { Ok(payment) })
            }
        });
        repos
            .subscription_repo
            .expect_find_by_payment_ref()
            .returning(|_| Box::pin(async { Ok(None) }));
        repos
            .user_repo
            .expect_find_by_id()
            .returning(move |_| {
                let tenant = sample_tenant(tenant_id, "tenant@example.com");
                Box::pin(async move { Ok(Some(tenant)) })
            });
        repos
            .subscription_repo
            .expect_find_by_email()
            .returning(|_| Box::pin(async { Ok(vec![]) }));
        repos
            .subscription_repo
            .expect_create()
            .withf(|subscription| {
                subscription.end_date
                    == subscription.start_date.checked_add_months(Months::new(12))
            })
            .times(1)
            .returning(|_| Box::pin(async { Ok(Uuid::new_v4()) }));

        let usecase = repos.build(Some("platform-token"));

        let outcome = usecase
            .process(WebhookNotification {
                payment_id: Some("555001".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(matches!(outcome, WebhookOutcome::PlanApplied { .. }));
    }

    #[tokio::test]
    async fn redelivered_plan_payment_is_not_applied_twice() {
        let tenant_id = Uuid::new_v4();
        let existing = active_subscription("tenant@example.com", Some(Utc::now() + Duration::days(90)));
        let existing_id = existing.id;
        let existing_end = existing.end_date;

        let mut repos = TestRepos::default();
        repos.gateway.expect_get_payment().returning({
            let reference = format!("plan:{tenant_id}:tech_monthly");
            move |_, _| {
                let payment =
                    approved_payment(serde_json::json!({"months": 3}), Some(reference.as_str()));
                Box::pin(async move { Ok(payment) })
            }
        });
        repos
            .subscription_repo
            .expect_find_by_payment_ref()
            .with(eq("555001".to_string()))
            .returning(move |_| {
                let existing = existing.clone();
                Box::pin(async move { Ok(Some(existing)) })
            });
        // No extend/create expectations: redelivery must be a pure no-op.

        let usecase = repos.build(Some("platform-token"));

        let outcome = usecase
            .process(WebhookNotification {
                payment_id: Some("555001".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(
            outcome,
            WebhookOutcome::PlanApplied {
                subscription_id: existing_id,
                end_date: existing_end,
            }
        );
    }

    #[tokio::test]
    async fn approved_payment_with_unknown_reference_is_acknowledged() {
        let mut repos = TestRepos::default();
        repos.gateway.expect_get_payment().returning(|_, _| {
            Box::pin(async {
                Ok(serde_json::from_value::<MpPayment>(serde_json::json!({
                    "id": 555001,
                    "status": "approved",
                    "metadata": {}
                }))
                .unwrap())
            })
        });

        let usecase = repos.build(Some("platform-token"));

        let outcome = usecase
            .process(WebhookNotification {
                payment_id: Some("555001".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(outcome, WebhookOutcome::Ignored);
    }
}
