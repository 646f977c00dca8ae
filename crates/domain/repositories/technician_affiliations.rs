use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

#[async_trait]
#[automock]
pub trait TechnicianAffiliationRepository {
    /// Whether the company currently holds an accepted affiliation with the
    /// technician. Pending and rejected relations grant nothing.
    async fn is_accepted(&self, company_id: Uuid, technician_id: Uuid) -> Result<bool>;
}
