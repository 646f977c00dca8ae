pub mod billing_links;
pub mod charges;
pub mod gateway;
pub mod payment_webhook;
pub mod plan_access;
pub mod settlement;
