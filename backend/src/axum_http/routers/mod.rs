pub mod billing_links;
pub mod financial_records;
pub mod payment_webhook;
pub mod plan_access;
pub mod public_payment;
