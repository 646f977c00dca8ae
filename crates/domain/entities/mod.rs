pub mod financial_records;
pub mod payment_integrations;
pub mod subscriptions;
pub mod tickets;
pub mod users;
