pub mod financial_records;
pub mod payment_integrations;
pub mod subscriptions;
pub mod technician_affiliations;
pub mod tickets;
pub mod users;
