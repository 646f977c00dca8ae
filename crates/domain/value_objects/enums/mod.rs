pub mod charge_providers;
pub mod financial_record_statuses;
pub mod plan_statuses;
pub mod subscription_statuses;
pub mod user_roles;
