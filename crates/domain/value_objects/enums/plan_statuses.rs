use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Effective access tier a tenant resolves to at a given instant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    Trial,
    Active,
    Expired,
}

impl Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            PlanStatus::Trial => "trial",
            PlanStatus::Active => "active",
            PlanStatus::Expired => "expired",
        };
        f.write_str(status)
    }
}
