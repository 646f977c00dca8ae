use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FinancialRecordStatus {
    #[default]
    Pending,
    Paid,
}

impl FinancialRecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinancialRecordStatus::Pending => "pending",
            FinancialRecordStatus::Paid => "paid",
        }
    }

    pub fn from_str(value: &str) -> Self {
        match value {
            "paid" => FinancialRecordStatus::Paid,
            _ => FinancialRecordStatus::Pending,
        }
    }
}

impl Display for FinancialRecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
