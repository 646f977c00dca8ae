use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UserRole {
    #[default]
    Technician,
    Company,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Technician => "technician",
            UserRole::Company => "company",
            UserRole::Admin => "admin",
        }
    }

    pub fn from_str(value: &str) -> Self {
        match value {
            "company" => UserRole::Company,
            "admin" => UserRole::Admin,
            _ => UserRole::Technician,
        }
    }
}

impl Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
