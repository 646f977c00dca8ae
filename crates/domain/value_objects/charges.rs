use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::enums::charge_providers::{ChargeProvider, ProviderChoice};

/// Identity of the anonymous payer, as collected on the public payment page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayerInfo {
    pub name: Option<String>,
    pub email: Option<String>,
    pub tax_id: Option<String>,
}

/// Brazilian payer document, classified by digit count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayerDocument {
    Cpf(String),
    Cnpj(String),
}

impl PayerDocument {
    /// Classifies a raw tax id by the number of digits it carries: 11 digits
    /// is a personal CPF, 14 a business CNPJ. Anything else is unusable for
    /// gateway charges.
    pub fn classify(tax_id: &str) -> Option<Self> {
        let digits: String = tax_id.chars().filter(|c| c.is_ascii_digit()).collect();
        match digits.len() {
            11 => Some(PayerDocument::Cpf(digits)),
            14 => Some(PayerDocument::Cnpj(digits)),
            _ => None,
        }
    }

    pub fn type_code(&self) -> &'static str {
        match self {
            PayerDocument::Cpf(_) => "CPF",
            PayerDocument::Cnpj(_) => "CNPJ",
        }
    }

    pub fn number(&self) -> &str {
        match self {
            PayerDocument::Cpf(number) => number,
            PayerDocument::Cnpj(number) => number,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChargeRequest {
    pub amount: Decimal,
    pub payer: PayerInfo,
    pub description: Option<String>,
    /// Caller-supplied external reference, also used to derive the static
    /// payload transaction id.
    pub reference: String,
    #[serde(default)]
    pub provider: ProviderChoice,
}

/// Payable artifact handed to the payer page. Never persisted; the external
/// payment id is the correlation key reconciliation uses later.
#[derive(Debug, Clone, Serialize)]
pub struct ChargeArtifact {
    pub provider: ChargeProvider,
    pub payload: Option<String>,
    pub qr_image_data_uri: Option<String>,
    pub external_payment_id: Option<String>,
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_eleven_digit_document_as_cpf() {
        let document = PayerDocument::classify("12345678901").unwrap();
        assert_eq!(document, PayerDocument::Cpf("12345678901".to_string()));
        assert_eq!(document.type_code(), "CPF");
    }

    #[test]
    fn classifies_fourteen_digit_document_as_cnpj() {
        let document = PayerDocument::classify("12345678000199").unwrap();
        assert_eq!(document.type_code(), "CNPJ");
        assert_eq!(document.number(), "12345678000199");
    }

    #[test]
    fn strips_punctuation_before_classifying() {
        let document = PayerDocument::classify("123.456.789-01").unwrap();
        assert_eq!(document, PayerDocument::Cpf("12345678901".to_string()));
    }

    #[test]
    fn rejects_other_digit_counts() {
        assert_eq!(PayerDocument::classify("1234567"), None);
        assert_eq!(PayerDocument::classify(""), None);
        assert_eq!(PayerDocument::classify("123456789012345"), None);
    }
}
