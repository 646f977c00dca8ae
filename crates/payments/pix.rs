use std::fmt::Display;

use anyhow::{Context, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use qrcode::QrCode;
use rust_decimal::Decimal;

/// The rail caps the free-text transaction id at 25 characters.
pub const MAX_TXID_LEN: usize = 25;

const MAX_MERCHANT_NAME_LEN: usize = 25;
const MAX_MERCHANT_CITY_LEN: usize = 15;
const MAX_DESCRIPTION_LEN: usize = 72;

/// Static instant-payment payload. Serialization follows the EMV field
/// grammar consumed by scanning wallets: fixed field order, two-digit length
/// prefixes, CRC16 footer.
#[derive(Debug, Clone)]
pub struct PixPayload {
    pub key: String,
    pub amount: Option<Decimal>,
    pub merchant_name: String,
    pub merchant_city: String,
    pub txid: String,
    pub description: Option<String>,
}

impl PixPayload {
    pub fn new(
        key: impl Into<String>,
        amount: Option<Decimal>,
        merchant_name: impl Into<String>,
        merchant_city: impl Into<String>,
        txid: impl Into<String>,
        description: Option<String>,
    ) -> Self {
        Self {
            key: key.into(),
            amount,
            merchant_name: merchant_name.into(),
            merchant_city: merchant_city.into(),
            txid: txid.into(),
            description,
        }
    }
}

impl Display for PixPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let normalized_key = self.key.trim();
        let normalized_name = non_empty_or(
            sanitize_text(&self.merchant_name, MAX_MERCHANT_NAME_LEN),
            "RECEBEDOR",
        );
        let normalized_city = non_empty_or(
            sanitize_text(&self.merchant_city, MAX_MERCHANT_CITY_LEN),
            "BRASIL",
        );
        let normalized_txid = non_empty_or(sanitize_text(&self.txid, MAX_TXID_LEN), "***");
        let normalized_description = self
            .description
            .as_deref()
            .map(|value| sanitize_text(value, MAX_DESCRIPTION_LEN))
            .filter(|value| !value.is_empty());

        let gui = field("00", "br.gov.bcb.pix");
        let key = field("01", normalized_key);
        let description = normalized_description
            .map(|value| field("02", &value))
            .unwrap_or_default();
        let merchant_account_info = field("26", &format!("{gui}{key}{description}"));

        let payload_format = "000201";
        let point_of_initiation = "010211";
        let merchant_category_code = "52040000";
        let transaction_currency = "5303986";
        let transaction_amount = format_amount(self.amount)
            .map(|value| field("54", &value))
            .unwrap_or_default();
        let country_code = "5802BR";
        let merchant_name_field = field("59", &normalized_name);
        let merchant_city_field = field("60", &normalized_city);
        let additional_data_field = field("62", &field("05", &normalized_txid));

        let payload = format!(
            "{payload_format}{point_of_initiation}{merchant_account_info}\
             {merchant_category_code}{transaction_currency}{transaction_amount}\
             {country_code}{merchant_name_field}{merchant_city_field}\
             {additional_data_field}6304"
        );
        let crc = crc16_ccitt(&payload);

        write!(f, "{payload}{crc}")
    }
}

/// Drops everything outside the printable ASCII range the rail accepts,
/// trims, and truncates.
fn sanitize_text(value: &str, max_len: usize) -> String {
    value
        .chars()
        .filter(|c| (' '..='~').contains(c))
        .collect::<String>()
        .trim()
        .chars()
        .take(max_len)
        .collect()
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

fn format_amount(amount: Option<Decimal>) -> Option<String> {
    let amount = amount?;
    if amount <= Decimal::ZERO {
        return None;
    }

    Some(format!("{amount:.2}"))
}

fn field(id: &str, value: &str) -> String {
    format!("{id}{:02}{value}", value.len())
}

/// CRC16-CCITT (0xFFFF initial, 0x1021 polynomial), uppercase hex, as the
/// rail's checksum rule prescribes.
pub fn crc16_ccitt(payload: &str) -> String {
    let mut result: u16 = 0xffff;

    for byte in payload.bytes() {
        result ^= u16::from(byte) << 8;
        for _ in 0..8 {
            if result & 0x8000 != 0 {
                result = (result << 1) ^ 0x1021;
            } else {
                result <<= 1;
            }
        }
    }

    format!("{result:04X}")
}

/// Renders the payload to a scannable SVG image, returned as a data URI.
/// Pure function of the payload string.
pub fn qr_svg_data_uri(payload: &str) -> Result<String> {
    let code = QrCode::new(payload.as_bytes()).context("failed to build qr code for payload")?;
    let svg = code
        .render::<qrcode::render::svg::Color>()
        .min_dimensions(256, 256)
        .build();

    Ok(format!("data:image/svg+xml;base64,{}", STANDARD.encode(svg)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn crc16_matches_known_vector() {
        assert_eq!(crc16_ccitt("123456789"), "29B1");
    }

    #[test]
    fn payload_carries_amount_txid_and_valid_crc() {
        let payload = PixPayload::new(
            "pix@example.com",
            Some(dec!(150.00)),
            "Oficina Central",
            "SAO PAULO",
            "TICKETA1B2",
            None,
        )
        .to_string();

        assert!(payload.starts_with("000201"));
        assert!(payload.contains("br.gov.bcb.pix"));
        assert!(payload.contains("pix@example.com"));
        assert!(payload.contains("5406150.00"));
        assert!(payload.contains("TICKETA1B2"));
        assert!(payload.contains("5802BR"));

        let (body, crc) = payload.split_at(payload.len() - 4);
        assert_eq!(crc16_ccitt(body), crc);
    }

    #[test]
    fn omits_amount_field_when_absent_or_non_positive() {
        // With no amount the currency field is followed directly by the
        // country code instead of an amount field.
        let without_amount = PixPayload::new(
            "pix@example.com",
            None,
            "Oficina",
            "SAO PAULO",
            "TX1",
            None,
        )
        .to_string();
        assert!(without_amount.contains("53039865802BR"));

        let zero_amount = PixPayload::new(
            "pix@example.com",
            Some(Decimal::ZERO),
            "Oficina",
            "SAO PAULO",
            "TX1",
            None,
        )
        .to_string();
        assert!(zero_amount.contains("53039865802BR"));
    }

    #[test]
    fn sanitizes_and_truncates_merchant_fields() {
        let payload = PixPayload::new(
            "pix@example.com",
            Some(dec!(10.00)),
            "Assistência Técnica Predial Ltda ME",
            "São Paulo",
            "",
            None,
        )
        .to_string();

        // Non-ASCII characters are dropped, the name is capped at 25 chars
        // and the missing txid falls back to the wildcard placeholder.
        assert!(payload.contains("Assistncia Tcnica Predial"));
        assert!(!payload.contains("Predial Ltda"));
        assert!(payload.contains("6008So Paulo"));
        assert!(payload.contains("62070503***"));
    }

    #[test]
    fn description_is_embedded_in_merchant_account_info() {
        let payload = PixPayload::new(
            "pix@example.com",
            Some(dec!(25.50)),
            "Oficina",
            "RECIFE",
            "TX9",
            Some("Manutencao preventiva".to_string()),
        )
        .to_string();

        assert!(payload.contains("Manutencao preventiva"));
    }

    #[test]
    fn qr_data_uri_is_svg() {
        let payload = PixPayload::new(
            "pix@example.com",
            Some(dec!(10.00)),
            "Oficina",
            "RECIFE",
            "TX1",
            None,
        )
        .to_string();

        let uri = qr_svg_data_uri(&payload).unwrap();
        assert!(uri.starts_with("data:image/svg+xml;base64,"));
    }
}
