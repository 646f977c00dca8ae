use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Provider that actually produced a charge artifact.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ChargeProvider {
    StaticPix,
    Gateway,
}

impl Display for ChargeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let provider = match self {
            ChargeProvider::StaticPix => "static-pix",
            ChargeProvider::Gateway => "gateway",
        };
        f.write_str(provider)
    }
}

/// Provider requested by the caller. `Auto` prefers the gateway when the
/// tenant has connected credentials and falls back to the static code.
#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderChoice {
    #[default]
    Auto,
    Gateway,
    Static,
}

impl ProviderChoice {
    pub fn from_str(value: &str) -> Self {
        match value {
            "gateway" => ProviderChoice::Gateway,
            "static" => ProviderChoice::Static,
            _ => ProviderChoice::Auto,
        }
    }
}

impl Display for ProviderChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let choice = match self {
            ProviderChoice::Auto => "auto",
            ProviderChoice::Gateway => "gateway",
            ProviderChoice::Static => "static",
        };
        f.write_str(choice)
    }
}
