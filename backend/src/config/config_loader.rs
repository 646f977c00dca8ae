use anyhow::{Ok, Result};

use super::config_model::{Auth, Billing, Database, DotEnvyConfig, MercadoPago, Server};

const DEFAULT_LINK_TTL_SECONDS: u64 = 60 * 60 * 24;

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let server = Server {
        port: std::env::var("SERVER_PORT")
            .expect("SERVER_PORT is invalid")
            .parse()?,
        body_limit: std::env::var("SERVER_BODY_LIMIT")
            .expect("SERVER_BODY_LIMIT is invalid")
            .parse()?,
        timeout: std::env::var("SERVER_TIMEOUT")
            .expect("SERVER_TIMEOUT is invalid")
            .parse()?,
    };

    let database = Database {
        url: std::env::var("DATABASE_URL").expect("DATABASE_URL is invalid"),
    };

    let auth = Auth {
        jwt_secret: std::env::var("AUTH_JWT_SECRET").expect("AUTH_JWT_SECRET is invalid"),
    };

    let billing = Billing {
        link_secret: std::env::var("BILLING_LINK_SECRET").expect("BILLING_LINK_SECRET is invalid"),
        link_ttl_seconds: std::env::var("BILLING_LINK_TTL_SECONDS")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_LINK_TTL_SECONDS),
        public_base_url: std::env::var("PUBLIC_BASE_URL").expect("PUBLIC_BASE_URL is invalid"),
    };

    let mercado_pago = MercadoPago {
        platform_access_token: std::env::var("MP_PLATFORM_ACCESS_TOKEN").ok(),
        client_id: std::env::var("MP_CLIENT_ID").ok(),
        client_secret: std::env::var("MP_CLIENT_SECRET").ok(),
    };

    Ok(DotEnvyConfig {
        server,
        database,
        auth,
        billing,
        mercado_pago,
    })
}

pub fn get_auth_secret() -> Result<Auth> {
    dotenvy::dotenv().ok();

    Ok(Auth {
        jwt_secret: std::env::var("AUTH_JWT_SECRET").expect("AUTH_JWT_SECRET is invalid"),
    })
}
