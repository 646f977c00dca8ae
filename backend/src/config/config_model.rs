#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub server: Server,
    pub database: Database,
    pub auth: Auth,
    pub billing: Billing,
    pub mercado_pago: MercadoPago,
}

#[derive(Debug, Clone)]
pub struct Server {
    pub port: u16,
    pub body_limit: u64,
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct Auth {
    pub jwt_secret: String,
}

/// Billing link material: the signing secret, how long issued links stay
/// valid, and the public base URL links are rendered under.
#[derive(Debug, Clone)]
pub struct Billing {
    pub link_secret: String,
    pub link_ttl_seconds: u64,
    pub public_base_url: String,
}

/// Platform-level gateway credentials. Tenant-connected credentials live in
/// `payment_integrations`; these are the fallback for platform-scoped
/// webhook lookups and the OAuth client used for token refresh.
#[derive(Debug, Clone)]
pub struct MercadoPago {
    pub platform_access_token: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}
