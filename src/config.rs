use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_minutes: i64,
}

/// Connection settings for the hosted row store (REST endpoint + api key).
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub jwt: JwtConfig,
    pub mail: MailConfig,
    pub base_url: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let store = StoreConfig {
            url: std::env::var("STORE_URL")?,
            api_key: std::env::var("STORE_API_KEY")?,
        };
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
        };
        let mail = MailConfig {
            api_url: std::env::var("MAIL_API_URL")?,
            api_key: std::env::var("MAIL_API_KEY")?,
            from: std::env::var("MAIL_FROM").unwrap_or_else(|_| "no-reply@localhost".into()),
        };
        let base_url =
            std::env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8080".into());
        Ok(Self {
            store,
            jwt,
            mail,
            base_url,
        })
    }
}
