use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use zflow_ai::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use zflow_api::identity::GOOGLE_USERINFO_URL;
use zflow_types::api::PublicConfig;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub gemini_api_key: String,
    pub model: String,
    pub ai_base_url: String,
    pub ai_timeout: Duration,
    pub userinfo_url: String,
    pub public: PublicConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let jwt_secret = get("ZFLOW_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("ZFLOW_JWT_SECRET is unset or still a placeholder");
        }

        let gemini_api_key = get("GEMINI_API_KEY").unwrap_or_default();
        if gemini_api_key.is_empty() {
            bail!("GEMINI_API_KEY is unset");
        }

        let port: u16 = var("ZFLOW_PORT", "3000")
            .parse()
            .context("ZFLOW_PORT must be a port number")?;
        let timeout_secs: u64 = var("ZFLOW_AI_TIMEOUT_SECS", "120")
            .parse()
            .context("ZFLOW_AI_TIMEOUT_SECS must be a number of seconds")?;

        Ok(Self {
            host: var("ZFLOW_HOST", "0.0.0.0"),
            port,
            db_path: var("ZFLOW_DB_PATH", "zflow.db").into(),
            jwt_secret,
            gemini_api_key,
            model: var("ZFLOW_MODEL", DEFAULT_MODEL),
            ai_base_url: var("ZFLOW_AI_BASE_URL", DEFAULT_BASE_URL),
            ai_timeout: Duration::from_secs(timeout_secs),
            userinfo_url: var("ZFLOW_USERINFO_URL", GOOGLE_USERINFO_URL),
            public: PublicConfig {
                google_client_id: get("GOOGLE_AUTH_CLIENT_ID"),
                paypal_client_id: get("PAYPAL_CLIENT_ID"),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = load(&[("ZFLOW_JWT_SECRET", "s3cret"), ("GEMINI_API_KEY", "key")]).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.ai_timeout, Duration::from_secs(120));
        assert!(config.public.google_client_id.is_none());
    }

    #[test]
    fn placeholder_secret_is_rejected() {
        let placeholder = [
            ("ZFLOW_JWT_SECRET", "dev-secret-change-me"),
            ("GEMINI_API_KEY", "k"),
        ];
        assert!(load(&placeholder).is_err());
        assert!(load(&[("GEMINI_API_KEY", "k")]).is_err());
        assert!(load(&[("ZFLOW_JWT_SECRET", "s3cret")]).is_err());
    }

    #[test]
    fn bad_port_is_an_error() {
        let err = load(&[
            ("ZFLOW_JWT_SECRET", "s3cret"),
            ("GEMINI_API_KEY", "k"),
            ("ZFLOW_PORT", "http"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("ZFLOW_PORT"));
    }
}
