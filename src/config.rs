use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_MAILBOXLAYER_URL: &str = "https://apilayer.net/api/check";
pub const DEFAULT_CRUNCHBASE_BASE_URL: &str = "https://crunchbase-crunchbase-v1.p.rapidapi.com";
pub const DEFAULT_B2B_BASE_URL: &str = "https://b2b-company-data-enrichment1.p.rapidapi.com";

/// Run configuration. Built once at startup and handed to every service of a
/// workflow run.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub mailboxlayer_api_key: String,
    pub mailboxlayer_url: String,
    pub rapidapi_key: String,
    pub crunchbase_base_url: String,
    pub b2b_base_url: String,
    pub model_path: String,
    /// Width of the email validation worker pool.
    pub validation_concurrency: usize,
    pub request_timeout_secs: u64,
    pub email_cache_ttl_secs: u64,
    pub company_cache_ttl_secs: u64,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            mailboxlayer_api_key: std::env::var("MAILBOXLAYER_API_KEY")
                .map_err(|_| anyhow::anyhow!("MAILBOXLAYER_API_KEY environment variable required"))
                .and_then(|key| {
                    if key.trim().is_empty() {
                        anyhow::bail!("MAILBOXLAYER_API_KEY cannot be empty");
                    }
                    Ok(key)
                })?,
            mailboxlayer_url: url_var("MAILBOXLAYER_URL", DEFAULT_MAILBOXLAYER_URL)?,
            rapidapi_key: std::env::var("RAPIDAPI_KEY")
                .or_else(|_| std::env::var("RAPID_KEY"))
                .map_err(|_| {
                    anyhow::anyhow!("RAPIDAPI_KEY or RAPID_KEY environment variable required")
                })
                .and_then(|key| {
                    if key.trim().is_empty() {
                        anyhow::bail!("RAPIDAPI_KEY cannot be empty");
                    }
                    Ok(key)
                })?,
            crunchbase_base_url: url_var("CRUNCHBASE_BASE_URL", DEFAULT_CRUNCHBASE_BASE_URL)?,
            b2b_base_url: url_var("B2B_BASE_URL", DEFAULT_B2B_BASE_URL)?,
            model_path: std::env::var("MODEL_PATH")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "model.json".to_string()),
            validation_concurrency: number_var("VALIDATION_CONCURRENCY", 10)
                .and_then(|width| {
                    if width == 0 {
                        anyhow::bail!("VALIDATION_CONCURRENCY must be at least 1");
                    }
                    Ok(width)
                })?,
            request_timeout_secs: number_var("REQUEST_TIMEOUT_SECS", 8)?,
            email_cache_ttl_secs: number_var("EMAIL_CACHE_TTL_SECS", 21_600)?,
            company_cache_ttl_secs: number_var("COMPANY_CACHE_TTL_SECS", 86_400)?,
            max_upload_bytes: number_var("MAX_UPLOAD_BYTES", 5 * 1024 * 1024)?,
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Mailboxlayer URL: {}", config.mailboxlayer_url);
        tracing::debug!("Crunchbase base URL: {}", config.crunchbase_base_url);
        tracing::debug!("B2B enrichment base URL: {}", config.b2b_base_url);
        tracing::debug!("Model path: {}", config.model_path);
        tracing::debug!(
            "Validation pool width: {}, request timeout: {}s",
            config.validation_concurrency,
            config.request_timeout_secs
        );
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn email_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.email_cache_ttl_secs)
    }

    pub fn company_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.company_cache_ttl_secs)
    }
}

/// Reads an optional http(s) URL, falling back to `default`.
fn url_var(name: &str, default: &str) -> anyhow::Result<String> {
    let raw = std::env::var(name)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default.to_string());

    let parsed = url::Url::parse(&raw)
        .map_err(|e| anyhow::anyhow!("{} is not a valid URL: {}", name, e))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        anyhow::bail!("{} must start with http:// or https://", name);
    }

    Ok(raw.trim_end_matches('/').to_string())
}

fn number_var<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a non-negative integer", name)),
        _ => Ok(default),
    }
}
