use crate::circuit_breaker::{call_guarded, create_provider_circuit_breaker, ProviderCircuitBreaker};
use crate::config::Config;
use crate::enrichment::{CompanyProfile, CompanyProfileSource, DomainProfile, DomainProfileSource};
use crate::errors::AppError;
use crate::models::ValidationResult;
use crate::validation::EmailVerifier;
use async_trait::async_trait;
use moka::future::Cache;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};

const CRUNCHBASE: &str = "Crunchbase";
const B2B_ENRICHMENT: &str = "B2B enrichment";

// ============ Response Caches ============

/// Time-bounded memoization of provider responses, shared across runs.
///
/// Keys carry the endpoint and request parameter, e.g. `check:{email}`,
/// `autocomplete:{company}`, `organization:{permalink}`, `enrich:{domain}`.
/// Only successful lookups are stored.
#[derive(Clone)]
pub struct ProviderCaches {
    pub email_checks: Cache<String, ValidationResult>,
    pub company_permalinks: Cache<String, Option<String>>,
    pub company_details: Cache<String, Map<String, Value>>,
    pub domain_profiles: Cache<String, Map<String, Value>>,
}

impl ProviderCaches {
    pub fn new(config: &Config) -> Self {
        Self {
            email_checks: Cache::builder()
                .time_to_live(config.email_cache_ttl())
                .max_capacity(100_000)
                .build(),
            company_permalinks: Cache::builder()
                .time_to_live(config.company_cache_ttl())
                .max_capacity(50_000)
                .build(),
            company_details: Cache::builder()
                .time_to_live(config.company_cache_ttl())
                .max_capacity(50_000)
                .build(),
            domain_profiles: Cache::builder()
                .time_to_live(config.company_cache_ttl())
                .max_capacity(50_000)
                .build(),
        }
    }
}

fn build_client(config: &Config, provider: &str) -> Result<Client, AppError> {
    Client::builder()
        .timeout(config.request_timeout())
        .build()
        .map_err(|e| {
            AppError::ExternalApiError(format!("Failed to create {} client: {}", provider, e))
        })
}

/// `X-RapidAPI-Host` value for a provider base URL.
fn rapidapi_host(base_url: &str) -> String {
    url::Url::parse(base_url)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_default()
}

// ============ Mailboxlayer (email verification) ============

#[derive(Debug, Deserialize)]
struct MailboxLayerResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(flatten)]
    result: ValidationResult,
}

pub struct MailboxLayerService {
    client: Client,
    url: String,
    access_key: String,
    cache: Cache<String, ValidationResult>,
}

impl MailboxLayerService {
    pub fn new(config: &Config, caches: &ProviderCaches) -> Result<Self, AppError> {
        Ok(Self {
            client: build_client(config, "Mailboxlayer")?,
            url: config.mailboxlayer_url.clone(),
            access_key: config.mailboxlayer_api_key.clone(),
            cache: caches.email_checks.clone(),
        })
    }

    /// Verify one email address (SMTP and format checks enabled).
    pub async fn check_email(&self, email: &str) -> Result<ValidationResult, AppError> {
        // Build URL with proper parameter encoding to prevent injection attacks
        let url = reqwest::Url::parse_with_params(
            &self.url,
            &[
                ("access_key", self.access_key.as_str()),
                ("email", email),
                ("smtp", "1"),
                ("format", "1"),
            ],
        )
        .map_err(|e| AppError::ExternalApiError(format!("Failed to build URL: {}", e)))?;

        // Redact access key from logs to prevent credential exposure
        tracing::debug!("Mailboxlayer check: {}?access_key=[REDACTED]&email={}", self.url, email);

        let response = self.client.get(url).send().await.map_err(|e| {
            AppError::ExternalApiError(format!("Mailboxlayer request failed: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(AppError::ExternalApiError(format!(
                "Mailboxlayer returned status {}",
                response.status()
            )));
        }

        let body: MailboxLayerResponse = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse Mailboxlayer response: {}", e))
        })?;

        if body.success == Some(false) || body.error.is_some() {
            return Err(AppError::ExternalApiError(format!(
                "Mailboxlayer rejected request: {}",
                body.error.unwrap_or(Value::Null)
            )));
        }

        Ok(body.result)
    }
}

#[async_trait]
impl EmailVerifier for MailboxLayerService {
    async fn verify(&self, email: &str) -> Option<ValidationResult> {
        let cache_key = format!("check:{}", email);
        if let Some(cached) = self.cache.get(&cache_key).await {
            tracing::debug!("Mailboxlayer cache hit for {}", email);
            return Some(cached);
        }

        match self.check_email(email).await {
            Ok(result) => {
                self.cache.insert(cache_key, result.clone()).await;
                Some(result)
            }
            Err(e) => {
                tracing::warn!("Email verification failed for {}: {}", email, e);
                None
            }
        }
    }
}

// ============ Crunchbase (name-based company data) ============

pub struct CrunchbaseService {
    client: Client,
    base_url: String,
    api_key: String,
    host: String,
    breaker: ProviderCircuitBreaker,
    permalink_cache: Cache<String, Option<String>>,
    details_cache: Cache<String, Map<String, Value>>,
}

impl CrunchbaseService {
    pub fn new(config: &Config, caches: &ProviderCaches) -> Result<Self, AppError> {
        Ok(Self {
            client: build_client(config, CRUNCHBASE)?,
            base_url: config.crunchbase_base_url.clone(),
            api_key: config.rapidapi_key.clone(),
            host: rapidapi_host(&config.crunchbase_base_url),
            breaker: create_provider_circuit_breaker(),
            permalink_cache: caches.company_permalinks.clone(),
            details_cache: caches.company_details.clone(),
        })
    }

    async fn get_json(&self, url: reqwest::Url) -> Result<Value, AppError> {
        let response = self
            .client
            .get(url)
            .header("X-RapidAPI-Key", &self.api_key)
            .header("X-RapidAPI-Host", &self.host)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Crunchbase request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalApiError(format!(
                "Crunchbase returned status {}",
                response.status()
            )));
        }

        response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse Crunchbase response: {}", e))
        })
    }

    /// Resolve a company name to its organization permalink.
    ///
    /// Only the first autocomplete entity is considered, and only when its
    /// path is namespaced `organization/`.
    pub async fn find_permalink(&self, company: &str) -> Result<Option<String>, AppError> {
        let url = reqwest::Url::parse_with_params(
            &format!("{}/autocompletes", self.base_url),
            &[("query", company)],
        )
        .map_err(|e| AppError::ExternalApiError(format!("Failed to build URL: {}", e)))?;

        tracing::debug!("Crunchbase autocomplete for: {}", company);
        let body = self.get_json(url).await?;

        let permalink = body
            .get("entities")
            .and_then(|v| v.as_array())
            .and_then(|entities| entities.first())
            .and_then(|entity| entity.get("path"))
            .and_then(|v| v.as_str())
            .filter(|path| path.starts_with("organization/"))
            .and_then(|path| path.rsplit('/').next())
            .filter(|segment| !segment.is_empty())
            .map(str::to_string);

        Ok(permalink)
    }

    /// Fetch `data.organization.properties` for a permalink. A body without
    /// that object yields an empty map.
    pub async fn fetch_organization(&self, permalink: &str) -> Result<Map<String, Value>, AppError> {
        let mut url = reqwest::Url::parse(&format!("{}/organizations", self.base_url))
            .map_err(|e| AppError::ExternalApiError(format!("Failed to build URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| AppError::ExternalApiError("Crunchbase base URL cannot be a base".to_string()))?
            .push(permalink);

        tracing::debug!("Crunchbase organization details for: {}", permalink);
        let body = self.get_json(url).await?;

        Ok(body
            .get("data")
            .and_then(|d| d.get("organization"))
            .and_then(|o| o.get("properties"))
            .and_then(|p| p.as_object())
            .cloned()
            .unwrap_or_default())
    }

    async fn cached_permalink(&self, company: &str) -> Result<Option<String>, AppError> {
        let cache_key = format!("autocomplete:{}", company);
        if let Some(cached) = self.permalink_cache.get(&cache_key).await {
            return Ok(cached);
        }
        let permalink = call_guarded(&self.breaker, CRUNCHBASE, self.find_permalink(company)).await?;
        self.permalink_cache.insert(cache_key, permalink.clone()).await;
        Ok(permalink)
    }

    async fn cached_organization(&self, permalink: &str) -> Result<Map<String, Value>, AppError> {
        let cache_key = format!("organization:{}", permalink);
        if let Some(cached) = self.details_cache.get(&cache_key).await {
            return Ok(cached);
        }
        let properties =
            call_guarded(&self.breaker, CRUNCHBASE, self.fetch_organization(permalink)).await?;
        self.details_cache.insert(cache_key, properties.clone()).await;
        Ok(properties)
    }
}

#[async_trait]
impl CompanyProfileSource for CrunchbaseService {
    async fn company_profile(&self, company: &str) -> Option<CompanyProfile> {
        let permalink = match self.cached_permalink(company).await {
            Ok(Some(permalink)) => permalink,
            Ok(None) => {
                tracing::debug!("No Crunchbase organization matches '{}'", company);
                return None;
            }
            Err(e) => {
                tracing::warn!("Crunchbase lookup failed for '{}': {}", company, e);
                return None;
            }
        };

        match self.cached_organization(&permalink).await {
            Ok(properties) => Some(CompanyProfile::from_properties(&properties)),
            Err(e) => {
                tracing::warn!("Crunchbase details failed for '{}': {}", permalink, e);
                None
            }
        }
    }
}

// ============ B2B enrichment (domain-based company data) ============

pub struct B2bEnrichmentService {
    client: Client,
    base_url: String,
    api_key: String,
    host: String,
    breaker: ProviderCircuitBreaker,
    cache: Cache<String, Map<String, Value>>,
}

impl B2bEnrichmentService {
    pub fn new(config: &Config, caches: &ProviderCaches) -> Result<Self, AppError> {
        Ok(Self {
            client: build_client(config, B2B_ENRICHMENT)?,
            base_url: config.b2b_base_url.clone(),
            api_key: config.rapidapi_key.clone(),
            host: rapidapi_host(&config.b2b_base_url),
            breaker: create_provider_circuit_breaker(),
            cache: caches.domain_profiles.clone(),
        })
    }

    /// Fetch the flat company object for a domain. Anything other than a
    /// JSON object yields an empty map.
    pub async fn enrich_domain(&self, domain: &str) -> Result<Map<String, Value>, AppError> {
        let url = reqwest::Url::parse_with_params(
            &format!("{}/companies/enrich", self.base_url),
            &[("domain", domain)],
        )
        .map_err(|e| AppError::ExternalApiError(format!("Failed to build URL: {}", e)))?;

        tracing::debug!("B2B enrichment for domain: {}", domain);

        let response = self
            .client
            .get(url)
            .header("X-RapidAPI-Key", &self.api_key)
            .header("X-RapidAPI-Host", &self.host)
            .send()
            .await
            .map_err(|e| {
                AppError::ExternalApiError(format!("B2B enrichment request failed: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(AppError::ExternalApiError(format!(
                "B2B enrichment returned status {}",
                response.status()
            )));
        }

        let body: Value = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse B2B enrichment response: {}", e))
        })?;

        Ok(body.as_object().cloned().unwrap_or_default())
    }
}

#[async_trait]
impl DomainProfileSource for B2bEnrichmentService {
    async fn domain_profile(&self, domain: &str) -> Option<DomainProfile> {
        let cache_key = format!("enrich:{}", domain);
        let fields = match self.cache.get(&cache_key).await {
            Some(cached) => cached,
            None => match call_guarded(&self.breaker, B2B_ENRICHMENT, self.enrich_domain(domain)).await {
                Ok(fields) => {
                    self.cache.insert(cache_key, fields.clone()).await;
                    fields
                }
                Err(e) => {
                    tracing::warn!("B2B enrichment failed for '{}': {}", domain, e);
                    return None;
                }
            },
        };

        if fields.is_empty() {
            return None;
        }
        Some(DomainProfile::from_fields(&fields))
    }
}
