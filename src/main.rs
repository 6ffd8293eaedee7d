use axum::{extract::DefaultBodyLimit, routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lead_scoring_api::config::Config;
use lead_scoring_api::handlers::{self, AppState};
use lead_scoring_api::model::LinearModel;
use lead_scoring_api::services::ProviderCaches;

/// Main entry point for the application.
///
/// Initializes tracing, configuration, provider caches and the lead model,
/// then serves the lead workflow routes behind body-size and rate limits.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lead_scoring_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    // Load the pretrained model once; every run shares it
    let model = LinearModel::from_path(&config.model_path)?;

    // Provider response caches (email 6h, company/domain 24h by default)
    let caches = ProviderCaches::new(&config);
    tracing::info!(
        "Provider caches initialized (email {}s, company {}s TTL)",
        config.email_cache_ttl_secs,
        config.company_cache_ttl_secs
    );

    let app_state = Arc::new(AppState {
        config: config.clone(),
        caches,
        model: Arc::new(model),
    });

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
    );

    let protected_routes = handlers::lead_routes().layer(
        ServiceBuilder::new()
            .layer(DefaultBodyLimit::disable())
            // Uploads above the configured size are rejected with 413
            .layer(RequestBodyLimitLayer::new(config.max_upload_bytes))
            .layer(GovernorLayer {
                config: governor_conf,
            }),
    );

    // Health check bypasses rate limiting
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
