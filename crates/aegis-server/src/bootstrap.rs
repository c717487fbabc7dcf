//! Startup wiring
//!
//! Builds every component from configuration and assembles the axum
//! router. All cross-component references are `Arc`s handed to the
//! pipeline constructor; nothing global.

use crate::analytics;
use crate::api;
use crate::config::ServerConfig;
use aegis_audit::{spawn_retention_sweep, AuditSink, AuditStore};
use aegis_cache::{
    CacheKeyGenerator, CacheManager, DisabledTier, RedisTier, RemoteCache, TierOne,
};
use aegis_core::Error;
use aegis_egress::client::HttpClientConfig;
use aegis_egress::openai::{OpenAIConfig, OpenAIConnector};
use aegis_optimize::PromptOptimizer;
use aegis_pii::{PatternRegistry, Redactor, RegexDetector};
use aegis_pipeline::RequestPipeline;
use aegis_routing::{ComplexityAnalyzer, ModelRegistry, ModelRouter};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const SERVICE_NAME: &str = "Aegis";

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RequestPipeline>,
    pub registry: Arc<ModelRegistry>,
    pub audit_store: Arc<AuditStore>,
}

/// Wire every component from the configuration.
pub async fn build_state(config: &ServerConfig) -> Result<AppState, Error> {
    // Sensitive-value stack
    let patterns = PatternRegistry::with_custom(&config.pii.detection.custom_patterns)
        .map_err(|e| Error::Config(e.to_string()))?;
    // Detection off means every kind is off, not that the stage vanishes
    let overrides = if config.pii.detection.enabled {
        config.pii.detection.patterns.clone()
    } else {
        patterns
            .kinds()
            .iter()
            .map(|k| (k.name.clone(), false))
            .collect()
    };
    let detector = Arc::new(RegexDetector::new(Arc::new(patterns), overrides));
    let redactor = Arc::new(Redactor::new(config.pii.redaction.clone()));

    // Routing stack
    let registry = Arc::new(ModelRegistry::with_defaults());
    let router = Arc::new(ModelRouter::new(
        registry.clone(),
        config.routing.default_strategy,
    ));

    // Cache stack; a failed tier-2 connection degrades to disabled
    let tier2: Arc<dyn RemoteCache> = if config.cache.l2.enabled {
        match RedisTier::connect(&config.cache.l2).await {
            Ok(tier) => Arc::new(tier),
            Err(e) => {
                warn!(error = %e, "Tier-2 cache unavailable, continuing without it");
                Arc::new(DisabledTier)
            }
        }
    } else {
        Arc::new(DisabledTier)
    };
    let cache = Arc::new(CacheManager::new(
        CacheKeyGenerator::new(config.cache.l2.key_prefix.clone()),
        TierOne::from_config(&config.cache.l1),
        tier2,
    ));

    // Provider client; the key comes from the environment only
    let api_key = std::env::var(&config.provider.openai.api_key_env).unwrap_or_default();
    if api_key.is_empty() {
        warn!(
            var = %config.provider.openai.api_key_env,
            "Provider API key environment variable is empty"
        );
    }
    let provider = Arc::new(
        OpenAIConnector::new(OpenAIConfig {
            api_key,
            base_url: config.provider.openai.base_url.clone(),
            organization: None,
            client_config: HttpClientConfig {
                timeout_secs: config.provider.openai.timeout_seconds,
                max_retries: config.provider.openai.max_retries,
                retry_delay_ms: config.provider.openai.retry_delay_ms,
                ..Default::default()
            },
        })
        .map_err(|e| Error::Config(e.to_string()))?,
    );

    // Audit stack
    let audit_store = Arc::new(
        AuditStore::new(&config.pii.audit.db_path)
            .await
            .map_err(|e| Error::Config(e.to_string()))?,
    );
    let audit_sink = if config.pii.audit.enabled {
        AuditSink::spawn(audit_store.clone(), &config.pii.audit)
    } else {
        AuditSink::disabled()
    };
    if config.pii.audit.enabled {
        spawn_retention_sweep(
            audit_store.clone(),
            config.pii.audit.retention_days,
            Duration::from_secs(24 * 60 * 60),
        );
    }

    let pipeline = Arc::new(RequestPipeline::new(
        detector,
        redactor,
        Arc::new(PromptOptimizer::new(config.optimization.clone())),
        Arc::new(ComplexityAnalyzer::new()),
        router,
        cache,
        provider,
        audit_sink,
    ));

    info!("Gateway components wired");
    Ok(AppState {
        pipeline,
        registry,
        audit_store,
    })
}

/// The full `/api/v1` router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/completions", post(api::completions))
        .route("/api/v1/health", get(api::health))
        .route("/api/v1/analytics/cache", get(analytics::cache_stats))
        .route("/api/v1/analytics/pii", get(analytics::pii_stats))
        .route("/api/v1/analytics/models", get(analytics::models))
        .route("/api/v1/analytics/summary", get(analytics::summary))
        .route("/api/v1/analytics/health", get(analytics::health))
        .route("/api/v1/analytics/cache/clear", post(analytics::clear_cache))
        .with_state(state)
}
