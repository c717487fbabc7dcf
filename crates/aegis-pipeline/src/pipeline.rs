//! The orchestrator

use crate::result::{GatewayRequest, ProcessingResult};
use aegis_audit::AuditSink;
use aegis_cache::CacheManager;
use aegis_core::{CompletionOptions, CompletionProvider, Error};
use aegis_optimize::{OptimizationOutcome, PromptOptimizer};
use aegis_pii::{Detector, Redactor, SvContext};
use aegis_routing::{ComplexityAnalyzer, ModelDecision, ModelRouter};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Constructor-injected collaborators; no globals. One call to
/// [`RequestPipeline::process`] is one logical request.
pub struct RequestPipeline {
    detector: Arc<dyn Detector>,
    redactor: Arc<Redactor>,
    optimizer: Arc<PromptOptimizer>,
    analyzer: Arc<ComplexityAnalyzer>,
    router: Arc<ModelRouter>,
    cache: Arc<CacheManager>,
    provider: Arc<dyn CompletionProvider>,
    audit: AuditSink,
}

impl RequestPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        detector: Arc<dyn Detector>,
        redactor: Arc<Redactor>,
        optimizer: Arc<PromptOptimizer>,
        analyzer: Arc<ComplexityAnalyzer>,
        router: Arc<ModelRouter>,
        cache: Arc<CacheManager>,
        provider: Arc<dyn CompletionProvider>,
        audit: AuditSink,
    ) -> Self {
        Self {
            detector,
            redactor,
            optimizer,
            analyzer,
            router,
            cache,
            provider,
            audit,
        }
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    pub fn router(&self) -> &ModelRouter {
        &self.router
    }

    /// Run the full pipeline. Failures are encoded in the result, never
    /// panicked or thrown past this boundary.
    #[instrument(skip(self, request), fields(request_id))]
    pub async fn process(&self, request: GatewayRequest) -> ProcessingResult {
        let started = Instant::now();
        let request_id = Uuid::new_v4();
        tracing::Span::current().record("request_id", tracing::field::display(request_id));

        let mut result = ProcessingResult::empty(request_id);

        if request.query.trim().is_empty() {
            result.error = Some("query must not be empty".to_string());
            result.error_type = Some("VALIDATION_ERROR".to_string());
            result.total_latency_ms = started.elapsed().as_millis() as u64;
            return result;
        }

        // Stage 1-2: detection and redaction into the request context
        let ctx = SvContext::new(request_id);
        let report = self.detector.detect(&request.query);
        let redacted = if report.detected() {
            info!(count = report.count(), "Sensitive values detected");
            self.redactor.redact(&request.query, &report.matches, &ctx)
        } else {
            request.query.clone()
        };
        result.sv_detected = report.detected();
        result.sv_count = report.count();

        // Stage 3: optimization over the redacted prompt only
        let optimization = if request.enable_optimization {
            self.optimizer.optimize(&redacted)
        } else {
            let tokens = redacted.len() / 4;
            OptimizationOutcome {
                original_prompt: redacted.clone(),
                optimized_prompt: redacted.clone(),
                original_tokens: tokens,
                optimized_tokens: tokens,
                applied: false,
                skip_reason: Some("disabled by request".to_string()),
                elapsed_ms: 0,
            }
        };
        let prompt = optimization.optimized_prompt.clone();
        result.optimization = Some(optimization);

        // Stage 4: complexity analysis
        let complexity = self.analyzer.analyze(&prompt);
        debug!(score = complexity.score, level = %complexity.level, "Complexity scored");
        result.complexity = Some(complexity.clone());

        // Stage 5: routing
        let decision = self.route(&request, &complexity);
        result.routing = Some(decision.clone());

        let options = CompletionOptions {
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            top_p: request.top_p,
            n: None,
            stop_sequences: Vec::new(),
        };

        // Stage 6: cache lookup
        let cache_key = self.cache.key_for(
            &prompt,
            &decision.model_id,
            options.cache_param_string().as_deref(),
        );
        let cached = if request.enable_cache {
            self.cache.get(&cache_key).await
        } else {
            None
        };

        let response_text = match cached {
            Some(text) => {
                info!("Cache hit, skipping provider call");
                result.from_cache = true;
                text
            }
            None => {
                // Stage 7: provider call with the redacted prompt
                let response = match self
                    .provider
                    .complete(&decision.model_id, &prompt, &options)
                    .await
                {
                    Ok(response) => response,
                    Err(e) => {
                        return self.fail(result, e, started);
                    }
                };

                let text = response.text.clone();
                result.estimated_cost = Some(self.router.registry().estimate_cost(
                    &decision.model_id,
                    response.input_tokens,
                    response.output_tokens,
                ));
                result.provider_response = Some(response);

                // Stage 8: cache store, observable only after a
                // successful provider call
                if request.enable_cache {
                    self.cache.put(&cache_key, &text).await;
                }
                text
            }
        };

        // Stage 9: restore tokens in the response
        let restored = if ctx.has_detections() {
            self.redactor.restore(&response_text, &ctx)
        } else {
            response_text
        };

        // Stage 10: audit dispatch after the response is assembled;
        // fire-and-forget, never blocks
        if ctx.has_detections() {
            self.audit.submit(&ctx);
        }

        result.success = true;
        result.response_text = Some(restored);
        result.total_latency_ms = started.elapsed().as_millis() as u64;

        info!(
            from_cache = result.from_cache,
            sv_count = result.sv_count,
            model = %decision.model_id,
            latency_ms = result.total_latency_ms,
            "Request processing complete"
        );
        result
    }

    fn route(
        &self,
        request: &GatewayRequest,
        complexity: &aegis_routing::ComplexityScore,
    ) -> ModelDecision {
        // An explicit, known, enabled model bypasses strategy selection
        if let Some(model_id) = &request.model {
            match self.router.registry().get(model_id) {
                Some(profile) if profile.enabled => {
                    return ModelDecision {
                        model_id: profile.model_id.clone(),
                        display_name: profile.display_name.clone(),
                        strategy_used: request.routing_strategy.unwrap_or_default(),
                        rationale: format!("Client requested {model_id} explicitly"),
                        complexity: complexity.clone(),
                        routing_ms: 0,
                    };
                }
                _ => {
                    warn!(model_id = %model_id, "Requested model unknown or disabled, routing normally");
                }
            }
        }

        match request.routing_strategy {
            Some(strategy) => self.router.route_with(complexity, strategy),
            None => self.router.route(complexity),
        }
    }

    fn fail(
        &self,
        mut result: ProcessingResult,
        error: Error,
        started: Instant,
    ) -> ProcessingResult {
        warn!(error = %error, "Request processing failed");
        result.success = false;
        result.error = Some(error.to_string());
        result.error_type = Some(error.error_type().to_string());
        result.total_latency_ms = started.elapsed().as_millis() as u64;
        result
    }
}
