//! Resilient access to generative-text providers.
//!
//! Providers are tried in priority order behind independent circuit breakers.
//! Each admitted provider gets `max_retries` attempts bounded by a per-attempt
//! timeout, with linear backoff between attempts. When nothing answers the
//! gateway returns a deterministic stub marked `degraded` instead of an error,
//! so every caller stays decision-capable with zero live providers.

mod circuit;
pub mod decoder;
mod provider;

pub use circuit::{Admission, CircuitBreaker, CircuitSettings, CircuitState, CircuitStatus};
pub use decoder::{decode_json, DecodeError};
pub use provider::{
    ChatMessage, CompletionOptions, CompletionProvider, OpenAiCompatibleProvider, ProviderConfig,
    ProviderError, Role,
};

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Text returned when no provider produced a completion.
pub const STUB_COMPLETION: &str =
    "Generative providers are unavailable; no assessment could be produced.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewaySettings {
    pub failure_threshold: u32,
    pub cooldown: Duration,
    pub max_retries: u32,
    pub base_delay: Duration,
    pub request_timeout: Duration,
    pub max_concurrency: usize,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown: Duration::from_secs(60),
            max_retries: 2,
            base_delay: Duration::from_millis(500),
            request_timeout: Duration::from_secs(15),
            max_concurrency: 10,
        }
    }
}

/// Outcome of a gateway call. `degraded` marks the stub response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Completion {
    pub text: String,
    pub provider: Option<String>,
    pub degraded: bool,
}

impl Completion {
    fn stub() -> Self {
        Self {
            text: STUB_COMPLETION.to_string(),
            provider: None,
            degraded: true,
        }
    }
}

/// Health row for one registered provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderHealth {
    pub name: String,
    pub priority: u8,
    pub enabled: bool,
    pub status: CircuitStatus,
    pub consecutive_failures: u32,
}

struct RegisteredProvider {
    config: ProviderConfig,
    provider: Arc<dyn CompletionProvider>,
    circuit: CircuitBreaker,
}

pub struct GenerativeGateway {
    settings: GatewaySettings,
    providers: Vec<RegisteredProvider>,
    limiter: Semaphore,
}

impl Default for GenerativeGateway {
    fn default() -> Self {
        Self::new(GatewaySettings::default())
    }
}

impl GenerativeGateway {
    pub fn new(settings: GatewaySettings) -> Self {
        Self {
            limiter: Semaphore::new(settings.max_concurrency.max(1)),
            settings,
            providers: Vec::new(),
        }
    }

    pub fn with_provider(
        mut self,
        config: ProviderConfig,
        provider: Arc<dyn CompletionProvider>,
    ) -> Self {
        self.register(config, provider);
        self
    }

    pub fn register(&mut self, config: ProviderConfig, provider: Arc<dyn CompletionProvider>) {
        let circuit = CircuitBreaker::new(CircuitSettings {
            failure_threshold: self.settings.failure_threshold.max(1),
            cooldown: self.settings.cooldown,
        });

        info!(
            provider = %config.name,
            priority = config.priority,
            enabled = config.enabled,
            "registered generative provider"
        );

        self.providers.push(RegisteredProvider {
            config,
            provider,
            circuit,
        });
        // Stable sort keeps registration order among equal priorities.
        self.providers.sort_by_key(|entry| entry.config.priority);
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        options: CompletionOptions,
    ) -> Completion {
        let _permit = self.limiter.acquire().await.ok();

        for entry in self.providers.iter().filter(|entry| entry.config.enabled) {
            let name = entry.config.name.as_str();
            let attempts = match entry.circuit.admit(Instant::now()) {
                Admission::Rejected => {
                    debug!(provider = name, "circuit open, skipping provider");
                    continue;
                }
                Admission::Probe => {
                    info!(provider = name, "cooldown elapsed, probing provider");
                    1
                }
                Admission::Closed => self.settings.max_retries.max(1),
            };

            match self.call_with_retries(entry, messages, &options, attempts).await {
                Ok(text) => {
                    entry.circuit.record_success();
                    metrics::counter!("fleetmatch_gateway_completions_total", "provider" => name.to_string())
                        .increment(1);
                    return Completion {
                        text,
                        provider: Some(name.to_string()),
                        degraded: false,
                    };
                }
                Err(err) => {
                    let opened = entry.circuit.record_failure(Instant::now());
                    metrics::counter!("fleetmatch_gateway_failures_total", "provider" => name.to_string())
                        .increment(1);
                    warn!(
                        provider = name,
                        error = %err,
                        circuit_open = opened,
                        "provider failed, trying next in priority order"
                    );
                }
            }
        }

        metrics::counter!("fleetmatch_gateway_degraded_total").increment(1);
        warn!("no generative provider produced a completion, returning stub");
        Completion::stub()
    }

    async fn call_with_retries(
        &self,
        entry: &RegisteredProvider,
        messages: &[ChatMessage],
        options: &CompletionOptions,
        attempts: u32,
    ) -> Result<String, ProviderError> {
        let mut last_error = ProviderError::EmptyResponse;

        for attempt in 1..=attempts {
            let call = entry.provider.complete(messages, options);
            match tokio::time::timeout(self.settings.request_timeout, call).await {
                Ok(Ok(text)) if !text.trim().is_empty() => return Ok(text),
                Ok(Ok(_)) => last_error = ProviderError::EmptyResponse,
                Ok(Err(err)) => last_error = err,
                Err(_) => last_error = ProviderError::Timeout(self.settings.request_timeout),
            }

            debug!(
                provider = %entry.config.name,
                attempt,
                attempts,
                error = %last_error,
                "provider attempt failed"
            );

            if attempt < attempts {
                tokio::time::sleep(self.settings.base_delay * attempt).await;
            }
        }

        Err(last_error)
    }

    pub fn health(&self) -> Vec<ProviderHealth> {
        let now = Instant::now();
        self.providers
            .iter()
            .map(|entry| ProviderHealth {
                name: entry.config.name.clone(),
                priority: entry.config.priority,
                enabled: entry.config.enabled,
                status: entry.circuit.status(now),
                consecutive_failures: entry.circuit.snapshot().consecutive_failures,
            })
            .collect()
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers
            .iter()
            .map(|entry| entry.config.name.as_str())
            .collect()
    }
}
