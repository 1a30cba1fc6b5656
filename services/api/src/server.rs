use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryCatalog, InMemoryEmbeddingStore, InMemoryRules};
use crate::routes::with_service_routes;
use crate::seed;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::{Datelike, Duration, Utc};
use fleetmatch::config::AppConfig;
use fleetmatch::error::AppError;
use fleetmatch::gateway::{GenerativeGateway, OpenAiCompatibleProvider, ProviderConfig};
use fleetmatch::telemetry;
use fleetmatch::workflows::matching::{
    CsvCatalogImporter, EligibilityConfig, EligibilityResolver, EmbeddingIndex, EmbeddingProvider,
    HashingEmbedder, HttpEmbeddingProvider, MatchingPipeline, Ranker, RankingNarrator,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Wired collaborators behind the HTTP service.
pub(crate) struct Assembly {
    pub(crate) pipeline: Arc<MatchingPipeline<InMemoryCatalog, InMemoryRules>>,
    pub(crate) index: EmbeddingIndex,
    pub(crate) gateway: Arc<GenerativeGateway>,
    pub(crate) catalog_size: usize,
}

pub(crate) fn assemble(config: &AppConfig) -> Result<Assembly, AppError> {
    let items = match &config.catalog_csv {
        Some(path) => CsvCatalogImporter::from_path(path)?,
        None => seed::sample_catalog(),
    };
    let catalog = Arc::new(InMemoryCatalog::new(items));

    let now = Utc::now();
    let ttl = Duration::try_hours(config.eligibility.ruleset_ttl_hours).unwrap_or(Duration::MAX);
    let rules = Arc::new(InMemoryRules::new(
        seed::sample_jurisdictions(),
        seed::sample_snapshots(now, ttl),
    ));

    let mut gateway = GenerativeGateway::new(config.gateway.settings());
    for provider in &config.providers {
        let mut registration = ProviderConfig::new(provider.name.clone(), provider.priority);
        registration.enabled = provider.enabled;
        let client = OpenAiCompatibleProvider::new(
            provider.name.clone(),
            provider.base_url.clone(),
            provider.api_key.clone(),
            provider.model.clone(),
        );
        gateway.register(registration, Arc::new(client));
    }
    let gateway = Arc::new(gateway);

    let embedder: Arc<dyn EmbeddingProvider> = match &config.embedding.url {
        Some(url) => Arc::new(HttpEmbeddingProvider::new(
            url.clone(),
            config.embedding.api_key.clone(),
            config.embedding.model.clone(),
            config.embedding.dimensions,
        )),
        None => Arc::new(HashingEmbedder::new(config.embedding.dimensions)),
    };
    let index = EmbeddingIndex::new(
        catalog.clone(),
        Arc::new(InMemoryEmbeddingStore::default()),
        embedder,
    );

    let current_year = now.year();
    let mut eligibility = EligibilityConfig::for_year(current_year);
    eligibility.min_doors = config.eligibility.min_doors;

    let pipeline = MatchingPipeline::new(
        catalog.clone(),
        Arc::new(index.clone()),
        Ranker::new(current_year),
        EligibilityResolver::new(eligibility, rules, gateway.clone()),
        RankingNarrator::new(gateway.clone()),
    );

    Ok(Assembly {
        pipeline: Arc::new(pipeline),
        index,
        gateway,
        catalog_size: catalog.len(),
    })
}

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let assembly = assemble(&config)?;
    info!(
        items = assembly.catalog_size,
        providers = config.providers.len(),
        "catalog and gateway assembled"
    );
    assembly.index.initialize();

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        index: assembly.index.clone(),
        gateway: assembly.gateway.clone(),
    };

    let app = with_service_routes(assembly.pipeline)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "vehicle matching service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
