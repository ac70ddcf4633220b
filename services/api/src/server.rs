use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryCustomerRepository};
use crate::routes::with_credit_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use energy_credit::config::AppConfig;
use energy_credit::credit::{CreditScoringService, ScoringEngine, ScoringOptions};
use energy_credit::error::AppError;
use energy_credit::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let engine = Arc::new(ScoringEngine::new(config.scoring.minimum_model_version));
    match engine.load(&config.scoring.model_path) {
        Ok(active) => info!(
            model_version = %active.metadata().model_version,
            kind = active.metadata().kind.label(),
            "startup model loaded"
        ),
        Err(err) => warn!(
            path = %config.scoring.model_path.display(),
            error = %err,
            "starting without a model; scoring returns 503 until a reload succeeds"
        ),
    }

    let repository = match &config.scoring.customer_data {
        Some(path) => {
            let repository = InMemoryCustomerRepository::from_csv(path)?;
            info!(path = %path.display(), customers = repository.len(), "customer snapshot loaded");
            repository
        }
        None => InMemoryCustomerRepository::default(),
    };

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        engine: engine.clone(),
    };

    let scoring_service = Arc::new(CreditScoringService::new(
        Arc::new(repository),
        engine,
        ScoringOptions::from(&config.scoring),
    ));

    let app = with_credit_routes(scoring_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "credit scoring service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
