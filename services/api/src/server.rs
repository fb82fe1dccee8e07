use crate::cli::ServeArgs;
use crate::infra::{load_catalog, AppState, InMemoryReviewRepository};
use crate::routes::with_review_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use kyp_review::config::AppConfig;
use kyp_review::error::AppError;
use kyp_review::telemetry;
use kyp_review::workflows::catalog::CatalogStatusBoard;
use kyp_review::workflows::kyp::{KypReviewService, ReviewEventQueue};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let catalog = Arc::new(load_catalog(&config.catalog)?);
    info!(
        products = catalog.len(),
        source = ?config.catalog.csv_path,
        "product catalog loaded"
    );

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let events = Arc::new(ReviewEventQueue::new());
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        catalog: catalog.clone(),
        events: events.clone(),
        board: Arc::new(Mutex::new(CatalogStatusBoard::new())),
    };

    let repository = Arc::new(InMemoryReviewRepository::default());
    let review_service = Arc::new(KypReviewService::new(
        catalog,
        repository,
        events,
        config.grading,
    )?);

    let app = with_review_routes(review_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        peer_margin = config.grading.peer_margin,
        "kyp review service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
