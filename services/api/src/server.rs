use crate::cli::ServeArgs;
use crate::infra::{review_service, AppState};
use crate::routes::with_review_routes;
use applicant_review::config::AppConfig;
use applicant_review::error::AppError;
use applicant_review::telemetry;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
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

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let service = Arc::new(review_service(&config.review, None)?);
    info!(
        applicants = service.dataset().applicant_count(),
        ledger = %config.review.ledger_path.display(),
        "review panel loaded"
    );

    let app = with_review_routes(service, &config.review.voting_secret)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "applicant review service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
