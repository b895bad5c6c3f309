use crate::cli::ServeArgs;
use crate::infra::{build_backends, AppState};
use crate::routes::with_intake_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use doc_intake::config::AppConfig;
use doc_intake::error::AppError;
use doc_intake::telemetry;
use doc_intake::workflows::intake::ApplicationIntakeService;
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

    let backend_config = config.clone();
    let backends = tokio::task::spawn_blocking(move || build_backends(&backend_config)).await??;
    let constraints = config.upload.constraints();
    let intake_service = Arc::new(ApplicationIntakeService::new(backends, constraints));

    let app = with_intake_routes(intake_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        max_upload_bytes = config.upload.max_bytes,
        "document intake service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
