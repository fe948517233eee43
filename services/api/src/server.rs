use crate::cli::ServeArgs;
use crate::infra::{listing_service, media_uploader, AppState, ConfiguredNotifier};
use crate::routes::with_listing_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use listing_desk::config::AppConfig;
use listing_desk::error::AppError;
use listing_desk::telemetry;
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

    let notifier = ConfiguredNotifier::from_config(&config.notifications);
    let notifications = notifier.label();
    let listings = listing_service(notifier);
    let uploader = media_uploader(&config.media);

    let app = with_listing_routes(listings, uploader)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        notifications,
        media_base = %config.media.public_base_url,
        "listing desk ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
