use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use quote_funnel::config::AppConfig;
use quote_funnel::error::AppError;
use quote_funnel::relay::MailRelayService;
use quote_funnel::telemetry;
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

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let relay = Arc::new(MailRelayService::from_settings(&config.mail));
    let health = relay.health().environment;
    if let Some(err) = relay.configuration_error() {
        warn!(
            error = %err,
            smtp_configured = health.smtp_configured,
            to_email_configured = health.to_email_configured,
            "mail relay unavailable; /api/send will answer with a configuration error"
        );
    }

    let app = with_service_routes(relay)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        smtp_configured = health.smtp_configured,
        to_email_configured = health.to_email_configured,
        "quote funnel relay ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
