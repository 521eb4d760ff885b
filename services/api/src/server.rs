use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::insights_router;
use axum::{Extension, Router};
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use workforce_insights::analytics::MetricCatalog;
use workforce_insights::config::AppConfig;
use workforce_insights::error::AppError;
use workforce_insights::session::SessionRegistry;
use workforce_insights::telemetry;

pub(crate) async fn run(args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let sessions = Arc::new(SessionRegistry::new(MetricCatalog::standard()));
    spawn_idle_sweeper(sessions.clone(), config.server.session_idle);

    let (app, readiness) = build_app(&config, sessions);
    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        method = config.analytics.method.label(),
        recommendations_configured = config.ai.endpoint.is_some(),
        session_idle_secs = config.server.session_idle.as_secs(),
        "workforce insights service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

/// Router with state and metrics layers. Readiness stays false until the caller flips it.
fn build_app(config: &AppConfig, sessions: Arc<SessionRegistry>) -> (Router, Arc<AtomicBool>) {
    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness = Arc::new(AtomicBool::new(false));

    let state = AppState {
        readiness: readiness.clone(),
        metrics: Arc::new(prometheus_handle),
        sessions,
        gateway: config.ai.gateway(),
        detection_defaults: config.analytics.detection_defaults(),
    };

    let app = insights_router()
        .layer(Extension(state))
        .layer(prometheus_layer);
    (app, readiness)
}

/// Reclaims sessions whose users never signed out. Checks a few times per idle window.
fn spawn_idle_sweeper(sessions: Arc<SessionRegistry>, max_idle: Duration) {
    let period = (max_idle / 4).max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let swept = sessions.sweep_idle(max_idle, chrono::Utc::now());
            if swept > 0 {
                info!(swept, remaining = sessions.len(), "expired idle analysis sessions");
            }
        }
    });
}
