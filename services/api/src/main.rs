//! carbonledger's HTTP surface (spec §6): axum handlers wired against the
//! domain services, with JWT auth, RBAC, rate limiting and the security
//! headers of spec §6 applied as middleware layers.

mod auth;
mod error;
mod handlers;
mod password;
mod security;
mod state;

use std::sync::Arc;
use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::Router;
use carbonledger_core::config::Config;
use carbonledger_eventbus::{EventBus, InMemoryEventBus, QueueName};
use carbonledger_storage::Storage;
use carbonledger_workers::analytics::{AnomalyDetectionWorker, IndustryBenchmarkRefreshWorker};
use carbonledger_workers::reporting::{ReportCleanupWorker, ReportingWorker};
use carbonledger_workers::IngestionWorker;
use tower::limit::RateLimitLayer;
use tower::{BoxError, ServiceBuilder};
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().json())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env().expect("invalid configuration");
    let storage = Storage::connect(&config)
        .await
        .expect("failed to connect to the database");

    let in_memory_bus = Arc::new(InMemoryEventBus::new());
    let bus: Arc<dyn EventBus> = in_memory_bus.clone();
    let rate_limits = config.rate_limits.clone();

    let state = AppState::build(config, storage, bus)
        .await
        .expect("failed to build application state");

    spawn_background_workers(state.clone(), in_memory_bus);

    let app = build_router(state.clone(), &rate_limits);

    let port = std::env::var("PORT").unwrap_or_else(|_| "8000".to_string());
    let addr = format!("0.0.0.0:{port}");
    tracing::info!(%addr, "carbonledger API listening");

    let listener = tokio::net::TcpListener::bind(&addr).await.expect("failed to bind");
    axum::serve(listener, app).await.expect("server error");
}

fn rate_limited(router: Router<Arc<AppState>>, requests: u64, per: Duration) -> Router<Arc<AppState>> {
    router.layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(|err: BoxError| async move {
                (StatusCode::TOO_MANY_REQUESTS, format!("rate limited: {err}"))
            }))
            .layer(tower::buffer::BufferLayer::new(1024))
            .layer(RateLimitLayer::new(requests, per)),
    )
}

fn build_router(
    state: Arc<AppState>,
    rate_limits: &carbonledger_core::config::RateLimitConfig,
) -> Router {
    let hot_calculation = rate_limited(
        Router::new().route("/facilities/{id}/activity-data/", post(handlers::activity::create)),
        rate_limits.hot_calculation_per_minute as u64,
        Duration::from_secs(60),
    );

    let csv_upload = rate_limited(
        Router::new().route("/facilities/{id}/upload-csv", post(handlers::csv::upload)),
        rate_limits.csv_upload_per_hour as u64,
        Duration::from_secs(3600),
    );

    let wizard = rate_limited(
        Router::new().route("/suppliers/invite", post(handlers::suppliers::invite)),
        rate_limits.wizard_submit_per_minute as u64,
        Duration::from_secs(60),
    );

    let unmetered = Router::new()
        .route("/users/", post(handlers::users::register))
        .route("/token", post(handlers::users::login))
        .route("/companies/", post(handlers::companies::create))
        .route("/companies/{id}/facilities/", post(handlers::facilities::create))
        .route("/activity-data/{id}", put(handlers::activity::update))
        .route("/csv-template/activity-data", get(handlers::csv::template))
        .route(
            "/facilities/{id}/invoices/upload",
            post(handlers::invoices::upload),
        )
        .route("/invoices/{id}/verify", post(handlers::invoices::verify))
        .route(
            "/companies/{id}/reports/request",
            post(handlers::reports::request),
        )
        .route("/reports/{id}/status", get(handlers::reports::status))
        .route("/reports/{id}/download", get(handlers::reports::download))
        .route(
            "/companies/{id}/benchmark-report",
            get(handlers::benchmarking::benchmark_report),
        )
        .route(
            "/companies/{id}/roi-simulator",
            get(handlers::benchmarking::roi_simulator),
        )
        .route("/suppliers/accept/{token}", post(handlers::suppliers::accept))
        .route("/leaderboard", get(handlers::leaderboard::top));

    let app = Router::new()
        .merge(unmetered)
        .merge(hot_calculation)
        .merge(csv_upload)
        .merge(wizard)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ))
        .layer(axum::middleware::from_fn(security::security_headers))
        .layer(TraceLayer::new_for_http());

    // The global cap of spec §6 (200/min) sits outermost, ahead of auth, so
    // that an attacker flooding unauthenticated routes still gets throttled.
    rate_limited(app, rate_limits.global_per_minute as u64, Duration::from_secs(60)).with_state(state)
}

/// Spawns the ingestion, reporting and periodic analytics loops once, at
/// process startup (spec §4.E-H). Each worker owns its receiver end of a
/// named queue; this process is the only consumer of its own in-memory bus
/// (OCR has no queue consumer — it runs directly off the invoice upload
/// request, spawned from `handlers::invoices::upload`).
fn spawn_background_workers(state: Arc<AppState>, bus: Arc<InMemoryEventBus>) {
    let ingestion_worker = Arc::new(IngestionWorker::new(
        state.bus.clone(),
        state.idempotency.clone(),
        state.activity.clone(),
        state.quality_issues.clone(),
        state.event_log.clone(),
        state.invoices.clone(),
        state.facilities.clone(),
        state.financials.clone(),
        state.calculation.clone(),
    ));
    let ingestion_receiver = bus.take_receiver(QueueName::Ingestion);
    let worker = ingestion_worker.clone();
    tokio::spawn(async move { worker.run(ingestion_receiver).await });

    let invalid_receiver = bus.take_receiver(QueueName::InvalidData);
    tokio::spawn(async move { ingestion_worker.run(invalid_receiver).await });

    let reporting_worker = Arc::new(ReportingWorker::new(
        state.bus.clone(),
        state.reports.clone(),
        state.companies.clone(),
        state.users.clone(),
        state.facilities.clone(),
        state.activity.clone(),
        state.financials.clone(),
        state.notifications.clone(),
        state.artifact_dir.clone(),
    ));
    let reports_receiver = bus.take_receiver(QueueName::Reports);
    tokio::spawn(async move { reporting_worker.run(reports_receiver).await });

    let cleanup = ReportCleanupWorker::new(state.reports.clone());
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            match cleanup.run_once().await {
                Ok(count) if count > 0 => tracing::info!(count, "expired reports swept"),
                Ok(_) => {}
                Err(err) => tracing::error!(error = %err, "report expiry sweep failed"),
            }
        }
    });

    let benchmark_refresh = IndustryBenchmarkRefreshWorker::new(
        state.industry_templates.clone(),
        state.activity.clone(),
    );
    tokio::spawn(async move {
        loop {
            if let Err(err) = benchmark_refresh.run_once().await {
                tracing::error!(error = %err, "industry benchmark refresh failed");
            }
            tokio::time::sleep(Duration::from_secs(7 * 24 * 3600)).await;
        }
    });

    let anomaly_detection = AnomalyDetectionWorker::new(
        state.companies.clone(),
        state.users.clone(),
        state.activity.clone(),
        state.notifications.clone(),
    );
    let anomaly_companies = state.companies.clone();
    tokio::spawn(async move {
        loop {
            match anomaly_companies.list_distinct_industry_types().await {
                Ok(industries) => {
                    for industry in industries {
                        if let Err(err) = anomaly_detection.run_once_for_industry(&industry).await {
                            tracing::error!(error = %err, industry, "anomaly detection pass failed");
                        }
                    }
                }
                Err(err) => tracing::error!(error = %err, "could not list industry types for anomaly detection"),
            }
            tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
        }
    });

    let supplier_benchmarks = state.supplier_benchmarks.clone();
    tokio::spawn(async move {
        loop {
            if let Err(err) = supplier_benchmarks.run_once().await {
                tracing::error!(error = %err, "supplier category benchmark refresh failed");
            }
            tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
        }
    });
}
