// Gyeonggi Climate API v0.1
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod errors;
mod routes;
mod services;

use config::AppConfig;
use routes::AppState;
use services::alerts::DefaultAlertPolicy;
use services::kma::KmaClient;
use services::poller::{AlertPollerState, SharedAlertState};

/// Gyeonggi Climate API — OpenAPI specification.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Gyeonggi Climate API",
        version = "0.1.0",
        description = "Climate comfort API for the 31 Gyeonggi municipalities. \
            Proxies KMA API Hub surface observations and village forecasts, \
            normalizes the public advisory RSS feeds, and scores each region's \
            climate comfort on a 0-100 scale with per-audience adjustment.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Regions", description = "Municipalities, observations and climatology"),
        (name = "Forecasts", description = "Village short-term forecasts"),
        (name = "Climate", description = "Scored climate comfort map"),
        (name = "Alerts", description = "Weather advisory alerts"),
        (name = "Poller", description = "Background alert poller status"),
    ),
    paths(
        routes::health::health_check,
        routes::regions::list_regions,
        routes::regions::get_region_observation,
        routes::regions::get_region_history,
        routes::regions::get_region_daily,
        routes::regions::get_region_climatology,
        routes::forecasts::get_region_forecast,
        routes::climate::get_climate_map,
        routes::alerts::get_alerts,
        routes::poller::get_poller_status,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            routes::regions::DailySummaryResponse,
            routes::forecasts::RegionForecastResponse,
            routes::climate::ClimateMapResponse,
            routes::alerts::AlertsResponse,
            services::stations::Region,
            services::surface::ObservationRecord,
            services::forecast::ForecastPoint,
            services::climate::RegionScore,
            services::climate::MonthlyClimatology,
            services::scoring::ClimateInputs,
            services::scoring::RiskLevel,
            services::scoring::TargetGroup,
            services::alerts::AlertRecord,
            services::alerts::AlertSeverity,
            services::poller::AlertPollerState,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gyeonggi_climate_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();

    let kma_client = KmaClient::new(&config.kma_auth_key, &config.feed_user_agent);

    let alert_policy = DefaultAlertPolicy {
        region_label: config.alert_region_label.clone(),
    };

    // Create shared poller state and spawn the background alert poller
    let alert_state: SharedAlertState = Arc::new(RwLock::new(AlertPollerState::new()));
    tokio::spawn(services::poller::run_poller(
        kma_client.clone(),
        config.primary_alert_region.clone(),
        alert_policy.clone(),
        alert_state.clone(),
    ));

    let app_state = AppState {
        kma: kma_client,
        alerts: alert_state,
        primary_alert_region: config.primary_alert_region.clone(),
        alert_policy,
    };

    // CORS — read-only API, restrict methods to GET
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET])
        .allow_headers(Any);

    let app = Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .route("/api/v1/regions", get(routes::regions::list_regions))
        .route(
            "/api/v1/regions/:name/observation",
            get(routes::regions::get_region_observation),
        )
        .route(
            "/api/v1/regions/:name/history",
            get(routes::regions::get_region_history),
        )
        .route(
            "/api/v1/regions/:name/daily",
            get(routes::regions::get_region_daily),
        )
        .route(
            "/api/v1/regions/:name/climatology",
            get(routes::regions::get_region_climatology),
        )
        .route(
            "/api/v1/forecasts/:name",
            get(routes::forecasts::get_region_forecast),
        )
        .route("/api/v1/climate/map", get(routes::climate::get_climate_map))
        .route("/api/v1/alerts", get(routes::alerts::get_alerts))
        .route(
            "/api/v1/poller/status",
            get(routes::poller::get_poller_status),
        )
        .with_state(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("API server listening on {}", addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        config.port
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");
    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}
