use axum::{response::IntoResponse, routing::get, Json, Router};
use http::{HeaderValue, Method, StatusCode};
use serde_json::json;
use std::{error::Error, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt, Registry};

use crate::{
    handlers::f1data::get_f1_data,
    services::openf1::OpenF1Provider,
    utils::{config::Config, state::AppState},
};

pub fn init_tracing() {
    let log_level = std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase();

    let level = match log_level.as_str() {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    };

    let filter = filter::Targets::new()
        .with_target("tower_http::trace::on_response", Level::TRACE)
        .with_target("tower_http::trace::on_request", Level::TRACE)
        .with_target("tower_http::trace::make_span", Level::DEBUG)
        .with_target("axum::rejection", Level::TRACE)
        .with_target(env!("CARGO_PKG_NAME"), level)
        .with_default(Level::INFO);

    let tracing_layer = tracing_subscriber::fmt::layer();

    Registry::default().with(tracing_layer).with(filter).init();
}

pub fn make_app(config: &Config) -> Result<Router, Box<dyn Error>> {
    info!("Initializing application...");
    std::fs::create_dir_all(&config.cache_dir)?;
    info!("Response cache directory ready at {}", config.cache_dir);

    let provider = OpenF1Provider::new(config);
    let state = Arc::new(AppState {
        provider: Arc::new(provider),
    });

    let cors = CorsLayer::new()
        .allow_origin(config.allowed_origin.parse::<HeaderValue>()?)
        .allow_methods([Method::GET]);

    let app = Router::new()
        .route("/", get(health_check))
        .route("/f1data", get(get_f1_data))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);
    info!("Application initialized successfully");

    Ok(app)
}

async fn health_check() -> impl IntoResponse {
    return (StatusCode::OK, Json(json!({"message": "Hello World"}))).into_response();
}
