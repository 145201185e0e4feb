//! Backend for a wedding RSVP site.
//!
//! Five JSON endpoints over a single guest-collection document kept as one
//! blob under one Redis key. Every request is stateless: read the whole
//! document, mutate it in memory, write the whole document back. There is no
//! locking and no compare-and-swap, so the later of two racing writes wins.
//! At the intended scale (a few hundred guests, human-paced admin edits)
//! that tradeoff is accepted rather than worked around.
//!
//! # Endpoints
//!
//! - `POST /api/check-token` — token lookup for the landing page
//! - `POST /api/submit-rsvp` — guest-facing RSVP submission
//! - `POST /api/admin-view` — full guest list with metadata
//! - `POST /api/admin-update` — partial update of one guest by id
//! - `GET|POST /api/init-data` — one-time load of the seed file
use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::{get, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod error;
pub mod guests;
pub mod routes;
pub mod seed;
pub mod state;
pub mod store;
pub mod utils;

use routes::{
    admin_update_handler, admin_view_handler, check_token_handler, init_data_handler,
    method_not_allowed, submit_rsvp_handler,
};
use state::AppState;

pub fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route(
            "/api/check-token",
            post(check_token_handler).fallback(method_not_allowed),
        )
        .route(
            "/api/submit-rsvp",
            post(submit_rsvp_handler).fallback(method_not_allowed),
        )
        .route(
            "/api/admin-view",
            post(admin_view_handler).fallback(method_not_allowed),
        )
        .route(
            "/api/admin-update",
            post(admin_update_handler).fallback(method_not_allowed),
        )
        .route(
            "/api/init-data",
            get(init_data_handler)
                .post(init_data_handler)
                .fallback(method_not_allowed),
        )
        .layer(cors)
        .with_state(state)
}

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = AppState::new().await;

    info!("Starting server...");
    let app = app(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await.unwrap();
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    println!("Server shutting down...");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
