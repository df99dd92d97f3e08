//! Backend for a trilingual island-excursion booking site.
//!
//! # General Infrastructure
//! - The public frontend is a static site; everything dynamic goes through
//!   this server
//! - Redis is the authoritative store for excursions, categories,
//!   predefined services, bookings and contact submissions
//! - Meilisearch serves the search-as-you-type affordance and is derived
//!   from Redis, never written from anywhere else
//! - Admin mutations (and uploads to the blob store) sit behind
//!   server-side sessions; there is no client-side gate
//!
//! # Meilisearch Proxy
//! The search engine is never exposed to the frontend. Queries go through
//! `/search` so the engine key stays server-side, the per-language field
//! restriction and the 5-hit cap are enforced in one place, and an engine
//! outage degrades to an empty suggestion list instead of a browser error.
//!
//! # Languages
//! Customer-facing text exists in English, Spanish and Russian. The
//! backend resolves one language per request (explicit `lang` parameter,
//! else `Accept-Language`) and ships resolved strings, so the frontend
//! never sees the parallel fields.

use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{Method, header::CONTENT_TYPE},
    middleware,
    routing::{get, post, put},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod database;
pub mod dispatcher;
pub mod error;
pub mod models;
pub mod routes;
pub mod search;
pub mod seo;
pub mod session;
pub mod state;
pub mod upload;
pub mod utils;

use routes::{
    create_booking, create_category, create_contact, create_excursion, create_service,
    delete_category, delete_excursion, delete_service, get_excursion_handler, list_bookings,
    list_categories, list_contacts, list_excursions, list_services, popular_handler,
    robots_handler, search_handler, sitemap_handler, update_category, update_excursion,
    update_service,
};
use session::{login_handler, logout_handler, require_admin};
use state::AppState;
use upload::{MAX_UPLOAD_BYTES, upload_handler};

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = AppState::new().await;

    info!("Starting server...");

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    let admin = Router::new()
        .route("/admin/excursions", post(create_excursion))
        .route(
            "/admin/excursions/{id}",
            put(update_excursion).delete(delete_excursion),
        )
        .route("/admin/categories", post(create_category))
        .route(
            "/admin/categories/{id}",
            put(update_category).delete(delete_category),
        )
        .route("/admin/services", post(create_service))
        .route(
            "/admin/services/{id}",
            put(update_service).delete(delete_service),
        )
        .route("/admin/bookings", get(list_bookings))
        .route("/admin/contacts", get(list_contacts))
        .route(
            "/api/upload",
            // Slack above the cap so oversize bodies reach the handler's
            // own 413 instead of the extractor's.
            post(upload_handler).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 1024)),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    let app = Router::new()
        .route("/search", get(search_handler))
        .route("/search/popular", get(popular_handler))
        .route("/excursions", get(list_excursions))
        .route("/excursions/{id}", get(get_excursion_handler))
        .route("/categories", get(list_categories))
        .route("/services", get(list_services))
        .route("/bookings", post(create_booking))
        .route("/contacts", post(create_contact))
        .route("/sitemap.xml", get(sitemap_handler))
        .route("/robots.txt", get(robots_handler))
        .route("/admin/login", post(login_handler))
        .route("/admin/logout", post(logout_handler))
        .merge(admin)
        .layer(cors)
        .with_state(state.clone());

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
