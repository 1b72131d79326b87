pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod ws;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use state::AppState;

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/settings",
            get(routes::settings::get_settings).post(routes::settings::update_settings),
        )
        .route("/jobs", axum::routing::post(routes::jobs::submit_job))
        .route("/jobs/{id}", get(routes::jobs::get_job))
        .route("/images/{job_id}/{filename}", get(routes::images::get_image))
        .route("/download/{job_id}", get(routes::images::download_job))
        .route("/ws", get(ws::ws_handler));

    Router::new()
        .route("/", get(|| async { "nano-batch running" }))
        .nest("/api", api)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
