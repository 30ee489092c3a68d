use axum::Router;
use axum::extract::State;
use std::sync::Arc;

pub mod api;
pub mod app_env;
pub mod db;
pub mod domain;
pub mod dto;
pub mod external_connections;
pub mod logging;
pub mod persistence;
pub mod routing_utils;
pub mod session;

/// Everything request handlers need which outlives a single request
pub struct SharedData {
    pub ext_cxn: persistence::ExternalConnectivity,
    pub sessions: session::SessionKeys,
    pub credential_verifier: persistence::ConfiguredCredentialVerifier,
}

pub type AppState = State<Arc<SharedData>>;

/// Assembles every route, the API docs, and request tracing into one router
pub fn build_router(shared_data: Arc<SharedData>) -> Router {
    let router = Router::new()
        .nest("/auth", api::auth::auth_routes())
        .nest("/tasks", api::task::task_routes())
        .nest("/terms", api::terms::terms_routes())
        .merge(api::swagger_main::build_documentation());

    logging::attach_tracing_http(router).with_state(shared_data)
}
