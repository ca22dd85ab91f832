use axum::{
    Json, Router,
    extract::State,
    middleware,
    routing::{get, post, put},
};
use serde_json::{Value, json};

use zflow_types::api::PublicConfig;

use crate::middleware::require_auth;
use crate::{AppState, ai, auth, users, workspaces};

/// All HTTP routes. Transport layers (CORS, tracing) are added by the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/config/public", get(public_config))
        .route("/api/ai-chat", post(ai::ai_chat))
        .route("/api/gen-ai-code", post(ai::gen_ai_code))
        .route("/auth/google", post(auth::google_sign_in));

    let protected_routes = Router::new()
        .route("/session", get(auth::session))
        .route("/users/me", get(users::me))
        .route("/users/me/token", put(users::update_token))
        .route("/dashboard", get(users::dashboard))
        .route(
            "/workspaces",
            get(workspaces::list_workspaces).post(workspaces::create_workspace),
        )
        .route(
            "/workspaces/{workspace_id}",
            get(workspaces::get_workspace).delete(workspaces::delete_workspace),
        )
        .route(
            "/workspaces/{workspace_id}/messages",
            put(workspaces::update_messages).post(workspaces::submit_message),
        )
        .route("/workspaces/{workspace_id}/files", put(workspaces::update_files))
        .route("/workspaces/{workspace_id}/generate", post(workspaces::generate))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn public_config(State(state): State<AppState>) -> Json<PublicConfig> {
    Json(state.public_config.clone())
}
