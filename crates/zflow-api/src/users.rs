use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
};
use tracing::info;

use zflow_types::api::{DashboardResponse, UpdateTokenRequest};
use zflow_types::models::User;

use crate::middleware::SessionUser;
use crate::{ApiError, AppState};

pub async fn me(Extension(SessionUser(user)): Extension<SessionUser>) -> Json<User> {
    Json(user)
}

/// PUT /users/me/token: Set the token balance (e.g. after a purchase).
pub async fn update_token(
    State(state): State<AppState>,
    Extension(SessionUser(user)): Extension<SessionUser>,
    payload: Result<Json<UpdateTokenRequest>, JsonRejection>,
) -> Result<Json<User>, ApiError> {
    let Json(req) = payload?;
    if req.token < 0 {
        return Err(ApiError::InvalidInput("Token balance cannot be negative".into()));
    }

    let id = user.id.clone();
    let updated = state
        .db_call(move |db| {
            db.update_token(&id, req.token)?;
            db.get_user_by_id(&id)
        })
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    info!("Token balance for {} set to {}", updated.email, updated.token);
    Ok(Json(updated))
}

pub async fn dashboard(
    State(state): State<AppState>,
    Extension(SessionUser(user)): Extension<SessionUser>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let id = user.id.clone();
    let workspaces = state
        .db_call(move |db| db.get_workspaces_for_user(&id))
        .await?;

    Ok(Json(DashboardResponse {
        total_projects: workspaces.len(),
        total_messages: workspaces.iter().map(|w| w.messages.len()).sum(),
        token_balance: user.token,
    }))
}
