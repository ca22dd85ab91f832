use anyhow::anyhow;
use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use zflow_ai::scaffold;
use zflow_pipeline::{PipelineError, TurnOutcome};
use zflow_types::api::{
    CreateWorkspaceRequest, CreateWorkspaceResponse, SubmitMessageRequest, SuccessResponse,
    TurnResponse, UpdateFilesRequest, UpdateMessagesRequest, WorkspaceView,
};
use zflow_types::models::{Message, Workspace};

use crate::middleware::SessionUser;
use crate::{ApiError, AppState};

pub async fn list_workspaces(
    State(state): State<AppState>,
    Extension(SessionUser(user)): Extension<SessionUser>,
) -> Result<Json<Vec<Workspace>>, ApiError> {
    let workspaces = state
        .db_call(move |db| db.get_workspaces_for_user(&user.id))
        .await?;
    Ok(Json(workspaces))
}

/// POST /workspaces: Start a project from the user's first prompt.
pub async fn create_workspace(
    State(state): State<AppState>,
    Extension(SessionUser(user)): Extension<SessionUser>,
    payload: Result<Json<CreateWorkspaceRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    if req.prompt.trim().is_empty() {
        return Err(ApiError::InvalidInput(
            "Please enter a description for your project".into(),
        ));
    }

    let id = Uuid::new_v4().to_string();
    let wid = id.clone();
    let uid = user.id.clone();
    state
        .db_call(move |db| db.create_workspace(&wid, &uid, &[Message::user(req.prompt)]))
        .await?;

    info!("Workspace {} created for {}", id, user.email);
    Ok((StatusCode::CREATED, Json(CreateWorkspaceResponse { id })))
}

pub async fn get_workspace(
    State(state): State<AppState>,
    Extension(SessionUser(user)): Extension<SessionUser>,
    Path(workspace_id): Path<String>,
) -> Result<Json<WorkspaceView>, ApiError> {
    let id = workspace_id.clone();
    let workspace = state
        .db_call(move |db| db.get_workspace(&id))
        .await?
        .ok_or(ApiError::NotFound("Workspace"))?;

    if workspace.user != user.id {
        return Err(ApiError::Forbidden);
    }

    Ok(Json(view(&state, workspace)))
}

pub async fn update_messages(
    State(state): State<AppState>,
    Extension(SessionUser(user)): Extension<SessionUser>,
    Path(workspace_id): Path<String>,
    payload: Result<Json<UpdateMessagesRequest>, JsonRejection>,
) -> Result<Json<WorkspaceView>, ApiError> {
    let Json(req) = payload?;
    let workspace = state
        .dispatcher
        .replace_messages(&workspace_id, &user.id, req.messages)
        .await?;
    Ok(Json(view(&state, workspace)))
}

pub async fn update_files(
    State(state): State<AppState>,
    Extension(SessionUser(user)): Extension<SessionUser>,
    Path(workspace_id): Path<String>,
    payload: Result<Json<UpdateFilesRequest>, JsonRejection>,
) -> Result<Json<WorkspaceView>, ApiError> {
    let Json(req) = payload?;
    let workspace = state
        .dispatcher
        .replace_files(&workspace_id, &user.id, req.files)
        .await?;
    Ok(Json(view(&state, workspace)))
}

pub async fn delete_workspace(
    State(state): State<AppState>,
    Extension(SessionUser(user)): Extension<SessionUser>,
    Path(workspace_id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.dispatcher.delete(&workspace_id, &user.id).await?;
    Ok(Json(SuccessResponse { success: true }))
}

/// POST /workspaces/{id}/messages: Append a user message and run the turn.
pub async fn submit_message(
    State(state): State<AppState>,
    Extension(SessionUser(user)): Extension<SessionUser>,
    Path(workspace_id): Path<String>,
    payload: Result<Json<SubmitMessageRequest>, JsonRejection>,
) -> Result<Json<TurnResponse>, ApiError> {
    let Json(req) = payload?;
    let dispatcher = state.dispatcher.clone();

    // Detached so a dropped connection cannot abandon a turn half-way.
    let outcome = tokio::spawn(async move {
        dispatcher.submit(&workspace_id, &user.id, &req.content).await
    })
    .await
    .map_err(|e| PipelineError::from(anyhow!("turn task failed: {}", e)))??;

    Ok(Json(turn_response(&state, outcome)))
}

/// POST /workspaces/{id}/generate: Run the turn for a pending user message.
pub async fn generate(
    State(state): State<AppState>,
    Extension(SessionUser(user)): Extension<SessionUser>,
    Path(workspace_id): Path<String>,
) -> Result<Json<TurnResponse>, ApiError> {
    let dispatcher = state.dispatcher.clone();

    let outcome = tokio::spawn(async move { dispatcher.run_pending(&workspace_id, &user.id).await })
        .await
        .map_err(|e| PipelineError::from(anyhow!("turn task failed: {}", e)))??;

    Ok(Json(turn_response(&state, outcome)))
}

fn view(state: &AppState, workspace: Workspace) -> WorkspaceView {
    WorkspaceView {
        files: scaffold::with_scaffold(workspace.file_data.as_ref()),
        busy: state.dispatcher.is_busy(&workspace.id),
        workspace,
    }
}

fn turn_response(state: &AppState, outcome: TurnOutcome) -> TurnResponse {
    TurnResponse {
        workspace: view(state, outcome.workspace),
        reply: outcome.reply,
        code: outcome.code,
        tokens_used: outcome.tokens_used,
    }
}
