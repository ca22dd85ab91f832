use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::{FileMap, Message, User, Workspace};

// -- Session JWT --

/// Claims carried by the session token handed out at sign-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub email: String,
    pub exp: usize,
}

// -- AI proxy --

#[derive(Debug, Default, Deserialize)]
pub struct PromptRequest {
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub result: String,
    pub success: bool,
}

/// Validated output of the code model: the file map plus whatever other
/// members the model chose to include (`projectTitle`, `explanation`, ...).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedCode {
    pub files: FileMap,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct GenerateCodeResponse {
    #[serde(flatten)]
    pub code: GeneratedCode,
    pub success: bool,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GoogleSignInRequest {
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct SignInResponse {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateTokenRequest {
    pub token: i64,
}

// -- Workspaces --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateWorkspaceRequest {
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct CreateWorkspaceResponse {
    pub id: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateMessagesRequest {
    pub messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateFilesRequest {
    pub files: FileMap,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitMessageRequest {
    pub content: String,
}

/// A workspace as the editor sees it: stored record, the file map merged
/// over the default scaffold, and whether a turn is currently running.
#[derive(Debug, Serialize)]
pub struct WorkspaceView {
    #[serde(flatten)]
    pub workspace: Workspace,
    pub files: FileMap,
    pub busy: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepStatus {
    pub ok: bool,
    /// Set when the step did not run because there was nothing to answer.
    #[serde(default)]
    pub skipped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepStatus {
    pub fn ok() -> Self {
        Self {
            ok: true,
            ..Self::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnResponse {
    pub workspace: WorkspaceView,
    pub reply: StepStatus,
    pub code: StepStatus,
    pub tokens_used: i64,
}

// -- Misc --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub total_projects: usize,
    pub total_messages: usize,
    pub token_balance: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicConfig {
    pub google_client_id: Option<String>,
    pub paypal_client_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skipped_step_is_distinct_from_failure() {
        let skipped = serde_json::to_value(StepStatus::skipped()).unwrap();
        assert_eq!(skipped, serde_json::json!({ "ok": false, "skipped": true }));

        let failed = serde_json::to_value(StepStatus::failed("model down")).unwrap();
        assert_eq!(
            failed,
            serde_json::json!({ "ok": false, "skipped": false, "error": "model down" })
        );
    }
}
