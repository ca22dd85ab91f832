use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use zflow_ai::{ChatModel, scaffold};
use zflow_db::Database;
use zflow_types::api::StepStatus;
use zflow_types::models::{FileMap, Message, Workspace};

use crate::PipelineError;
use crate::steps;

/// Result of one turn as persisted.
#[derive(Debug)]
pub struct TurnOutcome {
    pub workspace: Workspace,
    pub reply: StepStatus,
    pub code: StepStatus,
    pub tokens_used: i64,
}

/// Runs turns and serializes every write to a workspace.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    db: Arc<Database>,
    chat_model: Arc<dyn ChatModel>,
    code_model: Arc<dyn ChatModel>,

    /// workspace_id -> lock plus number of callers holding or waiting on it
    slots: Mutex<HashMap<String, Slot>>,
}

struct Slot {
    lock: Arc<AsyncMutex<()>>,
    pending: usize,
}

/// Held for the duration of one workspace operation.
struct WorkspaceGuard {
    _permit: OwnedMutexGuard<()>,
    _pending: PendingGuard,
}

/// Counts a caller against a slot until dropped, including while waiting.
struct PendingGuard {
    inner: Arc<DispatcherInner>,
    workspace_id: String,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        let Ok(mut slots) = self.inner.slots.lock() else {
            return;
        };
        if let Some(slot) = slots.get_mut(&self.workspace_id) {
            slot.pending -= 1;
            if slot.pending == 0 {
                slots.remove(&self.workspace_id);
            }
        }
    }
}

impl Dispatcher {
    pub fn new(
        db: Arc<Database>,
        chat_model: Arc<dyn ChatModel>,
        code_model: Arc<dyn ChatModel>,
    ) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                db,
                chat_model,
                code_model,
                slots: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// True while a turn or write for this workspace is running or queued.
    pub fn is_busy(&self, workspace_id: &str) -> bool {
        self.inner
            .slots
            .lock()
            .map(|slots| slots.contains_key(workspace_id))
            .unwrap_or(false)
    }

    /// Append a user message and run a full turn for it.
    /// Queues behind any turn already running on the same workspace.
    pub async fn submit(
        &self,
        workspace_id: &str,
        user_id: &str,
        content: &str,
    ) -> Result<TurnOutcome, PipelineError> {
        if content.trim().is_empty() {
            return Err(PipelineError::EmptyMessage);
        }

        let _guard = self.acquire(workspace_id).await?;
        let mut workspace = self.load_owned(workspace_id, user_id).await?;
        self.ensure_balance(user_id).await?;

        workspace.messages.push(Message::user(content));
        let id = workspace_id.to_string();
        let messages = workspace.messages.clone();
        if !self.blocking(move |db| db.update_messages(&id, &messages)).await? {
            return Err(PipelineError::WorkspaceNotFound(workspace_id.to_string()));
        }

        self.run_turn(workspace, user_id).await
    }

    /// Run the turn for a workspace whose last message is from the user.
    /// A workspace with nothing pending is returned untouched, so repeated
    /// triggers for the same message collapse into one turn.
    pub async fn run_pending(
        &self,
        workspace_id: &str,
        user_id: &str,
    ) -> Result<TurnOutcome, PipelineError> {
        let _guard = self.acquire(workspace_id).await?;
        let workspace = self.load_owned(workspace_id, user_id).await?;

        if !workspace.has_pending_turn() {
            debug!("Workspace {} has no pending turn", workspace_id);
            return Ok(TurnOutcome {
                workspace,
                reply: StepStatus::skipped(),
                code: StepStatus::skipped(),
                tokens_used: 0,
            });
        }

        self.ensure_balance(user_id).await?;
        self.run_turn(workspace, user_id).await
    }

    /// Overwrite the message list.
    pub async fn replace_messages(
        &self,
        workspace_id: &str,
        user_id: &str,
        messages: Vec<Message>,
    ) -> Result<Workspace, PipelineError> {
        let _guard = self.acquire(workspace_id).await?;
        self.load_owned(workspace_id, user_id).await?;

        let id = workspace_id.to_string();
        self.blocking(move |db| db.update_messages(&id, &messages)).await?;
        self.reload(workspace_id).await
    }

    /// Overwrite the stored file map.
    pub async fn replace_files(
        &self,
        workspace_id: &str,
        user_id: &str,
        files: FileMap,
    ) -> Result<Workspace, PipelineError> {
        let _guard = self.acquire(workspace_id).await?;
        self.load_owned(workspace_id, user_id).await?;

        let id = workspace_id.to_string();
        self.blocking(move |db| db.update_files(&id, &files)).await?;
        self.reload(workspace_id).await
    }

    pub async fn delete(&self, workspace_id: &str, user_id: &str) -> Result<(), PipelineError> {
        let _guard = self.acquire(workspace_id).await?;
        self.load_owned(workspace_id, user_id).await?;

        let id = workspace_id.to_string();
        self.blocking(move |db| db.delete_workspace(&id)).await?;
        info!("Workspace {} deleted", workspace_id);
        Ok(())
    }

    /// Fan out to both models, join, and persist one combined update.
    async fn run_turn(
        &self,
        mut workspace: Workspace,
        user_id: &str,
    ) -> Result<TurnOutcome, PipelineError> {
        let history = workspace.messages.clone();
        let (reply, (generated, code_tokens)) = tokio::join!(
            steps::reply(self.inner.chat_model.as_ref(), &history),
            steps::regenerate(self.inner.code_model.as_ref(), &history),
        );

        let mut tokens_used = i64::from(code_tokens.unwrap_or(0));

        let reply_status = match reply {
            Ok((message, tokens)) => {
                tokens_used += i64::from(tokens.unwrap_or(0));
                workspace.messages.push(message);
                StepStatus::ok()
            }
            Err(e) => {
                warn!("Chat reply failed for workspace {}: {}", workspace.id, e);
                StepStatus::failed(e.to_string())
            }
        };

        let (code_status, files) = match generated {
            Ok(files) => {
                let stored = workspace.file_data.unwrap_or_default();
                let merged = scaffold::merge_files(&stored, &files);
                (StepStatus::ok(), Some(merged))
            }
            Err(e) => {
                warn!("Code generation failed for workspace {}: {}", workspace.id, e);
                (StepStatus::failed(e.to_string()), None)
            }
        };

        let id = workspace.id.clone();
        let uid = user_id.to_string();
        let messages = workspace.messages;
        let updated = self
            .blocking(move |db| {
                db.record_turn(&id, &uid, &messages, files.as_ref(), tokens_used)
            })
            .await?;
        if !updated {
            return Err(PipelineError::WorkspaceNotFound(workspace.id));
        }

        info!(
            "Turn finished for workspace {} (reply ok: {}, code ok: {})",
            workspace.id, reply_status.ok, code_status.ok
        );

        Ok(TurnOutcome {
            workspace: self.reload(&workspace.id).await?,
            reply: reply_status,
            code: code_status,
            tokens_used,
        })
    }

    async fn acquire(&self, workspace_id: &str) -> Result<WorkspaceGuard, PipelineError> {
        let lock = {
            let mut slots = self
                .inner
                .slots
                .lock()
                .map_err(|e| anyhow!("Dispatcher lock poisoned: {}", e))?;
            let slot = slots.entry(workspace_id.to_string()).or_insert_with(|| Slot {
                lock: Arc::new(AsyncMutex::new(())),
                pending: 0,
            });
            slot.pending += 1;
            slot.lock.clone()
        };

        let pending = PendingGuard {
            inner: self.inner.clone(),
            workspace_id: workspace_id.to_string(),
        };
        let permit = lock.lock_owned().await;

        Ok(WorkspaceGuard {
            _permit: permit,
            _pending: pending,
        })
    }

    async fn load_owned(
        &self,
        workspace_id: &str,
        user_id: &str,
    ) -> Result<Workspace, PipelineError> {
        let workspace = self.reload(workspace_id).await?;
        if workspace.user != user_id {
            return Err(PipelineError::NotOwner(workspace_id.to_string()));
        }
        Ok(workspace)
    }

    async fn reload(&self, workspace_id: &str) -> Result<Workspace, PipelineError> {
        let id = workspace_id.to_string();
        self.blocking(move |db| db.get_workspace(&id))
            .await?
            .ok_or_else(|| PipelineError::WorkspaceNotFound(workspace_id.to_string()))
    }

    async fn ensure_balance(&self, user_id: &str) -> Result<(), PipelineError> {
        let id = user_id.to_string();
        let user = self
            .blocking(move |db| db.get_user_by_id(&id))
            .await?
            .ok_or_else(|| PipelineError::UserNotFound(user_id.to_string()))?;

        if user.token <= 0 {
            return Err(PipelineError::InsufficientTokens);
        }
        Ok(())
    }

    /// Run a blocking DB call off the async runtime.
    async fn blocking<F, T>(&self, f: F) -> Result<T, PipelineError>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.inner.db.clone();
        let result = tokio::task::spawn_blocking(move || f(db.as_ref()))
            .await
            .map_err(|e| anyhow!("spawn_blocking join error: {}", e))??;
        Ok(result)
    }
}
