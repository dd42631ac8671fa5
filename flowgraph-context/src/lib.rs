//! # Flowgraph Context
//!
//! The editing session: single owner of the declaration being composed,
//! with undo/redo history, named snapshots and an edit log.

use flowgraph_core::{
    BuilderError, DeclarationBuilder, DeclarationField, FlowgraphDeclaration,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Default number of undo steps a session keeps
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Default number of edit log entries a session keeps
pub const DEFAULT_LOG_LIMIT: usize = 1000;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Builder(#[from] BuilderError),

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("nothing to redo")]
    NothingToRedo,

    #[error("snapshot with id '{0}' already exists")]
    SnapshotExists(String),

    #[error("snapshot '{0}' not found")]
    SnapshotNotFound(String),
}

#[derive(Debug, Clone)]
pub struct EditSession {
    pub trace_id: String,
    pub edit_logs: Vec<EditLog>,
    current: DeclarationBuilder,
    undo_stack: Vec<DeclarationBuilder>,
    redo_stack: Vec<DeclarationBuilder>,
    snapshots: HashMap<String, SessionSnapshot>,
    history_limit: usize,
    log_limit: usize,
}

#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub snapshot_id: String,
    pub timestamp: Instant,
    pub declaration: Arc<FlowgraphDeclaration>,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct EditLog {
    pub label: String,
    pub timestamp: Instant,
    pub status: EditStatus,
    pub error_message: Option<String>,
    pub trace_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditStatus {
    Applied,
    Rejected,
    Undone,
    Redone,
    RolledBack,
}

impl Default for EditSession {
    fn default() -> Self {
        Self::with_builder(DeclarationBuilder::default())
    }
}

impl EditSession {
    pub fn new(define: impl Into<String>, description: impl Into<String>) -> Self {
        Self::with_builder(DeclarationBuilder::new(define, description))
    }

    /// Opens a session on an existing builder value
    pub fn with_builder(builder: DeclarationBuilder) -> Self {
        Self::new_with_trace_id(Uuid::new_v4().to_string(), builder)
    }

    pub fn new_with_trace_id(trace_id: String, builder: DeclarationBuilder) -> Self {
        Self {
            trace_id,
            edit_logs: Vec::new(),
            current: builder,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            snapshots: HashMap::new(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            log_limit: DEFAULT_LOG_LIMIT,
        }
    }

    /// Caps the undo history; the oldest entries are dropped first
    pub fn history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self.trim_history();
        self
    }

    /// Caps the edit log; the oldest entries are dropped first
    pub fn log_limit(mut self, limit: usize) -> Self {
        self.log_limit = limit;
        self.trim_log();
        self
    }

    pub fn builder(&self) -> &DeclarationBuilder {
        &self.current
    }

    /// Current declaration value, independent of later edits
    pub fn declaration(&self) -> Arc<FlowgraphDeclaration> {
        self.current.build()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Runs `edit` against the current value and commits its result.
    /// A rejected edit is logged and leaves the session unchanged.
    pub fn apply<F>(&mut self, label: &str, edit: F) -> Result<&DeclarationBuilder, SessionError>
    where
        F: FnOnce(&DeclarationBuilder) -> Result<DeclarationBuilder, BuilderError>,
    {
        match edit(&self.current) {
            Ok(next) => {
                let previous = std::mem::replace(&mut self.current, next);
                self.undo_stack.push(previous);
                self.redo_stack.clear();
                self.trim_history();
                self.log(label, EditStatus::Applied, None);
                tracing::info!(
                    trace_id = %self.trace_id,
                    edit = %label,
                    steps = self.current.steps().len(),
                    "edit applied"
                );
                Ok(&self.current)
            }
            Err(error) => {
                self.log(label, EditStatus::Rejected, Some(error.to_string()));
                tracing::warn!(trace_id = %self.trace_id, edit = %label, error = %error, "edit rejected");
                Err(error.into())
            }
        }
    }

    pub fn set_field(
        &mut self,
        field: DeclarationField,
        value: &str,
    ) -> Result<&DeclarationBuilder, SessionError> {
        let label = format!("set {field:?}");
        self.apply(&label, |builder| Ok(builder.set_field(field, value)))
    }

    pub fn undo(&mut self) -> Result<&DeclarationBuilder, SessionError> {
        let previous = self.undo_stack.pop().ok_or(SessionError::NothingToUndo)?;
        let undone = std::mem::replace(&mut self.current, previous);
        self.redo_stack.push(undone);
        self.log("undo", EditStatus::Undone, None);
        tracing::info!(trace_id = %self.trace_id, remaining = self.undo_stack.len(), "undo");
        Ok(&self.current)
    }

    pub fn redo(&mut self) -> Result<&DeclarationBuilder, SessionError> {
        let next = self.redo_stack.pop().ok_or(SessionError::NothingToRedo)?;
        let previous = std::mem::replace(&mut self.current, next);
        self.undo_stack.push(previous);
        self.trim_history();
        self.log("redo", EditStatus::Redone, None);
        tracing::info!(trace_id = %self.trace_id, remaining = self.redo_stack.len(), "redo");
        Ok(&self.current)
    }

    /// Records the current declaration under `snapshot_id`
    pub fn create_snapshot(
        &mut self,
        snapshot_id: String,
        description: String,
    ) -> Result<(), SessionError> {
        if self.snapshots.contains_key(&snapshot_id) {
            return Err(SessionError::SnapshotExists(snapshot_id));
        }

        let snapshot = SessionSnapshot {
            snapshot_id: snapshot_id.clone(),
            timestamp: Instant::now(),
            declaration: self.current.build(),
            description,
        };
        self.snapshots.insert(snapshot_id.clone(), snapshot);

        tracing::info!(trace_id = %self.trace_id, snapshot = %snapshot_id, "Created snapshot");
        Ok(())
    }

    /// Restores a snapshot; the rollback itself can be undone
    pub fn rollback_to_snapshot(
        &mut self,
        snapshot_id: &str,
    ) -> Result<&DeclarationBuilder, SessionError> {
        let snapshot = self
            .snapshots
            .get(snapshot_id)
            .ok_or_else(|| SessionError::SnapshotNotFound(snapshot_id.to_string()))?;

        let old_steps = self.current.steps().len();
        let restored = DeclarationBuilder::from_declaration(Arc::clone(&snapshot.declaration));
        let description = snapshot.description.clone();

        let previous = std::mem::replace(&mut self.current, restored);
        self.undo_stack.push(previous);
        self.redo_stack.clear();
        self.trim_history();
        self.log(&format!("rollback {snapshot_id}"), EditStatus::RolledBack, None);

        tracing::info!(
            trace_id = %self.trace_id,
            snapshot = %snapshot_id,
            description = %description,
            old_steps,
            new_steps = self.current.steps().len(),
            "Rolled back to snapshot"
        );
        Ok(&self.current)
    }

    pub fn remove_snapshot(&mut self, snapshot_id: &str) -> Result<(), SessionError> {
        self.snapshots
            .remove(snapshot_id)
            .ok_or_else(|| SessionError::SnapshotNotFound(snapshot_id.to_string()))?;

        tracing::info!(trace_id = %self.trace_id, snapshot = %snapshot_id, "Removed snapshot");
        Ok(())
    }

    /// Snapshots, oldest first
    pub fn list_snapshots(&self) -> Vec<&SessionSnapshot> {
        let mut snapshots: Vec<_> = self.snapshots.values().collect();
        snapshots.sort_by_key(|snapshot| snapshot.timestamp);
        snapshots
    }

    fn log(&mut self, label: &str, status: EditStatus, error_message: Option<String>) {
        self.edit_logs.push(EditLog {
            label: label.to_string(),
            timestamp: Instant::now(),
            status,
            error_message,
            trace_id: self.trace_id.clone(),
        });
        self.trim_log();
    }

    fn trim_log(&mut self) {
        if self.edit_logs.len() > self.log_limit {
            let excess = self.edit_logs.len() - self.log_limit;
            self.edit_logs.drain(..excess);
        }
    }

    fn trim_history(&mut self) {
        if self.undo_stack.len() > self.history_limit {
            let excess = self.undo_stack.len() - self.history_limit;
            self.undo_stack.drain(..excess);
        }
    }
}

pub type SharedSession = Arc<Mutex<EditSession>>;

/// Wraps a session for shared access across tasks
pub fn shared(session: EditSession) -> SharedSession {
    Arc::new(Mutex::new(session))
}
