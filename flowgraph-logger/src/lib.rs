//! # Flowgraph Logger
//!
//! Tracing setup and summaries of editing sessions

use flowgraph_context::{EditSession, EditStatus};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Output format for [`Logger::init_tracing_with`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logger for flowgraph sessions
pub struct Logger {
    pub trace_id: String,
}

impl Logger {
    pub fn new() -> Self {
        Self {
            trace_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_trace_id(trace_id: String) -> Self {
        Self { trace_id }
    }

    /// Logger sharing the session's trace id
    pub fn for_session(session: &EditSession) -> Self {
        Self::with_trace_id(session.trace_id.clone())
    }

    /// Installs a subscriber filtered by `RUST_LOG`
    pub fn init_tracing() {
        Self::init_tracing_with(LogFormat::Pretty);
    }

    /// Installs a subscriber in the given format. Later calls are ignored.
    pub fn init_tracing_with(format: LogFormat) {
        let filter = tracing_subscriber::EnvFilter::from_default_env();
        let installed = match format {
            LogFormat::Pretty => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .try_init(),
            LogFormat::Json => tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .try_init(),
        };
        if installed.is_err() {
            debug!("tracing subscriber already installed");
        }
    }

    pub fn info(&self, message: &str) {
        info!(trace_id = %self.trace_id, "{}", message);
    }

    pub fn warn(&self, message: &str) {
        warn!(trace_id = %self.trace_id, "{}", message);
    }

    pub fn error(&self, message: &str) {
        error!(trace_id = %self.trace_id, "{}", message);
    }

    pub fn debug(&self, message: &str) {
        debug!(trace_id = %self.trace_id, "{}", message);
    }

    /// Logs edit counts per status and the shape of the current declaration
    pub fn log_session_summary(&self, session: &EditSession) {
        let summary = SessionSummary::of(session);
        let declaration = session.declaration();

        info!(
            trace_id = %session.trace_id,
            define = %declaration.define(),
            steps = declaration.step_count(),
            edits = summary.total,
            applied = summary.applied,
            rejected = summary.rejected,
            undone = summary.undone,
            redone = summary.redone,
            rolled_back = summary.rolled_back,
            snapshots = session.list_snapshots().len(),
            "Editing session summary"
        );

        for diagnostic in declaration.diagnostics() {
            warn!(trace_id = %session.trace_id, "Declaration issue: {}", diagnostic);
        }
    }

    /// Logs every recorded edit
    pub fn log_edit_details(&self, session: &EditSession) {
        for edit in &session.edit_logs {
            let age_ms = edit.timestamp.elapsed().as_millis();
            match edit.status {
                EditStatus::Rejected => {
                    error!(
                        trace_id = %edit.trace_id,
                        edit = %edit.label,
                        age_ms,
                        error = %edit.error_message.as_deref().unwrap_or("Unknown error"),
                        "Edit rejected"
                    );
                }
                EditStatus::RolledBack => {
                    warn!(trace_id = %edit.trace_id, edit = %edit.label, age_ms, "Rolled back");
                }
                status => {
                    info!(
                        trace_id = %edit.trace_id,
                        edit = %edit.label,
                        age_ms,
                        status = ?status,
                        "Edit recorded"
                    );
                }
            }
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

/// Edit counts by status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub total: usize,
    pub applied: usize,
    pub rejected: usize,
    pub undone: usize,
    pub redone: usize,
    pub rolled_back: usize,
}

impl SessionSummary {
    pub fn of(session: &EditSession) -> Self {
        session
            .edit_logs
            .iter()
            .fold(Self::default(), |mut summary, edit| {
                summary.total += 1;
                match edit.status {
                    EditStatus::Applied => summary.applied += 1,
                    EditStatus::Rejected => summary.rejected += 1,
                    EditStatus::Undone => summary.undone += 1,
                    EditStatus::Redone => summary.redone += 1,
                    EditStatus::RolledBack => summary.rolled_back += 1,
                }
                summary
            })
    }
}
