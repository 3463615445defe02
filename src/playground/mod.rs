//! Run/cancel orchestration around the external agent
//!
//! A run is one agent invocation for one prompt. [`RunController`] mints a token
//! per run, lets `stop()` interrupt it, and publishes results only for runs that
//! are still authoritative when they settle.

mod agent;
mod controller;
mod errors;
mod interruption;
mod speech;

pub use agent::{AgentProvider, AssertOptions, PlaygroundAgent, ProgressCallback};
pub use controller::{
    ACTION_SUCCESS_MESSAGE, COPY_DOC_LINK_PROMPT, READ_ALOUD_PROMPT, RunController,
    SUMMARIZE_PAGE_PROMPT,
};
pub use errors::{
    AgentError, AgentResult, CONFLICTING_EXTENSION_MESSAGE, ERROR_CODE_NOT_IMPLEMENTED_AS_DESIGNED,
    PlaygroundError, UNKNOWN_ERROR_MESSAGE, format_error_message,
};
pub use interruption::{InterruptionTable, RunToken, TokenMint};
pub use speech::{SpeechSink, TracingSpeechSink};

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which agent entry point a run invokes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskType {
    #[serde(rename = "aiAction", alias = "action")]
    Action,
    #[serde(rename = "aiQuery", alias = "query")]
    Query,
    #[serde(rename = "aiAssert", alias = "assert")]
    Assert,
}

impl TaskType {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::Action => "aiAction",
            TaskType::Query => "aiQuery",
            TaskType::Assert => "aiAssert",
        }
    }
}

impl FromStr for TaskType {
    type Err = PlaygroundError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aiAction" | "action" => Ok(TaskType::Action),
            "aiQuery" | "query" => Ok(TaskType::Query),
            "aiAssert" | "assert" => Ok(TaskType::Assert),
            other => Err(PlaygroundError::Validation(format!(
                "unknown task type '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settled outcome of one run
///
/// `dump` and `report_html` come from the agent and are passed through as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub dump: Option<serde_json::Value>,
    #[serde(rename = "reportHTML")]
    pub report_html: Option<String>,
}

impl RunResult {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// What `RunController::start` resolves to
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(RunResult),
    /// `stop()` interrupted the run; nothing was published
    Cancelled { token: RunToken },
}

impl RunOutcome {
    pub fn result(&self) -> Option<&RunResult> {
        match self {
            RunOutcome::Completed(result) => Some(result),
            RunOutcome::Cancelled { .. } => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunOutcome::Cancelled { .. })
    }
}

/// UI-facing state published by the controller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaygroundState {
    /// A run is in flight and can be stopped
    pub loading: bool,
    /// Latest progress tip of the running run
    pub progress_text: Option<String>,
    /// Result of the last authoritative run
    pub result: Option<RunResult>,
    /// Token of the run this state belongs to
    pub token: Option<RunToken>,
    /// Page-up/page-down controls are offered once a page summary finished
    pub show_navigation: bool,
    /// Snapshot of the page as the agent sees it, fetched once on demand
    pub ui_context_preview: Option<serde_json::Value>,
}

impl PlaygroundState {
    // The transitions below leave show_navigation and ui_context_preview alone;
    // those follow the page, not the run.

    fn begin(&mut self, token: RunToken) {
        self.loading = true;
        self.progress_text = None;
        self.result = None;
        self.token = Some(token);
    }

    fn finish(&mut self, token: RunToken, result: RunResult) {
        self.loading = false;
        self.progress_text = None;
        self.result = Some(result);
        self.token = Some(token);
    }

    fn reset(&mut self) {
        self.loading = false;
        self.progress_text = None;
        self.result = None;
        self.token = None;
    }
}
