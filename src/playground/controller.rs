//! Run controller
//!
//! # Ordering
//!
//! `start()` and `stop()` interleave freely because the agent call is unbounded.
//! Every race is settled by the interrupted flag: `stop()` sets it before its
//! first await, and a run reads it after the agent call returns, again after
//! teardown, and finally under the same lock it publishes with. A run found
//! interrupted at any of those points publishes nothing.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::agent::{AgentProvider, AssertOptions, PlaygroundAgent, ProgressCallback};
use super::errors::{PlaygroundError, format_error_message};
use super::interruption::{InterruptionTable, RunToken, TokenMint};
use super::speech::{SpeechSink, TracingSpeechSink};
use super::{PlaygroundState, RunOutcome, RunResult, TaskType};
use crate::Config;

const DEFAULT_INTERRUPTION_CAPACITY: usize = 256;
const DEFAULT_INTERRUPTION_TTL: Duration = Duration::from_secs(600);

/// Quick query that unlocks page navigation when it settles
pub const SUMMARIZE_PAGE_PROMPT: &str = "总结这个网页";
pub const READ_ALOUD_PROMPT: &str = "朗读这个网页内容";
pub const COPY_DOC_LINK_PROMPT: &str = "复制这篇文档的链接";

/// Published in place of the agent's answer when a quick action succeeds
pub const ACTION_SUCCESS_MESSAGE: &str = "操作已成功执行";

/// How one run invokes the agent and presents its result
#[derive(Debug, Clone, Copy)]
struct RunPlan {
    task_type: TaskType,
    announce: bool,
    reveal_navigation: bool,
    success_text: Option<&'static str>,
}

impl RunPlan {
    fn task(task_type: TaskType) -> Self {
        Self {
            task_type,
            announce: task_type == TaskType::Query,
            reveal_navigation: false,
            success_text: None,
        }
    }
}

struct ActiveRun {
    token: RunToken,
    agent: Arc<dyn PlaygroundAgent>,
}

struct RunState {
    mint: TokenMint,
    latest: Option<RunToken>,
    active: Option<ActiveRun>,
    interruptions: InterruptionTable,
}

impl RunState {
    /// Whether `token` may still write published state
    fn is_authoritative(&self, token: RunToken) -> bool {
        self.latest == Some(token) && !self.interruptions.is_interrupted(token)
    }
}

pub struct RunController {
    provider: Arc<dyn AgentProvider>,
    speech: Option<Arc<dyn SpeechSink>>,
    force_same_tab_navigation: bool,
    state: Arc<Mutex<RunState>>,
    published: Arc<watch::Sender<PlaygroundState>>,
}

impl RunController {
    pub fn new(provider: Arc<dyn AgentProvider>) -> Self {
        let (published, _) = watch::channel(PlaygroundState::default());
        Self {
            provider,
            speech: None,
            force_same_tab_navigation: false,
            state: Arc::new(Mutex::new(RunState {
                mint: TokenMint::default(),
                latest: None,
                active: None,
                interruptions: InterruptionTable::new(
                    DEFAULT_INTERRUPTION_CAPACITY,
                    DEFAULT_INTERRUPTION_TTL,
                ),
            })),
            published: Arc::new(published),
        }
    }

    pub fn from_config(provider: Arc<dyn AgentProvider>, config: &Config) -> Self {
        Self::new(provider)
            .with_speech(Arc::new(TracingSpeechSink::new(config.speech_rate)))
            .with_force_same_tab_navigation(config.force_same_tab_navigation)
            .with_interruption_limits(
                config.interruption.capacity,
                Duration::from_secs(config.interruption.ttl_secs),
            )
    }

    pub fn with_speech(mut self, speech: Arc<dyn SpeechSink>) -> Self {
        self.speech = Some(speech);
        self
    }

    pub fn with_force_same_tab_navigation(mut self, force: bool) -> Self {
        self.force_same_tab_navigation = force;
        self
    }

    pub fn with_interruption_limits(self, capacity: usize, ttl: Duration) -> Self {
        self.state.lock().interruptions = InterruptionTable::new(capacity, ttl);
        self
    }

    /// Receiver for published UI state
    pub fn subscribe(&self) -> watch::Receiver<PlaygroundState> {
        self.published.subscribe()
    }

    pub fn state(&self) -> PlaygroundState {
        self.published.borrow().clone()
    }

    /// Whether a run is current and can be stopped
    pub fn is_running(&self) -> bool {
        self.state.lock().active.is_some()
    }

    pub fn current_token(&self) -> Option<RunToken> {
        self.state.lock().active.as_ref().map(|run| run.token)
    }

    /// Run `prompt` against a fresh agent
    ///
    /// Fails only on an empty prompt or when no agent is available, both before
    /// any side effect. Agent failures land in `RunResult::error`.
    pub async fn start(
        &self,
        prompt: &str,
        task_type: TaskType,
    ) -> Result<RunOutcome, PlaygroundError> {
        self.execute(prompt, RunPlan::task(task_type)).await
    }

    /// One-click query; the result is not announced
    ///
    /// [`SUMMARIZE_PAGE_PROMPT`] hides page navigation while it runs and offers
    /// it again once its result is published.
    pub async fn quick_query(&self, prompt: &str) -> Result<RunOutcome, PlaygroundError> {
        let reveal_navigation = prompt == SUMMARIZE_PAGE_PROMPT;
        self.execute(
            prompt,
            RunPlan {
                task_type: TaskType::Query,
                announce: false,
                reveal_navigation,
                success_text: None,
            },
        )
        .await
    }

    /// One-click action; success publishes [`ACTION_SUCCESS_MESSAGE`]
    pub async fn quick_action(&self, prompt: &str) -> Result<RunOutcome, PlaygroundError> {
        self.execute(
            prompt,
            RunPlan {
                task_type: TaskType::Action,
                announce: false,
                reveal_navigation: false,
                success_text: Some(ACTION_SUCCESS_MESSAGE),
            },
        )
        .await
    }

    /// Withdraw page navigation, e.g. after the active tab changed
    pub fn hide_navigation(&self) {
        self.published
            .send_if_modified(|state| std::mem::replace(&mut state.show_navigation, false));
    }

    /// Fetch the agent's view of the page once and publish it
    ///
    /// Returns the cached preview when one is already published. Failures are
    /// logged and yield `None`.
    pub async fn load_ui_context(&self) -> Option<serde_json::Value> {
        let cached = self.published.borrow().ui_context_preview.clone();
        if cached.is_some() {
            return cached;
        }

        let Some(agent) = self.provider.get_agent(self.force_same_tab_navigation) else {
            warn!("No agent available for UI context preview");
            return None;
        };
        match agent.ui_context().await {
            Ok(context) => {
                self.published
                    .send_modify(|state| state.ui_context_preview = Some(context.clone()));
                Some(context)
            }
            Err(e) => {
                warn!("Failed to get UI context: {}", e);
                None
            }
        }
    }

    pub fn clear_ui_context(&self) {
        self.published
            .send_if_modified(|state| state.ui_context_preview.take().is_some());
    }

    async fn execute(&self, prompt: &str, plan: RunPlan) -> Result<RunOutcome, PlaygroundError> {
        if prompt.trim().is_empty() {
            return Err(PlaygroundError::Validation("Prompt is required".into()));
        }

        let agent = self
            .provider
            .get_agent(self.force_same_tab_navigation)
            .ok_or(PlaygroundError::NoAgent)?;

        let token = {
            let mut state = self.state.lock();
            let token = state.mint.mint();
            state.interruptions.begin(token);
            state.latest = Some(token);
            state.active = Some(ActiveRun {
                token,
                agent: agent.clone(),
            });
            self.published.send_modify(|published| {
                published.begin(token);
                if plan.reveal_navigation {
                    published.show_navigation = false;
                }
            });
            token
        };
        info!(%token, task_type = %plan.task_type, "run started");

        agent.reset_dump();
        let on_progress = self.progress_callback(token);

        let invocation = match plan.task_type {
            TaskType::Action => agent.ai_action(prompt, on_progress).await,
            TaskType::Query => agent.ai_query(prompt, on_progress).await,
            TaskType::Assert => {
                let options = AssertOptions {
                    keep_raw_response: true,
                };
                agent.ai_assert(prompt, None, options, on_progress).await
            }
        };

        let mut result = RunResult {
            dump: agent.dump(),
            report_html: agent.report_html(),
            ..RunResult::default()
        };
        match invocation {
            Ok(value) => {
                result.result = Some(match plan.success_text {
                    Some(text) => serde_json::Value::from(text),
                    None => value,
                });
            }
            Err(e) => {
                error!(%token, "agent invocation failed: {}", e);
                result.error = Some(format_error_message(&e));
            }
        }

        // stop() already tore the agent down
        {
            let mut state = self.state.lock();
            if state.interruptions.is_interrupted(token) {
                state.interruptions.settle(token);
                info!(%token, "run interrupted, discarding result");
                return Ok(RunOutcome::Cancelled { token });
            }
        }

        if let Err(e) = agent.destroy_page().await {
            warn!(%token, "failed to release agent page: {}", e);
        }

        let published = {
            let mut state = self.state.lock();
            let interrupted = state.interruptions.is_interrupted(token);
            state.interruptions.settle(token);
            if interrupted {
                info!(%token, "run interrupted during teardown, discarding result");
                return Ok(RunOutcome::Cancelled { token });
            }
            if state.active.as_ref().is_some_and(|run| run.token == token) {
                state.active = None;
            }
            if state.is_authoritative(token) {
                self.published.send_modify(|published| {
                    published.finish(token, result.clone());
                    if plan.reveal_navigation {
                        published.show_navigation = true;
                    }
                });
                true
            } else {
                debug!(%token, "superseded by a newer run, result not published");
                false
            }
        };

        if published
            && plan.announce
            && let (Some(speech), Some(value)) = (&self.speech, &result.result)
        {
            speech.speak(&value.to_string());
        }

        info!(%token, error = result.is_error(), "run settled");
        Ok(RunOutcome::Completed(result))
    }

    /// Interrupt the current run
    ///
    /// No-op without a current run. The run is flagged and detached before the
    /// agent is destroyed, so a second `stop()` finds nothing to destroy.
    pub async fn stop(&self) {
        let active = {
            let mut state = self.state.lock();
            let Some(active) = state.active.take() else {
                debug!("stop requested with no current run");
                return;
            };
            state.interruptions.interrupt(active.token);
            self.published.send_modify(PlaygroundState::reset);
            active
        };

        info!(token = %active.token, "stopping run");
        if let Err(e) = active.agent.destroy().await {
            warn!(token = %active.token, "failed to destroy agent: {}", e);
        }
    }

    fn progress_callback(&self, token: RunToken) -> ProgressCallback {
        let state = self.state.clone();
        let published = self.published.clone();
        Arc::new(move |tip: &str| {
            let state = state.lock();
            if !state.is_authoritative(token) {
                return;
            }
            published.send_modify(|current| current.progress_text = Some(tip.to_string()));
        })
    }
}
