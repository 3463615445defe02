//! Integration tests for `RunController`.
//!
//! Every test runs on a paused tokio clock, so the 10ms / 50ms interleavings
//! below happen in a fixed order regardless of machine speed.

use async_trait::async_trait;
use browser_playground::playground::{
    ACTION_SUCCESS_MESSAGE, AgentError, AgentProvider, AgentResult, AssertOptions,
    CONFLICTING_EXTENSION_MESSAGE, COPY_DOC_LINK_PROMPT, PlaygroundAgent, PlaygroundError,
    ProgressCallback, READ_ALOUD_PROMPT, RunController, RunOutcome, SUMMARIZE_PAGE_PROMPT,
    SpeechSink, TaskType,
};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Mocks
// ---------------------------------------------------------------------------

struct MockAgent {
    delay: Duration,
    response: AgentResult<Value>,
    tips: Vec<&'static str>,
    fail_page_destroy: bool,
    page_destroy_delay: Duration,
    ui_context: Option<Value>,
    ui_context_calls: AtomicUsize,
    invocations: AtomicUsize,
    destroy_calls: AtomicUsize,
    page_destroy_calls: AtomicUsize,
    reset_calls: AtomicUsize,
    assert_options: Mutex<Option<AssertOptions>>,
}

impl MockAgent {
    fn new(delay_ms: u64, response: AgentResult<Value>) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            response,
            tips: Vec::new(),
            fail_page_destroy: false,
            page_destroy_delay: Duration::ZERO,
            ui_context: None,
            ui_context_calls: AtomicUsize::new(0),
            invocations: AtomicUsize::new(0),
            destroy_calls: AtomicUsize::new(0),
            page_destroy_calls: AtomicUsize::new(0),
            reset_calls: AtomicUsize::new(0),
            assert_options: Mutex::new(None),
        }
    }

    fn ok(delay_ms: u64, value: Value) -> Arc<Self> {
        Arc::new(Self::new(delay_ms, Ok(value)))
    }

    fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    fn destroys(&self) -> usize {
        self.destroy_calls.load(Ordering::SeqCst)
    }

    fn page_destroys(&self) -> usize {
        self.page_destroy_calls.load(Ordering::SeqCst)
    }

    /// Emits the first tip immediately, the rest after the delay
    async fn invoke(&self, on_progress: ProgressCallback) -> AgentResult<Value> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        let mut tips = self.tips.iter();
        if let Some(tip) = tips.next() {
            on_progress(tip);
        }
        tokio::time::sleep(self.delay).await;
        for tip in tips {
            on_progress(tip);
        }
        self.response.clone()
    }
}

#[async_trait]
impl PlaygroundAgent for MockAgent {
    async fn ai_action(&self, _prompt: &str, on_progress: ProgressCallback) -> AgentResult<Value> {
        self.invoke(on_progress).await
    }

    async fn ai_query(&self, _prompt: &str, on_progress: ProgressCallback) -> AgentResult<Value> {
        self.invoke(on_progress).await
    }

    async fn ai_assert(
        &self,
        _prompt: &str,
        _context: Option<&str>,
        options: AssertOptions,
        on_progress: ProgressCallback,
    ) -> AgentResult<Value> {
        *self.assert_options.lock() = Some(options);
        self.invoke(on_progress).await
    }

    fn reset_dump(&self) {
        self.reset_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn dump(&self) -> Option<Value> {
        Some(json!({ "executions": self.invocations() }))
    }

    async fn ui_context(&self) -> AgentResult<Value> {
        self.ui_context_calls.fetch_add(1, Ordering::SeqCst);
        self.ui_context
            .clone()
            .ok_or_else(|| AgentError::message("screenshot failed"))
    }

    async fn destroy(&self) -> AgentResult<()> {
        self.destroy_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn destroy_page(&self) -> AgentResult<()> {
        self.page_destroy_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.page_destroy_delay).await;
        if self.fail_page_destroy {
            Err(AgentError::message("page already detached"))
        } else {
            Ok(())
        }
    }
}

/// Hands out queued agents in order
#[derive(Default)]
struct QueueProvider {
    agents: Mutex<VecDeque<Arc<MockAgent>>>,
    requests: AtomicUsize,
    last_force_same_tab: AtomicBool,
}

impl QueueProvider {
    fn with(agents: &[Arc<MockAgent>]) -> Arc<Self> {
        Arc::new(Self {
            agents: Mutex::new(agents.iter().cloned().collect()),
            ..Default::default()
        })
    }
}

impl AgentProvider for QueueProvider {
    fn get_agent(&self, force_same_tab_navigation: bool) -> Option<Arc<dyn PlaygroundAgent>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.last_force_same_tab
            .store(force_same_tab_navigation, Ordering::SeqCst);
        self.agents
            .lock()
            .pop_front()
            .map(|agent| agent as Arc<dyn PlaygroundAgent>)
    }
}

#[derive(Default)]
struct RecordingSpeech {
    spoken: Mutex<Vec<String>>,
}

impl SpeechSink for RecordingSpeech {
    fn speak(&self, text: &str) {
        self.spoken.lock().push(text.to_string());
    }
}

fn controller(provider: Arc<QueueProvider>) -> Arc<RunController> {
    Arc::new(RunController::new(provider))
}

fn spawn_start(
    controller: &Arc<RunController>,
    prompt: &'static str,
    task_type: TaskType,
) -> tokio::task::JoinHandle<Result<RunOutcome, PlaygroundError>> {
    let controller = controller.clone();
    tokio::spawn(async move { controller.start(prompt, task_type).await })
}

async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

// ---------------------------------------------------------------------------
// Completion
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn query_completes_and_releases_page_once() {
    let agent = MockAgent::ok(50, json!("ok"));
    let controller = controller(QueueProvider::with(&[agent.clone()]));

    let outcome = controller
        .start("summarize this page", TaskType::Query)
        .await
        .unwrap();

    let result = outcome.result().expect("run should complete").clone();
    assert_eq!(result.result, Some(json!("ok")));
    assert_eq!(result.error, None);
    assert_eq!(agent.page_destroys(), 1);
    assert_eq!(agent.destroys(), 0);

    let state = controller.state();
    assert!(!state.loading);
    assert_eq!(state.result, Some(result));
    assert!(!controller.is_running());
}

#[tokio::test(start_paused = true)]
async fn run_is_loading_until_it_settles() {
    let agent = MockAgent::ok(50, json!(true));
    let controller = controller(QueueProvider::with(&[agent]));

    let run = spawn_start(&controller, "click login", TaskType::Action);
    sleep_ms(10).await;

    let state = controller.state();
    assert!(state.loading);
    assert_eq!(state.result, None);
    assert!(controller.is_running());
    assert_eq!(controller.current_token(), state.token);

    run.await.unwrap().unwrap();
    assert!(!controller.state().loading);
    assert!(!controller.is_running());
}

#[tokio::test(start_paused = true)]
async fn dump_is_reset_then_passed_through() {
    let agent = MockAgent::ok(5, json!("done"));
    let controller = controller(QueueProvider::with(&[agent.clone()]));

    let outcome = controller.start("do it", TaskType::Action).await.unwrap();

    assert_eq!(agent.reset_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        outcome.result().unwrap().dump,
        Some(json!({ "executions": 1 }))
    );
}

#[tokio::test(start_paused = true)]
async fn assert_requests_raw_response() {
    let agent = MockAgent::ok(5, json!({ "pass": true }));
    let controller = controller(QueueProvider::with(&[agent.clone()]));

    controller
        .start("the cart is empty", TaskType::Assert)
        .await
        .unwrap();

    assert_eq!(
        *agent.assert_options.lock(),
        Some(AssertOptions {
            keep_raw_response: true
        })
    );
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn empty_prompt_is_rejected_before_any_agent_call() {
    let agent = MockAgent::ok(5, json!("ok"));
    let provider = QueueProvider::with(&[agent.clone()]);
    let controller = controller(provider.clone());

    for prompt in ["", "   "] {
        let err = controller.start(prompt, TaskType::Query).await.unwrap_err();
        assert!(matches!(err, PlaygroundError::Validation(_)));
    }

    assert_eq!(agent.invocations(), 0);
    assert_eq!(provider.requests.load(Ordering::SeqCst), 0);
    assert_eq!(controller.state().token, None);
}

#[tokio::test(start_paused = true)]
async fn missing_agent_is_reported() {
    let provider = QueueProvider::with(&[]);
    let controller = controller(provider);

    let err = controller.start("anything", TaskType::Action).await.unwrap_err();
    assert_eq!(err, PlaygroundError::NoAgent);
    assert!(!controller.state().loading);
}

#[tokio::test(start_paused = true)]
async fn closure_provider_receives_same_tab_flag() {
    let agent = MockAgent::ok(5, json!("ok"));
    let seen = Arc::new(AtomicBool::new(false));
    let provider = {
        let seen = seen.clone();
        let agent = agent.clone();
        move |force: bool| {
            seen.store(force, Ordering::SeqCst);
            Some(agent.clone() as Arc<dyn PlaygroundAgent>)
        }
    };
    let controller =
        RunController::new(Arc::new(provider)).with_force_same_tab_navigation(true);

    controller.start("go", TaskType::Action).await.unwrap();
    assert!(seen.load(Ordering::SeqCst));
}

// ---------------------------------------------------------------------------
// Agent failures
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn agent_error_is_formatted_into_result() {
    let agent = Arc::new(MockAgent::new(
        20,
        Err(AgentError::message(
            "Cannot attach: debugger of different extension is attached",
        )),
    ));
    let controller = controller(QueueProvider::with(&[agent.clone()]));

    let outcome = controller.start("read it", TaskType::Query).await.unwrap();
    let result = outcome.result().unwrap();

    assert_eq!(result.result, None);
    assert_eq!(result.error.as_deref(), Some(CONFLICTING_EXTENSION_MESSAGE));
    assert_eq!(agent.page_destroys(), 1);
    assert_eq!(controller.state().result.as_ref(), Some(result));
}

#[tokio::test(start_paused = true)]
async fn teardown_failure_does_not_affect_result() {
    let mut agent = MockAgent::new(20, Ok(json!("fine")));
    agent.fail_page_destroy = true;
    let agent = Arc::new(agent);
    let controller = controller(QueueProvider::with(&[agent.clone()]));

    let outcome = controller.start("go", TaskType::Action).await.unwrap();

    assert_eq!(outcome.result().unwrap().result, Some(json!("fine")));
    assert_eq!(outcome.result().unwrap().error, None);
    assert_eq!(agent.page_destroys(), 1);
    assert!(controller.state().result.is_some());
}

// ---------------------------------------------------------------------------
// Stop
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn stop_without_run_is_noop() {
    let controller = controller(QueueProvider::with(&[]));
    controller.stop().await;
    controller.stop().await;
    assert!(!controller.state().loading);
}

#[tokio::test(start_paused = true)]
async fn stop_mid_run_suppresses_result_and_destroys_once() {
    let agent = MockAgent::ok(50, json!({ "result": "ok" }));
    let controller = controller(QueueProvider::with(&[agent.clone()]));
    let mut published = controller.subscribe();

    let run = spawn_start(&controller, "summarize this page", TaskType::Query);
    sleep_ms(10).await;
    controller.stop().await;

    let outcome = run.await.unwrap().unwrap();
    assert!(outcome.is_cancelled());
    assert_eq!(agent.destroys(), 1);
    assert_eq!(agent.page_destroys(), 0);

    let state = published.borrow_and_update().clone();
    assert!(!state.loading);
    assert_eq!(state.result, None);
}

#[tokio::test(start_paused = true)]
async fn double_stop_destroys_once() {
    let agent = MockAgent::ok(50, json!("ok"));
    let controller = controller(QueueProvider::with(&[agent.clone()]));

    let run = spawn_start(&controller, "go", TaskType::Action);
    sleep_ms(10).await;
    controller.stop().await;
    controller.stop().await;

    assert!(run.await.unwrap().unwrap().is_cancelled());
    assert_eq!(agent.destroys(), 1);
}

#[tokio::test(start_paused = true)]
async fn concurrent_stops_destroy_once() {
    let agent = MockAgent::ok(50, json!("ok"));
    let controller = controller(QueueProvider::with(&[agent.clone()]));

    let run = spawn_start(&controller, "go", TaskType::Action);
    sleep_ms(10).await;
    tokio::join!(controller.stop(), controller.stop());

    assert!(run.await.unwrap().unwrap().is_cancelled());
    assert_eq!(agent.destroys(), 1);
}

#[tokio::test(start_paused = true)]
async fn progress_tips_stop_after_interruption() {
    let mut agent = MockAgent::new(50, Ok(json!("ok")));
    agent.tips = vec!["locating search box", "typing query"];
    let agent = Arc::new(agent);
    let controller = controller(QueueProvider::with(&[agent]));

    let run = spawn_start(&controller, "search rust", TaskType::Action);
    sleep_ms(10).await;
    assert_eq!(
        controller.state().progress_text.as_deref(),
        Some("locating search box")
    );

    controller.stop().await;
    run.await.unwrap().unwrap();

    // the late "typing query" tip was dropped
    assert_eq!(controller.state().progress_text, None);
}

#[tokio::test(start_paused = true)]
async fn stop_during_page_release_discards_result() {
    let mut agent = MockAgent::new(20, Ok(json!("ok")));
    agent.page_destroy_delay = Duration::from_millis(50);
    let agent = Arc::new(agent);
    let controller = controller(QueueProvider::with(&[agent.clone()]));

    let run = spawn_start(&controller, "summarize", TaskType::Query);
    // agent returned at t=20, page release pending until t=70
    sleep_ms(40).await;
    assert_eq!(agent.page_destroys(), 1);
    controller.stop().await;

    let outcome = run.await.unwrap().unwrap();
    assert!(outcome.is_cancelled());
    assert_eq!(agent.destroys(), 1);
    assert_eq!(agent.page_destroys(), 1);

    let state = controller.state();
    assert!(!state.loading);
    assert_eq!(state.result, None);
    assert!(!controller.is_running());
}

// ---------------------------------------------------------------------------
// Overlapping runs
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn stopped_run_never_overwrites_newer_result() {
    let first = MockAgent::ok(100, json!("first"));
    let second = MockAgent::ok(30, json!("second"));
    let controller = controller(QueueProvider::with(&[first.clone(), second.clone()]));

    let first_run = spawn_start(&controller, "one", TaskType::Query);
    sleep_ms(10).await;
    controller.stop().await;

    let second_outcome = controller.start("two", TaskType::Query).await.unwrap();
    assert_eq!(second_outcome.result().unwrap().result, Some(json!("second")));

    let first_outcome = first_run.await.unwrap().unwrap();
    assert!(first_outcome.is_cancelled());

    let state = controller.state();
    assert_eq!(state.result.unwrap().result, Some(json!("second")));
    assert_eq!(first.page_destroys(), 0);
    assert_eq!(first.destroys(), 1);
    assert_eq!(second.page_destroys(), 1);
}

#[tokio::test(start_paused = true)]
async fn superseded_run_completes_without_publishing() {
    let first = MockAgent::ok(100, json!("first"));
    let second = MockAgent::ok(30, json!("second"));
    let controller = controller(QueueProvider::with(&[first.clone(), second]));

    let first_run = spawn_start(&controller, "one", TaskType::Action);
    sleep_ms(10).await;
    let second_outcome = controller.start("two", TaskType::Action).await.unwrap();
    let first_outcome = first_run.await.unwrap().unwrap();

    // the caller still gets its result, the UI keeps the newer one
    assert_eq!(first_outcome.result().unwrap().result, Some(json!("first")));
    assert_eq!(
        controller.state().result.as_ref(),
        second_outcome.result()
    );
    assert_eq!(first.page_destroys(), 1);
}

#[tokio::test(start_paused = true)]
async fn superseded_run_survives_interruption_table_capacity() {
    let first = MockAgent::ok(100, json!("first"));
    let second = MockAgent::ok(30, json!("second"));
    let third = MockAgent::ok(5, json!("third"));
    let controller = Arc::new(
        RunController::new(QueueProvider::with(&[first.clone(), second, third]))
            .with_interruption_limits(1, Duration::from_secs(600)),
    );

    let first_run = spawn_start(&controller, "one", TaskType::Action);
    sleep_ms(10).await;
    controller.start("two", TaskType::Action).await.unwrap();
    controller.start("three", TaskType::Action).await.unwrap();

    let first_outcome = first_run.await.unwrap().unwrap();
    assert_eq!(first_outcome.result().unwrap().result, Some(json!("first")));
    assert_eq!(first.page_destroys(), 1);
    assert_eq!(first.destroys(), 0);
    assert_eq!(
        controller.state().result.unwrap().result,
        Some(json!("third"))
    );
}

#[tokio::test(start_paused = true)]
async fn superseded_run_outliving_ttl_still_releases_page() {
    let first = MockAgent::ok(700_000, json!("slow"));
    let second = MockAgent::ok(1_000, json!("fast"));
    let controller = Arc::new(
        RunController::new(QueueProvider::with(&[first.clone(), second]))
            .with_interruption_limits(256, Duration::from_secs(600)),
    );

    let first_run = spawn_start(&controller, "one", TaskType::Query);
    sleep_ms(601_000).await;
    controller.start("two", TaskType::Query).await.unwrap();

    let first_outcome = first_run.await.unwrap().unwrap();
    assert!(!first_outcome.is_cancelled());
    assert_eq!(first.page_destroys(), 1);
    assert_eq!(
        controller.state().result.unwrap().result,
        Some(json!("fast"))
    );
}

#[tokio::test(start_paused = true)]
async fn tokens_increase_across_runs() {
    let controller = controller(QueueProvider::with(&[
        MockAgent::ok(1, json!(1)),
        MockAgent::ok(1, json!(2)),
    ]));

    controller.start("a", TaskType::Query).await.unwrap();
    let first = controller.state().token.unwrap();
    controller.start("b", TaskType::Query).await.unwrap();
    let second = controller.state().token.unwrap();

    assert!(first < second);
}

// ---------------------------------------------------------------------------
// Speech
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn query_results_are_announced() {
    let speech = Arc::new(RecordingSpeech::default());
    let controller = RunController::new(QueueProvider::with(&[
        MockAgent::ok(5, json!("The page lists three products.")),
        MockAgent::ok(5, json!({ "clicked": true })),
        MockAgent::ok(5, json!({ "title": "Docs" })),
    ]))
    .with_speech(speech.clone());

    controller.start("summarize", TaskType::Query).await.unwrap();
    controller.start("click buy", TaskType::Action).await.unwrap();
    controller.start("title?", TaskType::Query).await.unwrap();

    assert_eq!(
        *speech.spoken.lock(),
        vec![
            r#""The page lists three products.""#.to_string(),
            r#"{"title":"Docs"}"#.to_string()
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn cancelled_query_is_not_announced() {
    let speech = Arc::new(RecordingSpeech::default());
    let controller = Arc::new(
        RunController::new(QueueProvider::with(&[MockAgent::ok(50, json!("late"))]))
            .with_speech(speech.clone()),
    );

    let run = spawn_start(&controller, "summarize", TaskType::Query);
    sleep_ms(10).await;
    controller.stop().await;
    run.await.unwrap().unwrap();

    assert!(speech.spoken.lock().is_empty());
}

// ---------------------------------------------------------------------------
// Quick runs
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn page_summary_reveals_navigation_when_published() {
    let speech = Arc::new(RecordingSpeech::default());
    let agent = MockAgent::ok(50, json!("A short article about tides."));
    let controller = Arc::new(
        RunController::new(QueueProvider::with(&[agent.clone()])).with_speech(speech.clone()),
    );

    let run = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.quick_query(SUMMARIZE_PAGE_PROMPT).await })
    };
    sleep_ms(10).await;
    assert!(controller.state().loading);
    assert!(!controller.state().show_navigation);

    let outcome = run.await.unwrap().unwrap();
    assert_eq!(
        outcome.result().unwrap().result,
        Some(json!("A short article about tides."))
    );

    let state = controller.state();
    assert!(state.show_navigation);
    assert!(!state.loading);
    assert_eq!(agent.page_destroys(), 1);
    assert!(speech.spoken.lock().is_empty());

    controller.hide_navigation();
    assert!(!controller.state().show_navigation);
}

#[tokio::test(start_paused = true)]
async fn other_quick_queries_leave_navigation_alone() {
    let controller = controller(QueueProvider::with(&[
        MockAgent::ok(5, json!("summary")),
        MockAgent::ok(5, json!("read aloud")),
    ]));

    controller.quick_query(SUMMARIZE_PAGE_PROMPT).await.unwrap();
    controller.quick_query(READ_ALOUD_PROMPT).await.unwrap();

    let state = controller.state();
    assert!(state.show_navigation);
    assert_eq!(state.result.unwrap().result, Some(json!("read aloud")));
}

#[tokio::test(start_paused = true)]
async fn stopped_page_summary_keeps_navigation_hidden() {
    let controller = controller(QueueProvider::with(&[MockAgent::ok(50, json!("late"))]));

    let run = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.quick_query(SUMMARIZE_PAGE_PROMPT).await })
    };
    sleep_ms(10).await;
    controller.stop().await;

    assert!(run.await.unwrap().unwrap().is_cancelled());
    assert!(!controller.state().show_navigation);
}

#[tokio::test(start_paused = true)]
async fn quick_action_publishes_fixed_success_text() {
    let agent = MockAgent::ok(20, json!({ "copied": "https://example.com/doc" }));
    let controller = controller(QueueProvider::with(&[agent.clone()]));

    let outcome = controller.quick_action(COPY_DOC_LINK_PROMPT).await.unwrap();

    assert_eq!(
        outcome.result().unwrap().result,
        Some(json!(ACTION_SUCCESS_MESSAGE))
    );
    assert_eq!(agent.page_destroys(), 1);
    assert_eq!(
        controller.state().result.unwrap().result,
        Some(json!(ACTION_SUCCESS_MESSAGE))
    );
}

#[tokio::test(start_paused = true)]
async fn failed_quick_action_reports_the_error() {
    let agent = Arc::new(MockAgent::new(
        20,
        Err(AgentError::message("element not found: share button")),
    ));
    let controller = controller(QueueProvider::with(&[agent]));

    let outcome = controller.quick_action(COPY_DOC_LINK_PROMPT).await.unwrap();
    let result = outcome.result().unwrap();

    assert_eq!(result.result, None);
    assert_eq!(
        result.error.as_deref(),
        Some("element not found: share button")
    );
}

// ---------------------------------------------------------------------------
// UI context preview
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn ui_context_is_fetched_once_and_published() {
    let mut agent = MockAgent::new(0, Ok(json!(null)));
    agent.ui_context = Some(json!({ "size": { "width": 1280, "height": 720 } }));
    let agent = Arc::new(agent);
    let provider = QueueProvider::with(&[agent.clone()]);
    let controller = controller(provider.clone());

    let first = controller.load_ui_context().await;
    let second = controller.load_ui_context().await;

    assert_eq!(first, agent.ui_context);
    assert_eq!(second, agent.ui_context);
    assert_eq!(agent.ui_context_calls.load(Ordering::SeqCst), 1);
    assert_eq!(provider.requests.load(Ordering::SeqCst), 1);
    assert_eq!(controller.state().ui_context_preview, agent.ui_context);

    controller.clear_ui_context();
    assert_eq!(controller.state().ui_context_preview, None);
}

#[tokio::test(start_paused = true)]
async fn ui_context_failure_yields_none() {
    let agent = MockAgent::ok(0, json!(null));
    let controller = controller(QueueProvider::with(&[agent.clone()]));

    assert_eq!(controller.load_ui_context().await, None);
    assert_eq!(agent.ui_context_calls.load(Ordering::SeqCst), 1);
    assert_eq!(controller.state().ui_context_preview, None);
}

#[tokio::test(start_paused = true)]
async fn ui_context_survives_a_stopped_run() {
    let mut agent = MockAgent::new(50, Ok(json!("ok")));
    agent.ui_context = Some(json!({ "tree": [] }));
    let agent = Arc::new(agent);
    let controller = controller(QueueProvider::with(&[agent.clone(), agent.clone()]));

    controller.load_ui_context().await;
    let run = spawn_start(&controller, "go", TaskType::Action);
    sleep_ms(10).await;
    controller.stop().await;
    run.await.unwrap().unwrap();

    assert_eq!(controller.state().ui_context_preview, agent.ui_context);
}
