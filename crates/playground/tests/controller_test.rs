//! Controller integration tests: debounce, supersession, rendering and
//! persistence, driven on paused tokio time with in-process mocks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ctp_diagnostics::Severity;
use ctp_playground::controller::{Playground, PlaygroundEvent, Rendering, Services, Status, Timing, View};
use ctp_playground::services::{CompileOutput, CompileRequest, CompileService, LocalParser};
use ctp_playground::shell::Session;
use ctp_playground::state::PlaygroundState;
use ctp_playground::state_machine::{ControllerPhase, MAX_TRANSITION_RECORDS};
use ctp_playground::storage::{MemoryStorage, Storage};
use ctp_playground::{share, PlaygroundError, PlaygroundResult};

// ── Helpers ──────────────────────────────────────────────────────────────────

type Responder = dyn Fn(&CompileRequest) -> (Duration, PlaygroundResult<CompileOutput>) + Send + Sync;

/// Compile service that records requests and answers from a closure.
struct MockCompiler {
    requests: Mutex<Vec<CompileRequest>>,
    respond: Box<Responder>,
}

impl MockCompiler {
    fn new(
        respond: impl Fn(&CompileRequest) -> (Duration, PlaygroundResult<CompileOutput>)
            + Send
            + Sync
            + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            respond: Box::new(respond),
        })
    }

    /// Always succeeds instantly without output.
    fn clean() -> Arc<Self> {
        Self::new(|_| (Duration::ZERO, Ok(output(0, &[]))))
    }

    fn requests(&self) -> Vec<CompileRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompileService for MockCompiler {
    async fn compile(&self, request: &CompileRequest) -> PlaygroundResult<CompileOutput> {
        self.requests.lock().unwrap().push(request.clone());
        let (delay, result) = (self.respond)(request);
        tokio::time::sleep(delay).await;
        result
    }
}

fn output(code: i32, stderr: &[&str]) -> CompileOutput {
    CompileOutput {
        code,
        stderr: stderr.iter().map(|s| s.to_string()).collect(),
    }
}

#[derive(Default)]
struct ViewLog {
    compiling: usize,
    renders: Vec<Rendering>,
    synced: Vec<PlaygroundState>,
}

/// View that records every call into a shared log.
struct RecordingView(Arc<Mutex<ViewLog>>);

impl View for RecordingView {
    fn show_compiling(&mut self) {
        self.0.lock().unwrap().compiling += 1;
    }

    fn render(&mut self, rendering: &Rendering) {
        self.0.lock().unwrap().renders.push(rendering.clone());
    }

    fn sync_inputs(&mut self, state: &PlaygroundState) {
        self.0.lock().unwrap().synced.push(state.clone());
    }
}

fn timing() -> Timing {
    Timing {
        debounce: Duration::from_millis(500),
        spinner_delay: Duration::from_millis(1000),
    }
}

fn playground(compiler: Arc<MockCompiler>) -> (Playground, Arc<Mutex<ViewLog>>) {
    let log = Arc::new(Mutex::new(ViewLog::default()));
    let services = Services {
        compiler,
        parser: Arc::new(LocalParser),
    };
    let playground = Playground::new(Box::new(RecordingView(log.clone())), services, timing());
    (playground, log)
}

async fn drive_until_request_sent(playground: &mut Playground) {
    loop {
        match playground.next_event().await {
            Some(PlaygroundEvent::RequestSent { .. }) => return,
            Some(_) => {}
            None => panic!("event channel closed"),
        }
    }
}

// ── Cycle basics ─────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn construction_compiles_default_state() {
    let compiler = MockCompiler::clean();
    let (mut pg, log) = playground(compiler.clone());
    assert_eq!(pg.phase(), ControllerPhase::PendingCompile);

    let rendering = pg.run_until_rendered().await.unwrap().clone();
    assert_eq!(rendering.status, Status::Ok);
    assert!(rendering.entries.is_empty());

    let requests = compiler.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].compiler, "g102");
    assert_eq!(
        requests[0].user_arguments,
        "-fpermissive -std=c++17 -fno-diagnostics-color -fsyntax-only"
    );
    // The header is inlined, so the include is gone from the request.
    assert!(!requests[0].source.contains("<ctp/ctp.hpp>"));

    let log = log.lock().unwrap();
    assert_eq!(log.renders.len(), 1);
    assert_eq!(log.synced.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn rapid_edits_send_one_request() {
    let compiler = MockCompiler::clean();
    let (mut pg, _log) = playground(compiler.clone());

    for i in 0..5 {
        pg.set_code(format!("int v{i};"));
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    pg.run_until_rendered().await.unwrap();

    let requests = compiler.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].source, "int v4;");
}

#[tokio::test(start_paused = true)]
async fn edit_after_quiet_period_compiles_again() {
    let compiler = MockCompiler::clean();
    let (mut pg, log) = playground(compiler.clone());
    pg.run_until_rendered().await.unwrap();

    pg.set_compiler_flags("-std=c++2a");
    assert_eq!(pg.phase(), ControllerPhase::PendingCompile);
    pg.run_until_rendered().await.unwrap();

    let requests = compiler.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[1].user_arguments.starts_with("-std=c++2a "));
    assert_eq!(log.lock().unwrap().renders.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn superseded_result_is_ignored() {
    let compiler = MockCompiler::new(|request| {
        if request.source.contains("slow") {
            (
                Duration::from_secs(3),
                Ok(output(1, &["<source>:1:1: error: from A"])),
            )
        } else {
            (
                Duration::ZERO,
                Ok(output(0, &["<source>:1:1: warning: from B"])),
            )
        }
    });
    let (mut pg, log) = playground(compiler.clone());

    pg.set_code("slow A");
    drive_until_request_sent(&mut pg).await;
    assert_eq!(pg.phase(), ControllerPhase::Compiling);

    pg.set_code("int b;");
    let rendering = pg.run_until_rendered().await.unwrap().clone();
    assert_eq!(rendering.status, Status::Warning);
    assert_eq!(rendering.entries[0].message, "<source>:1:1: warning: from B");

    // A's response still arrives, but is discarded.
    let event = pg.next_event().await.unwrap();
    assert!(matches!(event, PlaygroundEvent::Stale { .. }));
    assert_eq!(pg.rendering(), Some(&rendering));
    assert_eq!(log.lock().unwrap().renders.len(), 1);
    assert_eq!(compiler.requests().len(), 2);
}

// ── Loading indicator ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn slow_compile_shows_loading_indicator() {
    let compiler = MockCompiler::new(|_| (Duration::from_secs(3), Ok(output(0, &[]))));
    let (mut pg, log) = playground(compiler);

    let mut events = Vec::new();
    while pg.phase() != ControllerPhase::Rendered {
        events.push(pg.next_event().await.unwrap());
    }

    assert!(events
        .iter()
        .any(|e| matches!(e, PlaygroundEvent::ShowedCompiling { .. })));
    assert_eq!(log.lock().unwrap().compiling, 1);
}

#[tokio::test(start_paused = true)]
async fn fast_compile_skips_loading_indicator() {
    let compiler = MockCompiler::new(|_| (Duration::from_millis(200), Ok(output(0, &[]))));
    let (mut pg, log) = playground(compiler);
    pg.run_until_rendered().await.unwrap();

    // Well past the spinner delay: the cancelled timer must stay silent.
    let quiet = tokio::time::timeout(Duration::from_secs(5), pg.next_event()).await;
    assert!(quiet.is_err());
    assert_eq!(log.lock().unwrap().compiling, 0);
}

// ── Rendering ────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn undeclared_identifier_fails_with_one_marker() {
    let compiler = MockCompiler::new(|_| {
        (
            Duration::ZERO,
            Ok(output(
                1,
                &[
                    "<source>: In function 'int main()':",
                    "<source>:1:20: error: 'x' was not declared in this scope",
                ],
            )),
        )
    });
    let (mut pg, _log) = playground(compiler);

    pg.load(&HashMap::from([
        ("code".to_string(), "int main(){ return x; }".to_string()),
        ("show_compiler_log".to_string(), "false".to_string()),
    ]));
    let rendering = pg.run_until_rendered().await.unwrap();

    assert_eq!(rendering.status, Status::Failed);
    assert_eq!(rendering.entries.len(), 1);
    assert!(rendering.entries[0].is_error_output);
    assert_eq!(rendering.markers.len(), 1);
    assert_eq!(rendering.markers[0].line, 1);
    assert_eq!(rendering.markers[0].severity, Severity::Error);
    assert_eq!(rendering.markers[0].message, "'x' was not declared in this scope");
}

#[tokio::test(start_paused = true)]
async fn header_lines_map_back_to_user_text() {
    // The default example includes the header on line 1; gcc reports the
    // error below the inlined header.
    let compiler = MockCompiler::new(|request| {
        let header_lines = request.source.matches('\n').count()
            - ctp_playground::state::DEFAULT_CODE.matches('\n').count();
        let line = 3 + header_lines;
        (
            Duration::ZERO,
            Ok(CompileOutput {
                code: 1,
                stderr: vec![format!("<source>:{line}:1: error: boom")],
            }),
        )
    });
    let (mut pg, _log) = playground(compiler);
    let rendering = pg.run_until_rendered().await.unwrap();

    assert_eq!(rendering.entries[0].message, "<source>:3:1: error: boom");
    assert_eq!(rendering.markers[0].line, 3);
}

#[tokio::test(start_paused = true)]
async fn service_error_renders_failed_status() {
    let compiler = MockCompiler::new(|_| {
        (
            Duration::ZERO,
            Err(PlaygroundError::Status {
                service: "compiler",
                status: 502,
            }),
        )
    });
    let (mut pg, _log) = playground(compiler);
    let rendering = pg.run_until_rendered().await.unwrap();

    assert_eq!(rendering.status, Status::Failed);
    assert_eq!(rendering.entries.len(), 1);
    assert_eq!(rendering.entries[0].message, "compiler returned status 502");
    assert!(rendering.markers.is_empty());
}

#[tokio::test(start_paused = true)]
async fn local_error_renders_as_failure() {
    let compiler = MockCompiler::new(|_| {
        (
            Duration::ZERO,
            Err(PlaygroundError::Configuration("no compile URL".into())),
        )
    });
    let (mut pg, _log) = playground(compiler);
    let rendering = pg.run_until_rendered().await.unwrap();

    assert_eq!(rendering.status, Status::Failed);
    assert_eq!(
        rendering.entries[0].message,
        "Configuration error: no compile URL"
    );
}

// ── Reset ────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn reset_twice_matches_reset_once() {
    let compiler = MockCompiler::new(|request| {
        let warning = format!("<source>:1:1: warning: {}", request.compiler);
        (Duration::ZERO, Ok(output(0, &[warning.as_str()])))
    });
    let (mut pg, log) = playground(compiler);
    pg.set_compiler("g75");
    pg.set_code("int y;");
    pg.run_until_rendered().await.unwrap();

    pg.reset();
    let once = pg.run_until_rendered().await.unwrap().clone();
    let state_once = pg.state().clone();

    pg.reset();
    let twice = pg.run_until_rendered().await.unwrap().clone();

    assert_eq!(once, twice);
    assert_eq!(pg.state(), &state_once);
    assert_eq!(pg.state(), &PlaygroundState::default());
    // Construction plus two resets synced the inputs.
    assert_eq!(log.lock().unwrap().synced.len(), 3);
}

// ── Persistence ──────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn stored_session_persists_edits() {
    let storage = Arc::new(MemoryStorage::new());
    storage.set("compiler", "g75").unwrap();

    let (mut pg, _log) = playground(MockCompiler::clean());
    Session::init(None, &*storage).apply(&mut pg, storage.clone());
    assert!(pg.persistence_enabled());
    assert_eq!(pg.state().compiler, "g75");

    pg.set_compiler_flags("-O3");
    assert_eq!(storage.get("compiler_flags").unwrap().as_deref(), Some("-O3"));
    assert_eq!(storage.get("show_compiler_log").unwrap().as_deref(), Some("true"));
}

#[tokio::test(start_paused = true)]
async fn shared_session_does_not_persist() {
    let storage = Arc::new(MemoryStorage::new());
    let shared = PlaygroundState {
        code: "int shared;".into(),
        compiler: "g93".into(),
        ..PlaygroundState::default()
    };
    let url = share::share_url("https://example.org/", &shared);

    let compiler = MockCompiler::clean();
    let (mut pg, _log) = playground(compiler.clone());
    Session::init(Some(url.as_str()), &*storage).apply(&mut pg, storage.clone());
    assert!(!pg.persistence_enabled());
    assert_eq!(pg.state(), &shared);

    pg.set_code("int edited;");
    assert_eq!(storage.get("code").unwrap(), None);

    pg.run_until_rendered().await.unwrap();
    assert_eq!(compiler.requests()[0].compiler, "g93");
}

// ── Phase log ────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn phase_log_records_cycle() {
    let (mut pg, _log) = playground(MockCompiler::clean());
    pg.run_until_rendered().await.unwrap();

    let phases: Vec<_> = pg.phases().transitions().iter().map(|t| t.to).collect();
    assert_eq!(
        phases,
        vec![
            ControllerPhase::PendingCompile,
            ControllerPhase::Compiling,
            ControllerPhase::Rendered,
        ]
    );
    assert_eq!(pg.phases().transitions()[2].reason.as_deref(), Some("ok"));
}

#[tokio::test(start_paused = true)]
async fn phase_log_stays_bounded_over_long_session() {
    let (mut pg, log) = playground(MockCompiler::clean());
    pg.run_until_rendered().await.unwrap();

    for i in 0..500 {
        pg.set_code(format!("int v{i};"));
        pg.run_until_rendered().await.unwrap();
    }

    assert_eq!(log.lock().unwrap().renders.len(), 501);
    assert_eq!(pg.phases().transitions().len(), MAX_TRANSITION_RECORDS);
    assert_eq!(pg.phases().total_transitions(), 3 * 501);
    let last = pg.phases().transitions().back().unwrap();
    assert_eq!(last.to, ControllerPhase::Rendered);
    assert_eq!(last.generation, pg.phases().generation());
}
