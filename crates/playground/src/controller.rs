//! The playground controller.
//!
//! Every edit opens a new compile cycle:
//!
//! ```text
//! edit ─► PendingCompile ──debounce──► Compiling ──result──► Rendered
//!   ▲            │                         │  └─spinner─► show_compiling()
//!   └────────────┴──── superseding edit ───┘
//! ```
//!
//! A cycle runs on a spawned task and reports back over an mpsc channel,
//! tagged with its generation. Only events of the newest generation are
//! applied; everything older is dropped. The controller itself is driven by
//! [`Playground::next_event`] and never touches shared state from the task.
//!
//! [`Playground::new`] spawns the first cycle, so it must be called inside a
//! tokio runtime.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use ctp_diagnostics::{markers, DiagnosticEntry, Document, InlineMarker};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::PlaygroundConfig;
use crate::error::{PlaygroundError, PlaygroundResult};
use crate::services::{CompileRequest, CompileService, ParseService};
use crate::source::include_header;
use crate::state::PlaygroundState;
use crate::state_machine::{ControllerPhase, PhaseMachine};
use crate::storage::{self, Storage};

/// Placeholder shown while a slow compile is running.
pub const LOADING_TEXT: &str = "<Compiling...>";

/// Outcome indicator of the last compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Compiled without any compiler output.
    Ok,
    /// Compiled, but the compiler had something to say.
    Warning,
    /// Non-zero exit or a service error.
    Failed,
}

impl Status {
    pub fn from_outcome(succeeded: bool, has_compiler_output: bool) -> Self {
        match (succeeded, has_compiler_output) {
            (false, _) => Self::Failed,
            (true, true) => Self::Warning,
            (true, false) => Self::Ok,
        }
    }

    /// Indicator colour: green for a clean compile, orange otherwise.
    pub fn colour(self) -> &'static str {
        match self {
            Self::Ok => "rgb(18, 187, 18)",
            Self::Warning | Self::Failed => "rgb(255, 101, 0)",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Warning => write!(f, "warning"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Everything the view shows after a compile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rendering {
    pub entries: Vec<DiagnosticEntry>,
    pub markers: Vec<InlineMarker>,
    pub status: Status,
}

impl Rendering {
    /// Build the rendering for parsed entries, anchoring markers in `code`.
    pub fn new(succeeded: bool, entries: Vec<DiagnosticEntry>, code: &str) -> Self {
        let document = Document::new(code);
        let markers = markers(&entries, &document);
        let has_compiler_output = entries.iter().any(|e| e.is_compiler_output);
        Self {
            status: Status::from_outcome(succeeded, has_compiler_output),
            entries,
            markers,
        }
    }

    /// A failed cycle shows the error text as a single error line.
    pub fn failed(error: &PlaygroundError) -> Self {
        Self {
            entries: vec![DiagnosticEntry::program(error.to_string(), true)],
            markers: Vec::new(),
            status: Status::Failed,
        }
    }
}

/// Output surface the controller drives.
pub trait View: Send {
    /// Replace stale output with the loading indicator.
    fn show_compiling(&mut self);

    fn render(&mut self, rendering: &Rendering);

    /// Bring the input widgets in line with `state` after a reset or load.
    fn sync_inputs(&mut self, state: &PlaygroundState);
}

/// Remote collaborators of a compile cycle.
#[derive(Clone)]
pub struct Services {
    pub compiler: Arc<dyn CompileService>,
    pub parser: Arc<dyn ParseService>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub debounce: Duration,
    pub spinner_delay: Duration,
}

impl From<&PlaygroundConfig> for Timing {
    fn from(config: &PlaygroundConfig) -> Self {
        Self {
            debounce: config.debounce(),
            spinner_delay: config.spinner_delay(),
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::from(&PlaygroundConfig::default())
    }
}

/// Cancel hook for one compile cycle.
///
/// Cancelling closes the debounce gate: if the request has not been sent it
/// never will be. A request already on the wire is not aborted; its result
/// is dropped by the generation check instead.
#[derive(Debug)]
pub struct CompileHandle {
    generation: u64,
    cancel: CancellationToken,
    spinner: CancellationToken,
}

impl CompileHandle {
    fn new(generation: u64) -> Self {
        let cancel = CancellationToken::new();
        let spinner = cancel.child_token();
        Self {
            generation,
            cancel,
            spinner,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn stop_spinner(&self) {
        self.spinner.cancel();
    }
}

/// Parsed result of a finished request.
#[derive(Debug)]
struct CompileOutcome {
    succeeded: bool,
    entries: Vec<DiagnosticEntry>,
}

#[derive(Debug)]
enum CycleEvent {
    Started {
        generation: u64,
    },
    StillCompiling {
        generation: u64,
    },
    Finished {
        generation: u64,
        result: PlaygroundResult<CompileOutcome>,
    },
}

/// What [`Playground::next_event`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaygroundEvent {
    RequestSent { generation: u64 },
    ShowedCompiling { generation: u64 },
    Rendered { generation: u64, status: Status },
    /// An event of a superseded cycle was discarded.
    Stale { generation: u64 },
}

pub struct Playground {
    state: PlaygroundState,
    phases: PhaseMachine,
    view: Box<dyn View>,
    services: Services,
    timing: Timing,
    storage: Option<Arc<dyn Storage>>,
    cycle: Option<CompileHandle>,
    rendering: Option<Rendering>,
    events_tx: mpsc::UnboundedSender<CycleEvent>,
    events_rx: mpsc::UnboundedReceiver<CycleEvent>,
}

impl Playground {
    /// Start with the default state and immediately schedule a compile.
    pub fn new(view: Box<dyn View>, services: Services, timing: Timing) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let mut playground = Self {
            state: PlaygroundState::default(),
            phases: PhaseMachine::new(),
            view,
            services,
            timing,
            storage: None,
            cycle: None,
            rendering: None,
            events_tx,
            events_rx,
        };
        playground.view.sync_inputs(&playground.state);
        playground.schedule("initial state");
        playground
    }

    /// Persist every subsequent change to `storage`. `None` disables persistence.
    pub fn set_storage(&mut self, storage: Option<Arc<dyn Storage>>) {
        self.storage = storage;
    }

    pub fn persistence_enabled(&self) -> bool {
        self.storage.is_some()
    }

    pub fn set_code(&mut self, code: impl Into<String>) {
        self.state.code = code.into();
        self.changed("code edited");
    }

    pub fn set_compiler(&mut self, compiler: impl Into<String>) {
        self.state.compiler = compiler.into();
        if !self.state.has_known_compiler() {
            warn!(compiler = %self.state.compiler, "unknown compiler id, forwarding as-is");
        }
        self.changed("compiler changed");
    }

    pub fn set_compiler_flags(&mut self, flags: impl Into<String>) {
        self.state.compiler_flags = flags.into();
        self.changed("compiler flags changed");
    }

    pub fn set_show_compiler_log(&mut self, show: bool) {
        self.state.show_compiler_log = show;
        self.changed("compiler log toggled");
    }

    /// Back to the default state; the view inputs follow.
    pub fn reset(&mut self) {
        self.state = PlaygroundState::default();
        self.view.sync_inputs(&self.state);
        self.changed("reset");
    }

    /// Apply a stored or shared key/value map.
    pub fn load(&mut self, data: &HashMap<String, String>) {
        self.state.apply(data);
        self.view.sync_inputs(&self.state);
        self.changed("state loaded");
    }

    pub fn state(&self) -> &PlaygroundState {
        &self.state
    }

    pub fn phase(&self) -> ControllerPhase {
        self.phases.current()
    }

    pub fn phases(&self) -> &PhaseMachine {
        &self.phases
    }

    /// Output of the newest finished cycle, if any.
    pub fn rendering(&self) -> Option<&Rendering> {
        self.rendering.as_ref()
    }

    /// Wait for one cycle event and apply it.
    ///
    /// Returns `None` only if the event channel closed, which cannot happen
    /// while the controller is alive.
    pub async fn next_event(&mut self) -> Option<PlaygroundEvent> {
        let event = self.events_rx.recv().await?;
        Some(self.handle(event))
    }

    /// Drive events until the current cycle has rendered.
    pub async fn run_until_rendered(&mut self) -> Option<&Rendering> {
        while self.phase() != ControllerPhase::Rendered {
            self.next_event().await?;
        }
        self.rendering.as_ref()
    }

    fn changed(&mut self, reason: &str) {
        if let Some(storage) = &self.storage {
            storage::save(storage.as_ref(), &self.state);
        }
        self.schedule(reason);
    }

    fn schedule(&mut self, reason: &str) {
        if let Some(previous) = self.cycle.take() {
            previous.cancel();
            debug!(generation = previous.generation(), "compile cycle superseded");
        }

        let generation = self.phases.next_generation();
        self.enter(ControllerPhase::PendingCompile, reason);

        let handle = CompileHandle::new(generation);
        self.spawn_cycle(&handle);
        self.cycle = Some(handle);
    }

    fn spawn_cycle(&self, handle: &CompileHandle) {
        let generation = handle.generation;
        let cancel = handle.cancel.clone();
        let spinner = handle.spinner.clone();
        let state = self.state.clone();
        let services = self.services.clone();
        let timing = self.timing;
        let tx = self.events_tx.clone();

        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(generation, "compile cancelled before request");
                    return;
                }
                _ = tokio::time::sleep(timing.debounce) => {}
            }
            let _ = tx.send(CycleEvent::Started { generation });

            let spinner_tx = tx.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = spinner.cancelled() => {}
                    _ = tokio::time::sleep(timing.spinner_delay) => {
                        let _ = spinner_tx.send(CycleEvent::StillCompiling { generation });
                    }
                }
            });

            let result = compile_and_parse(&services, &state).await;
            let _ = tx.send(CycleEvent::Finished { generation, result });
        });
    }

    fn is_current(&self, generation: u64) -> bool {
        self.cycle
            .as_ref()
            .is_some_and(|cycle| cycle.generation() == generation)
    }

    fn handle(&mut self, event: CycleEvent) -> PlaygroundEvent {
        match event {
            CycleEvent::Started { generation } => {
                if !self.is_current(generation) {
                    return PlaygroundEvent::Stale { generation };
                }
                self.enter(ControllerPhase::Compiling, "debounce elapsed");
                info!(
                    generation,
                    compiler = %self.state.compiler,
                    "compile request sent"
                );
                PlaygroundEvent::RequestSent { generation }
            }
            CycleEvent::StillCompiling { generation } => {
                if !self.is_current(generation) || self.phase() != ControllerPhase::Compiling {
                    return PlaygroundEvent::Stale { generation };
                }
                self.view.show_compiling();
                PlaygroundEvent::ShowedCompiling { generation }
            }
            CycleEvent::Finished { generation, result } => {
                if !self.is_current(generation) {
                    debug!(generation, "dropping result of superseded compile");
                    return PlaygroundEvent::Stale { generation };
                }
                if let Some(cycle) = self.cycle.take() {
                    cycle.stop_spinner();
                }

                let rendering = match result {
                    Ok(outcome) => Rendering::new(outcome.succeeded, outcome.entries, &self.state.code),
                    Err(e) if e.is_remote() => {
                        warn!(generation, error = %e, "compile service failed");
                        Rendering::failed(&e)
                    }
                    Err(e) => {
                        error!(generation, error = %e, "compile cycle failed locally");
                        Rendering::failed(&e)
                    }
                };
                let status = rendering.status;
                self.enter(ControllerPhase::Rendered, &status.to_string());
                self.view.render(&rendering);
                self.rendering = Some(rendering);
                PlaygroundEvent::Rendered { generation, status }
            }
        }
    }

    fn enter(&mut self, to: ControllerPhase, reason: &str) {
        if let Err(e) = self.phases.advance(to, Some(reason)) {
            warn!(error = %e, "ignoring illegal phase transition");
        }
    }
}

impl Drop for Playground {
    fn drop(&mut self) {
        if let Some(cycle) = self.cycle.take() {
            cycle.cancel();
        }
    }
}

async fn compile_and_parse(
    services: &Services,
    state: &PlaygroundState,
) -> PlaygroundResult<CompileOutcome> {
    let (offset, source) = include_header(&state.code);
    let request = CompileRequest::new(&state.compiler, &state.compiler_flags, source);
    let output = services.compiler.compile(&request).await?;
    let succeeded = output.succeeded();
    let entries = services
        .parser
        .parse(offset, output.stderr, state.show_compiler_log)
        .await?;
    Ok(CompileOutcome { succeeded, entries })
}
