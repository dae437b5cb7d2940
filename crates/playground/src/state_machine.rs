//! Controller phases and their legal transitions.
//!
//! The playground never finishes: every phase can be left by an edit, so
//! there is no terminal state. Each transition is validated against the
//! table below and appended to a bounded log of recent transitions.

use std::collections::VecDeque;
use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerPhase {
    /// Not yet started.
    Idle,
    /// Debounce window open; no request sent yet.
    PendingCompile,
    /// Compile (and parse) request in flight.
    Compiling,
    /// Output of the latest cycle is on screen.
    Rendered,
}

impl fmt::Display for ControllerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::PendingCompile => write!(f, "PendingCompile"),
            Self::Compiling => write!(f, "Compiling"),
            Self::Rendered => write!(f, "Rendered"),
        }
    }
}

/// ```text
/// Idle           → PendingCompile
/// PendingCompile → PendingCompile | Compiling
/// Compiling      → PendingCompile | Rendered
/// Rendered       → PendingCompile
/// ```
fn is_legal_transition(from: ControllerPhase, to: ControllerPhase) -> bool {
    use ControllerPhase::*;

    // An edit restarts the cycle from anywhere.
    if to == PendingCompile {
        return true;
    }

    matches!((from, to), (PendingCompile, Compiling) | (Compiling, Rendered))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: ControllerPhase,
    pub to: ControllerPhase,
    /// Compile cycle the transition belongs to.
    pub generation: u64,
    /// Milliseconds since the machine was created.
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct IllegalTransition {
    pub from: ControllerPhase,
    pub to: ControllerPhase,
}

impl fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Illegal phase transition: {} → {}", self.from, self.to)
    }
}

impl std::error::Error for IllegalTransition {}

/// Transition records kept; older ones are dropped first.
pub const MAX_TRANSITION_RECORDS: usize = 64;

/// Current phase plus the most recent transitions.
pub struct PhaseMachine {
    current: ControllerPhase,
    generation: u64,
    created_at: Instant,
    transitions: VecDeque<TransitionRecord>,
    total_transitions: u64,
}

impl PhaseMachine {
    pub fn new() -> Self {
        Self {
            current: ControllerPhase::Idle,
            generation: 0,
            created_at: Instant::now(),
            transitions: VecDeque::with_capacity(MAX_TRANSITION_RECORDS),
            total_transitions: 0,
        }
    }

    pub fn current(&self) -> ControllerPhase {
        self.current
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Open a new compile cycle and return its generation.
    pub fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    pub fn advance(
        &mut self,
        to: ControllerPhase,
        reason: Option<&str>,
    ) -> Result<(), IllegalTransition> {
        if !is_legal_transition(self.current, to) {
            return Err(IllegalTransition {
                from: self.current,
                to,
            });
        }

        tracing::debug!(
            from = %self.current,
            to = %to,
            generation = self.generation,
            "Phase transition"
        );

        if self.transitions.len() == MAX_TRANSITION_RECORDS {
            self.transitions.pop_front();
        }
        self.transitions.push_back(TransitionRecord {
            from: self.current,
            to,
            generation: self.generation,
            elapsed_ms: self.created_at.elapsed().as_millis() as u64,
            reason: reason.map(String::from),
        });
        self.total_transitions += 1;
        self.current = to;
        Ok(())
    }

    /// Up to [`MAX_TRANSITION_RECORDS`] most recent transitions, oldest first.
    pub fn transitions(&self) -> &VecDeque<TransitionRecord> {
        &self.transitions
    }

    /// Transitions since creation, including those no longer retained.
    pub fn total_transitions(&self) -> u64 {
        self.total_transitions
    }

    /// e.g. `Idle → Rendered (3 transitions, generation 1)`.
    pub fn summary(&self) -> String {
        format!(
            "{} → {} ({} transitions, generation {})",
            ControllerPhase::Idle,
            self.current,
            self.total_transitions,
            self.generation
        )
    }
}

impl Default for PhaseMachine {
    fn default() -> Self {
        Self::new()
    }
}
