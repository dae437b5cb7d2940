//! Compile-time printer playground
//!
//! Edit C++ that uses the CTP header, compile it on Compiler Explorer and see
//! the printed values and compiler diagnostics, with markers anchored to the
//! offending lines.
//!
//! - `controller`: debounced compile cycles, rendering and status
//! - `services`: compile, parse and link-shortener clients
//! - `share`/`storage`: share links and local persistence of the state
//! - `shell`: session start-up, reset, share panel and split view
//! - `terminal`: command-line view

pub mod config;
pub mod controller;
pub mod error;
pub mod services;
pub mod share;
pub mod shell;
pub mod source;
pub mod state;
pub mod state_machine;
pub mod storage;
pub mod terminal;

pub use config::PlaygroundConfig;
pub use controller::{Playground, PlaygroundEvent, Rendering, Services, Status, Timing, View};
pub use error::{PlaygroundError, PlaygroundResult};
pub use state::PlaygroundState;
