//! Control panel around the playground: session start-up, reset, the share
//! panel and the resizable split between editor and output.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::controller::Playground;
use crate::services::{LinkShortener, SHORTEN_FAILED_MESSAGE};
use crate::share;
use crate::state::PlaygroundState;
use crate::storage::{self, Storage};

// ── Session ──────────────────────────────────────────────────────────────────

/// Where the initial state of a session came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOrigin {
    /// A share link. Changes are not persisted.
    Shared,
    /// Local storage (possibly empty).
    Stored,
}

/// Initial state of a session.
#[derive(Debug, Clone)]
pub struct Session {
    pub origin: SessionOrigin,
    pub data: HashMap<String, String>,
}

impl Session {
    /// A decodable share fragment in `url` wins over stored state.
    pub fn init(url: Option<&str>, storage: &dyn Storage) -> Self {
        if let Some(data) = url.and_then(share::decode) {
            info!(keys = data.len(), "session seeded from share link");
            return Self {
                origin: SessionOrigin::Shared,
                data,
            };
        }
        let data = storage::load(storage);
        debug!(keys = data.len(), "session seeded from storage");
        Self {
            origin: SessionOrigin::Stored,
            data,
        }
    }

    pub fn persists(&self) -> bool {
        self.origin == SessionOrigin::Stored
    }

    /// Load the session into `playground`, attaching `storage` unless the
    /// session came from a share link.
    pub fn apply(self, playground: &mut Playground, storage: Arc<dyn Storage>) {
        playground.set_storage(self.persists().then_some(storage));
        playground.load(&self.data);
    }
}

// ── Share panel ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkLength {
    Short,
    Long,
}

/// What a click landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    ShareButton,
    SharePanel,
    Outside,
}

/// Popup holding the share link.
#[derive(Debug, Clone)]
pub struct SharePanel {
    open: bool,
    length: LinkLength,
    link: String,
}

impl Default for SharePanel {
    fn default() -> Self {
        Self {
            open: false,
            length: LinkLength::Short,
            link: String::new(),
        }
    }
}

impl SharePanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn length(&self) -> LinkLength {
        self.length
    }

    pub fn link(&self) -> &str {
        &self.link
    }

    /// Returns `true` if the click opened the panel and the link needs refreshing.
    pub fn click(&mut self, target: ClickTarget) -> bool {
        match target {
            ClickTarget::ShareButton => {
                self.open = !self.open;
                self.open
            }
            ClickTarget::SharePanel => false,
            ClickTarget::Outside => {
                self.open = false;
                false
            }
        }
    }

    pub fn set_length(&mut self, length: LinkLength) {
        self.length = length;
    }

    /// Recompute the link for `state`. Short links go through `shortener`;
    /// any failure there shows the fixed failure text.
    pub async fn refresh(
        &mut self,
        state: &PlaygroundState,
        base_url: &str,
        shortener: &dyn LinkShortener,
    ) -> &str {
        let url = share::share_url(base_url, state);
        self.link = match self.length {
            LinkLength::Long => url,
            LinkLength::Short => {
                self.link.clear();
                match shortener.shorten(&url).await {
                    Ok(short) => short,
                    Err(e) => {
                        warn!(error = %e, "link shortener unavailable");
                        SHORTEN_FAILED_MESSAGE.to_string()
                    }
                }
            }
        };
        &self.link
    }
}

// ── Control panel ────────────────────────────────────────────────────────────

/// Reset button and share panel wired to a playground.
pub struct ControlPanel {
    share: SharePanel,
    base_url: String,
    shortener: Arc<dyn LinkShortener>,
}

impl ControlPanel {
    pub fn new(base_url: impl Into<String>, shortener: Arc<dyn LinkShortener>) -> Self {
        Self {
            share: SharePanel::new(),
            base_url: base_url.into(),
            shortener,
        }
    }

    pub fn share_panel(&self) -> &SharePanel {
        &self.share
    }

    /// Seed `playground` from `url` or `storage`. See [`Session::init`].
    pub fn init(
        &self,
        playground: &mut Playground,
        url: Option<&str>,
        storage: Arc<dyn Storage>,
    ) -> SessionOrigin {
        let session = Session::init(url, storage.as_ref());
        let origin = session.origin;
        session.apply(playground, storage);
        origin
    }

    pub fn reset(&self, playground: &mut Playground) {
        info!("resetting playground to defaults");
        playground.reset();
    }

    /// Route a click. Returns the new link when the panel opened.
    pub async fn click(&mut self, target: ClickTarget, playground: &Playground) -> Option<&str> {
        if self.share.click(target) {
            let link = self
                .share
                .refresh(playground.state(), &self.base_url, self.shortener.as_ref())
                .await;
            return Some(link);
        }
        None
    }

    /// Switch between short and long links and show the new link.
    pub async fn select_link_length(&mut self, length: LinkLength, playground: &Playground) -> &str {
        self.share.set_length(length);
        self.share
            .refresh(playground.state(), &self.base_url, self.shortener.as_ref())
            .await
    }
}

// ── Split view ───────────────────────────────────────────────────────────────

/// A CSS `calc(<percent>% - <px>px)` width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalcWidth {
    pub percent: f64,
    pub minus_px: f64,
}

impl CalcWidth {
    pub fn to_css(self) -> String {
        format!("calc({}% - {}px)", self.percent, self.minus_px)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelWidths {
    pub first: CalcWidth,
    pub second: CalcWidth,
}

/// New widths after dragging the separator by `delta` pixels.
///
/// The delta is clamped to `[-first_width, second_width]` so neither panel
/// goes negative.
pub fn resize(
    first_width: f64,
    second_width: f64,
    delta: f64,
    separator_width: f64,
    window_width: f64,
) -> PanelWidths {
    let delta = delta.clamp(-first_width, second_width);
    let w1 = first_width + delta + separator_width;
    let w2 = second_width - delta + 2.0 * separator_width;
    let minus_px = separator_width / 2.0;
    PanelWidths {
        first: CalcWidth {
            percent: w1 / window_width * 100.0,
            minus_px,
        },
        second: CalcWidth {
            percent: w2 / window_width * 100.0,
            minus_px,
        },
    }
}

#[derive(Debug, Clone, Copy)]
struct DragStart {
    x: f64,
    first_width: f64,
    second_width: f64,
}

/// Drag state of the separator between two panels.
#[derive(Debug, Clone)]
pub struct SplitView {
    separator_width: f64,
    drag: Option<DragStart>,
}

impl SplitView {
    pub fn new(separator_width: f64) -> Self {
        Self {
            separator_width,
            drag: None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Pointer down on the separator; remembers the current panel widths.
    pub fn press(&mut self, x: f64, first_width: f64, second_width: f64) {
        self.drag = Some(DragStart {
            x,
            first_width,
            second_width,
        });
    }

    /// Pointer moved. `None` unless a drag is in progress.
    pub fn move_to(&self, x: f64, window_width: f64) -> Option<PanelWidths> {
        let start = self.drag?;
        Some(resize(
            start.first_width,
            start.second_width,
            x - start.x,
            self.separator_width,
            window_width,
        ))
    }

    pub fn release(&mut self) {
        self.drag = None;
    }
}
