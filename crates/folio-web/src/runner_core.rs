#![forbid(unsafe_code)]

//! Platform-independent runner core wrapping [`Portfolio`].
//!
//! This module contains the logic shared between the wasm-bindgen exports
//! and native tests. No JS/WASM types here.
//!
//! Inputs are stamped with the host clock when pushed and applied on
//! [`RunnerCore::step`]; time moves only when the host calls
//! [`RunnerCore::advance_time_ms`] or [`RunnerCore::set_time_ms`]. A step
//! fires the timers due before each input, applies the input at its stamp,
//! then fires the rest up to the clock. Every
//! call into the page runs under the runner's own log capture, so two
//! runners never mix their log lines.

use std::collections::VecDeque;
use std::time::Duration;

use folio_core::project::{HostProjectSource, JsonProjectSource, StaticProjectSource};
use folio_core::{PageEvent, PageShape, Portfolio, PortfolioConfig, PortfolioError, SurfacePatch};
use tracing::{Dispatch, Level};
use tracing_subscriber::layer::SubscriberExt;

use crate::input_parser::parse_page_input;
use crate::logging::{DEFAULT_LOG_CAPACITY, LogBuffer, LogCapture, parse_level};

/// Outcome of one [`RunnerCore::step`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepResult {
    /// `false` once torn down.
    pub running: bool,
    pub events_processed: u32,
    /// Patches waiting in the outbox after this step.
    pub patches_pending: usize,
    /// Page time after this step, in milliseconds.
    pub now_ms: f64,
}

/// Where the gallery gets its projects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceChoice {
    /// Built-in sample list.
    Static,
    /// The host answers with a `projects` or `projects_failed` input.
    Host,
    /// A JSON array supplied up front.
    Json(String),
}

pub struct RunnerCore {
    portfolio: Portfolio,
    /// Inputs with the host time they were pushed at.
    queue: VecDeque<(Duration, PageEvent)>,
    outbox: Vec<SurfacePatch>,
    clock: Duration,
    logs: LogBuffer,
    dispatch: Dispatch,
    rejected_inputs: u64,
}

impl RunnerCore {
    /// Build a runner from JSON configuration and page shape. Empty strings
    /// select the defaults and the standard page.
    pub fn new(config_json: &str, shape_json: &str) -> Result<Self, PortfolioError> {
        Self::with_log_level(config_json, shape_json, Level::DEBUG)
    }

    pub fn with_log_level(
        config_json: &str,
        shape_json: &str,
        max_level: Level,
    ) -> Result<Self, PortfolioError> {
        let config = PortfolioConfig::from_json(config_json)?;
        let shape = PageShape::from_json(shape_json)?;
        Self::from_parts(config, &shape, max_level)
    }

    /// Build a runner from an already-parsed configuration and page shape.
    pub fn from_parts(
        config: PortfolioConfig,
        shape: &PageShape,
        max_level: Level,
    ) -> Result<Self, PortfolioError> {
        let logs = LogBuffer::new(DEFAULT_LOG_CAPACITY);
        let dispatch = capture_dispatch(&logs, max_level);
        let portfolio =
            tracing::dispatcher::with_default(&dispatch, || Portfolio::new(config, shape))?;
        Ok(Self {
            portfolio,
            queue: VecDeque::new(),
            outbox: Vec::new(),
            clock: Duration::ZERO,
            logs,
            dispatch,
            rejected_inputs: 0,
        })
    }

    /// Change the capture filter (`"trace"` .. `"error"`). Returns `false`
    /// for an unknown level name, leaving the filter as it was.
    pub fn set_log_level(&mut self, name: &str) -> bool {
        let Some(level) = parse_level(name) else {
            return false;
        };
        self.dispatch = capture_dispatch(&self.logs, level);
        true
    }

    /// Choose the project source. Call before [`init`](Self::init).
    pub fn set_source(&mut self, choice: SourceChoice) {
        let dispatch = self.dispatch.clone();
        tracing::dispatcher::with_default(&dispatch, || match choice {
            SourceChoice::Static => self.portfolio.set_source(Box::new(StaticProjectSource)),
            SourceChoice::Host => self.portfolio.set_source(Box::new(HostProjectSource)),
            SourceChoice::Json(payload) => {
                self.portfolio.set_source(Box::new(JsonProjectSource::new(payload)));
            }
        });
    }

    /// Wire the page. Call exactly once.
    pub fn init(&mut self) {
        self.scoped(Portfolio::init);
    }

    /// Advance the deterministic clock by `dt_ms` milliseconds. Negative or
    /// non-finite values are ignored.
    pub fn advance_time_ms(&mut self, dt_ms: f64) {
        if let Some(dt) = millis(dt_ms) {
            self.clock = self.clock.saturating_add(dt);
        }
    }

    /// Set the clock to an absolute page time (replay mode). The clock never
    /// moves backwards.
    pub fn set_time_ms(&mut self, ts_ms: f64) {
        if let Some(ts) = millis(ts_ms) {
            self.clock = self.clock.max(ts);
        }
    }

    /// Parse a JSON-encoded input and queue it.
    ///
    /// Returns `true` if accepted, `false` if malformed or of an unknown kind.
    pub fn push_encoded_input(&mut self, json: &str) -> bool {
        let dispatch = self.dispatch.clone();
        tracing::dispatcher::with_default(&dispatch, || match parse_page_input(json) {
            Ok(Some(event)) => {
                self.queue.push_back((self.clock, event));
                true
            }
            Ok(None) => {
                tracing::debug!("input of unknown kind skipped");
                false
            }
            Err(err) => {
                self.rejected_inputs += 1;
                tracing::warn!(%err, "input rejected");
                false
            }
        })
    }

    /// Queue an already-decoded input at the current host time.
    pub fn push_event(&mut self, event: PageEvent) {
        self.queue.push_back((self.clock, event));
    }

    /// Apply queued inputs in order, each at the time it was pushed, then
    /// fire every timer due by the clock.
    pub fn step(&mut self) -> StepResult {
        let events: Vec<(Duration, PageEvent)> = self.queue.drain(..).collect();
        let events_processed = u32::try_from(events.len()).unwrap_or(u32::MAX);
        let clock = self.clock;
        self.scoped(|portfolio| {
            for (at, event) in events {
                portfolio.advance_to(at);
                portfolio.handle_event(event);
            }
            portfolio.advance_to(clock);
        });
        StepResult {
            running: self.is_running(),
            events_processed,
            patches_pending: self.outbox.len(),
            now_ms: self.now_ms(),
        }
    }

    /// Cancel every timer and observation. Queued inputs are discarded.
    pub fn teardown(&mut self) {
        self.queue.clear();
        self.scoped(Portfolio::teardown);
    }

    /// Drain patches produced since the last call.
    pub fn take_patches(&mut self) -> Vec<SurfacePatch> {
        std::mem::take(&mut self.outbox)
    }

    /// Drain patches as a JSON array.
    pub fn take_patches_json(&mut self) -> String {
        let patches = self.take_patches();
        serde_json::to_string(&patches).unwrap_or_else(|err| {
            self.logs.push(format!("ERROR folio_web: patch encoding failed: {err}"));
            "[]".to_owned()
        })
    }

    /// Drain captured log lines.
    pub fn take_logs(&mut self) -> Vec<String> {
        self.logs.drain()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.portfolio.lifecycle() == folio_core::Lifecycle::Running
    }

    /// Page time in milliseconds.
    #[must_use]
    pub fn now_ms(&self) -> f64 {
        self.portfolio.now().as_secs_f64() * 1_000.0
    }

    #[must_use]
    pub fn pending_inputs(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn rejected_inputs(&self) -> u64 {
        self.rejected_inputs
    }

    #[must_use]
    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    /// `(key, selector)` pairs whose layout the host should report with
    /// `layout` inputs.
    #[must_use]
    pub fn layout_targets(&self) -> Vec<(String, String)> {
        self.portfolio.observed_surfaces()
    }

    /// Run `f` with this runner's log capture as the default subscriber.
    pub fn in_log_scope<R>(&self, f: impl FnOnce() -> R) -> R {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    fn scoped(&mut self, f: impl FnOnce(&mut Portfolio)) {
        let dispatch = self.dispatch.clone();
        tracing::dispatcher::with_default(&dispatch, || f(&mut self.portfolio));
        self.outbox.extend(self.portfolio.take_patches());
    }
}

/// Whether applying `patches` can move elements on the page, so observed
/// surfaces need measuring again.
#[must_use]
pub fn changes_layout(patches: &[SurfacePatch]) -> bool {
    patches.iter().any(|patch| {
        matches!(
            patch,
            SurfacePatch::Append { .. }
                | SurfacePatch::Remove { .. }
                | SurfacePatch::ClearChildren { .. }
        )
    })
}

fn capture_dispatch(logs: &LogBuffer, max_level: Level) -> Dispatch {
    Dispatch::new(tracing_subscriber::registry().with(LogCapture::new(logs.clone(), max_level)))
}

fn millis(ms: f64) -> Option<Duration> {
    if ms.is_finite() && ms >= 0.0 {
        Duration::try_from_secs_f64(ms / 1_000.0).ok()
    } else {
        None
    }
}
