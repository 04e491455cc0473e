#![forbid(unsafe_code)]

//! Statistic counters that count up once they scroll into view.
//!
//! Each counter slot goes `Idle -> Running -> Done` exactly once. The slot
//! observes its surface with a zero threshold; the first `Enter` cancels the
//! observation and starts the count.

use std::fmt;

use crate::config::CounterConfig;
use crate::surface::{Owner, SurfaceId, SurfaceTree};
use crate::timer::{TimerId, TimerQueue, TimerTarget};
use crate::viewport::{IntersectionOptions, SubscriptionId, ViewportWatcher};

/// The target attribute could not be read as an integer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterTargetError(pub String);

impl fmt::Display for CounterTargetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "counter target {:?} is not an integer", self.0)
    }
}

impl std::error::Error for CounterTargetError {}

/// Parse a target with integer-prefix semantics: leading whitespace, an
/// optional sign, then digits; anything after the digits is ignored.
pub fn parse_target(raw: &str) -> Result<i64, CounterTargetError> {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return Err(CounterTargetError(raw.to_owned()));
    }
    let magnitude: i64 = rest[..digits]
        .parse()
        .map_err(|_| CounterTargetError(raw.to_owned()))?;
    Ok(if negative { -magnitude } else { magnitude })
}

/// Outcome of one counter tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterStep {
    /// Display this value and tick again.
    Continue(i64),
    /// Display the exact target; the count is over.
    Finished(i64),
}

impl CounterStep {
    #[must_use]
    pub fn value(self) -> i64 {
        match self {
            Self::Continue(v) | Self::Finished(v) => v,
        }
    }
}

/// Float accumulator counting from 0 to `target`.
///
/// Invariant: displayed values never decrease and never exceed `target`;
/// the final value is exactly `target`.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterState {
    target: i64,
    increment: f64,
    current: f64,
    finished: bool,
}

impl CounterState {
    #[must_use]
    pub fn new(target: i64, steps: u32) -> Self {
        Self {
            target,
            increment: target as f64 / f64::from(steps.max(1)),
            current: 0.0,
            finished: false,
        }
    }

    #[must_use]
    pub fn target(&self) -> i64 {
        self.target
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn step(&mut self) -> CounterStep {
        let target = self.target as f64;
        if self.finished || self.current >= target || self.increment <= 0.0 {
            self.finished = true;
            return CounterStep::Finished(self.target);
        }
        self.current += self.increment;
        if self.current >= target {
            self.finished = true;
            return CounterStep::Finished(self.target);
        }
        let shown = (self.current.ceil() as i64).min(self.target);
        CounterStep::Continue(shown)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterPhase {
    /// Waiting for first viewport entry.
    Idle,
    Running,
    Done,
    /// Target attribute was unusable; never observed.
    Inert,
}

#[derive(Debug)]
struct CounterSlot {
    surface: SurfaceId,
    state: Option<CounterState>,
    phase: CounterPhase,
    subscription: Option<SubscriptionId>,
    timer: Option<TimerId>,
}

/// All counter surfaces on the page.
#[derive(Debug)]
pub struct CounterAnimator {
    config: CounterConfig,
    slots: Vec<CounterSlot>,
}

impl CounterAnimator {
    #[must_use]
    pub fn new(config: CounterConfig) -> Self {
        Self {
            config,
            slots: Vec::new(),
        }
    }

    /// Read each surface's target attribute and start observing it.
    pub fn setup(
        &mut self,
        surfaces: &SurfaceTree,
        viewport: &mut ViewportWatcher,
        counters: impl IntoIterator<Item = SurfaceId>,
    ) {
        for surface in counters {
            let raw = surfaces
                .get(surface)
                .and_then(|s| s.attr(&self.config.target_attr))
                .unwrap_or_default();
            let slot = match parse_target(raw) {
                Ok(target) => CounterSlot {
                    surface,
                    state: Some(CounterState::new(target, self.config.steps)),
                    phase: CounterPhase::Idle,
                    subscription: Some(viewport.subscribe(
                        Owner::Counters,
                        surface,
                        IntersectionOptions::default(),
                    )),
                    timer: None,
                },
                Err(err) => {
                    tracing::warn!(%err, "counter left inert");
                    CounterSlot {
                        surface,
                        state: None,
                        phase: CounterPhase::Inert,
                        subscription: None,
                        timer: None,
                    }
                }
            };
            self.slots.push(slot);
        }
    }

    /// First viewport entry for `surface`: unobserve and start counting.
    pub fn on_enter(
        &mut self,
        surfaces: &mut SurfaceTree,
        timers: &mut TimerQueue,
        viewport: &mut ViewportWatcher,
        surface: SurfaceId,
    ) {
        let Some(index) = self.slots.iter().position(|s| s.surface == surface) else {
            return;
        };
        let slot = &mut self.slots[index];
        if let Some(sub) = slot.subscription.take() {
            viewport.unsubscribe(sub);
        }
        if slot.phase != CounterPhase::Idle {
            return;
        }
        slot.phase = CounterPhase::Running;
        tracing::debug!(counter = index, "counter started");
        self.tick(surfaces, timers, index);
    }

    pub fn on_timer(&mut self, surfaces: &mut SurfaceTree, timers: &mut TimerQueue, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.timer = None;
        }
        self.tick(surfaces, timers, index);
    }

    /// Cancel all pending ticks and observations. Running counters freeze.
    pub fn stop(&mut self, timers: &mut TimerQueue, viewport: &mut ViewportWatcher) {
        for slot in &mut self.slots {
            if let Some(timer) = slot.timer.take() {
                timers.cancel(timer);
            }
            if let Some(sub) = slot.subscription.take() {
                viewport.unsubscribe(sub);
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[must_use]
    pub fn phase(&self, index: usize) -> Option<CounterPhase> {
        self.slots.get(index).map(|s| s.phase)
    }

    #[must_use]
    pub fn surface(&self, index: usize) -> Option<SurfaceId> {
        self.slots.get(index).map(|s| s.surface)
    }

    fn tick(&mut self, surfaces: &mut SurfaceTree, timers: &mut TimerQueue, index: usize) {
        let Some(slot) = self.slots.get_mut(index) else {
            return;
        };
        let Some(state) = slot.state.as_mut() else {
            return;
        };
        if slot.phase != CounterPhase::Running {
            return;
        }
        let step = state.step();
        if let Err(err) = surfaces.set_text(Owner::Counters, slot.surface, step.value().to_string()) {
            tracing::debug!(counter = index, %err, "counter surface gone; stopping");
            slot.phase = CounterPhase::Done;
            return;
        }
        match step {
            CounterStep::Continue(_) => {
                slot.timer = Some(timers.schedule(self.config.tick(), TimerTarget::Counter(index)));
            }
            CounterStep::Finished(target) => {
                tracing::debug!(counter = index, target, "counter finished");
                slot.phase = CounterPhase::Done;
            }
        }
    }
}
