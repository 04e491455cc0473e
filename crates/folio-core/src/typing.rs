#![forbid(unsafe_code)]

//! Typewriter effect for the hero headline.
//!
//! [`TypingState`] is the pure state machine; [`TypingAnimator`] binds it to
//! a surface and a timer. Lengths are counted in `char`s so multi-byte
//! phrases never split a code point.

use std::time::Duration;

use crate::config::TypingConfig;
use crate::surface::{Owner, SurfaceError, SurfaceId, SurfaceTree};
use crate::timer::{TimerId, TimerQueue, TimerTarget};

/// Cursor over a cyclic phrase list.
///
/// Invariant: `char_index <= current phrase length`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypingState {
    phrases: Vec<String>,
    text_index: usize,
    char_index: usize,
    deleting: bool,
}

/// Result of one tick: what to show and when to tick next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypingFrame {
    pub text: String,
    pub next_delay: Duration,
}

impl TypingState {
    /// `None` for an empty phrase list.
    #[must_use]
    pub fn new(phrases: Vec<String>) -> Option<Self> {
        if phrases.is_empty() {
            return None;
        }
        Some(Self {
            phrases,
            text_index: 0,
            char_index: 0,
            deleting: false,
        })
    }

    #[must_use]
    pub fn text_index(&self) -> usize {
        self.text_index
    }

    #[must_use]
    pub fn char_index(&self) -> usize {
        self.char_index
    }

    #[must_use]
    pub fn is_deleting(&self) -> bool {
        self.deleting
    }

    #[must_use]
    pub fn current_phrase(&self) -> &str {
        &self.phrases[self.text_index]
    }

    /// Prefix of the current phrase currently on display.
    #[must_use]
    pub fn visible_text(&self) -> String {
        self.current_phrase().chars().take(self.char_index).collect()
    }

    /// Advance one character and pick the delay before the next tick.
    pub fn step(&mut self, timing: &TypingConfig) -> TypingFrame {
        let len = self.current_phrase().chars().count();
        let delay_ms = if self.deleting {
            self.char_index = self.char_index.saturating_sub(1);
            if self.char_index == 0 {
                let text = self.visible_text();
                self.deleting = false;
                self.text_index = (self.text_index + 1) % self.phrases.len();
                return TypingFrame {
                    text,
                    next_delay: Duration::from_millis(timing.hold_empty_ms),
                };
            }
            timing.delete_interval_ms
        } else {
            self.char_index = (self.char_index + 1).min(len);
            if self.char_index == len {
                self.deleting = true;
                timing.hold_full_ms
            } else {
                timing.type_interval_ms
            }
        };
        TypingFrame {
            text: self.visible_text(),
            next_delay: Duration::from_millis(delay_ms),
        }
    }
}

/// Owned typing loop with an explicit stop handle.
#[derive(Debug)]
pub struct TypingAnimator {
    surface: Option<SurfaceId>,
    config: TypingConfig,
    state: Option<TypingState>,
    timer: Option<TimerId>,
}

impl TypingAnimator {
    #[must_use]
    pub fn new(surface: Option<SurfaceId>, config: TypingConfig) -> Self {
        Self {
            surface,
            config,
            state: None,
            timer: None,
        }
    }

    /// Start the loop. The first character appears immediately. Returns
    /// `false` (and does nothing) without a surface or phrases.
    pub fn start(&mut self, surfaces: &mut SurfaceTree, timers: &mut TimerQueue) -> bool {
        let Some(surface) = self.surface else {
            tracing::debug!("typing surface absent; animator idle");
            return false;
        };
        let Some(state) = TypingState::new(self.config.phrases.clone()) else {
            tracing::debug!("no typing phrases; animator idle");
            return false;
        };
        self.stop(timers);
        if let Err(err) = surfaces.set_text(Owner::Typing, surface, "") {
            tracing::warn!(%err, "typing surface unusable");
            return false;
        }
        self.state = Some(state);
        self.tick(surfaces, timers);
        self.is_running()
    }

    /// Cancel the pending tick. The displayed text stays as it is.
    pub fn stop(&mut self, timers: &mut TimerQueue) {
        if let Some(timer) = self.timer.take() {
            timers.cancel(timer);
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    #[must_use]
    pub fn state(&self) -> Option<&TypingState> {
        self.state.as_ref()
    }

    pub fn on_timer(&mut self, surfaces: &mut SurfaceTree, timers: &mut TimerQueue) {
        self.timer = None;
        self.tick(surfaces, timers);
    }

    fn tick(&mut self, surfaces: &mut SurfaceTree, timers: &mut TimerQueue) {
        let (Some(surface), Some(state)) = (self.surface, self.state.as_mut()) else {
            return;
        };
        let frame = state.step(&self.config);
        match surfaces.set_text(Owner::Typing, surface, frame.text) {
            Ok(_) => {
                self.timer = Some(timers.schedule(frame.next_delay, TimerTarget::Typing));
            }
            Err(SurfaceError::Detached(_)) => {
                tracing::debug!("typing surface detached; stopping");
            }
            Err(err) => {
                tracing::warn!(%err, "typing tick failed; stopping");
            }
        }
    }
}
