#![forbid(unsafe_code)]

//! Transient notification overlays.
//!
//! Each notification is an independent timeline:
//!
//! ```text
//! t0                 created off-screen      transform: translateX(100%)
//! t0 + enter         Visible                 transform: translateX(0)
//! t0 + enter + shown Leaving                 transform: translateX(100%)
//! ... + exit         Removed                 overlay detached
//! ```
//!
//! There is no queue and no shared counter between notifications beyond id
//! allocation; any number may be in any phase at once.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::NotificationConfig;
use crate::surface::{NewSurface, Owner, SurfaceError, SurfaceId, SurfaceTree};
use crate::timer::{TimerId, TimerQueue, TimerTarget};

const OFF_SCREEN: &str = "translateX(100%)";
const ON_SCREEN: &str = "translateX(0)";

/// Message category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Success,
    Error,
}

impl Severity {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle phase. Strictly ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NotificationPhase {
    /// Attached off-screen, waiting to slide in.
    Entering,
    Visible,
    Leaving,
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotificationId(u64);

impl NotificationId {
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

/// One live notification.
#[derive(Debug, Clone)]
pub struct Notification {
    surface: SurfaceId,
    message: String,
    severity: Severity,
    phase: NotificationPhase,
    timer: Option<TimerId>,
}

impl Notification {
    #[must_use]
    pub fn surface(&self) -> SurfaceId {
        self.surface
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    #[must_use]
    pub fn phase(&self) -> NotificationPhase {
        self.phase
    }
}

/// Emits and retires notifications under the document body.
#[derive(Debug)]
pub struct NotificationCenter {
    body: Option<SurfaceId>,
    config: NotificationConfig,
    next_id: u64,
    active: BTreeMap<NotificationId, Notification>,
}

impl NotificationCenter {
    #[must_use]
    pub fn new(body: Option<SurfaceId>, config: NotificationConfig) -> Self {
        Self {
            body,
            config,
            next_id: 0,
            active: BTreeMap::new(),
        }
    }

    /// Attach a new overlay and start its timeline. Returns `None` when the
    /// page has no body hook.
    pub fn show(
        &mut self,
        surfaces: &mut SurfaceTree,
        timers: &mut TimerQueue,
        message: impl Into<String>,
        severity: Severity,
    ) -> Option<NotificationId> {
        let message = message.into();
        let Some(body) = self.body else {
            tracing::warn!(%severity, "notification dropped: no body hook");
            return None;
        };

        let id = NotificationId(self.next_id);
        self.next_id += 1;

        let node = NewSurface::new(format!("notification-{}", id.0), "div")
            .with_class("notification")
            .with_class(format!("notification-{severity}"))
            .with_text(message.clone())
            .with_style("position", "fixed")
            .with_style("top", "20px")
            .with_style("right", "20px")
            .with_style("padding", "1rem 1.5rem")
            .with_style("border-radius", "8px")
            .with_style("color", "white")
            .with_style("font-weight", "500")
            .with_style("z-index", "10000")
            .with_style("transform", OFF_SCREEN)
            .with_style("transition", "transform 0.3s ease")
            .with_style("background", self.config.color(severity));

        let surface =
            match surfaces.append_child(Owner::Notifications, body, Owner::Notifications, node) {
                Ok(surface) => surface,
                Err(err) => {
                    tracing::warn!(%err, "notification could not be attached");
                    return None;
                }
            };

        let timer = timers.schedule(
            Duration::from_millis(self.config.enter_delay_ms),
            TimerTarget::Notification(id),
        );
        tracing::debug!(id = id.0, %severity, %message, "notification shown");
        self.active.insert(
            id,
            Notification {
                surface,
                message,
                severity,
                phase: NotificationPhase::Entering,
                timer: Some(timer),
            },
        );
        Some(id)
    }

    /// Advance a notification to its next phase.
    pub fn on_timer(&mut self, surfaces: &mut SurfaceTree, timers: &mut TimerQueue, id: NotificationId) {
        let Some(note) = self.active.get_mut(&id) else {
            return;
        };
        note.timer = None;

        let step: Result<(), SurfaceError> = match note.phase {
            NotificationPhase::Entering => surfaces
                .set_style(Owner::Notifications, note.surface, "transform", ON_SCREEN)
                .map(|_| {
                    note.phase = NotificationPhase::Visible;
                    note.timer = Some(timers.schedule(
                        Duration::from_millis(self.config.visible_ms),
                        TimerTarget::Notification(id),
                    ));
                }),
            NotificationPhase::Visible => surfaces
                .set_style(Owner::Notifications, note.surface, "transform", OFF_SCREEN)
                .map(|_| {
                    note.phase = NotificationPhase::Leaving;
                    note.timer = Some(timers.schedule(
                        Duration::from_millis(self.config.exit_ms),
                        TimerTarget::Notification(id),
                    ));
                }),
            NotificationPhase::Leaving => surfaces
                .remove(Owner::Notifications, note.surface)
                .map(|()| note.phase = NotificationPhase::Removed),
            NotificationPhase::Removed => Ok(()),
        };

        if let Err(err) = step {
            tracing::debug!(id = id.0, %err, "notification surface gone; retiring");
            self.active.remove(&id);
            return;
        }
        if note.phase == NotificationPhase::Removed {
            tracing::trace!(id = id.0, "notification removed");
            self.active.remove(&id);
        }
    }

    /// Current phase. Ids that were issued but are no longer live report
    /// `Removed`.
    #[must_use]
    pub fn phase(&self, id: NotificationId) -> Option<NotificationPhase> {
        match self.active.get(&id) {
            Some(note) => Some(note.phase),
            None if id.0 < self.next_id => Some(NotificationPhase::Removed),
            None => None,
        }
    }

    #[must_use]
    pub fn get(&self, id: NotificationId) -> Option<&Notification> {
        self.active.get(&id)
    }

    pub fn active(&self) -> impl Iterator<Item = (NotificationId, &Notification)> {
        self.active.iter().map(|(id, note)| (*id, note))
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Total notifications ever shown.
    #[must_use]
    pub fn shown_count(&self) -> u64 {
        self.next_id
    }

    /// Cancel every pending phase timer and detach every overlay.
    pub fn stop(&mut self, surfaces: &mut SurfaceTree, timers: &mut TimerQueue) {
        for (_, note) in std::mem::take(&mut self.active) {
            if let Some(timer) = note.timer {
                timers.cancel(timer);
            }
            if let Err(err) = surfaces.remove(Owner::Notifications, note.surface) {
                tracing::trace!(%err, "notification already detached");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (SurfaceTree, TimerQueue, NotificationCenter) {
        let mut surfaces = SurfaceTree::new();
        let body = surfaces.register_hook("body", "body", Owner::Notifications).unwrap();
        let center = NotificationCenter::new(Some(body), NotificationConfig::default());
        (surfaces, TimerQueue::new(), center)
    }

    fn run_until(
        center: &mut NotificationCenter,
        surfaces: &mut SurfaceTree,
        timers: &mut TimerQueue,
        ms: u64,
    ) {
        let until = Duration::from_millis(ms);
        while let Some(due) = timers.pop_due(until) {
            if let TimerTarget::Notification(id) = due.target {
                center.on_timer(surfaces, timers, id);
            }
        }
        timers.settle(until);
    }

    fn transform(surfaces: &SurfaceTree, center: &NotificationCenter, id: NotificationId) -> String {
        let surface = center.get(id).unwrap().surface();
        surfaces.get(surface).unwrap().style("transform").unwrap().to_owned()
    }

    #[test]
    fn phases_follow_the_timeline() {
        let (mut surfaces, mut timers, mut center) = setup();
        let id = center
            .show(&mut surfaces, &mut timers, "hello", Severity::Info)
            .unwrap();
        assert_eq!(center.phase(id), Some(NotificationPhase::Entering));
        assert_eq!(transform(&surfaces, &center, id), OFF_SCREEN);

        run_until(&mut center, &mut surfaces, &mut timers, 100);
        assert_eq!(center.phase(id), Some(NotificationPhase::Visible));
        assert_eq!(transform(&surfaces, &center, id), ON_SCREEN);

        run_until(&mut center, &mut surfaces, &mut timers, 3_099);
        assert_eq!(center.phase(id), Some(NotificationPhase::Visible));

        run_until(&mut center, &mut surfaces, &mut timers, 3_100);
        assert_eq!(center.phase(id), Some(NotificationPhase::Leaving));
        assert_eq!(transform(&surfaces, &center, id), OFF_SCREEN);

        run_until(&mut center, &mut surfaces, &mut timers, 3_400);
        assert_eq!(center.phase(id), Some(NotificationPhase::Removed));
        assert!(surfaces.find("notification-0").is_none());
        assert_eq!(timers.pending_count(), 0);
    }

    #[test]
    fn notifications_stack_independently() {
        let (mut surfaces, mut timers, mut center) = setup();
        let first = center
            .show(&mut surfaces, &mut timers, "one", Severity::Success)
            .unwrap();
        run_until(&mut center, &mut surfaces, &mut timers, 1_000);
        let second = center
            .show(&mut surfaces, &mut timers, "two", Severity::Error)
            .unwrap();
        assert_eq!(center.active_count(), 2);

        run_until(&mut center, &mut surfaces, &mut timers, 3_400);
        assert_eq!(center.phase(first), Some(NotificationPhase::Removed));
        assert_eq!(center.phase(second), Some(NotificationPhase::Visible));
        assert_eq!(center.active_count(), 1);
    }

    #[test]
    fn severity_selects_class_and_background() {
        let (mut surfaces, mut timers, mut center) = setup();
        let id = center
            .show(&mut surfaces, &mut timers, "boom", Severity::Error)
            .unwrap();
        let surface = surfaces.get(center.get(id).unwrap().surface()).unwrap();
        assert!(surface.has_class("notification"));
        assert!(surface.has_class("notification-error"));
        assert_eq!(surface.style("background"), Some("#ef4444"));
        assert_eq!(surface.text(), "boom");
    }

    #[test]
    fn missing_body_drops_silently() {
        let mut surfaces = SurfaceTree::new();
        let mut timers = TimerQueue::new();
        let mut center = NotificationCenter::new(None, NotificationConfig::default());
        assert!(center.show(&mut surfaces, &mut timers, "x", Severity::Info).is_none());
        assert_eq!(timers.pending_count(), 0);
    }

    #[test]
    fn stop_cancels_timers_and_detaches() {
        let (mut surfaces, mut timers, mut center) = setup();
        center.show(&mut surfaces, &mut timers, "a", Severity::Info);
        center.show(&mut surfaces, &mut timers, "b", Severity::Info);
        center.stop(&mut surfaces, &mut timers);
        assert_eq!(timers.pending_count(), 0);
        assert_eq!(center.active_count(), 0);
        assert_eq!(surfaces.len(), 1);
    }
}
