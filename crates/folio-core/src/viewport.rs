#![forbid(unsafe_code)]

//! Viewport intersection as a subscription.
//!
//! Components register a surface with [`IntersectionOptions`] and receive
//! [`ViewportEvent::Enter`] / [`ViewportEvent::Leave`] transitions. Input
//! comes from two places:
//!
//! - geometry: [`ViewportWatcher::evaluate`] computes intersection ratios from
//!   surface rects and the current [`Viewport`] (native hosts, tests);
//! - host entries: [`ViewportWatcher::deliver`] accepts ratios the browser's
//!   own intersection observer already computed.
//!
//! Each subscription only reports transitions, so a surface sitting inside
//! the viewport across many scroll events produces a single `Enter`.
//! Subscribers that want one-shot semantics call
//! [`ViewportWatcher::unsubscribe`] from their enter handler.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::surface::{Owner, SurfaceId};

/// Vertical extent of an element in document coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub top: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub const fn new(top: f64, height: f64) -> Self {
        Self { top, height }
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.top + self.height.max(0.0)
    }
}

/// Root-box margins, CSS `rootMargin` style (negative shrinks the root).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RootMargin {
    pub top: f64,
    pub bottom: f64,
}

/// Options for one observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntersectionOptions {
    /// Minimum visible fraction of the element, in `[0, 1]`.
    pub threshold: f64,
    #[serde(default)]
    pub root_margin: RootMargin,
}

impl Default for IntersectionOptions {
    fn default() -> Self {
        Self {
            threshold: 0.0,
            root_margin: RootMargin::default(),
        }
    }
}

impl IntersectionOptions {
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_bottom_margin(mut self, bottom: f64) -> Self {
        self.root_margin.bottom = bottom;
        self
    }

    /// Whether a ratio reported for an intersecting element satisfies the
    /// threshold.
    #[must_use]
    pub fn accepts(&self, ratio: f64, intersecting: bool) -> bool {
        intersecting && ratio >= self.threshold
    }
}

/// The visible scroll region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub scroll_y: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scroll_y: 0.0,
            height: 800.0,
        }
    }
}

impl Viewport {
    /// Intersection of `rect` with the margin-adjusted root box.
    ///
    /// Returns `(ratio, intersecting)`. Edge-adjacent boxes intersect with
    /// ratio 0; a zero-height element inside the root has ratio 1.
    #[must_use]
    pub fn intersect(&self, rect: Rect, margin: RootMargin) -> (f64, bool) {
        let root_top = self.scroll_y - margin.top;
        let root_bottom = self.scroll_y + self.height + margin.bottom;
        if root_bottom < root_top {
            return (0.0, false);
        }
        let top = rect.top.max(root_top);
        let bottom = rect.bottom().min(root_bottom);
        if bottom < top {
            return (0.0, false);
        }
        if rect.height <= 0.0 {
            return (1.0, true);
        }
        (((bottom - top) / rect.height).clamp(0.0, 1.0), true)
    }
}

/// Handle for one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u32);

/// A host-reported intersection sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEntry {
    pub surface: SurfaceId,
    pub ratio: f64,
    pub intersecting: bool,
}

/// Transition reported to a subscriber.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewportEvent {
    Enter {
        subscription: SubscriptionId,
        subscriber: Owner,
        surface: SurfaceId,
        ratio: f64,
    },
    Leave {
        subscription: SubscriptionId,
        subscriber: Owner,
        surface: SurfaceId,
    },
}

impl ViewportEvent {
    #[must_use]
    pub fn subscriber(&self) -> Owner {
        match self {
            Self::Enter { subscriber, .. } | Self::Leave { subscriber, .. } => *subscriber,
        }
    }

    #[must_use]
    pub fn surface(&self) -> SurfaceId {
        match self {
            Self::Enter { surface, .. } | Self::Leave { surface, .. } => *surface,
        }
    }
}

/// Active observation, as exposed to hosts that run their own observers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub surface: SurfaceId,
    pub subscriber: Owner,
    pub options: IntersectionOptions,
    inside: bool,
}

/// Registry of viewport subscriptions.
#[derive(Debug, Default)]
pub struct ViewportWatcher {
    next_id: u32,
    observations: BTreeMap<SubscriptionId, Observation>,
}

impl ViewportWatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &mut self,
        subscriber: Owner,
        surface: SurfaceId,
        options: IntersectionOptions,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.observations.insert(
            id,
            Observation {
                surface,
                subscriber,
                options,
                inside: false,
            },
        );
        id
    }

    /// Stop an observation. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observations.remove(&id).is_some()
    }

    /// Drop every observation a subscriber holds. Returns how many.
    pub fn unsubscribe_all(&mut self, subscriber: Owner) -> usize {
        let before = self.observations.len();
        self.observations.retain(|_, obs| obs.subscriber != subscriber);
        before - self.observations.len()
    }

    #[must_use]
    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.observations.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observations(&self) -> impl Iterator<Item = (SubscriptionId, &Observation)> {
        self.observations.iter().map(|(id, obs)| (*id, obs))
    }

    /// Recompute every observation whose surface has a known rect.
    pub fn evaluate(
        &mut self,
        viewport: Viewport,
        rect_of: impl Fn(SurfaceId) -> Option<Rect>,
    ) -> Vec<ViewportEvent> {
        let mut events = Vec::new();
        for (id, obs) in &mut self.observations {
            let Some(rect) = rect_of(obs.surface) else {
                continue;
            };
            let (ratio, intersecting) = viewport.intersect(rect, obs.options.root_margin);
            if let Some(event) = transition(*id, obs, ratio, intersecting) {
                events.push(event);
            }
        }
        events
    }

    /// Apply a host-computed sample to every observation of its surface.
    pub fn deliver(&mut self, entry: IntersectionEntry) -> Vec<ViewportEvent> {
        let mut events = Vec::new();
        for (id, obs) in &mut self.observations {
            if obs.surface != entry.surface {
                continue;
            }
            if let Some(event) = transition(*id, obs, entry.ratio, entry.intersecting) {
                events.push(event);
            }
        }
        events
    }
}

fn transition(
    id: SubscriptionId,
    obs: &mut Observation,
    ratio: f64,
    intersecting: bool,
) -> Option<ViewportEvent> {
    let inside = obs.options.accepts(ratio, intersecting);
    if inside == obs.inside {
        return None;
    }
    obs.inside = inside;
    Some(if inside {
        ViewportEvent::Enter {
            subscription: id,
            subscriber: obs.subscriber,
            surface: obs.surface,
            ratio,
        }
    } else {
        ViewportEvent::Leave {
            subscription: id,
            subscriber: obs.subscriber,
            surface: obs.surface,
        }
    })
}
