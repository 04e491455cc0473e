#![forbid(unsafe_code)]

//! One-way reveal of elements as they scroll into view.
//!
//! Every revealable surface shares the same options (10% threshold, bottom
//! root margin of -50 by default). On first entry the marker class is added
//! and the observation is dropped. The revealed flag never goes back.

use std::collections::BTreeMap;

use crate::config::RevealConfig;
use crate::surface::{Owner, SurfaceId, SurfaceTree};
use crate::viewport::{SubscriptionId, ViewportWatcher};

#[derive(Debug, Clone, Copy)]
struct RevealSlot {
    revealed: bool,
    subscription: Option<SubscriptionId>,
}

#[derive(Debug)]
pub struct RevealAnimator {
    config: RevealConfig,
    slots: BTreeMap<SurfaceId, RevealSlot>,
}

impl RevealAnimator {
    #[must_use]
    pub fn new(config: RevealConfig) -> Self {
        Self {
            config,
            slots: BTreeMap::new(),
        }
    }

    /// Start watching a surface. Observing the same surface twice is a no-op.
    pub fn observe(&mut self, viewport: &mut ViewportWatcher, surface: SurfaceId) {
        if self.slots.contains_key(&surface) {
            return;
        }
        let subscription = viewport.subscribe(Owner::Reveal, surface, self.config.options());
        self.slots.insert(
            surface,
            RevealSlot {
                revealed: false,
                subscription: Some(subscription),
            },
        );
    }

    /// Mark a surface revealed. Idempotent; returns whether this call
    /// revealed it.
    pub fn on_enter(
        &mut self,
        surfaces: &mut SurfaceTree,
        viewport: &mut ViewportWatcher,
        surface: SurfaceId,
    ) -> bool {
        let Some(slot) = self.slots.get_mut(&surface) else {
            return false;
        };
        if let Some(sub) = slot.subscription.take() {
            viewport.unsubscribe(sub);
        }
        if slot.revealed {
            return false;
        }
        match surfaces.add_class(Owner::Reveal, surface, &self.config.class) {
            Ok(_) => {
                slot.revealed = true;
                true
            }
            Err(err) => {
                tracing::debug!(%err, "reveal target gone");
                self.slots.remove(&surface);
                false
            }
        }
    }

    /// Forget surfaces that left the page (e.g. cleared gallery cards).
    pub fn forget_detached(&mut self, surfaces: &SurfaceTree, viewport: &mut ViewportWatcher) {
        self.slots.retain(|surface, slot| {
            let keep = surfaces.is_attached(*surface);
            if !keep && let Some(sub) = slot.subscription.take() {
                viewport.unsubscribe(sub);
            }
            keep
        });
    }

    /// Drop every observation. Revealed flags are kept.
    pub fn stop(&mut self, viewport: &mut ViewportWatcher) {
        for slot in self.slots.values_mut() {
            if let Some(sub) = slot.subscription.take() {
                viewport.unsubscribe(sub);
            }
        }
    }

    #[must_use]
    pub fn is_revealed(&self, surface: SurfaceId) -> bool {
        self.slots.get(&surface).is_some_and(|s| s.revealed)
    }

    #[must_use]
    pub fn is_observing(&self, surface: SurfaceId) -> bool {
        self.slots.get(&surface).is_some_and(|s| s.subscription.is_some())
    }

    #[must_use]
    pub fn revealed_count(&self) -> usize {
        self.slots.values().filter(|s| s.revealed).count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
