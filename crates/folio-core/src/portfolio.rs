#![forbid(unsafe_code)]

//! Page wiring and dispatch.
//!
//! [`Portfolio`] owns the surface tree, the timer queue, the viewport
//! watcher and every component. The host drives it with three calls:
//!
//! - [`Portfolio::handle_event`] for user and layout input,
//! - [`Portfolio::advance_to`] / [`Portfolio::advance_by`] for time,
//! - [`Portfolio::take_patches`] to collect document mutations.
//!
//! Nothing reads a wall clock, so replaying the same calls reproduces the
//! same patch stream.

use std::fmt;
use std::time::Duration;

use crate::config::PortfolioConfig;
use crate::contact::{ContactForm, ContactOutcome};
use crate::counter::CounterAnimator;
use crate::error::PortfolioError;
use crate::event::PageEvent;
use crate::gallery::{GalleryLoader, GalleryState};
use crate::navigation::NavigationController;
use crate::notification::{NotificationCenter, Severity};
use crate::page::{self, PageShape};
use crate::project::{ProjectFetch, ProjectSource, StaticProjectSource};
use crate::reveal::RevealAnimator;
use crate::scroll_watch::{NavbarLevel, ScrollWatcher};
use crate::surface::{Owner, Surface, SurfaceId, SurfacePatch, SurfaceTree};
use crate::timer::{TimerQueue, TimerTarget};
use crate::typing::TypingAnimator;
use crate::viewport::{IntersectionEntry, Viewport, ViewportEvent, ViewportWatcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Hooks registered, nothing started.
    Created,
    Running,
    /// Every timer and observation cancelled. Terminal.
    TornDown,
}

pub struct Portfolio {
    lifecycle: Lifecycle,
    surfaces: SurfaceTree,
    timers: TimerQueue,
    watcher: ViewportWatcher,
    viewport: Viewport,
    navigation: NavigationController,
    typing: TypingAnimator,
    counters: CounterAnimator,
    reveal: RevealAnimator,
    notifications: NotificationCenter,
    scroll: ScrollWatcher,
    gallery: GalleryLoader,
    contact: ContactForm,
    source: Box<dyn ProjectSource>,
    counter_hooks: Vec<SurfaceId>,
    reveal_hooks: Vec<SurfaceId>,
}

impl fmt::Debug for Portfolio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Portfolio")
            .field("lifecycle", &self.lifecycle)
            .field("now", &self.timers.now())
            .field("surfaces", &self.surfaces.len())
            .field("pending_timers", &self.timers.pending_count())
            .field("source", &self.source.name())
            .finish_non_exhaustive()
    }
}

impl Portfolio {
    /// Register every hook in `shape`. Components whose hooks are absent
    /// stay idle.
    pub fn new(config: PortfolioConfig, shape: &PageShape) -> Result<Self, PortfolioError> {
        config.validate()?;
        let mut surfaces = SurfaceTree::new();

        let mut hook = |key: &str, selector: &Option<String>, owner: Owner| {
            selector
                .as_ref()
                .map(|selector| surfaces.register_hook(key, selector.clone(), owner))
                .transpose()
        };
        let body = hook(page::BODY_KEY, &shape.body, Owner::Notifications)?;
        let navbar = hook(page::NAVBAR_KEY, &shape.navbar, Owner::ScrollWatcher)?;
        let hamburger = hook(page::HAMBURGER_KEY, &shape.hamburger, Owner::Navigation)?;
        let nav_menu = hook(page::NAV_MENU_KEY, &shape.nav_menu, Owner::Navigation)?;
        let typing_text = hook(page::TYPING_KEY, &shape.typing_text, Owner::Typing)?;
        let grid = hook(page::PROJECTS_GRID_KEY, &shape.projects_grid, Owner::Gallery)?;
        let form = hook(page::CONTACT_FORM_KEY, &shape.contact_form, Owner::Contact)?;

        let mut navigation = NavigationController::new(hamburger, nav_menu);
        for section in &shape.sections {
            let id = surfaces.register_hook(
                page::section_key(&section.id),
                format!("#{}", section.id),
                Owner::Page,
            )?;
            if let Some(rect) = section.rect {
                surfaces.set_rect(id, rect)?;
            }
            navigation.add_section(section.id.clone(), id);
        }

        let mut counter_hooks = Vec::with_capacity(shape.counters.len());
        for (index, counter) in shape.counters.iter().enumerate() {
            let key = page::counter_key(index);
            let id = surfaces.register_hook(&key, page::keyed_selector(&key), Owner::Counters)?;
            surfaces.set_attr(id, config.counter.target_attr.clone(), counter.target.clone())?;
            if let Some(rect) = counter.rect {
                surfaces.set_rect(id, rect)?;
            }
            counter_hooks.push(id);
        }

        let mut reveal_hooks = Vec::with_capacity(shape.revealables.len());
        for (index, item) in shape.revealables.iter().enumerate() {
            let key = page::reveal_key(index);
            let id = surfaces.register_hook(&key, page::keyed_selector(&key), Owner::Reveal)?;
            if let Some(rect) = item.rect {
                surfaces.set_rect(id, rect)?;
            }
            reveal_hooks.push(id);
        }

        tracing::debug!(
            surfaces = surfaces.len(),
            counters = counter_hooks.len(),
            revealables = reveal_hooks.len(),
            "page hooks registered"
        );

        Ok(Self {
            lifecycle: Lifecycle::Created,
            surfaces,
            timers: TimerQueue::new(),
            watcher: ViewportWatcher::new(),
            viewport: Viewport {
                scroll_y: 0.0,
                height: shape.viewport_height.max(0.0),
            },
            navigation,
            typing: TypingAnimator::new(typing_text, config.typing),
            counters: CounterAnimator::new(config.counter),
            reveal: RevealAnimator::new(config.reveal),
            notifications: NotificationCenter::new(body, config.notification),
            scroll: ScrollWatcher::new(navbar, config.scroll),
            gallery: GalleryLoader::new(grid, config.gallery),
            contact: ContactForm::new(form),
            source: Box::new(StaticProjectSource),
            counter_hooks,
            reveal_hooks,
        })
    }

    /// Replace the project source. Takes effect at the next fetch.
    #[must_use]
    pub fn with_source(mut self, source: Box<dyn ProjectSource>) -> Self {
        self.set_source(source);
        self
    }

    pub fn set_source(&mut self, source: Box<dyn ProjectSource>) {
        tracing::debug!(source = source.name(), "project source set");
        self.source = source;
    }

    /// Wire every component, in page order: navigation, reveal, typing,
    /// counters, gallery, contact form, scroll effects. Idempotent.
    pub fn init(&mut self) {
        if self.lifecycle != Lifecycle::Created {
            tracing::debug!(lifecycle = ?self.lifecycle, "init ignored");
            return;
        }
        self.lifecycle = Lifecycle::Running;

        for &surface in &self.reveal_hooks {
            self.reveal.observe(&mut self.watcher, surface);
        }
        self.typing.start(&mut self.surfaces, &mut self.timers);
        self.counters
            .setup(&self.surfaces, &mut self.watcher, self.counter_hooks.iter().copied());
        if self.gallery.begin() {
            self.timers.schedule(Duration::ZERO, TimerTarget::GalleryFetch);
        }
        tracing::debug!(source = self.source.name(), "portfolio initialized");

        self.evaluate_viewport();
    }

    /// Apply one input. Ignored unless running.
    pub fn handle_event(&mut self, event: PageEvent) {
        if self.lifecycle != Lifecycle::Running {
            tracing::debug!(kind = event.kind(), lifecycle = ?self.lifecycle, "event ignored");
            return;
        }
        tracing::trace!(kind = event.kind(), "page event");
        match event {
            PageEvent::MenuToggle => {
                self.navigation.toggle_menu(&mut self.surfaces);
            }
            PageEvent::NavClick { href } => {
                self.navigation.click_link(&mut self.surfaces, &href);
            }
            PageEvent::Scroll { offset } => {
                self.scroll.on_scroll(&mut self.surfaces, offset);
                self.viewport.scroll_y = offset;
                self.evaluate_viewport();
            }
            PageEvent::ViewportResize { height } => {
                self.viewport.height = height.max(0.0);
                self.evaluate_viewport();
            }
            PageEvent::Layout { key, rect } => {
                let Some(id) = self.surfaces.find(&key) else {
                    tracing::warn!(%key, "layout for unknown surface");
                    return;
                };
                if let Err(err) = self.surfaces.set_rect(id, rect) {
                    tracing::warn!(%err, "layout not recorded");
                    return;
                }
                self.evaluate_viewport();
            }
            PageEvent::Intersection {
                key,
                ratio,
                intersecting,
            } => {
                let Some(surface) = self.surfaces.find(&key) else {
                    tracing::warn!(%key, "intersection for unknown surface");
                    return;
                };
                let events = self.watcher.deliver(IntersectionEntry {
                    surface,
                    ratio: ratio.clamp(0.0, 1.0),
                    intersecting,
                });
                self.route(events);
            }
            PageEvent::Submit(fields) => {
                if let Some(outcome) = self.contact.submit(&mut self.surfaces, &fields) {
                    let severity = match outcome {
                        ContactOutcome::Rejected(_) => Severity::Error,
                        ContactOutcome::Accepted => Severity::Success,
                    };
                    self.notify(outcome.message(), severity);
                }
            }
            PageEvent::ProjectsLoaded(result) => self.finish_fetch(result),
        }
    }

    /// Fire every timer due at or before `until` (page time), in deadline
    /// order, then move the clock to `until`.
    pub fn advance_to(&mut self, until: Duration) {
        if self.lifecycle == Lifecycle::TornDown {
            return;
        }
        while let Some(due) = self.timers.pop_due(until) {
            self.dispatch(due.target);
        }
        self.timers.settle(until);
    }

    pub fn advance_by(&mut self, delta: Duration) {
        let until = self.timers.now().saturating_add(delta);
        self.advance_to(until);
    }

    /// Cancel every timer and observation and detach live notifications.
    /// Later calls are no-ops.
    pub fn teardown(&mut self) {
        if self.lifecycle == Lifecycle::TornDown {
            return;
        }
        self.typing.stop(&mut self.timers);
        self.counters.stop(&mut self.timers, &mut self.watcher);
        self.reveal.stop(&mut self.watcher);
        self.notifications.stop(&mut self.surfaces, &mut self.timers);
        let stray = self.timers.clear();
        let observations: usize = [Owner::Counters, Owner::Reveal]
            .into_iter()
            .map(|owner| self.watcher.unsubscribe_all(owner))
            .sum();
        self.lifecycle = Lifecycle::TornDown;
        tracing::debug!(stray, observations, "portfolio torn down");
    }

    /// Drain patches recorded since the last call.
    pub fn take_patches(&mut self) -> Vec<SurfacePatch> {
        self.surfaces.take_patches()
    }

    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Current page time.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.timers.now()
    }

    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.timers.pending_count()
    }

    #[must_use]
    pub fn active_observations(&self) -> usize {
        self.watcher.len()
    }

    /// `(key, selector)` of every surface under viewport observation, in
    /// subscription order. Hosts measure these after the document changes
    /// shape and report them back as layout inputs.
    #[must_use]
    pub fn observed_surfaces(&self) -> Vec<(String, String)> {
        let mut seen = Vec::new();
        let mut targets = Vec::new();
        for (_, observation) in self.watcher.observations() {
            if seen.contains(&observation.surface) {
                continue;
            }
            seen.push(observation.surface);
            if let Some(surface) = self.surfaces.get(observation.surface) {
                targets.push((surface.key().to_owned(), surface.selector().to_owned()));
            }
        }
        targets
    }

    #[must_use]
    pub fn surfaces(&self) -> &SurfaceTree {
        &self.surfaces
    }

    /// Look up a live surface by key.
    #[must_use]
    pub fn surface(&self, key: &str) -> Option<&Surface> {
        self.surfaces.find(key).and_then(|id| self.surfaces.get(id))
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[must_use]
    pub fn gallery_state(&self) -> &GalleryState {
        self.gallery.state()
    }

    #[must_use]
    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    #[must_use]
    pub fn counters(&self) -> &CounterAnimator {
        &self.counters
    }

    #[must_use]
    pub fn reveal(&self) -> &RevealAnimator {
        &self.reveal
    }

    #[must_use]
    pub fn typing(&self) -> &TypingAnimator {
        &self.typing
    }

    #[must_use]
    pub fn navbar_level(&self) -> Option<NavbarLevel> {
        self.scroll.level()
    }

    #[must_use]
    pub fn is_menu_open(&self) -> bool {
        self.navigation.is_menu_open(&self.surfaces)
    }

    fn dispatch(&mut self, target: TimerTarget) {
        match target {
            TimerTarget::Typing => self.typing.on_timer(&mut self.surfaces, &mut self.timers),
            TimerTarget::Counter(index) => {
                self.counters.on_timer(&mut self.surfaces, &mut self.timers, index);
            }
            TimerTarget::Notification(id) => {
                self.notifications.on_timer(&mut self.surfaces, &mut self.timers, id);
            }
            TimerTarget::GalleryFetch => match self.source.request() {
                Some(result) => self.finish_fetch(result),
                None => tracing::debug!(source = self.source.name(), "awaiting host projects"),
            },
        }
    }

    fn finish_fetch(&mut self, result: ProjectFetch) {
        if !self.gallery.state().is_loading() {
            tracing::warn!(state = ?self.gallery.state(), "project result ignored: gallery not loading");
            return;
        }
        let cards = self.gallery.render(&mut self.surfaces, result);
        self.reveal.forget_detached(&self.surfaces, &mut self.watcher);
        for card in cards {
            self.reveal.observe(&mut self.watcher, card);
        }
        if let GalleryState::Failed(_) = self.gallery.state() {
            let message = self.gallery.error_message().to_owned();
            self.notify(message, Severity::Error);
        }
        self.evaluate_viewport();
    }

    fn notify(&mut self, message: impl Into<String>, severity: Severity) {
        self.notifications
            .show(&mut self.surfaces, &mut self.timers, message, severity);
    }

    fn evaluate_viewport(&mut self) {
        let surfaces = &self.surfaces;
        let events = self
            .watcher
            .evaluate(self.viewport, |id| surfaces.get(id).and_then(Surface::rect));
        self.route(events);
    }

    fn route(&mut self, events: Vec<ViewportEvent>) {
        for event in events {
            let ViewportEvent::Enter {
                subscriber, surface, ..
            } = event
            else {
                continue;
            };
            match subscriber {
                Owner::Counters => self.counters.on_enter(
                    &mut self.surfaces,
                    &mut self.timers,
                    &mut self.watcher,
                    surface,
                ),
                Owner::Reveal => {
                    self.reveal.on_enter(&mut self.surfaces, &mut self.watcher, surface);
                }
                other => tracing::trace!(%other, "viewport event without handler"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewport::Rect;
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    fn running(shape: &PageShape) -> Portfolio {
        let mut portfolio = Portfolio::new(PortfolioConfig::default(), shape).unwrap();
        portfolio.init();
        portfolio
    }

    #[test]
    fn init_renders_static_projects_on_first_advance() {
        let mut portfolio = running(&PageShape::standard());
        assert_eq!(portfolio.gallery_state(), &GalleryState::Loading);
        portfolio.advance_by(Duration::ZERO);
        assert_eq!(portfolio.gallery_state(), &GalleryState::Loaded(4));
        assert_eq!(portfolio.reveal().len(), 4);
    }

    #[test]
    fn init_is_idempotent() {
        let mut portfolio = running(&PageShape::standard());
        let pending = portfolio.pending_timers();
        portfolio.init();
        assert_eq!(portfolio.pending_timers(), pending);
    }

    #[test]
    fn duplicate_sections_fail_wiring() {
        let mut shape = PageShape::standard();
        let about = shape.sections[1].clone();
        shape.sections.push(about);
        assert!(matches!(
            Portfolio::new(PortfolioConfig::default(), &shape),
            Err(PortfolioError::Surface(_))
        ));
    }

    #[test]
    fn invalid_config_fails_wiring() {
        let config = PortfolioConfig::default().with_counter_steps(0);
        assert!(matches!(
            Portfolio::new(config, &PageShape::standard()),
            Err(PortfolioError::Config(_))
        ));
    }

    #[test]
    fn empty_phrases_with_zero_holds_fail_wiring() {
        let config = PortfolioConfig::from_json(r#"{"typing":{"phrases":[""]}}"#)
            .unwrap();
        let mut zero_holds = config.clone();
        zero_holds.typing.hold_full_ms = 0;
        zero_holds.typing.hold_empty_ms = 0;
        assert!(matches!(
            Portfolio::new(zero_holds, &PageShape::standard()),
            Err(PortfolioError::Config(_))
        ));

        let mut portfolio = Portfolio::new(config, &PageShape::standard()).unwrap();
        portfolio.init();
        portfolio.advance_to(Duration::from_secs(10));
        assert_eq!(portfolio.now(), Duration::from_secs(10));
        assert_eq!(portfolio.surface("typing-text").unwrap().text(), "");
    }

    #[test]
    fn counter_in_view_at_init_starts_immediately() {
        let shape = PageShape::standard().with_counter("20", Some(Rect::new(100.0, 40.0)));
        let portfolio = running(&shape);
        assert_eq!(portfolio.surface("counter-0").unwrap().text(), "1");
    }

    #[test]
    fn loaded_cards_are_reported_for_measuring() {
        let shape = PageShape::standard().with_counter("20", None).with_revealable(None);
        let mut portfolio = running(&shape);
        let before: Vec<String> = portfolio.observed_surfaces().into_iter().map(|(key, _)| key).collect();
        assert_eq!(before, vec!["reveal-0".to_owned(), "counter-0".to_owned()]);

        portfolio.advance_by(Duration::ZERO);
        let after = portfolio.observed_surfaces();
        assert_eq!(after.len(), 6);
        assert!(after.contains(&(
            "project-card-0".to_owned(),
            "[data-folio-key=\"project-card-0\"]".to_owned()
        )));
    }

    #[test]
    fn measured_card_is_revealed_on_scroll() {
        let mut portfolio = running(&PageShape::standard());
        portfolio.advance_by(Duration::ZERO);
        portfolio.handle_event(PageEvent::Layout {
            key: "project-card-1".into(),
            rect: Rect::new(2_400.0, 300.0),
        });
        assert!(!portfolio.surface("project-card-1").unwrap().has_class("animate-in"));
        portfolio.handle_event(PageEvent::Scroll { offset: 2_000.0 });
        assert!(portfolio.surface("project-card-1").unwrap().has_class("animate-in"));
        assert!(
            !portfolio
                .observed_surfaces()
                .iter()
                .any(|(key, _)| key == "project-card-1")
        );
    }

    #[test]
    fn bare_page_runs_without_hooks() {
        let mut portfolio = running(&PageShape::bare());
        portfolio.handle_event(PageEvent::MenuToggle);
        portfolio.handle_event(PageEvent::Scroll { offset: 400.0 });
        portfolio.advance_by(Duration::from_secs(5));
        assert_eq!(portfolio.pending_timers(), 0);
        assert!(portfolio.take_patches().is_empty());
    }

    #[test]
    #[traced_test]
    fn unknown_layout_key_is_logged() {
        let mut portfolio = running(&PageShape::bare());
        portfolio.handle_event(PageEvent::Layout {
            key: "nope".into(),
            rect: Rect::new(0.0, 1.0),
        });
        assert!(logs_contain("layout for unknown surface"));
    }

    #[test]
    fn events_before_init_are_ignored() {
        let mut portfolio = Portfolio::new(PortfolioConfig::default(), &PageShape::standard()).unwrap();
        portfolio.handle_event(PageEvent::MenuToggle);
        assert!(!portfolio.is_menu_open());
        assert!(portfolio.take_patches().is_empty());
    }
}
