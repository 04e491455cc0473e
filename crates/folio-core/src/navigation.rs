#![forbid(unsafe_code)]

//! Mobile menu toggle and in-page anchor scrolling.

use std::collections::HashMap;

use crate::surface::{Owner, SurfaceId, SurfaceTree};

const ACTIVE: &str = "active";

/// What a navigation click did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavOutcome {
    /// Section scrolled to, if the anchor resolved.
    pub scrolled_to: Option<SurfaceId>,
}

#[derive(Debug, Default)]
pub struct NavigationController {
    trigger: Option<SurfaceId>,
    menu: Option<SurfaceId>,
    sections: HashMap<String, SurfaceId>,
}

impl NavigationController {
    #[must_use]
    pub fn new(trigger: Option<SurfaceId>, menu: Option<SurfaceId>) -> Self {
        Self {
            trigger,
            menu,
            sections: HashMap::new(),
        }
    }

    /// Make `#id` resolvable.
    pub fn add_section(&mut self, id: impl Into<String>, surface: SurfaceId) {
        self.sections.insert(id.into(), surface);
    }

    /// Resolve an `href` of the form `#section`.
    #[must_use]
    pub fn resolve(&self, href: &str) -> Option<SurfaceId> {
        let id = href.strip_prefix('#').filter(|id| !id.is_empty())?;
        self.sections.get(id).copied()
    }

    /// Flip the menu open/closed. A no-op when either hook is missing.
    /// Returns the new open state, or `None` if nothing happened.
    pub fn toggle_menu(&mut self, surfaces: &mut SurfaceTree) -> Option<bool> {
        let (Some(trigger), Some(menu)) = (self.trigger, self.menu) else {
            tracing::debug!("menu toggle ignored: hook missing");
            return None;
        };
        let toggled = surfaces
            .toggle_class(Owner::Navigation, trigger, ACTIVE)
            .and_then(|_| surfaces.toggle_class(Owner::Navigation, menu, ACTIVE));
        match toggled {
            Ok(open) => Some(open),
            Err(err) => {
                tracing::warn!(%err, "menu toggle failed");
                None
            }
        }
    }

    /// Close the menu if open. Missing hooks are skipped individually.
    pub fn close_menu(&mut self, surfaces: &mut SurfaceTree) {
        for hook in [self.trigger, self.menu].into_iter().flatten() {
            if let Err(err) = surfaces.remove_class(Owner::Navigation, hook, ACTIVE) {
                tracing::debug!(%err, "menu close skipped a hook");
            }
        }
    }

    #[must_use]
    pub fn is_menu_open(&self, surfaces: &SurfaceTree) -> bool {
        self.menu
            .and_then(|menu| surfaces.get(menu))
            .is_some_and(|menu| menu.has_class(ACTIVE))
    }

    /// Handle a navigation-link click: smooth-scroll to the anchor target
    /// when it resolves, then always close the menu.
    pub fn click_link(&mut self, surfaces: &mut SurfaceTree, href: &str) -> NavOutcome {
        let target = self.resolve(href);
        let scrolled_to = match target {
            Some(section) => match surfaces.scroll_into_view(section, true) {
                Ok(()) => Some(section),
                Err(err) => {
                    tracing::debug!(%err, href, "section gone; not scrolling");
                    None
                }
            },
            None => {
                tracing::debug!(href, "anchor does not resolve");
                None
            }
        };
        self.close_menu(surfaces);
        NavOutcome { scrolled_to }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::SurfacePatch;
    use pretty_assertions::assert_eq;

    fn page() -> (SurfaceTree, NavigationController, SurfaceId) {
        let mut surfaces = SurfaceTree::new();
        let trigger = surfaces.register_hook("hamburger", ".hamburger", Owner::Navigation).unwrap();
        let menu = surfaces.register_hook("nav-menu", ".nav-menu", Owner::Navigation).unwrap();
        let about = surfaces.register_hook("section-about", "#about", Owner::Page).unwrap();
        let mut nav = NavigationController::new(Some(trigger), Some(menu));
        nav.add_section("about", about);
        (surfaces, nav, about)
    }

    #[test]
    fn toggle_opens_and_closes_both_hooks() {
        let (mut surfaces, mut nav, _) = page();
        assert_eq!(nav.toggle_menu(&mut surfaces), Some(true));
        assert!(nav.is_menu_open(&surfaces));
        let trigger = surfaces.find("hamburger").unwrap();
        assert!(surfaces.get(trigger).unwrap().has_class("active"));
        assert_eq!(nav.toggle_menu(&mut surfaces), Some(false));
        assert!(!nav.is_menu_open(&surfaces));
    }

    #[test]
    fn toggle_without_hooks_does_nothing() {
        let mut surfaces = SurfaceTree::new();
        let menu = surfaces.register_hook("nav-menu", ".nav-menu", Owner::Navigation).unwrap();
        let mut nav = NavigationController::new(None, Some(menu));
        assert_eq!(nav.toggle_menu(&mut surfaces), None);
        assert!(surfaces.pending_patches().is_empty());
    }

    #[test]
    fn link_click_scrolls_and_closes() {
        let (mut surfaces, mut nav, about) = page();
        nav.toggle_menu(&mut surfaces);
        surfaces.take_patches();

        let outcome = nav.click_link(&mut surfaces, "#about");
        assert_eq!(outcome.scrolled_to, Some(about));
        assert!(!nav.is_menu_open(&surfaces));
        assert_eq!(
            surfaces.take_patches().first(),
            Some(&SurfacePatch::ScrollIntoView {
                target: "#about".into(),
                smooth: true
            })
        );
    }

    #[test]
    fn unresolved_anchor_still_closes_menu() {
        let (mut surfaces, mut nav, _) = page();
        nav.toggle_menu(&mut surfaces);
        for href in ["#missing", "#", "about", ""] {
            let outcome = nav.click_link(&mut surfaces, href);
            assert_eq!(outcome.scrolled_to, None);
        }
        assert!(!nav.is_menu_open(&surfaces));
    }
}
