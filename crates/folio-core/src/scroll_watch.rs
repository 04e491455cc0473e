#![forbid(unsafe_code)]

//! Navigation-bar background driven by scroll offset.

use crate::config::ScrollConfig;
use crate::surface::{Owner, SurfaceId, SurfaceTree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavbarLevel {
    /// At or near the top of the page.
    Translucent,
    /// Scrolled past the threshold.
    Solid,
}

#[derive(Debug)]
pub struct ScrollWatcher {
    navbar: Option<SurfaceId>,
    config: ScrollConfig,
    level: Option<NavbarLevel>,
}

impl ScrollWatcher {
    #[must_use]
    pub fn new(navbar: Option<SurfaceId>, config: ScrollConfig) -> Self {
        Self {
            navbar,
            config,
            level: None,
        }
    }

    /// Level for an offset. Strictly greater than the threshold is solid.
    #[must_use]
    pub fn level_for(&self, offset: f64) -> NavbarLevel {
        if offset > self.config.threshold {
            NavbarLevel::Solid
        } else {
            NavbarLevel::Translucent
        }
    }

    pub fn on_scroll(&mut self, surfaces: &mut SurfaceTree, offset: f64) -> Option<NavbarLevel> {
        let navbar = self.navbar?;
        let level = self.level_for(offset);
        let background = match level {
            NavbarLevel::Solid => &self.config.solid_background,
            NavbarLevel::Translucent => &self.config.translucent_background,
        };
        match surfaces.set_style(Owner::ScrollWatcher, navbar, "background", background.as_str()) {
            Ok(_) => {
                self.level = Some(level);
                Some(level)
            }
            Err(err) => {
                tracing::debug!(%err, "navbar unavailable");
                None
            }
        }
    }

    /// Last level applied.
    #[must_use]
    pub fn level(&self) -> Option<NavbarLevel> {
        self.level
    }
}
