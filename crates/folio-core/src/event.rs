#![forbid(unsafe_code)]

//! Page input events.
//!
//! Surfaces are addressed by their stable key so events can be replayed
//! from a log without knowing surface ids.

use crate::contact::ContactFields;
use crate::project::ProjectFetch;
use crate::viewport::Rect;

#[derive(Debug, Clone, PartialEq)]
pub enum PageEvent {
    /// The mobile menu trigger was clicked.
    MenuToggle,
    /// A navigation link was clicked.
    NavClick { href: String },
    /// The document scrolled to this vertical offset.
    Scroll { offset: f64 },
    /// The viewport height changed.
    ViewportResize { height: f64 },
    /// Host layout for a surface.
    Layout { key: String, rect: Rect },
    /// A host-computed intersection sample.
    Intersection {
        key: String,
        ratio: f64,
        intersecting: bool,
    },
    /// The contact form was submitted.
    Submit(ContactFields),
    /// A deferred project fetch finished.
    ProjectsLoaded(ProjectFetch),
}

impl PageEvent {
    /// Short name for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MenuToggle => "menu_toggle",
            Self::NavClick { .. } => "nav_click",
            Self::Scroll { .. } => "scroll",
            Self::ViewportResize { .. } => "viewport",
            Self::Layout { .. } => "layout",
            Self::Intersection { .. } => "intersection",
            Self::Submit(_) => "submit",
            Self::ProjectsLoaded(Ok(_)) => "projects",
            Self::ProjectsLoaded(Err(_)) => "projects_failed",
        }
    }
}
