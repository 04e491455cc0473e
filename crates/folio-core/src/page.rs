#![forbid(unsafe_code)]

//! Page shape: which hooks exist and how to address them.
//!
//! Single hooks are addressed by their own selector. Group hooks (counters,
//! revealable items) are matched by a group selector on the host, which
//! stamps each match with `data-folio-key`; instance `i` of a group is then
//! addressed by that key.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::viewport::Rect;

pub const BODY_KEY: &str = "body";
pub const NAVBAR_KEY: &str = "navbar";
pub const HAMBURGER_KEY: &str = "hamburger";
pub const NAV_MENU_KEY: &str = "nav-menu";
pub const TYPING_KEY: &str = "typing-text";
pub const PROJECTS_GRID_KEY: &str = "projects-grid";
pub const CONTACT_FORM_KEY: &str = "contact-form";

#[must_use]
pub fn section_key(id: &str) -> String {
    format!("section-{id}")
}

#[must_use]
pub fn counter_key(index: usize) -> String {
    format!("counter-{index}")
}

#[must_use]
pub fn reveal_key(index: usize) -> String {
    format!("reveal-{index}")
}

/// Selector for a surface the host stamped with `key`.
#[must_use]
pub fn keyed_selector(key: &str) -> String {
    format!("[data-folio-key=\"{key}\"]")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionHook {
    /// Element id, addressed by `#id` links.
    pub id: String,
    #[serde(default)]
    pub rect: Option<Rect>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterHook {
    /// Raw value of the target attribute.
    pub target: String,
    #[serde(default)]
    pub rect: Option<Rect>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RevealHook {
    #[serde(default)]
    pub rect: Option<Rect>,
}

/// Hooks present on the page. Absent hooks disable their component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageShape {
    pub body: Option<String>,
    pub navbar: Option<String>,
    pub hamburger: Option<String>,
    pub nav_menu: Option<String>,
    /// Group selector the host binds link clicks on.
    pub nav_links: String,
    pub sections: Vec<SectionHook>,
    pub typing_text: Option<String>,
    pub counter_selector: String,
    pub counters: Vec<CounterHook>,
    pub projects_grid: Option<String>,
    pub contact_form: Option<String>,
    pub reveal_selector: String,
    pub revealables: Vec<RevealHook>,
    pub viewport_height: f64,
}

impl Default for PageShape {
    fn default() -> Self {
        Self::standard()
    }
}

impl PageShape {
    /// The stock portfolio page. Group instances are discovered by the host.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            body: Some("body".into()),
            navbar: Some(".navbar".into()),
            hamburger: Some(".hamburger".into()),
            nav_menu: Some(".nav-menu".into()),
            nav_links: ".nav-link".into(),
            sections: ["home", "about", "skills", "projects", "contact"]
                .into_iter()
                .map(|id| SectionHook {
                    id: id.into(),
                    rect: None,
                })
                .collect(),
            typing_text: Some(".typing-text".into()),
            counter_selector: ".stat-number".into(),
            counters: Vec::new(),
            projects_grid: Some("#projects-grid".into()),
            contact_form: Some("#contact-form".into()),
            reveal_selector: ".skill-item, .contact-item".into(),
            revealables: Vec::new(),
            viewport_height: 800.0,
        }
    }

    /// A page with no hooks at all.
    #[must_use]
    pub fn bare() -> Self {
        Self {
            body: None,
            navbar: None,
            hamburger: None,
            nav_menu: None,
            sections: Vec::new(),
            typing_text: None,
            projects_grid: None,
            contact_form: None,
            ..Self::standard()
        }
    }

    /// Parse from JSON. An empty string yields [`PageShape::standard`].
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        if json.trim().is_empty() {
            return Ok(Self::standard());
        }
        serde_json::from_str(json).map_err(|e| ConfigError::Json(e.to_string()))
    }

    #[must_use]
    pub fn with_counter(mut self, target: impl Into<String>, rect: Option<Rect>) -> Self {
        self.counters.push(CounterHook {
            target: target.into(),
            rect,
        });
        self
    }

    #[must_use]
    pub fn with_revealable(mut self, rect: Option<Rect>) -> Self {
        self.revealables.push(RevealHook { rect });
        self
    }

    /// Set the rect of an existing section, or add it.
    #[must_use]
    pub fn with_section(mut self, id: impl Into<String>, rect: Option<Rect>) -> Self {
        let id = id.into();
        match self.sections.iter_mut().find(|s| s.id == id) {
            Some(section) => section.rect = rect,
            None => self.sections.push(SectionHook { id, rect }),
        }
        self
    }
}
