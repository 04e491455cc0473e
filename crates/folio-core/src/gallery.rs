#![forbid(unsafe_code)]

//! Project grid population.
//!
//! The loader is a small state machine:
//!
//! ```text
//! Idle --begin--> Loading --render(Ok(non-empty))--> Loaded(n)
//!                         --render(Ok(empty))------> Empty
//!                         --render(Err(reason))----> Failed(reason)
//! ```
//!
//! Every terminal state clears the grid first, so the loading placeholder
//! never outlives the fetch. Cards are handed to the reveal animator on
//! creation.

use maud::html;

use crate::config::GalleryConfig;
use crate::project::{ProjectFetch, ProjectRecord};
use crate::surface::{NewSurface, Owner, SurfaceId, SurfaceTree};

pub const CARD_CLASS: &str = "project-card";
const EMPTY_KEY: &str = "projects-empty";
const ERROR_KEY: &str = "projects-error";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GalleryState {
    #[default]
    Idle,
    Loading,
    Loaded(usize),
    Empty,
    Failed(String),
}

impl GalleryState {
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

#[derive(Debug)]
pub struct GalleryLoader {
    grid: Option<SurfaceId>,
    config: GalleryConfig,
    state: GalleryState,
    cards: Vec<SurfaceId>,
}

impl GalleryLoader {
    #[must_use]
    pub fn new(grid: Option<SurfaceId>, config: GalleryConfig) -> Self {
        Self {
            grid,
            config,
            state: GalleryState::Idle,
            cards: Vec::new(),
        }
    }

    /// Enter `Loading`. Returns `false` without a grid hook.
    pub fn begin(&mut self) -> bool {
        if self.grid.is_none() {
            tracing::debug!("projects grid absent; gallery idle");
            return false;
        }
        self.state = GalleryState::Loading;
        true
    }

    /// Render a fetch result. Returns the card surfaces created; results
    /// that arrive outside `Loading` are dropped.
    pub fn render(&mut self, surfaces: &mut SurfaceTree, result: ProjectFetch) -> Vec<SurfaceId> {
        let Some(grid) = self.grid else {
            return Vec::new();
        };
        if !self.state.is_loading() {
            tracing::warn!(state = ?self.state, "project result ignored: gallery not loading");
            return Vec::new();
        }
        if let Err(err) = surfaces.clear_children(Owner::Gallery, grid) {
            tracing::warn!(%err, "projects grid unusable");
            self.state = GalleryState::Failed(err.to_string());
            return Vec::new();
        }
        self.cards.clear();

        match result {
            Ok(records) if records.is_empty() => {
                self.placeholder(surfaces, grid, EMPTY_KEY, self.config.empty_message.clone());
                self.state = GalleryState::Empty;
            }
            Ok(records) => {
                for (index, record) in records.iter().enumerate() {
                    let node = NewSurface::new(format!("project-card-{index}"), "div")
                        .with_class(CARD_CLASS)
                        .with_html(card_html(record, &self.config));
                    match surfaces.append_child(Owner::Gallery, grid, Owner::Reveal, node) {
                        Ok(card) => self.cards.push(card),
                        Err(err) => tracing::warn!(%err, project = %record.name, "card skipped"),
                    }
                }
                tracing::debug!(cards = self.cards.len(), "projects rendered");
                self.state = GalleryState::Loaded(self.cards.len());
            }
            Err(err) => {
                tracing::warn!(%err, "project source failed");
                self.placeholder(surfaces, grid, ERROR_KEY, self.config.error_message.clone());
                self.state = GalleryState::Failed(err.to_string());
            }
        }
        self.cards.clone()
    }

    #[must_use]
    pub fn state(&self) -> &GalleryState {
        &self.state
    }

    #[must_use]
    pub fn cards(&self) -> &[SurfaceId] {
        &self.cards
    }

    /// Message shown in the failed state.
    #[must_use]
    pub fn error_message(&self) -> &str {
        &self.config.error_message
    }

    fn placeholder(&self, surfaces: &mut SurfaceTree, grid: SurfaceId, key: &str, message: String) {
        let node = NewSurface::new(key, "p").with_class(key).with_text(message);
        if let Err(err) = surfaces.append_child(Owner::Gallery, grid, Owner::Gallery, node) {
            tracing::warn!(%err, key, "gallery placeholder not attached");
        }
    }
}

/// Inner markup of one project card. Interpolated fields are escaped.
#[must_use]
pub fn card_html(record: &ProjectRecord, config: &GalleryConfig) -> String {
    let color = config.language_color(&record.language);
    html! {
        div class="project-header" {
            h3 class="project-title" { (record.name) }
            div class="project-links" {
                a href=(record.url) target="_blank" class="project-link" {
                    i class="fab fa-github" {}
                }
                a href="#" class="project-link" {
                    i class="fas fa-external-link-alt" {}
                }
            }
        }
        p class="project-description" { (record.description) }
        div class="project-footer" {
            div class="project-language" {
                span class="language-dot" style={ "background-color: " (color) } {}
                (record.language)
            }
            div class="project-stats" {
                span class="stat" { i class="fas fa-star" {} (record.stars) }
                span class="stat" { i class="fas fa-code-branch" {} (record.forks) }
            }
        }
    }
    .into_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{SourceError, sample_projects};
    use pretty_assertions::assert_eq;

    fn setup() -> (SurfaceTree, GalleryLoader, SurfaceId) {
        let mut surfaces = SurfaceTree::new();
        let grid = surfaces.register_hook("projects-grid", "#projects-grid", Owner::Gallery).unwrap();
        (surfaces, GalleryLoader::new(Some(grid), GalleryConfig::default()), grid)
    }

    #[test]
    fn loaded_cards_belong_to_reveal() {
        let (mut surfaces, mut gallery, grid) = setup();
        assert!(gallery.begin());
        let cards = gallery.render(&mut surfaces, Ok(sample_projects()));
        assert_eq!(cards.len(), 4);
        assert_eq!(gallery.state(), &GalleryState::Loaded(4));
        assert_eq!(surfaces.get(grid).unwrap().children(), cards.as_slice());
        let first = surfaces.get(cards[0]).unwrap();
        assert_eq!(first.owner(), Owner::Reveal);
        assert!(first.has_class(CARD_CLASS));
        assert!(first.html().unwrap().contains("Modern Portfolio Website"));
    }

    #[test]
    fn placeholder_is_cleared_before_cards() {
        let (mut surfaces, mut gallery, _) = setup();
        gallery.begin();
        gallery.render(&mut surfaces, Ok(sample_projects()));
        let patches = surfaces.take_patches();
        assert!(matches!(
            patches.first(),
            Some(crate::surface::SurfacePatch::ClearChildren { .. })
        ));
    }

    #[test]
    fn empty_result_shows_empty_state() {
        let (mut surfaces, mut gallery, grid) = setup();
        gallery.begin();
        assert!(gallery.render(&mut surfaces, Ok(Vec::new())).is_empty());
        assert_eq!(gallery.state(), &GalleryState::Empty);
        let children = surfaces.get(grid).unwrap().children().to_vec();
        assert_eq!(children.len(), 1);
        assert_eq!(surfaces.get(children[0]).unwrap().text(), "No projects to show yet.");
    }

    #[test]
    fn failure_shows_error_state() {
        let (mut surfaces, mut gallery, _) = setup();
        gallery.begin();
        gallery.render(&mut surfaces, Err(SourceError::Unavailable("offline".into())));
        assert_eq!(
            gallery.state(),
            &GalleryState::Failed("project source unavailable: offline".into())
        );
        let error = surfaces.find("projects-error").unwrap();
        assert_eq!(surfaces.get(error).unwrap().text(), "Projects could not be loaded.");
    }

    #[test]
    fn results_outside_loading_are_ignored() {
        let (mut surfaces, mut gallery, _) = setup();
        assert!(gallery.render(&mut surfaces, Ok(sample_projects())).is_empty());
        assert_eq!(gallery.state(), &GalleryState::Idle);
        assert!(surfaces.pending_patches().is_empty());
    }

    #[test]
    fn missing_grid_never_loads() {
        let mut gallery = GalleryLoader::new(None, GalleryConfig::default());
        assert!(!gallery.begin());
        assert_eq!(gallery.state(), &GalleryState::Idle);
    }

    #[test]
    fn card_markup_escapes_and_colors() {
        let record = ProjectRecord {
            name: "<script>".into(),
            description: "a & b".into(),
            language: "Haskell".into(),
            stars: 3,
            forks: 1,
            url: "https://x/?a=\"1\"".into(),
        };
        let html = card_html(&record, &GalleryConfig::default());
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("a &amp; b"));
        assert!(html.contains("background-color: #666"));
        assert!(html.contains("href=\"https://x/?a=&quot;1&quot;\""));
        assert!(html.contains("fa-star\"></i>3</span>"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn card_markup_structure() {
        let record = ProjectRecord {
            name: "folio".into(),
            description: "page".into(),
            language: "Rust".into(),
            stars: 7,
            forks: 2,
            url: "https://example.com/folio".into(),
        };
        let html = card_html(&record, &GalleryConfig::default());
        assert!(html.starts_with(r#"<div class="project-header"><h3 class="project-title">folio</h3>"#));
        assert!(html.contains(
            r#"<a href="https://example.com/folio" target="_blank" class="project-link"><i class="fab fa-github"></i></a>"#
        ));
        assert!(html.contains(r#"<p class="project-description">page</p>"#));
        assert!(html.contains(r#"<i class="fas fa-code-branch"></i>2</span>"#));
    }

    #[test]
    fn known_language_gets_its_color() {
        let record = sample_projects().remove(2);
        assert!(card_html(&record, &GalleryConfig::default()).contains("#3776ab"));
    }
}
