#![forbid(unsafe_code)]

//! Core: the portfolio page's effects as deterministic state machines.
//!
//! # Role in folio
//! `folio-core` is platform-independent. It never touches a real document
//! and never reads a wall clock; hosts feed it [`event::PageEvent`] values
//! and page time, and collect [`surface::SurfacePatch`] values to apply.
//!
//! # Primary responsibilities
//! - **Portfolio**: wiring order, event dispatch, timer dispatch, teardown.
//! - **Effects**: typing, counters, reveal, notifications.
//! - **Handlers**: navigation menu, navbar scroll styling, project gallery,
//!   contact form.
//! - **Plumbing**: virtual timer queue, surface ownership, viewport
//!   intersection subscriptions.
//!
//! # How it fits in the system
//! `folio-web` wraps [`portfolio::Portfolio`] in a host-driven runner and,
//! on `wasm32`, applies patches to the browser DOM.

pub mod config;
pub mod contact;
pub mod counter;
pub mod error;
pub mod event;
pub mod gallery;
pub mod navigation;
pub mod notification;
pub mod page;
pub mod portfolio;
pub mod project;
pub mod reveal;
pub mod scroll_watch;
pub mod surface;
pub mod timer;
pub mod typing;
pub mod viewport;

pub use config::{ConfigError, PortfolioConfig};
pub use error::PortfolioError;
pub use event::PageEvent;
pub use page::PageShape;
pub use portfolio::{Lifecycle, Portfolio};
pub use project::{ProjectRecord, ProjectSource, SourceError};
pub use surface::SurfacePatch;
