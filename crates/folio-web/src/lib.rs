#![forbid(unsafe_code)]

//! Host-driven runner for the folio portfolio page.
//!
//! [`runner_core::RunnerCore`] wraps [`folio_core::Portfolio`] with a JSON
//! input protocol, a deterministic clock the host advances, and drainable
//! patch and log outboxes. On `wasm32` the `PortfolioRunner` export wraps
//! the core for JavaScript and applies patches to the live document.

pub mod input_parser;
pub mod logging;
pub mod runner_core;

#[cfg(target_arch = "wasm32")]
mod dom;
#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::PortfolioRunner;
