#![forbid(unsafe_code)]

//! `wasm-bindgen` exports for the PortfolioRunner.
//!
//! This module wraps [`super::runner_core::RunnerCore`] with JS-friendly types.
//! Only compiled on `wasm32` targets.

use folio_core::{PageEvent, PageShape, PortfolioConfig};
use js_sys::{Array, Object, Reflect};
use tracing::Level;
use wasm_bindgen::prelude::*;
use web_sys::Document;

use super::dom;
use super::runner_core::{RunnerCore, SourceChoice, changes_layout};

fn install_panic_hook() {
    use std::sync::Once;

    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        // The hook info already carries the panic location.
        std::panic::set_hook(Box::new(|info| {
            web_sys::console::error_1(&format!("folio: {info}").into());
        }));
    });
}

/// WASM runner for the portfolio page.
///
/// Host-driven: JavaScript forwards page events as JSON inputs, advances time
/// from `requestAnimationFrame`, and applies the resulting patches.
#[wasm_bindgen]
pub struct PortfolioRunner {
    inner: RunnerCore,
    document: Option<Document>,
}

#[wasm_bindgen(start)]
pub fn wasm_start() {
    install_panic_hook();
}

#[wasm_bindgen]
impl PortfolioRunner {
    /// Create a runner. Empty strings select the default configuration and
    /// the standard page. When a document is present, counters, revealable
    /// items and their layout are discovered from it.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str, shape_json: &str) -> Result<PortfolioRunner, JsValue> {
        install_panic_hook();
        let config =
            PortfolioConfig::from_json(config_json).map_err(|e| JsValue::from_str(&e.to_string()))?;
        let mut shape =
            PageShape::from_json(shape_json).map_err(|e| JsValue::from_str(&e.to_string()))?;

        let window = web_sys::window();
        let document = window.as_ref().and_then(web_sys::Window::document);
        if let (Some(window), Some(document)) = (&window, &document) {
            dom::discover(document, window, &mut shape, &config.counter.target_attr);
        }

        let inner = RunnerCore::from_parts(config, &shape, Level::DEBUG)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(Self { inner, document })
    }

    /// Let the host answer the project fetch with a `projects` or
    /// `projects_failed` input. Call before `init`.
    #[wasm_bindgen(js_name = useHostSource)]
    pub fn use_host_source(&mut self) {
        self.inner.set_source(SourceChoice::Host);
    }

    /// Serve projects from a JSON array. Call before `init`.
    #[wasm_bindgen(js_name = setProjectsJson)]
    pub fn set_projects_json(&mut self, json: String) {
        self.inner.set_source(SourceChoice::Json(json));
    }

    /// Change the log capture level. Returns `false` for an unknown name.
    #[wasm_bindgen(js_name = setLogLevel)]
    pub fn set_log_level(&mut self, level: &str) -> bool {
        self.inner.set_log_level(level)
    }

    /// Wire the page. Call exactly once.
    pub fn init(&mut self) {
        self.inner.init();
    }

    /// Advance deterministic clock by `dt_ms` milliseconds (real-time mode).
    #[wasm_bindgen(js_name = advanceTime)]
    pub fn advance_time(&mut self, dt_ms: f64) {
        self.inner.advance_time_ms(dt_ms);
    }

    /// Set deterministic clock to absolute milliseconds (replay mode).
    #[wasm_bindgen(js_name = setTime)]
    pub fn set_time(&mut self, ts_ms: f64) {
        self.inner.set_time_ms(ts_ms);
    }

    /// Parse a JSON-encoded input and queue it.
    /// Returns `true` if accepted, `false` if unsupported/malformed.
    #[wasm_bindgen(js_name = pushEncodedInput)]
    pub fn push_encoded_input(&mut self, json: &str) -> bool {
        self.inner.push_encoded_input(json)
    }

    /// Apply queued inputs and fire due timers.
    /// Returns `{ running, events_processed, patches_pending, now_ms }`.
    pub fn step(&mut self) -> JsValue {
        let result = self.inner.step();
        let obj = Object::new();
        let _ = Reflect::set(&obj, &"running".into(), &result.running.into());
        let _ = Reflect::set(
            &obj,
            &"events_processed".into(),
            &result.events_processed.into(),
        );
        let _ = Reflect::set(
            &obj,
            &"patches_pending".into(),
            &JsValue::from_f64(result.patches_pending as f64),
        );
        let _ = Reflect::set(&obj, &"now_ms".into(), &JsValue::from_f64(result.now_ms));
        obj.into()
    }

    /// Drain pending patches as a JSON array, for hosts applying them
    /// themselves.
    #[wasm_bindgen(js_name = takePatches)]
    pub fn take_patches(&mut self) -> String {
        self.inner.take_patches_json()
    }

    /// Drain pending patches and apply them to the document. When the batch
    /// adds or removes elements, observed surfaces are measured again and
    /// their layout is queued for the next `step`.
    /// Returns the number of patches that took effect.
    #[wasm_bindgen(js_name = applyPatches)]
    pub fn apply_patches(&mut self) -> u32 {
        let patches = self.inner.take_patches();
        let Some(document) = &self.document else {
            return 0;
        };
        let applied = self.inner.in_log_scope(|| dom::apply(document, &patches));
        if changes_layout(&patches) {
            self.remeasure();
        }
        u32::try_from(applied).unwrap_or(u32::MAX)
    }

    /// Measure every observed surface and queue `layout` inputs. Hosts call
    /// this after anything else that moves content (fonts, images, resize).
    pub fn remeasure(&mut self) {
        let (Some(window), Some(document)) = (web_sys::window(), &self.document) else {
            return;
        };
        let targets = self.inner.layout_targets();
        let rects = self
            .inner
            .in_log_scope(|| dom::measure(document, &window, &targets));
        for (key, rect) in rects {
            self.inner.push_event(PageEvent::Layout { key, rect });
        }
    }

    /// Observed surfaces as `Array<[key, selector]>`, for hosts that apply
    /// patches and measure layout themselves.
    #[wasm_bindgen(js_name = layoutTargets)]
    pub fn layout_targets(&self) -> Array {
        let arr = Array::new();
        for (key, selector) in self.inner.layout_targets() {
            arr.push(&Array::of2(&JsValue::from_str(&key), &JsValue::from_str(&selector)));
        }
        arr
    }

    /// Drain accumulated log lines. Returns `Array<string>`.
    #[wasm_bindgen(js_name = takeLogs)]
    pub fn take_logs(&mut self) -> Array {
        let logs = self.inner.take_logs();
        let arr = Array::new();
        for log in logs {
            arr.push(&JsValue::from_str(&log));
        }
        arr
    }

    /// Page time in milliseconds.
    #[wasm_bindgen(js_name = nowMs)]
    pub fn now_ms(&self) -> f64 {
        self.inner.now_ms()
    }

    /// Whether the page is still wired.
    #[wasm_bindgen(js_name = isRunning)]
    pub fn is_running(&self) -> bool {
        self.inner.is_running()
    }

    /// Cancel every timer and observation.
    pub fn teardown(&mut self) {
        self.inner.teardown();
    }

    /// Release resources. Tears the page down first.
    pub fn destroy(&mut self) {
        self.inner.teardown();
        self.document = None;
    }
}
