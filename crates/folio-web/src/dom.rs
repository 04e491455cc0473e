#![forbid(unsafe_code)]

//! Browser side of the surface patch contract.
//!
//! [`discover`] walks the live document once at construction, stamping group
//! members with `data-folio-key` and filling in their layout. [`apply`]
//! replays a patch batch onto the document. A patch whose target is missing
//! is logged and skipped; the rest of the batch still applies. [`measure`]
//! reads the current layout of observed surfaces after the page changed
//! shape.

use folio_core::PageShape;
use folio_core::page::{CounterHook, RevealHook, counter_key, reveal_key};
use folio_core::surface::SurfacePatch;
use folio_core::viewport::Rect;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    Document, Element, HtmlElement, HtmlFormElement, ScrollBehavior, ScrollIntoViewOptions,
    ScrollLogicalPosition, Window,
};

const KEY_ATTR: &str = "data-folio-key";

fn js_error(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

fn layout(window: &Window, element: &Element) -> Rect {
    let rect = element.get_bounding_client_rect();
    let scroll_y = window.scroll_y().unwrap_or(0.0);
    Rect::new(rect.top() + scroll_y, rect.height())
}

fn stamp_group(document: &Document, selector: &str, key: impl Fn(usize) -> String) -> Vec<Element> {
    let Ok(nodes) = document.query_selector_all(selector) else {
        tracing::warn!(selector, "group selector rejected by the document");
        return Vec::new();
    };
    let mut stamped = Vec::new();
    for index in 0..nodes.length() {
        let Some(element) = nodes.get(index).and_then(|node| node.dyn_into::<Element>().ok())
        else {
            continue;
        };
        let position = stamped.len();
        if let Err(err) = element.set_attribute(KEY_ATTR, &key(position)) {
            tracing::warn!(selector, error = %js_error(&err), "could not stamp group member");
            continue;
        }
        stamped.push(element);
    }
    stamped
}

/// Fill `shape` with what the live document holds: counter targets, group
/// members, section and group layout, and the viewport height.
pub fn discover(document: &Document, window: &Window, shape: &mut PageShape, target_attr: &str) {
    let counters = stamp_group(document, &shape.counter_selector, counter_key);
    shape.counters = counters
        .iter()
        .map(|element| CounterHook {
            target: element.get_attribute(target_attr).unwrap_or_default(),
            rect: Some(layout(window, element)),
        })
        .collect();

    let revealables = stamp_group(document, &shape.reveal_selector, reveal_key);
    shape.revealables = revealables
        .iter()
        .map(|element| RevealHook {
            rect: Some(layout(window, element)),
        })
        .collect();

    for section in &mut shape.sections {
        if let Some(element) = document.get_element_by_id(&section.id) {
            section.rect = Some(layout(window, &element));
        }
    }

    if let Some(height) = window.inner_height().ok().and_then(|h| h.as_f64()) {
        shape.viewport_height = height;
    }
    tracing::debug!(
        counters = shape.counters.len(),
        revealables = shape.revealables.len(),
        viewport_height = shape.viewport_height,
        "page discovered"
    );
}

/// Page-relative layout of each `(key, selector)` target still in the
/// document.
pub fn measure(
    document: &Document,
    window: &Window,
    targets: &[(String, String)],
) -> Vec<(String, Rect)> {
    targets
        .iter()
        .filter_map(|(key, selector)| match document.query_selector(selector) {
            Ok(Some(element)) => Some((key.clone(), layout(window, &element))),
            Ok(None) => None,
            Err(err) => {
                tracing::debug!(%key, error = %js_error(&err), "target not measurable");
                None
            }
        })
        .collect()
}

fn select(document: &Document, selector: &str) -> Result<Element, String> {
    match document.query_selector(selector) {
        Ok(Some(element)) => Ok(element),
        Ok(None) => Err("no element matches".into()),
        Err(err) => Err(js_error(&err)),
    }
}

fn set_style(element: &Element, property: &str, value: &str) -> Result<(), String> {
    let html = element
        .dyn_ref::<HtmlElement>()
        .ok_or_else(|| "element has no inline style".to_owned())?;
    html.style().set_property(property, value).map_err(|err| js_error(&err))
}

fn apply_one(document: &Document, patch: &SurfacePatch) -> Result<(), String> {
    let target = select(document, patch.target())?;
    match patch {
        SurfacePatch::SetText { text, .. } => target.set_text_content(Some(text)),
        SurfacePatch::AddClass { class, .. } => {
            target.class_list().add_1(class).map_err(|err| js_error(&err))?;
        }
        SurfacePatch::RemoveClass { class, .. } => {
            target.class_list().remove_1(class).map_err(|err| js_error(&err))?;
        }
        SurfacePatch::SetStyle {
            property, value, ..
        } => set_style(&target, property, value)?,
        SurfacePatch::Append {
            key,
            tag,
            classes,
            text,
            html,
            styles,
            ..
        } => {
            let child = document.create_element(tag).map_err(|err| js_error(&err))?;
            child.set_attribute(KEY_ATTR, key).map_err(|err| js_error(&err))?;
            for class in classes {
                child.class_list().add_1(class).map_err(|err| js_error(&err))?;
            }
            if let Some(text) = text {
                child.set_text_content(Some(text));
            }
            if let Some(html) = html {
                child.set_inner_html(html);
            }
            for decl in styles {
                set_style(&child, &decl.property, &decl.value)?;
            }
            target.append_child(&child).map_err(|err| js_error(&err))?;
        }
        SurfacePatch::Remove { .. } => target.remove(),
        SurfacePatch::ClearChildren { .. } => target.set_inner_html(""),
        SurfacePatch::ScrollIntoView { smooth, .. } => {
            let options = ScrollIntoViewOptions::new();
            options.set_block(ScrollLogicalPosition::Start);
            options.set_behavior(if *smooth {
                ScrollBehavior::Smooth
            } else {
                ScrollBehavior::Auto
            });
            target.scroll_into_view_with_scroll_into_view_options(&options);
        }
        SurfacePatch::ResetForm { .. } => target
            .dyn_ref::<HtmlFormElement>()
            .ok_or_else(|| "target is not a form".to_owned())?
            .reset(),
    }
    Ok(())
}

/// Apply a batch in order. Returns how many patches took effect.
pub fn apply(document: &Document, patches: &[SurfacePatch]) -> usize {
    let mut applied = 0;
    for patch in patches {
        match apply_one(document, patch) {
            Ok(()) => applied += 1,
            Err(reason) => {
                tracing::warn!(selector = patch.target(), %reason, "patch skipped");
            }
        }
    }
    applied
}
