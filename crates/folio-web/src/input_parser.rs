#![forbid(unsafe_code)]

//! JSON input parser for page inputs sent by the browser host.
//!
//! Each input is one JSON object with a `kind` discriminator:
//!
//! | kind              | fields                                  |
//! |-------------------|-----------------------------------------|
//! | `menu_toggle`     |                                         |
//! | `nav_click`       | `href`                                  |
//! | `scroll`          | `offset`                                |
//! | `viewport`        | `height`                                |
//! | `layout`          | `key`, `top`, `height`                  |
//! | `intersection`    | `key`, `ratio`, `intersecting`          |
//! | `submit`          | `name`, `email`, `message`              |
//! | `projects`        | `records` (array of project objects)    |
//! | `projects_failed` | `reason`                                |
//!
//! Unknown kinds return `Ok(None)` so newer hosts can talk to older cores.

use folio_core::PageEvent;
use folio_core::contact::ContactFields;
use folio_core::project::{ProjectRecord, SourceError};
use folio_core::viewport::Rect;
use serde::Deserialize;

/// Errors from parsing encoded input JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputParseError {
    /// Malformed JSON.
    Json(String),
    /// Missing required field.
    MissingField(&'static str),
}

impl core::fmt::Display for InputParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Json(msg) => write!(f, "JSON parse error: {msg}"),
            Self::MissingField(field) => write!(f, "missing required field: {field}"),
        }
    }
}

impl std::error::Error for InputParseError {}

#[derive(Debug, Deserialize)]
struct RawInput {
    kind: String,
    #[serde(default)]
    href: Option<String>,
    #[serde(default)]
    offset: Option<f64>,
    #[serde(default)]
    height: Option<f64>,
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    top: Option<f64>,
    #[serde(default)]
    ratio: Option<f64>,
    #[serde(default)]
    intersecting: Option<bool>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    records: Option<serde_json::Value>,
    #[serde(default)]
    reason: Option<String>,
}

/// Parse one JSON-encoded page input.
///
/// A `projects` input whose records do not match the project schema is not
/// an input error: it becomes a failed fetch so the gallery can leave its
/// loading state.
pub fn parse_page_input(json: &str) -> Result<Option<PageEvent>, InputParseError> {
    let raw: RawInput =
        serde_json::from_str(json).map_err(|e| InputParseError::Json(e.to_string()))?;

    let event = match raw.kind.as_str() {
        "menu_toggle" => PageEvent::MenuToggle,
        "nav_click" => PageEvent::NavClick {
            href: raw.href.ok_or(InputParseError::MissingField("href"))?,
        },
        "scroll" => PageEvent::Scroll {
            offset: raw.offset.ok_or(InputParseError::MissingField("offset"))?,
        },
        "viewport" => PageEvent::ViewportResize {
            height: raw.height.ok_or(InputParseError::MissingField("height"))?,
        },
        "layout" => PageEvent::Layout {
            key: raw.key.ok_or(InputParseError::MissingField("key"))?,
            rect: Rect::new(
                raw.top.ok_or(InputParseError::MissingField("top"))?,
                raw.height.ok_or(InputParseError::MissingField("height"))?,
            ),
        },
        "intersection" => PageEvent::Intersection {
            key: raw.key.ok_or(InputParseError::MissingField("key"))?,
            ratio: raw.ratio.ok_or(InputParseError::MissingField("ratio"))?,
            intersecting: raw.intersecting.unwrap_or(true),
        },
        // Absent form fields read as empty, which validation then rejects.
        "submit" => PageEvent::Submit(ContactFields {
            name: raw.name.unwrap_or_default(),
            email: raw.email.unwrap_or_default(),
            message: raw.message.unwrap_or_default(),
        }),
        "projects" => {
            let records = raw.records.ok_or(InputParseError::MissingField("records"))?;
            PageEvent::ProjectsLoaded(
                serde_json::from_value::<Vec<ProjectRecord>>(records)
                    .map_err(|e| SourceError::Malformed(e.to_string())),
            )
        }
        "projects_failed" => PageEvent::ProjectsLoaded(Err(SourceError::Unavailable(
            raw.reason.unwrap_or_else(|| "unknown".into()),
        ))),
        _ => return Ok(None),
    };
    Ok(Some(event))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(json: &str) -> PageEvent {
        parse_page_input(json).unwrap().unwrap()
    }

    #[test]
    fn menu_toggle() {
        assert_eq!(parse(r#"{"kind":"menu_toggle"}"#), PageEvent::MenuToggle);
    }

    #[test]
    fn nav_click() {
        assert_eq!(
            parse(r##"{"kind":"nav_click","href":"#about"}"##),
            PageEvent::NavClick {
                href: "#about".into()
            }
        );
    }

    #[test]
    fn scroll_and_viewport() {
        assert_eq!(
            parse(r#"{"kind":"scroll","offset":120.5}"#),
            PageEvent::Scroll { offset: 120.5 }
        );
        assert_eq!(
            parse(r#"{"kind":"viewport","height":900}"#),
            PageEvent::ViewportResize { height: 900.0 }
        );
    }

    #[test]
    fn layout() {
        assert_eq!(
            parse(r#"{"kind":"layout","key":"counter-1","top":1400,"height":48}"#),
            PageEvent::Layout {
                key: "counter-1".into(),
                rect: Rect::new(1_400.0, 48.0),
            }
        );
    }

    #[test]
    fn intersection_defaults_to_intersecting() {
        assert_eq!(
            parse(r#"{"kind":"intersection","key":"reveal-0","ratio":0.3}"#),
            PageEvent::Intersection {
                key: "reveal-0".into(),
                ratio: 0.3,
                intersecting: true,
            }
        );
    }

    #[test]
    fn submit_with_missing_fields_reads_empty() {
        assert_eq!(
            parse(r#"{"kind":"submit","name":"Ada"}"#),
            PageEvent::Submit(ContactFields::new("Ada", "", ""))
        );
    }

    #[test]
    fn projects_github_schema() {
        let event = parse(
            r#"{"kind":"projects","records":[{"name":"r","stargazers_count":2,"forks_count":1,"html_url":"https://github.com/u/r","description":null,"language":"Rust"}]}"#,
        );
        let PageEvent::ProjectsLoaded(Ok(records)) = event else {
            panic!("expected loaded projects, got {event:?}");
        };
        assert_eq!(records[0].stars, 2);
        assert_eq!(records[0].url, "https://github.com/u/r");
    }

    #[test]
    fn projects_with_bad_records_become_a_failed_fetch() {
        let event = parse(r#"{"kind":"projects","records":{"oops":true}}"#);
        assert!(matches!(
            event,
            PageEvent::ProjectsLoaded(Err(SourceError::Malformed(_)))
        ));
    }

    #[test]
    fn projects_failed() {
        assert_eq!(
            parse(r#"{"kind":"projects_failed","reason":"HTTP 404"}"#),
            PageEvent::ProjectsLoaded(Err(SourceError::Unavailable("HTTP 404".into())))
        );
    }

    #[test]
    fn unknown_kind_is_skipped() {
        assert_eq!(parse_page_input(r#"{"kind":"hover"}"#), Ok(None));
    }

    #[test]
    fn missing_required_field() {
        assert_eq!(
            parse_page_input(r#"{"kind":"scroll"}"#),
            Err(InputParseError::MissingField("offset"))
        );
        assert_eq!(
            parse_page_input(r#"{"kind":"layout","key":"x","height":3}"#),
            Err(InputParseError::MissingField("top"))
        );
    }

    #[test]
    fn malformed_json() {
        assert!(matches!(
            parse_page_input("{kind:"),
            Err(InputParseError::Json(_))
        ));
    }
}
