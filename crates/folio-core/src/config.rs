#![forbid(unsafe_code)]

//! Tunables for every effect on the page.
//!
//! All sections deserialize with defaults, so a host may pass `{}` (or
//! nothing) and override only what it needs:
//!
//! ```
//! use folio_core::config::PortfolioConfig;
//!
//! let config = PortfolioConfig::from_json(r#"{"scroll":{"threshold":250}}"#).unwrap();
//! assert_eq!(config.scroll.threshold, 250.0);
//! assert_eq!(config.typing.type_interval_ms, 100);
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::notification::Severity;
use crate::viewport::IntersectionOptions;

/// Errors from loading or validating configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Malformed JSON.
    Json(String),
    /// A field holds a value the effects cannot run with.
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(msg) => write!(f, "config JSON error: {msg}"),
            Self::Invalid { field, reason } => write!(f, "invalid config `{field}`: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypingConfig {
    pub phrases: Vec<String>,
    pub type_interval_ms: u64,
    pub delete_interval_ms: u64,
    /// Hold after a phrase is fully typed.
    pub hold_full_ms: u64,
    /// Pause after a phrase is fully deleted.
    pub hold_empty_ms: u64,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            phrases: vec![
                "Hi, I'm a Developer".into(),
                "I Build Amazing Things".into(),
                "Welcome to My Portfolio".into(),
            ],
            type_interval_ms: 100,
            delete_interval_ms: 50,
            hold_full_ms: 2_000,
            hold_empty_ms: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterConfig {
    /// Number of increments from 0 to target.
    pub steps: u32,
    pub tick_ms: u64,
    /// Host attribute carrying the target value.
    pub target_attr: String,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            steps: 100,
            tick_ms: 20,
            target_attr: "data-target".into(),
        }
    }
}

impl CounterConfig {
    #[must_use]
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealConfig {
    pub threshold: f64,
    pub bottom_margin: f64,
    /// Marker class added on reveal.
    pub class: String,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            threshold: 0.1,
            bottom_margin: -50.0,
            class: "animate-in".into(),
        }
    }
}

impl RevealConfig {
    #[must_use]
    pub fn options(&self) -> IntersectionOptions {
        IntersectionOptions::default()
            .with_threshold(self.threshold)
            .with_bottom_margin(self.bottom_margin)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Delay before sliding in.
    pub enter_delay_ms: u64,
    /// Time spent fully on-screen.
    pub visible_ms: u64,
    /// Slide-out time before the overlay is detached.
    pub exit_ms: u64,
    pub success_color: String,
    pub error_color: String,
    pub info_color: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enter_delay_ms: 100,
            visible_ms: 3_000,
            exit_ms: 300,
            success_color: "#10b981".into(),
            error_color: "#ef4444".into(),
            info_color: "#6366f1".into(),
        }
    }
}

impl NotificationConfig {
    #[must_use]
    pub fn color(&self, severity: Severity) -> &str {
        match severity {
            Severity::Success => &self.success_color,
            Severity::Error => &self.error_color,
            Severity::Info => &self.info_color,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    /// Offsets strictly above this use the solid background.
    pub threshold: f64,
    pub solid_background: String,
    pub translucent_background: String,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            threshold: 100.0,
            solid_background: "rgba(10, 10, 10, 0.98)".into(),
            translucent_background: "rgba(10, 10, 10, 0.95)".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GalleryConfig {
    pub language_colors: BTreeMap<String, String>,
    pub fallback_color: String,
    pub empty_message: String,
    pub error_message: String,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        let language_colors = [
            ("JavaScript", "#f7df1e"),
            ("React", "#61dafb"),
            ("Python", "#3776ab"),
            ("React Native", "#61dafb"),
            ("HTML", "#e34f26"),
            ("CSS", "#1572b6"),
        ]
        .into_iter()
        .map(|(lang, color)| (lang.to_owned(), color.to_owned()))
        .collect();
        Self {
            language_colors,
            fallback_color: "#666".into(),
            empty_message: "No projects to show yet.".into(),
            error_message: "Projects could not be loaded.".into(),
        }
    }
}

impl GalleryConfig {
    /// Indicator color for a language, falling back for unknown ones.
    #[must_use]
    pub fn language_color(&self, language: &str) -> &str {
        self.language_colors
            .get(language)
            .map_or(self.fallback_color.as_str(), String::as_str)
    }
}

/// Complete configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PortfolioConfig {
    pub typing: TypingConfig,
    pub counter: CounterConfig,
    pub reveal: RevealConfig,
    pub notification: NotificationConfig,
    pub scroll: ScrollConfig,
    pub gallery: GalleryConfig,
}

impl PortfolioConfig {
    /// Parse and validate. An empty or whitespace-only string yields the
    /// defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Json(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the effects cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, reason| Err(ConfigError::Invalid { field, reason });
        if self.typing.type_interval_ms == 0 || self.typing.delete_interval_ms == 0 {
            return invalid("typing", "tick intervals must be positive");
        }
        // An empty phrase is typed and deleted in zero ticks; only the holds
        // keep such a loop from spinning at one instant.
        if self.typing.hold_full_ms == 0 || self.typing.hold_empty_ms == 0 {
            return invalid("typing", "hold times must be positive");
        }
        if self.counter.steps == 0 {
            return invalid("counter.steps", "must be positive");
        }
        if self.counter.tick_ms == 0 {
            return invalid("counter.tick_ms", "must be positive");
        }
        if !(0.0..=1.0).contains(&self.reveal.threshold) {
            return invalid("reveal.threshold", "must be within [0, 1]");
        }
        if !self.scroll.threshold.is_finite() {
            return invalid("scroll.threshold", "must be finite");
        }
        Ok(())
    }

    #[must_use]
    pub fn with_phrases<I, S>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.typing.phrases = phrases.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_scroll_threshold(mut self, threshold: f64) -> Self {
        self.scroll.threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_counter_steps(mut self, steps: u32) -> Self {
        self.counter.steps = steps;
        self
    }

    #[must_use]
    pub fn with_notification_timing(mut self, enter_ms: u64, visible_ms: u64, exit_ms: u64) -> Self {
        self.notification.enter_delay_ms = enter_ms;
        self.notification.visible_ms = visible_ms;
        self.notification.exit_ms = exit_ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_input_yields_defaults() {
        assert_eq!(PortfolioConfig::from_json("  ").unwrap(), PortfolioConfig::default());
        assert_eq!(PortfolioConfig::from_json("{}").unwrap(), PortfolioConfig::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config =
            PortfolioConfig::from_json(r#"{"typing":{"phrases":["one"]},"counter":{"tick_ms":5}}"#)
                .unwrap();
        assert_eq!(config.typing.phrases, vec!["one".to_string()]);
        assert_eq!(config.typing.hold_full_ms, 2_000);
        assert_eq!(config.counter.tick_ms, 5);
        assert_eq!(config.counter.steps, 100);
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = PortfolioConfig::from_json("{nope").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn zero_counter_steps_rejected() {
        let err = PortfolioConfig::from_json(r#"{"counter":{"steps":0}}"#).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                field: "counter.steps",
                reason: "must be positive"
            }
        );
    }

    #[test]
    fn zero_typing_holds_rejected() {
        for json in [
            r#"{"typing":{"phrases":[""],"hold_full_ms":0,"hold_empty_ms":0}}"#,
            r#"{"typing":{"hold_full_ms":0}}"#,
            r#"{"typing":{"hold_empty_ms":0}}"#,
        ] {
            assert_eq!(
                PortfolioConfig::from_json(json).unwrap_err(),
                ConfigError::Invalid {
                    field: "typing",
                    reason: "hold times must be positive"
                },
                "{json}"
            );
        }
    }

    #[test]
    fn threshold_outside_unit_interval_rejected() {
        let config = PortfolioConfig {
            reveal: RevealConfig {
                threshold: 1.5,
                ..RevealConfig::default()
            },
            ..PortfolioConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn language_colors_fall_back() {
        let gallery = GalleryConfig::default();
        assert_eq!(gallery.language_color("Python"), "#3776ab");
        assert_eq!(gallery.language_color("React Native"), "#61dafb");
        assert_eq!(gallery.language_color("COBOL"), "#666");
    }

    #[test]
    fn notification_palette_by_severity() {
        let n = NotificationConfig::default();
        assert_eq!(n.color(Severity::Success), "#10b981");
        assert_eq!(n.color(Severity::Error), "#ef4444");
        assert_eq!(n.color(Severity::Info), "#6366f1");
    }
}
