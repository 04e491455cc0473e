#![forbid(unsafe_code)]

//! Project records and the sources that produce them.
//!
//! The gallery only sees [`ProjectFetch`], an explicit success-or-failure
//! result. A [`ProjectSource`] either answers immediately (the built-in
//! sample list, an embedded JSON payload) or defers to the host, which later
//! delivers the result as a page input.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One showcased project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawProject")]
pub struct ProjectRecord {
    pub name: String,
    pub description: String,
    pub language: String,
    pub stars: u32,
    pub forks: u32,
    pub url: String,
}

/// Accepts both the record schema and GitHub's repository schema. GitHub
/// objects carry an API `url` next to `html_url`; the latter wins.
#[derive(Deserialize)]
struct RawProject {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    stars: Option<u32>,
    #[serde(default)]
    stargazers_count: Option<u32>,
    #[serde(default)]
    forks: Option<u32>,
    #[serde(default)]
    forks_count: Option<u32>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    html_url: Option<String>,
}

impl From<RawProject> for ProjectRecord {
    fn from(raw: RawProject) -> Self {
        Self {
            name: raw.name,
            description: raw.description.unwrap_or_default(),
            language: raw.language.unwrap_or_default(),
            stars: raw.stars.or(raw.stargazers_count).unwrap_or(0),
            forks: raw.forks.or(raw.forks_count).unwrap_or(0),
            url: raw.html_url.or(raw.url).unwrap_or_else(|| "#".into()),
        }
    }
}

/// Why a source could not produce records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The source could not be reached (reported by the host).
    Unavailable(String),
    /// The payload was not a project list.
    Malformed(String),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(reason) => write!(f, "project source unavailable: {reason}"),
            Self::Malformed(reason) => write!(f, "malformed project data: {reason}"),
        }
    }
}

impl std::error::Error for SourceError {}

/// Result of one fetch.
pub type ProjectFetch = Result<Vec<ProjectRecord>, SourceError>;

/// Parse a JSON array of projects.
pub fn parse_projects_json(json: &str) -> ProjectFetch {
    serde_json::from_str(json).map_err(|e| SourceError::Malformed(e.to_string()))
}

/// Producer of project records.
pub trait ProjectSource {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Start a fetch. `Some` when the answer is available now; `None` when
    /// the host will deliver it later.
    fn request(&mut self) -> Option<ProjectFetch>;
}

/// The built-in showcase list.
#[derive(Debug, Clone, Default)]
pub struct StaticProjectSource;

impl ProjectSource for StaticProjectSource {
    fn name(&self) -> &'static str {
        "static"
    }

    fn request(&mut self) -> Option<ProjectFetch> {
        Some(Ok(sample_projects()))
    }
}

/// A JSON payload embedded at build or load time.
#[derive(Debug, Clone)]
pub struct JsonProjectSource {
    payload: String,
}

impl JsonProjectSource {
    #[must_use]
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
        }
    }
}

impl ProjectSource for JsonProjectSource {
    fn name(&self) -> &'static str {
        "json"
    }

    fn request(&mut self) -> Option<ProjectFetch> {
        Some(parse_projects_json(&self.payload))
    }
}

/// The host performs the fetch and answers with a `projects` or
/// `projects_failed` input.
#[derive(Debug, Clone, Default)]
pub struct HostProjectSource;

impl ProjectSource for HostProjectSource {
    fn name(&self) -> &'static str {
        "host"
    }

    fn request(&mut self) -> Option<ProjectFetch> {
        None
    }
}

fn project(name: &str, description: &str, language: &str, stars: u32, forks: u32) -> ProjectRecord {
    ProjectRecord {
        name: name.into(),
        description: description.into(),
        language: language.into(),
        stars,
        forks,
        url: "#".into(),
    }
}

/// Sample projects shown until a real source is wired in.
#[must_use]
pub fn sample_projects() -> Vec<ProjectRecord> {
    vec![
        project(
            "Modern Portfolio Website",
            "A responsive portfolio website built with HTML, CSS, and JavaScript featuring dark theme and animations.",
            "JavaScript",
            15,
            3,
        ),
        project(
            "React Task Manager",
            "A full-stack task management application built with React, Node.js, and MongoDB.",
            "React",
            28,
            7,
        ),
        project(
            "Python Data Analyzer",
            "Data analysis tool for processing and visualizing large datasets using Python and Pandas.",
            "Python",
            12,
            2,
        ),
        project(
            "Mobile Weather App",
            "Cross-platform weather application built with React Native and OpenWeather API.",
            "React Native",
            22,
            5,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn record_schema_parses() {
        let records = parse_projects_json(
            r#"[{"name":"A","description":"d","language":"CSS","stars":1,"forks":2,"url":"https://x"}]"#,
        )
        .unwrap();
        assert_eq!(
            records,
            vec![ProjectRecord {
                name: "A".into(),
                description: "d".into(),
                language: "CSS".into(),
                stars: 1,
                forks: 2,
                url: "https://x".into(),
            }]
        );
    }

    #[test]
    fn github_schema_parses_with_nulls() {
        let records = parse_projects_json(
            r#"[{
                "id": 1,
                "name": "repo",
                "description": null,
                "language": null,
                "stargazers_count": 9,
                "forks_count": 4,
                "url": "https://api.github.com/repos/me/repo",
                "html_url": "https://github.com/me/repo",
                "owner": {"login": "me"}
            }]"#,
        )
        .unwrap();
        assert_eq!(records[0].description, "");
        assert_eq!(records[0].language, "");
        assert_eq!(records[0].stars, 9);
        assert_eq!(records[0].forks, 4);
        assert_eq!(records[0].url, "https://github.com/me/repo");
    }

    #[test]
    fn missing_url_defaults_to_anchor() {
        let records = parse_projects_json(r#"[{"name":"bare"}]"#).unwrap();
        assert_eq!(records[0].url, "#");
    }

    #[test]
    fn non_array_payload_is_malformed() {
        assert!(matches!(
            parse_projects_json(r#"{"name":"x"}"#),
            Err(SourceError::Malformed(_))
        ));
    }

    #[test]
    fn sources_answer_as_documented() {
        assert_eq!(StaticProjectSource.request(), Some(Ok(sample_projects())));
        assert_eq!(HostProjectSource.request(), None);
        let mut json = JsonProjectSource::new("[]");
        assert_eq!(json.request(), Some(Ok(Vec::new())));
    }

    #[test]
    fn sample_list_is_stable() {
        let names: Vec<String> = sample_projects().into_iter().map(|p| p.name).collect();
        assert_eq!(
            names,
            vec![
                "Modern Portfolio Website",
                "React Task Manager",
                "Python Data Analyzer",
                "Mobile Weather App"
            ]
        );
    }
}
