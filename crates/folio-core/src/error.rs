#![forbid(unsafe_code)]

use std::fmt;

use crate::config::ConfigError;
use crate::surface::SurfaceError;

/// Errors while wiring a page. Runtime failures never surface here; they
/// degrade the affected component and are logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortfolioError {
    Config(ConfigError),
    Surface(SurfaceError),
}

impl fmt::Display for PortfolioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(err) => write!(f, "configuration rejected: {err}"),
            Self::Surface(err) => write!(f, "page hooks rejected: {err}"),
        }
    }
}

impl std::error::Error for PortfolioError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Surface(err) => Some(err),
        }
    }
}

impl From<ConfigError> for PortfolioError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<SurfaceError> for PortfolioError {
    fn from(err: SurfaceError) -> Self {
        Self::Surface(err)
    }
}
