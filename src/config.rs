//! Compiler configuration

use crate::consts::DEFAULT_MAX_ERRORS;
use crate::error::{Error, Result};

/// Options shared by every stage of one compilation session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Skip function bodies while parsing ("diet" outline parse)
    pub diet: bool,
    /// Report warnings through the error channel
    pub warnings_as_errors: bool,
    /// Drop warnings entirely
    pub suppress_warnings: bool,
    /// Per-unit error budget; further errors in the unit are dropped
    pub max_errors: usize,
    /// Run the AST position validator after each parse
    pub validate_positions: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            diet: false,
            warnings_as_errors: false,
            suppress_warnings: false,
            max_errors: DEFAULT_MAX_ERRORS,
            validate_positions: cfg!(debug_assertions),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diet(mut self, diet: bool) -> Self {
        self.diet = diet;
        self
    }

    pub fn warnings_as_errors(mut self, on: bool) -> Self {
        self.warnings_as_errors = on;
        self
    }

    pub fn suppress_warnings(mut self, on: bool) -> Self {
        self.suppress_warnings = on;
        self
    }

    pub fn max_errors(mut self, max: usize) -> Self {
        self.max_errors = max;
        self
    }

    pub fn validate_positions(mut self, on: bool) -> Self {
        self.validate_positions = on;
        self
    }

    /// Default configuration with `DARTC_*` environment overrides applied
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(v) = env_flag("DARTC_DIET")? {
            config.diet = v;
        }
        if let Some(v) = env_flag("DARTC_WARNINGS_AS_ERRORS")? {
            config.warnings_as_errors = v;
        }
        if let Some(v) = env_flag("DARTC_SUPPRESS_WARNINGS")? {
            config.suppress_warnings = v;
        }
        if let Ok(v) = std::env::var("DARTC_MAX_ERRORS") {
            config.max_errors = v
                .trim()
                .parse()
                .map_err(|_| Error::config(format!("DARTC_MAX_ERRORS must be a number, got '{}'", v)))?;
        }
        log::debug!("config: {:?}", config);
        Ok(config)
    }
}

fn env_flag(name: &str) -> Result<Option<bool>> {
    match std::env::var(name) {
        Ok(v) => match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" | "" => Ok(Some(false)),
            other => Err(Error::config(format!("{} must be a boolean, got '{}'", name, other))),
        },
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let c = Config::new().diet(true).warnings_as_errors(true).max_errors(3);
        assert!(c.diet);
        assert!(c.warnings_as_errors);
        assert!(!c.suppress_warnings);
        assert_eq!(c.max_errors, 3);
    }
}
