//! Crate configuration: parsing limits and logging settings.
//!
//! Precedence: explicit file > `NEXUSODM_CONFIG` > `./nexusodm.toml` > defaults,
//! then environment overrides for individual limits.

use crate::errors::OdmError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_MAX_PATH_DEPTH: usize = 32;
pub const DEFAULT_MAX_IN_SET: usize = 1000;

/// Safety limits applied while parsing paths and wire documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_path_depth: usize,
    pub max_in_set: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self { max_path_depth: DEFAULT_MAX_PATH_DEPTH, max_in_set: DEFAULT_MAX_IN_SET }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: Option<PathBuf>,
    /// error|warn|info|debug|trace
    pub level: Option<String>,
    pub retention: Option<usize>,
    pub dev6: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OdmConfig {
    pub limits: Limits,
    pub logging: LoggingConfig,
}

impl OdmConfig {
    /// # Errors
    /// Returns an error if the text is not valid TOML for this structure.
    pub fn from_toml_str(s: &str) -> Result<Self, OdmError> {
        Ok(toml::from_str::<Self>(s)?)
    }

    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, OdmError> {
        let s = std::fs::read_to_string(path)
            .map_err(|e| OdmError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&s)
    }

    /// Apply environment overrides for limits and logging.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Overrides read through `var`:
    /// - NEXUSODM_MAX_PATH_DEPTH, NEXUSODM_MAX_IN_SET
    /// - NEXUSODM_LOG_DIR, NEXUSODM_LOG_LEVEL, NEXUSODM_LOG_RETENTION
    /// - NEXUSODM_DEV6 (1|true|yes)
    ///
    /// Numeric values that do not parse are ignored.
    pub fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        let num = |key: &str| var(key).and_then(|s| s.trim().parse::<usize>().ok());
        if let Some(n) = num("NEXUSODM_MAX_PATH_DEPTH") {
            self.limits.max_path_depth = n;
        }
        if let Some(n) = num("NEXUSODM_MAX_IN_SET") {
            self.limits.max_in_set = n;
        }
        if let Some(dir) = var("NEXUSODM_LOG_DIR") {
            self.logging.dir = Some(PathBuf::from(dir));
        }
        if let Some(level) = var("NEXUSODM_LOG_LEVEL") {
            self.logging.level = Some(level);
        }
        if let Some(n) = num("NEXUSODM_LOG_RETENTION") {
            self.logging.retention = Some(n);
        }
        if let Some(flag) = var("NEXUSODM_DEV6") {
            self.logging.dev6 = matches!(flag.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
    }
}

fn candidate_paths(explicit: Option<&Path>) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = vec![];
    if let Some(p) = explicit {
        paths.push(p.to_path_buf());
    }
    if let Ok(p) = std::env::var("NEXUSODM_CONFIG") {
        paths.push(PathBuf::from(p));
    }
    if let Ok(cur) = std::env::current_dir() {
        paths.push(cur.join("nexusodm.toml"));
    }
    paths
}

/// Load the first config file that exists, falling back to defaults, then apply env overrides.
///
/// # Errors
/// Returns an error if an existing config file cannot be read or parsed.
pub fn load_config(explicit: Option<&Path>) -> Result<OdmConfig, OdmError> {
    let mut cfg = OdmConfig::default();
    for p in candidate_paths(explicit) {
        if p.exists() {
            cfg = OdmConfig::from_file(&p)?;
            log::debug!("loaded config from {}", p.display());
            break;
        }
    }
    cfg.apply_env();
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = OdmConfig::from_toml_str("[limits]\nmax_in_set = 10\n").unwrap();
        assert_eq!(cfg.limits.max_in_set, 10);
        assert_eq!(cfg.limits.max_path_depth, DEFAULT_MAX_PATH_DEPTH);
        assert!(cfg.logging.dir.is_none());
    }

    #[test]
    fn overrides_cover_limits_and_logging() {
        let mut cfg = OdmConfig::default();
        cfg.apply_overrides(|key| match key {
            "NEXUSODM_MAX_PATH_DEPTH" => Some("4".into()),
            "NEXUSODM_MAX_IN_SET" => Some("lots".into()),
            "NEXUSODM_LOG_LEVEL" => Some("debug".into()),
            "NEXUSODM_LOG_RETENTION" => Some(" 3 ".into()),
            "NEXUSODM_DEV6" => Some("TRUE".into()),
            _ => None,
        });
        assert_eq!(cfg.limits.max_path_depth, 4);
        assert_eq!(cfg.limits.max_in_set, DEFAULT_MAX_IN_SET);
        assert_eq!(cfg.logging.level.as_deref(), Some("debug"));
        assert_eq!(cfg.logging.retention, Some(3));
        assert!(cfg.logging.dev6);
        assert!(cfg.logging.dir.is_none());
    }

    #[test]
    fn rejects_bad_types() {
        let e = OdmConfig::from_toml_str("[limits]\nmax_in_set = \"many\"\n").unwrap_err();
        assert!(matches!(e, OdmError::Toml(_)));
    }
}
