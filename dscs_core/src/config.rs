//! Repository configuration (`.dscs/config`).
//!
//! Line-oriented `key=value` pairs; blank lines and `#` comments are ignored,
//! as are unknown keys.

use crate::error::{Error, Result};
use crate::hash::Algorithm;
use crate::refs::validate_branch_name;

/// Supported config format version.
pub const CONFIG_VERSION: &str = "1";

/// Branch created by `init` unless told otherwise.
pub const DEFAULT_BRANCH: &str = "main";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoConfig {
    pub algorithm: Algorithm,
    pub default_branch: String,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Blake3,
            default_branch: DEFAULT_BRANCH.to_string(),
        }
    }
}

impl RepoConfig {
    pub fn parse(content: &str) -> Result<Self> {
        let mut version = None;
        let mut algo = None;
        let mut default_branch = None;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                match key.trim() {
                    "version" => version = Some(value.trim()),
                    "algo" => algo = Some(value.trim()),
                    "default_branch" => default_branch = Some(value.trim()),
                    _ => {}
                }
            }
        }

        if version != Some(CONFIG_VERSION) {
            return Err(Error::invalid_repository(
                "config",
                format!("unsupported config version: {:?}", version),
            ));
        }

        let algo = algo.ok_or_else(|| Error::invalid_repository("config", "missing algo"))?;
        let algorithm = Algorithm::parse(algo)?;

        let default_branch = default_branch.unwrap_or(DEFAULT_BRANCH).to_string();
        validate_branch_name(&default_branch)?;

        Ok(Self {
            algorithm,
            default_branch,
        })
    }

    pub fn render(&self) -> String {
        format!(
            "version={}\nalgo={}\ndefault_branch={}\n",
            CONFIG_VERSION,
            self.algorithm.as_str(),
            self.default_branch
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_parse() {
        let config = RepoConfig {
            algorithm: Algorithm::Blake3,
            default_branch: "trunk".to_string(),
        };
        assert_eq!(RepoConfig::parse(&config.render()).unwrap(), config);
    }

    #[test]
    fn test_parse_with_comments_and_unknown_keys() {
        let content = "# dscs config\nversion = 1\n\nalgo=blake3-256\ncolor=auto\n";
        let config = RepoConfig::parse(content).unwrap();
        assert_eq!(config, RepoConfig::default());
    }

    #[test]
    fn test_parse_invalid_version() {
        assert!(RepoConfig::parse("version=2\nalgo=blake3-256\n").is_err());
        assert!(RepoConfig::parse("algo=blake3-256\n").is_err());
    }

    #[test]
    fn test_parse_missing_or_unknown_algo() {
        assert!(RepoConfig::parse("version=1\n").is_err());
        assert!(matches!(
            RepoConfig::parse("version=1\nalgo=sha1\n"),
            Err(Error::UnsupportedAlgorithm { .. })
        ));
    }

    #[test]
    fn test_parse_bad_default_branch() {
        assert!(RepoConfig::parse("version=1\nalgo=blake3-256\ndefault_branch=a/b\n").is_err());
    }
}
