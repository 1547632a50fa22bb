//! # Configuration Module
//!
//! Framework-wide settings and the declarative sources that module and route
//! tables are loaded from.
//!
//! ## Overview
//!
//! - [`FrameworkConfig`] - reserved tokens (dynamic token, package names,
//!   action prefix), the deployment [`Environment`], and access redirects.
//! - [`ConfigSource`] - where the module table and per-module route tables
//!   come from. [`FileConfigSource`] reads a directory tree,
//!   [`MemoryConfigSource`] holds already-parsed tables.
//!
//! ## File Layout
//!
//! ```text
//! config/
//! ├── framework.yaml        # FrameworkConfig (optional)
//! ├── modules.yaml          # ModuleConfig: default/domain/subdomain/path
//! ├── main/
//! │   ├── routes.json       # packageKey -> ordered route entries
//! │   └── public/           # static assets served for module "main"
//! └── admin/
//!     └── routes.yaml
//! ```
//!
//! Every document may be YAML or JSON; the parser is chosen by extension.
//!
//! ## Environment Variables
//!
//! ### `MODROUTER_ENV`
//!
//! Overrides `environment` from the framework file. Accepts
//! `development`, `staging` or `production` (also `dev`, `stage`, `prod`).

mod source;

pub use source::{ConfigSource, FileConfigSource, MemoryConfigSource, RouteConfig};

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use tracing::{debug, warn};

/// Deployment environment
///
/// Non-production environments render full diagnostics for configuration
/// and debug failures; production always degrades to the 404/500 paths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Some(Environment::Development),
            "staging" | "stage" => Some(Environment::Staging),
            "production" | "prod" => Some(Environment::Production),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

/// Redirect targets used when access validation fails
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Where non-AJAX requests go after `NoAccess`
    pub redirect_to: Option<String>,
    /// Where non-AJAX requests go after `InvalidUser`; falls back to `redirect_to`
    pub invalid_user_redirect_to: Option<String>,
}

/// Framework-wide tokens and behaviour switches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameworkConfig {
    pub environment: Environment,
    /// Leading path segment that selects the positional convention
    pub dynamic_token: String,
    /// Package component of handler ids that render views
    pub loads_package: String,
    /// Package component of handler ids that perform side effects
    pub actions_package: String,
    /// Leading component marking API variants (`api.loads.*`, `api.actions.*`)
    pub api_package: String,
    /// Command prefix that selects the actions package in the positional convention
    pub action_prefix: String,
    /// Package scanned on the not-found pass
    pub not_found_package: String,
    /// Package used when the request path is empty
    pub default_package: String,
    /// Deepest nested-route chain accepted when a route table is compiled
    pub max_nested_depth: usize,
    /// Directory under each module root that static assets are served from
    pub public_dir: String,
    pub access: AccessConfig,
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            dynamic_token: "dyn".to_string(),
            loads_package: "loads".to_string(),
            actions_package: "actions".to_string(),
            api_package: "api".to_string(),
            action_prefix: "do_".to_string(),
            not_found_package: "404".to_string(),
            default_package: "default".to_string(),
            max_nested_depth: 8,
            public_dir: "public".to_string(),
            access: AccessConfig::default(),
        }
    }
}

impl FrameworkConfig {
    /// Load from a YAML or JSON file, then apply `MODROUTER_ENV`.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let config: FrameworkConfig = read_document(path.as_ref())?;
        Ok(config.with_env_override())
    }

    /// Load `framework.{yaml,yml,json}` from a config root, or use defaults
    /// when none exists.
    pub fn load_from_dir(root: impl AsRef<Path>) -> anyhow::Result<Self> {
        match find_document(root.as_ref(), "framework") {
            Some(path) => Self::load(path),
            None => {
                debug!(root = %root.as_ref().display(), "No framework config found, using defaults");
                Ok(Self::default().with_env_override())
            }
        }
    }

    #[must_use]
    pub fn with_env_override(mut self) -> Self {
        if let Ok(val) = env::var("MODROUTER_ENV") {
            match Environment::parse(&val) {
                Some(environment) => self.environment = environment,
                None => warn!(value = %val, "Ignoring unknown MODROUTER_ENV value"),
            }
        }
        self
    }

    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }
}

/// Parse a YAML or JSON document, choosing the format by file extension.
pub(crate) fn read_document<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_document(&content, path)
}

pub(crate) fn parse_document<T: DeserializeOwned>(content: &str, path: &Path) -> anyhow::Result<T> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();
    let value = if ext == "yaml" || ext == "yml" {
        serde_yaml::from_str(content).with_context(|| format!("invalid YAML in {}", path.display()))?
    } else {
        serde_json::from_str(content).with_context(|| format!("invalid JSON in {}", path.display()))?
    };
    Ok(value)
}

/// First existing `<dir>/<stem>.{yaml,yml,json}`
pub(crate) fn find_document(dir: &Path, stem: &str) -> Option<std::path::PathBuf> {
    ["yaml", "yml", "json"]
        .iter()
        .map(|ext| dir.join(format!("{stem}.{ext}")))
        .find(|p| p.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = FrameworkConfig::default();
        assert_eq!(cfg.dynamic_token, "dyn");
        assert_eq!(cfg.loads_package, "loads");
        assert_eq!(cfg.actions_package, "actions");
        assert_eq!(cfg.action_prefix, "do_");
        assert_eq!(cfg.not_found_package, "404");
        assert!(!cfg.environment.is_production());
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!(Environment::parse("prod"), Some(Environment::Production));
        assert_eq!(Environment::parse(" Staging "), Some(Environment::Staging));
        assert_eq!(Environment::parse("qa"), None);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let cfg: FrameworkConfig = parse_document(
            "environment: production\ndynamic_token: dynamic\naccess:\n  redirect_to: /login\n",
            Path::new("framework.yaml"),
        )
        .unwrap();
        assert_eq!(cfg.environment, Environment::Production);
        assert_eq!(cfg.dynamic_token, "dynamic");
        assert_eq!(cfg.loads_package, "loads");
        assert_eq!(cfg.access.redirect_to.as_deref(), Some("/login"));
    }

    #[test]
    fn test_json_by_extension() {
        let cfg: FrameworkConfig =
            parse_document(r#"{"action_prefix": "act_"}"#, Path::new("framework.json")).unwrap();
        assert_eq!(cfg.action_prefix, "act_");
    }
}
