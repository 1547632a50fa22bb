//! # Module Resolution
//!
//! One code base answers for several tenants ("modules"). Each request is
//! served by exactly one [`Module`], chosen from the host and the first path
//! segment by [`ModuleResolver`].
//!
//! ## Priority
//!
//! 1. **path** - the first path segment (after an optional dynamic token)
//!    names a path mapping, or equals the default module's namespace
//! 2. **subdomain** - the host has at least three labels and its first
//!    label names a subdomain mapping
//! 3. **domain** - the host (or its main domain, the last two labels)
//!    names a domain mapping
//! 4. **default** - the configured default module
//!
//! Resolution is total: a request always gets a module.
//!
//! ## Configuration
//!
//! ```yaml
//! default:
//!   dir: main
//! subdomain:
//!   admin: { dir: admin }
//! domain:
//!   example.org: { dir: org }
//! path:
//!   api: { dir: api }
//! ```

mod resolver;

pub use resolver::ModuleResolver;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// How a module was selected for the current request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionType {
    Domain,
    Subdomain,
    Path,
    Default,
}

impl fmt::Display for ResolutionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResolutionType::Domain => "domain",
            ResolutionType::Subdomain => "subdomain",
            ResolutionType::Path => "path",
            ResolutionType::Default => "default",
        };
        write!(f, "{s}")
    }
}

/// A resolved tenant. Immutable; built once per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Module {
    /// Module namespace, also the directory name under the modules root
    pub name: String,
    pub root_dir: PathBuf,
    pub resolution_type: ResolutionType,
    /// Path segment that selected this module, for path resolution
    pub path_prefix: Option<String>,
    /// Subdomain module of the same request when this one was selected by
    /// path; consumers use it for per-tenant configuration inheritance
    pub parent: Option<Box<Module>>,
}

impl Module {
    #[must_use]
    pub fn is_path_resolved(&self) -> bool {
        self.resolution_type == ResolutionType::Path
    }
}

/// One mapping target in `modules.*`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleMapping {
    pub dir: String,
}

impl ModuleMapping {
    pub fn new(dir: impl Into<String>) -> Self {
        Self { dir: dir.into() }
    }
}

/// Declarative module table
///
/// `default` is optional in the document so that its absence surfaces as a
/// configuration error naming the problem rather than a parse error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleConfig {
    #[serde(default)]
    pub default: Option<ModuleMapping>,
    #[serde(default)]
    pub domain: HashMap<String, ModuleMapping>,
    #[serde(default)]
    pub subdomain: HashMap<String, ModuleMapping>,
    #[serde(default)]
    pub path: HashMap<String, ModuleMapping>,
}

impl ModuleConfig {
    pub fn with_default(dir: impl Into<String>) -> Self {
        Self {
            default: Some(ModuleMapping::new(dir)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn domain(mut self, host: &str, dir: &str) -> Self {
        self.domain.insert(host.to_ascii_lowercase(), ModuleMapping::new(dir));
        self
    }

    #[must_use]
    pub fn subdomain(mut self, label: &str, dir: &str) -> Self {
        self.subdomain.insert(label.to_ascii_lowercase(), ModuleMapping::new(dir));
        self
    }

    #[must_use]
    pub fn path(mut self, segment: &str, dir: &str) -> Self {
        self.path.insert(segment.to_string(), ModuleMapping::new(dir));
        self
    }
}
