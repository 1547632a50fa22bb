use super::{Module, ModuleConfig, ModuleMapping, ResolutionType};
use crate::config::{ConfigSource, FrameworkConfig};
use crate::error::ConfigError;
use crate::request::{normalize_host, path_segments};
use arc_swap::ArcSwap;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Validated, immutable snapshot of the module table
#[derive(Debug)]
struct ModuleTable {
    default: ModuleMapping,
    domain: HashMap<String, ModuleMapping>,
    subdomain: HashMap<String, ModuleMapping>,
    path: HashMap<String, ModuleMapping>,
    names: BTreeSet<String>,
}

impl ModuleTable {
    fn build(config: ModuleConfig) -> Result<Self, ConfigError> {
        let default = config
            .default
            .ok_or_else(|| ConfigError::new("modules", "no default module configured"))?;
        if default.dir.trim().is_empty() {
            return Err(ConfigError::new("modules", "default module has an empty dir"));
        }

        let lower = |m: HashMap<String, ModuleMapping>| -> HashMap<String, ModuleMapping> {
            m.into_iter().map(|(k, v)| (k.to_ascii_lowercase(), v)).collect()
        };
        let domain = lower(config.domain);
        let subdomain = lower(config.subdomain);
        let path = config.path;

        let mut names = BTreeSet::new();
        names.insert(default.dir.clone());
        for (kind, map) in [("domain", &domain), ("subdomain", &subdomain), ("path", &path)] {
            for (key, mapping) in map {
                if mapping.dir.trim().is_empty() {
                    return Err(ConfigError::new(
                        "modules",
                        format!("{kind} mapping '{key}' has an empty dir"),
                    ));
                }
                names.insert(mapping.dir.clone());
            }
        }

        Ok(Self {
            default,
            domain,
            subdomain,
            path,
            names,
        })
    }
}

/// Chooses the [`Module`] serving a request
///
/// The table is an immutable snapshot behind an [`ArcSwap`]: resolution reads
/// it without locking and [`ModuleResolver::reload`] replaces it wholesale.
pub struct ModuleResolver {
    table: ArcSwap<ModuleTable>,
    modules_root: PathBuf,
    dynamic_token: String,
}

impl ModuleResolver {
    /// Build a resolver; a missing default module fails here, at startup.
    pub fn new(
        config: ModuleConfig,
        modules_root: impl Into<PathBuf>,
        dynamic_token: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let table = ModuleTable::build(config)?;
        info!(
            modules = ?table.names,
            default_module = %table.default.dir,
            "Module table loaded"
        );
        Ok(Self {
            table: ArcSwap::from_pointee(table),
            modules_root: modules_root.into(),
            dynamic_token: dynamic_token.into(),
        })
    }

    pub fn from_source(source: &dyn ConfigSource, config: &FrameworkConfig) -> anyhow::Result<Self> {
        let modules = source.load_module_config()?;
        Ok(Self::new(modules, source.modules_root(), config.dynamic_token.clone())?)
    }

    /// Swap in a new module table. On error the previous table stays active.
    pub fn reload(&self, config: ModuleConfig) -> Result<(), ConfigError> {
        let table = ModuleTable::build(config)?;
        info!(modules = ?table.names, "Module table reloaded");
        self.table.store(Arc::new(table));
        Ok(())
    }

    /// Resolve the module for `host` and `path`. Total and deterministic.
    #[must_use]
    pub fn resolve(&self, host: &str, path: &str) -> Module {
        let table = self.table.load();
        let host = normalize_host(host);
        let segments = path_segments(path);

        let mut first = segments.first().map(String::as_str);
        if first == Some(self.dynamic_token.as_str()) {
            first = segments.get(1).map(String::as_str);
        }

        if let Some(segment) = first {
            let by_path = table
                .path
                .get(segment)
                .or_else(|| (segment == table.default.dir).then_some(&table.default));
            if let Some(mapping) = by_path {
                let mut module = self.build(mapping, ResolutionType::Path);
                module.path_prefix = Some(segment.to_string());
                module.parent = self.by_subdomain(&table, &host).map(Box::new);
                debug!(host = %host, module = %module.name, resolution = "path", "Module resolved");
                return module;
            }
        }

        let module = self
            .by_subdomain(&table, &host)
            .or_else(|| self.by_domain(&table, &host))
            .unwrap_or_else(|| self.build(&table.default, ResolutionType::Default));
        debug!(
            host = %host,
            module = %module.name,
            resolution = %module.resolution_type,
            "Module resolved"
        );
        module
    }

    fn by_subdomain(&self, table: &ModuleTable, host: &str) -> Option<Module> {
        let labels: Vec<&str> = host.split('.').collect();
        if labels.len() < 3 {
            return None;
        }
        table
            .subdomain
            .get(labels[0])
            .map(|m| self.build(m, ResolutionType::Subdomain))
    }

    fn by_domain(&self, table: &ModuleTable, host: &str) -> Option<Module> {
        if let Some(m) = table.domain.get(host) {
            return Some(self.build(m, ResolutionType::Domain));
        }
        let labels: Vec<&str> = host.split('.').collect();
        if labels.len() > 2 {
            let main_domain = labels[labels.len() - 2..].join(".");
            return table
                .domain
                .get(&main_domain)
                .map(|m| self.build(m, ResolutionType::Domain));
        }
        None
    }

    fn build(&self, mapping: &ModuleMapping, resolution_type: ResolutionType) -> Module {
        Module {
            name: mapping.dir.clone(),
            root_dir: self.modules_root.join(&mapping.dir),
            resolution_type,
            path_prefix: None,
            parent: None,
        }
    }

    #[must_use]
    pub fn is_module(&self, name: &str) -> bool {
        self.table.load().names.contains(name)
    }

    /// Every module name any mapping can produce, sorted
    #[must_use]
    pub fn module_names(&self) -> Vec<String> {
        self.table.load().names.iter().cloned().collect()
    }

    #[must_use]
    pub fn default_namespace(&self) -> String {
        self.table.load().default.dir.clone()
    }

    /// Module descriptor for a known name, e.g. the owner of a static asset
    #[must_use]
    pub fn module_by_name(&self, name: &str, resolution_type: ResolutionType) -> Option<Module> {
        self.is_module(name).then(|| Module {
            name: name.to_string(),
            root_dir: self.modules_root.join(name),
            resolution_type,
            path_prefix: None,
            parent: None,
        })
    }

    pub fn modules_root(&self) -> &Path {
        &self.modules_root
    }
}
