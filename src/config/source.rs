use super::{find_document, parse_document, read_document};
use crate::module::ModuleConfig;
use crate::route::RouteEntrySpec;
use anyhow::Context;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One module's declarative route table: packageKey -> ordered entries
pub type RouteConfig = HashMap<String, Vec<RouteEntrySpec>>;

/// Backing store for module and route configuration
///
/// Implementations are consulted on first use and on explicit reload only;
/// resolved snapshots are cached by [`ModuleResolver`](crate::module::ModuleResolver)
/// and [`RouteCatalog`](crate::route::RouteCatalog).
pub trait ConfigSource: Send + Sync {
    fn load_module_config(&self) -> anyhow::Result<ModuleConfig>;

    /// Load the whole route table of `module`. A module without a route
    /// file has an empty table.
    fn load_route_config(&self, module: &str) -> anyhow::Result<RouteConfig>;

    /// Directory module roots live under
    fn modules_root(&self) -> &Path;
}

/// Reads `modules.*` and `<module>/routes.*` from a directory
#[derive(Debug, Clone)]
pub struct FileConfigSource {
    root: PathBuf,
}

impl FileConfigSource {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ConfigSource for FileConfigSource {
    fn load_module_config(&self) -> anyhow::Result<ModuleConfig> {
        let path = find_document(&self.root, "modules").with_context(|| {
            format!("no modules.(yaml|yml|json) under {}", self.root.display())
        })?;
        read_document(&path)
    }

    fn load_route_config(&self, module: &str) -> anyhow::Result<RouteConfig> {
        match find_document(&self.root.join(module), "routes") {
            Some(path) => {
                debug!(module = %module, path = %path.display(), "Loading route table");
                read_document(&path)
            }
            None => {
                debug!(module = %module, "Module has no route file");
                Ok(RouteConfig::new())
            }
        }
    }

    fn modules_root(&self) -> &Path {
        &self.root
    }
}

/// Already-parsed tables, for embedding and tests
#[derive(Debug, Clone)]
pub struct MemoryConfigSource {
    modules: ModuleConfig,
    routes: HashMap<String, RouteConfig>,
    root: PathBuf,
}

impl MemoryConfigSource {
    pub fn new(modules: ModuleConfig) -> Self {
        Self {
            modules,
            routes: HashMap::new(),
            root: PathBuf::from("."),
        }
    }

    #[must_use]
    pub fn with_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.root = root.into();
        self
    }

    #[must_use]
    pub fn with_routes(mut self, module: &str, routes: RouteConfig) -> Self {
        self.routes.insert(module.to_string(), routes);
        self
    }

    /// Parse `document` as JSON (or YAML when it does not start with `{`).
    pub fn with_routes_str(self, module: &str, document: &str) -> anyhow::Result<Self> {
        let name = if document.trim_start().starts_with('{') {
            "routes.json"
        } else {
            "routes.yaml"
        };
        let routes: RouteConfig = parse_document(document, Path::new(name))
            .with_context(|| format!("route table for module '{module}'"))?;
        Ok(self.with_routes(module, routes))
    }
}

impl ConfigSource for MemoryConfigSource {
    fn load_module_config(&self) -> anyhow::Result<ModuleConfig> {
        Ok(self.modules.clone())
    }

    fn load_route_config(&self, module: &str) -> anyhow::Result<RouteConfig> {
        Ok(self.routes.get(module).cloned().unwrap_or_default())
    }

    fn modules_root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_file_source_reads_yaml_and_json() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir.path().join("modules.yaml"),
            "default:\n  dir: main\nsubdomain:\n  admin:\n    dir: admin\n",
        );
        write(
            &dir.path().join("main/routes.json"),
            r#"{"account": [{"route": "profile", "action": "loads.account.profile"}]}"#,
        );

        let source = FileConfigSource::new(dir.path());
        let modules = source.load_module_config().unwrap();
        assert_eq!(modules.default.as_ref().map(|m| m.dir.as_str()), Some("main"));
        assert!(modules.subdomain.contains_key("admin"));

        let routes = source.load_route_config("main").unwrap();
        assert_eq!(routes["account"].len(), 1);
        assert!(source.load_route_config("admin").unwrap().is_empty());
    }

    #[test]
    fn test_missing_modules_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileConfigSource::new(dir.path())
            .load_module_config()
            .unwrap_err();
        assert!(err.to_string().contains("modules"));
    }

    #[test]
    fn test_memory_source_yaml_routes() {
        let source = MemoryConfigSource::new(ModuleConfig::with_default("main"))
            .with_routes_str("main", "shop:\n  - route: list\n    action: loads.shop.list\n")
            .unwrap();
        let routes = source.load_route_config("main").unwrap();
        assert_eq!(routes["shop"][0].action.as_deref(), Some("loads.shop.list"));
    }
}
