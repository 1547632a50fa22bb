use super::entry::RouteEntry;
use crate::config::{ConfigSource, FrameworkConfig, RouteConfig};
use crate::error::ConfigError;
use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One module's compiled route table: packageKey -> entries in declared order
#[derive(Debug, Default)]
pub struct RouteTable {
    pub module: String,
    packages: HashMap<String, Vec<RouteEntry>>,
}

impl RouteTable {
    /// Compile every entry of `routes`. The first malformed entry fails the
    /// whole table.
    pub fn compile(module: &str, routes: RouteConfig, config: &FrameworkConfig) -> Result<Self, ConfigError> {
        let mut packages = HashMap::with_capacity(routes.len());
        for (package, specs) in routes {
            let entries = specs
                .into_iter()
                .map(|spec| RouteEntry::compile(spec, module, &package, config))
                .collect::<Result<Vec<_>, _>>()?;
            packages.insert(package, entries);
        }
        Ok(Self {
            module: module.to_string(),
            packages,
        })
    }

    #[must_use]
    pub fn package(&self, key: &str) -> Option<&[RouteEntry]> {
        self.packages.get(key).map(Vec::as_slice)
    }

    /// Package keys, sorted
    #[must_use]
    pub fn package_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.packages.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.packages.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

type Tables = HashMap<String, Arc<RouteTable>>;

/// Per-module route tables, compiled on first use
///
/// The map of compiled tables is published through an [`ArcSwap`]. Readers
/// never lock; a first use or a reload publishes a new map and never touches
/// a table another request may be reading.
pub struct RouteCatalog {
    source: Arc<dyn ConfigSource>,
    config: Arc<FrameworkConfig>,
    tables: ArcSwap<Tables>,
}

impl RouteCatalog {
    pub fn new(source: Arc<dyn ConfigSource>, config: Arc<FrameworkConfig>) -> Self {
        Self {
            source,
            config,
            tables: ArcSwap::from_pointee(Tables::new()),
        }
    }

    /// Compiled table of `module`, loading it on first use.
    pub fn table(&self, module: &str) -> Result<Arc<RouteTable>, ConfigError> {
        if let Some(table) = self.tables.load().get(module) {
            return Ok(Arc::clone(table));
        }

        let table = Arc::new(self.load(module)?);
        self.tables.rcu(|current| {
            let mut next = Tables::clone(current);
            next.entry(module.to_string())
                .or_insert_with(|| Arc::clone(&table));
            next
        });
        // another thread may have won the race; hand out the published one
        Ok(self
            .tables
            .load()
            .get(module)
            .map_or(table, Arc::clone))
    }

    fn load(&self, module: &str) -> Result<RouteTable, ConfigError> {
        let routes = self
            .source
            .load_route_config(module)
            .map_err(|e| ConfigError::new(format!("routes:{module}"), format!("{e:#}")))?;
        let table = RouteTable::compile(module, routes, &self.config)?;
        info!(
            module = %module,
            packages = table.packages.len(),
            entries = table.entry_count(),
            "Route table compiled"
        );
        Ok(table)
    }

    /// Compile the tables of `modules` and publish them together, replacing
    /// every previously cached table. Nothing is published on error.
    pub fn rebuild<I, S>(&self, modules: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut next = Tables::new();
        for module in modules {
            let module = module.as_ref();
            next.insert(module.to_string(), Arc::new(self.load(module)?));
        }
        debug!(modules = next.len(), "Route tables published");
        self.tables.store(Arc::new(next));
        Ok(())
    }

    /// Drop every cached table; the next request per module recompiles.
    pub fn reload(&self) {
        let previous = self.tables.swap(Arc::new(Tables::new()));
        if !previous.is_empty() {
            warn!(dropped = previous.len(), "Route tables invalidated");
        }
    }

    /// Modules with a compiled table, sorted
    #[must_use]
    pub fn cached_modules(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.load().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    pub fn source(&self) -> &Arc<dyn ConfigSource> {
        &self.source
    }

    pub fn config(&self) -> &FrameworkConfig {
        &self.config
    }
}
