//! # Hot Reload Module
//!
//! Watches the configuration root and republishes the module table and the
//! route tables when a `.yaml`, `.yml` or `.json` file under it changes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use modrouter::hot_reload::watch_config;
//!
//! let watcher = watch_config(source, modules, catalog, |outcome| match outcome {
//!     Ok(names) => println!("reloaded {} modules", names.len()),
//!     Err(e) => eprintln!("reload rejected: {e:#}"),
//! })?;
//! // keep `watcher` alive for as long as reloads should happen
//! ```
//!
//! ## Reload process
//!
//! 1. The module table is re-read and validated
//! 2. The route table of every module it names is compiled
//! 3. Only when both succeed are the new snapshots published, route tables
//!    first, then the module table
//!
//! A configuration that fails to parse or compile is logged and rejected;
//! the previous snapshots keep serving requests.

use crate::config::ConfigSource;
use crate::module::ModuleResolver;
use crate::route::RouteCatalog;
use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Re-read every table from `source` and publish the result.
///
/// Returns the module names now served. On error nothing is published.
pub fn reload_config(
    source: &dyn ConfigSource,
    modules: &ModuleResolver,
    catalog: &RouteCatalog,
) -> anyhow::Result<Vec<String>> {
    let module_config = source.load_module_config()?;
    let candidate = ModuleResolver::new(
        module_config.clone(),
        modules.modules_root().to_path_buf(),
        catalog.config().dynamic_token.clone(),
    )?;
    let names = candidate.module_names();
    catalog.rebuild(&names)?;
    modules.reload(module_config)?;
    info!(modules = ?names, "hot-reload: configuration applied");
    Ok(names)
}

fn is_config_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml" | "json")
    )
}

/// Watch the configuration root of `source` and reload on change.
///
/// `on_reload` receives the outcome of every reload attempt.
pub fn watch_config<F>(
    source: Arc<dyn ConfigSource>,
    modules: Arc<ModuleResolver>,
    catalog: Arc<RouteCatalog>,
    mut on_reload: F,
) -> notify::Result<RecommendedWatcher>
where
    F: FnMut(&anyhow::Result<Vec<String>>) + Send + 'static,
{
    let root = source.modules_root().to_path_buf();

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<notify::Event, notify::Error>| match res {
            Ok(event) => {
                let relevant = matches!(
                    event.kind,
                    EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
                ) && event.paths.iter().any(|p| is_config_file(p));
                if !relevant {
                    return;
                }
                let outcome = reload_config(source.as_ref(), &modules, &catalog);
                if let Err(e) = &outcome {
                    warn!(error = %format!("{e:#}"), "hot-reload: configuration rejected; keeping previous");
                }
                on_reload(&outcome);
            }
            Err(e) => error!(error = ?e, "hot-reload: watch error"),
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;
    info!(root = %root.display(), "hot-reload: watching configuration");
    Ok(watcher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FrameworkConfig, MemoryConfigSource};
    use crate::module::ModuleConfig;

    #[test]
    fn test_is_config_file() {
        assert!(is_config_file(Path::new("/x/main/routes.yaml")));
        assert!(is_config_file(Path::new("/x/modules.json")));
        assert!(!is_config_file(Path::new("/x/main/public/site.css")));
        assert!(!is_config_file(Path::new("/x/.routes.yaml.swp")));
    }

    #[test]
    fn test_rejected_reload_keeps_previous_tables() {
        let good = MemoryConfigSource::new(ModuleConfig::with_default("main"));
        let config = Arc::new(FrameworkConfig::default());
        let modules = ModuleResolver::new(ModuleConfig::with_default("main"), "/srv", "dyn").unwrap();
        let catalog = RouteCatalog::new(Arc::new(good), config);
        catalog.rebuild(["main"]).unwrap();

        let broken = MemoryConfigSource::new(ModuleConfig::default());
        assert!(reload_config(&broken, &modules, &catalog).is_err());
        assert_eq!(modules.default_namespace(), "main");
        assert_eq!(catalog.cached_modules(), vec!["main"]);
    }
}
