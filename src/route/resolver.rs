use super::entry::{EntryKind, NestedRoute, RouteEntry};
use super::handler_id::{classify, HandlerTarget};
use super::resolved::{ApiMetadata, HandlerRef, ResolvedRoute};
use super::table::RouteCatalog;
use crate::config::FrameworkConfig;
use crate::error::{ConfigError, RouteError};
use crate::module::{Module, ModuleResolver};
use crate::request::{decode_segment, RequestContext};
use crate::static_files;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Maps a request inside a [`Module`] onto a [`ResolvedRoute`]
///
/// Stateless apart from the shared, read-only snapshots it consults; one
/// instance serves every request.
pub struct RouteResolver {
    config: Arc<FrameworkConfig>,
    modules: Arc<ModuleResolver>,
    catalog: Arc<RouteCatalog>,
}

/// Where a package scan ended
enum ScanOutcome<'a> {
    Matched(&'a RouteEntry, BTreeMap<String, String>),
    Dynamic,
    Miss,
}

impl RouteResolver {
    pub fn new(config: Arc<FrameworkConfig>, modules: Arc<ModuleResolver>, catalog: Arc<RouteCatalog>) -> Self {
        Self {
            config,
            modules,
            catalog,
        }
    }

    pub fn modules(&self) -> &Arc<ModuleResolver> {
        &self.modules
    }

    pub fn catalog(&self) -> &Arc<RouteCatalog> {
        &self.catalog
    }

    pub fn config(&self) -> &FrameworkConfig {
        &self.config
    }

    /// Resolve `request` within `module`.
    ///
    /// With `not_found_pass` set, the request path is ignored and the
    /// module's not-found package is consulted instead; only that pass
    /// returns an unmatched route; any other miss is an error.
    pub fn resolve(
        &self,
        module: &Module,
        request: &RequestContext,
        not_found_pass: bool,
    ) -> Result<ResolvedRoute, RouteError> {
        let method = request.method.as_str();

        if not_found_pass {
            let table = self.catalog.table(&module.name)?;
            let package = self.config.not_found_package.as_str();
            let entries = table.package(package).unwrap_or_default();
            return match scan(entries, "", method) {
                ScanOutcome::Matched(entry, args) => self.from_entry(module, package, entry, args),
                ScanOutcome::Dynamic | ScanOutcome::Miss => {
                    debug!(module = %module.name, "No not-found route configured");
                    Ok(ResolvedRoute::unmatched())
                }
            };
        }

        let segments = request.segments();

        if segments.first().map(String::as_str) == Some(self.config.dynamic_token.as_str()) {
            let mut rest = &segments[1..];
            if let Some(first) = rest.first() {
                if *first == module.name || module.path_prefix.as_deref() == Some(first.as_str()) {
                    rest = &rest[1..];
                }
            }
            return self.positional(module, None, rest);
        }

        let mut route_segments = segments.as_slice();
        if let (true, Some(prefix)) = (module.is_path_resolved(), module.path_prefix.as_deref()) {
            if route_segments.first().map(String::as_str) == Some(prefix) {
                route_segments = &route_segments[1..];
            }
        }

        let (package, remaining) = match route_segments.split_first() {
            Some((package, rest)) => (package.as_str(), rest.join("/")),
            None => (self.config.default_package.as_str(), String::new()),
        };

        let table = self.catalog.table(&module.name)?;
        let entries = table.package(package).unwrap_or_default();
        match scan(entries, &remaining, method) {
            ScanOutcome::Matched(entry, args) => {
                let route = self.from_entry(module, package, entry, args)?;
                debug!(
                    module = %module.name,
                    package = %package,
                    pattern = %entry.pattern,
                    handler = %route.handler_id,
                    request_type = %route.request_type,
                    "Route matched"
                );
                return Ok(route);
            }
            ScanOutcome::Dynamic => {
                debug!(module = %module.name, package = %package, "Falling back to positional convention");
                return self.positional(module, Some(package), route_segments.get(1..).unwrap_or_default());
            }
            ScanOutcome::Miss => {}
        }

        if segments.last().is_some_and(|s| is_static_candidate(s)) {
            if let Some(route) = static_files::resolve_static(&segments, module, &self.modules) {
                debug!(
                    module = %module.name,
                    owner = %route.namespace,
                    "Static file resolved"
                );
                return Ok(route);
            }
        }

        let path = request.normalized_path();
        warn!(
            module = %module.name,
            package = %package,
            method = %method,
            path = %path,
            "No route matched"
        );
        if self.config.environment.is_production() {
            Err(RouteError::NotFound { path })
        } else {
            Err(RouteError::Debug {
                message: format!(
                    "no route in module '{}' package '{package}' matches '{remaining}' for {method}",
                    module.name
                ),
            })
        }
    }

    /// `[command, ...args]` with the command defaulting to the default
    /// package name. Commands starting with the action prefix address
    /// actions; a dotted command carries its own namespace.
    fn positional(
        &self,
        module: &Module,
        package: Option<&str>,
        rest: &[String],
    ) -> Result<ResolvedRoute, RouteError> {
        let (command, args) = match rest.split_first() {
            Some((command, args)) => (command.as_str(), args),
            None => (self.config.default_package.as_str(), &[][..]),
        };

        let (namespace, leaf) = match command.rsplit_once('.') {
            Some((ns, leaf)) => (Some(ns), leaf),
            None => (None, command),
        };
        let kind = if leaf.starts_with(self.config.action_prefix.as_str()) {
            &self.config.actions_package
        } else {
            &self.config.loads_package
        };

        let mut action = kind.clone();
        for part in [package, namespace, Some(leaf)].into_iter().flatten() {
            action.push('.');
            action.push_str(part);
        }

        let target = classify(&action, &self.config).map_err(|msg| {
            ConfigError::new(format!("routes:{}/{}", module.name, package.unwrap_or("")), msg)
        })?;
        let args = args
            .iter()
            .enumerate()
            .map(|(i, a)| (i.to_string(), decode_segment(a)))
            .collect();

        debug!(module = %module.name, action = %action, handler = %target.handler_id, "Positional route built");
        Ok(ResolvedRoute::handler(&module.name, target.handler_id, action, target.request_type).with_args(args))
    }

    fn from_entry(
        &self,
        module: &Module,
        package: &str,
        entry: &RouteEntry,
        captured: BTreeMap<String, String>,
    ) -> Result<ResolvedRoute, RouteError> {
        let scope = || format!("routes:{}/{package}", module.name);
        let declared = entry.action.as_deref().unwrap_or_default();
        let (namespace, action) = self.split_namespace(declared, entry.namespace.as_deref(), module);
        let target = classify(&action, &self.config).map_err(|msg| ConfigError::new(scope(), msg))?;

        let mut args = entry.static_args.clone();
        args.extend(captured.into_iter().map(|(k, v)| (k, decode_segment(&v))));

        let nested = self
            .expand_nested(&entry.nested, module)
            .map_err(|msg| ConfigError::new(scope(), msg))?;

        let api = target.request_type.is_api().then(|| ApiMetadata {
            method_name: target.command.clone(),
            request_validators: entry.request_validators.clone(),
            response_validators: entry.response_validators.clone(),
        });

        let HandlerTarget {
            request_type,
            handler_id,
            ..
        } = target;
        Ok(
            ResolvedRoute::handler(&namespace, handler_id, action, request_type)
                .with_args(args)
                .with_nested(nested)
                .with_http_method(entry.http_method.clone())
                .with_api(api),
        )
    }

    fn expand_nested(
        &self,
        nested: &[NestedRoute],
        module: &Module,
    ) -> Result<BTreeMap<String, HandlerRef>, String> {
        let mut slots = BTreeMap::new();
        for route in nested {
            let (namespace, action) = self.split_namespace(&route.action, route.namespace.as_deref(), module);
            let target = classify(&action, &self.config)?;
            let handler = HandlerRef {
                namespace,
                handler_id: target.handler_id,
                action,
                request_type: target.request_type,
                args: route.args.clone(),
                nested: self.expand_nested(&route.nested, module)?,
            };
            slots.insert(route.slot.clone(), handler);
        }
        Ok(slots)
    }

    /// Namespace precedence: a module named by the action's leading token,
    /// then the declared namespace, then the current module.
    fn split_namespace(&self, action: &str, declared: Option<&str>, module: &Module) -> (String, String) {
        if let Some((head, tail)) = action.split_once('.') {
            if self.modules.is_module(head) && !self.is_package_token(head) {
                return (head.to_string(), tail.to_string());
            }
        }
        let namespace = declared.unwrap_or(module.name.as_str());
        (namespace.to_string(), action.to_string())
    }

    fn is_package_token(&self, token: &str) -> bool {
        token == self.config.loads_package
            || token == self.config.actions_package
            || token == self.config.api_package
    }
}

/// First matching ordinary entry in declared order, then fallback entries,
/// then the dynamic marker if one was declared.
fn scan<'a>(entries: &'a [RouteEntry], remaining: &str, method: &str) -> ScanOutcome<'a> {
    let mut dynamic = false;
    let mut fallbacks = Vec::new();
    for entry in entries {
        match entry.kind {
            EntryKind::DynamicMarker => dynamic = true,
            EntryKind::Fallback => fallbacks.push(entry),
            EntryKind::Route => {
                if !entry.accepts_method(method) {
                    continue;
                }
                if let Some(args) = entry.matches(remaining) {
                    return ScanOutcome::Matched(entry, args);
                }
            }
        }
    }
    for entry in fallbacks {
        if !entry.accepts_method(method) {
            continue;
        }
        if let Some(args) = entry.matches(remaining) {
            return ScanOutcome::Matched(entry, args);
        }
    }
    if dynamic {
        ScanOutcome::Dynamic
    } else {
        ScanOutcome::Miss
    }
}

/// Last segment has a `.` that does not introduce `php`
fn is_static_candidate(last: &str) -> bool {
    last.match_indices('.')
        .any(|(i, _)| !last[i + 1..].starts_with("php"))
}
