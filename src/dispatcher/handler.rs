use crate::error::DispatchError;
use crate::module::Module;
use crate::request::RequestContext;
use crate::route::{ApiMetadata, HandlerRef, RequestType, ResolvedRoute};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// What a handler sees of the request it serves
#[derive(Debug, Clone, Copy)]
pub struct HandlerContext<'a> {
    pub request: &'a RequestContext,
    pub module: &'a Module,
    /// Module supplying the handler
    pub namespace: &'a str,
    pub handler_id: &'a str,
    pub request_type: RequestType,
    pub args: &'a BTreeMap<String, String>,
    /// Slot name when serving a nested route
    pub slot: Option<&'a str>,
}

impl<'a> HandlerContext<'a> {
    #[must_use]
    pub fn for_route(request: &'a RequestContext, module: &'a Module, route: &'a ResolvedRoute) -> Self {
        Self {
            request,
            module,
            namespace: &route.namespace,
            handler_id: &route.handler_id,
            request_type: route.request_type,
            args: &route.args,
            slot: None,
        }
    }

    #[must_use]
    pub fn for_nested(
        request: &'a RequestContext,
        module: &'a Module,
        slot: &'a str,
        handler: &'a HandlerRef,
    ) -> Self {
        Self {
            request,
            module,
            namespace: &handler.namespace,
            handler_id: &handler.handler_id,
            request_type: handler.request_type,
            args: &handler.args,
            slot: Some(slot),
        }
    }

    #[must_use]
    pub fn arg(&self, name: &str) -> Option<&'a str> {
        self.args.get(name).map(String::as_str)
    }
}

/// A load or action handler, instantiated fresh for every request
///
/// Lifecycle: [`initialize`](Handler::initialize), access validation,
/// [`service`](Handler::service), [`params`](Handler::params), rendering,
/// [`after_request`](Handler::after_request). API actions skip
/// `after_request`.
pub trait Handler {
    fn initialize(&mut self, _ctx: &HandlerContext<'_>) -> Result<(), DispatchError> {
        Ok(())
    }

    fn service(&mut self, ctx: &HandlerContext<'_>) -> Result<(), DispatchError>;

    /// Output parameters handed to the renderer
    fn params(&self) -> Value {
        Value::Object(serde_json::Map::new())
    }

    fn after_request(&mut self, _ctx: &HandlerContext<'_>) -> Result<(), DispatchError> {
        Ok(())
    }

    /// Runs before a `NoAccess` or `InvalidUser` failure leaves the handler
    fn on_no_access(&mut self, _ctx: &HandlerContext<'_>) {}

    /// Only called for API handlers
    fn set_api_metadata(&mut self, _metadata: &ApiMetadata) {}
}

/// Builds a fresh handler instance
pub type HandlerFactory = Box<dyn Fn() -> Box<dyn Handler> + Send + Sync>;

/// Handler constructors keyed by `<namespace>.<handler id>`
///
/// Populated at startup. A handler registered without a namespace serves
/// every module that does not register its own.
#[derive(Default)]
pub struct HandlerRegistry {
    factories: HashMap<String, HandlerFactory>,
}

impl HandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` for `handler_id` in `namespace`
    /// (`None` for every namespace).
    pub fn register<F, H>(&mut self, namespace: Option<&str>, handler_id: &str, factory: F)
    where
        F: Fn() -> H + Send + Sync + 'static,
        H: Handler + 'static,
    {
        let key = match namespace {
            Some(ns) => format!("{ns}.{handler_id}"),
            None => handler_id.to_string(),
        };
        debug!(handler = %key, "Handler registered");
        self.factories
            .insert(key, Box::new(move || Box::new(factory()) as Box<dyn Handler>));
    }

    #[must_use]
    pub fn with<F, H>(mut self, namespace: Option<&str>, handler_id: &str, factory: F) -> Self
    where
        F: Fn() -> H + Send + Sync + 'static,
        H: Handler + 'static,
    {
        self.register(namespace, handler_id, factory);
        self
    }

    /// Instantiate the handler for `handler_id` in `namespace`
    #[must_use]
    pub fn create(&self, namespace: &str, handler_id: &str) -> Option<Box<dyn Handler>> {
        self.factories
            .get(&format!("{namespace}.{handler_id}"))
            .or_else(|| self.factories.get(handler_id))
            .map(|factory| factory())
    }

    #[must_use]
    pub fn contains(&self, namespace: &str, handler_id: &str) -> bool {
        self.factories.contains_key(&format!("{namespace}.{handler_id}"))
            || self.factories.contains_key(handler_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Registered keys, sorted
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl Handler for Named {
        fn service(&mut self, _ctx: &HandlerContext<'_>) -> Result<(), DispatchError> {
            Ok(())
        }

        fn params(&self) -> Value {
            Value::String(self.0.to_string())
        }
    }

    #[test]
    fn test_namespaced_registration_wins() {
        let registry = HandlerRegistry::new()
            .with(None, "account.ProfileLoad", || Named("shared"))
            .with(Some("admin"), "account.ProfileLoad", || Named("admin"));

        let admin = registry.create("admin", "account.ProfileLoad").unwrap();
        assert_eq!(admin.params(), Value::String("admin".into()));
        let main = registry.create("main", "account.ProfileLoad").unwrap();
        assert_eq!(main.params(), Value::String("shared".into()));
        assert!(registry.create("main", "account.MissingLoad").is_none());
        assert_eq!(registry.keys(), vec!["account.ProfileLoad", "admin.account.ProfileLoad"]);
    }
}
