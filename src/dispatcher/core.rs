use super::collaborators::{Access, AccessValidator, AllowAll, AssetStreamer, JsonRenderer, Renderer};
use super::handler::{Handler, HandlerContext, HandlerRegistry};
use crate::config::FrameworkConfig;
use crate::error::DispatchError;
use crate::module::Module;
use crate::request::{RequestContext, RequestId};
use crate::response::Response;
use crate::route::{HandlerRef, RequestType, ResolvedRoute, RouteResolver};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// States of one dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Routing,
    Validating,
    Servicing,
    Rendering,
    Done,
    Failed,
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DispatchState::Routing => "routing",
            DispatchState::Validating => "validating",
            DispatchState::Servicing => "servicing",
            DispatchState::Rendering => "rendering",
            DispatchState::Done => "done",
            DispatchState::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Per-request dispatch state. Never shared between requests.
#[derive(Debug, Clone)]
pub struct DispatchContext {
    pub request_id: RequestId,
    /// Set once the not-found route has been tried; guards the single retry
    pub redirect_attempted: bool,
    state: DispatchState,
    transitions: Vec<DispatchState>,
}

impl DispatchContext {
    #[must_use]
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            redirect_attempted: false,
            state: DispatchState::Routing,
            transitions: vec![DispatchState::Routing],
        }
    }

    #[must_use]
    pub fn state(&self) -> DispatchState {
        self.state
    }

    /// Every state entered, in order
    #[must_use]
    pub fn transitions(&self) -> &[DispatchState] {
        &self.transitions
    }

    /// How many times routing started (at most two)
    #[must_use]
    pub fn routing_passes(&self) -> usize {
        self.transitions
            .iter()
            .filter(|s| **s == DispatchState::Routing)
            .count()
    }

    fn enter(&mut self, state: DispatchState) {
        debug!(request_id = %self.request_id, from = %self.state, to = %state, "Dispatch transition");
        self.state = state;
        self.transitions.push(state);
    }
}

enum Recovery {
    Respond(Response),
    RetryNotFound,
}

/// Runs the routing → validating → servicing → rendering state machine
///
/// Every failure is caught once, at this boundary, and mapped onto a
/// response. The only corrective action is a single redispatch through the
/// module's not-found route.
pub struct DispatchEngine {
    config: Arc<FrameworkConfig>,
    resolver: Arc<RouteResolver>,
    registry: HandlerRegistry,
    access: Box<dyn AccessValidator>,
    renderer: Box<dyn Renderer>,
    streamers: HashMap<String, Box<dyn AssetStreamer>>,
    default_streamer: Option<Box<dyn AssetStreamer>>,
}

impl DispatchEngine {
    pub fn new(resolver: Arc<RouteResolver>, registry: HandlerRegistry) -> Self {
        let config = Arc::new(resolver.config().clone());
        Self {
            config,
            resolver,
            registry,
            access: Box::new(AllowAll),
            renderer: Box::new(JsonRenderer),
            streamers: HashMap::new(),
            default_streamer: None,
        }
    }

    #[must_use]
    pub fn with_access_validator(mut self, validator: impl AccessValidator + 'static) -> Self {
        self.access = Box::new(validator);
        self
    }

    #[must_use]
    pub fn with_renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    /// Streamer for one file type, e.g. `less`
    #[must_use]
    pub fn with_asset_streamer(mut self, file_type: &str, streamer: impl AssetStreamer + 'static) -> Self {
        self.streamers
            .insert(file_type.to_ascii_lowercase(), Box::new(streamer));
        self
    }

    /// Streamer for file types without their own
    #[must_use]
    pub fn with_default_streamer(mut self, streamer: impl AssetStreamer + 'static) -> Self {
        self.default_streamer = Some(Box::new(streamer));
        self
    }

    pub fn resolver(&self) -> &Arc<RouteResolver> {
        &self.resolver
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Resolve the module and route of `request` and dispatch it.
    #[must_use]
    pub fn dispatch(&self, request: &RequestContext) -> Response {
        let mut ctx = DispatchContext::new(request.request_id);
        self.dispatch_with_context(&mut ctx, request, None)
    }

    /// Dispatch with an already resolved route (`None` resolves it from the
    /// request), recording the state machine's progress in `ctx`.
    pub fn dispatch_with_context(
        &self,
        ctx: &mut DispatchContext,
        request: &RequestContext,
        route: Option<ResolvedRoute>,
    ) -> Response {
        let module = self.resolver.modules().resolve(&request.host, &request.path);
        info!(
            request_id = %ctx.request_id,
            method = %request.method,
            host = %request.host,
            path = %request.path,
            module = %module.name,
            resolution = %module.resolution_type,
            "Dispatch started"
        );

        let mut route = route;
        let mut not_found_pass = false;
        loop {
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                self.run(ctx, request, &module, route.take(), not_found_pass)
            }))
            .unwrap_or_else(|panic| {
                Err(DispatchError::Unclassified(anyhow::anyhow!(
                    "handler panicked: {}",
                    panic_message(panic.as_ref())
                )))
            });

            let err = match outcome {
                Ok(response) => {
                    ctx.enter(DispatchState::Done);
                    info!(request_id = %ctx.request_id, status = response.status, "Dispatch finished");
                    return response;
                }
                Err(err) => err,
            };

            ctx.enter(DispatchState::Failed);
            match self.recover(ctx, request, err) {
                Recovery::Respond(response) => {
                    ctx.enter(DispatchState::Done);
                    info!(request_id = %ctx.request_id, status = response.status, "Dispatch finished");
                    return response;
                }
                Recovery::RetryNotFound => {
                    not_found_pass = true;
                    ctx.enter(DispatchState::Routing);
                }
            }
        }
    }

    fn run(
        &self,
        ctx: &mut DispatchContext,
        request: &RequestContext,
        module: &Module,
        route: Option<ResolvedRoute>,
        not_found_pass: bool,
    ) -> Result<Response, DispatchError> {
        let route = match route {
            Some(route) => route,
            None => self.resolver.resolve(module, request, not_found_pass)?,
        };
        if !route.matched {
            debug!(request_id = %ctx.request_id, "Route unmatched");
            return Ok(Response::not_found());
        }

        if route.request_type == RequestType::File {
            return self.stream_file(ctx, &route);
        }

        let hctx = HandlerContext::for_route(request, module, &route);
        let mut handler = self.instantiate(&route.namespace, &route.handler_id, &route)?;

        // API loads take the same service pass as actions once the metadata is set
        if let Some(api) = route.api.as_ref().filter(|_| route.request_type.is_api()) {
            handler.set_api_metadata(api);
        }

        ctx.enter(DispatchState::Validating);
        self.validate(handler.as_mut(), &hctx)?;

        ctx.enter(DispatchState::Servicing);
        guarded(handler.as_mut(), &hctx, |h, c| h.service(c))?;
        let mut params = handler.params();
        if !route.nested_routes.is_empty() {
            let nested = self.service_nested(request, module, &route.nested_routes)?;
            insert_param(&mut params, "nested", nested);
        }

        ctx.enter(DispatchState::Rendering);
        let response = self.renderer.render(params, &route, request)?;
        if route.request_type != RequestType::ApiAction {
            guarded(handler.as_mut(), &hctx, |h, c| h.after_request(c))?;
        }
        Ok(response)
    }

    fn instantiate(&self, namespace: &str, handler_id: &str, route: &ResolvedRoute) -> Result<Box<dyn Handler>, DispatchError> {
        self.registry.create(namespace, handler_id).ok_or_else(|| {
            warn!(namespace = %namespace, handler = %handler_id, "No handler registered");
            DispatchError::Debug {
                message: format!("no handler registered for '{namespace}.{handler_id}'"),
                detail: serde_json::to_value(route).ok(),
            }
        })
    }

    fn validate(&self, handler: &mut dyn Handler, hctx: &HandlerContext<'_>) -> Result<(), DispatchError> {
        guarded(handler, hctx, |h, c| h.initialize(c))?;
        match self.access.validate(&*handler, hctx) {
            Access::Granted => Ok(()),
            Access::Denied => {
                handler.on_no_access(hctx);
                Err(DispatchError::NoAccess {
                    message: format!("access to '{}' denied", hctx.handler_id),
                    redirect_to: self.config.access.redirect_to.clone(),
                })
            }
            Access::InvalidUser => {
                handler.on_no_access(hctx);
                Err(DispatchError::InvalidUser {
                    message: format!("invalid user for '{}'", hctx.handler_id),
                    redirect_to: self
                        .config
                        .access
                        .invalid_user_redirect_to
                        .clone()
                        .or_else(|| self.config.access.redirect_to.clone()),
                })
            }
        }
    }

    /// Service each nested slot; returns `{slot: params}`
    fn service_nested(
        &self,
        request: &RequestContext,
        module: &Module,
        slots: &BTreeMap<String, HandlerRef>,
    ) -> Result<Value, DispatchError> {
        let mut out = Map::new();
        for (slot, handler_ref) in slots {
            let hctx = HandlerContext::for_nested(request, module, slot, handler_ref);
            let probe = ResolvedRoute::handler(
                &handler_ref.namespace,
                handler_ref.handler_id.clone(),
                handler_ref.action.clone(),
                handler_ref.request_type,
            );
            let mut handler = self.instantiate(&handler_ref.namespace, &handler_ref.handler_id, &probe)?;
            self.validate(handler.as_mut(), &hctx)?;
            guarded(handler.as_mut(), &hctx, |h, c| h.service(c))?;
            let mut params = handler.params();
            if !handler_ref.nested.is_empty() {
                let nested = self.service_nested(request, module, &handler_ref.nested)?;
                insert_param(&mut params, "nested", nested);
            }
            guarded(handler.as_mut(), &hctx, |h, c| h.after_request(c))?;
            out.insert(slot.clone(), params);
        }
        Ok(Value::Object(out))
    }

    fn stream_file(&self, ctx: &DispatchContext, route: &ResolvedRoute) -> Result<Response, DispatchError> {
        let Some(info) = route.file_info.as_ref() else {
            return Err(DispatchError::debug("file route without file info"));
        };
        let streamer = self
            .streamers
            .get(&info.file_type)
            .or(self.default_streamer.as_ref())
            .ok_or_else(|| DispatchError::debug(format!("no asset streamer for file type '{}'", info.file_type)))?;
        debug!(
            request_id = %ctx.request_id,
            owner = %route.namespace,
            file_type = %info.file_type,
            file_url = %info.file_url,
            "Streaming static file"
        );
        streamer.stream(&route.namespace, &info.file_type, &info.file_url)
    }

    fn recover(&self, ctx: &mut DispatchContext, request: &RequestContext, err: DispatchError) -> Recovery {
        let production = self.config.environment.is_production();
        warn!(request_id = %ctx.request_id, kind = err.kind(), error = %err, "Dispatch failed");

        match err {
            DispatchError::NotFound { redirect_to: Some(to) } => Recovery::Respond(Response::redirect(&to, 302)),
            DispatchError::NotFound { redirect_to: None } => self.retry_not_found(ctx),
            DispatchError::Debug { .. } if production => self.retry_not_found(ctx),
            DispatchError::Debug { message, detail } => Recovery::Respond(Response::error(
                500,
                "debug",
                &message,
                Some(json!({ "detail": detail })),
            )),
            DispatchError::Redirect { to, status } => Recovery::Respond(Response::redirect(&to, status)),
            DispatchError::Domain {
                code,
                message,
                params,
                status,
            } => Recovery::Respond(Response::error(status, code, &message, Some(json!({ "params": params })))),
            DispatchError::NoAccess { message, redirect_to } => {
                Recovery::Respond(access_response(request, 403, "no_access", &message, redirect_to))
            }
            DispatchError::InvalidUser { message, redirect_to } => {
                Recovery::Respond(access_response(request, 401, "invalid_user", &message, redirect_to))
            }
            DispatchError::Unclassified(e) => {
                error!(request_id = %ctx.request_id, error = ?e, "Unclassified dispatch failure");
                let response = if production {
                    Response::error(500, "internal", "Internal Server Error", None)
                } else {
                    Response::error(500, "internal", &format!("{e:#}"), None)
                };
                Recovery::Respond(response)
            }
        }
    }

    fn retry_not_found(&self, ctx: &mut DispatchContext) -> Recovery {
        if ctx.redirect_attempted {
            warn!(request_id = %ctx.request_id, "Not-found route failed; answering 404");
            return Recovery::Respond(Response::not_found());
        }
        ctx.redirect_attempted = true;
        debug!(request_id = %ctx.request_id, "Redispatching through the not-found route");
        Recovery::RetryNotFound
    }
}

/// Run a lifecycle step; access failures raised by the handler itself still
/// get its `on_no_access` hook.
fn guarded<F>(handler: &mut dyn Handler, hctx: &HandlerContext<'_>, step: F) -> Result<(), DispatchError>
where
    F: FnOnce(&mut dyn Handler, &HandlerContext<'_>) -> Result<(), DispatchError>,
{
    let result = step(handler, hctx);
    if let Err(e) = &result {
        if e.is_access_failure() {
            handler.on_no_access(hctx);
        }
    }
    result
}

fn insert_param(params: &mut Value, key: &str, value: Value) {
    match params {
        Value::Object(map) => {
            map.insert(key.to_string(), value);
        }
        other => {
            let inner = std::mem::take(other);
            *other = json!({ "value": inner, key: value });
        }
    }
}

/// Redirect page requests; answer AJAX/JSON requests with a JSON body
fn access_response(
    request: &RequestContext,
    status: u16,
    code: &str,
    message: &str,
    redirect_to: Option<String>,
) -> Response {
    match redirect_to {
        Some(to) if !request.is_ajax() => Response::redirect(&to, 302),
        hint => Response::error(status, code, message, Some(json!({ "redirect_to": hint }))),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
