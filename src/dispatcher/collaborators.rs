use super::handler::{Handler, HandlerContext};
use crate::error::DispatchError;
use crate::request::RequestContext;
use crate::response::Response;
use crate::route::ResolvedRoute;
use serde_json::Value;

/// Outcome of an access check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    Denied,
    /// The session's user is unknown or unusable
    InvalidUser,
}

/// Decides whether the current request may run a handler
pub trait AccessValidator: Send + Sync {
    fn validate(&self, handler: &dyn Handler, ctx: &HandlerContext<'_>) -> Access;
}

/// Grants everything
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccessValidator for AllowAll {
    fn validate(&self, _handler: &dyn Handler, _ctx: &HandlerContext<'_>) -> Access {
        Access::Granted
    }
}

impl<F> AccessValidator for F
where
    F: Fn(&dyn Handler, &HandlerContext<'_>) -> Access + Send + Sync,
{
    fn validate(&self, handler: &dyn Handler, ctx: &HandlerContext<'_>) -> Access {
        self(handler, ctx)
    }
}

/// Turns handler output into a response
pub trait Renderer: Send + Sync {
    fn render(&self, params: Value, route: &ResolvedRoute, request: &RequestContext) -> Result<Response, DispatchError>;
}

/// Emits the parameters as a JSON body
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, params: Value, _route: &ResolvedRoute, _request: &RequestContext) -> Result<Response, DispatchError> {
        Ok(Response::json(200, params))
    }
}

/// Streams a static asset of one file type
pub trait AssetStreamer: Send + Sync {
    /// `owner` is the module the file belongs to
    fn stream(&self, owner: &str, file_type: &str, file_url: &str) -> Result<Response, DispatchError>;
}
