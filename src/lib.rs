//! # modrouter
//!
//! **modrouter** maps requests for a multi-tenant web application onto
//! handlers. One code base serves several tenants ("modules"); each request
//! is resolved in three steps:
//!
//! 1. **[`module`]** - pick the tenant from the host and the first path
//!    segment (path, then subdomain, then domain, then default)
//! 2. **[`route`]** - map the remaining path onto a handler through the
//!    module's declarative route table, the positional convention, or a
//!    static file
//! 3. **[`dispatcher`]** - run the handler through its lifecycle and turn
//!    every failure into exactly one response, with at most one retry
//!    through the module's not-found route
//!
//! ## Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Caller
//!     participant Engine as DispatchEngine
//!     participant Modules as ModuleResolver
//!     participant Routes as RouteResolver
//!     participant Catalog as RouteCatalog
//!     participant Handler
//!
//!     Caller->>Engine: dispatch(RequestContext)
//!     Engine->>Modules: resolve(host, path)
//!     Modules-->>Engine: Module
//!     Engine->>Routes: resolve(module, request, false)
//!     Routes->>Catalog: table(module)
//!     Catalog-->>Routes: Arc<RouteTable>
//!     Routes-->>Engine: ResolvedRoute
//!     Engine->>Handler: initialize / validate / service / params
//!     Engine->>Engine: render, after_request
//!     Engine-->>Caller: Response
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use modrouter::prelude::*;
//! use std::sync::Arc;
//!
//! let root = "./sites";
//! let config = Arc::new(FrameworkConfig::load_from_dir(root)?);
//! let source = Arc::new(FileConfigSource::new(root));
//! let modules = Arc::new(ModuleResolver::from_source(source.as_ref(), &config)?);
//! let catalog = Arc::new(RouteCatalog::new(source, Arc::clone(&config)));
//! let resolver = Arc::new(RouteResolver::new(config, modules, catalog));
//!
//! let registry = HandlerRegistry::new().with(None, "account.ProfileLoad", ProfileLoad::default);
//! let engine = DispatchEngine::new(resolver, registry)
//!     .with_default_streamer(FsAssetStreamer::new(root, "public"));
//!
//! let request = RequestContext::from_url(http::Method::GET, "https://example.com/account/profile")?;
//! let response = engine.dispatch(&request);
//! ```
//!
//! ## Shared State
//!
//! The module table and the compiled route tables are immutable snapshots
//! published through `arc-swap`; a reload replaces them wholesale. The only
//! mutable state, [`dispatcher::DispatchContext`] and
//! [`route::ResolvedRoute`], is created per request.

pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod hot_reload;
pub mod logging;
pub mod module;
pub mod request;
pub mod response;
pub mod route;
pub mod static_files;

pub use config::{ConfigSource, Environment, FileConfigSource, FrameworkConfig, MemoryConfigSource};
pub use dispatcher::{DispatchEngine, Handler, HandlerContext, HandlerRegistry};
pub use error::{ConfigError, DispatchError, RouteError};
pub use module::{Module, ModuleConfig, ModuleResolver, ResolutionType};
pub use request::{RequestContext, RequestId};
pub use response::{Response, ResponseBody};
pub use route::{RequestType, ResolvedRoute, RouteCatalog, RouteResolver};

/// Everything needed to wire an engine
pub mod prelude {
    pub use crate::config::{ConfigSource, Environment, FileConfigSource, FrameworkConfig, MemoryConfigSource};
    pub use crate::dispatcher::{
        Access, AccessValidator, AllowAll, AssetStreamer, DispatchContext, DispatchEngine, Handler, HandlerContext,
        HandlerRegistry, JsonRenderer, Renderer,
    };
    pub use crate::error::{ConfigError, DispatchError, RouteError};
    pub use crate::module::{Module, ModuleConfig, ModuleResolver, ResolutionType};
    pub use crate::request::{RequestContext, RequestId};
    pub use crate::response::{Response, ResponseBody};
    pub use crate::route::{RequestType, ResolvedRoute, RouteCatalog, RouteResolver};
    pub use crate::static_files::FsAssetStreamer;
}
