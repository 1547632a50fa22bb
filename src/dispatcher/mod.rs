//! # Dispatcher Module
//!
//! Drives one request from its resolved route to a [`Response`](crate::response::Response)
//! through a small state machine:
//!
//! ```text
//! Routing -> Validating -> Servicing -> Rendering -> Done
//!    \            \            \            \
//!     +------------+------------+------------+--> Failed -> (Routing once | Done)
//! ```
//!
//! ## Handlers
//!
//! Handlers are looked up in a [`HandlerRegistry`] by namespace and
//! rewritten handler id (`main.account.ProfileLoad`) and instantiated fresh
//! for every request:
//!
//! ```rust,ignore
//! use modrouter::dispatcher::{Handler, HandlerContext, HandlerRegistry};
//!
//! let registry = HandlerRegistry::new().with(Some("main"), "account.ProfileLoad", ProfileLoad::default);
//! ```
//!
//! The lifecycle is `initialize`, access validation, `service`, `params`,
//! rendering, `after_request`. API loads take the same service pass as
//! actions; API actions skip `after_request`. Static files are handed to an
//! [`AssetStreamer`] chosen by file type.
//!
//! ## Failures
//!
//! Every failure is caught once at the engine boundary:
//!
//! - **NotFound** redirects when it carries a target, otherwise redispatches
//!   through the module's not-found route exactly once, then answers 404
//! - **Debug** renders diagnostics outside production and behaves like
//!   NotFound in production
//! - **Redirect** always redirects
//! - **Domain** renders `{"error": {code, message, params}}` at its status
//! - **NoAccess / InvalidUser** redirect page requests and answer AJAX
//!   requests with JSON, after the handler's `on_no_access` hook ran
//! - anything else, including a handler panic, is logged and answered 500

mod collaborators;
mod core;
mod handler;

pub use collaborators::{Access, AccessValidator, AllowAll, AssetStreamer, JsonRenderer, Renderer};
pub use core::{DispatchContext, DispatchEngine, DispatchState};
pub use handler::{Handler, HandlerContext, HandlerFactory, HandlerRegistry};
