//! # Route Resolution
//!
//! Maps a request inside an already-resolved [`Module`](crate::module::Module)
//! onto a [`ResolvedRoute`]: which handler runs, with which arguments and
//! nested slot handlers, or which static file is served.
//!
//! ## Route tables
//!
//! Each module owns a route table, `<module>/routes.{json,yaml,yml}`, mapping
//! a package key (the first path segment) to an ordered list of entries:
//!
//! ```yaml
//! account:
//!   - route: profile
//!     action: loads.account.profile
//!   - route: "update[/:id]"
//!     constraints: { id: "[0-9]+" }
//!     method: POST
//!     action: actions.account.do_update
//!   - default: dyn
//! ```
//!
//! Entries are tried in declared order and the first match wins; there is
//! no specificity scoring. Entries marked `default: true` are tried after
//! all others. An entry `default: <dynamic token>` makes the package fall
//! back to the positional convention (`/<package>/<command>/<args...>`)
//! when nothing else matched.
//!
//! ## Handler identifiers
//!
//! Declared identifiers (`loads.account.profile`) are classified by their
//! package token and rewritten to handler-reference form
//! (`account.ProfileLoad`); see [`classify`].
//!
//! ## Snapshots
//!
//! Compiled tables live in a [`RouteCatalog`] and are published atomically;
//! resolution never mutates shared state.

mod entry;
mod handler_id;
mod pattern;
mod resolved;
mod resolver;
mod table;

pub use entry::{DefaultMarker, EntryKind, NestedRoute, NestedSpec, RouteEntry, RouteEntrySpec};
pub use handler_id::{classify, pascal_case, HandlerTarget};
pub use pattern::{CompiledPattern, DEFAULT_CONSTRAINT};
pub use resolved::{ApiMetadata, FileInfo, HandlerRef, RequestType, ResolvedRoute};
pub use resolver::RouteResolver;
pub use table::{RouteCatalog, RouteTable};
