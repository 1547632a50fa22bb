//! # Error Taxonomy
//!
//! Resolution and dispatch failures are plain values rather than unwinding
//! control flow. Three layers exist:
//!
//! - [`ConfigError`] - the configuration is wrong (missing default module,
//!   constraint without placeholder, bad regex, unknown handler package).
//!   Raised at load time or on first use and never recovered from.
//! - [`RouteError`] - the outcome of a failed route resolution: a
//!   configuration problem, a plain miss, or a miss that non-production
//!   environments report with diagnostics.
//! - [`DispatchError`] - everything the dispatch boundary knows how to map
//!   onto an HTTP response. Handlers return these from their lifecycle hooks.
//!
//! The dispatch boundary is the only place that converts a [`DispatchError`]
//! into a response, and it performs at most one corrective redispatch (the
//! not-found fallback).

use serde_json::Value;
use std::fmt;

/// Configuration error
///
/// `scope` names where the problem was found, e.g. `modules`, or
/// `routes:app/account` for a package of a module's route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub scope: String,
    pub message: String,
}

impl ConfigError {
    pub fn new(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "configuration error in {}: {}", self.scope, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Failure of [`RouteResolver::resolve`](crate::route::RouteResolver::resolve)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// The route table or an entry in it is malformed
    Config(ConfigError),
    /// No entry matched and no fallback applies
    NotFound {
        /// Normalized request path that failed to match
        path: String,
    },
    /// No entry matched in a non-production environment; carries the
    /// diagnostic the debug page shows
    Debug {
        message: String,
    },
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::Config(e) => write!(f, "{e}"),
            RouteError::NotFound { path } => write!(f, "no route matches '/{path}'"),
            RouteError::Debug { message } => write!(f, "route debug: {message}"),
        }
    }
}

impl std::error::Error for RouteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RouteError::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for RouteError {
    fn from(e: ConfigError) -> Self {
        RouteError::Config(e)
    }
}

/// Every failure the dispatch boundary maps onto a response
#[derive(Debug)]
pub enum DispatchError {
    /// Recoverable once through the not-found route unless a redirect is set
    NotFound {
        redirect_to: Option<String>,
    },
    /// Programmer or configuration error. Rendered with full detail outside
    /// production, treated as [`DispatchError::NotFound`] in production.
    Debug {
        message: String,
        detail: Option<Value>,
    },
    /// Not a failure: send the client elsewhere
    Redirect {
        to: String,
        status: u16,
    },
    /// Structured domain error rendered as a JSON body
    Domain {
        code: i64,
        message: String,
        params: Value,
        status: u16,
    },
    NoAccess {
        message: String,
        redirect_to: Option<String>,
    },
    InvalidUser {
        message: String,
        redirect_to: Option<String>,
    },
    /// Anything else; logged and answered with 500
    Unclassified(anyhow::Error),
}

impl DispatchError {
    /// A temporary (302) redirect
    pub fn redirect(to: impl Into<String>) -> Self {
        DispatchError::Redirect {
            to: to.into(),
            status: 302,
        }
    }

    pub fn domain(code: i64, message: impl Into<String>, status: u16) -> Self {
        DispatchError::Domain {
            code,
            message: message.into(),
            params: Value::Object(Default::default()),
            status,
        }
    }

    pub fn debug(message: impl Into<String>) -> Self {
        DispatchError::Debug {
            message: message.into(),
            detail: None,
        }
    }

    /// Short, stable label used in logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::NotFound { .. } => "not_found",
            DispatchError::Debug { .. } => "debug",
            DispatchError::Redirect { .. } => "redirect",
            DispatchError::Domain { .. } => "domain",
            DispatchError::NoAccess { .. } => "no_access",
            DispatchError::InvalidUser { .. } => "invalid_user",
            DispatchError::Unclassified(_) => "unclassified",
        }
    }

    /// Whether the handler's `on_no_access` hook must run for this error
    #[must_use]
    pub fn is_access_failure(&self) -> bool {
        matches!(
            self,
            DispatchError::NoAccess { .. } | DispatchError::InvalidUser { .. }
        )
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::NotFound { redirect_to: Some(to) } => {
                write!(f, "not found, redirecting to {to}")
            }
            DispatchError::NotFound { redirect_to: None } => write!(f, "not found"),
            DispatchError::Debug { message, .. } => write!(f, "debug: {message}"),
            DispatchError::Redirect { to, status } => write!(f, "redirect ({status}) to {to}"),
            DispatchError::Domain {
                code,
                message,
                status,
                ..
            } => write!(f, "domain error {code} ({status}): {message}"),
            DispatchError::NoAccess { message, .. } => write!(f, "no access: {message}"),
            DispatchError::InvalidUser { message, .. } => write!(f, "invalid user: {message}"),
            DispatchError::Unclassified(e) => write!(f, "unclassified failure: {e:#}"),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Unclassified(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<RouteError> for DispatchError {
    fn from(e: RouteError) -> Self {
        match e {
            RouteError::NotFound { .. } => DispatchError::NotFound { redirect_to: None },
            RouteError::Debug { message } => DispatchError::Debug {
                message,
                detail: None,
            },
            RouteError::Config(c) => DispatchError::Debug {
                message: c.to_string(),
                detail: Some(Value::String(c.scope)),
            },
        }
    }
}

impl From<ConfigError> for DispatchError {
    fn from(e: ConfigError) -> Self {
        RouteError::Config(e).into()
    }
}

impl From<anyhow::Error> for DispatchError {
    fn from(e: anyhow::Error) -> Self {
        DispatchError::Unclassified(e)
    }
}
