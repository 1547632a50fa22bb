use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// What kind of invocation a resolved route leads to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    #[default]
    Load,
    Action,
    ApiLoad,
    ApiAction,
    File,
}

impl RequestType {
    #[must_use]
    pub fn is_api(self) -> bool {
        matches!(self, RequestType::ApiLoad | RequestType::ApiAction)
    }

    /// Suffix of the rewritten handler identifier
    #[must_use]
    pub fn handler_suffix(self) -> &'static str {
        match self {
            RequestType::Load | RequestType::ApiLoad => "Load",
            RequestType::Action | RequestType::ApiAction => "Action",
            RequestType::File => "",
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RequestType::Load => "load",
            RequestType::Action => "action",
            RequestType::ApiLoad => "api_load",
            RequestType::ApiAction => "api_action",
            RequestType::File => "file",
        };
        write!(f, "{s}")
    }
}

/// Static asset coordinates
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    pub file_type: String,
    pub file_url: String,
}

/// API-only handler metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApiMetadata {
    /// Command the API handler was addressed by, e.g. `update`
    pub method_name: String,
    pub request_validators: Vec<String>,
    pub response_validators: Vec<String>,
}

/// Reference to a handler, with its own nested slots
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandlerRef {
    /// Module supplying the handler
    pub namespace: String,
    /// Rewritten identifier, e.g. `account.ProfileLoad`
    pub handler_id: String,
    /// Identifier as declared, e.g. `loads.account.profile`
    pub action: String,
    pub request_type: RequestType,
    pub args: BTreeMap<String, String>,
    pub nested: BTreeMap<String, HandlerRef>,
}

/// Outcome of route resolution
///
/// Built fresh for every request and never shared between requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedRoute {
    pub matched: bool,
    pub request_type: RequestType,
    /// Module supplying the handler (or owning the file)
    pub namespace: String,
    /// Rewritten identifier, e.g. `account.ProfileLoad`; empty for files
    pub handler_id: String,
    /// Identifier as declared, e.g. `loads.account.profile`
    pub action: String,
    pub args: BTreeMap<String, String>,
    pub nested_routes: BTreeMap<String, HandlerRef>,
    pub file_info: Option<FileInfo>,
    pub http_method: Option<String>,
    pub api: Option<ApiMetadata>,
}

impl ResolvedRoute {
    /// Nothing matched; the caller answers 404
    #[must_use]
    pub fn unmatched() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn handler(namespace: &str, handler_id: String, action: String, request_type: RequestType) -> Self {
        Self {
            matched: true,
            request_type,
            namespace: namespace.to_string(),
            handler_id,
            action,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn file(namespace: &str, file_type: String, file_url: String) -> Self {
        Self {
            matched: true,
            request_type: RequestType::File,
            namespace: namespace.to_string(),
            file_info: Some(FileInfo {
                file_type,
                file_url,
            }),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_args(mut self, args: BTreeMap<String, String>) -> Self {
        self.args = args;
        self
    }

    #[must_use]
    pub fn with_nested(mut self, nested: BTreeMap<String, HandlerRef>) -> Self {
        self.nested_routes = nested;
        self
    }

    #[must_use]
    pub fn with_http_method(mut self, method: Option<String>) -> Self {
        self.http_method = method;
        self
    }

    #[must_use]
    pub fn with_api(mut self, api: Option<ApiMetadata>) -> Self {
        self.api = api;
        self
    }

    #[must_use]
    pub fn arg(&self, name: &str) -> Option<&str> {
        self.args.get(name).map(String::as_str)
    }
}
