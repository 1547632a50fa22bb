use super::pattern::CompiledPattern;
use crate::config::FrameworkConfig;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// `default` field of a route entry
///
/// `true` marks a fallback entry; the dynamic token string marks "fall back
/// to the positional convention".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultMarker {
    Flag(bool),
    Token(String),
}

/// A nested route as declared
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedSpec {
    pub slot: String,
    pub action: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub args: BTreeMap<String, String>,
    #[serde(default)]
    pub nested: Vec<NestedSpec>,
}

/// A route entry as declared in a route table document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntrySpec {
    /// Pattern relative to the package segment
    #[serde(default, alias = "pattern")]
    pub route: Option<String>,
    #[serde(default)]
    pub constraints: HashMap<String, String>,
    #[serde(default)]
    pub method: Option<String>,
    /// Handler identifier, e.g. `loads.account.profile`
    #[serde(default, alias = "handler")]
    pub action: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub nested: Vec<NestedSpec>,
    #[serde(default)]
    pub default: Option<DefaultMarker>,
    /// Static arguments; captured arguments take precedence
    #[serde(default)]
    pub args: BTreeMap<String, String>,
    #[serde(default)]
    pub request_validators: Vec<String>,
    #[serde(default)]
    pub response_validators: Vec<String>,
}

/// Role of an entry during a package scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Ordinary entry, tried in declared order
    Route,
    /// Tried only after every ordinary entry failed
    Fallback,
    /// Not matched itself; enables the positional convention as last resort
    DynamicMarker,
}

/// A nested route, validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedRoute {
    pub slot: String,
    pub action: String,
    pub namespace: Option<String>,
    pub args: BTreeMap<String, String>,
    pub nested: Vec<NestedRoute>,
}

/// A compiled, immutable route entry
#[derive(Debug, Clone)]
pub struct RouteEntry {
    pub pattern: String,
    compiled: CompiledPattern,
    pub kind: EntryKind,
    pub http_method: Option<String>,
    pub action: Option<String>,
    pub namespace: Option<String>,
    pub nested: Vec<NestedRoute>,
    pub static_args: BTreeMap<String, String>,
    pub request_validators: Vec<String>,
    pub response_validators: Vec<String>,
}

impl RouteEntry {
    /// Validate and compile one declared entry of `package` in `module`.
    pub fn compile(
        spec: RouteEntrySpec,
        module: &str,
        package: &str,
        config: &FrameworkConfig,
    ) -> Result<Self, ConfigError> {
        let scope = format!("routes:{module}/{package}");
        let pattern = spec.route.clone().unwrap_or_default();

        let kind = match &spec.default {
            None | Some(DefaultMarker::Flag(false)) => EntryKind::Route,
            Some(DefaultMarker::Flag(true)) => EntryKind::Fallback,
            Some(DefaultMarker::Token(t)) if *t == config.dynamic_token => EntryKind::DynamicMarker,
            Some(DefaultMarker::Token(t)) => {
                return Err(ConfigError::new(
                    scope,
                    format!(
                        "default marker '{t}' in pattern '{pattern}' is neither a boolean nor '{}'",
                        config.dynamic_token
                    ),
                ))
            }
        };

        if kind != EntryKind::DynamicMarker && spec.action.as_deref().is_none_or(str::is_empty) {
            return Err(ConfigError::new(
                scope,
                format!("entry with pattern '{pattern}' has no action"),
            ));
        }

        let compiled = CompiledPattern::compile(&pattern, &spec.constraints)
            .map_err(|msg| ConfigError::new(scope.clone(), msg))?;

        let nested = spec
            .nested
            .into_iter()
            .map(|n| compile_nested(n, 1, &scope, config.max_nested_depth))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            pattern,
            compiled,
            kind,
            http_method: spec.method.filter(|m| !m.trim().is_empty()),
            action: spec.action,
            namespace: spec.namespace.filter(|n| !n.is_empty()),
            nested,
            static_args: spec.args,
            request_validators: spec.request_validators,
            response_validators: spec.response_validators,
        })
    }

    /// Whether this entry applies to `method` (case-insensitive; no method
    /// declared means every method)
    #[must_use]
    pub fn accepts_method(&self, method: &str) -> bool {
        self.http_method
            .as_deref()
            .is_none_or(|m| m.eq_ignore_ascii_case(method))
    }

    #[must_use]
    pub fn matches(&self, remaining: &str) -> Option<BTreeMap<String, String>> {
        self.compiled.matches(remaining)
    }
}

fn compile_nested(
    spec: NestedSpec,
    depth: usize,
    scope: &str,
    max_depth: usize,
) -> Result<NestedRoute, ConfigError> {
    if depth > max_depth {
        return Err(ConfigError::new(
            scope,
            format!(
                "nested route '{}' exceeds the maximum nesting depth of {max_depth}",
                spec.slot
            ),
        ));
    }
    if spec.slot.is_empty() || spec.action.is_empty() {
        return Err(ConfigError::new(
            scope,
            "nested route needs both a slot and an action",
        ));
    }
    let nested = spec
        .nested
        .into_iter()
        .map(|n| compile_nested(n, depth + 1, scope, max_depth))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(NestedRoute {
        slot: spec.slot,
        action: spec.action,
        namespace: spec.namespace.filter(|n| !n.is_empty()),
        args: spec.args,
        nested,
    })
}
