//! Handler identifier classification and rewriting.
//!
//! Declared identifiers look like `loads.account.profile` or
//! `api.actions.user.do_update`: an optional API marker, a package token,
//! dot-separated namespace segments and a snake_case command. They are
//! rewritten into handler-reference form, `account.ProfileLoad` and
//! `user.UpdateAction` respectively.

use super::resolved::RequestType;
use crate::config::FrameworkConfig;

/// Classified handler identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerTarget {
    pub request_type: RequestType,
    /// Rewritten identifier
    pub handler_id: String,
    /// Command with any action prefix removed, snake_case as declared
    pub command: String,
}

/// Classify `action` by its package component and rewrite it.
///
/// Returns a message describing the problem when the package component is
/// neither the loads nor the actions token, or no command is present.
pub fn classify(action: &str, config: &FrameworkConfig) -> Result<HandlerTarget, String> {
    let mut parts: Vec<&str> = action.split('.').filter(|p| !p.is_empty()).collect();

    let api = parts.first() == Some(&config.api_package.as_str()) && parts.len() > 1;
    if api {
        parts.remove(0);
    }

    let package = parts
        .first()
        .copied()
        .ok_or_else(|| format!("handler id '{action}' is empty"))?;
    let request_type = if package == config.loads_package {
        if api { RequestType::ApiLoad } else { RequestType::Load }
    } else if package == config.actions_package {
        if api { RequestType::ApiAction } else { RequestType::Action }
    } else {
        return Err(format!(
            "handler id '{action}' has package '{package}', expected '{}' or '{}'",
            config.loads_package, config.actions_package
        ));
    };

    let Some((raw_command, namespace)) = parts[1..].split_last() else {
        return Err(format!("handler id '{action}' has no command"));
    };

    let command = match request_type {
        RequestType::Action | RequestType::ApiAction => raw_command
            .strip_prefix(config.action_prefix.as_str())
            .filter(|c| !c.is_empty())
            .unwrap_or(raw_command),
        _ => raw_command,
    };

    let mut handler_id = String::with_capacity(action.len() + 8);
    for segment in namespace {
        handler_id.push_str(segment);
        handler_id.push('.');
    }
    handler_id.push_str(&pascal_case(command));
    handler_id.push_str(request_type.handler_suffix());

    Ok(HandlerTarget {
        request_type,
        handler_id,
        command: command.to_string(),
    })
}

/// `user_profile` -> `UserProfile`; `-` also separates words.
#[must_use]
pub fn pascal_case(s: &str) -> String {
    s.split(['_', '-'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> FrameworkConfig {
        FrameworkConfig::default()
    }

    #[test]
    fn test_load_rewrite() {
        let t = classify("loads.account.profile", &cfg()).unwrap();
        assert_eq!(t.request_type, RequestType::Load);
        assert_eq!(t.handler_id, "account.ProfileLoad");
        assert_eq!(t.command, "profile");
    }

    #[test]
    fn test_action_prefix_stripped() {
        let t = classify("actions.user.do_change_password", &cfg()).unwrap();
        assert_eq!(t.request_type, RequestType::Action);
        assert_eq!(t.handler_id, "user.ChangePasswordAction");
        assert_eq!(t.command, "change_password");
    }

    #[test]
    fn test_api_variants() {
        let t = classify("api.loads.catalog.items", &cfg()).unwrap();
        assert_eq!(t.request_type, RequestType::ApiLoad);
        assert_eq!(t.handler_id, "catalog.ItemsLoad");

        let t = classify("api.actions.do_sync", &cfg()).unwrap();
        assert_eq!(t.request_type, RequestType::ApiAction);
        assert_eq!(t.handler_id, "SyncAction");
    }

    #[test]
    fn test_unknown_package_rejected() {
        let err = classify("views.account.profile", &cfg()).unwrap_err();
        assert!(err.contains("views"));
        assert!(classify("loads", &cfg()).is_err());
    }

    #[test]
    fn test_pascal_case() {
        assert_eq!(pascal_case("user_profile"), "UserProfile");
        assert_eq!(pascal_case("default"), "Default");
        assert_eq!(pascal_case("a-b_c"), "ABC");
    }
}
