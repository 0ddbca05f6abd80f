//! Request classification: action kind, level, description, and module.

use wardgate_entity::activity::{ActionKind, ActivityLevel};

/// Path fragments that mark an operation as risky.
const RISK_TOKENS: &[&str] = &["delete", "bulk-", "admin", "export", "batch", "system"];

/// How a finished request is recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub action_kind: ActionKind,
    pub level: ActivityLevel,
    pub description: String,
    pub module: String,
    pub object_type: Option<String>,
    pub object_id: Option<String>,
}

/// Classify a request by method, path, and response status.
pub fn classify(method: &str, path: &str, status: u16) -> Classification {
    let method = method.to_ascii_uppercase();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let action_kind = action_kind(&method, status);

    let (object_type, object_id) = match segments.as_slice() {
        [kind, id, ..] => (Some(kind.to_string()), Some(id.to_string())),
        _ => (None, None),
    };

    Classification {
        action_kind,
        level: level(&method, path, status),
        description: describe(&method, path, &segments, status),
        module: segments.first().map_or_else(|| "Unknown".to_string(), |s| capitalize(s)),
        object_type,
        object_id,
    }
}

fn action_kind(method: &str, status: u16) -> ActionKind {
    if status >= 500 {
        return ActionKind::Error;
    }
    match method {
        "POST" => match status {
            201 => ActionKind::Create,
            200..=299 => ActionKind::Update,
            400.. => ActionKind::Error,
            _ => ActionKind::Other,
        },
        _ if status == 401 || status == 403 => ActionKind::AccessDenied,
        "GET" | "HEAD" => ActionKind::View,
        "PUT" | "PATCH" => ActionKind::Update,
        "DELETE" => ActionKind::Delete,
        _ => ActionKind::Other,
    }
}

fn level(method: &str, path: &str, status: u16) -> ActivityLevel {
    if method == "DELETE" && status >= 400 {
        return ActivityLevel::Critical;
    }
    let base = match method {
        "POST" | "PUT" | "PATCH" => ActivityLevel::Medium,
        "DELETE" => ActivityLevel::High,
        _ => ActivityLevel::Low,
    };
    let lowered = path.to_lowercase();
    if RISK_TOKENS.iter().any(|t| lowered.contains(t)) {
        base.raised().max(ActivityLevel::High)
    } else {
        base
    }
}

fn describe(method: &str, path: &str, segments: &[&str], status: u16) -> String {
    let verb = match method {
        "GET" | "HEAD" => "Viewed",
        "POST" if status == 201 => "Created",
        "POST" => "Submitted",
        "PUT" => "Updated",
        "PATCH" => "Modified",
        "DELETE" => "Deleted",
        _ => "Accessed",
    };

    let mut description = match segments {
        [] => format!("{verb} {path}"),
        [resource] => format!("{verb} {}", humanize(resource)),
        // POST targets the collection, so the id is left out.
        [resource, ..] if method == "POST" => format!("{verb} {}", humanize(resource)),
        [resource, id, ..] => format!("{verb} {} {id}", humanize(resource)),
    };
    if status >= 400 {
        description.push_str(&format!(" (Error {status})"));
    }
    description
}

fn humanize(segment: &str) -> String {
    segment.replace(['-', '_'], " ")
}

fn capitalize(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_kinds() {
        assert_eq!(classify("GET", "/patients/", 200).action_kind, ActionKind::View);
        assert_eq!(classify("POST", "/patients/", 201).action_kind, ActionKind::Create);
        assert_eq!(classify("POST", "/patients/7", 200).action_kind, ActionKind::Update);
        assert_eq!(classify("POST", "/patients/", 400).action_kind, ActionKind::Error);
        assert_eq!(classify("PATCH", "/patients/7", 200).action_kind, ActionKind::Update);
        assert_eq!(classify("DELETE", "/patients/7", 204).action_kind, ActionKind::Delete);
        assert_eq!(classify("OPTIONS", "/patients/", 200).action_kind, ActionKind::Other);
        assert_eq!(classify("GET", "/patients/", 503).action_kind, ActionKind::Error);
        assert_eq!(
            classify("GET", "/billing/", 403).action_kind,
            ActionKind::AccessDenied
        );
    }

    #[test]
    fn test_levels() {
        assert_eq!(classify("GET", "/patients/", 200).level, ActivityLevel::Low);
        assert_eq!(classify("POST", "/patients/", 201).level, ActivityLevel::Medium);
        assert_eq!(classify("DELETE", "/patients/7", 204).level, ActivityLevel::High);
        assert_eq!(classify("DELETE", "/patients/7", 404).level, ActivityLevel::Critical);
        // Risk tokens raise one step, to at least high.
        assert_eq!(classify("GET", "/reports/export", 200).level, ActivityLevel::High);
        assert_eq!(classify("POST", "/admin/users/bulk", 200).level, ActivityLevel::High);
        assert_eq!(
            classify("DELETE", "/users/bulk-delete", 200).level,
            ActivityLevel::Critical
        );
    }

    #[test]
    fn test_descriptions() {
        let c = classify("GET", "/lab-results/42", 200);
        assert_eq!(c.description, "Viewed lab results 42");
        assert_eq!(c.module, "Lab-results");
        assert_eq!(c.object_type.as_deref(), Some("lab-results"));
        assert_eq!(c.object_id.as_deref(), Some("42"));

        assert_eq!(classify("POST", "/patients/", 201).description, "Created patients");
        assert_eq!(
            classify("POST", "/patients/new", 400).description,
            "Submitted patients (Error 400)"
        );
        assert_eq!(
            classify("DELETE", "/wards/3", 500).description,
            "Deleted wards 3 (Error 500)"
        );
        assert_eq!(classify("GET", "/", 200).description, "Viewed /");
        assert_eq!(classify("GET", "/", 200).module, "Unknown");
    }
}
