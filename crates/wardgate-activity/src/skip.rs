//! Paths that never produce an activity record.

use wardgate_core::config::ActivityConfig;

/// Prefix and suffix matches against the request path.
#[derive(Debug, Clone, Default)]
pub struct SkipSet {
    prefixes: Vec<String>,
    suffixes: Vec<String>,
}

impl SkipSet {
    pub fn new(prefixes: Vec<String>, suffixes: Vec<String>) -> Self {
        Self {
            prefixes: prefixes.into_iter().filter(|p| !p.is_empty()).collect(),
            suffixes: suffixes.into_iter().filter(|s| !s.is_empty()).collect(),
        }
    }

    pub fn from_config(config: &ActivityConfig) -> Self {
        Self::new(config.skip_prefixes.clone(), config.skip_suffixes.clone())
    }

    pub fn skips(&self, path: &str) -> bool {
        // "/auth/session/status/" should match "/status" too.
        let trimmed = if path.len() > 1 {
            path.trim_end_matches('/')
        } else {
            path
        };
        self.prefixes.iter().any(|p| path.starts_with(p.as_str()))
            || self
                .suffixes
                .iter()
                .any(|s| path.ends_with(s.as_str()) || trimmed.ends_with(s.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_skip_set() {
        let skip = SkipSet::from_config(&ActivityConfig::default());
        assert!(skip.skips("/static/css/site.css"));
        assert!(skip.skips("/favicon.ico"));
        assert!(skip.skips("/health"));
        assert!(skip.skips("/activity/statistics"));
        assert!(skip.skips("/auth/session/status"));
        assert!(skip.skips("/wards/ping/"));
        assert!(!skip.skips("/patients/42"));
        assert!(!skip.skips("/admin/alerts/"));
    }

    #[test]
    fn test_empty_entries_ignored() {
        let skip = SkipSet::new(vec![String::new()], vec![String::new()]);
        assert!(!skip.skips("/patients/"));
    }
}
