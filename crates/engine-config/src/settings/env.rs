use crate::settings::error::SettingsError;
use std::{collections::HashMap, fs, path::Path};

/// Environment variables from the process, optionally layered with a
/// `.env` file. Values from the file win.
#[derive(Debug, Clone, Default)]
pub struct EnvManager {
    vars: HashMap<String, String>,
}

const SENSITIVE_PATTERNS: [&str; 5] = ["password", "passwd", "secret", "token", "credential"];

impl EnvManager {
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    pub fn from_pairs<K: Into<String>, V: Into<String>>(
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), SettingsError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.parse_env_content(&content)
    }

    /// Loads `path` when it exists; a missing file is not an error.
    pub fn load_optional<P: AsRef<Path>>(&mut self, path: P) -> Result<bool, SettingsError> {
        if !path.as_ref().is_file() {
            return Ok(false);
        }
        self.load_from_file(path)?;
        Ok(true)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Value suitable for logs.
    pub fn display_value(&self, key: &str) -> String {
        let lower = key.to_ascii_lowercase();
        if SENSITIVE_PATTERNS.iter().any(|p| lower.contains(p)) {
            "***".to_string()
        } else {
            self.get(key).unwrap_or_default().to_string()
        }
    }

    fn parse_env_content(&mut self, content: &str) -> Result<(), SettingsError> {
        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let line = line.strip_prefix("export ").unwrap_or(line);

            let Some((key, value)) = line.split_once('=') else {
                return Err(SettingsError::EnvFile(format!(
                    "malformed line {} (expected KEY=VALUE)",
                    line_num + 1
                )));
            };
            let key = key.trim();
            if key.is_empty() {
                return Err(SettingsError::EnvFile(format!(
                    "empty key at line {}",
                    line_num + 1
                )));
            }

            self.vars.insert(key.to_string(), unquote(value.trim()));
        }

        Ok(())
    }
}

fn unquote(value: &str) -> String {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return value[1..value.len() - 1].to_string();
        }
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_file_content() {
        let mut env = EnvManager::default();
        let content = r#"
# Comment
XMLMIG_DB_HOST=db01
export XMLMIG_DB_NAME="loans prod"
XMLMIG_DB_USER='svc'
        "#;

        env.parse_env_content(content).unwrap();
        assert_eq!(env.get("XMLMIG_DB_HOST"), Some("db01"));
        assert_eq!(env.get("XMLMIG_DB_NAME"), Some("loans prod"));
        assert_eq!(env.get("XMLMIG_DB_USER"), Some("svc"));
    }

    #[test]
    fn test_invalid_env_format() {
        let mut env = EnvManager::default();
        assert!(env.parse_env_content("INVALID LINE WITHOUT EQUALS").is_err());
        assert!(env.parse_env_content("=value").is_err());
    }

    #[test]
    fn test_sensitive_values_are_masked() {
        let env = EnvManager::from_pairs([("XMLMIG_DB_PASSWORD", "hunter2"), ("XMLMIG_DB_HOST", "h")]);
        assert_eq!(env.display_value("XMLMIG_DB_PASSWORD"), "***");
        assert_eq!(env.display_value("XMLMIG_DB_HOST"), "h");
    }

    #[test]
    fn test_missing_optional_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut env = EnvManager::default();
        assert!(!env.load_optional(dir.path().join(".env")).unwrap());

        std::fs::write(dir.path().join(".env"), "XMLMIG_WORKERS=8\n").unwrap();
        assert!(env.load_optional(dir.path().join(".env")).unwrap());
        assert_eq!(env.get("XMLMIG_WORKERS"), Some("8"));
    }
}
