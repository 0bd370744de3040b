use serde::{Deserialize, Serialize};
use std::fmt;

/// SQL Server endpoint and credentials used by both the source reader and
/// the insert sink.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConnectionSettings {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub trust_cert: bool,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1433,
            database: String::new(),
            user: String::new(),
            password: String::new(),
            trust_cert: true,
        }
    }
}

impl ConnectionSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// Keeps the password out of logs.
impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"***")
            .field("trust_cert", &self.trust_cert)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let s: ConnectionSettings = serde_json::from_str(r#"{"host": "db01", "database": "apps", "password": "secret"}"#).unwrap();
        assert_eq!(s.port, 1433);
        assert_eq!(s.address(), "db01:1433");
        assert!(!format!("{s:?}").contains("secret"));
    }
}
