//! Connection parameter models.

use serde::Serialize;

/// Default PostgreSQL port offered by the connection form.
pub const DEFAULT_PORT: &str = "5432";

/// Additional connection options.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionOptions {
    /// Connection timeout in seconds
    pub connect_timeout_secs: u32,
    /// Application name sent to PostgreSQL
    pub application_name: String,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self { connect_timeout_secs: 10, application_name: "pgpeek".to_string() }
    }
}

/// The five values typed into the connection form.
///
/// All fields are free text; the server decides whether they are valid at connect time.
/// The password is skipped by `Serialize` and redacted from `Debug`.
#[derive(Clone, Serialize)]
pub struct ConnectionParams {
    /// Server hostname or IP
    pub host: String,
    /// Server port, as typed
    pub port: String,
    /// Database name
    pub database: String,
    /// Login username
    pub user: String,
    /// Login password
    #[serde(skip)]
    pub password: String,
    /// Additional options
    pub options: ConnectionOptions,
}

impl ConnectionParams {
    /// Create connection parameters from the form fields.
    pub fn new(
        host: impl Into<String>,
        port: impl Into<String>,
        database: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: port.into(),
            database: database.into(),
            user: user.into(),
            password: password.into(),
            options: ConnectionOptions::default(),
        }
    }

    /// Parse the typed port.
    pub fn port_number(&self) -> Result<u16, String> {
        let trimmed = self.port.trim();
        trimmed.parse::<u16>().map_err(|_| format!("Invalid port: \"{trimmed}\""))
    }

    /// Get the display connection string (without password).
    pub fn display_url(&self) -> String {
        format!("postgresql://{}@{}:{}/{}", self.user, self.host, self.port.trim(), self.database)
    }
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self::new("localhost", DEFAULT_PORT, "postgres", "postgres", "")
    }
}

impl std::fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"********")
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_form() {
        let params = ConnectionParams::default();
        assert_eq!(params.host, "localhost");
        assert_eq!(params.port, "5432");
        assert_eq!(params.database, "postgres");
        assert_eq!(params.user, "postgres");
        assert!(params.password.is_empty());
        assert_eq!(params.options.connect_timeout_secs, 10);
        assert_eq!(params.options.application_name, "pgpeek");
    }

    #[test]
    fn test_port_number_parsing() {
        let mut params = ConnectionParams::default();
        assert_eq!(params.port_number(), Ok(5432));

        params.port = " 6543 ".to_string();
        assert_eq!(params.port_number(), Ok(6543));

        params.port = "pg".to_string();
        assert_eq!(params.port_number(), Err("Invalid port: \"pg\"".to_string()));

        params.port = "70000".to_string();
        assert!(params.port_number().is_err());
    }

    #[test]
    fn test_password_never_leaks() {
        let params = ConnectionParams::new("db", "5432", "olympics", "admin", "s3cret");

        let debug = format!("{params:?}");
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("********"));

        let json = serde_json::to_string(&params).unwrap();
        assert!(!json.contains("s3cret"));
        assert!(!json.contains("password"));

        assert_eq!(params.display_url(), "postgresql://admin@db:5432/olympics");
    }
}
