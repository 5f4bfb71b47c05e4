//! Error types for pgpeek.
//!
//! Every failure a user action can hit maps onto one [`PeekError`] variant. The front end
//! turns it into an [`ErrorInfo`] notification and the session carries on.

use thiserror::Error;

/// Main error type for pgpeek.
#[derive(Debug, Error)]
pub enum PeekError {
    /// Database connection failed or was lost.
    #[error("Connection error: {message}")]
    Connection {
        /// Driver message, surfaced verbatim.
        message: String,
        /// Optional underlying error source.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The server rejected the supplied credentials.
    #[error("Authentication error: {message}")]
    Authentication {
        /// Driver message, surfaced verbatim.
        message: String,
        /// Actionable hint for the user.
        hint: Option<String>,
    },

    /// Query or schema lookup rejected by the server.
    #[error("{message}")]
    Query {
        /// PostgreSQL error message.
        message: String,
        /// Additional detail from PostgreSQL.
        detail: Option<String>,
        /// PostgreSQL hint.
        hint: Option<String>,
        /// Position in query (1-indexed).
        position: Option<usize>,
        /// PostgreSQL error code (e.g., "42P01").
        code: Option<String>,
    },

    /// Writing the export file failed.
    #[error("Export error: {message}")]
    Export {
        /// Human-readable error message.
        message: String,
        /// Actionable hint for the user.
        hint: Option<String>,
        /// Optional underlying error source.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A user action referenced something that does not exist in the session.
    #[error("{message}")]
    InvalidInput {
        /// Human-readable error message.
        message: String,
    },

    /// Unexpected internal error.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
    },
}

impl PeekError {
    // ========== Constructors ==========

    /// Create a new connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection { message: message.into(), source: None }
    }

    /// Create a new connection error with source.
    pub fn connection_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection { message: message.into(), source: Some(Box::new(source)) }
    }

    /// Create a new authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
            hint: Some("Check username and password".to_string()),
        }
    }

    /// Create a new query error with full PostgreSQL details.
    pub fn query(
        message: impl Into<String>,
        detail: Option<String>,
        hint: Option<String>,
        position: Option<usize>,
        code: Option<String>,
    ) -> Self {
        Self::Query { message: message.into(), detail, hint, position, code }
    }

    /// Create a query error that carries only a message.
    pub fn query_message(message: impl Into<String>) -> Self {
        Self::query(message, None, None, None, None)
    }

    /// Create a new export error.
    pub fn export(message: impl Into<String>, hint: Option<&str>) -> Self {
        Self::Export { message: message.into(), hint: hint.map(String::from), source: None }
    }

    /// Create a new export error with source.
    pub fn export_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Export {
            message: message.into(),
            hint: Some("Check file permissions and disk space".to_string()),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput { message: message.into() }
    }

    /// Create a new internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Error returned when an action needs a connection and there is none.
    pub fn not_connected() -> Self {
        Self::connection("Not connected to a database")
    }

    // ========== Methods ==========

    /// Check if this error came from the connection layer.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Authentication { .. })
    }

    /// Get the error category name.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "Connection",
            Self::Authentication { .. } => "Authentication",
            Self::Query { .. } => "Query",
            Self::Export { .. } => "Export",
            Self::InvalidInput { .. } => "Input",
            Self::Internal { .. } => "Internal",
        }
    }

    /// Get actionable hint for the user.
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::Connection { .. } => Some("Check that the database server is running"),
            Self::Authentication { hint, .. } => hint.as_deref(),
            Self::Query { hint, .. } => hint.as_deref(),
            Self::Export { hint, .. } => hint.as_deref(),
            Self::InvalidInput { .. } => None,
            Self::Internal { .. } => Some("Please report this issue"),
        }
    }

    /// Get PostgreSQL error code (if applicable).
    pub fn pg_code(&self) -> Option<&str> {
        match self {
            Self::Query { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Get position in query (if applicable).
    pub fn position(&self) -> Option<usize> {
        match self {
            Self::Query { position, .. } => *position,
            _ => None,
        }
    }

    /// Convert to user-displayable error info.
    pub fn to_error_info(&self) -> ErrorInfo {
        let error_type = format!("{} Error", self.category());
        let message = self.to_string();
        let hint = self.hint().map(String::from);

        let technical_detail = match self {
            Self::Query { detail, code, position, .. } => {
                let mut parts = Vec::new();
                if let Some(code) = code {
                    parts.push(format!("Code: {code}"));
                }
                if let Some(pos) = position {
                    parts.push(format!("Position: {pos}"));
                }
                if let Some(detail) = detail {
                    parts.push(format!("Detail: {detail}"));
                }
                if parts.is_empty() {
                    None
                } else {
                    Some(parts.join("\n"))
                }
            }
            _ => None,
        };

        ErrorInfo { error_type, message, hint, technical_detail }
    }
}

/// User-displayable error information.
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    /// Category name (e.g., "Connection Error").
    pub error_type: String,
    /// User-friendly message.
    pub message: String,
    /// Actionable suggestion.
    pub hint: Option<String>,
    /// Technical detail shown under the message.
    pub technical_detail: Option<String>,
}

// ========== Error Conversions ==========

/// Convert from tokio_postgres::Error to PeekError.
impl From<tokio_postgres::Error> for PeekError {
    fn from(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let message = db_err.message().to_string();
            let detail = db_err.detail().map(String::from);
            let hint = db_err.hint().map(String::from);
            let position = db_err.position().and_then(|p| match p {
                tokio_postgres::error::ErrorPosition::Original(pos) => Some(*pos as usize),
                tokio_postgres::error::ErrorPosition::Internal { .. } => None,
            });
            let code = Some(db_err.code().code().to_string());

            let code_str = db_err.code().code();
            return match code_str {
                "28P01" => PeekError::Authentication {
                    message,
                    hint: Some("Invalid password - check your credentials".to_string()),
                },
                _ if code_str.starts_with("28") => PeekError::Authentication {
                    message,
                    hint: Some(
                        "Authentication failed - check username and permissions".to_string(),
                    ),
                },
                // Also covers 3D000 (database does not exist) raised during startup
                _ if code_str.starts_with("08") || code_str == "3D000" => {
                    PeekError::Connection { message, source: Some(Box::new(err)) }
                }
                _ => PeekError::Query { message, detail, hint, position, code },
            };
        }

        if err.is_closed() {
            return PeekError::Connection {
                message: "Connection closed".to_string(),
                source: Some(Box::new(err)),
            };
        }

        PeekError::Connection { message: err.to_string(), source: Some(Box::new(err)) }
    }
}

/// Convert from deadpool_postgres::PoolError to PeekError.
impl From<deadpool_postgres::PoolError> for PeekError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        match err {
            deadpool_postgres::PoolError::Backend(e) => PeekError::from(e),
            other => PeekError::connection(format!("Failed to acquire connection: {other}")),
        }
    }
}

/// Convert from std::io::Error to PeekError.
impl From<std::io::Error> for PeekError {
    fn from(err: std::io::Error) -> Self {
        PeekError::export_with_source(err.to_string(), err)
    }
}

/// Convert from csv::Error to PeekError.
impl From<csv::Error> for PeekError {
    fn from(err: csv::Error) -> Self {
        PeekError::export_with_source(format!("CSV error: {err}"), err)
    }
}
