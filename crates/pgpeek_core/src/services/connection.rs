//! Database connection handling with deadpool-postgres.
//!
//! pgpeek holds exactly one connection for a session. It is wrapped in a pool of size one so
//! that a dropped connection is recreated on the next query and so `close()` shuts it down
//! deterministically on reconnect.

use crate::error::PeekError;
use crate::models::ConnectionParams;

use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod, Runtime};
use std::time::Duration;
use tokio_postgres::types::ToSql;
use tokio_postgres::NoTls;
use uuid::Uuid;

/// The single database connection of a browsing session.
pub struct ConnectionPool {
    /// Unique identifier for this connection
    id: Uuid,
    /// Connection parameters (password redacted in Debug)
    params: ConnectionParams,
    /// The underlying pool (max size 1)
    pool: Pool,
}

impl ConnectionPool {
    /// Open a connection with the given parameters.
    ///
    /// Connectivity is validated with `SELECT 1` before returning, so bad hosts and rejected
    /// credentials fail here with the driver's message.
    pub async fn connect(params: ConnectionParams) -> Result<Self, PeekError> {
        let port = params.port_number().map_err(PeekError::connection)?;
        let connect_timeout = Duration::from_secs(params.options.connect_timeout_secs as u64);

        let mut pg_config = tokio_postgres::Config::new();
        pg_config.host(params.host.trim());
        pg_config.port(port);
        pg_config.dbname(&params.database);
        pg_config.user(&params.user);
        pg_config.password(&params.password);
        pg_config.application_name(&params.options.application_name);
        pg_config.connect_timeout(connect_timeout);
        pg_config.keepalives(true);
        pg_config.keepalives_idle(Duration::from_secs(60));

        let manager = Manager::from_config(
            pg_config,
            NoTls,
            ManagerConfig { recycling_method: RecyclingMethod::Fast },
        );

        let pool = Pool::builder(manager)
            .max_size(1)
            .create_timeout(Some(connect_timeout))
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| PeekError::connection(format!("Failed to create connection: {e}")))?;

        let client = pool.get().await.map_err(PeekError::from)?;
        client.execute("SELECT 1", &[]).await.map_err(PeekError::from)?;
        drop(client);

        let id = Uuid::new_v4();
        tracing::info!(
            connection_id = %id,
            host = %params.host,
            database = %params.database,
            user = %params.user,
            "Connection established"
        );

        Ok(Self { id, params, pool })
    }

    /// Get the parameters this connection was opened with.
    pub fn params(&self) -> &ConnectionParams {
        &self.params
    }

    /// Check out the connection.
    pub async fn get(&self) -> Result<PooledConnection, PeekError> {
        if self.pool.is_closed() {
            return Err(PeekError::not_connected());
        }
        let client = self.pool.get().await.map_err(PeekError::from)?;
        Ok(PooledConnection { client, connection_id: self.id })
    }

    /// Close the connection.
    pub fn close(&self) {
        self.pool.close();
        tracing::info!(connection_id = %self.id, "Connection closed");
    }

    /// Check if the connection is closed.
    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("id", &self.id)
            .field("params", &self.params)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// A checked-out connection.
///
/// Automatically returns to the pool when dropped.
pub struct PooledConnection {
    client: deadpool_postgres::Client,
    connection_id: Uuid,
}

impl PooledConnection {
    /// Get the connection ID this client belongs to.
    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    /// Execute a query that returns rows.
    pub async fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<tokio_postgres::Row>, PeekError> {
        self.client.query(sql, params).await.map_err(PeekError::from)
    }

    /// Prepare a statement, exposing its result columns before any row is fetched.
    pub async fn prepare(&self, sql: &str) -> Result<tokio_postgres::Statement, PeekError> {
        self.client.prepare(sql).await.map_err(PeekError::from)
    }

    /// Execute a prepared statement.
    pub async fn query_statement(
        &self,
        statement: &tokio_postgres::Statement,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<tokio_postgres::Row>, PeekError> {
        self.client.query(statement, params).await.map_err(PeekError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_rejects_bad_port_before_dialing() {
        let params = ConnectionParams::new("localhost", "54x2", "postgres", "postgres", "");
        let err = ConnectionPool::connect(params).await.unwrap_err();

        assert!(err.is_connection());
        assert_eq!(err.to_string(), "Connection error: Invalid port: \"54x2\"");
    }

    #[tokio::test]
    async fn test_connect_to_closed_port_is_connection_error() {
        // Port 1 is reserved (tcpmux) and never runs PostgreSQL
        let mut params = ConnectionParams::new("127.0.0.1", "1", "postgres", "postgres", "");
        params.options.connect_timeout_secs = 2;
        let err = ConnectionPool::connect(params).await.unwrap_err();

        assert!(err.is_connection(), "unexpected error: {err:?}");
    }
}
