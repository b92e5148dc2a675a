//! Database connectivity


use std::time::Duration;

use actix_web::web;
use diesel::connection::SimpleConnection;
use diesel::r2d2::{self, ConnectionManager, CustomizeConnection, Pool};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::{debug, trace};
use tokio::time;

use crate::config::Config;
use crate::error::{Error, Result};


pub mod schema;


/// Connection pool type used throughout sitecam
pub type ConnectionPool = Pool<ConnectionManager<SqliteConnection>>;


/// Pooled connection type used throughout sitecam
pub type PooledConnection = r2d2::PooledConnection<ConnectionManager<SqliteConnection>>;


const MIGRATIONS: EmbeddedMigrations = embed_migrations!();


/// Applies per-connection SQLite settings when a connection is opened
#[derive(Debug)]
struct ConnectionOptions {
    busy_timeout: Duration,
}

impl CustomizeConnection<SqliteConnection, r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> std::result::Result<(), r2d2::Error> {
        conn.batch_execute(&format!("PRAGMA busy_timeout = {};", self.busy_timeout.as_millis()))
            .map_err(r2d2::Error::QueryError)
    }
}


/// Handle to the sitecam database
///
/// Cloning is cheap; clones share the underlying pool.
#[derive(Clone)]
pub struct Database {
    pool: ConnectionPool,
    timeout: Duration,
}

impl Database {

    /// Connects to the database described by `config`
    pub fn connect(config: &Config) -> Result<Database> {
        let db_url = config.database_url()?;
        Database::open(&db_url, config.max_connections, config.query_timeout())
    }

    /// Opens a connection pool and runs pending migrations
    ///
    /// `timeout` bounds pool checkout, SQLite lock waits, and every operation
    /// submitted through `run`.
    pub fn open(db_url: &str, max_connections: u32, timeout: Duration) -> Result<Database> {

        debug!("connecting to database at {}", db_url);
        let pool = Pool::builder()
            .max_size(max_connections)
            .connection_timeout(timeout)
            .connection_customizer(Box::new(ConnectionOptions { busy_timeout: timeout }))
            .build(ConnectionManager::new(db_url))?;

        debug!("running migrations if necessary");
        let mut conn = pool.get()?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(Error::Migration)?;

        Ok(Database { pool, timeout })
    }

    /// Gets a pooled database connection
    pub fn conn(&self) -> Result<PooledConnection> {
        Ok(self.pool.get()?)
    }

    /// Runs a database operation on the blocking thread pool
    ///
    /// Fails with `Error::Timeout` if the operation does not complete within
    /// the configured timeout. The operation itself is not cancelled.
    pub async fn run<F, T>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        let task = web::block(move || {
            trace!("acquiring database connection");
            let mut conn = pool.get()?;
            op(&mut conn)
        });

        Ok(time::timeout(self.timeout, task).await???)
    }
}
