//! Scoped database connections using sqlx
//!
//! Every database interaction opens its own connection and closes it before
//! returning, on success and on error alike. There is no pool.

use crate::error::Result;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, warn};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Open a connection, hand it to `f`, and close it whatever `f` returns.
///
/// Callers move owned data into the closure:
///
/// ```rust,no_run
/// # use askdb::db::with_connection;
/// # async fn demo(options: sqlx::postgres::PgConnectOptions) -> askdb::error::Result<()> {
/// let sql = "SELECT 1".to_string();
/// with_connection(&options, move |conn| {
///     Box::pin(async move {
///         sqlx::query(&sql).execute(&mut *conn).await?;
///         Ok::<_, askdb::error::AskDbError>(())
///     })
/// })
/// .await
/// # }
/// ```
pub async fn with_connection<T, F>(options: &PgConnectOptions, f: F) -> Result<T>
where
    F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, Result<T>>,
{
    let mut conn = PgConnection::connect_with(options).await?;
    debug!("database connection opened");

    let result = f(&mut conn).await;

    if let Err(e) = conn.close().await {
        warn!("Failed to close database connection cleanly: {}", e);
    } else {
        debug!("database connection closed");
    }

    result
}
