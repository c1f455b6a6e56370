//! ClickHouse client wrapper with a bounded checkout pool.
//!
//! The underlying HTTP client already keeps a connection pool; the
//! semaphore here caps how many operations run at once so concurrent
//! channel workers never exceed the configured pool size.

use crate::config::ClickHouseConfig;
use backblast_core::{Error, Result};
use clickhouse::Client;
use std::future::Future;
use std::ops::Deref;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::info;

/// ClickHouse client wrapper.
#[derive(Clone)]
pub struct ClickHouseClient {
    inner: Client,
    config: ClickHouseConfig,
    permits: Arc<Semaphore>,
}

/// A checked-out client bound to one database. The slot is released on drop.
pub struct PooledClient {
    client: Client,
    _permit: OwnedSemaphorePermit,
}

impl Deref for PooledClient {
    type Target = Client;

    fn deref(&self) -> &Client {
        &self.client
    }
}

impl ClickHouseClient {
    /// Creates a new ClickHouse client.
    pub fn new(config: ClickHouseConfig) -> Result<Self> {
        if config.pool_size == 0 {
            return Err(Error::config("clickhouse pool_size must be at least 1"));
        }

        let mut client = Client::default()
            .with_url(&config.url)
            .with_database(&config.database);

        if let Some(ref user) = config.username {
            client = client.with_user(user);
        }

        if let Some(ref pass) = config.password {
            client = client.with_password(pass);
        }

        info!(
            url = %config.url,
            database = %config.database,
            pool_size = config.pool_size,
            "Created ClickHouse client"
        );

        Ok(Self {
            inner: client,
            permits: Arc::new(Semaphore::new(config.pool_size)),
            config,
        })
    }

    /// Returns the inner clickhouse client (base database, no checkout).
    pub fn inner(&self) -> &Client {
        &self.inner
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClickHouseConfig {
        &self.config
    }

    /// Free checkout slots.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Checks out a client bound to `database` (the base database if `None`).
    ///
    /// Waits at most the configured timeout for a free slot.
    pub async fn checkout(&self, database: Option<&str>) -> Result<PooledClient> {
        let permit = tokio::time::timeout(self.config.timeout(), self.permits.clone().acquire_owned())
            .await
            .map_err(|_| Error::timeout("waiting for a ClickHouse checkout"))?
            .map_err(|_| Error::internal("ClickHouse pool closed"))?;

        let client = match database {
            Some(db) => self.inner.clone().with_database(db),
            None => self.inner.clone(),
        };

        Ok(PooledClient {
            client,
            _permit: permit,
        })
    }

    /// Runs `op` under the configured query timeout.
    pub async fn timed<T, F>(&self, what: &str, op: F) -> Result<T>
    where
        F: Future<Output = clickhouse::error::Result<T>>,
    {
        tokio::time::timeout(self.config.timeout(), op)
            .await
            .map_err(|_| Error::timeout(format!("ClickHouse {}", what)))?
            .map_err(|e| Error::store(format!("{} failed: {}", what, e)))
    }
}
