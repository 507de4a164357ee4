use std::{
    ops::{Deref, DerefMut},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use redis::{RedisResult, aio::MultiplexedConnection};
use tokio::sync::{Semaphore, SemaphorePermit};

use super::{
    error::{StoreError, StoreResult},
    keys::StoreKeys,
    traits::{CredentialStore, RuleStore, Store},
};
use crate::config::RedisStoreConfig;

/// Opens new connections for a [`ConnectionPool`].
#[async_trait]
trait Dial: Send + Sync {
    type Conn: Send;

    async fn dial(&self) -> StoreResult<Self::Conn>;
}

#[async_trait]
impl Dial for redis::Client {
    type Conn = MultiplexedConnection;

    async fn dial(&self) -> StoreResult<MultiplexedConnection> {
        Ok(self.get_multiplexed_async_connection().await?)
    }
}

/// Bounded pool of connections.
///
/// At most `pool_size` connections are checked out at once; further callers
/// wait up to `checkout_timeout` for one to be returned. Idle connections are
/// reused and new ones are dialled lazily.
struct ConnectionPool<D: Dial = redis::Client> {
    dialer: D,
    idle: Mutex<Vec<D::Conn>>,
    permits: Semaphore,
    connect_timeout: Duration,
    checkout_timeout: Duration,
}

impl ConnectionPool {
    async fn open(config: &RedisStoreConfig) -> StoreResult<Self> {
        let client = redis::Client::open(config.url.as_str())?;
        let pool = Self::new(
            client,
            config.pool_size,
            Duration::from_secs(config.connect_timeout_secs),
            Duration::from_secs(config.checkout_timeout_secs),
        );

        // Dial once so an unreachable server fails at connect time
        let conn = pool.dial().await?;
        pool.idle.lock().push(conn);

        Ok(pool)
    }
}

impl<D: Dial> ConnectionPool<D> {
    fn new(
        dialer: D,
        pool_size: usize,
        connect_timeout: Duration,
        checkout_timeout: Duration,
    ) -> Self {
        Self {
            dialer,
            idle: Mutex::new(Vec::with_capacity(pool_size)),
            permits: Semaphore::new(pool_size),
            connect_timeout,
            checkout_timeout,
        }
    }

    async fn dial(&self) -> StoreResult<D::Conn> {
        tokio::time::timeout(self.connect_timeout, self.dialer.dial())
            .await
            .map_err(|_| StoreError::ConnectTimeout(self.connect_timeout))?
    }

    /// Check out a connection. It goes back to the pool when the guard drops.
    async fn get(&self) -> StoreResult<PooledConnection<'_, D>> {
        let permit = tokio::time::timeout(self.checkout_timeout, self.permits.acquire())
            .await
            .map_err(|_| StoreError::PoolTimeout(self.checkout_timeout))?
            .map_err(|_| StoreError::PoolClosed)?;

        let idle = self.idle.lock().pop();
        let conn = match idle {
            Some(conn) => conn,
            None => self.dial().await?,
        };

        Ok(PooledConnection {
            conn: Some(conn),
            pool: self,
            _permit: permit,
        })
    }

    fn close(&self) {
        self.permits.close();
        self.idle.lock().clear();
    }

    fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    #[cfg(test)]
    fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }
}

/// A checked-out connection.
///
/// Dropping the guard returns the connection to the idle list and releases
/// its pool slot, on every exit path.
struct PooledConnection<'a, D: Dial> {
    conn: Option<D::Conn>,
    pool: &'a ConnectionPool<D>,
    _permit: SemaphorePermit<'a>,
}

impl<D: Dial> PooledConnection<'_, D> {
    /// Drop the connection instead of returning it, e.g. after an I/O error.
    /// The pool slot is still released.
    fn discard(mut self) {
        self.conn = None;
    }
}

impl<D: Dial> Deref for PooledConnection<'_, D> {
    type Target = D::Conn;

    fn deref(&self) -> &Self::Target {
        self.conn
            .as_ref()
            .expect("connection is present until the guard drops")
    }
}

impl<D: Dial> DerefMut for PooledConnection<'_, D> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn
            .as_mut()
            .expect("connection is present until the guard drops")
    }
}

impl<D: Dial> Drop for PooledConnection<'_, D> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take()
            && !self.pool.is_closed()
        {
            self.pool.idle.lock().push(conn);
        }
    }
}

/// Redis-backed rule and credential store.
///
/// Rules are read with `SMEMBERS {prefix}acl:{principal}` and password hashes
/// with `GET {prefix}user:{principal}`.
pub struct RedisStore {
    config: RedisStoreConfig,
    pool: RwLock<Option<Arc<ConnectionPool>>>,
}

impl RedisStore {
    pub fn new(config: RedisStoreConfig) -> Self {
        Self {
            config,
            pool: RwLock::new(None),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.pool.read().is_some()
    }

    fn pool(&self) -> StoreResult<Arc<ConnectionPool>> {
        self.pool.read().clone().ok_or(StoreError::NotConnected)
    }

    /// Run one command on a pooled connection, dropping the connection
    /// rather than reusing it if the command failed at the transport level.
    async fn query<T: redis::FromRedisValue>(&self, cmd: &redis::Cmd) -> StoreResult<T> {
        let pool = self.pool()?;
        let mut conn = pool.get().await?;

        let result: RedisResult<T> = cmd.query_async(&mut *conn).await;
        match result {
            Ok(value) => Ok(value),
            Err(e) => {
                if e.is_io_error() || e.is_connection_dropped() || e.is_timeout() {
                    conn.discard();
                }
                Err(e.into())
            }
        }
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn connect(&self) -> StoreResult<()> {
        if self.is_connected() {
            return Ok(());
        }

        let pool = Arc::new(ConnectionPool::open(&self.config).await?);

        let mut slot = self.pool.write();
        if slot.is_some() {
            // Lost a race with a concurrent connect
            pool.close();
        } else {
            *slot = Some(pool);
            tracing::info!(
                pool_size = self.config.pool_size,
                key_prefix = %self.config.key_prefix,
                "Connected to Redis store"
            );
        }

        Ok(())
    }

    fn stop(&self) {
        if let Some(pool) = self.pool.write().take() {
            pool.close();
            tracing::info!("Closed Redis store connection pool");
        }
    }

    fn kind(&self) -> &'static str {
        "redis"
    }
}

#[async_trait]
impl RuleStore for RedisStore {
    async fn fetch_rules(&self, principal: &str) -> StoreResult<Vec<String>> {
        let key = StoreKeys::acl(&self.config.key_prefix, principal);
        let members: Vec<Vec<u8>> = self.query(redis::cmd("SMEMBERS").arg(&key)).await?;

        let rules = members
            .into_iter()
            .filter_map(|member| match String::from_utf8(member) {
                Ok(rule) => Some(rule),
                Err(_) => {
                    tracing::warn!(key = %key, "Skipping non-UTF-8 ACL rule");
                    None
                }
            })
            .collect();

        Ok(rules)
    }
}

#[async_trait]
impl CredentialStore for RedisStore {
    async fn fetch_secret(&self, principal: &str) -> StoreResult<Option<String>> {
        let key = StoreKeys::user(&self.config.key_prefix, principal);
        let hash: Option<Vec<u8>> = self.query(redis::cmd("GET").arg(&key)).await?;

        hash.map(|bytes| {
            String::from_utf8(bytes)
                .map_err(|_| StoreError::Internal(format!("Stored secret at {key} is not UTF-8")))
        })
        .transpose()
    }
}
