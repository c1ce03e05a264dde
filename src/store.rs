//! Redis client for the destination list
//!
//! Two connection strategies share one client type: a direct endpoint when
//! `redis-address` is configured, or Sentinel-brokered master discovery when
//! sentinel addresses and a master group name are configured instead. Both
//! probe the server with PING before the client is handed to a worker.

use crate::config::StoreConfig;
use crate::errors::{ForwarderError, Result};
use crate::line::LogLine;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::sentinel::{SentinelClient, SentinelNodeConnectionInfo, SentinelServerType};
use redis::{AsyncCommands, ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

/// Maximum attempts for a single append, including the first.
pub const MAX_APPEND_ATTEMPTS: u32 = 10;

/// Backoff before the first retry.
pub const MIN_RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// Ceiling for the exponential backoff.
pub const MAX_RETRY_BACKOFF: Duration = Duration::from_millis(1000);

/// Destination for structured lines. Workers only see this trait, so tests
/// can substitute an in-memory sink for a live server.
#[async_trait]
pub trait LineSink: Send {
    async fn append(&mut self, line: &LogLine) -> Result<()>;
    async fn close(&mut self);
}

/// Client owning one connection to the store.
pub struct StoreClient {
    backend: Backend,
    conn: Option<MultiplexedConnection>,
    config: StoreConfig,
}

enum Backend {
    Direct(redis::Client),
    Sentinel(SentinelClient),
}

impl StoreClient {
    /// Connect according to the configuration shape and verify the server
    /// answers PING. A failed probe fails the construction; a dead client is
    /// never returned.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let backend = if config.is_sentinel() {
            let nodes = config
                .sentinels
                .iter()
                .map(|address| sentinel_node(address))
                .collect::<Result<Vec<_>>>()?;
            let master_info = SentinelNodeConnectionInfo {
                tls_mode: None,
                redis_connection_info: Some(RedisConnectionInfo {
                    db: config.database,
                    password: config.password.clone(),
                    ..Default::default()
                }),
            };
            Backend::Sentinel(SentinelClient::build(
                nodes,
                config.master_name.clone(),
                Some(master_info),
                SentinelServerType::Master,
            )?)
        } else {
            Backend::Direct(redis::Client::open(connection_info(config)?)?)
        };

        let mut client = Self {
            backend,
            conn: None,
            config: config.clone(),
        };
        client.reconnect().await?;
        Ok(client)
    }

    /// Establish (or re-establish) the connection and probe it.
    ///
    /// In Sentinel mode this re-resolves the current master, so an append
    /// retry after failover lands on the newly elected one.
    async fn reconnect(&mut self) -> Result<()> {
        let connect_timeout = self.config.connect_timeout;
        let read_timeout = self.config.read_timeout;

        let mut conn = match &mut self.backend {
            Backend::Direct(client) => timeout(
                connect_timeout,
                client.get_multiplexed_async_connection_with_timeouts(read_timeout, connect_timeout),
            )
            .await
            .map_err(|_| ForwarderError::Timeout("connecting to Redis server".to_string()))??,
            Backend::Sentinel(client) => timeout(connect_timeout, client.get_async_connection())
                .await
                .map_err(|_| {
                    ForwarderError::Timeout("connecting to Redis master via Sentinel".to_string())
                })??,
        };

        let _pong: String = timeout(read_timeout, redis::cmd("PING").query_async(&mut conn))
            .await
            .map_err(|_| ForwarderError::Timeout("PING health probe".to_string()))??;

        debug!(list = %self.config.list, "connection to Redis established");
        self.conn = Some(conn);
        Ok(())
    }

    /// Serialize the line and push it onto the tail of the configured list,
    /// retrying transient failures with bounded exponential backoff.
    ///
    /// A serialization failure is returned immediately and never retried.
    pub async fn append(&mut self, line: &LogLine) -> Result<()> {
        let payload = serde_json::to_string(line)?;

        let mut attempt = 1;
        loop {
            match self.push(&payload).await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    if attempt >= MAX_APPEND_ATTEMPTS {
                        return Err(err);
                    }

                    let backoff = retry_backoff(attempt);
                    warn!(
                        error = %err,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        "append failed, retrying"
                    );
                    sleep(backoff).await;

                    if let Err(err) = self.reconnect().await {
                        debug!(error = %err, "reconnect before retry failed");
                    }
                    attempt += 1;
                }
            }
        }
    }

    async fn push(&mut self, payload: &str) -> Result<()> {
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| ForwarderError::Config("store client is not connected".to_string()))?;

        let _len: i64 = timeout(
            self.config.write_timeout,
            conn.rpush(&self.config.list, payload),
        )
        .await
        .map_err(|_| ForwarderError::Timeout(format!("RPUSH to {:?}", self.config.list)))??;

        Ok(())
    }

    /// Drop the connection. Safe to call repeatedly or on a never-connected
    /// client.
    pub fn disconnect(&mut self) {
        if self.conn.take().is_some() {
            debug!("disconnected from Redis");
        }
    }
}

#[async_trait]
impl LineSink for StoreClient {
    async fn append(&mut self, line: &LogLine) -> Result<()> {
        StoreClient::append(self, line).await
    }

    async fn close(&mut self) {
        self.disconnect();
    }
}

/// Exponential backoff for the given (1-based) failed attempt, bounded by
/// [`MIN_RETRY_BACKOFF`] and [`MAX_RETRY_BACKOFF`].
fn retry_backoff(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(4);
    (MIN_RETRY_BACKOFF * 2u32.pow(exponent)).min(MAX_RETRY_BACKOFF)
}

fn connection_info(config: &StoreConfig) -> Result<ConnectionInfo> {
    let (host, port) = split_address(&config.server)?;
    Ok(ConnectionInfo {
        addr: ConnectionAddr::Tcp(host, port),
        redis: RedisConnectionInfo {
            db: config.database,
            password: config.password.clone(),
            ..Default::default()
        },
    })
}

fn sentinel_node(address: &str) -> Result<ConnectionInfo> {
    let (host, port) = split_address(address)?;
    Ok(ConnectionInfo {
        addr: ConnectionAddr::Tcp(host, port),
        redis: RedisConnectionInfo::default(),
    })
}

fn split_address(address: &str) -> Result<(String, u16)> {
    let invalid = || {
        ForwarderError::Config(format!(
            "invalid Redis address {:?}, expected host:port",
            address
        ))
    };

    let (host, port) = address.rsplit_once(':').ok_or_else(invalid)?;
    let port = port.parse().map_err(|_| invalid())?;
    Ok((host.to_string(), port))
}
