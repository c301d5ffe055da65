use std::time::Duration;

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::MultiplexedConnection};
use tracing::info;

use crate::stores::Cache;

/// Redis-backed [`Cache`]. The multiplexed connection is cheap to clone
/// and safe to share between the workers and the request path.
pub struct RedisCache {
    connection: MultiplexedConnection,
}

impl RedisCache {
    pub async fn connect(redis_url: &str) -> Result<Self, Error> {
        let client = Client::open(redis_url).map_err(|e| anyhow!("Invalid redis url: {}", e))?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| anyhow!("Failed to connect to redis: {}", e))?;

        info!("Redis connection established");

        Ok(Self { connection })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get_i64(&self, key: &str) -> Result<i64> {
        let mut conn = self.connection.clone();
        let value: Option<i64> = conn
            .get(key)
            .await
            .map_err(|e| anyhow!("Failed to read counter {}: {}", key, e))?;

        Ok(value.unwrap_or(0))
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let mut conn = self.connection.clone();
        let value: i64 = conn
            .incr(key, 1)
            .await
            .map_err(|e| anyhow!("Failed to increment {}: {}", key, e))?;

        Ok(value)
    }

    async fn del(&self, key: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| anyhow!("Failed to delete {}: {}", key, e))?;

        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.connection.clone();
        conn.expire::<_, ()>(key, ttl.as_secs() as i64)
            .await
            .map_err(|e| anyhow!("Failed to set expiry on {}: {}", key, e))?;

        Ok(())
    }

    async fn set_string(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.connection.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs())
            .await
            .map_err(|e| anyhow!("Failed to set {}: {}", key, e))?;

        Ok(())
    }
}
