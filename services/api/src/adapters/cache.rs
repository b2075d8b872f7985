//! services/api/src/adapters/cache.rs
//!
//! The Redis implementation of the `TokenStore` port. Refresh tokens live under
//! `refresh:<user_id>` and revoked access tokens under `blacklist:<token>`,
//! both with a TTL so Redis drops them once they could no longer be used.

use async_trait::async_trait;
use commit_core::ports::{PortError, PortResult, TokenStore};
use redis::{
    aio::ConnectionManager, AsyncCommands, Client, ConnectionAddr, ConnectionInfo,
    RedisConnectionInfo,
};
use std::time::Duration;
use uuid::Uuid;

use crate::config::RedisSettings;

#[derive(Clone)]
pub struct RedisTokenStore {
    conn: ConnectionManager,
}

impl RedisTokenStore {
    /// Opens a multiplexed, auto-reconnecting connection.
    pub async fn connect(settings: &RedisSettings) -> Result<Self, redis::RedisError> {
        let info = ConnectionInfo {
            addr: ConnectionAddr::Tcp(settings.host.clone(), settings.port),
            redis: RedisConnectionInfo {
                db: settings.db,
                password: settings.password.clone(),
                ..Default::default()
            },
        };
        let client = Client::open(info)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn })
    }
}

fn refresh_key(user_id: Uuid) -> String {
    format!("refresh:{}", user_id)
}

fn blacklist_key(token: &str) -> String {
    format!("blacklist:{}", token)
}

fn unexpected(e: redis::RedisError) -> PortError {
    PortError::Unexpected(e.to_string())
}

// SETEX rejects a zero expiry.
fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl TokenStore for RedisTokenStore {
    async fn store_refresh_token(
        &self,
        user_id: Uuid,
        token: &str,
        ttl: Duration,
    ) -> PortResult<()> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(refresh_key(user_id), token, ttl_seconds(ttl))
            .await
            .map_err(unexpected)
    }

    async fn get_refresh_token(&self, user_id: Uuid) -> PortResult<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get::<_, Option<String>>(refresh_key(user_id))
            .await
            .map_err(unexpected)
    }

    async fn delete_refresh_token(&self, user_id: Uuid) -> PortResult<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(refresh_key(user_id))
            .await
            .map_err(unexpected)
    }

    async fn blacklist_token(&self, token: &str, ttl: Duration) -> PortResult<()> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(blacklist_key(token), "1", ttl_seconds(ttl))
            .await
            .map_err(unexpected)
    }

    async fn is_blacklisted(&self, token: &str) -> PortResult<bool> {
        let mut conn = self.conn.clone();
        conn.exists::<_, bool>(blacklist_key(token))
            .await
            .map_err(unexpected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced() {
        let id = Uuid::nil();
        assert_eq!(
            refresh_key(id),
            "refresh:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(blacklist_key("abc.def"), "blacklist:abc.def");
    }

    #[test]
    fn expiry_is_at_least_one_second() {
        assert_eq!(ttl_seconds(Duration::ZERO), 1);
        assert_eq!(ttl_seconds(Duration::from_secs(90)), 90);
    }
}
