//! Audit store - append-only login history and known-device registry
//!
//! The risk collectors read from this store and the device collector writes
//! through it. It is the only shared state between concurrent requests;
//! correctness under concurrency relies on Postgres isolation (atomic upsert
//! for the first-seen-vs-update race), not in-process locking.

use axum::async_trait;
use chrono::Duration;
use sqlx::PgPool;
use uuid::Uuid;

/// Read/write interface over the audit tables.
///
/// "No rows" is a valid zero-signal result for the read methods, never an
/// error. Swappable so signal tests can run against an in-memory store.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Record one authentication attempt. `user_id` is None for attempts
    /// against unknown usernames.
    async fn record_login_attempt(
        &self,
        user_id: Option<Uuid>,
        success: bool,
        ip_address: &str,
    ) -> Result<(), sqlx::Error>;

    /// Distinct IP addresses drawn from the user's last `limit` successful
    /// logins. Callers test membership; no order is promised.
    async fn recent_successful_login_ips(
        &self,
        user_id: Uuid,
        limit: u32,
    ) -> Result<Vec<String>, sqlx::Error>;

    /// Failed attempts by this user inside the trailing window.
    async fn failed_login_count(
        &self,
        user_id: Uuid,
        window: Duration,
    ) -> Result<i64, sqlx::Error>;

    /// Register a device fingerprint for a user. Returns true when the
    /// (user, hash) pair was first seen; a known pair only bumps last_seen.
    async fn upsert_device(&self, user_id: Uuid, device_hash: &str) -> Result<bool, sqlx::Error>;
}

/// Postgres-backed audit store.
#[derive(Clone)]
pub struct PgAuditStore {
    pool: PgPool,
}

impl PgAuditStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditStore for PgAuditStore {
    async fn record_login_attempt(
        &self,
        user_id: Option<Uuid>,
        success: bool,
        ip_address: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO login_audit (user_id, success, ip_address) VALUES ($1, $2, $3)",
        )
        .bind(user_id)
        .bind(success)
        .bind(ip_address)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent_successful_login_ips(
        &self,
        user_id: Uuid,
        limit: u32,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT ip_address FROM (
                SELECT ip_address, created_at FROM login_audit
                WHERE user_id = $1 AND success = true
                ORDER BY created_at DESC
                LIMIT $2
            ) recent
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
    }

    async fn failed_login_count(
        &self,
        user_id: Uuid,
        window: Duration,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM login_audit
            WHERE user_id = $1 AND success = false
              AND created_at >= NOW() - make_interval(secs => $2)
            "#,
        )
        .bind(user_id)
        .bind(window.num_seconds() as f64)
        .fetch_one(&self.pool)
        .await
    }

    async fn upsert_device(&self, user_id: Uuid, device_hash: &str) -> Result<bool, sqlx::Error> {
        // xmax = 0 only on a fresh insert, so this distinguishes first-seen
        // from re-seen atomically under concurrent requests.
        sqlx::query_scalar::<_, bool>(
            r#"
            INSERT INTO known_devices (user_id, device_hash)
            VALUES ($1, $2)
            ON CONFLICT (user_id, device_hash)
            DO UPDATE SET last_seen = NOW()
            RETURNING (xmax = 0) AS was_new
            "#,
        )
        .bind(user_id)
        .bind(device_hash)
        .fetch_one(&self.pool)
        .await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory audit store for exercising the collectors without Postgres.

    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MemoryAuditStore {
        pub known_ips: Vec<String>,
        pub failed_logins: i64,
        pub devices: Mutex<HashSet<(Uuid, String)>>,
        /// When set, every call fails as if the store were unreachable.
        pub unavailable: bool,
        /// When set, every call stalls this long before answering, to
        /// exercise collector timeouts.
        pub stall: Option<std::time::Duration>,
    }

    impl MemoryAuditStore {
        async fn check_available(&self) -> Result<(), sqlx::Error> {
            if let Some(stall) = self.stall {
                tokio::time::sleep(stall).await;
            }
            if self.unavailable {
                Err(sqlx::Error::PoolTimedOut)
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl AuditStore for MemoryAuditStore {
        async fn record_login_attempt(
            &self,
            _user_id: Option<Uuid>,
            _success: bool,
            _ip_address: &str,
        ) -> Result<(), sqlx::Error> {
            self.check_available().await
        }

        async fn recent_successful_login_ips(
            &self,
            _user_id: Uuid,
            limit: u32,
        ) -> Result<Vec<String>, sqlx::Error> {
            self.check_available().await?;
            Ok(self.known_ips.iter().take(limit as usize).cloned().collect())
        }

        async fn failed_login_count(
            &self,
            _user_id: Uuid,
            _window: Duration,
        ) -> Result<i64, sqlx::Error> {
            self.check_available().await?;
            Ok(self.failed_logins)
        }

        async fn upsert_device(
            &self,
            user_id: Uuid,
            device_hash: &str,
        ) -> Result<bool, sqlx::Error> {
            self.check_available().await?;
            let mut devices = self.devices.lock().unwrap();
            Ok(devices.insert((user_id, device_hash.to_string())))
        }
    }
}
