//! # PostgreSQL Backend
//!
//! Production storage via SQLx. Orders live as JSONB bodies alongside
//! the indexed columns queries actually filter on; the anti-replay
//! registry and the lock table use `ON CONFLICT` conditional writes so
//! arbitration happens inside the database, not in application code.
//!
//! All shared upsert semantics come from [`crate::traits`]; this module
//! only supplies the SQL plumbing around them.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use mintgate_core::{EventId, MerchantOrderId, Order, Timestamp, TokenId, WalletAddress};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use uuid::Uuid;

use crate::error::StoreError;
use crate::keys::{legacy_used_ticket_key, used_ticket_key};
use crate::lock::{LockLease, LockManager};
use crate::traits::{
    claimed_upsert, gate_validated_upsert, paid_order_upsert, reconcile, status_placeholder,
    ClaimRecord, OrderStore, PaidOrderDraft, RecordPaidOutcome, StatusDraft, UsedMarker,
};

/// Connect to `DATABASE_URL` and run embedded migrations.
///
/// Returns `Ok(None)` when the variable is unset, which selects the
/// in-memory backend at assembly time.
pub async fn init_pool() -> Result<Option<PgPool>, StoreError> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) if !url.trim().is_empty() => url,
        _ => {
            tracing::info!("DATABASE_URL not set, using in-memory storage");
            return Ok(None);
        }
    };
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&url)
        .await?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(sqlx::Error::from)?;
    tracing::info!("connected to postgres, migrations applied");
    Ok(Some(pool))
}

/// Order store backed by the `orders` and `used_tickets` tables.
#[derive(Debug, Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_by_merchant_id(&self, id: &str) -> Result<Option<Order>, StoreError> {
        let body: Option<serde_json::Value> =
            sqlx::query_scalar("SELECT body FROM orders WHERE merchant_order_id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        match body {
            Some(body) => Ok(Some(serde_json::from_value(body)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, order: &Order) -> Result<(), StoreError> {
        let body = serde_json::to_value(order)?;
        sqlx::query(
            r#"
            INSERT INTO orders
                (merchant_order_id, token_id, event_id, ticket_state, body, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (merchant_order_id) DO UPDATE SET
                token_id = EXCLUDED.token_id,
                ticket_state = EXCLUDED.ticket_state,
                body = EXCLUDED.body,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(order.merchant_order_id.as_str())
        .bind(order.token_id.as_ref().map(|t| t.as_str()))
        .bind(order.event_id.0 as i64)
        .bind(order.ticket_state.as_str())
        .bind(body)
        .bind(order.created_at.as_datetime())
        .bind(order.updated_at.as_datetime())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn used_record(
        &self,
        key: &str,
    ) -> Result<Option<(Timestamp, Option<WalletAddress>)>, StoreError> {
        let row = sqlx::query("SELECT used_at, owner FROM used_tickets WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else { return Ok(None) };
        let used_at: chrono::DateTime<Utc> = row.try_get("used_at")?;
        let owner: Option<String> = row.try_get("owner")?;
        let owner = match owner {
            Some(raw) => WalletAddress::parse(&raw).ok(),
            None => None,
        };
        Ok(Some((Timestamp::from_utc(used_at), owner)))
    }

    /// Conditional insert. Returns whether this call created the row.
    async fn try_insert_used(
        &self,
        key: &str,
        used_at: Timestamp,
        owner: Option<&WalletAddress>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "INSERT INTO used_tickets (key, used_at, owner) VALUES ($1, $2, $3) \
             ON CONFLICT (key) DO NOTHING",
        )
        .bind(key)
        .bind(used_at.as_datetime())
        .bind(owner.map(|w| w.as_str()))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn get_by_merchant_id(
        &self,
        id: &MerchantOrderId,
    ) -> Result<Option<Order>, StoreError> {
        Ok(self.fetch_by_merchant_id(id.as_str()).await?.map(reconcile))
    }

    async fn get_by_token_id(&self, token: &TokenId) -> Result<Option<Order>, StoreError> {
        let body: Option<serde_json::Value> =
            sqlx::query_scalar("SELECT body FROM orders WHERE token_id = $1")
                .bind(token.as_str())
                .fetch_optional(&self.pool)
                .await?;
        match body {
            Some(body) => Ok(Some(reconcile(serde_json::from_value(body)?))),
            None => Ok(None),
        }
    }

    async fn record_paid_order(
        &self,
        draft: PaidOrderDraft,
    ) -> Result<RecordPaidOutcome, StoreError> {
        // Callers hold the purchase lock, so read-then-write is safe.
        let existing = self
            .fetch_by_merchant_id(draft.merchant_order_id.as_str())
            .await?;
        let (outcome, write) = paid_order_upsert(existing, &draft)?;
        if write {
            self.put(&outcome.order).await?;
        }
        Ok(outcome)
    }

    async fn record_order_status(&self, draft: StatusDraft) -> Result<Order, StoreError> {
        let order = status_placeholder(&draft);
        let body = serde_json::to_value(&order)?;
        // Create-only: an existing order is never touched by a stale
        // non-success notification.
        sqlx::query(
            r#"
            INSERT INTO orders
                (merchant_order_id, token_id, event_id, ticket_state, body, created_at, updated_at)
            VALUES ($1, NULL, $2, $3, $4, $5, $6)
            ON CONFLICT (merchant_order_id) DO NOTHING
            "#,
        )
        .bind(order.merchant_order_id.as_str())
        .bind(order.event_id.0 as i64)
        .bind(order.ticket_state.as_str())
        .bind(body)
        .bind(order.created_at.as_datetime())
        .bind(order.updated_at.as_datetime())
        .execute(&self.pool)
        .await?;
        self.fetch_by_merchant_id(order.merchant_order_id.as_str())
            .await?
            .map(reconcile)
            .ok_or_else(|| StoreError::OrderNotFound(draft.merchant_order_id))
    }

    async fn mark_order_claimed(&self, args: ClaimRecord) -> Result<Order, StoreError> {
        let existing = self
            .fetch_by_merchant_id(args.merchant_order_id.as_str())
            .await?
            .ok_or_else(|| StoreError::OrderNotFound(args.merchant_order_id.clone()))?;
        let updated = claimed_upsert(&existing, &args)?;
        self.put(&updated).await?;
        Ok(updated)
    }

    async fn mark_gate_validated(
        &self,
        id: &MerchantOrderId,
        used_by: &str,
    ) -> Result<Order, StoreError> {
        let existing = self
            .fetch_by_merchant_id(id.as_str())
            .await?
            .ok_or_else(|| StoreError::OrderNotFound(id.clone()))?;
        let updated = gate_validated_upsert(&existing, used_by)?;
        self.put(&updated).await?;
        Ok(updated)
    }

    async fn mark_token_used_once(
        &self,
        event: EventId,
        token: &TokenId,
        owner: Option<&WalletAddress>,
    ) -> Result<UsedMarker, StoreError> {
        let key = used_ticket_key(event, token);
        if let Some((used_at, owner)) = self.used_record(&key).await? {
            return Ok(UsedMarker {
                already_used: true,
                used_at,
                owner,
            });
        }
        let legacy_key = legacy_used_ticket_key(token);
        if let Some((used_at, legacy_owner)) = self.used_record(&legacy_key).await? {
            // Mirror the pre-event-scoping record forward; the legacy
            // row stays in place.
            self.try_insert_used(&key, used_at, legacy_owner.as_ref())
                .await?;
            return Ok(UsedMarker {
                already_used: true,
                used_at,
                owner: legacy_owner,
            });
        }
        let now = Timestamp::now();
        if self.try_insert_used(&key, now, owner).await? {
            return Ok(UsedMarker {
                already_used: false,
                used_at: now,
                owner: owner.cloned(),
            });
        }
        // Lost the conditional insert to a concurrent check-in; report
        // the winner's record.
        let (used_at, winner) = self
            .used_record(&key)
            .await?
            .ok_or_else(|| sqlx::Error::RowNotFound)?;
        Ok(UsedMarker {
            already_used: true,
            used_at,
            owner: winner,
        })
    }
}

// ─── Lock Table ──────────────────────────────────────────────────────

/// TTL locks arbitrated by the `locks` table. Safe across instances.
#[derive(Debug, Clone)]
pub struct PgLockManager {
    pool: PgPool,
}

impl PgLockManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LockManager for PgLockManager {
    async fn try_acquire(
        &self,
        key: &str,
        ttl: Duration,
    ) -> Result<Option<LockLease>, StoreError> {
        let token = Uuid::new_v4();
        let expires_at = Utc::now() + chrono::Duration::seconds(ttl.as_secs() as i64);
        // The upsert only fires when the held lease has expired, so a
        // live lease always wins.
        let result = sqlx::query(
            r#"
            INSERT INTO locks (key, token, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (key) DO UPDATE SET
                token = EXCLUDED.token,
                expires_at = EXCLUDED.expires_at
            WHERE locks.expires_at < now()
            "#,
        )
        .bind(key)
        .bind(token)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 1 {
            Ok(Some(LockLease::new(key.to_string(), token)))
        } else {
            Ok(None)
        }
    }

    async fn release(&self, lease: LockLease) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM locks WHERE key = $1 AND token = $2")
            .bind(lease.key())
            .bind(lease.token())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
