//! # Redis Document Store
//!
//! The document-store backend. Every key is namespaced by store id.
//!
//! ## Key Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  kasir:{store}:tx:{id}          HASH   one transaction                  │
//! │      id, store_id, total, cost_total, payment_method,                   │
//! │      payment_status, cashier_id?, created_at, completed_at? (micros)    │
//! │                                                                         │
//! │  kasir:{store}:tx:completed     ZSET   member = tx id                   │
//! │      score = completed_at micros      (completed only)                  │
//! │                                                                         │
//! │  kasir:{store}:settlements      ZSET   member = SettlementRecord JSON   │
//! │      score = settled_at micros                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Scores are f64; unix microseconds stay below 2^53 until the year 2255,
//! so they are exact. Insert and status changes run as Lua scripts so the
//! hash and the completed index never disagree.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use tracing::{debug, info};

use kasir_core::{
    normalize_timestamp, Money, NewSettlement, PaymentMethod, PaymentStatus, SettlementRecord,
    Transaction,
};

use crate::error::{DbError, DbResult};
use crate::store::{
    from_micros, new_record_id, sort_newest_first, to_micros, BackendKind, PosStore,
    SettlementLedger, TransactionStore,
};

/// Inserts a transaction hash unless it exists; indexes it when completed.
///
/// KEYS: tx hash, completed zset. ARGV: field/value pairs..., status, completed_at, id
const INSERT_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 1 then
    return 0
end
local n = #ARGV
for i = 1, n - 3, 2 do
    redis.call('HSET', KEYS[1], ARGV[i], ARGV[i + 1])
end
if ARGV[n - 2] == 'completed' then
    redis.call('ZADD', KEYS[2], ARGV[n - 1], ARGV[n])
end
return 1
"#;

/// Compare-and-set on payment_status, keeping the completed index in step.
///
/// KEYS: tx hash, completed zset. ARGV: expected, next, id, at (micros)
/// Returns 'ok', 'missing', or the current status on mismatch.
const UPDATE_STATUS_SCRIPT: &str = r#"
local current = redis.call('HGET', KEYS[1], 'payment_status')
if not current then
    return 'missing'
end
if current ~= ARGV[1] then
    return current
end
redis.call('HSET', KEYS[1], 'payment_status', ARGV[2])
if ARGV[2] == 'completed' then
    redis.call('HSET', KEYS[1], 'completed_at', ARGV[4])
    redis.call('ZADD', KEYS[2], ARGV[4], ARGV[3])
else
    redis.call('ZREM', KEYS[2], ARGV[3])
end
return 'ok'
"#;

// =============================================================================
// Keys
// =============================================================================

fn tx_key(store_id: &str, id: &str) -> String {
    format!("kasir:{}:tx:{}", store_id, id)
}

fn completed_key(store_id: &str) -> String {
    format!("kasir:{}:tx:completed", store_id)
}

fn settlements_key(store_id: &str) -> String {
    format!("kasir:{}:settlements", store_id)
}

// =============================================================================
// Document encoding
// =============================================================================

fn encode_transaction(tx: &Transaction) -> Vec<(&'static str, String)> {
    let mut fields = vec![
        ("id", tx.id.clone()),
        ("store_id", tx.store_id.clone()),
        ("total", tx.total.minor().to_string()),
        ("cost_total", tx.cost_total.minor().to_string()),
        ("payment_method", tx.payment_method.as_str().to_string()),
        ("payment_status", tx.payment_status.as_str().to_string()),
        ("created_at", to_micros(tx.created_at).to_string()),
    ];
    if let Some(cashier_id) = &tx.cashier_id {
        fields.push(("cashier_id", cashier_id.clone()));
    }
    if let Some(completed_at) = tx.completed_at {
        fields.push(("completed_at", to_micros(completed_at).to_string()));
    }
    fields
}

fn decode_transaction(mut doc: HashMap<String, String>) -> DbResult<Transaction> {
    fn take(doc: &mut HashMap<String, String>, field: &str) -> DbResult<String> {
        doc.remove(field)
            .ok_or_else(|| DbError::Corrupt(format!("transaction document missing {}", field)))
    }

    fn number(field: &str, raw: &str) -> DbResult<i64> {
        raw.parse::<i64>()
            .map_err(|_| DbError::Corrupt(format!("{} is not an integer: {}", field, raw)))
    }

    let total = take(&mut doc, "total")?;
    let cost_total = take(&mut doc, "cost_total")?;
    let created_at = take(&mut doc, "created_at")?;
    let method = take(&mut doc, "payment_method")?;
    let status = take(&mut doc, "payment_status")?;

    Ok(Transaction {
        id: take(&mut doc, "id")?,
        store_id: take(&mut doc, "store_id")?,
        total: Money::from_minor(number("total", &total)?),
        cost_total: Money::from_minor(number("cost_total", &cost_total)?),
        payment_method: method
            .parse::<PaymentMethod>()
            .map_err(|e| DbError::Corrupt(e.to_string()))?,
        payment_status: status
            .parse::<PaymentStatus>()
            .map_err(|e| DbError::Corrupt(e.to_string()))?,
        cashier_id: doc.remove("cashier_id"),
        created_at: from_micros("created_at", number("created_at", &created_at)?)?,
        completed_at: doc
            .remove("completed_at")
            .map(|raw| from_micros("completed_at", number("completed_at", &raw)?))
            .transpose()?,
    })
}

// =============================================================================
// RedisStore
// =============================================================================

/// Redis-backed [`PosStore`].
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    insert_script: Script,
    update_status_script: Script,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Opens a managed connection (reconnects automatically).
    pub async fn connect(url: &str) -> DbResult<Self> {
        let client =
            redis::Client::open(url).map_err(|e| DbError::ConnectionFailed(e.to_string()))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!("Connected to Redis");

        Ok(RedisStore {
            conn,
            insert_script: Script::new(INSERT_SCRIPT),
            update_status_script: Script::new(UPDATE_STATUS_SCRIPT),
        })
    }

    async fn load_transactions(&self, store_id: &str, ids: Vec<String>) -> DbResult<Vec<Transaction>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for id in &ids {
            pipe.hgetall(tx_key(store_id, id));
        }

        let mut conn = self.conn.clone();
        let docs: Vec<HashMap<String, String>> = pipe.query_async(&mut conn).await?;

        docs.into_iter()
            // A hash removed out-of-band leaves a dangling index entry
            .filter(|doc| !doc.is_empty())
            .map(decode_transaction)
            .filter(|tx| tx.as_ref().map_or(true, Transaction::is_completed))
            .collect()
    }

    fn decode_settlements(raw: Vec<String>) -> DbResult<Vec<SettlementRecord>> {
        raw.iter()
            .map(|json| serde_json::from_str::<SettlementRecord>(json).map_err(DbError::from))
            .collect()
    }
}

#[async_trait]
impl TransactionStore for RedisStore {
    async fn list_completed_transactions(&self, store_id: &str) -> DbResult<Vec<Transaction>> {
        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn.zrange(completed_key(store_id), 0, -1).await?;
        self.load_transactions(store_id, ids).await
    }

    async fn list_completed_between(
        &self,
        store_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Vec<Transaction>> {
        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn
            .zrangebyscore(completed_key(store_id), to_micros(start), to_micros(end))
            .await?;
        self.load_transactions(store_id, ids).await
    }

    async fn insert_transaction(&self, tx: &Transaction) -> DbResult<()> {
        debug!(id = %tx.id, store_id = %tx.store_id, "Inserting transaction document");

        // Completed documents always carry their completion stamp
        let mut stored = tx.clone();
        if stored.is_completed() && stored.completed_at.is_none() {
            stored.completed_at = Some(stored.created_at);
        }
        let tx = &stored;

        let mut invocation = self.insert_script.prepare_invoke();
        invocation
            .key(tx_key(&tx.store_id, &tx.id))
            .key(completed_key(&tx.store_id));
        for (field, value) in encode_transaction(tx) {
            invocation.arg(field).arg(value);
        }
        invocation
            .arg(tx.payment_status.as_str())
            .arg(to_micros(tx.counted_at()))
            .arg(&tx.id);

        let mut conn = self.conn.clone();
        let inserted: i64 = invocation.invoke_async(&mut conn).await?;

        if inserted == 0 {
            return Err(DbError::duplicate("transaction.id", &tx.id));
        }
        Ok(())
    }

    async fn get_transaction(&self, store_id: &str, id: &str) -> DbResult<Option<Transaction>> {
        let mut conn = self.conn.clone();
        let doc: HashMap<String, String> = conn.hgetall(tx_key(store_id, id)).await?;

        if doc.is_empty() {
            return Ok(None);
        }
        decode_transaction(doc).map(Some)
    }

    async fn update_payment_status(
        &self,
        store_id: &str,
        id: &str,
        from: PaymentStatus,
        to: PaymentStatus,
        at: DateTime<Utc>,
    ) -> DbResult<Transaction> {
        let mut conn = self.conn.clone();
        let outcome: String = self
            .update_status_script
            .key(tx_key(store_id, id))
            .key(completed_key(store_id))
            .arg(from.as_str())
            .arg(to.as_str())
            .arg(id)
            .arg(to_micros(normalize_timestamp(at)))
            .invoke_async(&mut conn)
            .await?;

        match outcome.as_str() {
            "ok" => self
                .get_transaction(store_id, id)
                .await?
                .ok_or_else(|| DbError::not_found("Transaction", id)),
            "missing" => Err(DbError::not_found("Transaction", id)),
            current => Err(DbError::Conflict(format!(
                "transaction {} is {}, expected {}",
                id, current, from
            ))),
        }
    }
}

#[async_trait]
impl SettlementLedger for RedisStore {
    async fn get_last_settlement(&self, store_id: &str) -> DbResult<Option<SettlementRecord>> {
        let key = settlements_key(store_id);
        let mut conn = self.conn.clone();

        let top: Vec<(String, f64)> = conn.zrevrange_withscores(&key, 0, 0).await?;
        let Some((_, score)) = top.into_iter().next() else {
            return Ok(None);
        };

        // Several records may share the top settled_at; pick the latest written
        let tied: Vec<String> = conn.zrangebyscore(&key, score, score).await?;
        let mut records = Self::decode_settlements(tied)?;
        sort_newest_first(&mut records);
        Ok(records.into_iter().next())
    }

    async fn append_settlement(
        &self,
        store_id: &str,
        settlement: NewSettlement,
    ) -> DbResult<SettlementRecord> {
        if settlement.store_id != store_id {
            return Err(DbError::Internal(format!(
                "settlement for {} appended to {}",
                settlement.store_id, store_id
            )));
        }

        let record = settlement.into_record(new_record_id(), normalize_timestamp(Utc::now()));
        let json = serde_json::to_string(&record)?;

        // One ZADD: the record is either fully visible or absent
        let mut conn = self.conn.clone();
        let _: i64 = conn
            .zadd(settlements_key(store_id), json, to_micros(record.settled_at))
            .await?;

        debug!(id = %record.id, store_id = %store_id, "Settlement document appended");
        Ok(record)
    }

    async fn list_settlements(
        &self,
        store_id: &str,
        limit: u32,
    ) -> DbResult<Vec<SettlementRecord>> {
        let stop = isize::try_from(limit).unwrap_or(isize::MAX).saturating_sub(1);
        let mut conn = self.conn.clone();
        let raw: Vec<String> = conn.zrevrange(settlements_key(store_id), 0, stop).await?;

        let mut records = Self::decode_settlements(raw)?;
        sort_newest_first(&mut records);
        Ok(records)
    }
}

#[async_trait]
impl PosStore for RedisStore {
    fn backend(&self) -> BackendKind {
        BackendKind::Redis
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.conn.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
