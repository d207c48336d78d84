//! Settlement endpoints.
//!
//! ```text
//!   GET  /stores/{id}/settlement/pending   → UnsettledWindow
//!   POST /stores/{id}/settlement           → 201 SettlementRecord + variance
//!   GET  /stores/{id}/settlements?limit=   → [SettlementRecord] newest first
//! ```

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use kasir_core::{SettlementRecord, UnsettledWindow, Variance};
use kasir_engine::SettlementRequest;

use crate::error::ApiResult;
use crate::AppState;

/// A committed record plus its variance classification.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommittedSettlement {
    #[serde(flatten)]
    pub record: SettlementRecord,
    pub variance: Variance,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
}

/// `GET /stores/{id}/settlement/pending`
pub async fn pending_window(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
) -> ApiResult<Json<UnsettledWindow>> {
    let window = state.settlement.compute_unsettled_window(&store_id).await?;
    Ok(Json(window))
}

/// `POST /stores/{id}/settlement`
pub async fn commit(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
    payload: Result<Json<SettlementRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CommittedSettlement>)> {
    let Json(request) = payload?;
    let record = state.settlement.commit_settlement(&store_id, request).await?;
    let variance = Variance::from_difference(record.difference);

    Ok((
        StatusCode::CREATED,
        Json(CommittedSettlement { record, variance }),
    ))
}

/// `GET /stores/{id}/settlements`
pub async fn history(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<SettlementRecord>>> {
    let Query(query) = query?;
    let records = state
        .settlement
        .settlement_history(&store_id, query.limit)
        .await?;
    Ok(Json(records))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use kasir_core::{NewSettlement, SettlementRecord};
    use kasir_db::{
        BackendKind, DbError, DbResult, LocalStore, NotConfiguredStore, PosStore, SettlementLedger,
        TransactionStore,
    };

    use crate::routes::tests::{app_with, local_app, send};

    /// Reads work, appends fail like a dropped connection.
    struct AppendFails(LocalStore);

    #[async_trait]
    impl TransactionStore for AppendFails {
        async fn list_completed_transactions(&self, store_id: &str) -> DbResult<Vec<kasir_core::Transaction>> {
            self.0.list_completed_transactions(store_id).await
        }

        async fn insert_transaction(&self, tx: &kasir_core::Transaction) -> DbResult<()> {
            self.0.insert_transaction(tx).await
        }

        async fn get_transaction(&self, store_id: &str, id: &str) -> DbResult<Option<kasir_core::Transaction>> {
            self.0.get_transaction(store_id, id).await
        }

        async fn update_payment_status(
            &self,
            store_id: &str,
            id: &str,
            from: kasir_core::PaymentStatus,
            to: kasir_core::PaymentStatus,
            at: chrono::DateTime<chrono::Utc>,
        ) -> DbResult<kasir_core::Transaction> {
            self.0.update_payment_status(store_id, id, from, to, at).await
        }
    }

    #[async_trait]
    impl SettlementLedger for AppendFails {
        async fn get_last_settlement(&self, store_id: &str) -> DbResult<Option<SettlementRecord>> {
            self.0.get_last_settlement(store_id).await
        }

        async fn append_settlement(&self, _store_id: &str, _s: NewSettlement) -> DbResult<SettlementRecord> {
            Err(DbError::ConnectionFailed("connection reset".to_string()))
        }

        async fn list_settlements(&self, store_id: &str, limit: u32) -> DbResult<Vec<SettlementRecord>> {
            self.0.list_settlements(store_id, limit).await
        }
    }

    #[async_trait]
    impl PosStore for AppendFails {
        fn backend(&self) -> BackendKind {
            BackendKind::Redis
        }

        async fn health_check(&self) -> bool {
            true
        }
    }

    fn sale(total: i64, method: &str, status: &str) -> serde_json::Value {
        json!({ "total": total, "paymentMethod": method, "paymentStatus": status })
    }

    #[tokio::test]
    async fn test_pending_then_commit() {
        let app = local_app();

        for body in [sale(15_000, "cash", "completed"), sale(20_000, "qris", "completed"), sale(5_000, "cash", "pending")] {
            let (status, _) = send(&app, Method::POST, "/stores/toko-1/transactions", Some(body)).await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, pending) = send(&app, Method::GET, "/stores/toko-1/settlement/pending", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(pending["cashSales"], 15_000);
        assert_eq!(pending["qrisSales"], 20_000);
        assert_eq!(pending["totalSales"], 35_000);
        assert_eq!(pending["transactionCount"], 2);

        let (status, record) = send(
            &app,
            Method::POST,
            "/stores/toko-1/settlement",
            Some(json!({ "actualCash": 14_500, "operator": { "id": "u1", "name": "Alice" } })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(record["difference"], -500);
        assert_eq!(record["variance"]["kind"], "shortage");
        assert_eq!(record["variance"]["amount"], 500);
        assert_eq!(record["operatorName"], "Alice");

        let (_, pending) = send(&app, Method::GET, "/stores/toko-1/settlement/pending", None).await;
        assert_eq!(pending["transactionCount"], 0);
        assert_eq!(pending["lastSettlement"]["id"], record["id"]);

        let (status, history) = send(&app, Method::GET, "/stores/toko-1/settlements?limit=10", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(history.as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_missing_actual_cash_is_400() {
        let (status, body) = send(
            &local_app(),
            Method::POST,
            "/stores/toko-1/settlement",
            Some(json!({ "operator": { "id": "u1", "name": "Alice" } })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["message"], "actualCash is required");
    }

    #[tokio::test]
    async fn test_negative_actual_cash_is_400() {
        let (status, _) = send(
            &local_app(),
            Method::POST,
            "/stores/toko-1/settlement",
            Some(json!({ "actualCash": -1, "operator": { "id": "u1", "name": "Alice" } })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_json_is_400() {
        let app = local_app();
        let request = axum::http::Request::builder()
            .method(Method::POST)
            .uri("/stores/toko-1/settlement")
            .header("content-type", "application/json")
            .body(axum::body::Body::from("{ nope"))
            .unwrap();

        let response = tower::ServiceExt::oneshot(app, request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_not_configured_commit_is_503() {
        let app = app_with(Arc::new(NotConfiguredStore::new("no backend")));

        let (status, pending) = send(&app, Method::GET, "/stores/toko-1/settlement/pending", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(pending["transactionCount"], 0);

        let (status, body) = send(
            &app,
            Method::POST,
            "/stores/toko-1/settlement",
            Some(json!({ "actualCash": 0, "operator": { "id": "u1", "name": "Alice" } })),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "NOT_CONFIGURED");
    }

    #[tokio::test]
    async fn test_append_failure_is_500_retry() {
        let app = app_with(Arc::new(AppendFails(LocalStore::in_memory())));
        let (status, body) = send(
            &app,
            Method::POST,
            "/stores/toko-1/settlement",
            Some(json!({ "actualCash": 0, "operator": { "id": "u1", "name": "Alice" } })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "STORAGE_ERROR");

        let (_, history) = send(&app, Method::GET, "/stores/toko-1/settlements", None).await;
        assert_eq!(history.as_array().map(Vec::len), Some(0));
    }

    #[tokio::test]
    async fn test_bad_history_limit_is_400() {
        let (status, _) = send(&local_app(), Method::GET, "/stores/toko-1/settlements?limit=0", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
