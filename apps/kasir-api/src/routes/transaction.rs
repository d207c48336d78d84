//! Transaction capture endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use kasir_core::{PaymentStatus, Transaction};
use kasir_engine::TransactionDraft;

use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: PaymentStatus,
}

/// `POST /stores/{id}/transactions`
pub async fn record(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
    payload: Result<Json<TransactionDraft>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Transaction>)> {
    let Json(draft) = payload?;
    let tx = state.transactions.record_transaction(&store_id, draft).await?;
    Ok((StatusCode::CREATED, Json(tx)))
}

/// `PATCH /stores/{id}/transactions/{tx_id}/status`
pub async fn set_status(
    State(state): State<AppState>,
    Path((store_id, tx_id)): Path<(String, String)>,
    payload: Result<Json<StatusChange>, JsonRejection>,
) -> ApiResult<Json<Transaction>> {
    let Json(change) = payload?;
    let tx = state
        .transactions
        .set_payment_status(&store_id, &tx_id, change.status)
        .await?;
    Ok(Json(tx))
}
