//! Sales report endpoint.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use kasir_core::{ReportPeriod, SalesReport};

use crate::error::ApiResult;
use crate::AppState;

/// `?period=today|7d|30d|custom&from=YYYY-MM-DD&to=YYYY-MM-DD`
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub period: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// `GET /stores/{id}/reports/sales`
pub async fn sales_report(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
    query: Result<Query<ReportQuery>, QueryRejection>,
) -> ApiResult<Json<SalesReport>> {
    let Query(query) = query?;
    let period = ReportPeriod::parse(
        query.period.as_deref(),
        query.from.as_deref(),
        query.to.as_deref(),
    )?;

    let report = state.reports.aggregate_sales(&store_id, period).await?;
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use kasir_db::NotConfiguredStore;

    use crate::routes::tests::{app_with, local_app, send};

    #[tokio::test]
    async fn test_today_report() {
        let app = local_app();
        let body = json!({ "total": 10_000, "costTotal": 7_000, "paymentMethod": "transfer" });
        let (status, _) = send(&app, Method::POST, "/stores/toko-1/transactions", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, report) = send(&app, Method::GET, "/stores/toko-1/reports/sales", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["totalSales"], 10_000);
        assert_eq!(report["transferSales"], 10_000);
        assert_eq!(report["grossProfit"], 3_000);
        assert_eq!(report["degraded"], false);
        assert_eq!(report["daily"].as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_custom_range() {
        let (status, report) = send(
            &local_app(),
            Method::GET,
            "/stores/toko-1/reports/sales?from=2026-09-01&to=2026-10-31",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["monthly"].as_array().map(Vec::len), Some(2));
        assert_eq!(report["daily"].as_array().map(Vec::len), Some(61));
    }

    #[tokio::test]
    async fn test_bad_period_is_400() {
        let (status, body) = send(&local_app(), Method::GET, "/stores/toko-1/reports/sales?period=90d", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let (status, _) = send(
            &local_app(),
            Method::GET,
            "/stores/toko-1/reports/sales?from=2026-10-18&to=2026-10-01",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_not_configured_report_is_degraded() {
        let app = app_with(Arc::new(NotConfiguredStore::new("no backend")));
        let (status, report) = send(&app, Method::GET, "/stores/toko-1/reports/sales?period=7d", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["degraded"], true);
        assert_eq!(report["transactionCount"], 0);
    }
}
