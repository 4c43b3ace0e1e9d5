use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};

use crate::error::{ApiError, Result};
use crate::state::AppState;
use crate::storage::{Db, Store, WebVital};

pub fn setup_route() -> Router<AppState> {
    Router::new().route("/web-vitals", post(report))
}

/// 性能指标上报落库。
///
/// 只校验 `metric` 字段，其他字段缺省为空。
async fn report(State(pool): State<Db>, Json(vital): Json<WebVital>) -> Result<StatusCode> {
    if vital.metric.trim().is_empty() {
        return Err(ApiError::Invalid("metric is required").into());
    }

    let mut store = &pool;
    store.insert_web_vital(&vital).await?;
    Ok(StatusCode::CREATED)
}
