use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::{ApiError, Result};
use crate::exec::{ExecReport, PistonClient, resolve_runtime};
use crate::state::AppState;

pub fn setup_route() -> Router<AppState> {
    Router::new().route("/execute", post(execute))
}

#[derive(Debug, Deserialize)]
pub struct ExecuteInput {
    pub code: Option<String>,
    pub language: Option<String>,
    pub version: Option<String>,
    /// 编辑器标注的原始语言，`language` 解析不出时兜底
    pub original_language: Option<String>,
}

/// 代码执行代理。
///
/// 归一化语言提示后转发给 Piston，结果整形为去重行数组。
/// 缺代码或语言提示无效返回 400，上游故障返回 502。
async fn execute(
    State(client): State<PistonClient>,
    Json(input): Json<ExecuteInput>,
) -> Result<Json<ExecReport>> {
    let code = input.code.as_deref().unwrap_or("");
    if code.trim().is_empty() {
        return Err(ApiError::Invalid("Code is required for execution.").into());
    }

    let runtime = resolve_runtime(input.language.as_deref(), input.version.as_deref())
        .or_else(|| {
            resolve_runtime(input.original_language.as_deref(), input.version.as_deref())
        })
        .ok_or(ApiError::Invalid("Unsupported or missing language hint."))?;

    let report = client.execute(&runtime, code).await?;
    Ok(Json(report))
}
