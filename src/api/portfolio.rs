use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::error::{ApiError, Result};
use crate::state::AppState;
use crate::storage::{Certificate, Db, Project, Querier, Skill};

/// 作品集公开读取路由。
pub fn setup_route() -> Router<AppState> {
    Router::new()
        .route("/projects", get(project_list))
        .route("/projects/{slug}", get(project_detail))
        .route("/certificates", get(certificate_list))
        .route("/skills", get(skill_list))
        .route("/settings", get(settings_map))
}

async fn project_list(State(pool): State<Db>) -> Result<Json<Vec<Project>>> {
    pool.projects().await.map(Json).map_err(Into::into)
}

async fn project_detail(
    Path(slug): Path<String>,
    State(pool): State<Db>,
) -> Result<Json<Project>> {
    let project = pool
        .project_by_slug(&slug)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(project))
}

async fn certificate_list(State(pool): State<Db>) -> Result<Json<Vec<Certificate>>> {
    pool.certificates().await.map(Json).map_err(Into::into)
}

async fn skill_list(State(pool): State<Db>) -> Result<Json<Vec<Skill>>> {
    pool.skills().await.map(Json).map_err(Into::into)
}

/// 站点设置，以 key/value 映射返回。
async fn settings_map(State(pool): State<Db>) -> Result<Json<HashMap<String, String>>> {
    let settings = pool.settings().await?;
    Ok(Json(
        settings
            .into_iter()
            .map(|s| (s.key, s.value))
            .collect::<HashMap<_, _>>(),
    ))
}
