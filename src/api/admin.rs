use axum::extract::{FromRef, FromRequestParts, Path, State};
use axum::http::{HeaderMap, StatusCode, header, request::Parts};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, Error, Result};
use crate::state::{AppState, Sessions, SiteConfig};
use crate::storage::{
    Backlink, BacklinkUpsert, Blog, BlogUpsert, Certificate, CertificateUpsert, Db, ProjectUpsert,
    Querier, Setting, SkillUpsert, Store,
};

/// 后台路由。
///
/// `POST/DELETE /admin/session` 负责登录登出；其余接口都要求
/// `Authorization: Bearer <token>`，令牌由登录签发、服务端持有。
pub fn setup_route() -> Router<AppState> {
    Router::new()
        .route("/admin/session", post(login).delete(logout))
        .route("/admin/blogs", get(blog_list).put(blog_upsert))
        .route("/admin/blogs/{id}", delete(blog_delete))
        .route("/admin/projects", get(project_list).put(project_upsert))
        .route("/admin/projects/{id}", delete(project_delete))
        .route(
            "/admin/certificates",
            get(certificate_list).put(certificate_upsert),
        )
        .route("/admin/certificates/{id}", delete(certificate_delete))
        .route("/admin/skills", get(skill_list).put(skill_upsert))
        .route("/admin/skills/{id}", delete(skill_delete))
        .route("/admin/backlinks", get(backlink_list).put(backlink_upsert))
        .route("/admin/backlinks/{id}", delete(backlink_delete))
        .route("/admin/settings", get(settings_list).put(settings_put))
}

/// 已验证的后台会话，作为提取器使用。
///
/// 提取失败统一返回 401，不区分"缺头"和"令牌无效"。
pub struct AdminSession;

impl FromRequestParts<AppState> for AdminSession {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let sessions = Sessions::from_ref(state);
        let token = bearer_token(&parts.headers).ok_or(ApiError::Unauthorized)?;

        if sessions.contains(&token) {
            Ok(AdminSession)
        } else {
            Err(ApiError::Unauthorized.into())
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .and_then(|token| token.trim().parse().ok())
}

#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: Uuid,
}

/// 登录，校验凭据并签发会话令牌。
async fn login(
    State(site): State<SiteConfig>,
    State(sessions): State<Sessions>,
    Json(input): Json<LoginInput>,
) -> Result<Json<TokenResponse>> {
    if !site.verify_credentials(&input.email, &input.password) {
        return Err(ApiError::Unauthorized.into());
    }

    Ok(Json(TokenResponse {
        token: sessions.issue(),
    }))
}

/// 登出，吊销当前令牌。
async fn logout(State(sessions): State<Sessions>, headers: HeaderMap) -> Result<StatusCode> {
    let token = bearer_token(&headers).ok_or(ApiError::Unauthorized)?;
    if sessions.revoke(&token) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::Unauthorized.into())
    }
}

#[derive(Debug, Serialize)]
pub struct UpsertResponse {
    pub id: Uuid,
}

/// 后台文章列表，含正文，供编辑器回填。
async fn blog_list(_session: AdminSession, State(pool): State<Db>) -> Result<Json<Vec<Blog>>> {
    pool.blog_fallback_list()
        .await
        .map(Json)
        .map_err(Into::into)
}

async fn blog_upsert(
    _session: AdminSession,
    State(pool): State<Db>,
    Json(input): Json<BlogUpsert>,
) -> Result<Json<UpsertResponse>> {
    if input.title.trim().is_empty() || input.slug.trim().is_empty() {
        return Err(ApiError::Invalid("Title and slug are required.").into());
    }

    let mut store = &pool;
    let id = store.upsert_blog(&input).await?;
    Ok(Json(UpsertResponse { id }))
}

async fn blog_delete(
    _session: AdminSession,
    State(pool): State<Db>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let mut store = &pool;
    store.delete_blog(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn project_list(
    _session: AdminSession,
    State(pool): State<Db>,
) -> Result<Json<Vec<crate::storage::Project>>> {
    pool.projects().await.map(Json).map_err(Into::into)
}

async fn project_upsert(
    _session: AdminSession,
    State(pool): State<Db>,
    Json(input): Json<ProjectUpsert>,
) -> Result<Json<UpsertResponse>> {
    if input.title.trim().is_empty() || input.slug.trim().is_empty() {
        return Err(ApiError::Invalid("Title and slug are required.").into());
    }

    let mut store = &pool;
    let id = store.upsert_project(&input).await?;
    Ok(Json(UpsertResponse { id }))
}

async fn project_delete(
    _session: AdminSession,
    State(pool): State<Db>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let mut store = &pool;
    store.delete_project(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn certificate_list(
    _session: AdminSession,
    State(pool): State<Db>,
) -> Result<Json<Vec<Certificate>>> {
    pool.certificates().await.map(Json).map_err(Into::into)
}

async fn certificate_upsert(
    _session: AdminSession,
    State(pool): State<Db>,
    Json(input): Json<CertificateUpsert>,
) -> Result<Json<UpsertResponse>> {
    if input.title.trim().is_empty() {
        return Err(ApiError::Invalid("Title is required.").into());
    }

    let mut store = &pool;
    let id = store.upsert_certificate(&input).await?;
    Ok(Json(UpsertResponse { id }))
}

async fn certificate_delete(
    _session: AdminSession,
    State(pool): State<Db>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let mut store = &pool;
    store.delete_certificate(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn skill_list(
    _session: AdminSession,
    State(pool): State<Db>,
) -> Result<Json<Vec<crate::storage::Skill>>> {
    pool.skills().await.map(Json).map_err(Into::into)
}

async fn skill_upsert(
    _session: AdminSession,
    State(pool): State<Db>,
    Json(input): Json<SkillUpsert>,
) -> Result<Json<UpsertResponse>> {
    if input.name.trim().is_empty() {
        return Err(ApiError::Invalid("Name is required.").into());
    }

    let mut store = &pool;
    let id = store.upsert_skill(&input).await?;
    Ok(Json(UpsertResponse { id }))
}

async fn skill_delete(
    _session: AdminSession,
    State(pool): State<Db>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let mut store = &pool;
    store.delete_skill(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn backlink_list(
    _session: AdminSession,
    State(pool): State<Db>,
) -> Result<Json<Vec<Backlink>>> {
    pool.backlinks().await.map(Json).map_err(Into::into)
}

async fn backlink_upsert(
    _session: AdminSession,
    State(pool): State<Db>,
    Json(input): Json<BacklinkUpsert>,
) -> Result<Json<UpsertResponse>> {
    if input.source_url.trim().is_empty() {
        return Err(ApiError::Invalid("Source URL is required.").into());
    }

    let mut store = &pool;
    let id = store.upsert_backlink(&input).await?;
    Ok(Json(UpsertResponse { id }))
}

async fn backlink_delete(
    _session: AdminSession,
    State(pool): State<Db>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let mut store = &pool;
    store.delete_backlink(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn settings_list(
    _session: AdminSession,
    State(pool): State<Db>,
) -> Result<Json<Vec<Setting>>> {
    pool.settings().await.map(Json).map_err(Into::into)
}

/// 批量写入站点设置。
async fn settings_put(
    _session: AdminSession,
    State(pool): State<Db>,
    Json(input): Json<Vec<Setting>>,
) -> Result<StatusCode> {
    let mut store = &pool;
    store.upsert_settings(&input).await?;
    Ok(StatusCode::NO_CONTENT)
}
