use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::Query;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::comments::{self, CommentThread};
use crate::error::{ApiError, Error, Result};
use crate::slug;
use crate::state::AppState;
use crate::storage::{Blog, Db, Querier, Store};

/// 配置博客相关路由。
///
/// - `GET /blogs`：文章列表
/// - `GET /blog-index`：轻量索引（slug + 时间）
/// - `GET /blogs/{slug}`：获取单篇文章（slug 模糊解析）
/// - `GET /blogs/{slug}/comments`：评论树
/// - `POST /blogs/{slug}/comments`：发表评论或回复
/// - `POST /blogs/{slug}/comments/{id}/like`：点赞
pub fn setup_route() -> Router<AppState> {
    Router::new()
        .route("/blogs", get(blog_list))
        .route("/blog-index", get(blog_index))
        .route("/blogs/{slug}", get(blog_detail))
        .route(
            "/blogs/{slug}/comments",
            get(comment_tree).post(comment_create),
        )
        .route("/blogs/{slug}/comments/{id}/like", post(comment_like))
}

/// 文章元信息，用于列表展示。
#[derive(Debug, Serialize)]
pub struct BlogMeta {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub cover_image: Option<String>,
    pub created_at: Option<i64>,
}

/// 完整文章，含正文和评论数。正文是原始 Markdown。
#[derive(Debug, Serialize)]
pub struct BlogDetail {
    #[serde(flatten)]
    meta: BlogMeta,

    content: Option<String>,
    updated_at: Option<i64>,
    comment_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    /// 最多返回的条数，缺省不限制
    pub limit: Option<usize>,
}

/// 获取文章列表，新在前。
async fn blog_list(
    Query(params): Query<ListParams>,
    State(pool): State<Db>,
) -> Result<Json<Vec<BlogMeta>>> {
    let mut rows = pool.blog_list().await?;
    if let Some(limit) = params.limit {
        rows.truncate(limit);
    }
    Ok(Json(
        rows.into_iter()
            .map(|b| BlogMeta {
                id: b.id,
                title: b.title,
                slug: b.slug,
                excerpt: b.excerpt,
                cover_image: b.cover_image,
                created_at: b.created_at.map(|t| t.timestamp_millis()),
            })
            .collect(),
    ))
}

/// 站点地图用的轻量 slug 索引。
///
/// 查询失败降级为空列表，调用方（sitemap 生成）按尽力而为处理。
async fn blog_index(State(pool): State<Db>) -> Json<Vec<crate::storage::SlugEntry>> {
    Json(pool.blog_index().await.unwrap_or_else(|e| {
        tracing::error!(%e, "blog index query failed");
        Vec::new()
    }))
}

/// 根据 slug 获取单篇文章。
///
/// 先走模糊解析（编码差异、大小写、连字符/下划线互换都能命中），
/// 解析不到返回 404；存储错误则原样上抛。
async fn blog_detail(
    Path(raw_slug): Path<String>,
    State(pool): State<Db>,
) -> Result<Json<BlogDetail>> {
    let blog = resolve_blog(&pool, &raw_slug).await?;
    let comment_count = pool.comments_for(&blog.slug).await?.len();

    Ok(Json(BlogDetail {
        meta: BlogMeta {
            id: blog.id,
            title: blog.title,
            slug: blog.slug,
            excerpt: blog.excerpt,
            cover_image: blog.cover_image,
            created_at: blog.created_at.map(|t| t.timestamp_millis()),
        },
        content: blog.content,
        updated_at: blog.updated_at.map(|t| t.timestamp_millis()),
        comment_count,
    }))
}

/// 获取一篇文章的嵌套评论树。
async fn comment_tree(
    Path(raw_slug): Path<String>,
    State(pool): State<Db>,
) -> Result<Json<CommentThread>> {
    let blog = resolve_blog(&pool, &raw_slug).await?;
    let rows = pool.comments_for(&blog.slug).await?;
    Ok(Json(CommentThread::build(rows)))
}

#[derive(Debug, Deserialize)]
pub struct CommentInput {
    pub name: Option<String>,
    pub message: String,
    pub parent_id: Option<Uuid>,
}

/// 发表评论或回复。
///
/// 插入成功后从库里重建完整评论树返回，不做局部拼接。
async fn comment_create(
    Path(raw_slug): Path<String>,
    State(pool): State<Db>,
    Json(input): Json<CommentInput>,
) -> Result<(StatusCode, Json<CommentThread>)> {
    let message = input.message.trim();
    if message.is_empty() {
        return Err(ApiError::Invalid("Comment cannot be empty.").into());
    }

    let blog = resolve_blog(&pool, &raw_slug).await?;
    let name = match input.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name,
        _ => "Anonymous",
    };

    let mut store = &pool;
    store
        .insert_comment(&blog.slug, name, message, input.parent_id)
        .await?;

    let rows = pool.comments_for(&blog.slug).await?;
    Ok((StatusCode::CREATED, Json(CommentThread::build(rows))))
}

#[derive(Debug, Deserialize)]
pub struct LikeInput {
    /// 调用方上次看到的点赞数
    pub likes: i32,
}

#[derive(Debug, Serialize)]
pub struct LikeOutcome {
    pub likes: i32,
    pub comments: CommentThread,
}

/// 给评论点赞。
///
/// 乐观更新与落库失败后的兜底见 [`comments::like_comment`]。
async fn comment_like(
    Path((raw_slug, id)): Path<(String, Uuid)>,
    State(pool): State<Db>,
    Json(input): Json<LikeInput>,
) -> Result<Json<LikeOutcome>> {
    let blog = resolve_blog(&pool, &raw_slug).await?;

    match comments::like_comment(&pool, &blog.slug, id, input.likes).await? {
        Some((likes, comments)) => Ok(Json(LikeOutcome { likes, comments })),
        // 评论不在这篇文章的树里视同不存在
        None => Err(ApiError::NotFound.into()),
    }
}

async fn resolve_blog(pool: &Db, raw_slug: &str) -> Result<Blog> {
    slug::resolve(pool, raw_slug)
        .await
        .map_err(Error::from)?
        .ok_or_else(|| ApiError::NotFound.into())
}
