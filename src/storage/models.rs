use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 博客文章
///
/// 内容为原始 Markdown，渲染交给前端，后端不做转换。
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Blog {
    pub id: Uuid,
    pub title: String,
    /// 唯一标识，存储形式区分大小写
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub cover_image: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// 博客列表项，不含正文。
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BlogSummary {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub cover_image: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// 站点地图用的 slug 索引项。
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SlugEntry {
    pub slug: String,
    pub updated_at: Option<DateTime<Utc>>,
}

/// 评论行，平铺形式。
///
/// 评论构成森林：`parent_id` 为空的是根评论。
/// 树的构建见 [`crate::comments::CommentThread`]。
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CommentRow {
    pub id: Uuid,
    pub slug: String,
    pub name: Option<String>,
    pub message: String,
    pub created_at: Option<DateTime<Utc>>,
    pub parent_id: Option<Uuid>,
    pub likes: Option<i32>,
}

/// 项目（作品集条目）
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub repo_url: Option<String>,
    pub live_url: Option<String>,
    pub tags: Option<Vec<String>>,
    pub cover_image: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// 证书
///
/// `file_url` 指向外部对象存储，上传本身不在本服务范围内。
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Certificate {
    pub id: Uuid,
    pub title: String,
    pub issuer: Option<String>,
    pub year: Option<String>,
    pub file_url: Option<String>,
    pub description: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// 技能
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Skill {
    pub id: Uuid,
    pub name: String,
    pub category: Option<String>,
    pub proficiency: Option<String>,
    pub description: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// 外链记录，仅后台使用。
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Backlink {
    pub id: Uuid,
    pub source_url: String,
    pub domain: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// 站点设置，key/value 形式。
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Setting {
    pub key: String,
    pub value: String,
}

/// 后台写入载荷
///
/// `id` 为空表示新建，由服务端生成。
#[derive(Debug, Clone, Deserialize)]
pub struct BlogUpsert {
    pub id: Option<Uuid>,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub cover_image: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectUpsert {
    pub id: Option<Uuid>,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub repo_url: Option<String>,
    pub live_url: Option<String>,
    pub tags: Option<Vec<String>>,
    pub cover_image: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CertificateUpsert {
    pub id: Option<Uuid>,
    pub title: String,
    pub issuer: Option<String>,
    pub year: Option<String>,
    pub file_url: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SkillUpsert {
    pub id: Option<Uuid>,
    pub name: String,
    pub category: Option<String>,
    pub proficiency: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BacklinkUpsert {
    pub id: Option<Uuid>,
    pub source_url: String,
    pub domain: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

/// 性能指标上报
///
/// 字段别名兼容浏览器端 `web-vitals` 库的原始命名。
#[derive(Debug, Clone, Deserialize)]
pub struct WebVital {
    pub metric: String,
    pub value: Option<f64>,
    pub label: Option<String>,
    pub path: Option<String>,
    #[serde(alias = "userAgent")]
    pub user_agent: Option<String>,
    #[serde(alias = "id")]
    pub metric_id: Option<String>,
}
