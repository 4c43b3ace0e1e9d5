use crate::slug::{FALLBACK_SCAN_LIMIT, SlugSource};

use super::{
    Backlink, Blog, BlogSummary, Certificate, CommentRow, Db, Project, Setting, Skill, SlugEntry,
};

/// 只读查询接口
///
/// 覆盖站点所有公开读取和后台列表；写入见 [`super::Store`]。
pub trait Querier {
    /// 获取 [`Db`] 对象
    fn db(&self) -> &Db;

    /// 按 slug 精确查找文章
    ///
    /// 未命中返回 `None`，与存储错误区分。
    fn blog_by_slug(
        &self,
        slug: impl AsRef<str>,
    ) -> impl std::future::Future<Output = Result<Option<Blog>, sqlx::Error>> {
        async move {
            sqlx::query_as::<_, Blog>(
                r#"
                SELECT id, title, slug, excerpt, content, cover_image, created_at, updated_at
                FROM blogs
                WHERE slug = $1
                LIMIT 1
                "#,
            )
            .bind(slug.as_ref())
            .fetch_optional(self.db())
            .await
        }
    }

    /// 文章列表，新在前。
    fn blog_list(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<BlogSummary>, sqlx::Error>> + '_ {
        async move {
            sqlx::query_as::<_, BlogSummary>(
                r#"
                SELECT id, title, slug, excerpt, cover_image, created_at
                FROM blogs
                ORDER BY created_at DESC
                "#,
            )
            .fetch_all(self.db())
            .await
        }
    }

    /// 供 slug 解析兜底用的全量列表，带行数上限。
    fn blog_fallback_list(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<Blog>, sqlx::Error>> + '_ {
        async move {
            sqlx::query_as::<_, Blog>(
                r#"
                SELECT id, title, slug, excerpt, content, cover_image, created_at, updated_at
                FROM blogs
                ORDER BY created_at DESC
                LIMIT $1
                "#,
            )
            .bind(FALLBACK_SCAN_LIMIT)
            .fetch_all(self.db())
            .await
        }
    }

    /// 站点地图用的 slug 索引，最多 1000 条。
    fn blog_index(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<SlugEntry>, sqlx::Error>> + '_ {
        async move {
            sqlx::query_as::<_, SlugEntry>(
                r#"
                SELECT slug, updated_at
                FROM blogs
                ORDER BY updated_at DESC
                LIMIT 1000
                "#,
            )
            .fetch_all(self.db())
            .await
        }
    }

    /// 一篇文章的全部评论，按创建时间升序。
    fn comments_for(
        &self,
        slug: impl AsRef<str>,
    ) -> impl std::future::Future<Output = Result<Vec<CommentRow>, sqlx::Error>> {
        async move {
            sqlx::query_as::<_, CommentRow>(
                r#"
                SELECT id, slug, name, message, created_at, parent_id, likes
                FROM blog_comments
                WHERE slug = $1
                ORDER BY created_at ASC
                "#,
            )
            .bind(slug.as_ref())
            .fetch_all(self.db())
            .await
        }
    }

    fn projects(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<Project>, sqlx::Error>> + '_ {
        async move {
            sqlx::query_as::<_, Project>(
                r#"
                SELECT id, title, slug, description, repo_url, live_url, tags, cover_image, created_at
                FROM projects
                ORDER BY created_at DESC
                "#,
            )
            .fetch_all(self.db())
            .await
        }
    }

    fn project_by_slug(
        &self,
        slug: impl AsRef<str>,
    ) -> impl std::future::Future<Output = Result<Option<Project>, sqlx::Error>> {
        async move {
            sqlx::query_as::<_, Project>(
                r#"
                SELECT id, title, slug, description, repo_url, live_url, tags, cover_image, created_at
                FROM projects
                WHERE slug = $1
                LIMIT 1
                "#,
            )
            .bind(slug.as_ref())
            .fetch_optional(self.db())
            .await
        }
    }

    fn certificates(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<Certificate>, sqlx::Error>> + '_ {
        async move {
            sqlx::query_as::<_, Certificate>(
                r#"
                SELECT id, title, issuer, year, file_url, description, created_at
                FROM certificates
                ORDER BY created_at DESC
                "#,
            )
            .fetch_all(self.db())
            .await
        }
    }

    fn skills(&self) -> impl std::future::Future<Output = Result<Vec<Skill>, sqlx::Error>> + '_ {
        async move {
            sqlx::query_as::<_, Skill>(
                r#"
                SELECT id, name, category, proficiency, description, created_at
                FROM skills
                ORDER BY created_at DESC
                "#,
            )
            .fetch_all(self.db())
            .await
        }
    }

    /// 外链列表，仅后台视图使用。
    fn backlinks(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<Backlink>, sqlx::Error>> + '_ {
        async move {
            sqlx::query_as::<_, Backlink>(
                r#"
                SELECT id, source_url, domain, status, notes, created_at
                FROM backlinks
                ORDER BY created_at DESC
                "#,
            )
            .fetch_all(self.db())
            .await
        }
    }

    fn settings(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<Setting>, sqlx::Error>> + '_ {
        async move {
            sqlx::query_as::<_, Setting>(r#"SELECT key, value FROM settings ORDER BY key"#)
                .fetch_all(self.db())
                .await
        }
    }

}

impl Querier for Db {
    fn db(&self) -> &Db {
        self
    }
}

/// 让解析器直接把连接池当作 slug 数据源。
impl SlugSource for Db {
    type Item = Blog;
    type Error = sqlx::Error;

    async fn find_exact(&self, slug: &str) -> Result<Option<Blog>, sqlx::Error> {
        self.blog_by_slug(slug).await
    }

    async fn list_newest_first(&self) -> Result<Vec<Blog>, sqlx::Error> {
        self.blog_fallback_list().await
    }

    fn slug_of(item: &Blog) -> &str {
        &item.slug
    }
}
