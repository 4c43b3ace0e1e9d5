use sqlx::PgExecutor;
use uuid::Uuid;

use crate::comments::LikeStore;

use super::{
    BacklinkUpsert, BlogUpsert, CertificateUpsert, CommentRow, Db, ProjectUpsert, Querier, Setting,
    SkillUpsert, WebVital,
};

/// 写入接口
///
/// 后台 CRUD、评论写入和指标落库都经由此 trait。
/// 同时给 [`sqlx::PgTransaction`] 和 [`Db`] 实现，事务与直连两用。
pub trait Store {
    /// 获取 SQL 执行器，用于 [`sqlx::query()`] 执行
    fn executor<'t>(&'t mut self) -> impl PgExecutor<'t>;

    /// 插入或更新文章
    ///
    /// 以主键 `id` 做 upsert；`updated_at` 由服务端刷新。
    fn upsert_blog(
        &mut self,
        blog: &BlogUpsert,
    ) -> impl std::future::Future<Output = Result<Uuid, sqlx::Error>> {
        async {
            let id = blog.id.unwrap_or_else(Uuid::new_v4);
            sqlx::query(
                "
                INSERT INTO blogs (id, title, slug, excerpt, content, cover_image, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, now())
                ON CONFLICT (id)
                DO UPDATE SET
                    title = EXCLUDED.title,
                    slug = EXCLUDED.slug,
                    excerpt = EXCLUDED.excerpt,
                    content = EXCLUDED.content,
                    cover_image = EXCLUDED.cover_image,
                    updated_at = now()
                ",
            )
            .bind(id)
            .bind(&blog.title)
            .bind(&blog.slug)
            .bind(&blog.excerpt)
            .bind(&blog.content)
            .bind(&blog.cover_image)
            .execute(self.executor())
            .await?;
            Ok(id)
        }
    }

    fn delete_blog(
        &mut self,
        id: Uuid,
    ) -> impl std::future::Future<Output = Result<(), sqlx::Error>> {
        async move {
            sqlx::query("DELETE FROM blogs WHERE id = $1")
                .bind(id)
                .execute(self.executor())
                .await?;
            Ok(())
        }
    }

    fn upsert_project(
        &mut self,
        project: &ProjectUpsert,
    ) -> impl std::future::Future<Output = Result<Uuid, sqlx::Error>> {
        async {
            let id = project.id.unwrap_or_else(Uuid::new_v4);
            sqlx::query(
                "
                INSERT INTO projects
                    (id, title, slug, description, repo_url, live_url, tags, cover_image)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (id)
                DO UPDATE SET
                    title = EXCLUDED.title,
                    slug = EXCLUDED.slug,
                    description = EXCLUDED.description,
                    repo_url = EXCLUDED.repo_url,
                    live_url = EXCLUDED.live_url,
                    tags = EXCLUDED.tags,
                    cover_image = EXCLUDED.cover_image
                ",
            )
            .bind(id)
            .bind(&project.title)
            .bind(&project.slug)
            .bind(&project.description)
            .bind(&project.repo_url)
            .bind(&project.live_url)
            .bind(&project.tags)
            .bind(&project.cover_image)
            .execute(self.executor())
            .await?;
            Ok(id)
        }
    }

    fn delete_project(
        &mut self,
        id: Uuid,
    ) -> impl std::future::Future<Output = Result<(), sqlx::Error>> {
        async move {
            sqlx::query("DELETE FROM projects WHERE id = $1")
                .bind(id)
                .execute(self.executor())
                .await?;
            Ok(())
        }
    }

    fn upsert_certificate(
        &mut self,
        certificate: &CertificateUpsert,
    ) -> impl std::future::Future<Output = Result<Uuid, sqlx::Error>> {
        async {
            let id = certificate.id.unwrap_or_else(Uuid::new_v4);
            sqlx::query(
                "
                INSERT INTO certificates (id, title, issuer, year, file_url, description)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (id)
                DO UPDATE SET
                    title = EXCLUDED.title,
                    issuer = EXCLUDED.issuer,
                    year = EXCLUDED.year,
                    file_url = EXCLUDED.file_url,
                    description = EXCLUDED.description
                ",
            )
            .bind(id)
            .bind(&certificate.title)
            .bind(&certificate.issuer)
            .bind(&certificate.year)
            .bind(&certificate.file_url)
            .bind(&certificate.description)
            .execute(self.executor())
            .await?;
            Ok(id)
        }
    }

    fn delete_certificate(
        &mut self,
        id: Uuid,
    ) -> impl std::future::Future<Output = Result<(), sqlx::Error>> {
        async move {
            sqlx::query("DELETE FROM certificates WHERE id = $1")
                .bind(id)
                .execute(self.executor())
                .await?;
            Ok(())
        }
    }

    fn upsert_skill(
        &mut self,
        skill: &SkillUpsert,
    ) -> impl std::future::Future<Output = Result<Uuid, sqlx::Error>> {
        async {
            let id = skill.id.unwrap_or_else(Uuid::new_v4);
            sqlx::query(
                "
                INSERT INTO skills (id, name, category, proficiency, description)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (id)
                DO UPDATE SET
                    name = EXCLUDED.name,
                    category = EXCLUDED.category,
                    proficiency = EXCLUDED.proficiency,
                    description = EXCLUDED.description
                ",
            )
            .bind(id)
            .bind(&skill.name)
            .bind(&skill.category)
            .bind(&skill.proficiency)
            .bind(&skill.description)
            .execute(self.executor())
            .await?;
            Ok(id)
        }
    }

    fn delete_skill(
        &mut self,
        id: Uuid,
    ) -> impl std::future::Future<Output = Result<(), sqlx::Error>> {
        async move {
            sqlx::query("DELETE FROM skills WHERE id = $1")
                .bind(id)
                .execute(self.executor())
                .await?;
            Ok(())
        }
    }

    fn upsert_backlink(
        &mut self,
        backlink: &BacklinkUpsert,
    ) -> impl std::future::Future<Output = Result<Uuid, sqlx::Error>> {
        async {
            let id = backlink.id.unwrap_or_else(Uuid::new_v4);
            sqlx::query(
                "
                INSERT INTO backlinks (id, source_url, domain, status, notes)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (id)
                DO UPDATE SET
                    source_url = EXCLUDED.source_url,
                    domain = EXCLUDED.domain,
                    status = EXCLUDED.status,
                    notes = EXCLUDED.notes
                ",
            )
            .bind(id)
            .bind(&backlink.source_url)
            .bind(&backlink.domain)
            .bind(&backlink.status)
            .bind(&backlink.notes)
            .execute(self.executor())
            .await?;
            Ok(id)
        }
    }

    fn delete_backlink(
        &mut self,
        id: Uuid,
    ) -> impl std::future::Future<Output = Result<(), sqlx::Error>> {
        async move {
            sqlx::query("DELETE FROM backlinks WHERE id = $1")
                .bind(id)
                .execute(self.executor())
                .await?;
            Ok(())
        }
    }

    /// 批量写入站点设置，按 key upsert。
    fn upsert_settings(
        &mut self,
        settings: &[Setting],
    ) -> impl std::future::Future<Output = Result<(), sqlx::Error>> {
        async move {
            for setting in settings {
                sqlx::query(
                    "
                    INSERT INTO settings (key, value)
                    VALUES ($1, $2)
                    ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value
                    ",
                )
                .bind(&setting.key)
                .bind(&setting.value)
                .execute(self.executor())
                .await?;
            }
            Ok(())
        }
    }

    /// 写入一条评论并返回完整行。
    fn insert_comment(
        &mut self,
        slug: &str,
        name: &str,
        message: &str,
        parent_id: Option<Uuid>,
    ) -> impl std::future::Future<Output = Result<CommentRow, sqlx::Error>> {
        async move {
            sqlx::query_as::<_, CommentRow>(
                "
                INSERT INTO blog_comments (id, slug, name, message, parent_id)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, slug, name, message, created_at, parent_id, likes
                ",
            )
            .bind(Uuid::new_v4())
            .bind(slug)
            .bind(name)
            .bind(message)
            .bind(parent_id)
            .fetch_one(self.executor())
            .await
        }
    }

    /// 把评论点赞数写为给定值。
    ///
    /// 返回是否真的有行被更新；负值在落库前归零。
    fn set_comment_likes(
        &mut self,
        id: Uuid,
        likes: i32,
    ) -> impl std::future::Future<Output = Result<bool, sqlx::Error>> {
        async move {
            let result = sqlx::query("UPDATE blog_comments SET likes = $2 WHERE id = $1")
                .bind(id)
                .bind(likes.max(0))
                .execute(self.executor())
                .await?;
            Ok(result.rows_affected() > 0)
        }
    }

    fn insert_web_vital(
        &mut self,
        vital: &WebVital,
    ) -> impl std::future::Future<Output = Result<(), sqlx::Error>> {
        async {
            sqlx::query(
                "
                INSERT INTO web_vitals (metric, value, label, path, user_agent, metric_id)
                VALUES ($1, $2, $3, $4, $5, $6)
                ",
            )
            .bind(&vital.metric)
            .bind(vital.value)
            .bind(&vital.label)
            .bind(&vital.path)
            .bind(&vital.user_agent)
            .bind(&vital.metric_id)
            .execute(self.executor())
            .await?;
            Ok(())
        }
    }
}

/// 为 [`sqlx::PgTransaction`] 实现 [`Store`]
impl Store for sqlx::PgTransaction<'_> {
    fn executor<'t>(&'t mut self) -> impl PgExecutor<'t> {
        self.as_mut()
    }
}

/// 为 [`Db`] 实现 [`Store`]
impl Store for &'_ Db {
    fn executor<'t>(&'t mut self) -> impl PgExecutor<'t> {
        *self
    }
}

/// 让点赞流程直接把连接池当作数据源。
impl LikeStore for Db {
    type Error = sqlx::Error;

    async fn comment_rows(&self, slug: &str) -> Result<Vec<CommentRow>, sqlx::Error> {
        self.comments_for(slug).await
    }

    async fn persist_likes(&self, id: Uuid, likes: i32) -> Result<bool, sqlx::Error> {
        let mut store = self;
        store.set_comment_likes(id, likes).await
    }
}
