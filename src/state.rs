use std::{
    collections::HashMap,
    env,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use axum::extract::FromRef;
use uuid::Uuid;

use crate::{exec::PistonClient, storage::Db};

/// 应用程序上下文
///
/// [`AppState`] 封装了数据库连接池、代码执行代理客户端、站点配置
/// 和后台会话表，各字段经 `FromRef` 独立提取。
#[derive(Clone, FromRef)]
pub struct AppState {
    pool: Db,
    exec: PistonClient,
    site: SiteConfig,
    sessions: Sessions,
}

impl AppState {
    pub fn new(pool: Db, exec: PistonClient, site: SiteConfig) -> Self {
        Self {
            pool,
            exec,
            site,
            sessions: Sessions::default(),
        }
    }

    pub fn site(&self) -> &SiteConfig {
        &self.site
    }
}

/// 站点配置
#[derive(Clone)]
pub struct SiteConfig(Arc<SiteConfigInner>);

struct SiteConfigInner {
    site_url: String,
    profile_image: PathBuf,
    admin_email: String,
    admin_password: String,
}

impl SiteConfig {
    pub fn new(
        site_url: impl Into<String>,
        profile_image: impl Into<PathBuf>,
        admin_email: impl Into<String>,
        admin_password: impl Into<String>,
    ) -> Self {
        let site_url = site_url.into();
        Self(Arc::new(SiteConfigInner {
            // 统一去掉尾部斜杠，拼接路径时再补
            site_url: site_url.trim_end_matches('/').to_string(),
            profile_image: profile_image.into(),
            admin_email: admin_email.into(),
            admin_password: admin_password.into(),
        }))
    }

    /// 从环境变量创建站点配置
    ///
    /// # Panics
    ///
    /// `ADMIN_EMAIL` 或 `ADMIN_PASSWORD` 未设置时会 panic。
    pub fn from_env() -> Self {
        Self::new(
            env::var("SITE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string()),
            env::var("PROFILE_IMAGE").unwrap_or_else(|_| "assets/profile.jpg".to_string()),
            env::var("ADMIN_EMAIL").expect("ADMIN_EMAIL not set"),
            env::var("ADMIN_PASSWORD").expect("ADMIN_PASSWORD not set"),
        )
    }

    pub fn site_url(&self) -> &str {
        &self.0.site_url
    }

    pub fn profile_image(&self) -> &Path {
        &self.0.profile_image
    }

    /// 核对后台登录凭据。
    pub fn verify_credentials(&self, email: &str, password: &str) -> bool {
        email == self.0.admin_email && password == self.0.admin_password
    }
}

/// 会话有效期，超时后令牌按不存在处理。
const SESSION_TTL: Duration = Duration::from_secs(12 * 60 * 60);

/// 后台会话表
///
/// 登录成功后签发随机令牌并保存在服务端，取代原站把登录标记
/// 放在浏览器 localStorage 的做法。令牌带签发时间，过期后惰性
/// 清理，表的大小以有效期内的登录次数为界。进程重启即全部失效。
#[derive(Clone, Default)]
pub struct Sessions(Arc<Mutex<HashMap<Uuid, Instant>>>);

impl Sessions {
    /// 签发一个新令牌，顺带清理已过期的条目。
    pub fn issue(&self) -> Uuid {
        self.issue_with_ttl(SESSION_TTL)
    }

    /// 令牌是否有效。
    pub fn contains(&self, token: &Uuid) -> bool {
        self.contains_with_ttl(token, SESSION_TTL)
    }

    /// 吊销令牌，返回其此前是否有效。
    pub fn revoke(&self, token: &Uuid) -> bool {
        self.revoke_with_ttl(token, SESSION_TTL)
    }

    fn issue_with_ttl(&self, ttl: Duration) -> Uuid {
        let mut tokens = self.0.lock().expect("sessions lock poisoned");
        let now = Instant::now();
        tokens.retain(|_, issued_at| now.duration_since(*issued_at) < ttl);

        let token = Uuid::new_v4();
        tokens.insert(token, now);
        token
    }

    fn contains_with_ttl(&self, token: &Uuid, ttl: Duration) -> bool {
        self.0
            .lock()
            .expect("sessions lock poisoned")
            .get(token)
            .is_some_and(|issued_at| issued_at.elapsed() < ttl)
    }

    fn revoke_with_ttl(&self, token: &Uuid, ttl: Duration) -> bool {
        self.0
            .lock()
            .expect("sessions lock poisoned")
            .remove(token)
            .is_some_and(|issued_at| issued_at.elapsed() < ttl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_lifecycle() {
        let sessions = Sessions::default();
        let token = sessions.issue();

        assert!(sessions.contains(&token));
        assert!(sessions.revoke(&token));
        assert!(!sessions.contains(&token));
        assert!(!sessions.revoke(&token));
    }

    #[test]
    fn test_expired_session_is_rejected_and_evicted() {
        let sessions = Sessions::default();
        let token = sessions.issue();

        // 有效期归零后令牌立即失效
        assert!(!sessions.contains_with_ttl(&token, Duration::ZERO));
        assert!(sessions.contains(&token), "正常有效期内仍然有效");

        // 零有效期签发把存量条目全部清出表
        let fresh = sessions.issue_with_ttl(Duration::ZERO);
        assert!(!sessions.contains(&token));

        // 过期令牌的吊销视同不存在
        assert!(!sessions.revoke_with_ttl(&fresh, Duration::ZERO));
    }

    #[test]
    fn test_verify_credentials() {
        let site = SiteConfig::new("https://example.com/", "assets/p.jpg", "a@b.c", "secret");
        assert!(site.verify_credentials("a@b.c", "secret"));
        assert!(!site.verify_credentials("a@b.c", "wrong"));
        assert_eq!(site.site_url(), "https://example.com");
    }
}
