use std::{collections::HashSet, sync::Arc};

use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, Uri, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// 网关配置
///
/// 所有策略表都是注入式的，便于测试和替换，不使用编译期全局常量。
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// 管理后台域名，例如 `admin.example.com`
    pub admin_host: String,
    /// 管理后台路径前缀
    pub admin_prefix: String,
    /// 不参与后台改写的内部路径前缀
    pub internal_prefixes: Vec<String>,
    /// 固定图标路径集合，命中后改写到 [`GatewayConfig::icon_asset`]
    pub icon_paths: Vec<String>,
    /// 图标实际资源路径
    pub icon_asset: String,
}

impl GatewayConfig {
    /// 使用默认策略表创建配置，仅需指定后台域名。
    pub fn for_host(admin_host: impl Into<String>) -> Self {
        Self {
            admin_host: admin_host.into(),
            admin_prefix: "/admin".to_string(),
            internal_prefixes: vec!["/api".to_string(), "/assets".to_string()],
            icon_paths: [
                "/favicon.ico",
                "/apple-touch-icon.png",
                "/apple-touch-icon-precomposed.png",
                "/icon.png",
                "/icon-192.png",
                "/icon-512.png",
                "/android-chrome-192x192.png",
                "/android-chrome-512x512.png",
            ]
            .map(String::from)
            .to_vec(),
            icon_asset: "/assets/profile.jpg".to_string(),
        }
    }
}

/// 每个请求的路由决策
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteAction {
    /// 改写到固定头像资源，并在响应上禁用缓存
    ServeIcon,
    /// 改写到后台前缀下的新路径
    RewriteAdmin(String),
    /// 原样放行
    Passthrough,
}

/// 域名网关
///
/// 对每个入站请求做 O(1) 分类：命中图标路径时改写到固定资源；
/// 后台域名下的请求补上后台前缀；其余请求原样放行。
/// 纯函数式决策，不持有跨请求状态，可在任意并发下运行。
#[derive(Clone)]
pub struct Gateway(Arc<Inner>);

struct Inner {
    admin_host: String,
    admin_suffix: String,
    admin_prefix: String,
    internal_prefixes: Vec<String>,
    icon_paths: HashSet<String>,
    icon_asset: String,
}

impl Gateway {
    pub fn new(config: GatewayConfig) -> Self {
        Self(Arc::new(Inner {
            admin_suffix: format!(".{}", config.admin_host),
            admin_host: config.admin_host,
            admin_prefix: config.admin_prefix,
            internal_prefixes: config.internal_prefixes,
            icon_paths: config.icon_paths.into_iter().collect(),
            icon_asset: config.icon_asset,
        }))
    }

    /// 判断是否为后台域名。
    ///
    /// 策略：与配置域名完全相等，或以 `.` + 配置域名结尾（子域名）。
    /// 不采用 `contains("admin.")` 的宽松匹配。
    pub fn is_admin_host(&self, host: &str) -> bool {
        host == self.0.admin_host || host.ends_with(&self.0.admin_suffix)
    }

    /// 对一次请求做路由分类。
    ///
    /// 图标路径优先于后台改写；后台改写跳过已带前缀的路径和内部路径；
    /// 根路径 `/` 改写为裸前缀。任何头缺失都按空字符串处理，不会失败。
    pub fn classify(
        &self,
        forwarded_host: Option<&str>,
        host: Option<&str>,
        path: &str,
    ) -> RouteAction {
        if self.0.icon_paths.contains(path) {
            return RouteAction::ServeIcon;
        }

        let effective = effective_host(forwarded_host, host);
        if self.is_admin_host(&effective)
            && !path.starts_with(&self.0.admin_prefix)
            && !self
                .0
                .internal_prefixes
                .iter()
                .any(|prefix| path.starts_with(prefix.as_str()))
        {
            let rest = if path == "/" { "" } else { path };
            return RouteAction::RewriteAdmin(format!("{}{}", self.0.admin_prefix, rest));
        }

        RouteAction::Passthrough
    }

    pub fn icon_asset(&self) -> &str {
        &self.0.icon_asset
    }

    fn host_info(&self, forwarded_host: Option<&str>, host: Option<&str>) -> HostInfo {
        let effective = effective_host(forwarded_host, host);
        HostInfo {
            is_admin_host: self.is_admin_host(&effective),
            host: host.map(str::to_owned),
            x_forwarded_host: forwarded_host.map(str::to_owned),
            detected_host: effective,
        }
    }
}

/// `/debug` 端点返回的域名分类快照
#[derive(Debug, Serialize)]
pub struct HostInfo {
    pub host: Option<String>,
    pub x_forwarded_host: Option<String>,
    pub detected_host: String,
    pub is_admin_host: bool,
}

/// 解析请求的有效域名。
///
/// 优先取 `X-Forwarded-Host` 的第一个逗号分隔段（非空时），
/// 否则回退到 `Host`，再否则为空字符串。结果去除首尾空白并转小写。
pub fn effective_host(forwarded_host: Option<&str>, host: Option<&str>) -> String {
    forwarded_host
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .or(host)
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// 网关中间件
///
/// 必须包在整个 [`axum::Router`] 外层（路由匹配之前），否则 URI 改写不生效。
pub async fn rewrite(State(gateway): State<Gateway>, mut req: Request, next: Next) -> Response {
    let path = req.uri().path().to_owned();
    let forwarded = header_str(req.headers(), "x-forwarded-host");
    let host = header_str(req.headers(), header::HOST.as_str());

    match gateway.classify(forwarded.as_deref(), host.as_deref(), &path) {
        RouteAction::ServeIcon => {
            *req.uri_mut() = replace_path(req.uri(), gateway.icon_asset());
            let mut resp = next.run(req).await;
            resp.headers_mut()
                .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
            resp
        }

        RouteAction::RewriteAdmin(new_path) => {
            *req.uri_mut() = replace_path(req.uri(), &new_path);
            next.run(req).await
        }

        RouteAction::Passthrough => {
            if path == "/debug" {
                return Json(gateway.host_info(forwarded.as_deref(), host.as_deref()))
                    .into_response();
            }
            next.run(req).await
        }
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

/// 替换 URI 的路径部分，保留查询串。
///
/// 新路径非法时保持原 URI 不变（构造上不应发生）。
fn replace_path(uri: &Uri, new_path: &str) -> Uri {
    let path_and_query = match uri.query() {
        Some(query) => format!("{new_path}?{query}"),
        None => new_path.to_owned(),
    };

    let mut parts = uri.clone().into_parts();
    match path_and_query.parse() {
        Ok(pq) => {
            parts.path_and_query = Some(pq);
            Uri::from_parts(parts).unwrap_or_else(|_| uri.clone())
        }
        Err(_) => uri.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> Gateway {
        Gateway::new(GatewayConfig::for_host("admin.example.com"))
    }

    #[test]
    fn test_effective_host_prefers_first_forwarded_segment() {
        assert_eq!(
            effective_host(Some("sub.example.com, proxy.internal"), Some("other")),
            "sub.example.com"
        );
    }

    #[test]
    fn test_effective_host_falls_back_to_host_header() {
        assert_eq!(
            effective_host(None, Some(" Example.COM ")),
            "example.com",
            "应去空白并转小写"
        );
        assert_eq!(effective_host(Some("  "), Some("example.com")), "example.com");
        assert_eq!(effective_host(None, None), "");
    }

    #[test]
    fn test_icon_paths_rewrite_on_any_host() {
        let gw = gateway();
        for path in [
            "/favicon.ico",
            "/apple-touch-icon.png",
            "/apple-touch-icon-precomposed.png",
            "/icon.png",
            "/icon-192.png",
            "/icon-512.png",
            "/android-chrome-192x192.png",
            "/android-chrome-512x512.png",
        ] {
            // 图标优先级高于后台改写
            assert_eq!(
                gw.classify(None, Some("admin.example.com"), path),
                RouteAction::ServeIcon,
                "{path}"
            );
            assert_eq!(
                gw.classify(None, Some("example.com"), path),
                RouteAction::ServeIcon,
                "{path}"
            );
        }
    }

    #[test]
    fn test_admin_host_policy_exact_or_subdomain() {
        let gw = gateway();
        assert!(gw.is_admin_host("admin.example.com"));
        assert!(gw.is_admin_host("sub.admin.example.com"));
        // 不采用子串匹配
        assert!(!gw.is_admin_host("notadmin.example.com"));
        assert!(!gw.is_admin_host("admin.attacker.com"));
        assert!(!gw.is_admin_host("example.com"));
    }

    #[test]
    fn test_admin_rewrite_prefixes_path() {
        let gw = gateway();
        assert_eq!(
            gw.classify(None, Some("admin.example.com"), "/"),
            RouteAction::RewriteAdmin("/admin".to_string())
        );
        assert_eq!(
            gw.classify(None, Some("admin.example.com"), "/blogs"),
            RouteAction::RewriteAdmin("/admin/blogs".to_string())
        );
    }

    #[test]
    fn test_admin_rewrite_is_idempotent() {
        let gw = gateway();
        let RouteAction::RewriteAdmin(once) =
            gw.classify(None, Some("admin.example.com"), "/blogs")
        else {
            panic!("第一次分类应为改写");
        };
        // 已带前缀的路径不再改写
        assert_eq!(
            gw.classify(None, Some("admin.example.com"), &once),
            RouteAction::Passthrough
        );
    }

    #[test]
    fn test_internal_paths_pass_through_on_admin_host() {
        let gw = gateway();
        assert_eq!(
            gw.classify(None, Some("admin.example.com"), "/api/blogs"),
            RouteAction::Passthrough
        );
        assert_eq!(
            gw.classify(None, Some("admin.example.com"), "/assets/profile.jpg"),
            RouteAction::Passthrough
        );
    }

    #[test]
    fn test_forwarded_host_drives_admin_detection() {
        let gw = gateway();
        assert_eq!(
            gw.classify(
                Some("admin.example.com, proxy.internal"),
                Some("lb.internal"),
                "/"
            ),
            RouteAction::RewriteAdmin("/admin".to_string())
        );
    }

    #[test]
    fn test_normal_host_passes_through() {
        let gw = gateway();
        assert_eq!(
            gw.classify(None, Some("example.com"), "/blog/my-post"),
            RouteAction::Passthrough
        );
        assert_eq!(gw.classify(None, None, "/"), RouteAction::Passthrough);
    }

    #[test]
    fn test_replace_path_keeps_query() {
        let uri: Uri = "https://example.com/foo?a=1".parse().unwrap();
        let rewritten = replace_path(&uri, "/admin/foo");
        assert_eq!(rewritten.path(), "/admin/foo");
        assert_eq!(rewritten.query(), Some("a=1"));
    }
}
