use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::error::Result;
use crate::state::{AppState, SiteConfig};
use crate::storage::{Db, Querier, SlugEntry};

/// 站点地图和 robots 路由，挂在根路径。
pub fn setup_route() -> Router<AppState> {
    Router::new()
        .route("/sitemap.xml", get(sitemap))
        .route("/robots.txt", get(robots))
}

/// 顶层静态页面列表。
const STATIC_PAGES: [&str; 6] = ["", "/about", "/projects", "/certificates", "/contact", "/blog"];

/// URL 片段编码集，保留 RFC 3986 的 unreserved 字符。
const SLUG_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// 生成 sitemap.xml。
///
/// 静态页面永远在；项目和文章来自数据库，读取失败时只降级掉
/// 动态部分，站点地图本身不报错。
async fn sitemap(State(pool): State<Db>, State(site): State<SiteConfig>) -> impl IntoResponse {
    let project_slugs = pool
        .projects()
        .await
        .map(|rows| rows.into_iter().map(|p| p.slug).collect())
        .unwrap_or_else(|e| {
            tracing::error!(%e, "sitemap: project query failed");
            Vec::new()
        });

    let blog_entries = pool.blog_index().await.unwrap_or_else(|e| {
        tracing::error!(%e, "sitemap: blog index query failed");
        Vec::new()
    });

    let body = build_sitemap(site.site_url(), &project_slugs, &blog_entries, Utc::now());
    ([(header::CONTENT_TYPE, "application/xml")], body)
}

async fn robots(State(site): State<SiteConfig>) -> Result<impl IntoResponse> {
    let body = format!(
        "User-agent: *\nAllow: /\nDisallow: /admin\n\nSitemap: {}/sitemap.xml\n",
        site.site_url()
    );
    Ok(([(header::CONTENT_TYPE, "text/plain")], body))
}

fn build_sitemap(
    site_url: &str,
    project_slugs: &[String],
    blog_entries: &[SlugEntry],
    now: DateTime<Utc>,
) -> String {
    let mut out = String::with_capacity(1024);
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    out.push('\n');
    out.push_str(r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#);
    out.push('\n');

    let today = now.format("%Y-%m-%d");
    for page in STATIC_PAGES {
        push_url(&mut out, &format!("{site_url}{page}"), &today.to_string());
    }

    for slug in project_slugs {
        let encoded = utf8_percent_encode(slug, SLUG_ENCODE);
        push_url(
            &mut out,
            &format!("{site_url}/projects/{encoded}"),
            &today.to_string(),
        );
    }

    for entry in blog_entries {
        let encoded = utf8_percent_encode(&entry.slug, SLUG_ENCODE);
        let lastmod = entry
            .updated_at
            .unwrap_or(now)
            .format("%Y-%m-%d")
            .to_string();
        push_url(&mut out, &format!("{site_url}/blog/{encoded}"), &lastmod);
    }

    out.push_str("</urlset>\n");
    out
}

fn push_url(out: &mut String, loc: &str, lastmod: &str) {
    out.push_str("  <url><loc>");
    out.push_str(&xml_escape(loc));
    out.push_str("</loc><lastmod>");
    out.push_str(lastmod);
    out.push_str("</lastmod></url>\n");
}

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_sitemap_contains_all_sections() {
        let blogs = vec![SlugEntry {
            slug: "My Post".to_string(),
            updated_at: None,
        }];
        let projects = vec!["folio".to_string()];

        let xml = build_sitemap("https://example.com", &projects, &blogs, Utc::now());

        assert!(xml.contains("<loc>https://example.com/about</loc>"));
        assert!(xml.contains("<loc>https://example.com/projects/folio</loc>"));
        // slug 中的空格按 encodeURIComponent 规则编码
        assert!(xml.contains("<loc>https://example.com/blog/My%20Post</loc>"));
        assert!(xml.ends_with("</urlset>\n"));
    }

    #[test]
    fn test_xml_escape() {
        assert_eq!(xml_escape("a&b<c>"), "a&amp;b&lt;c&gt;");
    }
}
