use std::borrow::Cow;

use percent_encoding::percent_decode_str;
use unicode_normalization::UnicodeNormalization;

/// 兜底全表扫描的行数上限。
///
/// 超出上限的旧文章只能通过精确 slug 命中。
pub const FALLBACK_SCAN_LIMIT: i64 = 1000;

/// slug 数据源
///
/// 解析器只依赖两个原语：按 slug 精确查找，以及按创建时间倒序的全量列表。
pub trait SlugSource {
    type Item;
    type Error;

    /// 精确查找，未命中返回 `None`（与存储错误区分）。
    fn find_exact(
        &self,
        slug: &str,
    ) -> impl std::future::Future<Output = Result<Option<Self::Item>, Self::Error>>;

    /// 按创建时间倒序列出全部条目，供归一化兜底比较。
    fn list_newest_first(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<Self::Item>, Self::Error>>;

    fn slug_of(item: &Self::Item) -> &str;
}

/// 由原始 slug 构造候选串列表。
///
/// 依次为：原始值、百分号解码值（解码失败回退原始值）、
/// 解码值中连续 `-`/`_` 替换为单个空格的形式。
/// 去除首尾空白、丢弃空串、按序去重。
pub fn candidates(raw: &str) -> Vec<String> {
    let decoded = percent_decode(raw);
    let spaced = separators_to_space(&decoded);

    let mut out = Vec::with_capacity(3);
    for value in [raw, &decoded, &spaced] {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        if !out.iter().any(|seen| seen == value) {
            out.push(value.to_owned());
        }
    }
    out
}

/// 归一化 slug，用于宽松比较。
///
/// 步骤：百分号解码、NFKC 归一、转小写、丢弃字母数字/下划线/空白/连字符
/// 之外的字符、把空白/下划线/连字符的连续段折叠为单个 `-`、去除首尾 `-`。
pub fn normalize(value: &str) -> String {
    let decoded = percent_decode(value);
    let folded: String = decoded.nfkc().collect::<String>().to_lowercase();

    let mut out = String::with_capacity(folded.len());
    let mut pending_sep = false;
    for c in folded.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('-');
            }
            pending_sep = false;
            out.push(c);
        } else if c == '_' || c == '-' || c.is_whitespace() {
            pending_sep = true;
        }
        // 其余字符直接丢弃，不产生分隔
    }
    out
}

/// 两个 slug 在归一化意义下是否相同。
pub fn slug_matches(a: &str, b: &str) -> bool {
    let a = normalize(a);
    !a.is_empty() && a == normalize(b)
}

/// 把原始 slug 解析为唯一存储条目。
///
/// 先用每个候选串做精确查找，全部未命中后拉取全量列表做归一化比较。
/// `Ok(None)` 表示正常的"未找到"；存储错误原样向上传播，二者不可混淆。
pub async fn resolve<S: SlugSource>(source: &S, raw: &str) -> Result<Option<S::Item>, S::Error> {
    let candidates = candidates(raw);

    for candidate in &candidates {
        if let Some(hit) = source.find_exact(candidate).await? {
            return Ok(Some(hit));
        }
    }

    let target = normalize(candidates.first().map(String::as_str).unwrap_or(raw));
    if target.is_empty() {
        return Ok(None);
    }

    let entries = source.list_newest_first().await?;
    Ok(entries.into_iter().find(|entry| {
        let stored = S::slug_of(entry);
        normalize(stored) == target
            || candidates
                .iter()
                .any(|candidate| slug_matches(stored, candidate))
    }))
}

fn percent_decode(value: &str) -> String {
    match percent_decode_str(value).decode_utf8() {
        Ok(decoded) => match decoded {
            Cow::Borrowed(s) => s.to_owned(),
            Cow::Owned(s) => s,
        },
        // 非法编码按原样处理
        Err(_) => value.to_owned(),
    }
}

fn separators_to_space(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_run = false;
    for c in value.chars() {
        if c == '-' || c == '_' {
            if !in_run {
                out.push(' ');
            }
            in_run = true;
        } else {
            in_run = false;
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 内存数据源，按插入序视为"新在前"。
    struct MemorySource(Vec<String>);

    impl SlugSource for MemorySource {
        type Item = String;
        type Error = &'static str;

        async fn find_exact(&self, slug: &str) -> Result<Option<String>, Self::Error> {
            Ok(self.0.iter().find(|stored| *stored == slug).cloned())
        }

        async fn list_newest_first(&self) -> Result<Vec<String>, Self::Error> {
            Ok(self.0.clone())
        }

        fn slug_of(item: &String) -> &str {
            item
        }
    }

    /// 精确查找即失败的数据源，用于校验错误传播。
    struct BrokenSource;

    impl SlugSource for BrokenSource {
        type Item = String;
        type Error = &'static str;

        async fn find_exact(&self, _slug: &str) -> Result<Option<String>, Self::Error> {
            Err("storage down")
        }

        async fn list_newest_first(&self) -> Result<Vec<String>, Self::Error> {
            Err("storage down")
        }

        fn slug_of(item: &String) -> &str {
            item
        }
    }

    #[test]
    fn test_candidates_dedup_and_order() {
        assert_eq!(
            candidates("My%20Post"),
            vec!["My%20Post".to_string(), "My Post".to_string()]
        );
        // 解码与原值相同时只保留一份
        assert_eq!(candidates("my-post"), vec!["my-post", "my post"]);
        assert_eq!(candidates("   "), Vec::<String>::new());
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("My Post"), "my-post");
        assert_eq!(normalize("my__post"), "my-post");
        assert_eq!(normalize("My%20Post"), "my-post");
        assert_eq!(normalize("--Rust!-2024--"), "rust-2024");
        assert_eq!(normalize("%%%"), "");
    }

    #[test]
    fn test_slug_matches_rejects_empty() {
        assert!(slug_matches("My Post", "my-post"));
        assert!(!slug_matches("!!!", "???"));
    }

    #[tokio::test]
    async fn test_resolve_variants_hit_same_post() {
        let source = MemorySource(vec!["my-post".to_string(), "other".to_string()]);

        for raw in ["my-post", "My Post", "my_post", "My%20Post"] {
            let hit = resolve(&source, raw).await.expect("不应出错");
            assert_eq!(hit.as_deref(), Some("my-post"), "raw = {raw}");
        }
    }

    #[tokio::test]
    async fn test_resolve_missing_is_none_not_error() {
        let source = MemorySource(vec!["my-post".to_string()]);
        let hit = resolve(&source, "no-such-post").await.expect("不应出错");
        assert_eq!(hit, None);
    }

    #[tokio::test]
    async fn test_resolve_propagates_storage_error() {
        let err = resolve(&BrokenSource, "my-post").await.unwrap_err();
        assert_eq!(err, "storage down");
    }
}
