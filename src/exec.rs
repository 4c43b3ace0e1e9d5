use serde::{Deserialize, Serialize};

use crate::error::Result;

const PISTON_EXECUTE_API: &str = "https://emkc.org/api/v2/piston/execute";
const DEFAULT_VERSION: &str = "*";

/// PistonClient 把代码片段转发给公共 Piston 执行服务。
///
/// 本服务只做代理和结果整形，不自己运行任何代码。
#[derive(Clone)]
pub struct PistonClient {
    client: reqwest::Client,
    endpoint: String,
}

impl Default for PistonClient {
    /// 从环境变量 `PISTON_API` 创建客户端，未设置时使用公共端点。
    fn default() -> Self {
        Self::new(std::env::var("PISTON_API").unwrap_or_else(|_| PISTON_EXECUTE_API.to_string()))
    }
}

impl PistonClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// 执行代码并把上游结果整形为去重后的行数组。
    ///
    /// 上游非 2xx 响应映射为 [`crate::error::Error::Reqwest`]（对外 502）。
    pub async fn execute(&self, runtime: &Runtime, code: &str) -> Result<ExecReport> {
        #[derive(Serialize)]
        struct File<'a> {
            content: &'a str,
        }

        #[derive(Serialize)]
        struct RequestBody<'a> {
            language: &'a str,
            version: &'a str,
            files: [File<'a>; 1],
        }

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&RequestBody {
                language: &runtime.language,
                version: &runtime.version,
                files: [File { content: code }],
            })
            .send()
            .await?
            .error_for_status()?;

        let raw: PistonResponse = resp.json().await?;
        Ok(ExecReport::from_raw(runtime, raw))
    }
}

/// 归一化后的语言运行时。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Runtime {
    pub language: String,
    pub version: String,
}

/// 把编辑器里的语言提示归一化为 Piston 运行时名。
///
/// 提示为空或纯文本（`plaintext`/`text`）时返回 `None`。
pub fn resolve_runtime(language: Option<&str>, version: Option<&str>) -> Option<Runtime> {
    let normalized = language?.trim().to_ascii_lowercase();
    if normalized.is_empty() || normalized == "plaintext" || normalized == "text" {
        return None;
    }

    let language = match normalized.as_str() {
        "js" | "javascript" => "javascript",
        "ts" | "typescript" => "typescript",
        "tsx" => "tsx",
        "py" | "python" => "python",
        "rb" | "ruby" => "ruby",
        "rs" | "rust" => "rust",
        "cpp" | "cplusplus" => "cpp",
        "cs" | "csharp" => "csharp",
        "sh" | "bash" | "shell" => "bash",
        other => other,
    };

    let version = version
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_VERSION);

    Some(Runtime {
        language: language.to_string(),
        version: version.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct PistonResponse {
    version: Option<String>,
    #[serde(default)]
    run: Phase,
    #[serde(default)]
    compile: Phase,
}

#[derive(Debug, Default, Deserialize)]
struct Phase {
    stdout: Option<String>,
    stderr: Option<String>,
    output: Option<String>,
    code: Option<i32>,
    signal: Option<String>,
}

/// 对外返回的执行报告，所有输出都是去重后的行数组。
#[derive(Debug, Serialize)]
pub struct ExecReport {
    pub language: String,
    pub version: String,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    pub output: Vec<String>,
    pub compile_stdout: Vec<String>,
    pub compile_stderr: Vec<String>,
    pub exit_code: Option<i32>,
    pub signal: Option<String>,
}

impl ExecReport {
    fn from_raw(runtime: &Runtime, raw: PistonResponse) -> Self {
        let run_stdout = split_lines(raw.run.stdout.as_deref());
        let run_output = split_lines(raw.run.output.as_deref());
        // stdout 缺失时退回 output 字段
        let stdout = dedupe(if run_stdout.is_empty() {
            run_output.clone()
        } else {
            run_stdout
        });

        Self {
            language: runtime.language.clone(),
            version: raw.version.unwrap_or_else(|| runtime.version.clone()),
            stdout,
            stderr: dedupe(split_lines(raw.run.stderr.as_deref())),
            output: run_output,
            compile_stdout: dedupe(split_lines(raw.compile.stdout.as_deref())),
            compile_stderr: dedupe(split_lines(raw.compile.stderr.as_deref())),
            exit_code: raw.run.code,
            signal: raw.run.signal,
        }
    }
}

/// 按行拆分，统一 CRLF，去掉尾部空行。
fn split_lines(value: Option<&str>) -> Vec<String> {
    let Some(text) = value else {
        return Vec::new();
    };
    if text.is_empty() {
        return Vec::new();
    }

    let mut lines: Vec<String> = text.replace("\r\n", "\n").split('\n').map(String::from).collect();
    while lines.last().is_some_and(|line| line.trim().is_empty()) {
        lines.pop();
    }
    lines
}

/// 保序去重。
fn dedupe(lines: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    lines
        .into_iter()
        .filter(|line| seen.insert(line.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_runtime_aliases() {
        let rt = resolve_runtime(Some("Py"), None).unwrap();
        assert_eq!(rt.language, "python");
        assert_eq!(rt.version, "*");

        let rt = resolve_runtime(Some("rs"), Some("1.80")).unwrap();
        assert_eq!(rt.language, "rust");
        assert_eq!(rt.version, "1.80");

        // 未知语言原样透传
        assert_eq!(resolve_runtime(Some("zig"), None).unwrap().language, "zig");
        assert!(resolve_runtime(Some("plaintext"), None).is_none());
        assert!(resolve_runtime(Some("  "), None).is_none());
        assert!(resolve_runtime(None, None).is_none());
    }

    #[test]
    fn test_split_lines_trims_trailing_blank_lines() {
        assert_eq!(split_lines(Some("a\r\nb\n\n")), vec!["a", "b"]);
        assert_eq!(split_lines(Some("")), Vec::<String>::new());
        assert_eq!(split_lines(None), Vec::<String>::new());
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let lines = vec!["a".to_string(), "b".to_string(), "a".to_string()];
        assert_eq!(dedupe(lines), vec!["a", "b"]);
    }

    /// 访问公共 Piston API 的测试，需要网络
    #[tokio::test]
    #[ignore = "需要访问 piston api"]
    async fn test_execute() {
        let client = PistonClient::default();
        let runtime = resolve_runtime(Some("python"), None).unwrap();
        let report = client.execute(&runtime, "print(1)").await.unwrap();
        assert_eq!(report.stdout, vec!["1"]);
    }
}
