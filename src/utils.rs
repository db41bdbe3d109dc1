use std::collections::HashSet;
use std::path::{Component, Path};

use url::Url;

use crate::constants::site_config;
use crate::project::SourceKind;

/// 初始化日志系统
pub fn init_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

/// 根据输入推断文档源类型
///
/// 以 `.git` 结尾或指向 github.com 仓库的URL视为git仓库，
/// 其余 http(s) URL 视为网站，其他输入视为本地目录。
pub fn detect_source_kind(input: &str) -> SourceKind {
    if let Ok(url) = Url::parse(input) {
        if url.scheme() == "http" || url.scheme() == "https" {
            let is_repo = url.path().ends_with(".git")
                || url.host_str() == Some("github.com")
                || url.host_str() == Some("gitlab.com");
            return if is_repo {
                SourceKind::Github
            } else {
                SourceKind::Website
            };
        }
        if url.scheme() == "git" || url.scheme() == "ssh" {
            return SourceKind::Github;
        }
    }

    SourceKind::Local
}

/// 规范化文档源：去掉首尾空白、结尾的 `/` 和 `.git` 后缀
pub fn normalize_source(source: &str) -> String {
    let trimmed = source.trim();
    let canonical = match Url::parse(trimmed) {
        Ok(url) if url.has_host() => url.to_string(),
        _ => trimmed.to_string(),
    };

    let without_slash = canonical.trim_end_matches('/');
    without_slash
        .strip_suffix(".git")
        .unwrap_or(without_slash)
        .trim_end_matches('/')
        .to_string()
}

/// 由规范化后的文档源生成可读标识片段
pub fn source_slug(normalized: &str) -> String {
    let last = normalized.rsplit(['/', '\\']).next().unwrap_or_default();

    last.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect::<String>()
        .trim_matches('_')
        .to_string()
}

/// 名称能否直接用作输出目录下的单层目录名
///
/// 拒绝空名称、路径分隔符、`.`/`..` 以及绝对路径。
pub fn is_single_path_component(name: &str) -> bool {
    if name.contains(['/', '\\']) {
        return false;
    }
    let components: Vec<Component> = Path::new(name).components().collect();
    matches!(components.as_slice(), [Component::Normal(_)])
}

/// 把文件名转换为可读标题：`getting_started` -> `Getting Started`
pub fn humanize_stem(stem: &str) -> String {
    stem.split(['_', '-', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(|c| c.to_lowercase()))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// 为文档生成站点内唯一的输出文件名
///
/// 重名时追加序号，且不会占用索引页的文件名。
pub fn unique_output_name(file_path: &str, taken: &mut HashSet<String>) -> String {
    let stem = Path::new(file_path)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "page".to_string());

    let safe_stem: String = stem
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c == '-' || c == '.' { c } else { '_' })
        .collect();

    let mut candidate = format!("{}.html", safe_stem);
    let mut counter = 2;
    while candidate == site_config::INDEX_FILE || taken.contains(&candidate) {
        candidate = format!("{}_{}.html", safe_stem, counter);
        counter += 1;
    }

    taken.insert(candidate.clone());
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_path_component() {
        assert!(is_single_path_component("demo"));
        assert!(is_single_path_component("my-docs_v2.1"));
        assert!(!is_single_path_component(""));
        assert!(!is_single_path_component("."));
        assert!(!is_single_path_component(".."));
        assert!(!is_single_path_component("/tmp/victim"));
        assert!(!is_single_path_component("../outside"));
        assert!(!is_single_path_component("a/b"));
        assert!(!is_single_path_component("a\\b"));
    }

    #[test]
    fn test_detect_source_kind() {
        assert_eq!(detect_source_kind("https://github.com/rust-lang/book"), SourceKind::Github);
        assert_eq!(detect_source_kind("https://example.com/repo.git"), SourceKind::Github);
        assert_eq!(detect_source_kind("https://docs.example.com/guide"), SourceKind::Website);
        assert_eq!(detect_source_kind("./docs"), SourceKind::Local);
    }

    #[test]
    fn test_normalize_source() {
        assert_eq!(
            normalize_source("https://github.com/org/project.git/"),
            "https://github.com/org/project"
        );
        assert_eq!(
            normalize_source("https://org.github.io/site/"),
            "https://org.github.io/site"
        );
        assert_eq!(normalize_source("https://example.com"), "https://example.com");
        assert_eq!(normalize_source(" /tmp/docs/ "), "/tmp/docs");
    }

    #[test]
    fn test_source_slug() {
        assert_eq!(source_slug("https://github.com/org/my.project"), "my_project");
        assert_eq!(source_slug("https://example.com"), "example_com");
        assert_eq!(source_slug(""), "");
    }

    #[test]
    fn test_humanize_stem() {
        assert_eq!(humanize_stem("getting_started"), "Getting Started");
        assert_eq!(humanize_stem("api-REFERENCE"), "Api Reference");
        assert_eq!(humanize_stem("__"), "");
    }

    #[test]
    fn test_unique_output_name() {
        let mut taken = HashSet::new();
        assert_eq!(unique_output_name("docs/intro.md", &mut taken), "intro.html");
        assert_eq!(unique_output_name("guide/intro.rst", &mut taken), "intro_2.html");
        assert_eq!(unique_output_name("docs/index.md", &mut taken), "index_2.html");
        assert_eq!(unique_output_name("a b.txt", &mut taken), "a_b.html");
    }
}
