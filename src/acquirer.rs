//! 文档源获取
//!
//! 三种来源：git仓库（浅克隆）、文档网站（广度优先爬取）、本地目录。
//! 获取结果统一为 [`FetchOutput`]，其中的文件按相对路径排序。

// 标准库导入
use std::path::{Path, PathBuf};
use std::time::Duration;

// 第三方crate导入
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};
use walkdir::WalkDir;

// 本地模块导入
use crate::constants::crawler_config;
use crate::error::Result;
use crate::pipeline_error;
use crate::project::{FetchOutput, SourceDescriptor, SourceEntry, SourceKind};
use crate::web_crawler::WebCrawler;

/// 文档源获取接口
#[async_trait]
pub trait SourceAcquirer: Send + Sync {
    /// 获取文档源，`workspace` 是本次获取可以使用的工作目录
    async fn fetch(&self, source: &SourceDescriptor, workspace: &Path) -> Result<FetchOutput>;
}

/// 默认实现：git + Monolith爬虫 + 本地目录
#[derive(Debug, Clone)]
pub struct DefaultSourceAcquirer {
    user_agent: String,
    timeout: Duration,
}

impl Default for DefaultSourceAcquirer {
    fn default() -> Self {
        Self {
            user_agent: crawler_config::DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(crawler_config::DEFAULT_CRAWL_TIMEOUT),
        }
    }
}

impl DefaultSourceAcquirer {
    pub fn new(user_agent: &str, timeout: Duration) -> Self {
        Self {
            user_agent: user_agent.to_string(),
            timeout,
        }
    }

    async fn clone_repository(&self, source: &SourceDescriptor, workspace: &Path) -> Result<FetchOutput> {
        if source.location.trim_start().starts_with('-') {
            return Err(pipeline_error!(acquisition, source.location, "仓库地址不能以 - 开头"));
        }

        let repo_dir = workspace.join("repo");
        if repo_dir.exists() {
            std::fs::remove_dir_all(&repo_dir)
                .map_err(|e| pipeline_error!(file_op, repo_dir.display(), "remove_dir_all", e))?;
        }
        if let Some(parent) = repo_dir.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| pipeline_error!(file_op, parent.display(), "create_dir_all", e))?;
        }

        info!("📥 克隆仓库: {}", source.location);
        let output = Command::new("git")
            .args(["clone", "--depth", "1", "--"])
            .arg(&source.location)
            .arg(&repo_dir)
            .output()
            .await
            .map_err(|e| pipeline_error!(acquisition, source.location, format!("无法执行git: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(pipeline_error!(
                acquisition,
                source.location,
                format!("git clone 失败: {}", stderr.trim())
            ));
        }

        let docs_root = match &source.options.target_path {
            Some(target) => {
                let path = repo_dir.join(target);
                if !path.is_dir() {
                    return Err(pipeline_error!(
                        acquisition,
                        source.location,
                        format!("仓库中不存在目录: {}", target)
                    ));
                }
                path
            }
            None => find_docs_directory(&repo_dir),
        };
        debug!("文档目录: {}", docs_root.display());

        Ok(FetchOutput {
            kind: SourceKind::Github,
            entries: collect_documents(&docs_root)?,
            root: docs_root,
        })
    }

    async fn crawl_website(&self, source: &SourceDescriptor, workspace: &Path) -> Result<FetchOutput> {
        let pages_dir = workspace.join("pages");
        let crawler = WebCrawler::with_url(&source.location)
            .output_to(&pages_dir)
            .max_pages(source.options.max_pages)
            .user_agent(&self.user_agent)
            .timeout(self.timeout.as_secs());

        let pages = crawler
            .crawl()
            .await
            .map_err(|e| pipeline_error!(acquisition, source.location, format!("{:#}", e)))?;

        let entries = pages
            .into_iter()
            .map(|page| SourceEntry {
                path: page.path,
                relative_path: page.file_name,
                url: Some(page.url),
                title: page.title,
                size: page.size,
            })
            .collect();

        Ok(FetchOutput {
            kind: SourceKind::Website,
            root: pages_dir,
            entries,
        })
    }

    fn read_local(&self, source: &SourceDescriptor) -> Result<FetchOutput> {
        let mut root = PathBuf::from(&source.location);
        if let Some(target) = &source.options.target_path {
            root = root.join(target);
        }
        if !root.is_dir() {
            return Err(pipeline_error!(
                acquisition,
                source.location,
                format!("目录不存在: {}", root.display())
            ));
        }

        Ok(FetchOutput {
            kind: SourceKind::Local,
            entries: collect_documents(&root)?,
            root,
        })
    }
}

#[async_trait]
impl SourceAcquirer for DefaultSourceAcquirer {
    async fn fetch(&self, source: &SourceDescriptor, workspace: &Path) -> Result<FetchOutput> {
        let output = match source.kind {
            SourceKind::Github => self.clone_repository(source, workspace).await?,
            SourceKind::Website => self.crawl_website(source, workspace).await?,
            SourceKind::Local => self.read_local(source)?,
        };

        info!(
            "✅ 获取完成 ({:?}): {} 个文档文件",
            output.kind,
            output.entries.len()
        );
        Ok(output)
    }
}

/// 在仓库中查找文档目录，找不到时使用仓库根目录
pub fn find_docs_directory(repo_dir: &Path) -> PathBuf {
    crawler_config::DOC_DIRECTORIES
        .iter()
        .map(|name| repo_dir.join(name))
        .find(|path| path.is_dir())
        .unwrap_or_else(|| repo_dir.to_path_buf())
}

/// 是否为文档文件（按扩展名判断，忽略大小写）
pub fn is_document_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            crawler_config::DOC_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// 递归收集目录中的文档文件，按相对路径排序，跳过隐藏目录
pub fn collect_documents(root: &Path) -> Result<Vec<SourceEntry>> {
    let mut entries = Vec::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));

    for entry in walker {
        let entry = entry.map_err(|e| pipeline_error!(file_op, root.display(), "walk", e))?;
        if !entry.file_type().is_file() || !is_document_file(entry.path()) {
            continue;
        }

        let relative_path = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);

        entries.push(SourceEntry {
            path: entry.path().to_path_buf(),
            relative_path,
            url: None,
            title: None,
            size,
        });
    }

    entries.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::FetchOptions;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_collect_documents_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "b.md", "# B");
        write(dir.path(), "a/intro.RST", "Intro");
        write(dir.path(), "a/image.png", "png");
        write(dir.path(), ".git/config.txt", "hidden");
        write(dir.path(), "notes.txt", "notes");

        let entries = collect_documents(dir.path()).unwrap();
        let paths: Vec<_> = entries.iter().map(|e| e.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["a/intro.RST", "b.md", "notes.txt"]);
        assert_eq!(entries[1].size, 3);
    }

    #[test]
    fn test_find_docs_directory() {
        let dir = TempDir::new().unwrap();
        assert_eq!(find_docs_directory(dir.path()), dir.path());

        fs::create_dir_all(dir.path().join("documentation")).unwrap();
        assert_eq!(find_docs_directory(dir.path()), dir.path().join("documentation"));

        fs::create_dir_all(dir.path().join("docs")).unwrap();
        assert_eq!(find_docs_directory(dir.path()), dir.path().join("docs"));
    }

    #[tokio::test]
    async fn test_fetch_local_directory() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "guide/start.md", "# Start");
        let workspace = TempDir::new().unwrap();

        let source = SourceDescriptor::new(&dir.path().display().to_string(), SourceKind::Local)
            .with_options(FetchOptions {
                target_path: Some("guide".to_string()),
                ..FetchOptions::default()
            });
        let output = DefaultSourceAcquirer::default()
            .fetch(&source, workspace.path())
            .await
            .unwrap();

        assert_eq!(output.kind, SourceKind::Local);
        assert_eq!(output.entries.len(), 1);
        assert_eq!(output.entries[0].relative_path, "start.md");
    }

    #[tokio::test]
    async fn test_fetch_missing_directory_is_acquisition_error() {
        let workspace = TempDir::new().unwrap();
        let source = SourceDescriptor::new("/definitely/not/here", SourceKind::Local);

        let err = DefaultSourceAcquirer::default()
            .fetch(&source, workspace.path())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "acquisition");
    }

    #[tokio::test]
    async fn test_fetch_repository_rejects_option_like_location() {
        let workspace = TempDir::new().unwrap();
        let marker = workspace.path().join("marker");
        let location = format!("--upload-pack=touch {}", marker.display());
        let source = SourceDescriptor::new(&location, SourceKind::Github);

        let err = DefaultSourceAcquirer::default()
            .fetch(&source, workspace.path())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "acquisition");
        assert!(!marker.exists());
        assert!(!workspace.path().join("repo").exists());
    }

    #[tokio::test]
    async fn test_fetch_empty_directory_is_valid() {
        let dir = TempDir::new().unwrap();
        let workspace = TempDir::new().unwrap();
        let source = SourceDescriptor::new(&dir.path().display().to_string(), SourceKind::Local);

        let output = DefaultSourceAcquirer::default()
            .fetch(&source, workspace.path())
            .await
            .unwrap();
        assert!(output.entries.is_empty());
    }
}
