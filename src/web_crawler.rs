//! Web爬取模块 - 集成Monolith抓取文档网站
//!
//! 此模块负责：
//! - 使用Monolith库抓取单个页面（不内嵌CSS、JS和图片）
//! - 从已抓取页面中发现链接，在基础URL范围内广度优先爬取
//! - 把每个页面保存为独立的 `.html` 文件并记录标题

// 标准库导入
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

// 第三方crate导入
use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use url::Url;

// 本地模块导入
use crate::constants::crawler_config;
use crate::html_processor::{document_title, extract_links, parse_html};

/// Web爬虫配置结构体
#[derive(Debug, Clone)]
pub struct WebCrawlerConfig {
    /// 基础URL，只爬取此URL之下的页面
    pub base_url: String,
    /// 页面保存目录
    pub output_dir: PathBuf,
    /// 最多爬取的页面数
    pub max_pages: usize,
    /// 用户代理字符串
    pub user_agent: String,
    /// 连接超时时间（秒）
    pub timeout: u64,
    /// 单个页面的最大尝试次数
    pub max_attempts: u32,
}

impl Default for WebCrawlerConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            output_dir: PathBuf::new(),
            max_pages: crawler_config::DEFAULT_MAX_PAGES,
            user_agent: crawler_config::DEFAULT_USER_AGENT.to_string(),
            timeout: crawler_config::DEFAULT_CRAWL_TIMEOUT,
            max_attempts: 3,
        }
    }
}

/// 已保存的页面
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawledPage {
    pub url: String,
    pub title: Option<String>,
    pub path: PathBuf,
    /// 相对于输出目录的文件名
    pub file_name: String,
    pub size: u64,
}

/// Web爬虫主要结构体
///
/// 每个页面通过Monolith获取，Monolith是阻塞API，
/// 在 `tokio::task::spawn_blocking` 中执行。
pub struct WebCrawler {
    config: WebCrawlerConfig,
}

impl WebCrawler {
    /// 创建新的Web爬虫实例
    pub fn new(config: WebCrawlerConfig) -> Self {
        Self { config }
    }

    /// 使用默认配置创建Web爬虫
    pub fn with_url(url: &str) -> Self {
        Self::new(WebCrawlerConfig {
            base_url: url.to_string(),
            ..WebCrawlerConfig::default()
        })
    }

    /// 设置页面保存目录
    pub fn output_to<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.config.output_dir = dir.as_ref().to_path_buf();
        self
    }

    /// 设置最大页面数
    pub fn max_pages(mut self, max_pages: usize) -> Self {
        self.config.max_pages = max_pages;
        self
    }

    /// 设置用户代理
    pub fn user_agent(mut self, user_agent: &str) -> Self {
        self.config.user_agent = user_agent.to_string();
        self
    }

    /// 设置连接超时
    pub fn timeout(mut self, seconds: u64) -> Self {
        self.config.timeout = seconds;
        self
    }

    /// 设置单个页面的最大尝试次数
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts.max(1);
        self
    }

    /// 使用Monolith获取单个页面
    async fn fetch_page(&self, url: &Url) -> Result<(String, Option<String>)> {
        let config = &self.config;

        let mut options = monolith::core::Options {
            no_css: true,
            no_js: true,
            no_images: true,
            user_agent: Some(config.user_agent.clone()),
            timeout: config.timeout,
            ignore_errors: false,
            silent: true,
            ..Default::default()
        };

        let target_url = url.to_string();
        let result = tokio::task::spawn_blocking(move || {
            use monolith::cache::Cache;
            use monolith::core::create_monolithic_document;

            let mut cache: Option<Cache> = Some(Cache::new(0, None));
            create_monolithic_document(target_url, &mut options, &mut cache)
        })
        .await
        .with_context(|| "Monolith任务执行失败")?;

        match result {
            Ok((html_bytes, title)) => {
                let html_content =
                    String::from_utf8(html_bytes).with_context(|| "转换HTML字节为字符串失败")?;
                Ok((html_content, title))
            }
            Err(e) => anyhow::bail!("Monolith爬取失败: {}", e),
        }
    }

    /// 带重试机制的页面获取
    async fn fetch_page_with_retry(&self, url: &Url) -> Result<(String, Option<String>)> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut last_error: Option<anyhow::Error> = None;

        for attempt in 1..=max_attempts {
            match self.fetch_page(url).await {
                Ok(page) => return Ok(page),
                Err(e) => {
                    warn!("❌ 爬取失败 {} (尝试 {}/{}): {}", url, attempt, max_attempts, e);
                    last_error = Some(e);

                    if attempt < max_attempts {
                        let delay = std::time::Duration::from_secs(attempt as u64 * 2);
                        debug!("⏳ 等待 {:?} 后重试...", delay);
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("所有重试尝试均失败")))
    }

    /// 广度优先爬取网站
    ///
    /// 起始页面失败时返回错误；之后的页面失败只记录警告并跳过。
    pub async fn crawl(&self) -> Result<Vec<CrawledPage>> {
        let base = self.validate_url()?;
        info!("🕷️ 开始爬取网站: {} (最多 {} 页)", base, self.config.max_pages);

        std::fs::create_dir_all(&self.config.output_dir).with_context(|| {
            format!("创建输出目录失败: {}", self.config.output_dir.display())
        })?;

        let mut queue = VecDeque::from([base.clone()]);
        let mut seen: HashSet<String> = HashSet::from([base.to_string()]);
        let mut used_names = HashSet::new();
        let mut pages = Vec::new();

        while let Some(url) = queue.pop_front() {
            if pages.len() >= self.config.max_pages {
                break;
            }

            let (html_content, monolith_title) = match self.fetch_page_with_retry(&url).await {
                Ok(page) => page,
                Err(e) if pages.is_empty() && url == base => {
                    return Err(e.context(format!("爬取网页失败: {}", url)));
                }
                Err(_) => continue,
            };

            let dom = parse_html(&html_content)?;
            let title = monolith_title
                .filter(|t| !t.trim().is_empty())
                .or_else(|| document_title(&dom));

            for link in discover_links(&extract_links(&dom), &url, &base) {
                if seen.insert(link.to_string()) {
                    queue.push_back(link);
                }
            }

            let file_name = page_file_name(&url, &base, &mut used_names);
            let path = self.config.output_dir.join(&file_name);
            std::fs::write(&path, &html_content)
                .with_context(|| format!("写入页面失败: {}", path.display()))?;
            debug!("📄 {} -> {}", url, file_name);

            pages.push(CrawledPage {
                url: url.to_string(),
                title,
                path,
                file_name,
                size: html_content.len() as u64,
            });
        }

        info!("✅ 网站爬取完成: {} 个页面", pages.len());
        Ok(pages)
    }

    /// 验证URL格式并返回解析后的基础URL
    fn validate_url(&self) -> Result<Url> {
        let url = self.config.base_url.trim();
        if url.is_empty() {
            anyhow::bail!("URL不能为空");
        }

        if !url.starts_with("http://") && !url.starts_with("https://") {
            anyhow::bail!("URL必须以http://或https://开头");
        }

        Url::parse(url).with_context(|| format!("解析URL失败: {}", url))
    }
}

/// URL是否位于基础URL之下（同源且路径前缀相同）
pub fn is_within_base(url: &Url, base: &Url) -> bool {
    if url.scheme() != base.scheme() || url.host_str() != base.host_str() || url.port() != base.port() {
        return false;
    }

    let base_path = base.path();
    let prefix = match base_path.rfind('/') {
        Some(idx) => &base_path[..=idx],
        None => "/",
    };
    url.path().starts_with(prefix)
}

/// 把页面中的链接解析为绝对URL，去掉片段和重复项，只保留基础URL之下的链接
pub fn discover_links(hrefs: &[String], page_url: &Url, base: &Url) -> Vec<Url> {
    let mut seen = HashSet::new();

    hrefs
        .iter()
        .filter(|href| !href.starts_with('#') && !href.starts_with("mailto:") && !href.starts_with("javascript:"))
        .filter_map(|href| page_url.join(href).ok())
        .map(|mut url| {
            url.set_fragment(None);
            url
        })
        .filter(|url| is_within_base(url, base))
        .filter(|url| seen.insert(url.to_string()))
        .collect()
}

/// 根据URL生成页面文件名，去掉基础路径和扩展名，必要时追加序号
pub fn page_file_name(url: &Url, base: &Url, taken: &mut HashSet<String>) -> String {
    let base_path = base.path().trim_end_matches('/');
    let path = url.path();
    let relative = path.strip_prefix(base_path).unwrap_or(path);

    let stem = relative
        .trim_matches('/')
        .trim_end_matches(".html")
        .trim_end_matches(".htm")
        .replace('/', "_")
        .replace(['<', '>', ':', '"', '|', '?', '*', '\\', '.'], "_");
    let stem = if stem.is_empty() {
        "index".to_string()
    } else {
        stem
    };

    let mut candidate = format!("{}.html", stem);
    let mut counter = 2;
    while !taken.insert(candidate.clone()) {
        candidate = format!("{}_{}.html", stem, counter);
        counter += 1;
    }
    candidate
}
