//! 配置管理模块
//!
//! 提供CLI参数解析和流水线配置管理功能

// 标准库导入
use std::path::{Path, PathBuf};
use std::time::Duration;

// 第三方crate导入
use clap::{Parser, Subcommand};

// 本地模块导入
use crate::constants::{api_config, crawler_config, get_api_url, get_batch_size, service_config};

/// 流水线配置结构体
///
/// 支持Builder模式进行链式配置。
///
/// # Examples
///
/// ```rust
/// use docs_translator::config::PipelineConfig;
///
/// let config = PipelineConfig::new()
///     .with_output_dir("build")
///     .with_batch_size(16)
///     .with_mock(true);
/// assert_eq!(config.batch_size(), 16);
/// assert!(config.api_url().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// 工作目录与站点输出目录
    output_dir: PathBuf,
    /// 归档输出目录
    downloads_dir: PathBuf,
    /// 翻译批处理大小
    batch_size: usize,
    /// 同时在途的翻译批次数量
    concurrent_batches: usize,
    /// 每个项目最多解析的文件数
    max_parse_files: usize,
    /// 网站最多爬取的页面数
    max_pages: usize,
    /// 翻译API服务地址
    api_url: String,
    /// 请求超时时间
    request_timeout: Duration,
    /// 爬虫User-Agent
    user_agent: String,
    /// 强制使用降级模式
    mock: bool,
}

impl PipelineConfig {
    /// 创建具有默认值的配置实例：
    /// - 输出目录: `output`，归档目录: `downloads`
    /// - 批处理大小: 8，并发批次: 1
    /// - 最多解析 50 个文件，最多爬取 50 个页面
    pub fn new() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            downloads_dir: PathBuf::from("downloads"),
            batch_size: service_config::DEFAULT_BATCH_SIZE,
            concurrent_batches: service_config::DEFAULT_CONCURRENT_BATCHES,
            max_parse_files: crawler_config::DEFAULT_MAX_PARSE_FILES,
            max_pages: crawler_config::DEFAULT_MAX_PAGES,
            api_url: api_config::DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(api_config::REQUEST_TIMEOUT_SECONDS),
            user_agent: crawler_config::DEFAULT_USER_AGENT.to_string(),
            mock: false,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn downloads_dir(&self) -> &Path {
        &self.downloads_dir
    }

    /// 生成的站点所在目录
    pub fn sites_dir(&self) -> PathBuf {
        self.output_dir.join("sites")
    }

    /// 抓取文档源使用的工作目录
    pub fn workspace_dir(&self, project_id: &str) -> PathBuf {
        self.output_dir.join("sources").join(project_id)
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn concurrent_batches(&self) -> usize {
        self.concurrent_batches
    }

    pub fn max_parse_files(&self) -> usize {
        self.max_parse_files
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    /// 获取API地址，mock模式下返回None
    pub fn api_url(&self) -> Option<&str> {
        get_api_url(self.mock, Some(&self.api_url))
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn is_mock(&self) -> bool {
        self.mock
    }

    pub fn with_output_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.output_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_downloads_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.downloads_dir = dir.as_ref().to_path_buf();
        self
    }

    /// 设置批处理大小（最小为1）
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = get_batch_size(Some(size));
        self
    }

    pub fn with_concurrent_batches(mut self, batches: usize) -> Self {
        self.concurrent_batches = batches.max(1);
        self
    }

    pub fn with_max_parse_files(mut self, max: usize) -> Self {
        self.max_parse_files = max;
        self
    }

    pub fn with_max_pages(mut self, max: usize) -> Self {
        self.max_pages = max;
        self
    }

    pub fn with_api_url(mut self, url: &str) -> Self {
        self.api_url = url.to_string();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    pub fn with_mock(mut self, mock: bool) -> Self {
        self.mock = mock;
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// CLI参数结构
#[derive(Parser)]
#[command(author, version, about = "文档翻译流水线 - 抓取文档源、翻译并生成静态站点", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// 详细输出模式
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 静默模式 (仅输出错误)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// 显示各阶段统计
    #[arg(long, global = true)]
    pub stats: bool,
}

/// 子命令
#[derive(Subcommand)]
pub enum Command {
    /// 完整运行：抓取 → 解析 → 翻译 → 构建
    Run(RunArgs),

    /// 拆分单个文件并以JSON输出所有块
    Inspect {
        /// 文档文件路径
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// 列出支持的语言
    Languages,
}

/// `run` 子命令参数
#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// 文档源：git仓库URL、网站URL或本地目录
    #[arg(value_name = "SOURCE")]
    pub source: String,

    /// 文档源类型 (github, website, local)，默认自动检测
    #[arg(short, long)]
    pub kind: Option<String>,

    /// 源语言代码
    #[arg(long, default_value = service_config::DEFAULT_SOURCE_LANG)]
    pub source_lang: String,

    /// 目标语言代码 (如: es, fr, zh)
    #[arg(short, long, default_value = service_config::DEFAULT_TARGET_LANG)]
    pub lang: String,

    /// 站点名称，默认由文档源推导
    #[arg(short, long)]
    pub name: Option<String>,

    /// 仓库或目录中的文档子目录
    #[arg(long)]
    pub target_path: Option<String>,

    /// 网站最多爬取的页面数
    #[arg(long, default_value_t = crawler_config::DEFAULT_MAX_PAGES)]
    pub max_pages: usize,

    /// 输出目录
    #[arg(short, long, default_value = "output")]
    pub output: PathBuf,

    /// 归档输出目录
    #[arg(long, default_value = "downloads")]
    pub downloads: PathBuf,

    /// 不生成ZIP归档
    #[arg(long)]
    pub no_package: bool,

    /// 翻译API地址
    #[arg(short, long, default_value = api_config::DEFAULT_API_URL)]
    pub api: String,

    /// 使用模拟翻译（降级模式）
    #[arg(long)]
    pub mock: bool,

    /// 批处理大小
    #[arg(long, default_value_t = service_config::DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// 并发批次数量 (默认1，逐批顺序处理)
    #[arg(long, default_value_t = service_config::DEFAULT_CONCURRENT_BATCHES)]
    pub concurrent_batches: usize,

    /// 最多解析的文件数
    #[arg(long, default_value_t = crawler_config::DEFAULT_MAX_PARSE_FILES)]
    pub max_files: usize,

    /// 请求超时时间（秒）
    #[arg(long, default_value_t = api_config::REQUEST_TIMEOUT_SECONDS)]
    pub timeout: u64,

    /// 自定义User-Agent
    #[arg(long)]
    pub user_agent: Option<String>,

    /// 以JSON信封输出每个阶段的结果（同时关闭日志输出）
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    /// 由命令行参数生成流水线配置
    pub fn pipeline_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::new()
            .with_output_dir(&self.output)
            .with_downloads_dir(&self.downloads)
            .with_batch_size(self.batch_size)
            .with_concurrent_batches(self.concurrent_batches)
            .with_max_parse_files(self.max_files)
            .with_max_pages(self.max_pages)
            .with_api_url(&self.api)
            .with_request_timeout(Duration::from_secs(self.timeout))
            .with_mock(self.mock);

        if let Some(user_agent) = &self.user_agent {
            config = config.with_user_agent(user_agent);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.output_dir(), Path::new("output"));
        assert_eq!(config.downloads_dir(), Path::new("downloads"));
        assert_eq!(config.batch_size(), 8);
        assert_eq!(config.concurrent_batches(), 1);
        assert_eq!(config.max_parse_files(), 50);
        assert_eq!(config.api_url(), Some(api_config::DEFAULT_API_URL));
        assert_eq!(config.sites_dir(), PathBuf::from("output").join("sites"));
    }

    #[test]
    fn test_builder_clamps_values() {
        let config = PipelineConfig::new()
            .with_batch_size(0)
            .with_concurrent_batches(0)
            .with_mock(true);
        assert_eq!(config.batch_size(), 1);
        assert_eq!(config.concurrent_batches(), 1);
        assert!(config.api_url().is_none());
    }

    #[test]
    fn test_cli_run_arguments() {
        let cli = Cli::parse_from([
            "docs-translator",
            "--verbose",
            "run",
            "./docs",
            "--lang",
            "fr",
            "--mock",
            "--batch-size",
            "4",
            "--no-package",
        ]);
        assert!(cli.verbose);

        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.source, "./docs");
                assert_eq!(args.lang, "fr");
                assert_eq!(args.source_lang, "en");
                assert!(args.no_package);
                assert!(!args.json);

                let config = args.pipeline_config();
                assert_eq!(config.batch_size(), 4);
                assert!(config.is_mock());
            }
            _ => panic!("expected run subcommand"),
        }
    }

    #[test]
    fn test_cli_run_json_flag() {
        let cli = Cli::parse_from(["docs-translator", "run", "https://example.com/docs", "--json"]);
        match cli.command {
            Command::Run(args) => {
                assert!(args.json);
                assert!(args.kind.is_none());
            }
            _ => panic!("expected run subcommand"),
        }
    }
}
