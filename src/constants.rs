/// 流水线常量配置
///
/// 该文件定义了翻译服务、抓取、进度和站点输出相关的常量，方便统一管理和维护

/// 默认翻译API配置
pub mod api_config {
    /// 默认翻译API地址（本地DeepLX服务）
    pub const DEFAULT_API_URL: &str = "http://localhost:1188/translate";

    /// 请求超时时间（秒）
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;
}

/// 翻译服务配置
pub mod service_config {
    /// 默认源语言
    pub const DEFAULT_SOURCE_LANG: &str = "en";

    /// 默认目标语言
    pub const DEFAULT_TARGET_LANG: &str = "es";

    /// 支持的语言代码及显示名称
    pub const SUPPORTED_LANGUAGES: &[(&str, &str)] = &[
        ("en", "English"),
        ("es", "Spanish"),
        ("fr", "French"),
        ("de", "German"),
        ("it", "Italian"),
        ("pt", "Portuguese"),
        ("ru", "Russian"),
        ("zh", "Chinese"),
        ("ja", "Japanese"),
        ("ko", "Korean"),
        ("ar", "Arabic"),
        ("hi", "Hindi"),
    ];

    /// 默认批处理大小
    pub const DEFAULT_BATCH_SIZE: usize = 8;

    /// 默认并发批次数量（1 表示逐批顺序处理）
    pub const DEFAULT_CONCURRENT_BATCHES: usize = 1;
}

/// 文档源抓取配置
pub mod crawler_config {
    /// 默认最大爬取页面数
    pub const DEFAULT_MAX_PAGES: usize = 50;

    /// 默认爬取超时时间（秒）
    pub const DEFAULT_CRAWL_TIMEOUT: u64 = 30;

    /// 默认User-Agent
    pub const DEFAULT_USER_AGENT: &str = "docs-translator/0.1.0 (Monolith Web Crawler)";

    /// 每个项目最多解析的文件数
    pub const DEFAULT_MAX_PARSE_FILES: usize = 50;

    /// 仓库中优先查找的文档目录
    pub const DOC_DIRECTORIES: &[&str] = &["docs", "documentation", "doc"];

    /// 视为文档的文件扩展名
    pub const DOC_EXTENSIONS: &[&str] = &["md", "markdown", "rst", "html", "htm", "txt"];
}

/// 进度里程碑（百分比）
pub mod progress {
    /// 抓取完成
    pub const FETCHED: u8 = 33;

    /// 解析完成
    pub const PARSED: u8 = 50;

    /// 翻译阶段占用的进度跨度
    pub const TRANSLATE_SPAN: u8 = 30;

    /// 翻译完成
    pub const TRANSLATED: u8 = 80;

    /// 构建完成
    pub const COMPLETED: u8 = 100;
}

/// 站点输出配置
pub mod site_config {
    /// 索引页文件名
    pub const INDEX_FILE: &str = "index.html";

    /// 静态资源目录
    pub const ASSETS_DIR: &str = "assets";

    /// 样式表文件名
    pub const STYLESHEET_FILE: &str = "style.css";

    /// 没有标题时使用的默认文档标题
    pub const DEFAULT_TITLE: &str = "Documentation";
}

/// 获取API URL，mock模式或空地址时返回None
pub fn get_api_url(mock: bool, custom_api: Option<&str>) -> Option<&str> {
    if mock {
        return None;
    }

    match custom_api {
        Some(custom) if !custom.trim().is_empty() => Some(custom),
        Some(_) => None,
        None => Some(api_config::DEFAULT_API_URL),
    }
}

/// 验证API URL是否有效
pub fn is_valid_api_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// 验证语言代码是否支持
pub fn is_supported_language(lang: &str) -> bool {
    language_name(lang).is_some()
}

/// 获取语言显示名称
pub fn language_name(lang: &str) -> Option<&'static str> {
    service_config::SUPPORTED_LANGUAGES
        .iter()
        .find(|(code, _)| *code == lang)
        .map(|(_, name)| *name)
}

/// 获取批处理大小，0 会被提升为 1
pub fn get_batch_size(custom_size: Option<usize>) -> usize {
    custom_size
        .unwrap_or(service_config::DEFAULT_BATCH_SIZE)
        .max(1)
}
