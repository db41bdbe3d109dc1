//! 项目模型
//!
//! 项目是流水线编排的单位：一个文档源经过 抓取 → 解析 → 翻译 → 构建
//! 各阶段，每个阶段的输出是下一阶段必需的输入。

// 标准库导入
use std::fmt;
use std::path::PathBuf;

// 第三方crate导入
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// 本地模块导入
use crate::document::Document;
use crate::utils::{normalize_source, source_slug};

/// 项目阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Fetching,
    Fetched,
    Parsing,
    Parsed,
    Translating,
    Translated,
    Building,
    Completed,
    Error,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Fetching => "fetching",
            Stage::Fetched => "fetched",
            Stage::Parsing => "parsing",
            Stage::Parsed => "parsed",
            Stage::Translating => "translating",
            Stage::Translated => "translated",
            Stage::Building => "building",
            Stage::Completed => "completed",
            Stage::Error => "error",
        }
    }

    /// 是否允许从当前阶段迁移到 `next`
    ///
    /// 正常流程只能前进一步，不能跳过阶段；已完成的阶段可以被重新执行
    /// （例如再次解析或翻译为另一种语言），`error` 可以从任何阶段到达。
    pub fn can_transition_to(&self, next: Stage) -> bool {
        use Stage::*;

        if next == Error {
            return true;
        }

        matches!(
            (*self, next),
            (Fetching, Fetched)
                | (Parsing, Parsed)
                | (Translating, Translated)
                | (Building, Completed)
                | (Fetched | Parsed | Translated | Completed | Error, Parsing)
                | (Parsed | Translated | Completed | Error, Translating)
                | (Translated | Completed | Error, Building)
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 文档源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// git仓库
    Github,
    /// 在线网站
    Website,
    /// 本地目录
    Local,
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "github" | "git" => Ok(SourceKind::Github),
            "website" | "web" => Ok(SourceKind::Website),
            "local" | "dir" => Ok(SourceKind::Local),
            other => Err(format!("未知的文档源类型: {}", other)),
        }
    }
}

/// 抓取选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchOptions {
    /// 网站最多爬取的页面数
    pub max_pages: usize,
    /// 仓库内的文档子目录
    pub target_path: Option<String>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_pages: crate::constants::crawler_config::DEFAULT_MAX_PAGES,
            target_path: None,
        }
    }
}

/// 文档源描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub location: String,
    pub kind: SourceKind,
    pub options: FetchOptions,
}

impl SourceDescriptor {
    pub fn new(location: &str, kind: SourceKind) -> Self {
        Self {
            location: location.to_string(),
            kind,
            options: FetchOptions::default(),
        }
    }

    pub fn with_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn normalized(&self) -> String {
        normalize_source(&self.location)
    }
}

/// 抓取到的一个文件或页面
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    /// 本地文件路径
    pub path: PathBuf,
    /// 相对于文档根目录的路径
    pub relative_path: String,
    /// 爬取页面的URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// 爬取页面的标题
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub size: u64,
}

/// 文档源获取结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchOutput {
    pub kind: SourceKind,
    /// 文档根目录
    pub root: PathBuf,
    pub entries: Vec<SourceEntry>,
}

/// 单个文件/文档的失败记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub path: String,
    pub message: String,
}

/// 生成的页面
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageEntry {
    /// 站点目录内的文件名
    pub file: String,
    pub title: String,
    /// 对应的源文件
    pub source_path: String,
}

/// 站点构建结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildResult {
    pub project_name: String,
    pub target_lang: String,
    pub site_dir: PathBuf,
    pub pages: Vec<PageEntry>,
    pub skipped: Vec<String>,
}

/// 打包结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageResult {
    pub archive_name: String,
    pub archive_path: PathBuf,
    pub size_bytes: u64,
    pub size_mb: f64,
}

/// 项目记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub source: SourceDescriptor,
    pub stage: Stage,
    pub progress: u8,
    pub message: String,
    pub source_data: Option<FetchOutput>,
    pub parsed_documents: Option<Vec<Document>>,
    pub parse_errors: Vec<FileFailure>,
    pub translated_documents: Option<Vec<Document>>,
    pub translation_errors: Vec<FileFailure>,
    pub source_lang: Option<String>,
    pub target_lang: Option<String>,
    pub build_result: Option<BuildResult>,
    pub package_result: Option<PackageResult>,
    /// 每次写入递增，用于比较并交换
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// 为一次新的抓取创建项目记录
    pub fn new(id: &str, source: SourceDescriptor) -> Self {
        Self {
            id: id.to_string(),
            source,
            stage: Stage::Fetching,
            progress: 0,
            message: "正在抓取文档...".to_string(),
            source_data: None,
            parsed_documents: None,
            parse_errors: Vec::new(),
            translated_documents: None,
            translation_errors: Vec::new(),
            source_lang: None,
            target_lang: None,
            build_result: None,
            package_result: None,
            version: 0,
            updated_at: Utc::now(),
        }
    }

    /// 迁移到下一阶段并更新消息
    pub fn advance(&mut self, stage: Stage, message: impl Into<String>) {
        debug_assert!(
            self.stage.can_transition_to(stage),
            "非法的阶段迁移: {} -> {}",
            self.stage,
            stage
        );
        self.stage = stage;
        self.message = message.into();
        self.updated_at = Utc::now();
    }

    /// 推进进度，进度只增不减
    pub fn checkpoint(&mut self, progress: u8) {
        self.progress = self.progress.max(progress.min(100));
        self.updated_at = Utc::now();
    }

    /// 阶段失败：置为 `error`，保留之前阶段的输出
    pub fn fail(&mut self, message: impl Into<String>) {
        self.advance(Stage::Error, message);
    }

    /// 丢弃翻译及之后阶段的输出，重新解析后旧译文不再对应当前文档
    pub fn reset_translation(&mut self) {
        self.translated_documents = None;
        self.translation_errors.clear();
        self.source_lang = None;
        self.target_lang = None;
        self.reset_build();
    }

    /// 丢弃站点和归档输出
    pub fn reset_build(&mut self) {
        self.build_result = None;
        self.package_result = None;
    }

    pub fn parsed_block_count(&self) -> usize {
        self.parsed_documents
            .as_ref()
            .map(|docs| docs.iter().map(|d| d.blocks.len()).sum())
            .unwrap_or(0)
    }
}

/// 由文档源推导项目标识
///
/// 标识为 `<slug>_<8位md5>`，同一规范化文档源总是得到同一标识。
/// `extended` 为真时使用完整的32位哈希，用于与其他文档源的短标识冲突时。
pub fn derive_project_id(source: &str, extended: bool) -> String {
    let normalized = normalize_source(source);
    let digest = format!("{:x}", md5::compute(normalized.as_bytes()));
    let hash = if extended { &digest[..] } else { &digest[..8] };

    let slug = source_slug(&normalized);
    if slug.is_empty() {
        format!("project_{}", hash)
    } else {
        format!("{}_{}", slug, hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_id_is_stable_across_equivalent_sources() {
        let a = derive_project_id("https://github.com/org/project", false);
        let b = derive_project_id("https://github.com/org/project.git/", false);
        assert_eq!(a, b);
        assert!(a.starts_with("project_"));
        assert_eq!(a.len(), "project_".len() + 8);
    }

    #[test]
    fn test_project_id_extended_hash() {
        let id = derive_project_id("https://github.com/org/project", true);
        assert_eq!(id.len(), "project_".len() + 32);
        assert!(id.starts_with(&derive_project_id("https://github.com/org/project", false)));
    }

    #[test]
    fn test_project_id_without_slug() {
        let id = derive_project_id("///", false);
        assert!(id.starts_with("project_"));
    }

    #[test]
    fn test_stage_transitions() {
        assert!(Stage::Fetching.can_transition_to(Stage::Fetched));
        assert!(Stage::Fetched.can_transition_to(Stage::Parsing));
        assert!(Stage::Translated.can_transition_to(Stage::Building));
        assert!(Stage::Completed.can_transition_to(Stage::Translating));
        assert!(Stage::Parsed.can_transition_to(Stage::Error));
        assert!(!Stage::Fetched.can_transition_to(Stage::Completed));
        assert!(!Stage::Parsing.can_transition_to(Stage::Translated));
        assert!(!Stage::Parsed.can_transition_to(Stage::Building));
        assert!(!Stage::Fetched.can_transition_to(Stage::Translating));
        assert!(!Stage::Translating.can_transition_to(Stage::Parsing));
        assert!(Stage::Error.can_transition_to(Stage::Building));
    }

    #[test]
    fn test_progress_never_decreases() {
        let mut project = Project::new("p", SourceDescriptor::new("/tmp/docs", SourceKind::Local));
        project.checkpoint(50);
        project.checkpoint(33);
        assert_eq!(project.progress, 50);
        project.checkpoint(250);
        assert_eq!(project.progress, 100);
    }

    #[test]
    fn test_stage_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Stage::Translating).unwrap(), "translating");
        assert_eq!(Stage::Completed.to_string(), "completed");
    }
}
