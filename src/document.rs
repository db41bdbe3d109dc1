//! 文档块模型
//!
//! 一个源文件被拆分为有序的文本块和代码块。代码块永远不会被送去翻译，
//! 块的数量和顺序在拆分之后固定不变。

// 标准库导入
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

// 第三方crate导入
use serde::{Deserialize, Serialize};

/// 块类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Text,
    Code,
}

/// 单个块的翻译状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "lowercase")]
pub enum TranslationState {
    /// 翻译后端返回的真实译文
    Translated(String),
    /// 后端不可用时的降级输出（带目标语言标记）
    Fallback(String),
    /// 翻译失败，附带原因
    Failed(String),
}

/// 文档中的一个有序片段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub kind: BlockKind,
    /// 源文中的原始内容
    pub content: String,
    /// 代码块在原始内容中的字节偏移；文本块由段落拼接而来，没有偏移
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    /// HTML块来源的元素名
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation: Option<TranslationState>,
}

impl Block {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            kind: BlockKind::Text,
            content: content.into(),
            position: None,
            tag: None,
            translation: None,
        }
    }

    pub fn tagged_text(content: impl Into<String>, tag: &str) -> Self {
        Self {
            tag: Some(tag.to_string()),
            ..Self::text(content)
        }
    }

    pub fn code(content: impl Into<String>, position: usize) -> Self {
        Self {
            kind: BlockKind::Code,
            content: content.into(),
            position: Some(position),
            tag: None,
            translation: None,
        }
    }

    pub fn is_text(&self) -> bool {
        self.kind == BlockKind::Text
    }

    /// 翻译后的内容；代码块和翻译失败的块返回None
    pub fn translated_content(&self) -> Option<&str> {
        match &self.translation {
            Some(TranslationState::Translated(text)) | Some(TranslationState::Fallback(text)) => {
                Some(text)
            }
            _ => None,
        }
    }

    /// 渲染时使用的内容：有译文用译文，否则用原文
    pub fn display_content(&self) -> &str {
        self.translated_content().unwrap_or(&self.content)
    }
}

/// 文档格式，由文件扩展名决定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Markdown,
    Html,
    #[serde(rename = "restructuredtext")]
    RestructuredText,
    Text,
}

impl FileType {
    /// 根据扩展名选择文档格式，未知扩展名按纯文本处理
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "md" | "markdown" => FileType::Markdown,
            "html" | "htm" => FileType::Html,
            "rst" => FileType::RestructuredText,
            _ => FileType::Text,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Markdown => "markdown",
            FileType::Html => "html",
            FileType::RestructuredText => "restructuredtext",
            FileType::Text => "text",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 文档级别的翻译结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DocumentOutcome {
    /// 所有文本块都得到了真实译文
    Translated,
    /// 至少一个批次使用了降级输出
    Fallback,
    /// 没有可翻译的内容，文档原样返回
    Empty { note: String },
    /// 翻译失败，文档中没有任何译文
    Failed { message: String },
}

/// 翻译元数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationInfo {
    pub source_lang: String,
    pub target_lang: String,
    pub outcome: DocumentOutcome,
}

/// 一个源文件的解析结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// 项目内唯一的文件路径
    pub file_path: String,
    pub file_type: FileType,
    /// front-matter元数据（仅markdown）
    pub metadata: BTreeMap<String, serde_yaml::Value>,
    pub blocks: Vec<Block>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation: Option<TranslationInfo>,
}

impl Document {
    pub fn new(file_path: impl Into<String>, file_type: FileType, blocks: Vec<Block>) -> Self {
        Self {
            file_path: file_path.into(),
            file_type,
            metadata: BTreeMap::new(),
            blocks,
            translation: None,
        }
    }

    pub fn text_block_count(&self) -> usize {
        self.blocks.iter().filter(|b| b.is_text()).count()
    }

    pub fn code_blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter().filter(|b| !b.is_text())
    }

    /// 文档是否带有可供站点输出的翻译结果
    pub fn has_translated_content(&self) -> bool {
        matches!(
            &self.translation,
            Some(info) if !matches!(info.outcome, DocumentOutcome::Failed { .. })
        )
    }

    /// 文档标题：front-matter中的title，否则由文件名推导
    pub fn title(&self) -> String {
        if let Some(title) = self.metadata.get("title").and_then(|v| v.as_str()) {
            return title.to_string();
        }

        Path::new(&self.file_path)
            .file_stem()
            .map(|stem| crate::utils::humanize_stem(&stem.to_string_lossy()))
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| crate::constants::site_config::DEFAULT_TITLE.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_from_extension() {
        assert_eq!(FileType::from_path(Path::new("a/readme.md")), FileType::Markdown);
        assert_eq!(FileType::from_path(Path::new("guide.MARKDOWN")), FileType::Markdown);
        assert_eq!(FileType::from_path(Path::new("page.htm")), FileType::Html);
        assert_eq!(FileType::from_path(Path::new("index.rst")), FileType::RestructuredText);
        assert_eq!(FileType::from_path(Path::new("notes.txt")), FileType::Text);
        assert_eq!(FileType::from_path(Path::new("LICENSE")), FileType::Text);
    }

    #[test]
    fn test_translated_content_by_state() {
        let mut block = Block::text("Hello");
        assert_eq!(block.translated_content(), None);
        assert_eq!(block.display_content(), "Hello");

        block.translation = Some(TranslationState::Fallback("[ES] Hello".to_string()));
        assert_eq!(block.translated_content(), Some("[ES] Hello"));

        block.translation = Some(TranslationState::Failed("timeout".to_string()));
        assert_eq!(block.translated_content(), None);
        assert_eq!(block.display_content(), "Hello");
    }

    #[test]
    fn test_document_title() {
        let mut doc = Document::new("docs/getting_started.md", FileType::Markdown, vec![]);
        assert_eq!(doc.title(), "Getting Started");

        doc.metadata.insert(
            "title".to_string(),
            serde_yaml::Value::String("Quick Start".to_string()),
        );
        assert_eq!(doc.title(), "Quick Start");
    }

    #[test]
    fn test_block_serialization_omits_empty_fields() {
        let json = serde_json::to_value(Block::code("`x`", 4)).unwrap();
        assert_eq!(json["kind"], "code");
        assert_eq!(json["position"], 4);
        assert!(json.get("translation").is_none());
        assert!(json.get("tag").is_none());
    }
}
