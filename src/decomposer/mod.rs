//! 文档拆分模块
//!
//! 每种文档格式对应一个纯函数，把原始内容拆分为有序的文本块和代码块：
//!
//! - markdown：front-matter + 围栏代码块/行内代码
//! - restructuredtext：`code-block::` 指令和 `::` 字面量块
//! - html：块级元素文本，丢弃 script/style/code/pre
//! - text：仅按空行拆分

pub mod html;
pub mod markdown;
pub mod rst;
pub mod text;

// 标准库导入
use std::path::Path;

// 第三方crate导入
use serde::Serialize;
use tracing::{debug, info, warn};

// 本地模块导入
use crate::document::{Block, Document, FileType};
use crate::error::{PipelineError, Result};
use crate::pipeline_error;
use crate::project::{FileFailure, SourceEntry};

/// 拆分一个文档
pub fn decompose(file_path: &str, raw_content: &str, file_type: FileType) -> Result<Document> {
    let mut document = Document::new(file_path, file_type, Vec::new());

    match file_type {
        FileType::Markdown => {
            let (metadata, blocks) = markdown::decompose(file_path, raw_content)?;
            document.metadata = metadata;
            document.blocks = blocks;
        }
        FileType::RestructuredText => document.blocks = rst::decompose(raw_content),
        FileType::Html => {
            document.blocks = html::decompose(raw_content)
                .map_err(|e| pipeline_error!(parse, file_path, e))?;
        }
        FileType::Text => document.blocks = text::decompose(raw_content),
    }

    debug!(
        "拆分 {} ({}): {} 个块",
        file_path,
        file_type,
        document.blocks.len()
    );
    Ok(document)
}

/// 从原始字节拆分文档，非UTF-8内容返回解析错误
pub fn decompose_bytes(file_path: &str, raw: &[u8], file_type: FileType) -> Result<Document> {
    let content = std::str::from_utf8(raw)
        .map_err(|e| pipeline_error!(parse, file_path, format!("无法以UTF-8解码: {}", e)))?;
    decompose(file_path, content, file_type)
}

/// 读取并拆分一个文件，格式由扩展名决定
pub fn parse_file(path: &Path) -> Result<Document> {
    parse_file_as(path, &path.display().to_string())
}

/// 读取并拆分一个文件，文档以 `identity`（通常是相对路径）作为 `file_path`
pub fn parse_file_as(path: &Path, identity: &str) -> Result<Document> {
    let raw = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            pipeline_error!(parse, identity, "文件不存在")
        } else {
            pipeline_error!(parse, identity, e)
        }
    })?;

    decompose_bytes(identity, &raw, FileType::from_path(path))
}

/// 批量解析结果，失败的文件与成功的文档一起记录
#[derive(Debug, Default, Serialize)]
pub struct ParseReport {
    pub documents: Vec<Document>,
    pub failures: Vec<FileFailure>,
}

impl ParseReport {
    pub fn total_blocks(&self) -> usize {
        self.documents.iter().map(|d| d.blocks.len()).sum()
    }
}

/// 批量解析抓取到的文件，单个文件失败不影响其他文件
pub fn parse_batch(entries: &[SourceEntry]) -> ParseReport {
    let mut report = ParseReport::default();

    for entry in entries {
        match parse_file_as(&entry.path, &entry.relative_path) {
            Ok(document) => report.documents.push(document),
            Err(e) => {
                warn!("⚠️  {}", e);
                report.failures.push(FileFailure {
                    path: entry.relative_path.clone(),
                    message: failure_message(e),
                });
            }
        }
    }

    info!(
        "📝 解析完成: {} 个文档, {} 个块, {} 个失败",
        report.documents.len(),
        report.total_blocks(),
        report.failures.len()
    );
    report
}

fn failure_message(error: PipelineError) -> String {
    match error {
        PipelineError::Parse { details, .. } => details,
        other => other.to_string(),
    }
}

/// 按块顺序重新拼接文档
///
/// 有译文的块使用译文，块之间用空行分隔（与拆分时的空行规则一致）。
pub fn reassemble(document: &Document) -> String {
    document
        .blocks
        .iter()
        .map(Block::display_content)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// 按顺序返回文档中所有代码块的内容
pub fn code_fragments(document: &Document) -> Vec<&str> {
    document.code_blocks().map(|b| b.content.as_str())
        .collect()
}
