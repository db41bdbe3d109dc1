//! Docs Translator - 文档翻译流水线库
//!
//! 这个库提供了文档源获取、文档拆分、批量翻译合并、站点生成和项目编排等核心功能。

pub mod acquirer;
pub mod config;
pub mod constants;
pub mod decomposer;
pub mod document;
pub mod error;
pub mod html_processor;
pub mod merger;
pub mod pipeline;
pub mod project;
pub mod service;
pub mod site;
pub mod stats;
pub mod store;
pub mod translator;
pub mod utils;
pub mod web_crawler;

pub use document::{Block, BlockKind, Document, DocumentOutcome, FileType, TranslationState};
pub use error::{PipelineError, Result};
pub use pipeline::Pipeline;
pub use project::{Project, SourceDescriptor, SourceKind, Stage};
pub use service::DocsService;
