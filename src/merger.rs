//! 翻译合并模块
//!
//! 收集文档中所有文本块（记录其原始位置），按固定大小分批交给翻译后端，
//! 再把译文按原始位置写回。批次划分只影响性能，不影响输出。

// 标准库导入
use std::sync::Arc;

// 第三方crate导入
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

// 本地模块导入
use crate::constants::service_config;
use crate::document::{Document, DocumentOutcome, TranslationInfo, TranslationState};
use crate::error::Result;
use crate::pipeline_error;
use crate::project::FileFailure;
use crate::translator::{BackendError, BatchStatus, TranslationBackend};

/// 没有可翻译内容时的说明
pub const NOTHING_TO_TRANSLATE: &str = "没有可翻译的内容";

/// 降级模式下给原文加上目标语言标记
pub fn fallback_tag(text: &str, target_lang: &str) -> String {
    format!("[{}] {}", target_lang.to_uppercase(), text)
}

/// 批量翻译多个文档的结果
#[derive(Debug, Default)]
pub struct MergeReport {
    /// 所有文档（包括失败的），顺序与输入一致
    pub documents: Vec<Document>,
    pub failures: Vec<FileFailure>,
}

impl MergeReport {
    pub fn fallback_count(&self) -> usize {
        self.documents
            .iter()
            .filter(|d| {
                matches!(
                    d.translation.as_ref().map(|t| &t.outcome),
                    Some(DocumentOutcome::Fallback)
                )
            })
            .count()
    }
}

/// 翻译合并器
#[derive(Clone)]
pub struct TranslationMerger {
    backend: Arc<dyn TranslationBackend>,
    batch_size: usize,
    concurrent_batches: usize,
}

impl TranslationMerger {
    /// 使用默认批处理大小创建
    pub fn new(backend: Arc<dyn TranslationBackend>) -> Self {
        Self {
            backend,
            batch_size: service_config::DEFAULT_BATCH_SIZE,
            concurrent_batches: service_config::DEFAULT_CONCURRENT_BATCHES,
        }
    }

    /// 设置批处理大小
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// 设置同时在途的批次数量，1 表示逐批顺序处理
    pub fn with_concurrency(mut self, batches: usize) -> Self {
        self.concurrent_batches = batches.max(1);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// 翻译一个文档并就地写回译文
    ///
    /// 后端不可用的批次使用降级标记；后端出错时整个文档失败，
    /// 所有文本块都不带译文，并返回 `Translation` 错误。
    pub async fn translate_in_place(
        &self,
        document: &mut Document,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<DocumentOutcome> {
        for block in document.blocks.iter_mut() {
            block.translation = None;
        }

        let indexed: Vec<(usize, String)> = document
            .blocks
            .iter()
            .enumerate()
            .filter(|(_, block)| block.is_text())
            .map(|(i, block)| (i, block.content.clone()))
            .collect();

        if indexed.is_empty() {
            let outcome = DocumentOutcome::Empty {
                note: NOTHING_TO_TRANSLATE.to_string(),
            };
            record(document, source_lang, target_lang, outcome.clone());
            return Ok(outcome);
        }

        let batches: Vec<Vec<(usize, String)>> = indexed
            .chunks(self.batch_size)
            .map(|chunk| chunk.to_vec())
            .collect();
        let total_batches = batches.len();
        debug!(
            "翻译 {}: {} 个文本块分成 {} 个批次",
            document.file_path,
            indexed.len(),
            total_batches
        );

        let backend = self.backend.clone();
        let mut replies = stream::iter(batches.into_iter().enumerate())
            .map(|(batch_idx, batch)| {
                let backend = backend.clone();
                async move {
                    let texts: Vec<String> = batch.iter().map(|(_, text)| text.clone()).collect();
                    let result = backend.translate_batch(&texts, source_lang, target_lang).await;
                    (batch_idx, batch, result)
                }
            })
            .buffered(self.concurrent_batches);

        let mut used_fallback = false;
        while let Some((batch_idx, batch, result)) = replies.next().await {
            let states: Vec<TranslationState> = match result {
                Ok(reply) if reply.translations.len() == batch.len() => {
                    let fallback = reply.status == BatchStatus::Fallback;
                    used_fallback |= fallback;
                    reply
                        .translations
                        .into_iter()
                        .map(|text| {
                            if fallback {
                                TranslationState::Fallback(text)
                            } else {
                                TranslationState::Translated(text)
                            }
                        })
                        .collect()
                }
                Ok(reply) => {
                    let message = format!(
                        "批次 {} 返回 {} 条译文，期望 {} 条",
                        batch_idx + 1,
                        reply.translations.len(),
                        batch.len()
                    );
                    return Err(self.fail(document, source_lang, target_lang, message));
                }
                Err(BackendError::Unavailable(reason)) => {
                    if !used_fallback {
                        warn!("⚠️  翻译后端 {} 不可用，使用降级模式: {}", self.backend.name(), reason);
                    }
                    used_fallback = true;
                    batch
                        .iter()
                        .map(|(_, text)| TranslationState::Fallback(fallback_tag(text, target_lang)))
                        .collect()
                }
                Err(error @ BackendError::Failed(_)) => {
                    return Err(self.fail(document, source_lang, target_lang, error.to_string()));
                }
            };

            for ((block_index, _), state) in batch.iter().zip(states) {
                document.blocks[*block_index].translation = Some(state);
            }
            debug!("批次 {}/{} 已合并", batch_idx + 1, total_batches);
        }

        let outcome = if used_fallback {
            DocumentOutcome::Fallback
        } else {
            DocumentOutcome::Translated
        };
        record(document, source_lang, target_lang, outcome.clone());
        Ok(outcome)
    }

    /// 翻译一个文档，返回译文副本
    pub async fn translate(
        &self,
        document: &Document,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<Document> {
        let mut translated = document.clone();
        self.translate_in_place(&mut translated, source_lang, target_lang)
            .await?;
        Ok(translated)
    }

    /// 批量翻译，单个文档失败不影响其他文档
    pub async fn translate_all(
        &self,
        documents: &[Document],
        source_lang: &str,
        target_lang: &str,
    ) -> MergeReport {
        let mut report = MergeReport::default();

        for document in documents {
            let mut translated = document.clone();
            if let Err(e) = self
                .translate_in_place(&mut translated, source_lang, target_lang)
                .await
            {
                warn!("❌ {}", e);
                report.failures.push(FileFailure {
                    path: document.file_path.clone(),
                    message: e.to_string(),
                });
            }
            report.documents.push(translated);
        }

        info!(
            "🌐 翻译完成: {} 个文档, {} 个失败, {} 个降级",
            report.documents.len(),
            report.failures.len(),
            report.fallback_count()
        );
        report
    }

    fn fail(
        &self,
        document: &mut Document,
        source_lang: &str,
        target_lang: &str,
        message: String,
    ) -> crate::error::PipelineError {
        for block in document.blocks.iter_mut().filter(|b| b.is_text()) {
            block.translation = Some(TranslationState::Failed(message.clone()));
        }
        record(
            document,
            source_lang,
            target_lang,
            DocumentOutcome::Failed {
                message: message.clone(),
            },
        );
        pipeline_error!(translation, document.file_path, message)
    }
}

fn record(document: &mut Document, source_lang: &str, target_lang: &str, outcome: DocumentOutcome) {
    document.translation = Some(TranslationInfo {
        source_lang: source_lang.to_string(),
        target_lang: target_lang.to_string(),
        outcome,
    });
}
