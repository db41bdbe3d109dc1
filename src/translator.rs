//! 翻译后端
//!
//! 后端接收一批字符串，返回等长、同顺序的译文；后端不可用时返回
//! `BackendError::Unavailable`，由合并器切换到降级模式。

// 标准库导入
use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;

// 第三方crate导入
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

// 本地模块导入
use crate::error::Result;

/// 批次结果状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Success,
    /// 后端自身给出的降级/模拟输出
    Fallback,
}

/// 一个批次的翻译结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReply {
    pub status: BatchStatus,
    pub translations: Vec<String>,
}

impl BatchReply {
    pub fn success(translations: Vec<String>) -> Self {
        Self {
            status: BatchStatus::Success,
            translations,
        }
    }
}

/// 翻译后端错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// 后端暂不可用（连接失败、超时、未配置），可以降级
    Unavailable(String),
    /// 后端返回了错误或无法解析的结果
    Failed(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Unavailable(msg) => write!(f, "翻译后端不可用: {}", msg),
            BackendError::Failed(msg) => write!(f, "翻译后端错误: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

/// 翻译后端接口
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// 后端名称，用于日志
    fn name(&self) -> &str;

    /// 翻译一批文本，必须保持长度和顺序
    async fn translate_batch(
        &self,
        texts: &[String],
        source_lang: &str,
        target_lang: &str,
    ) -> std::result::Result<BatchReply, BackendError>;
}

/// 模拟后端：总是报告不可用，使合并器输出带语言标记的降级译文
#[derive(Debug, Default, Clone)]
pub struct MockTranslationBackend;

#[async_trait]
impl TranslationBackend for MockTranslationBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn translate_batch(
        &self,
        _texts: &[String],
        _source_lang: &str,
        _target_lang: &str,
    ) -> std::result::Result<BatchReply, BackendError> {
        Err(BackendError::Unavailable("使用模拟翻译".to_string()))
    }
}

/// DeepLX风格的HTTP翻译后端
///
/// 一个批次写成多行索引标记文本 `[i] text` 一次发送，
/// 再按索引把返回的译文解析回原来的位置。
pub struct HttpTranslationBackend {
    client: Client,
    api_url: String,
}

impl HttpTranslationBackend {
    /// 创建HTTP后端
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("创建HTTP客户端失败: {}", e))?;

        Ok(Self {
            client,
            api_url: api_url.to_string(),
        })
    }
}

/// `[i] 译文` 格式的行
static INDEXED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[(\d+)\]\s*(.*)$").expect("valid indexed line regex"));

/// 生成索引标记文本，文本中的换行替换为空格
pub fn build_indexed_text(texts: &[String]) -> String {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| format!("[{}] {}", i, text.split_whitespace().collect::<Vec<_>>().join(" ")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// 解析索引标记的译文，缺少任何索引都视为失败
pub fn parse_indexed_text(
    translated_text: &str,
    expected: usize,
) -> std::result::Result<Vec<String>, BackendError> {
    let mut translations: Vec<Option<String>> = vec![None; expected];

    for line in translated_text.lines() {
        if let Some(captures) = INDEXED_LINE.captures(line.trim()) {
            if let (Some(index_str), Some(text)) = (captures.get(1), captures.get(2)) {
                if let Ok(index) = index_str.as_str().parse::<usize>() {
                    let translated = text.as_str().trim();
                    if index < expected && !translated.is_empty() {
                        translations[index] = Some(translated.to_string());
                    }
                }
            }
        }
    }

    let missing: Vec<usize> = translations
        .iter()
        .enumerate()
        .filter(|(_, t)| t.is_none())
        .map(|(i, _)| i)
        .collect();
    if !missing.is_empty() {
        return Err(BackendError::Failed(format!(
            "译文缺少 {} 个索引: {:?}",
            missing.len(),
            missing
        )));
    }

    Ok(translations.into_iter().flatten().collect())
}

/// 从响应体中取出译文文本，兼容 `data`/`text`/`result` 字段或纯文本响应
fn extract_reply_text(response_text: String) -> String {
    match serde_json::from_str::<serde_json::Value>(&response_text) {
        Ok(json_val) => json_val
            .get("data")
            .or_else(|| json_val.get("text"))
            .or_else(|| json_val.get("result"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or(response_text),
        Err(_) => response_text,
    }
}

#[async_trait]
impl TranslationBackend for HttpTranslationBackend {
    fn name(&self) -> &str {
        "http"
    }

    async fn translate_batch(
        &self,
        texts: &[String],
        source_lang: &str,
        target_lang: &str,
    ) -> std::result::Result<BatchReply, BackendError> {
        if texts.is_empty() {
            return Ok(BatchReply::success(Vec::new()));
        }

        let indexed_text = build_indexed_text(texts);
        debug!("发送翻译请求: {} 个文本项 -> {}", texts.len(), self.api_url);

        let response = self
            .client
            .post(&self.api_url)
            .json(&json!({
                "text": indexed_text,
                "source_lang": source_lang,
                "target_lang": target_lang
            }))
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    warn!("翻译后端连接失败: {}", e);
                    BackendError::Unavailable(e.to_string())
                } else {
                    BackendError::Failed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Failed(format!("翻译API返回错误状态: {}", status)));
        }

        let response_text = response
            .text()
            .await
            .map_err(|e| BackendError::Failed(format!("读取响应失败: {}", e)))?;

        let translations = parse_indexed_text(&extract_reply_text(response_text), texts.len())?;
        Ok(BatchReply::success(translations))
    }
}
