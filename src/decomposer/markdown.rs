//! Markdown拆分
//!
//! 先分离YAML front-matter，再对正文做一次从左到右的扫描，
//! 识别围栏代码块和单反引号行内代码，扫描不会进入代码片段内部。

// 标准库导入
use std::collections::BTreeMap;
use std::sync::LazyLock;

// 第三方crate导入
use regex::Regex;

// 本地模块导入
use super::text::interleave;
use crate::document::Block;
use crate::error::Result;
use crate::pipeline_error;

/// 围栏代码块或行内代码
static CODE_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[\s\S]*?```|`[^`]+`").expect("valid code span regex"));

/// front-matter 元数据
pub type Metadata = BTreeMap<String, serde_yaml::Value>;

/// 拆分markdown内容，返回元数据和有序块列表
pub fn decompose(path: &str, content: &str) -> Result<(Metadata, Vec<Block>)> {
    let (front_matter, body_offset) = split_front_matter(content);
    let metadata = match front_matter {
        Some(yaml) => parse_front_matter(path, yaml)?,
        None => Metadata::new(),
    };

    let body = &content[body_offset..];
    let spans: Vec<(usize, usize)> = CODE_SPAN
        .find_iter(body)
        .map(|m| (m.start(), m.end()))
        .collect();

    Ok((metadata, interleave(body, &spans, body_offset)))
}

/// 分离front-matter
///
/// 内容以 `---` 行开头并且存在结束的 `---`（或 `...`）行时，
/// 返回两者之间的YAML文本以及正文在原始内容中的起始偏移。
fn split_front_matter(content: &str) -> (Option<&str>, usize) {
    let content_start = if content.starts_with('\u{feff}') { '\u{feff}'.len_utf8() } else { 0 };
    let mut lines = content[content_start..].split_inclusive('\n');

    let first = match lines.next() {
        Some(line) => line,
        None => return (None, 0),
    };
    if first.trim_end() != "---" {
        return (None, 0);
    }

    let yaml_start = content_start + first.len();
    let mut offset = yaml_start;
    for line in lines {
        let marker = line.trim_end();
        if marker == "---" || marker == "..." {
            return (Some(&content[yaml_start..offset]), offset + line.len());
        }
        offset += line.len();
    }

    // 没有结束标记，整个内容都是正文
    (None, 0)
}

fn parse_front_matter(path: &str, yaml: &str) -> Result<Metadata> {
    let value: serde_yaml::Value = serde_yaml::from_str(yaml)
        .map_err(|e| pipeline_error!(parse, path, format!("front-matter格式错误: {}", e)))?;

    match value {
        serde_yaml::Value::Null => Ok(Metadata::new()),
        serde_yaml::Value::Mapping(mapping) => Ok(mapping
            .into_iter()
            .map(|(key, value)| (key_to_string(&key), value))
            .collect()),
        _ => Err(pipeline_error!(parse, path, "front-matter不是键值映射")),
    }
}

fn key_to_string(key: &serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}
