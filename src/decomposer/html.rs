//! HTML拆分
//!
//! 结构性元素（script、style、code、pre）在遍历前整体丢弃，其内容不会
//! 产生任何块。其余每个块级元素生成一个带元素名的文本块，HTML不产生代码块。

use crate::document::Block;
use crate::error::Result;
use crate::html_processor::{extract_block_texts, parse_html};

/// 拆分HTML内容
pub fn decompose(content: &str) -> Result<Vec<Block>> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let dom = parse_html(content)?;
    Ok(extract_block_texts(&dom)
        .into_iter()
        .map(|(tag, text)| Block::tagged_text(text, &tag))
        .collect())
}
