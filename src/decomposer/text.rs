//! 纯文本拆分
//!
//! 空行结束一个块，连续的非空行用单个空格拼接为一个块。
//! markdown 和 reStructuredText 中非代码部分也使用同样的规则。

use crate::document::Block;

/// 按空行把文本拆分为文本块
pub fn split_into_blocks(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            flush(&mut current, &mut blocks);
        } else {
            current.push(line);
        }
    }
    flush(&mut current, &mut blocks);

    blocks
}

fn flush(current: &mut Vec<&str>, blocks: &mut Vec<Block>) {
    if !current.is_empty() {
        blocks.push(Block::text(current.join(" ")));
        current.clear();
    }
}

/// 交替拆分：`spans` 为按顺序排列、互不重叠的代码片段字节区间
///
/// 代码片段之间的文本按空行规则拆分，代码片段原样保留为代码块，
/// 块的顺序与源文中出现的顺序一致。`base_offset` 为 `body` 在原始内容中的偏移。
pub fn interleave(body: &str, spans: &[(usize, usize)], base_offset: usize) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut cursor = 0;

    for &(start, end) in spans {
        if start > cursor {
            blocks.extend(split_into_blocks(&body[cursor..start]));
        }
        blocks.push(Block::code(&body[start..end], base_offset + start));
        cursor = end;
    }

    if cursor < body.len() {
        blocks.extend(split_into_blocks(&body[cursor..]));
    }

    blocks
}

/// 纯文本没有代码检测
pub fn decompose(content: &str) -> Vec<Block> {
    split_into_blocks(content)
}
