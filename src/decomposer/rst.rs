//! reStructuredText拆分
//!
//! 与markdown相同的交替规则，代码检测改为：
//! - `.. code-block::`（以及 `.. code::`、`.. sourcecode::`）指令及其缩进内容
//! - 以 `::` 结尾的段落后跟空行和缩进行的字面量块

use super::text::interleave;
use crate::document::Block;

const CODE_DIRECTIVES: &[&str] = &[".. code-block::", ".. code::", ".. sourcecode::"];

/// 拆分reStructuredText内容
pub fn decompose(content: &str) -> Vec<Block> {
    let spans = find_code_spans(content);
    interleave(content, &spans, 0)
}

struct Line<'a> {
    offset: usize,
    text: &'a str,
}

impl Line<'_> {
    fn indent(&self) -> usize {
        self.text.len() - self.text.trim_start().len()
    }

    fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    fn end(&self) -> usize {
        self.offset + self.text.len()
    }
}

fn split_lines(content: &str) -> Vec<Line<'_>> {
    let mut offset = 0;
    content
        .split_inclusive('\n')
        .map(|raw| {
            let line = Line {
                offset,
                text: raw.trim_end_matches(['\n', '\r']),
            };
            offset += raw.len();
            line
        })
        .collect()
}

/// 按顺序找出所有代码片段的字节区间
fn find_code_spans(content: &str) -> Vec<(usize, usize)> {
    let lines = split_lines(content);
    let mut spans = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = &lines[i];
        let trimmed = line.text.trim_start();
        let indent = line.indent();

        if CODE_DIRECTIVES.iter().any(|d| trimmed.starts_with(d)) {
            let (next, end) = consume_indented(&lines, i + 1, indent);
            spans.push((line.offset + indent, end.unwrap_or_else(|| line.end())));
            i = next;
            continue;
        }

        if trimmed.ends_with("::") && !trimmed.starts_with("..") {
            let followed_by_blank = lines.get(i + 1).map(|l| l.is_blank()).unwrap_or(false);
            if followed_by_blank {
                if let (next, Some(end)) = consume_indented(&lines, i + 1, indent) {
                    spans.push((line.end() - 2, end));
                    i = next;
                    continue;
                }
            }
        }

        i += 1;
    }

    spans
}

/// 从 `from` 开始消费空行和缩进大于 `base_indent` 的行
///
/// 返回第一个未被消费的行号，以及最后一个缩进行的结束偏移（不含换行）。
/// 结尾的空行不计入代码片段。
fn consume_indented(lines: &[Line<'_>], from: usize, base_indent: usize) -> (usize, Option<usize>) {
    let mut end = None;
    let mut next = from;

    for (j, line) in lines.iter().enumerate().skip(from) {
        if line.is_blank() {
            next = j + 1;
            continue;
        }
        if line.indent() > base_indent {
            end = Some(line.end());
            next = j + 1;
        } else {
            next = j;
            break;
        }
    }

    (next, end)
}
