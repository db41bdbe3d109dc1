//! HTML处理模块
//!
//! 提供HTML解析、块级文本提取、链接和标题提取功能

// 第三方crate导入
use anyhow::{Context, Result};
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};

/// 整个子树都被丢弃的元素（内容不会成为可翻译块）
pub const STRIPPED_TAGS: &[&str] = &["script", "style", "code", "pre"];

/// 产生文本块的块级元素
pub const BLOCK_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "li", "td", "th", "div",
];

/// 文本块的最小长度（字符数，必须大于此值）
pub const MIN_BLOCK_CHARS: usize = 3;

/// 解析HTML文档
pub fn parse_html(html_content: &str) -> Result<RcDom> {
    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut html_content.as_bytes())
        .context("HTML解析失败")
}

fn element_name(node: &Handle) -> Option<String> {
    match node.data {
        NodeData::Element { ref name, .. } => Some(name.local.as_ref().to_ascii_lowercase()),
        _ => None,
    }
}

fn is_stripped(node: &Handle) -> bool {
    element_name(node)
        .map(|name| STRIPPED_TAGS.contains(&name.as_str()))
        .unwrap_or(false)
}

/// 按文档顺序（先序深度优先）访问节点，跳过被丢弃的子树
fn walk_document_order<F>(root: &Handle, mut visit: F)
where
    F: FnMut(&Handle),
{
    let mut stack = vec![root.clone()];

    while let Some(node) = stack.pop() {
        if is_stripped(&node) {
            continue;
        }
        visit(&node);

        let children = node.children.borrow();
        for child in children.iter().rev() {
            stack.push(child.clone());
        }
    }
}

/// 收集节点下所有文本，每段去掉首尾空白后用单个空格连接
pub fn collect_text(node: &Handle) -> String {
    let mut parts = Vec::new();

    walk_document_order(node, |n| {
        if let NodeData::Text { ref contents } = n.data {
            let text = contents.borrow();
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                parts.push(trimmed.split_whitespace().collect::<Vec<_>>().join(" "));
            }
        }
    });

    parts.join(" ")
}

/// 提取所有块级元素的文本，返回 (元素名, 文本)，按文档顺序排列
///
/// script/style/code/pre 的内容在遍历前即被排除，不会出现在任何块中。
pub fn extract_block_texts(dom: &RcDom) -> Vec<(String, String)> {
    let mut blocks = Vec::new();

    walk_document_order(&dom.document, |node| {
        if let Some(name) = element_name(node) {
            if BLOCK_TAGS.contains(&name.as_str()) {
                let text = collect_text(node);
                if text.chars().count() > MIN_BLOCK_CHARS {
                    blocks.push((name, text));
                }
            }
        }
    });

    blocks
}

/// 提取页面标题
pub fn document_title(dom: &RcDom) -> Option<String> {
    let mut title = None;

    walk_document_order(&dom.document, |node| {
        if title.is_none() && element_name(node).as_deref() == Some("title") {
            let text = collect_text(node);
            if !text.is_empty() {
                title = Some(text);
            }
        }
    });

    title
}

/// 提取所有链接的href属性，保持文档顺序
pub fn extract_links(dom: &RcDom) -> Vec<String> {
    let mut links = Vec::new();

    walk_document_order(&dom.document, |node| {
        if let NodeData::Element { ref name, ref attrs, .. } = node.data {
            if name.local.as_ref().eq_ignore_ascii_case("a") {
                for attr in attrs.borrow().iter() {
                    if attr.name.local.as_ref() == "href" {
                        let href = attr.value.trim();
                        if !href.is_empty() {
                            links.push(href.to_string());
                        }
                    }
                }
            }
        }
    });

    links
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_block_texts_in_document_order() {
        let dom = parse_html(
            "<html><body><h1>Welcome here</h1><p>Hello <b>bold</b> world</p>\
             <ul><li>First item</li><li>ok</li></ul></body></html>",
        )
        .unwrap();

        let blocks = extract_block_texts(&dom);
        assert_eq!(
            blocks,
            vec![
                ("h1".to_string(), "Welcome here".to_string()),
                ("p".to_string(), "Hello bold world".to_string()),
                ("li".to_string(), "First item".to_string()),
            ]
        );
    }

    #[test]
    fn test_stripped_tags_never_contribute_text() {
        let dom = parse_html(
            "<div><p>Visible text</p><script>var secret = 'hidden script';</script>\
             <pre>preformatted secret</pre><p>Use <code>secret()</code> wisely</p></div>",
        )
        .unwrap();

        let blocks = extract_block_texts(&dom);
        assert!(blocks.iter().all(|(_, text)| !text.contains("secret")));
        assert_eq!(blocks[0], ("div".to_string(), "Visible text Use wisely".to_string()));
    }

    #[test]
    fn test_document_title_and_links() {
        let dom = parse_html(
            "<html><head><title> Guide </title></head>\
             <body><a href=\"/docs/a\">A</a><a href=\"\">empty</a><a href=\"b.html\">B</a></body></html>",
        )
        .unwrap();

        assert_eq!(document_title(&dom), Some("Guide".to_string()));
        assert_eq!(extract_links(&dom), vec!["/docs/a".to_string(), "b.html".to_string()]);
    }
}
