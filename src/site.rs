//! 站点生成与打包
//!
//! 每个有译文的文档生成一个HTML页面，外加一个索引页和样式表；
//! 打包器把整个站点目录压缩成ZIP文件。

// 标准库导入
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

// 第三方crate导入
use html_escape::{encode_double_quoted_attribute, encode_text};
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

// 本地模块导入
use crate::constants::{language_name, site_config};
use crate::decomposer::markdown::Metadata;
use crate::document::{Block, BlockKind, Document};
use crate::error::Result;
use crate::pipeline_error;
use crate::project::{BuildResult, PackageResult, PageEntry};
use crate::utils::unique_output_name;

/// 页面渲染接口
pub trait Renderer: Send + Sync {
    /// 渲染一个文档页面，`fragments` 是按块顺序排列的HTML片段
    fn render(&self, title: &str, fragments: &[String], language: &str, metadata: &Metadata) -> String;

    /// 渲染索引页
    fn render_index(&self, project_name: &str, language: &str, pages: &[PageEntry]) -> String;

    /// 站点样式表
    fn stylesheet(&self) -> String;
}

/// 打包接口
pub trait Packager: Send + Sync {
    fn archive(&self, directory: &Path) -> Result<PackageResult>;
}

/// 把一个块转换为HTML片段：文本块为段落，代码块为预格式化代码
pub fn block_fragment(block: &Block) -> String {
    match block.kind {
        BlockKind::Text => format!("<p>{}</p>", encode_text(block.display_content())),
        BlockKind::Code => {
            let (language, body) = split_code_fence(&block.content);
            match language {
                Some(lang) => format!(
                    "<pre><code class=\"language-{}\">{}</code></pre>",
                    encode_double_quoted_attribute(lang),
                    encode_text(body)
                ),
                None => format!("<pre><code>{}</code></pre>", encode_text(body)),
            }
        }
    }
}

/// 去掉代码块的围栏标记，返回 (语言, 代码)
fn split_code_fence(content: &str) -> (Option<&str>, &str) {
    if let Some(rest) = content.strip_prefix("```") {
        let rest = rest.strip_suffix("```").unwrap_or(rest);
        let (info, body) = rest.split_once('\n').unwrap_or(("", rest));
        let language = info.split_whitespace().next();
        return (language, body.trim_end_matches('\n'));
    }

    if content.len() >= 2 && content.starts_with('`') && content.ends_with('`') {
        return (None, &content[1..content.len() - 1]);
    }

    (None, content)
}

/// 默认渲染器
#[derive(Debug, Default, Clone)]
pub struct DefaultRenderer;

impl DefaultRenderer {
    fn page_head(title: &str, language: &str, description: Option<&str>) -> String {
        let mut head = format!(
            "<!DOCTYPE html>\n<html lang=\"{}\">\n<head>\n<meta charset=\"utf-8\">\n\
             <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
             <title>{}</title>\n",
            encode_double_quoted_attribute(language),
            encode_text(title)
        );
        if let Some(description) = description {
            head.push_str(&format!(
                "<meta name=\"description\" content=\"{}\">\n",
                encode_double_quoted_attribute(description)
            ));
        }
        head.push_str(&format!(
            "<link rel=\"stylesheet\" href=\"{}/{}\">\n</head>\n",
            site_config::ASSETS_DIR,
            site_config::STYLESHEET_FILE
        ));
        head
    }
}

impl Renderer for DefaultRenderer {
    fn render(&self, title: &str, fragments: &[String], language: &str, metadata: &Metadata) -> String {
        let description = metadata.get("description").and_then(|v| v.as_str());

        let mut html = Self::page_head(title, language, description);
        html.push_str("<body>\n<nav><a href=\"");
        html.push_str(site_config::INDEX_FILE);
        html.push_str("\">&larr; Index</a></nav>\n<main>\n<h1>");
        html.push_str(&encode_text(title));
        html.push_str("</h1>\n");
        for fragment in fragments {
            html.push_str(fragment);
            html.push('\n');
        }
        html.push_str("</main>\n</body>\n</html>\n");
        html
    }

    fn render_index(&self, project_name: &str, language: &str, pages: &[PageEntry]) -> String {
        let language_label = language_name(language).unwrap_or(language);
        let title = format!("{} ({})", project_name, language_label);

        let mut html = Self::page_head(&title, language, None);
        html.push_str("<body>\n<main>\n<h1>");
        html.push_str(&encode_text(&title));
        html.push_str("</h1>\n<ul class=\"toc\">\n");
        for page in pages {
            html.push_str(&format!(
                "<li><a href=\"{}\">{}</a></li>\n",
                encode_double_quoted_attribute(&page.file),
                encode_text(&page.title)
            ));
        }
        html.push_str("</ul>\n</main>\n</body>\n</html>\n");
        html
    }

    fn stylesheet(&self) -> String {
        concat!(
            "body { font-family: -apple-system, 'Segoe UI', Helvetica, Arial, sans-serif; ",
            "line-height: 1.6; color: #24292f; margin: 0; }\n",
            "main { max-width: 860px; margin: 0 auto; padding: 2rem 1rem; }\n",
            "nav { padding: 0.75rem 1rem; border-bottom: 1px solid #d0d7de; }\n",
            "a { color: #0969da; text-decoration: none; }\n",
            "pre { background: #f6f8fa; padding: 1rem; overflow: auto; border-radius: 6px; }\n",
            "code { font-family: ui-monospace, SFMono-Regular, Menlo, monospace; font-size: 0.9em; }\n",
            "ul.toc li { margin: 0.25rem 0; }\n",
        )
        .to_string()
    }
}

/// 站点生成器
pub struct SiteAssembler {
    renderer: Arc<dyn Renderer>,
}

impl SiteAssembler {
    pub fn new(renderer: Arc<dyn Renderer>) -> Self {
        Self { renderer }
    }

    /// 生成站点到 `site_dir`，目录中已有的内容会被替换
    ///
    /// 没有译文的文档被跳过，记录在 `skipped` 中，不会导致构建失败。
    pub fn build(
        &self,
        documents: &[Document],
        project_name: &str,
        language: &str,
        site_dir: &Path,
    ) -> Result<BuildResult> {
        info!("🏗️  生成站点: {} ({}) -> {}", project_name, language, site_dir.display());

        if site_dir.exists() {
            fs::remove_dir_all(site_dir)
                .map_err(|e| pipeline_error!(file_op, site_dir.display(), "remove_dir_all", e))?;
        }
        let assets_dir = site_dir.join(site_config::ASSETS_DIR);
        fs::create_dir_all(&assets_dir)
            .map_err(|e| pipeline_error!(file_op, assets_dir.display(), "create_dir_all", e))?;

        let mut taken = HashSet::from([site_config::INDEX_FILE.to_string()]);
        let mut pages = Vec::new();
        let mut skipped = Vec::new();

        for document in documents {
            if !document.has_translated_content() {
                debug!("跳过没有译文的文档: {}", document.file_path);
                skipped.push(document.file_path.clone());
                continue;
            }

            let title = document.title();
            let fragments: Vec<String> = document.blocks.iter().map(block_fragment).collect();
            let html = self
                .renderer
                .render(&title, &fragments, language, &document.metadata);

            let file = unique_output_name(&document.file_path, &mut taken);
            write_file(&site_dir.join(&file), html.as_bytes())?;

            pages.push(PageEntry {
                file,
                title,
                source_path: document.file_path.clone(),
            });
        }

        let index = self.renderer.render_index(project_name, language, &pages);
        write_file(&site_dir.join(site_config::INDEX_FILE), index.as_bytes())?;
        write_file(
            &assets_dir.join(site_config::STYLESHEET_FILE),
            self.renderer.stylesheet().as_bytes(),
        )?;

        if !skipped.is_empty() {
            warn!("⚠️  {} 个文档没有译文，已跳过", skipped.len());
        }
        info!("✅ 站点生成完成: {} 个页面", pages.len());

        Ok(BuildResult {
            project_name: project_name.to_string(),
            target_lang: language.to_string(),
            site_dir: site_dir.to_path_buf(),
            pages,
            skipped,
        })
    }
}

fn write_file(path: &Path, content: &[u8]) -> Result<()> {
    fs::write(path, content).map_err(|e| pipeline_error!(file_op, path.display(), "write", e))
}

/// ZIP打包器
///
/// 站点目录为 `<project>/<lang>`，归档名为 `<project>_<lang>_docs.zip`，
/// 条目路径为 `<lang>/<相对路径>`。条目按路径排序并使用固定时间戳，
/// 相同的站点内容总是生成相同的归档。
#[derive(Debug, Clone)]
pub struct ZipPackager {
    downloads_dir: std::path::PathBuf,
}

impl ZipPackager {
    pub fn new<P: AsRef<Path>>(downloads_dir: P) -> Self {
        Self {
            downloads_dir: downloads_dir.as_ref().to_path_buf(),
        }
    }

    fn archive_name(directory: &Path) -> String {
        let language = directory
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let project = directory
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "site".to_string());
        format!("{}_{}_docs.zip", project, language)
    }
}

impl Packager for ZipPackager {
    fn archive(&self, directory: &Path) -> Result<PackageResult> {
        if !directory.is_dir() {
            return Err(pipeline_error!(build, format!("站点目录不存在: {}", directory.display())));
        }

        fs::create_dir_all(&self.downloads_dir)
            .map_err(|e| pipeline_error!(file_op, self.downloads_dir.display(), "create_dir_all", e))?;
        let archive_name = Self::archive_name(directory);
        let archive_path = self.downloads_dir.join(&archive_name);
        let entry_root = directory.parent().unwrap_or(directory);

        let file = File::create(&archive_path)
            .map_err(|e| pipeline_error!(file_op, archive_path.display(), "create", e))?;
        let mut writer = ZipWriter::new(file);
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default());

        let mut buffer = Vec::new();
        for entry in WalkDir::new(directory).sort_by_file_name() {
            let entry = entry.map_err(|e| pipeline_error!(build, format!("遍历站点目录失败: {}", e)))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let name = entry
                .path()
                .strip_prefix(entry_root)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .replace('\\', "/");

            buffer.clear();
            File::open(entry.path())
                .and_then(|mut f| f.read_to_end(&mut buffer))
                .map_err(|e| pipeline_error!(file_op, entry.path().display(), "read", e))?;

            writer
                .start_file(name.as_str(), options)
                .map_err(|e| pipeline_error!(build, format!("写入归档条目失败 {}: {}", name, e)))?;
            writer
                .write_all(&buffer)
                .map_err(|e| pipeline_error!(build, format!("写入归档条目失败 {}: {}", name, e)))?;
        }

        writer
            .finish()
            .map_err(|e| pipeline_error!(build, format!("完成归档失败: {}", e)))?;

        let size_bytes = fs::metadata(&archive_path)
            .map_err(|e| pipeline_error!(file_op, archive_path.display(), "metadata", e))?
            .len();
        let size_mb = (size_bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0;
        info!("📦 打包完成: {} ({} 字节)", archive_path.display(), size_bytes);

        Ok(PackageResult {
            archive_name,
            archive_path,
            size_bytes,
            size_mb,
        })
    }
}
