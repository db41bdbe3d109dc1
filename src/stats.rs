use std::time::Duration;

use crate::project::Project;

/// 运行统计
#[derive(Debug, Default)]
pub struct RunStats {
    pub fetch_time: Duration,
    pub parse_time: Duration,
    pub translate_time: Duration,
    pub build_time: Duration,
    pub files_found: usize,
    pub documents_parsed: usize,
    pub parse_failures: usize,
    pub blocks_parsed: usize,
    pub text_blocks: usize,
    pub documents_translated: usize,
    pub fallback_documents: usize,
    pub translation_failures: usize,
    pub pages_built: usize,
    pub archive_size: Option<u64>,
}

impl RunStats {
    /// 从项目记录中汇总计数
    pub fn record_counts(&mut self, project: &Project) {
        use crate::document::DocumentOutcome;

        self.files_found = project
            .source_data
            .as_ref()
            .map(|d| d.entries.len())
            .unwrap_or(0);
        if let Some(documents) = &project.parsed_documents {
            self.documents_parsed = documents.len();
            self.blocks_parsed = documents.iter().map(|d| d.blocks.len()).sum();
            self.text_blocks = documents.iter().map(|d| d.text_block_count()).sum();
        }
        self.parse_failures = project.parse_errors.len();

        if let Some(documents) = &project.translated_documents {
            self.documents_translated = documents.iter().filter(|d| d.has_translated_content()).count();
            self.fallback_documents = documents
                .iter()
                .filter(|d| {
                    matches!(
                        d.translation.as_ref().map(|t| &t.outcome),
                        Some(DocumentOutcome::Fallback)
                    )
                })
                .count();
        }
        self.translation_failures = project.translation_errors.len();

        self.pages_built = project
            .build_result
            .as_ref()
            .map(|b| b.pages.len())
            .unwrap_or(0);
        self.archive_size = project.package_result.as_ref().map(|p| p.size_bytes);
    }
}

/// 打印运行统计
pub fn print_run_stats(stats: &RunStats, total_duration: Duration) {
    println!("\n📊 运行统计报告:");
    println!("═══════════════════════════════════════");

    // 时间分解
    println!("⏱️  时间分解:");
    println!("   抓取: {}", format_duration(stats.fetch_time));
    println!("   解析: {}", format_duration(stats.parse_time));
    println!("   翻译: {}", format_duration(stats.translate_time));
    println!("   构建: {}", format_duration(stats.build_time));
    println!("   总耗时: {}", format_duration(total_duration));

    // 文档统计
    println!("\n📏 文档统计:");
    println!("   找到文件: {} 个", stats.files_found);
    println!(
        "   解析文档: {} 个 ({} 个失败)",
        stats.documents_parsed, stats.parse_failures
    );
    println!(
        "   文档块: {} 个 (其中文本块 {} 个)",
        stats.blocks_parsed, stats.text_blocks
    );

    // 翻译统计
    println!("\n🔤 翻译统计:");
    println!("   已翻译文档: {} 个", stats.documents_translated);
    println!("   降级文档: {} 个", stats.fallback_documents);
    println!("   翻译失败: {} 个", stats.translation_failures);

    // 输出统计
    println!("\n🏗️  输出统计:");
    println!("   生成页面: {} 个", stats.pages_built);
    if let Some(size) = stats.archive_size {
        println!(
            "   归档大小: {} 字节 ({:.1} KB)",
            size,
            size as f64 / 1024.0
        );
    }

    if stats.text_blocks > 0 && !stats.translate_time.is_zero() {
        println!("\n🚀 性能指标:");
        println!(
            "   翻译速度: {:.1} 块/秒",
            stats.text_blocks as f64 / stats.translate_time.as_secs_f64()
        );
    }
}

/// 格式化持续时间
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else {
        format!("{:.3}s", duration.as_secs_f64())
    }
}
