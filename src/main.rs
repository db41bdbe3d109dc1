use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use tracing::{error, info, warn};

use docs_translator::config::{Cli, Command, RunArgs};
use docs_translator::decomposer::parse_file;
use docs_translator::pipeline::{list_languages, Pipeline};
use docs_translator::project::{FetchOptions, SourceDescriptor, SourceKind};
use docs_translator::stats::{format_duration, print_run_stats, RunStats};
use docs_translator::utils::{detect_source_kind, init_logging};
use docs_translator::DocsService;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志系统，JSON输出时不打印日志
    let json_output = matches!(&cli.command, Command::Run(args) if args.json);
    init_logging(cli.verbose, cli.quiet || json_output);

    let result = match &cli.command {
        Command::Run(args) if args.json => run_json(args).await,
        Command::Run(args) => run(args, cli.quiet, cli.stats).await,
        Command::Inspect { file } => inspect(file),
        Command::Languages => {
            for language in list_languages() {
                println!("{}\t{}", language.code, language.name);
            }
            Ok(())
        }
    };

    if let Err(e) = result {
        error!("❌ 执行失败: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// 完整运行流水线
async fn run(args: &RunArgs, quiet: bool, show_stats: bool) -> Result<()> {
    let kind = match &args.kind {
        Some(kind) => kind
            .parse::<SourceKind>()
            .map_err(|reason| anyhow::anyhow!(reason))?,
        None => detect_source_kind(&args.source),
    };

    if !quiet {
        info!("🚀 启动文档翻译");
        info!("📂 文档源: {} ({:?})", args.source, kind);
        info!("🌐 语言: {} -> {}", args.source_lang, args.lang);
    }

    let pipeline = Pipeline::new(args.pipeline_config())?;
    let source = SourceDescriptor::new(&args.source, kind).with_options(FetchOptions {
        max_pages: args.max_pages,
        target_path: args.target_path.clone(),
    });

    let total_start = Instant::now();
    let mut stats = RunStats::default();

    let stage_start = Instant::now();
    let project = pipeline.fetch(source).await?;
    stats.fetch_time = stage_start.elapsed();

    let stage_start = Instant::now();
    pipeline.parse(&project.id).await?;
    stats.parse_time = stage_start.elapsed();

    let stage_start = Instant::now();
    let project = pipeline
        .translate(&project.id, &args.source_lang, &args.lang)
        .await?;
    stats.translate_time = stage_start.elapsed();
    for failure in &project.translation_errors {
        warn!("⚠️  {}: {}", failure.path, failure.message);
    }

    let stage_start = Instant::now();
    let project = pipeline
        .build(&project.id, args.name.as_deref(), !args.no_package)
        .await?;
    stats.build_time = stage_start.elapsed();

    let total_duration = total_start.elapsed();
    stats.record_counts(&project);

    if !quiet {
        if let Some(build) = &project.build_result {
            info!("📄 站点目录: {}", build.site_dir.display());
        }
        if let Some(package) = &project.package_result {
            info!("📦 归档: {} ({:.2} MB)", package.archive_path.display(), package.size_mb);
        }
        info!("✅ 完成！总耗时: {}", format_duration(total_duration));
    }

    if show_stats {
        print_run_stats(&stats, total_duration);
    }

    Ok(())
}

/// 通过项目接口运行，逐阶段输出JSON信封，遇到第一个错误信封时停止
async fn run_json(args: &RunArgs) -> Result<()> {
    let service = DocsService::new(Pipeline::new(args.pipeline_config())?);
    let options = FetchOptions {
        max_pages: args.max_pages,
        target_path: args.target_path.clone(),
    };

    let fetched = service.fetch(&args.source, args.kind.as_deref(), options).await;
    emit(&fetched)?;
    let project_id = fetched["project_id"]
        .as_str()
        .map(str::to_string)
        .context("抓取结果缺少project_id")?;

    emit(&service.parse(&project_id).await)?;
    emit(&service.translate(&project_id, &args.source_lang, &args.lang).await)?;
    emit(&service.build(&project_id, args.name.as_deref(), !args.no_package).await)?;
    Ok(())
}

/// 打印一个信封，错误信封转换为错误返回
fn emit(envelope: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(envelope)?);
    if envelope["status"] == "success" {
        Ok(())
    } else {
        anyhow::bail!("{}", envelope["message"].as_str().unwrap_or("未知错误"))
    }
}

/// 拆分单个文件并输出JSON
fn inspect(file: &std::path::Path) -> Result<()> {
    let document = parse_file(file)?;
    let json = serde_json::to_string_pretty(&document).with_context(|| "序列化文档失败")?;
    println!("{}", json);
    Ok(())
}
