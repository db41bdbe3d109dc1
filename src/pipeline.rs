//! 流水线编排
//!
//! 每个项目依次经过 抓取 → 解析 → 翻译 → 构建。调用某个阶段时，
//! [`plan`] 计算出缺失的前置步骤，由 [`Pipeline::run`] 按顺序执行；
//! 前置输出无法自动补齐时返回 `Precondition` 错误。
//!
//! 项目记录的所有写入都通过 [`ProjectStore::compare_and_swap`] 完成，
//! 同一项目上的并发阶段调用会以 `StoreConflict` 失败。

// 标准库导入
use std::sync::Arc;
use std::time::Duration;

// 第三方crate导入
use serde::Serialize;
use tracing::{debug, error, info, warn};

// 本地模块导入
use crate::acquirer::{DefaultSourceAcquirer, SourceAcquirer};
use crate::config::PipelineConfig;
use crate::constants::{is_supported_language, is_valid_api_url, progress, service_config};
use crate::decomposer::{parse_batch, ParseReport};
use crate::error::{PipelineError, Result};
use crate::merger::TranslationMerger;
use crate::pipeline_error;
use crate::project::{
    derive_project_id, BuildResult, FileFailure, PackageResult, Project, SourceDescriptor,
    SourceKind, Stage,
};
use crate::site::{DefaultRenderer, Packager, Renderer, SiteAssembler, ZipPackager};
use crate::store::{MemoryProjectStore, ProjectStore};
use crate::translator::{HttpTranslationBackend, MockTranslationBackend, TranslationBackend};
use crate::utils::{is_single_path_component, source_slug};

/// 可请求的终点阶段
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageRequest {
    Parse,
    Translate {
        source_lang: String,
        target_lang: String,
    },
    Build {
        project_name: Option<String>,
        package: bool,
    },
}

/// 计划中的单个步骤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Parse,
    Translate,
    Build,
}

/// 项目摘要，用于列表
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectSummary {
    pub project_id: String,
    pub source: String,
    pub stage: Stage,
    pub progress: u8,
    pub message: String,
}

/// 项目状态
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub project_id: String,
    pub source: String,
    pub source_kind: SourceKind,
    pub stage: Stage,
    pub progress: u8,
    pub message: String,
    pub source_lang: Option<String>,
    pub target_lang: Option<String>,
    pub files_found: usize,
    pub parsed_documents: usize,
    pub parsed_blocks: usize,
    pub translated_documents: usize,
    pub parse_errors: Vec<FileFailure>,
    pub translation_errors: Vec<FileFailure>,
    pub build_result: Option<BuildResult>,
    pub package_result: Option<PackageResult>,
}

impl From<&Project> for StatusReport {
    fn from(project: &Project) -> Self {
        Self {
            project_id: project.id.clone(),
            source: project.source.location.clone(),
            source_kind: project.source.kind,
            stage: project.stage,
            progress: project.progress,
            message: project.message.clone(),
            source_lang: project.source_lang.clone(),
            target_lang: project.target_lang.clone(),
            files_found: project.source_data.as_ref().map(|d| d.entries.len()).unwrap_or(0),
            parsed_documents: project.parsed_documents.as_ref().map(Vec::len).unwrap_or(0),
            parsed_blocks: project.parsed_block_count(),
            translated_documents: project
                .translated_documents
                .as_ref()
                .map(|docs| docs.iter().filter(|d| d.has_translated_content()).count())
                .unwrap_or(0),
            parse_errors: project.parse_errors.clone(),
            translation_errors: project.translation_errors.clone(),
            build_result: project.build_result.clone(),
            package_result: project.package_result.clone(),
        }
    }
}

/// 支持的语言
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageInfo {
    pub code: &'static str,
    pub name: &'static str,
}

/// 列出支持的语言
pub fn list_languages() -> Vec<LanguageInfo> {
    service_config::SUPPORTED_LANGUAGES
        .iter()
        .map(|&(code, name)| LanguageInfo { code, name })
        .collect()
}

/// 计算到达请求阶段所需的最少步骤
///
/// 翻译可以自动补上解析，但任何阶段都不会自动重新抓取；
/// 构建需要翻译阶段记录的目标语言，因此不会自动翻译。
pub fn plan(project: &Project, request: &StageRequest) -> Result<Vec<Step>> {
    match request {
        StageRequest::Parse => {
            if project.source_data.is_none() {
                return Err(pipeline_error!(
                    precondition,
                    Stage::Parsing,
                    Stage::Fetched,
                    "项目还没有抓取到的文档"
                ));
            }
            Ok(vec![Step::Parse])
        }
        StageRequest::Translate { .. } => {
            if project.parsed_documents.is_some() {
                Ok(vec![Step::Translate])
            } else if project.source_data.is_some() {
                Ok(vec![Step::Parse, Step::Translate])
            } else {
                Err(pipeline_error!(
                    precondition,
                    Stage::Translating,
                    Stage::Fetched,
                    "项目还没有抓取到的文档"
                ))
            }
        }
        StageRequest::Build { .. } => {
            if project.translated_documents.is_none() || project.target_lang.is_none() {
                return Err(pipeline_error!(
                    precondition,
                    Stage::Building,
                    Stage::Translated,
                    "项目还没有翻译过"
                ));
            }
            Ok(vec![Step::Build])
        }
    }
}

/// 文档翻译流水线
pub struct Pipeline {
    config: PipelineConfig,
    store: Arc<dyn ProjectStore>,
    acquirer: Arc<dyn SourceAcquirer>,
    backend: Arc<dyn TranslationBackend>,
    renderer: Arc<dyn Renderer>,
    packager: Arc<dyn Packager>,
}

impl Pipeline {
    /// 使用默认协作者创建流水线
    ///
    /// mock模式或未配置API地址时使用模拟后端（降级模式）。
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let backend: Arc<dyn TranslationBackend> = match config.api_url() {
            Some(api_url) if !is_valid_api_url(api_url) => {
                return Err(pipeline_error!(
                    input_validation,
                    api_url,
                    "翻译API地址必须以 http:// 或 https:// 开头"
                ));
            }
            Some(api_url) => Arc::new(HttpTranslationBackend::new(api_url, config.request_timeout())?),
            None => Arc::new(MockTranslationBackend),
        };
        info!("🌐 翻译后端: {}", backend.name());

        Ok(Self {
            store: Arc::new(MemoryProjectStore::new()),
            acquirer: Arc::new(DefaultSourceAcquirer::new(
                config.user_agent(),
                Duration::from_secs(config.request_timeout().as_secs().max(1)),
            )),
            backend,
            renderer: Arc::new(DefaultRenderer),
            packager: Arc::new(ZipPackager::new(config.downloads_dir())),
            config,
        })
    }

    pub fn with_store(mut self, store: Arc<dyn ProjectStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_acquirer(mut self, acquirer: Arc<dyn SourceAcquirer>) -> Self {
        self.acquirer = acquirer;
        self
    }

    pub fn with_backend(mut self, backend: Arc<dyn TranslationBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_packager(mut self, packager: Arc<dyn Packager>) -> Self {
        self.packager = packager;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn merger(&self) -> TranslationMerger {
        TranslationMerger::new(self.backend.clone())
            .with_batch_size(self.config.batch_size())
            .with_concurrency(self.config.concurrent_batches())
    }

    async fn load(&self, project_id: &str) -> Result<Project> {
        self.store
            .get(project_id)
            .await
            .ok_or_else(|| PipelineError::ProjectNotFound {
                project_id: project_id.to_string(),
            })
    }

    /// 写入项目记录并更新本地副本的版本
    async fn commit(&self, project: &mut Project) -> Result<()> {
        project.version = self
            .store
            .compare_and_swap(project.version, project.clone())
            .await?;
        Ok(())
    }

    /// 阶段失败：记录错误状态后返回原错误
    async fn abort(&self, project: &mut Project, error: PipelineError) -> PipelineError {
        error!("❌ 项目 {} 在 {} 阶段失败: {}", project.id, project.stage, error);
        project.fail(error.to_string());
        if let Err(store_error) = self.commit(project).await {
            warn!("⚠️  无法保存错误状态: {}", store_error);
        }
        error
    }

    /// 为文档源选择项目标识，短标识已被其他文档源占用时使用完整哈希
    async fn resolve_project_id(&self, source: &SourceDescriptor) -> String {
        let short_id = derive_project_id(&source.location, false);
        match self.store.get(&short_id).await {
            Some(existing) if existing.source.normalized() != source.normalized() => {
                let extended = derive_project_id(&source.location, true);
                warn!("⚠️  项目标识冲突 {}，改用 {}", short_id, extended);
                extended
            }
            _ => short_id,
        }
    }

    /// 抓取文档源，重新抓取会重置项目状态
    pub async fn fetch(&self, mut source: SourceDescriptor) -> Result<Project> {
        if source.location.trim().is_empty() {
            return Err(pipeline_error!(input_validation, source.location, "文档源不能为空"));
        }
        if source.kind == SourceKind::Website && source.options.max_pages == 0 {
            source.options.max_pages = self.config.max_pages();
        }

        let project_id = self.resolve_project_id(&source).await;
        let previous_version = self.store.get(&project_id).await.map(|p| p.version).unwrap_or(0);

        let mut project = Project::new(&project_id, source.clone());
        project.version = previous_version;
        self.commit(&mut project).await?;
        info!("📥 开始抓取: {} ({})", source.location, project_id);

        let workspace = self.config.workspace_dir(&project_id);
        match self.acquirer.fetch(&source, &workspace).await {
            Ok(output) => {
                let count = output.entries.len();
                project.source_data = Some(output);
                project.advance(Stage::Fetched, format!("抓取完成，找到 {} 个文档文件", count));
                project.checkpoint(progress::FETCHED);
                self.commit(&mut project).await?;
                Ok(project)
            }
            Err(e) => Err(self.abort(&mut project, e).await),
        }
    }

    /// 解析已抓取的文档
    pub async fn parse(&self, project_id: &str) -> Result<Project> {
        let mut project = self.load(project_id).await?;
        plan(&project, &StageRequest::Parse)?;
        self.parse_step(&mut project).await?;
        Ok(project)
    }

    async fn parse_step(&self, project: &mut Project) -> Result<()> {
        let entries = match &project.source_data {
            Some(data) => data.entries.clone(),
            None => {
                return Err(pipeline_error!(
                    precondition,
                    Stage::Parsing,
                    Stage::Fetched,
                    "项目还没有抓取到的文档"
                ))
            }
        };

        project.advance(Stage::Parsing, "正在解析文档...");
        project.reset_translation();
        self.commit(project).await?;

        let max_files = self.config.max_parse_files();
        if entries.len() > max_files {
            info!("📄 共 {} 个文件，只解析前 {} 个", entries.len(), max_files);
        }
        let selected: Vec<_> = entries.into_iter().take(max_files).collect();

        let report: ParseReport = match tokio::task::spawn_blocking(move || parse_batch(&selected)).await {
            Ok(report) => report,
            Err(e) => {
                let error = PipelineError::from(anyhow::anyhow!("解析任务执行失败: {}", e));
                return Err(self.abort(project, error).await);
            }
        };

        let message = format!(
            "解析完成: {} 个文档, {} 个块, {} 个失败",
            report.documents.len(),
            report.total_blocks(),
            report.failures.len()
        );
        project.parsed_documents = Some(report.documents);
        project.parse_errors = report.failures;
        project.advance(Stage::Parsed, message);
        project.checkpoint(progress::PARSED);
        self.commit(project).await
    }

    /// 翻译项目文档，尚未解析时先自动解析
    pub async fn translate(&self, project_id: &str, source_lang: &str, target_lang: &str) -> Result<Project> {
        for lang in [source_lang, target_lang] {
            if !is_supported_language(lang) {
                return Err(pipeline_error!(input_validation, lang, "不支持的语言代码"));
            }
        }

        let mut project = self.load(project_id).await?;
        let request = StageRequest::Translate {
            source_lang: source_lang.to_string(),
            target_lang: target_lang.to_string(),
        };
        self.run(&mut project, &request).await?;
        Ok(project)
    }

    async fn translate_step(&self, project: &mut Project, source_lang: &str, target_lang: &str) -> Result<()> {
        if project.parsed_block_count() == 0 {
            return Err(pipeline_error!(
                precondition,
                Stage::Translating,
                Stage::Parsed,
                "没有可翻译的文档块"
            ));
        }
        let mut documents = project.parsed_documents.clone().unwrap_or_default();

        project.advance(Stage::Translating, format!("正在翻译为 {}...", target_lang));
        project.translation_errors.clear();
        project.reset_build();
        self.commit(project).await?;

        let merger = self.merger();
        let total = documents.len();
        for (index, document) in documents.iter_mut().enumerate() {
            debug!("翻译文档 {}/{}: {}", index + 1, total, document.file_path);
            if let Err(e) = merger.translate_in_place(document, source_lang, target_lang).await {
                warn!("❌ {}", e);
                project.translation_errors.push(FileFailure {
                    path: document.file_path.clone(),
                    message: e.to_string(),
                });
            }

            let span = progress::TRANSLATE_SPAN as usize * (index + 1) / total;
            project.checkpoint(progress::PARSED + span as u8);
            project.message = format!("已翻译 {}/{} 个文档", index + 1, total);
            self.commit(project).await?;
        }

        let failed = project.translation_errors.len();
        project.translated_documents = Some(documents);
        project.source_lang = Some(source_lang.to_string());
        project.target_lang = Some(target_lang.to_string());
        project.advance(
            Stage::Translated,
            format!("翻译完成: {} 个文档, {} 个失败", total, failed),
        );
        project.checkpoint(progress::TRANSLATED);
        self.commit(project).await
    }

    /// 生成站点，`package` 为真时同时生成ZIP归档
    pub async fn build(&self, project_id: &str, project_name: Option<&str>, package: bool) -> Result<Project> {
        let mut project = self.load(project_id).await?;
        let request = StageRequest::Build {
            project_name: project_name.map(str::to_string),
            package,
        };
        self.run(&mut project, &request).await?;
        Ok(project)
    }

    async fn build_step(&self, project: &mut Project, project_name: Option<&str>, package: bool) -> Result<()> {
        let (documents, target_lang) = match (&project.translated_documents, &project.target_lang) {
            (Some(docs), Some(lang)) if docs.iter().any(|d| d.has_translated_content()) => {
                (docs.clone(), lang.clone())
            }
            _ => {
                return Err(pipeline_error!(
                    precondition,
                    Stage::Building,
                    Stage::Translated,
                    "没有已翻译的文档"
                ))
            }
        };

        let name = match project_name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) if is_single_path_component(name) => name.to_string(),
            Some(name) => {
                return Err(pipeline_error!(
                    input_validation,
                    name,
                    "项目名称必须是单层目录名，不能包含路径分隔符或 .."
                ))
            }
            None => default_project_name(project),
        };
        let site_dir = self.config.sites_dir().join(&name).join(&target_lang);

        project.advance(Stage::Building, "正在生成站点...");
        self.commit(project).await?;

        let assembler = SiteAssembler::new(self.renderer.clone());
        let build_result = match assembler.build(&documents, &name, &target_lang, &site_dir) {
            Ok(result) => result,
            Err(e) => return Err(self.abort(project, e).await),
        };

        let package_result = if package {
            match self.packager.archive(&site_dir) {
                Ok(result) => Some(result),
                Err(e) => return Err(self.abort(project, e).await),
            }
        } else {
            None
        };

        let message = format!("站点生成完成: {} 个页面", build_result.pages.len());
        project.build_result = Some(build_result);
        project.package_result = package_result;
        project.advance(Stage::Completed, message);
        project.checkpoint(progress::COMPLETED);
        self.commit(project).await
    }

    /// 按计划依次执行请求阶段及其缺失的前置步骤
    ///
    /// 自动补上的前置步骤失败时，错误以翻译错误的形式返回，并标明来源阶段。
    pub async fn run(&self, project: &mut Project, request: &StageRequest) -> Result<()> {
        let steps = plan(project, request)?;
        debug!("项目 {} 执行计划: {:?}", project.id, steps);

        for step in steps {
            match (step, request) {
                (Step::Parse, StageRequest::Parse) => self.parse_step(project).await?,
                (Step::Parse, _) => self
                    .parse_step(project)
                    .await
                    .map_err(|e| e.with_origin(Stage::Parsing))?,
                (Step::Translate, StageRequest::Translate { source_lang, target_lang }) => {
                    self.translate_step(project, source_lang, target_lang).await?
                }
                (Step::Build, StageRequest::Build { project_name, package }) => {
                    self.build_step(project, project_name.as_deref(), *package).await?
                }
                (step, request) => {
                    return Err(PipelineError::from(anyhow::anyhow!(
                        "无法为请求 {:?} 执行步骤 {:?}",
                        request,
                        step
                    )))
                }
            }
        }
        Ok(())
    }

    /// 查询项目状态
    pub async fn get_status(&self, project_id: &str) -> Result<StatusReport> {
        let project = self.load(project_id).await?;
        Ok(StatusReport::from(&project))
    }

    /// 列出所有项目
    pub async fn list_projects(&self) -> Vec<ProjectSummary> {
        self.store
            .list()
            .await
            .into_iter()
            .map(|p| ProjectSummary {
                project_id: p.id,
                source: p.source.location,
                stage: p.stage,
                progress: p.progress,
                message: p.message,
            })
            .collect()
    }
}

/// 默认站点名称：文档源的可读片段，没有时使用项目标识
fn default_project_name(project: &Project) -> String {
    let slug = source_slug(&project.source.normalized());
    if slug.is_empty() {
        project.id.clone()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{BlockKind, DocumentOutcome, TranslationState};
    use crate::merger::tests::{FailingBackend, UppercaseBackend};
    use crate::project::FetchOutput;
    use async_trait::async_trait;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const SCENARIO: &str = "# Title\n\nHello world.\n\n```py\nprint(1)\n```\n";

    fn pipeline(output: &TempDir) -> Pipeline {
        let config = PipelineConfig::new()
            .with_output_dir(output.path().join("output"))
            .with_downloads_dir(output.path().join("downloads"))
            .with_mock(true);
        Pipeline::new(config).unwrap()
    }

    fn docs_dir(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            let path = dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        dir
    }

    fn local(dir: &TempDir) -> SourceDescriptor {
        SourceDescriptor::new(&dir.path().display().to_string(), SourceKind::Local)
    }

    /// 总是失败的获取器
    struct UnreachableAcquirer;

    #[async_trait]
    impl SourceAcquirer for UnreachableAcquirer {
        async fn fetch(&self, source: &SourceDescriptor, _workspace: &Path) -> Result<FetchOutput> {
            Err(pipeline_error!(acquisition, source.location, "connection refused"))
        }
    }

    #[tokio::test]
    async fn test_end_to_end_scenario_with_mock_backend() {
        let output = TempDir::new().unwrap();
        let docs = docs_dir(&[("intro.md", SCENARIO)]);
        let pipeline = pipeline(&output);

        let fetched = pipeline.fetch(local(&docs)).await.unwrap();
        assert_eq!(fetched.stage, Stage::Fetched);
        assert_eq!(fetched.progress, progress::FETCHED);

        let parsed = pipeline.parse(&fetched.id).await.unwrap();
        assert_eq!(parsed.stage, Stage::Parsed);
        assert_eq!(parsed.progress, progress::PARSED);

        let translated = pipeline.translate(&fetched.id, "en", "es").await.unwrap();
        assert_eq!(translated.stage, Stage::Translated);
        assert_eq!(translated.progress, progress::TRANSLATED);
        let document = &translated.translated_documents.as_ref().unwrap()[0];
        assert_eq!(document.translation.as_ref().unwrap().outcome, DocumentOutcome::Fallback);
        for block in &document.blocks {
            match block.kind {
                BlockKind::Text => assert_eq!(
                    block.translation,
                    Some(TranslationState::Fallback(format!("[ES] {}", block.content)))
                ),
                BlockKind::Code => {
                    assert_eq!(block.content, "```py\nprint(1)\n```");
                    assert!(block.translation.is_none());
                }
            }
        }

        let built = pipeline.build(&fetched.id, Some("demo"), true).await.unwrap();
        assert_eq!(built.stage, Stage::Completed);
        assert_eq!(built.progress, progress::COMPLETED);

        let site_dir = output.path().join("output").join("sites").join("demo").join("es");
        let page = fs::read_to_string(site_dir.join("intro.html")).unwrap();
        assert!(page.contains("<p>[ES] Hello world.</p>"));
        assert!(page.contains("<pre><code class=\"language-py\">print(1)</code></pre>"));
        let index = fs::read_to_string(site_dir.join("index.html")).unwrap();
        assert!(index.contains("href=\"intro.html\""));

        let package = built.package_result.unwrap();
        assert_eq!(package.archive_name, "demo_es_docs.zip");
        assert!(package.archive_path.is_file());
    }

    #[tokio::test]
    async fn test_translate_without_parse_matches_explicit_parse() {
        let docs = docs_dir(&[
            ("a.md", "---\ntitle: Alpha\n---\nFirst `x` para.\n\nSecond para."),
            ("b/c.rst", "Text::\n\n    literal\n\nAfter."),
            ("d.txt", "Plain words"),
        ]);

        let explicit_out = TempDir::new().unwrap();
        let explicit = pipeline(&explicit_out).with_backend(Arc::new(UppercaseBackend::default()));
        let id = explicit.fetch(local(&docs)).await.unwrap().id;
        explicit.parse(&id).await.unwrap();
        let a = explicit.translate(&id, "en", "fr").await.unwrap();

        let implicit_out = TempDir::new().unwrap();
        let implicit = pipeline(&implicit_out).with_backend(Arc::new(UppercaseBackend::default()));
        let id = implicit.fetch(local(&docs)).await.unwrap().id;
        let b = implicit.translate(&id, "en", "fr").await.unwrap();

        assert_eq!(b.stage, Stage::Translated);
        assert_eq!(a.translated_documents, b.translated_documents);
        assert_eq!(a.parsed_documents, b.parsed_documents);
        let paths: Vec<_> = b
            .parsed_documents
            .unwrap()
            .into_iter()
            .map(|d| d.file_path)
            .collect();
        assert_eq!(paths, vec!["a.md", "b/c.rst", "d.txt"]);
    }

    #[tokio::test]
    async fn test_unreachable_source_sets_error_stage() {
        let output = TempDir::new().unwrap();
        let pipeline = pipeline(&output).with_acquirer(Arc::new(UnreachableAcquirer));
        let source = SourceDescriptor::new("https://unreachable.invalid/docs", SourceKind::Website);

        let err = pipeline.fetch(source.clone()).await.unwrap_err();
        assert_eq!(err.kind(), "acquisition");

        let id = derive_project_id(&source.location, false);
        let status = pipeline.get_status(&id).await.unwrap();
        assert_eq!(status.stage, Stage::Error);
        assert!(status.message.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_missing_local_directory_sets_error_stage() {
        let output = TempDir::new().unwrap();
        let pipeline = pipeline(&output);
        let source = SourceDescriptor::new("/no/such/docs/dir", SourceKind::Local);

        assert!(pipeline.fetch(source.clone()).await.is_err());
        let projects = pipeline.list_projects().await;
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].stage, Stage::Error);
    }

    #[tokio::test]
    async fn test_build_before_translate_is_precondition_error() {
        let output = TempDir::new().unwrap();
        let docs = docs_dir(&[("a.md", "Hello there")]);
        let pipeline = pipeline(&output);
        let id = pipeline.fetch(local(&docs)).await.unwrap().id;

        let err = pipeline.build(&id, None, false).await.unwrap_err();
        match err {
            PipelineError::Precondition { requested, missing, .. } => {
                assert_eq!(requested, Stage::Building);
                assert_eq!(missing, Stage::Translated);
            }
            other => panic!("Wrong error type: {:?}", other),
        }
        assert_eq!(pipeline.get_status(&id).await.unwrap().stage, Stage::Fetched);
    }

    #[tokio::test]
    async fn test_translate_empty_source_is_precondition_error() {
        let output = TempDir::new().unwrap();
        let docs = docs_dir(&[]);
        let pipeline = pipeline(&output);
        let id = pipeline.fetch(local(&docs)).await.unwrap().id;

        let err = pipeline.translate(&id, "en", "es").await.unwrap_err();
        assert!(matches!(err, PipelineError::Precondition { missing: Stage::Parsed, .. }));
    }

    #[tokio::test]
    async fn test_translation_failure_is_isolated_per_document() {
        let output = TempDir::new().unwrap();
        let docs = docs_dir(&[("a.txt", "boom text"), ("b.txt", "fine text")]);
        let pipeline = pipeline(&output).with_backend(Arc::new(FailingBackend { trigger: "boom" }));
        let id = pipeline.fetch(local(&docs)).await.unwrap().id;

        let project = pipeline.translate(&id, "en", "de").await.unwrap();
        assert_eq!(project.translation_errors.len(), 1);
        assert_eq!(project.translation_errors[0].path, "a.txt");

        let built = pipeline.build(&id, Some("iso"), false).await.unwrap();
        let build = built.build_result.unwrap();
        assert_eq!(build.pages.len(), 1);
        assert_eq!(build.skipped, vec!["a.txt".to_string()]);
        assert!(built.package_result.is_none());
    }

    #[tokio::test]
    async fn test_invalid_language_and_unknown_project() {
        let output = TempDir::new().unwrap();
        let pipeline = pipeline(&output);

        let err = pipeline.translate("whatever", "en", "xx").await.unwrap_err();
        assert_eq!(err.kind(), "input_validation");

        let err = pipeline.parse("missing_project").await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn test_parse_cap_and_progress_monotonic() {
        let output = TempDir::new().unwrap();
        let docs = docs_dir(&[("1.md", "one"), ("2.md", "two"), ("3.md", "three")]);
        let config = PipelineConfig::new()
            .with_output_dir(output.path().join("output"))
            .with_downloads_dir(output.path().join("downloads"))
            .with_max_parse_files(2)
            .with_mock(true);
        let pipeline = Pipeline::new(config).unwrap();
        let id = pipeline.fetch(local(&docs)).await.unwrap().id;

        pipeline.translate(&id, "en", "es").await.unwrap();
        pipeline.build(&id, None, false).await.unwrap();
        let reparsed = pipeline.parse(&id).await.unwrap();

        assert_eq!(reparsed.parsed_documents.unwrap().len(), 2);
        assert_eq!(reparsed.progress, progress::COMPLETED);
        assert_eq!(reparsed.stage, Stage::Parsed);
        assert!(reparsed.build_result.is_none());
    }

    #[tokio::test]
    async fn test_refetch_resets_project_with_same_id() {
        let output = TempDir::new().unwrap();
        let docs = docs_dir(&[("a.md", "Hello there")]);
        let pipeline = pipeline(&output);

        let first = pipeline.fetch(local(&docs)).await.unwrap();
        pipeline.translate(&first.id, "en", "es").await.unwrap();
        let second = pipeline.fetch(local(&docs)).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.progress, progress::FETCHED);
        assert!(second.translated_documents.is_none());
    }

    #[tokio::test]
    async fn test_build_rejects_project_name_outside_sites_dir() {
        let output = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let keep = outside.path().join("es").join("keep.txt");
        fs::create_dir_all(keep.parent().unwrap()).unwrap();
        fs::write(&keep, "keep").unwrap();

        let docs = docs_dir(&[("a.md", "Hello there")]);
        let pipeline = pipeline(&output);
        let id = pipeline.fetch(local(&docs)).await.unwrap().id;
        pipeline.translate(&id, "en", "es").await.unwrap();

        let absolute = outside.path().display().to_string();
        for name in [absolute.as_str(), "../../escape", "a/b", ".."] {
            let err = pipeline.build(&id, Some(name), false).await.unwrap_err();
            assert_eq!(err.kind(), "input_validation", "name: {}", name);
        }

        assert!(keep.is_file());
        let status = pipeline.get_status(&id).await.unwrap();
        assert_eq!(status.stage, Stage::Translated);
        assert!(status.build_result.is_none());
    }

    #[tokio::test]
    async fn test_reparse_discards_stale_translations() {
        let output = TempDir::new().unwrap();
        let docs = docs_dir(&[("a.md", "Old text")]);
        let pipeline = pipeline(&output);
        let id = pipeline.fetch(local(&docs)).await.unwrap().id;
        pipeline.translate(&id, "en", "es").await.unwrap();
        pipeline.build(&id, Some("demo"), false).await.unwrap();

        fs::write(docs.path().join("a.md"), "New text").unwrap();
        let reparsed = pipeline.parse(&id).await.unwrap();
        assert_eq!(reparsed.stage, Stage::Parsed);
        assert!(reparsed.translated_documents.is_none());
        assert!(reparsed.target_lang.is_none());
        assert!(reparsed.build_result.is_none());

        let err = pipeline.build(&id, Some("demo"), false).await.unwrap_err();
        match err {
            PipelineError::Precondition { requested, missing, .. } => {
                assert_eq!(requested, Stage::Building);
                assert_eq!(missing, Stage::Translated);
            }
            other => panic!("Wrong error type: {:?}", other),
        }

        pipeline.translate(&id, "en", "es").await.unwrap();
        pipeline.build(&id, Some("demo"), false).await.unwrap();
        let page = output.path().join("output/sites/demo/es/a.html");
        let html = fs::read_to_string(page).unwrap();
        assert!(html.contains("[ES] New text"));
        assert!(!html.contains("Old text"));
    }

    #[tokio::test]
    async fn test_retranslate_discards_previous_build() {
        let output = TempDir::new().unwrap();
        let docs = docs_dir(&[("a.md", "Hello there")]);
        let pipeline = pipeline(&output);
        let id = pipeline.fetch(local(&docs)).await.unwrap().id;
        pipeline.translate(&id, "en", "es").await.unwrap();
        pipeline.build(&id, None, true).await.unwrap();

        let retranslated = pipeline.translate(&id, "en", "fr").await.unwrap();
        assert_eq!(retranslated.target_lang.as_deref(), Some("fr"));
        assert!(retranslated.build_result.is_none());
        assert!(retranslated.package_result.is_none());
    }

    #[test]
    fn test_new_rejects_non_http_api_url() {
        let config = PipelineConfig::new().with_api_url("ftp://translator.local/translate");
        let err = Pipeline::new(config).err().unwrap();
        assert_eq!(err.kind(), "input_validation");

        let config = PipelineConfig::new()
            .with_api_url("ftp://translator.local/translate")
            .with_mock(true);
        assert!(Pipeline::new(config).is_ok());
        assert!(Pipeline::new(PipelineConfig::new().with_api_url("http://127.0.0.1:1188/translate")).is_ok());
    }

    #[test]
    fn test_plan_computes_missing_steps() {
        let mut project = Project::new("p", SourceDescriptor::new("/docs", SourceKind::Local));
        let translate = StageRequest::Translate {
            source_lang: "en".to_string(),
            target_lang: "es".to_string(),
        };
        assert!(plan(&project, &translate).is_err());

        project.source_data = Some(FetchOutput {
            kind: SourceKind::Local,
            root: "/docs".into(),
            entries: Vec::new(),
        });
        assert_eq!(plan(&project, &translate).unwrap(), vec![Step::Parse, Step::Translate]);

        project.parsed_documents = Some(Vec::new());
        assert_eq!(plan(&project, &translate).unwrap(), vec![Step::Translate]);
        assert_eq!(plan(&project, &StageRequest::Parse).unwrap(), vec![Step::Parse]);
    }

    #[test]
    fn test_list_languages() {
        let languages = list_languages();
        assert_eq!(languages.len(), 12);
        assert_eq!(languages[0], LanguageInfo { code: "en", name: "English" });
    }
}
