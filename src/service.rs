//! 项目接口
//!
//! 对流水线操作的统一封装：每个操作返回 `{status: success|error, ...}`
//! 形式的JSON信封，成功时附带项目标识和结果，失败时附带错误类型和消息。

// 第三方crate导入
use serde::Serialize;
use serde_json::{json, Value};

// 本地模块导入
use crate::error::{PipelineError, Result};
use crate::pipeline::{list_languages, Pipeline};
use crate::project::{FetchOptions, Project, SourceDescriptor, SourceKind};
use crate::utils::detect_source_kind;

/// 面向调用方的项目接口
pub struct DocsService {
    pipeline: Pipeline,
}

fn success(payload: Value) -> Value {
    let mut envelope = json!({ "status": "success" });
    if let (Some(target), Value::Object(fields)) = (envelope.as_object_mut(), payload) {
        target.extend(fields);
    }
    envelope
}

fn failure(error: &PipelineError, project_id: Option<&str>) -> Value {
    let mut envelope = json!({
        "status": "error",
        "error_type": error.kind(),
        "message": error.to_string(),
    });
    if let (Some(id), Some(fields)) = (project_id, envelope.as_object_mut()) {
        fields.insert("project_id".to_string(), json!(id));
    }
    envelope
}

fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn envelope(result: Result<Value>, project_id: Option<&str>) -> Value {
    match result {
        Ok(payload) => success(payload),
        Err(e) => failure(&e, project_id),
    }
}

impl DocsService {
    pub fn new(pipeline: Pipeline) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// 抓取文档源，`kind` 为空时自动检测
    pub async fn fetch(&self, source: &str, kind: Option<&str>, options: FetchOptions) -> Value {
        let kind = match kind {
            Some(kind) => match kind.parse::<SourceKind>() {
                Ok(kind) => kind,
                Err(reason) => {
                    let error = PipelineError::InputValidation {
                        input: kind.to_string(),
                        reason,
                    };
                    return failure(&error, None);
                }
            },
            None => detect_source_kind(source),
        };

        let descriptor = SourceDescriptor::new(source, kind).with_options(options);
        match self.pipeline.fetch(descriptor.clone()).await {
            Ok(project) => success(fetch_payload(&project)),
            Err(e) => {
                // 失败的抓取同样生成项目记录
                let project_id = self
                    .pipeline
                    .list_projects()
                    .await
                    .into_iter()
                    .find(|p| p.source == descriptor.location)
                    .map(|p| p.project_id);
                failure(&e, project_id.as_deref())
            }
        }
    }

    pub async fn parse(&self, project_id: &str) -> Value {
        let result = self.pipeline.parse(project_id).await.map(|project| {
            json!({
                "project_id": project.id,
                "stage": project.stage,
                "documents_parsed": project.parsed_documents.as_ref().map(Vec::len).unwrap_or(0),
                "total_blocks": project.parsed_block_count(),
                "parse_errors": project.parse_errors,
            })
        });
        envelope(result, Some(project_id))
    }

    pub async fn translate(&self, project_id: &str, source_lang: &str, target_lang: &str) -> Value {
        let result = self
            .pipeline
            .translate(project_id, source_lang, target_lang)
            .await
            .map(|project| {
                let documents = project.translated_documents.as_deref().unwrap_or_default();
                let fallback = documents
                    .iter()
                    .filter(|d| {
                        matches!(
                            d.translation.as_ref().map(|t| &t.outcome),
                            Some(crate::document::DocumentOutcome::Fallback)
                        )
                    })
                    .count();
                json!({
                    "project_id": project.id,
                    "stage": project.stage,
                    "source_lang": source_lang,
                    "target_lang": target_lang,
                    "documents_translated": documents.iter().filter(|d| d.has_translated_content()).count(),
                    "fallback_documents": fallback,
                    "translation_errors": project.translation_errors,
                })
            });
        envelope(result, Some(project_id))
    }

    pub async fn build(&self, project_id: &str, project_name: Option<&str>, package: bool) -> Value {
        let result = self
            .pipeline
            .build(project_id, project_name, package)
            .await
            .map(|project| {
                json!({
                    "project_id": project.id,
                    "stage": project.stage,
                    "build_result": project.build_result,
                    "package_result": project.package_result,
                })
            });
        envelope(result, Some(project_id))
    }

    pub async fn get_status(&self, project_id: &str) -> Value {
        let result = self
            .pipeline
            .get_status(project_id)
            .await
            .map(|status| to_value(&status));
        envelope(result, Some(project_id))
    }

    pub fn list_languages(&self) -> Value {
        success(json!({ "languages": list_languages() }))
    }

    pub async fn list_projects(&self) -> Value {
        let projects = self.pipeline.list_projects().await;
        success(json!({ "projects": projects }))
    }
}

fn fetch_payload(project: &Project) -> Value {
    let files: Vec<Value> = project
        .source_data
        .as_ref()
        .map(|data| {
            data.entries
                .iter()
                .map(|e| json!({ "path": e.relative_path, "url": e.url, "title": e.title, "size": e.size }))
                .collect()
        })
        .unwrap_or_default();

    json!({
        "project_id": project.id,
        "stage": project.stage,
        "source_kind": project.source.kind,
        "files_found": files.len(),
        "files": files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use std::fs;
    use tempfile::TempDir;

    fn service(output: &TempDir) -> DocsService {
        let config = PipelineConfig::new()
            .with_output_dir(output.path().join("output"))
            .with_downloads_dir(output.path().join("downloads"))
            .with_mock(true);
        DocsService::new(Pipeline::new(config).unwrap())
    }

    #[tokio::test]
    async fn test_envelopes_through_all_stages() {
        let output = TempDir::new().unwrap();
        let docs = TempDir::new().unwrap();
        fs::write(docs.path().join("guide.md"), "# Guide\n\nSome text here.").unwrap();
        let service = service(&output);

        let fetched = service
            .fetch(&docs.path().display().to_string(), None, FetchOptions::default())
            .await;
        assert_eq!(fetched["status"], "success");
        assert_eq!(fetched["source_kind"], "local");
        assert_eq!(fetched["files_found"], 1);
        let id = fetched["project_id"].as_str().unwrap().to_string();

        let translated = service.translate(&id, "en", "ja").await;
        assert_eq!(translated["status"], "success");
        assert_eq!(translated["fallback_documents"], 1);

        let built = service.build(&id, Some("guide"), false).await;
        assert_eq!(built["status"], "success");
        assert_eq!(built["stage"], "completed");

        let status = service.get_status(&id).await;
        assert_eq!(status["stage"], "completed");
        assert_eq!(status["progress"], 100);
        assert_eq!(status["target_lang"], "ja");

        let projects = service.list_projects().await;
        assert_eq!(projects["projects"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_error_envelopes() {
        let output = TempDir::new().unwrap();
        let service = service(&output);

        let missing = service.get_status("nope").await;
        assert_eq!(missing["status"], "error");
        assert_eq!(missing["error_type"], "not_found");
        assert_eq!(missing["project_id"], "nope");

        let bad_kind = service.fetch("./docs", Some("ftp"), FetchOptions::default()).await;
        assert_eq!(bad_kind["status"], "error");
        assert_eq!(bad_kind["error_type"], "input_validation");

        let unreachable = service
            .fetch("/no/such/dir", Some("local"), FetchOptions::default())
            .await;
        assert_eq!(unreachable["status"], "error");
        assert_eq!(unreachable["error_type"], "acquisition");
        let id = unreachable["project_id"].as_str().unwrap();
        assert_eq!(service.get_status(id).await["stage"], "error");
    }

    #[test]
    fn test_list_languages_envelope() {
        let output = TempDir::new().unwrap();
        let languages = service(&output).list_languages();
        assert_eq!(languages["status"], "success");
        assert_eq!(languages["languages"][1]["code"], "es");
    }
}
