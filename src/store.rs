//! 项目存储
//!
//! 所有阶段的写入都通过比较并交换完成：写入方提供读取时的版本号，
//! 版本不一致说明同一项目有并发写入，写入被拒绝。

// 标准库导入
use std::collections::HashMap;

// 第三方crate导入
use async_trait::async_trait;
use tokio::sync::RwLock;

// 本地模块导入
use crate::error::{PipelineError, Result};
use crate::project::Project;

/// 项目存储接口
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn get(&self, id: &str) -> Option<Project>;

    /// 无条件写入，返回写入后的版本
    async fn put(&self, project: Project) -> u64;

    /// 按标识排序的全部项目
    async fn list(&self) -> Vec<Project>;

    /// 仅当存储中的版本等于 `expected_version` 时写入
    ///
    /// `expected_version` 为 0 表示期望项目尚不存在。
    async fn compare_and_swap(&self, expected_version: u64, project: Project) -> Result<u64>;
}

/// 进程内的内存存储
#[derive(Debug, Default)]
pub struct MemoryProjectStore {
    projects: RwLock<HashMap<String, Project>>,
}

impl MemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProjectStore for MemoryProjectStore {
    async fn get(&self, id: &str) -> Option<Project> {
        self.projects.read().await.get(id).cloned()
    }

    async fn put(&self, mut project: Project) -> u64 {
        let mut projects = self.projects.write().await;
        let current = projects.get(&project.id).map(|p| p.version).unwrap_or(0);
        project.version = current + 1;
        let version = project.version;
        projects.insert(project.id.clone(), project);
        version
    }

    async fn list(&self) -> Vec<Project> {
        let mut all: Vec<Project> = self.projects.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    async fn compare_and_swap(&self, expected_version: u64, mut project: Project) -> Result<u64> {
        let mut projects = self.projects.write().await;
        let actual = projects.get(&project.id).map(|p| p.version).unwrap_or(0);

        if actual != expected_version {
            return Err(PipelineError::StoreConflict {
                project_id: project.id.clone(),
                expected: expected_version,
                actual,
            });
        }

        project.version = actual + 1;
        let version = project.version;
        projects.insert(project.id.clone(), project);
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{SourceDescriptor, SourceKind};

    fn project(id: &str) -> Project {
        Project::new(id, SourceDescriptor::new("/tmp/docs", SourceKind::Local))
    }

    #[tokio::test]
    async fn test_put_and_get_bump_version() {
        let store = MemoryProjectStore::new();
        assert_eq!(store.put(project("a")).await, 1);
        assert_eq!(store.put(project("a")).await, 2);

        let stored = store.get("a").await.unwrap();
        assert_eq!(stored.version, 2);
        assert!(store.get("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_compare_and_swap_rejects_stale_version() {
        let store = MemoryProjectStore::new();
        assert_eq!(store.compare_and_swap(0, project("a")).await.unwrap(), 1);

        let first = store.get("a").await.unwrap();
        let second = first.clone();

        store.compare_and_swap(first.version, first).await.unwrap();
        let err = store.compare_and_swap(second.version, second).await.unwrap_err();
        match err {
            PipelineError::StoreConflict { expected, actual, .. } => {
                assert_eq!(expected, 1);
                assert_eq!(actual, 2);
            }
            other => panic!("Wrong error type: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_is_sorted() {
        let store = MemoryProjectStore::new();
        store.put(project("b")).await;
        store.put(project("a")).await;

        let ids: Vec<_> = store.list().await.into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
