//! 统一错误处理模块
//!
//! 提供文档翻译流水线的统一错误类型定义和处理机制

// 标准库导入
use std::fmt;

// 第三方crate导入
use anyhow::Error as AnyhowError;

// 本地模块导入
use crate::project::Stage;

/// 流水线统一错误类型
///
/// 单个文件/文档级别的错误（`Parse`、`Translation`）只影响该文件，
/// 阶段级别的错误会中止当前阶段并把项目置为 `error`。
#[derive(Debug)]
pub enum PipelineError {
    /// 文档源不可达或无效
    Acquisition {
        /// 文档源描述（URL或路径）
        source: String,
        /// 错误消息
        message: String,
    },

    /// 单个文件无法读取或格式错误
    Parse {
        /// 文件路径
        path: String,
        /// 具体错误信息
        details: String,
    },

    /// 翻译后端对单个文档失败
    Translation {
        /// 文档路径
        path: String,
        /// 错误消息
        message: String,
    },

    /// 阶段调用顺序错误，缺少前置阶段的输出
    Precondition {
        /// 被请求的阶段
        requested: Stage,
        /// 缺失输出的前置阶段
        missing: Stage,
        /// 补充说明
        reason: String,
    },

    /// 渲染或打包失败
    Build {
        /// 错误消息
        message: String,
    },

    /// 项目不存在
    ProjectNotFound {
        /// 项目标识
        project_id: String,
    },

    /// 输入验证错误
    InputValidation {
        /// 输入值
        input: String,
        /// 验证失败原因
        reason: String,
    },

    /// 项目记录版本冲突（同一项目被并发修改）
    StoreConflict {
        /// 项目标识
        project_id: String,
        /// 期望的版本
        expected: u64,
        /// 实际的版本
        actual: u64,
    },

    /// 文件操作相关错误
    FileOperation {
        /// 文件路径
        path: String,
        /// 操作类型（读取、写入、创建等）
        operation: String,
        /// 底层错误信息
        source: String,
    },

    /// 内部处理错误（包装anyhow::Error）
    Internal {
        /// 包装的错误
        source: AnyhowError,
    },
}

impl PipelineError {
    /// 错误种类名称，用于状态载荷
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Acquisition { .. } => "acquisition",
            PipelineError::Parse { .. } => "parse",
            PipelineError::Translation { .. } => "translation",
            PipelineError::Precondition { .. } => "precondition",
            PipelineError::Build { .. } => "build",
            PipelineError::ProjectNotFound { .. } => "not_found",
            PipelineError::InputValidation { .. } => "input_validation",
            PipelineError::StoreConflict { .. } => "store_conflict",
            PipelineError::FileOperation { .. } => "file_operation",
            PipelineError::Internal { .. } => "internal",
        }
    }

    /// 把自动串联的前置阶段错误转换为翻译失败，并加上来源阶段前缀
    pub fn with_origin(self, origin: Stage) -> Self {
        match self {
            PipelineError::Translation { path, message } => PipelineError::Translation {
                path,
                message: format!("[{}] {}", origin, message),
            },
            other => PipelineError::Translation {
                path: String::new(),
                message: format!("[{}] {}", origin, other),
            },
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Acquisition { source, message } => {
                write!(f, "文档源获取失败 [{}]: {}", source, message)
            }
            PipelineError::Parse { path, details } => {
                write!(f, "文档解析失败 [{}]: {}", path, details)
            }
            PipelineError::Translation { path, message } => {
                if path.is_empty() {
                    write!(f, "翻译失败: {}", message)
                } else {
                    write!(f, "翻译失败 [{}]: {}", path, message)
                }
            }
            PipelineError::Precondition { requested, missing, reason } => {
                write!(f, "无法执行{}阶段，缺少{}阶段的输出: {}", requested, missing, reason)
            }
            PipelineError::Build { message } => {
                write!(f, "站点构建失败: {}", message)
            }
            PipelineError::ProjectNotFound { project_id } => {
                write!(f, "项目不存在: {}", project_id)
            }
            PipelineError::InputValidation { input, reason } => {
                write!(f, "输入验证失败 [{}]: {}", input, reason)
            }
            PipelineError::StoreConflict { project_id, expected, actual } => {
                write!(
                    f,
                    "项目记录已被并发修改 [{}]: 期望版本 {}，实际版本 {}",
                    project_id, expected, actual
                )
            }
            PipelineError::FileOperation { path, operation, source } => {
                write!(f, "文件{}操作失败 [{}]: {}", operation, path, source)
            }
            PipelineError::Internal { source } => {
                write!(f, "内部处理错误: {}", source)
            }
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Internal { source } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// 流水线结果类型别名
pub type Result<T> = std::result::Result<T, PipelineError>;

/// 便捷的错误创建宏
#[macro_export]
macro_rules! pipeline_error {
    (acquisition, $source:expr, $msg:expr) => {
        $crate::error::PipelineError::Acquisition {
            source: $source.to_string(),
            message: $msg.to_string(),
        }
    };
    (parse, $path:expr, $details:expr) => {
        $crate::error::PipelineError::Parse {
            path: $path.to_string(),
            details: $details.to_string(),
        }
    };
    (translation, $path:expr, $msg:expr) => {
        $crate::error::PipelineError::Translation {
            path: $path.to_string(),
            message: $msg.to_string(),
        }
    };
    (precondition, $requested:expr, $missing:expr, $reason:expr) => {
        $crate::error::PipelineError::Precondition {
            requested: $requested,
            missing: $missing,
            reason: $reason.to_string(),
        }
    };
    (build, $msg:expr) => {
        $crate::error::PipelineError::Build {
            message: $msg.to_string(),
        }
    };
    (file_op, $path:expr, $op:expr, $source:expr) => {
        $crate::error::PipelineError::FileOperation {
            path: $path.to_string(),
            operation: $op.to_string(),
            source: $source.to_string(),
        }
    };
    (input_validation, $input:expr, $reason:expr) => {
        $crate::error::PipelineError::InputValidation {
            input: $input.to_string(),
            reason: $reason.to_string(),
        }
    };
}

/// 从anyhow::Error转换为PipelineError
impl From<AnyhowError> for PipelineError {
    fn from(error: AnyhowError) -> Self {
        PipelineError::Internal { source: error }
    }
}

/// 从std::io::Error转换为PipelineError
impl From<std::io::Error> for PipelineError {
    fn from(error: std::io::Error) -> Self {
        PipelineError::FileOperation {
            path: "unknown".to_string(),
            operation: "io".to_string(),
            source: error.to_string(),
        }
    }
}
