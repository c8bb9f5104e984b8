// ==========================================
// 库存与采购预测系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误分类，转换Repository错误为面向用户的错误消息
// 分类: Validation / Conflict / NotFound / Internal
// 约束: 存储层原始错误不得越过持久化边界外泄
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
///
/// 变体携带的字符串即对外（西语）契约消息
#[derive(Error, Debug)]
pub enum ApiError {
    // ===== 输入校验错误 =====
    #[error("校验失败: {0}")]
    Validation(String),

    // ===== 唯一性/完整性冲突 =====
    #[error("数据冲突: {0}")]
    Conflict(String),

    // ===== 记录不存在 =====
    #[error("资源未找到: {0}")]
    NotFound(String),

    // ===== 内部错误 =====
    #[error("内部错误: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 对外展示的消息体（即变体内的契约字符串）
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Validation(msg)
            | ApiError::Conflict(msg)
            | ApiError::NotFound(msg)
            | ApiError::Internal(msg) => msg.clone(),
            ApiError::Other(err) => err.to_string(),
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// 目的: 存储层技术错误 → 用户可读的业务错误
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={}) no existe", entity, id))
            }
            RepositoryError::UniqueConstraintViolation(msg)
            | RepositoryError::ForeignKeyViolation(msg)
            | RepositoryError::ConstraintViolation(msg) => ApiError::Conflict(msg),
            RepositoryError::LockError(msg)
            | RepositoryError::DatabaseQueryError(msg)
            | RepositoryError::InternalError(msg) => ApiError::Internal(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
