// ==========================================
// 解耦点策略引擎 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换Repository错误为用户可读的错误消息
// 红线: 错误必须指明被违反的约束，不做静默修正
// ==========================================

use crate::engine::decision::InvalidScoreError;
use crate::engine::validator::ValidationError;
use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 方案约束错误
    // ==========================================
    #[error("方案校验失败: {0}")]
    ValidationFailed(#[from] ValidationError),

    #[error("方案已锁定: {name}(id={scenario_id})，请克隆后修改")]
    LockedScenario { scenario_id: String, name: String },

    #[error("方案处于激活状态: {name}(id={scenario_id})，请先激活其他方案")]
    ActiveScenario { scenario_id: String, name: String },

    #[error("不能直接停用唯一激活方案: {name}(id={scenario_id})，请激活其他方案以替换")]
    CannotDeactivateSoleActive { scenario_id: String, name: String },

    // ==========================================
    // 评分/指定错误
    // ==========================================
    #[error(transparent)]
    InvalidScore(#[from] InvalidScoreError),

    #[error("产品-地点对已指定为解耦点: product_id={product_id}, location_id={location_id}")]
    AlreadyDesignated {
        product_id: String,
        location_id: String,
    },

    #[error("产品-地点对不在目录中: product_id={product_id}, location_id={location_id}")]
    InvalidPair {
        product_id: String,
        location_id: String,
    },

    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    // ==========================================
    // 并发控制错误
    // ==========================================
    #[error("乐观锁冲突: {0}")]
    OptimisticLockFailure(String),

    // ==========================================
    // 基础设施错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("配置读取失败: {0}")]
    ConfigError(String),

    #[error("文件导入失败: {0}")]
    ImportFailed(#[from] ImportError),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::OptimisticLockFailure {
                scenario_id,
                expected,
                actual,
            } => ApiError::OptimisticLockFailure(format!(
                "方案{}已被其他用户修改（期望revision={}，实际revision={}）",
                scenario_id, expected, actual
            )),
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::DatabaseError(format!("唯一约束违反: {}", msg))
            }
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
