// ==========================================
// 解耦点策略引擎 - API 层
// ==========================================
// 职责: 对外暴露带约束检查的业务操作，并记录操作日志
// ==========================================

pub mod auto_designation;
pub mod designation_api;
pub mod error;
pub mod scenario_api;

// 重导出核心类型
pub use auto_designation::{AutoDesignationJob, AutoDesignationSummary};
pub use designation_api::{AutoDesignationOutcome, DesignationApi};
pub use error::{ApiError, ApiResult};
pub use scenario_api::{ScenarioApi, DEFAULT_SCENARIO_NAME};
