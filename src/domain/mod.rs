// ==========================================
// 解耦点策略引擎 - 领域层
// ==========================================
// 职责: 实体与闭集类型定义，不含持久化与业务流程
// ==========================================

pub mod action_log;
pub mod designation;
pub mod factor;
pub mod scenario;
pub mod types;

pub use action_log::{ActionLog, ActionType};
pub use designation::{
    DesignationRecord, LocationSummary, ProductLocationKey, ProductLocationPair, ScoredPair,
};
pub use factor::{factor, Factor, FactorWeights, ScoringBand, FACTOR_CATALOG};
pub use scenario::{
    Scenario, ScenarioPatch, DEFAULT_AUTO_DESIGNATE_THRESHOLD, DEFAULT_REVIEW_THRESHOLD,
};
pub use types::{DecisionOutcome, DesignationSource, FactorKey};
