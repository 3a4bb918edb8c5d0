// ==========================================
// 解耦点策略引擎 - 引擎层
// ==========================================
// 红线: 引擎不访问数据库，不修改输入
// ==========================================

pub mod comparison;
pub mod decision;
pub mod scoring;
pub mod validator;

pub use comparison::{compare_scenarios, ComparisonChange, ComparisonRow, ScenarioComparison};
pub use decision::{
    ClassificationResult, DecisionEngine, InvalidScoreError, OutcomeCounts, PartitionedResult,
};
pub use scoring::{composite_score, FactorScores};
pub use validator::{ScenarioValidator, ValidationError, WEIGHT_SUM_TOLERANCE};
