// ==========================================
// 解耦点策略引擎 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 决策支持系统 (人工最终控制权)
// 范围: 九因子权重方案 / 评分分级 / 战略解耦点登记
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 引擎层 - 纯策略逻辑（无副作用）
pub mod engine;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 外部评分数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

pub use domain::{
    ActionLog, ActionType, DecisionOutcome, DesignationRecord, DesignationSource, FactorKey,
    FactorWeights, LocationSummary, ProductLocationKey, Scenario, ScenarioPatch, ScoredPair,
};

pub use engine::{
    ClassificationResult, DecisionEngine, FactorScores, InvalidScoreError, PartitionedResult,
    ScenarioValidator, ValidationError,
};

pub use api::{
    ApiError, ApiResult, AutoDesignationJob, AutoDesignationOutcome, AutoDesignationSummary,
    DesignationApi, ScenarioApi,
};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "解耦点策略引擎";
