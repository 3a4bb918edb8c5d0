// ==========================================
// 解耦点策略引擎 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 约束: 所有仓储共享同一个 Arc<Mutex<Connection>>，写操作串行化
// ==========================================

pub mod action_log_repo;
pub mod catalog_repo;
pub mod designation_repo;
pub mod error;
pub mod scenario_repo;

// 重导出核心仓储
pub use action_log_repo::ActionLogRepository;
pub use catalog_repo::{PairCatalog, SqlitePairCatalog};
pub use designation_repo::{BatchInsertResult, DesignationRepository};
pub use error::{RepositoryError, RepositoryResult};
pub use scenario_repo::ScenarioRepository;
