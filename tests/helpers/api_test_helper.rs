// ==========================================
// API集成测试辅助工具
// ==========================================
// 职责: 提供API层集成测试的通用辅助函数
// ==========================================

#[path = "../test_helpers.rs"]
mod test_helpers;

pub use test_helpers::{draft, draft_with_overweight};

use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

use decoupling_policy::api::{DesignationApi, ScenarioApi};
use decoupling_policy::config::ConfigManager;
use decoupling_policy::db::{ensure_schema, open_sqlite_connection};
use decoupling_policy::domain::ProductLocationPair;
use decoupling_policy::repository::{
    ActionLogRepository, DesignationRepository, ScenarioRepository, SqlitePairCatalog,
};

// ==========================================
// API测试环境
// ==========================================

/// API测试环境
///
/// 所有仓储共享同一个连接
pub struct ApiTestEnv {
    pub db_path: String,
    pub scenario_api: Arc<ScenarioApi>,
    pub designation_api: Arc<DesignationApi>,
    pub config: Arc<ConfigManager>,

    // Repository层（用于测试数据准备与结果核对）
    pub scenario_repo: Arc<ScenarioRepository>,
    pub designation_repo: Arc<DesignationRepository>,
    pub catalog: Arc<SqlitePairCatalog>,
    pub action_log_repo: Arc<ActionLogRepository>,

    // 临时文件（确保生命周期）
    _temp_file: NamedTempFile,
}

impl ApiTestEnv {
    /// 创建新的API测试环境
    pub fn new() -> Result<Self, String> {
        let (temp_file, db_path) = test_helpers::create_test_db()
            .map_err(|e| format!("创建测试数据库失败: {}", e))?;

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        let scenario_repo = Arc::new(ScenarioRepository::new(conn.clone()));
        let designation_repo = Arc::new(DesignationRepository::new(conn.clone()));
        let catalog = Arc::new(SqlitePairCatalog::new(conn.clone()));
        let action_log_repo = Arc::new(ActionLogRepository::new(conn.clone()));
        let config = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        let scenario_api = Arc::new(ScenarioApi::new(
            scenario_repo.clone(),
            action_log_repo.clone(),
        ));
        let designation_api = Arc::new(DesignationApi::new(
            designation_repo.clone(),
            catalog.clone(),
        ));

        Ok(Self {
            db_path,
            scenario_api,
            designation_api,
            config,
            scenario_repo,
            designation_repo,
            catalog,
            action_log_repo,
            _temp_file: temp_file,
        })
    }

    /// 向产品-地点目录写入测试数据
    pub fn seed_catalog(&self, pairs: &[(&str, &str, Option<&str>)]) {
        for (product_id, location_id, profile) in pairs {
            self.catalog
                .upsert(&ProductLocationPair {
                    product_id: product_id.to_string(),
                    location_id: location_id.to_string(),
                    buffer_profile_id: profile.map(|p| p.to_string()),
                })
                .expect("写入目录失败");
        }
    }

    /// 当前激活方案数量
    pub fn active_count(&self) -> usize {
        self.scenario_repo
            .list_all()
            .expect("查询方案失败")
            .iter()
            .filter(|s| s.is_active)
            .count()
    }

    /// 通过独立连接删除 action_log 表，使后续操作日志写入失败
    pub fn drop_action_log_table(&self) {
        let conn = open_sqlite_connection(&self.db_path).expect("无法打开数据库");
        conn.execute_batch("DROP TABLE action_log")
            .expect("删除 action_log 失败");
    }

    /// 重新建表（恢复操作日志写入）
    pub fn restore_action_log_table(&self) {
        let conn = open_sqlite_connection(&self.db_path).expect("无法打开数据库");
        ensure_schema(&conn).expect("重建 schema 失败");
    }
}
