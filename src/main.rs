// ==========================================
// 解耦点策略引擎 - 命令行入口
// ==========================================
// 用法: decoupling-policy [scores.csv]
// - 初始化数据库与默认方案
// - 指定评分文件时执行自动指定
// - 输出按地点汇总（JSON）
// ==========================================

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use decoupling_policy::config::{get_default_db_path, ConfigManager};
use decoupling_policy::db::{ensure_schema, open_sqlite_connection};
use decoupling_policy::repository::{
    ActionLogRepository, DesignationRepository, ScenarioRepository, SqlitePairCatalog,
};
use decoupling_policy::{logging, AutoDesignationJob, DesignationApi, ScenarioApi};

const CLI_ACTOR: &str = "cli";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} v{}", decoupling_policy::APP_NAME, decoupling_policy::VERSION);
    tracing::info!("==================================================");

    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);

    let conn = open_sqlite_connection(&db_path)
        .with_context(|| format!("无法打开数据库: {}", db_path))?;
    ensure_schema(&conn).context("数据库建表失败")?;
    let conn = Arc::new(Mutex::new(conn));

    let config = Arc::new(
        ConfigManager::from_connection(conn.clone())
            .map_err(|e| anyhow::anyhow!("配置管理器初始化失败: {}", e))?,
    );
    let scenario_api = Arc::new(ScenarioApi::new(
        Arc::new(ScenarioRepository::new(conn.clone())),
        Arc::new(ActionLogRepository::new(conn.clone())),
    ));
    let designation_api = Arc::new(DesignationApi::new(
        Arc::new(DesignationRepository::new(conn.clone())),
        Arc::new(SqlitePairCatalog::new(conn.clone())),
    ));

    if let Some(created) = scenario_api
        .ensure_default_scenario(&*config, CLI_ACTOR)
        .await?
    {
        tracing::info!("已创建默认方案: {}", created.name);
    }

    if let Some(path) = std::env::args().nth(1).map(PathBuf::from) {
        let job = AutoDesignationJob::new(config, scenario_api, designation_api.clone());
        let summary = job
            .run_file(&path, CLI_ACTOR)
            .await
            .with_context(|| format!("自动指定失败: {}", path.display()))?;
        tracing::info!(
            "自动指定完成: 分级 {} 个, 新增 {} 个, 待复核 {} 个, 拒绝 {} 个",
            summary.total_analyzed,
            summary.auto_designated,
            summary.review_required,
            summary.auto_rejected
        );
    }

    let summary = designation_api.summary_by_location()?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
