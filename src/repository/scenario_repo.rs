// ==========================================
// 解耦点策略引擎 - 权重方案数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑（校验/锁定判断在 API 层）
// 红线: 激活必须在单个事务中完成
// 红线: 写操作与其操作日志同一事务提交
// ==========================================

use crate::db::{format_datetime, get_datetime};
use crate::domain::action_log::ActionLog;
use crate::domain::factor::FactorWeights;
use crate::domain::scenario::Scenario;
use crate::repository::action_log_repo::insert_log;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    scenario_id, scenario_name, description,
    bullwhip_weight, variability_weight, criticality_weight,
    holding_cost_weight, supplier_reliability_weight, lead_time_weight,
    volume_weight, storage_intensity_weight, moq_rigidity_weight,
    auto_designate_threshold, review_threshold,
    is_active, is_locked, revision, created_at, updated_at
"#;

// ==========================================
// ScenarioRepository - 权重方案仓储
// ==========================================
pub struct ScenarioRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ScenarioRepository {
    /// 创建新的ScenarioRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 新增方案
    ///
    /// # 返回
    /// - `Ok(scenario_id)`
    /// - `Err(UniqueConstraintViolation)`: 名称或激活约束冲突
    pub fn insert(&self, scenario: &Scenario, audit: &ActionLog) -> RepositoryResult<String> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let w = &scenario.weights;

        tx.execute(
            r#"INSERT INTO decoupling_scenario (
                scenario_id, scenario_name, description,
                bullwhip_weight, variability_weight, criticality_weight,
                holding_cost_weight, supplier_reliability_weight, lead_time_weight,
                volume_weight, storage_intensity_weight, moq_rigidity_weight,
                auto_designate_threshold, review_threshold,
                is_active, is_locked, revision, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)"#,
            params![
                &scenario.id,
                &scenario.name,
                &scenario.description,
                w.bullwhip,
                w.variability,
                w.criticality,
                w.holding_cost,
                w.supplier_reliability,
                w.lead_time,
                w.volume,
                w.storage_intensity,
                w.moq_rigidity,
                scenario.auto_designate_threshold,
                scenario.review_threshold,
                scenario.is_active,
                scenario.is_locked,
                scenario.version,
                format_datetime(&scenario.created_at),
                format_datetime(&scenario.updated_at),
            ],
        )?;
        insert_log(&tx, audit)?;

        tx.commit()?;
        Ok(scenario.id.clone())
    }

    /// 按ID查询方案
    pub fn find_by_id(&self, scenario_id: &str) -> RepositoryResult<Option<Scenario>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM decoupling_scenario WHERE scenario_id = ?1",
            SELECT_COLUMNS
        );

        let scenario = conn
            .query_row(&sql, params![scenario_id], map_row)
            .optional()?;
        Ok(scenario)
    }

    /// 查询全部方案（按名称升序）
    pub fn list_all(&self) -> RepositoryResult<Vec<Scenario>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM decoupling_scenario ORDER BY scenario_name",
            SELECT_COLUMNS
        );

        let mut stmt = conn.prepare(&sql)?;
        let scenarios = stmt
            .query_map([], map_row)?
            .collect::<Result<Vec<Scenario>, _>>()?;
        Ok(scenarios)
    }

    /// 查询激活方案
    pub fn find_active(&self) -> RepositoryResult<Option<Scenario>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM decoupling_scenario WHERE is_active = 1",
            SELECT_COLUMNS
        );

        let scenario = conn.query_row(&sql, [], map_row).optional()?;
        Ok(scenario)
    }

    pub fn count(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let n = conn.query_row("SELECT COUNT(*) FROM decoupling_scenario", [], |row| {
            row.get(0)
        })?;
        Ok(n)
    }

    /// 更新方案内容 (带乐观锁检查)
    ///
    /// 只更新名称/说明/权重/阈值，不触碰 is_active / is_locked
    ///
    /// # 错误
    /// - `RepositoryError::OptimisticLockFailure`: revision 不匹配
    /// - `RepositoryError::NotFound`: scenario_id 不存在
    pub fn update(&self, scenario: &Scenario, audit: &ActionLog) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let w = &scenario.weights;

        let rows_affected = tx.execute(
            r#"UPDATE decoupling_scenario
               SET scenario_name = ?1, description = ?2,
                   bullwhip_weight = ?3, variability_weight = ?4, criticality_weight = ?5,
                   holding_cost_weight = ?6, supplier_reliability_weight = ?7,
                   lead_time_weight = ?8, volume_weight = ?9,
                   storage_intensity_weight = ?10, moq_rigidity_weight = ?11,
                   auto_designate_threshold = ?12, review_threshold = ?13,
                   updated_at = ?14, revision = revision + 1
               WHERE scenario_id = ?15 AND revision = ?16"#,
            params![
                &scenario.name,
                &scenario.description,
                w.bullwhip,
                w.variability,
                w.criticality,
                w.holding_cost,
                w.supplier_reliability,
                w.lead_time,
                w.volume,
                w.storage_intensity,
                w.moq_rigidity,
                scenario.auto_designate_threshold,
                scenario.review_threshold,
                format_datetime(&scenario.updated_at),
                &scenario.id,
                scenario.version,
            ],
        )?;

        if rows_affected == 0 {
            return Err(revision_conflict(&tx, &scenario.id, scenario.version));
        }
        insert_log(&tx, audit)?;

        tx.commit()?;
        Ok(())
    }

    /// 设置锁定状态（revision + 1）
    ///
    /// # 返回
    /// - Ok(true): 已更新
    /// - Ok(false): 方案不存在
    pub fn set_locked(
        &self,
        scenario_id: &str,
        locked: bool,
        audit: &ActionLog,
    ) -> RepositoryResult<bool> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let now = format_datetime(&chrono::Local::now().naive_local());

        let rows = tx.execute(
            r#"UPDATE decoupling_scenario
               SET is_locked = ?1, updated_at = ?2, revision = revision + 1
               WHERE scenario_id = ?3"#,
            params![locked, now, scenario_id],
        )?;
        if rows == 0 {
            return Ok(false);
        }
        insert_log(&tx, audit)?;

        tx.commit()?;
        Ok(true)
    }

    /// 删除未锁定且未激活的方案
    ///
    /// 受保护条件写在同一条 DELETE 中，避免“检查后被并发激活”
    ///
    /// # 返回
    /// - 删除行数（0 表示不存在或受保护）
    pub fn delete_unprotected(&self, scenario_id: &str, audit: &ActionLog) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let rows = tx.execute(
            r#"DELETE FROM decoupling_scenario
               WHERE scenario_id = ?1 AND is_active = 0 AND is_locked = 0"#,
            params![scenario_id],
        )?;
        if rows == 0 {
            return Ok(0);
        }
        insert_log(&tx, audit)?;

        tx.commit()?;
        Ok(rows)
    }

    /// 激活方案 (同时取消其他方案激活)
    ///
    /// # 红线
    /// - 必须在事务中完成，确保原子性
    /// - IMMEDIATE 事务：开始即取得写锁，并发激活按提交顺序串行化
    /// - 读者只会看到“旧激活”或“新激活”，不会看到 0 个或 2 个
    ///
    /// # 错误
    /// - `RepositoryError::NotFound`: scenario_id 不存在（事务回滚，原激活方案不变）
    pub fn activate(&self, scenario_id: &str, audit: &ActionLog) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        // 1. 确认目标存在
        let exists: Option<i32> = tx
            .query_row(
                "SELECT 1 FROM decoupling_scenario WHERE scenario_id = ?1",
                params![scenario_id],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(RepositoryError::NotFound {
                entity: "DecouplingScenario".to_string(),
                id: scenario_id.to_string(),
            });
        }

        let now = format_datetime(&chrono::Local::now().naive_local());

        // 2. 取消其他激活方案
        tx.execute(
            r#"UPDATE decoupling_scenario
               SET is_active = 0, updated_at = ?1
               WHERE is_active = 1 AND scenario_id <> ?2"#,
            params![now, scenario_id],
        )?;

        // 3. 激活指定方案
        tx.execute(
            r#"UPDATE decoupling_scenario
               SET is_active = 1, updated_at = ?1
               WHERE scenario_id = ?2"#,
            params![now, scenario_id],
        )?;

        // 4. 操作日志
        insert_log(&tx, audit)?;

        tx.commit()?;
        Ok(())
    }
}

/// 更新 0 行时区分“记录不存在”与“revision 冲突”
fn revision_conflict(conn: &Connection, scenario_id: &str, expected: i32) -> RepositoryError {
    let actual: Result<Option<i32>, _> = conn
        .query_row(
            "SELECT revision FROM decoupling_scenario WHERE scenario_id = ?1",
            params![scenario_id],
            |row| row.get(0),
        )
        .optional();

    match actual {
        Ok(Some(actual)) => RepositoryError::OptimisticLockFailure {
            scenario_id: scenario_id.to_string(),
            expected,
            actual,
        },
        Ok(None) => RepositoryError::NotFound {
            entity: "DecouplingScenario".to_string(),
            id: scenario_id.to_string(),
        },
        Err(e) => e.into(),
    }
}

/// 映射数据库行到Scenario对象
fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Scenario> {
    Ok(Scenario {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        weights: FactorWeights {
            bullwhip: row.get(3)?,
            variability: row.get(4)?,
            criticality: row.get(5)?,
            holding_cost: row.get(6)?,
            supplier_reliability: row.get(7)?,
            lead_time: row.get(8)?,
            volume: row.get(9)?,
            storage_intensity: row.get(10)?,
            moq_rigidity: row.get(11)?,
        },
        auto_designate_threshold: row.get(12)?,
        review_threshold: row.get(13)?,
        is_active: row.get(14)?,
        is_locked: row.get(15)?,
        version: row.get(16)?,
        created_at: get_datetime(row, 17)?,
        updated_at: get_datetime(row, 18)?,
    })
}
