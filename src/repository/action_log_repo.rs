// ==========================================
// 解耦点策略引擎 - 操作日志数据仓储
// ==========================================
// 红线: 所有写入必须记录
// 红线: Repository 不做业务逻辑,只做数据映射
// ==========================================

use crate::db::{format_datetime, get_datetime};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str =
    "action_id, action_type, action_ts, actor, target_id, payload_json, detail";

// ==========================================
// ActionLogRepository - 操作日志仓储
// ==========================================
pub struct ActionLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ActionLogRepository {
    /// 创建新的操作日志仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入操作日志
    ///
    /// # 返回
    /// - `Ok(action_id)`: 成功插入
    pub fn insert(&self, log: &ActionLog) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        insert_log(&conn, log)?;
        Ok(log.action_id.clone())
    }

    pub fn find_by_id(&self, action_id: &str) -> RepositoryResult<Option<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM action_log WHERE action_id = ?1", SELECT_COLUMNS);
        let log = conn.query_row(&sql, params![action_id], map_row).optional()?;
        Ok(log)
    }

    /// 查询某对象的操作日志（按时间倒序）
    pub fn find_by_target(&self, target_id: &str) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM action_log WHERE target_id = ?1 ORDER BY action_ts DESC, rowid DESC",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params![target_id], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(logs)
    }

    /// 查询最近的操作日志
    pub fn list_recent(&self, limit: usize) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM action_log ORDER BY action_ts DESC, rowid DESC LIMIT ?1",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params![limit as i64], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(logs)
    }
}

/// 在调用方的连接/事务上写入操作日志
///
/// 业务写入与日志写入共用同一事务，日志失败时业务写入一并回滚
pub(crate) fn insert_log(conn: &Connection, log: &ActionLog) -> RepositoryResult<()> {
    conn.execute(
        r#"INSERT INTO action_log (
            action_id, action_type, action_ts, actor, target_id, payload_json, detail
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
        params![
            log.action_id,
            log.action_type.as_str(),
            format_datetime(&log.action_ts),
            log.actor,
            log.target_id,
            log.payload_json.as_ref().map(|v| v.to_string()),
            log.detail,
        ],
    )?;
    Ok(())
}

fn map_row(row: &rusqlite::Row) -> rusqlite::Result<ActionLog> {
    let raw_type: String = row.get(1)?;
    let action_type = ActionType::parse(&raw_type).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            format!("unknown action_type: {}", raw_type).into(),
        )
    })?;

    let payload_json = match row.get::<_, Option<String>>(5)? {
        Some(raw) => Some(serde_json::from_str(&raw).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?),
        None => None,
    };

    Ok(ActionLog {
        action_id: row.get(0)?,
        action_type,
        action_ts: get_datetime(row, 2)?,
        actor: row.get(3)?,
        target_id: row.get(4)?,
        payload_json,
        detail: row.get(6)?,
    })
}
