// ==========================================
// 解耦点策略引擎 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 统一建表（幂等），保证单激活方案约束落到数据库层
// ==========================================

use chrono::NaiveDateTime;
use rusqlite::{Connection, OptionalExtension, Row};
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 时间字段统一存储格式
pub const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 建表（幂等）
///
/// - decoupling_scenario: 权重方案；部分唯一索引保证至多一个 is_active = 1
/// - decoupling_point: 战略解耦点；(product_id, location_id) 唯一
/// - product_location_pair: 产品-地点目录（由外部系统同步）
/// - config_kv / action_log / schema_version
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS decoupling_scenario (
            scenario_id TEXT PRIMARY KEY,
            scenario_name TEXT NOT NULL UNIQUE,
            description TEXT,
            bullwhip_weight REAL NOT NULL,
            variability_weight REAL NOT NULL,
            criticality_weight REAL NOT NULL,
            holding_cost_weight REAL NOT NULL,
            supplier_reliability_weight REAL NOT NULL,
            lead_time_weight REAL NOT NULL,
            volume_weight REAL NOT NULL,
            storage_intensity_weight REAL NOT NULL,
            moq_rigidity_weight REAL NOT NULL,
            auto_designate_threshold REAL NOT NULL,
            review_threshold REAL NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 0 CHECK(is_active IN (0, 1)),
            is_locked INTEGER NOT NULL DEFAULT 0 CHECK(is_locked IN (0, 1)),
            revision INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS uq_decoupling_scenario_single_active
            ON decoupling_scenario(is_active) WHERE is_active = 1;

        CREATE TABLE IF NOT EXISTS product_location_pair (
            product_id TEXT NOT NULL,
            location_id TEXT NOT NULL,
            buffer_profile_id TEXT,
            PRIMARY KEY (product_id, location_id)
        );

        CREATE TABLE IF NOT EXISTS decoupling_point (
            record_id TEXT PRIMARY KEY,
            product_id TEXT NOT NULL,
            location_id TEXT NOT NULL,
            buffer_profile_id TEXT NOT NULL,
            is_strategic INTEGER NOT NULL DEFAULT 1,
            designation_reason TEXT,
            source TEXT NOT NULL CHECK(source IN ('MANUAL', 'AUTO')),
            created_at TEXT NOT NULL,
            UNIQUE(product_id, location_id)
        );

        CREATE INDEX IF NOT EXISTS idx_decoupling_point_location
            ON decoupling_point(location_id);

        CREATE TABLE IF NOT EXISTS action_log (
            action_id TEXT PRIMARY KEY,
            action_type TEXT NOT NULL,
            action_ts TEXT NOT NULL,
            actor TEXT NOT NULL,
            target_id TEXT,
            payload_json TEXT,
            detail TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_action_log_ts ON action_log(action_ts DESC);
        CREATE INDEX IF NOT EXISTS idx_action_log_target ON action_log(target_id);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 读取时间列（DATETIME_FMT 格式）
pub fn get_datetime(row: &Row, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&raw, DATETIME_FMT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub fn format_datetime(ts: &NaiveDateTime) -> String {
    ts.format(DATETIME_FMT).to_string()
}
