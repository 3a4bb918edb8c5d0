// ==========================================
// 解耦点策略引擎 - 配置管理器
// ==========================================
// 职责: 策略参数加载、查询、覆写
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::policy_config_trait::{ConfigResult, PolicyConfigReader};
use crate::db::{format_datetime, open_sqlite_connection};
use crate::domain::scenario::{DEFAULT_AUTO_DESIGNATE_THRESHOLD, DEFAULT_REVIEW_THRESHOLD};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// 默认缓冲配置ID（目录未给出时使用）
pub const DEFAULT_BUFFER_PROFILE_ID: &str = "BP_DEFAULT";

/// 单次自动指定最多处理的产品-地点对数量
pub const DEFAULT_AUTO_DESIGNATION_BATCH_SIZE: usize = 500;

const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        crate::db::ensure_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![GLOBAL_SCOPE, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        if key.trim().is_empty() {
            return Err("配置键不能为空".into());
        }

        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        let now = format_datetime(&chrono::Local::now().naive_local());
        conn.execute(
            r#"INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES (?1, ?2, ?3, ?4)
               ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = ?4"#,
            params![GLOBAL_SCOPE, key, value, now],
        )?;

        tracing::info!(config_key = key, value = value, "配置已更新");
        Ok(())
    }

    /// 获取 global scope 全部配置的快照
    pub fn get_config_snapshot(&self) -> ConfigResult<BTreeMap<String, String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;
        let snapshot = stmt
            .query_map(params![GLOBAL_SCOPE], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        Ok(snapshot)
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> ConfigResult<String> {
        Ok(self
            .get_config_value(key)?
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| default.to_string()))
    }

    /// 读取数值配置，格式错误时回退默认值并告警
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> ConfigResult<T>
    where
        T: std::str::FromStr + std::fmt::Display + Copy,
    {
        let raw = match self.get_config_value(key)? {
            Some(v) => v,
            None => return Ok(default),
        };

        match raw.trim().parse::<T>() {
            Ok(v) => Ok(v),
            Err(_) => {
                tracing::warn!(
                    config_key = key,
                    raw_value = %raw,
                    default = %default,
                    "配置格式错误，使用默认值"
                );
                Ok(default)
            }
        }
    }
}

// ==========================================
// PolicyConfigReader Trait 实现
// ==========================================
#[async_trait]
impl PolicyConfigReader for ConfigManager {
    async fn get_default_auto_designate_threshold(&self) -> ConfigResult<f64> {
        self.get_parsed_or_default(
            config_keys::DEFAULT_AUTO_DESIGNATE_THRESHOLD,
            DEFAULT_AUTO_DESIGNATE_THRESHOLD,
        )
    }

    async fn get_default_review_threshold(&self) -> ConfigResult<f64> {
        self.get_parsed_or_default(
            config_keys::DEFAULT_REVIEW_THRESHOLD,
            DEFAULT_REVIEW_THRESHOLD,
        )
    }

    async fn get_default_buffer_profile_id(&self) -> ConfigResult<String> {
        self.get_config_or_default(
            config_keys::DEFAULT_BUFFER_PROFILE_ID,
            DEFAULT_BUFFER_PROFILE_ID,
        )
    }

    async fn get_auto_designation_batch_size(&self) -> ConfigResult<usize> {
        let size = self.get_parsed_or_default(
            config_keys::AUTO_DESIGNATION_BATCH_SIZE,
            DEFAULT_AUTO_DESIGNATION_BATCH_SIZE,
        )?;
        // 0 视为未配置
        Ok(if size == 0 {
            DEFAULT_AUTO_DESIGNATION_BATCH_SIZE
        } else {
            size
        })
    }
}

/// 获取默认数据库路径
///
/// # 返回
/// - 环境变量 DECOUPLING_POLICY_DB_PATH（非空时）
/// - 否则: 用户数据目录/decoupling-policy/decoupling_policy.db
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var("DECOUPLING_POLICY_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./decoupling_policy.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("decoupling-policy");
        // 目录创建失败时由打开连接报错
        std::fs::create_dir_all(&dir).ok();
        path = dir.join("decoupling_policy.db");
    }

    path.to_string_lossy().to_string()
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 新建方案的默认阈值
    pub const DEFAULT_AUTO_DESIGNATE_THRESHOLD: &str = "default_auto_designate_threshold";
    pub const DEFAULT_REVIEW_THRESHOLD: &str = "default_review_threshold";

    // 自动指定
    pub const DEFAULT_BUFFER_PROFILE_ID: &str = "default_buffer_profile_id";
    pub const AUTO_DESIGNATION_BATCH_SIZE: &str = "auto_designation_batch_size";
}
