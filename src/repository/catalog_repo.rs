// ==========================================
// 解耦点策略引擎 - 产品-地点目录
// ==========================================
// 职责: 校验人工指定的产品-地点对是否存在；提供自动指定所用缓冲配置
// 说明: 目录数据由外部系统维护，本模块只读（upsert 仅用于同步/测试）
// ==========================================

use crate::domain::designation::{ProductLocationKey, ProductLocationPair};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

// ==========================================
// PairCatalog Trait
// ==========================================
// 实现者: SqlitePairCatalog（product_location_pair 表）
pub trait PairCatalog: Send + Sync {
    /// 产品-地点对是否存在于目录
    fn contains(&self, key: &ProductLocationKey) -> RepositoryResult<bool>;

    /// 目录给出的缓冲配置（未配置返回 None）
    fn buffer_profile_for(&self, key: &ProductLocationKey) -> RepositoryResult<Option<String>>;

    /// 全部目录项（按地点、产品排序）
    fn list_pairs(&self) -> RepositoryResult<Vec<ProductLocationPair>>;
}

// ==========================================
// SqlitePairCatalog
// ==========================================
pub struct SqlitePairCatalog {
    conn: Arc<Mutex<Connection>>,
}

impl SqlitePairCatalog {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 同步目录项（存在则更新缓冲配置）
    pub fn upsert(&self, pair: &ProductLocationPair) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO product_location_pair (product_id, location_id, buffer_profile_id)
               VALUES (?1, ?2, ?3)
               ON CONFLICT(product_id, location_id) DO UPDATE SET buffer_profile_id = ?3"#,
            params![&pair.product_id, &pair.location_id, &pair.buffer_profile_id],
        )?;
        Ok(())
    }
}

impl PairCatalog for SqlitePairCatalog {
    fn contains(&self, key: &ProductLocationKey) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let found: Option<i32> = conn
            .query_row(
                "SELECT 1 FROM product_location_pair WHERE product_id = ?1 AND location_id = ?2",
                params![&key.product_id, &key.location_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn buffer_profile_for(&self, key: &ProductLocationKey) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let profile: Option<Option<String>> = conn
            .query_row(
                r#"SELECT buffer_profile_id FROM product_location_pair
                   WHERE product_id = ?1 AND location_id = ?2"#,
                params![&key.product_id, &key.location_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(profile
            .flatten()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty()))
    }

    fn list_pairs(&self) -> RepositoryResult<Vec<ProductLocationPair>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT product_id, location_id, buffer_profile_id
               FROM product_location_pair
               ORDER BY location_id, product_id"#,
        )?;
        let pairs = stmt
            .query_map([], |row| {
                Ok(ProductLocationPair {
                    product_id: row.get(0)?,
                    location_id: row.get(1)?,
                    buffer_profile_id: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(pairs)
    }
}
