// ==========================================
// 解耦点策略引擎 - 战略解耦点数据仓储
// ==========================================
// 约束: (product_id, location_id) 唯一
// 红线: 写操作与其操作日志同一事务提交
// ==========================================

use crate::db::{format_datetime, get_datetime};
use crate::domain::action_log::ActionLog;
use crate::domain::designation::{DesignationRecord, LocationSummary, ProductLocationKey};
use crate::domain::types::DesignationSource;
use crate::repository::action_log_repo::insert_log;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    record_id, product_id, location_id, buffer_profile_id,
    is_strategic, designation_reason, source, created_at
"#;

/// 批量插入结果
#[derive(Debug, Default)]
pub struct BatchInsertResult {
    pub inserted: Vec<DesignationRecord>,
    pub skipped_existing: usize,
}

// ==========================================
// DesignationRepository - 战略解耦点仓储
// ==========================================
pub struct DesignationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DesignationRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 新增记录
    ///
    /// # 错误
    /// - `UniqueConstraintViolation`: 该产品-地点对已登记（不产生任何写入）
    pub fn insert(&self, record: &DesignationRecord, audit: &ActionLog) -> RepositoryResult<String> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        insert_row(&tx, record)?;
        insert_log(&tx, audit)?;
        tx.commit()?;
        Ok(record.record_id.clone())
    }

    /// 批量插入缺失记录（已存在的产品-地点对保持原样）
    ///
    /// 单事务完成；`audit` 根据插入结果生成操作日志（返回 None 则不记录）
    pub fn insert_missing_batch<F>(
        &self,
        records: &[DesignationRecord],
        audit: F,
    ) -> RepositoryResult<BatchInsertResult>
    where
        F: FnOnce(&BatchInsertResult) -> Option<ActionLog>,
    {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut result = BatchInsertResult::default();

        {
            let mut stmt = tx.prepare(
                r#"INSERT INTO decoupling_point (
                    record_id, product_id, location_id, buffer_profile_id,
                    is_strategic, designation_reason, source, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(product_id, location_id) DO NOTHING"#,
            )?;

            for record in records {
                let rows = stmt.execute(params![
                    &record.record_id,
                    &record.product_id,
                    &record.location_id,
                    &record.buffer_profile_id,
                    record.is_strategic,
                    &record.designation_reason,
                    record.source.as_str(),
                    format_datetime(&record.created_at),
                ])?;

                if rows > 0 {
                    result.inserted.push(record.clone());
                } else {
                    result.skipped_existing += 1;
                }
            }
        }

        if let Some(log) = audit(&result) {
            insert_log(&tx, &log)?;
        }

        tx.commit()?;
        Ok(result)
    }

    pub fn find_by_id(&self, record_id: &str) -> RepositoryResult<Option<DesignationRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM decoupling_point WHERE record_id = ?1",
            SELECT_COLUMNS
        );
        let record = conn
            .query_row(&sql, params![record_id], map_row)
            .optional()?;
        Ok(record)
    }

    pub fn find_by_pair(
        &self,
        product_id: &str,
        location_id: &str,
    ) -> RepositoryResult<Option<DesignationRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM decoupling_point WHERE product_id = ?1 AND location_id = ?2",
            SELECT_COLUMNS
        );
        let record = conn
            .query_row(&sql, params![product_id, location_id], map_row)
            .optional()?;
        Ok(record)
    }

    /// 查询全部记录（按地点、产品排序）
    pub fn list_all(&self) -> RepositoryResult<Vec<DesignationRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM decoupling_point ORDER BY location_id, product_id",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map([], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// 已登记的产品-地点对集合
    pub fn existing_keys(&self) -> RepositoryResult<HashSet<ProductLocationKey>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT product_id, location_id FROM decoupling_point")?;
        let keys = stmt
            .query_map([], |row| {
                Ok(ProductLocationKey::new(
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                ))
            })?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(keys)
    }

    /// 删除记录
    ///
    /// # 返回
    /// - 删除行数（0 表示不存在）
    pub fn delete(&self, record_id: &str, audit: &ActionLog) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let rows = tx.execute(
            "DELETE FROM decoupling_point WHERE record_id = ?1",
            params![record_id],
        )?;
        if rows == 0 {
            return Ok(0);
        }
        insert_log(&tx, audit)?;

        tx.commit()?;
        Ok(rows)
    }

    pub fn count(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let n = conn.query_row("SELECT COUNT(*) FROM decoupling_point", [], |row| row.get(0))?;
        Ok(n)
    }

    /// 按地点汇总：记录数 + 去重缓冲配置
    pub fn summary_by_location(&self) -> RepositoryResult<Vec<LocationSummary>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT location_id, buffer_profile_id FROM decoupling_point ORDER BY location_id",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut grouped: BTreeMap<String, (usize, BTreeSet<String>)> = BTreeMap::new();
        for (location_id, profile) in rows {
            let entry = grouped.entry(location_id).or_default();
            entry.0 += 1;
            entry.1.insert(profile);
        }

        Ok(grouped
            .into_iter()
            .map(|(location_id, (record_count, profiles))| LocationSummary {
                location_id,
                record_count,
                buffer_profile_ids: profiles.into_iter().collect(),
            })
            .collect())
    }
}

fn insert_row(conn: &Connection, record: &DesignationRecord) -> RepositoryResult<()> {
    conn.execute(
        r#"INSERT INTO decoupling_point (
            record_id, product_id, location_id, buffer_profile_id,
            is_strategic, designation_reason, source, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
        params![
            &record.record_id,
            &record.product_id,
            &record.location_id,
            &record.buffer_profile_id,
            record.is_strategic,
            &record.designation_reason,
            record.source.as_str(),
            format_datetime(&record.created_at),
        ],
    )?;
    Ok(())
}

fn map_row(row: &rusqlite::Row) -> rusqlite::Result<DesignationRecord> {
    Ok(DesignationRecord {
        record_id: row.get(0)?,
        product_id: row.get(1)?,
        location_id: row.get(2)?,
        buffer_profile_id: row.get(3)?,
        is_strategic: row.get(4)?,
        designation_reason: row.get(5)?,
        source: DesignationSource::parse(&row.get::<_, String>(6)?),
        created_at: get_datetime(row, 7)?,
    })
}
