// ==========================================
// 解耦点策略引擎 - 战略解耦点登记 API
// ==========================================
// 职责: 人工指定/移除解耦点、落地自动指定结果、按地点汇总
// 红线: 同一产品-地点对至多一条记录
// 红线: 自动指定不覆盖已有记录（含人工指定原因）
// 红线: 复核项永不自动写入
// ==========================================

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::designation::{
    DesignationRecord, LocationSummary, ProductLocationKey, ProductLocationPair, ScoredPair,
};
use crate::domain::types::DesignationSource;
use crate::engine::decision::{DecisionEngine, PartitionedResult};
use crate::repository::catalog_repo::PairCatalog;
use crate::repository::designation_repo::DesignationRepository;
use crate::repository::error::RepositoryError;

/// 自动指定落地结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoDesignationOutcome {
    pub inserted: Vec<DesignationRecord>, // 新增记录
    pub skipped_existing: usize,          // 已有记录，保持原样
    pub review_queue: Vec<ScoredPair>,    // 待人工复核（未写入）
    pub rejected_count: usize,            // 自动拒绝（忽略）
}

// ==========================================
// DesignationApi - 战略解耦点登记 API
// ==========================================
pub struct DesignationApi {
    designation_repo: Arc<DesignationRepository>,
    catalog: Arc<dyn PairCatalog>,
}

impl DesignationApi {
    pub fn new(
        designation_repo: Arc<DesignationRepository>,
        catalog: Arc<dyn PairCatalog>,
    ) -> Self {
        Self {
            designation_repo,
            catalog,
        }
    }

    /// 人工指定解耦点
    ///
    /// # 参数
    /// - product_id / location_id: 产品-地点对（必须存在于目录）
    /// - buffer_profile_id: 缓冲配置ID
    /// - reason: 指定原因（可选）
    /// - actor: 操作人
    ///
    /// # 错误
    /// - InvalidInput: 参数为空
    /// - InvalidPair: 目录中不存在该产品-地点对
    /// - AlreadyDesignated: 该产品-地点对已有记录（不产生任何写入）
    pub fn designate_manual(
        &self,
        product_id: &str,
        location_id: &str,
        buffer_profile_id: &str,
        reason: Option<&str>,
        actor: &str,
    ) -> ApiResult<DesignationRecord> {
        let product_id = product_id.trim();
        let location_id = location_id.trim();
        let buffer_profile_id = buffer_profile_id.trim();

        if product_id.is_empty() {
            return Err(ApiError::InvalidInput("产品ID不能为空".to_string()));
        }
        if location_id.is_empty() {
            return Err(ApiError::InvalidInput("地点ID不能为空".to_string()));
        }
        if buffer_profile_id.is_empty() {
            return Err(ApiError::InvalidInput("缓冲配置ID不能为空".to_string()));
        }

        let key = ProductLocationKey::new(product_id, location_id);
        if !self.catalog.contains(&key)? {
            warn!(pair = %key, actor = actor, "人工指定失败: 目录中不存在");
            return Err(ApiError::InvalidPair {
                product_id: key.product_id,
                location_id: key.location_id,
            });
        }

        if self
            .designation_repo
            .find_by_pair(product_id, location_id)?
            .is_some()
        {
            warn!(pair = %key, actor = actor, "人工指定失败: 已指定");
            return Err(already_designated(&key));
        }

        let record = DesignationRecord {
            record_id: uuid::Uuid::new_v4().to_string(),
            product_id: key.product_id.clone(),
            location_id: key.location_id.clone(),
            buffer_profile_id: buffer_profile_id.to_string(),
            is_strategic: true,
            designation_reason: reason
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty()),
            source: DesignationSource::Manual,
            created_at: chrono::Local::now().naive_local(),
        };

        let audit = ActionLog::new(ActionType::DesignateManual, actor, Some(&record.record_id))
            .with_payload(json!({
                "product_id": record.product_id,
                "location_id": record.location_id,
                "buffer_profile_id": record.buffer_profile_id,
                "reason": record.designation_reason,
            }))
            .with_detail(format!("人工指定解耦点 {}", key));

        // 检查与插入之间被并发指定时由唯一约束兜底
        self.designation_repo
            .insert(&record, &audit)
            .map_err(|e| match e {
                RepositoryError::UniqueConstraintViolation(_) => already_designated(&key),
                other => other.into(),
            })?;

        info!(record_id = %record.record_id, pair = %key, actor = actor, "人工指定解耦点");
        Ok(record)
    }

    /// 移除解耦点
    ///
    /// # 返回
    /// - Ok(record): 被移除的记录
    ///
    /// # 错误
    /// - NotFound: 记录不存在或已被移除
    pub fn remove(&self, record_id: &str, actor: &str) -> ApiResult<DesignationRecord> {
        let record = self
            .designation_repo
            .find_by_id(record_id)?
            .ok_or_else(|| designation_not_found(record_id))?;

        let audit = ActionLog::new(ActionType::RemoveDesignation, actor, Some(record_id))
            .with_payload(json!({
                "product_id": record.product_id,
                "location_id": record.location_id,
                "source": record.source.as_str(),
            }))
            .with_detail(format!("移除解耦点 {}", record.key()));

        if self.designation_repo.delete(record_id, &audit)? == 0 {
            return Err(designation_not_found(record_id));
        }

        info!(record_id = record_id, pair = %record.key(), actor = actor, "解耦点已移除");
        Ok(record)
    }

    /// 落地自动指定结果
    ///
    /// - AUTO_DESIGNATE: 缺失则新增（source=AUTO），已有记录保持原样
    /// - REVIEW_REQUIRED: 仅返回复核队列，不写入
    /// - AUTO_REJECT: 忽略
    ///
    /// 缓冲配置取目录配置，目录未配置时使用 default_buffer_profile_id
    ///
    /// # 错误
    /// - InvalidInput: 同一产品-地点对在分级结果中出现多次
    pub fn apply_auto_designation(
        &self,
        partitioned: &PartitionedResult,
        default_buffer_profile_id: &str,
        actor: &str,
    ) -> ApiResult<AutoDesignationOutcome> {
        ensure_distinct_pairs(
            partitioned
                .designated
                .iter()
                .chain(&partitioned.review)
                .chain(&partitioned.rejected),
        )?;

        let default_profile = default_buffer_profile_id.trim();
        if default_profile.is_empty() && !partitioned.designated.is_empty() {
            return Err(ApiError::InvalidInput("默认缓冲配置ID不能为空".to_string()));
        }

        let now = chrono::Local::now().naive_local();
        let mut records = Vec::with_capacity(partitioned.designated.len());
        for item in &partitioned.designated {
            let buffer_profile_id = self
                .catalog
                .buffer_profile_for(&item.pair)?
                .unwrap_or_else(|| default_profile.to_string());

            records.push(DesignationRecord {
                record_id: uuid::Uuid::new_v4().to_string(),
                product_id: item.pair.product_id.clone(),
                location_id: item.pair.location_id.clone(),
                buffer_profile_id,
                is_strategic: true,
                designation_reason: Some(DecisionEngine::auto_designation_reason(
                    item.score,
                    &partitioned.scenario_name,
                )),
                source: DesignationSource::Auto,
                created_at: now,
            });
        }

        let review_required = partitioned.review.len();
        let auto_rejected = partitioned.rejected.len();
        let batch = if records.is_empty() {
            Default::default()
        } else {
            self.designation_repo.insert_missing_batch(&records, |result| {
                if result.inserted.is_empty() {
                    return None;
                }
                Some(
                    ActionLog::new(ActionType::AutoDesignate, actor, Some(&partitioned.scenario_id))
                        .with_payload(json!({
                            "scenario_name": partitioned.scenario_name,
                            "inserted": result.inserted.len(),
                            "skipped_existing": result.skipped_existing,
                            "review_required": review_required,
                            "auto_rejected": auto_rejected,
                        }))
                        .with_detail(format!(
                            "自动指定 {} 个解耦点 (方案 {})",
                            result.inserted.len(),
                            partitioned.scenario_name
                        )),
                )
            })?
        };

        let outcome = AutoDesignationOutcome {
            inserted: batch.inserted,
            skipped_existing: batch.skipped_existing,
            review_queue: partitioned.review.clone(),
            rejected_count: auto_rejected,
        };

        info!(
            scenario = %partitioned.scenario_name,
            inserted = outcome.inserted.len(),
            skipped_existing = outcome.skipped_existing,
            review_required = outcome.review_queue.len(),
            auto_rejected = outcome.rejected_count,
            "自动指定结果已落地"
        );
        Ok(outcome)
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 按地点汇总
    pub fn summary_by_location(&self) -> ApiResult<Vec<LocationSummary>> {
        Ok(self.designation_repo.summary_by_location()?)
    }

    /// 全部解耦点记录（按地点、产品排序）
    pub fn list(&self) -> ApiResult<Vec<DesignationRecord>> {
        Ok(self.designation_repo.list_all()?)
    }

    pub fn find_by_pair(
        &self,
        product_id: &str,
        location_id: &str,
    ) -> ApiResult<Option<DesignationRecord>> {
        Ok(self
            .designation_repo
            .find_by_pair(product_id.trim(), location_id.trim())?)
    }

    /// 已指定的产品-地点对
    pub fn designated_keys(&self) -> ApiResult<HashSet<ProductLocationKey>> {
        Ok(self.designation_repo.existing_keys()?)
    }

    /// 目录中尚未指定的产品-地点对（人工指定候选）
    pub fn list_undesignated_pairs(&self) -> ApiResult<Vec<ProductLocationPair>> {
        let designated = self.designation_repo.existing_keys()?;
        Ok(self
            .catalog
            .list_pairs()?
            .into_iter()
            .filter(|p| !designated.contains(&p.key()))
            .collect())
    }
}

/// 同一产品-地点对只允许出现一次
pub(crate) fn ensure_distinct_pairs<'a, I>(items: I) -> ApiResult<()>
where
    I: IntoIterator<Item = &'a ScoredPair>,
{
    let mut seen = HashSet::new();
    for item in items {
        if !seen.insert(&item.pair) {
            warn!(pair = %item.pair, "评分输入中产品-地点对重复");
            return Err(ApiError::InvalidInput(format!(
                "产品-地点对重复: {}",
                item.pair
            )));
        }
    }
    Ok(())
}

fn already_designated(key: &ProductLocationKey) -> ApiError {
    ApiError::AlreadyDesignated {
        product_id: key.product_id.clone(),
        location_id: key.location_id.clone(),
    }
}

fn designation_not_found(record_id: &str) -> ApiError {
    ApiError::NotFound(format!("DecouplingPoint(id={})不存在", record_id))
}
