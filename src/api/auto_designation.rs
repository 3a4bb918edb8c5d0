// ==========================================
// 解耦点策略引擎 - 自动指定作业
// ==========================================
// 流程:
// 1. 读取配置（批量大小、默认缓冲配置）
// 2. 加载激活方案
// 3. 校验全部输入（评分合法、产品-地点对不重复）
// 4. 截断至批量大小，剔除已指定的产品-地点对
// 5. 分级 -> 落地 AUTO_DESIGNATE，返回复核队列
// 红线: 校验覆盖全部输入，被截断或剔除的行同样不得携带非法评分
// ==========================================

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::designation_api::{ensure_distinct_pairs, DesignationApi};
use crate::api::error::{ApiError, ApiResult};
use crate::api::scenario_api::ScenarioApi;
use crate::config::policy_config_trait::PolicyConfigReader;
use crate::domain::designation::ScoredPair;
use crate::engine::decision::DecisionEngine;
use crate::importer::ScoreImporter;

/// 自动指定作业汇总
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoDesignationSummary {
    pub scenario_id: String,
    pub scenario_name: String,
    pub total_analyzed: usize,              // 参与分级的数量
    pub auto_designated: usize,             // 新增自动指定
    pub review_required: usize,             // 待人工复核
    pub auto_rejected: usize,               // 自动拒绝
    pub skipped_already_designated: usize,  // 已有记录，未参与分级
    pub truncated: usize,                   // 超出批量大小未处理
    pub review_queue: Vec<ScoredPair>,
}

// ==========================================
// AutoDesignationJob - 自动指定作业
// ==========================================
pub struct AutoDesignationJob<C>
where
    C: PolicyConfigReader + ?Sized,
{
    config: Arc<C>,
    scenario_api: Arc<ScenarioApi>,
    designation_api: Arc<DesignationApi>,
    engine: DecisionEngine,
}

impl<C> AutoDesignationJob<C>
where
    C: PolicyConfigReader + ?Sized,
{
    pub fn new(
        config: Arc<C>,
        scenario_api: Arc<ScenarioApi>,
        designation_api: Arc<DesignationApi>,
    ) -> Self {
        Self {
            config,
            scenario_api,
            designation_api,
            engine: DecisionEngine::new(),
        }
    }

    /// 执行自动指定
    ///
    /// # 参数
    /// - scores: 外部评分作业产出的 (产品, 地点, 综合评分)
    /// - actor: 操作人
    ///
    /// # 错误
    /// - NotFound: 没有激活方案
    /// - InvalidScore: 任一评分非法（整批不写入）
    /// - InvalidInput: 同一产品-地点对出现多次（整批不写入）
    /// - ConfigError: 配置读取失败
    pub async fn run(&self, scores: &[ScoredPair], actor: &str) -> ApiResult<AutoDesignationSummary> {
        let batch_size = self
            .config
            .get_auto_designation_batch_size()
            .await
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;
        let default_profile = self
            .config
            .get_default_buffer_profile_id()
            .await
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;

        let scenario = self
            .scenario_api
            .get_active()?
            .ok_or_else(|| ApiError::NotFound("没有激活的权重方案".to_string()))?;

        self.engine.validate_scores(scores)?;
        ensure_distinct_pairs(scores)?;

        let batch = &scores[..scores.len().min(batch_size)];
        let truncated = scores.len() - batch.len();
        if truncated > 0 {
            warn!(
                batch_size = batch_size,
                truncated = truncated,
                "评分数量超出批量大小，超出部分本次不处理"
            );
        }

        let designated = self.designation_api.designated_keys()?;
        let candidates: Vec<ScoredPair> = batch
            .iter()
            .filter(|item| !designated.contains(&item.pair))
            .cloned()
            .collect();
        let skipped_already_designated = batch.len() - candidates.len();

        let partitioned = self.engine.classify_all(&candidates, &scenario)?;
        let outcome =
            self.designation_api
                .apply_auto_designation(&partitioned, &default_profile, actor)?;

        let summary = AutoDesignationSummary {
            scenario_id: scenario.id,
            scenario_name: scenario.name,
            total_analyzed: partitioned.counts.total,
            auto_designated: outcome.inserted.len(),
            review_required: outcome.review_queue.len(),
            auto_rejected: outcome.rejected_count,
            skipped_already_designated: skipped_already_designated + outcome.skipped_existing,
            truncated,
            review_queue: outcome.review_queue,
        };

        info!(
            scenario = %summary.scenario_name,
            total_analyzed = summary.total_analyzed,
            auto_designated = summary.auto_designated,
            review_required = summary.review_required,
            auto_rejected = summary.auto_rejected,
            skipped = summary.skipped_already_designated,
            "自动指定作业完成"
        );
        Ok(summary)
    }

    /// 导入评分 CSV 并执行自动指定
    ///
    /// # 错误
    /// - ImportFailed: 文件检查失败或行数据非法
    /// - 其余同 [`AutoDesignationJob::run`]
    pub async fn run_file(&self, path: &Path, actor: &str) -> ApiResult<AutoDesignationSummary> {
        let scores = ScoreImporter::import_file(path)?;
        self.run(&scores, actor).await
    }
}
