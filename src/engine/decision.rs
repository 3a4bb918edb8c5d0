// ==========================================
// 解耦点策略引擎 - 分级决策引擎
// ==========================================
// 职责: 按方案阈值将综合评分分为 自动指定 / 人工复核 / 自动拒绝
// 区间: [auto, 100] -> AUTO_DESIGNATE
//       [review, auto) -> REVIEW_REQUIRED
//       [0, review) -> AUTO_REJECT
// 红线: 纯函数；越界评分直接报错，不做截断
// ==========================================

use crate::domain::designation::ScoredPair;
use crate::domain::scenario::Scenario;
use crate::domain::types::DecisionOutcome;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 评分非法（上游评分任务的数据问题）
#[derive(Error, Debug, Clone, PartialEq)]
#[error("评分非法: {subject} score={score}（必须为 0~100 的有限数值）")]
pub struct InvalidScoreError {
    pub subject: String,
    pub score: f64,
}

impl InvalidScoreError {
    pub fn new(subject: impl Into<String>, score: f64) -> Self {
        Self {
            subject: subject.into(),
            score,
        }
    }
}

/// 单条分级结果
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub score: f64,
    pub outcome: DecisionOutcome,
}

/// 分级计数（用于汇总展示）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub total: usize,
    pub designated: usize,
    pub review: usize,
    pub rejected: usize,
}

/// 批量分级结果
///
/// 各桶内保持输入顺序
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionedResult {
    pub scenario_id: String,
    pub scenario_name: String,
    pub designated: Vec<ScoredPair>,
    pub review: Vec<ScoredPair>,
    pub rejected: Vec<ScoredPair>,
    pub counts: OutcomeCounts,
}

// ==========================================
// DecisionEngine - 分级决策引擎
// ==========================================
pub struct DecisionEngine {
    // 无状态引擎
}

impl DecisionEngine {
    pub fn new() -> Self {
        Self {}
    }

    /// 单条分级
    ///
    /// # 错误
    /// - InvalidScoreError: score 非有限数或不在 [0,100]
    pub fn classify(
        &self,
        score: f64,
        scenario: &Scenario,
    ) -> Result<ClassificationResult, InvalidScoreError> {
        Self::check_score("composite", score)?;

        let outcome = if score >= scenario.auto_designate_threshold {
            DecisionOutcome::AutoDesignate
        } else if score >= scenario.review_threshold {
            DecisionOutcome::ReviewRequired
        } else {
            DecisionOutcome::AutoReject
        };

        Ok(ClassificationResult { score, outcome })
    }

    /// 批量分级（稳定分区）
    ///
    /// 任一评分非法则整批失败，不返回部分结果
    pub fn classify_all(
        &self,
        scores: &[ScoredPair],
        scenario: &Scenario,
    ) -> Result<PartitionedResult, InvalidScoreError> {
        self.validate_scores(scores)?;

        let mut result = PartitionedResult {
            scenario_id: scenario.id.clone(),
            scenario_name: scenario.name.clone(),
            designated: Vec::new(),
            review: Vec::new(),
            rejected: Vec::new(),
            counts: OutcomeCounts::default(),
        };

        for item in scores {
            let classified = self
                .classify(item.score, scenario)
                .map_err(|e| InvalidScoreError::new(item.pair.to_string(), e.score))?;

            match classified.outcome {
                DecisionOutcome::AutoDesignate => result.designated.push(item.clone()),
                DecisionOutcome::ReviewRequired => result.review.push(item.clone()),
                DecisionOutcome::AutoReject => result.rejected.push(item.clone()),
            }
        }

        result.counts = OutcomeCounts {
            total: scores.len(),
            designated: result.designated.len(),
            review: result.review.len(),
            rejected: result.rejected.len(),
        };

        tracing::debug!(
            scenario = %scenario.name,
            total = result.counts.total,
            designated = result.counts.designated,
            review = result.counts.review,
            rejected = result.counts.rejected,
            "批量分级完成"
        );

        Ok(result)
    }

    /// 校验整批评分，返回第一条非法评分
    pub fn validate_scores(&self, scores: &[ScoredPair]) -> Result<(), InvalidScoreError> {
        for item in scores {
            Self::check_score(&item.pair.to_string(), item.score)?;
        }
        Ok(())
    }

    /// 自动指定时写入的原因文本
    pub fn auto_designation_reason(score: f64, scenario_name: &str) -> String {
        format!("自动指定: 评分 {:.2} (方案 {})", score, scenario_name)
    }

    pub(crate) fn check_score(subject: &str, score: f64) -> Result<(), InvalidScoreError> {
        if score.is_finite() && (0.0..=100.0).contains(&score) {
            Ok(())
        } else {
            Err(InvalidScoreError::new(subject, score))
        }
    }
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::new()
    }
}
