// ==========================================
// 解耦点策略引擎 - 方案校验器
// ==========================================
// 职责: 保存/激活前校验方案是否合法
// 红线: 纯函数，不修正输入（不做权重归一化、不截断阈值）
// ==========================================

use crate::domain::scenario::Scenario;
use crate::domain::types::FactorKey;
use thiserror::Error;

/// 权重合计容差（100% ± 0.1%）
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.001;

/// 阈值取值下界
pub const THRESHOLD_MIN: f64 = 0.0;

/// 阈值取值上界
pub const THRESHOLD_MAX: f64 = 100.0;

/// 方案校验错误
///
/// 每个变体都指明违反的具体约束，错误信息可直接展示给用户
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("因子权重非法: {factor}={value}（必须为有限且非负的数值）")]
    WeightRange { factor: FactorKey, value: f64 },

    #[error("权重合计为 {pct:.1}%，必须为 100%（容差 ±0.1%）", pct = .total * 100.0)]
    WeightSum { total: f64 },

    #[error("方案名称不能为空")]
    EmptyName,

    #[error("方案名称已存在: {name}")]
    DuplicateName { name: String },

    #[error("阈值非法: review={review}, auto_designate={auto_designate}（要求 0 <= review <= auto_designate <= 100）")]
    ThresholdRange { review: f64, auto_designate: f64 },
}

// ==========================================
// ScenarioValidator - 方案校验器
// ==========================================
pub struct ScenarioValidator;

impl ScenarioValidator {
    /// 校验候选方案
    ///
    /// # 参数
    /// - candidate: 候选方案（新建时 id 为空）
    /// - existing: 已存在的方案集合（按 id 排除自身）
    ///
    /// # 校验顺序
    /// 1. 单项权重为有限非负数
    /// 2. 权重合计 = 1.0 ± 0.001
    /// 3. 名称非空
    /// 4. 名称唯一
    /// 5. 阈值范围与顺序
    pub fn validate(candidate: &Scenario, existing: &[Scenario]) -> Result<(), ValidationError> {
        for (factor, value) in candidate.weights.iter() {
            if !value.is_finite() || value < 0.0 {
                return Err(ValidationError::WeightRange { factor, value });
            }
        }

        let total = candidate.weights.total();
        if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ValidationError::WeightSum { total });
        }

        let name = candidate.name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }

        let duplicated = existing.iter().any(|other| {
            let is_self = candidate.is_persisted() && other.id == candidate.id;
            !is_self && other.name.trim() == name
        });
        if duplicated {
            return Err(ValidationError::DuplicateName {
                name: name.to_string(),
            });
        }

        Self::validate_thresholds(
            candidate.review_threshold,
            candidate.auto_designate_threshold,
        )
    }

    /// 校验阈值: 0 <= review <= auto_designate <= 100
    pub fn validate_thresholds(review: f64, auto_designate: f64) -> Result<(), ValidationError> {
        let in_range = |v: f64| v.is_finite() && (THRESHOLD_MIN..=THRESHOLD_MAX).contains(&v);

        if !in_range(review) || !in_range(auto_designate) || review > auto_designate {
            return Err(ValidationError::ThresholdRange {
                review,
                auto_designate,
            });
        }
        Ok(())
    }
}
