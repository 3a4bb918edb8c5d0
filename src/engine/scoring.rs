// ==========================================
// 解耦点策略引擎 - 综合评分
// ==========================================
// 公式: 综合评分 = Σ(因子得分 × 权重) / Σ权重，保留两位小数
// 红线: 因子得分必须在 [0,100]，越界直接报错
// ==========================================

use crate::domain::factor::FactorWeights;
use crate::domain::types::FactorKey;
use crate::engine::decision::{DecisionEngine, InvalidScoreError};
use serde::{Deserialize, Serialize};

/// 九因子单项得分（每项 0~100）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FactorScores {
    pub bullwhip: f64,
    pub variability: f64,
    pub criticality: f64,
    pub holding_cost: f64,
    pub supplier_reliability: f64,
    pub lead_time: f64,
    pub volume: f64,
    pub storage_intensity: f64,
    pub moq_rigidity: f64,
}

impl FactorScores {
    pub fn get(&self, key: FactorKey) -> f64 {
        match key {
            FactorKey::Bullwhip => self.bullwhip,
            FactorKey::Variability => self.variability,
            FactorKey::Criticality => self.criticality,
            FactorKey::HoldingCost => self.holding_cost,
            FactorKey::SupplierReliability => self.supplier_reliability,
            FactorKey::LeadTime => self.lead_time,
            FactorKey::Volume => self.volume,
            FactorKey::StorageIntensity => self.storage_intensity,
            FactorKey::MoqRigidity => self.moq_rigidity,
        }
    }

    /// 所有因子同分（测试/演示用）
    pub fn uniform(score: f64) -> Self {
        Self {
            bullwhip: score,
            variability: score,
            criticality: score,
            holding_cost: score,
            supplier_reliability: score,
            lead_time: score,
            volume: score,
            storage_intensity: score,
            moq_rigidity: score,
        }
    }
}

/// 计算综合评分
///
/// 加权平均 Σ(score × weight) / Σweight，保留两位小数。
/// 权重合计在校验容差内时与 Σ(score × weight) 相差不超过 0.1 分，
/// 但结果始终落在 [0,100]。
///
/// # 错误
/// - 任一单项得分不在 [0,100]
/// - 权重合计不为正
pub fn composite_score(
    scores: &FactorScores,
    weights: &FactorWeights,
) -> Result<f64, InvalidScoreError> {
    let mut weighted = 0.0;
    for (key, weight) in weights.iter() {
        let s = scores.get(key);
        DecisionEngine::check_score(key.as_str(), s)?;
        weighted += s * weight;
    }

    let total = weights.total();
    if !(total.is_finite() && total > 0.0) {
        return Err(InvalidScoreError::new("weights_total", total));
    }

    Ok(((weighted / total) * 100.0).round() / 100.0)
}
