// ==========================================
// 解耦点策略引擎 - 九因子目录
// ==========================================
// 用途: 因子默认权重、说明、评分区间（评分区间仅供展示，
//       实际打分由外部分析任务完成）
// ==========================================

use crate::domain::types::FactorKey;
use serde::{Deserialize, Serialize};

// ==========================================
// ScoringBand - 评分区间
// ==========================================
// 区间为 [lower, upper)，upper = None 表示无上界
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoringBand {
    pub lower: f64,
    pub upper: Option<f64>,
    pub points: f64,
}

impl ScoringBand {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && self.upper.map_or(true, |u| value < u)
    }
}

// ==========================================
// Factor - 因子定义（静态）
// ==========================================
#[derive(Debug, Clone, Serialize)]
pub struct Factor {
    pub key: FactorKey,
    pub title: &'static str,
    pub weight: f64,
    pub description: &'static str,
    pub data_source: &'static str,
    pub scoring_bands: &'static [ScoringBand],
}

const BULLWHIP_BANDS: &[ScoringBand] = &[
    ScoringBand { lower: 1.5, upper: Some(2.0), points: 70.0 },
    ScoringBand { lower: 2.0, upper: Some(3.0), points: 85.0 },
    ScoringBand { lower: 3.0, upper: None, points: 100.0 },
];

const VARIABILITY_BANDS: &[ScoringBand] = &[
    ScoringBand { lower: 0.0, upper: Some(0.2), points: 20.0 },
    ScoringBand { lower: 0.2, upper: Some(0.5), points: 50.0 },
    ScoringBand { lower: 0.5, upper: None, points: 80.0 },
];

const LEAD_TIME_BANDS: &[ScoringBand] = &[
    ScoringBand { lower: 0.0, upper: Some(1.0), points: 20.0 },
    ScoringBand { lower: 3.0, upper: Some(7.0), points: 50.0 },
    ScoringBand { lower: 14.0, upper: None, points: 90.0 },
];

const VOLUME_BANDS: &[ScoringBand] = &[
    ScoringBand { lower: 5.0, upper: Some(10.0), points: 50.0 },
    ScoringBand { lower: 10.0, upper: Some(20.0), points: 70.0 },
    ScoringBand { lower: 20.0, upper: None, points: 90.0 },
];

const MOQ_BANDS: &[ScoringBand] = &[
    ScoringBand { lower: 0.0, upper: Some(3.0), points: 20.0 },
    ScoringBand { lower: 7.0, upper: Some(14.0), points: 70.0 },
    ScoringBand { lower: 14.0, upper: None, points: 90.0 },
];

/// 九因子目录（目录顺序即 FactorKey::ALL 顺序）
pub static FACTOR_CATALOG: [Factor; 9] = [
    Factor {
        key: FactorKey::Bullwhip,
        title: "牛鞭效应",
        weight: 0.15,
        description: "订单波动 / 需求波动 比值，>1.5 表示需求放大严重",
        data_source: "bullwhip_analysis",
        scoring_bands: BULLWHIP_BANDS,
    },
    Factor {
        key: FactorKey::Variability,
        title: "需求波动",
        weight: 0.15,
        description: "历史需求变异系数（CV），CV 越高得分越高",
        data_source: "demand_history_analysis",
        scoring_bands: VARIABILITY_BANDS,
    },
    Factor {
        key: FactorKey::Criticality,
        title: "业务关键性",
        weight: 0.15,
        description: "核心品项与销售贡献度",
        data_source: "menu_mapping",
        scoring_bands: &[],
    },
    Factor {
        key: FactorKey::HoldingCost,
        title: "持有成本",
        weight: 0.10,
        description: "保质期、温层、单价决定的仓储成本强度",
        data_source: "storage_requirements + product_pricing_master",
        scoring_bands: &[],
    },
    Factor {
        key: FactorKey::SupplierReliability,
        title: "供应商可靠性",
        weight: 0.10,
        description: "OTIF 表现与替代供应商可用性",
        data_source: "supplier_performance",
        scoring_bands: &[],
    },
    Factor {
        key: FactorKey::LeadTime,
        title: "提前期",
        weight: 0.10,
        description: "实际提前期（天），越长得分越高",
        data_source: "actual_lead_time",
        scoring_bands: LEAD_TIME_BANDS,
    },
    Factor {
        key: FactorKey::Volume,
        title: "用量占比",
        weight: 0.10,
        description: "占门店总用量百分比（90 天均值）",
        data_source: "usage_analysis",
        scoring_bands: VOLUME_BANDS,
    },
    Factor {
        key: FactorKey::StorageIntensity,
        title: "仓储强度",
        weight: 0.075,
        description: "物理占用与温层要求",
        data_source: "storage_requirements",
        scoring_bands: &[],
    },
    Factor {
        key: FactorKey::MoqRigidity,
        title: "起订量刚性",
        weight: 0.075,
        description: "最小起订量所需覆盖天数",
        data_source: "moq_data",
        scoring_bands: MOQ_BANDS,
    },
];

/// 按键查询因子定义
pub fn factor(key: FactorKey) -> &'static Factor {
    // 下标与 FACTOR_CATALOG 顺序一致
    let idx = match key {
        FactorKey::Bullwhip => 0,
        FactorKey::Variability => 1,
        FactorKey::Criticality => 2,
        FactorKey::HoldingCost => 3,
        FactorKey::SupplierReliability => 4,
        FactorKey::LeadTime => 5,
        FactorKey::Volume => 6,
        FactorKey::StorageIntensity => 7,
        FactorKey::MoqRigidity => 8,
    };
    &FACTOR_CATALOG[idx]
}

// ==========================================
// FactorWeights - 九因子权重
// ==========================================
// 9 个字段固定存在，"权重齐全"由结构保证
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorWeights {
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

impl Default for FactorWeights {
    fn default() -> Self {
        let mut weights = FactorWeights::zero();
        for f in FACTOR_CATALOG.iter() {
            weights.set(f.key, f.weight);
        }
        weights
    }
}

impl FactorWeights {
    pub fn zero() -> Self {
        Self {
            bullwhip: 0.0,
            variability: 0.0,
            criticality: 0.0,
            holding_cost: 0.0,
            supplier_reliability: 0.0,
            lead_time: 0.0,
            volume: 0.0,
            storage_intensity: 0.0,
            moq_rigidity: 0.0,
        }
    }

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

    pub fn set(&mut self, key: FactorKey, value: f64) {
        let slot = match key {
            FactorKey::Bullwhip => &mut self.bullwhip,
            FactorKey::Variability => &mut self.variability,
            FactorKey::Criticality => &mut self.criticality,
            FactorKey::HoldingCost => &mut self.holding_cost,
            FactorKey::SupplierReliability => &mut self.supplier_reliability,
            FactorKey::LeadTime => &mut self.lead_time,
            FactorKey::Volume => &mut self.volume,
            FactorKey::StorageIntensity => &mut self.storage_intensity,
            FactorKey::MoqRigidity => &mut self.moq_rigidity,
        };
        *slot = value;
    }

    /// 目录顺序遍历 (因子, 权重)
    pub fn iter(&self) -> impl Iterator<Item = (FactorKey, f64)> + '_ {
        FactorKey::ALL.iter().map(move |k| (*k, self.get(*k)))
    }

    /// 权重合计
    pub fn total(&self) -> f64 {
        self.iter().map(|(_, w)| w).sum()
    }
}
