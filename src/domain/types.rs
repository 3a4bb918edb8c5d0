// ==========================================
// 解耦点策略引擎 - 领域类型定义
// ==========================================
// 闭集枚举: 九因子键 / 分级结论 / 登记来源
// 序列化格式与数据库存储一致
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 评分因子 (Factor Key)
// ==========================================
// 红线: 因子集合固定为 9 个，不允许按字符串动态扩展
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorKey {
    Bullwhip,            // 牛鞭效应
    Variability,         // 需求波动
    Criticality,         // 业务关键性
    HoldingCost,         // 持有成本
    SupplierReliability, // 供应商可靠性
    LeadTime,            // 提前期
    Volume,              // 用量占比
    StorageIntensity,    // 仓储强度
    MoqRigidity,         // 起订量刚性
}

impl FactorKey {
    /// 目录顺序的全部因子
    pub const ALL: [FactorKey; 9] = [
        FactorKey::Bullwhip,
        FactorKey::Variability,
        FactorKey::Criticality,
        FactorKey::HoldingCost,
        FactorKey::SupplierReliability,
        FactorKey::LeadTime,
        FactorKey::Volume,
        FactorKey::StorageIntensity,
        FactorKey::MoqRigidity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FactorKey::Bullwhip => "bullwhip",
            FactorKey::Variability => "variability",
            FactorKey::Criticality => "criticality",
            FactorKey::HoldingCost => "holding_cost",
            FactorKey::SupplierReliability => "supplier_reliability",
            FactorKey::LeadTime => "lead_time",
            FactorKey::Volume => "volume",
            FactorKey::StorageIntensity => "storage_intensity",
            FactorKey::MoqRigidity => "moq_rigidity",
        }
    }

    /// 从字符串解析（大小写不敏感），未知键返回 None
    pub fn parse(s: &str) -> Option<FactorKey> {
        let normalized = s.trim().to_lowercase();
        FactorKey::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == normalized)
    }
}

impl fmt::Display for FactorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 分级结论 (Decision Outcome)
// ==========================================
// 三态: 自动指定 / 人工复核 / 自动拒绝
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionOutcome {
    AutoDesignate,  // 评分 >= 自动指定阈值
    ReviewRequired, // 复核阈值 <= 评分 < 自动指定阈值
    AutoReject,     // 评分 < 复核阈值
}

impl fmt::Display for DecisionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionOutcome::AutoDesignate => write!(f, "AUTO_DESIGNATE"),
            DecisionOutcome::ReviewRequired => write!(f, "REVIEW_REQUIRED"),
            DecisionOutcome::AutoReject => write!(f, "AUTO_REJECT"),
        }
    }
}

// ==========================================
// 登记来源 (Designation Source)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DesignationSource {
    Manual, // 人工指定
    Auto,   // 评分自动指定
}

impl DesignationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DesignationSource::Manual => "MANUAL",
            DesignationSource::Auto => "AUTO",
        }
    }

    pub fn parse(s: &str) -> DesignationSource {
        match s.trim().to_uppercase().as_str() {
            "AUTO" => DesignationSource::Auto,
            _ => DesignationSource::Manual,
        }
    }
}

impl fmt::Display for DesignationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
