// ==========================================
// 解耦点策略引擎 - 战略解耦点登记模型
// ==========================================
// 状态机（按 产品-地点 对）:
//   UNDESIGNATED -> (人工/自动指定) -> DESIGNATED -> (移除) -> UNDESIGNATED
// 注: REVIEW_REQUIRED 不是登记状态，只是分级结论
// ==========================================

use crate::domain::types::DesignationSource;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// ProductLocationKey - 产品-地点 复合键
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductLocationKey {
    pub product_id: String,
    pub location_id: String,
}

impl ProductLocationKey {
    pub fn new(product_id: impl Into<String>, location_id: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            location_id: location_id.into(),
        }
    }
}

impl fmt::Display for ProductLocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.product_id, self.location_id)
    }
}

// ==========================================
// ScoredPair - 外部分析任务产出的综合评分
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPair {
    pub pair: ProductLocationKey,
    pub score: f64, // 综合评分 0~100
}

impl ScoredPair {
    pub fn new(product_id: impl Into<String>, location_id: impl Into<String>, score: f64) -> Self {
        Self {
            pair: ProductLocationKey::new(product_id, location_id),
            score,
        }
    }
}

// ==========================================
// ProductLocationPair - 产品-地点目录项（外部目录）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductLocationPair {
    pub product_id: String,
    pub location_id: String,
    pub buffer_profile_id: Option<String>, // 目录给出的缓冲配置（自动指定时使用）
}

impl ProductLocationPair {
    pub fn key(&self) -> ProductLocationKey {
        ProductLocationKey::new(self.product_id.clone(), self.location_id.clone())
    }
}

// ==========================================
// DesignationRecord - 战略解耦点
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignationRecord {
    pub record_id: String,                  // 记录ID
    pub product_id: String,                 // 产品ID
    pub location_id: String,                // 地点ID
    pub buffer_profile_id: String,          // 缓冲配置ID（不透明字符串）
    pub is_strategic: bool,                 // 是否战略解耦点
    pub designation_reason: Option<String>, // 指定原因
    pub source: DesignationSource,          // 来源
    pub created_at: NaiveDateTime,          // 创建时间
}

impl DesignationRecord {
    pub fn key(&self) -> ProductLocationKey {
        ProductLocationKey::new(self.product_id.clone(), self.location_id.clone())
    }
}

// ==========================================
// LocationSummary - 地点级汇总
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSummary {
    pub location_id: String,
    pub record_count: usize,
    pub buffer_profile_ids: Vec<String>, // 去重、升序
}
