// ==========================================
// 解耦点策略引擎 - 权重方案领域模型
// ==========================================
// 红线: 同一时刻至多一个激活方案
// 红线: 锁定方案不可编辑、不可删除（可克隆）
// ==========================================

use crate::domain::factor::FactorWeights;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 默认自动指定阈值
pub const DEFAULT_AUTO_DESIGNATE_THRESHOLD: f64 = 70.0;

/// 默认复核阈值
pub const DEFAULT_REVIEW_THRESHOLD: f64 = 50.0;

// ==========================================
// Scenario - 权重方案
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,                    // 方案ID（持久化前为空）
    pub name: String,                  // 方案名称（唯一）
    pub description: Option<String>,   // 说明
    pub weights: FactorWeights,        // 九因子权重
    pub auto_designate_threshold: f64, // 自动指定阈值 [0,100]
    pub review_threshold: f64,         // 复核阈值 [0,100]
    pub is_active: bool,               // 是否激活
    pub is_locked: bool,               // 是否锁定
    pub version: i32,                  // 乐观锁：修订号
    pub created_at: NaiveDateTime,     // 创建时间
    pub updated_at: NaiveDateTime,     // 更新时间
}

impl Scenario {
    /// 构造待保存的方案草稿（未激活、未锁定、无ID）
    pub fn draft(name: impl Into<String>, weights: FactorWeights) -> Self {
        let now = chrono::Local::now().naive_local();
        Self {
            id: String::new(),
            name: name.into(),
            description: None,
            weights,
            auto_designate_threshold: DEFAULT_AUTO_DESIGNATE_THRESHOLD,
            review_threshold: DEFAULT_REVIEW_THRESHOLD,
            is_active: false,
            is_locked: false,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_thresholds(mut self, review: f64, auto_designate: f64) -> Self {
        self.review_threshold = review;
        self.auto_designate_threshold = auto_designate;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_persisted(&self) -> bool {
        !self.id.is_empty()
    }

    /// 合并补丁，返回新对象（不修改自身）
    pub fn merged(&self, patch: &ScenarioPatch) -> Scenario {
        let mut next = self.clone();
        if let Some(name) = &patch.name {
            next.name = name.clone();
        }
        if let Some(description) = &patch.description {
            next.description = description.clone();
        }
        if let Some(weights) = patch.weights {
            next.weights = weights;
        }
        if let Some(v) = patch.auto_designate_threshold {
            next.auto_designate_threshold = v;
        }
        if let Some(v) = patch.review_threshold {
            next.review_threshold = v;
        }
        next
    }
}

// ==========================================
// ScenarioPatch - 方案修改补丁
// ==========================================
// 激活/锁定状态不经由补丁修改（分别走 activate / set_locked）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioPatch {
    #[serde(default)]
    pub name: Option<String>,

    /// Some(None) 表示清空说明
    #[serde(default)]
    pub description: Option<Option<String>>,

    #[serde(default)]
    pub weights: Option<FactorWeights>,

    #[serde(default)]
    pub auto_designate_threshold: Option<f64>,

    #[serde(default)]
    pub review_threshold: Option<f64>,
}

impl ScenarioPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.weights.is_none()
            && self.auto_designate_threshold.is_none()
            && self.review_threshold.is_none()
    }
}
