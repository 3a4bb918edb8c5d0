// ==========================================
// 解耦点策略引擎 - 操作日志领域模型
// ==========================================
// 红线: 所有写入必须记录
// 用途: 审计追踪（谁在何时切换了激活方案 / 指定了解耦点）
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,              // 日志ID
    pub action_type: ActionType,        // 操作类型
    pub action_ts: NaiveDateTime,       // 操作时间戳
    pub actor: String,                  // 操作人
    pub target_id: Option<String>,      // 操作对象（方案ID / 解耦点记录ID）
    pub payload_json: Option<JsonValue>, // 操作参数 (JSON)
    pub detail: Option<String>,         // 详细描述
}

impl ActionLog {
    pub fn new(action_type: ActionType, actor: &str, target_id: Option<&str>) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            action_type,
            action_ts: chrono::Local::now().naive_local(),
            actor: actor.to_string(),
            target_id: target_id.map(|s| s.to_string()),
            payload_json: None,
            detail: None,
        }
    }

    pub fn with_payload(mut self, payload: JsonValue) -> Self {
        self.payload_json = Some(payload);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    CreateScenario,    // 创建方案
    UpdateScenario,    // 修改方案
    CloneScenario,     // 克隆方案
    DeleteScenario,    // 删除方案
    ActivateScenario,  // 激活方案
    LockScenario,      // 锁定方案
    UnlockScenario,    // 解锁方案
    DesignateManual,   // 人工指定解耦点
    RemoveDesignation, // 移除解耦点
    AutoDesignate,     // 批量自动指定
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::CreateScenario => "CREATE_SCENARIO",
            ActionType::UpdateScenario => "UPDATE_SCENARIO",
            ActionType::CloneScenario => "CLONE_SCENARIO",
            ActionType::DeleteScenario => "DELETE_SCENARIO",
            ActionType::ActivateScenario => "ACTIVATE_SCENARIO",
            ActionType::LockScenario => "LOCK_SCENARIO",
            ActionType::UnlockScenario => "UNLOCK_SCENARIO",
            ActionType::DesignateManual => "DESIGNATE_MANUAL",
            ActionType::RemoveDesignation => "REMOVE_DESIGNATION",
            ActionType::AutoDesignate => "AUTO_DESIGNATE",
        }
    }

    pub fn parse(s: &str) -> Option<ActionType> {
        const ALL: [ActionType; 10] = [
            ActionType::CreateScenario,
            ActionType::UpdateScenario,
            ActionType::CloneScenario,
            ActionType::DeleteScenario,
            ActionType::ActivateScenario,
            ActionType::LockScenario,
            ActionType::UnlockScenario,
            ActionType::DesignateManual,
            ActionType::RemoveDesignation,
            ActionType::AutoDesignate,
        ];
        let s = s.trim();
        ALL.iter().copied().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
