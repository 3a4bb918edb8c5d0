// ==========================================
// 解耦点策略引擎 - 权重方案 API
// ==========================================
// 职责: 方案新建/克隆/修改/删除/激活/锁定 + 方案对比
// 红线: 同一时刻至多一个激活方案（激活为单一事务）
// 红线: 锁定方案不可修改、不可删除；激活方案不可删除、不可直接停用
// 红线: 所有写操作记录 ActionLog（与写入同一事务）
// ==========================================

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::config::policy_config_trait::PolicyConfigReader;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::designation::ProductLocationKey;
use crate::domain::factor::FactorWeights;
use crate::domain::scenario::{Scenario, ScenarioPatch};
use crate::engine::comparison::{compare_scenarios, ScenarioComparison};
use crate::engine::scoring::FactorScores;
use crate::engine::validator::{ScenarioValidator, ValidationError};
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::error::RepositoryError;
use crate::repository::scenario_repo::ScenarioRepository;

/// 系统初始化时创建的方案名称
pub const DEFAULT_SCENARIO_NAME: &str = "default";

const CLONE_SUFFIX: &str = "_copy";

// ==========================================
// ScenarioApi - 权重方案 API
// ==========================================
pub struct ScenarioApi {
    scenario_repo: Arc<ScenarioRepository>,
    action_log_repo: Arc<ActionLogRepository>,
}

impl ScenarioApi {
    pub fn new(
        scenario_repo: Arc<ScenarioRepository>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            scenario_repo,
            action_log_repo,
        }
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 按ID查询方案
    ///
    /// # 错误
    /// - NotFound: 方案不存在
    pub fn get(&self, scenario_id: &str) -> ApiResult<Scenario> {
        self.scenario_repo
            .find_by_id(scenario_id)?
            .ok_or_else(|| scenario_not_found(scenario_id))
    }

    /// 全部方案（按名称排序）
    pub fn list(&self) -> ApiResult<Vec<Scenario>> {
        Ok(self.scenario_repo.list_all()?)
    }

    /// 当前激活方案
    pub fn get_active(&self) -> ApiResult<Option<Scenario>> {
        Ok(self.scenario_repo.find_active()?)
    }

    /// 方案操作历史（按时间倒序）
    pub fn history(&self, scenario_id: &str) -> ApiResult<Vec<ActionLog>> {
        Ok(self.action_log_repo.find_by_target(scenario_id)?)
    }

    // ==========================================
    // 新建 / 克隆
    // ==========================================

    /// 新建方案
    ///
    /// 新方案一律未激活、未锁定，revision 从 1 开始
    ///
    /// # 错误
    /// - ValidationFailed: 权重/名称/阈值不合法
    pub fn create(&self, draft: Scenario, actor: &str) -> ApiResult<Scenario> {
        let now = chrono::Local::now().naive_local();
        let mut candidate = Scenario {
            id: String::new(),
            is_active: false,
            is_locked: false,
            version: 1,
            created_at: now,
            updated_at: now,
            ..draft
        };
        candidate.name = candidate.name.trim().to_string();

        let existing = self.scenario_repo.list_all()?;
        if let Err(e) = ScenarioValidator::validate(&candidate, &existing) {
            warn!(name = %candidate.name, error = %e, "新建方案校验失败");
            return Err(e.into());
        }

        candidate.id = uuid::Uuid::new_v4().to_string();
        let audit = ActionLog::new(ActionType::CreateScenario, actor, Some(&candidate.id))
            .with_payload(json!({
                "name": candidate.name,
                "weights": candidate.weights,
                "auto_designate_threshold": candidate.auto_designate_threshold,
                "review_threshold": candidate.review_threshold,
            }))
            .with_detail(format!("新建方案 {}", candidate.name));
        self.insert_scenario(&candidate, &audit)?;

        info!(scenario_id = %candidate.id, name = %candidate.name, actor = actor, "方案已创建");
        Ok(candidate)
    }

    /// 克隆方案（锁定方案同样可克隆）
    ///
    /// 名称取 `{name}_copy`，被占用时依次尝试 `{name}_copy_2`、`{name}_copy_3` ...
    /// 克隆结果未激活、未锁定
    pub fn clone_scenario(&self, scenario_id: &str, actor: &str) -> ApiResult<Scenario> {
        let source = self.get(scenario_id)?;
        let existing = self.scenario_repo.list_all()?;

        let now = chrono::Local::now().naive_local();
        let copy = Scenario {
            id: String::new(),
            name: clone_name(&source.name, &existing),
            is_active: false,
            is_locked: false,
            version: 1,
            created_at: now,
            updated_at: now,
            ..source.clone()
        };
        ScenarioValidator::validate(&copy, &existing)?;

        let copy = Scenario {
            id: uuid::Uuid::new_v4().to_string(),
            ..copy
        };
        let audit = ActionLog::new(ActionType::CloneScenario, actor, Some(&copy.id))
            .with_payload(json!({ "source_id": source.id, "name": copy.name }))
            .with_detail(format!("克隆方案 {} -> {}", source.name, copy.name));
        self.insert_scenario(&copy, &audit)?;

        info!(
            source_id = %source.id,
            scenario_id = %copy.id,
            name = %copy.name,
            actor = actor,
            "方案已克隆"
        );
        Ok(copy)
    }

    // ==========================================
    // 修改 / 删除
    // ==========================================

    /// 修改方案
    ///
    /// # 错误
    /// - NotFound: 方案不存在
    /// - LockedScenario: 方案已锁定
    /// - ValidationFailed: 合并后的方案不合法（自身不参与重名判断）
    /// - OptimisticLockFailure: 读取后被并发修改
    pub fn update(&self, scenario_id: &str, patch: &ScenarioPatch, actor: &str) -> ApiResult<Scenario> {
        let current = self.get(scenario_id)?;
        if current.is_locked {
            warn!(scenario_id = scenario_id, actor = actor, "拒绝修改锁定方案");
            return Err(locked(&current));
        }
        if patch.is_empty() {
            return Ok(current);
        }

        let mut merged = current.merged(patch);
        merged.name = merged.name.trim().to_string();
        merged.updated_at = chrono::Local::now().naive_local();

        let existing = self.scenario_repo.list_all()?;
        if let Err(e) = ScenarioValidator::validate(&merged, &existing) {
            warn!(scenario_id = scenario_id, error = %e, "修改方案校验失败");
            return Err(e.into());
        }

        let audit = ActionLog::new(ActionType::UpdateScenario, actor, Some(scenario_id))
            .with_payload(json!({
                "patch": patch,
                "from_revision": current.version,
            }))
            .with_detail(format!("修改方案 {}", merged.name));
        self.scenario_repo
            .update(&merged, &audit)
            .map_err(|e| match e {
                RepositoryError::UniqueConstraintViolation(_) => {
                    ApiError::ValidationFailed(ValidationError::DuplicateName {
                        name: merged.name.clone(),
                    })
                }
                other => other.into(),
            })?;

        info!(scenario_id = scenario_id, revision = current.version + 1, actor = actor, "方案已修改");
        self.get(scenario_id)
    }

    /// 删除方案
    ///
    /// # 错误
    /// - NotFound: 方案不存在
    /// - LockedScenario: 方案已锁定
    /// - ActiveScenario: 方案处于激活状态（需先激活其他方案）
    pub fn delete(&self, scenario_id: &str, actor: &str) -> ApiResult<()> {
        let current = self.get(scenario_id)?;
        check_deletable(&current)?;

        let audit = ActionLog::new(ActionType::DeleteScenario, actor, Some(scenario_id))
            .with_payload(json!({ "name": current.name }))
            .with_detail(format!("删除方案 {}", current.name));
        let rows = self.scenario_repo.delete_unprotected(scenario_id, &audit)?;
        if rows == 0 {
            // 检查与删除之间被并发锁定/激活/删除
            let latest = self.get(scenario_id)?;
            check_deletable(&latest)?;
            return Err(ApiError::InternalError(format!(
                "方案删除未生效: scenario_id={}",
                scenario_id
            )));
        }

        info!(scenario_id = scenario_id, name = %current.name, actor = actor, "方案已删除");
        Ok(())
    }

    // ==========================================
    // 激活 / 停用 / 锁定
    // ==========================================

    /// 激活方案（同一事务内取消其他方案激活）
    ///
    /// 激活前重新校验已存储的方案；对已激活方案重复激活直接返回
    ///
    /// # 错误
    /// - NotFound: 方案不存在
    /// - ValidationFailed: 已存储的方案不合法
    pub fn activate(&self, scenario_id: &str, actor: &str) -> ApiResult<Scenario> {
        let target = self.get(scenario_id)?;
        if target.is_active {
            debug!(scenario_id = scenario_id, "方案已处于激活状态");
            return Ok(target);
        }

        let existing = self.scenario_repo.list_all()?;
        if let Err(e) = ScenarioValidator::validate(&target, &existing) {
            warn!(scenario_id = scenario_id, error = %e, "激活方案校验失败");
            return Err(e.into());
        }

        let previous = existing.iter().find(|s| s.is_active).map(|s| s.id.clone());
        let audit = ActionLog::new(ActionType::ActivateScenario, actor, Some(scenario_id))
            .with_payload(json!({ "previous_active_id": previous }))
            .with_detail(format!("激活方案 {}", target.name));
        self.scenario_repo.activate(scenario_id, &audit)?;

        info!(
            scenario_id = scenario_id,
            name = %target.name,
            previous = ?previous,
            actor = actor,
            "方案已激活"
        );
        self.get(scenario_id)
    }

    /// 停用方案
    ///
    /// 不提供直接停用：激活方案只能通过激活其他方案来替换
    ///
    /// # 返回
    /// - Ok(()): 方案本就未激活（无操作）
    ///
    /// # 错误
    /// - NotFound: 方案不存在
    /// - CannotDeactivateSoleActive: 方案为当前激活方案
    pub fn deactivate(&self, scenario_id: &str, actor: &str) -> ApiResult<()> {
        let current = self.get(scenario_id)?;
        if current.is_active {
            warn!(scenario_id = scenario_id, actor = actor, "拒绝直接停用激活方案");
            return Err(ApiError::CannotDeactivateSoleActive {
                scenario_id: current.id,
                name: current.name,
            });
        }
        debug!(scenario_id = scenario_id, "方案未激活，无需停用");
        Ok(())
    }

    /// 锁定/解锁方案
    pub fn set_locked(&self, scenario_id: &str, locked: bool, actor: &str) -> ApiResult<Scenario> {
        let action_type = if locked {
            ActionType::LockScenario
        } else {
            ActionType::UnlockScenario
        };
        let audit = ActionLog::new(action_type, actor, Some(scenario_id));
        if !self.scenario_repo.set_locked(scenario_id, locked, &audit)? {
            return Err(scenario_not_found(scenario_id));
        }

        info!(scenario_id = scenario_id, locked = locked, actor = actor, "方案锁定状态已变更");
        self.get(scenario_id)
    }

    // ==========================================
    // 初始化 / 对比
    // ==========================================

    /// 方案库为空时创建并激活默认方案
    ///
    /// # 返回
    /// - Ok(Some(scenario)): 新建的默认方案
    /// - Ok(None): 已有方案，未做任何修改
    pub async fn ensure_default_scenario(
        &self,
        config: &dyn PolicyConfigReader,
        actor: &str,
    ) -> ApiResult<Option<Scenario>> {
        if self.scenario_repo.count()? > 0 {
            return Ok(None);
        }

        let auto_designate = config
            .get_default_auto_designate_threshold()
            .await
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;
        let review = config
            .get_default_review_threshold()
            .await
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;

        let draft = Scenario::draft(DEFAULT_SCENARIO_NAME, FactorWeights::default())
            .with_thresholds(review, auto_designate)
            .with_description("系统默认方案");
        let created = self.create(draft, actor)?;
        let activated = self.activate(&created.id, actor)?;

        info!(scenario_id = %activated.id, "默认方案已初始化");
        Ok(Some(activated))
    }

    /// 对比两个方案下的分级结论
    ///
    /// # 错误
    /// - InvalidInput: 两个方案相同
    /// - NotFound: 任一方案不存在
    /// - InvalidScore: 因子评分非法
    pub fn compare(
        &self,
        current_id: &str,
        candidate_id: &str,
        items: &[(ProductLocationKey, FactorScores)],
    ) -> ApiResult<ScenarioComparison> {
        if current_id == candidate_id {
            return Err(ApiError::InvalidInput(format!(
                "对比的两个方案不能相同: {}",
                current_id
            )));
        }

        let current = self.get(current_id)?;
        let candidate = self.get(candidate_id)?;
        let comparison = compare_scenarios(items, &current, &candidate)?;

        debug!(
            current = %current.name,
            candidate = %candidate.name,
            gained = comparison.gained,
            lost = comparison.lost,
            "方案对比完成"
        );
        Ok(comparison)
    }

    /// 插入方案；并发建同名方案时由唯一约束兜底
    fn insert_scenario(&self, scenario: &Scenario, audit: &ActionLog) -> ApiResult<()> {
        self.scenario_repo.insert(scenario, audit).map_err(|e| match e {
            RepositoryError::UniqueConstraintViolation(_) => {
                ApiError::ValidationFailed(ValidationError::DuplicateName {
                    name: scenario.name.clone(),
                })
            }
            other => other.into(),
        })?;
        Ok(())
    }
}

fn scenario_not_found(scenario_id: &str) -> ApiError {
    ApiError::NotFound(format!("DecouplingScenario(id={})不存在", scenario_id))
}

fn locked(scenario: &Scenario) -> ApiError {
    ApiError::LockedScenario {
        scenario_id: scenario.id.clone(),
        name: scenario.name.clone(),
    }
}

fn check_deletable(scenario: &Scenario) -> ApiResult<()> {
    if scenario.is_locked {
        return Err(locked(scenario));
    }
    if scenario.is_active {
        return Err(ApiError::ActiveScenario {
            scenario_id: scenario.id.clone(),
            name: scenario.name.clone(),
        });
    }
    Ok(())
}

/// 生成不与现有方案重名的克隆名称
fn clone_name(source_name: &str, existing: &[Scenario]) -> String {
    let taken = |name: &str| existing.iter().any(|s| s.name.trim() == name);

    let base = format!("{}{}", source_name.trim(), CLONE_SUFFIX);
    if !taken(&base) {
        return base;
    }

    let mut n = 2;
    loop {
        let candidate = format!("{}_{}", base, n);
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
