// ==========================================
// ScenarioApi 集成测试
// ==========================================
// 测试范围:
// 1. 新建/克隆: 校验、命名冲突、锁定方案可克隆
// 2. 修改/删除: 锁定保护、激活保护、乐观锁
// 3. 激活: 单一激活、幂等、并发激活
// 4. 停用: 不可直接停用激活方案
// 5. 默认方案初始化、方案对比
// ==========================================

mod helpers;

use std::sync::Arc;
use std::thread;

use decoupling_policy::api::ApiError;
use decoupling_policy::config::config_keys;
use decoupling_policy::domain::{
    ActionLog, ActionType, FactorWeights, ProductLocationKey, ScenarioPatch,
};
use decoupling_policy::engine::{FactorScores, ValidationError};
use decoupling_policy::repository::RepositoryError;
use helpers::api_test_helper::*;
use helpers::mock_config::MockPolicyConfig;

// ==========================================
// 新建 / 克隆
// ==========================================

#[test]
fn test_create_新建方案默认未激活未锁定() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");

    let mut input = draft("baseline");
    input.is_active = true;
    input.is_locked = true;

    let created = env.scenario_api.create(input, "planner").expect("新建失败");

    assert!(!created.id.is_empty());
    assert!(!created.is_active);
    assert!(!created.is_locked);
    assert_eq!(created.version, 1);

    let stored = env.scenario_api.get(&created.id).expect("查询失败");
    assert_eq!(stored.name, "baseline");
    assert_eq!(stored.weights, FactorWeights::default());

    let logs = env.action_log_repo.find_by_target(&created.id).unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].action_type, ActionType::CreateScenario);
    assert_eq!(logs[0].actor, "planner");
}

#[test]
fn test_create_权重合计1_005失败() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");

    let err = env
        .scenario_api
        .create(draft_with_overweight("overweight"), "planner")
        .unwrap_err();

    match err {
        ApiError::ValidationFailed(ValidationError::WeightSum { total }) => {
            assert!((total - 1.005).abs() < 1e-9);
        }
        other => panic!("期望 WeightSum，实际: {other}"),
    }
    assert!(env.scenario_api.list().unwrap().is_empty());
}

#[test]
fn test_create_名称与阈值校验() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.scenario_api.create(draft("baseline"), "planner").unwrap();

    let err = env.scenario_api.create(draft(" baseline "), "planner").unwrap_err();
    assert!(matches!(
        err,
        ApiError::ValidationFailed(ValidationError::DuplicateName { .. })
    ));

    let err = env.scenario_api.create(draft("   "), "planner").unwrap_err();
    assert!(matches!(err, ApiError::ValidationFailed(ValidationError::EmptyName)));

    let err = env
        .scenario_api
        .create(draft("inverted").with_thresholds(80.0, 60.0), "planner")
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::ValidationFailed(ValidationError::ThresholdRange { .. })
    ));

    assert_eq!(env.scenario_api.list().unwrap().len(), 1);
}

#[test]
fn test_clone_锁定方案可克隆且命名递增() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let source = env
        .scenario_api
        .create(draft("base").with_thresholds(40.0, 80.0), "planner")
        .unwrap();
    env.scenario_api.activate(&source.id, "planner").unwrap();
    env.scenario_api.set_locked(&source.id, true, "planner").unwrap();

    let first = env.scenario_api.clone_scenario(&source.id, "planner").unwrap();
    assert_eq!(first.name, "base_copy");
    assert_ne!(first.id, source.id);
    assert!(!first.is_active);
    assert!(!first.is_locked);
    assert_eq!(first.weights, source.weights);
    assert_eq!(first.review_threshold, 40.0);
    assert_eq!(first.auto_designate_threshold, 80.0);

    let second = env.scenario_api.clone_scenario(&source.id, "planner").unwrap();
    assert_eq!(second.name, "base_copy_2");

    // 原方案保持激活与锁定
    let source = env.scenario_api.get(&source.id).unwrap();
    assert!(source.is_active);
    assert!(source.is_locked);
    assert_eq!(env.active_count(), 1);
}

// ==========================================
// 修改 / 删除
// ==========================================

#[test]
fn test_update_合并补丁并递增版本() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let s = env.scenario_api.create(draft("baseline"), "planner").unwrap();

    let patch = ScenarioPatch {
        name: Some("baseline".to_string()),
        review_threshold: Some(45.0),
        description: Some(Some("调整复核线".to_string())),
        ..Default::default()
    };
    let updated = env.scenario_api.update(&s.id, &patch, "planner").unwrap();

    assert_eq!(updated.review_threshold, 45.0);
    assert_eq!(updated.description.as_deref(), Some("调整复核线"));
    assert_eq!(updated.version, 2);
}

#[test]
fn test_update_非法补丁不落库() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.scenario_api.create(draft("a"), "planner").unwrap();
    let b = env.scenario_api.create(draft("b"), "planner").unwrap();

    let rename = ScenarioPatch {
        name: Some("a".to_string()),
        ..Default::default()
    };
    let err = env.scenario_api.update(&b.id, &rename, "planner").unwrap_err();
    assert!(matches!(
        err,
        ApiError::ValidationFailed(ValidationError::DuplicateName { .. })
    ));

    let mut weights = FactorWeights::default();
    weights.volume = 0.0;
    let reweight = ScenarioPatch {
        weights: Some(weights),
        ..Default::default()
    };
    let err = env.scenario_api.update(&b.id, &reweight, "planner").unwrap_err();
    assert!(matches!(
        err,
        ApiError::ValidationFailed(ValidationError::WeightSum { .. })
    ));

    let stored = env.scenario_api.get(&b.id).unwrap();
    assert_eq!(stored.name, "b");
    assert_eq!(stored.weights, FactorWeights::default());
    assert_eq!(stored.version, 1);
}

#[test]
fn test_update_锁定方案拒绝修改() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let s = env.scenario_api.create(draft("frozen"), "planner").unwrap();
    env.scenario_api.set_locked(&s.id, true, "planner").unwrap();

    let patch = ScenarioPatch {
        review_threshold: Some(30.0),
        ..Default::default()
    };
    let err = env.scenario_api.update(&s.id, &patch, "planner").unwrap_err();
    assert!(matches!(err, ApiError::LockedScenario { .. }));

    // 解锁后可修改
    env.scenario_api.set_locked(&s.id, false, "planner").unwrap();
    let updated = env.scenario_api.update(&s.id, &patch, "planner").unwrap();
    assert_eq!(updated.review_threshold, 30.0);
}

#[test]
fn test_update_并发修改触发乐观锁() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let s = env.scenario_api.create(draft("baseline"), "planner").unwrap();
    let stale = env.scenario_api.get(&s.id).unwrap();

    let patch = ScenarioPatch {
        review_threshold: Some(55.0),
        ..Default::default()
    };
    env.scenario_api.update(&s.id, &patch, "user_a").unwrap();

    let audit = ActionLog::new(ActionType::UpdateScenario, "user_b", Some(&s.id));
    let err = env.scenario_repo.update(&stale, &audit).unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::OptimisticLockFailure {
            expected: 1,
            actual: 2,
            ..
        }
    ));
    assert!(matches!(ApiError::from(err), ApiError::OptimisticLockFailure(_)));
    assert_eq!(env.scenario_api.get(&s.id).unwrap().review_threshold, 55.0);
}

#[test]
fn test_delete_锁定方案删除失败列表不变() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let s = env.scenario_api.create(draft("frozen"), "planner").unwrap();
    env.scenario_api.create(draft("other"), "planner").unwrap();
    env.scenario_api.set_locked(&s.id, true, "planner").unwrap();

    let before = env.scenario_api.list().unwrap();
    let err = env.scenario_api.delete(&s.id, "planner").unwrap_err();
    assert!(matches!(err, ApiError::LockedScenario { .. }));
    assert_eq!(env.scenario_api.list().unwrap(), before);
}

#[test]
fn test_delete_不存在方案() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let err = env.scenario_api.delete("missing", "planner").unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[test]
fn test_e2e_激活B后可删除A不可删除B() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let a = env.scenario_api.create(draft("A"), "planner").unwrap();
    let b = env.scenario_api.create(draft("B"), "planner").unwrap();
    env.scenario_api.activate(&a.id, "planner").unwrap();

    // A 激活时不可删除
    let err = env.scenario_api.delete(&a.id, "planner").unwrap_err();
    assert!(matches!(err, ApiError::ActiveScenario { .. }));

    env.scenario_api.activate(&b.id, "planner").unwrap();
    env.scenario_api.delete(&a.id, "planner").expect("删除A失败");

    let err = env.scenario_api.delete(&b.id, "planner").unwrap_err();
    assert!(matches!(err, ApiError::ActiveScenario { .. }));

    let remaining = env.scenario_api.list().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, b.id);
    assert!(remaining[0].is_active);
}

// ==========================================
// 激活 / 停用
// ==========================================

#[test]
fn test_activate_任意序列后恰有一个激活() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let ids: Vec<String> = ["s1", "s2", "s3"]
        .iter()
        .map(|n| env.scenario_api.create(draft(n), "planner").unwrap().id)
        .collect();

    assert_eq!(env.active_count(), 0);
    for idx in [0, 1, 1, 2, 0, 2] {
        env.scenario_api.activate(&ids[idx], "planner").unwrap();
        assert_eq!(env.active_count(), 1);
        let active = env.scenario_api.get_active().unwrap().unwrap();
        assert_eq!(active.id, ids[idx]);
    }
}

#[test]
fn test_activate_替换原激活方案并记录日志() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let x = env.scenario_api.create(draft("X"), "planner").unwrap();
    let y = env.scenario_api.create(draft("Y"), "planner").unwrap();

    env.scenario_api.activate(&x.id, "planner").unwrap();
    let activated = env.scenario_api.activate(&y.id, "planner").unwrap();
    assert!(activated.is_active);
    assert!(!env.scenario_api.get(&x.id).unwrap().is_active);

    let logs = env.action_log_repo.find_by_target(&y.id).unwrap();
    let log = logs
        .iter()
        .find(|l| l.action_type == ActionType::ActivateScenario)
        .expect("缺少激活日志");
    let payload = log.payload_json.as_ref().unwrap();
    assert_eq!(payload["previous_active_id"], x.id.as_str());
}

#[test]
fn test_activate_已激活方案重复激活() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let s = env.scenario_api.create(draft("only"), "planner").unwrap();

    env.scenario_api.activate(&s.id, "planner").unwrap();
    let again = env.scenario_api.activate(&s.id, "planner").unwrap();
    assert!(again.is_active);
    assert_eq!(env.active_count(), 1);
}

#[test]
fn test_activate_不存在方案原激活不变() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let s = env.scenario_api.create(draft("only"), "planner").unwrap();
    env.scenario_api.activate(&s.id, "planner").unwrap();

    let err = env.scenario_api.activate("missing", "planner").unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
    assert_eq!(env.scenario_api.get_active().unwrap().unwrap().id, s.id);
}

#[test]
fn test_write_日志写入失败时整体回滚() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let a = env.scenario_api.create(draft("A"), "planner").unwrap();
    let b = env.scenario_api.create(draft("B"), "planner").unwrap();
    env.scenario_api.activate(&a.id, "planner").unwrap();
    env.drop_action_log_table();

    let err = env.scenario_api.create(draft("C"), "planner").unwrap_err();
    assert!(matches!(err, ApiError::DatabaseError(_)));
    assert_eq!(env.scenario_api.list().unwrap().len(), 2);

    let err = env.scenario_api.activate(&b.id, "planner").unwrap_err();
    assert!(matches!(err, ApiError::DatabaseError(_)));
    assert_eq!(env.scenario_api.get_active().unwrap().unwrap().id, a.id);

    assert!(env.scenario_api.set_locked(&a.id, true, "planner").is_err());
    assert!(!env.scenario_api.get(&a.id).unwrap().is_locked);

    env.restore_action_log_table();
    env.scenario_api.activate(&b.id, "planner").unwrap();
    assert_eq!(env.active_count(), 1);
}

#[test]
fn test_history_按时间倒序() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let s = env.scenario_api.create(draft("baseline"), "planner").unwrap();
    env.scenario_api.activate(&s.id, "planner").unwrap();
    env.scenario_api.set_locked(&s.id, true, "reviewer").unwrap();

    let types: Vec<ActionType> = env
        .scenario_api
        .history(&s.id)
        .unwrap()
        .iter()
        .map(|l| l.action_type)
        .collect();
    assert_eq!(
        types,
        vec![
            ActionType::LockScenario,
            ActionType::ActivateScenario,
            ActionType::CreateScenario
        ]
    );
}

#[test]
fn test_activate_并发激活保持单一激活() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let ids: Vec<String> = (0..6)
        .map(|i| {
            env.scenario_api
                .create(draft(&format!("s{}", i)), "planner")
                .unwrap()
                .id
        })
        .collect();

    let handles: Vec<_> = ids
        .iter()
        .cycle()
        .take(24)
        .cloned()
        .map(|id| {
            let api = Arc::clone(&env.scenario_api);
            thread::spawn(move || api.activate(&id, "worker"))
        })
        .collect();

    for handle in handles {
        handle.join().expect("线程异常").expect("激活失败");
    }

    assert_eq!(env.active_count(), 1);
}

#[test]
fn test_deactivate_不可直接停用激活方案() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let active = env.scenario_api.create(draft("active"), "planner").unwrap();
    let idle = env.scenario_api.create(draft("idle"), "planner").unwrap();
    env.scenario_api.activate(&active.id, "planner").unwrap();

    let err = env.scenario_api.deactivate(&active.id, "planner").unwrap_err();
    assert!(matches!(err, ApiError::CannotDeactivateSoleActive { .. }));
    assert!(env.scenario_api.get(&active.id).unwrap().is_active);

    // 未激活方案: 无操作
    env.scenario_api.deactivate(&idle.id, "planner").unwrap();

    let err = env.scenario_api.deactivate("missing", "planner").unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[test]
fn test_set_locked_不存在方案() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let err = env.scenario_api.set_locked("missing", true, "planner").unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

// ==========================================
// 默认方案 / 方案对比
// ==========================================

#[tokio::test]
async fn test_ensure_default_scenario_仅在空库时创建() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let config = MockPolicyConfig {
        auto_designate_threshold: 80.0,
        review_threshold: 60.0,
        ..Default::default()
    };

    let created = env
        .scenario_api
        .ensure_default_scenario(&config, "system")
        .await
        .unwrap()
        .expect("应创建默认方案");
    assert_eq!(created.name, "default");
    assert!(created.is_active);
    assert_eq!(created.auto_designate_threshold, 80.0);
    assert_eq!(created.review_threshold, 60.0);

    let second = env
        .scenario_api
        .ensure_default_scenario(&config, "system")
        .await
        .unwrap();
    assert!(second.is_none());
    assert_eq!(env.scenario_api.list().unwrap().len(), 1);
}

#[tokio::test]
async fn test_ensure_default_scenario_读取config_kv() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.config
        .set_global_config_value(config_keys::DEFAULT_AUTO_DESIGNATE_THRESHOLD, "75")
        .unwrap();

    let created = env
        .scenario_api
        .ensure_default_scenario(&*env.config, "system")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(created.auto_designate_threshold, 75.0);
    assert_eq!(created.review_threshold, 50.0);
}

#[test]
fn test_compare_阈值下调新增自动指定() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let strict = env
        .scenario_api
        .create(draft("strict").with_thresholds(50.0, 85.0), "planner")
        .unwrap();
    let relaxed = env
        .scenario_api
        .create(draft("relaxed").with_thresholds(50.0, 75.0), "planner")
        .unwrap();

    let items = vec![
        (ProductLocationKey::new("P1", "L1"), FactorScores::uniform(80.0)),
        (ProductLocationKey::new("P2", "L1"), FactorScores::uniform(30.0)),
        (ProductLocationKey::new("P3", "L1"), FactorScores::uniform(90.0)),
    ];

    let comparison = env
        .scenario_api
        .compare(&strict.id, &relaxed.id, &items)
        .unwrap();
    assert_eq!(comparison.gained, 1);
    assert_eq!(comparison.lost, 0);
    assert_eq!(comparison.unchanged, 2);
    assert_eq!(comparison.rows[0].pair, ProductLocationKey::new("P1", "L1"));

    // 反向对比
    let reverse = env
        .scenario_api
        .compare(&relaxed.id, &strict.id, &items)
        .unwrap();
    assert_eq!(reverse.lost, 1);

    let err = env
        .scenario_api
        .compare(&strict.id, &strict.id, &items)
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));
}
