// ==========================================
// AutoDesignationJob 集成测试
// ==========================================
// 测试范围:
// 1. 无激活方案时报错
// 2. 批量截断、剔除已指定、分级汇总
// 3. 非法评分/重复产品-地点对整批拒绝（含被截断、已指定的行）
// 4. 使用 config_kv 中的默认缓冲配置
// 5. 从 CSV 文件执行
// ==========================================

mod helpers;

use std::io::Write;
use std::sync::Arc;

use decoupling_policy::api::{ApiError, AutoDesignationJob};
use decoupling_policy::config::config_keys;
use decoupling_policy::domain::{DesignationSource, ScoredPair};
use decoupling_policy::importer::ImportError;
use helpers::api_test_helper::*;
use helpers::mock_config::MockPolicyConfig;

fn job_with(
    env: &ApiTestEnv,
    config: MockPolicyConfig,
) -> AutoDesignationJob<MockPolicyConfig> {
    AutoDesignationJob::new(
        Arc::new(config),
        env.scenario_api.clone(),
        env.designation_api.clone(),
    )
}

fn activate_default(env: &ApiTestEnv) {
    let s = env.scenario_api.create(draft("default"), "planner").unwrap();
    env.scenario_api.activate(&s.id, "planner").unwrap();
}

#[tokio::test]
async fn test_run_无激活方案() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.scenario_api.create(draft("idle"), "planner").unwrap();

    let job = job_with(&env, MockPolicyConfig::default());
    let err = job
        .run(&[ScoredPair::new("P1", "L1", 90.0)], "job")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
    assert_eq!(env.designation_repo.count().unwrap(), 0);
}

#[tokio::test]
async fn test_run_截断并剔除已指定() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    activate_default(&env);
    env.seed_catalog(&[("P1", "L1", None)]);
    env.designation_api
        .designate_manual("P1", "L1", "BP_MANUAL", Some("人工"), "engineer")
        .unwrap();

    let scores = vec![
        ScoredPair::new("P1", "L1", 95.0),
        ScoredPair::new("P2", "L1", 85.0),
        ScoredPair::new("P3", "L1", 55.0),
        ScoredPair::new("P4", "L1", 20.0),
        ScoredPair::new("P5", "L1", 99.0),
    ];

    let job = job_with(&env, MockPolicyConfig::with_batch_size(3));
    let summary = job.run(&scores, "job").await.unwrap();

    assert_eq!(summary.scenario_name, "default");
    assert_eq!(summary.truncated, 2);
    assert_eq!(summary.skipped_already_designated, 1);
    assert_eq!(summary.total_analyzed, 2);
    assert_eq!(summary.auto_designated, 1);
    assert_eq!(summary.review_required, 1);
    assert_eq!(summary.auto_rejected, 0);
    assert_eq!(summary.review_queue[0].pair.product_id, "P3");

    let p2 = env.designation_api.find_by_pair("P2", "L1").unwrap().unwrap();
    assert_eq!(p2.source, DesignationSource::Auto);
    assert_eq!(p2.buffer_profile_id, "BP_MOCK");

    // 超出批量的 P5 未处理
    assert!(env.designation_api.find_by_pair("P5", "L1").unwrap().is_none());

    let p1 = env.designation_api.find_by_pair("P1", "L1").unwrap().unwrap();
    assert_eq!(p1.designation_reason.as_deref(), Some("人工"));
}

#[tokio::test]
async fn test_run_非法评分整批拒绝() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    activate_default(&env);

    let scores = vec![
        ScoredPair::new("P1", "L1", 90.0),
        ScoredPair::new("P2", "L1", 120.0),
    ];

    let job = job_with(&env, MockPolicyConfig::default());
    let err = job.run(&scores, "job").await.unwrap_err();
    match err {
        ApiError::InvalidScore(e) => {
            assert_eq!(e.subject, "P2 @ L1");
            assert_eq!(e.score, 120.0);
        }
        other => panic!("期望 InvalidScore，实际: {other}"),
    }
    assert_eq!(env.designation_repo.count().unwrap(), 0);
}

#[tokio::test]
async fn test_run_已指定行的非法评分同样拒绝() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    activate_default(&env);
    env.seed_catalog(&[("P1", "L1", None)]);
    env.designation_api
        .designate_manual("P1", "L1", "BP_MANUAL", None, "engineer")
        .unwrap();

    let scores = vec![
        ScoredPair::new("P1", "L1", 150.0),
        ScoredPair::new("P2", "L1", 85.0),
    ];

    let job = job_with(&env, MockPolicyConfig::default());
    let err = job.run(&scores, "job").await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidScore(ref e) if e.subject == "P1 @ L1"));
    assert_eq!(env.designation_repo.count().unwrap(), 1);
    assert!(env.designation_api.find_by_pair("P2", "L1").unwrap().is_none());
}

#[tokio::test]
async fn test_run_截断行的非法评分同样拒绝() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    activate_default(&env);

    let scores = vec![
        ScoredPair::new("P1", "L1", 85.0),
        ScoredPair::new("P2", "L1", f64::NAN),
    ];

    let job = job_with(&env, MockPolicyConfig::with_batch_size(1));
    let err = job.run(&scores, "job").await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidScore(ref e) if e.subject == "P2 @ L1"));
    assert_eq!(env.designation_repo.count().unwrap(), 0);
}

#[tokio::test]
async fn test_run_重复产品地点对拒绝() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    activate_default(&env);

    let scores = vec![
        ScoredPair::new("P1", "L1", 90.0),
        ScoredPair::new("P2", "L1", 80.0),
        ScoredPair::new("P1", "L1", 95.0),
    ];

    let job = job_with(&env, MockPolicyConfig::default());
    let err = job.run(&scores, "job").await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(ref msg) if msg.contains("P1 @ L1")));
    assert_eq!(env.designation_repo.count().unwrap(), 0);
}

#[tokio::test]
async fn test_run_使用激活方案阈值与config_kv() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let strict = env
        .scenario_api
        .create(draft("strict").with_thresholds(60.0, 90.0), "planner")
        .unwrap();
    env.scenario_api.activate(&strict.id, "planner").unwrap();
    env.config
        .set_global_config_value(config_keys::DEFAULT_BUFFER_PROFILE_ID, "BP_SITE")
        .unwrap();

    let job = AutoDesignationJob::new(
        env.config.clone(),
        env.scenario_api.clone(),
        env.designation_api.clone(),
    );
    let summary = job
        .run(
            &[
                ScoredPair::new("P1", "L1", 92.0),
                ScoredPair::new("P2", "L1", 85.0),
                ScoredPair::new("P3", "L1", 40.0),
            ],
            "job",
        )
        .await
        .unwrap();

    assert_eq!(summary.auto_designated, 1);
    assert_eq!(summary.review_required, 1);
    assert_eq!(summary.auto_rejected, 1);

    let p1 = env.designation_api.find_by_pair("P1", "L1").unwrap().unwrap();
    assert_eq!(p1.buffer_profile_id, "BP_SITE");
    assert_eq!(
        p1.designation_reason.as_deref(),
        Some("自动指定: 评分 92.00 (方案 strict)")
    );
}

#[tokio::test]
async fn test_run_file_导入并执行() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    activate_default(&env);

    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    writeln!(file, "product_id,location_id,score").unwrap();
    writeln!(file, "P1,L1,88.5").unwrap();
    writeln!(file, "P2,L1,42").unwrap();
    file.flush().unwrap();

    let job = job_with(&env, MockPolicyConfig::default());
    let summary = job.run_file(file.path(), "job").await.unwrap();
    assert_eq!(summary.total_analyzed, 2);
    assert_eq!(summary.auto_designated, 1);
    assert_eq!(summary.auto_rejected, 1);
    assert!(env.designation_api.find_by_pair("P1", "L1").unwrap().is_some());
}

#[tokio::test]
async fn test_run_file_文件不存在() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    activate_default(&env);

    let job = job_with(&env, MockPolicyConfig::default());
    let err = job
        .run_file(std::path::Path::new("/nonexistent/scores.csv"), "job")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::ImportFailed(ImportError::FileNotFound(_))));
}
