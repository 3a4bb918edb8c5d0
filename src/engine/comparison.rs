// ==========================================
// 解耦点策略引擎 - 方案对比
// ==========================================
// 用途: 切换激活方案前预览影响（哪些产品-地点对会新增/失去自动指定）
// ==========================================

use crate::domain::designation::ProductLocationKey;
use crate::domain::scenario::Scenario;
use crate::domain::types::DecisionOutcome;
use crate::engine::decision::{DecisionEngine, InvalidScoreError};
use crate::engine::scoring::{composite_score, FactorScores};
use serde::{Deserialize, Serialize};

/// 单项变化方向（以"是否自动指定"为口径）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComparisonChange {
    Gained,    // 候选方案下新增自动指定
    Lost,      // 候选方案下不再自动指定
    Unchanged, // 自动指定与否不变
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub pair: ProductLocationKey,
    pub current_score: f64,
    pub current_outcome: DecisionOutcome,
    pub candidate_score: f64,
    pub candidate_outcome: DecisionOutcome,
    pub change: ComparisonChange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioComparison {
    pub current_scenario: String,
    pub candidate_scenario: String,
    pub rows: Vec<ComparisonRow>,
    pub gained: usize,
    pub lost: usize,
    pub unchanged: usize,
}

impl ScenarioComparison {
    /// 受影响的产品-地点对数量
    pub fn affected(&self) -> usize {
        self.gained + self.lost
    }
}

/// 在两个方案下分别计算综合评分与分级结论
pub fn compare_scenarios(
    items: &[(ProductLocationKey, FactorScores)],
    current: &Scenario,
    candidate: &Scenario,
) -> Result<ScenarioComparison, InvalidScoreError> {
    let engine = DecisionEngine::new();
    let mut rows = Vec::with_capacity(items.len());

    for (pair, scores) in items {
        let current_score = composite_score(scores, &current.weights)
            .map_err(|e| InvalidScoreError::new(format!("{} {}", pair, e.subject), e.score))?;
        let candidate_score = composite_score(scores, &candidate.weights)
            .map_err(|e| InvalidScoreError::new(format!("{} {}", pair, e.subject), e.score))?;

        let current_outcome = engine.classify(current_score, current)?.outcome;
        let candidate_outcome = engine.classify(candidate_score, candidate)?.outcome;

        let was = current_outcome == DecisionOutcome::AutoDesignate;
        let will = candidate_outcome == DecisionOutcome::AutoDesignate;
        let change = match (was, will) {
            (false, true) => ComparisonChange::Gained,
            (true, false) => ComparisonChange::Lost,
            _ => ComparisonChange::Unchanged,
        };

        rows.push(ComparisonRow {
            pair: pair.clone(),
            current_score,
            current_outcome,
            candidate_score,
            candidate_outcome,
            change,
        });
    }

    let count = |c: ComparisonChange| rows.iter().filter(|r| r.change == c).count();
    let gained = count(ComparisonChange::Gained);
    let lost = count(ComparisonChange::Lost);
    let unchanged = count(ComparisonChange::Unchanged);

    Ok(ScenarioComparison {
        current_scenario: current.name.clone(),
        candidate_scenario: candidate.name.clone(),
        rows,
        gained,
        lost,
        unchanged,
    })
}
