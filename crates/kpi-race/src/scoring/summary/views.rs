use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::scoring::domain::{
    CategoryKind, MetricId, Period, PeriodId, Score, ScoreId, Stage, StageId, Unit, UnitId,
    UnitKind,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitRef {
    pub unit_id: UnitId,
    pub unit_code: String,
    pub unit_name: String,
}

impl From<&Unit> for UnitRef {
    fn from(unit: &Unit) -> Self {
        Self {
            unit_id: unit.id,
            unit_code: unit.code.clone(),
            unit_name: unit.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodRef {
    pub period_id: PeriodId,
    pub period_name: String,
}

impl From<&Period> for PeriodRef {
    fn from(period: &Period) -> Self {
        Self {
            period_id: period.id,
            period_name: period.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageRef {
    pub stage_id: StageId,
    pub stage_name: String,
}

impl From<&Stage> for StageRef {
    fn from(stage: &Stage) -> Self {
        Self {
            stage_id: stage.id,
            stage_name: stage.name.clone(),
        }
    }
}

/// One clock's rollup. All three figures carry two decimal places.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryResult {
    pub name: CategoryKind,
    pub total_weight: Decimal,
    pub achieved_weight: Decimal,
    pub achieved_percent: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodSummary {
    #[serde(flatten)]
    pub unit: UnitRef,
    #[serde(flatten)]
    pub period: PeriodRef,
    pub clocks: Vec<CategoryResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageSummary {
    #[serde(flatten)]
    pub unit: UnitRef,
    #[serde(flatten)]
    pub stage: StageRef,
    pub clocks: Vec<CategoryResult>,
    pub total_weight: Decimal,
    pub total_achieved_weight: Decimal,
    pub total_achieved_percent: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverallRow {
    pub stage_id: StageId,
    pub stage_name: String,
    pub stage_weight: Decimal,
    pub weighted_achieved: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Per-unit contest table. `total_weighted_achieved` is the plain sum of stage contributions and
/// is not re-divided by `total_weight`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverallSummary {
    #[serde(flatten)]
    pub unit: UnitRef,
    pub table: Vec<OverallRow>,
    pub total_weight: Decimal,
    pub total_weighted_achieved: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreInfo {
    pub score_id: ScoreId,
    pub period_id: PeriodId,
    pub plan_value: Option<Decimal>,
    pub actual_value: Option<Decimal>,
    pub ratio: Option<Decimal>,
}

impl From<&Score> for ScoreInfo {
    fn from(score: &Score) -> Self {
        Self {
            score_id: score.id,
            period_id: score.period_id,
            plan_value: score.plan_value,
            actual_value: score.actual_value,
            ratio: score.ratio,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricLine {
    pub metric_id: MetricId,
    pub metric_name: String,
    pub description: Option<String>,
    pub weight: Decimal,
    pub score: Option<ScoreInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryBoard {
    pub name: CategoryKind,
    pub fully_scored: bool,
    pub metrics: Vec<MetricLine>,
    pub total_weight: Decimal,
    pub achieved_weight: Decimal,
    pub achieved_percent: Decimal,
}

/// Metric-by-metric view of a unit's three clocks for one period or the latest scores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricBoard {
    #[serde(flatten)]
    pub unit: UnitRef,
    pub groups: Vec<CategoryBoard>,
}

/// Whether one clock of a unit has a complete score for every metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupStatus {
    pub name: CategoryKind,
    pub fully_scored: bool,
}

/// One row of the unit list shown to score-entry staff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitBoardStatus {
    #[serde(flatten)]
    pub unit: UnitRef,
    pub kind: UnitKind,
    pub groups: Vec<GroupStatus>,
}
