//! Score upsert with the input checks applied before anything reaches the store.

pub mod import;

use std::collections::BTreeSet;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::scoring::domain::{CategoryKind, MetricId, PeriodId, Score, StageId};
use crate::scoring::repository::{ContestRepository, RepositoryError, ScoreDraft, ScoreWriter};
use crate::scoring::rounding::{half_up, DISPLAY_SCALE, HUNDRED};

pub use import::{ImportReport, ImportRow, RowOutcome, ScoreBatch, ScoreImportError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRequest {
    pub metric_id: MetricId,
    pub period_id: PeriodId,
    pub plan_value: Decimal,
    pub actual_value: Decimal,
    /// Derived from plan and actual when absent.
    #[serde(default)]
    pub ratio: Option<Decimal>,
}

/// Who is entering scores and which clocks they may touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub email: Option<String>,
    pub categories: BTreeSet<CategoryKind>,
}

impl Actor {
    pub fn new(email: impl Into<String>, categories: impl IntoIterator<Item = CategoryKind>) -> Self {
        Self {
            email: Some(email.into()),
            categories: categories.into_iter().collect(),
        }
    }

    /// Unattributed actor allowed to enter every clock, used by seeding and the CLI.
    pub fn system() -> Self {
        Self {
            email: None,
            categories: CategoryKind::ordered().into_iter().collect(),
        }
    }

    pub fn may_input(&self, category: CategoryKind) -> bool {
        self.categories.contains(&category)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScoreIntakeError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("not allowed to enter {category} scores")]
    Forbidden { category: CategoryKind },
    #[error("stage {stage} is not active")]
    StageInactive { stage: StageId },
    #[error("{0}")]
    InvalidValue(&'static str),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Checks plan and actual and settles the ratio. Returns the ratio to store.
pub fn validate_values(
    plan_value: Decimal,
    actual_value: Decimal,
    ratio: Option<Decimal>,
) -> Result<Decimal, ScoreIntakeError> {
    if plan_value <= Decimal::ZERO {
        return Err(ScoreIntakeError::InvalidValue(
            "plan value must be greater than 0",
        ));
    }
    if actual_value < Decimal::ZERO {
        return Err(ScoreIntakeError::InvalidValue(
            "actual value must not be negative",
        ));
    }
    if actual_value > plan_value {
        return Err(ScoreIntakeError::InvalidValue(
            "actual value must not exceed plan value",
        ));
    }

    let ratio = match ratio {
        Some(ratio) => ratio,
        None => derive_ratio(plan_value, actual_value)?,
    };
    if ratio < Decimal::ZERO {
        return Err(ScoreIntakeError::InvalidValue("ratio must not be negative"));
    }
    if ratio > HUNDRED {
        return Err(ScoreIntakeError::InvalidValue("ratio must not exceed 100"));
    }
    Ok(ratio)
}

/// `actual x 100 / plan`, half-up to two places. Values whose product leaves the decimal range
/// are rejected rather than rounded.
pub fn derive_ratio(plan_value: Decimal, actual_value: Decimal) -> Result<Decimal, ScoreIntakeError> {
    actual_value
        .checked_mul(HUNDRED)
        .and_then(|scaled| scaled.checked_div(plan_value))
        .map(|ratio| half_up(ratio, DISPLAY_SCALE))
        .ok_or(ScoreIntakeError::InvalidValue("values are too large"))
}

pub struct ScoreIntakeService<R> {
    repository: Arc<R>,
}

impl<R> Clone for ScoreIntakeService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R> ScoreIntakeService<R>
where
    R: ContestRepository + ScoreWriter + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Validates and upserts one score; an existing score for the same metric and period is
    /// replaced.
    pub fn submit(&self, actor: &Actor, request: ScoreRequest) -> Result<Score, ScoreIntakeError> {
        let metric = self
            .repository
            .metric(request.metric_id)?
            .ok_or_else(|| ScoreIntakeError::NotFound {
                entity: "metric",
                id: request.metric_id.to_string(),
            })?;

        if !actor.may_input(metric.category) {
            return Err(ScoreIntakeError::Forbidden {
                category: metric.category,
            });
        }

        let period = self
            .repository
            .period(request.period_id)?
            .ok_or_else(|| ScoreIntakeError::NotFound {
                entity: "period",
                id: request.period_id.to_string(),
            })?;

        match self.repository.stage(period.stage_id)? {
            Some(stage) if stage.active => {}
            _ => {
                return Err(ScoreIntakeError::StageInactive {
                    stage: period.stage_id,
                })
            }
        }

        let ratio = validate_values(request.plan_value, request.actual_value, request.ratio)?;
        let score = self.repository.upsert_score(ScoreDraft {
            metric_id: metric.id,
            period_id: period.id,
            plan_value: request.plan_value,
            actual_value: request.actual_value,
            ratio,
            updated_by: actor.email.clone(),
        })?;

        info!(
            metric = %score.metric_id,
            period = %score.period_id,
            %ratio,
            "score recorded"
        );
        Ok(score)
    }
}
