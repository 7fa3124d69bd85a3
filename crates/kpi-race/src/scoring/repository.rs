use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::domain::{
    CategoryKind, Metric, MetricCategory, MetricId, Period, PeriodId, Score, Stage, StageId, Unit,
    UnitId,
};

/// Read side of the persistence collaborator. The engine only ever reads through this trait.
pub trait ContestRepository: Send + Sync {
    fn unit(&self, id: UnitId) -> Result<Option<Unit>, RepositoryError>;
    /// All units in their enumeration order, active or not.
    fn units(&self) -> Result<Vec<Unit>, RepositoryError>;
    fn stage(&self, id: StageId) -> Result<Option<Stage>, RepositoryError>;
    /// All stages in system order (ascending id).
    fn stages(&self) -> Result<Vec<Stage>, RepositoryError>;
    fn period(&self, id: PeriodId) -> Result<Option<Period>, RepositoryError>;
    fn periods_of_stage(&self, stage: StageId) -> Result<Vec<Period>, RepositoryError>;
    fn metric(&self, id: MetricId) -> Result<Option<Metric>, RepositoryError>;
    fn metrics(&self, unit: UnitId, category: CategoryKind) -> Result<Vec<Metric>, RepositoryError>;
    fn score(&self, metric: MetricId, period: PeriodId) -> Result<Option<Score>, RepositoryError>;
    /// Most recently updated score of a metric across all periods.
    fn latest_score(&self, metric: MetricId) -> Result<Option<Score>, RepositoryError>;

    /// The single active stage, if any.
    fn active_stage(&self) -> Result<Option<Stage>, RepositoryError> {
        Ok(self.stages()?.into_iter().find(|stage| stage.active))
    }
}

/// Write side used by score intake. At most one score exists per (metric, period).
pub trait ScoreWriter: Send + Sync {
    fn upsert_score(&self, score: ScoreDraft) -> Result<Score, RepositoryError>;
}

/// Values for a score upsert once intake validation has passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreDraft {
    pub metric_id: MetricId,
    pub period_id: PeriodId,
    pub plan_value: Decimal,
    pub actual_value: Decimal,
    pub ratio: Decimal,
    pub updated_by: Option<String>,
}

/// Category records per unit, used only by explicit provisioning.
pub trait CategoryStore: Send + Sync {
    fn categories(&self, unit: UnitId) -> Result<Vec<MetricCategory>, RepositoryError>;
    fn insert_category(
        &self,
        unit: UnitId,
        kind: CategoryKind,
    ) -> Result<MetricCategory, RepositoryError>;
}

/// Session and profile lookups owned by the user-management collaborator.
pub trait UnitDirectory: Send + Sync {
    /// Unit assigned to the signed-in user, identified by e-mail.
    fn unit_for_user(&self, email: &str) -> Result<Option<UnitId>, RepositoryError>;
    /// Avatar of the first user attached to a unit.
    fn avatar_for_unit(&self, unit: UnitId) -> Result<Option<String>, RepositoryError>;
    /// Clocks the user may enter scores for. Unknown users get none.
    fn input_categories(&self, email: &str) -> Result<Vec<CategoryKind>, RepositoryError>;
}

/// Everything the HTTP surface reads and writes, served by one backing store.
pub trait ScoringStore: ContestRepository + ScoreWriter + UnitDirectory {}

impl<T> ScoringStore for T where T: ContestRepository + ScoreWriter + UnitDirectory {}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
