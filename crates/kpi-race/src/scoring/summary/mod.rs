//! Weighted rollups from metric scores to clocks, periods, stages and the whole contest.
//!
//! Every caller (admin views, a unit's own dashboard, rankings) goes through the same
//! [`SummaryEngine`]; only the way the unit id is obtained differs, see [`UnitScope`].

mod board;
pub mod category;
mod overall;
mod period;
mod stage;
pub mod views;

use std::sync::Arc;

use crate::scoring::domain::{Period, PeriodId, Stage, StageId, Unit, UnitId};
use crate::scoring::ranking::PageError;
use crate::scoring::repository::{ContestRepository, RepositoryError, UnitDirectory};

pub use category::{aggregate_category, find_score, list_metrics, MetricWeight, ScoreLookup};
pub use views::{
    CategoryBoard, CategoryResult, GroupStatus, MetricBoard, MetricLine, OverallRow,
    OverallSummary, PeriodRef, PeriodSummary, ScoreInfo, StageRef, StageSummary, UnitBoardStatus,
    UnitRef,
};

/// Stateless facade over the read-only repository.
pub struct SummaryEngine<R> {
    repository: Arc<R>,
}

impl<R> Clone for SummaryEngine<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R> SummaryEngine<R>
where
    R: ContestRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub(crate) fn require_unit(&self, id: UnitId) -> Result<Unit, SummaryError> {
        self.repository
            .unit(id)?
            .ok_or_else(|| SummaryError::not_found("unit", id))
    }

    pub(crate) fn require_stage(&self, id: StageId) -> Result<Stage, SummaryError> {
        self.repository
            .stage(id)?
            .ok_or_else(|| SummaryError::not_found("stage", id))
    }

    pub(crate) fn require_period(&self, id: PeriodId) -> Result<Period, SummaryError> {
        self.repository
            .period(id)?
            .ok_or_else(|| SummaryError::not_found("period", id))
    }
}

/// How the unit of a summary request is identified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitScope {
    /// An explicit unit chosen by an admin or the ranking builder.
    Unit(UnitId),
    /// The unit of the signed-in user, identified by e-mail.
    CurrentUser(String),
}

impl UnitScope {
    pub fn resolve<D>(&self, directory: &D) -> Result<UnitId, SummaryError>
    where
        D: UnitDirectory + ?Sized,
    {
        match self {
            UnitScope::Unit(id) => Ok(*id),
            UnitScope::CurrentUser(email) => directory
                .unit_for_user(email)?
                .ok_or_else(|| SummaryError::not_found("unit assignment for user", email)),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error(transparent)]
    Page(#[from] PageError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl SummaryError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
