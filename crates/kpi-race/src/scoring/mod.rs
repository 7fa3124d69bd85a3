//! Contest scoring: weighted rollups, rankings, score intake and unit provisioning.

pub mod domain;
pub mod intake;
pub mod provisioning;
pub mod ranking;
pub mod repository;
pub mod rounding;
pub mod router;
pub mod service;
pub mod summary;

#[cfg(test)]
pub(crate) mod tests;

pub use domain::{
    CategoryId, CategoryKind, Metric, MetricCategory, MetricId, Period, PeriodId, PeriodStatus,
    Score, ScoreId, Stage, StageId, Unit, UnitId, UnitKind,
};
pub use intake::{
    Actor, ImportReport, RowOutcome, ScoreBatch, ScoreImportError, ScoreIntakeError,
    ScoreIntakeService, ScoreRequest,
};
pub use provisioning::{check_weight_budget, provision_unit, ProvisioningError};
pub use ranking::{
    Page, PageMeta, PageRequest, RankingError, RankingService, StagePodium, UnitRanking,
};
pub use repository::{
    CategoryStore, ContestRepository, RepositoryError, ScoreDraft, ScoreWriter, ScoringStore,
    UnitDirectory,
};
pub use router::{scoring_router, USER_EMAIL_HEADER};
pub use service::ScoringService;
pub use summary::{
    CategoryResult, GroupStatus, MetricBoard, OverallSummary, PeriodSummary, ScoreLookup,
    StageSummary, SummaryEngine, SummaryError, UnitBoardStatus, UnitScope,
};
