use rust_decimal::Decimal;

use super::views::CategoryResult;
use crate::scoring::domain::{CategoryKind, MetricId, PeriodId, Score, UnitId};
use crate::scoring::repository::{ContestRepository, RepositoryError};
use crate::scoring::rounding::{display, normalize_ratio, percent_of};

/// A metric's contribution to its category denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricWeight {
    pub metric_id: MetricId,
    pub weight: Decimal,
}

/// Metrics contributing to one clock of one unit. Missing weights count as zero.
pub fn list_metrics<R>(
    repository: &R,
    unit: UnitId,
    category: CategoryKind,
) -> Result<Vec<MetricWeight>, RepositoryError>
where
    R: ContestRepository + ?Sized,
{
    Ok(repository
        .metrics(unit, category)?
        .into_iter()
        .map(|metric| MetricWeight {
            metric_id: metric.id,
            weight: metric.weight.unwrap_or(Decimal::ZERO),
        })
        .collect())
}

/// Which score a lookup should return for a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreLookup {
    /// The score recorded for exactly this period.
    Period(PeriodId),
    /// The most recently updated score, whichever period it belongs to.
    Latest,
}

impl From<Option<PeriodId>> for ScoreLookup {
    fn from(period: Option<PeriodId>) -> Self {
        period.map_or(Self::Latest, Self::Period)
    }
}

pub fn find_score<R>(
    repository: &R,
    metric: MetricId,
    lookup: ScoreLookup,
) -> Result<Option<Score>, RepositoryError>
where
    R: ContestRepository + ?Sized,
{
    match lookup {
        ScoreLookup::Period(period) => repository.score(metric, period),
        ScoreLookup::Latest => repository.latest_score(metric),
    }
}

/// `weight x ratio/100` for a scored metric; zero when unscored or the ratio is missing.
pub(crate) fn achieved_weight(weight: Decimal, score: Option<&Score>) -> Decimal {
    match score.and_then(|score| score.ratio) {
        Some(ratio) => weight * normalize_ratio(ratio),
        None => Decimal::ZERO,
    }
}

/// Full-precision running sums for one clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct CategoryTally {
    pub(crate) total_weight: Decimal,
    pub(crate) achieved_weight: Decimal,
}

impl CategoryTally {
    pub(crate) fn percent(&self) -> Decimal {
        percent_of(self.achieved_weight, self.total_weight)
    }

    pub(crate) fn into_result(self, name: CategoryKind) -> CategoryResult {
        CategoryResult {
            name,
            total_weight: display(self.total_weight),
            achieved_weight: display(self.achieved_weight),
            achieved_percent: display(self.percent()),
        }
    }
}

/// Rolls up one clock against a single period.
pub(crate) fn tally_period<R>(
    repository: &R,
    unit: UnitId,
    category: CategoryKind,
    period: PeriodId,
) -> Result<CategoryTally, RepositoryError>
where
    R: ContestRepository + ?Sized,
{
    let mut tally = CategoryTally::default();
    for metric in list_metrics(repository, unit, category)? {
        tally.total_weight += metric.weight;
        let score = find_score(repository, metric.metric_id, ScoreLookup::Period(period))?;
        tally.achieved_weight += achieved_weight(metric.weight, score.as_ref());
    }
    Ok(tally)
}

/// Total weight, achieved weight and achieved percent of one clock within one period.
pub fn aggregate_category<R>(
    repository: &R,
    unit: UnitId,
    category: CategoryKind,
    period: PeriodId,
) -> Result<CategoryResult, RepositoryError>
where
    R: ContestRepository + ?Sized,
{
    Ok(tally_period(repository, unit, category, period)?.into_result(category))
}
