use rust_decimal::Decimal;
use tracing::debug;

use super::category::{achieved_weight, find_score, list_metrics, CategoryTally, ScoreLookup};
use super::views::{StageRef, StageSummary, UnitRef};
use super::{SummaryEngine, SummaryError};
use crate::scoring::domain::{CategoryKind, Period, StageId, UnitId};
use crate::scoring::repository::{ContestRepository, RepositoryError};
use crate::scoring::rounding::{average_over, display, percent_of};

impl<R> SummaryEngine<R>
where
    R: ContestRepository + 'static,
{
    /// Stage rollup: per clock, the achieved weight is the average over the stage's periods, not
    /// their sum.
    pub fn summarize_by_stage(
        &self,
        unit_id: UnitId,
        stage_id: StageId,
    ) -> Result<StageSummary, SummaryError> {
        let unit = self.require_unit(unit_id)?;
        let stage = self.require_stage(stage_id)?;

        let periods = self.repository().periods_of_stage(stage.id)?;
        if periods.is_empty() {
            return Err(SummaryError::not_found("periods for stage", stage.id));
        }
        if let Some(stray) = periods.iter().find(|period| period.stage_id != stage.id) {
            return Err(SummaryError::InvalidState(format!(
                "period {} belongs to stage {}, not {}",
                stray.id, stray.stage_id, stage.id
            )));
        }

        let mut clocks = Vec::with_capacity(3);
        let mut total_weight = Decimal::ZERO;
        let mut total_achieved = Decimal::ZERO;

        for kind in CategoryKind::ordered() {
            let tally = tally_stage(self.repository(), unit.id, kind, &periods)?;
            total_weight += tally.total_weight;
            total_achieved += tally.achieved_weight;
            clocks.push(tally.into_result(kind));
        }

        let total_percent = percent_of(total_achieved, total_weight);
        debug!(
            unit = %unit.id,
            stage = %stage.id,
            periods = periods.len(),
            %total_percent,
            "stage summary built"
        );

        Ok(StageSummary {
            unit: UnitRef::from(&unit),
            stage: StageRef::from(&stage),
            clocks,
            total_weight: display(total_weight),
            total_achieved_weight: display(total_achieved),
            total_achieved_percent: display(total_percent),
        })
    }
}

fn tally_stage<R>(
    repository: &R,
    unit: UnitId,
    category: CategoryKind,
    periods: &[Period],
) -> Result<CategoryTally, RepositoryError>
where
    R: ContestRepository + ?Sized,
{
    let mut total_weight = Decimal::ZERO;
    let mut accumulated = Decimal::ZERO;

    for metric in list_metrics(repository, unit, category)? {
        total_weight += metric.weight;
        for period in periods {
            let score = find_score(repository, metric.metric_id, ScoreLookup::Period(period.id))?;
            accumulated += achieved_weight(metric.weight, score.as_ref());
        }
    }

    Ok(CategoryTally {
        total_weight,
        achieved_weight: average_over(accumulated, periods.len()),
    })
}
