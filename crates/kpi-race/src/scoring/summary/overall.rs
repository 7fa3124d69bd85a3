use rust_decimal::Decimal;
use tracing::debug;

use super::views::{OverallRow, OverallSummary, UnitRef};
use super::{SummaryEngine, SummaryError};
use crate::scoring::domain::{Stage, UnitId};
use crate::scoring::repository::ContestRepository;
use crate::scoring::rounding::{display, half_up, HUNDRED, INTERMEDIATE_SCALE};

/// `stage_percent x stage_weight / 100` at the intermediate scale.
pub(crate) fn stage_contribution(stage_percent: Decimal, stage: &Stage) -> Decimal {
    half_up(
        stage_percent * Decimal::from(stage.weight) / HUNDRED,
        INTERMEDIATE_SCALE,
    )
}

impl<R> SummaryEngine<R>
where
    R: ContestRepository + 'static,
{
    /// One row per stage plus the accumulated weighted achievement. Contributions are summed as
    /// they are; the total is not renormalized by the stage weights.
    pub fn summarize_overall(&self, unit_id: UnitId) -> Result<OverallSummary, SummaryError> {
        let unit = self.require_unit(unit_id)?;
        let stages = self.repository().stages()?;
        if stages.is_empty() {
            return Err(SummaryError::not_found("stages", "in contest"));
        }

        let mut table = Vec::with_capacity(stages.len());
        let mut total_weight = Decimal::ZERO;
        let mut total_weighted_achieved = Decimal::ZERO;

        for stage in &stages {
            let summary = self.summarize_by_stage(unit.id, stage.id)?;
            let contribution = stage_contribution(summary.total_achieved_percent, stage);
            let stage_weight = Decimal::from(stage.weight);

            total_weighted_achieved += contribution;
            total_weight += stage_weight;

            table.push(OverallRow {
                stage_id: stage.id,
                stage_name: stage.name.clone(),
                stage_weight: display(stage_weight),
                weighted_achieved: display(contribution),
                start_date: stage.start_date,
                end_date: stage.end_date,
            });
        }

        debug!(unit = %unit.id, stages = stages.len(), %total_weighted_achieved, "overall summary built");

        Ok(OverallSummary {
            unit: UnitRef::from(&unit),
            table,
            total_weight: display(total_weight),
            total_weighted_achieved: display(total_weighted_achieved),
        })
    }
}
