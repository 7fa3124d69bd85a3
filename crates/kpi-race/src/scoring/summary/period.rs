use tracing::debug;

use super::category::tally_period;
use super::views::{PeriodRef, PeriodSummary, UnitRef};
use super::{SummaryEngine, SummaryError};
use crate::scoring::domain::{CategoryKind, PeriodId, UnitId};
use crate::scoring::repository::ContestRepository;

impl<R> SummaryEngine<R>
where
    R: ContestRepository + 'static,
{
    /// The three clocks of a unit for one period, each standing on its own.
    pub fn summarize_by_period(
        &self,
        unit_id: UnitId,
        period_id: PeriodId,
    ) -> Result<PeriodSummary, SummaryError> {
        let unit = self.require_unit(unit_id)?;
        let period = self.require_period(period_id)?;

        let clocks = CategoryKind::ordered()
            .into_iter()
            .map(|kind| {
                tally_period(self.repository(), unit.id, kind, period.id)
                    .map(|tally| tally.into_result(kind))
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(unit = %unit.id, period = %period.id, "period summary built");

        Ok(PeriodSummary {
            unit: UnitRef::from(&unit),
            period: PeriodRef::from(&period),
            clocks,
        })
    }
}
