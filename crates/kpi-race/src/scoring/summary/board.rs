use rust_decimal::Decimal;

use super::category::{achieved_weight, find_score, CategoryTally, ScoreLookup};
use super::views::{
    CategoryBoard, GroupStatus, MetricBoard, MetricLine, ScoreInfo, UnitBoardStatus, UnitRef,
};
use super::{SummaryEngine, SummaryError};
use crate::scoring::domain::{CategoryKind, Unit, UnitId, UnitKind};
use crate::scoring::ranking::{paginate, Page, PageRequest};
use crate::scoring::repository::ContestRepository;

impl<R> SummaryEngine<R>
where
    R: ContestRepository + 'static,
{
    /// Metric-level detail of all three clocks, scored against one period or, for
    /// [`ScoreLookup::Latest`], each metric's most recently updated score.
    pub fn metric_board(
        &self,
        unit_id: UnitId,
        lookup: ScoreLookup,
    ) -> Result<MetricBoard, SummaryError> {
        let unit = self.require_unit(unit_id)?;
        if let ScoreLookup::Period(period) = lookup {
            self.require_period(period)?;
        }

        let mut groups = Vec::with_capacity(3);
        for kind in CategoryKind::ordered() {
            groups.push(self.category_board(unit.id, kind, lookup)?);
        }

        Ok(MetricBoard {
            unit: UnitRef::from(&unit),
            groups,
        })
    }

    /// Units in enumeration order, optionally of one kind, paged before any scores are read.
    /// Each carries the `fully_scored` flag of its three clocks under `lookup`.
    pub fn board_statuses(
        &self,
        kind: Option<UnitKind>,
        lookup: ScoreLookup,
        request: PageRequest,
        default_size: usize,
    ) -> Result<Page<UnitBoardStatus>, SummaryError> {
        if let ScoreLookup::Period(period) = lookup {
            self.require_period(period)?;
        }

        let units: Vec<Unit> = self
            .repository()
            .units()?
            .into_iter()
            .filter(|unit| kind.map_or(true, |kind| unit.kind == kind))
            .collect();
        let page = paginate(units, request, default_size)?;

        let mut items = Vec::with_capacity(page.items.len());
        for unit in &page.items {
            let mut groups = Vec::with_capacity(3);
            for category in CategoryKind::ordered() {
                let board = self.category_board(unit.id, category, lookup)?;
                groups.push(GroupStatus {
                    name: board.name,
                    fully_scored: board.fully_scored,
                });
            }
            items.push(UnitBoardStatus {
                unit: UnitRef::from(unit),
                kind: unit.kind,
                groups,
            });
        }

        Ok(Page {
            items,
            meta: page.meta,
        })
    }

    fn category_board(
        &self,
        unit: UnitId,
        kind: CategoryKind,
        lookup: ScoreLookup,
    ) -> Result<CategoryBoard, SummaryError> {
        let metrics = self.repository().metrics(unit, kind)?;
        let mut fully_scored = !metrics.is_empty();
        let mut tally = CategoryTally::default();
        let mut lines = Vec::with_capacity(metrics.len());

        for metric in metrics {
            let weight = metric.weight.unwrap_or(Decimal::ZERO);
            tally.total_weight += weight;

            let score = find_score(self.repository(), metric.id, lookup)?;
            match &score {
                Some(score) if score.is_complete() => {
                    tally.achieved_weight += achieved_weight(weight, Some(score));
                }
                _ => fully_scored = false,
            }

            lines.push(MetricLine {
                metric_id: metric.id,
                metric_name: metric.name,
                description: metric.description,
                weight,
                score: score.as_ref().map(ScoreInfo::from),
            });
        }

        let result = tally.into_result(kind);
        Ok(CategoryBoard {
            name: kind,
            fully_scored,
            metrics: lines,
            total_weight: result.total_weight,
            achieved_weight: result.achieved_weight,
            achieved_percent: result.achieved_percent,
        })
    }
}
