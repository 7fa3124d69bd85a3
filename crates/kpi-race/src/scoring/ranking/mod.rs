//! Unit standings for a stage or the whole contest.
//!
//! Per-unit scores are computed on a bounded rayon pool and collected in unit enumeration order
//! before a stable descending sort, so equal scores keep the order the repository listed them in.
//! Ranks are sequential positions; ties do not share a rank.

pub mod pagination;

use std::sync::Arc;

use chrono::NaiveDate;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::RankingConfig;
use crate::scoring::domain::{StageId, Unit, UnitId};
use crate::scoring::repository::{ContestRepository, RepositoryError, UnitDirectory};
use crate::scoring::rounding::{display, half_up, INTERMEDIATE_SCALE};
use crate::scoring::summary::{StageRef, SummaryEngine, SummaryError};

pub use pagination::{paginate, Page, PageError, PageMeta, PageRequest};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitRanking {
    pub unit_id: UnitId,
    pub code: String,
    pub name: String,
    pub avatar: Option<String>,
    pub score: Decimal,
    pub rank: usize,
}

/// Podium of the currently active stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagePodium {
    #[serde(flatten)]
    pub stage: StageRef,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub rankings: Vec<UnitRanking>,
}

#[derive(Debug, thiserror::Error)]
pub enum RankingError {
    #[error(transparent)]
    Summary(#[from] SummaryError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Page(#[from] PageError),
    #[error("ranking worker pool failed to start: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

pub struct RankingService<R> {
    engine: SummaryEngine<R>,
    pool: Arc<ThreadPool>,
    config: RankingConfig,
}

impl<R> Clone for RankingService<R> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            pool: Arc::clone(&self.pool),
            config: self.config,
        }
    }
}

impl<R> RankingService<R>
where
    R: ContestRepository + UnitDirectory + 'static,
{
    pub fn new(engine: SummaryEngine<R>, config: RankingConfig) -> Result<Self, RankingError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.workers.max(1))
            .thread_name(|index| format!("ranking-{index}"))
            .build()?;

        Ok(Self {
            engine,
            pool: Arc::new(pool),
            config,
        })
    }

    pub fn config(&self) -> RankingConfig {
        self.config
    }

    pub fn rank_by_stage(
        &self,
        stage_id: StageId,
        request: PageRequest,
    ) -> Result<Page<UnitRanking>, RankingError> {
        let standings = self.stage_standings(stage_id)?;
        Ok(paginate(standings, request, self.config.page_size)?)
    }

    /// Contest-wide standings by [`RankingService::normalized_overall_score`]. A contest without
    /// stages has nothing to rank and reports NotFound.
    pub fn rank_overall(&self, request: PageRequest) -> Result<Page<UnitRanking>, RankingError> {
        if self.engine.repository().stages()?.is_empty() {
            return Err(SummaryError::not_found("stages", "in contest").into());
        }
        let standings = self.standings(|unit| self.normalized_overall_score(unit))?;
        Ok(paginate(standings, request, self.config.page_size)?)
    }

    /// First `n` stage standings; `None` uses the configured podium size.
    pub fn top(&self, stage_id: StageId, n: Option<usize>) -> Result<Vec<UnitRanking>, RankingError> {
        let mut standings = self.stage_standings(stage_id)?;
        standings.truncate(n.unwrap_or(self.config.top_n));
        Ok(standings)
    }

    pub fn top_of_active_stage(&self, n: Option<usize>) -> Result<StagePodium, RankingError> {
        let stage = self
            .engine
            .repository()
            .active_stage()?
            .ok_or_else(|| SummaryError::not_found("active stage", "in contest"))?;
        let rankings = self.top(stage.id, n)?;

        Ok(StagePodium {
            stage: StageRef::from(&stage),
            start_date: stage.start_date,
            end_date: stage.end_date,
            rankings,
        })
    }

    /// Average of the unit's stage percentages weighted by stage weight and divided by the sum of
    /// the weights that took part. Stages whose summary fails are left out of both sums, unlike
    /// the per-unit overall table which accumulates contributions without renormalizing.
    pub fn normalized_overall_score(&self, unit: UnitId) -> Result<Decimal, SummaryError> {
        let mut weighted = Decimal::ZERO;
        let mut weights = Decimal::ZERO;

        for stage in self.engine.repository().stages()? {
            match self.engine.summarize_by_stage(unit, stage.id) {
                Ok(summary) => {
                    let weight = Decimal::from(stage.weight);
                    weighted += summary.total_achieved_percent * weight;
                    weights += weight;
                }
                Err(err) => {
                    debug!(%unit, stage = %stage.id, error = %err, "stage left out of overall score");
                }
            }
        }

        if weights.is_zero() {
            return Ok(Decimal::ZERO);
        }
        Ok(half_up(weighted / weights, INTERMEDIATE_SCALE))
    }

    fn stage_standings(&self, stage_id: StageId) -> Result<Vec<UnitRanking>, RankingError> {
        let stage = self.engine.require_stage(stage_id)?;
        self.standings(|unit| {
            self.engine
                .summarize_by_stage(unit, stage.id)
                .map(|summary| summary.total_achieved_percent)
        })
    }

    fn standings<F>(&self, score_of: F) -> Result<Vec<UnitRanking>, RankingError>
    where
        F: Fn(UnitId) -> Result<Decimal, SummaryError> + Sync,
    {
        let repository = self.engine.repository();
        let units: Vec<Unit> = repository
            .units()?
            .into_iter()
            .filter(|unit| unit.active)
            .collect();

        let mut scored: Vec<(&Unit, Decimal, Option<String>)> = self.pool.install(|| {
            units
                .par_iter()
                .map(|unit| {
                    let score = score_of(unit.id).unwrap_or_else(|err| {
                        warn!(unit = %unit.id, error = %err, "ranking score downgraded to zero");
                        Decimal::ZERO
                    });
                    let avatar = repository.avatar_for_unit(unit.id).unwrap_or_else(|err| {
                        warn!(unit = %unit.id, error = %err, "avatar lookup failed");
                        None
                    });
                    (unit, display(score), avatar)
                })
                .collect()
        });

        scored.sort_by(|left, right| right.1.cmp(&left.1));

        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(position, (unit, score, avatar))| UnitRanking {
                unit_id: unit.id,
                code: unit.code.clone(),
                name: unit.name.clone(),
                avatar,
                score,
                rank: position + 1,
            })
            .collect())
    }
}
