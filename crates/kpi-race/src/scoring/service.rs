use std::sync::Arc;

use crate::config::RankingConfig;
use crate::scoring::intake::{Actor, ScoreIntakeService};
use crate::scoring::ranking::{RankingError, RankingService};
use crate::scoring::repository::{RepositoryError, ScoringStore, UnitDirectory};
use crate::scoring::summary::SummaryEngine;

/// Service composing summaries, rankings and score intake over one store.
pub struct ScoringService<R> {
    repository: Arc<R>,
    summaries: SummaryEngine<R>,
    rankings: RankingService<R>,
    intake: ScoreIntakeService<R>,
}

impl<R> ScoringService<R>
where
    R: ScoringStore + 'static,
{
    pub fn new(repository: Arc<R>, ranking: RankingConfig) -> Result<Self, RankingError> {
        let summaries = SummaryEngine::new(Arc::clone(&repository));
        let rankings = RankingService::new(summaries.clone(), ranking)?;
        let intake = ScoreIntakeService::new(Arc::clone(&repository));

        Ok(Self {
            repository,
            summaries,
            rankings,
            intake,
        })
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn summaries(&self) -> &SummaryEngine<R> {
        &self.summaries
    }

    pub fn rankings(&self) -> &RankingService<R> {
        &self.rankings
    }

    pub fn intake(&self) -> &ScoreIntakeService<R> {
        &self.intake
    }

    /// Actor for a signed-in user with the clocks the directory grants them.
    pub fn actor_for(&self, email: &str) -> Result<Actor, RepositoryError> {
        let categories = self.repository.input_categories(email)?;
        Ok(Actor::new(email, categories))
    }
}
