use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::scoring::domain::{
    CategoryId, CategoryKind, Metric, MetricCategory, MetricId, Period, PeriodId, PeriodStatus,
    Score, ScoreId, Stage, StageId, Unit, UnitId, UnitKind,
};
use crate::scoring::repository::{
    CategoryStore, ContestRepository, RepositoryError, ScoreDraft, ScoreWriter, UnitDirectory,
};
use crate::config::RankingConfig;
use crate::scoring::ranking::RankingService;
use crate::scoring::summary::SummaryEngine;

pub(crate) fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(crate) fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, month, day).expect("valid date")
}

/// Complete score for a metric/period with plan 100 and actual equal to the ratio.
pub(crate) fn score(metric: MetricId, period: PeriodId, ratio: Option<Decimal>) -> Score {
    Score {
        id: ScoreId(0),
        metric_id: metric,
        period_id: period,
        plan_value: Some(dec!(100)),
        actual_value: ratio.or(Some(Decimal::ZERO)),
        ratio,
        updated_at: base_time(),
        updated_by: Some("tester@example.com".to_string()),
    }
}

#[derive(Default)]
struct State {
    units: Vec<Unit>,
    stages: BTreeMap<StageId, Stage>,
    periods: BTreeMap<PeriodId, Period>,
    metrics: Vec<Metric>,
    scores: Vec<Score>,
    categories: Vec<MetricCategory>,
    users: HashMap<String, UnitId>,
    avatars: HashMap<UnitId, String>,
    grants: HashMap<String, Vec<CategoryKind>>,
    broken_units: Vec<UnitId>,
    clock: i64,
}

#[derive(Default, Clone)]
pub(crate) struct MemoryRepository {
    state: Arc<Mutex<State>>,
}

impl MemoryRepository {
    fn with_state<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        let mut guard = self.state.lock().expect("repository mutex poisoned");
        f(&mut guard)
    }

    /// Inserts or replaces the score of a (metric, period) pair, stamping a later update time.
    pub(crate) fn put_score(&self, mut score: Score) -> Score {
        self.with_state(|state| {
            state.clock += 1;
            score.updated_at = base_time() + Duration::minutes(state.clock);
            match state
                .scores
                .iter_mut()
                .find(|s| s.metric_id == score.metric_id && s.period_id == score.period_id)
            {
                Some(existing) => {
                    score.id = existing.id;
                    *existing = score.clone();
                }
                None => {
                    score.id = ScoreId(state.scores.len() as u64 + 1);
                    state.scores.push(score.clone());
                }
            }
            score
        })
    }

    pub(crate) fn assign_user(&self, email: &str, unit: UnitId, avatar: Option<&str>) {
        self.with_state(|state| {
            state.users.insert(email.to_string(), unit);
            if let Some(avatar) = avatar {
                state.avatars.entry(unit).or_insert_with(|| avatar.to_string());
            }
        });
    }

    pub(crate) fn grant(&self, email: &str, categories: &[CategoryKind]) {
        self.with_state(|state| {
            state.grants.insert(email.to_string(), categories.to_vec());
        });
    }

    /// Makes every metric read of `unit` fail.
    pub(crate) fn break_unit(&self, unit: UnitId) {
        self.with_state(|state| state.broken_units.push(unit));
    }

    pub(crate) fn score_count(&self) -> usize {
        self.with_state(|state| state.scores.len())
    }
}

impl ContestRepository for MemoryRepository {
    fn unit(&self, id: UnitId) -> Result<Option<Unit>, RepositoryError> {
        Ok(self.with_state(|state| state.units.iter().find(|u| u.id == id).cloned()))
    }

    fn units(&self) -> Result<Vec<Unit>, RepositoryError> {
        Ok(self.with_state(|state| state.units.clone()))
    }

    fn stage(&self, id: StageId) -> Result<Option<Stage>, RepositoryError> {
        Ok(self.with_state(|state| state.stages.get(&id).cloned()))
    }

    fn stages(&self) -> Result<Vec<Stage>, RepositoryError> {
        Ok(self.with_state(|state| state.stages.values().cloned().collect()))
    }

    fn period(&self, id: PeriodId) -> Result<Option<Period>, RepositoryError> {
        Ok(self.with_state(|state| state.periods.get(&id).cloned()))
    }

    fn periods_of_stage(&self, stage: StageId) -> Result<Vec<Period>, RepositoryError> {
        Ok(self.with_state(|state| {
            state
                .periods
                .values()
                .filter(|p| p.stage_id == stage)
                .cloned()
                .collect()
        }))
    }

    fn metric(&self, id: MetricId) -> Result<Option<Metric>, RepositoryError> {
        Ok(self.with_state(|state| state.metrics.iter().find(|m| m.id == id).cloned()))
    }

    fn metrics(&self, unit: UnitId, category: CategoryKind) -> Result<Vec<Metric>, RepositoryError> {
        self.with_state(|state| {
            if state.broken_units.contains(&unit) {
                return Err(RepositoryError::Unavailable(format!("metrics of unit {unit}")));
            }
            Ok(state
                .metrics
                .iter()
                .filter(|m| m.unit_id == unit && m.category == category)
                .cloned()
                .collect())
        })
    }

    fn score(&self, metric: MetricId, period: PeriodId) -> Result<Option<Score>, RepositoryError> {
        Ok(self.with_state(|state| {
            state
                .scores
                .iter()
                .find(|s| s.metric_id == metric && s.period_id == period)
                .cloned()
        }))
    }

    fn latest_score(&self, metric: MetricId) -> Result<Option<Score>, RepositoryError> {
        Ok(self.with_state(|state| {
            state
                .scores
                .iter()
                .filter(|s| s.metric_id == metric)
                .max_by_key(|s| s.updated_at)
                .cloned()
        }))
    }
}

impl ScoreWriter for MemoryRepository {
    fn upsert_score(&self, draft: ScoreDraft) -> Result<Score, RepositoryError> {
        Ok(self.put_score(Score {
            id: ScoreId(0),
            metric_id: draft.metric_id,
            period_id: draft.period_id,
            plan_value: Some(draft.plan_value),
            actual_value: Some(draft.actual_value),
            ratio: Some(draft.ratio),
            updated_at: base_time(),
            updated_by: draft.updated_by,
        }))
    }
}

impl CategoryStore for MemoryRepository {
    fn categories(&self, unit: UnitId) -> Result<Vec<MetricCategory>, RepositoryError> {
        Ok(self.with_state(|state| {
            state
                .categories
                .iter()
                .filter(|c| c.unit_id == unit)
                .cloned()
                .collect()
        }))
    }

    fn insert_category(
        &self,
        unit: UnitId,
        kind: CategoryKind,
    ) -> Result<MetricCategory, RepositoryError> {
        self.with_state(|state| {
            if state
                .categories
                .iter()
                .any(|c| c.unit_id == unit && c.kind == kind)
            {
                return Err(RepositoryError::Conflict);
            }
            let category = MetricCategory {
                id: CategoryId(state.categories.len() as u64 + 1),
                unit_id: unit,
                kind,
            };
            state.categories.push(category.clone());
            Ok(category)
        })
    }
}

impl UnitDirectory for MemoryRepository {
    fn unit_for_user(&self, email: &str) -> Result<Option<UnitId>, RepositoryError> {
        Ok(self.with_state(|state| state.users.get(email).copied()))
    }

    fn avatar_for_unit(&self, unit: UnitId) -> Result<Option<String>, RepositoryError> {
        Ok(self.with_state(|state| state.avatars.get(&unit).cloned()))
    }

    fn input_categories(&self, email: &str) -> Result<Vec<CategoryKind>, RepositoryError> {
        Ok(self.with_state(|state| state.grants.get(email).cloned().unwrap_or_default()))
    }
}

/// Repository whose every read fails, for resilience checks.
pub(crate) struct UnavailableRepository;

impl ContestRepository for UnavailableRepository {
    fn unit(&self, _id: UnitId) -> Result<Option<Unit>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn units(&self) -> Result<Vec<Unit>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn stage(&self, _id: StageId) -> Result<Option<Stage>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn stages(&self) -> Result<Vec<Stage>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn period(&self, _id: PeriodId) -> Result<Option<Period>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn periods_of_stage(&self, _stage: StageId) -> Result<Vec<Period>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn metric(&self, _id: MetricId) -> Result<Option<Metric>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn metrics(
        &self,
        _unit: UnitId,
        _category: CategoryKind,
    ) -> Result<Vec<Metric>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn score(
        &self,
        _metric: MetricId,
        _period: PeriodId,
    ) -> Result<Option<Score>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn latest_score(&self, _metric: MetricId) -> Result<Option<Score>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

impl UnitDirectory for UnavailableRepository {
    fn unit_for_user(&self, _email: &str) -> Result<Option<UnitId>, RepositoryError> {
        Err(RepositoryError::Unavailable("directory offline".to_string()))
    }

    fn avatar_for_unit(&self, _unit: UnitId) -> Result<Option<String>, RepositoryError> {
        Err(RepositoryError::Unavailable("directory offline".to_string()))
    }

    fn input_categories(&self, _email: &str) -> Result<Vec<CategoryKind>, RepositoryError> {
        Err(RepositoryError::Unavailable("directory offline".to_string()))
    }
}

/// Builder over [`MemoryRepository`]. Starts with unit 1 (`U01`) and, unless built with
/// [`Fixture::without_stages`], an active stage 1 weighted 100.
pub(crate) struct Fixture {
    pub(crate) repo: MemoryRepository,
    pub(crate) unit_id: UnitId,
}

impl Fixture {
    pub(crate) fn single_unit() -> Self {
        let mut fixture = Self::without_stages();
        fixture.repo.with_state(|state| {
            state.stages.insert(
                StageId(1),
                Stage {
                    id: StageId(1),
                    name: "Stage 1".to_string(),
                    start_date: date(1, 1),
                    end_date: date(3, 31),
                    weight: 100,
                    active: true,
                },
            );
        });
        fixture.unit_id = UnitId(1);
        fixture
    }

    pub(crate) fn without_stages() -> Self {
        let fixture = Self {
            repo: MemoryRepository::default(),
            unit_id: UnitId(1),
        };
        fixture.unit("U01", true);
        fixture
    }

    pub(crate) fn engine(&self) -> SummaryEngine<MemoryRepository> {
        SummaryEngine::new(Arc::new(self.repo.clone()))
    }

    pub(crate) fn ranking(&self) -> RankingService<MemoryRepository> {
        let config = RankingConfig {
            workers: 2,
            page_size: 2,
            top_n: 3,
        };
        RankingService::new(self.engine(), config).expect("ranking pool starts")
    }

    pub(crate) fn unit(&self, code: &str, active: bool) -> UnitId {
        self.repo.with_state(|state| {
            let id = UnitId(state.units.len() as u64 + 1);
            state.units.push(Unit {
                id,
                code: code.to_string(),
                name: format!("Unit {code}"),
                kind: UnitKind::Ops,
                active,
            });
            id
        })
    }

    pub(crate) fn set_unit_active(&self, unit: UnitId, active: bool) {
        self.repo.with_state(|state| {
            if let Some(candidate) = state.units.iter_mut().find(|u| u.id == unit) {
                candidate.active = active;
            }
        });
    }

    pub(crate) fn set_unit_kind(&self, unit: UnitId, kind: UnitKind) {
        self.repo.with_state(|state| {
            if let Some(candidate) = state.units.iter_mut().find(|u| u.id == unit) {
                candidate.kind = kind;
            }
        });
    }

    pub(crate) fn stage(&mut self, weight: u8) -> StageId {
        self.repo.with_state(|state| {
            let id = StageId(state.stages.len() as u64 + 1);
            let offset = (id.0 as u32 - 1) * 3;
            state.stages.insert(
                id,
                Stage {
                    id,
                    name: format!("Stage {}", id.0),
                    start_date: date(1 + offset % 12, 1),
                    end_date: date(1 + offset % 12, 28),
                    weight,
                    active: false,
                },
            );
            id
        })
    }

    pub(crate) fn set_stage_weight(&mut self, stage: u64, weight: u8) {
        self.repo.with_state(|state| {
            if let Some(stage) = state.stages.get_mut(&StageId(stage)) {
                stage.weight = weight;
            }
        });
    }

    pub(crate) fn set_stage_active(&mut self, stage: u64, active: bool) {
        self.repo.with_state(|state| {
            for (id, candidate) in state.stages.iter_mut() {
                if id.0 == stage {
                    candidate.active = active;
                } else if active {
                    candidate.active = false;
                }
            }
        });
    }

    pub(crate) fn period(&mut self, stage: u64) -> PeriodId {
        self.repo.with_state(|state| {
            let id = PeriodId(state.periods.len() as u64 + 1);
            let (start_date, end_date) = state
                .stages
                .get(&StageId(stage))
                .map(|s| (s.start_date, s.end_date))
                .unwrap_or((date(1, 1), date(1, 31)));
            state.periods.insert(
                id,
                Period {
                    id,
                    stage_id: StageId(stage),
                    name: format!("Period {}", id.0),
                    start_date,
                    end_date,
                    status: PeriodStatus::Upcoming,
                },
            );
            id
        })
    }

    pub(crate) fn metric(&mut self, category: CategoryKind, weight: Option<Decimal>) -> MetricId {
        let unit = self.unit_id;
        self.metric_for(unit, category, weight)
    }

    pub(crate) fn metric_for(
        &mut self,
        unit: UnitId,
        category: CategoryKind,
        weight: Option<Decimal>,
    ) -> MetricId {
        self.repo.with_state(|state| {
            let id = MetricId(state.metrics.len() as u64 + 1);
            state.metrics.push(Metric {
                id,
                unit_id: unit,
                category,
                name: format!("Metric {}", id.0),
                description: None,
                weight,
            });
            id
        })
    }

    pub(crate) fn score(&mut self, metric: MetricId, period: PeriodId, ratio: Decimal) -> Score {
        self.repo.put_score(score(metric, period, Some(ratio)))
    }
}

pub(crate) async fn read_json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
