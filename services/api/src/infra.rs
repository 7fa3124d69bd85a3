use chrono::{NaiveDate, Utc};
use kpi_race::error::AppError;
use kpi_race::scoring::intake::derive_ratio;
use kpi_race::scoring::{
    check_weight_budget, provision_unit, Actor, CategoryId, CategoryKind, CategoryStore,
    ContestRepository, Metric, MetricCategory, MetricId, Period, PeriodId, PeriodStatus,
    RepositoryError, Score, ScoreDraft, ScoreId, ScoreIntakeService, ScoreRequest, ScoreWriter,
    Stage, StageId, Unit, UnitDirectory, UnitId, UnitKind,
};
use metrics_exporter_prometheus::PrometheusHandle;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Debug, Clone)]
struct UserProfile {
    unit: UnitId,
    avatar: Option<String>,
    categories: Vec<CategoryKind>,
}

#[derive(Default)]
struct ContestData {
    units: Vec<Unit>,
    stages: BTreeMap<StageId, Stage>,
    periods: BTreeMap<PeriodId, Period>,
    metrics: BTreeMap<MetricId, Metric>,
    scores: BTreeMap<(MetricId, PeriodId), Score>,
    categories: Vec<MetricCategory>,
    users: Vec<(String, UserProfile)>,
    next_score: u64,
}

/// Process-local contest store backing the service and the CLI.
#[derive(Default, Clone)]
pub(crate) struct InMemoryContestStore {
    data: Arc<Mutex<ContestData>>,
}

impl InMemoryContestStore {
    fn data(&self) -> Result<MutexGuard<'_, ContestData>, RepositoryError> {
        self.data
            .lock()
            .map_err(|_| RepositoryError::Unavailable("contest store lock poisoned".to_string()))
    }

    pub(crate) fn add_unit(
        &self,
        code: &str,
        name: &str,
        kind: UnitKind,
        active: bool,
    ) -> Result<UnitId, RepositoryError> {
        let mut data = self.data()?;
        let id = UnitId(data.units.len() as u64 + 1);
        data.units.push(Unit {
            id,
            code: code.to_string(),
            name: name.to_string(),
            kind,
            active,
        });
        Ok(id)
    }

    pub(crate) fn add_stage(
        &self,
        name: &str,
        (start_date, end_date): (NaiveDate, NaiveDate),
        weight: u8,
        active: bool,
    ) -> Result<StageId, RepositoryError> {
        let mut data = self.data()?;
        let id = StageId(data.stages.len() as u64 + 1);
        data.stages.insert(
            id,
            Stage {
                id,
                name: name.to_string(),
                start_date,
                end_date,
                weight,
                active,
            },
        );
        Ok(id)
    }

    pub(crate) fn add_period(
        &self,
        stage_id: StageId,
        name: &str,
        (start_date, end_date): (NaiveDate, NaiveDate),
        status: PeriodStatus,
    ) -> Result<PeriodId, RepositoryError> {
        let mut data = self.data()?;
        if !data.stages.contains_key(&stage_id) {
            return Err(RepositoryError::NotFound);
        }
        let id = PeriodId(data.periods.len() as u64 + 1);
        data.periods.insert(
            id,
            Period {
                id,
                stage_id,
                name: name.to_string(),
                start_date,
                end_date,
                status,
            },
        );
        Ok(id)
    }

    /// Adds a metric after checking the unit-wide weight budget.
    pub(crate) fn add_metric(
        &self,
        unit_id: UnitId,
        category: CategoryKind,
        name: &str,
        weight: Decimal,
    ) -> Result<MetricId, AppError> {
        let mut data = self.data()?;
        let existing = data
            .metrics
            .values()
            .filter(|metric| metric.unit_id == unit_id)
            .map(|metric| metric.weight);
        check_weight_budget(existing, Some(weight))?;

        let id = MetricId(data.metrics.len() as u64 + 1);
        data.metrics.insert(
            id,
            Metric {
                id,
                unit_id,
                category,
                name: name.to_string(),
                description: None,
                weight: Some(weight),
            },
        );
        Ok(id)
    }

    pub(crate) fn add_user(
        &self,
        email: &str,
        unit: UnitId,
        avatar: Option<&str>,
        categories: &[CategoryKind],
    ) -> Result<(), RepositoryError> {
        let mut data = self.data()?;
        data.users.retain(|(existing, _)| existing != email);
        data.users.push((
            email.to_string(),
            UserProfile {
                unit,
                avatar: avatar.map(str::to_string),
                categories: categories.to_vec(),
            },
        ));
        Ok(())
    }
}

impl ContestRepository for InMemoryContestStore {
    fn unit(&self, id: UnitId) -> Result<Option<Unit>, RepositoryError> {
        Ok(self.data()?.units.iter().find(|unit| unit.id == id).cloned())
    }

    fn units(&self) -> Result<Vec<Unit>, RepositoryError> {
        Ok(self.data()?.units.clone())
    }

    fn stage(&self, id: StageId) -> Result<Option<Stage>, RepositoryError> {
        Ok(self.data()?.stages.get(&id).cloned())
    }

    fn stages(&self) -> Result<Vec<Stage>, RepositoryError> {
        Ok(self.data()?.stages.values().cloned().collect())
    }

    fn period(&self, id: PeriodId) -> Result<Option<Period>, RepositoryError> {
        Ok(self.data()?.periods.get(&id).cloned())
    }

    fn periods_of_stage(&self, stage: StageId) -> Result<Vec<Period>, RepositoryError> {
        Ok(self
            .data()?
            .periods
            .values()
            .filter(|period| period.stage_id == stage)
            .cloned()
            .collect())
    }

    fn metric(&self, id: MetricId) -> Result<Option<Metric>, RepositoryError> {
        Ok(self.data()?.metrics.get(&id).cloned())
    }

    fn metrics(&self, unit: UnitId, category: CategoryKind) -> Result<Vec<Metric>, RepositoryError> {
        Ok(self
            .data()?
            .metrics
            .values()
            .filter(|metric| metric.unit_id == unit && metric.category == category)
            .cloned()
            .collect())
    }

    fn score(&self, metric: MetricId, period: PeriodId) -> Result<Option<Score>, RepositoryError> {
        Ok(self.data()?.scores.get(&(metric, period)).cloned())
    }

    fn latest_score(&self, metric: MetricId) -> Result<Option<Score>, RepositoryError> {
        Ok(self
            .data()?
            .scores
            .values()
            .filter(|score| score.metric_id == metric)
            .max_by_key(|score| (score.updated_at, score.id))
            .cloned())
    }
}

impl ScoreWriter for InMemoryContestStore {
    fn upsert_score(&self, draft: ScoreDraft) -> Result<Score, RepositoryError> {
        let mut data = self.data()?;
        let key = (draft.metric_id, draft.period_id);
        let existing = data.scores.get(&key).map(|score| score.id);
        let id = match existing {
            Some(id) => id,
            None => {
                data.next_score += 1;
                ScoreId(data.next_score)
            }
        };

        let score = Score {
            id,
            metric_id: draft.metric_id,
            period_id: draft.period_id,
            plan_value: Some(draft.plan_value),
            actual_value: Some(draft.actual_value),
            ratio: Some(draft.ratio),
            updated_at: Utc::now(),
            updated_by: draft.updated_by,
        };
        data.scores.insert(key, score.clone());
        Ok(score)
    }
}

impl CategoryStore for InMemoryContestStore {
    fn categories(&self, unit: UnitId) -> Result<Vec<MetricCategory>, RepositoryError> {
        Ok(self
            .data()?
            .categories
            .iter()
            .filter(|category| category.unit_id == unit)
            .cloned()
            .collect())
    }

    fn insert_category(
        &self,
        unit: UnitId,
        kind: CategoryKind,
    ) -> Result<MetricCategory, RepositoryError> {
        let mut data = self.data()?;
        if data
            .categories
            .iter()
            .any(|category| category.unit_id == unit && category.kind == kind)
        {
            return Err(RepositoryError::Conflict);
        }
        let category = MetricCategory {
            id: CategoryId(data.categories.len() as u64 + 1),
            unit_id: unit,
            kind,
        };
        data.categories.push(category.clone());
        Ok(category)
    }
}

impl UnitDirectory for InMemoryContestStore {
    fn unit_for_user(&self, email: &str) -> Result<Option<UnitId>, RepositoryError> {
        Ok(self
            .data()?
            .users
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(email))
            .map(|(_, profile)| profile.unit))
    }

    fn avatar_for_unit(&self, unit: UnitId) -> Result<Option<String>, RepositoryError> {
        Ok(self
            .data()?
            .users
            .iter()
            .find(|(_, profile)| profile.unit == unit)
            .and_then(|(_, profile)| profile.avatar.clone()))
    }

    fn input_categories(&self, email: &str) -> Result<Vec<CategoryKind>, RepositoryError> {
        Ok(self
            .data()?
            .users
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(email))
            .map(|(_, profile)| profile.categories.clone())
            .unwrap_or_default())
    }
}

fn date(year: i32, month: u32, day: u32) -> Result<NaiveDate, AppError> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        AppError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("invalid seed date {year}-{month}-{day}"),
        ))
    })
}

struct SeedUnit {
    code: &'static str,
    name: &'static str,
    kind: UnitKind,
    active: bool,
    /// Achievement in percent per seeded metric; later periods drift down a little.
    base: [Decimal; 4],
}

const SEED_METRICS: [(CategoryKind, &str, Decimal); 4] = [
    (CategoryKind::Financial, "Net revenue", dec!(30)),
    (CategoryKind::Financial, "Cost to serve", dec!(20)),
    (CategoryKind::Customer, "Customer satisfaction", dec!(25)),
    (CategoryKind::Internal, "Training completion", dec!(25)),
];

/// Contest with two weighted stages, three periods and five units, scored through intake.
pub(crate) fn seed_demo_contest() -> Result<InMemoryContestStore, AppError> {
    let store = InMemoryContestStore::default();

    let spring = store
        .add_stage(
            "Spring leg",
            (date(2025, 1, 1)?, date(2025, 3, 31)?),
            60,
            false,
        )
        ?;
    let summer = store
        .add_stage(
            "Summer leg",
            (date(2025, 4, 1)?, date(2025, 6, 30)?),
            40,
            true,
        )
        ?;

    let periods = [
        (
            spring,
            store.add_period(
                spring,
                "January-February",
                (date(2025, 1, 1)?, date(2025, 2, 28)?),
                PeriodStatus::Finished,
            )?,
        ),
        (
            spring,
            store.add_period(
                spring,
                "March",
                (date(2025, 3, 1)?, date(2025, 3, 31)?),
                PeriodStatus::Finished,
            )?,
        ),
        (
            summer,
            store.add_period(
                summer,
                "April-May",
                (date(2025, 4, 1)?, date(2025, 5, 31)?),
                PeriodStatus::Ongoing,
            )?,
        ),
    ];

    let seed_units = [
        SeedUnit {
            code: "HN01",
            name: "Hanoi Central",
            kind: UnitKind::Ops,
            active: true,
            base: [dec!(92), dec!(88), dec!(95), dec!(80)],
        },
        SeedUnit {
            code: "HN02",
            name: "Hanoi West",
            kind: UnitKind::Ops,
            active: true,
            base: [dec!(75), dec!(90), dec!(70), dec!(85)],
        },
        SeedUnit {
            code: "SG01",
            name: "Saigon Riverside",
            kind: UnitKind::Ops,
            active: true,
            base: [dec!(92), dec!(88), dec!(95), dec!(80)],
        },
        SeedUnit {
            code: "BO01",
            name: "Back Office",
            kind: UnitKind::Bo,
            active: true,
            base: [dec!(60), dec!(65), dec!(80), dec!(100)],
        },
        SeedUnit {
            code: "SG02",
            name: "Saigon North (closed)",
            kind: UnitKind::Ops,
            active: false,
            base: [dec!(100), dec!(100), dec!(100), dec!(100)],
        },
    ];

    let intake = ScoreIntakeService::new(Arc::new(store.clone()));
    let seeder = Actor::system();

    for seed in &seed_units {
        let unit = store.add_unit(seed.code, seed.name, seed.kind, seed.active)?;
        provision_unit(&store, unit)?;

        let handle = seed.code.to_ascii_lowercase();
        let avatar = format!("/avatars/{handle}.png");
        store.add_user(
            &format!("lead.{handle}@example.com"),
            unit,
            Some(avatar.as_str()),
            &CategoryKind::ordered(),
        )?;

        for ((category, name, weight), base) in SEED_METRICS.iter().zip(seed.base) {
            let metric = store.add_metric(unit, *category, name, *weight)?;
            for (offset, (stage, period)) in periods.iter().enumerate() {
                // Back Office has not reported training for the ongoing period yet.
                if seed.kind == UnitKind::Bo && *category == CategoryKind::Internal && offset == 2 {
                    continue;
                }
                let drift = Decimal::from(offset as u64 * 3);
                let actual_value = (base - drift).max(Decimal::ZERO) * dec!(2);
                let plan_value = dec!(200);

                if *stage == summer {
                    intake.submit(
                        &seeder,
                        ScoreRequest {
                            metric_id: metric,
                            period_id: *period,
                            plan_value,
                            actual_value,
                            ratio: None,
                        },
                    )?;
                } else {
                    // Closed stages no longer accept input; their history is loaded as is.
                    store.upsert_score(ScoreDraft {
                        metric_id: metric,
                        period_id: *period,
                        plan_value,
                        actual_value,
                        ratio: derive_ratio(plan_value, actual_value)?,
                        updated_by: None,
                    })?;
                }
            }
        }
    }

    Ok(store)
}
