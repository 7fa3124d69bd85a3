use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! record_id {
    ($($name:ident),* $(,)?) => {
        $(
            #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(pub u64);

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )*
    };
}

record_id!(UnitId, StageId, PeriodId, CategoryId, MetricId, ScoreId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UnitKind {
    /// Operational unit.
    Ops,
    /// Back-office unit.
    Bo,
}

impl UnitKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ops => "OPS",
            Self::Bo => "BO",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub code: String,
    pub name: String,
    pub kind: UnitKind,
    pub active: bool,
}

/// Contest phase. Weights of all stages in one contest are expected to total at most 100.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub id: StageId,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub weight: u8,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PeriodStatus {
    Upcoming,
    Ongoing,
    Finished,
}

impl PeriodStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Upcoming => "Upcoming",
            Self::Ongoing => "Ongoing",
            Self::Finished => "Finished",
        }
    }
}

/// Sub-interval of a stage during which scores are recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub id: PeriodId,
    pub stage_id: StageId,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: PeriodStatus,
}

/// The three fixed metric groupings ("clocks") every unit carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CategoryKind {
    Financial,
    Customer,
    Internal,
}

impl CategoryKind {
    pub const fn ordered() -> [Self; 3] {
        [Self::Financial, Self::Customer, Self::Internal]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Financial => "FINANCIAL",
            Self::Customer => "CUSTOMER",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricCategory {
    pub id: CategoryId,
    pub unit_id: UnitId,
    pub kind: CategoryKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    pub id: MetricId,
    pub unit_id: UnitId,
    pub category: CategoryKind,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub weight: Option<Decimal>,
}

/// Recorded plan/actual/ratio for one metric in one period. `ratio` is a 0-100 percentage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub id: ScoreId,
    pub metric_id: MetricId,
    pub period_id: PeriodId,
    pub plan_value: Option<Decimal>,
    pub actual_value: Option<Decimal>,
    pub ratio: Option<Decimal>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_by: Option<String>,
}

impl Score {
    /// True when plan, actual and ratio are all recorded.
    pub fn is_complete(&self) -> bool {
        self.plan_value.is_some() && self.actual_value.is_some() && self.ratio.is_some()
    }
}
