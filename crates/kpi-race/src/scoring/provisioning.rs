//! Explicit setup run when a unit is created. Read paths never create records.

use rust_decimal::Decimal;
use tracing::info;

use crate::scoring::domain::{CategoryKind, MetricCategory, UnitId};
use crate::scoring::repository::{CategoryStore, RepositoryError};
use crate::scoring::rounding::HUNDRED;

#[derive(Debug, thiserror::Error)]
pub enum ProvisioningError {
    #[error("metric weights of a unit may total at most 100, this change brings them to {total}")]
    WeightBudgetExceeded { total: Decimal },
    #[error("metric weight must not be negative")]
    NegativeWeight,
    #[error("metric weights are too large")]
    WeightOverflow,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Creates whichever of the three clocks the unit is missing and returns the new records.
/// Running it again on a provisioned unit creates nothing.
pub fn provision_unit<S>(store: &S, unit: UnitId) -> Result<Vec<MetricCategory>, ProvisioningError>
where
    S: CategoryStore + ?Sized,
{
    let existing = store.categories(unit)?;
    let mut created = Vec::new();

    for kind in CategoryKind::ordered() {
        if existing.iter().any(|category| category.kind == kind) {
            continue;
        }
        match store.insert_category(unit, kind) {
            Ok(category) => created.push(category),
            Err(RepositoryError::Conflict) => {}
            Err(err) => return Err(err.into()),
        }
    }

    if !created.is_empty() {
        info!(%unit, created = created.len(), "unit categories provisioned");
    }
    Ok(created)
}

/// Sum of the unit's other metric weights plus the candidate. Missing weights count as zero.
pub fn check_weight_budget<I>(existing: I, candidate: Option<Decimal>) -> Result<Decimal, ProvisioningError>
where
    I: IntoIterator<Item = Option<Decimal>>,
{
    if candidate.is_some_and(|weight| weight < Decimal::ZERO) {
        return Err(ProvisioningError::NegativeWeight);
    }

    let total = existing
        .into_iter()
        .flatten()
        .chain(candidate)
        .try_fold(Decimal::ZERO, |sum, weight| sum.checked_add(weight))
        .ok_or(ProvisioningError::WeightOverflow)?;

    if total > HUNDRED {
        return Err(ProvisioningError::WeightBudgetExceeded { total });
    }
    Ok(total)
}
