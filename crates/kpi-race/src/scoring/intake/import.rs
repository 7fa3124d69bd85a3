use std::io::Read;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, warn};

use super::{Actor, ScoreIntakeService, ScoreRequest};
use crate::scoring::domain::{MetricId, PeriodId};
use crate::scoring::repository::{ContestRepository, ScoreWriter};

const REQUIRED_COLUMNS: [&str; 4] = ["metric_id", "period_id", "plan_value", "actual_value"];

#[derive(Debug, thiserror::Error)]
pub enum ScoreImportError {
    #[error("score file could not be read: {0}")]
    Csv(#[from] csv::Error),
    #[error("score file is missing the {0} column")]
    MissingColumn(&'static str),
    #[error("score file has no data rows")]
    Empty,
}

/// One data row, numbered from 1 below the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRow {
    pub row: usize,
    pub parsed: Result<ScoreRequest, String>,
}

/// Parsed score file. Rows that failed to parse stay in place so the report keeps file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreBatch {
    pub rows: Vec<ImportRow>,
}

impl ScoreBatch {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ScoreImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        for column in REQUIRED_COLUMNS {
            if !headers.iter().any(|header| header == column) {
                return Err(ScoreImportError::MissingColumn(column));
            }
        }

        let rows: Vec<ImportRow> = csv_reader
            .deserialize::<ScoreRow>()
            .enumerate()
            .map(|(index, record)| ImportRow {
                row: index + 1,
                parsed: record
                    .map_err(|err| err.to_string())
                    .and_then(ScoreRow::into_request),
            })
            .collect();

        if rows.is_empty() {
            return Err(ScoreImportError::Empty);
        }
        Ok(Self { rows })
    }
}

#[derive(Debug, Deserialize)]
struct ScoreRow {
    metric_id: String,
    period_id: String,
    plan_value: String,
    actual_value: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    ratio: Option<String>,
}

impl ScoreRow {
    fn into_request(self) -> Result<ScoreRequest, String> {
        Ok(ScoreRequest {
            metric_id: MetricId(parse_id("metric_id", &self.metric_id)?),
            period_id: PeriodId(parse_id("period_id", &self.period_id)?),
            plan_value: parse_decimal("plan_value", &self.plan_value)?,
            actual_value: parse_decimal("actual_value", &self.actual_value)?,
            ratio: self
                .ratio
                .as_deref()
                .map(|raw| parse_decimal("ratio", raw))
                .transpose()?,
        })
    }
}

fn parse_id(column: &str, raw: &str) -> Result<u64, String> {
    raw.parse::<u64>()
        .map_err(|_| format!("{column} '{raw}' is not a valid id"))
}

fn parse_decimal(column: &str, raw: &str) -> Result<Decimal, String> {
    if raw.is_empty() {
        return Err(format!("{column} is empty"));
    }
    Decimal::from_str(raw).map_err(|_| format!("{column} '{raw}' is not a number"))
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RowOutcome {
    Recorded {
        row: usize,
        metric_id: MetricId,
        period_id: PeriodId,
        ratio: Option<Decimal>,
    },
    Rejected {
        row: usize,
        reason: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub recorded: usize,
    pub rejected: usize,
    pub rows: Vec<RowOutcome>,
}

impl<R> ScoreIntakeService<R>
where
    R: ContestRepository + ScoreWriter + 'static,
{
    /// Runs every parsed row through [`ScoreIntakeService::submit`]. A failing row is reported
    /// and the batch carries on.
    pub fn apply(&self, actor: &Actor, batch: ScoreBatch) -> ImportReport {
        let mut report = ImportReport::default();

        for ImportRow { row, parsed } in batch.rows {
            let outcome = match parsed {
                Ok(request) => match self.submit(actor, request) {
                    Ok(score) => RowOutcome::Recorded {
                        row,
                        metric_id: score.metric_id,
                        period_id: score.period_id,
                        ratio: score.ratio,
                    },
                    Err(err) => RowOutcome::Rejected {
                        row,
                        reason: err.to_string(),
                    },
                },
                Err(reason) => RowOutcome::Rejected { row, reason },
            };

            match &outcome {
                RowOutcome::Recorded { .. } => report.recorded += 1,
                RowOutcome::Rejected { row, reason } => {
                    warn!(row, %reason, "score row rejected");
                    report.rejected += 1;
                }
            }
            report.rows.push(outcome);
        }

        info!(
            recorded = report.recorded,
            rejected = report.rejected,
            "score import applied"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Cursor;

    fn batch(csv: &str) -> Result<ScoreBatch, ScoreImportError> {
        ScoreBatch::from_reader(Cursor::new(csv.as_bytes().to_vec()))
    }

    #[test]
    fn parses_rows_with_optional_ratio() {
        let parsed = batch(
            "metric_id,period_id,plan_value,actual_value,ratio\n\
             1, 2, 100, 45.5, \n\
             3,2,80,80,95\n",
        )
        .expect("file parses");

        assert_eq!(parsed.rows.len(), 2);
        let first = parsed.rows[0].parsed.as_ref().expect("row 1 parses");
        assert_eq!(first.metric_id, MetricId(1));
        assert_eq!(first.actual_value, dec!(45.5));
        assert_eq!(first.ratio, None);
        let second = parsed.rows[1].parsed.as_ref().expect("row 2 parses");
        assert_eq!(second.ratio, Some(dec!(95)));
    }

    #[test]
    fn ratio_column_may_be_left_out() {
        let parsed = batch("metric_id,period_id,plan_value,actual_value\n4,1,10,5\n")
            .expect("file parses");
        assert!(parsed.rows[0].parsed.is_ok());
    }

    #[test]
    fn bad_rows_carry_their_row_number() {
        let parsed = batch(
            "metric_id,period_id,plan_value,actual_value,ratio\n\
             1,1,100,50,\n\
             x,1,100,50,\n\
             1,1,abc,50,\n",
        )
        .expect("file parses");

        assert!(parsed.rows[0].parsed.is_ok());
        assert_eq!(parsed.rows[1].row, 2);
        assert_eq!(
            parsed.rows[1].parsed,
            Err("metric_id 'x' is not a valid id".to_string())
        );
        assert_eq!(parsed.rows[2].row, 3);
        assert_eq!(
            parsed.rows[2].parsed,
            Err("plan_value 'abc' is not a number".to_string())
        );
    }

    #[test]
    fn structural_problems_fail_the_file() {
        assert!(matches!(
            batch("metric_id,period_id,plan_value\n1,1,100\n"),
            Err(ScoreImportError::MissingColumn("actual_value"))
        ));
        assert!(matches!(
            batch("metric_id,period_id,plan_value,actual_value\n"),
            Err(ScoreImportError::Empty)
        ));
    }
}
