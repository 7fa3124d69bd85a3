//! KPI contest scoring engine: rollups of weighted metric scores into clock, period, stage and
//! contest summaries, unit rankings, and the HTTP surface around them.

pub mod config;
pub mod error;
pub mod scoring;
pub mod telemetry;
