use crate::infra::{seed_demo_contest, InMemoryContestStore};
use clap::Args;
use kpi_race::config::AppConfig;
use kpi_race::error::AppError;
use kpi_race::scoring::{
    CategoryResult, ContestRepository, PageRequest, PeriodId, ScoreBatch, ScoringService,
    StageId, UnitId, UnitRanking,
};
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct SummaryArgs {
    /// Unit to summarize
    #[arg(long)]
    pub(crate) unit: u64,
    /// Summarize one stage (averaged over its periods)
    #[arg(long, conflicts_with = "period")]
    pub(crate) stage: Option<u64>,
    /// Summarize one period
    #[arg(long)]
    pub(crate) period: Option<u64>,
    /// Print the JSON payload the HTTP API would return
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct RankingArgs {
    /// Rank a single stage instead of the whole contest
    #[arg(long)]
    pub(crate) stage: Option<u64>,
    /// 1-based page number
    #[arg(long, default_value_t = 1)]
    pub(crate) page: usize,
    /// Page size (defaults to RANKING_PAGE_SIZE)
    #[arg(long)]
    pub(crate) size: Option<usize>,
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ImportArgs {
    /// CSV file with metric_id, period_id, plan_value, actual_value and optional ratio columns
    #[arg(long)]
    pub(crate) file: PathBuf,
    /// E-mail of the user submitting the scores
    #[arg(long = "as")]
    pub(crate) submitter: String,
}

fn demo_service() -> Result<ScoringService<InMemoryContestStore>, AppError> {
    let config = AppConfig::load()?;
    let store = seed_demo_contest()?;
    Ok(ScoringService::new(Arc::new(store), config.ranking)?)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let payload = serde_json::to_string_pretty(value).map_err(std::io::Error::from)?;
    println!("{payload}");
    Ok(())
}

fn print_clocks(clocks: &[CategoryResult]) {
    for clock in clocks {
        println!(
            "  - {:<9} {:>6} of {:>6} weight | {:>6}%",
            clock.name, clock.achieved_weight, clock.total_weight, clock.achieved_percent
        );
    }
}

fn print_rankings(rankings: &[UnitRanking]) {
    if rankings.is_empty() {
        println!("  (no units on this page)");
    }
    for entry in rankings {
        println!(
            "  {:>2}. {:<5} {:<24} {:>6}",
            entry.rank, entry.code, entry.name, entry.score
        );
    }
}

pub(crate) fn run_summary(args: SummaryArgs) -> Result<(), AppError> {
    let service = demo_service()?;
    let summaries = service.summaries();
    let unit = UnitId(args.unit);

    match (args.period, args.stage) {
        (Some(period), _) => {
            let summary = summaries.summarize_by_period(unit, PeriodId(period))?;
            if args.json {
                return print_json(&summary);
            }
            println!(
                "{} {} | period {}",
                summary.unit.unit_code, summary.unit.unit_name, summary.period.period_name
            );
            print_clocks(&summary.clocks);
        }
        (None, Some(stage)) => {
            let summary = summaries.summarize_by_stage(unit, StageId(stage))?;
            if args.json {
                return print_json(&summary);
            }
            println!(
                "{} {} | stage {}",
                summary.unit.unit_code, summary.unit.unit_name, summary.stage.stage_name
            );
            print_clocks(&summary.clocks);
            println!(
                "  total {} of {} weight | {}%",
                summary.total_achieved_weight, summary.total_weight, summary.total_achieved_percent
            );
        }
        (None, None) => {
            let summary = summaries.summarize_overall(unit)?;
            if args.json {
                return print_json(&summary);
            }
            println!("{} {} | overall", summary.unit.unit_code, summary.unit.unit_name);
            for row in &summary.table {
                println!(
                    "  - {:<12} weight {:>3} | contributes {:>6} ({} to {})",
                    row.stage_name, row.stage_weight, row.weighted_achieved, row.start_date, row.end_date
                );
            }
            println!(
                "  total {} across {} stage weight",
                summary.total_weighted_achieved, summary.total_weight
            );
        }
    }

    Ok(())
}

pub(crate) fn run_ranking(args: RankingArgs) -> Result<(), AppError> {
    let service = demo_service()?;
    let request = PageRequest {
        page: args.page,
        size: args.size,
    };

    let (title, page) = match args.stage {
        Some(stage) => (
            format!("Stage {stage} ranking"),
            service.rankings().rank_by_stage(StageId(stage), request)?,
        ),
        None => (
            "Overall ranking".to_string(),
            service.rankings().rank_overall(request)?,
        ),
    };

    if args.json {
        return print_json(&page);
    }
    println!(
        "{title} | page {} of {} ({} units)",
        page.meta.page, page.meta.pages, page.meta.total
    );
    print_rankings(&page.items);
    Ok(())
}

pub(crate) fn run_import(args: ImportArgs) -> Result<(), AppError> {
    let service = demo_service()?;
    let actor = service.actor_for(&args.submitter)?;
    let batch = ScoreBatch::from_reader(BufReader::new(File::open(&args.file)?))?;

    let report = service.intake().apply(&actor, batch);
    print_json(&report)
}

pub(crate) fn run_demo() -> Result<(), AppError> {
    let service = demo_service()?;
    let repository = service.repository();
    let summaries = service.summaries();
    let rankings = service.rankings();

    println!("KPI race demo");
    let stages = repository.stages()?;
    for stage in &stages {
        println!(
            "- {} (weight {}, {} to {}){}",
            stage.name,
            stage.weight,
            stage.start_date,
            stage.end_date,
            if stage.active { " [active]" } else { "" }
        );
    }

    let lead = UnitId(1);
    if let Some(stage) = stages.first() {
        if let Some(period) = repository.periods_of_stage(stage.id)?.first() {
            let summary = summaries.summarize_by_period(lead, period.id)?;
            println!(
                "\n{} in {} ({})",
                summary.unit.unit_name, period.name, stage.name
            );
            print_clocks(&summary.clocks);
        }
    }

    for stage in &stages {
        let summary = summaries.summarize_by_stage(lead, stage.id)?;
        println!("\n{} averaged over {}", summary.unit.unit_name, stage.name);
        print_clocks(&summary.clocks);
        println!("  stage result {}%", summary.total_achieved_percent);
    }

    let overall = summaries.summarize_overall(lead)?;
    println!(
        "\nOverall contribution for {}: {} (normalized {})",
        overall.unit.unit_name,
        overall.total_weighted_achieved,
        rankings.normalized_overall_score(lead)?
    );

    for stage in &stages {
        let page = rankings.rank_by_stage(stage.id, PageRequest::default())?;
        println!("\n{} ranking", stage.name);
        print_rankings(&page.items);
    }

    let overall_page = rankings.rank_overall(PageRequest::default())?;
    println!("\nOverall ranking");
    print_rankings(&overall_page.items);

    match rankings.top_of_active_stage(None) {
        Ok(podium) => {
            println!(
                "\nPodium of {} ({} to {})",
                podium.stage.stage_name, podium.start_date, podium.end_date
            );
            print_rankings(&podium.rankings);
        }
        Err(err) => println!("\nPodium unavailable: {err}"),
    }

    Ok(())
}
