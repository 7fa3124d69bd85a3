use crate::demo::{run_demo, run_import, run_ranking, run_summary, ImportArgs, RankingArgs, SummaryArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use kpi_race::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "KPI Race",
    about = "Run the KPI contest scoring service or inspect the demo contest from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Print a period, stage or overall summary for one unit of the demo contest
    Summary(SummaryArgs),
    /// Print a paginated stage or overall ranking of the demo contest
    Ranking(RankingArgs),
    /// Validate and record a CSV score file against the demo contest
    Import(ImportArgs),
    /// Walk through summaries, rankings and the podium of the demo contest
    Demo,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Summary(args) => run_summary(args),
        Command::Ranking(args) => run_ranking(args),
        Command::Import(args) => run_import(args),
        Command::Demo => run_demo(),
    }
}
