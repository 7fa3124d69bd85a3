use std::io::Cursor;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use super::domain::{PeriodId, Score, StageId, UnitId, UnitKind};
use super::intake::{Actor, ImportReport, ScoreBatch, ScoreRequest};
use super::ranking::{Page, PageRequest, RankingError, RankingService, StagePodium, UnitRanking};
use super::repository::ScoringStore;
use super::service::ScoringService;
use super::summary::{
    MetricBoard, OverallSummary, PeriodSummary, ScoreLookup, StageSummary, UnitBoardStatus,
    UnitScope,
};
use crate::error::AppError;

/// Header carrying the signed-in user's e-mail, set by the authenticating proxy.
pub const USER_EMAIL_HEADER: &str = "x-user-email";

type Shared<R> = Arc<ScoringService<R>>;
type Reply<T> = Result<Json<T>, AppError>;

/// Router builder exposing summaries, rankings and score intake.
pub fn scoring_router<R>(service: Arc<ScoringService<R>>) -> Router
where
    R: ScoringStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/units/:unit_id/summary/periods/:period_id",
            get(unit_period_handler::<R>),
        )
        .route(
            "/api/v1/units/:unit_id/summary/stages/:stage_id",
            get(unit_stage_handler::<R>),
        )
        .route(
            "/api/v1/units/:unit_id/summary/overall",
            get(unit_overall_handler::<R>),
        )
        .route(
            "/api/v1/units/:unit_id/metric-board",
            get(unit_board_handler::<R>),
        )
        .route(
            "/api/v1/me/summary/periods/:period_id",
            get(my_period_handler::<R>),
        )
        .route(
            "/api/v1/me/summary/stages/:stage_id",
            get(my_stage_handler::<R>),
        )
        .route("/api/v1/me/summary/overall", get(my_overall_handler::<R>))
        .route("/api/v1/me/metric-board", get(my_board_handler::<R>))
        .route("/api/v1/metric-boards", get(board_list_handler::<R>))
        .route(
            "/api/v1/rankings/stages/:stage_id",
            get(stage_ranking_handler::<R>),
        )
        .route(
            "/api/v1/rankings/stages/:stage_id/top",
            get(stage_top_handler::<R>),
        )
        .route("/api/v1/rankings/overall", get(overall_ranking_handler::<R>))
        .route("/api/v1/rankings/active/top", get(active_top_handler::<R>))
        .route("/api/v1/scores", post(submit_score_handler::<R>))
        .route("/api/v1/scores/import", post(import_scores_handler::<R>))
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct BoardQuery {
    pub(crate) period_id: Option<PeriodId>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct BoardListQuery {
    pub(crate) period_id: Option<PeriodId>,
    pub(crate) kind: Option<UnitKind>,
    pub(crate) page: Option<usize>,
    pub(crate) size: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TopQuery {
    pub(crate) n: Option<usize>,
}

pub(crate) async fn unit_period_handler<R>(
    State(service): State<Shared<R>>,
    Path((unit_id, period_id)): Path<(UnitId, PeriodId)>,
) -> Reply<PeriodSummary>
where
    R: ScoringStore + 'static,
{
    Ok(Json(
        service.summaries().summarize_by_period(unit_id, period_id)?,
    ))
}

pub(crate) async fn unit_stage_handler<R>(
    State(service): State<Shared<R>>,
    Path((unit_id, stage_id)): Path<(UnitId, StageId)>,
) -> Reply<StageSummary>
where
    R: ScoringStore + 'static,
{
    Ok(Json(
        service.summaries().summarize_by_stage(unit_id, stage_id)?,
    ))
}

pub(crate) async fn unit_overall_handler<R>(
    State(service): State<Shared<R>>,
    Path(unit_id): Path<UnitId>,
) -> Reply<OverallSummary>
where
    R: ScoringStore + 'static,
{
    Ok(Json(service.summaries().summarize_overall(unit_id)?))
}

pub(crate) async fn unit_board_handler<R>(
    State(service): State<Shared<R>>,
    Path(unit_id): Path<UnitId>,
    Query(query): Query<BoardQuery>,
) -> Reply<MetricBoard>
where
    R: ScoringStore + 'static,
{
    let lookup = ScoreLookup::from(query.period_id);
    Ok(Json(service.summaries().metric_board(unit_id, lookup)?))
}

pub(crate) async fn board_list_handler<R>(
    State(service): State<Shared<R>>,
    Query(query): Query<BoardListQuery>,
) -> Reply<Page<UnitBoardStatus>>
where
    R: ScoringStore + 'static,
{
    let request = PageRequest {
        page: query.page.unwrap_or(1),
        size: query.size,
    };
    let default_size = service.rankings().config().page_size;
    let page = service.summaries().board_statuses(
        query.kind,
        ScoreLookup::from(query.period_id),
        request,
        default_size,
    )?;
    Ok(Json(page))
}

pub(crate) async fn my_period_handler<R>(
    State(service): State<Shared<R>>,
    headers: HeaderMap,
    Path(period_id): Path<PeriodId>,
) -> Reply<PeriodSummary>
where
    R: ScoringStore + 'static,
{
    let unit_id = current_unit(&service, &headers)?;
    Ok(Json(
        service.summaries().summarize_by_period(unit_id, period_id)?,
    ))
}

pub(crate) async fn my_stage_handler<R>(
    State(service): State<Shared<R>>,
    headers: HeaderMap,
    Path(stage_id): Path<StageId>,
) -> Reply<StageSummary>
where
    R: ScoringStore + 'static,
{
    let unit_id = current_unit(&service, &headers)?;
    Ok(Json(
        service.summaries().summarize_by_stage(unit_id, stage_id)?,
    ))
}

pub(crate) async fn my_overall_handler<R>(
    State(service): State<Shared<R>>,
    headers: HeaderMap,
) -> Reply<OverallSummary>
where
    R: ScoringStore + 'static,
{
    let unit_id = current_unit(&service, &headers)?;
    Ok(Json(service.summaries().summarize_overall(unit_id)?))
}

pub(crate) async fn my_board_handler<R>(
    State(service): State<Shared<R>>,
    headers: HeaderMap,
    Query(query): Query<BoardQuery>,
) -> Reply<MetricBoard>
where
    R: ScoringStore + 'static,
{
    let unit_id = current_unit(&service, &headers)?;
    let lookup = ScoreLookup::from(query.period_id);
    Ok(Json(service.summaries().metric_board(unit_id, lookup)?))
}

pub(crate) async fn stage_ranking_handler<R>(
    State(service): State<Shared<R>>,
    Path(stage_id): Path<StageId>,
    Query(page): Query<PageRequest>,
) -> Reply<Page<UnitRanking>>
where
    R: ScoringStore + 'static,
{
    off_runtime(service, move |rankings| rankings.rank_by_stage(stage_id, page)).await
}

pub(crate) async fn stage_top_handler<R>(
    State(service): State<Shared<R>>,
    Path(stage_id): Path<StageId>,
    Query(query): Query<TopQuery>,
) -> Reply<Vec<UnitRanking>>
where
    R: ScoringStore + 'static,
{
    off_runtime(service, move |rankings| rankings.top(stage_id, query.n)).await
}

pub(crate) async fn overall_ranking_handler<R>(
    State(service): State<Shared<R>>,
    Query(page): Query<PageRequest>,
) -> Reply<Page<UnitRanking>>
where
    R: ScoringStore + 'static,
{
    off_runtime(service, move |rankings| rankings.rank_overall(page)).await
}

pub(crate) async fn active_top_handler<R>(
    State(service): State<Shared<R>>,
    Query(query): Query<TopQuery>,
) -> Reply<StagePodium>
where
    R: ScoringStore + 'static,
{
    off_runtime(service, move |rankings| rankings.top_of_active_stage(query.n)).await
}

pub(crate) async fn submit_score_handler<R>(
    State(service): State<Shared<R>>,
    headers: HeaderMap,
    Json(request): Json<ScoreRequest>,
) -> Reply<Score>
where
    R: ScoringStore + 'static,
{
    let actor = signed_in_actor(&service, &headers)?;
    Ok(Json(service.intake().submit(&actor, request)?))
}

pub(crate) async fn import_scores_handler<R>(
    State(service): State<Shared<R>>,
    headers: HeaderMap,
    body: String,
) -> Reply<ImportReport>
where
    R: ScoringStore + 'static,
{
    let actor = signed_in_actor(&service, &headers)?;
    let batch = ScoreBatch::from_reader(Cursor::new(body.into_bytes()))?;
    Ok(Json(service.intake().apply(&actor, batch)))
}

/// Rankings block on the rayon pool, so they run on tokio's blocking threads.
async fn off_runtime<R, T, F>(service: Shared<R>, job: F) -> Reply<T>
where
    R: ScoringStore + 'static,
    T: Send + 'static,
    F: FnOnce(&RankingService<R>) -> Result<T, RankingError> + Send + 'static,
{
    let result = tokio::task::spawn_blocking(move || job(service.rankings())).await?;
    Ok(Json(result?))
}

fn user_email(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(USER_EMAIL_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|email| !email.is_empty())
}

fn current_unit<R>(service: &ScoringService<R>, headers: &HeaderMap) -> Result<UnitId, AppError>
where
    R: ScoringStore + 'static,
{
    let email = user_email(headers).ok_or(AppError::MissingUser)?;
    Ok(UnitScope::CurrentUser(email.to_string()).resolve(service.repository())?)
}

fn signed_in_actor<R>(service: &ScoringService<R>, headers: &HeaderMap) -> Result<Actor, AppError>
where
    R: ScoringStore + 'static,
{
    let email = user_email(headers).ok_or(AppError::MissingUser)?;
    Ok(service.actor_for(email)?)
}
