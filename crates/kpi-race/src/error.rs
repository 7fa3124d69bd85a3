use crate::config::ConfigError;
use crate::scoring::intake::{ScoreImportError, ScoreIntakeError};
use crate::scoring::provisioning::ProvisioningError;
use crate::scoring::ranking::RankingError;
use crate::scoring::repository::RepositoryError;
use crate::scoring::router::USER_EMAIL_HEADER;
use crate::scoring::summary::SummaryError;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Repository(RepositoryError),
    Summary(SummaryError),
    Ranking(RankingError),
    Intake(ScoreIntakeError),
    Import(ScoreImportError),
    Provisioning(ProvisioningError),
    MissingUser,
    Task(tokio::task::JoinError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Repository(err) => write!(f, "store error: {}", err),
            AppError::Summary(err) => write!(f, "summary error: {}", err),
            AppError::Ranking(err) => write!(f, "ranking error: {}", err),
            AppError::Intake(err) => write!(f, "score error: {}", err),
            AppError::Import(err) => write!(f, "import error: {}", err),
            AppError::Provisioning(err) => write!(f, "provisioning error: {}", err),
            AppError::MissingUser => write!(f, "missing {} header", USER_EMAIL_HEADER),
            AppError::Task(err) => write!(f, "background task failed: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Repository(err) => Some(err),
            AppError::Summary(err) => Some(err),
            AppError::Ranking(err) => Some(err),
            AppError::Intake(err) => Some(err),
            AppError::Import(err) => Some(err),
            AppError::Provisioning(err) => Some(err),
            AppError::MissingUser => None,
            AppError::Task(err) => Some(err),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingUser => StatusCode::UNAUTHORIZED,
            AppError::Summary(err) | AppError::Ranking(RankingError::Summary(err)) => {
                summary_status(err)
            }
            AppError::Ranking(RankingError::Page(_)) | AppError::Import(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Intake(err) => match err {
                ScoreIntakeError::NotFound { .. } => StatusCode::NOT_FOUND,
                ScoreIntakeError::Forbidden { .. } => StatusCode::FORBIDDEN,
                ScoreIntakeError::StageInactive { .. } | ScoreIntakeError::InvalidValue(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                ScoreIntakeError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Provisioning(ProvisioningError::Repository(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Provisioning(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to API clients. Domain failures go out without the layer prefix.
    fn client_message(&self) -> String {
        match self {
            AppError::Summary(err) => err.to_string(),
            AppError::Ranking(err) => err.to_string(),
            AppError::Intake(err) => err.to_string(),
            AppError::Import(err) => err.to_string(),
            AppError::Provisioning(err) => err.to_string(),
            other => other.to_string(),
        }
    }
}

fn summary_status(err: &SummaryError) -> StatusCode {
    match err {
        SummaryError::NotFound { .. } => StatusCode::NOT_FOUND,
        SummaryError::InvalidState(_) | SummaryError::Page(_) => StatusCode::BAD_REQUEST,
        SummaryError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(json!({ "error": self.client_message() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<RepositoryError> for AppError {
    fn from(value: RepositoryError) -> Self {
        Self::Repository(value)
    }
}

impl From<SummaryError> for AppError {
    fn from(value: SummaryError) -> Self {
        Self::Summary(value)
    }
}

impl From<RankingError> for AppError {
    fn from(value: RankingError) -> Self {
        Self::Ranking(value)
    }
}

impl From<ScoreIntakeError> for AppError {
    fn from(value: ScoreIntakeError) -> Self {
        Self::Intake(value)
    }
}

impl From<ScoreImportError> for AppError {
    fn from(value: ScoreImportError) -> Self {
        Self::Import(value)
    }
}

impl From<ProvisioningError> for AppError {
    fn from(value: ProvisioningError) -> Self {
        Self::Provisioning(value)
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Task(value)
    }
}
