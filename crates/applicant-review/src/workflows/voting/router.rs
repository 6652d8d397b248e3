use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Path, Request, State},
    http::{request::Parts, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tracing::error;

use super::ledger::{LedgerError, VoteLog};
use super::service::{Ballot, JudgeSession, ReviewService, ReviewServiceError};

/// Header carrying the panel's shared secret.
pub const SECRET_HEADER: &str = "x-review-secret";
/// Header naming the judge on whose behalf a request is made.
pub const JUDGE_HEADER: &str = "x-judge-name";

#[derive(Clone)]
struct PanelSecret(Arc<str>);

/// Review panel endpoints, all behind the shared-secret gate.
pub fn review_router<L>(service: Arc<ReviewService<L>>, secret: &str) -> Router
where
    L: VoteLog + 'static,
{
    Router::new()
        .route("/api/v1/applicants", get(list_applicants_handler::<L>))
        .route("/api/v1/applicants/:name", get(applicant_handler::<L>))
        .route("/api/v1/votes", post(cast_vote_handler::<L>))
        .route("/api/v1/votes/:applicant", get(my_vote_handler::<L>))
        .route(
            "/api/v1/results/applicants",
            get(applicant_results_handler::<L>),
        )
        .route("/api/v1/results/judges", get(judge_results_handler::<L>))
        .route("/api/v1/results/export", post(export_handler::<L>))
        .with_state(service)
        .layer(middleware::from_fn_with_state(
            PanelSecret(Arc::from(secret)),
            require_secret,
        ))
}

async fn require_secret(
    State(PanelSecret(secret)): State<PanelSecret>,
    request: Request,
    next: Next,
) -> Response {
    let presented = request
        .headers()
        .get(SECRET_HEADER)
        .and_then(|value| value.to_str().ok());

    match presented {
        Some(value) if value.as_bytes() == secret.as_bytes() => next.run(request).await,
        _ => {
            let payload = json!({
                "error": "missing or incorrect review secret",
            });
            (StatusCode::UNAUTHORIZED, Json(payload)).into_response()
        }
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for JudgeSession
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let name = parts
            .headers
            .get(JUDGE_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();

        JudgeSession::new(name).map_err(|err| {
            let payload = json!({
                "error": err.to_string(),
            });
            (StatusCode::BAD_REQUEST, Json(payload)).into_response()
        })
    }
}

pub(crate) async fn list_applicants_handler<L>(
    State(service): State<Arc<ReviewService<L>>>,
) -> Response
where
    L: VoteLog + 'static,
{
    (StatusCode::OK, Json(service.applicants())).into_response()
}

pub(crate) async fn applicant_handler<L>(
    State(service): State<Arc<ReviewService<L>>>,
    Path(name): Path<String>,
) -> Response
where
    L: VoteLog + 'static,
{
    match run_blocking(service, move |service| service.applicant(&name)).await {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn cast_vote_handler<L>(
    State(service): State<Arc<ReviewService<L>>>,
    session: JudgeSession,
    Json(ballot): Json<Ballot>,
) -> Response
where
    L: VoteLog + 'static,
{
    match run_blocking(service, move |service| service.cast_vote(&session, ballot)).await {
        Ok(event) => (StatusCode::CREATED, Json(event)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn my_vote_handler<L>(
    State(service): State<Arc<ReviewService<L>>>,
    session: JudgeSession,
    Path(applicant): Path<String>,
) -> Response
where
    L: VoteLog + 'static,
{
    let judge_name = session.judge_name().to_string();
    let lookup = applicant.clone();
    match run_blocking(service, move |service| service.my_vote(&session, &lookup)).await {
        Ok(vote) => {
            let payload = json!({
                "judge_name": judge_name,
                "applicant_name": applicant,
                "vote": vote,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(response) => response,
    }
}

pub(crate) async fn applicant_results_handler<L>(
    State(service): State<Arc<ReviewService<L>>>,
) -> Response
where
    L: VoteLog + 'static,
{
    match run_blocking(service, |service| service.applicant_results()).await {
        Ok(tallies) => (StatusCode::OK, Json(tallies)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn judge_results_handler<L>(
    State(service): State<Arc<ReviewService<L>>>,
) -> Response
where
    L: VoteLog + 'static,
{
    match run_blocking(service, |service| service.judge_results()).await {
        Ok(tallies) => (StatusCode::OK, Json(tallies)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn export_handler<L>(State(service): State<Arc<ReviewService<L>>>) -> Response
where
    L: VoteLog + 'static,
{
    let results_path = service.results_path().to_path_buf();
    match run_blocking(service, |service| service.export_results()).await {
        Ok(path) => {
            let payload = json!({
                "path": path.display().to_string(),
                "backup": path != results_path,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(response) => response,
    }
}

/// Ledger and workbook calls touch the filesystem, so they run off the async workers.
async fn run_blocking<L, T, F>(service: Arc<ReviewService<L>>, call: F) -> Result<T, Response>
where
    L: VoteLog + 'static,
    T: Send + 'static,
    F: FnOnce(&ReviewService<L>) -> Result<T, ReviewServiceError> + Send + 'static,
{
    match tokio::task::spawn_blocking(move || call(&service)).await {
        Ok(result) => result.map_err(error_response),
        Err(err) => {
            error!(error = %err, "review task did not complete");
            let payload = json!({
                "error": "review task did not complete",
            });
            Err((StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response())
        }
    }
}

fn error_response(err: ReviewServiceError) -> Response {
    let status = match &err {
        ReviewServiceError::UnknownApplicant(_) => StatusCode::NOT_FOUND,
        ReviewServiceError::Ledger(LedgerError::Invalid(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        ReviewServiceError::Ledger(LedgerError::Log(_)) | ReviewServiceError::Workbook(_) => {
            error!(error = %err, "review storage failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = json!({
        "error": err.to_string(),
    });
    (status, Json(payload)).into_response()
}
