use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::domain::{DecisionStatus, ProductCode, ProviderCode, ProviderSelection, SessionId};
use super::events::ReviewEventPublisher;
use super::grading::CriterionWeightSet;
use super::repository::{RepositoryError, ReviewSessionRepository};
use super::service::{KypReviewService, ReviewServiceError};
use super::session::{ReviewError, ReviewSession};

/// Router builder exposing the review workflow over HTTP.
pub fn review_router<R, P>(service: Arc<KypReviewService<R, P>>) -> Router
where
    R: ReviewSessionRepository + 'static,
    P: ReviewEventPublisher + 'static,
{
    Router::new()
        .route("/api/v1/kyp/reviews", post(start_handler::<R, P>))
        .route(
            "/api/v1/kyp/reviews/:session_id",
            get(session_handler::<R, P>),
        )
        .route(
            "/api/v1/kyp/reviews/:session_id/providers",
            put(providers_handler::<R, P>),
        )
        .route(
            "/api/v1/kyp/reviews/:session_id/providers/:provider/products",
            put(provider_products_handler::<R, P>),
        )
        .route(
            "/api/v1/kyp/reviews/:session_id/products",
            put(products_handler::<R, P>),
        )
        .route(
            "/api/v1/kyp/reviews/:session_id/weights",
            put(weights_handler::<R, P>),
        )
        .route(
            "/api/v1/kyp/reviews/:session_id/candidates/:code",
            post(add_candidate_handler::<R, P>).delete(remove_candidate_handler::<R, P>),
        )
        .route(
            "/api/v1/kyp/reviews/:session_id/decisions/:code",
            post(decision_handler::<R, P>),
        )
        .route(
            "/api/v1/kyp/reviews/:session_id/notes/:code",
            put(candidate_note_handler::<R, P>),
        )
        .route(
            "/api/v1/kyp/reviews/:session_id/note",
            put(review_note_handler::<R, P>),
        )
        .route(
            "/api/v1/kyp/reviews/:session_id/advance",
            post(advance_handler::<R, P>),
        )
        .route(
            "/api/v1/kyp/reviews/:session_id/back",
            post(back_handler::<R, P>),
        )
        .route(
            "/api/v1/kyp/reviews/:session_id/cancel",
            post(cancel_handler::<R, P>),
        )
        .route(
            "/api/v1/kyp/reviews/:session_id/commit",
            post(commit_handler::<R, P>),
        )
        .route(
            "/api/v1/kyp/reviews/:session_id/export",
            get(export_handler::<R, P>),
        )
        .route(
            "/api/v1/kyp/reviews/:session_id/record",
            get(record_handler::<R, P>),
        )
        .route(
            "/api/v1/kyp/catalog/:code/reviews",
            get(product_reviews_handler::<R, P>),
        )
        .with_state(service)
}

type ServiceState<R, P> = State<Arc<KypReviewService<R, P>>>;

#[derive(Debug, Deserialize)]
pub(crate) struct StartReviewRequest {
    pub reference_code: String,
    #[serde(default)]
    pub selection: Option<ProviderSelection>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SelectProductsRequest {
    pub codes: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DecisionRequest {
    pub status: DecisionStatus,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NoteRequest {
    pub note: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CommitRequest {
    #[serde(default)]
    pub note: Option<String>,
}

fn status_for(error: &ReviewServiceError) -> StatusCode {
    match error {
        ReviewServiceError::Review(
            ReviewError::SessionNotFound(_)
            | ReviewError::UnknownProduct(_)
            | ReviewError::UnknownCandidate(_),
        ) => StatusCode::NOT_FOUND,
        ReviewServiceError::Review(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ReviewServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        ReviewServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: ReviewServiceError) -> Response {
    let payload = json!({
        "error": error.to_string(),
    });
    (status_for(&error), axum::Json(payload)).into_response()
}

fn session_response(result: Result<ReviewSession, ReviewServiceError>) -> Response {
    match result {
        Ok(session) => (StatusCode::OK, axum::Json(session.view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn start_handler<R, P>(
    State(service): ServiceState<R, P>,
    axum::Json(request): axum::Json<StartReviewRequest>,
) -> Response
where
    R: ReviewSessionRepository + 'static,
    P: ReviewEventPublisher + 'static,
{
    let reference = ProductCode::new(request.reference_code);
    match service.start_review(&reference, request.selection) {
        Ok(session) => (StatusCode::CREATED, axum::Json(session.view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn session_handler<R, P>(
    State(service): ServiceState<R, P>,
    Path(session_id): Path<String>,
) -> Response
where
    R: ReviewSessionRepository + 'static,
    P: ReviewEventPublisher + 'static,
{
    session_response(service.get(&SessionId(session_id)))
}

pub(crate) async fn providers_handler<R, P>(
    State(service): ServiceState<R, P>,
    Path(session_id): Path<String>,
    axum::Json(selection): axum::Json<ProviderSelection>,
) -> Response
where
    R: ReviewSessionRepository + 'static,
    P: ReviewEventPublisher + 'static,
{
    session_response(service.choose_providers(&SessionId(session_id), selection))
}

pub(crate) async fn products_handler<R, P>(
    State(service): ServiceState<R, P>,
    Path(session_id): Path<String>,
    axum::Json(request): axum::Json<SelectProductsRequest>,
) -> Response
where
    R: ReviewSessionRepository + 'static,
    P: ReviewEventPublisher + 'static,
{
    let codes: Vec<ProductCode> = request.codes.into_iter().map(ProductCode::new).collect();
    session_response(service.select_products(&SessionId(session_id), &codes))
}

pub(crate) async fn provider_products_handler<R, P>(
    State(service): ServiceState<R, P>,
    Path((session_id, provider)): Path<(String, String)>,
) -> Response
where
    R: ReviewSessionRepository + 'static,
    P: ReviewEventPublisher + 'static,
{
    session_response(
        service.toggle_provider_products(&SessionId(session_id), &ProviderCode::new(provider)),
    )
}

pub(crate) async fn weights_handler<R, P>(
    State(service): ServiceState<R, P>,
    Path(session_id): Path<String>,
    axum::Json(weights): axum::Json<CriterionWeightSet>,
) -> Response
where
    R: ReviewSessionRepository + 'static,
    P: ReviewEventPublisher + 'static,
{
    session_response(service.reweight(&SessionId(session_id), weights))
}

pub(crate) async fn add_candidate_handler<R, P>(
    State(service): ServiceState<R, P>,
    Path((session_id, code)): Path<(String, String)>,
) -> Response
where
    R: ReviewSessionRepository + 'static,
    P: ReviewEventPublisher + 'static,
{
    session_response(service.add_candidate(&SessionId(session_id), &ProductCode::new(code)))
}

pub(crate) async fn remove_candidate_handler<R, P>(
    State(service): ServiceState<R, P>,
    Path((session_id, code)): Path<(String, String)>,
) -> Response
where
    R: ReviewSessionRepository + 'static,
    P: ReviewEventPublisher + 'static,
{
    session_response(service.remove_candidate(&SessionId(session_id), &ProductCode::new(code)))
}

pub(crate) async fn decision_handler<R, P>(
    State(service): ServiceState<R, P>,
    Path((session_id, code)): Path<(String, String)>,
    axum::Json(request): axum::Json<DecisionRequest>,
) -> Response
where
    R: ReviewSessionRepository + 'static,
    P: ReviewEventPublisher + 'static,
{
    session_response(service.toggle_decision(
        &SessionId(session_id),
        &ProductCode::new(code),
        request.status,
    ))
}

pub(crate) async fn candidate_note_handler<R, P>(
    State(service): ServiceState<R, P>,
    Path((session_id, code)): Path<(String, String)>,
    axum::Json(request): axum::Json<NoteRequest>,
) -> Response
where
    R: ReviewSessionRepository + 'static,
    P: ReviewEventPublisher + 'static,
{
    session_response(service.set_candidate_note(
        &SessionId(session_id),
        &ProductCode::new(code),
        &request.note,
    ))
}

pub(crate) async fn review_note_handler<R, P>(
    State(service): ServiceState<R, P>,
    Path(session_id): Path<String>,
    axum::Json(request): axum::Json<NoteRequest>,
) -> Response
where
    R: ReviewSessionRepository + 'static,
    P: ReviewEventPublisher + 'static,
{
    session_response(service.set_review_note(&SessionId(session_id), &request.note))
}

pub(crate) async fn advance_handler<R, P>(
    State(service): ServiceState<R, P>,
    Path(session_id): Path<String>,
) -> Response
where
    R: ReviewSessionRepository + 'static,
    P: ReviewEventPublisher + 'static,
{
    session_response(service.advance(&SessionId(session_id)))
}

pub(crate) async fn back_handler<R, P>(
    State(service): ServiceState<R, P>,
    Path(session_id): Path<String>,
) -> Response
where
    R: ReviewSessionRepository + 'static,
    P: ReviewEventPublisher + 'static,
{
    session_response(service.back(&SessionId(session_id)))
}

pub(crate) async fn cancel_handler<R, P>(
    State(service): ServiceState<R, P>,
    Path(session_id): Path<String>,
) -> Response
where
    R: ReviewSessionRepository + 'static,
    P: ReviewEventPublisher + 'static,
{
    session_response(service.cancel(&SessionId(session_id)))
}

pub(crate) async fn commit_handler<R, P>(
    State(service): ServiceState<R, P>,
    Path(session_id): Path<String>,
    axum::Json(request): axum::Json<CommitRequest>,
) -> Response
where
    R: ReviewSessionRepository + 'static,
    P: ReviewEventPublisher + 'static,
{
    match service.commit(&SessionId(session_id), request.note.as_deref(), Utc::now()) {
        Ok(record) => (StatusCode::CREATED, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn export_handler<R, P>(
    State(service): ServiceState<R, P>,
    Path(session_id): Path<String>,
) -> Response
where
    R: ReviewSessionRepository + 'static,
    P: ReviewEventPublisher + 'static,
{
    match service.export(&SessionId(session_id)) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn record_handler<R, P>(
    State(service): ServiceState<R, P>,
    Path(session_id): Path<String>,
) -> Response
where
    R: ReviewSessionRepository + 'static,
    P: ReviewEventPublisher + 'static,
{
    match service.record(&SessionId(session_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

/// Committed reviews of one catalog product, for the review-details view.
pub(crate) async fn product_reviews_handler<R, P>(
    State(service): ServiceState<R, P>,
    Path(code): Path<String>,
) -> Response
where
    R: ReviewSessionRepository + 'static,
    P: ReviewEventPublisher + 'static,
{
    match service.records_for(&ProductCode::new(code)) {
        Ok(records) => (StatusCode::OK, axum::Json(records)).into_response(),
        Err(error) => error_response(error),
    }
}
