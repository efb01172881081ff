// src/handlers/candidates.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{error::AppError, pagination::Paginated},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{DistrictAdmins, RequireRole},
    },
    models::candidate::{
        CandidateListQuery, CandidateStatusPayload, CandidateView, CreateCandidatePayload, UpdateCandidatePayload,
    },
};

// GET /api/candidates
#[utoipa::path(
    get,
    path = "/api/candidates",
    tag = "Candidates",
    params(CandidateListQuery),
    responses(
        (status = 200, description = "Candidates visible to the caller, soonest deadline first", body = Paginated<CandidateView>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_candidates(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    WithRejection(Query(query), _): WithRejection<Query<CandidateListQuery>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let page = app_state.candidate_service.list(&caller, &query).await?;
    Ok(Json(page))
}

// POST /api/candidates
#[utoipa::path(
    post,
    path = "/api/candidates",
    tag = "Candidates",
    request_body = CreateCandidatePayload,
    responses(
        (status = 201, description = "Candidate submitted", body = CandidateView),
        (status = 400, description = "Invalid data or date window"),
        (status = 403, description = "Not staff of this lodge"),
        (status = 404, description = "Lodge not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_candidate(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    WithRejection(Json(payload), _): WithRejection<Json<CreateCandidatePayload>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let candidate = app_state.candidate_service.create(&caller, &payload).await?;
    Ok((StatusCode::CREATED, Json(candidate)))
}

// GET /api/candidates/{id}
#[utoipa::path(
    get,
    path = "/api/candidates/{id}",
    tag = "Candidates",
    params(("id" = Uuid, Path, description = "Candidate id")),
    responses(
        (status = 200, description = "The candidate", body = CandidateView),
        (status = 404, description = "Candidate not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_candidate(
    State(app_state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<CandidateView>, AppError> {
    Ok(Json(app_state.candidate_service.get(id).await?))
}

// PUT /api/candidates/{id}
#[utoipa::path(
    put,
    path = "/api/candidates/{id}",
    tag = "Candidates",
    params(("id" = Uuid, Path, description = "Candidate id")),
    request_body = UpdateCandidatePayload,
    responses(
        (status = 200, description = "Candidate updated", body = CandidateView),
        (status = 403, description = "Not staff of this lodge"),
        (status = 404, description = "Candidate not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_candidate(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(payload), _): WithRejection<Json<UpdateCandidatePayload>, AppError>,
) -> Result<Json<CandidateView>, AppError> {
    payload.validate()?;
    Ok(Json(app_state.candidate_service.update(&caller, id, &payload).await?))
}

// PUT /api/candidates/{id}/status
#[utoipa::path(
    put,
    path = "/api/candidates/{id}/status",
    tag = "Candidates",
    params(("id" = Uuid, Path, description = "Candidate id")),
    request_body = CandidateStatusPayload,
    responses(
        (status = 200, description = "Decision recorded", body = CandidateView),
        (status = 403, description = "District level admins only"),
        (status = 404, description = "Candidate not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn set_candidate_status(
    State(app_state): State<AppState>,
    _guard: RequireRole<DistrictAdmins>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(payload), _): WithRejection<Json<CandidateStatusPayload>, AppError>,
) -> Result<Json<CandidateView>, AppError> {
    Ok(Json(app_state.candidate_service.set_status(id, payload.status).await?))
}

// DELETE /api/candidates/{id}
#[utoipa::path(
    delete,
    path = "/api/candidates/{id}",
    tag = "Candidates",
    params(("id" = Uuid, Path, description = "Candidate id")),
    responses(
        (status = 204, description = "Candidate deleted"),
        (status = 403, description = "Not staff of this lodge"),
        (status = 404, description = "Candidate not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_candidate(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<StatusCode, AppError> {
    app_state.candidate_service.delete(&caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
