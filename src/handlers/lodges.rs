// src/handlers/lodges.rs

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
        rbac::{RequireRole, SuperAdminOnly},
    },
    models::{
        lodge::{AssignPositionPayload, CreateLodgePayload, Lodge, LodgeListQuery, LodgePosition, UpdateLodgePayload},
        user::MemberView,
    },
    services::lodge_service::LodgeService,
};

// GET /api/lodges
#[utoipa::path(
    get,
    path = "/api/lodges",
    tag = "Lodges",
    params(LodgeListQuery),
    responses(
        (status = 200, description = "One page of lodges", body = Paginated<Lodge>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_lodges(
    State(app_state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<LodgeListQuery>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let page = app_state.lodge_service.list(&query).await?;
    Ok(Json(page))
}

// POST /api/lodges
#[utoipa::path(
    post,
    path = "/api/lodges",
    tag = "Lodges",
    request_body = CreateLodgePayload,
    responses(
        (status = 201, description = "Lodge created", body = Lodge),
        (status = 400, description = "Invalid data or duplicate name"),
        (status = 403, description = "Super admins only")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_lodge(
    State(app_state): State<AppState>,
    _guard: RequireRole<SuperAdminOnly>,
    WithRejection(Json(payload), _): WithRejection<Json<CreateLodgePayload>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let lodge = app_state.lodge_service.create(&payload).await?;
    Ok((StatusCode::CREATED, Json(lodge)))
}

// GET /api/lodges/{id}
#[utoipa::path(
    get,
    path = "/api/lodges/{id}",
    tag = "Lodges",
    params(("id" = Uuid, Path, description = "Lodge id")),
    responses(
        (status = 200, description = "The lodge", body = Lodge),
        (status = 404, description = "Lodge not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_lodge(
    State(app_state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<Lodge>, AppError> {
    Ok(Json(app_state.lodge_service.get(id).await?))
}

// PUT /api/lodges/{id}
#[utoipa::path(
    put,
    path = "/api/lodges/{id}",
    tag = "Lodges",
    params(("id" = Uuid, Path, description = "Lodge id")),
    request_body = UpdateLodgePayload,
    responses(
        (status = 200, description = "Lodge updated", body = Lodge),
        (status = 403, description = "Not an admin of this lodge"),
        (status = 404, description = "Lodge not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_lodge(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(payload), _): WithRejection<Json<UpdateLodgePayload>, AppError>,
) -> Result<Json<Lodge>, AppError> {
    payload.validate()?;
    if !LodgeService::can_manage(&caller, id) {
        return Err(AppError::forbidden("You cannot edit this lodge"));
    }

    Ok(Json(app_state.lodge_service.update(id, &payload).await?))
}

// DELETE /api/lodges/{id}
#[utoipa::path(
    delete,
    path = "/api/lodges/{id}",
    tag = "Lodges",
    params(("id" = Uuid, Path, description = "Lodge id")),
    responses(
        (status = 204, description = "Lodge deleted"),
        (status = 403, description = "Super admins only"),
        (status = 404, description = "Lodge not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_lodge(
    State(app_state): State<AppState>,
    _guard: RequireRole<SuperAdminOnly>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<StatusCode, AppError> {
    app_state.lodge_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// GET /api/lodges/{id}/members
#[utoipa::path(
    get,
    path = "/api/lodges/{id}/members",
    tag = "Lodges",
    params(("id" = Uuid, Path, description = "Lodge id")),
    responses(
        (status = 200, description = "Members of the lodge", body = Vec<MemberView>),
        (status = 404, description = "Lodge not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn lodge_members(
    State(app_state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<Vec<MemberView>>, AppError> {
    let members = app_state.lodge_service.members_of(id).await?;
    Ok(Json(members.into_iter().map(MemberView::from).collect()))
}

// GET /api/lodges/{id}/positions
#[utoipa::path(
    get,
    path = "/api/lodges/{id}/positions",
    tag = "Lodges",
    params(("id" = Uuid, Path, description = "Lodge id")),
    responses(
        (status = 200, description = "Officer positions, current holders first", body = Vec<LodgePosition>),
        (status = 404, description = "Lodge not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn lodge_positions(
    State(app_state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<Vec<LodgePosition>>, AppError> {
    Ok(Json(app_state.lodge_service.positions(id).await?))
}

// PUT /api/lodges/{id}/positions
#[utoipa::path(
    put,
    path = "/api/lodges/{id}/positions",
    tag = "Lodges",
    params(("id" = Uuid, Path, description = "Lodge id")),
    request_body = AssignPositionPayload,
    responses(
        (status = 200, description = "Position assigned", body = LodgePosition),
        (status = 403, description = "Not an admin of this lodge"),
        (status = 404, description = "Lodge or member not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn assign_lodge_position(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(payload), _): WithRejection<Json<AssignPositionPayload>, AppError>,
) -> Result<Json<LodgePosition>, AppError> {
    payload.validate()?;
    if !LodgeService::can_manage(&caller, id) {
        return Err(AppError::forbidden("You cannot assign positions in this lodge"));
    }

    Ok(Json(app_state.lodge_service.assign_position(id, &payload).await?))
}
