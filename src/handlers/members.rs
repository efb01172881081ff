// src/handlers/members.rs

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
        rbac::{DistrictAdmins, LodgeStaff, RequireRole},
    },
    models::{
        member::{
            ChangeRolePayload, CreateMemberPayload, MemberListQuery, MemberStatusPayload, RoleChangeRequest,
            RoleChangeResponse, UpdateMemberPayload,
        },
        user::{MemberView, Role},
    },
    services::{lodge_service::LodgeService, member_service::MemberService},
};

// GET /api/members
#[utoipa::path(
    get,
    path = "/api/members",
    tag = "Members",
    params(MemberListQuery),
    responses(
        (status = 200, description = "One page of members", body = Paginated<MemberView>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_members(
    State(app_state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<MemberListQuery>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let page = app_state.member_service.list(&query).await?;
    Ok(Json(page))
}

// POST /api/members
#[utoipa::path(
    post,
    path = "/api/members",
    tag = "Members",
    request_body = CreateMemberPayload,
    responses(
        (status = 201, description = "Member created", body = MemberView),
        (status = 403, description = "Not allowed for this lodge"),
        (status = 409, description = "Email already in use")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_member(
    State(app_state): State<AppState>,
    _guard: RequireRole<LodgeStaff>,
    AuthenticatedUser(caller): AuthenticatedUser,
    WithRejection(Json(payload), _): WithRejection<Json<CreateMemberPayload>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    // Lodge admins may only add members to a lodge they run.
    if caller.role == Role::LodgeAdmin
        && !payload
            .primary_lodge
            .is_some_and(|lodge| LodgeService::can_manage(&caller, lodge))
    {
        return Err(AppError::forbidden("Lodge admins can only add members to their own lodge"));
    }

    let member = app_state.member_service.create(&payload).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

// GET /api/members/{id}
#[utoipa::path(
    get,
    path = "/api/members/{id}",
    tag = "Members",
    params(("id" = Uuid, Path, description = "Member id")),
    responses(
        (status = 200, description = "The member", body = MemberView),
        (status = 404, description = "Member not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_member(
    State(app_state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<MemberView>, AppError> {
    let member = app_state.member_service.get(id).await?;
    Ok(Json(member.into()))
}

// PUT /api/members/{id}
#[utoipa::path(
    put,
    path = "/api/members/{id}",
    tag = "Members",
    params(("id" = Uuid, Path, description = "Member id")),
    request_body = UpdateMemberPayload,
    responses(
        (status = 200, description = "Profile updated", body = MemberView),
        (status = 403, description = "Not allowed to edit this member"),
        (status = 404, description = "Member not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_member(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(payload), _): WithRejection<Json<UpdateMemberPayload>, AppError>,
) -> Result<Json<MemberView>, AppError> {
    payload.validate()?;

    let target = app_state.member_service.get(id).await?;
    if !MemberService::can_edit(&caller, &target) {
        return Err(AppError::forbidden("You cannot edit this member"));
    }

    let member = app_state.member_service.update(id, &payload).await?;
    Ok(Json(member))
}

// DELETE /api/members/{id}
#[utoipa::path(
    delete,
    path = "/api/members/{id}",
    tag = "Members",
    params(("id" = Uuid, Path, description = "Member id")),
    responses(
        (status = 204, description = "Member removed from every collection"),
        (status = 400, description = "Last super admin or own account"),
        (status = 403, description = "Not allowed"),
        (status = 404, description = "Member not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_member(
    State(app_state): State<AppState>,
    _guard: RequireRole<DistrictAdmins>,
    AuthenticatedUser(caller): AuthenticatedUser,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<StatusCode, AppError> {
    app_state.member_service.delete(&caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// PUT /api/members/{id}/role
#[utoipa::path(
    put,
    path = "/api/members/{id}/role",
    tag = "Members",
    params(("id" = Uuid, Path, description = "Member whose role changes")),
    request_body = ChangeRolePayload,
    responses(
        (status = 200, description = "Role changed", body = RoleChangeResponse),
        (status = 400, description = "Invalid role, last super admin, or no eligible successor"),
        (status = 403, description = "Caller may not make this change"),
        (status = 404, description = "Member not found"),
        (status = 500, description = "Primary record could not be written")
    ),
    security(("api_jwt" = []))
)]
pub async fn change_member_role(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(payload), _): WithRejection<Json<ChangeRolePayload>, AppError>,
) -> Result<Json<RoleChangeResponse>, AppError> {
    let new_role = payload
        .role
        .as_deref()
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| AppError::bad_request("Role is required"))?
        .parse::<Role>()
        .map_err(AppError::BadRequest)?;

    let request = RoleChangeRequest {
        target_id: id,
        new_role,
        lodge_id: payload.lodge_id,
        successor_id: payload.successor_id,
    };

    let response = app_state.role_service.change_role(&caller, request).await?;
    Ok(Json(response))
}

// PUT /api/members/{id}/status
#[utoipa::path(
    put,
    path = "/api/members/{id}/status",
    tag = "Members",
    params(("id" = Uuid, Path, description = "Member id")),
    request_body = MemberStatusPayload,
    responses(
        (status = 200, description = "Status updated", body = MemberView),
        (status = 403, description = "Not allowed"),
        (status = 404, description = "Member not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn set_member_status(
    State(app_state): State<AppState>,
    _guard: RequireRole<LodgeStaff>,
    AuthenticatedUser(caller): AuthenticatedUser,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(payload), _): WithRejection<Json<MemberStatusPayload>, AppError>,
) -> Result<Json<MemberView>, AppError> {
    let target = app_state.member_service.get(id).await?;
    if target.id == caller.id || !MemberService::can_edit(&caller, &target) {
        return Err(AppError::forbidden("You cannot change the status of this member"));
    }

    let member = app_state.member_service.set_status(id, payload.status).await?;
    Ok(Json(member))
}

// GET /api/admins/district
#[utoipa::path(
    get,
    path = "/api/admins/district",
    tag = "Members",
    responses(
        (status = 200, description = "Current district admin(s)", body = Vec<MemberView>)
    ),
    security(("api_jwt" = []))
)]
pub async fn district_admins(State(app_state): State<AppState>) -> Result<Json<Vec<MemberView>>, AppError> {
    let admins = app_state.member_service.district_admins().await?;
    Ok(Json(admins))
}
