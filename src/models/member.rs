// src/models/member.rs

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::models::user::{MemberStatus, MemberView, Role};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateMemberPayload {
    #[validate(length(min = 1, message = "First name is required."))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required."))]
    pub last_name: String,
    #[validate(email(message = "Invalid email address."))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must have at least 6 characters."))]
    pub password: Option<String>,
    pub primary_lodge: Option<Uuid>,
    #[serde(default)]
    pub lodges: Vec<Uuid>,
    pub status: Option<MemberStatus>,
    pub occupation: Option<String>,
    pub address: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub profile_image: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberPayload {
    #[validate(length(min = 1, message = "Name cannot be empty."))]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "First name cannot be empty."))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, message = "Last name cannot be empty."))]
    pub last_name: Option<String>,
    #[validate(email(message = "Invalid email address."))]
    pub email: Option<String>,
    pub primary_lodge: Option<Uuid>,
    pub lodges: Option<Vec<Uuid>>,
    pub occupation: Option<String>,
    pub address: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub profile_image: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct MemberListQuery {
    /// Matches name and email.
    pub search: Option<String>,
    pub role: Option<Role>,
    pub status: Option<MemberStatus>,
    pub lodge: Option<Uuid>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MemberStatusPayload {
    pub status: MemberStatus,
}

/// Body of `PUT /api/members/{id}/role`. `role` stays a string so that an
/// unknown value is reported as a 400 with a readable message.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRolePayload {
    #[schema(example = "LODGE_ADMIN")]
    pub role: Option<String>,
    pub lodge_id: Option<Uuid>,
    /// Who takes over when a district admin hands off their own seat.
    pub successor_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransferDetails {
    pub from: Uuid,
    pub to: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoleChangeResponse {
    pub message: String,
    pub user: MemberView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_details: Option<TransferDetails>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleChangeRequest {
    pub target_id: Uuid,
    pub new_role: Role,
    pub lodge_id: Option<Uuid>,
    pub successor_id: Option<Uuid>,
}
