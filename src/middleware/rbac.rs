// src/middleware/rbac.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;

use crate::{common::error::AppError, middleware::auth::AuthenticatedUser, models::user::Role};

/// 1. Which roles a guard lets through
pub trait RoleGuard: Send + Sync + 'static {
    fn allows(role: Role) -> bool;
    fn denial() -> &'static str;
}

/// 2. The extractor. Rejects with 403 before the handler body runs.
pub struct RequireRole<T>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequireRole<T>
where
    T: RoleGuard,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .ok_or(AppError::InvalidToken)?;

        if !T::allows(user.0.role) {
            return Err(AppError::forbidden(T::denial()));
        }

        Ok(RequireRole(PhantomData))
    }
}

// ---
// Guards
// ---

pub struct SuperAdminOnly;
impl RoleGuard for SuperAdminOnly {
    fn allows(role: Role) -> bool {
        role == Role::SuperAdmin
    }
    fn denial() -> &'static str {
        "Only super admins can perform this action"
    }
}

/// Super admins and district admins.
pub struct DistrictAdmins;
impl RoleGuard for DistrictAdmins {
    fn allows(role: Role) -> bool {
        matches!(role, Role::SuperAdmin | Role::DistrictAdmin)
    }
    fn denial() -> &'static str {
        "Only super admins and district admins can perform this action"
    }
}

/// Anyone holding an admin role.
pub struct LodgeStaff;
impl RoleGuard for LodgeStaff {
    fn allows(role: Role) -> bool {
        role.is_admin()
    }
    fn denial() -> &'static str {
        "Only administrators can perform this action"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::UserRecord;
    use axum::http::Request;
    use uuid::Uuid;

    async fn run<T: RoleGuard>(role: Option<Role>) -> Result<(), AppError> {
        let (mut parts, _) = Request::new(()).into_parts();
        if let Some(role) = role {
            let mut user = UserRecord::new(Uuid::new_v4());
            user.role = role;
            parts.extensions.insert(AuthenticatedUser(user));
        }
        RequireRole::<T>::from_request_parts(&mut parts, &()).await.map(|_| ())
    }

    #[tokio::test]
    async fn guards_by_role() {
        assert!(run::<DistrictAdmins>(Some(Role::DistrictAdmin)).await.is_ok());
        assert!(matches!(
            run::<DistrictAdmins>(Some(Role::LodgeAdmin)).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(run::<LodgeStaff>(Some(Role::LodgeAdmin)).await.is_ok());
        assert!(run::<SuperAdminOnly>(Some(Role::DistrictAdmin)).await.is_err());
        assert!(matches!(run::<LodgeStaff>(None).await, Err(AppError::InvalidToken)));
    }
}
