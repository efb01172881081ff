// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{Collection, UserDirectory},
    models::{
        auth::{Claims, RegisterUserPayload},
        user::{LodgeRef, MemberStatus, Role, UserRecord},
    },
};

#[derive(Clone)]
pub struct AuthService {
    users: UserDirectory,
    jwt_secret: String,
    ttl_hours: i64,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(users: UserDirectory, jwt_secret: String, ttl_hours: i64, bcrypt_cost: u32) -> Self {
        Self {
            users,
            jwt_secret,
            ttl_hours,
            bcrypt_cost,
        }
    }

    /// Self-service sign-up. The account starts `pending` until an admin
    /// activates it.
    pub async fn register_user(&self, payload: &RegisterUserPayload) -> Result<(String, UserRecord), AppError> {
        if self.users.email_taken(&payload.email).await? {
            return Err(AppError::EmailAlreadyExists);
        }

        let hashed_password = self.hash_password(&payload.password).await?;

        let mut record = UserRecord::new(Uuid::new_v4());
        record.first_name = Some(payload.first_name.trim().to_string());
        record.last_name = Some(payload.last_name.trim().to_string());
        record.email = Some(payload.email.trim().to_lowercase());
        record.password_hash = Some(hashed_password);
        record.role = Role::LodgeMember;
        record.status = MemberStatus::Pending;
        if let Some(lodge) = payload.primary_lodge {
            record.primary_lodge = Some(LodgeRef::Id(lodge));
            record.lodges.push(lodge);
        }

        self.users.insert(Collection::UnifiedUsers, &record).await?;
        tracing::info!("New registration {} ({})", record.id, payload.email);

        let token = self.create_token(&record)?;
        Ok((token, record))
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<(String, UserRecord), AppError> {
        let (_, account) = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_hash = account
            .password_hash
            .clone()
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let is_password_valid = tokio::task::spawn_blocking(move || verify(&password_clone, &password_hash))
            .await
            .map_err(|e| anyhow::anyhow!("Password verification task failed: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        // The role that counts is the one on the consolidated record.
        let person = self.users.find_person(account.id).await?.unwrap_or(account);
        if person.status == MemberStatus::Inactive {
            return Err(AppError::AccountInactive);
        }

        let token = self.create_token(&person)?;
        Ok((token, person))
    }

    /// Decodes the token and loads the caller's current record, so a role
    /// change takes effect on the next request.
    pub async fn validate_token(&self, token: &str) -> Result<UserRecord, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;

        let user = self
            .users
            .find_person(token_data.claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)?;

        if user.status == MemberStatus::Inactive {
            return Err(AppError::AccountInactive);
        }
        Ok(user)
    }

    pub fn create_token(&self, user: &UserRecord) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::hours(self.ttl_hours);

        let claims = Claims {
            sub: user.id,
            role: user.role,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }

    pub async fn hash_password(&self, password: &str) -> Result<String, AppError> {
        let password_clone = password.to_owned();
        let cost = self.bcrypt_cost;
        let hashed = tokio::task::spawn_blocking(move || hash(&password_clone, cost))
            .await
            .map_err(|e| anyhow::anyhow!("Password hashing task failed: {}", e))??;
        Ok(hashed)
    }

    /// Creates a super admin in `users` and `unifiedusers` when none exists.
    /// Returns `true` if an account was created.
    pub async fn seed_super_admin(&self, email: &str, password: &str) -> Result<bool, AppError> {
        if self.users.count_people_with_role(Role::SuperAdmin).await? > 0 {
            return Ok(false);
        }
        if self.users.email_taken(email).await? {
            tracing::warn!("Seed admin {} already exists without SUPER_ADMIN; leaving it alone", email);
            return Ok(false);
        }

        let mut record = UserRecord::new(Uuid::new_v4());
        record.name = Some("Super Admin".to_string());
        record.email = Some(email.trim().to_lowercase());
        record.password_hash = Some(self.hash_password(password).await?);
        record.role = Role::SuperAdmin;
        record.status = MemberStatus::Active;

        self.users.insert(Collection::Users, &record).await?;
        self.users.insert(Collection::UnifiedUsers, &record).await?;
        tracing::info!("🔑 Seeded super admin {}", email);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDocumentStore;
    use std::sync::Arc;

    fn service() -> (AuthService, UserDirectory) {
        let users = UserDirectory::new(Arc::new(MemoryDocumentStore::new()));
        (AuthService::new(users.clone(), "test-secret".into(), 1, 4), users)
    }

    fn registration(email: &str) -> RegisterUserPayload {
        RegisterUserPayload {
            email: email.to_string(),
            password: "s3cret-pass".to_string(),
            first_name: "Rami".to_string(),
            last_name: "Khoury".to_string(),
            primary_lodge: None,
        }
    }

    #[tokio::test]
    async fn register_then_login() {
        let (auth, _) = service();
        let (_, created) = auth.register_user(&registration("rami@example.org")).await.unwrap();
        assert_eq!(created.status, MemberStatus::Pending);

        let (token, user) = auth.login_user("RAMI@example.org", "s3cret-pass").await.unwrap();
        assert_eq!(user.id, created.id);
        assert_eq!(auth.validate_token(&token).await.unwrap().id, created.id);
    }

    #[tokio::test]
    async fn rejects_duplicate_email_and_bad_password() {
        let (auth, _) = service();
        auth.register_user(&registration("dup@example.org")).await.unwrap();

        assert!(matches!(
            auth.register_user(&registration("dup@example.org")).await,
            Err(AppError::EmailAlreadyExists)
        ));
        assert!(matches!(
            auth.login_user("dup@example.org", "wrong-pass").await,
            Err(AppError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn garbage_token_is_invalid() {
        let (auth, _) = service();
        assert!(matches!(
            auth.validate_token("not.a.jwt").await,
            Err(AppError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn seeds_only_once() {
        let (auth, users) = service();
        assert!(auth.seed_super_admin("root@example.org", "rootpass").await.unwrap());
        assert!(!auth.seed_super_admin("other@example.org", "rootpass").await.unwrap());
        assert_eq!(users.count_people_with_role(Role::SuperAdmin).await.unwrap(), 1);
    }
}
