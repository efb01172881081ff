// src/services/member_service.rs

use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        pagination::{matches_search, Paginated},
    },
    db::{Collection, UserDirectory},
    models::{
        member::{CreateMemberPayload, MemberListQuery, UpdateMemberPayload},
        user::{LodgeRef, MemberStatus, MemberView, Role, UserRecord},
    },
    services::{auth::AuthService, lodge_service::LodgeService},
};

#[derive(Clone)]
pub struct MemberService {
    users: UserDirectory,
    auth_service: AuthService,
}

impl MemberService {
    pub fn new(users: UserDirectory, auth_service: AuthService) -> Self {
        Self { users, auth_service }
    }

    /// Whether `caller` may edit `target`'s profile: themselves, district
    /// level admins, and the admin of the member's primary lodge.
    pub fn can_edit(caller: &UserRecord, target: &UserRecord) -> bool {
        if caller.id == target.id {
            return true;
        }
        match caller.role {
            Role::SuperAdmin | Role::DistrictAdmin => true,
            Role::LodgeAdmin => {
                target.role == Role::LodgeMember
                    && target
                        .primary_lodge_id()
                        .is_some_and(|lodge| LodgeService::can_manage(caller, lodge))
            }
            Role::LodgeMember => false,
        }
    }

    pub async fn list(&self, query: &MemberListQuery) -> Result<Paginated<MemberView>, AppError> {
        let mut members: Vec<UserRecord> = self
            .users
            .merged()
            .await?
            .into_iter()
            .filter(|m| query.role.is_none_or(|role| m.role == role))
            .filter(|m| query.status.is_none_or(|status| m.status == status))
            .filter(|m| query.lodge.is_none_or(|lodge| m.belongs_to_lodge(lodge) || m.administers(lodge)))
            .filter(|m| match query.search.as_deref() {
                Some(search) => {
                    let name = m.display_name();
                    matches_search(search, &[name.as_deref(), m.email.as_deref()])
                }
                None => true,
            })
            .collect();
        members.sort_by_key(|m| m.display_name().unwrap_or_default().to_lowercase());

        Ok(Paginated::from_vec(members, query.page, query.limit).map(MemberView::from))
    }

    pub async fn get(&self, id: Uuid) -> Result<UserRecord, AppError> {
        self.users
            .find_person(id)
            .await?
            .ok_or_else(|| AppError::not_found("Member not found"))
    }

    /// Current holders of the district admin seat. Normally one.
    pub async fn district_admins(&self) -> Result<Vec<MemberView>, AppError> {
        Ok(self
            .users
            .merged()
            .await?
            .into_iter()
            .filter(|m| m.role == Role::DistrictAdmin)
            .map(MemberView::from)
            .collect())
    }

    /// New members land in `unifiedusers` as plain members.
    pub async fn create(&self, payload: &CreateMemberPayload) -> Result<MemberView, AppError> {
        if self.users.email_taken(&payload.email).await? {
            return Err(AppError::EmailAlreadyExists);
        }

        let mut record = UserRecord::new(Uuid::new_v4());
        record.first_name = Some(payload.first_name.trim().to_string());
        record.last_name = Some(payload.last_name.trim().to_string());
        record.email = Some(payload.email.trim().to_lowercase());
        record.role = Role::LodgeMember;
        record.status = payload.status.unwrap_or(MemberStatus::Active);
        record.lodges = payload.lodges.clone();
        if let Some(lodge) = payload.primary_lodge {
            record.primary_lodge = Some(LodgeRef::Id(lodge));
            if !record.lodges.contains(&lodge) {
                record.lodges.insert(0, lodge);
            }
        }
        record.occupation = payload.occupation.clone();
        record.address = payload.address.clone();
        record.bio = payload.bio.clone();
        record.phone = payload.phone.clone();
        record.profile_image = payload.profile_image.clone();
        if let Some(password) = &payload.password {
            record.password_hash = Some(self.auth_service.hash_password(password).await?);
        }

        self.users.insert(Collection::UnifiedUsers, &record).await?;
        tracing::info!("Member {} created", record.id);
        Ok(record.into())
    }

    pub async fn update(&self, id: Uuid, payload: &UpdateMemberPayload) -> Result<MemberView, AppError> {
        let person = self.get(id).await?;

        let new_email = payload.email.as_deref().map(|e| e.trim().to_lowercase());
        if let Some(email) = new_email.as_deref() {
            if person.normalized_email().as_deref() != Some(email) {
                if let Some((_, other)) = self.users.find_by_email(email).await? {
                    if other.id != person.id {
                        return Err(AppError::EmailAlreadyExists);
                    }
                }
            }
        }

        self.users
            .update_everywhere(&person, |r| {
                if let Some(name) = &payload.name {
                    r.name = Some(name.trim().to_string());
                }
                if let Some(first) = &payload.first_name {
                    r.first_name = Some(first.trim().to_string());
                }
                if let Some(last) = &payload.last_name {
                    r.last_name = Some(last.trim().to_string());
                }
                if let Some(email) = &new_email {
                    r.email = Some(email.clone());
                }
                if let Some(lodge) = payload.primary_lodge {
                    r.primary_lodge = Some(LodgeRef::Id(lodge));
                    if !r.lodges.contains(&lodge) {
                        r.lodges.push(lodge);
                    }
                }
                if let Some(lodges) = &payload.lodges {
                    r.lodges = lodges.clone();
                }
                if payload.occupation.is_some() {
                    r.occupation = payload.occupation.clone();
                }
                if payload.address.is_some() {
                    r.address = payload.address.clone();
                }
                if payload.bio.is_some() {
                    r.bio = payload.bio.clone();
                }
                if payload.phone.is_some() {
                    r.phone = payload.phone.clone();
                }
                if payload.profile_image.is_some() {
                    r.profile_image = payload.profile_image.clone();
                }
            })
            .await?;

        Ok(self.get(id).await?.into())
    }

    pub async fn set_status(&self, id: Uuid, status: MemberStatus) -> Result<MemberView, AppError> {
        let _guard = self.users.lock_roles().await;

        let person = self.get(id).await?;
        if status != MemberStatus::Active
            && self.users.holds_role(&person, Role::SuperAdmin).await?
            && self.users.count_people_with_role(Role::SuperAdmin).await? <= 1
        {
            return Err(AppError::LastSuperAdmin);
        }

        self.users.update_everywhere(&person, |r| r.status = status).await?;
        tracing::info!("Status of member {} set to {:?}", id, status);
        Ok(self.get(id).await?.into())
    }

    /// Removes the person from all three collections.
    pub async fn delete(&self, caller: &UserRecord, id: Uuid) -> Result<(), AppError> {
        let _guard = self.users.lock_roles().await;

        let person = self.get(id).await?;
        if person.id == caller.id {
            return Err(AppError::bad_request("You cannot delete your own account"));
        }
        let is_super = self.users.holds_role(&person, Role::SuperAdmin).await?;
        if caller.role == Role::DistrictAdmin && is_super {
            return Err(AppError::forbidden("District admins cannot modify a super admin"));
        }
        if is_super && self.users.count_people_with_role(Role::SuperAdmin).await? <= 1 {
            return Err(AppError::LastSuperAdmin);
        }

        let removed = self.users.delete_everywhere(&person).await?;
        tracing::info!("Member {} deleted ({} copies)", id, removed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDocumentStore;
    use std::sync::Arc;
    use std::time::Duration;

    fn service() -> (MemberService, UserDirectory) {
        let users = UserDirectory::new(Arc::new(MemoryDocumentStore::new()));
        let auth = AuthService::new(users.clone(), "secret".into(), 1, 4);
        (MemberService::new(users.clone(), auth), users)
    }

    fn payload(first: &str, email: &str) -> CreateMemberPayload {
        CreateMemberPayload {
            first_name: first.to_string(),
            last_name: "Haddad".to_string(),
            email: email.to_string(),
            password: None,
            primary_lodge: None,
            lodges: vec![],
            status: None,
            occupation: None,
            address: None,
            bio: None,
            phone: None,
            profile_image: None,
        }
    }

    #[tokio::test]
    async fn lists_the_merged_view_with_filters() {
        let (members, users) = service();
        let lodge = Uuid::new_v4();

        let mut legacy = UserRecord::new(Uuid::new_v4());
        legacy.name = Some("Old Copy".into());
        legacy.email = Some("nadim@example.org".into());
        legacy.primary_lodge = Some(LodgeRef::Id(lodge));
        users.insert(Collection::Members, &legacy).await.unwrap();

        let mut unified = legacy.clone();
        unified.name = Some("Nadim Haddad".into());
        users.insert(Collection::UnifiedUsers, &unified).await.unwrap();

        members.create(&payload("Zeina", "zeina@example.org")).await.unwrap();

        let all = members.list(&MemberListQuery::default()).await.unwrap();
        assert_eq!(all.total, 2);
        assert_eq!(all.items[0].name.as_deref(), Some("Nadim Haddad"));

        let by_lodge = MemberListQuery {
            lodge: Some(lodge),
            ..Default::default()
        };
        assert_eq!(members.list(&by_lodge).await.unwrap().total, 1);

        let by_search = MemberListQuery {
            search: Some("zein".into()),
            ..Default::default()
        };
        assert_eq!(members.list(&by_search).await.unwrap().items[0].email.as_deref(), Some("zeina@example.org"));
    }

    #[tokio::test]
    async fn updates_reach_every_copy() {
        let (members, users) = service();
        let mut record = UserRecord::new(Uuid::new_v4());
        record.email = Some("maya@example.org".into());
        for c in Collection::USER_COLLECTIONS {
            users.insert(c, &record).await.unwrap();
        }

        let update = UpdateMemberPayload {
            occupation: Some("Engineer".into()),
            ..Default::default()
        };
        members.update(record.id, &update).await.unwrap();
        for c in Collection::USER_COLLECTIONS {
            let copy = users.find_in(c, record.id).await.unwrap().unwrap();
            assert_eq!(copy.occupation.as_deref(), Some("Engineer"));
        }

        members.create(&payload("Taken", "taken@example.org")).await.unwrap();
        let clash = UpdateMemberPayload {
            email: Some("TAKEN@example.org".into()),
            ..Default::default()
        };
        assert!(matches!(members.update(record.id, &clash).await, Err(AppError::EmailAlreadyExists)));
    }

    #[tokio::test]
    async fn protects_the_last_super_admin() {
        let (members, users) = service();
        let mut root = UserRecord::new(Uuid::new_v4());
        root.role = Role::SuperAdmin;
        users.insert(Collection::Users, &root).await.unwrap();
        let mut other = UserRecord::new(Uuid::new_v4());
        other.role = Role::DistrictAdmin;
        users.insert(Collection::Users, &other).await.unwrap();

        assert!(matches!(
            members.set_status(root.id, MemberStatus::Inactive).await,
            Err(AppError::LastSuperAdmin)
        ));
        assert!(matches!(members.delete(&other, root.id).await, Err(AppError::Forbidden(_))));
        assert!(matches!(members.delete(&root, root.id).await, Err(AppError::BadRequest(_))));

        members.delete(&root, other.id).await.unwrap();
        assert!(users.locate(other.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn super_admin_checks_see_every_copy() {
        let (members, users) = service();
        let mut root = UserRecord::new(Uuid::new_v4());
        root.email = Some("root@example.org".into());
        root.role = Role::SuperAdmin;
        users.insert(Collection::Users, &root).await.unwrap();
        let mut stale = root.clone();
        stale.role = Role::LodgeMember;
        users.insert(Collection::UnifiedUsers, &stale).await.unwrap();

        let mut district = UserRecord::new(Uuid::new_v4());
        district.role = Role::DistrictAdmin;
        users.insert(Collection::Users, &district).await.unwrap();
        let mut second = UserRecord::new(Uuid::new_v4());
        second.role = Role::SuperAdmin;
        users.insert(Collection::Members, &second).await.unwrap();

        // The merged view prefers the stale `unifiedusers` copy.
        assert_eq!(members.get(root.id).await.unwrap().role, Role::LodgeMember);
        assert!(matches!(members.delete(&district, root.id).await, Err(AppError::Forbidden(_))));

        members.delete(&root, second.id).await.unwrap();
        assert!(matches!(
            members.set_status(root.id, MemberStatus::Inactive).await,
            Err(AppError::LastSuperAdmin)
        ));
        assert!(matches!(members.delete(&second, root.id).await, Err(AppError::LastSuperAdmin)));
        assert!(users.find_in(Collection::Users, root.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn deletion_waits_for_the_role_lock() {
        let (members, users) = service();
        let mut root = UserRecord::new(Uuid::new_v4());
        root.role = Role::SuperAdmin;
        users.insert(Collection::Users, &root).await.unwrap();
        let mut other = UserRecord::new(Uuid::new_v4());
        other.role = Role::SuperAdmin;
        users.insert(Collection::Users, &other).await.unwrap();

        let guard = users.lock_roles().await;
        let blocked = tokio::time::timeout(Duration::from_millis(50), members.delete(&root, other.id)).await;
        assert!(blocked.is_err());
        assert!(users.locate(other.id).await.unwrap().is_some());

        drop(guard);
        members.delete(&root, other.id).await.unwrap();
        assert!(users.locate(other.id).await.unwrap().is_none());
    }

    #[test]
    fn edit_rights() {
        let lodge = Uuid::new_v4();
        let mut admin = UserRecord::new(Uuid::new_v4());
        admin.role = Role::LodgeAdmin;
        admin.add_administered_lodge(lodge);

        let mut member = UserRecord::new(Uuid::new_v4());
        member.primary_lodge = Some(LodgeRef::Id(lodge));
        assert!(MemberService::can_edit(&admin, &member));
        assert!(MemberService::can_edit(&member, &member));
        assert!(!MemberService::can_edit(&member, &admin));

        member.primary_lodge = Some(LodgeRef::Id(Uuid::new_v4()));
        assert!(!MemberService::can_edit(&admin, &member));
    }
}
