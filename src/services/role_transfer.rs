// src/services/role_transfer.rs

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{Collection, UserDirectory},
    models::{
        member::{RoleChangeRequest, RoleChangeResponse, TransferDetails},
        user::{Role, UserRecord},
    },
    services::lodge_service::LodgeService,
};

const PLACEHOLDER_NAME: &str = "Unknown Member";

/// Changes a member's role and keeps the three user collections in step.
///
/// Every change holds the directory's role lock from the first read to the
/// last write, so two concurrent requests cannot both claim the same seat.
/// A person's copies may disagree on role; the guards look at all of them.
#[derive(Clone)]
pub struct RoleTransferService {
    users: UserDirectory,
    lodges: LodgeService,
}

fn same_person(a: &UserRecord, b: &UserRecord) -> bool {
    if a.id == b.id {
        return true;
    }
    match (a.normalized_email(), b.normalized_email()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// Rewrites `record` for `role`. `lodge` is the lodge a lodge admin is
/// scoped to; `district_lodge` is the district anchor, added for district
/// admins and taken away from anyone leaving that seat.
fn apply_role(record: &mut UserRecord, role: Role, lodge: Option<Uuid>, district_lodge: Option<Uuid>) {
    let was_district_admin = record.role == Role::DistrictAdmin;
    record.role = role;

    match role {
        Role::SuperAdmin => {}
        Role::DistrictAdmin => {
            if let Some(district) = district_lodge {
                record.add_administered_lodge(district);
                record.lodge_roles.insert(district, Role::DistrictAdmin);
            }
        }
        Role::LodgeAdmin => {
            if let Some(district) = district_lodge.filter(|d| was_district_admin && Some(*d) != lodge) {
                record.remove_administered_lodge(district);
            }
            if let Some(lodge) = lodge {
                record.add_administered_lodge(lodge);
                record.lodge_roles.insert(lodge, Role::LodgeAdmin);
            }
        }
        Role::LodgeMember => {
            record.administered_lodges.clear();
            record.lodge_roles.clear();
        }
    }
}

impl RoleTransferService {
    pub fn new(users: UserDirectory, lodges: LodgeService) -> Self {
        Self { users, lodges }
    }

    pub async fn change_role(
        &self,
        caller: &UserRecord,
        req: RoleChangeRequest,
    ) -> Result<RoleChangeResponse, AppError> {
        let _guard = self.users.lock_roles().await;

        // 1. Caller authority
        match caller.role {
            Role::SuperAdmin => {}
            Role::DistrictAdmin if req.new_role == Role::SuperAdmin => {
                return Err(AppError::forbidden("District admins cannot assign the super admin role"));
            }
            Role::DistrictAdmin => {}
            _ => return Err(AppError::forbidden("Only super admins and district admins can change roles")),
        }

        let (home, target) = self.users.locate_404(req.target_id).await?;
        let target_is_super = self.users.holds_role(&target, Role::SuperAdmin).await?;
        let target_is_district = self.users.holds_role(&target, Role::DistrictAdmin).await?;

        if caller.role == Role::DistrictAdmin && target_is_super {
            return Err(AppError::forbidden("District admins cannot modify a super admin"));
        }

        // 2. A district admin handing their own seat to someone else
        let is_self = same_person(&target, caller);
        if caller.role == Role::DistrictAdmin
            && is_self
            && target_is_district
            && req.new_role == Role::LodgeAdmin
        {
            return self.hand_off_district_seat(caller, home, target, req).await;
        }

        if caller.role == Role::DistrictAdmin
            && !is_self
            && target_is_district
            && req.new_role != Role::DistrictAdmin
        {
            return Err(AppError::forbidden("District admins cannot demote another district admin"));
        }

        if target_is_super
            && req.new_role != Role::SuperAdmin
            && self.users.count_people_with_role(Role::SuperAdmin).await? <= 1
        {
            return Err(AppError::LastSuperAdmin);
        }

        // 3. Free the seat, then take it
        let lodge_scope = match req.new_role {
            Role::LodgeAdmin => req.lodge_id.or_else(|| target.primary_lodge_id()),
            _ => None,
        };
        let district_lodge = self.lodges.district_lodge().await?.map(|l| l.id);

        self.vacate_seat(req.new_role, lodge_scope, &[&target]).await?;

        let previous_role = target.role;
        let mut updated = target;
        apply_role(&mut updated, req.new_role, lodge_scope, district_lodge);
        self.save_primary(home, &mut updated).await?;
        self.propagate(home, &updated, lodge_scope, district_lodge).await;

        tracing::info!(
            "Role of {} changed from {} to {} by {}",
            updated.id,
            previous_role,
            updated.role,
            caller.id
        );

        Ok(RoleChangeResponse {
            message: format!("Role updated to {}", updated.role),
            user: updated.into(),
            transfer_details: None,
        })
    }

    async fn hand_off_district_seat(
        &self,
        caller: &UserRecord,
        home: Collection,
        target: UserRecord,
        req: RoleChangeRequest,
    ) -> Result<RoleChangeResponse, AppError> {
        let (successor_home, successor) = self.pick_successor(caller, req.successor_id).await?;

        let lodge_scope = req.lodge_id.or_else(|| target.primary_lodge_id());
        let district_lodge = self.lodges.district_lodge().await?.map(|l| l.id);

        // Only the outgoing holder and the successor may hold the seat now.
        for (collection, mut record) in self.users.holders_of(Role::DistrictAdmin).await? {
            if same_person(&record, caller) || same_person(&record, &successor) {
                continue;
            }
            apply_role(&mut record, Role::LodgeMember, None, district_lodge);
            record.touch();
            self.users.save(collection, &record).await?;
            tracing::info!("Demoted district admin {} in {}", record.id, collection);
        }
        self.vacate_seat(Role::LodgeAdmin, lodge_scope, &[caller]).await?;

        let mut former = target;
        apply_role(&mut former, Role::LodgeAdmin, lodge_scope, district_lodge);
        self.save_primary(home, &mut former).await?;
        self.propagate(home, &former, lodge_scope, district_lodge).await;

        // Reload: freeing the lodge seat may have touched the successor.
        let mut successor = self
            .users
            .find_in(successor_home, successor.id)
            .await?
            .unwrap_or(successor);
        apply_role(&mut successor, Role::DistrictAdmin, None, district_lodge);
        self.save_primary(successor_home, &mut successor).await?;
        self.propagate(successor_home, &successor, None, district_lodge).await;

        tracing::info!("District admin seat handed from {} to {}", former.id, successor.id);

        Ok(RoleChangeResponse {
            message: "District admin role transferred".to_string(),
            transfer_details: Some(TransferDetails {
                from: former.id,
                to: successor.id,
            }),
            user: former.into(),
        })
    }

    /// The explicit successor when given, otherwise the first record that
    /// is neither an admin of the district or above nor the caller.
    async fn pick_successor(
        &self,
        caller: &UserRecord,
        successor_id: Option<Uuid>,
    ) -> Result<(Collection, UserRecord), AppError> {
        if let Some(id) = successor_id {
            let (collection, record) = self
                .users
                .locate(id)
                .await?
                .ok_or_else(|| AppError::not_found("Successor not found"))?;
            if same_person(&record, caller) {
                return Err(AppError::bad_request("The successor must be another member"));
            }
            if let Some(role) = self.senior_role_of(&record).await? {
                return Err(AppError::bad_request(format!(
                    "The successor already holds the {} role",
                    role
                )));
            }
            return Ok((collection, record));
        }

        for collection in Collection::USER_COLLECTIONS {
            for record in self.users.find_all_in(collection).await? {
                if same_person(&record, caller) {
                    continue;
                }
                if self.senior_role_of(&record).await?.is_none() {
                    return Ok((collection, record));
                }
            }
        }

        Err(AppError::bad_request(
            "No eligible member found to take over the district admin role",
        ))
    }

    /// `SUPER_ADMIN` or `DISTRICT_ADMIN` if any copy of `record` holds it.
    async fn senior_role_of(&self, record: &UserRecord) -> Result<Option<Role>, AppError> {
        for role in [Role::SuperAdmin, Role::DistrictAdmin] {
            if self.users.holds_role(record, role).await? {
                return Ok(Some(role));
            }
        }
        Ok(None)
    }

    /// Clears the seat `role` is about to fill, leaving `keep` untouched.
    async fn vacate_seat(&self, role: Role, lodge: Option<Uuid>, keep: &[&UserRecord]) -> Result<(), AppError> {
        let kept = |r: &UserRecord| keep.iter().any(|k| same_person(r, k));

        match role {
            Role::DistrictAdmin => {
                for (collection, mut record) in self.users.holders_of(Role::DistrictAdmin).await? {
                    if kept(&record) {
                        continue;
                    }
                    record.administered_lodges.clear();
                    record.lodge_roles.clear();
                    record.role = Role::LodgeMember;
                    record.touch();
                    self.users.save(collection, &record).await?;
                    tracing::info!("Demoted district admin {} in {}", record.id, collection);
                }
            }
            Role::LodgeAdmin => {
                let Some(lodge) = lodge else {
                    return Ok(());
                };

                let mut affected = self.users.administrators_of(lodge).await?;
                for (collection, record) in self.users.holders_of(Role::LodgeAdmin).await? {
                    let implicit = record.administered_lodges.is_empty() && record.primary_lodge_id() == Some(lodge);
                    let listed = affected.iter().any(|(c, r)| *c == collection && r.id == record.id);
                    if implicit && !listed {
                        affected.push((collection, record));
                    }
                }

                for (collection, mut record) in affected {
                    if kept(&record) {
                        continue;
                    }
                    record.remove_administered_lodge(lodge);
                    let demoted = record.role == Role::LodgeAdmin && record.administered_lodges.is_empty();
                    if demoted {
                        record.role = Role::LodgeMember;
                    }
                    record.touch();
                    self.users.save(collection, &record).await?;
                    if demoted {
                        tracing::info!("Demoted lodge admin {} of lodge {} in {}", record.id, lodge, collection);
                    } else {
                        tracing::info!("Removed lodge {} from {} in {}", lodge, record.id, collection);
                    }
                }
            }
            Role::SuperAdmin | Role::LodgeMember => {}
        }
        Ok(())
    }

    async fn save_primary(&self, collection: Collection, record: &mut UserRecord) -> Result<(), AppError> {
        record.touch();
        let saved = self
            .users
            .save(collection, record)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to update role of {}: {}", record.id, e))?;
        if !saved {
            return Err(anyhow::anyhow!("Member {} vanished from {} during the update", record.id, collection).into());
        }
        Ok(())
    }

    /// Mirrors an applied role onto the person's other copies. Nothing here
    /// fails the request; problems are logged.
    async fn propagate(
        &self,
        home: Collection,
        updated: &UserRecord,
        lodge: Option<Uuid>,
        district_lodge: Option<Uuid>,
    ) {
        let role = updated.role;
        let copies = match self.users.copies_of(updated).await {
            Ok(copies) => copies,
            Err(e) => {
                tracing::warn!("Could not look up other copies of {}: {}", updated.id, e);
                return;
            }
        };

        for (collection, mut copy) in copies.iter().filter(|(c, _)| *c != home).cloned() {
            apply_role(&mut copy, role, lodge, district_lodge);
            copy.touch();
            if let Err(e) = self.users.save(collection, &copy).await {
                tracing::warn!("Could not sync role of {} into {}: {}", updated.id, collection, e);
            }
        }

        let users_copy = copies.iter().find(|(c, _)| *c == Collection::Users);

        if role.is_admin() && users_copy.is_none() {
            let mut account = updated.clone();
            if account.display_name().is_none() {
                account.name = Some(PLACEHOLDER_NAME.to_string());
            }
            if account.normalized_email().is_none() {
                account.email = Some(format!("member-{}@placeholder.invalid", account.id));
            }
            match self.users.insert(Collection::Users, &account).await {
                Ok(()) => tracing::info!("Created users record for admin {}", account.id),
                Err(e) => tracing::warn!("Could not create users record for {}: {}", account.id, e),
            }
        }

        // Plain members keep no `users` account, unless it is their only copy.
        if role == Role::LodgeMember && copies.len() > 1 {
            if let Some((_, account)) = users_copy {
                match self.users.delete(Collection::Users, account.id).await {
                    Ok(_) => tracing::info!("Removed users record of demoted member {}", account.id),
                    Err(e) => tracing::warn!("Could not remove users record of {}: {}", account.id, e),
                }
            }
        }
    }
}
