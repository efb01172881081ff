// src/services/lodge_service.rs

use chrono::Utc;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        pagination::{matches_search, Paginated},
    },
    db::{LodgeRepository, UserDirectory},
    models::{
        lodge::{AssignPositionPayload, CreateLodgePayload, Lodge, LodgeListQuery, LodgePosition, UpdateLodgePayload},
        user::{LodgeMembership, LodgeRef, Role, UserRecord},
    },
};

#[derive(Clone)]
pub struct LodgeService {
    lodges: LodgeRepository,
    users: UserDirectory,
    district_lodge_name: String,
}

impl LodgeService {
    pub fn new(lodges: LodgeRepository, users: UserDirectory, district_lodge_name: String) -> Self {
        Self {
            lodges,
            users,
            district_lodge_name,
        }
    }

    /// Whether `user` may edit the lodge or act on its behalf.
    pub fn can_manage(user: &UserRecord, lodge_id: Uuid) -> bool {
        match user.role {
            Role::SuperAdmin | Role::DistrictAdmin => true,
            Role::LodgeAdmin => {
                user.administers(lodge_id)
                    || (user.administered_lodges.is_empty() && user.primary_lodge_id() == Some(lodge_id))
            }
            Role::LodgeMember => false,
        }
    }

    pub async fn list(&self, query: &LodgeListQuery) -> Result<Paginated<Lodge>, AppError> {
        let mut lodges: Vec<Lodge> = self
            .lodges
            .find_all()
            .await?
            .into_iter()
            .filter(|l| query.active.is_none_or(|active| l.is_active == active))
            .filter(|l| match query.search.as_deref() {
                Some(search) => matches_search(search, &[Some(&l.name), l.location.as_deref()]),
                None => true,
            })
            .collect();
        lodges.sort_by_key(|l| l.name.to_lowercase());

        Ok(Paginated::from_vec(lodges, query.page, query.limit))
    }

    pub async fn get(&self, id: Uuid) -> Result<Lodge, AppError> {
        self.lodges.find_404(id, "Lodge").await
    }

    /// The lodge whose name matches the configured district lodge, if any.
    pub async fn district_lodge(&self) -> Result<Option<Lodge>, AppError> {
        self.find_by_name(&self.district_lodge_name).await
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Lodge>, AppError> {
        let wanted = name.trim().to_lowercase();
        Ok(self
            .lodges
            .find_all()
            .await?
            .into_iter()
            .find(|l| l.name.trim().to_lowercase() == wanted))
    }

    pub async fn create(&self, payload: &CreateLodgePayload) -> Result<Lodge, AppError> {
        if self.find_by_name(&payload.name).await?.is_some() {
            return Err(AppError::bad_request("A lodge with this name already exists"));
        }

        let now = Utc::now();
        let lodge = Lodge {
            id: Uuid::new_v4(),
            name: payload.name.trim().to_string(),
            location: payload.location.clone(),
            coordinates: payload.coordinates,
            founded_year: payload.founded_year,
            description: payload.description.clone(),
            logo_image: payload.logo_image.clone(),
            background_image: payload.background_image.clone(),
            is_active: payload.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        };

        self.lodges.insert(&lodge).await?;
        tracing::info!("Lodge '{}' created ({})", lodge.name, lodge.id);
        Ok(lodge)
    }

    pub async fn update(&self, id: Uuid, payload: &UpdateLodgePayload) -> Result<Lodge, AppError> {
        let mut lodge = self.get(id).await?;

        if let Some(name) = &payload.name {
            if let Some(other) = self.find_by_name(name).await? {
                if other.id != id {
                    return Err(AppError::bad_request("A lodge with this name already exists"));
                }
            }
            lodge.name = name.trim().to_string();
        }
        if payload.location.is_some() {
            lodge.location = payload.location.clone();
        }
        if payload.coordinates.is_some() {
            lodge.coordinates = payload.coordinates;
        }
        if payload.founded_year.is_some() {
            lodge.founded_year = payload.founded_year;
        }
        if payload.description.is_some() {
            lodge.description = payload.description.clone();
        }
        if payload.logo_image.is_some() {
            lodge.logo_image = payload.logo_image.clone();
        }
        if payload.background_image.is_some() {
            lodge.background_image = payload.background_image.clone();
        }
        if let Some(active) = payload.is_active {
            lodge.is_active = active;
        }
        lodge.updated_at = Utc::now();

        self.lodges.save(&lodge).await?;
        Ok(lodge)
    }

    /// Deletes the lodge and strips it from every administrator's list.
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let lodge = self.get(id).await?;

        for (collection, mut record) in self.users.administrators_of(id).await? {
            record.remove_administered_lodge(id);
            record.touch();
            if let Err(e) = self.users.save(collection, &record).await {
                tracing::warn!("Could not detach lodge {} from {} in {}: {}", id, record.id, collection, e);
            }
        }

        self.lodges.delete(id).await?;
        tracing::info!("Lodge '{}' deleted ({})", lodge.name, id);
        Ok(())
    }

    /// Everyone attached to the lodge, by id or (for older documents) by
    /// lodge name in `primaryLodge`.
    pub async fn members_of(&self, lodge_id: Uuid) -> Result<Vec<UserRecord>, AppError> {
        let lodge = self.get(lodge_id).await?;
        let wanted = lodge.name.trim().to_lowercase();

        Ok(self
            .users
            .merged()
            .await?
            .into_iter()
            .filter(|u| {
                u.belongs_to_lodge(lodge_id)
                    || u.administers(lodge_id)
                    || matches!(&u.primary_lodge, Some(LodgeRef::Name(n)) if n.trim().to_lowercase() == wanted)
            })
            .collect())
    }

    pub async fn positions(&self, lodge_id: Uuid) -> Result<Vec<LodgePosition>, AppError> {
        self.get(lodge_id).await?;

        let mut positions: Vec<LodgePosition> = self
            .users
            .merged()
            .await?
            .into_iter()
            .flat_map(|u| {
                let name = u.display_name();
                u.lodge_memberships
                    .into_iter()
                    .filter(move |m| m.lodge == lodge_id)
                    .filter_map(move |m| {
                        m.position.map(|position| LodgePosition {
                            member_id: u.id,
                            member_name: name.clone(),
                            position,
                            start_date: m.start_date,
                            is_active: m.is_active,
                        })
                    })
            })
            .collect();
        positions.sort_by(|a, b| b.is_active.cmp(&a.is_active).then(a.position.cmp(&b.position)));

        Ok(positions)
    }

    /// Gives `member` the position in the lodge. Whoever held the same
    /// position before keeps the record but is marked inactive.
    pub async fn assign_position(
        &self,
        lodge_id: Uuid,
        payload: &AssignPositionPayload,
    ) -> Result<LodgePosition, AppError> {
        self.get(lodge_id).await?;
        let member = self
            .users
            .find_person(payload.member_id)
            .await?
            .ok_or_else(|| AppError::not_found("Member not found"))?;

        let position = payload.position.trim().to_string();
        let start_date = payload.start_date.unwrap_or_else(Utc::now);

        for holder in self.users.merged().await? {
            let holds_it = holder.id != member.id
                && holder.lodge_memberships.iter().any(|m| {
                    m.lodge == lodge_id && m.is_active && m.position.as_deref() == Some(position.as_str())
                });
            if holds_it {
                self.users
                    .update_everywhere(&holder, |r| {
                        for m in r.lodge_memberships.iter_mut() {
                            if m.lodge == lodge_id && m.position.as_deref() == Some(position.as_str()) {
                                m.is_active = false;
                            }
                        }
                    })
                    .await?;
            }
        }

        self.users
            .update_everywhere(&member, |r| {
                match r.lodge_memberships.iter_mut().find(|m| m.lodge == lodge_id) {
                    Some(m) => {
                        m.position = Some(position.clone());
                        m.start_date = Some(start_date);
                        m.is_active = true;
                    }
                    None => r.lodge_memberships.push(LodgeMembership {
                        lodge: lodge_id,
                        position: Some(position.clone()),
                        start_date: Some(start_date),
                        is_active: true,
                    }),
                }
                if !r.lodges.contains(&lodge_id) {
                    r.lodges.push(lodge_id);
                }
            })
            .await?;

        tracing::info!("{} is now '{}' of lodge {}", member.id, position, lodge_id);

        Ok(LodgePosition {
            member_id: member.id,
            member_name: member.display_name(),
            position,
            start_date: Some(start_date),
            is_active: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Collection, MemoryDocumentStore, Repository};
    use std::sync::Arc;

    fn service() -> (LodgeService, UserDirectory) {
        let store = Arc::new(MemoryDocumentStore::new());
        let users = UserDirectory::new(store.clone());
        let lodges = Repository::new(store, Collection::Lodges);
        (LodgeService::new(lodges, users.clone(), "District Lodge".into()), users)
    }

    fn create_payload(name: &str) -> CreateLodgePayload {
        CreateLodgePayload {
            name: name.to_string(),
            location: Some("Beirut".into()),
            coordinates: None,
            founded_year: Some(1950),
            description: None,
            logo_image: None,
            background_image: None,
            is_active: None,
        }
    }

    #[tokio::test]
    async fn finds_the_district_lodge_by_name() {
        let (lodges, _) = service();
        assert!(lodges.district_lodge().await.unwrap().is_none());

        let created = lodges.create(&create_payload("district lodge")).await.unwrap();
        assert_eq!(lodges.district_lodge().await.unwrap().unwrap().id, created.id);

        let dup = lodges.create(&create_payload("District Lodge")).await;
        assert!(matches!(dup, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn lists_with_search_and_pagination() {
        let (lodges, _) = service();
        for name in ["Cedars", "Phoenicia", "Byblos"] {
            lodges.create(&create_payload(name)).await.unwrap();
        }

        let query = LodgeListQuery {
            search: Some("PHOEN".into()),
            ..Default::default()
        };
        let page = lodges.list(&query).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].name, "Phoenicia");

        let all = lodges.list(&LodgeListQuery::default()).await.unwrap();
        let names: Vec<_> = all.items.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["Byblos", "Cedars", "Phoenicia"]);
    }

    #[tokio::test]
    async fn assigning_a_position_retires_the_previous_holder() {
        let (lodges, users) = service();
        let lodge = lodges.create(&create_payload("Cedars")).await.unwrap();

        let first = UserRecord::new(Uuid::new_v4());
        let second = UserRecord::new(Uuid::new_v4());
        users.insert(Collection::Users, &first).await.unwrap();
        users.insert(Collection::Members, &second).await.unwrap();

        for member in [first.id, second.id] {
            let payload = AssignPositionPayload {
                member_id: member,
                position: "Worshipful Master".into(),
                start_date: None,
            };
            lodges.assign_position(lodge.id, &payload).await.unwrap();
        }

        let positions = lodges.positions(lodge.id).await.unwrap();
        assert_eq!(positions.len(), 2);
        assert_eq!(positions[0].member_id, second.id);
        assert!(positions[0].is_active);
        assert!(!positions[1].is_active);

        let members = lodges.members_of(lodge.id).await.unwrap();
        assert_eq!(members.len(), 2);
    }

    #[tokio::test]
    async fn deleting_a_lodge_detaches_its_admins() {
        let (lodges, users) = service();
        let lodge = lodges.create(&create_payload("Byblos")).await.unwrap();

        let mut admin = UserRecord::new(Uuid::new_v4());
        admin.role = Role::LodgeAdmin;
        admin.add_administered_lodge(lodge.id);
        users.insert(Collection::Users, &admin).await.unwrap();

        lodges.delete(lodge.id).await.unwrap();
        let (_, reloaded) = users.locate_404(admin.id).await.unwrap();
        assert!(reloaded.administered_lodges.is_empty());
        assert!(matches!(lodges.get(lodge.id).await, Err(AppError::NotFound(_))));
    }

    #[test]
    fn lodge_admins_manage_only_their_lodges() {
        let lodge = Uuid::new_v4();
        let mut user = UserRecord::new(Uuid::new_v4());
        user.role = Role::LodgeAdmin;
        user.primary_lodge = Some(LodgeRef::Id(lodge));
        assert!(LodgeService::can_manage(&user, lodge));

        user.add_administered_lodge(Uuid::new_v4());
        assert!(!LodgeService::can_manage(&user, lodge));

        user.role = Role::LodgeMember;
        user.add_administered_lodge(lodge);
        assert!(!LodgeService::can_manage(&user, lodge));
    }
}
