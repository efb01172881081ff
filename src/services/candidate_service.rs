// src/services/candidate_service.rs

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        pagination::{matches_search, Paginated},
    },
    db::{CandidateRepository, LodgeRepository},
    models::{
        candidate::{
            Candidate, CandidateListQuery, CandidateStatus, CandidateView, CreateCandidatePayload,
            UpdateCandidatePayload,
        },
        user::{Role, UserRecord},
    },
    services::lodge_service::LodgeService,
};

#[derive(Clone)]
pub struct CandidateService {
    candidates: CandidateRepository,
    lodges: LodgeRepository,
}

fn sees_all(user: &UserRecord) -> bool {
    matches!(user.role, Role::SuperAdmin | Role::DistrictAdmin)
}

fn check_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), AppError> {
    if end <= start {
        return Err(AppError::bad_request("The end date must be after the start date"));
    }
    Ok(())
}

impl CandidateService {
    pub fn new(candidates: CandidateRepository, lodges: LodgeRepository) -> Self {
        Self { candidates, lodges }
    }

    /// District level admins see every candidate; everyone else sees the
    /// candidates of their own lodges. Soonest deadline first.
    pub async fn list(
        &self,
        viewer: &UserRecord,
        query: &CandidateListQuery,
    ) -> Result<Paginated<CandidateView>, AppError> {
        let now = Utc::now();
        let mut candidates: Vec<Candidate> = self
            .candidates
            .find_all()
            .await?
            .into_iter()
            .filter(|c| sees_all(viewer) || viewer.belongs_to_lodge(c.lodge) || viewer.administers(c.lodge))
            .filter(|c| query.lodge.is_none_or(|lodge| c.lodge == lodge))
            .filter(|c| query.status.is_none_or(|status| c.status == status))
            .filter(|c| match query.search.as_deref() {
                Some(search) => matches_search(
                    search,
                    &[Some(&c.first_name), Some(&c.last_name), c.email.as_deref()],
                ),
                None => true,
            })
            .collect();
        candidates.sort_by_key(|c| c.end_date);

        Ok(Paginated::from_vec(candidates, query.page, query.limit).map(|c| CandidateView::at(c, now)))
    }

    pub async fn get(&self, id: Uuid) -> Result<CandidateView, AppError> {
        let candidate = self.candidates.find_404(id, "Candidate").await?;
        Ok(CandidateView::at(candidate, Utc::now()))
    }

    pub async fn create(&self, caller: &UserRecord, payload: &CreateCandidatePayload) -> Result<CandidateView, AppError> {
        self.lodges.find_404(payload.lodge, "Lodge").await?;
        if !LodgeService::can_manage(caller, payload.lodge) {
            return Err(AppError::forbidden("You can only submit candidates for your own lodge"));
        }

        let now = Utc::now();
        let start_date = payload.start_date.unwrap_or(now);
        check_window(start_date, payload.end_date)?;

        let candidate = Candidate {
            id: Uuid::new_v4(),
            first_name: payload.first_name.trim().to_string(),
            last_name: payload.last_name.trim().to_string(),
            email: payload.email.clone(),
            phone: payload.phone.clone(),
            occupation: payload.occupation.clone(),
            date_of_birth: payload.date_of_birth,
            address: payload.address.clone(),
            notes: payload.notes.clone(),
            lodge: payload.lodge,
            submitted_by: Some(caller.id),
            status: CandidateStatus::Pending,
            start_date,
            end_date: payload.end_date,
            created_at: now,
            updated_at: now,
        };

        self.candidates.insert(&candidate).await?;
        tracing::info!("Candidate {} submitted for lodge {}", candidate.id, candidate.lodge);
        Ok(CandidateView::at(candidate, now))
    }

    pub async fn update(
        &self,
        caller: &UserRecord,
        id: Uuid,
        payload: &UpdateCandidatePayload,
    ) -> Result<CandidateView, AppError> {
        let mut candidate = self.candidates.find_404(id, "Candidate").await?;
        if !LodgeService::can_manage(caller, candidate.lodge) {
            return Err(AppError::forbidden("You cannot edit candidates of another lodge"));
        }

        if let Some(first) = &payload.first_name {
            candidate.first_name = first.trim().to_string();
        }
        if let Some(last) = &payload.last_name {
            candidate.last_name = last.trim().to_string();
        }
        if payload.email.is_some() {
            candidate.email = payload.email.clone();
        }
        if payload.phone.is_some() {
            candidate.phone = payload.phone.clone();
        }
        if payload.occupation.is_some() {
            candidate.occupation = payload.occupation.clone();
        }
        if payload.date_of_birth.is_some() {
            candidate.date_of_birth = payload.date_of_birth;
        }
        if payload.address.is_some() {
            candidate.address = payload.address.clone();
        }
        if payload.notes.is_some() {
            candidate.notes = payload.notes.clone();
        }
        if let Some(start) = payload.start_date {
            candidate.start_date = start;
        }
        if let Some(end) = payload.end_date {
            candidate.end_date = end;
        }
        check_window(candidate.start_date, candidate.end_date)?;

        let now = Utc::now();
        candidate.updated_at = now;
        self.candidates.save(&candidate).await?;
        Ok(CandidateView::at(candidate, now))
    }

    pub async fn set_status(&self, id: Uuid, status: CandidateStatus) -> Result<CandidateView, AppError> {
        let mut candidate = self.candidates.find_404(id, "Candidate").await?;
        let now = Utc::now();
        candidate.status = status;
        candidate.updated_at = now;
        self.candidates.save(&candidate).await?;
        tracing::info!("Candidate {} marked {:?}", id, status);
        Ok(CandidateView::at(candidate, now))
    }

    pub async fn delete(&self, caller: &UserRecord, id: Uuid) -> Result<(), AppError> {
        let candidate = self.candidates.find_404(id, "Candidate").await?;
        if !LodgeService::can_manage(caller, candidate.lodge) {
            return Err(AppError::forbidden("You cannot delete candidates of another lodge"));
        }
        self.candidates.delete(id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Collection, DocumentStore, MemoryDocumentStore, Repository};
    use crate::models::lodge::Lodge;
    use crate::models::user::LodgeRef;
    use chrono::Duration;
    use std::sync::Arc;

    async fn setup() -> (CandidateService, Lodge) {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
        let lodges: LodgeRepository = Repository::new(store.clone(), Collection::Lodges);
        let now = Utc::now();
        let lodge = Lodge {
            id: Uuid::new_v4(),
            name: "Cedars".into(),
            location: None,
            coordinates: None,
            founded_year: None,
            description: None,
            logo_image: None,
            background_image: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        lodges.insert(&lodge).await.unwrap();
        let service = CandidateService::new(Repository::new(store, Collection::Candidates), lodges);
        (service, lodge)
    }

    fn staff(role: Role, lodge: Uuid) -> UserRecord {
        let mut user = UserRecord::new(Uuid::new_v4());
        user.role = role;
        user.primary_lodge = Some(LodgeRef::Id(lodge));
        user
    }

    fn submission(lodge: Uuid, days: i64) -> CreateCandidatePayload {
        CreateCandidatePayload {
            first_name: "Elias".into(),
            last_name: "Saab".into(),
            email: None,
            phone: None,
            occupation: None,
            date_of_birth: None,
            address: None,
            notes: None,
            lodge,
            start_date: None,
            end_date: Utc::now() + Duration::days(days),
        }
    }

    #[tokio::test]
    async fn lodge_admin_submits_for_own_lodge() {
        let (service, lodge) = setup().await;
        let admin = staff(Role::LodgeAdmin, lodge.id);

        let created = service.create(&admin, &submission(lodge.id, 30)).await.unwrap();
        assert_eq!(created.days_left, 30);
        assert_eq!(created.candidate.status, CandidateStatus::Pending);
        assert_eq!(created.candidate.submitted_by, Some(admin.id));

        let member = staff(Role::LodgeMember, lodge.id);
        assert!(matches!(
            service.create(&member, &submission(lodge.id, 30)).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            service.create(&admin, &submission(lodge.id, -1)).await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn listing_respects_lodge_visibility() {
        let (service, lodge) = setup().await;
        let admin = staff(Role::LodgeAdmin, lodge.id);
        service.create(&admin, &submission(lodge.id, 40)).await.unwrap();
        service.create(&admin, &submission(lodge.id, 10)).await.unwrap();

        let page = service.list(&admin, &CandidateListQuery::default()).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].days_left, 10);

        let outsider = staff(Role::LodgeMember, Uuid::new_v4());
        assert_eq!(service.list(&outsider, &CandidateListQuery::default()).await.unwrap().total, 0);

        let district = staff(Role::DistrictAdmin, Uuid::new_v4());
        let approved = CandidateListQuery {
            status: Some(CandidateStatus::Approved),
            ..Default::default()
        };
        assert_eq!(service.list(&district, &approved).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn status_decision_is_stored() {
        let (service, lodge) = setup().await;
        let admin = staff(Role::LodgeAdmin, lodge.id);
        let created = service.create(&admin, &submission(lodge.id, 5)).await.unwrap();

        service
            .set_status(created.candidate.id, CandidateStatus::Approved)
            .await
            .unwrap();
        assert_eq!(
            service.get(created.candidate.id).await.unwrap().candidate.status,
            CandidateStatus::Approved
        );

        service.delete(&admin, created.candidate.id).await.unwrap();
        assert!(matches!(service.get(created.candidate.id).await, Err(AppError::NotFound(_))));
    }
}
