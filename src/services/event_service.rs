// src/services/event_service.rs

use chrono::Utc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{EventRepository, LodgeRepository},
    models::{
        event::{CreateEventPayload, Event, EventListQuery, UpdateEventPayload},
        user::UserRecord,
    },
    services::lodge_service::LodgeService,
};

#[derive(Clone)]
pub struct EventService {
    events: EventRepository,
    lodges: LodgeRepository,
}

impl EventService {
    pub fn new(events: EventRepository, lodges: LodgeRepository) -> Self {
        Self { events, lodges }
    }

    /// Calendar order: by date, then by time of day.
    pub async fn list(&self, query: &EventListQuery) -> Result<Vec<Event>, AppError> {
        let today = Utc::now().date_naive();
        let mut events: Vec<Event> = self
            .events
            .find_all()
            .await?
            .into_iter()
            .filter(|e| query.lodge.is_none_or(|lodge| e.lodge == lodge))
            .filter(|e| !query.upcoming || e.date >= today)
            .filter(|e| query.from.is_none_or(|from| e.date >= from))
            .filter(|e| query.to.is_none_or(|to| e.date <= to))
            .collect();
        events.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.time.cmp(&b.time)));
        Ok(events)
    }

    pub async fn get(&self, id: Uuid) -> Result<Event, AppError> {
        self.events.find_404(id, "Event").await
    }

    pub async fn create(&self, caller: &UserRecord, payload: &CreateEventPayload) -> Result<Event, AppError> {
        self.lodges.find_404(payload.lodge, "Lodge").await?;
        if !LodgeService::can_manage(caller, payload.lodge) {
            return Err(AppError::forbidden("You can only schedule events for your own lodge"));
        }

        let now = Utc::now();
        let event = Event {
            id: Uuid::new_v4(),
            title: payload.title.trim().to_string(),
            date: payload.date,
            time: payload.time.clone(),
            location: payload.location.clone(),
            description: payload.description.clone(),
            lodge: payload.lodge,
            created_by: caller.id,
            created_at: now,
            updated_at: now,
        };
        self.events.insert(&event).await?;
        tracing::info!("Event '{}' scheduled on {} for lodge {}", event.title, event.date, event.lodge);
        Ok(event)
    }

    pub async fn update(&self, caller: &UserRecord, id: Uuid, payload: &UpdateEventPayload) -> Result<Event, AppError> {
        let mut event = self.get(id).await?;
        if !LodgeService::can_manage(caller, event.lodge) {
            return Err(AppError::forbidden("You cannot edit events of another lodge"));
        }

        if let Some(title) = &payload.title {
            event.title = title.trim().to_string();
        }
        if let Some(date) = payload.date {
            event.date = date;
        }
        if payload.time.is_some() {
            event.time = payload.time.clone();
        }
        if payload.location.is_some() {
            event.location = payload.location.clone();
        }
        if payload.description.is_some() {
            event.description = payload.description.clone();
        }
        event.updated_at = Utc::now();

        self.events.save(&event).await?;
        Ok(event)
    }

    pub async fn delete(&self, caller: &UserRecord, id: Uuid) -> Result<(), AppError> {
        let event = self.get(id).await?;
        if !LodgeService::can_manage(caller, event.lodge) {
            return Err(AppError::forbidden("You cannot delete events of another lodge"));
        }
        self.events.delete(id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Collection, DocumentStore, MemoryDocumentStore, Repository};
    use crate::models::{lodge::Lodge, user::Role};
    use chrono::{Duration, NaiveDate};
    use std::sync::Arc;

    async fn setup() -> (EventService, Uuid) {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
        let lodges: LodgeRepository = Repository::new(store.clone(), Collection::Lodges);
        let now = Utc::now();
        let lodge = Lodge {
            id: Uuid::new_v4(),
            name: "Byblos".into(),
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
        (EventService::new(Repository::new(store, Collection::Events), lodges), lodge.id)
    }

    fn event_on(lodge: Uuid, title: &str, date: NaiveDate, time: Option<&str>) -> CreateEventPayload {
        CreateEventPayload {
            title: title.into(),
            date,
            time: time.map(String::from),
            location: None,
            description: None,
            lodge,
        }
    }

    #[tokio::test]
    async fn lists_in_calendar_order() {
        let (events, lodge) = setup().await;
        let mut admin = UserRecord::new(Uuid::new_v4());
        admin.role = Role::DistrictAdmin;

        let today = Utc::now().date_naive();
        let past = today - Duration::days(30);
        let soon = today + Duration::days(7);

        events.create(&admin, &event_on(lodge, "Late", soon, Some("20:00"))).await.unwrap();
        events.create(&admin, &event_on(lodge, "Early", soon, Some("18:30"))).await.unwrap();
        events.create(&admin, &event_on(lodge, "Past", past, None)).await.unwrap();

        let all = events.list(&EventListQuery::default()).await.unwrap();
        let titles: Vec<_> = all.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, ["Past", "Early", "Late"]);

        let upcoming = EventListQuery {
            upcoming: true,
            ..Default::default()
        };
        assert_eq!(events.list(&upcoming).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn members_cannot_schedule() {
        let (events, lodge) = setup().await;
        let member = UserRecord::new(Uuid::new_v4());
        let today = Utc::now().date_naive();
        assert!(matches!(
            events.create(&member, &event_on(lodge, "Nope", today, None)).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            events.create(&member, &event_on(Uuid::new_v4(), "Nope", today, None)).await,
            Err(AppError::NotFound(_))
        ));
    }
}
