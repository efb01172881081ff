// src/db/repository.rs

use std::marker::PhantomData;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::db::store::{Collection, DocumentStore};
use crate::models::{candidate::Candidate, event::Event, lodge::Lodge, message::Message, user::UserRecord};

/// A model that can be stored as a document.
pub trait Document: Serialize + DeserializeOwned + Send + Sync {
    fn id(&self) -> Uuid;
}

macro_rules! impl_document {
    ($($ty:ty),* $(,)?) => {
        $(impl Document for $ty {
            fn id(&self) -> Uuid {
                self.id
            }
        })*
    };
}

impl_document!(UserRecord, Lodge, Candidate, Event, Message);

/// Typed access to one collection.
pub struct Repository<T> {
    store: Arc<dyn DocumentStore>,
    collection: Collection,
    _phantom: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            collection: self.collection,
            _phantom: PhantomData,
        }
    }
}

impl<T: Document> Repository<T> {
    pub fn new(store: Arc<dyn DocumentStore>, collection: Collection) -> Self {
        Self {
            store,
            collection,
            _phantom: PhantomData,
        }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub async fn insert(&self, doc: &T) -> Result<(), AppError> {
        let body = serde_json::to_value(doc)?;
        self.store.insert(self.collection, doc.id(), body).await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<T>, AppError> {
        match self.store.get(self.collection, id).await? {
            Some(body) => Ok(Some(serde_json::from_value(body)?)),
            None => Ok(None),
        }
    }

    /// Like `find_by_id`, but a missing document is a 404.
    pub async fn find_404(&self, id: Uuid, what: &str) -> Result<T, AppError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("{} not found", what)))
    }

    pub async fn find_all(&self) -> Result<Vec<T>, AppError> {
        self.find_where(json!({})).await
    }

    /// Documents that no longer fit the model are logged and skipped.
    pub async fn find_where(&self, filter: Value) -> Result<Vec<T>, AppError> {
        let bodies = self.store.find(self.collection, &filter).await?;
        let mut out = Vec::with_capacity(bodies.len());
        for body in bodies {
            match serde_json::from_value::<T>(body) {
                Ok(doc) => out.push(doc),
                Err(e) => tracing::warn!("Skipping malformed document in {}: {}", self.collection, e),
            }
        }
        Ok(out)
    }

    pub async fn find_one_where(&self, filter: Value) -> Result<Option<T>, AppError> {
        Ok(self.find_where(filter).await?.into_iter().next())
    }

    pub async fn count_where(&self, filter: Value) -> Result<usize, AppError> {
        Ok(self.store.find(self.collection, &filter).await?.len())
    }

    /// Overwrites the stored document. Returns `false` if it no longer exists.
    pub async fn save(&self, doc: &T) -> Result<bool, AppError> {
        let body = serde_json::to_value(doc)?;
        self.store.replace(self.collection, doc.id(), body).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        self.store.delete(self.collection, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_store::MemoryDocumentStore;
    use crate::models::user::Role;

    #[tokio::test]
    async fn round_trips_typed_documents() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
        let repo: Repository<UserRecord> = Repository::new(store.clone(), Collection::Users);

        let mut user = UserRecord::new(Uuid::new_v4());
        user.role = Role::LodgeAdmin;
        repo.insert(&user).await.unwrap();

        let admins = repo.find_where(json!({"role": "LODGE_ADMIN"})).await.unwrap();
        assert_eq!(admins.len(), 1);
        assert_eq!(admins[0].id, user.id);

        user.role = Role::LodgeMember;
        assert!(repo.save(&user).await.unwrap());
        assert_eq!(repo.count_where(json!({"role": "LODGE_ADMIN"})).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn skips_documents_that_do_not_fit() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
        let repo: Repository<UserRecord> = Repository::new(store.clone(), Collection::Members);

        store
            .insert(Collection::Members, Uuid::new_v4(), json!({"id": "not-a-uuid"}))
            .await
            .unwrap();
        repo.insert(&UserRecord::new(Uuid::new_v4())).await.unwrap();

        assert_eq!(repo.find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn find_404_names_the_missing_thing() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
        let repo: Repository<UserRecord> = Repository::new(store, Collection::Users);
        let err = repo.find_404(Uuid::new_v4(), "Member").await.unwrap_err();
        assert_eq!(err.to_string(), "Member not found");
    }
}
