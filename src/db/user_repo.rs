// src/db/user_repo.rs

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::json;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::db::repository::Repository;
use crate::db::store::{Collection, DocumentStore};
use crate::models::user::{Role, UserRecord};

/// Gateway to the three user collections (`members`, `users`,
/// `unifiedusers`). A person may have a copy in any subset of them; copies
/// are matched by id first and by email second.
///
/// Clones share one role lock. Any path that checks who holds a role and
/// then writes based on that answer runs under it.
#[derive(Clone)]
pub struct UserDirectory {
    members: Repository<UserRecord>,
    users: Repository<UserRecord>,
    unified: Repository<UserRecord>,
    role_lock: Arc<Mutex<()>>,
}

impl UserDirectory {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            members: Repository::new(store.clone(), Collection::Members),
            users: Repository::new(store.clone(), Collection::Users),
            unified: Repository::new(store, Collection::UnifiedUsers),
            role_lock: Arc::new(Mutex::new(())),
        }
    }

    fn repo(&self, collection: Collection) -> Result<&Repository<UserRecord>, AppError> {
        match collection {
            Collection::Members => Ok(&self.members),
            Collection::Users => Ok(&self.users),
            Collection::UnifiedUsers => Ok(&self.unified),
            other => Err(anyhow::anyhow!("{} is not a user collection", other).into()),
        }
    }

    /// Serializes role-sensitive changes within this process.
    pub async fn lock_roles(&self) -> MutexGuard<'_, ()> {
        self.role_lock.lock().await
    }

    /// The document with this id in one collection.
    pub async fn find_in(&self, collection: Collection, id: Uuid) -> Result<Option<UserRecord>, AppError> {
        self.repo(collection)?.find_by_id(id).await
    }

    pub async fn find_all_in(&self, collection: Collection) -> Result<Vec<UserRecord>, AppError> {
        self.repo(collection)?.find_all().await
    }

    /// First copy found by id, walking `members`, `users`, `unifiedusers`.
    pub async fn locate(&self, id: Uuid) -> Result<Option<(Collection, UserRecord)>, AppError> {
        for collection in Collection::USER_COLLECTIONS {
            if let Some(record) = self.find_in(collection, id).await? {
                return Ok(Some((collection, record)));
            }
        }
        Ok(None)
    }

    pub async fn locate_404(&self, id: Uuid) -> Result<(Collection, UserRecord), AppError> {
        self.locate(id)
            .await?
            .ok_or_else(|| AppError::not_found("Member not found"))
    }

    /// The copy of `person` held by one collection, if any.
    pub async fn copy_in(
        &self,
        collection: Collection,
        person: &UserRecord,
    ) -> Result<Option<UserRecord>, AppError> {
        let repo = self.repo(collection)?;
        if let Some(record) = repo.find_by_id(person.id).await? {
            return Ok(Some(record));
        }
        let Some(email) = person.normalized_email() else {
            return Ok(None);
        };
        Ok(repo
            .find_all()
            .await?
            .into_iter()
            .find(|r| r.normalized_email().as_deref() == Some(email.as_str())))
    }

    /// Every copy of `person`, one per collection at most.
    pub async fn copies_of(&self, person: &UserRecord) -> Result<Vec<(Collection, UserRecord)>, AppError> {
        let mut copies = Vec::new();
        for collection in Collection::USER_COLLECTIONS {
            if let Some(record) = self.copy_in(collection, person).await? {
                copies.push((collection, record));
            }
        }
        Ok(copies)
    }

    /// Login lookup: `users` first since it carries the credentials.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<(Collection, UserRecord)>, AppError> {
        let wanted = email.trim().to_lowercase();
        for collection in [Collection::Users, Collection::UnifiedUsers, Collection::Members] {
            let hit = self
                .find_all_in(collection)
                .await?
                .into_iter()
                .find(|r| r.normalized_email().as_deref() == Some(wanted.as_str()));
            if let Some(record) = hit {
                return Ok(Some((collection, record)));
            }
        }
        Ok(None)
    }

    /// Whether any copy of `person` holds `role`. Copies are edited
    /// independently, so one stale copy must not hide a role held elsewhere.
    pub async fn holds_role(&self, person: &UserRecord, role: Role) -> Result<bool, AppError> {
        if person.role == role {
            return Ok(true);
        }
        Ok(self.copies_of(person).await?.iter().any(|(_, r)| r.role == role))
    }

    pub async fn email_taken(&self, email: &str) -> Result<bool, AppError> {
        Ok(self.find_by_email(email).await?.is_some())
    }

    /// Every record holding `role`, across all three collections.
    pub async fn holders_of(&self, role: Role) -> Result<Vec<(Collection, UserRecord)>, AppError> {
        let mut out = Vec::new();
        for collection in Collection::USER_COLLECTIONS {
            for record in self.repo(collection)?.find_where(json!({ "role": role })).await? {
                out.push((collection, record));
            }
        }
        Ok(out)
    }

    /// Every record whose `administeredLodges` includes `lodge_id`.
    pub async fn administrators_of(&self, lodge_id: Uuid) -> Result<Vec<(Collection, UserRecord)>, AppError> {
        let mut out = Vec::new();
        for collection in Collection::USER_COLLECTIONS {
            let filter = json!({ "administeredLodges": [lodge_id] });
            for record in self.repo(collection)?.find_where(filter).await? {
                out.push((collection, record));
            }
        }
        Ok(out)
    }

    /// Number of distinct people holding `role` in any collection.
    pub async fn count_people_with_role(&self, role: Role) -> Result<usize, AppError> {
        let people: HashSet<String> = self
            .holders_of(role)
            .await?
            .iter()
            .map(|(_, r)| r.identity_key())
            .collect();
        Ok(people.len())
    }

    /// One record per person, preferring `unifiedusers`, then `users`, then
    /// `members`.
    pub async fn merged(&self) -> Result<Vec<UserRecord>, AppError> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for collection in [Collection::UnifiedUsers, Collection::Users, Collection::Members] {
            for record in self.find_all_in(collection).await? {
                let fresh_id = seen.insert(record.id.to_string());
                let fresh_email = match record.normalized_email() {
                    Some(email) => seen.insert(email),
                    None => true,
                };
                if fresh_id && fresh_email {
                    out.push(record);
                }
            }
        }
        Ok(out)
    }

    /// The merged view of a single person.
    pub async fn find_person(&self, id: Uuid) -> Result<Option<UserRecord>, AppError> {
        let Some((_, found)) = self.locate(id).await? else {
            return Ok(None);
        };
        for collection in [Collection::UnifiedUsers, Collection::Users, Collection::Members] {
            if let Some(record) = self.copy_in(collection, &found).await? {
                return Ok(Some(record));
            }
        }
        Ok(Some(found))
    }

    pub async fn save(&self, collection: Collection, record: &UserRecord) -> Result<bool, AppError> {
        self.repo(collection)?.save(record).await
    }

    pub async fn insert(&self, collection: Collection, record: &UserRecord) -> Result<(), AppError> {
        self.repo(collection)?.insert(record).await
    }

    pub async fn delete(&self, collection: Collection, id: Uuid) -> Result<bool, AppError> {
        self.repo(collection)?.delete(id).await
    }

    /// Applies `mutate` to every copy of `person` and saves them.
    /// Returns the number of copies written.
    pub async fn update_everywhere<F>(&self, person: &UserRecord, mut mutate: F) -> Result<usize, AppError>
    where
        F: FnMut(&mut UserRecord),
    {
        let copies = self.copies_of(person).await?;
        let mut written = 0;
        for (collection, mut record) in copies {
            mutate(&mut record);
            record.touch();
            if self.save(collection, &record).await? {
                written += 1;
            }
        }
        Ok(written)
    }

    /// Removes every copy of `person`. Returns the number of copies removed.
    pub async fn delete_everywhere(&self, person: &UserRecord) -> Result<usize, AppError> {
        let mut removed = 0;
        for (collection, record) in self.copies_of(person).await? {
            if self.delete(collection, record.id).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_store::MemoryDocumentStore;

    fn directory() -> UserDirectory {
        UserDirectory::new(Arc::new(MemoryDocumentStore::new()))
    }

    fn person(email: &str, role: Role) -> UserRecord {
        let mut r = UserRecord::new(Uuid::new_v4());
        r.email = Some(email.to_string());
        r.role = role;
        r
    }

    #[tokio::test]
    async fn locates_in_collection_order() {
        let dir = directory();
        let p = person("a@example.org", Role::LodgeMember);
        dir.insert(Collection::UnifiedUsers, &p).await.unwrap();
        dir.insert(Collection::Users, &p).await.unwrap();

        let (collection, _) = dir.locate(p.id).await.unwrap().unwrap();
        assert_eq!(collection, Collection::Users);
    }

    #[tokio::test]
    async fn matches_copies_by_email_when_ids_differ() {
        let dir = directory();
        let legacy = person("Shared@Example.org", Role::LodgeMember);
        let account = person("shared@example.org", Role::LodgeMember);
        dir.insert(Collection::Members, &legacy).await.unwrap();
        dir.insert(Collection::Users, &account).await.unwrap();

        let copies = dir.copies_of(&legacy).await.unwrap();
        assert_eq!(copies.len(), 2);
        assert_eq!(dir.merged().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn counts_people_not_documents() {
        let dir = directory();
        let sa = person("root@example.org", Role::SuperAdmin);
        dir.insert(Collection::Users, &sa).await.unwrap();
        dir.insert(Collection::UnifiedUsers, &sa).await.unwrap();
        assert_eq!(dir.count_people_with_role(Role::SuperAdmin).await.unwrap(), 1);

        let other = person("second@example.org", Role::SuperAdmin);
        dir.insert(Collection::Members, &other).await.unwrap();
        assert_eq!(dir.count_people_with_role(Role::SuperAdmin).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn updates_every_copy() {
        let dir = directory();
        let p = person("b@example.org", Role::LodgeMember);
        for c in Collection::USER_COLLECTIONS {
            dir.insert(c, &p).await.unwrap();
        }

        let written = dir
            .update_everywhere(&p, |r| r.occupation = Some("Architect".into()))
            .await
            .unwrap();
        assert_eq!(written, 3);

        for c in Collection::USER_COLLECTIONS {
            let copy = dir.find_in(c, p.id).await.unwrap().unwrap();
            assert_eq!(copy.occupation.as_deref(), Some("Architect"));
        }

        assert_eq!(dir.delete_everywhere(&p).await.unwrap(), 3);
        assert!(dir.locate(p.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn a_stale_copy_does_not_hide_a_role() {
        let dir = directory();
        let root = person("root@example.org", Role::SuperAdmin);
        dir.insert(Collection::Users, &root).await.unwrap();
        let mut stale = root.clone();
        stale.role = Role::LodgeMember;
        dir.insert(Collection::Members, &stale).await.unwrap();

        let (_, first) = dir.locate(root.id).await.unwrap().unwrap();
        assert_eq!(first.role, Role::LodgeMember);
        assert!(dir.holds_role(&first, Role::SuperAdmin).await.unwrap());
        assert!(!dir.holds_role(&first, Role::DistrictAdmin).await.unwrap());
    }

    #[tokio::test]
    async fn other_collections_are_an_error() {
        let dir = directory();
        let stray = person("stray@example.org", Role::LodgeMember);
        assert!(dir.insert(Collection::Lodges, &stray).await.is_err());
        assert!(dir.find_in(Collection::Events, stray.id).await.is_err());
    }
}
