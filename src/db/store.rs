// src/db/store.rs

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

use crate::common::error::AppError;

/// Every collection the application reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Legacy member documents.
    Members,
    /// Accounts used for login and admin bookkeeping.
    Users,
    /// The consolidated user collection.
    UnifiedUsers,
    Lodges,
    Candidates,
    Events,
    Messages,
}

impl Collection {
    /// The three collections that can each hold a copy of the same person.
    /// Lookups walk them in this order.
    pub const USER_COLLECTIONS: [Collection; 3] =
        [Collection::Members, Collection::Users, Collection::UnifiedUsers];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Members => "members",
            Collection::Users => "users",
            Collection::UnifiedUsers => "unifiedusers",
            Collection::Lodges => "lodges",
            Collection::Candidates => "candidates",
            Collection::Events => "events",
            Collection::Messages => "messages",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Schemaless document storage. Documents are JSON objects keyed by id and
/// returned in insertion order.
///
/// `find` takes a containment filter with PostgreSQL `@>` semantics:
/// `{}` matches everything, `{"role": "LODGE_ADMIN"}` matches on a field and
/// `{"administeredLodges": [id]}` matches arrays holding `id`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert(&self, collection: Collection, id: Uuid, body: Value) -> Result<(), AppError>;

    async fn get(&self, collection: Collection, id: Uuid) -> Result<Option<Value>, AppError>;

    async fn find(&self, collection: Collection, filter: &Value) -> Result<Vec<Value>, AppError>;

    /// Returns `false` when no document with that id exists.
    async fn replace(&self, collection: Collection, id: Uuid, body: Value) -> Result<bool, AppError>;

    /// Returns `false` when no document with that id exists.
    async fn delete(&self, collection: Collection, id: Uuid) -> Result<bool, AppError>;

    async fn ping(&self) -> Result<(), AppError>;
}

/// `haystack @> needle` over JSON values.
pub fn json_contains(haystack: &Value, needle: &Value) -> bool {
    match (haystack, needle) {
        (Value::Object(h), Value::Object(n)) => n
            .iter()
            .all(|(k, nv)| h.get(k).is_some_and(|hv| json_contains(hv, nv))),
        (Value::Array(h), Value::Array(n)) => n
            .iter()
            .all(|nv| h.iter().any(|hv| json_contains(hv, nv))),
        (h, n) => h == n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_filter_matches_any_object() {
        assert!(json_contains(&json!({"a": 1}), &json!({})));
    }

    #[test]
    fn matches_nested_fields_and_array_members() {
        let doc = json!({
            "role": "LODGE_ADMIN",
            "administeredLodges": ["l1", "l2"],
            "profile": {"city": "Beirut", "zip": 1100}
        });

        assert!(json_contains(&doc, &json!({"role": "LODGE_ADMIN"})));
        assert!(json_contains(&doc, &json!({"administeredLodges": ["l2"]})));
        assert!(json_contains(&doc, &json!({"profile": {"city": "Beirut"}})));
        assert!(!json_contains(&doc, &json!({"administeredLodges": ["l3"]})));
        assert!(!json_contains(&doc, &json!({"role": "LODGE_MEMBER"})));
        assert!(!json_contains(&doc, &json!({"missing": null})));
    }

    #[test]
    fn scalars_compare_by_value() {
        assert!(json_contains(&json!(3), &json!(3)));
        assert!(!json_contains(&json!("3"), &json!(3)));
    }
}
