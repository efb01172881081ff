// src/models/user.rs

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;
use uuid::Uuid;

// ---
// 1. Roles
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SuperAdmin,
    DistrictAdmin,
    LodgeAdmin,
    #[default]
    LodgeMember,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "SUPER_ADMIN",
            Role::DistrictAdmin => "DISTRICT_ADMIN",
            Role::LodgeAdmin => "LODGE_ADMIN",
            Role::LodgeMember => "LODGE_MEMBER",
        }
    }

    /// Roles that occupy an administrative seat.
    pub fn is_admin(&self) -> bool {
        !matches!(self, Role::LodgeMember)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "SUPER_ADMIN" => Ok(Role::SuperAdmin),
            "DISTRICT_ADMIN" => Ok(Role::DistrictAdmin),
            "LODGE_ADMIN" => Ok(Role::LodgeAdmin),
            "LODGE_MEMBER" => Ok(Role::LodgeMember),
            other => Err(format!("Invalid role: {}", other)),
        }
    }
}

// ---
// 2. Status
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    #[default]
    Active,
    Inactive,
    Pending,
}

// ---
// 3. Lodge references
// ---
// Older documents store the primary lodge by name instead of by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum LodgeRef {
    Id(Uuid),
    Name(String),
}

impl LodgeRef {
    pub fn id(&self) -> Option<Uuid> {
        match self {
            LodgeRef::Id(id) => Some(*id),
            LodgeRef::Name(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LodgeMembership {
    pub lodge: Uuid,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

// ---
// 4. The user document
// ---
// The same shape lives in `members`, `users` and `unifiedusers`.
// Every field is optional on read because the collections drifted apart.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: Uuid,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,

    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub status: MemberStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_lodge: Option<LodgeRef>,
    #[serde(default)]
    pub lodges: Vec<Uuid>,
    #[serde(default)]
    pub lodge_memberships: Vec<LodgeMembership>,
    #[serde(default)]
    pub administered_lodges: Vec<Uuid>,
    #[serde(default)]
    pub lodge_roles: BTreeMap<Uuid, Role>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    /// Fields this model does not know about, preserved on write.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserRecord {
    pub fn new(id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            created_at: Some(now),
            updated_at: Some(now),
            ..Default::default()
        }
    }

    /// `name` when present, otherwise `firstName lastName`.
    pub fn display_name(&self) -> Option<String> {
        if let Some(name) = self.name.as_deref().filter(|n| !n.trim().is_empty()) {
            return Some(name.to_string());
        }
        let joined = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|p| !p.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        (!joined.is_empty()).then_some(joined)
    }

    pub fn normalized_email(&self) -> Option<String> {
        self.email
            .as_deref()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
    }

    /// Key used to recognise the same person across collections.
    pub fn identity_key(&self) -> String {
        self.normalized_email()
            .unwrap_or_else(|| self.id.to_string())
    }

    pub fn primary_lodge_id(&self) -> Option<Uuid> {
        self.primary_lodge.as_ref().and_then(LodgeRef::id)
    }

    pub fn belongs_to_lodge(&self, lodge_id: Uuid) -> bool {
        self.primary_lodge_id() == Some(lodge_id)
            || self.lodges.contains(&lodge_id)
            || self.lodge_memberships.iter().any(|m| m.lodge == lodge_id)
    }

    pub fn administers(&self, lodge_id: Uuid) -> bool {
        self.administered_lodges.contains(&lodge_id)
    }

    pub fn add_administered_lodge(&mut self, lodge_id: Uuid) {
        if !self.administered_lodges.contains(&lodge_id) {
            self.administered_lodges.push(lodge_id);
        }
    }

    /// Returns `true` when the lodge was present.
    pub fn remove_administered_lodge(&mut self, lodge_id: Uuid) -> bool {
        let before = self.administered_lodges.len();
        self.administered_lodges.retain(|l| *l != lodge_id);
        self.lodge_roles.remove(&lodge_id);
        before != self.administered_lodges.len()
    }

    pub fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}

// ---
// 5. API view (never exposes the password hash)
// ---
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub id: Uuid,
    pub name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub role: Role,
    pub status: MemberStatus,
    pub primary_lodge: Option<LodgeRef>,
    pub lodges: Vec<Uuid>,
    pub lodge_memberships: Vec<LodgeMembership>,
    pub administered_lodges: Vec<Uuid>,
    #[schema(value_type = Object)]
    pub lodge_roles: BTreeMap<Uuid, Role>,
    pub occupation: Option<String>,
    pub address: Option<String>,
    pub bio: Option<String>,
    pub profile_image: Option<String>,
    pub phone: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<UserRecord> for MemberView {
    fn from(r: UserRecord) -> Self {
        Self {
            id: r.id,
            name: r.display_name(),
            first_name: r.first_name,
            last_name: r.last_name,
            email: r.email,
            role: r.role,
            status: r.status,
            primary_lodge: r.primary_lodge,
            lodges: r.lodges,
            lodge_memberships: r.lodge_memberships,
            administered_lodges: r.administered_lodges,
            lodge_roles: r.lodge_roles,
            occupation: r.occupation,
            address: r.address,
            bio: r.bio,
            profile_image: r.profile_image,
            phone: r.phone,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_loose_legacy_documents() {
        let id = Uuid::new_v4();
        let doc = json!({
            "id": id,
            "firstName": "Karim",
            "lastName": "Nassar",
            "role": "LODGE_ADMIN",
            "primaryLodge": "Lodge Phoenicia",
            "legacyField": 42
        });

        let record: UserRecord = serde_json::from_value(doc).unwrap();
        assert_eq!(record.role, Role::LodgeAdmin);
        assert_eq!(record.status, MemberStatus::Active);
        assert_eq!(record.primary_lodge, Some(LodgeRef::Name("Lodge Phoenicia".into())));
        assert_eq!(record.primary_lodge_id(), None);
        assert_eq!(record.display_name().as_deref(), Some("Karim Nassar"));

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["legacyField"], json!(42));
    }

    #[test]
    fn primary_lodge_accepts_an_id() {
        let lodge = Uuid::new_v4();
        let record: UserRecord =
            serde_json::from_value(json!({ "id": Uuid::new_v4(), "primaryLodge": lodge })).unwrap();
        assert_eq!(record.primary_lodge_id(), Some(lodge));
        assert!(record.belongs_to_lodge(lodge));
    }

    #[test]
    fn parses_role_strings() {
        assert_eq!("DISTRICT_ADMIN".parse::<Role>(), Ok(Role::DistrictAdmin));
        assert!("OWNER".parse::<Role>().is_err());
        assert!(Role::LodgeAdmin.is_admin());
        assert!(!Role::LodgeMember.is_admin());
    }

    #[test]
    fn identity_prefers_email() {
        let mut r = UserRecord::new(Uuid::new_v4());
        assert_eq!(r.identity_key(), r.id.to_string());
        r.email = Some(" Anna@Example.org ".into());
        assert_eq!(r.identity_key(), "anna@example.org");
    }

    #[test]
    fn removing_a_lodge_drops_its_role_entry() {
        let lodge = Uuid::new_v4();
        let mut r = UserRecord::new(Uuid::new_v4());
        r.add_administered_lodge(lodge);
        r.add_administered_lodge(lodge);
        r.lodge_roles.insert(lodge, Role::LodgeAdmin);
        assert_eq!(r.administered_lodges.len(), 1);

        assert!(r.remove_administered_lodge(lodge));
        assert!(r.lodge_roles.is_empty());
        assert!(!r.remove_administered_lodge(lodge));
    }
}
