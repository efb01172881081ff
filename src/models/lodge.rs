// src/models/lodge.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lodge {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub founded_year: Option<i32>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub logo_image: Option<String>,
    #[serde(default)]
    pub background_image: Option<String>,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn active_by_default() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLodgePayload {
    #[validate(length(min = 2, message = "Lodge name must have at least 2 characters."))]
    #[schema(example = "Lodge Phoenicia No. 12")]
    pub name: String,
    pub location: Option<String>,
    pub coordinates: Option<Coordinates>,
    #[validate(range(min = 1700, max = 2100, message = "Founded year is out of range."))]
    pub founded_year: Option<i32>,
    pub description: Option<String>,
    pub logo_image: Option<String>,
    pub background_image: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLodgePayload {
    #[validate(length(min = 2, message = "Lodge name must have at least 2 characters."))]
    pub name: Option<String>,
    pub location: Option<String>,
    pub coordinates: Option<Coordinates>,
    #[validate(range(min = 1700, max = 2100, message = "Founded year is out of range."))]
    pub founded_year: Option<i32>,
    pub description: Option<String>,
    pub logo_image: Option<String>,
    pub background_image: Option<String>,
    pub is_active: Option<bool>,
}

/// One officer/position held inside a lodge.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LodgePosition {
    pub member_id: Uuid,
    pub member_name: Option<String>,
    pub position: String,
    pub start_date: Option<DateTime<Utc>>,
    pub is_active: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignPositionPayload {
    pub member_id: Uuid,
    #[validate(length(min = 1, message = "Position is required."))]
    #[schema(example = "Worshipful Master")]
    pub position: String,
    pub start_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LodgeListQuery {
    pub search: Option<String>,
    pub active: Option<bool>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}
