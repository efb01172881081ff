// src/models/event.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub date: NaiveDate,
    /// Free-form local time, e.g. "19:30".
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub lodge: Uuid,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventPayload {
    #[validate(length(min = 1, message = "Title is required."))]
    #[schema(example = "Installation of Officers")]
    pub title: String,
    #[schema(example = "2026-11-14")]
    pub date: NaiveDate,
    #[validate(length(max = 16, message = "Time is too long."))]
    pub time: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub lodge: Uuid,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventPayload {
    #[validate(length(min = 1, message = "Title is required."))]
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    #[validate(length(max = 16, message = "Time is too long."))]
    pub time: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct EventListQuery {
    pub lodge: Option<Uuid>,
    /// Only events dated today or later.
    #[serde(default)]
    pub upcoming: bool,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}
