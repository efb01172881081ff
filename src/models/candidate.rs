// src/models/candidate.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CandidateStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub occupation: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<DateTime<Utc>>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub lodge: Uuid,
    #[serde(default)]
    pub submitted_by: Option<Uuid>,
    #[serde(default)]
    pub status: CandidateStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Whole days until `end`, rounded up and never negative.
pub fn days_left(end: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let secs = (end - now).num_seconds();
    if secs <= 0 {
        return 0;
    }
    (secs + 86_399) / 86_400
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CandidateView {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub days_left: i64,
}

impl CandidateView {
    pub fn at(candidate: Candidate, now: DateTime<Utc>) -> Self {
        let days_left = days_left(candidate.end_date, now);
        Self { candidate, days_left }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCandidatePayload {
    #[validate(length(min = 1, message = "First name is required."))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required."))]
    pub last_name: String,
    #[validate(email(message = "Invalid email address."))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub occupation: Option<String>,
    pub date_of_birth: Option<DateTime<Utc>>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub lodge: Uuid,
    /// Defaults to now.
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCandidatePayload {
    #[validate(length(min = 1, message = "First name is required."))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, message = "Last name is required."))]
    pub last_name: Option<String>,
    #[validate(email(message = "Invalid email address."))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub occupation: Option<String>,
    pub date_of_birth: Option<DateTime<Utc>>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CandidateListQuery {
    pub lodge: Option<Uuid>,
    pub status: Option<CandidateStatus>,
    pub search: Option<String>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CandidateStatusPayload {
    pub status: CandidateStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn days_left_rounds_up_partial_days() {
        let now = Utc::now();
        assert_eq!(days_left(now + Duration::hours(1), now), 1);
        assert_eq!(days_left(now + Duration::days(3), now), 3);
        assert_eq!(days_left(now + Duration::days(3) + Duration::seconds(1), now), 4);
    }

    #[test]
    fn days_left_is_zero_once_expired() {
        let now = Utc::now();
        assert_eq!(days_left(now, now), 0);
        assert_eq!(days_left(now - Duration::days(2), now), 0);
    }
}
