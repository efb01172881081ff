// src/handlers/events.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::event::{CreateEventPayload, Event, EventListQuery, UpdateEventPayload},
};

// GET /api/events
#[utoipa::path(
    get,
    path = "/api/events",
    tag = "Events",
    params(EventListQuery),
    responses(
        (status = 200, description = "Events in calendar order", body = Vec<Event>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_events(
    State(app_state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<EventListQuery>, AppError>,
) -> Result<Json<Vec<Event>>, AppError> {
    Ok(Json(app_state.event_service.list(&query).await?))
}

// POST /api/events
#[utoipa::path(
    post,
    path = "/api/events",
    tag = "Events",
    request_body = CreateEventPayload,
    responses(
        (status = 201, description = "Event scheduled", body = Event),
        (status = 403, description = "Not staff of this lodge"),
        (status = 404, description = "Lodge not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_event(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    WithRejection(Json(payload), _): WithRejection<Json<CreateEventPayload>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let event = app_state.event_service.create(&caller, &payload).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

// GET /api/events/{id}
#[utoipa::path(
    get,
    path = "/api/events/{id}",
    tag = "Events",
    params(("id" = Uuid, Path, description = "Event id")),
    responses(
        (status = 200, description = "The event", body = Event),
        (status = 404, description = "Event not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_event(
    State(app_state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<Event>, AppError> {
    Ok(Json(app_state.event_service.get(id).await?))
}

// PUT /api/events/{id}
#[utoipa::path(
    put,
    path = "/api/events/{id}",
    tag = "Events",
    params(("id" = Uuid, Path, description = "Event id")),
    request_body = UpdateEventPayload,
    responses(
        (status = 200, description = "Event updated", body = Event),
        (status = 403, description = "Not staff of this lodge"),
        (status = 404, description = "Event not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_event(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(payload), _): WithRejection<Json<UpdateEventPayload>, AppError>,
) -> Result<Json<Event>, AppError> {
    payload.validate()?;
    Ok(Json(app_state.event_service.update(&caller, id, &payload).await?))
}

// DELETE /api/events/{id}
#[utoipa::path(
    delete,
    path = "/api/events/{id}",
    tag = "Events",
    params(("id" = Uuid, Path, description = "Event id")),
    responses(
        (status = 204, description = "Event deleted"),
        (status = 403, description = "Not staff of this lodge"),
        (status = 404, description = "Event not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_event(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<StatusCode, AppError> {
    app_state.event_service.delete(&caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
