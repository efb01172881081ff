// src/handlers/messages.rs

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
    models::message::{Conversation, Message, MessageListQuery, SendMessagePayload, UnreadCount},
};

// GET /api/messages
#[utoipa::path(
    get,
    path = "/api/messages",
    tag = "Messages",
    params(MessageListQuery),
    responses(
        (status = 200, description = "The caller's messages, oldest first", body = Vec<Message>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_messages(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    WithRejection(Query(query), _): WithRejection<Query<MessageListQuery>, AppError>,
) -> Result<Json<Vec<Message>>, AppError> {
    Ok(Json(app_state.message_service.list(&caller, &query).await?))
}

// POST /api/messages
#[utoipa::path(
    post,
    path = "/api/messages",
    tag = "Messages",
    request_body = SendMessagePayload,
    responses(
        (status = 201, description = "Message sent", body = Message),
        (status = 400, description = "Empty content or message to self"),
        (status = 404, description = "Recipient not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn send_message(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    WithRejection(Json(payload), _): WithRejection<Json<SendMessagePayload>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let message = app_state.message_service.send(&caller, &payload).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

// GET /api/messages/conversations
#[utoipa::path(
    get,
    path = "/api/messages/conversations",
    tag = "Messages",
    responses(
        (status = 200, description = "Conversations, most recent first", body = Vec<Conversation>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_conversations(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
) -> Result<Json<Vec<Conversation>>, AppError> {
    Ok(Json(app_state.message_service.conversations(&caller).await?))
}

// GET /api/messages/unread-count
#[utoipa::path(
    get,
    path = "/api/messages/unread-count",
    tag = "Messages",
    responses(
        (status = 200, description = "Unread messages addressed to the caller", body = UnreadCount)
    ),
    security(("api_jwt" = []))
)]
pub async fn unread_count(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
) -> Result<Json<UnreadCount>, AppError> {
    Ok(Json(app_state.message_service.unread_count(&caller).await?))
}

// PUT /api/messages/{id}/read
#[utoipa::path(
    put,
    path = "/api/messages/{id}/read",
    tag = "Messages",
    params(("id" = Uuid, Path, description = "Message id")),
    responses(
        (status = 200, description = "Message marked read", body = Message),
        (status = 403, description = "Caller is not the recipient"),
        (status = 404, description = "Message not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn mark_message_read(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<Message>, AppError> {
    Ok(Json(app_state.message_service.mark_read(&caller, id).await?))
}

// DELETE /api/messages/{id}
#[utoipa::path(
    delete,
    path = "/api/messages/{id}",
    tag = "Messages",
    params(("id" = Uuid, Path, description = "Message id")),
    responses(
        (status = 204, description = "Message deleted"),
        (status = 403, description = "Not the caller's message"),
        (status = 404, description = "Message not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_message(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<StatusCode, AppError> {
    app_state.message_service.delete(&caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
