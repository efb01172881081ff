// src/routes.rs

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;

use crate::{config::AppState, docs::ApiDoc, handlers, middleware::auth::auth_guard};

pub fn router(app_state: AppState) -> Router {
    // Public
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login));

    // Everything below requires a bearer token
    let member_routes = Router::new()
        .route(
            "/",
            get(handlers::members::list_members).post(handlers::members::create_member),
        )
        .route(
            "/{id}",
            get(handlers::members::get_member)
                .put(handlers::members::update_member)
                .delete(handlers::members::delete_member),
        )
        .route("/{id}/role", put(handlers::members::change_member_role))
        .route("/{id}/status", put(handlers::members::set_member_status));

    let lodge_routes = Router::new()
        .route(
            "/",
            get(handlers::lodges::list_lodges).post(handlers::lodges::create_lodge),
        )
        .route(
            "/{id}",
            get(handlers::lodges::get_lodge)
                .put(handlers::lodges::update_lodge)
                .delete(handlers::lodges::delete_lodge),
        )
        .route("/{id}/members", get(handlers::lodges::lodge_members))
        .route(
            "/{id}/positions",
            get(handlers::lodges::lodge_positions).put(handlers::lodges::assign_lodge_position),
        );

    let candidate_routes = Router::new()
        .route(
            "/",
            get(handlers::candidates::list_candidates).post(handlers::candidates::create_candidate),
        )
        .route(
            "/{id}",
            get(handlers::candidates::get_candidate)
                .put(handlers::candidates::update_candidate)
                .delete(handlers::candidates::delete_candidate),
        )
        .route("/{id}/status", put(handlers::candidates::set_candidate_status));

    let event_routes = Router::new()
        .route(
            "/",
            get(handlers::events::list_events).post(handlers::events::create_event),
        )
        .route(
            "/{id}",
            get(handlers::events::get_event)
                .put(handlers::events::update_event)
                .delete(handlers::events::delete_event),
        );

    let message_routes = Router::new()
        .route(
            "/",
            get(handlers::messages::list_messages).post(handlers::messages::send_message),
        )
        .route("/conversations", get(handlers::messages::list_conversations))
        .route("/unread-count", get(handlers::messages::unread_count))
        .route("/{id}/read", put(handlers::messages::mark_message_read))
        .route("/{id}", delete(handlers::messages::delete_message));

    let protected = Router::new()
        .route("/auth/me", get(handlers::auth::get_me))
        .nest("/members", member_routes)
        .route("/admins/district", get(handlers::members::district_admins))
        .nest("/lodges", lodge_routes)
        .nest("/candidates", candidate_routes)
        .nest("/events", event_routes)
        .nest("/messages", message_routes)
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    Router::new()
        .route("/api/health", get(handlers::health::health))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .nest("/api/auth", auth_routes)
        .nest("/api", protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}
