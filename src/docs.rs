// src/docs.rs

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Health ---
        handlers::health::health,

        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::get_me,

        // --- Members ---
        handlers::members::list_members,
        handlers::members::create_member,
        handlers::members::get_member,
        handlers::members::update_member,
        handlers::members::delete_member,
        handlers::members::change_member_role,
        handlers::members::set_member_status,
        handlers::members::district_admins,

        // --- Lodges ---
        handlers::lodges::list_lodges,
        handlers::lodges::create_lodge,
        handlers::lodges::get_lodge,
        handlers::lodges::update_lodge,
        handlers::lodges::delete_lodge,
        handlers::lodges::lodge_members,
        handlers::lodges::lodge_positions,
        handlers::lodges::assign_lodge_position,

        // --- Candidates ---
        handlers::candidates::list_candidates,
        handlers::candidates::create_candidate,
        handlers::candidates::get_candidate,
        handlers::candidates::update_candidate,
        handlers::candidates::set_candidate_status,
        handlers::candidates::delete_candidate,

        // --- Events ---
        handlers::events::list_events,
        handlers::events::create_event,
        handlers::events::get_event,
        handlers::events::update_event,
        handlers::events::delete_event,

        // --- Messages ---
        handlers::messages::list_messages,
        handlers::messages::send_message,
        handlers::messages::list_conversations,
        handlers::messages::unread_count,
        handlers::messages::mark_message_read,
        handlers::messages::delete_message,
    ),
    components(
        schemas(
            // --- Users ---
            models::user::Role,
            models::user::MemberStatus,
            models::user::LodgeRef,
            models::user::LodgeMembership,
            models::user::MemberView,

            // --- Auth ---
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,

            // --- Members ---
            models::member::CreateMemberPayload,
            models::member::UpdateMemberPayload,
            models::member::MemberStatusPayload,
            models::member::ChangeRolePayload,
            models::member::TransferDetails,
            models::member::RoleChangeResponse,

            // --- Lodges ---
            models::lodge::Coordinates,
            models::lodge::Lodge,
            models::lodge::CreateLodgePayload,
            models::lodge::UpdateLodgePayload,
            models::lodge::LodgePosition,
            models::lodge::AssignPositionPayload,

            // --- Candidates ---
            models::candidate::CandidateStatus,
            models::candidate::Candidate,
            models::candidate::CandidateView,
            models::candidate::CreateCandidatePayload,
            models::candidate::UpdateCandidatePayload,
            models::candidate::CandidateStatusPayload,

            // --- Events ---
            models::event::Event,
            models::event::CreateEventPayload,
            models::event::UpdateEventPayload,

            // --- Messages ---
            models::message::Message,
            models::message::SendMessagePayload,
            models::message::Conversation,
            models::message::UnreadCount,
        )
    ),
    tags(
        (name = "Health", description = "Liveness"),
        (name = "Auth", description = "Login, registration and the current user"),
        (name = "Members", description = "Members and role transfers"),
        (name = "Lodges", description = "Lodges, their members and officer positions"),
        (name = "Candidates", description = "Candidates proposed for initiation"),
        (name = "Events", description = "Lodge calendar"),
        (name = "Messages", description = "Direct messages between members")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme("api_jwt", SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_the_role_transfer_route() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/members/{id}/role"));
        assert!(doc
            .components
            .as_ref()
            .is_some_and(|c| c.security_schemes.contains_key("api_jwt")));
    }
}
