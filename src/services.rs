pub mod auth;
pub mod candidate_service;
pub mod event_service;
pub mod lodge_service;
pub mod member_service;
pub mod message_service;
pub mod role_transfer;
