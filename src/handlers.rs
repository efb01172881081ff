pub mod auth;
pub mod candidates;
pub mod events;
pub mod health;
pub mod lodges;
pub mod members;
pub mod messages;
