pub mod auth;
pub mod candidate;
pub mod event;
pub mod lodge;
pub mod member;
pub mod message;
pub mod user;
