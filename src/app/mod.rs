pub mod access;
pub mod auth;
pub mod engagement;
pub mod feed;
pub mod messages;
pub mod moderation;
pub mod notifications;
pub mod posts;
pub mod releases;
pub mod search;
pub mod social;
pub mod stories;
pub mod users;
