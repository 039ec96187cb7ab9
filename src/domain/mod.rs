pub mod engagement;
pub mod message;
pub mod moderation;
pub mod notification;
pub mod post;
pub mod privacy;
pub mod release;
pub mod social_graph;
pub mod story;
pub mod user;
