use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::Row;
use time::OffsetDateTime;

use crate::domain::user::UserSummary;

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub content: String,
    pub reply_to_id: Option<i64>,
    pub is_read: bool,
    pub is_edited: bool,
    pub is_pinned: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Message {
    pub fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            sender_id: row.try_get("sender_id")?,
            receiver_id: row.try_get("receiver_id")?,
            content: row.try_get("content")?,
            reply_to_id: row.try_get("reply_to_id")?,
            is_read: row.try_get("is_read")?,
            is_edited: row.try_get("is_edited")?,
            is_pinned: row.try_get("is_pinned")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// A message in a conversation view, with both parties' display fields.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationMessage {
    #[serde(flatten)]
    pub message: Message,
    pub sender_username: String,
    pub sender_name: String,
    pub sender_avatar: String,
    pub receiver_username: String,
    pub receiver_name: String,
}

/// One row of the chat list: the latest visible message with a counterpart.
#[derive(Debug, Clone, Serialize)]
pub struct ChatSummary {
    pub other_id: i64,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub is_read: bool,
    pub sender_id: i64,
    pub user: UserSummary,
    pub unread_count: i64,
}

/// Which side of a message the caller is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Participant {
    Sender,
    Receiver,
}

impl Participant {
    /// `None` when the caller is not part of the conversation.
    pub fn of(caller_id: i64, sender_id: i64, receiver_id: i64) -> Option<Self> {
        if caller_id == sender_id {
            Some(Self::Sender)
        } else if caller_id == receiver_id {
            Some(Self::Receiver)
        } else {
            None
        }
    }

    pub fn hidden_column(&self) -> &'static str {
        match self {
            Self::Sender => "hidden_by_sender",
            Self::Receiver => "hidden_by_receiver",
        }
    }
}
