use anyhow::Result;
use sqlx::Row;

use crate::app::access::AccessService;
use crate::app::notifications::{NewNotification, NotificationService};
use crate::domain::message::{ChatSummary, ConversationMessage, Message, Participant};
use crate::domain::notification::NotificationKind;
use crate::domain::user::UserSummary;
use crate::infra::db::Db;

const CONVERSATION_LIMIT: i64 = 200;

#[derive(Debug, Clone)]
pub enum SendOutcome {
    Sent(Message),
    ReceiverNotFound,
    Blocked,
    NotAllowed,
    InvalidReply,
}

#[derive(Clone)]
pub struct MessageService {
    db: Db,
}

impl MessageService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// The latest messages with `other_id` that the caller has not hidden, oldest first.
    pub async fn conversation(&self, user_id: i64, other_id: i64) -> Result<Vec<ConversationMessage>> {
        let rows = sqlx::query(
            "SELECT m.id, m.sender_id, m.receiver_id, m.content, m.reply_to_id, m.is_read, \
                    m.is_edited, m.is_pinned, m.created_at, \
                    s.username AS sender_username, s.display_name AS sender_name, \
                    s.avatar_url AS sender_avatar, \
                    r.username AS receiver_username, r.display_name AS receiver_name \
             FROM messages m \
             JOIN users s ON s.id = m.sender_id \
             JOIN users r ON r.id = m.receiver_id \
             WHERE (m.sender_id = $1 AND m.receiver_id = $2 AND m.hidden_by_sender = FALSE) \
                OR (m.sender_id = $2 AND m.receiver_id = $1 AND m.hidden_by_receiver = FALSE) \
             ORDER BY m.created_at DESC, m.id DESC \
             LIMIT $3",
        )
        .bind(user_id)
        .bind(other_id)
        .bind(CONVERSATION_LIMIT)
        .fetch_all(self.db.pool())
        .await?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in rows.iter().rev() {
            messages.push(ConversationMessage {
                message: Message::from_row(row)?,
                sender_username: row.try_get("sender_username")?,
                sender_name: row.try_get("sender_name")?,
                sender_avatar: row.try_get("sender_avatar")?,
                receiver_username: row.try_get("receiver_username")?,
                receiver_name: row.try_get("receiver_name")?,
            });
        }
        Ok(messages)
    }

    /// One entry per counterpart with the newest visible message, newest conversation first.
    pub async fn chats(&self, user_id: i64) -> Result<Vec<ChatSummary>> {
        let rows = sqlx::query(
            "WITH visible AS ( \
                 SELECT m.id, m.sender_id, m.content, m.created_at, m.is_read, \
                        CASE WHEN m.sender_id = $1 THEN m.receiver_id ELSE m.sender_id END AS other_id \
                 FROM messages m \
                 WHERE (m.sender_id = $1 AND m.hidden_by_sender = FALSE) \
                    OR (m.receiver_id = $1 AND m.hidden_by_receiver = FALSE) \
             ), latest AS ( \
                 SELECT DISTINCT ON (other_id) other_id, sender_id, content, created_at, is_read \
                 FROM visible \
                 ORDER BY other_id, created_at DESC, id DESC \
             ) \
             SELECT l.other_id, l.sender_id, l.content, l.created_at, l.is_read, \
                    u.id, u.username, u.display_name, u.avatar_url, u.is_verified, u.is_artist_verified, \
                    (SELECT COUNT(*) FROM visible v \
                     WHERE v.other_id = l.other_id AND v.sender_id = l.other_id \
                       AND v.sender_id <> $1 AND v.is_read = FALSE) AS unread_count \
             FROM latest l \
             JOIN users u ON u.id = l.other_id \
             ORDER BY l.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;

        let mut chats = Vec::with_capacity(rows.len());
        for row in rows {
            chats.push(ChatSummary {
                other_id: row.try_get("other_id")?,
                content: row.try_get("content")?,
                created_at: row.try_get("created_at")?,
                is_read: row.try_get("is_read")?,
                sender_id: row.try_get("sender_id")?,
                user: UserSummary::from_row(&row)?,
                unread_count: row.try_get("unread_count")?,
            });
        }
        Ok(chats)
    }

    pub async fn send(
        &self,
        sender_id: i64,
        receiver_id: i64,
        content: &str,
        reply_to_id: Option<i64>,
    ) -> Result<SendOutcome> {
        let receiver_exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM users WHERE id = $1 AND is_blocked = FALSE)",
        )
        .bind(receiver_id)
        .fetch_one(self.db.pool())
        .await?;
        if !receiver_exists {
            return Ok(SendOutcome::ReceiverNotFound);
        }

        let access = AccessService::new(self.db.clone());
        if sender_id != receiver_id {
            if access.is_blocked_between(sender_id, receiver_id).await? {
                return Ok(SendOutcome::Blocked);
            }
            let settings = access.privacy_settings(receiver_id).await?.unwrap_or_default();
            if !access
                .audience_admits(settings.allow_messages, Some(sender_id), receiver_id)
                .await?
            {
                return Ok(SendOutcome::NotAllowed);
            }
        }

        if let Some(reply_to_id) = reply_to_id {
            let in_conversation: bool = sqlx::query_scalar(
                "SELECT EXISTS ( \
                     SELECT 1 FROM messages WHERE id = $1 \
                       AND ((sender_id = $2 AND receiver_id = $3) OR (sender_id = $3 AND receiver_id = $2)) \
                 )",
            )
            .bind(reply_to_id)
            .bind(sender_id)
            .bind(receiver_id)
            .fetch_one(self.db.pool())
            .await?;
            if !in_conversation {
                return Ok(SendOutcome::InvalidReply);
            }
        }

        let mut tx = self.db.pool().begin().await?;
        let row = sqlx::query(
            "INSERT INTO messages (sender_id, receiver_id, content, reply_to_id) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, sender_id, receiver_id, content, reply_to_id, is_read, is_edited, \
                       is_pinned, created_at",
        )
        .bind(sender_id)
        .bind(receiver_id)
        .bind(content)
        .bind(reply_to_id)
        .fetch_one(&mut *tx)
        .await?;
        let message = Message::from_row(&row)?;

        NotificationService::notify_with_tx(
            NewNotification::new(receiver_id, sender_id, NotificationKind::Message),
            &mut tx,
        )
        .await?;

        tx.commit().await?;
        Ok(SendOutcome::Sent(message))
    }

    /// Marks everything `other_id` sent to the caller as read.
    pub async fn mark_read(&self, user_id: i64, other_id: i64) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE messages SET is_read = TRUE \
             WHERE sender_id = $2 AND receiver_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .bind(other_id)
        .execute(self.db.pool())
        .await?;
        Ok(result.rows_affected())
    }

    /// Only the sender may edit. `None` when the caller sent no such message.
    pub async fn edit(&self, user_id: i64, message_id: i64, content: &str) -> Result<Option<Message>> {
        let row = sqlx::query(
            "UPDATE messages SET content = $3, is_edited = TRUE \
             WHERE id = $1 AND sender_id = $2 \
             RETURNING id, sender_id, receiver_id, content, reply_to_id, is_read, is_edited, \
                       is_pinned, created_at",
        )
        .bind(message_id)
        .bind(user_id)
        .bind(content)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(row.as_ref().map(Message::from_row).transpose()?)
    }

    /// `None` when the caller is not a participant.
    pub async fn toggle_pin(&self, user_id: i64, message_id: i64) -> Result<Option<bool>> {
        let pinned: Option<bool> = sqlx::query_scalar(
            "UPDATE messages SET is_pinned = NOT is_pinned \
             WHERE id = $1 AND (sender_id = $2 OR receiver_id = $2) \
             RETURNING is_pinned",
        )
        .bind(message_id)
        .bind(user_id)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(pinned)
    }

    /// Hides the message on the caller's side only. Returns false for non-participants.
    pub async fn hide(&self, user_id: i64, message_id: i64) -> Result<bool> {
        let row = sqlx::query("SELECT sender_id, receiver_id FROM messages WHERE id = $1")
            .bind(message_id)
            .fetch_optional(self.db.pool())
            .await?;
        let Some(row) = row else {
            return Ok(false);
        };
        let sender_id: i64 = row.try_get("sender_id")?;
        let receiver_id: i64 = row.try_get("receiver_id")?;

        let Some(side) = Participant::of(user_id, sender_id, receiver_id) else {
            return Ok(false);
        };

        let sql = if sender_id == receiver_id {
            "UPDATE messages SET hidden_by_sender = TRUE, hidden_by_receiver = TRUE WHERE id = $1"
                .to_string()
        } else {
            format!("UPDATE messages SET {} = TRUE WHERE id = $1", side.hidden_column())
        };
        sqlx::query(&sql).bind(message_id).execute(self.db.pool()).await?;
        Ok(true)
    }
}
