// Conversation service: owns the participant-set invariants for direct and
// group conversations, including deletion and leave semantics.
//
// A direct conversation has exactly two participants and is removed outright
// once fewer than two remain. A group conversation survives membership
// changes but never drops below two participants except through deletion.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::user_repo;
use crate::error::AppError;
use crate::models::{Conversation, ConversationType, Message, UserRole, UserStatus};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ParticipantInfo {
    pub user_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LastMessage {
    pub content: String,
    pub sender_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub id: Uuid,
    pub conversation_type: ConversationType,
    pub name: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub participants: Vec<ParticipantInfo>,
    pub last_message: Option<LastMessage>,
    pub unread_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationDetail {
    pub conversation: Conversation,
    pub participants: Vec<ParticipantInfo>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MessageWithSender {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub sender_name: String,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Outcome of leaving a conversation: either the caller left and the
/// conversation lives on, or their departure dissolved it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    Left,
    Deleted,
}

#[derive(Debug, Default)]
pub struct GroupChanges {
    pub name: Option<String>,
    pub add_participant_ids: Vec<Uuid>,
    pub remove_participant_ids: Vec<Uuid>,
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    id: Uuid,
    conversation_type: ConversationType,
    name: Option<String>,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_message_content: Option<String>,
    last_message_sender_id: Option<Uuid>,
    last_message_at: Option<DateTime<Utc>>,
    unread_count: i64,
}

#[derive(sqlx::FromRow)]
struct ParticipantRow {
    conversation_id: Uuid,
    user_id: Uuid,
    name: String,
}

pub struct ConversationService;

impl ConversationService {
    /// Create a direct (1:1) conversation between two users, reusing an
    /// existing one if the pair already has a conversation. Returns the
    /// conversation and whether it was reused.
    pub async fn create_direct(
        db: &PgPool,
        initiator: Uuid,
        recipient: Uuid,
    ) -> Result<(Conversation, bool), AppError> {
        if initiator == recipient {
            return Err(AppError::Validation(
                "Cannot start a conversation with yourself".to_string(),
            ));
        }

        let recipient_user = user_repo::find_by_id(db, recipient)
            .await?
            .ok_or_else(|| AppError::Validation(format!("User {} does not exist", recipient)))?;

        if recipient_user.status != UserStatus::Approved && recipient_user.role != UserRole::Admin {
            return Err(AppError::Validation(
                "Recipient is not an approved member".to_string(),
            ));
        }

        // Lookup is symmetric in the pair, so (A,B) and (B,A) land on the
        // same conversation.
        if let Some(existing) = Self::find_direct_between(db, initiator, recipient).await? {
            return Ok((existing, true));
        }

        let mut tx = db.begin().await?;

        let conversation = sqlx::query_as::<_, Conversation>(
            r#"
            INSERT INTO conversations (id, conversation_type, name, created_by, created_at, updated_at)
            VALUES ($1, 'direct', NULL, $2, $3, $3)
            RETURNING id, conversation_type, name, created_by, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(initiator)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        for user_id in [initiator, recipient] {
            sqlx::query(
                r#"
                INSERT INTO conversation_participants (id, conversation_id, user_id)
                VALUES ($1, $2, $3)
                ON CONFLICT (conversation_id, user_id) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(conversation.id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok((conversation, false))
    }

    /// Find an existing direct conversation between two users, order
    /// independent.
    pub async fn find_direct_between(
        db: &PgPool,
        user_a: Uuid,
        user_b: Uuid,
    ) -> Result<Option<Conversation>, AppError> {
        let conversation = sqlx::query_as::<_, Conversation>(
            r#"
            SELECT c.id, c.conversation_type, c.name, c.created_by, c.created_at, c.updated_at
            FROM conversations c
            WHERE c.conversation_type = 'direct'
              AND EXISTS (SELECT 1 FROM conversation_participants p
                          WHERE p.conversation_id = c.id AND p.user_id = $1)
              AND EXISTS (SELECT 1 FROM conversation_participants p
                          WHERE p.conversation_id = c.id AND p.user_id = $2)
            LIMIT 1
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_optional(db)
        .await?;

        Ok(conversation)
    }

    /// Create a group conversation with the creator plus the listed
    /// participants. Every listed participant must be an approved user.
    pub async fn create_group(
        db: &PgPool,
        creator: Uuid,
        name: &str,
        participant_ids: &[Uuid],
    ) -> Result<Conversation, AppError> {
        if name.trim().is_empty() {
            return Err(AppError::Validation(
                "Group name cannot be empty".to_string(),
            ));
        }

        let mut others: Vec<Uuid> = Vec::new();
        for id in participant_ids {
            if *id != creator && !others.contains(id) {
                others.push(*id);
            }
        }

        if others.is_empty() {
            return Err(AppError::Validation(
                "A group conversation needs at least one other participant".to_string(),
            ));
        }

        let messageable = user_repo::count_messageable(db, &others).await?;
        if messageable != others.len() as i64 {
            return Err(AppError::Validation(
                "One or more participants are not approved members".to_string(),
            ));
        }

        let mut tx = db.begin().await?;

        let conversation = sqlx::query_as::<_, Conversation>(
            r#"
            INSERT INTO conversations (id, conversation_type, name, created_by, created_at, updated_at)
            VALUES ($1, 'group', $2, $3, $4, $4)
            RETURNING id, conversation_type, name, created_by, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name.trim())
        .bind(creator)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        for user_id in std::iter::once(&creator).chain(others.iter()) {
            sqlx::query(
                r#"
                INSERT INTO conversation_participants (id, conversation_id, user_id)
                VALUES ($1, $2, $3)
                ON CONFLICT (conversation_id, user_id) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(conversation.id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(conversation)
    }

    pub async fn get_conversation(
        db: &PgPool,
        conversation_id: Uuid,
    ) -> Result<Option<Conversation>, AppError> {
        let conversation = sqlx::query_as::<_, Conversation>(
            r#"
            SELECT id, conversation_type, name, created_by, created_at, updated_at
            FROM conversations
            WHERE id = $1
            "#,
        )
        .bind(conversation_id)
        .fetch_optional(db)
        .await?;

        Ok(conversation)
    }

    pub async fn is_participant(
        db: &PgPool,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, AppError> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM conversation_participants
                WHERE conversation_id = $1 AND user_id = $2
            )
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_one(db)
        .await?;

        Ok(exists)
    }

    /// Append a message. The sender must be a current participant; sending
    /// bumps the conversation's `updated_at`, which drives list ordering.
    pub async fn send_message(
        db: &PgPool,
        conversation_id: Uuid,
        sender: Uuid,
        content: &str,
    ) -> Result<Message, AppError> {
        if content.trim().is_empty() {
            return Err(AppError::Validation(
                "Message content cannot be empty".to_string(),
            ));
        }

        Self::get_conversation(db, conversation_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Conversation not found".to_string()))?;

        if !Self::is_participant(db, conversation_id, sender).await? {
            return Err(AppError::Authorization(
                "You are not a participant in this conversation".to_string(),
            ));
        }

        let mut tx = db.begin().await?;

        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (id, conversation_id, sender_id, content, is_read, created_at)
            VALUES ($1, $2, $3, $4, FALSE, $5)
            RETURNING id, conversation_id, sender_id, content, is_read, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(conversation_id)
        .bind(sender)
        .bind(content)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE conversations SET updated_at = $1 WHERE id = $2")
            .bind(message.created_at)
            .bind(conversation_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(message)
    }

    /// Apply rename / add / remove changes to a group conversation. Direct
    /// conversations reject all updates. The whole change set is applied in
    /// one transaction; any invalid part fails the batch with nothing
    /// persisted.
    pub async fn update_group(
        db: &PgPool,
        conversation_id: Uuid,
        caller: Uuid,
        changes: GroupChanges,
    ) -> Result<Conversation, AppError> {
        let conversation = Self::get_conversation(db, conversation_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Conversation not found".to_string()))?;

        if conversation.conversation_type != ConversationType::Group {
            return Err(AppError::Validation(
                "Direct conversations cannot be modified".to_string(),
            ));
        }

        if !Self::is_participant(db, conversation_id, caller).await? {
            return Err(AppError::Authorization(
                "You are not a participant in this conversation".to_string(),
            ));
        }

        let mut tx = db.begin().await?;

        if let Some(ref name) = changes.name {
            if name.trim().is_empty() {
                return Err(AppError::Validation(
                    "Group name cannot be empty".to_string(),
                ));
            }

            sqlx::query("UPDATE conversations SET name = $1 WHERE id = $2")
                .bind(name.trim())
                .bind(conversation_id)
                .execute(&mut *tx)
                .await?;
        }

        if !changes.add_participant_ids.is_empty() {
            let mut to_add: Vec<Uuid> = Vec::new();
            for id in &changes.add_participant_ids {
                if !to_add.contains(id) {
                    to_add.push(*id);
                }
            }

            // Ids that are already participants are skipped, not errors.
            let existing: Vec<(Uuid,)> = sqlx::query_as(
                r#"
                SELECT user_id FROM conversation_participants
                WHERE conversation_id = $1 AND user_id = ANY($2)
                "#,
            )
            .bind(conversation_id)
            .bind(&to_add)
            .fetch_all(&mut *tx)
            .await?;

            to_add.retain(|id| !existing.iter().any(|(e,)| e == id));

            if !to_add.is_empty() {
                let (messageable,): (i64,) = sqlx::query_as(
                    r#"
                    SELECT COUNT(*)
                    FROM users
                    WHERE id = ANY($1) AND (status = 'approved' OR role = 'admin')
                    "#,
                )
                .bind(&to_add)
                .fetch_one(&mut *tx)
                .await?;

                if messageable != to_add.len() as i64 {
                    return Err(AppError::Validation(
                        "One or more participants are not approved members".to_string(),
                    ));
                }

                for user_id in &to_add {
                    sqlx::query(
                        r#"
                        INSERT INTO conversation_participants (id, conversation_id, user_id)
                        VALUES ($1, $2, $3)
                        ON CONFLICT (conversation_id, user_id) DO NOTHING
                        "#,
                    )
                    .bind(Uuid::new_v4())
                    .bind(conversation_id)
                    .bind(user_id)
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }

        if !changes.remove_participant_ids.is_empty() {
            if changes.remove_participant_ids.contains(&caller) {
                return Err(AppError::Validation(
                    "Cannot remove yourself from a conversation; leave it instead".to_string(),
                ));
            }

            // Lock the participant rows so the minimum-size check cannot race
            // a concurrent removal.
            let current: Vec<(Uuid,)> = sqlx::query_as(
                r#"
                SELECT user_id FROM conversation_participants
                WHERE conversation_id = $1
                FOR UPDATE
                "#,
            )
            .bind(conversation_id)
            .fetch_all(&mut *tx)
            .await?;

            let to_remove: Vec<Uuid> = changes
                .remove_participant_ids
                .iter()
                .filter(|id| current.iter().any(|(c,)| c == *id))
                .copied()
                .collect();

            if current.len() - to_remove.len() < 2 {
                return Err(AppError::Validation(
                    "Removal would leave the conversation with fewer than two participants"
                        .to_string(),
                ));
            }

            if !to_remove.is_empty() {
                sqlx::query(
                    r#"
                    DELETE FROM conversation_participants
                    WHERE conversation_id = $1 AND user_id = ANY($2)
                    "#,
                )
                .bind(conversation_id)
                .bind(&to_remove)
                .execute(&mut *tx)
                .await?;
            }
        }

        sqlx::query("UPDATE conversations SET updated_at = $1 WHERE id = $2")
            .bind(Utc::now())
            .bind(conversation_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Self::get_conversation(db, conversation_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Conversation not found".to_string()))
    }

    /// Remove the caller from a conversation. The conversation is deleted
    /// outright (messages cascade) when nobody remains, or when a direct
    /// conversation is left with a single participant. A deleted
    /// conversation cannot be resurrected.
    pub async fn leave_conversation(
        db: &PgPool,
        conversation_id: Uuid,
        caller: Uuid,
    ) -> Result<LeaveOutcome, AppError> {
        let conversation = Self::get_conversation(db, conversation_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Conversation not found".to_string()))?;

        let mut tx = db.begin().await?;

        let removed = sqlx::query(
            "DELETE FROM conversation_participants WHERE conversation_id = $1 AND user_id = $2",
        )
        .bind(conversation_id)
        .bind(caller)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if removed == 0 {
            return Err(AppError::Authorization(
                "You are not a participant in this conversation".to_string(),
            ));
        }

        let (remaining,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM conversation_participants WHERE conversation_id = $1")
                .bind(conversation_id)
                .fetch_one(&mut *tx)
                .await?;

        let delete_conversation = remaining == 0
            || (conversation.conversation_type == ConversationType::Direct && remaining == 1);

        let outcome = if delete_conversation {
            sqlx::query("DELETE FROM conversations WHERE id = $1")
                .bind(conversation_id)
                .execute(&mut *tx)
                .await?;
            LeaveOutcome::Deleted
        } else {
            sqlx::query("UPDATE conversations SET updated_at = $1 WHERE id = $2")
                .bind(Utc::now())
                .bind(conversation_id)
                .execute(&mut *tx)
                .await?;
            LeaveOutcome::Left
        };

        tx.commit().await?;

        Ok(outcome)
    }

    /// List the caller's conversations, most recently active first, each
    /// with its participants, last message preview, and unread count.
    pub async fn list_for_user(
        db: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<ConversationSummary>, AppError> {
        let rows = sqlx::query_as::<_, SummaryRow>(
            r#"
            SELECT c.id, c.conversation_type, c.name, c.created_by, c.created_at, c.updated_at,
                   lm.content AS last_message_content,
                   lm.sender_id AS last_message_sender_id,
                   lm.created_at AS last_message_at,
                   (SELECT COUNT(*) FROM messages m
                    WHERE m.conversation_id = c.id AND m.sender_id <> $1 AND m.is_read = FALSE)
                       AS unread_count
            FROM conversations c
            JOIN conversation_participants cp
              ON cp.conversation_id = c.id AND cp.user_id = $1
            LEFT JOIN LATERAL (
                SELECT m.content, m.sender_id, m.created_at
                FROM messages m
                WHERE m.conversation_id = c.id
                ORDER BY m.created_at DESC
                LIMIT 1
            ) lm ON TRUE
            ORDER BY c.updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let participant_rows = sqlx::query_as::<_, ParticipantRow>(
            r#"
            SELECT cp.conversation_id, cp.user_id, u.name
            FROM conversation_participants cp
            JOIN users u ON u.id = cp.user_id
            WHERE cp.conversation_id = ANY($1)
            ORDER BY cp.joined_at ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(db)
        .await?;

        let summaries = rows
            .into_iter()
            .map(|row| {
                let participants = participant_rows
                    .iter()
                    .filter(|p| p.conversation_id == row.id)
                    .map(|p| ParticipantInfo {
                        user_id: p.user_id,
                        name: p.name.clone(),
                    })
                    .collect();

                let last_message = match (
                    row.last_message_content,
                    row.last_message_sender_id,
                    row.last_message_at,
                ) {
                    (Some(content), Some(sender_id), Some(created_at)) => Some(LastMessage {
                        content,
                        sender_id,
                        created_at,
                    }),
                    _ => None,
                };

                ConversationSummary {
                    id: row.id,
                    conversation_type: row.conversation_type,
                    name: row.name,
                    created_by: row.created_by,
                    created_at: row.created_at,
                    updated_at: row.updated_at,
                    participants,
                    last_message,
                    unread_count: row.unread_count,
                }
            })
            .collect();

        Ok(summaries)
    }

    /// Fetch a conversation with its participant list. Only participants may
    /// see it.
    pub async fn get_with_participants(
        db: &PgPool,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<ConversationDetail, AppError> {
        let conversation = Self::get_conversation(db, conversation_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Conversation not found".to_string()))?;

        if !Self::is_participant(db, conversation_id, user_id).await? {
            return Err(AppError::Authorization(
                "You are not a participant in this conversation".to_string(),
            ));
        }

        let participants = sqlx::query_as::<_, ParticipantInfo>(
            r#"
            SELECT cp.user_id, u.name
            FROM conversation_participants cp
            JOIN users u ON u.id = cp.user_id
            WHERE cp.conversation_id = $1
            ORDER BY cp.joined_at ASC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(db)
        .await?;

        Ok(ConversationDetail {
            conversation,
            participants,
        })
    }

    /// List messages oldest first. Only participants may read them.
    pub async fn list_messages(
        db: &PgPool,
        conversation_id: Uuid,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MessageWithSender>, AppError> {
        Self::get_conversation(db, conversation_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Conversation not found".to_string()))?;

        if !Self::is_participant(db, conversation_id, user_id).await? {
            return Err(AppError::Authorization(
                "You are not a participant in this conversation".to_string(),
            ));
        }

        let messages = sqlx::query_as::<_, MessageWithSender>(
            r#"
            SELECT m.id, m.conversation_id, m.sender_id, u.name AS sender_name,
                   m.content, m.is_read, m.created_at
            FROM messages m
            JOIN users u ON u.id = m.sender_id
            WHERE m.conversation_id = $1
            ORDER BY m.created_at ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(conversation_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;

        Ok(messages)
    }

    /// Mark all messages from other senders as read.
    pub async fn mark_read(
        db: &PgPool,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<u64, AppError> {
        if !Self::is_participant(db, conversation_id, user_id).await? {
            return Err(AppError::Authorization(
                "You are not a participant in this conversation".to_string(),
            ));
        }

        let result = sqlx::query(
            r#"
            UPDATE messages
            SET is_read = TRUE
            WHERE conversation_id = $1 AND sender_id <> $2 AND is_read = FALSE
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .execute(db)
        .await?;

        Ok(result.rows_affected())
    }
}
